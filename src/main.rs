use clap::Parser;
use tradebench::cli::{run, Cli};
use tradebench::logging;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    run(cli)
}
