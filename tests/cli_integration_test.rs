//! CLI integration tests.
//!
//! Tests cover:
//! - `validate` on good and broken INI files
//! - `backtest` against a CSV data directory, to stdout and to a file
//! - `optimize` sweeps and its config requirements
//! - `list-symbols`
//! - Exit codes per error family

mod common;

use common::*;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const VALID_INI: &str = r#"
[backtest]
symbol = TEST
timeframe = 1h
start_date = 2024-01-01
end_date = 2024-12-31
initial_balance = 10000

[risk]
min_risk_reward = 1.5

[strategy]
type = ema_crossover
name = EMA Crossover
risk_fraction = 0.02
stop_loss = 0.02
take_profit = 0.2

[optimize]
params = short_period:5:9:2, stop_loss:0.01:0.02:0.01
"#;

fn tradebench(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_tradebench"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_csv(dir.path(), "TEST", "1h", &candles_from_closes(&climb_closes()));
    write_csv(dir.path(), "WAVE", "1h", &candles_from_closes(&wave_closes(300)));
    dir
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

mod validate {
    use super::*;

    #[test]
    fn valid_config_passes() {
        let ini = write_temp_ini(VALID_INI);
        let out = tradebench(&["validate", "-c", path_str(ini.path())]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        let stderr = String::from_utf8_lossy(&out.stderr);
        assert!(stderr.contains("Config validated successfully"));
        assert!(stderr.contains("EMA(21)"));
    }

    #[test]
    fn missing_key_exits_with_config_status() {
        let ini = write_temp_ini(&VALID_INI.replace("symbol = TEST\n", ""));
        let out = tradebench(&["validate", "-c", path_str(ini.path())]);
        assert_eq!(out.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&out.stderr).contains("symbol"));
    }

    #[test]
    fn missing_file_exits_with_config_status() {
        let out = tradebench(&["validate", "-c", "/nonexistent/tradebench.ini"]);
        assert_eq!(out.status.code(), Some(2));
    }

    #[test]
    fn invalid_strategy_parameter_exits_with_parameter_status() {
        let ini = write_temp_ini(&VALID_INI.replace("stop_loss = 0.02", "stop_loss = 1.5"));
        let out = tradebench(&["validate", "-c", path_str(ini.path())]);
        assert_eq!(out.status.code(), Some(3));
    }

    #[test]
    fn oversized_sweep_range_is_config_error() {
        let ini = write_temp_ini(&VALID_INI.replace("short_period:5:9:2", "short_period:0:1:1e-300"));
        let out = tradebench(&["validate", "-c", path_str(ini.path())]);
        assert_eq!(out.status.code(), Some(2));
        assert!(String::from_utf8_lossy(&out.stderr).contains("more than"));
    }

    #[test]
    fn unknown_sweep_parameter_is_rejected() {
        let ini = write_temp_ini(&VALID_INI.replace("short_period:5:9:2", "atr_period:5:9:2"));
        let out = tradebench(&["validate", "-c", path_str(ini.path())]);
        assert_eq!(out.status.code(), Some(3));
    }
}

mod backtest {
    use super::*;

    #[test]
    fn writes_json_to_stdout() {
        let ini = write_temp_ini(VALID_INI);
        let data = data_dir();
        let out = tradebench(&["backtest", "-c", path_str(ini.path()), "-d", path_str(data.path())]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

        let json = stdout_json(&out);
        assert_eq!(json["symbol"], "TEST");
        assert_eq!(json["bars"], 50);
        let trades = json["trades"].as_array().unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0]["side"], "LONG");
        assert_eq!(trades[0]["exit_reason"], "forced_exit");
        assert_eq!(trades[0]["entry_price"], 101.0);
        assert_eq!(json["performance"]["profit_factor"], "Infinity");
        assert!(String::from_utf8_lossy(&out.stderr).contains("Total Trades:     1"));
        assert_eq!(json["market"]["trend"]["short"], "bullish");
        assert!(json["market"]["key_levels"]["support"].is_array());
    }

    #[test]
    fn writes_report_file() {
        let ini = write_temp_ini(VALID_INI);
        let data = data_dir();
        let report = data.path().join("out").join("result.json");
        let out = tradebench(&[
            "backtest",
            "-c",
            path_str(ini.path()),
            "-d",
            path_str(data.path()),
            "-o",
            path_str(&report),
        ]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        assert!(out.stdout.is_empty());

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
        assert_eq!(json["strategy"]["name"], "EMA Crossover");
    }

    #[test]
    fn symbol_override_selects_file() {
        let ini = write_temp_ini(VALID_INI);
        let data = data_dir();
        let out = tradebench(&[
            "backtest",
            "-c",
            path_str(ini.path()),
            "-d",
            path_str(data.path()),
            "--symbol",
            "WAVE",
        ]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        assert_eq!(stdout_json(&out)["bars"], 300);
    }

    #[test]
    fn missing_data_exits_with_data_status() {
        let ini = write_temp_ini(VALID_INI);
        let data = data_dir();
        let out = tradebench(&[
            "backtest",
            "-c",
            path_str(ini.path()),
            "-d",
            path_str(data.path()),
            "--symbol",
            "NOPE",
        ]);
        assert_eq!(out.status.code(), Some(4));
    }

    #[test]
    fn empty_date_range_exits_with_data_status() {
        let ini = write_temp_ini(
            &VALID_INI
                .replace("2024-01-01", "2023-01-01")
                .replace("2024-12-31", "2023-12-31"),
        );
        let data = data_dir();
        let out = tradebench(&["backtest", "-c", path_str(ini.path()), "-d", path_str(data.path())]);
        assert_eq!(out.status.code(), Some(4));
        assert!(String::from_utf8_lossy(&out.stderr).contains("no 1h candles"));
    }
}

mod optimize {
    use super::*;

    #[test]
    fn sweep_report_to_stdout() {
        let ini = write_temp_ini(VALID_INI);
        let data = data_dir();
        let out = tradebench(&[
            "optimize",
            "-c",
            path_str(ini.path()),
            "-d",
            path_str(data.path()),
        ]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
        let json = stdout_json(&out);
        assert_eq!(json["combinations"], 6);
        assert_eq!(json["entries"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn sequential_matches_parallel() {
        let ini = write_temp_ini(VALID_INI);
        let data = data_dir();
        let args = ["optimize", "-c", path_str(ini.path()), "-d", path_str(data.path())];
        let parallel = tradebench(&args);
        let mut seq_args = args.to_vec();
        seq_args.push("--sequential");
        let sequential = tradebench(&seq_args);
        assert_eq!(stdout_json(&parallel), stdout_json(&sequential));
    }

    #[test]
    fn missing_ranges_exit_with_config_status() {
        let ini = write_temp_ini(VALID_INI.split("[optimize]").next().unwrap());
        let data = data_dir();
        let out = tradebench(&["optimize", "-c", path_str(ini.path()), "-d", path_str(data.path())]);
        assert_eq!(out.status.code(), Some(2));
    }
}

mod list_symbols {
    use super::*;

    #[test]
    fn lists_timeframe_symbols() {
        let data = data_dir();
        let out = tradebench(&["list-symbols", "-d", path_str(data.path()), "-t", "1h"]);
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout), "TEST\nWAVE\n");
    }
}
