//! Report output port.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TradebenchError;
use crate::domain::optimize::SweepReport;

pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), TradebenchError>;

    fn write_sweep(&self, report: &SweepReport, output_path: &Path) -> Result<(), TradebenchError>;
}
