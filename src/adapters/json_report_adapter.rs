//! JSON report adapter implementing ReportPort.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TradebenchError;
use crate::domain::optimize::SweepReport;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        JsonReportAdapter
    }

    fn write_json<T: Serialize>(&self, value: &T, output_path: &Path) -> Result<(), TradebenchError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| TradebenchError::Report {
            reason: format!("failed to serialize report: {}", e),
        })?;
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| TradebenchError::Report {
                reason: format!("failed to create {}: {}", parent.display(), e),
            })?;
        }
        fs::write(output_path, json + "\n").map_err(|e| TradebenchError::Report {
            reason: format!("failed to write {}: {}", output_path.display(), e),
        })?;
        tracing::info!(path = %output_path.display(), "report written");
        Ok(())
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &Path) -> Result<(), TradebenchError> {
        self.write_json(result, output_path)
    }

    fn write_sweep(&self, report: &SweepReport, output_path: &Path) -> Result<(), TradebenchError> {
        self.write_json(report, output_path)
    }
}
