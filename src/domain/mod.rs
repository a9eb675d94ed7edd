//! Core domain types and logic.

pub mod backtest;
pub mod candle;
pub mod config_validation;
pub mod error;
pub mod evaluator;
pub mod indicator;
pub mod metrics;
pub mod optimize;
pub mod position;
pub mod risk;
pub mod signal;
pub mod simulator;
pub mod strategy;
