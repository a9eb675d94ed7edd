//! Collaborator traits consumed by the domain.

pub mod config_port;
pub mod data_port;
pub mod report_port;
