//! Concrete adapter implementations for ports.

pub mod csv_adapter;
pub mod csv_report_adapter;
pub mod data_server;
pub mod file_config_adapter;
pub mod remote_adapter;
pub mod wire;
