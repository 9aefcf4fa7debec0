//! Core domain types and logic.

pub mod bar;
pub mod event;
pub mod queue;
pub mod timeline;
pub mod data_handler;
pub mod strategy;
pub mod portfolio;
pub mod execution;
pub mod metrics;
pub mod backtest;
pub mod config_validation;
pub mod error;
