pub mod api;
pub mod carbon;
pub mod chain;
pub mod cli;
pub mod contract;
pub mod economics;
pub mod error;
pub mod panel;
pub mod storage;
pub mod telemetry;
pub mod transaction;
pub mod wallet;
