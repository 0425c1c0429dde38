pub mod calendar;
pub mod classifier;
pub mod config;
pub mod documents;
pub mod error;
pub mod obligations;
pub mod telemetry;
