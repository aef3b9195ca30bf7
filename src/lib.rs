//! Library surface for the meal entitlement engine and its runtime
//! plumbing (configuration, telemetry, HTTP error mapping).

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
