pub mod interceptor;
pub mod telemetry;
pub mod mitigation;
pub mod middleware;
pub mod config;

pub mod monitoring;
