pub mod tracing_setup;

pub use tracing_setup::{LogFormat, TracingConfig, log_api_request};
