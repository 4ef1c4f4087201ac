//! Application startup utilities module.

mod bootstrap;
mod http;
mod logging;
mod shutdown;

pub use bootstrap::provision;
pub use http::main_server;
pub use logging::{LogRotation, LoggingConfig, LoggingGuard, init_logging};
pub use shutdown::wait_for_shutdown_signal;
