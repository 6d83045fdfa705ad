//! Control panel for the FIBO text-to-image generator.
//!
//! The [`Dispatcher`] turns Generate, Refine and Inspire requests into runs of
//! the external generator, waits for them with a timeout, and collects the
//! produced image plus its structured JSON prompt. The optional `server`
//! feature puts a small browser panel in front of it.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logger;
pub mod models;
#[cfg(feature = "server")]
pub mod server;

pub use config::{Config, Credentials, GeneratorConfig, ServerConfig};
pub use dispatcher::{CommandRunner, Dispatcher, ProcessRunner, RunOutput};
pub use error::{PanelError, Result};
pub use models::*;
