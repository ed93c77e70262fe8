pub mod config;
pub mod error;
pub mod log;
pub mod orchestration;
pub mod pipeline;
pub mod race;
pub mod server;
pub mod source;

pub use error::{Error, Result};
