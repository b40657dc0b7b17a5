pub mod actor;
pub mod bus;
pub mod config;
pub mod core;
pub mod error;
pub mod feedback;
pub mod log;
pub mod oracle;
pub mod orchestrator;
pub mod persistence;
pub mod priority;
pub mod protocol;
pub mod route;
pub mod workflow;

pub use error::{Error, Result};
pub use priority::Priority;
