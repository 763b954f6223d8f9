//! CLI command implementations

mod config;
mod list;
mod serve;

pub use config::{config, ConfigArgs};
pub use list::list_sources;
pub use serve::{serve, ServeArgs};
