//! Source-list loading plus the filter and sieve engine used to choose which
//! accounts a harvest run targets.

pub mod app_config;
pub mod config;
pub mod error;
pub mod filter;
pub mod sieve;
pub mod source;

mod input;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{ConfigError, ParseError, SourceError, TypeMismatchError, ValidationError};
pub use filter::Filter;
pub use sieve::Sieve;
pub use source::SourceList;
