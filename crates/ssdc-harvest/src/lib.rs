//! Post harvesting for accounts selected out of a source list.

pub mod client;
pub mod error;
pub mod harvester;
pub mod types;

mod retry;

pub use client::{ClientOptions, TwitterClient};
pub use error::HarvestError;
pub use harvester::Harvester;
pub use types::Post;
