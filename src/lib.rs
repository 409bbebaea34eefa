pub mod config;
pub mod convert;
pub mod episodes;
pub mod error;
pub mod fetch;
pub mod pipeline;

pub use config::{ErrorPolicy, FetcherConfig};
pub use error::FetchError;
pub use pipeline::{EpisodeFetcher, Outcome, RunSummary};
