pub mod callbacks;
pub mod chunker;
pub mod config;
mod error;
pub mod llm;
mod reducer;
pub mod retry;
pub mod summarizer;
pub mod tools;
pub mod truncate;
mod types;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;

pub use config::ReducerConfig;
pub use reducer::{Reducer, ReducerBuilder};
pub use types::{
    ReductionRequest, ReductionResult, RoundReport, SOURCE_SEPARATOR, Summary, SummaryOutcome,
};
