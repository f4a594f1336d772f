pub mod config;
pub mod dataset;
pub mod index;
pub mod metrics;
pub mod telemetry;

pub use index::{
    new, noop, with_logs, with_metrics, with_trace, Attribute, BoxedIndexer, Config, IndexError,
    Indexer, Result,
};
