pub mod config;
pub mod processor;
pub mod stats;

pub use config::Settings;
pub use processor::{DocumentQuestionPipeline, FileSummary, PipelineConfig, PipelineError};
pub use stats::{DirectoryStats, TimedOperation};
