pub mod diagnostics;
pub mod extractors;
pub mod message_builder;
pub mod options;
pub(crate) mod pipeline;
pub mod reporter;
pub mod subject_resolver;
pub mod suppression;

pub use options::ReporterOptions;
pub use reporter::{MetricReporter, MetricReporterBuilder};
