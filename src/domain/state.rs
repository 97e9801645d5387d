use std::fmt;

/// Lifecycle of a reporter.
///
/// `Stopped -> Starting -> Running -> Stopping -> Stopped`. A failed connect
/// moves `Starting` straight back to `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

impl fmt::Display for ReporterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReporterState::Stopped => "stopped",
            ReporterState::Starting => "starting",
            ReporterState::Running => "running",
            ReporterState::Stopping => "stopping",
        };
        f.write_str(label)
    }
}
