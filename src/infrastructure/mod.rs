pub mod clock;
pub mod mock;
pub mod nats;
pub mod registry;
pub mod scheduler;

pub use clock::{ManualClock, SystemClock};
pub use mock::{MockTransport, RecordingDiagnostics};
pub use nats::NatsTransport;
pub use registry::InMemoryRegistry;
pub use scheduler::{IntervalScheduler, ManualScheduler};
