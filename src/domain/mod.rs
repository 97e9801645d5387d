pub mod envelope;
pub mod errors;
pub mod event;
pub mod identity;
pub mod kind;
pub mod metric;
pub mod ports;
pub mod state;
pub mod tick;
pub mod time_unit;
pub mod values;
