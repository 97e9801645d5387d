use crate::domain::metric::GaugeMetric;
use anyhow::Result;
use serde::Serialize;
use std::fmt;
use std::sync::{PoisonError, RwLock};

/// Gauge holding the last value set on it.
#[derive(Debug, Default)]
pub struct ValueGauge {
    value: RwLock<Option<serde_json::Value>>,
}

impl ValueGauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Serialize>(&self, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
        Ok(())
    }

    pub fn clear(&self) {
        *self.value.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl GaugeMetric for ValueGauge {
    fn value(&self) -> Result<Option<serde_json::Value>> {
        Ok(self
            .value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

type GaugeFn = dyn Fn() -> Result<Option<serde_json::Value>> + Send + Sync;

/// Gauge computed on every read.
pub struct CallbackGauge {
    read: Box<GaugeFn>,
}

impl CallbackGauge {
    pub fn new<F>(read: F) -> Self
    where
        F: Fn() -> Result<Option<serde_json::Value>> + Send + Sync + 'static,
    {
        Self {
            read: Box::new(read),
        }
    }
}

impl GaugeMetric for CallbackGauge {
    fn value(&self) -> Result<Option<serde_json::Value>> {
        (self.read)()
    }
}

impl fmt::Debug for CallbackGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CallbackGauge")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_gauge_keeps_any_shape() {
        let gauge = ValueGauge::new();
        assert_eq!(gauge.value().unwrap(), None);

        gauge.set(&json!({"state": "green", "nodes": 3})).unwrap();
        assert_eq!(
            gauge.value().unwrap(),
            Some(json!({"state": "green", "nodes": 3}))
        );

        gauge.set(&42.5).unwrap();
        assert_eq!(gauge.value().unwrap(), Some(json!(42.5)));

        gauge.clear();
        assert_eq!(gauge.value().unwrap(), None);
    }

    #[test]
    fn test_callback_gauge_propagates_errors() {
        let gauge = CallbackGauge::new(|| anyhow::bail!("sensor read failed"));
        assert!(gauge.value().is_err());
    }
}
