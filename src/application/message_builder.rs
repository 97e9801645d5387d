use crate::domain::envelope::ReportEnvelope;
use crate::domain::ports::MessageBuilder;
use anyhow::Result;

/// Default builder: the envelope as a JSON document.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMessageBuilder;

impl MessageBuilder for JsonMessageBuilder {
    fn build(&self, envelope: &ReportEnvelope) -> Result<Option<Vec<u8>>> {
        Ok(Some(serde_json::to_vec(envelope)?))
    }
}
