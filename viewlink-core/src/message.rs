//! Client→server control messages.
//!
//! Control traffic is UTF-8 JSON text, tagged by a `type` field:
//!
//! ```json
//! {"type":"ping"}
//! {"type":"quality","config":{"max_width":1920,...}}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ViewError;
use crate::quality::QualityProfile;
use crate::transport::TransportMessage;

/// All control messages the client sends to the producer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Heartbeat keepalive.
    Ping,
    /// Announce the active quality profile.
    Quality { config: QualityProfile },
}

impl ControlMessage {
    /// Serialize to the wire text form.
    pub fn to_text(&self) -> Result<String, ViewError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Wrap as a transport message.
    pub fn to_transport(&self) -> Result<TransportMessage, ViewError> {
        Ok(TransportMessage::Text(self.to_text()?))
    }
}
