//! Data channel payloads

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;

use crate::engine::{state, DataBuffer, DataChannel};
use crate::error::{BridgeError, Result};
use crate::registry::Handle;

/// Data channel init as sent by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataChannelInit {
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default)]
    pub ordered: Option<bool>,
    #[serde(default)]
    pub max_packet_life_time: Option<u16>,
    #[serde(default)]
    pub max_retransmits: Option<u16>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub negotiated: bool,
}

impl DataChannelInit {
    pub fn to_native(&self) -> Result<RTCDataChannelInit> {
        if self.max_packet_life_time.is_some() && self.max_retransmits.is_some() {
            return Err(BridgeError::InvalidArgument(
                "maxPacketLifeTime and maxRetransmits are mutually exclusive".to_string(),
            ));
        }

        // A pre-negotiated channel is identified by the id both peers agreed on
        let negotiated = if self.negotiated {
            match self.id {
                Some(id) => Some(id),
                None => {
                    return Err(BridgeError::InvalidArgument(
                        "negotiated data channel requires an id".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        Ok(RTCDataChannelInit {
            ordered: self.ordered,
            max_packet_life_time: self.max_packet_life_time,
            max_retransmits: self.max_retransmits,
            protocol: self.protocol.clone(),
            negotiated,
        })
    }
}

/// Outgoing message. Binary payloads are base64 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBuffer {
    pub binary: bool,
    pub data: String,
}

impl SendBuffer {
    pub fn to_native(&self) -> Result<DataBuffer> {
        if self.binary {
            let bytes = STANDARD.decode(self.data.as_bytes()).map_err(|e| {
                BridgeError::InvalidArgument(format!("invalid base64 payload: {}", e))
            })?;
            Ok(DataBuffer::binary(bytes))
        } else {
            Ok(DataBuffer::text(self.data.clone()))
        }
    }
}

/// Render a received payload for the host: base64 for binary, UTF-8 text otherwise
pub fn encode_payload(buffer: &DataBuffer) -> String {
    if buffer.binary {
        STANDARD.encode(&buffer.data)
    } else {
        String::from_utf8_lossy(&buffer.data).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataChannelInfo {
    pub id: Option<u16>,
    pub label: String,
    pub ready_state: String,
    pub buffered_amount: u64,
    pub handle: Handle,
}

impl DataChannelInfo {
    pub fn describe(channel: &dyn DataChannel, handle: &Handle) -> Self {
        Self {
            id: channel.id(),
            label: channel.label(),
            ready_state: state::data_channel_state_str(channel.state()).to_string(),
            buffered_amount: channel.buffered_amount(),
            handle: handle.clone(),
        }
    }
}
