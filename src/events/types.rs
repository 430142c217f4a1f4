//! Host-bound event types
//!
//! Defines every event the bridge pushes to the scripting host.

use serde::{Deserialize, Serialize};

use crate::registry::Handle;
use crate::types::{IceCandidate, ReceiverInfo, TransceiverInfo};

/// Host event enumeration
///
/// Serialized as:
/// ```json
/// {
///   "event": "channelStateChanged",
///   "data": { "handle": "…", "state": "open" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum HostEvent {
    // ============================================================================
    // Connection Events
    // ============================================================================
    #[serde(rename = "connectionSignalingStateChanged")]
    ConnectionSignalingStateChanged { handle: Handle, state: String },

    /// Overall connection state ("new", "connecting", "connected", ...)
    #[serde(rename = "connectionConnectionStateChanged")]
    ConnectionConnectionStateChanged { handle: Handle, state: String },

    #[serde(rename = "connectionIceConnectionStateChanged")]
    ConnectionIceConnectionStateChanged { handle: Handle, state: String },

    #[serde(rename = "connectionIceGatheringStateChanged")]
    ConnectionIceGatheringStateChanged { handle: Handle, state: String },

    /// Local ICE candidate gathered
    #[serde(rename = "connectionGotIceCandidate")]
    ConnectionGotIceCandidate {
        handle: Handle,
        candidate: IceCandidate,
    },

    /// Remote track discovered through a receiver
    #[serde(rename = "connectionAddedReceiver")]
    ConnectionAddedReceiver {
        handle: Handle,
        receiver: ReceiverInfo,
    },

    /// Transceiver discovered by the unified negotiation model
    #[serde(rename = "connectionStartedTransceiver")]
    ConnectionStartedTransceiver {
        handle: Handle,
        transceiver: TransceiverInfo,
    },

    #[serde(rename = "connectionShouldNegotiate")]
    ConnectionShouldNegotiate { handle: Handle },

    // ============================================================================
    // Data Channel Events
    // ============================================================================
    #[serde(rename = "channelStateChanged")]
    ChannelStateChanged { handle: Handle, state: String },

    /// Absolute buffered byte count, never the delta
    #[serde(rename = "channelBufferedAmountChanged")]
    ChannelBufferedAmountChanged { handle: Handle, amount: u64 },

    /// `data` is base64 when `binary` is set, UTF-8 text otherwise
    #[serde(rename = "channelMessageReceived")]
    ChannelMessageReceived {
        handle: Handle,
        binary: bool,
        data: String,
    },
}

impl HostEvent {
    /// Get the event name (for filtering and logging)
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::ConnectionSignalingStateChanged { .. } => "connectionSignalingStateChanged",
            Self::ConnectionConnectionStateChanged { .. } => "connectionConnectionStateChanged",
            Self::ConnectionIceConnectionStateChanged { .. } => {
                "connectionIceConnectionStateChanged"
            }
            Self::ConnectionIceGatheringStateChanged { .. } => {
                "connectionIceGatheringStateChanged"
            }
            Self::ConnectionGotIceCandidate { .. } => "connectionGotIceCandidate",
            Self::ConnectionAddedReceiver { .. } => "connectionAddedReceiver",
            Self::ConnectionStartedTransceiver { .. } => "connectionStartedTransceiver",
            Self::ConnectionShouldNegotiate { .. } => "connectionShouldNegotiate",
            Self::ChannelStateChanged { .. } => "channelStateChanged",
            Self::ChannelBufferedAmountChanged { .. } => "channelBufferedAmountChanged",
            Self::ChannelMessageReceived { .. } => "channelMessageReceived",
        }
    }

    /// Handle of the connection or channel the event belongs to
    pub fn handle(&self) -> &Handle {
        match self {
            Self::ConnectionSignalingStateChanged { handle, .. }
            | Self::ConnectionConnectionStateChanged { handle, .. }
            | Self::ConnectionIceConnectionStateChanged { handle, .. }
            | Self::ConnectionIceGatheringStateChanged { handle, .. }
            | Self::ConnectionGotIceCandidate { handle, .. }
            | Self::ConnectionAddedReceiver { handle, .. }
            | Self::ConnectionStartedTransceiver { handle, .. }
            | Self::ConnectionShouldNegotiate { handle }
            | Self::ChannelStateChanged { handle, .. }
            | Self::ChannelBufferedAmountChanged { handle, .. }
            | Self::ChannelMessageReceived { handle, .. } => handle,
        }
    }
}
