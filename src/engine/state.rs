//! Translation between engine state enums and the host's state strings

use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gathering_state::RTCIceGatheringState;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;

use crate::error::{BridgeError, Result};

/// Reported for engine values outside the documented set
const UNKNOWN: &str = "unknown";

pub fn signaling_state_str(state: RTCSignalingState) -> &'static str {
    match state {
        RTCSignalingState::Stable => "stable",
        RTCSignalingState::HaveLocalOffer => "have-local-offer",
        RTCSignalingState::HaveLocalPranswer => "have-local-pranswer",
        RTCSignalingState::HaveRemoteOffer => "have-remote-offer",
        RTCSignalingState::HaveRemotePranswer => "have-remote-pranswer",
        RTCSignalingState::Closed => "closed",
        _ => UNKNOWN,
    }
}

pub fn connection_state_str(state: RTCPeerConnectionState) -> &'static str {
    match state {
        RTCPeerConnectionState::New => "new",
        RTCPeerConnectionState::Connecting => "connecting",
        RTCPeerConnectionState::Connected => "connected",
        RTCPeerConnectionState::Disconnected => "disconnected",
        RTCPeerConnectionState::Failed => "failed",
        RTCPeerConnectionState::Closed => "closed",
        _ => UNKNOWN,
    }
}

pub fn ice_connection_state_str(state: RTCIceConnectionState) -> &'static str {
    match state {
        RTCIceConnectionState::New => "new",
        RTCIceConnectionState::Checking => "checking",
        RTCIceConnectionState::Connected => "connected",
        RTCIceConnectionState::Completed => "completed",
        RTCIceConnectionState::Failed => "failed",
        RTCIceConnectionState::Disconnected => "disconnected",
        RTCIceConnectionState::Closed => "closed",
        _ => UNKNOWN,
    }
}

/// ICE connection states after which the connection is torn down
pub fn is_terminal_ice_state(state: RTCIceConnectionState) -> bool {
    matches!(
        state,
        RTCIceConnectionState::Failed
            | RTCIceConnectionState::Disconnected
            | RTCIceConnectionState::Closed
    )
}

pub fn ice_gathering_state_str(state: RTCIceGatheringState) -> &'static str {
    match state {
        RTCIceGatheringState::New => "new",
        RTCIceGatheringState::Gathering => "gathering",
        RTCIceGatheringState::Complete => "complete",
        _ => UNKNOWN,
    }
}

pub fn data_channel_state_str(state: RTCDataChannelState) -> &'static str {
    match state {
        RTCDataChannelState::Connecting => "connecting",
        RTCDataChannelState::Open => "open",
        RTCDataChannelState::Closing => "closing",
        RTCDataChannelState::Closed => "closed",
        _ => UNKNOWN,
    }
}

pub fn direction_str(direction: RTCRtpTransceiverDirection) -> &'static str {
    match direction {
        RTCRtpTransceiverDirection::Sendrecv => "sendrecv",
        RTCRtpTransceiverDirection::Sendonly => "sendonly",
        RTCRtpTransceiverDirection::Recvonly => "recvonly",
        RTCRtpTransceiverDirection::Inactive => "inactive",
        _ => UNKNOWN,
    }
}

pub fn parse_direction(value: &str) -> Result<RTCRtpTransceiverDirection> {
    match value {
        "sendrecv" => Ok(RTCRtpTransceiverDirection::Sendrecv),
        "sendonly" => Ok(RTCRtpTransceiverDirection::Sendonly),
        "recvonly" => Ok(RTCRtpTransceiverDirection::Recvonly),
        "inactive" => Ok(RTCRtpTransceiverDirection::Inactive),
        other => Err(BridgeError::InvalidArgument(format!(
            "invalid transceiver direction '{}'",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_ice_states() {
        assert!(is_terminal_ice_state(RTCIceConnectionState::Failed));
        assert!(is_terminal_ice_state(RTCIceConnectionState::Disconnected));
        assert!(is_terminal_ice_state(RTCIceConnectionState::Closed));
        assert!(!is_terminal_ice_state(RTCIceConnectionState::Completed));
        assert!(!is_terminal_ice_state(RTCIceConnectionState::Checking));
    }

    #[test]
    fn test_signaling_strings() {
        assert_eq!(
            signaling_state_str(RTCSignalingState::HaveRemotePranswer),
            "have-remote-pranswer"
        );
        assert_eq!(signaling_state_str(RTCSignalingState::Unspecified), UNKNOWN);
    }

    #[test]
    fn test_direction_round_trip() {
        for name in ["sendrecv", "sendonly", "recvonly", "inactive"] {
            assert_eq!(direction_str(parse_direction(name).unwrap()), name);
        }
        assert!(parse_direction("both").is_err());
    }
}
