//! Connection configuration and signaling payloads

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::policy::bundle_policy::RTCBundlePolicy;
use webrtc::peer_connection::policy::ice_transport_policy::RTCIceTransportPolicy;
use webrtc::peer_connection::policy::rtcp_mux_policy::RTCRtcpMuxPolicy;

use crate::error::{BridgeError, Result};

/// ICE server entry of a connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

impl IceServer {
    fn to_native(&self) -> Result<RTCIceServer> {
        if self.urls.is_empty() {
            return Err(BridgeError::InvalidArgument(
                "ICE server urls is empty".to_string(),
            ));
        }

        Ok(RTCIceServer {
            urls: self.urls.clone(),
            username: self.username.clone().unwrap_or_default(),
            credential: self.credential.clone().unwrap_or_default(),
            ..Default::default()
        })
    }
}

/// Connection configuration as sent by the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub ice_servers: Vec<IceServer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ice_transport_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdp_semantics: Option<String>,
}

impl Configuration {
    /// Build the engine configuration. `fallback` is used when the host sent
    /// no ICE servers at all.
    pub fn to_native(&self, fallback: &[IceServer]) -> Result<RTCConfiguration> {
        let servers = if self.ice_servers.is_empty() {
            fallback
        } else {
            &self.ice_servers
        };
        let ice_servers = servers
            .iter()
            .map(IceServer::to_native)
            .collect::<Result<Vec<_>>>()?;

        let ice_transport_policy = match self.ice_transport_policy.as_deref() {
            None | Some("all") => RTCIceTransportPolicy::All,
            Some("relay") => RTCIceTransportPolicy::Relay,
            Some(other) => {
                return Err(BridgeError::InvalidArgument(format!(
                    "unsupported ICE transport policy '{}'",
                    other
                )))
            }
        };

        // Only the unified negotiation model is driven by the observers
        match self.sdp_semantics.as_deref() {
            None | Some("unified") | Some("planb") => {}
            Some(other) => {
                return Err(BridgeError::InvalidArgument(format!(
                    "invalid SDP semantics '{}'",
                    other
                )))
            }
        }

        Ok(RTCConfiguration {
            ice_servers,
            ice_transport_policy,
            bundle_policy: RTCBundlePolicy::MaxBundle,
            rtcp_mux_policy: RTCRtcpMuxPolicy::Require,
            ..Default::default()
        })
    }
}

/// Session description type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Pranswer,
    Answer,
    Rollback,
}

impl std::fmt::Display for SdpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SdpType::Offer => write!(f, "offer"),
            SdpType::Pranswer => write!(f, "pranswer"),
            SdpType::Answer => write!(f, "answer"),
            SdpType::Rollback => write!(f, "rollback"),
        }
    }
}

/// Session description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn new(sdp_type: SdpType, sdp: impl Into<String>) -> Self {
        Self {
            sdp_type,
            sdp: sdp.into(),
        }
    }
}

/// ICE candidate as exchanged with the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IceCandidate {
    /// Candidate line
    #[serde(default)]
    pub sdp: String,
    #[serde(rename = "sdpMLineIndex")]
    pub sdp_mline_index: u16,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
}

impl IceCandidate {
    pub fn to_native(&self) -> RTCIceCandidateInit {
        RTCIceCandidateInit {
            candidate: self.sdp.clone(),
            sdp_mid: self.sdp_mid.clone(),
            sdp_mline_index: Some(self.sdp_mline_index),
            username_fragment: None,
        }
    }

    pub fn from_native(candidate: &RTCIceCandidateInit) -> Self {
        Self {
            sdp: candidate.candidate.clone(),
            sdp_mline_index: candidate.sdp_mline_index.unwrap_or(0),
            sdp_mid: candidate.sdp_mid.clone(),
        }
    }
}

/// Legacy offer/answer constraints
///
/// Values are passed to the engine as strings; booleans and numbers are
/// rendered with their JSON text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaConstraints {
    #[serde(default)]
    pub mandatory: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub optional: Vec<BTreeMap<String, serde_json::Value>>,
}

impl MediaConstraints {
    fn pair(key: &str, value: &serde_json::Value) -> (String, String) {
        let value = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        (key.to_string(), value)
    }

    pub fn mandatory_pairs(&self) -> Vec<(String, String)> {
        self.mandatory
            .iter()
            .map(|(k, v)| Self::pair(k, v))
            .collect()
    }

    pub fn optional_pairs(&self) -> Vec<(String, String)> {
        self.optional
            .iter()
            .flat_map(|entry| entry.iter().map(|(k, v)| Self::pair(k, v)))
            .collect()
    }
}
