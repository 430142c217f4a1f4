//! RTP parameter snapshots and transceiver init

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engine::{state, NativeTransceiverInit};
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtcpParameters {
    #[serde(default)]
    pub cname: Option<String>,
    #[serde(default)]
    pub reduced_size: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderExtensionParameters {
    pub uri: String,
    pub id: u16,
    #[serde(default)]
    pub encrypted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpCodecParameters {
    pub payload_type: u8,
    /// e.g. "video/VP8", "audio/opus"
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
}

/// One encoding of a sender or receiver, addressed by SSRC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpEncodingParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(
        default,
        rename = "maxBitrate",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_bitrate_bps: Option<u32>,
    #[serde(
        default,
        rename = "minBitrate",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_bitrate_bps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_framerate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_resolution_down_by: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssrc: Option<u32>,
}

fn default_active() -> bool {
    true
}

impl Default for RtpEncodingParameters {
    fn default() -> Self {
        Self {
            rid: None,
            active: true,
            max_bitrate_bps: None,
            min_bitrate_bps: None,
            max_framerate: None,
            scale_resolution_down_by: None,
            ssrc: None,
        }
    }
}

/// Parameter snapshot. Engines hand these out by value; edits only take
/// effect once written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RtpParameters {
    pub transaction_id: String,
    pub rtcp: RtcpParameters,
    pub header_extensions: Vec<HeaderExtensionParameters>,
    pub encodings: Vec<RtpEncodingParameters>,
    pub codecs: Vec<RtpCodecParameters>,
}

impl RtpParameters {
    pub fn encoding_by_ssrc(&self, ssrc: u32) -> Option<&RtpEncodingParameters> {
        self.encodings.iter().find(|e| e.ssrc == Some(ssrc))
    }

    pub fn encoding_by_ssrc_mut(&mut self, ssrc: u32) -> Option<&mut RtpEncodingParameters> {
        self.encodings.iter_mut().find(|e| e.ssrc == Some(ssrc))
    }
}

/// Transceiver init as sent by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransceiverInit {
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub stream_ids: Vec<String>,
    #[serde(default)]
    pub send_encodings: Vec<RtpEncodingParameters>,
}

impl TransceiverInit {
    pub fn to_native(&self) -> Result<NativeTransceiverInit> {
        let mut init = NativeTransceiverInit::default();
        if let Some(direction) = &self.direction {
            init.direction = state::parse_direction(direction)?;
        }
        init.stream_ids = self.stream_ids.clone();
        init.send_encodings = self.send_encodings.clone();
        Ok(init)
    }
}
