//! Media payloads: tracks, senders, receivers, transceivers, capture constraints

use serde::{Deserialize, Serialize};

use crate::engine::{state, MediaStreamTrack, RtpReceiver, RtpSender, RtpTransceiver};
use crate::registry::{Handle, ObjectRepository, RtpSide};

use super::rtp::RtpParameters;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    Live,
    Ended,
}

/// Camera facing direction. "user" is the front camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    User,
    Environment,
}

impl FacingMode {
    pub fn is_front(&self) -> bool {
        matches!(self, FacingMode::User)
    }
}

/// Inclusive frame rate range in frames per second
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramerateRange {
    pub min: u32,
    pub max: u32,
}

impl FramerateRange {
    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, fps: u32) -> bool {
        self.min <= fps && fps <= self.max
    }

    pub fn clamp(&self, fps: u32) -> u32 {
        fps.min(self.max).max(self.min)
    }
}

/// Capture format supported by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFormat {
    pub width: u32,
    pub height: u32,
    pub framerate: FramerateRange,
}

impl CaptureFormat {
    pub fn new(width: u32, height: u32, min_fps: u32, max_fps: u32) -> Self {
        Self {
            width,
            height,
            framerate: FramerateRange::new(min_fps, max_fps),
        }
    }
}

/// Video part of a user media request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoConstraints {
    #[serde(default)]
    pub facing_mode: Option<FacingMode>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
    #[serde(default)]
    pub frame_rate: u32,
    #[serde(default)]
    pub aspect_ratio: Option<f64>,
}

/// User media request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaStreamConstraints {
    #[serde(default)]
    pub video: Option<VideoConstraints>,
    #[serde(default)]
    pub audio: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub id: String,
    pub enabled: bool,
    pub kind: TrackKind,
    pub ready_state: TrackState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
}

impl TrackInfo {
    pub fn describe(track: &dyn MediaStreamTrack, repository: &ObjectRepository) -> Self {
        let id = track.id();
        Self {
            handle: repository.tracks.handle_of(&id),
            id,
            enabled: track.enabled(),
            kind: track.kind(),
            ready_state: track.ready_state(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderInfo {
    pub id: String,
    pub parameters: RtpParameters,
    pub stream_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackInfo>,
}

impl SenderInfo {
    pub fn describe(sender: &dyn RtpSender, repository: &ObjectRepository) -> Self {
        let id = sender.id();
        Self {
            parameters: sender.parameters(),
            stream_ids: repository.stream_ids_for(RtpSide::Sender, &id).unwrap_or_default(),
            handle: repository.senders.handle_of(&id),
            track: sender
                .track()
                .map(|track| TrackInfo::describe(track.as_ref(), repository)),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverInfo {
    pub id: String,
    pub parameters: RtpParameters,
    pub stream_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<TrackInfo>,
}

impl ReceiverInfo {
    pub fn describe(receiver: &dyn RtpReceiver, repository: &ObjectRepository) -> Self {
        let id = receiver.id();
        Self {
            parameters: receiver.parameters(),
            stream_ids: repository.stream_ids_for(RtpSide::Receiver, &id).unwrap_or_default(),
            handle: repository.receivers.handle_of(&id),
            track: receiver
                .track()
                .map(|track| TrackInfo::describe(track.as_ref(), repository)),
            id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransceiverInfo {
    pub mid: Option<String>,
    pub sender: SenderInfo,
    pub receiver: ReceiverInfo,
    pub stopped: bool,
    pub direction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<Handle>,
}

impl TransceiverInfo {
    pub fn describe(transceiver: &dyn RtpTransceiver, repository: &ObjectRepository) -> Self {
        Self {
            mid: transceiver.mid(),
            sender: SenderInfo::describe(transceiver.sender().as_ref(), repository),
            receiver: ReceiverInfo::describe(transceiver.receiver().as_ref(), repository),
            stopped: transceiver.is_stopped(),
            direction: state::direction_str(transceiver.direction()).to_string(),
            handle: repository.transceivers.handle_of(&transceiver.id()),
        }
    }
}

/// Result of acquiring the capture device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMedia {
    pub stream_id: String,
    pub tracks: Vec<TrackInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framerate_range() {
        let range = FramerateRange::new(15, 30);
        assert!(range.contains(15));
        assert!(range.contains(30));
        assert!(!range.contains(10));
        assert_eq!(range.clamp(60), 30);
        assert_eq!(range.clamp(5), 15);
        assert_eq!(range.clamp(24), 24);
    }

    #[test]
    fn test_constraints_parse() {
        let constraints: MediaStreamConstraints = serde_json::from_str(
            r#"{"video":{"facingMode":"environment","width":1280,"height":720,"frameRate":30},"audio":true}"#,
        )
        .unwrap();
        let video = constraints.video.unwrap();
        assert_eq!(video.facing_mode, Some(FacingMode::Environment));
        assert_eq!((video.width, video.height), (1280, 720));
        assert!(constraints.audio);
    }

    #[test]
    fn test_unknown_facing_mode_rejected() {
        let parsed: Result<VideoConstraints, _> =
            serde_json::from_str(r#"{"facingMode":"left"}"#);
        assert!(parsed.is_err());
    }
}
