//! Native engine seam
//!
//! The bridge never talks to a concrete RTC stack directly. Whatever engine
//! the host links (libwebrtc, webrtc-rs, a platform SDK) is adapted to the
//! traits in this module:
//!
//! ```text
//!  host command ──> RtcBridge ──> PeerConnection / DataChannel  (commands)
//!                                      │
//!        engine worker threads ────────┘
//!                │
//!                v
//!  PeerConnectionObserver / DataChannelObserver / SdpObserver  (callbacks)
//! ```
//!
//! State vocabulary (ICE, signaling, data channel states, transceiver
//! directions, ICE candidates) is shared with the `webrtc` crate so an adapter
//! over `RTCPeerConnection` is a thin layer.
//!
//! Every callback may be invoked from any engine thread, possibly
//! concurrently with other callbacks for the same object.

pub mod memory;
pub mod state;

use std::sync::Arc;

use bytes::Bytes;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gathering_state::RTCIceGatheringState;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;

use crate::types::{
    CaptureFormat, MediaConstraints, MetricsSampleInfo, RtpEncodingParameters, RtpParameters,
    SessionDescription, TrackKind, TrackState,
};

/// Engine-side result; the error is the engine's own diagnostic string
pub type EngineResult<T> = std::result::Result<T, String>;

/// Data channel payload as the engine sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBuffer {
    pub data: Bytes,
    pub binary: bool,
}

impl DataBuffer {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            data: Bytes::from(text.into()),
            binary: false,
        }
    }

    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            binary: true,
        }
    }
}

/// Transceiver creation parameters handed to the engine
#[derive(Debug, Clone)]
pub struct NativeTransceiverInit {
    pub direction: RTCRtpTransceiverDirection,
    pub stream_ids: Vec<String>,
    pub send_encodings: Vec<RtpEncodingParameters>,
}

impl Default for NativeTransceiverInit {
    fn default() -> Self {
        Self {
            direction: RTCRtpTransceiverDirection::Sendrecv,
            stream_ids: vec![],
            send_encodings: vec![],
        }
    }
}

pub trait MediaStreamTrack: Send + Sync {
    fn id(&self) -> String;
    fn kind(&self) -> TrackKind;
    fn enabled(&self) -> bool;
    fn set_enabled(&self, enabled: bool);
    fn ready_state(&self) -> TrackState;
}

pub trait MediaStream: Send + Sync {
    fn id(&self) -> String;
    fn tracks(&self) -> Vec<Arc<dyn MediaStreamTrack>>;
    fn add_track(&self, track: Arc<dyn MediaStreamTrack>);
}

pub trait RtpSender: Send + Sync {
    fn id(&self) -> String;
    fn track(&self) -> Option<Arc<dyn MediaStreamTrack>>;
    /// Snapshot of the current parameters. Changes take effect only through
    /// [`RtpSender::set_parameters`].
    fn parameters(&self) -> RtpParameters;
    fn set_parameters(&self, parameters: RtpParameters) -> EngineResult<()>;
}

pub trait RtpReceiver: Send + Sync {
    fn id(&self) -> String;
    fn track(&self) -> Option<Arc<dyn MediaStreamTrack>>;
    /// Snapshot of the current parameters
    fn parameters(&self) -> RtpParameters;
    fn set_parameters(&self, parameters: RtpParameters) -> EngineResult<()>;
}

pub trait RtpTransceiver: Send + Sync {
    /// Stable engine identity. Unlike the mid it exists before negotiation.
    fn id(&self) -> String;
    fn mid(&self) -> Option<String>;
    fn sender(&self) -> Arc<dyn RtpSender>;
    fn receiver(&self) -> Arc<dyn RtpReceiver>;
    fn direction(&self) -> RTCRtpTransceiverDirection;
    fn set_direction(&self, direction: RTCRtpTransceiverDirection);
    fn current_direction(&self) -> Option<RTCRtpTransceiverDirection>;
    fn stop(&self);
    fn is_stopped(&self) -> bool;
}

pub trait DataChannel: Send + Sync {
    /// SCTP stream id, unassigned until negotiated
    fn id(&self) -> Option<u16>;
    fn label(&self) -> String;
    fn state(&self) -> RTCDataChannelState;
    fn buffered_amount(&self) -> u64;
    fn send(&self, buffer: DataBuffer) -> EngineResult<()>;
    fn close(&self);
    fn register_observer(&self, observer: Arc<dyn DataChannelObserver>);
}

pub trait PeerConnection: Send + Sync {
    fn set_configuration(&self, configuration: RTCConfiguration) -> EngineResult<()>;
    fn add_track(
        &self,
        track: Arc<dyn MediaStreamTrack>,
        stream_ids: &[String],
    ) -> EngineResult<Arc<dyn RtpSender>>;
    fn remove_track(&self, sender: &Arc<dyn RtpSender>) -> EngineResult<()>;
    fn add_transceiver(
        &self,
        track: Arc<dyn MediaStreamTrack>,
        init: NativeTransceiverInit,
    ) -> EngineResult<Arc<dyn RtpTransceiver>>;
    fn create_offer(&self, constraints: &MediaConstraints, observer: Arc<dyn SdpObserver>);
    fn create_answer(&self, constraints: &MediaConstraints, observer: Arc<dyn SdpObserver>);
    fn set_local_description(&self, description: SessionDescription, observer: Arc<dyn SdpObserver>);
    fn set_remote_description(&self, description: SessionDescription, observer: Arc<dyn SdpObserver>);
    fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> EngineResult<()>;
    fn remove_ice_candidates(&self, candidates: &[RTCIceCandidateInit]);
    fn create_data_channel(
        &self,
        label: &str,
        init: RTCDataChannelInit,
    ) -> EngineResult<Arc<dyn DataChannel>>;
    /// Release the native connection. Must not be called from inside one of
    /// its own observer callbacks.
    fn close(&self);
}

pub trait VideoCapturer: Send + Sync {
    fn start_capture(&self, width: u32, height: u32, frame_rate: u32) -> EngineResult<()>;
    fn stop_capture(&self);
}

pub trait CaptureDeviceEnumerator: Send + Sync {
    fn device_names(&self) -> Vec<String>;
    fn is_front_facing(&self, device_name: &str) -> bool;
    fn supported_formats(&self, device_name: &str) -> Vec<CaptureFormat>;
    fn create_capturer(&self, device_name: &str) -> EngineResult<Arc<dyn VideoCapturer>>;
}

pub trait PeerConnectionFactory: Send + Sync {
    fn create_peer_connection(
        &self,
        configuration: RTCConfiguration,
        observer: Arc<dyn PeerConnectionObserver>,
    ) -> EngineResult<Arc<dyn PeerConnection>>;
    fn create_local_media_stream(&self, stream_id: &str) -> Arc<dyn MediaStream>;
    fn create_video_track(
        &self,
        track_id: &str,
        capturer: Option<Arc<dyn VideoCapturer>>,
    ) -> Arc<dyn MediaStreamTrack>;
    fn create_audio_track(&self, track_id: &str) -> Arc<dyn MediaStreamTrack>;
    /// Start collecting engine histograms. Collection is process-wide.
    fn enable_metrics(&self);
    /// Histograms collected since the previous call; collection restarts empty
    fn get_and_reset_metrics(&self) -> Vec<MetricsSampleInfo>;
}

/// Callbacks for one peer connection
pub trait PeerConnectionObserver: Send + Sync {
    fn on_signaling_change(&self, state: RTCSignalingState);
    fn on_connection_change(&self, state: RTCPeerConnectionState);
    fn on_ice_connection_change(&self, state: RTCIceConnectionState);
    fn on_ice_gathering_change(&self, state: RTCIceGatheringState);
    fn on_ice_candidate(&self, candidate: RTCIceCandidateInit);
    fn on_ice_candidates_removed(&self, candidates: Vec<RTCIceCandidateInit>);
    fn on_add_stream(&self, stream: Arc<dyn MediaStream>);
    fn on_remove_stream(&self, stream: Arc<dyn MediaStream>);
    fn on_add_track(&self, receiver: Arc<dyn RtpReceiver>, streams: Vec<Arc<dyn MediaStream>>);
    fn on_track(&self, transceiver: Arc<dyn RtpTransceiver>);
    fn on_data_channel(&self, channel: Arc<dyn DataChannel>);
    fn on_renegotiation_needed(&self);
}

/// Callbacks for one data channel
pub trait DataChannelObserver: Send + Sync {
    /// The new state is read back from the channel
    fn on_state_change(&self);
    fn on_buffered_amount_change(&self, previous_amount: u64);
    fn on_message(&self, buffer: DataBuffer);
}

/// Completion callbacks for one create/set description request.
///
/// Exactly one of the four is expected per request.
pub trait SdpObserver: Send + Sync {
    fn on_create_success(&self, description: SessionDescription);
    fn on_set_success(&self);
    fn on_create_failure(&self, error: String);
    fn on_set_failure(&self, error: String);
}
