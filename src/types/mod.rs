//! Explicit payload types crossing the host boundary
//!
//! Host-bound structs serialize with the camelCase field names the scripting
//! layer expects; host-originated structs validate themselves when converted
//! to their engine counterpart.

pub mod channel;
pub mod media;
pub mod metrics;
pub mod rtp;
pub mod signaling;

pub use channel::{encode_payload, DataChannelInfo, DataChannelInit, SendBuffer};
pub use media::{
    CaptureFormat, FacingMode, FramerateRange, MediaStreamConstraints, ReceiverInfo, SenderInfo,
    TrackInfo, TrackKind, TrackState, TransceiverInfo, UserMedia, VideoConstraints,
};
pub use metrics::MetricsSampleInfo;
pub use rtp::{
    HeaderExtensionParameters, RtcpParameters, RtpCodecParameters, RtpEncodingParameters,
    RtpParameters, TransceiverInit,
};
pub use signaling::{Configuration, IceCandidate, IceServer, MediaConstraints, SdpType, SessionDescription};
