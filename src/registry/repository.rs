use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Handle, HandleRegistry};
use crate::engine::{
    DataChannel, EngineResult, MediaStream, MediaStreamTrack, PeerConnection, RtpReceiver,
    RtpSender, RtpTransceiver,
};
use crate::observer::{ChannelObserver, ConnectionObserver};
use crate::types::{RtpEncodingParameters, RtpParameters};

/// A registered peer connection and the observer bound to it
pub struct ConnectionEntry {
    pub native: Arc<dyn PeerConnection>,
    pub observer: Arc<ConnectionObserver>,
}

/// A registered data channel and the observer bound to it
pub struct ChannelEntry {
    pub native: Arc<dyn DataChannel>,
    pub observer: Arc<ChannelObserver>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtpSide {
    Sender,
    Receiver,
}

/// The sender or receiver an RTP parameter handle resolves to
#[derive(Clone)]
pub enum RtpOwner {
    Sender(Arc<dyn RtpSender>),
    Receiver(Arc<dyn RtpReceiver>),
}

impl RtpOwner {
    pub fn parameters(&self) -> RtpParameters {
        match self {
            RtpOwner::Sender(sender) => sender.parameters(),
            RtpOwner::Receiver(receiver) => receiver.parameters(),
        }
    }

    pub fn set_parameters(&self, parameters: RtpParameters) -> EngineResult<()> {
        match self {
            RtpOwner::Sender(sender) => sender.set_parameters(parameters),
            RtpOwner::Receiver(receiver) => receiver.set_parameters(parameters),
        }
    }
}

/// Process-wide namespace of live native objects reachable from the host
///
/// Objects are not nested per connection: a track discovered through one
/// event may be referenced long after that event, so every kind lives in a
/// flat registry of its own.
#[derive(Default)]
pub struct ObjectRepository {
    pub connections: HandleRegistry<ConnectionEntry>,
    pub streams: HandleRegistry<dyn MediaStream>,
    pub tracks: HandleRegistry<dyn MediaStreamTrack>,
    pub senders: HandleRegistry<dyn RtpSender>,
    pub receivers: HandleRegistry<dyn RtpReceiver>,
    pub transceivers: HandleRegistry<dyn RtpTransceiver>,
    pub data_channels: HandleRegistry<ChannelEntry>,
    aspect_ratios: RwLock<HashMap<String, f64>>,
    stream_ids: RwLock<HashMap<(RtpSide, String), Vec<String>>>,
}

impl ObjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream ids associated with a sender or receiver
    pub fn stream_ids_for(&self, side: RtpSide, identity: &str) -> Option<Vec<String>> {
        self.stream_ids
            .read()
            .get(&(side, identity.to_string()))
            .cloned()
    }

    /// Replace the stream id association. An empty list clears it.
    pub fn set_stream_ids_for(&self, side: RtpSide, identity: &str, ids: Vec<String>) {
        let key = (side, identity.to_string());
        let mut table = self.stream_ids.write();
        if ids.is_empty() {
            table.remove(&key);
        } else {
            table.insert(key, ids);
        }
    }

    /// Record the aspect ratio of a video track. Unregistered tracks are ignored.
    pub fn set_aspect_ratio(&self, track_id: &str, ratio: f64) -> bool {
        if !self.tracks.contains_identity(track_id) {
            return false;
        }
        self.aspect_ratios.write().insert(track_id.to_string(), ratio);
        true
    }

    pub fn aspect_ratio(&self, track_id: &str) -> Option<f64> {
        self.aspect_ratios.read().get(track_id).copied()
    }

    /// Resolve a handle to a sender, falling back to a receiver
    pub fn rtp_owner(&self, handle: &Handle) -> Option<RtpOwner> {
        if let Some(sender) = self.senders.get_by_handle(handle) {
            return Some(RtpOwner::Sender(sender));
        }
        self.receivers.get_by_handle(handle).map(RtpOwner::Receiver)
    }

    /// Copy of the encoding with `ssrc` in the owner's current parameters.
    /// Edits must be written back through [`RtpOwner::set_parameters`].
    pub fn encoding_parameters_for(
        &self,
        handle: &Handle,
        ssrc: u32,
    ) -> Option<RtpEncodingParameters> {
        self.rtp_owner(handle)?
            .parameters()
            .encoding_by_ssrc(ssrc)
            .cloned()
    }

    /// Drop every entry and side table. Native objects are not closed.
    pub fn clear(&self) {
        self.connections.clear();
        self.streams.clear();
        self.tracks.clear();
        self.senders.clear();
        self.receivers.clear();
        self.transceivers.clear();
        self.data_channels.clear();
        self.aspect_ratios.write().clear();
        self.stream_ids.write().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
            && self.streams.is_empty()
            && self.tracks.is_empty()
            && self.senders.is_empty()
            && self.receivers.is_empty()
            && self.transceivers.is_empty()
            && self.data_channels.is_empty()
    }

    /// Diagnostic listing of every registered object
    pub fn dump(&self) -> String {
        let sections = [
            ("connections", self.connections.keys()),
            ("streams", self.streams.keys()),
            ("tracks", self.tracks.keys()),
            ("senders", self.senders.keys()),
            ("receivers", self.receivers.keys()),
            ("transceivers", self.transceivers.keys()),
            ("data channels", self.data_channels.keys()),
        ];

        let mut out = String::new();
        for (kind, keys) in sections {
            let _ = writeln!(out, "{} ({})", kind, keys.len());
            for (identity, handle) in keys {
                let _ = writeln!(out, "  {} - {}", identity, handle);
            }
        }
        out
    }
}
