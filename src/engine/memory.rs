//! In-memory engine
//!
//! A deterministic engine used by the test suite and by hosts that want to
//! exercise the bridge without a media stack. Every callback is delivered
//! synchronously on the calling thread; tests drive connection callbacks
//! through [`MemoryPeerConnection::observer`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use webrtc::data_channel::data_channel_init::RTCDataChannelInit;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;

use super::{
    CaptureDeviceEnumerator, DataBuffer, DataChannel, DataChannelObserver, EngineResult,
    MediaStream, MediaStreamTrack, NativeTransceiverInit, PeerConnection, PeerConnectionFactory,
    PeerConnectionObserver, RtpReceiver, RtpSender, RtpTransceiver, SdpObserver, VideoCapturer,
};
use crate::types::{
    CaptureFormat, MediaConstraints, MetricsSampleInfo, RtpEncodingParameters, RtpParameters,
    SdpType, SessionDescription, TrackKind, TrackState,
};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_id(prefix: &str) -> String {
    format!("{}-{}", prefix, NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

// ============================================================================
// Media
// ============================================================================

pub struct MemoryTrack {
    id: String,
    kind: TrackKind,
    enabled: AtomicBool,
    ended: AtomicBool,
}

impl MemoryTrack {
    pub fn new(id: &str, kind: TrackKind) -> Arc<dyn MediaStreamTrack> {
        Arc::new(Self {
            id: id.to_string(),
            kind,
            enabled: AtomicBool::new(true),
            ended: AtomicBool::new(false),
        })
    }
}

impl MediaStreamTrack for MemoryTrack {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn kind(&self) -> TrackKind {
        self.kind
    }

    fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn ready_state(&self) -> TrackState {
        if self.ended.load(Ordering::SeqCst) {
            TrackState::Ended
        } else {
            TrackState::Live
        }
    }
}

pub struct MemoryStream {
    id: String,
    tracks: Mutex<Vec<Arc<dyn MediaStreamTrack>>>,
}

impl MemoryStream {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            tracks: Mutex::new(Vec::new()),
        })
    }
}

impl MediaStream for MemoryStream {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn tracks(&self) -> Vec<Arc<dyn MediaStreamTrack>> {
        self.tracks.lock().clone()
    }

    fn add_track(&self, track: Arc<dyn MediaStreamTrack>) {
        self.tracks.lock().push(track);
    }
}

// ============================================================================
// RTP
// ============================================================================

/// Parameters with libwebrtc-style transaction checking: a write must carry
/// the transaction id of the latest read.
struct ParameterSlot {
    parameters: Mutex<RtpParameters>,
    rejects: AtomicBool,
}

impl ParameterSlot {
    fn new(encodings: Vec<RtpEncodingParameters>) -> Self {
        Self {
            parameters: Mutex::new(RtpParameters {
                transaction_id: next_id("tx"),
                encodings,
                ..Default::default()
            }),
            rejects: AtomicBool::new(false),
        }
    }

    fn get(&self) -> RtpParameters {
        self.parameters.lock().clone()
    }

    fn set(&self, mut parameters: RtpParameters) -> EngineResult<()> {
        if self.rejects.load(Ordering::SeqCst) {
            return Err("parameters rejected".to_string());
        }
        let mut current = self.parameters.lock();
        if parameters.transaction_id != current.transaction_id {
            return Err("stale transaction id".to_string());
        }
        parameters.transaction_id = next_id("tx");
        *current = parameters;
        Ok(())
    }

    fn set_encodings(&self, encodings: Vec<RtpEncodingParameters>) {
        self.parameters.lock().encodings = encodings;
    }
}

pub struct MemoryRtpSender {
    id: String,
    track: Option<Arc<dyn MediaStreamTrack>>,
    slot: ParameterSlot,
}

impl MemoryRtpSender {
    pub fn new(id: &str, track: Option<Arc<dyn MediaStreamTrack>>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            track,
            slot: ParameterSlot::new(vec![]),
        })
    }

    pub fn set_encodings(&self, encodings: Vec<RtpEncodingParameters>) {
        self.slot.set_encodings(encodings);
    }

    pub fn set_rejects_parameters(&self, rejects: bool) {
        self.slot.rejects.store(rejects, Ordering::SeqCst);
    }
}

impl RtpSender for MemoryRtpSender {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn track(&self) -> Option<Arc<dyn MediaStreamTrack>> {
        self.track.clone()
    }

    fn parameters(&self) -> RtpParameters {
        self.slot.get()
    }

    fn set_parameters(&self, parameters: RtpParameters) -> EngineResult<()> {
        self.slot.set(parameters)
    }
}

pub struct MemoryRtpReceiver {
    id: String,
    track: Option<Arc<dyn MediaStreamTrack>>,
    slot: ParameterSlot,
}

impl MemoryRtpReceiver {
    pub fn new(id: &str, track: Option<Arc<dyn MediaStreamTrack>>) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            track,
            slot: ParameterSlot::new(vec![]),
        })
    }

    pub fn set_encodings(&self, encodings: Vec<RtpEncodingParameters>) {
        self.slot.set_encodings(encodings);
    }
}

impl RtpReceiver for MemoryRtpReceiver {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn track(&self) -> Option<Arc<dyn MediaStreamTrack>> {
        self.track.clone()
    }

    fn parameters(&self) -> RtpParameters {
        self.slot.get()
    }

    fn set_parameters(&self, parameters: RtpParameters) -> EngineResult<()> {
        self.slot.set(parameters)
    }
}

pub struct MemoryTransceiver {
    id: String,
    mid: Mutex<Option<String>>,
    sender: Arc<dyn RtpSender>,
    receiver: Arc<dyn RtpReceiver>,
    direction: Mutex<RTCRtpTransceiverDirection>,
    current_direction: Mutex<Option<RTCRtpTransceiverDirection>>,
    stopped: AtomicBool,
}

impl MemoryTransceiver {
    pub fn new(
        id: &str,
        sender: Arc<dyn RtpSender>,
        receiver: Arc<dyn RtpReceiver>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            mid: Mutex::new(None),
            sender,
            receiver,
            direction: Mutex::new(RTCRtpTransceiverDirection::Sendrecv),
            current_direction: Mutex::new(None),
            stopped: AtomicBool::new(false),
        })
    }

    /// Simulate negotiation assigning a mid and a current direction
    pub fn negotiate(&self, mid: &str) {
        *self.mid.lock() = Some(mid.to_string());
        *self.current_direction.lock() = Some(*self.direction.lock());
    }
}

impl RtpTransceiver for MemoryTransceiver {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn mid(&self) -> Option<String> {
        self.mid.lock().clone()
    }

    fn sender(&self) -> Arc<dyn RtpSender> {
        self.sender.clone()
    }

    fn receiver(&self) -> Arc<dyn RtpReceiver> {
        self.receiver.clone()
    }

    fn direction(&self) -> RTCRtpTransceiverDirection {
        *self.direction.lock()
    }

    fn set_direction(&self, direction: RTCRtpTransceiverDirection) {
        *self.direction.lock() = direction;
    }

    fn current_direction(&self) -> Option<RTCRtpTransceiverDirection> {
        *self.current_direction.lock()
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        *self.current_direction.lock() = None;
    }

    fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Data channel
// ============================================================================

pub struct MemoryDataChannel {
    id: Option<u16>,
    label: String,
    state: Mutex<RTCDataChannelState>,
    buffered_amount: AtomicU64,
    observer: Mutex<Option<Arc<dyn DataChannelObserver>>>,
    sent: Mutex<Vec<DataBuffer>>,
}

impl MemoryDataChannel {
    pub fn new(label: &str, id: Option<u16>) -> Arc<Self> {
        Arc::new(Self {
            id,
            label: label.to_string(),
            state: Mutex::new(RTCDataChannelState::Connecting),
            buffered_amount: AtomicU64::new(0),
            observer: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
        })
    }

    fn observer(&self) -> Option<Arc<dyn DataChannelObserver>> {
        self.observer.lock().clone()
    }

    pub fn set_state(&self, state: RTCDataChannelState) {
        *self.state.lock() = state;
        if let Some(observer) = self.observer() {
            observer.on_state_change();
        }
    }

    pub fn set_buffered_amount(&self, amount: u64) {
        let previous = self.buffered_amount.swap(amount, Ordering::SeqCst);
        if let Some(observer) = self.observer() {
            observer.on_buffered_amount_change(previous);
        }
    }

    /// Deliver a message from the remote peer
    pub fn receive(&self, buffer: DataBuffer) {
        if let Some(observer) = self.observer() {
            observer.on_message(buffer);
        }
    }

    pub fn sent(&self) -> Vec<DataBuffer> {
        self.sent.lock().clone()
    }
}

impl DataChannel for MemoryDataChannel {
    fn id(&self) -> Option<u16> {
        self.id
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn state(&self) -> RTCDataChannelState {
        *self.state.lock()
    }

    fn buffered_amount(&self) -> u64 {
        self.buffered_amount.load(Ordering::SeqCst)
    }

    fn send(&self, buffer: DataBuffer) -> EngineResult<()> {
        if self.state() != RTCDataChannelState::Open {
            return Err("data channel is not open".to_string());
        }
        self.sent.lock().push(buffer);
        Ok(())
    }

    fn close(&self) {
        if self.state() == RTCDataChannelState::Closed {
            return;
        }
        self.set_state(RTCDataChannelState::Closing);
        self.set_state(RTCDataChannelState::Closed);
    }

    fn register_observer(&self, observer: Arc<dyn DataChannelObserver>) {
        *self.observer.lock() = Some(observer);
    }
}

// ============================================================================
// Peer connection
// ============================================================================

#[derive(Default)]
struct ConnectionState {
    configuration: Option<RTCConfiguration>,
    senders: Vec<Arc<dyn RtpSender>>,
    transceivers: Vec<Arc<dyn RtpTransceiver>>,
    channels: Vec<Arc<MemoryDataChannel>>,
    local_description: Option<SessionDescription>,
    remote_description: Option<SessionDescription>,
    candidates: Vec<RTCIceCandidateInit>,
    removed_candidates: Vec<RTCIceCandidateInit>,
    sdp_failure: Option<String>,
}

pub struct MemoryPeerConnection {
    observer: Mutex<Option<Arc<dyn PeerConnectionObserver>>>,
    state: Mutex<ConnectionState>,
    refuses_media: AtomicBool,
    closed: AtomicBool,
    next_ssrc: AtomicU64,
    next_channel_id: AtomicU64,
}

impl MemoryPeerConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            observer: Mutex::new(None),
            state: Mutex::new(ConnectionState::default()),
            refuses_media: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            next_ssrc: AtomicU64::new(1000),
            next_channel_id: AtomicU64::new(0),
        })
    }

    fn with_observer(observer: Arc<dyn PeerConnectionObserver>) -> Arc<Self> {
        let connection = Self::new();
        *connection.observer.lock() = Some(observer);
        connection
    }

    /// The observer registered at creation, for driving callbacks
    pub fn observer(&self) -> Option<Arc<dyn PeerConnectionObserver>> {
        self.observer.lock().clone()
    }

    /// Make the next create/set description request fail with `reason`
    pub fn fail_next_description(&self, reason: &str) {
        self.state.lock().sdp_failure = Some(reason.to_string());
    }

    /// Refuse add-track and add-transceiver requests
    pub fn set_refuses_media(&self, refuses: bool) {
        self.refuses_media.store(refuses, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn configuration(&self) -> Option<RTCConfiguration> {
        self.state.lock().configuration.clone()
    }

    pub fn local_description(&self) -> Option<SessionDescription> {
        self.state.lock().local_description.clone()
    }

    pub fn remote_description(&self) -> Option<SessionDescription> {
        self.state.lock().remote_description.clone()
    }

    pub fn candidates(&self) -> Vec<RTCIceCandidateInit> {
        self.state.lock().candidates.clone()
    }

    pub fn removed_candidates(&self) -> Vec<RTCIceCandidateInit> {
        self.state.lock().removed_candidates.clone()
    }

    pub fn senders(&self) -> Vec<Arc<dyn RtpSender>> {
        self.state.lock().senders.clone()
    }

    pub fn channels(&self) -> Vec<Arc<MemoryDataChannel>> {
        self.state.lock().channels.clone()
    }

    fn next_ssrc(&self) -> u32 {
        self.next_ssrc.fetch_add(1, Ordering::Relaxed) as u32
    }

    fn take_sdp_failure(&self) -> Option<String> {
        if self.is_closed() {
            return Some("peer connection is closed".to_string());
        }
        self.state.lock().sdp_failure.take()
    }

    fn describe(&self, sdp_type: SdpType) -> SessionDescription {
        let state = self.state.lock();
        let mut sdp = format!(
            "v=0\r\no=- {} 2 IN IP4 127.0.0.1\r\ns=-\r\nt=0 0\r\n",
            NEXT_ID.fetch_add(1, Ordering::Relaxed)
        );
        for (index, _) in state.transceivers.iter().enumerate() {
            sdp.push_str(&format!("a=mid:{}\r\n", index));
        }
        SessionDescription::new(sdp_type, sdp)
    }
}

impl PeerConnection for MemoryPeerConnection {
    fn set_configuration(&self, configuration: RTCConfiguration) -> EngineResult<()> {
        if self.is_closed() {
            return Err("peer connection is closed".to_string());
        }
        self.state.lock().configuration = Some(configuration);
        Ok(())
    }

    fn add_track(
        &self,
        track: Arc<dyn MediaStreamTrack>,
        _stream_ids: &[String],
    ) -> EngineResult<Arc<dyn RtpSender>> {
        if self.refuses_media.load(Ordering::SeqCst) || self.is_closed() {
            return Err("cannot add track".to_string());
        }
        let sender = MemoryRtpSender::new(&next_id("sender"), Some(track));
        sender.set_encodings(vec![RtpEncodingParameters {
            ssrc: Some(self.next_ssrc()),
            ..Default::default()
        }]);
        let sender: Arc<dyn RtpSender> = sender;
        self.state.lock().senders.push(sender.clone());
        Ok(sender)
    }

    fn remove_track(&self, sender: &Arc<dyn RtpSender>) -> EngineResult<()> {
        let mut state = self.state.lock();
        let id = sender.id();
        let before = state.senders.len();
        state.senders.retain(|s| s.id() != id);
        if state.senders.len() == before {
            return Err(format!("sender {} does not belong to this connection", id));
        }
        Ok(())
    }

    fn add_transceiver(
        &self,
        track: Arc<dyn MediaStreamTrack>,
        init: NativeTransceiverInit,
    ) -> EngineResult<Arc<dyn RtpTransceiver>> {
        if self.refuses_media.load(Ordering::SeqCst) || self.is_closed() {
            return Err("cannot add transceiver".to_string());
        }
        let kind = track.kind();
        let sender = MemoryRtpSender::new(&next_id("sender"), Some(track));
        let mut encodings = init.send_encodings;
        if encodings.is_empty() {
            encodings.push(RtpEncodingParameters::default());
        }
        for encoding in encodings.iter_mut() {
            if encoding.ssrc.is_none() {
                encoding.ssrc = Some(self.next_ssrc());
            }
        }
        sender.set_encodings(encodings);

        let receiver = MemoryRtpReceiver::new(
            &next_id("receiver"),
            Some(MemoryTrack::new(&next_id("remote-track"), kind)),
        );
        let transceiver = MemoryTransceiver::new(&next_id("transceiver"), sender.clone(), receiver);
        transceiver.set_direction(init.direction);

        let sender: Arc<dyn RtpSender> = sender;
        let transceiver: Arc<dyn RtpTransceiver> = transceiver;
        let mut state = self.state.lock();
        state.senders.push(sender);
        state.transceivers.push(transceiver.clone());
        Ok(transceiver)
    }

    fn create_offer(&self, _constraints: &MediaConstraints, observer: Arc<dyn SdpObserver>) {
        match self.take_sdp_failure() {
            Some(reason) => observer.on_create_failure(reason),
            None => observer.on_create_success(self.describe(SdpType::Offer)),
        }
    }

    fn create_answer(&self, _constraints: &MediaConstraints, observer: Arc<dyn SdpObserver>) {
        if let Some(reason) = self.take_sdp_failure() {
            observer.on_create_failure(reason);
            return;
        }
        let has_remote_offer = matches!(
            self.state.lock().remote_description,
            Some(SessionDescription {
                sdp_type: SdpType::Offer,
                ..
            })
        );
        if has_remote_offer {
            observer.on_create_success(self.describe(SdpType::Answer));
        } else {
            observer.on_create_failure("no remote offer".to_string());
        }
    }

    fn set_local_description(
        &self,
        description: SessionDescription,
        observer: Arc<dyn SdpObserver>,
    ) {
        match self.take_sdp_failure() {
            Some(reason) => observer.on_set_failure(reason),
            None => {
                self.state.lock().local_description = Some(description);
                observer.on_set_success();
            }
        }
    }

    fn set_remote_description(
        &self,
        description: SessionDescription,
        observer: Arc<dyn SdpObserver>,
    ) {
        match self.take_sdp_failure() {
            Some(reason) => observer.on_set_failure(reason),
            None => {
                self.state.lock().remote_description = Some(description);
                observer.on_set_success();
            }
        }
    }

    fn add_ice_candidate(&self, candidate: RTCIceCandidateInit) -> EngineResult<()> {
        let mut state = self.state.lock();
        if state.remote_description.is_none() {
            return Err("remote description is not set".to_string());
        }
        state.candidates.push(candidate);
        Ok(())
    }

    fn remove_ice_candidates(&self, candidates: &[RTCIceCandidateInit]) {
        let mut state = self.state.lock();
        state
            .candidates
            .retain(|c| !candidates.iter().any(|r| r.candidate == c.candidate));
        state.removed_candidates.extend_from_slice(candidates);
    }

    fn create_data_channel(
        &self,
        label: &str,
        init: RTCDataChannelInit,
    ) -> EngineResult<Arc<dyn DataChannel>> {
        if self.is_closed() {
            return Err("peer connection is closed".to_string());
        }
        let id = match init.negotiated {
            Some(id) => id,
            None => self.next_channel_id.fetch_add(1, Ordering::Relaxed) as u16,
        };
        let channel = MemoryDataChannel::new(label, Some(id));
        self.state.lock().channels.push(channel.clone());
        Ok(channel)
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let channels = std::mem::take(&mut self.state.lock().channels);
        for channel in channels {
            channel.close();
        }
    }
}

// ============================================================================
// Factory
// ============================================================================

#[derive(Default)]
pub struct MemoryFactory {
    connections: Mutex<Vec<Arc<MemoryPeerConnection>>>,
    refuses_connections: AtomicBool,
    metrics_enabled: AtomicBool,
    histograms: Mutex<BTreeMap<String, MetricsSampleInfo>>,
}

impl MemoryFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_refuses_connections(&self, refuses: bool) {
        self.refuses_connections.store(refuses, Ordering::SeqCst);
    }

    pub fn connections(&self) -> Vec<Arc<MemoryPeerConnection>> {
        self.connections.lock().clone()
    }

    pub fn last_connection(&self) -> Option<Arc<MemoryPeerConnection>> {
        self.connections.lock().last().cloned()
    }

    /// Record one histogram sample. Dropped until metrics are enabled.
    pub fn record_sample(&self, name: &str, min: i32, max: i32, bucket_count: i32, value: i32) {
        if !self.metrics_enabled.load(Ordering::SeqCst) {
            return;
        }
        self.histograms
            .lock()
            .entry(name.to_string())
            .or_insert_with(|| MetricsSampleInfo::new(name, min, max, bucket_count))
            .add_sample(value);
    }
}

impl PeerConnectionFactory for MemoryFactory {
    fn create_peer_connection(
        &self,
        configuration: RTCConfiguration,
        observer: Arc<dyn PeerConnectionObserver>,
    ) -> EngineResult<Arc<dyn PeerConnection>> {
        if self.refuses_connections.load(Ordering::SeqCst) {
            return Err("peer connection refused".to_string());
        }
        let connection = MemoryPeerConnection::with_observer(observer);
        connection.state.lock().configuration = Some(configuration);
        self.connections.lock().push(connection.clone());
        Ok(connection)
    }

    fn create_local_media_stream(&self, stream_id: &str) -> Arc<dyn MediaStream> {
        MemoryStream::new(stream_id)
    }

    fn create_video_track(
        &self,
        track_id: &str,
        _capturer: Option<Arc<dyn VideoCapturer>>,
    ) -> Arc<dyn MediaStreamTrack> {
        MemoryTrack::new(track_id, TrackKind::Video)
    }

    fn create_audio_track(&self, track_id: &str) -> Arc<dyn MediaStreamTrack> {
        MemoryTrack::new(track_id, TrackKind::Audio)
    }

    fn enable_metrics(&self) {
        self.metrics_enabled.store(true, Ordering::SeqCst);
    }

    fn get_and_reset_metrics(&self) -> Vec<MetricsSampleInfo> {
        std::mem::take(&mut *self.histograms.lock())
            .into_values()
            .collect()
    }
}

// ============================================================================
// Capture
// ============================================================================

#[derive(Default)]
pub struct MemoryCapturer {
    running: Mutex<Option<(u32, u32, u32)>>,
}

impl MemoryCapturer {
    /// Resolution and frame rate of the running capture
    pub fn running(&self) -> Option<(u32, u32, u32)> {
        *self.running.lock()
    }
}

impl VideoCapturer for MemoryCapturer {
    fn start_capture(&self, width: u32, height: u32, frame_rate: u32) -> EngineResult<()> {
        *self.running.lock() = Some((width, height, frame_rate));
        Ok(())
    }

    fn stop_capture(&self) {
        *self.running.lock() = None;
    }
}

struct MemoryDevice {
    name: String,
    front_facing: bool,
    formats: Vec<CaptureFormat>,
}

#[derive(Default)]
pub struct MemoryCaptureDevices {
    devices: Mutex<Vec<MemoryDevice>>,
    capturers: Mutex<HashMap<String, Arc<MemoryCapturer>>>,
    created: AtomicUsize,
}

impl MemoryCaptureDevices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&self, name: &str, front_facing: bool, formats: Vec<CaptureFormat>) {
        self.devices.lock().push(MemoryDevice {
            name: name.to_string(),
            front_facing,
            formats,
        });
    }

    /// Latest capturer created for a device
    pub fn capturer(&self, device_name: &str) -> Option<Arc<MemoryCapturer>> {
        self.capturers.lock().get(device_name).cloned()
    }

    pub fn capturers_created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

impl CaptureDeviceEnumerator for MemoryCaptureDevices {
    fn device_names(&self) -> Vec<String> {
        self.devices.lock().iter().map(|d| d.name.clone()).collect()
    }

    fn is_front_facing(&self, device_name: &str) -> bool {
        self.devices
            .lock()
            .iter()
            .any(|d| d.name == device_name && d.front_facing)
    }

    fn supported_formats(&self, device_name: &str) -> Vec<CaptureFormat> {
        self.devices
            .lock()
            .iter()
            .find(|d| d.name == device_name)
            .map(|d| d.formats.clone())
            .unwrap_or_default()
    }

    fn create_capturer(&self, device_name: &str) -> EngineResult<Arc<dyn VideoCapturer>> {
        if !self.devices.lock().iter().any(|d| d.name == device_name) {
            return Err(format!("unknown capture device {}", device_name));
        }
        let capturer = Arc::new(MemoryCapturer::default());
        self.capturers
            .lock()
            .insert(device_name.to_string(), capturer.clone());
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(capturer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_require_fresh_transaction() {
        let sender = MemoryRtpSender::new("s1", None);
        sender.set_encodings(vec![RtpEncodingParameters {
            ssrc: Some(1),
            ..Default::default()
        }]);

        let mut stale = sender.parameters();
        let mut fresh = sender.parameters();
        fresh.encodings[0].active = false;
        assert!(sender.set_parameters(fresh).is_ok());
        assert!(!sender.parameters().encodings[0].active);

        stale.encodings[0].max_bitrate_bps = Some(1);
        assert!(sender.set_parameters(stale).is_err());
    }

    #[test]
    fn test_close_closes_channels() {
        let connection = MemoryPeerConnection::new();
        let channel = connection
            .create_data_channel("chat", RTCDataChannelInit::default())
            .unwrap();
        connection.close();
        assert!(connection.is_closed());
        assert_eq!(channel.state(), RTCDataChannelState::Closed);
        assert!(connection
            .create_data_channel("late", RTCDataChannelInit::default())
            .is_err());
    }
}
