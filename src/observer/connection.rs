//! Peer connection lifecycle observer

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
use webrtc::ice_transport::ice_gathering_state::RTCIceGatheringState;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::signaling_state::RTCSignalingState;

use super::TeardownQueue;
use crate::engine::{
    state, DataChannel, MediaStream, MediaStreamTrack, PeerConnection, PeerConnectionObserver,
    RtpReceiver, RtpTransceiver,
};
use crate::events::{EventBus, HostEvent};
use crate::registry::{Handle, ObjectRepository, RtpSide};
use crate::types::{IceCandidate, ReceiverInfo, TransceiverInfo};

struct Binding {
    handle: Handle,
    connection: Arc<dyn PeerConnection>,
}

/// Reacts to engine callbacks for one connection
///
/// Bound to its connection after creation. Once a terminal ICE state hands
/// the connection to the teardown queue the binding is cleared, and every
/// later callback is ignored.
pub struct ConnectionObserver {
    binding: Mutex<Option<Binding>>,
    repository: Arc<ObjectRepository>,
    events: Arc<EventBus>,
    teardown: TeardownQueue,
}

impl ConnectionObserver {
    pub fn new(
        repository: Arc<ObjectRepository>,
        events: Arc<EventBus>,
        teardown: TeardownQueue,
    ) -> Self {
        Self {
            binding: Mutex::new(None),
            repository,
            events,
            teardown,
        }
    }

    pub fn bind(&self, handle: Handle, connection: Arc<dyn PeerConnection>) {
        *self.binding.lock() = Some(Binding { handle, connection });
    }

    /// Forget the bound connection. Returns its handle if it was still bound.
    pub fn unbind(&self) -> Option<Handle> {
        self.binding.lock().take().map(|b| b.handle)
    }

    pub fn handle(&self) -> Option<Handle> {
        self.binding.lock().as_ref().map(|b| b.handle.clone())
    }

    pub fn is_bound(&self) -> bool {
        self.binding.lock().is_some()
    }

    fn connection(&self) -> Option<Arc<dyn PeerConnection>> {
        self.binding.lock().as_ref().map(|b| b.connection.clone())
    }

    /// Take the binding and hand the connection to the teardown queue.
    /// Only the first caller gets the binding.
    fn close_and_finish(&self) {
        let Some(binding) = self.binding.lock().take() else {
            return;
        };
        self.teardown.schedule(binding.handle, binding.connection);
    }

    fn register_track(&self, track: Option<Arc<dyn MediaStreamTrack>>) {
        if let Some(track) = track {
            self.repository.tracks.register(track.id(), track);
        }
    }
}

impl PeerConnectionObserver for ConnectionObserver {
    fn on_signaling_change(&self, signaling_state: RTCSignalingState) {
        let Some(handle) = self.handle() else { return };
        let state = state::signaling_state_str(signaling_state);
        debug!("Connection {} signaling state: {}", handle, state);
        self.events.publish(HostEvent::ConnectionSignalingStateChanged {
            handle,
            state: state.to_string(),
        });
    }

    fn on_connection_change(&self, connection_state: RTCPeerConnectionState) {
        let Some(handle) = self.handle() else { return };
        let state = state::connection_state_str(connection_state);
        debug!("Connection {} state: {}", handle, state);
        self.events.publish(HostEvent::ConnectionConnectionStateChanged {
            handle,
            state: state.to_string(),
        });
    }

    fn on_ice_connection_change(&self, ice_state: RTCIceConnectionState) {
        let Some(handle) = self.handle() else { return };
        let state = state::ice_connection_state_str(ice_state);
        debug!("Connection {} ICE connection state: {}", handle, state);
        self.events.publish(HostEvent::ConnectionIceConnectionStateChanged {
            handle: handle.clone(),
            state: state.to_string(),
        });

        if state::is_terminal_ice_state(ice_state) {
            info!("Connection {} reached ICE state {}, closing", handle, state);
            self.close_and_finish();
        }
    }

    fn on_ice_gathering_change(&self, gathering_state: RTCIceGatheringState) {
        let Some(handle) = self.handle() else { return };
        self.events.publish(HostEvent::ConnectionIceGatheringStateChanged {
            handle,
            state: state::ice_gathering_state_str(gathering_state).to_string(),
        });
    }

    fn on_ice_candidate(&self, candidate: RTCIceCandidateInit) {
        let Some(handle) = self.handle() else { return };
        self.events.publish(HostEvent::ConnectionGotIceCandidate {
            handle,
            candidate: IceCandidate::from_native(&candidate),
        });
    }

    fn on_ice_candidates_removed(&self, candidates: Vec<RTCIceCandidateInit>) {
        let Some(connection) = self.connection() else { return };
        debug!("Removing {} ICE candidates", candidates.len());
        connection.remove_ice_candidates(&candidates);
    }

    fn on_add_stream(&self, stream: Arc<dyn MediaStream>) {
        if !self.is_bound() {
            return;
        }
        for track in stream.tracks() {
            self.register_track(Some(track));
        }
        let handle = self.repository.streams.register(stream.id(), stream);
        debug!("Remote stream registered as {}", handle);
    }

    fn on_remove_stream(&self, stream: Arc<dyn MediaStream>) {
        if !self.is_bound() {
            return;
        }
        // Tracks stay registered; the host may still reference them
        self.repository.streams.remove_by_identity(&stream.id());
    }

    fn on_add_track(&self, receiver: Arc<dyn RtpReceiver>, streams: Vec<Arc<dyn MediaStream>>) {
        let Some(handle) = self.handle() else { return };

        let receiver_id = receiver.id();
        self.register_track(receiver.track());
        self.repository
            .receivers
            .register(receiver_id.clone(), receiver.clone());
        let stream_ids = streams.iter().map(|s| s.id()).collect();
        self.repository
            .set_stream_ids_for(RtpSide::Receiver, &receiver_id, stream_ids);

        self.events.publish(HostEvent::ConnectionAddedReceiver {
            handle,
            receiver: ReceiverInfo::describe(receiver.as_ref(), &self.repository),
        });
    }

    fn on_track(&self, transceiver: Arc<dyn RtpTransceiver>) {
        let Some(handle) = self.handle() else { return };

        let sender = transceiver.sender();
        let receiver = transceiver.receiver();
        self.register_track(sender.track());
        self.register_track(receiver.track());
        self.repository.senders.register(sender.id(), sender);
        self.repository.receivers.register(receiver.id(), receiver);
        self.repository
            .transceivers
            .register(transceiver.id(), transceiver.clone());

        self.events.publish(HostEvent::ConnectionStartedTransceiver {
            handle,
            transceiver: TransceiverInfo::describe(transceiver.as_ref(), &self.repository),
        });
    }

    fn on_data_channel(&self, channel: Arc<dyn DataChannel>) {
        // Channels are registered by the command that creates them
        debug!("Ignoring remote data channel '{}'", channel.label());
    }

    fn on_renegotiation_needed(&self) {
        let Some(handle) = self.handle() else { return };
        self.events
            .publish(HostEvent::ConnectionShouldNegotiate { handle });
    }
}
