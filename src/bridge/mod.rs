//! Host command surface
//!
//! Every host command resolves handles through the [`ObjectRepository`],
//! runs against the native engine and either returns a result or a typed
//! [`BridgeError`]. Commands arrive on the host's serialized command queue;
//! engine callbacks arrive concurrently on engine threads and go through the
//! observers instead.

mod channel;
mod media;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::capture::Camera;
use crate::config::BridgeConfig;
use crate::engine::{CaptureDeviceEnumerator, PeerConnection, PeerConnectionFactory};
use crate::error::{BridgeError, Result};
use crate::events::{EventBus, HostEvent};
use crate::observer::{ConnectionObserver, SdpRequest, SdpRequestKind, TeardownQueue};
use crate::registry::{ConnectionEntry, Handle, ObjectRepository};
use crate::types::{
    Configuration, IceCandidate, MediaConstraints, MetricsSampleInfo, SessionDescription,
};

/// Bridge between the host and one native engine instance
pub struct RtcBridge {
    config: BridgeConfig,
    factory: Arc<dyn PeerConnectionFactory>,
    repository: Arc<ObjectRepository>,
    events: Arc<EventBus>,
    teardown: TeardownQueue,
    camera: Camera,
}

impl RtcBridge {
    /// Create the bridge and spawn its teardown worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        config: BridgeConfig,
        factory: Arc<dyn PeerConnectionFactory>,
        devices: Arc<dyn CaptureDeviceEnumerator>,
    ) -> Result<Self> {
        config.validate()?;

        let repository = Arc::new(ObjectRepository::new());
        let events = Arc::new(EventBus::with_capacity(config.event_capacity));
        let (teardown, _worker) = TeardownQueue::spawn(repository.clone());

        info!(
            "RTC bridge ready (max {} connections, {} fallback ICE servers)",
            config.max_connections,
            config.fallback_ice_servers().len()
        );

        Ok(Self {
            config,
            factory,
            repository,
            events,
            teardown,
            camera: Camera::new(devices),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<ObjectRepository> {
        &self.repository
    }

    /// Subscribe to host-bound events
    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.events.subscribe()
    }

    /// Diagnostic listing of every registered object
    pub fn dump(&self) -> String {
        self.repository.dump()
    }

    /// Start collecting engine histograms
    pub fn enable_metrics(&self) {
        debug!("Enabling engine metrics");
        self.factory.enable_metrics();
    }

    /// Histograms collected since the previous call
    pub fn get_and_reset_metrics(&self) -> Vec<MetricsSampleInfo> {
        let metrics = self.factory.get_and_reset_metrics();
        debug!("Collected {} engine histograms", metrics.len());
        metrics
    }

    /// Host reloaded: forget every object without closing native resources
    pub fn finish_loading(&self) {
        self.camera.stop();
        for entry in self.repository.connections.all() {
            entry.observer.unbind();
        }
        for entry in self.repository.data_channels.all() {
            entry.observer.unbind();
        }
        self.repository.clear();
        info!("Repository cleared after host reload");
    }

    /// Close every registered connection, stop capture and clear the repository
    pub fn shutdown(&self) {
        for (_, handle) in self.repository.connections.keys() {
            if let Err(e) = self.close_connection(&handle) {
                debug!("Connection {} already gone: {}", handle, e);
            }
        }
        self.camera.stop();
        self.repository.clear();
        info!("RTC bridge shut down");
    }

    // ========================================================================
    // Connections
    // ========================================================================

    fn connection(&self, handle: &Handle) -> Result<Arc<dyn PeerConnection>> {
        self.repository
            .connections
            .get_by_handle(handle)
            .map(|entry| entry.native.clone())
            .ok_or_else(|| BridgeError::NotFound(format!("Connection not found: {}", handle)))
    }

    /// Open a connection and bind its observer
    pub fn open_connection(&self, configuration: &Configuration) -> Result<Handle> {
        if self.repository.connections.len() >= self.config.max_connections {
            return Err(BridgeError::InvalidArgument(format!(
                "Maximum connections ({}) reached",
                self.config.max_connections
            )));
        }

        let native_config = configuration.to_native(&self.config.fallback_ice_servers())?;
        let observer = Arc::new(ConnectionObserver::new(
            self.repository.clone(),
            self.events.clone(),
            self.teardown.clone(),
        ));
        let connection = self
            .factory
            .create_peer_connection(native_config, observer.clone())
            .map_err(|e| BridgeError::native("PeerConnectionError", e))?;

        let handle = Handle::new();
        // Registered before the observer is bound so a terminal ICE state always
        // finds the entry to tear down
        self.repository.connections.add(
            handle.as_str(),
            handle.clone(),
            Arc::new(ConnectionEntry {
                native: connection.clone(),
                observer: observer.clone(),
            }),
        );
        observer.bind(handle.clone(), connection);

        info!("Connection opened: {}", handle);
        Ok(handle)
    }

    /// Deregister and release a connection
    pub fn close_connection(&self, handle: &Handle) -> Result<()> {
        let entry = self
            .repository
            .connections
            .remove_by_handle(handle)
            .ok_or_else(|| BridgeError::NotFound(format!("Connection not found: {}", handle)))?;
        entry.observer.unbind();
        entry.native.close();
        info!("Connection closed: {}", handle);
        Ok(())
    }

    pub fn set_configuration(&self, handle: &Handle, configuration: &Configuration) -> Result<()> {
        let connection = self.connection(handle)?;
        let native_config = configuration.to_native(&self.config.fallback_ice_servers())?;
        connection
            .set_configuration(native_config)
            .map_err(|e| BridgeError::native("SetConfigurationFailed", e))
    }

    // ========================================================================
    // Signaling
    // ========================================================================

    pub async fn create_offer(
        &self,
        handle: &Handle,
        constraints: &MediaConstraints,
    ) -> Result<SessionDescription> {
        let connection = self.connection(handle)?;
        debug!("Creating offer on {}", handle);
        let (request, response) = SdpRequest::new(SdpRequestKind::Create, "CreateOfferFailed");
        connection.create_offer(constraints, request);
        response.description().await
    }

    pub async fn create_answer(
        &self,
        handle: &Handle,
        constraints: &MediaConstraints,
    ) -> Result<SessionDescription> {
        let connection = self.connection(handle)?;
        debug!("Creating answer on {}", handle);
        let (request, response) = SdpRequest::new(SdpRequestKind::Create, "CreateAnswerFailed");
        connection.create_answer(constraints, request);
        response.description().await
    }

    pub async fn set_local_description(
        &self,
        handle: &Handle,
        description: SessionDescription,
    ) -> Result<()> {
        let connection = self.connection(handle)?;
        debug!("Setting local {} on {}", description.sdp_type, handle);
        let (request, response) =
            SdpRequest::new(SdpRequestKind::Set, "SetLocalDescriptionFailed");
        connection.set_local_description(description, request);
        response.completion().await
    }

    pub async fn set_remote_description(
        &self,
        handle: &Handle,
        description: SessionDescription,
    ) -> Result<()> {
        let connection = self.connection(handle)?;
        debug!("Setting remote {} on {}", description.sdp_type, handle);
        let (request, response) =
            SdpRequest::new(SdpRequestKind::Set, "SetRemoteDescriptionFailed");
        connection.set_remote_description(description, request);
        response.completion().await
    }

    pub fn add_ice_candidate(&self, handle: &Handle, candidate: &IceCandidate) -> Result<()> {
        let connection = self.connection(handle)?;
        connection
            .add_ice_candidate(candidate.to_native())
            .map_err(|e| BridgeError::native("AddIceCandidateFailed", e))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::engine::memory::{MemoryCaptureDevices, MemoryFactory, MemoryPeerConnection};
    use crate::types::{CaptureFormat, SdpType};
    use webrtc::ice_transport::ice_connection_state::RTCIceConnectionState;
    use webrtc::peer_connection::policy::ice_transport_policy::RTCIceTransportPolicy;

    pub(crate) fn bridge() -> (RtcBridge, Arc<MemoryFactory>) {
        let factory = MemoryFactory::new();
        let devices = Arc::new(MemoryCaptureDevices::new());
        devices.add_device("front", true, vec![CaptureFormat::new(1280, 720, 15, 30)]);
        devices.add_device("back", false, vec![CaptureFormat::new(1920, 1080, 15, 30)]);
        let config = BridgeConfig {
            stun_servers: vec!["stun:stun.example.org:3478".to_string()],
            ..Default::default()
        };
        let bridge = RtcBridge::new(config, factory.clone(), devices).unwrap();
        (bridge, factory)
    }

    pub(crate) fn open(bridge: &RtcBridge, factory: &MemoryFactory) -> (Handle, Arc<MemoryPeerConnection>) {
        let handle = bridge.open_connection(&Configuration::default()).unwrap();
        (handle, factory.last_connection().unwrap())
    }

    pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_open_and_close_connection() {
        let (bridge, factory) = bridge();
        let (handle, connection) = open(&bridge, &factory);
        assert!(bridge.repository().connections.contains_handle(&handle));

        // Fallback ICE servers apply when the host sends none
        let config = connection.configuration().unwrap();
        assert_eq!(config.ice_servers.len(), 1);

        bridge.close_connection(&handle).unwrap();
        assert!(connection.is_closed());
        let err = bridge.close_connection(&handle).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let factory = MemoryFactory::new();
        let config = BridgeConfig {
            max_connections: 1,
            ..Default::default()
        };
        let bridge =
            RtcBridge::new(config, factory, Arc::new(MemoryCaptureDevices::new())).unwrap();
        bridge.open_connection(&Configuration::default()).unwrap();
        let err = bridge.open_connection(&Configuration::default()).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_engine_refusal_surfaces() {
        let (bridge, factory) = bridge();
        factory.set_refuses_connections(true);
        let err = bridge.open_connection(&Configuration::default()).unwrap_err();
        assert_eq!(err.code(), "PeerConnectionError");
        assert!(bridge.repository().connections.is_empty());
    }

    #[tokio::test]
    async fn test_set_configuration() {
        let (bridge, factory) = bridge();
        let (handle, connection) = open(&bridge, &factory);
        let configuration: Configuration = serde_json::from_str(
            r#"{"iceServers":[{"urls":["turn:turn.example.org"],"username":"u","credential":"p"}],"iceTransportPolicy":"relay"}"#,
        )
        .unwrap();
        bridge.set_configuration(&handle, &configuration).unwrap();
        let native = connection.configuration().unwrap();
        assert_eq!(native.ice_transport_policy, RTCIceTransportPolicy::Relay);
        assert_eq!(native.ice_servers[0].username, "u");

        let err = bridge
            .set_configuration(&Handle::from("nope"), &configuration)
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_offer_answer_exchange() {
        let (bridge, factory) = bridge();
        let (caller, _) = open(&bridge, &factory);
        let (callee, callee_native) = open(&bridge, &factory);
        let constraints = MediaConstraints::default();

        let offer = bridge.create_offer(&caller, &constraints).await.unwrap();
        assert_eq!(offer.sdp_type, SdpType::Offer);
        bridge.set_local_description(&caller, offer.clone()).await.unwrap();

        // No remote offer yet
        let err = bridge.create_answer(&callee, &constraints).await.unwrap_err();
        assert_eq!(err.code(), "CreateAnswerFailed");

        bridge.set_remote_description(&callee, offer.clone()).await.unwrap();
        let answer = bridge.create_answer(&callee, &constraints).await.unwrap();
        assert_eq!(answer.sdp_type, SdpType::Answer);
        assert_eq!(callee_native.remote_description(), Some(offer));
    }

    #[tokio::test]
    async fn test_description_failure_carries_reason() {
        let (bridge, factory) = bridge();
        let (handle, connection) = open(&bridge, &factory);
        connection.fail_next_description("malformed sdp");

        let err = bridge
            .set_remote_description(&handle, SessionDescription::new(SdpType::Offer, "x"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SetRemoteDescriptionFailed");
        assert!(err.to_string().contains("malformed sdp"));
    }

    #[tokio::test]
    async fn test_add_ice_candidate() {
        let (bridge, factory) = bridge();
        let (handle, connection) = open(&bridge, &factory);
        let candidate = IceCandidate {
            sdp: "candidate:1 1 udp 2122260223 192.0.2.10 54321 typ host".to_string(),
            sdp_mline_index: 0,
            sdp_mid: Some("0".to_string()),
        };

        let err = bridge.add_ice_candidate(&handle, &candidate).unwrap_err();
        assert_eq!(err.code(), "AddIceCandidateFailed");

        bridge
            .set_remote_description(&handle, SessionDescription::new(SdpType::Offer, "v=0"))
            .await
            .unwrap();
        bridge.add_ice_candidate(&handle, &candidate).unwrap();
        assert_eq!(connection.candidates().len(), 1);
    }

    #[tokio::test]
    async fn test_ice_failure_tears_down_once() {
        let (bridge, factory) = bridge();
        let (handle, connection) = open(&bridge, &factory);
        let observer = connection.observer().unwrap();

        observer.on_ice_connection_change(RTCIceConnectionState::Failed);
        observer.on_ice_connection_change(RTCIceConnectionState::Disconnected);

        let repository = bridge.repository().clone();
        let watched = connection.clone();
        wait_until(move || watched.is_closed() && repository.connections.is_empty()).await;

        // Already torn down by the engine callback
        assert!(bridge.close_connection(&handle).unwrap_err().is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_terminal_state_during_open_is_torn_down() {
        let (bridge, factory) = bridge();

        // Engine thread reporting failure while the connection is still being opened
        let engine = {
            let factory = factory.clone();
            std::thread::spawn(move || {
                let connection = loop {
                    if let Some(connection) = factory.last_connection() {
                        break connection;
                    }
                    std::thread::yield_now();
                };
                if let Some(observer) = connection.observer() {
                    for _ in 0..10_000 {
                        observer.on_ice_connection_change(RTCIceConnectionState::Failed);
                    }
                }
            })
        };
        let handle = bridge.open_connection(&Configuration::default()).unwrap();
        engine.join().unwrap();

        let connection = factory.last_connection().unwrap();
        connection
            .observer()
            .unwrap()
            .on_ice_connection_change(RTCIceConnectionState::Failed);

        let repository = bridge.repository().clone();
        let watched = connection.clone();
        wait_until(move || watched.is_closed() && !repository.connections.contains_handle(&handle))
            .await;
        assert!(bridge.repository().connections.is_empty());
    }

    #[tokio::test]
    async fn test_metrics_collected_once_enabled() {
        let (bridge, factory) = bridge();
        factory.record_sample("WebRTC.Video.InputFramesPerSecond", 1, 100, 50, 30);
        assert!(bridge.get_and_reset_metrics().is_empty());

        bridge.enable_metrics();
        factory.record_sample("WebRTC.Video.InputFramesPerSecond", 1, 100, 50, 30);
        factory.record_sample("WebRTC.Video.InputFramesPerSecond", 1, 100, 50, 30);
        factory.record_sample("WebRTC.Audio.Jitter", 0, 1000, 100, 12);

        let metrics = bridge.get_and_reset_metrics();
        assert_eq!(metrics.len(), 2);
        let video = metrics
            .iter()
            .find(|m| m.name == "WebRTC.Video.InputFramesPerSecond")
            .unwrap();
        assert_eq!((video.min, video.max, video.bucket_count), (1, 100, 50));
        assert_eq!(video.samples.get(&30), Some(&2));

        // Reset on read; collection stays enabled
        assert!(bridge.get_and_reset_metrics().is_empty());
        factory.record_sample("WebRTC.Audio.Jitter", 0, 1000, 100, 8);
        assert_eq!(bridge.get_and_reset_metrics()[0].sample_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_everything() {
        let (bridge, factory) = bridge();
        let (_, first) = open(&bridge, &factory);
        let (_, second) = open(&bridge, &factory);

        bridge.shutdown();
        assert!(first.is_closed());
        assert!(second.is_closed());
        assert!(bridge.repository().is_empty());
    }

    #[tokio::test]
    async fn test_finish_loading_keeps_native_objects() {
        let (bridge, factory) = bridge();
        let (_, connection) = open(&bridge, &factory);
        let mut rx = bridge.subscribe();

        bridge.finish_loading();
        assert!(bridge.repository().is_empty());
        assert!(!connection.is_closed());

        // Late callbacks for forgotten connections are silent
        connection.observer().unwrap().on_renegotiation_needed();
        assert!(rx.try_recv().is_err());
    }
}
