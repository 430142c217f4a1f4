use std::sync::Arc;

use tracing::{debug, info};

use super::RtcBridge;
use crate::engine::{state, MediaStreamTrack, RtpSender, RtpTransceiver};
use crate::error::{BridgeError, Result};
use crate::registry::{Handle, RtpSide};
use crate::types::{
    MediaStreamConstraints, RtpEncodingParameters, SenderInfo, TrackInfo, TrackKind,
    TransceiverInfo, TransceiverInit, UserMedia,
};

impl RtcBridge {
    fn track(&self, handle: &Handle) -> Result<Arc<dyn MediaStreamTrack>> {
        self.repository
            .tracks
            .get_by_handle(handle)
            .ok_or_else(|| BridgeError::NotFound(format!("Track not found: {}", handle)))
    }

    fn transceiver(&self, handle: &Handle) -> Result<Arc<dyn RtpTransceiver>> {
        self.repository
            .transceivers
            .get_by_handle(handle)
            .ok_or_else(|| BridgeError::NotFound(format!("Transceiver not found: {}", handle)))
    }

    // ========================================================================
    // Tracks and senders
    // ========================================================================

    pub fn add_track(
        &self,
        handle: &Handle,
        track_handle: &Handle,
        stream_ids: Vec<String>,
    ) -> Result<SenderInfo> {
        let connection = self.connection(handle)?;
        let track = self.track(track_handle)?;

        let sender = connection
            .add_track(track, &stream_ids)
            .map_err(|e| BridgeError::native("PeerConnectionError", e))?;
        let sender_id = sender.id();
        self.repository.senders.register(sender_id.clone(), sender.clone());
        self.repository
            .set_stream_ids_for(RtpSide::Sender, &sender_id, stream_ids);

        debug!("Track {} added to {} as sender {}", track_handle, handle, sender_id);
        Ok(SenderInfo::describe(sender.as_ref(), &self.repository))
    }

    pub fn remove_track(&self, handle: &Handle, sender_handle: &Handle) -> Result<()> {
        let connection = self.connection(handle)?;
        let sender: Arc<dyn RtpSender> = self
            .repository
            .senders
            .get_by_handle(sender_handle)
            .ok_or_else(|| BridgeError::NotFound(format!("Sender not found: {}", sender_handle)))?;

        connection
            .remove_track(&sender)
            .map_err(|e| BridgeError::native("RemoveTrackFailed", e))?;
        self.repository.senders.remove_by_handle(sender_handle);
        self.repository
            .set_stream_ids_for(RtpSide::Sender, &sender.id(), vec![]);
        Ok(())
    }

    pub fn track_set_enabled(&self, track_handle: &Handle, enabled: bool) -> Result<()> {
        self.track(track_handle)?.set_enabled(enabled);
        Ok(())
    }

    pub fn track_set_aspect_ratio(&self, track_handle: &Handle, ratio: f64) -> Result<()> {
        let track = self.track(track_handle)?;
        if track.kind() != TrackKind::Video {
            return Err(BridgeError::InvalidArgument(format!(
                "Aspect ratio applies to video tracks only, {} is {}",
                track_handle,
                track.kind()
            )));
        }
        if !(ratio.is_finite() && ratio > 0.0) {
            return Err(BridgeError::InvalidArgument(format!(
                "Invalid aspect ratio: {}",
                ratio
            )));
        }
        self.repository.set_aspect_ratio(&track.id(), ratio);
        Ok(())
    }

    // ========================================================================
    // Transceivers
    // ========================================================================

    pub fn add_transceiver(
        &self,
        handle: &Handle,
        track_handle: &Handle,
        init: &TransceiverInit,
    ) -> Result<TransceiverInfo> {
        let connection = self.connection(handle)?;
        let track = self.track(track_handle)?;
        let native_init = init.to_native()?;

        let transceiver = connection
            .add_transceiver(track, native_init)
            .map_err(|e| BridgeError::native("PeerConnectionError", e))?;

        let sender = transceiver.sender();
        let receiver = transceiver.receiver();
        if let Some(remote) = receiver.track() {
            self.repository.tracks.register(remote.id(), remote);
        }
        self.repository
            .set_stream_ids_for(RtpSide::Sender, &sender.id(), init.stream_ids.clone());
        self.repository.senders.register(sender.id(), sender);
        self.repository.receivers.register(receiver.id(), receiver);
        self.repository
            .transceivers
            .register(transceiver.id(), transceiver.clone());

        Ok(TransceiverInfo::describe(transceiver.as_ref(), &self.repository))
    }

    pub fn transceiver_direction(&self, handle: &Handle) -> Result<String> {
        let transceiver = self.transceiver(handle)?;
        Ok(state::direction_str(transceiver.direction()).to_string())
    }

    pub fn transceiver_set_direction(&self, handle: &Handle, direction: &str) -> Result<()> {
        let transceiver = self.transceiver(handle)?;
        transceiver.set_direction(state::parse_direction(direction)?);
        Ok(())
    }

    /// Negotiated direction; none before negotiation or after stop
    pub fn transceiver_current_direction(&self, handle: &Handle) -> Result<Option<String>> {
        let transceiver = self.transceiver(handle)?;
        Ok(transceiver
            .current_direction()
            .map(|d| state::direction_str(d).to_string()))
    }

    pub fn transceiver_stop(&self, handle: &Handle) -> Result<()> {
        self.transceiver(handle)?.stop();
        Ok(())
    }

    // ========================================================================
    // User media
    // ========================================================================

    /// Acquire the camera and microphone as a new local stream.
    ///
    /// The stream always carries one video and one audio track; each is
    /// enabled only when the constraints request it. A video request
    /// restarts capture on the best matching device.
    pub fn get_user_media(&self, constraints: &MediaStreamConstraints) -> Result<UserMedia> {
        if constraints.video.is_none() && !constraints.audio {
            return Err(BridgeError::InvalidArgument(
                "At least one of audio and video must be requested".to_string(),
            ));
        }

        let capture = match &constraints.video {
            Some(video) => {
                let candidate = self.camera.select(video)?;
                self.camera.stop();
                let capturer = self.camera.start(&candidate, video.frame_rate)?;
                Some((candidate, capturer))
            }
            None => None,
        };

        let stream_id = uuid::Uuid::new_v4().to_string();
        let stream = self.factory.create_local_media_stream(&stream_id);
        let video_track = self.factory.create_video_track(
            &uuid::Uuid::new_v4().to_string(),
            capture.as_ref().map(|(_, capturer)| capturer.clone()),
        );
        let audio_track = self
            .factory
            .create_audio_track(&uuid::Uuid::new_v4().to_string());

        for track in [&video_track, &audio_track] {
            self.repository.tracks.register(track.id(), track.clone());
            stream.add_track(track.clone());
        }
        video_track.set_enabled(capture.is_some());
        audio_track.set_enabled(constraints.audio);

        if let (Some(video), Some((candidate, _))) = (&constraints.video, &capture) {
            let ratio = video.aspect_ratio.unwrap_or_else(|| candidate.aspect_ratio());
            self.repository.set_aspect_ratio(&video_track.id(), ratio);
        }

        self.repository.streams.register(stream_id.clone(), stream);
        info!(
            "User media stream {} (video: {}, audio: {})",
            stream_id,
            capture.is_some(),
            constraints.audio
        );

        Ok(UserMedia {
            stream_id,
            tracks: [&video_track, &audio_track]
                .into_iter()
                .map(|t| TrackInfo::describe(t.as_ref(), &self.repository))
                .collect(),
        })
    }

    /// Release the running capture. Returns false when nothing was running.
    pub fn stop_user_media(&self) -> bool {
        self.camera.stop()
    }

    // ========================================================================
    // RTP encodings
    // ========================================================================

    pub fn rtp_encoding_parameters(&self, owner: &Handle, ssrc: u32) -> Result<RtpEncodingParameters> {
        self.repository
            .encoding_parameters_for(owner, ssrc)
            .ok_or_else(|| encoding_not_found(owner, ssrc))
    }

    pub fn rtp_encoding_set_active(&self, owner: &Handle, ssrc: u32, active: bool) -> Result<()> {
        self.update_encoding(owner, ssrc, |encoding| encoding.active = active)
    }

    pub fn rtp_encoding_set_max_bitrate(
        &self,
        owner: &Handle,
        ssrc: u32,
        bitrate_bps: Option<u32>,
    ) -> Result<()> {
        self.update_encoding(owner, ssrc, |encoding| encoding.max_bitrate_bps = bitrate_bps)
    }

    pub fn rtp_encoding_set_min_bitrate(
        &self,
        owner: &Handle,
        ssrc: u32,
        bitrate_bps: Option<u32>,
    ) -> Result<()> {
        self.update_encoding(owner, ssrc, |encoding| encoding.min_bitrate_bps = bitrate_bps)
    }

    /// Edit one encoding of the owner's parameter snapshot and write it back
    fn update_encoding(
        &self,
        owner: &Handle,
        ssrc: u32,
        edit: impl FnOnce(&mut RtpEncodingParameters),
    ) -> Result<()> {
        let rtp_owner = self
            .repository
            .rtp_owner(owner)
            .ok_or_else(|| BridgeError::NotFound(format!("RTP owner not found: {}", owner)))?;

        let mut parameters = rtp_owner.parameters();
        let encoding = parameters
            .encoding_by_ssrc_mut(ssrc)
            .ok_or_else(|| encoding_not_found(owner, ssrc))?;
        edit(encoding);

        rtp_owner
            .set_parameters(parameters)
            .map_err(|e| BridgeError::native("SetParametersFailed", e))
    }
}

fn encoding_not_found(owner: &Handle, ssrc: u32) -> BridgeError {
    BridgeError::NotFound(format!("Encoding {} not found on {}", ssrc, owner))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{bridge, open};
    use super::*;
    use crate::engine::memory::{MemoryRtpReceiver, MemoryTrack};
    use crate::engine::RtpReceiver;
    use crate::types::{FacingMode, TrackState, VideoConstraints};

    fn front_camera() -> MediaStreamConstraints {
        MediaStreamConstraints {
            video: Some(VideoConstraints {
                facing_mode: Some(FacingMode::User),
                width: 1280,
                height: 720,
                frame_rate: 60,
                aspect_ratio: None,
            }),
            audio: true,
        }
    }

    fn audio_handle(media: &UserMedia) -> Handle {
        media
            .tracks
            .iter()
            .find(|t| t.kind == TrackKind::Audio)
            .and_then(|t| t.handle.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_user_media_registers_tracks() {
        let (bridge, _factory) = bridge();
        let media = bridge.get_user_media(&front_camera()).unwrap();

        assert_eq!(media.tracks.len(), 2);
        assert!(bridge.repository().streams.contains_identity(&media.stream_id));
        let video = media
            .tracks
            .iter()
            .find(|t| t.kind == TrackKind::Video)
            .unwrap();
        assert!(video.handle.is_some());
        assert!(video.enabled);
        assert_eq!(video.ready_state, TrackState::Live);
        let ratio = bridge.repository().aspect_ratio(&video.id).unwrap();
        assert!((ratio - 1280.0 / 720.0).abs() < 1e-9);

        assert!(bridge.stop_user_media());
        assert!(!bridge.stop_user_media());
    }

    #[tokio::test]
    async fn test_audio_only_keeps_video_track_disabled() {
        let (bridge, _factory) = bridge();
        let media = bridge
            .get_user_media(&MediaStreamConstraints {
                video: None,
                audio: true,
            })
            .unwrap();

        let video = media.tracks.iter().find(|t| t.kind == TrackKind::Video).unwrap();
        let audio = media.tracks.iter().find(|t| t.kind == TrackKind::Audio).unwrap();
        assert!(!video.enabled);
        assert!(audio.enabled);
        assert_eq!(bridge.repository().aspect_ratio(&video.id), None);
        assert!(!bridge.stop_user_media());
    }

    #[tokio::test]
    async fn test_get_user_media_without_matching_camera() {
        let (bridge, _factory) = bridge();
        let mut constraints = front_camera();
        if let Some(video) = constraints.video.as_mut() {
            video.facing_mode = None;
        }
        let err = bridge.get_user_media(&constraints).unwrap_err();
        assert!(err.is_not_found());

        let err = bridge
            .get_user_media(&MediaStreamConstraints::default())
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_add_and_remove_track() {
        let (bridge, factory) = bridge();
        let (handle, connection) = open(&bridge, &factory);
        let media = bridge
            .get_user_media(&MediaStreamConstraints {
                video: None,
                audio: true,
            })
            .unwrap();
        let track_handle = audio_handle(&media);

        let sender = bridge
            .add_track(&handle, &track_handle, vec![media.stream_id.clone()])
            .unwrap();
        assert_eq!(sender.stream_ids, vec![media.stream_id.clone()]);
        assert_eq!(sender.track.as_ref().unwrap().handle, Some(track_handle.clone()));
        let sender_handle = sender.handle.unwrap();

        bridge.remove_track(&handle, &sender_handle).unwrap();
        assert!(connection.senders().is_empty());
        assert!(!bridge.repository().senders.contains_handle(&sender_handle));
        assert_eq!(
            bridge.repository().stream_ids_for(RtpSide::Sender, &sender.id),
            None
        );

        let err = bridge.remove_track(&handle, &sender_handle).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_refused_track() {
        let (bridge, factory) = bridge();
        let (handle, connection) = open(&bridge, &factory);
        let media = bridge
            .get_user_media(&MediaStreamConstraints {
                video: None,
                audio: true,
            })
            .unwrap();
        let track_handle = audio_handle(&media);
        connection.set_refuses_media(true);

        let err = bridge.add_track(&handle, &track_handle, vec![]).unwrap_err();
        assert_eq!(err.code(), "PeerConnectionError");
        let err = bridge
            .add_track(&handle, &Handle::from("missing"), vec![])
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_transceiver_commands() {
        let (bridge, factory) = bridge();
        let (handle, _connection) = open(&bridge, &factory);
        let media = bridge.get_user_media(&front_camera()).unwrap();
        let video = media.tracks.iter().find(|t| t.kind == TrackKind::Video).unwrap();

        let init: TransceiverInit =
            serde_json::from_str(r#"{"direction":"sendonly","streamIds":["local"]}"#).unwrap();
        let info = bridge
            .add_transceiver(&handle, video.handle.as_ref().unwrap(), &init)
            .unwrap();
        assert_eq!(info.direction, "sendonly");
        assert_eq!(info.sender.stream_ids, vec!["local".to_string()]);
        assert!(info.receiver.track.as_ref().unwrap().handle.is_some());

        let transceiver = info.handle.unwrap();
        assert_eq!(bridge.transceiver_direction(&transceiver).unwrap(), "sendonly");
        bridge.transceiver_set_direction(&transceiver, "inactive").unwrap();
        assert_eq!(bridge.transceiver_direction(&transceiver).unwrap(), "inactive");
        assert!(bridge
            .transceiver_set_direction(&transceiver, "upward")
            .is_err());
        assert_eq!(bridge.transceiver_current_direction(&transceiver).unwrap(), None);

        bridge.transceiver_stop(&transceiver).unwrap();
        let err = bridge
            .transceiver_direction(&Handle::from("missing"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_track_commands() {
        let (bridge, _factory) = bridge();
        let media = bridge.get_user_media(&front_camera()).unwrap();
        let video = media.tracks.iter().find(|t| t.kind == TrackKind::Video).unwrap();
        let audio = media.tracks.iter().find(|t| t.kind == TrackKind::Audio).unwrap();
        let video_handle = video.handle.clone().unwrap();

        bridge.track_set_enabled(&video_handle, false).unwrap();
        assert!(!bridge.repository().tracks.get_by_handle(&video_handle).unwrap().enabled());

        bridge.track_set_aspect_ratio(&video_handle, 4.0 / 3.0).unwrap();
        assert_eq!(bridge.repository().aspect_ratio(&video.id), Some(4.0 / 3.0));

        let err = bridge
            .track_set_aspect_ratio(audio.handle.as_ref().unwrap(), 1.0)
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_encoding_updates_are_written_back() {
        let (bridge, factory) = bridge();
        let (handle, connection) = open(&bridge, &factory);
        let media = bridge
            .get_user_media(&MediaStreamConstraints {
                video: None,
                audio: true,
            })
            .unwrap();
        let sender = bridge
            .add_track(&handle, &audio_handle(&media), vec![])
            .unwrap();
        let owner = sender.handle.unwrap();
        let ssrc = sender.parameters.encodings[0].ssrc.unwrap();

        bridge.rtp_encoding_set_active(&owner, ssrc, false).unwrap();
        bridge
            .rtp_encoding_set_max_bitrate(&owner, ssrc, Some(800_000))
            .unwrap();
        bridge
            .rtp_encoding_set_min_bitrate(&owner, ssrc, Some(100_000))
            .unwrap();

        let native = connection.senders()[0].parameters();
        let encoding = native.encoding_by_ssrc(ssrc).unwrap();
        assert!(!encoding.active);
        assert_eq!(encoding.max_bitrate_bps, Some(800_000));
        assert_eq!(encoding.min_bitrate_bps, Some(100_000));
        assert_eq!(bridge.rtp_encoding_parameters(&owner, ssrc).unwrap(), *encoding);

        let err = bridge.rtp_encoding_set_active(&owner, ssrc + 1000, true).unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_encoding_owner_falls_back_to_receiver() {
        let (bridge, _factory) = bridge();
        let receiver = MemoryRtpReceiver::new(
            "R1",
            Some(MemoryTrack::new("remote", TrackKind::Video)),
        );
        receiver.set_encodings(vec![RtpEncodingParameters {
            ssrc: Some(77),
            ..Default::default()
        }]);
        let owner = bridge
            .repository()
            .receivers
            .register("R1", receiver.clone() as Arc<dyn RtpReceiver>);

        bridge.rtp_encoding_set_active(&owner, 77, false).unwrap();
        assert!(!receiver.parameters().encodings[0].active);
    }

    #[tokio::test]
    async fn test_rejected_parameters_surface() {
        let (bridge, _factory) = bridge();
        let sender = crate::engine::memory::MemoryRtpSender::new("S1", None);
        sender.set_encodings(vec![RtpEncodingParameters {
            ssrc: Some(5),
            ..Default::default()
        }]);
        sender.set_rejects_parameters(true);
        let owner = bridge
            .repository()
            .senders
            .register("S1", sender as Arc<dyn RtpSender>);

        let err = bridge
            .rtp_encoding_set_max_bitrate(&owner, 5, Some(1))
            .unwrap_err();
        assert_eq!(err.code(), "SetParametersFailed");
    }
}
