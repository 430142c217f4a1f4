use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use super::{DeviceCandidate, DeviceCandidateSelector};
use crate::engine::{CaptureDeviceEnumerator, VideoCapturer};
use crate::error::{BridgeError, Result};
use crate::types::VideoConstraints;

struct RunningCapture {
    device_name: String,
    capturer: Arc<dyn VideoCapturer>,
}

/// Single-slot camera
///
/// At most one capturer runs at a time. Starting while a capture is running
/// leaves the running capture untouched.
pub struct Camera {
    devices: Arc<dyn CaptureDeviceEnumerator>,
    running: Mutex<Option<RunningCapture>>,
}

impl Camera {
    pub fn new(devices: Arc<dyn CaptureDeviceEnumerator>) -> Self {
        Self {
            devices,
            running: Mutex::new(None),
        }
    }

    /// Best device candidate for a video request
    pub fn select(&self, video: &VideoConstraints) -> Result<DeviceCandidate> {
        DeviceCandidateSelector::new(self.devices.as_ref()).select(
            video.facing_mode,
            video.width,
            video.height,
            video.frame_rate,
        )
    }

    /// Create a capturer for the candidate's device and start it at the
    /// candidate's resolution. The frame rate is clamped to the format range.
    ///
    /// Returns the running capturer when a capture is already active.
    pub fn start(
        &self,
        candidate: &DeviceCandidate,
        frame_rate: u32,
    ) -> Result<Arc<dyn VideoCapturer>> {
        let mut running = self.running.lock();
        if let Some(active) = running.as_ref() {
            warn!(
                "Capture already running on {}, ignoring start on {}",
                active.device_name, candidate.device_name
            );
            return Ok(active.capturer.clone());
        }

        let capturer = self
            .devices
            .create_capturer(&candidate.device_name)
            .map_err(|e| BridgeError::native("CaptureFailed", e))?;
        let frame_rate = candidate.format.framerate.clamp(frame_rate);
        capturer
            .start_capture(candidate.format.width, candidate.format.height, frame_rate)
            .map_err(|e| BridgeError::native("CaptureFailed", e))?;

        info!(
            "Capture started on {} at {}x{} {}fps",
            candidate.device_name, candidate.format.width, candidate.format.height, frame_rate
        );
        *running = Some(RunningCapture {
            device_name: candidate.device_name.clone(),
            capturer: capturer.clone(),
        });
        Ok(capturer)
    }

    /// Stop the running capture. Returns false when nothing was running.
    pub fn stop(&self) -> bool {
        let Some(active) = self.running.lock().take() else {
            return false;
        };
        active.capturer.stop_capture();
        info!("Capture stopped on {}", active.device_name);
        true
    }

    pub fn is_capturing(&self) -> bool {
        self.running.lock().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryCaptureDevices;
    use crate::types::{CaptureFormat, FacingMode};

    fn camera() -> (Arc<MemoryCaptureDevices>, Camera) {
        let devices = Arc::new(MemoryCaptureDevices::new());
        devices.add_device("front", true, vec![CaptureFormat::new(1280, 720, 15, 30)]);
        let camera = Camera::new(devices.clone());
        (devices, camera)
    }

    fn request(frame_rate: u32) -> VideoConstraints {
        VideoConstraints {
            facing_mode: Some(FacingMode::User),
            width: 1280,
            height: 720,
            frame_rate,
            aspect_ratio: None,
        }
    }

    #[test]
    fn test_frame_rate_clamped_to_format() {
        let (devices, camera) = camera();
        let candidate = camera.select(&request(60)).unwrap();
        camera.start(&candidate, 60).unwrap();

        let started = devices.capturer("front").unwrap();
        assert_eq!(started.running(), Some((1280, 720, 30)));
    }

    #[test]
    fn test_single_slot() {
        let (devices, camera) = camera();
        let candidate = camera.select(&request(24)).unwrap();
        let first = camera.start(&candidate, 24).unwrap();
        let second = camera.start(&candidate, 30).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(devices.capturers_created(), 1);
        assert!(camera.is_capturing());

        assert!(camera.stop());
        assert!(!camera.stop());
        assert_eq!(devices.capturer("front").unwrap().running(), None);
    }
}
