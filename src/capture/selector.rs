//! Capture device/format selection

use serde::Serialize;
use tracing::debug;

use crate::engine::CaptureDeviceEnumerator;
use crate::error::{BridgeError, Result};
use crate::types::{CaptureFormat, FacingMode};

/// Best format of one device for a request, with its resolution distance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceCandidate {
    pub device_name: String,
    pub format: CaptureFormat,
    pub score: u32,
}

impl DeviceCandidate {
    pub fn aspect_ratio(&self) -> f64 {
        if self.format.height == 0 {
            return 0.0;
        }
        self.format.width as f64 / self.format.height as f64
    }
}

/// Picks the device and format closest to a capture request
///
/// Facing direction must match exactly. Among matching devices the smallest
/// Manhattan distance on resolution wins; the frame rate only decides between
/// candidates tied at that best distance.
pub struct DeviceCandidateSelector<'a> {
    devices: &'a dyn CaptureDeviceEnumerator,
}

impl<'a> DeviceCandidateSelector<'a> {
    pub fn new(devices: &'a dyn CaptureDeviceEnumerator) -> Self {
        Self { devices }
    }

    pub fn select(
        &self,
        facing: Option<FacingMode>,
        width: u32,
        height: u32,
        frame_rate: u32,
    ) -> Result<DeviceCandidate> {
        let facing = facing
            .ok_or_else(|| BridgeError::NotFound("no facing mode requested".to_string()))?;

        let mut candidates: Vec<DeviceCandidate> = self
            .devices
            .device_names()
            .into_iter()
            .filter(|name| self.devices.is_front_facing(name) == facing.is_front())
            .filter_map(|name| self.best_format(name, width, height))
            .collect();

        // Stable: equal scores keep enumeration order
        candidates.sort_by_key(|c| c.score);

        let Some(best) = candidates.first() else {
            return Err(BridgeError::NotFound(format!(
                "no {:?} camera matches {}x{}",
                facing, width, height
            )));
        };

        let chosen = candidates
            .iter()
            .take_while(|c| c.score == best.score)
            .find(|c| c.format.framerate.contains(frame_rate))
            .unwrap_or(best)
            .clone();

        debug!(
            "Selected {} {}x{} ({}-{} fps, score {})",
            chosen.device_name,
            chosen.format.width,
            chosen.format.height,
            chosen.format.framerate.min,
            chosen.format.framerate.max,
            chosen.score
        );
        Ok(chosen)
    }

    fn best_format(&self, device_name: String, width: u32, height: u32) -> Option<DeviceCandidate> {
        let mut best: Option<DeviceCandidate> = None;
        for format in self.devices.supported_formats(&device_name) {
            let score = width.abs_diff(format.width) + height.abs_diff(format.height);
            if best.as_ref().map_or(true, |b| score < b.score) {
                best = Some(DeviceCandidate {
                    device_name: device_name.clone(),
                    format,
                    score,
                });
            }
        }
        best
    }
}
