//! Camera capture: device selection and the running capture slot

mod camera;
mod selector;

pub use camera::Camera;
pub use selector::{DeviceCandidate, DeviceCandidateSelector};
