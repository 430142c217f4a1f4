//! rtc-bridge - opaque-handle bridge between a native WebRTC engine and a scripting host
//!
//! The host cannot hold native pointers, so every live engine object
//! (connections, streams, tracks, senders, receivers, transceivers, data
//! channels) is registered under a random string handle. Host commands
//! resolve handles through the [`ObjectRepository`](registry::ObjectRepository);
//! engine callbacks flow back as [`HostEvent`]s.

pub mod bridge;
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod observer;
pub mod registry;
pub mod types;

pub use bridge::RtcBridge;
pub use config::BridgeConfig;
pub use error::{BridgeError, Rejection, Result};
pub use events::{EventBus, HostEvent};
pub use registry::{Handle, HandleRegistry, ObjectRepository};
