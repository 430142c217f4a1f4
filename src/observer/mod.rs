//! Engine callback observers
//!
//! Observers run on engine threads. They only touch the repository and the
//! event bus; anything that would release a native object from inside a
//! callback goes through the [`TeardownQueue`].

mod channel;
mod connection;
mod sdp;
mod teardown;

pub use channel::ChannelObserver;
pub use connection::ConnectionObserver;
pub use sdp::{SdpRequest, SdpRequestKind, SdpResponse};
pub use teardown::{run_worker, TeardownQueue, TeardownRequest};
