//! Data channel lifecycle observer

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;

use crate::engine::{state, DataBuffer, DataChannel, DataChannelObserver};
use crate::events::{EventBus, HostEvent};
use crate::registry::{Handle, ObjectRepository};
use crate::types::encode_payload;

struct Binding {
    handle: Handle,
    channel: Arc<dyn DataChannel>,
}

/// Reacts to engine callbacks for one data channel
pub struct ChannelObserver {
    binding: Mutex<Option<Binding>>,
    repository: Arc<ObjectRepository>,
    events: Arc<EventBus>,
}

impl ChannelObserver {
    pub fn new(repository: Arc<ObjectRepository>, events: Arc<EventBus>) -> Self {
        Self {
            binding: Mutex::new(None),
            repository,
            events,
        }
    }

    pub fn bind(&self, handle: Handle, channel: Arc<dyn DataChannel>) {
        *self.binding.lock() = Some(Binding { handle, channel });
    }

    pub fn unbind(&self) -> Option<Handle> {
        self.binding.lock().take().map(|b| b.handle)
    }

    pub fn is_bound(&self) -> bool {
        self.binding.lock().is_some()
    }

    fn bound(&self) -> Option<(Handle, Arc<dyn DataChannel>)> {
        self.binding
            .lock()
            .as_ref()
            .map(|b| (b.handle.clone(), b.channel.clone()))
    }
}

impl DataChannelObserver for ChannelObserver {
    fn on_state_change(&self) {
        let Some((handle, channel)) = self.bound() else { return };
        let channel_state = channel.state();
        let state = state::data_channel_state_str(channel_state);
        debug!("Data channel {} state: {}", handle, state);
        self.events.publish(HostEvent::ChannelStateChanged {
            handle: handle.clone(),
            state: state.to_string(),
        });

        if channel_state == RTCDataChannelState::Closed && self.unbind().is_some() {
            self.repository.data_channels.remove_by_handle(&handle);
            debug!("Data channel {} deregistered", handle);
        }
    }

    fn on_buffered_amount_change(&self, _previous_amount: u64) {
        let Some((handle, channel)) = self.bound() else { return };
        self.events.publish(HostEvent::ChannelBufferedAmountChanged {
            handle,
            amount: channel.buffered_amount(),
        });
    }

    fn on_message(&self, buffer: DataBuffer) {
        let Some((handle, _)) = self.bound() else { return };
        self.events.publish(HostEvent::ChannelMessageReceived {
            handle,
            binary: buffer.binary,
            data: encode_payload(&buffer),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::memory::MemoryDataChannel;
    use crate::registry::ChannelEntry;

    fn registered_channel() -> (
        Arc<ObjectRepository>,
        Arc<EventBus>,
        Arc<MemoryDataChannel>,
        Arc<ChannelObserver>,
        Handle,
    ) {
        let repository = Arc::new(ObjectRepository::new());
        let events = Arc::new(EventBus::new());
        let channel = MemoryDataChannel::new("chat", Some(1));
        let observer = Arc::new(ChannelObserver::new(repository.clone(), events.clone()));
        let handle = Handle::new();
        observer.bind(handle.clone(), channel.clone());
        channel.register_observer(observer.clone());
        repository.data_channels.add(
            handle.as_str(),
            handle.clone(),
            Arc::new(ChannelEntry {
                native: channel.clone(),
                observer: observer.clone(),
            }),
        );
        (repository, events, channel, observer, handle)
    }

    #[test]
    fn test_closed_state_deregisters() {
        let (repository, events, channel, observer, handle) = registered_channel();
        let mut rx = events.subscribe();

        channel.set_state(RTCDataChannelState::Open);
        assert!(repository.data_channels.contains_handle(&handle));

        channel.set_state(RTCDataChannelState::Closed);
        assert!(!repository.data_channels.contains_handle(&handle));
        assert!(!observer.is_bound());

        let states: Vec<String> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                HostEvent::ChannelStateChanged { state, .. } => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec!["open".to_string(), "closed".to_string()]);
    }

    #[test]
    fn test_buffered_amount_is_absolute() {
        let (_repository, events, channel, _observer, handle) = registered_channel();
        let mut rx = events.subscribe();

        channel.set_buffered_amount(1024);
        channel.set_buffered_amount(256);

        let amounts: Vec<u64> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter_map(|e| match e {
                HostEvent::ChannelBufferedAmountChanged { handle: h, amount } => {
                    assert_eq!(h, handle);
                    Some(amount)
                }
                _ => None,
            })
            .collect();
        assert_eq!(amounts, vec![1024, 256]);
    }

    #[test]
    fn test_messages_encoded_by_kind() {
        let (_repository, events, channel, _observer, _handle) = registered_channel();
        let mut rx = events.subscribe();

        channel.receive(DataBuffer::text("hello"));
        channel.receive(DataBuffer::binary(vec![0xde, 0xad, 0xbe, 0xef]));

        match rx.try_recv().unwrap() {
            HostEvent::ChannelMessageReceived { binary, data, .. } => {
                assert!(!binary);
                assert_eq!(data, "hello");
            }
            other => panic!("unexpected event {:?}", other),
        }
        match rx.try_recv().unwrap() {
            HostEvent::ChannelMessageReceived { binary, data, .. } => {
                assert!(binary);
                assert_eq!(data, "3q2+7w==");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
