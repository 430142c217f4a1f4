use std::sync::Arc;

use tracing::{debug, info};
use webrtc::data_channel::data_channel_state::RTCDataChannelState;

use super::RtcBridge;
use crate::engine::DataChannel;
use crate::error::{BridgeError, Result};
use crate::observer::ChannelObserver;
use crate::registry::{ChannelEntry, Handle};
use crate::types::{DataChannelInfo, DataChannelInit, SendBuffer};

impl RtcBridge {
    fn data_channel(&self, handle: &Handle) -> Result<Arc<dyn DataChannel>> {
        self.repository
            .data_channels
            .get_by_handle(handle)
            .map(|entry| entry.native.clone())
            .ok_or_else(|| BridgeError::NotFound(format!("Data channel not found: {}", handle)))
    }

    /// Create a data channel on a connection and start observing it
    pub fn create_data_channel(
        &self,
        connection_handle: &Handle,
        label: &str,
        init: &DataChannelInit,
    ) -> Result<DataChannelInfo> {
        let connection = self.connection(connection_handle)?;
        let native_init = init.to_native()?;
        let channel = connection
            .create_data_channel(label, native_init)
            .map_err(|e| BridgeError::native("CreateDataChannelFailed", e))?;

        let handle = Handle::new();
        let observer = Arc::new(ChannelObserver::new(
            self.repository.clone(),
            self.events.clone(),
        ));
        observer.bind(handle.clone(), channel.clone());
        // Registered before the observer goes live so a close callback finds the entry
        self.repository.data_channels.add(
            handle.as_str(),
            handle.clone(),
            Arc::new(ChannelEntry {
                native: channel.clone(),
                observer: observer.clone(),
            }),
        );
        channel.register_observer(observer);

        info!("Data channel '{}' opened on {}: {}", label, connection_handle, handle);
        Ok(DataChannelInfo::describe(channel.as_ref(), &handle))
    }

    /// Request a close. Only an open channel is closed; the observer
    /// deregisters it once the engine reports the closed state.
    pub fn close_data_channel(&self, handle: &Handle) -> Result<()> {
        let channel = self.data_channel(handle)?;
        if channel.state() != RTCDataChannelState::Open {
            debug!("Data channel {} not open, close ignored", handle);
            return Ok(());
        }
        channel.close();
        Ok(())
    }

    pub fn send_data_channel_message(&self, handle: &Handle, buffer: &SendBuffer) -> Result<()> {
        let channel = self.data_channel(handle)?;
        let native = buffer.to_native()?;
        channel
            .send(native)
            .map_err(|e| BridgeError::native("SendFailed", e))
    }

    pub fn data_channel_info(&self, handle: &Handle) -> Result<DataChannelInfo> {
        let channel = self.data_channel(handle)?;
        Ok(DataChannelInfo::describe(channel.as_ref(), handle))
    }
}
