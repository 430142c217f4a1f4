//! Bridge configuration

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::types::IceServer;

/// Maximum concurrent peer connections unless configured otherwise
const DEFAULT_MAX_CONNECTIONS: usize = 8;

/// Host event ring buffer size
const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// STUN server URLs used when a connection request carries no ICE servers
    pub stun_servers: Vec<String>,
    /// TURN servers used when a connection request carries no ICE servers
    pub turn_servers: Vec<TurnServer>,
    /// Maximum number of simultaneously registered peer connections
    pub max_connections: usize,
    /// Host event channel capacity
    pub event_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            // Host candidates are enough for local peers; the host configures STUN/TURN
            stun_servers: vec![],
            turn_servers: vec![],
            max_connections: DEFAULT_MAX_CONNECTIONS,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl BridgeConfig {
    /// Parse a host-provided JSON configuration. Missing keys keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(BridgeError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(BridgeError::Config(
                "event_capacity must be at least 1".to_string(),
            ));
        }
        if let Some(turn) = self.turn_servers.iter().find(|t| t.urls.is_empty()) {
            return Err(BridgeError::Config(format!(
                "TURN server for user '{}' has no URLs",
                turn.username
            )));
        }
        Ok(())
    }

    /// Fallback ICE servers, STUN first
    pub fn fallback_ice_servers(&self) -> Vec<IceServer> {
        let mut servers = Vec::with_capacity(self.stun_servers.len() + self.turn_servers.len());

        for stun_url in &self.stun_servers {
            servers.push(IceServer {
                urls: vec![stun_url.clone()],
                username: None,
                credential: None,
            });
        }

        for turn in &self.turn_servers {
            servers.push(IceServer {
                urls: turn.urls.clone(),
                username: Some(turn.username.clone()),
                credential: Some(turn.credential.clone()),
            });
        }

        servers
    }
}

/// TURN server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnServer {
    /// TURN server URLs; several allow fallback between UDP and TCP transports
    pub urls: Vec<String>,
    /// Username for TURN authentication
    pub username: String,
    /// Credential for TURN authentication
    pub credential: String,
}

impl TurnServer {
    pub fn new(url: String, username: String, credential: String) -> Self {
        Self {
            urls: vec![url],
            username,
            credential,
        }
    }
}
