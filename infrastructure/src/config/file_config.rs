//! Engine configuration from TOML
//!
//! Example configuration:
//!
//! ```toml
//! [engine]
//! min_participants_to_start = 2
//! default_turn_timeout_seconds = 300
//! max_participants = 16
//!
//! [bridge]
//! outbound_topic = "discussion.events"
//! inbound_topic = "discussion.commands"
//! publish_max_retries = 5
//! publish_backoff_ms = 250
//! dedup_capacity = 1024
//! ```

use parley_application::{BridgeConfig, EngineConfig};
use parley_domain::DiscussionSettings;
use serde::{Deserialize, Serialize};

/// Root of the TOML configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineFileConfig {
    pub engine: FileEngineConfig,
    pub bridge: FileBridgeConfig,
}

/// `[engine]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    /// Minimum active participants required by `start`
    pub min_participants_to_start: usize,
    /// Default per-turn budget applied to new discussions
    pub default_turn_timeout_seconds: u64,
    /// Default roster cap applied to new discussions
    pub max_participants: usize,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        Self {
            min_participants_to_start: 2,
            default_turn_timeout_seconds: 300,
            max_participants: 16,
        }
    }
}

/// `[bridge]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileBridgeConfig {
    pub outbound_topic: String,
    pub inbound_topic: String,
    pub publish_max_retries: u32,
    pub publish_backoff_ms: u64,
    pub dedup_capacity: usize,
}

impl Default for FileBridgeConfig {
    fn default() -> Self {
        let defaults = BridgeConfig::default();
        Self {
            outbound_topic: defaults.outbound_topic,
            inbound_topic: defaults.inbound_topic,
            publish_max_retries: defaults.publish_max_retries,
            publish_backoff_ms: defaults.publish_backoff_ms,
            dedup_capacity: defaults.dedup_capacity,
        }
    }
}

impl EngineFileConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            min_participants_to_start: self.engine.min_participants_to_start,
        }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            outbound_topic: self.bridge.outbound_topic.clone(),
            inbound_topic: self.bridge.inbound_topic.clone(),
            publish_max_retries: self.bridge.publish_max_retries,
            publish_backoff_ms: self.bridge.publish_backoff_ms,
            dedup_capacity: self.bridge.dedup_capacity,
        }
    }

    /// Settings template for discussions created without explicit settings
    pub fn default_settings(&self) -> DiscussionSettings {
        DiscussionSettings {
            turn_timeout_seconds: self.engine.default_turn_timeout_seconds,
            max_participants: self.engine.max_participants,
            ..Default::default()
        }
    }
}
