// File: manager/src/config/mod.rs
pub mod manager;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
pub use manager::ConfigManager;

use crate::constants::{defaults, store_retry};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Where interruption events are POSTed; events stay in-process when unset
    pub event_webhook_url: Option<String>,
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    #[serde(default)]
    pub store_retry: StoreRetryConfig,
    // Populated from the topology files next to main.toml
    #[serde(skip)]
    pub topology: TopologyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_path: default_database_path(),
            event_webhook_url: None,
            event_channel_capacity: default_event_channel_capacity(),
            store_retry: StoreRetryConfig::default(),
            topology: TopologyConfig::default(),
        }
    }
}

fn default_host() -> String {
    defaults::HOST.to_string()
}

fn default_port() -> u16 {
    defaults::PORT
}

fn default_database_path() -> String {
    defaults::DATABASE_PATH.to_string()
}

fn default_event_channel_capacity() -> usize {
    defaults::EVENT_CHANNEL_CAPACITY
}

/// Bounded retry with a random wait for transient storage errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRetryConfig {
    #[serde(default = "default_stop_after_attempt")]
    pub stop_after_attempt: u32,
    #[serde(default = "default_wait_random_min_ms")]
    pub wait_random_min_ms: u64,
    #[serde(default = "default_wait_random_max_ms")]
    pub wait_random_max_ms: u64,
}

impl Default for StoreRetryConfig {
    fn default() -> Self {
        Self {
            stop_after_attempt: default_stop_after_attempt(),
            wait_random_min_ms: default_wait_random_min_ms(),
            wait_random_max_ms: default_wait_random_max_ms(),
        }
    }
}

fn default_stop_after_attempt() -> u32 {
    store_retry::STOP_AFTER_ATTEMPT
}

fn default_wait_random_min_ms() -> u64 {
    store_retry::WAIT_RANDOM_MIN_MS
}

fn default_wait_random_max_ms() -> u64 {
    store_retry::WAIT_RANDOM_MAX_MS
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TopologyConfig {
    #[serde(default)]
    pub switches: HashMap<String, SwitchConfig>,
    #[serde(default)]
    pub links: HashMap<String, LinkConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchConfig {
    #[serde(default)]
    pub interfaces: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    pub endpoint_a: String,
    pub endpoint_b: String,
}
