// File: manager/src/config/manager.rs
use super::{Config, StoreRetryConfig, TopologyConfig};
use crate::constants::store_retry;
use anyhow::{anyhow, Result};
use glob::glob;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

pub struct ConfigManager {
    current_config: Arc<Config>,
}

impl ConfigManager {
    pub async fn new(config_dir: String) -> Result<Self> {
        let config = Self::load_configuration(&config_dir).await?;
        Ok(Self {
            current_config: Arc::new(config),
        })
    }

    pub fn get_current_config(&self) -> Arc<Config> {
        self.current_config.clone()
    }

    async fn load_configuration(config_dir: &str) -> Result<Config> {
        let main_config_path = format!("{}/main.toml", config_dir);
        let main_config_content = fs::read_to_string(&main_config_path).await
            .map_err(|e| anyhow!("Failed to read main config {}: {}", main_config_path, e))?;

        let mut config: Config = toml::from_str(&main_config_content)
            .map_err(|e| anyhow!("Failed to parse main config: {}", e))?;

        apply_retry_env_overrides(&mut config.store_retry)?;
        if config.store_retry.stop_after_attempt == 0 {
            return Err(anyhow!("store_retry.stop_after_attempt must be at least 1"));
        }
        if config.store_retry.wait_random_min_ms > config.store_retry.wait_random_max_ms {
            return Err(anyhow!(
                "store_retry.wait_random_min_ms ({}) exceeds wait_random_max_ms ({})",
                config.store_retry.wait_random_min_ms,
                config.store_retry.wait_random_max_ms
            ));
        }

        // Every other file in the directory describes part of the topology
        let pattern = format!("{}/*.toml", config_dir);
        let mut topology = TopologyConfig::default();

        for entry in glob(&pattern).map_err(|e| anyhow!("Glob pattern error: {}", e))? {
            let path = entry.map_err(|e| anyhow!("Glob entry error: {}", e))?;
            let filename = path.file_name()
                .and_then(|name| name.to_str())
                .ok_or_else(|| anyhow!("Invalid filename"))?;

            if filename == "main.toml" {
                continue;
            }

            debug!("Loading topology file: {}", path.display());

            let content = fs::read_to_string(&path).await
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;

            let file: TopologyConfig = toml::from_str(&content)
                .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;

            for (switch_id, switch) in file.switches {
                if topology.switches.insert(switch_id.clone(), switch).is_some() {
                    warn!("Switch {} redefined in {}, keeping the last definition", switch_id, filename);
                }
            }
            for (link_id, link) in file.links {
                if topology.links.insert(link_id.clone(), link).is_some() {
                    warn!("Link {} redefined in {}, keeping the last definition", link_id, filename);
                }
            }
        }

        config.topology = topology;

        info!("Loaded topology with {} switches and {} links",
            config.topology.switches.len(),
            config.topology.links.len()
        );

        Ok(config)
    }
}

fn apply_retry_env_overrides(retry: &mut StoreRetryConfig) -> Result<()> {
    if let Some(value) = env_override(store_retry::ENV_STOP_AFTER_ATTEMPT)? {
        retry.stop_after_attempt = u32::try_from(value)
            .map_err(|_| anyhow!("{} out of range: {}", store_retry::ENV_STOP_AFTER_ATTEMPT, value))?;
    }
    if let Some(value) = env_override(store_retry::ENV_WAIT_RANDOM_MIN_MS)? {
        retry.wait_random_min_ms = value;
    }
    if let Some(value) = env_override(store_retry::ENV_WAIT_RANDOM_MAX_MS)? {
        retry.wait_random_max_ms = value;
    }
    Ok(())
}

fn env_override(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| anyhow!("Invalid value '{}' for {}: {}", raw, name, e)),
        Err(_) => Ok(None),
    }
}
