// File: manager/src/services/event_service.rs
//
// Interruption events for the topology layer: one coalesced event per
// maintenance start/end listing every device newly down (or newly up).
//
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::constants::MAINTENANCE_REASON;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptionKind {
    Start,
    End,
}

impl InterruptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterruptionKind::Start => "start",
            InterruptionKind::End => "end",
        }
    }
}

/// Devices affected by one start/end, deduplicated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffectedDevices {
    pub switches: BTreeSet<String>,
    pub interfaces: BTreeSet<String>,
    pub links: BTreeSet<String>,
}

impl AffectedDevices {
    pub fn is_empty(&self) -> bool {
        self.switches.is_empty() && self.interfaces.is_empty() && self.links.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterruptionContent {
    #[serde(rename = "type")]
    pub reason: String,
    #[serde(flatten)]
    pub devices: AffectedDevices,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterruptionEvent {
    pub name: String,
    pub kind: InterruptionKind,
    pub content: InterruptionContent,
    pub timestamp: DateTime<Utc>,
}

impl InterruptionEvent {
    pub fn maintenance(kind: InterruptionKind, devices: AffectedDevices) -> Self {
        Self {
            name: format!("topology.interruption.{}", kind.as_str()),
            kind,
            content: InterruptionContent {
                reason: MAINTENANCE_REASON.to_string(),
                devices,
            },
            timestamp: Utc::now(),
        }
    }

    pub fn devices(&self) -> &AffectedDevices {
        &self.content.devices
    }
}

/// Emit-only sink for device down/up notifications
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: InterruptionEvent) -> Result<()>;
}

/// In-process fan-out over a tokio broadcast channel
#[derive(Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<InterruptionEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<InterruptionEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastEventSink {
    async fn emit(&self, event: InterruptionEvent) -> Result<()> {
        match self.sender.send(event) {
            Ok(receivers) => debug!("Interruption event delivered to {} subscribers", receivers),
            Err(broadcast::error::SendError(event)) => {
                debug!("No subscribers for {}", event.name)
            }
        }
        Ok(())
    }
}

/// POSTs every event as JSON to a webhook
pub struct WebhookEventSink {
    webhook_url: String,
    client: Client,
}

impl WebhookEventSink {
    pub fn new(webhook_url: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client for event webhook: {}", e))?;

        Ok(Self {
            webhook_url,
            client,
        })
    }

    pub fn get_webhook_url(&self) -> &str {
        &self.webhook_url
    }
}

#[async_trait]
impl EventSink for WebhookEventSink {
    async fn emit(&self, event: InterruptionEvent) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&event)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send {} to {}: {}", event.name, self.webhook_url, e))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Webhook {} rejected {} with status {}",
                self.webhook_url,
                event.name,
                response.status()
            ));
        }

        info!("Sent {} to webhook", event.name);
        Ok(())
    }
}

/// Delivers each event to every inner sink; one failing sink does not stop the others
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

#[async_trait]
impl EventSink for FanoutEventSink {
    async fn emit(&self, event: InterruptionEvent) -> Result<()> {
        let deliveries = self.sinks.iter().map(|sink| sink.emit(event.clone()));
        let results = join_all(deliveries).await;

        let mut failures = Vec::new();
        for result in results {
            if let Err(e) = result {
                warn!("Event sink failed for {}: {}", event.name, e);
                failures.push(e.to_string());
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("{} event sink(s) failed: {}", failures.len(), failures.join("; ")))
        }
    }
}
