//! In-memory discovery source.
//!
//! Holds a fixed service list that callers replace explicitly. Used when
//! the agent is embedded without a container runtime, and by tests.

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::discovery::types::{DiscoveryResult, LifecycleEvent, ServiceRecord};
use crate::discovery::DiscoverySource;

#[derive(Debug, Default)]
pub struct StaticSource {
    services: Mutex<Vec<ServiceRecord>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<LifecycleEvent>>>,
}

impl StaticSource {
    pub fn new(services: Vec<ServiceRecord>) -> Self {
        Self {
            services: Mutex::new(services),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Replace the service list returned by later snapshots.
    pub fn replace(&self, services: Vec<ServiceRecord>) {
        if let Ok(mut guard) = self.services.lock() {
            *guard = services;
        }
    }

    /// Deliver an event to every live subscriber.
    pub fn emit(&self, event: LifecycleEvent) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }
}

#[async_trait]
impl DiscoverySource for StaticSource {
    async fn snapshot(&self) -> DiscoveryResult<Vec<ServiceRecord>> {
        Ok(self
            .services
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default())
    }

    async fn subscribe(&self) -> DiscoveryResult<mpsc::Receiver<LifecycleEvent>> {
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel();
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(raw_tx);
        }

        // Bridge to the bounded receiver the trait hands out.
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            while let Some(event) = raw_rx.recv().await {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });
        Ok(rx)
    }
}
