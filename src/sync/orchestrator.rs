//! Sync cycle orchestration.
//!
//! # Cycle
//! ```text
//! trigger
//!     → debounce (Event/Periodic dropped inside the window)
//!     → gate (one cycle at a time)
//!     → snapshot services → synthesize DesiredState
//!     → FETCH remote ──fail──→ cache ──miss──→ skeleton
//!     → MERGE (Reconciler)
//!     → PERSIST cache (failure logged)
//!     → PUSH /load ──fail──→ logged, retried on next trigger
//! ```
//!
//! # Shared State
//! - `gate`: async mutex serializing cycles
//! - `last_trigger`: debounce timestamp
//! - `effective_host`: remote host address, resolved once
//! - `last_pushed`: own route ids from the last successful push, read by
//!   the health monitor for drift detection

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::admin::{AdminError, ProxyAdmin};
use crate::config::{AgentConfig, AgentMode};
use crate::discovery::{host::detect_host_ip, DiscoveryError, DiscoverySource, ServiceFilter};
use crate::document::{CacheStore, ConfigDocument};
use crate::observability::metrics;
use crate::pipeline::{synthesize, SynthesisOptions};
use crate::reconcile::{MergeReport, Reconciler};

/// Why a cycle was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    Startup,
    Event,
    Periodic,
    Drift,
}

impl SyncTrigger {
    /// Startup and drift recovery must run even right after another cycle.
    pub fn bypasses_debounce(self) -> bool {
        matches!(self, SyncTrigger::Startup | SyncTrigger::Drift)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncTrigger::Startup => "startup",
            SyncTrigger::Event => "event",
            SyncTrigger::Periodic => "periodic",
            SyncTrigger::Drift => "drift",
        }
    }
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the base document of a cycle came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSource {
    Remote,
    Cache,
    Skeleton,
}

/// A completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub trigger: SyncTrigger,
    pub source: DocumentSource,
    pub merge: MergeReport,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Completed(CycleReport),
    /// Dropped inside the debounce window.
    Debounced,
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("discovery failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("config push failed: {0}")]
    Push(#[from] AdminError),
}

pub type SyncResult<T> = Result<T, SyncError>;

/// Result of a drift check against the live proxy config.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriftReport {
    /// Route ids pushed last time but absent from the live config.
    pub missing: Vec<String>,
}

impl DriftReport {
    pub fn has_drift(&self) -> bool {
        !self.missing.is_empty()
    }
}

/// Everything the orchestrator needs from configuration.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub agent_id: String,
    pub label_prefix: String,
    pub filter: Option<ServiceFilter>,
    pub mode: AgentMode,
    pub host_ip: Option<String>,
    pub admin_listen: String,
    pub skeleton_listen: Vec<String>,
    pub cache_path: PathBuf,
    pub debounce: Duration,
}

impl OrchestratorSettings {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            agent_id: config.agent.id.trim().to_string(),
            label_prefix: config.docker.label_prefix.clone(),
            filter: config
                .docker
                .filter_label
                .as_deref()
                .and_then(|f| f.parse().ok()),
            mode: config.agent.mode,
            host_ip: config.agent.host_ip.clone(),
            admin_listen: config.caddy.admin_listen.clone(),
            skeleton_listen: config.caddy.listen.clone(),
            cache_path: config.sync.cache_path.clone(),
            debounce: Duration::from_secs(config.sync.debounce_secs),
        }
    }
}

/// Long-lived owner of all sync state, shared by `Arc` with every trigger task.
pub struct SyncOrchestrator {
    discovery: Arc<dyn DiscoverySource>,
    admin: Arc<dyn ProxyAdmin>,
    cache: CacheStore,
    reconciler: Reconciler,
    settings: OrchestratorSettings,
    gate: tokio::sync::Mutex<()>,
    last_trigger: Mutex<Option<Instant>>,
    effective_host: OnceLock<Option<String>>,
    last_pushed: ArcSwap<BTreeSet<String>>,
}

impl SyncOrchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        discovery: Arc<dyn DiscoverySource>,
        admin: Arc<dyn ProxyAdmin>,
    ) -> Self {
        Self {
            discovery,
            admin,
            cache: CacheStore::new(settings.cache_path.clone()),
            reconciler: Reconciler::new(
                settings.agent_id.clone(),
                settings.admin_listen.clone(),
                settings.skeleton_listen.clone(),
            ),
            settings,
            gate: tokio::sync::Mutex::new(()),
            last_trigger: Mutex::new(None),
            effective_host: OnceLock::new(),
            last_pushed: ArcSwap::from_pointee(BTreeSet::new()),
        }
    }

    pub fn agent_id(&self) -> &str {
        &self.settings.agent_id
    }

    pub fn discovery(&self) -> &Arc<dyn DiscoverySource> {
        &self.discovery
    }

    /// Host address used for remote upstream addressing, resolved on first use.
    ///
    /// An explicit host IP always wins. In agent mode a missing one is
    /// auto-detected; other modes use same-host addressing.
    pub fn effective_host(&self) -> Option<&str> {
        self.effective_host
            .get_or_init(|| {
                let host = match (&self.settings.host_ip, self.settings.mode) {
                    (Some(ip), _) => Some(ip.clone()),
                    (None, AgentMode::Agent) => Some(detect_host_ip().to_string()),
                    (None, _) => None,
                };
                tracing::info!(
                    mode = %self.settings.mode,
                    host = host.as_deref().unwrap_or("local"),
                    "Upstream addressing resolved"
                );
                host
            })
            .as_deref()
    }

    /// Own route ids of the last successful push.
    pub fn last_pushed(&self) -> Arc<BTreeSet<String>> {
        self.last_pushed.load_full()
    }

    /// Claim the debounce window. False if the trigger must be dropped.
    fn admit(&self, trigger: SyncTrigger) -> bool {
        let mut last = self
            .last_trigger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Instant::now();

        if !trigger.bypasses_debounce() {
            if let Some(previous) = *last {
                if now.duration_since(previous) < self.settings.debounce {
                    return false;
                }
            }
        }
        *last = Some(now);
        true
    }

    /// Request a cycle. Event and periodic triggers inside the debounce
    /// window are dropped; otherwise waits for the gate and runs.
    pub async fn request_sync(&self, trigger: SyncTrigger) -> SyncResult<CycleOutcome> {
        if !self.admit(trigger) {
            tracing::debug!(trigger = %trigger, "Sync debounced");
            metrics::record_sync_cycle("debounced");
            return Ok(CycleOutcome::Debounced);
        }

        let result = self.run_cycle(trigger).await;
        match &result {
            Ok(report) => {
                metrics::record_sync_cycle("pushed");
                tracing::info!(
                    trigger = %trigger,
                    source = ?report.source,
                    added = report.merge.added.len(),
                    replaced = report.merge.replaced.len(),
                    removed = report.merge.removed.len(),
                    preserved = report.merge.preserved,
                    "Sync cycle complete"
                );
            }
            Err(SyncError::Discovery(e)) => {
                metrics::record_sync_cycle("discovery_failed");
                tracing::warn!(trigger = %trigger, error = %e, "Sync cycle aborted: discovery failed");
            }
            Err(SyncError::Push(e)) => {
                metrics::record_sync_cycle("push_failed");
                tracing::error!(trigger = %trigger, error = %e, "Sync cycle failed: config not pushed");
            }
        }
        result.map(CycleOutcome::Completed)
    }

    /// One full cycle, serialized by the gate. Bypasses debounce.
    pub async fn run_cycle(&self, trigger: SyncTrigger) -> SyncResult<CycleReport> {
        let _gate = self.gate.lock().await;
        tracing::debug!(trigger = %trigger, "Sync cycle starting");

        let services = self.discovery.snapshot().await?;
        let options = SynthesisOptions {
            agent_id: self.settings.agent_id.clone(),
            label_prefix: self.settings.label_prefix.clone(),
            remote_host: self.effective_host().map(str::to_string),
            filter: self.settings.filter.clone(),
        };
        let desired = synthesize(&services, &options);

        let (mut doc, source) = self.fetch_base().await;
        let merge = self.reconciler.reconcile(&mut doc, &desired);

        self.persist_cache(&doc).await;

        if let Err(e) = self.admin.load_config(&doc).await {
            metrics::record_push_failure();
            return Err(e.into());
        }

        self.last_pushed.store(Arc::new(desired.route_ids()));
        metrics::record_routes_owned(merge.owned());

        Ok(CycleReport {
            trigger,
            source,
            merge,
        })
    }

    async fn fetch_base(&self) -> (ConfigDocument, DocumentSource) {
        match self.admin.fetch_config().await {
            Ok(doc) => return (doc, DocumentSource::Remote),
            Err(e) => tracing::warn!(error = %e, "Failed to fetch live config, falling back to cache"),
        }

        let cache = self.cache.clone();
        let cached = match tokio::task::spawn_blocking(move || cache.load()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(error = %e, "Cache load task failed, starting from skeleton");
                return (self.reconciler.skeleton(), DocumentSource::Skeleton);
            }
        };

        match cached {
            Ok(Some(doc)) => {
                tracing::info!(path = %self.cache.path().display(), "Using cached config");
                (doc, DocumentSource::Cache)
            }
            Ok(None) => {
                tracing::info!("No cached config, starting from skeleton");
                (self.reconciler.skeleton(), DocumentSource::Skeleton)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Cached config unusable, starting from skeleton");
                (self.reconciler.skeleton(), DocumentSource::Skeleton)
            }
        }
    }

    async fn persist_cache(&self, doc: &ConfigDocument) {
        let cache = self.cache.clone();
        let snapshot = doc.clone();
        match tokio::task::spawn_blocking(move || cache.save(&snapshot)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(path = %self.cache.path().display(), error = %e, "Failed to persist config cache")
            }
            Err(e) => tracing::warn!(error = %e, "Cache save task failed"),
        }
    }

    /// Fetch the live config and compare it with the last push.
    pub async fn check_drift(&self) -> Result<DriftReport, AdminError> {
        let live = self.admin.fetch_config().await?;
        let live_ids: BTreeSet<&str> = live
            .routes()
            .filter(|r| r.is_owned_by(&self.settings.agent_id))
            .filter_map(|r| r.id.as_deref())
            .collect();

        let missing = self
            .last_pushed
            .load()
            .iter()
            .filter(|id| !live_ids.contains(id.as_str()))
            .cloned()
            .collect();
        Ok(DriftReport { missing })
    }
}
