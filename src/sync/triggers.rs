//! Background tasks that request sync cycles.
//!
//! # Responsibilities
//! - Event loop: one request per lifecycle event, resubscribing with
//!   backoff when the stream ends or cannot be opened
//! - Periodic loop: coarse fallback resync on a fixed interval

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::resilience::calculate_backoff;
use crate::sync::orchestrator::{SyncOrchestrator, SyncTrigger};

const RESUBSCRIBE_BASE: Duration = Duration::from_secs(1);
const RESUBSCRIBE_MAX: Duration = Duration::from_secs(30);

/// Forward discovery events into sync requests until shutdown.
pub async fn run_event_loop(orchestrator: Arc<SyncOrchestrator>, mut shutdown: broadcast::Receiver<()>) {
    let mut attempt: u32 = 0;

    loop {
        match orchestrator.discovery().subscribe().await {
            Ok(mut events) => {
                tracing::info!("Subscribed to lifecycle events");
                attempt = 0;
                loop {
                    tokio::select! {
                        event = events.recv() => match event {
                            Some(event) => {
                                tracing::debug!(
                                    action = ?event.action,
                                    service = %event.service,
                                    "Lifecycle event"
                                );
                                // Failures are logged inside; the next trigger retries.
                                let _ = orchestrator.request_sync(SyncTrigger::Event).await;
                            }
                            None => {
                                tracing::warn!("Lifecycle event stream ended");
                                break;
                            }
                        },
                        _ = shutdown.recv() => {
                            tracing::info!("Event loop received shutdown signal, exiting loop");
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt, "Failed to subscribe to lifecycle events");
            }
        }

        attempt = attempt.saturating_add(1);
        let delay = calculate_backoff(attempt, RESUBSCRIBE_BASE, RESUBSCRIBE_MAX);
        tokio::select! {
            _ = time::sleep(delay) => {}
            _ = shutdown.recv() => {
                tracing::info!("Event loop received shutdown signal, exiting loop");
                return;
            }
        }
    }
}

/// Request a periodic resync every `period` until shutdown. The first
/// tick fires one period after start.
pub async fn run_periodic_loop(
    orchestrator: Arc<SyncOrchestrator>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    tracing::info!(interval_secs = period.as_secs(), "Periodic resync starting");
    let mut ticker = time::interval_at(time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let _ = orchestrator.request_sync(SyncTrigger::Periodic).await;
            }
            _ = shutdown.recv() => {
                tracing::info!("Periodic resync received shutdown signal, exiting loop");
                break;
            }
        }
    }
}
