//! # Network Status Demo
//!
//! A monitoring module owns a `network-status` event and shares it through
//! an [`EventRegistry`]. A pager and a dashboard subscribe to it; a
//! maintenance notice dispatched before anyone listens is held and replayed.
//!
//! Run with `RUST_LOG=herald_core=debug` to see the engine's own logs.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use herald_core::{context, Event, EventRegistry, KeyStyle, SequentialIds};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Contexts
// ============================================================================

#[derive(Debug)]
struct NetworkStatus;

#[derive(Debug)]
struct ServiceStatusUpdate {
    service: &'static str,
    up: bool,
    timestamp: DateTime<Utc>,
}

#[derive(Debug)]
struct MaintenanceNotice {
    message: String,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

context!(NetworkStatus);
context!(ServiceStatusUpdate: NetworkStatus);
context!(MaintenanceNotice: NetworkStatus, deferrable);

// ============================================================================
// Owner
// ============================================================================

/// Registry entry for the monitoring module's event.
struct NetworkEvents(Mutex<Event<String>>);

const OWNER: &str = "monitoring";

fn register_events(registry: &EventRegistry) -> Result<()> {
    let event = Event::builder("network-status")
        .context::<NetworkStatus>()
        .context::<ServiceStatusUpdate>()
        .context::<MaintenanceNotice>()
        .behavior_queue(true)
        .id_strategy(SequentialIds::new())
        .build()?;
    registry.register(Arc::new(NetworkEvents(Mutex::new(event))), OWNER, false)?;
    Ok(())
}

fn with_event<T>(registry: &EventRegistry, f: impl FnOnce(&mut Event<String>) -> Result<T>) -> Result<T> {
    let events = registry.get::<NetworkEvents, _>(OWNER)?;
    let mut event = events.0.lock().map_err(|_| anyhow!("network-status event lock poisoned"))?;
    f(&mut event)
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let registry = EventRegistry::new();
    register_events(&registry)?;

    // Nobody listens yet: the notice is held.
    let now = Utc::now();
    with_event(&registry, |event| {
        let report = event.dispatch(MaintenanceNotice {
            message: "core switch upgrade".into(),
            start: now + Duration::hours(1),
            end: now + Duration::hours(3),
        })?;
        info!(listeners = report.listener_count(), held = event.held().len(), "maintenance notice dispatched");
        Ok(())
    })?;

    // Pager: only cares about outages. Fails for one flaky service.
    with_event(&registry, |event| {
        let mut pager = event.subscribe()?;
        pager.listen(|update: &ServiceStatusUpdate| {
            if update.service == "legacy-smtp" {
                return Err(anyhow!("no on-call rotation for {}", update.service));
            }
            Ok(if update.up {
                "ignored".to_string()
            } else {
                format!("paged on-call: {} down since {}", update.service, update.timestamp.format("%H:%M:%S"))
            })
        })?;
        Ok(())
    })?;

    // Dashboard: listening for notices replays the held one.
    with_event(&registry, |event| {
        let mut dashboard = event.subscribe()?;
        let outcome = dashboard.listen(|notice: &MaintenanceNotice| {
            Ok(format!(
                "banner: {} ({} - {})",
                notice.message,
                notice.start.format("%H:%M"),
                notice.end.format("%H:%M")
            ))
        })?;
        if let Some(replay) = outcome.replayed() {
            for (id, value) in replay.values() {
                info!(subscription = id, value = %value, "replayed");
            }
        }
        dashboard.listen(|update: &ServiceStatusUpdate| Ok(format!("tile {} -> {}", update.service, update.up)))?;
        Ok(())
    })?;

    for (service, up) in [("api", true), ("database", false), ("legacy-smtp", false)] {
        with_event(&registry, |event| {
            let report = event.dispatch(ServiceStatusUpdate {
                service,
                up,
                timestamp: Utc::now(),
            })?;
            for (id, value) in report.values() {
                info!(subscription = id, value = %value, "delivered");
            }
            for (id, err) in report.errors() {
                warn!(subscription = id, error = %err, "subscriber failed");
            }
            println!("{}", serde_json::to_string(&report.summary())?);
            Ok(())
        })?;
    }

    // The dashboard closes; the next dispatch evicts it.
    with_event(&registry, |event| {
        event.disconnect("network-status-1");
        let report = event.dispatch(ServiceStatusUpdate {
            service: "api",
            up: true,
            timestamp: Utc::now(),
        })?;
        info!(remaining = event.count(), "after eviction");
        println!("{}", serde_json::to_string(&report.summary())?);

        if let Some(stats) = event.inspect(KeyStyle::Short) {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Ok(())
    })?;

    let removed = registry.unregister::<NetworkEvents>(None);
    info!(removed, "shutdown");
    Ok(())
}
