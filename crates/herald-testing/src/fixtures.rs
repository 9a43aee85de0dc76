//! Network-status contexts.
//!
//! ```text
//! NetworkStatus
//! ├── ServiceStatusUpdate
//! └── MaintenanceNotice (deferrable)
//!
//! Heartbeat (unrelated root)
//! ```

use chrono::{DateTime, Duration, Utc};
use herald_core::{context, ContextType, Event, SequentialIds};

pub const EVENT_NAME: &str = "network-status";

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkStatus;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceStatusUpdate {
    pub service_status: bool,
    pub timestamp: DateTime<Utc>,
}

impl ServiceStatusUpdate {
    pub fn up() -> Self {
        Self {
            service_status: true,
            timestamp: Utc::now(),
        }
    }

    pub fn down() -> Self {
        Self {
            service_status: false,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceNotice {
    pub message: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub timestamp: DateTime<Utc>,
}

impl MaintenanceNotice {
    /// A window starting in one hour and lasting `hours`.
    pub fn scheduled(message: impl Into<String>, hours: i64) -> Self {
        let now = Utc::now();
        let start = now + Duration::hours(1);
        Self {
            message: message.into(),
            start,
            end: start + Duration::hours(hours),
            timestamp: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Heartbeat;

context!(NetworkStatus);
context!(ServiceStatusUpdate: NetworkStatus);
context!(MaintenanceNotice: NetworkStatus, deferrable);
context!(Heartbeat);

/// Every type the network-status event accepts, primary first.
pub fn network_contexts() -> [ContextType; 3] {
    [
        ContextType::of::<NetworkStatus>(),
        ContextType::of::<ServiceStatusUpdate>(),
        ContextType::of::<MaintenanceNotice>(),
    ]
}

/// The network-status event with sequential ids (`network-status-0`, ...).
pub fn network_status_event<R>(behavior_queue: bool) -> Event<R> {
    match Event::builder(EVENT_NAME)
        .contexts(network_contexts())
        .behavior_queue(behavior_queue)
        .id_strategy(SequentialIds::new())
        .build()
    {
        Ok(event) => event,
        Err(err) => panic!("network-status fixture is misconfigured: {err}"),
    }
}
