// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod ingest;
pub mod metrics;

pub use crate::ingest::config::{load_config_default, CollectorConfig};
pub use crate::ingest::history::{FileRunHistory, InMemoryRunHistory, RunHistory};
pub use crate::ingest::listener::{JobListener, LifecycleEvent, LifecycleKind, ListenerMux};
pub use crate::ingest::orchestrator::{AdapterRegistry, JobOutcome, JobPhase, Orchestrator};
pub use crate::ingest::scheduler::{run_all_once, spawn_scheduler, SchedulerCfg};
