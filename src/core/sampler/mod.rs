//! Vitals sampling core.
//!
//! Probes measure one vital each, the scheduler drives one timer per vital,
//! and readings flow to a [`ReadingSink`]. Settings changes reach the
//! scheduler through a typed change stream.

mod metrics;
mod probe;
pub mod probes;
mod runtime;
mod scheduler;
mod settings;
mod sink;

pub use metrics::{MetricKind, Reading, VitalsSnapshot};
pub use probe::{Probe, ProbeOptions, ProbeSet, SharedProbe};
pub use runtime::{config_watch_task, run_sampler, VitalsRuntime, DEFAULT_RELOAD_INTERVAL};
pub use scheduler::{Scheduler, TimerHandle};
pub use settings::{
    clamp_interval_ms, KeyFilter, SettingChange, SettingKey, SettingValue, Settings,
    Subscription, MAX_INTERVAL_MS, MIN_INTERVAL_MS,
};
pub use sink::{ChannelSink, LogSink, ReadingSink, SnapshotSink};
