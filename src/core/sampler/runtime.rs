//! Single-threaded tokio runtime driving the sampler.
//!
//! All timers, probes and the settings observer run on one current-thread
//! event loop; external tools are awaited, never blocked on.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use super::probe::{ProbeOptions, ProbeSet};
use super::scheduler::Scheduler;
use super::settings::Settings;
use super::sink::ReadingSink;
use crate::core::config::VitalsConfig;

/// How often a watched config file is checked for changes
pub const DEFAULT_RELOAD_INTERVAL: Duration = Duration::from_secs(2);

const MIN_RELOAD_INTERVAL: Duration = Duration::from_millis(1);

/// Owns the event loop, the settings store and the shutdown signal.
pub struct VitalsRuntime {
    runtime: tokio::runtime::Runtime,
    settings: Settings,
    options: ProbeOptions,
    shutdown_tx: broadcast::Sender<()>,
    // Subscribed up front so a shutdown sent before `run` is not lost
    scheduler_shutdown: broadcast::Receiver<()>,
    watcher_shutdown: broadcast::Receiver<()>,
    watched_config: Option<(PathBuf, Duration)>,
}

impl VitalsRuntime {
    pub fn new(config: &VitalsConfig, options: ProbeOptions) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (shutdown_tx, scheduler_shutdown) = broadcast::channel::<()>(1);
        let watcher_shutdown = shutdown_tx.subscribe();

        Ok(Self {
            runtime,
            settings: Settings::from_config(config),
            options,
            shutdown_tx,
            scheduler_shutdown,
            watcher_shutdown,
            watched_config: None,
        })
    }

    /// Re-read `path` every `every` (at least 1 ms) and push changed values
    /// into the settings store.
    pub fn watch_config(mut self, path: PathBuf, every: Duration) -> Self {
        self.watched_config = Some((path, every.max(MIN_RELOAD_INTERVAL)));
        self
    }

    pub fn settings(&self) -> Settings {
        self.settings.clone()
    }

    /// Sender that stops [`VitalsRuntime::run`]; usable from any thread.
    pub fn shutdown_sender(&self) -> broadcast::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Build the probes, start every timer and sample until shutdown.
    pub fn run(self, sink: Arc<dyn ReadingSink>) -> anyhow::Result<()> {
        let probes = ProbeSet::from_options(&self.options);
        let settings = self.settings;
        let scheduler_shutdown = self.scheduler_shutdown;
        let watcher_shutdown = self.watcher_shutdown;
        let watched_config = self.watched_config;

        self.runtime.block_on(async move {
            if let Some((path, every)) = watched_config {
                tokio::spawn(config_watch_task(
                    path,
                    settings.clone(),
                    every,
                    watcher_shutdown,
                ));
            }

            run_sampler(probes, sink, settings, scheduler_shutdown).await;
        });

        log::info!("Sampler runtime finished");
        Ok(())
    }
}

/// Run a scheduler over `probes` until `shutdown` fires.
pub async fn run_sampler(
    probes: ProbeSet,
    sink: Arc<dyn ReadingSink>,
    settings: Settings,
    shutdown: broadcast::Receiver<()>,
) {
    let subscription = settings.subscribe("");
    let mut scheduler = Scheduler::new(probes, sink, settings);
    scheduler.start();
    scheduler.run(subscription, shutdown).await;
}

/// Poll a config file and apply the differences to `settings`.
pub async fn config_watch_task(
    path: PathBuf,
    settings: Settings,
    every: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(every.max(MIN_RELOAD_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_modified = None;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let modified = tokio::fs::metadata(&path)
                    .await
                    .and_then(|meta| meta.modified())
                    .ok();
                if modified == last_modified {
                    continue;
                }
                last_modified = modified;

                match VitalsConfig::load_from(&path) {
                    Ok(config) => {
                        let changed = settings.apply_config(&config);
                        if changed > 0 {
                            log::info!("Applied {} setting change(s) from {:?}", changed, path);
                        }
                    }
                    Err(e) => log::warn!("Config reload failed: {:#}", e),
                }
            }
            _ = shutdown.recv() => break,
        }
    }
}
