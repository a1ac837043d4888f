//! Per-metric repeating timers.
//!
//! Each metric owns at most one live [`TimerHandle`]. A timer is a tokio task
//! ticking at the metric's interval; on each tick it samples the bound probe
//! (only while the metric is visible) and forwards the reading to the sink.
//!
//! Cancelling a timer means "never tick again": a sample already in flight
//! is allowed to finish, but its reading is dropped.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::metrics::MetricKind;
use super::probe::{ProbeSet, SharedProbe};
use super::settings::{
    clamp_interval_ms, SettingChange, SettingKey, SettingValue, Settings, Subscription,
};
use super::sink::ReadingSink;

/// Handle to one running timer task.
///
/// Dropping the handle cancels the timer as well.
pub struct TimerHandle {
    interval: Duration,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    fn cancel(self) {
        // The receiver is gone if the task already exited
        let _ = self.cancel.send(true);
    }
}

/// Scheduler state for one metric
struct MetricSlot {
    probe: SharedProbe,
    visible: Arc<AtomicBool>,
    running_tasks: Arc<AtomicUsize>,
    interval: Duration,
    timer: Option<TimerHandle>,
}

/// Decrements the running-task counter when a timer task ends.
struct TaskGuard(Arc<AtomicUsize>);

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Owns one repeating timer per metric.
///
/// All methods that spawn timers must run inside a tokio runtime.
pub struct Scheduler {
    slots: BTreeMap<MetricKind, MetricSlot>,
    sink: Arc<dyn ReadingSink>,
    settings: Settings,
    running: bool,
}

impl Scheduler {
    /// Bind every probe in `probes` to its interval and visibility in
    /// `settings`. No timer runs until [`Scheduler::start`].
    pub fn new(probes: ProbeSet, sink: Arc<dyn ReadingSink>, settings: Settings) -> Self {
        let slots = MetricKind::ALL
            .into_iter()
            .filter_map(|metric| {
                let probe = probes.get(metric)?;
                Some((
                    metric,
                    MetricSlot {
                        probe,
                        visible: Arc::new(AtomicBool::new(settings.is_visible(metric))),
                        running_tasks: Arc::new(AtomicUsize::new(0)),
                        interval: settings.interval(metric),
                        timer: None,
                    },
                ))
            })
            .collect();

        Self {
            slots,
            sink,
            settings,
            running: false,
        }
    }

    /// Start one timer per metric. Calling it again replaces each timer
    /// one-for-one.
    pub fn start(&mut self) {
        self.running = true;
        let metrics: Vec<MetricKind> = self.slots.keys().copied().collect();
        for metric in metrics {
            let interval = self.slots[&metric].interval;
            self.replace_timer(metric, interval);
        }
        log::info!("Scheduler started with {} timers", self.slots.len());
    }

    /// Replace the timer of `metric` with one ticking every `interval`
    /// (clamped to the allowed range).
    ///
    /// The old handle is cancelled and the new one stored before this
    /// returns, so there is never more than one live handle per metric.
    /// While the scheduler is stopped only the interval is recorded. An
    /// unchanged interval leaves a live timer untouched.
    pub fn reconfigure_interval(&mut self, metric: MetricKind, interval: Duration) {
        let interval = clamp_interval(interval);
        let Some(slot) = self.slots.get_mut(&metric) else {
            log::debug!("No probe for {}; ignoring interval change", metric);
            return;
        };

        // Same interval on a live timer: keep its phase
        if slot.interval == interval && slot.timer.is_some() {
            return;
        }
        slot.interval = interval;

        if !self.running {
            return;
        }

        log::debug!("{} interval now {:?}", metric, interval);
        self.replace_timer(metric, interval);
    }

    /// Gate sampling of `metric`. Takes effect on the next tick, and drops
    /// the reading of a sample in flight.
    pub fn set_visible(&mut self, metric: MetricKind, visible: bool) {
        if let Some(slot) = self.slots.get(&metric) {
            slot.visible.store(visible, Ordering::SeqCst);
            log::debug!("{} visible: {}", metric, visible);
        }
    }

    /// Cancel every live timer. Safe to call repeatedly.
    pub fn stop(&mut self) {
        let mut cancelled = 0;
        for slot in self.slots.values_mut() {
            if let Some(handle) = slot.timer.take() {
                handle.cancel();
                cancelled += 1;
            }
        }
        if self.running {
            log::info!("Scheduler stopped ({} timers cancelled)", cancelled);
        }
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_visible(&self, metric: MetricKind) -> bool {
        self.slots
            .get(&metric)
            .map(|slot| slot.visible.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Interval currently in effect for `metric`
    pub fn interval_of(&self, metric: MetricKind) -> Option<Duration> {
        self.slots.get(&metric).map(|slot| slot.interval)
    }

    /// Live handles held for `metric` (0 or 1)
    pub fn live_timer_count(&self, metric: MetricKind) -> usize {
        self.slots
            .get(&metric)
            .and_then(|slot| slot.timer.as_ref())
            .map_or(0, |_| 1)
    }

    /// Timer tasks of `metric` that have not exited yet, including cancelled
    /// ones still finishing an in-flight sample.
    pub fn running_task_count(&self, metric: MetricKind) -> usize {
        self.slots
            .get(&metric)
            .map_or(0, |slot| slot.running_tasks.load(Ordering::SeqCst))
    }

    /// Reset the probe of `metric`, after any sample in flight.
    pub async fn reset_probe(&self, metric: MetricKind) -> bool {
        let Some(slot) = self.slots.get(&metric) else {
            return false;
        };
        slot.probe.lock().await.reset();
        log::info!("{} probe reset", metric);
        true
    }

    /// Last failure recorded by the probe of `metric`
    pub async fn last_error(&self, metric: MetricKind) -> Option<String> {
        let slot = self.slots.get(&metric)?;
        let probe = slot.probe.lock().await;
        probe.last_error()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// React to settings changes until `shutdown` fires or the store goes
    /// away, then stop all timers and dispose of the subscription.
    pub async fn run(
        &mut self,
        mut subscription: Subscription,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        if !self.running {
            self.start();
        }

        loop {
            tokio::select! {
                change = subscription.recv() => match change {
                    Some(change) => self.apply_change(change),
                    None => break,
                },
                _ = shutdown.recv() => {
                    log::debug!("Scheduler received shutdown");
                    break;
                }
            }
        }

        self.stop();
        subscription.dispose();
    }

    /// Apply one settings change
    pub fn apply_change(&mut self, change: SettingChange) {
        match (change.key, change.value) {
            (SettingKey::Interval(metric), SettingValue::Millis(ms)) => {
                self.reconfigure_interval(metric, Duration::from_millis(ms));
            }
            (SettingKey::Visible(metric), SettingValue::Bool(visible)) => {
                self.set_visible(metric, visible);
            }
            (key, value) => {
                log::warn!("Ignoring mistyped setting {} = {:?}", key, value);
            }
        }
    }

    fn replace_timer(&mut self, metric: MetricKind, interval: Duration) {
        let Some(slot) = self.slots.get_mut(&metric) else {
            return;
        };

        if let Some(old) = slot.timer.take() {
            old.cancel();
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        slot.running_tasks.fetch_add(1, Ordering::SeqCst);
        let guard = TaskGuard(slot.running_tasks.clone());

        let task = tokio::spawn(timer_task(
            metric,
            interval,
            slot.probe.clone(),
            slot.visible.clone(),
            self.sink.clone(),
            cancel_rx,
            guard,
        ));

        slot.timer = Some(TimerHandle {
            interval,
            cancel: cancel_tx,
            task,
        });
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(clamp_interval_ms(ms))
}

/// One metric's repeating timer. The first tick fires one interval after
/// the timer is created.
async fn timer_task(
    metric: MetricKind,
    period: Duration,
    probe: SharedProbe,
    visible: Arc<AtomicBool>,
    sink: Arc<dyn ReadingSink>,
    mut cancel: watch::Receiver<bool>,
    _guard: TaskGuard,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            // Also resolves when the handle is dropped
            _ = cancel.changed() => break,
            _ = ticker.tick() => {
                if *cancel.borrow() {
                    break;
                }
                if !visible.load(Ordering::SeqCst) {
                    continue;
                }

                let reading = {
                    let mut probe = probe.lock().await;
                    probe.sample().await
                };

                if *cancel.borrow() {
                    log::trace!("Dropping {} reading from cancelled timer", metric);
                    break;
                }
                if !visible.load(Ordering::SeqCst) {
                    log::trace!("Dropping {} reading; metric hidden meanwhile", metric);
                    continue;
                }

                sink.on_reading(metric, reading);
            }
        }
    }
}
