use tokio::sync::{mpsc, watch};

use super::metrics::{MetricKind, Reading, VitalsSnapshot};

/// Receives readings from the scheduler.
///
/// Called on the event loop; implementations must not block.
pub trait ReadingSink: Send + Sync {
    fn on_reading(&self, metric: MetricKind, reading: Reading);
}

/// Forwards readings into an unbounded channel.
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<(MetricKind, Reading)>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(MetricKind, Reading)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReadingSink for ChannelSink {
    fn on_reading(&self, metric: MetricKind, reading: Reading) {
        // Only fails once the receiver is gone
        let _ = self.tx.send((metric, reading));
    }
}

/// Keeps the latest reading per metric in a watch channel.
pub struct SnapshotSink {
    tx: watch::Sender<VitalsSnapshot>,
}

impl SnapshotSink {
    pub fn new() -> (Self, watch::Receiver<VitalsSnapshot>) {
        let (tx, rx) = watch::channel(VitalsSnapshot::default());
        (Self { tx }, rx)
    }
}

impl ReadingSink for SnapshotSink {
    fn on_reading(&self, metric: MetricKind, reading: Reading) {
        self.tx.send_modify(|snapshot| snapshot.record(metric, reading));
    }
}

/// Logs each reading at debug level.
pub struct LogSink;

impl ReadingSink for LogSink {
    fn on_reading(&self, metric: MetricKind, reading: Reading) {
        log::debug!("{}: {}", metric, reading);
    }
}
