use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Serialize;

use crate::core::sampler::metrics::{MetricKind, Reading};
use crate::core::sampler::probe::Probe;
use crate::error::{Result, VitalsError};
use crate::platform::gpu::{self, GpuBackend, GpuDetector};

/// Consecutive failures that trip the disable latch
pub const MAX_FAILURES: u32 = 5;

/// Failure bookkeeping of the GPU probe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GpuHealth {
    pub failure_count: u32,
    pub disabled: bool,
    pub last_error: String,
}

/// GPU load through the detected backend.
///
/// After [`MAX_FAILURES`] consecutive failures the probe disables itself and
/// returns 0 without touching the backend until [`Probe::reset`].
pub struct GpuProbe {
    detector: GpuDetector,
    backend: GpuBackend,
    health: GpuHealth,
    timeout: Duration,
}

impl GpuProbe {
    /// Detects the backend once, here.
    pub fn new(detector: GpuDetector, timeout: Duration) -> Self {
        let backend = detector.detect();
        Self {
            detector,
            backend,
            health: GpuHealth::default(),
            timeout,
        }
    }

    pub fn backend(&self) -> &GpuBackend {
        &self.backend
    }

    pub fn health(&self) -> &GpuHealth {
        &self.health
    }

    async fn read_usage(&mut self) -> Reading {
        if self.health.disabled || self.backend.is_none() {
            return Reading::ZERO;
        }

        match self.read_backend().await {
            Ok(percent) => {
                self.health.failure_count = 0;
                Reading::new(percent)
            }
            Err(e) => {
                self.record_failure(e);
                Reading::ZERO
            }
        }
    }

    async fn read_backend(&self) -> Result<f64> {
        match &self.backend {
            GpuBackend::Nvidia(tool) => gpu::read_utilization(tool, self.timeout).await,
            GpuBackend::AmdSysfs(path) => gpu::read_busy_percent(path).await,
            GpuBackend::AmdExternalTool(tool) => gpu::read_radeontop(tool, self.timeout).await,
            GpuBackend::None => Err(VitalsError::gpu_not_available("no GPU backend detected")),
        }
    }

    fn record_failure(&mut self, error: VitalsError) {
        self.health.failure_count += 1;
        self.health.last_error = error.to_string();
        log::debug!(
            "GPU sample via {} failed (attempt {}): {}",
            self.backend.label(),
            self.health.failure_count,
            error
        );

        if self.health.failure_count >= MAX_FAILURES {
            self.health.disabled = true;
            log::warn!(
                "GPU monitoring disabled after {} consecutive failures: {}",
                MAX_FAILURES,
                self.health.last_error
            );
        }
    }
}

impl Probe for GpuProbe {
    fn kind(&self) -> MetricKind {
        MetricKind::Gpu
    }

    fn sample(&mut self) -> BoxFuture<'_, Reading> {
        self.read_usage().boxed()
    }

    /// Clear the latch and detect the backend again.
    fn reset(&mut self) {
        self.health = GpuHealth::default();
        self.backend = self.detector.detect();
    }

    fn last_error(&self) -> Option<String> {
        if self.health.last_error.is_empty() {
            None
        } else {
            Some(self.health.last_error.clone())
        }
    }
}
