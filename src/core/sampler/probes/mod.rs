//! Probe implementations, one per vital.

mod cpu;
mod gpu;
mod ram;
mod storage;
mod temperature;

pub use cpu::{parse_cpu_times, usage_between, CpuProbe, CpuTimes};
pub use gpu::{GpuHealth, GpuProbe, MAX_FAILURES};
pub use ram::{parse_meminfo, MemInfo, RamProbe};
pub use storage::{parse_df_output, StorageProbe, DF_CAPACITY_COLUMN};
pub use temperature::{
    is_cpu_zone_type, parse_millidegrees, temperature_percent, TemperatureProbe,
    MAX_TEMP_CELSIUS, MIN_TEMP_CELSIUS,
};
