//! Common re-exports for pod crates.

pub use crate::config::{ConfigError, PodConfig, RunKind};
pub use crate::data::store::DataStore;
pub use crate::data::{
    BatteriesRecord, BatteryReading, BrakesRecord, DataPoint, ImuReading, MissionRecord,
    MotorsRecord, NavigationRecord, SensorsRecord, StripeCounterReading, TelemetryCommands,
    TemperatureRecord,
};
pub use crate::flags::RunFlag;
pub use crate::state::{MissionState, ModuleStatus};
