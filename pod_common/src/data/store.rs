//! The process-wide shared store.
//!
//! One independently locked slot per record. Every accessor copies the
//! whole record in or out under that slot's lock; no method ever holds two
//! slot locks, so lock ordering between slots cannot deadlock. Reads of
//! different slots are not ordered with respect to each other; consumers
//! that snapshot several records tolerate the inter-record skew.

use parking_lot::Mutex;

use super::{
    BatteriesRecord, BrakesRecord, MissionRecord, MotorsRecord, NavigationRecord, SensorsRecord,
    TelemetryCommands, TemperatureRecord,
};

/// Single source of truth for all inter-task data.
///
/// Constructed once at process start and shared by `Arc`; records live for
/// the process lifetime.
#[derive(Debug, Default)]
pub struct DataStore {
    mission: Mutex<MissionRecord>,
    navigation: Mutex<NavigationRecord>,
    sensors: Mutex<SensorsRecord>,
    motors: Mutex<MotorsRecord>,
    batteries: Mutex<BatteriesRecord>,
    telemetry: Mutex<TelemetryCommands>,
    brakes: Mutex<BrakesRecord>,
    temperature: Mutex<TemperatureRecord>,
}

impl DataStore {
    /// Create a store with all records at their safe neutral defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy out the mission record.
    pub fn mission(&self) -> MissionRecord {
        *self.mission.lock()
    }

    /// Overwrite the mission record. Writer: state machine.
    pub fn set_mission(&self, record: MissionRecord) {
        *self.mission.lock() = record;
    }

    /// Copy out the kinematic record.
    pub fn navigation(&self) -> NavigationRecord {
        *self.navigation.lock()
    }

    /// Overwrite the kinematic record. Writer: navigation.
    pub fn set_navigation(&self, record: NavigationRecord) {
        *self.navigation.lock() = record;
    }

    /// Copy out the sensors record.
    pub fn sensors(&self) -> SensorsRecord {
        *self.sensors.lock()
    }

    /// Overwrite the sensors record. Writer: sensor manager.
    pub fn set_sensors(&self, record: SensorsRecord) {
        *self.sensors.lock() = record;
    }

    /// Copy out the motors record.
    pub fn motors(&self) -> MotorsRecord {
        *self.motors.lock()
    }

    /// Overwrite the motors record. Writer: motor manager.
    pub fn set_motors(&self, record: MotorsRecord) {
        *self.motors.lock() = record;
    }

    /// Copy out the batteries record.
    pub fn batteries(&self) -> BatteriesRecord {
        *self.batteries.lock()
    }

    /// Overwrite the batteries record. Writer: battery manager.
    pub fn set_batteries(&self, record: BatteriesRecord) {
        *self.batteries.lock() = record;
    }

    /// Copy out the telemetry command record.
    pub fn telemetry(&self) -> TelemetryCommands {
        *self.telemetry.lock()
    }

    /// Overwrite the telemetry command record. Writer: telemetry.
    pub fn set_telemetry(&self, record: TelemetryCommands) {
        *self.telemetry.lock() = record;
    }

    /// Copy out the brakes record.
    pub fn brakes(&self) -> BrakesRecord {
        *self.brakes.lock()
    }

    /// Overwrite the brakes record. Writer: brake manager.
    pub fn set_brakes(&self, record: BrakesRecord) {
        *self.brakes.lock() = record;
    }

    /// Copy out the temperature record.
    pub fn temperature(&self) -> TemperatureRecord {
        *self.temperature.lock()
    }

    /// Overwrite the temperature record. Writer: sensor manager.
    pub fn set_temperature(&self, record: TemperatureRecord) {
        *self.temperature.lock() = record;
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
