//! Transition guards.
//!
//! Every guard is a pure function of one [`Snapshot`] (plus the static
//! [`GuardConfig`]). The state machine takes the snapshot once per tick, so
//! guard evaluation is deterministic within a tick.

use pod_common::config::{PodConfig, RunKind};
use pod_common::consts::{
    CHARGE_RANGE_PCT, DEMO_ACCELERATION_TIMEOUT_US, HP_CURRENT_RANGE_DA, HP_VOLTAGE_RANGE_DV,
    LP_CURRENT_RANGE_DA, LP_VOLTAGE_RANGE_DV, STOPPED_VELOCITY_EPSILON,
};
use pod_common::data::store::DataStore;
use pod_common::data::{
    BatteriesRecord, BatteryReading, BrakesRecord, MissionRecord, MotorsRecord, NavigationRecord,
    SensorsRecord, TelemetryCommands,
};
use pod_common::state::ModuleStatus;

// ─── Snapshot ───────────────────────────────────────────────────────

/// One tick's view of every record the state machine consumes.
///
/// Records are copied out one at a time, so the snapshot carries a small
/// inter-record skew; module statuses are monotonic except via failure, so
/// the skew can delay but never reverse a transition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Snapshot {
    /// Mission record (the machine's own output, read back for state).
    pub mission: MissionRecord,
    /// Kinematic record.
    pub navigation: NavigationRecord,
    /// Ground commands.
    pub telemetry: TelemetryCommands,
    /// Motor feedback.
    pub motors: MotorsRecord,
    /// Battery reports.
    pub batteries: BatteriesRecord,
    /// Sensor records.
    pub sensors: SensorsRecord,
    /// Brake feedback.
    pub brakes: BrakesRecord,
}

impl Snapshot {
    /// Copy every consumed record out of the store.
    pub fn take(store: &DataStore) -> Self {
        Self {
            mission: store.mission(),
            navigation: store.navigation(),
            telemetry: store.telemetry(),
            motors: store.motors(),
            batteries: store.batteries(),
            sensors: store.sensors(),
            brakes: store.brakes(),
        }
    }
}

// ─── Static Configuration ───────────────────────────────────────────

/// Constants the guards need, fixed at startup.
#[derive(Debug, Clone, Copy)]
pub struct GuardConfig {
    /// Track length [m].
    pub run_length_m: f64,
    /// Margin on the braking-zone decision [m].
    pub braking_buffer_m: f64,
    /// Velocity at which acceleration ends [m/s].
    pub maximum_velocity_mps: f64,
    /// Time allowed in `Accelerating` before cruising [µs].
    pub acceleration_timeout_us: u64,
    /// Enforce the battery operating ranges as an emergency source.
    pub enforce_battery_limits: bool,
    /// STOP from the ground requests nominal braking instead of an
    /// emergency.
    pub stop_requests_nominal_braking: bool,
}

impl GuardConfig {
    /// Derive the guard constants from the loaded configuration and the
    /// selected run kind. Bench/demo run kinds use the fixed short
    /// acceleration timeout.
    pub fn from_config(config: &PodConfig, run_kind: RunKind) -> Self {
        let acceleration_timeout_us = if run_kind.uses_demo_cruise_timeout() {
            DEMO_ACCELERATION_TIMEOUT_US
        } else {
            config.state_machine.acceleration_timeout_us
        };
        Self {
            run_length_m: config.navigation.run_length_m,
            braking_buffer_m: config.state_machine.braking_buffer_m,
            maximum_velocity_mps: config.state_machine.maximum_velocity_mps,
            acceleration_timeout_us,
            enforce_battery_limits: config.state_machine.enforce_battery_limits,
            stop_requests_nominal_braking: config.state_machine.stop_requests_nominal_braking,
        }
    }
}

// ─── Emergency ──────────────────────────────────────────────────────

/// Names of the modules (and commands) responsible for an emergency.
pub fn emergency_causes(snapshot: &Snapshot, config: &GuardConfig) -> Vec<&'static str> {
    let mut causes = Vec::new();
    if snapshot.brakes.module_status.is_failure() {
        causes.push("brakes");
    }
    if snapshot.navigation.module_status.is_failure() {
        causes.push("navigation");
    }
    if snapshot.batteries.module_status.is_failure() {
        causes.push("batteries");
    }
    if snapshot.telemetry.module_status.is_failure() {
        causes.push("telemetry");
    }
    if snapshot.sensors.module_status.is_failure() {
        causes.push("sensors");
    }
    if snapshot.motors.module_status.is_failure() {
        causes.push("motors");
    }
    if snapshot.telemetry.emergency_stop_command && !config.stop_requests_nominal_braking {
        causes.push("stop_command");
    }
    if config.enforce_battery_limits && !batteries_in_range(&snapshot.batteries) {
        causes.push("battery_range");
    }
    causes
}

/// True iff any module failed or the ground commanded an emergency stop.
pub fn has_emergency(snapshot: &Snapshot, config: &GuardConfig) -> bool {
    !emergency_causes(snapshot, config).is_empty()
}

// ─── Module Progress ────────────────────────────────────────────────

/// All six modules have at least initialised.
pub fn modules_initialised(snapshot: &Snapshot) -> bool {
    snapshot.brakes.module_status.has_reached(ModuleStatus::Init)
        && snapshot
            .navigation
            .module_status
            .has_reached(ModuleStatus::Init)
        && snapshot
            .batteries
            .module_status
            .has_reached(ModuleStatus::Init)
        && snapshot
            .telemetry
            .module_status
            .has_reached(ModuleStatus::Init)
        && snapshot
            .sensors
            .module_status
            .has_reached(ModuleStatus::Init)
        && snapshot.motors.module_status.has_reached(ModuleStatus::Init)
}

/// All six modules are ready.
pub fn modules_ready(snapshot: &Snapshot) -> bool {
    snapshot.brakes.module_status == ModuleStatus::Ready
        && snapshot.navigation.module_status == ModuleStatus::Ready
        && snapshot.batteries.module_status == ModuleStatus::Ready
        && snapshot.telemetry.module_status == ModuleStatus::Ready
        && snapshot.sensors.module_status == ModuleStatus::Ready
        && snapshot.motors.module_status == ModuleStatus::Ready
}

// ─── Ground Commands ────────────────────────────────────────────────

/// Calibrate command pending.
pub fn calibrate_command(telemetry: &TelemetryCommands) -> bool {
    telemetry.calibrate_command
}

/// Launch command pending.
pub fn launch_command(telemetry: &TelemetryCommands) -> bool {
    telemetry.launch_command
}

/// Shutdown command pending.
pub fn shutdown_command(telemetry: &TelemetryCommands) -> bool {
    telemetry.shutdown_command
}

/// Reset command pending.
pub fn reset_command(telemetry: &TelemetryCommands) -> bool {
    telemetry.reset_command
}

/// STOP reused as a request for nominal braking.
pub fn braking_command(telemetry: &TelemetryCommands) -> bool {
    telemetry.emergency_stop_command
}

// ─── Kinematics ─────────────────────────────────────────────────────

/// The pod can no longer stop inside the track without braking now.
/// Ties resolve to "entered".
pub fn entered_braking_zone(navigation: &NavigationRecord, config: &GuardConfig) -> bool {
    navigation.displacement_m + navigation.braking_distance_m + config.braking_buffer_m
        >= config.run_length_m
}

/// The pod is at its configured maximum velocity.
pub fn reached_max_velocity(navigation: &NavigationRecord, config: &GuardConfig) -> bool {
    navigation.velocity_mps >= config.maximum_velocity_mps
}

/// The pod is at rest, with sign noise tolerated.
pub fn pod_stopped(navigation: &NavigationRecord) -> bool {
    navigation.velocity_mps.abs() <= STOPPED_VELOCITY_EPSILON
}

/// Time spent accelerating has passed the configured bound.
pub fn acceleration_time_exceeded(
    now_us: u64,
    acceleration_started_us: u64,
    config: &GuardConfig,
) -> bool {
    now_us.saturating_sub(acceleration_started_us) > config.acceleration_timeout_us
}

// ─── Power ──────────────────────────────────────────────────────────

/// Every high-power solid-state relay reports open.
pub fn high_power_off(sensors: &SensorsRecord) -> bool {
    sensors.high_power_relays_off.iter().all(|off| *off)
}

// ─── Batteries ──────────────────────────────────────────────────────

fn reading_in_range(
    reading: &BatteryReading,
    voltage_range: (u16, u16),
    current_range: (i16, i16),
) -> bool {
    reading.voltage_dv >= voltage_range.0
        && reading.voltage_dv <= voltage_range.1
        && reading.current_da >= current_range.0
        && reading.current_da <= current_range.1
        && reading.charge_pct >= CHARGE_RANGE_PCT.0
        && reading.charge_pct <= CHARGE_RANGE_PCT.1
}

/// Every battery inside its documented operating range.
pub fn batteries_in_range(batteries: &BatteriesRecord) -> bool {
    batteries
        .low_power
        .iter()
        .all(|reading| reading_in_range(reading, LP_VOLTAGE_RANGE_DV, LP_CURRENT_RANGE_DA))
        && batteries
            .high_power
            .iter()
            .all(|reading| reading_in_range(reading, HP_VOLTAGE_RANGE_DV, HP_CURRENT_RANGE_DA))
}

// ─── Tests ──────────────────────────────────────────────────────────
