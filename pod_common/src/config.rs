//! Pod configuration loading.
//!
//! The whole pod is configured from a single TOML file whose path comes
//! from the command line. The file is parsed strictly (unknown fields are
//! rejected) and validated once at startup; no module ever re-reads it.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{NUM_BRAKES, NUM_IMUS, NUM_STRIPE_COUNTERS};

/// Error type for configuration loading.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the given path.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// File read or TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

// ─── Run Kind ───────────────────────────────────────────────────────

/// Kind of run the pod is set up for, selected on the command line.
///
/// Picks the measurement-noise preset of the per-IMU filters and whether
/// the early-cruising trigger uses the configured acceleration timeout or
/// the fixed bench-demo bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RunKind {
    /// Official run inside the tube.
    #[default]
    Tube,
    /// Vertical test rig runs.
    Elevator,
    /// Pod on jacks, wheels free.
    Stationary,
    /// Open-air track runs.
    Outside,
}

impl RunKind {
    /// Bench/demo kinds cruise on the fixed timeout instead of the
    /// configured one.
    #[inline]
    pub const fn uses_demo_cruise_timeout(&self) -> bool {
        matches!(self, Self::Elevator | Self::Stationary)
    }
}

// ─── Sections ───────────────────────────────────────────────────────

/// Ground-station endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Ground station IP address or host name.
    pub server_ip: String,
    /// Ground station TCP port.
    pub server_port: u16,
}

fn default_acceleration_timeout_us() -> u64 {
    30_000_000
}
fn default_braking_buffer_m() -> f64 {
    crate::consts::BRAKING_BUFFER_M
}

/// State machine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateMachineConfig {
    /// Maximum time the pod may spend accelerating before it cruises [µs].
    #[serde(default = "default_acceleration_timeout_us")]
    pub acceleration_timeout_us: u64,
    /// Safety margin on the braking-zone decision [m].
    #[serde(default = "default_braking_buffer_m")]
    pub braking_buffer_m: f64,
    /// Velocity at which the pod stops accelerating [m/s].
    pub maximum_velocity_mps: f64,
    /// Enable the battery operating-range emergency guard.
    #[serde(default)]
    pub enforce_battery_limits: bool,
    /// Treat the ground STOP command as a nominal-braking request instead
    /// of an emergency.
    #[serde(default)]
    pub stop_requests_nominal_braking: bool,
}

fn default_calibration_variance_limits() -> [f64; 3] {
    [0.05, 0.05, 0.05]
}
fn default_calibration_attempts() -> u32 {
    3
}
fn default_calibration_queries() -> usize {
    10_000
}
fn default_stripe_distance_m() -> f64 {
    crate::consts::STRIPE_DISTANCE_M
}
fn default_run_length_m() -> f64 {
    crate::consts::RUN_LENGTH_M
}

/// Navigation estimator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NavigationConfig {
    /// Index of the motion axis in the IMU frame (0..=2).
    #[serde(default)]
    pub axis: usize,
    /// Acceptable per-axis variance for gravity calibration [m²/s⁴].
    #[serde(default = "default_calibration_variance_limits")]
    pub calibration_variance_limits: [f64; 3],
    /// Calibration retries before navigation fails.
    #[serde(default = "default_calibration_attempts")]
    pub calibration_attempts: u32,
    /// IMU readings collected per calibration attempt.
    #[serde(default = "default_calibration_queries")]
    pub calibration_queries: usize,
    /// Spacing of the optical track stripes [m].
    #[serde(default = "default_stripe_distance_m")]
    pub stripe_distance_m: f64,
    /// Track length [m].
    #[serde(default = "default_run_length_m")]
    pub run_length_m: f64,
}

/// Sensor wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SensorsConfig {
    /// SPI chip-select pins of the four IMUs.
    pub imu_chip_selects: [u32; NUM_IMUS],
    /// GPIO pins of the stripe counters.
    pub stripe_counter_pins: [u32; NUM_STRIPE_COUNTERS],
    /// ADC pin of the averaged thermistor.
    pub thermistor_pin: u32,
    /// GPIO pins reporting the high-power shutoff relays.
    pub high_power_shutoff_pins: Vec<u32>,
    /// Battery health polling interval [ms].
    pub battery_check_interval_ms: u64,
}

/// Brake wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrakesConfig {
    /// Stepper command pins.
    pub command_pins: [u32; NUM_BRAKES],
    /// Retracted-feedback button pins.
    pub button_pins: [u32; NUM_BRAKES],
}

// ─── Top Level ──────────────────────────────────────────────────────

/// Complete pod configuration, one TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PodConfig {
    /// Ground link endpoint.
    pub telemetry: TelemetryConfig,
    /// State machine tuning.
    pub state_machine: StateMachineConfig,
    /// Navigation tuning.
    pub navigation: NavigationConfig,
    /// Sensor wiring.
    pub sensors: SensorsConfig,
    /// Brake wiring.
    pub brakes: BrakesConfig,
}

impl PodConfig {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound(path.display().to_string())
            } else {
                ConfigError::Parse(format!("{}: {}", path.display(), e))
            }
        })?;

        let config: PodConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate semantic constraints across all sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telemetry.server_ip.is_empty() {
            return Err(ConfigError::Validation(
                "telemetry.server_ip cannot be empty".to_string(),
            ));
        }

        let sm = &self.state_machine;
        if sm.maximum_velocity_mps <= 0.0 || sm.maximum_velocity_mps > 250.0 {
            return Err(ConfigError::Validation(format!(
                "state_machine.maximum_velocity_mps={} out of range (0, 250]",
                sm.maximum_velocity_mps
            )));
        }
        if sm.braking_buffer_m < 0.0 || sm.braking_buffer_m > 100.0 {
            return Err(ConfigError::Validation(format!(
                "state_machine.braking_buffer_m={} out of range [0, 100]",
                sm.braking_buffer_m
            )));
        }
        if sm.acceleration_timeout_us == 0 {
            return Err(ConfigError::Validation(
                "state_machine.acceleration_timeout_us must be > 0".to_string(),
            ));
        }

        let nav = &self.navigation;
        if nav.axis > 2 {
            return Err(ConfigError::Validation(format!(
                "navigation.axis={} out of range [0, 2]",
                nav.axis
            )));
        }
        if nav.calibration_attempts == 0 {
            return Err(ConfigError::Validation(
                "navigation.calibration_attempts must be > 0".to_string(),
            ));
        }
        if nav.calibration_queries == 0 {
            return Err(ConfigError::Validation(
                "navigation.calibration_queries must be > 0".to_string(),
            ));
        }
        for (i, limit) in nav.calibration_variance_limits.iter().enumerate() {
            if *limit <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "navigation.calibration_variance_limits[{i}]={limit} must be > 0"
                )));
            }
        }
        if nav.stripe_distance_m <= 0.0 {
            return Err(ConfigError::Validation(
                "navigation.stripe_distance_m must be > 0".to_string(),
            ));
        }
        if nav.run_length_m <= 0.0 {
            return Err(ConfigError::Validation(
                "navigation.run_length_m must be > 0".to_string(),
            ));
        }

        if self.sensors.battery_check_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "sensors.battery_check_interval_ms must be > 0".to_string(),
            ));
        }
        if self.sensors.high_power_shutoff_pins.is_empty() {
            return Err(ConfigError::Validation(
                "sensors.high_power_shutoff_pins cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
