//! The self-describing status message pushed to the ground station.
//!
//! A record of records: `crucial_data` feeds the fixed dashboard gauges,
//! `status_data` the module status tab, `additional_data` free-form mission
//! points. Numeric points carry name/min/max/unit/value so the ground
//! station can render them without a schema.

use serde::{Deserialize, Serialize};

use pod_common::consts::RUN_LENGTH_M;
use pod_common::data::store::DataStore;

/// Value of one data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointValue {
    /// Numeric reading.
    Number(f64),
    /// Boolean flag.
    Flag(bool),
    /// Enumeration wire name.
    Text(String),
}

/// One named data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPointEntry {
    /// Point name shown on the dashboard.
    pub name: String,
    /// Lower display bound, numeric points only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper display bound, numeric points only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Unit string, numeric points only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// The reading.
    pub value: PointValue,
}

impl DataPointEntry {
    /// A bounded numeric point.
    pub fn numeric(name: &str, min: f64, max: f64, unit: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            min: Some(min),
            max: Some(max),
            unit: Some(unit.to_string()),
            value: PointValue::Number(value),
        }
    }

    /// A bare enumeration point.
    pub fn text(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            min: None,
            max: None,
            unit: None,
            value: PointValue::Text(value.to_string()),
        }
    }

    /// A bare boolean point.
    pub fn flag(name: &str, value: bool) -> Self {
        Self {
            name: name.to_string(),
            min: None,
            max: None,
            unit: None,
            value: PointValue::Flag(value),
        }
    }
}

/// One status push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPacket {
    /// Monotonically increasing message id.
    pub id: u64,
    /// Wall-clock timestamp [µs since the Unix epoch].
    pub timestamp_us: u64,
    /// Fixed dashboard gauges.
    pub crucial_data: Vec<DataPointEntry>,
    /// Module statuses.
    pub status_data: Vec<DataPointEntry>,
    /// Free-form mission points.
    pub additional_data: Vec<DataPointEntry>,
}

impl TelemetryPacket {
    /// Snapshot the store into one packet.
    pub fn from_store(id: u64, timestamp_us: u64, store: &DataStore) -> Self {
        let navigation = store.navigation();
        let mission = store.mission();
        let sensors = store.sensors();
        let motors = store.motors();
        let batteries = store.batteries();
        let telemetry = store.telemetry();
        let brakes = store.brakes();
        let temperature = store.temperature();

        let crucial_data = vec![
            DataPointEntry::numeric("distance", 0.0, RUN_LENGTH_M, "m", navigation.displacement_m),
            DataPointEntry::numeric("velocity", 0.0, 250.0, "m/s", navigation.velocity_mps),
            DataPointEntry::numeric(
                "acceleration",
                -50.0,
                50.0,
                "m/s^2",
                navigation.acceleration_mps2,
            ),
            DataPointEntry::text("status", mission.current_state.wire_name()),
        ];

        let status_data = vec![
            DataPointEntry::text("navigation", navigation.module_status.wire_name()),
            DataPointEntry::text("telemetry", telemetry.module_status.wire_name()),
            DataPointEntry::text("sensors", sensors.module_status.wire_name()),
            DataPointEntry::text("motors", motors.module_status.wire_name()),
            DataPointEntry::text("batteries", batteries.module_status.wire_name()),
            DataPointEntry::text("brakes", brakes.module_status.wire_name()),
        ];

        let braking_clamped = brakes.retracted.iter().filter(|retracted| !**retracted).count();
        let rpm_sum: u32 = motors.rpms.iter().sum();
        let average_rpm = f64::from(rpm_sum) / motors.rpms.len() as f64;
        let additional_data = vec![
            DataPointEntry::numeric(
                "braking_distance",
                0.0,
                RUN_LENGTH_M,
                "m",
                navigation.braking_distance_m,
            ),
            DataPointEntry::numeric(
                "emergency_braking_distance",
                0.0,
                RUN_LENGTH_M,
                "m",
                navigation.emergency_braking_distance_m,
            ),
            DataPointEntry::numeric("average_rpm", 0.0, 10_000.0, "rpm", average_rpm),
            DataPointEntry::numeric(
                "pod_temperature",
                -20.0,
                100.0,
                "C",
                f64::from(temperature.temperature_c),
            ),
            DataPointEntry::numeric(
                "brakes_clamped",
                0.0,
                brakes.retracted.len() as f64,
                "count",
                braking_clamped as f64,
            ),
            DataPointEntry::flag("critical_failure", mission.critical_failure),
        ];

        Self {
            id,
            timestamp_us,
            crucial_data,
            status_data,
            additional_data,
        }
    }

    /// Serialize to the JSON wire form (no trailing newline; the client
    /// adds it).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
