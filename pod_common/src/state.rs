//! Module status and mission state enums.
//!
//! Both enums use `#[repr(u8)]` for compact storage and carry stable wire
//! names consumed by the ground station. Wire names round-trip exactly:
//! `from_wire(wire_name(s)) == Some(s)` for every variant.

use serde::{Deserialize, Serialize};

// ─── Module Status ──────────────────────────────────────────────────

/// Lifecycle status of one pod module.
///
/// Monotonic in the absence of failure: `Start → Init → Ready`. Any status
/// may drop to `CriticalFailure`, and once there a module never recovers
/// within the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ModuleStatus {
    /// Process just came up; module not yet constructed.
    Start = 0,
    /// Module constructed and self-checked.
    Init = 1,
    /// Calibrated, holding at operational standby.
    Ready = 2,
    /// Unrecoverable failure; triggers a mission emergency.
    CriticalFailure = 3,
}

impl ModuleStatus {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Start),
            1 => Some(Self::Init),
            2 => Some(Self::Ready),
            3 => Some(Self::CriticalFailure),
            _ => None,
        }
    }

    /// True once the module has progressed at least to `stage`.
    ///
    /// `CriticalFailure` never counts as having reached any stage, and no
    /// status counts as having reached `CriticalFailure`.
    #[inline]
    pub const fn has_reached(&self, stage: ModuleStatus) -> bool {
        !matches!(self, Self::CriticalFailure)
            && !matches!(stage, Self::CriticalFailure)
            && (*self as u8) >= (stage as u8)
    }

    /// True iff the module has failed.
    #[inline]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::CriticalFailure)
    }

    /// Stable ground-station identifier.
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::Init => "INIT",
            Self::Ready => "READY",
            Self::CriticalFailure => "CRITICAL_FAILURE",
        }
    }

    /// Parse a stable ground-station identifier.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "START" => Some(Self::Start),
            "INIT" => Some(Self::Init),
            "READY" => Some(Self::Ready),
            "CRITICAL_FAILURE" => Some(Self::CriticalFailure),
            _ => None,
        }
    }
}

impl Default for ModuleStatus {
    fn default() -> Self {
        Self::Start
    }
}

// ─── Mission State ──────────────────────────────────────────────────

/// Mission phase of the pod.
///
/// Transitions are restricted to the permitted set checked by the state
/// machine crate; everything not listed there is forbidden. The `Pre*`
/// states gate calibration on a ground command and braking on the
/// high-power rail being dropped first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MissionState {
    /// At standstill, waiting for all modules to initialise.
    Idle = 0,
    /// Modules initialised, waiting for the calibrate command.
    PreCalibrating = 1,
    /// Sensors calibrating (gravity vectors, filter covariances).
    Calibrating = 2,
    /// Calibrated, waiting for high power to come up.
    PreReady = 3,
    /// Standing by for the launch command.
    Ready = 4,
    /// Propulsion active, velocity rising.
    Accelerating = 5,
    /// Holding at maximum velocity until the braking zone.
    Cruising = 6,
    /// Braking zone entered, waiting for high power to drop.
    PreBraking = 7,
    /// Nominal (friction) braking to standstill.
    NominalBraking = 8,
    /// Run complete, at rest, waiting for shutdown.
    Finished = 9,
    /// Emergency during the run, dropping high power before braking.
    FailurePreBraking = 10,
    /// Emergency braking to standstill.
    FailureBraking = 11,
    /// Emergency handled, at rest, waiting for shutdown.
    FailureStopped = 12,
    /// Terminal state; the process exits.
    Off = 13,
}

impl MissionState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::PreCalibrating),
            2 => Some(Self::Calibrating),
            3 => Some(Self::PreReady),
            4 => Some(Self::Ready),
            5 => Some(Self::Accelerating),
            6 => Some(Self::Cruising),
            7 => Some(Self::PreBraking),
            8 => Some(Self::NominalBraking),
            9 => Some(Self::Finished),
            10 => Some(Self::FailurePreBraking),
            11 => Some(Self::FailureBraking),
            12 => Some(Self::FailureStopped),
            13 => Some(Self::Off),
            _ => None,
        }
    }

    /// True for the three emergency states.
    #[inline]
    pub const fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::FailurePreBraking | Self::FailureBraking | Self::FailureStopped
        )
    }

    /// True once no further transition can occur.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Off)
    }

    /// Stable ground-station identifier.
    ///
    /// `FailureBraking` keeps the legacy `EMERGENCY_BRAKING` name and `Off`
    /// keeps `EXITING`; ground-station dashboards predate the `Pre*` gate
    /// states.
    pub const fn wire_name(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::PreCalibrating => "PRE_CALIBRATING",
            Self::Calibrating => "CALIBRATING",
            Self::PreReady => "PRE_READY",
            Self::Ready => "READY",
            Self::Accelerating => "ACCELERATING",
            Self::Cruising => "CRUISING",
            Self::PreBraking => "PRE_BRAKING",
            Self::NominalBraking => "NOMINAL_BRAKING",
            Self::Finished => "FINISHED",
            Self::FailurePreBraking => "FAILURE_PRE_BRAKING",
            Self::FailureBraking => "EMERGENCY_BRAKING",
            Self::FailureStopped => "FAILURE_STOPPED",
            Self::Off => "EXITING",
        }
    }

    /// Parse a stable ground-station identifier.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "IDLE" => Some(Self::Idle),
            "PRE_CALIBRATING" => Some(Self::PreCalibrating),
            "CALIBRATING" => Some(Self::Calibrating),
            "PRE_READY" => Some(Self::PreReady),
            "READY" => Some(Self::Ready),
            "ACCELERATING" => Some(Self::Accelerating),
            "CRUISING" => Some(Self::Cruising),
            "PRE_BRAKING" => Some(Self::PreBraking),
            "NOMINAL_BRAKING" => Some(Self::NominalBraking),
            "FINISHED" => Some(Self::Finished),
            "FAILURE_PRE_BRAKING" => Some(Self::FailurePreBraking),
            "EMERGENCY_BRAKING" => Some(Self::FailureBraking),
            "FAILURE_STOPPED" => Some(Self::FailureStopped),
            "EXITING" => Some(Self::Off),
            _ => None,
        }
    }

    /// All mission states, in rank order.
    pub const ALL: [MissionState; 14] = [
        Self::Idle,
        Self::PreCalibrating,
        Self::Calibrating,
        Self::PreReady,
        Self::Ready,
        Self::Accelerating,
        Self::Cruising,
        Self::PreBraking,
        Self::NominalBraking,
        Self::Finished,
        Self::FailurePreBraking,
        Self::FailureBraking,
        Self::FailureStopped,
        Self::Off,
    ];
}

impl Default for MissionState {
    fn default() -> Self {
        Self::Idle
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
