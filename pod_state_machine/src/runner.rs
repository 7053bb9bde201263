//! The mission state-machine loop.
//!
//! One task: snapshot the store, evaluate the current state's guards in
//! priority order (emergencies always first), publish at most one
//! transition, yield. The loop never blocks on I/O.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use pod_common::data::store::DataStore;
use pod_common::flags::RunFlag;
use pod_common::state::MissionState;
use pod_common::time::now_us;

use crate::guards::{self, GuardConfig, Snapshot};
use crate::transitions::is_permitted;

/// Loop pace; 10 ms keeps the machine comfortably above 50 Hz.
const TICK_SLEEP: Duration = Duration::from_millis(10);

/// One published transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    /// State before the tick.
    pub from: MissionState,
    /// State after the tick.
    pub to: MissionState,
    /// The guard that fired.
    pub guard: &'static str,
}

/// The mission state machine. Owns the mission record.
pub struct StateMachine {
    store: Arc<DataStore>,
    config: GuardConfig,
    /// When the pod entered `Accelerating`, for the cruise timeout.
    acceleration_started_us: Option<u64>,
}

impl StateMachine {
    /// Create the machine over a store whose mission record is `Idle`.
    pub fn new(store: Arc<DataStore>, config: GuardConfig) -> Self {
        Self {
            store,
            config,
            acceleration_started_us: None,
        }
    }

    /// Evaluate one tick. Publishes and returns the transition if one
    /// fired.
    pub fn tick(&mut self, now_us: u64) -> Option<Transition> {
        let snapshot = Snapshot::take(&self.store);
        let current = snapshot.mission.current_state;
        let decided = self.decide(&snapshot, now_us);

        let (to, guard) = decided?;
        debug_assert!(
            is_permitted(current, to),
            "forbidden transition {current:?} -> {to:?}"
        );

        if to.is_failure() {
            let causes = guards::emergency_causes(&snapshot, &self.config);
            error!(
                target: "state",
                from = current.wire_name(),
                to = to.wire_name(),
                guard,
                offending = ?causes,
                "failure transition"
            );
        } else {
            info!(
                target: "state",
                from = current.wire_name(),
                to = to.wire_name(),
                guard,
                "transition"
            );
        }

        if to == MissionState::Accelerating {
            self.acceleration_started_us = Some(now_us);
        }

        self.store.set_mission(pod_common::data::MissionRecord {
            current_state: to,
            critical_failure: snapshot.mission.critical_failure || to.is_failure(),
        });

        Some(Transition {
            from: current,
            to,
            guard,
        })
    }

    /// Pick the transition for this snapshot, if any. Pure apart from the
    /// machine's own acceleration timer.
    fn decide(&self, snapshot: &Snapshot, now_us: u64) -> Option<(MissionState, &'static str)> {
        use MissionState::*;

        let config = &self.config;
        let emergency = guards::has_emergency(snapshot, config);

        match snapshot.mission.current_state {
            // At rest: no braking needed, failures stop the mission where
            // it stands.
            Idle => {
                if emergency {
                    Some((FailureStopped, "has_emergency"))
                } else if guards::modules_initialised(snapshot) {
                    Some((PreCalibrating, "modules_initialised"))
                } else {
                    None
                }
            }
            PreCalibrating => {
                if emergency {
                    Some((FailureStopped, "has_emergency"))
                } else if guards::calibrate_command(&snapshot.telemetry) {
                    Some((Calibrating, "calibrate_command"))
                } else {
                    None
                }
            }
            Calibrating => {
                if emergency {
                    Some((FailureStopped, "has_emergency"))
                } else if guards::modules_ready(snapshot) {
                    Some((PreReady, "modules_ready"))
                } else {
                    None
                }
            }
            PreReady => {
                if emergency {
                    Some((FailureStopped, "has_emergency"))
                } else if !guards::high_power_off(&snapshot.sensors) {
                    Some((Ready, "high_power_on"))
                } else {
                    None
                }
            }
            Ready => {
                if emergency {
                    Some((FailureStopped, "has_emergency"))
                } else if guards::launch_command(&snapshot.telemetry) {
                    Some((Accelerating, "launch_command"))
                } else {
                    None
                }
            }

            // Moving: failures must drop high power before braking.
            Accelerating => {
                if emergency {
                    Some((FailurePreBraking, "has_emergency"))
                } else if config.stop_requests_nominal_braking
                    && guards::braking_command(&snapshot.telemetry)
                {
                    Some((NominalBraking, "braking_command"))
                } else if guards::entered_braking_zone(&snapshot.navigation, config) {
                    Some((PreBraking, "entered_braking_zone"))
                } else if guards::reached_max_velocity(&snapshot.navigation, config) {
                    Some((Cruising, "reached_max_velocity"))
                } else if let Some(started) = self.acceleration_started_us
                    && guards::acceleration_time_exceeded(now_us, started, config)
                {
                    Some((Cruising, "acceleration_time_exceeded"))
                } else {
                    None
                }
            }
            Cruising => {
                if emergency {
                    Some((FailurePreBraking, "has_emergency"))
                } else if config.stop_requests_nominal_braking
                    && guards::braking_command(&snapshot.telemetry)
                {
                    Some((NominalBraking, "braking_command"))
                } else if guards::entered_braking_zone(&snapshot.navigation, config) {
                    Some((PreBraking, "entered_braking_zone"))
                } else {
                    None
                }
            }
            PreBraking => {
                if emergency {
                    Some((FailurePreBraking, "has_emergency"))
                } else if guards::high_power_off(&snapshot.sensors) {
                    Some((NominalBraking, "high_power_off"))
                } else {
                    None
                }
            }
            NominalBraking => {
                if emergency {
                    Some((FailureBraking, "has_emergency"))
                } else if guards::pod_stopped(&snapshot.navigation) {
                    Some((Finished, "pod_stopped"))
                } else {
                    None
                }
            }

            // Failure chain.
            FailurePreBraking => {
                if guards::high_power_off(&snapshot.sensors) {
                    Some((FailureBraking, "high_power_off"))
                } else {
                    None
                }
            }
            FailureBraking => {
                if guards::pod_stopped(&snapshot.navigation) {
                    Some((FailureStopped, "pod_stopped"))
                } else {
                    None
                }
            }

            // Resting terminals, waiting for shutdown.
            Finished | FailureStopped => {
                if guards::shutdown_command(&snapshot.telemetry) {
                    Some((Off, "shutdown_command"))
                } else {
                    None
                }
            }

            Off => None,
        }
    }

    /// Run the loop until the mission reaches `Off` or the process shuts
    /// down. Reaching `Off` clears the running flag.
    pub fn run(mut self, running: RunFlag) {
        info!(target: "state", "state machine loop started");
        while running.is_running() {
            self.tick(now_us());
            if self.store.mission().current_state.is_terminal() {
                info!(target: "state", "mission Off, requesting shutdown");
                running.shut_down();
                break;
            }
            std::thread::sleep(TICK_SLEEP);
        }
        info!(target: "state", "state machine loop exiting");
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
