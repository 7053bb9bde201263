//! The navigation task loop.
//!
//! Phase-driven by the mission state: gravity calibration runs on entry to
//! `Calibrating`, integration timestamps anchor at the start of the run,
//! and from then on every tick fuses the latest sensor records.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use pod_common::data::store::DataStore;
use pod_common::flags::RunFlag;
use pod_common::state::{MissionState, ModuleStatus};
use pod_common::time::now_us;

use crate::estimator::Navigation;

/// Pace of the navigation loop between sensor fusions.
const LOOP_SLEEP: Duration = Duration::from_millis(1);

/// Run the navigation loop until shutdown.
pub fn run(mut nav: Navigation, store: Arc<DataStore>, running: RunFlag) {
    info!(target: "nav", "navigation loop started");
    while running.is_running() {
        let mission = store.mission();
        match mission.current_state {
            MissionState::Calibrating if nav.module_status() == ModuleStatus::Init => {
                nav.calibrate_gravity(&running);
            }
            MissionState::Accelerating
            | MissionState::Cruising
            | MissionState::PreBraking
            | MissionState::NominalBraking
            | MissionState::FailurePreBraking
            | MissionState::FailureBraking => {
                if !nav.has_init() {
                    nav.init_timestamps(now_us());
                }
                nav.navigate();
            }
            MissionState::Off => break,
            _ => {}
        }
        std::thread::sleep(LOOP_SLEEP);
    }
    info!(target: "nav", "navigation loop exiting");
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pod_common::config::{NavigationConfig, RunKind};
    use pod_common::data::{DataPoint, ImuReading, MissionRecord};

    fn still_imus(store: &DataStore, timestamp_us: u64) {
        let mut sensors = store.sensors();
        sensors.imus = DataPoint::new(
            timestamp_us,
            [ImuReading {
                acc: [0.0, 0.0, 9.81],
                operational: true,
            }; 4],
        );
        store.set_sensors(sensors);
    }

    #[test]
    fn loop_calibrates_on_calibrating_state_and_exits_on_off() {
        let store = Arc::new(DataStore::new());
        still_imus(&store, 0);
        let cfg = NavigationConfig {
            axis: 0,
            calibration_variance_limits: [0.05; 3],
            calibration_attempts: 1,
            calibration_queries: 3,
            stripe_distance_m: 30.48,
            run_length_m: 1250.0,
        };
        let nav = Navigation::new(Arc::clone(&store), cfg, RunKind::Tube);
        let running = RunFlag::new();

        let handle = {
            let store = Arc::clone(&store);
            let running = running.clone();
            std::thread::spawn(move || run(nav, store, running))
        };

        store.set_mission(MissionRecord {
            current_state: MissionState::Calibrating,
            critical_failure: false,
        });

        // Wait for navigation to report Ready.
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while store.navigation().module_status != ModuleStatus::Ready {
            assert!(
                std::time::Instant::now() < deadline,
                "navigation never became Ready"
            );
            std::thread::sleep(Duration::from_millis(5));
        }

        store.set_mission(MissionRecord {
            current_state: MissionState::Off,
            critical_failure: false,
        });
        handle.join().unwrap();
    }
}
