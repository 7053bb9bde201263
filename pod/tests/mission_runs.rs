//! End-to-end mission scenarios.
//!
//! Each test runs the real state-machine loop on its own thread and plays
//! the roles of the other modules by writing their records into the shared
//! store, the same way the real producers do.

use std::net::TcpListener;
use std::sync::Arc;
use std::time::{Duration, Instant};

use pod_common::config::{NavigationConfig, RunKind};
use pod_common::data::store::DataStore;
use pod_common::data::{DataPoint, ImuReading, MissionRecord};
use pod_common::flags::RunFlag;
use pod_common::state::{MissionState, ModuleStatus};
use pod_navigation::Navigation;
use pod_state_machine::{GuardConfig, StateMachine};
use pod_telemetry::Client;

fn guard_config() -> GuardConfig {
    GuardConfig {
        run_length_m: 1250.0,
        braking_buffer_m: 20.0,
        maximum_velocity_mps: 100.0,
        acceleration_timeout_us: 30_000_000,
        enforce_battery_limits: false,
        stop_requests_nominal_braking: false,
    }
}

struct Harness {
    store: Arc<DataStore>,
    running: RunFlag,
    machine: Option<std::thread::JoinHandle<()>>,
}

impl Harness {
    fn start() -> Self {
        let store = Arc::new(DataStore::new());
        let running = RunFlag::new();
        let machine = {
            let machine = StateMachine::new(Arc::clone(&store), guard_config());
            let running = running.clone();
            Some(std::thread::spawn(move || machine.run(running)))
        };
        Self {
            store,
            running,
            machine,
        }
    }

    fn wait_for_state(&self, state: MissionState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while self.store.mission().current_state != state {
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {state:?}, stuck in {:?}",
                self.store.mission().current_state
            );
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn set_all_statuses(&self, status: ModuleStatus) {
        let store = &self.store;
        let mut brakes = store.brakes();
        brakes.module_status = status;
        store.set_brakes(brakes);
        let mut navigation = store.navigation();
        navigation.module_status = status;
        store.set_navigation(navigation);
        let mut batteries = store.batteries();
        batteries.module_status = status;
        store.set_batteries(batteries);
        let mut telemetry = store.telemetry();
        telemetry.module_status = status;
        store.set_telemetry(telemetry);
        let mut sensors = store.sensors();
        sensors.module_status = status;
        store.set_sensors(sensors);
        let mut motors = store.motors();
        motors.module_status = status;
        store.set_motors(motors);
    }

    fn set_high_power_off(&self, off: bool) {
        let mut sensors = self.store.sensors();
        sensors.high_power_relays_off = [off; 4];
        self.store.set_sensors(sensors);
    }

    fn command<F: FnOnce(&mut pod_common::data::TelemetryCommands)>(&self, apply: F) {
        let mut telemetry = self.store.telemetry();
        apply(&mut telemetry);
        self.store.set_telemetry(telemetry);
    }

    fn set_kinematics(&self, displacement: f64, velocity: f64, braking_distance: f64) {
        let mut navigation = self.store.navigation();
        navigation.displacement_m = displacement;
        navigation.velocity_mps = velocity;
        navigation.emergency_braking_distance_m = braking_distance / 1.2;
        navigation.braking_distance_m = braking_distance;
        self.store.set_navigation(navigation);
    }

    fn seed_state(&self, state: MissionState) {
        self.store.set_mission(MissionRecord {
            current_state: state,
            critical_failure: state.is_failure(),
        });
    }

    fn shutdown_and_join(mut self) {
        self.command(|commands| commands.shutdown_command = true);
        self.wait_for_state(MissionState::Off);
        self.machine.take().unwrap().join().unwrap();
        assert!(!self.running.is_running());
    }
}

#[test]
fn nominal_run_without_cruising() {
    let harness = Harness::start();
    // Pod at standstill, high power safely down.
    harness.set_high_power_off(true);

    harness.set_all_statuses(ModuleStatus::Init);
    harness.wait_for_state(MissionState::PreCalibrating);

    harness.command(|commands| commands.calibrate_command = true);
    harness.wait_for_state(MissionState::Calibrating);

    harness.set_all_statuses(ModuleStatus::Ready);
    harness.wait_for_state(MissionState::PreReady);

    // High power rail comes up.
    harness.set_high_power_off(false);
    harness.wait_for_state(MissionState::Ready);

    harness.command(|commands| commands.launch_command = true);
    harness.wait_for_state(MissionState::Accelerating);

    // Deep in the run the stopping distance no longer fits the track.
    harness.set_kinematics(1100.0, 90.0, 200.0);
    harness.wait_for_state(MissionState::PreBraking);

    harness.set_high_power_off(true);
    harness.wait_for_state(MissionState::NominalBraking);

    harness.set_kinematics(1240.0, 0.0, 0.0);
    harness.wait_for_state(MissionState::Finished);

    assert!(!harness.store.mission().critical_failure);
    harness.shutdown_and_join();
}

#[test]
fn nominal_run_with_cruising() {
    let harness = Harness::start();
    harness.set_high_power_off(true);
    harness.set_all_statuses(ModuleStatus::Init);
    harness.wait_for_state(MissionState::PreCalibrating);
    harness.command(|commands| commands.calibrate_command = true);
    harness.set_all_statuses(ModuleStatus::Ready);
    harness.wait_for_state(MissionState::PreReady);
    harness.set_high_power_off(false);
    harness.wait_for_state(MissionState::Ready);
    harness.command(|commands| commands.launch_command = true);
    harness.wait_for_state(MissionState::Accelerating);

    // Hold at maximum velocity well before the braking zone.
    harness.set_kinematics(400.0, 100.0, 260.0);
    harness.wait_for_state(MissionState::Cruising);

    harness.set_kinematics(1000.0, 100.0, 260.0);
    harness.wait_for_state(MissionState::PreBraking);

    harness.set_high_power_off(true);
    harness.wait_for_state(MissionState::NominalBraking);

    harness.set_kinematics(1230.0, 0.0, 0.0);
    harness.wait_for_state(MissionState::Finished);

    assert!(!harness.store.mission().critical_failure);
    harness.shutdown_and_join();
}

#[test]
fn idle_emergency_stops_where_it_stands() {
    let harness = Harness::start();
    let mut brakes = harness.store.brakes();
    brakes.module_status = ModuleStatus::CriticalFailure;
    harness.store.set_brakes(brakes);

    harness.wait_for_state(MissionState::FailureStopped);
    assert!(harness.store.mission().critical_failure);
    harness.shutdown_and_join();
}

#[test]
fn accelerating_emergency_brakes_through_the_high_power_gate() {
    let harness = Harness::start();
    // Seed the mission mid-run before the module statuses can walk the
    // machine out of Idle on their own.
    harness.seed_state(MissionState::Accelerating);
    harness.set_all_statuses(ModuleStatus::Ready);
    harness.set_high_power_off(false);
    harness.set_kinematics(300.0, 50.0, 60.0);

    let mut navigation = harness.store.navigation();
    navigation.module_status = ModuleStatus::CriticalFailure;
    harness.store.set_navigation(navigation);

    harness.wait_for_state(MissionState::FailurePreBraking);
    assert!(harness.store.mission().critical_failure);

    harness.set_high_power_off(true);
    harness.wait_for_state(MissionState::FailureBraking);

    let mut navigation = harness.store.navigation();
    navigation.velocity_mps = 0.0;
    harness.store.set_navigation(navigation);
    harness.wait_for_state(MissionState::FailureStopped);

    assert!(harness.store.mission().critical_failure);
    harness.shutdown_and_join();
}

#[test]
fn stripe_disagreement_trips_navigation_and_the_mission() {
    let harness = Harness::start();
    harness.seed_state(MissionState::Accelerating);
    harness.set_all_statuses(ModuleStatus::Ready);
    harness.set_high_power_off(false);
    // While navigation is at standstill, the default stopping distance
    // keeps every Accelerating guard quiet.

    // A real estimator owns the navigation record from here on.
    let mut sensors = harness.store.sensors();
    sensors.imus = DataPoint::new(
        0,
        [ImuReading {
            acc: [0.0, 0.0, 9.81],
            operational: true,
        }; 4],
    );
    harness.store.set_sensors(sensors);

    let mut navigation = Navigation::new(
        Arc::clone(&harness.store),
        NavigationConfig {
            axis: 0,
            calibration_variance_limits: [0.05; 3],
            calibration_attempts: 1,
            calibration_queries: 5,
            stripe_distance_m: 30.48,
            run_length_m: 1250.0,
        },
        RunKind::Tube,
    );
    navigation.calibrate_gravity(&harness.running);
    assert_eq!(navigation.module_status(), ModuleStatus::Ready);

    harness.seed_state(MissionState::Accelerating);
    navigation.init_timestamps(0);

    // The pod is barely moving while the counters race ahead.
    for (count, timestamp) in [(1u32, 200_000u64), (2, 400_000)] {
        let mut sensors = harness.store.sensors();
        sensors.stripe_counters[0].count = count;
        sensors.stripe_counters[0].timestamp_us = timestamp;
        sensors.imus.timestamp_us = timestamp;
        harness.store.set_sensors(sensors);
        navigation.navigate();
    }
    assert_eq!(navigation.module_status(), ModuleStatus::CriticalFailure);

    harness.wait_for_state(MissionState::FailurePreBraking);
    assert!(harness.store.mission().critical_failure);

    harness.set_high_power_off(true);
    harness.wait_for_state(MissionState::FailureBraking);
    harness.wait_for_state(MissionState::FailureStopped);
    harness.shutdown_and_join();
}

#[test]
fn ground_link_drop_fails_the_mission() {
    let harness = Harness::start();
    harness.seed_state(MissionState::Ready);
    harness.set_all_statuses(ModuleStatus::Ready);
    harness.set_high_power_off(false);

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let ground = std::thread::spawn(move || listener.accept().unwrap().0);
    let client = Client::connect(&addr.ip().to_string(), addr.port()).unwrap();
    let socket = ground.join().unwrap();

    let receiver = {
        let store = Arc::clone(&harness.store);
        let running = harness.running.clone();
        std::thread::spawn(move || pod_telemetry::receiver::run(client, store, running))
    };

    // The ground station goes away; the receiver fails telemetry and the
    // state machine treats it as an emergency.
    drop(socket);
    receiver.join().unwrap();
    assert_eq!(
        harness.store.telemetry().module_status,
        ModuleStatus::CriticalFailure
    );

    harness.wait_for_state(MissionState::FailureStopped);
    assert!(harness.store.mission().critical_failure);
    harness.shutdown_and_join();
}
