//! Pod control core entry point.
//!
//! Wires the shared store, spawns one OS thread per task (navigation,
//! state machine, telemetry send, telemetry receive) and joins them on
//! shutdown. Exit code 0 on a clean shutdown through `Off`, 1 on a fatal
//! setup error.

mod cli;
mod signals;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pod_common::config::PodConfig;
use pod_common::data::store::DataStore;
use pod_common::flags::RunFlag;
use pod_common::state::ModuleStatus;
use pod_navigation::Navigation;
use pod_state_machine::{GuardConfig, StateMachine};
use pod_telemetry::Client;

use cli::Cli;

/// Delay before a `_fail` fake variant injects its failure.
const FAKE_FAILURE_DELAY: Duration = Duration::from_secs(10);

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cli.log_directives()))
        .init();

    let config = match PodConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "cannot load configuration");
            return ExitCode::from(1);
        }
    };

    let run_kind = cli.run_kind();
    info!(?run_kind, config = %cli.config.display(), "pod starting");

    let store = Arc::new(DataStore::new());
    let running = RunFlag::new();
    if let Err(e) = signals::install(&running) {
        error!(error = %e, "cannot install signal handlers");
        return ExitCode::from(1);
    }

    // The ground link comes up before anything enters Init; a pod that
    // cannot talk to the ground never arms.
    let client = match Client::connect(
        &config.telemetry.server_ip,
        config.telemetry.server_port,
    ) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "ground station unreachable");
            set_telemetry_status(&store, ModuleStatus::CriticalFailure);
            return ExitCode::from(1);
        }
    };
    let receive_client = match client.try_clone() {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "cannot split the ground link");
            return ExitCode::from(1);
        }
    };
    // A bounded recv keeps the receive loop responsive to shutdown.
    if let Err(e) = receive_client.set_read_timeout(Some(Duration::from_millis(500))) {
        error!(error = %e, "cannot configure the ground link");
        return ExitCode::from(1);
    }
    set_telemetry_status(&store, ModuleStatus::Init);

    apply_fake_toggles(&cli, &store, &running);

    // Navigation constructs here so its Init status lands before the
    // state machine starts evaluating guards.
    let mut navigation_config = config.navigation.clone();
    if let Some(axis) = cli.axis {
        navigation_config.axis = axis;
    }
    let mut navigation = Navigation::new(Arc::clone(&store), navigation_config, run_kind);
    if cli.fake_keyence {
        navigation.set_stripes_enabled(false);
    }

    let guard_config = GuardConfig::from_config(&config, run_kind);

    let nav_thread = {
        let store = Arc::clone(&store);
        let running = running.clone();
        std::thread::Builder::new()
            .name("navigation".into())
            .spawn(move || pod_navigation::run::run(navigation, store, running))
            .expect("spawn navigation thread")
    };
    let state_thread = {
        let store = Arc::clone(&store);
        let running = running.clone();
        let machine = StateMachine::new(store, guard_config);
        std::thread::Builder::new()
            .name("state-machine".into())
            .spawn(move || machine.run(running))
            .expect("spawn state machine thread")
    };
    let sender_thread = {
        let store = Arc::clone(&store);
        let running = running.clone();
        std::thread::Builder::new()
            .name("tlm-send".into())
            .spawn(move || pod_telemetry::sender::run(client, store, running))
            .expect("spawn telemetry send thread")
    };
    let receiver_thread = {
        let store = Arc::clone(&store);
        let running = running.clone();
        std::thread::Builder::new()
            .name("tlm-recv".into())
            .spawn(move || pod_telemetry::receiver::run(receive_client, store, running))
            .expect("spawn telemetry receive thread")
    };

    // Both telemetry loops are up: the module is at operational standby.
    set_telemetry_status(&store, ModuleStatus::Ready);

    for handle in [nav_thread, state_thread, sender_thread, receiver_thread] {
        if handle.join().is_err() {
            warn!("a task thread panicked during shutdown");
        }
    }

    info!("pod exiting cleanly");
    ExitCode::SUCCESS
}

fn set_telemetry_status(store: &DataStore, status: ModuleStatus) {
    let mut telemetry = store.telemetry();
    telemetry.module_status = status;
    store.set_telemetry(telemetry);
}

/// Stand in for absent subsystems on the bench: a toggled module reports
/// `Ready`; its `_fail` variant also schedules a failure injection.
fn apply_fake_toggles(cli: &Cli, store: &Arc<DataStore>, running: &RunFlag) {
    if cli.fake_imu || cli.fake_imu_fail || cli.fake_keyence || cli.fake_keyence_fail
        || cli.fake_temperature || cli.fake_temperature_fail
    {
        let mut sensors = store.sensors();
        sensors.module_status = ModuleStatus::Ready;
        store.set_sensors(sensors);
        info!("sensors simulated as ready");
    }
    if cli.fake_batteries || cli.fake_batteries_fail || cli.battery_test {
        let mut batteries = store.batteries();
        batteries.module_status = ModuleStatus::Ready;
        store.set_batteries(batteries);
        info!("batteries simulated as ready");
    }
    if cli.fake_brakes {
        let mut brakes = store.brakes();
        brakes.module_status = ModuleStatus::Ready;
        store.set_brakes(brakes);
        info!("brakes simulated as ready");
    }
    if cli.fake_motors {
        let mut motors = store.motors();
        motors.module_status = ModuleStatus::Ready;
        store.set_motors(motors);
        info!("motors simulated as ready");
    }
    if cli.fake_highpower {
        let mut sensors = store.sensors();
        sensors.high_power_relays_off = [false; pod_common::consts::NUM_HP_RELAYS];
        store.set_sensors(sensors);
        info!("high-power rail simulated as energised");
    }

    let inject_sensor_failure =
        cli.fake_imu_fail || cli.fake_keyence_fail || cli.fake_temperature_fail;
    let inject_battery_failure = cli.fake_batteries_fail;
    if inject_sensor_failure || inject_battery_failure {
        let store = Arc::clone(store);
        let running = running.clone();
        std::thread::Builder::new()
            .name("fail-injector".into())
            .spawn(move || {
                std::thread::sleep(FAKE_FAILURE_DELAY);
                if !running.is_running() {
                    return;
                }
                if inject_sensor_failure {
                    let mut sensors = store.sensors();
                    sensors.module_status = ModuleStatus::CriticalFailure;
                    store.set_sensors(sensors);
                    warn!("injected sensors failure");
                }
                if inject_battery_failure {
                    let mut batteries = store.batteries();
                    batteries.module_status = ModuleStatus::CriticalFailure;
                    store.set_batteries(batteries);
                    warn!("injected batteries failure");
                }
            })
            .expect("spawn failure injector thread");
    }
}
