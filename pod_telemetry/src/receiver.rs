//! The command decode loop.
//!
//! Blocks on the socket, decodes one token per message and folds it into
//! the telemetry command record. An unrecognised token or a dead link
//! marks telemetry `CriticalFailure` and ends the loop.

use std::sync::Arc;

use tracing::{error, info};

use pod_common::data::store::DataStore;
use pod_common::flags::RunFlag;

use crate::client::Client;
use crate::sender::mark_failed;

/// Run the command pull loop until shutdown, link loss or a bad token.
pub fn run(mut client: Client, store: Arc<DataStore>, running: RunFlag) {
    info!(target: "telemetry", "receive loop started");

    while running.is_running() {
        let message = match client.receive() {
            Ok(message) => message,
            Err(crate::client::TelemetryError::ReceiveTimeout) => continue,
            Err(e) => {
                error!(target: "telemetry", error = %e, "receive failed, ending loop");
                mark_failed(&store);
                break;
            }
        };

        let mut commands = store.telemetry();
        match message.as_str() {
            // Liveness only.
            "ACK" => {
                info!(target: "telemetry", "ground: ACK");
            }
            "STOP" => {
                info!(target: "telemetry", "ground: STOP");
                commands.emergency_stop_command = true;
            }
            "CALIBRATE" => {
                info!(target: "telemetry", "ground: CALIBRATE");
                commands.calibrate_command = true;
            }
            "LAUNCH" => {
                info!(target: "telemetry", "ground: LAUNCH");
                commands.launch_command = true;
            }
            "RESET" => {
                info!(target: "telemetry", "ground: RESET");
                commands.reset_command = true;
            }
            "SHUTDOWN" => {
                info!(target: "telemetry", "ground: SHUTDOWN");
                commands.shutdown_command = true;
            }
            "SERVER_PROPULSION_GO" => {
                info!(target: "telemetry", "ground: SERVER_PROPULSION_GO");
                commands.service_propulsion_go = true;
            }
            "SERVER_PROPULSION_STOP" => {
                info!(target: "telemetry", "ground: SERVER_PROPULSION_STOP");
                commands.service_propulsion_go = false;
            }
            "NOMINAL_BRAKING" => {
                info!(target: "telemetry", "ground: NOMINAL_BRAKING");
                commands.nominal_braking_command = true;
            }
            "NOMINAL_RETRACT" => {
                info!(target: "telemetry", "ground: NOMINAL_RETRACT");
                commands.nominal_braking_command = false;
            }
            unknown => {
                error!(target: "telemetry", token = unknown, "unrecognised ground command");
                mark_failed(&store);
                break;
            }
        }
        store.set_telemetry(commands);
    }
    info!(target: "telemetry", "receive loop exiting");
}

// ─── Tests ──────────────────────────────────────────────────────────
