//! The status push loop.
//!
//! Every 100 ms: snapshot the store, serialize one packet, ship it. A send
//! failure marks telemetry `CriticalFailure` and ends the loop; the state
//! machine picks the failure up as an emergency on its next tick.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use pod_common::data::store::DataStore;
use pod_common::flags::RunFlag;
use pod_common::state::ModuleStatus;
use pod_common::time::wall_clock_us;

use crate::client::Client;
use crate::packet::TelemetryPacket;

/// Push period.
const SEND_INTERVAL: Duration = Duration::from_millis(100);

/// Mark the telemetry module failed in the store.
pub(crate) fn mark_failed(store: &DataStore) {
    let mut telemetry = store.telemetry();
    telemetry.module_status = ModuleStatus::CriticalFailure;
    store.set_telemetry(telemetry);
}

/// Run the push loop until shutdown or link loss.
pub fn run(mut client: Client, store: Arc<DataStore>, running: RunFlag) {
    info!(target: "telemetry", "send loop started");
    let mut next_id = 0u64;

    while running.is_running() {
        let packet = TelemetryPacket::from_store(next_id, wall_clock_us(), &store);
        next_id += 1;

        let json = match packet.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!(target: "telemetry", error = %e, "packet serialization failed");
                mark_failed(&store);
                break;
            }
        };
        if let Err(e) = client.send_line(&json) {
            error!(target: "telemetry", error = %e, "send failed, ending loop");
            mark_failed(&store);
            break;
        }

        std::thread::sleep(SEND_INTERVAL);
    }
    info!(target: "telemetry", "send loop exiting");
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};
    use std::net::TcpListener;

    #[test]
    fn sender_pushes_parseable_packets() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(socket);
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            line
        });

        let store = Arc::new(DataStore::new());
        let running = RunFlag::new();
        let client = Client::connect(&addr.ip().to_string(), addr.port()).unwrap();
        let sender = {
            let store = Arc::clone(&store);
            let running = running.clone();
            std::thread::spawn(move || run(client, store, running))
        };

        let line = server.join().unwrap();
        let packet: TelemetryPacket = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(packet.id, 0);

        running.shut_down();
        sender.join().unwrap();
    }

    #[test]
    fn link_loss_fails_the_module_and_ends_the_loop() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            // Ground drops the connection immediately.
            drop(socket);
        });

        let store = Arc::new(DataStore::new());
        let running = RunFlag::new();
        let client = Client::connect(&addr.ip().to_string(), addr.port()).unwrap();
        server.join().unwrap();

        // The loop must exit by itself even though running stays true.
        run(client, Arc::clone(&store), running.clone());
        assert_eq!(
            store.telemetry().module_status,
            ModuleStatus::CriticalFailure
        );
        assert!(running.is_running());
    }
}
