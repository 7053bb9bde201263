//! Pod Telemetry
//!
//! Bidirectional link to the ground station over one TCP connection:
//! a 10 Hz status push (newline-terminated JSON) and a command pull
//! (8-byte ASCII length header + token payload). Losing the link in either
//! direction is a mission-ending failure; there are no reconnects, the pod
//! must brake autonomously.
//!
//! # Module Structure
//!
//! - [`client`] - The TCP connection and its two framings
//! - [`packet`] - The self-describing status message
//! - [`sender`] - The 10 Hz push loop
//! - [`receiver`] - The command decode loop

pub mod client;
pub mod packet;
pub mod receiver;
pub mod sender;

pub use client::{Client, TelemetryError};
pub use packet::TelemetryPacket;
