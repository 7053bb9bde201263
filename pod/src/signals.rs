//! Signal handling.
//!
//! Every handled signal does exactly one thing: clear the process-wide run
//! flag. Task loops notice on their next iteration and exit, which lets
//! telemetry flush before the process ends, even for the SIGSEGV class.

use std::sync::OnceLock;

use nix::libc::c_int;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

use pod_common::flags::RunFlag;

static RUN_FLAG: OnceLock<RunFlag> = OnceLock::new();

extern "C" fn handle_signal(_signum: c_int) {
    // Only an atomic store; everything else is unsafe in a handler.
    if let Some(flag) = RUN_FLAG.get() {
        flag.shut_down();
    }
}

/// Install shutdown handlers for the fatal and termination signals.
pub fn install(running: &RunFlag) -> nix::Result<()> {
    let _ = RUN_FLAG.set(running.clone());
    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );
    for signal in [
        Signal::SIGINT,
        Signal::SIGTERM,
        Signal::SIGSEGV,
        Signal::SIGABRT,
        Signal::SIGFPE,
        Signal::SIGILL,
    ] {
        unsafe {
            sigaction(signal, &action)?;
        }
    }
    Ok(())
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sigint_clears_the_run_flag() {
        let running = RunFlag::new();
        install(&running).unwrap();
        assert!(running.is_running());
        nix::sys::signal::raise(Signal::SIGINT).unwrap();
        assert!(!running.is_running());
    }
}
