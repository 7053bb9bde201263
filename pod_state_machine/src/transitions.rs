//! The permitted-transition table.
//!
//! The mission DAG. Anything not listed here is forbidden; the runner
//! asserts against this table before publishing a transition.

use pod_common::state::MissionState;

/// Permitted successors of `from`.
pub fn successors(from: MissionState) -> &'static [MissionState] {
    use MissionState::*;
    match from {
        Idle => &[PreCalibrating, FailureStopped],
        PreCalibrating => &[Calibrating, FailureStopped],
        Calibrating => &[Ready, PreReady, FailureStopped],
        PreReady => &[Ready, FailureStopped],
        Ready => &[Accelerating, FailureStopped],
        Accelerating => &[Cruising, PreBraking, NominalBraking, FailurePreBraking],
        Cruising => &[PreBraking, NominalBraking, FailurePreBraking],
        PreBraking => &[NominalBraking, FailurePreBraking],
        NominalBraking => &[Finished, FailureBraking],
        FailurePreBraking => &[FailureBraking],
        FailureBraking => &[FailureStopped],
        Finished => &[Off],
        FailureStopped => &[Off],
        Off => &[],
    }
}

/// True iff `from → to` is in the mission DAG.
pub fn is_permitted(from: MissionState, to: MissionState) -> bool {
    successors(from).contains(&to)
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use MissionState::*;

    #[test]
    fn nominal_run_without_cruising_is_a_path() {
        let path = [
            Idle,
            PreCalibrating,
            Calibrating,
            PreReady,
            Ready,
            Accelerating,
            PreBraking,
            NominalBraking,
            Finished,
            Off,
        ];
        for pair in path.windows(2) {
            assert!(is_permitted(pair[0], pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn nominal_run_with_cruising_is_a_path() {
        let path = [Accelerating, Cruising, PreBraking, NominalBraking, Finished, Off];
        for pair in path.windows(2) {
            assert!(is_permitted(pair[0], pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn emergency_paths_exist_from_every_running_state() {
        // At-rest states go straight to FailureStopped.
        for state in [Idle, PreCalibrating, Calibrating, PreReady, Ready] {
            assert!(is_permitted(state, FailureStopped), "{state:?}");
        }
        // Moving states route through the high-power gate.
        for state in [Accelerating, Cruising, PreBraking] {
            assert!(is_permitted(state, FailurePreBraking), "{state:?}");
        }
        assert!(is_permitted(NominalBraking, FailureBraking));
        assert!(is_permitted(FailurePreBraking, FailureBraking));
        assert!(is_permitted(FailureBraking, FailureStopped));
        assert!(is_permitted(FailureStopped, Off));
    }

    #[test]
    fn off_is_terminal() {
        assert!(successors(Off).is_empty());
        for state in MissionState::ALL {
            if state != Finished && state != FailureStopped {
                assert!(!is_permitted(state, Off), "{state:?} must not reach Off");
            }
        }
    }

    #[test]
    fn no_transition_escapes_a_failure_path() {
        // Once failing, only failure states and Off are reachable.
        for state in [FailurePreBraking, FailureBraking, FailureStopped] {
            for next in successors(state) {
                assert!(
                    next.is_failure() || next.is_terminal(),
                    "{state:?} -> {next:?}"
                );
            }
        }
    }

    #[test]
    fn forbidden_examples() {
        assert!(!is_permitted(Idle, Calibrating));
        assert!(!is_permitted(Idle, Accelerating));
        assert!(!is_permitted(Ready, NominalBraking));
        assert!(!is_permitted(NominalBraking, Accelerating));
        assert!(!is_permitted(Finished, Idle));
        assert!(!is_permitted(FailureStopped, Idle));
    }
}
