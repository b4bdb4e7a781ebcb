//! Window lifecycle: pending -> running -> finished
//!
//! Pure transition rules. Persisting a transition is the store's job (it
//! applies the same rule atomically); the scheduler decides when to fire.

use chrono::{DateTime, Duration, Utc};

use super::{MaintenanceWindow, Status};
use crate::errors::{MaintenanceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Scheduled start at `window.start`
    Start,
    /// Scheduled end at `window.end`
    End,
    /// Manual end before the natural end time
    EndEarly,
}

impl Transition {
    /// Status the window must have for the transition to be legal
    pub fn requires(self) -> Status {
        match self {
            Transition::Start => Status::Pending,
            Transition::End | Transition::EndEarly => Status::Running,
        }
    }

    pub fn target(self) -> Status {
        match self {
            Transition::Start => Status::Running,
            Transition::End | Transition::EndEarly => Status::Finished,
        }
    }

    pub fn check(self, window: &MaintenanceWindow) -> Result<()> {
        if window.status == self.requires() {
            return Ok(());
        }
        let reason = match (self, window.status) {
            (Transition::Start, Status::Running) => "maintenance already started",
            (Transition::Start, _) => "maintenance already finished",
            (_, Status::Pending) => "maintenance has not started",
            (_, _) => "maintenance already finished",
        };
        Err(MaintenanceError::invalid_transition(&window.id, reason))
    }
}

/// Copy of `window` after `transition`, stamped at `now`
pub fn apply(
    window: &MaintenanceWindow,
    transition: Transition,
    now: DateTime<Utc>,
) -> Result<MaintenanceWindow> {
    transition.check(window)?;
    let mut next = window.clone();
    next.status = transition.target();
    next.updated_at = Some(now);
    Ok(next)
}

/// Client edits (update, delete) are refused while a window is running
pub fn ensure_editable(window: &MaintenanceWindow) -> Result<()> {
    if window.status == Status::Running {
        return Err(MaintenanceError::invalid_transition(
            &window.id,
            "maintenance is running",
        ));
    }
    Ok(())
}

/// Copy of `window` with `end` moved by `minutes` (negative shortens it).
///
/// Only running windows can be extended; status and start never change.
pub fn extend(window: &MaintenanceWindow, minutes: i64) -> Result<MaintenanceWindow> {
    match window.status {
        Status::Running => {}
        Status::Pending => {
            return Err(MaintenanceError::invalid_transition(
                &window.id,
                "maintenance has not started",
            ))
        }
        Status::Finished => {
            return Err(MaintenanceError::invalid_transition(
                &window.id,
                "maintenance already finished",
            ))
        }
    }

    let end = Duration::try_minutes(minutes)
        .and_then(|delta| window.end.checked_add_signed(delta))
        .ok_or_else(|| {
            MaintenanceError::Validation(format!("Can not extend end by {} minutes", minutes))
        })?;

    let mut next = window.clone();
    next.end = end;
    next.validate()?;
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(status: Status) -> MaintenanceWindow {
        let now = Utc::now();
        let mut window = MaintenanceWindow::new(now + Duration::hours(1), now + Duration::hours(2));
        window.switches.push("s1".into());
        window.status = status;
        window
    }

    #[test]
    fn test_forward_transitions() {
        let now = Utc::now();
        let pending = window(Status::Pending);

        let running = apply(&pending, Transition::Start, now).unwrap();
        assert_eq!(running.status, Status::Running);
        assert_eq!(running.updated_at, Some(now));

        let finished = apply(&running, Transition::End, now).unwrap();
        assert_eq!(finished.status, Status::Finished);

        let early = apply(&running, Transition::EndEarly, now).unwrap();
        assert_eq!(early.status, Status::Finished);
    }

    #[test]
    fn test_no_skips_or_regressions() {
        let now = Utc::now();
        for (status, transition) in [
            (Status::Pending, Transition::End),
            (Status::Pending, Transition::EndEarly),
            (Status::Running, Transition::Start),
            (Status::Finished, Transition::Start),
            (Status::Finished, Transition::End),
            (Status::Finished, Transition::EndEarly),
        ] {
            let err = apply(&window(status), transition, now).unwrap_err();
            assert!(
                matches!(err, MaintenanceError::InvalidTransition { .. }),
                "{:?} from {:?} should be rejected",
                transition,
                status
            );
        }
    }

    #[test]
    fn test_running_window_not_editable() {
        assert!(ensure_editable(&window(Status::Pending)).is_ok());
        assert!(ensure_editable(&window(Status::Finished)).is_ok());
        assert!(ensure_editable(&window(Status::Running)).is_err());
    }

    #[test]
    fn test_extend_running() {
        let running = window(Status::Running);
        let extended = extend(&running, 30).unwrap();
        assert_eq!(extended.end - running.end, Duration::minutes(30));
        assert_eq!(extended.start, running.start);
        assert_eq!(extended.status, Status::Running);

        let shortened = extend(&running, -15).unwrap();
        assert_eq!(running.end - shortened.end, Duration::minutes(15));
    }

    #[test]
    fn test_extend_rejects_end_before_start() {
        let running = window(Status::Running);
        assert!(matches!(
            extend(&running, -60),
            Err(MaintenanceError::Validation(_))
        ));
    }

    #[test]
    fn test_extend_requires_running() {
        assert!(extend(&window(Status::Pending), 30).is_err());
        assert!(extend(&window(Status::Finished), 30).is_err());
    }
}
