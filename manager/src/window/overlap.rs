//! Overlap detection between a candidate window and existing windows

use super::{MaintenanceWindow, Status};

/// Half-open interval test: `[s1, e1)` and `[s2, e2)` overlap iff either
/// start falls inside the other interval. Back-to-back windows do not overlap.
pub fn intervals_overlap(a: &MaintenanceWindow, b: &MaintenanceWindow) -> bool {
    (a.start <= b.start && b.start < a.end) || (b.start <= a.start && a.start < b.end)
}

/// Existing windows that conflict with `candidate`.
///
/// Finished windows and the candidate's own record never conflict. With
/// `device_aware` a time overlap only counts when the windows share a switch,
/// interface or link.
pub fn check_overlap(
    candidate: &MaintenanceWindow,
    existing: &[MaintenanceWindow],
    device_aware: bool,
) -> Vec<MaintenanceWindow> {
    existing
        .iter()
        .filter(|other| other.status != Status::Finished)
        .filter(|other| other.id != candidate.id)
        .filter(|other| intervals_overlap(candidate, other))
        .filter(|other| !device_aware || candidate.shares_devices(other))
        .cloned()
        .collect()
}
