//! Common test data: a small topology and window builders

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;

use maintenance_manager::topology::StaticTopology;
use maintenance_manager::window::{MaintenanceWindow, Status};

/// Switch ids in the sample topology
pub mod switches {
    pub const S1: &str = "00:00:00:00:00:00:00:01";
    pub const S2: &str = "00:00:00:00:00:00:00:02";
    pub const S3: &str = "00:00:00:00:00:00:00:03";
}

/// Interface ids in the sample topology
pub mod interfaces {
    pub const S1_1: &str = "00:00:00:00:00:00:00:01:1";
    pub const S1_2: &str = "00:00:00:00:00:00:00:01:2";
    pub const S1_3: &str = "00:00:00:00:00:00:00:01:3";
    pub const S2_1: &str = "00:00:00:00:00:00:00:02:1";
    pub const S2_2: &str = "00:00:00:00:00:00:00:02:2";
    pub const S3_1: &str = "00:00:00:00:00:00:00:03:1";
}

/// Link ids in the sample topology
pub mod links {
    /// S1:1 <-> S2:1
    pub const L1: &str = "link-s1-s2";
    /// S2:2 <-> S3:1
    pub const L2: &str = "link-s2-s3";
}

/// S1 -- L1 -- S2 -- L2 -- S3, S1:2 and S1:3 unconnected
pub fn sample_topology() -> StaticTopology {
    StaticTopology::new()
        .with_switch(
            switches::S1,
            [interfaces::S1_1, interfaces::S1_2, interfaces::S1_3],
        )
        .with_switch(switches::S2, [interfaces::S2_1, interfaces::S2_2])
        .with_switch(switches::S3, [interfaces::S3_1])
        .with_link(links::L1, interfaces::S1_1, interfaces::S2_1)
        .with_link(links::L2, interfaces::S2_2, interfaces::S3_1)
}

pub fn ids(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Builder for windows relative to "now"
#[derive(Debug, Clone)]
pub struct WindowBuilder {
    window: MaintenanceWindow,
}

impl WindowBuilder {
    /// Pending window from now+1h to now+2h with no devices
    pub fn new(id: &str) -> Self {
        let start = Utc::now() + Duration::hours(1);
        let mut window = MaintenanceWindow::new(start, start + Duration::hours(1));
        window.id = id.to_string();
        Self { window }
    }

    pub fn starts_in(mut self, offset: Duration) -> Self {
        let length = self.window.end - self.window.start;
        self.window.start = Utc::now() + offset;
        self.window.end = self.window.start + length;
        self
    }

    pub fn lasting(mut self, length: Duration) -> Self {
        self.window.end = self.window.start + length;
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.window.start = start;
        self.window.end = end;
        self
    }

    pub fn switches(mut self, ids: &[&str]) -> Self {
        self.window.switches = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn interfaces(mut self, ids: &[&str]) -> Self {
        self.window.interfaces = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn links(mut self, ids: &[&str]) -> Self {
        self.window.links = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn status(mut self, status: Status) -> Self {
        self.window.status = status;
        self
    }

    pub fn build(self) -> MaintenanceWindow {
        self.window
    }
}
