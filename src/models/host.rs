// Per-host averages returned by the query endpoints.

use serde::{Deserialize, Serialize};

/// Averages for one host. Fields with no underlying rows stay at 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostStats {
    pub memory: f64,
    pub cpu: f64,
    pub disk_read: f64,
    pub disk_write: f64,
    pub network_read: f64,
    pub network_write: f64,
}
