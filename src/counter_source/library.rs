// Library-backed counter source via sysinfo.
// sysinfo only reports disk bytes, so completed disk operations come from diskstats.

use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use sysinfo::{Networks, System};
use tracing::instrument;

use super::{CounterSource, ProcTextCounterSource, SourceKind, round2};

pub struct LibraryCounterSource {
    sys: Mutex<System>,
    networks: Mutex<Networks>,
    diskstats: ProcTextCounterSource,
    cpu_window: Duration,
}

impl LibraryCounterSource {
    /// The CPU window is raised to sysinfo's minimum update interval when shorter.
    /// `proc_root` is where `diskstats` is read from, normally `/proc`.
    pub fn new(cpu_window: Duration, proc_root: impl AsRef<Path>) -> Self {
        let mut sys = System::new();
        sys.refresh_memory();
        let cpu_window = cpu_window.max(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);
        Self {
            sys: Mutex::new(sys),
            networks: Mutex::new(Networks::new_with_refreshed_list()),
            diskstats: ProcTextCounterSource::new(proc_root, cpu_window),
            cpu_window,
        }
    }
}

impl CounterSource for LibraryCounterSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Library
    }

    #[instrument(skip(self), fields(source = "sysinfo", operation = "cpu_usage_percent"))]
    fn cpu_usage_percent(&self) -> f64 {
        let Ok(mut sys) = self.sys.lock() else {
            tracing::warn!("sysinfo lock poisoned, reporting zero cpu");
            return 0.0;
        };
        sys.refresh_cpu_all();
        std::thread::sleep(self.cpu_window);
        sys.refresh_cpu_all();
        round2((sys.global_cpu_usage() as f64).clamp(0.0, 100.0))
    }

    fn memory_available_percent(&self) -> f64 {
        let Ok(mut sys) = self.sys.lock() else {
            tracing::warn!("sysinfo lock poisoned, reporting zero memory");
            return 0.0;
        };
        sys.refresh_memory();
        let total = sys.total_memory();
        if total == 0 {
            return 0.0;
        }
        round2(sys.available_memory() as f64 * 100.0 / total as f64)
    }

    /// Completed (reads, writes), same unit as the /proc source. Zero where diskstats is absent.
    fn disk_io(&self) -> (u64, u64) {
        self.diskstats.disk_io()
    }

    fn network_io(&self) -> (u64, u64) {
        let Ok(mut networks) = self.networks.lock() else {
            tracing::warn!("sysinfo networks lock poisoned, reporting zero network io");
            return (0, 0);
        };
        networks.refresh(true);
        networks
            .list()
            .values()
            .fold((0u64, 0u64), |(rx, tx), data| {
                (
                    rx.saturating_add(data.total_received()),
                    tx.saturating_add(data.total_transmitted()),
                )
            })
    }
}
