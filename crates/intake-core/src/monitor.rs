//! Process resource sampling and admission control.
//!
//! One dedicated background thread samples CPU, memory, disk, and open-file
//! usage on a fixed interval and publishes each sample by swapping an
//! `Arc<ResourceSnapshot>` wholesale, so readers never block the sampler.
//! When monitoring is inactive, reads sample fresh on demand instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use sysinfo::{Disks, ProcessesToUpdate, System};

use crate::config::PipelineConfig;

const MB: u64 = 1024 * 1024;

/// Fraction of a hard limit at which the sampler logs a soft warning.
const SOFT_WARN_FRACTION: f64 = 0.9;

/// One sample of process and host resource usage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceSnapshot {
    /// Host CPU usage averaged across cores, in percent.
    pub cpu_percent: f32,
    /// Resident set size of this process, in megabytes.
    pub rss_memory_mb: u64,
    /// Host memory usage, in percent.
    pub memory_percent: f32,
    /// Usage of the fullest mounted disk, in percent.
    pub disk_percent: f32,
    /// Open file descriptors of this process, where the platform exposes
    /// them (`/proc` on Linux).
    pub open_files: Option<usize>,
    /// Shared memory of this process in megabytes (0 where unavailable).
    pub shared_memory_mb: u64,
    /// Logical CPU core count.
    pub cpu_cores: usize,
}

impl ResourceSnapshot {
    /// Serializes the snapshot for logging and telemetry.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Admission decision for new work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "admission")]
pub enum Admission {
    /// Resources are below their limits; work may start.
    Granted,
    /// A limit is exceeded; the caller should retry later.
    Denied {
        /// Human-readable reason naming the exhausted resource and limits.
        reason: String,
    },
}

impl Admission {
    /// Returns `true` when work may start.
    #[must_use]
    pub const fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }

    /// The denial reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Granted => None,
            Self::Denied { reason } => Some(reason),
        }
    }
}

/// Shared state between the monitor handle and its sampler thread.
struct Shared {
    latest: RwLock<Arc<ResourceSnapshot>>,
    system: Mutex<System>,
    active: AtomicBool,
    // Condvar wakes the sampler early on stop so shutdown never waits out
    // a full interval.
    sleep_lock: Mutex<()>,
    sleep_cv: Condvar,
}

/// Samples resource usage and answers the admission question.
pub struct ResourceMonitor {
    config: Arc<PipelineConfig>,
    shared: Arc<Shared>,
    sampler: Mutex<Option<std::thread::JoinHandle<()>>>,
}

impl std::fmt::Debug for ResourceMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceMonitor")
            .field("active", &self.is_monitoring())
            .finish_non_exhaustive()
    }
}

impl ResourceMonitor {
    /// Creates a monitor bound to a configuration. Monitoring starts
    /// inactive; reads sample fresh until [`ResourceMonitor::start_monitoring`]
    /// is called.
    #[must_use]
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        let shared = Arc::new(Shared {
            latest: RwLock::new(Arc::new(ResourceSnapshot::default())),
            system: Mutex::new(System::new()),
            active: AtomicBool::new(false),
            sleep_lock: Mutex::new(()),
            sleep_cv: Condvar::new(),
        });
        Self {
            config,
            shared,
            sampler: Mutex::new(None),
        }
    }

    /// Whether the background sampler is running.
    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Starts the background sampler thread. Idempotent.
    pub fn start_monitoring(&self) {
        if self.shared.active.swap(true, Ordering::SeqCst) {
            return;
        }
        let shared = Arc::clone(&self.shared);
        let config = Arc::clone(&self.config);
        let handle = std::thread::Builder::new()
            .name("intake-monitor".to_owned())
            .spawn(move || sampler_loop(&shared, &config));
        match handle {
            Ok(handle) => {
                let mut guard = self.sampler.lock().unwrap_or_else(PoisonError::into_inner);
                *guard = Some(handle);
            }
            Err(err) => {
                self.shared.active.store(false, Ordering::SeqCst);
                tracing::error!(error = %err, "failed to spawn resource sampler thread");
            }
        }
    }

    /// Stops the background sampler and waits for it to exit. Idempotent.
    pub fn stop_monitoring(&self) {
        if !self.shared.active.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shared.sleep_cv.notify_all();
        let handle = {
            let mut guard = self.sampler.lock().unwrap_or_else(PoisonError::into_inner);
            guard.take()
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }

    /// Returns current resource usage: the last published sample while
    /// monitoring is active, a fresh sample otherwise.
    #[must_use]
    pub fn current_usage(&self) -> Arc<ResourceSnapshot> {
        if self.is_monitoring() {
            let guard = self.shared.latest.read().unwrap_or_else(PoisonError::into_inner);
            return Arc::clone(&guard);
        }
        match self.sample() {
            Ok(snapshot) => {
                let snapshot = Arc::new(snapshot);
                let mut guard = self.shared.latest.write().unwrap_or_else(PoisonError::into_inner);
                *guard = Arc::clone(&snapshot);
                snapshot
            }
            Err(err) => {
                tracing::warn!(error = %err, "resource sampling failed, using last snapshot");
                let guard = self.shared.latest.read().unwrap_or_else(PoisonError::into_inner);
                Arc::clone(&guard)
            }
        }
    }

    /// Decides whether new work may be admitted right now.
    ///
    /// The decision is never cached: it is recomputed from the freshest
    /// snapshot on every call.
    #[must_use]
    pub fn are_resources_available(&self) -> Admission {
        let snapshot = self.current_usage();
        self.admission_for(&snapshot)
    }

    /// Applies the configured limits to a snapshot.
    #[must_use]
    pub fn admission_for(&self, snapshot: &ResourceSnapshot) -> Admission {
        if snapshot.cpu_percent > self.config.cpu_limit_percent {
            return Admission::Denied {
                reason: format!(
                    "CPU usage {:.1}% exceeds the {:.1}% limit",
                    snapshot.cpu_percent, self.config.cpu_limit_percent
                ),
            };
        }
        if snapshot.rss_memory_mb > self.config.memory_limit_mb {
            return Admission::Denied {
                reason: format!(
                    "process memory {} MB exceeds the {} MB limit",
                    snapshot.rss_memory_mb, self.config.memory_limit_mb
                ),
            };
        }
        Admission::Granted
    }

    fn sample(&self) -> std::io::Result<ResourceSnapshot> {
        let mut system = self.shared.system.lock().unwrap_or_else(PoisonError::into_inner);
        sample_with(&mut system)
    }
}

impl Drop for ResourceMonitor {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

/// Collects one snapshot from the host.
fn sample_with(system: &mut System) -> std::io::Result<ResourceSnapshot> {
    system.refresh_cpu_usage();
    system.refresh_memory();

    let pid = sysinfo::get_current_pid().map_err(std::io::Error::other)?;
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    let process = system
        .process(pid)
        .ok_or_else(|| std::io::Error::other("current process not visible to sampler"))?;

    let total_memory = system.total_memory();
    let memory_percent = if total_memory == 0 {
        0.0
    } else {
        (system.used_memory() as f64 / total_memory as f64 * 100.0) as f32
    };

    let disks = Disks::new_with_refreshed_list();
    let disk_percent = disks
        .iter()
        .filter(|disk| disk.total_space() > 0)
        .map(|disk| {
            let used = disk.total_space() - disk.available_space();
            (used as f64 / disk.total_space() as f64 * 100.0) as f32
        })
        .fold(0.0_f32, f32::max);

    Ok(ResourceSnapshot {
        cpu_percent: system.global_cpu_usage(),
        rss_memory_mb: process.memory() / MB,
        memory_percent,
        disk_percent,
        open_files: open_file_count(),
        shared_memory_mb: shared_memory_mb(),
        cpu_cores: system.cpus().len(),
    })
}

#[cfg(target_os = "linux")]
fn open_file_count() -> Option<usize> {
    std::fs::read_dir("/proc/self/fd").ok().map(Iterator::count)
}

#[cfg(not(target_os = "linux"))]
fn open_file_count() -> Option<usize> {
    None
}

/// Shared pages from `/proc/self/statm`, converted to megabytes.
#[cfg(target_os = "linux")]
fn shared_memory_mb() -> u64 {
    const PAGE_SIZE: u64 = 4096;
    std::fs::read_to_string("/proc/self/statm")
        .ok()
        .and_then(|statm| {
            statm
                .split_whitespace()
                .nth(2)
                .and_then(|pages| pages.parse::<u64>().ok())
        })
        .map_or(0, |pages| pages * PAGE_SIZE / MB)
}

#[cfg(not(target_os = "linux"))]
fn shared_memory_mb() -> u64 {
    0
}

/// The sampler loop: sample, publish, warn near limits, sleep.
///
/// On a sampling error the sleep doubles once, then the normal cadence
/// resumes.
fn sampler_loop(shared: &Shared, config: &PipelineConfig) {
    let mut backed_off = false;
    while shared.active.load(Ordering::SeqCst) {
        let sampled = {
            let mut system = shared.system.lock().unwrap_or_else(PoisonError::into_inner);
            sample_with(&mut system)
        };
        let mut sleep_for = config.monitoring_interval;
        match sampled {
            Ok(snapshot) => {
                warn_near_limits(&snapshot, config);
                let snapshot = Arc::new(snapshot);
                let mut guard = shared.latest.write().unwrap_or_else(PoisonError::into_inner);
                *guard = snapshot;
                backed_off = false;
            }
            Err(err) => {
                tracing::warn!(error = %err, "resource sampling failed");
                if !backed_off {
                    sleep_for = config.monitoring_interval.saturating_mul(2);
                    backed_off = true;
                }
            }
        }
        interruptible_sleep(shared, sleep_for);
    }
}

fn warn_near_limits(snapshot: &ResourceSnapshot, config: &PipelineConfig) {
    let cpu_soft = f64::from(config.cpu_limit_percent) * SOFT_WARN_FRACTION;
    if f64::from(snapshot.cpu_percent) > cpu_soft {
        tracing::warn!(
            cpu_percent = snapshot.cpu_percent,
            limit_percent = config.cpu_limit_percent,
            "CPU usage is approaching its limit"
        );
    }
    let memory_soft = (config.memory_limit_mb as f64) * SOFT_WARN_FRACTION;
    if snapshot.rss_memory_mb as f64 > memory_soft {
        tracing::warn!(
            rss_memory_mb = snapshot.rss_memory_mb,
            limit_mb = config.memory_limit_mb,
            "process memory is approaching its limit"
        );
    }
}

/// Sleeps up to `duration`, waking early when monitoring is stopped.
fn interruptible_sleep(shared: &Shared, duration: Duration) {
    let guard = shared.sleep_lock.lock().unwrap_or_else(PoisonError::into_inner);
    let _unused = shared
        .sleep_cv
        .wait_timeout_while(guard, duration, |_| shared.active.load(Ordering::SeqCst));
}
