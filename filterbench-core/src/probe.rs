//! Process resource probes: peak thread count and peak memory.
//!
//! Both read `/proc/self/status`. On platforms without procfs the probes
//! log a warning and report nothing rather than failing the run.

use std::fmt;
use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

const STATUS_PATH: &str = "/proc/self/status";

/// How often the thread monitor samples by default.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Extracts the `Threads:` value from a `/proc/<pid>/status` dump.
pub fn parse_thread_count(status: &str) -> Option<usize> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("Threads:"))
        .and_then(|value| value.trim().parse().ok())
}

/// Current number of OS threads in this process, if procfs is readable.
pub fn current_thread_count() -> Option<usize> {
    fs::read_to_string(STATUS_PATH)
        .ok()
        .and_then(|status| parse_thread_count(&status))
}

/// Thread counts observed while a [`ThreadMonitor`] ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ThreadStats {
    /// Highest sample, including the sampler thread.
    pub peak: usize,
    /// `peak` minus the sampler thread itself.
    pub peak_excluding_monitor: usize,
}

/// Background sampler tracking the peak thread count of the process.
///
/// The peak starts at 1 and only ever rises. Sampling stops when the
/// monitor is stopped or dropped.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use filterbench_core::probe::ThreadMonitor;
///
/// let monitor = ThreadMonitor::start_with_interval(Duration::from_millis(5));
/// let stats = monitor.stop();
/// assert!(stats.peak >= 1);
/// ```
pub struct ThreadMonitor {
    peak: Arc<AtomicUsize>,
    done: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadMonitor {
    /// Starts sampling every [`DEFAULT_SAMPLE_INTERVAL`].
    pub fn start() -> Self {
        Self::start_with_interval(DEFAULT_SAMPLE_INTERVAL)
    }

    pub fn start_with_interval(interval: Duration) -> Self {
        let peak = Arc::new(AtomicUsize::new(1));
        let done = Arc::new(AtomicBool::new(false));

        let handle = {
            let peak = Arc::clone(&peak);
            let done = Arc::clone(&done);
            thread::Builder::new()
                .name("thread-monitor".into())
                .spawn(move || sample_loop(&peak, &done, interval))
        };
        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "failed to spawn thread monitor; thread peak will not be sampled");
                None
            }
        };

        Self { peak, done, handle }
    }

    /// Peak observed so far.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }

    /// Stops sampling and returns the observed peak.
    pub fn stop(mut self) -> ThreadStats {
        let sampled = self.shutdown();
        let peak = self.peak();
        ThreadStats {
            peak,
            peak_excluding_monitor: if sampled { peak.saturating_sub(1) } else { peak },
        }
    }

    /// Signals and joins the sampler. Returns whether one was running.
    fn shutdown(&mut self) -> bool {
        self.done.store(true, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return false;
        };
        handle.thread().unpark();
        if handle.join().is_err() {
            warn!("thread monitor panicked");
        }
        true
    }
}

impl Drop for ThreadMonitor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sample_loop(peak: &AtomicUsize, done: &AtomicBool, interval: Duration) {
    let mut warned = false;
    while !done.load(Ordering::Acquire) {
        match current_thread_count() {
            Some(count) => {
                peak.fetch_max(count, Ordering::Relaxed);
            }
            None if !warned => {
                warn!(path = STATUS_PATH, "cannot read thread count");
                warned = true;
            }
            None => {}
        }
        // unparked early by stop()
        thread::park_timeout(interval);
    }
    debug!(peak = peak.load(Ordering::Relaxed), "thread monitor stopped");
}

/// Peak memory figures of this process, read once on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoryReport {
    pub pid: u32,
    /// Whether the status file could be read at all.
    pub available: bool,
    pub name: Option<String>,
    /// Peak virtual memory size.
    pub vm_peak_kb: Option<u64>,
    /// Peak resident set size.
    pub vm_hwm_kb: Option<u64>,
}

impl MemoryReport {
    /// Reads the current process status. Never fails; an unreadable status
    /// file yields a report with [`available`](Self::available) unset.
    pub fn capture() -> Self {
        let pid = std::process::id();
        match fs::read_to_string(STATUS_PATH) {
            Ok(status) => Self::parse(pid, &status),
            Err(e) => {
                warn!(path = STATUS_PATH, error = %e, "memory information unavailable");
                Self {
                    pid,
                    available: false,
                    name: None,
                    vm_peak_kb: None,
                    vm_hwm_kb: None,
                }
            }
        }
    }

    /// Parses the `Name:`, `VmPeak:` and `VmHWM:` lines of a status dump.
    pub fn parse(pid: u32, status: &str) -> Self {
        let mut report = Self {
            pid,
            available: true,
            name: None,
            vm_peak_kb: None,
            vm_hwm_kb: None,
        };
        for line in status.lines() {
            if let Some(value) = line.strip_prefix("Name:") {
                report.name = Some(value.trim().to_string());
            } else if let Some(value) = line.strip_prefix("VmPeak:") {
                report.vm_peak_kb = parse_kb(value);
            } else if let Some(value) = line.strip_prefix("VmHWM:") {
                report.vm_hwm_kb = parse_kb(value);
            }
        }
        report
    }
}

fn parse_kb(value: &str) -> Option<u64> {
    value.trim().trim_end_matches("kB").trim_end().parse().ok()
}

/// Prints in the layout of `/proc/<pid>/status`.
impl fmt::Display for MemoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID: {}", self.pid)?;
        if !self.available {
            return write!(f, "\nmemory information open error!");
        }
        if let Some(name) = &self.name {
            write!(f, "\nName:\t{}", name)?;
        }
        if let Some(kb) = self.vm_peak_kb {
            write!(f, "\nVmPeak:\t{:>8} kB", kb)?;
        }
        if let Some(kb) = self.vm_hwm_kb {
            write!(f, "\nVmHWM:\t{:>8} kB", kb)?;
        }
        Ok(())
    }
}
