//! Log severities and subscriber setup.
//!
//! The toolkit emits `tracing` events and leaves routing to whatever
//! subscriber the application installs. `Severity` keeps the eight-level
//! syslog scale (lower number = more severe) for callers that configure
//! thresholds that way; it collapses onto `tracing`'s five levels.
//!
//! `init` installs the filter behind a reload layer, so the debug switches on
//! `Client` and `Model` can move the threshold between `Debug` and `Info` at
//! runtime.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;

use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{reload, EnvFilter, Registry};

static FILTER: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();
static THRESHOLD: AtomicU8 = AtomicU8::new(Severity::Info as u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

impl Severity {
    pub const ALL: [Severity; 8] = [
        Severity::Emergency,
        Severity::Alert,
        Severity::Critical,
        Severity::Error,
        Severity::Warning,
        Severity::Notice,
        Severity::Info,
        Severity::Debug,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Emergency => "emergency",
            Severity::Alert => "alert",
            Severity::Critical => "critical",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
            Severity::Info => "info",
            Severity::Debug => "debug",
        }
    }

    /// Whether a message at `self` passes a `threshold`: it does unless it
    /// is numerically greater (less severe) than the threshold.
    pub fn passes(self, threshold: Severity) -> bool {
        self <= threshold
    }

    pub fn level(self) -> Level {
        match self {
            Severity::Emergency | Severity::Alert | Severity::Critical | Severity::Error => Level::ERROR,
            Severity::Warning => Level::WARN,
            Severity::Notice | Severity::Info => Level::INFO,
            Severity::Debug => Level::DEBUG,
        }
    }

    pub fn level_filter(self) -> LevelFilter {
        LevelFilter::from_level(self.level())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown log level: {s}"))
    }
}

fn filter_for(threshold: Severity) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(threshold.level_filter().into())
        .from_env_lossy()
}

/// Install a stderr `fmt` subscriber filtered at `threshold`.
///
/// `RUST_LOG`, when set, takes precedence. Returns `false` and changes
/// nothing if a global subscriber is already installed.
pub fn init(threshold: Severity) -> bool {
    let (filter, handle) = reload::Layer::new(filter_for(threshold));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok();
    if installed {
        THRESHOLD.store(threshold as u8, Ordering::Relaxed);
        let _ = FILTER.set(handle);
    }
    installed
}

/// Move the threshold of the subscriber installed by `init`.
///
/// The new threshold is remembered either way; returns whether a live
/// filter was actually swapped.
pub fn set_threshold(threshold: Severity) -> bool {
    THRESHOLD.store(threshold as u8, Ordering::Relaxed);
    let Some(handle) = FILTER.get() else {
        return false;
    };
    match handle.reload(filter_for(threshold)) {
        Ok(()) => {
            tracing::debug!(%threshold, "log threshold changed");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to change log threshold");
            false
        }
    }
}

/// Threshold last set through `init` or `set_threshold`.
pub fn threshold() -> Severity {
    let n = THRESHOLD.load(Ordering::Relaxed) as usize;
    Severity::ALL.get(n).copied().unwrap_or(Severity::Info)
}

/// Whether `init` installed the reloadable subscriber.
pub fn is_installed() -> bool {
    FILTER.get().is_some()
}

/// `Debug` when `debug` is on, `Info` otherwise.
pub(crate) fn apply_debug(debug: bool) {
    set_threshold(if debug { Severity::Debug } else { Severity::Info });
}
