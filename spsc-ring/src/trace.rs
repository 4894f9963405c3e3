//! Lifecycle logging: queue construction, allocation failure, reset and
//! teardown. Nothing on the push/pop paths logs.
//!
//! Events go through `tracing` when the crate is built with
//! `--features tracing`. Otherwise `debug!`, `error!` and `trace!` below
//! swallow their arguments and compile to nothing.

/// Installs a subscriber that prints queue events to stdout.
///
/// The filter comes from `RUST_LOG` and falls back to `spsc_ring=trace`.
/// If a global subscriber is already installed it is kept, so repeated calls
/// are harmless. Without the `tracing` feature this does nothing.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::fmt::time::uptime;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{EnvFilter, fmt};

    const DEFAULT_FILTER: &str = "spsc_ring=trace";

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let events = fmt::layer()
        .with_timer(uptime())
        .with_thread_names(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false);

    if tracing_subscriber::registry()
        .with(filter)
        .with(events)
        .try_init()
        .is_err()
    {
        tracing::debug!("subscriber already installed; keeping it");
    }
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, error, trace};

#[cfg(not(feature = "tracing"))]
macro_rules! discard {
    ($($event:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use discard as debug;
#[cfg(not(feature = "tracing"))]
pub(crate) use discard as error;
#[cfg(not(feature = "tracing"))]
pub(crate) use discard as trace;
