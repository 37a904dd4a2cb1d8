//! This module provides observability hooks for the scan core.
//!
//! Row-group selection and schema negotiation are the places where a reader
//! silently goes wrong; the `log_metric!` macro makes those decisions visible
//! as structured key-value lines in debug builds, and `enable_verbose_logging`
//! turns on the ordinary `log` output for callers that want it.
//!
//! `log_metric!` is a zero-cost abstraction: the `#[cfg(debug_assertions)]`
//! attribute ensures that the macro body is completely compiled out of
//! release builds.

/// Logs a structured key-value metric string to stdout, only in debug builds.
///
/// # Example
/// ```
/// use tessera_scan::log_metric;
/// let selected = 4;
/// log_metric!("event" = "select_row_groups", "selected" = &selected);
/// ```
#[macro_export]
macro_rules! log_metric {
    ($($key:literal = $value:expr),+ $(,)?) => {
        #[cfg(debug_assertions)]
        {
            // Collect each pair as a JSON string fragment
            let mut parts = Vec::new();
            $(
                parts.push(format!("\"{}\": \"{}\"", $key, $value));
            )+

            let output = format!("TESSERA_METRIC: {{ {} }}", parts.join(", "));
            println!("{}", output);
        }
    };
}

/// Initializes `env_logger` so `debug!`/`warn!` output from the scan core is
/// visible. Safe to call more than once; later calls are no-ops.
pub fn enable_verbose_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .is_test(false)
        .try_init();
}
