//! Logging setup for the server binary.
//!
//! Logs go to stdout. Set `DEBUG_LOGGING=1` (or pass `--verbose`) to enable
//! debug output for idlereap crates, which includes per-connection activity
//! and sweep summaries.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub fn init(verbose: bool) {
    let debug_logging = verbose || std::env::var("DEBUG_LOGGING").is_ok();

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    let filter_directive = if debug_logging {
        "info,idlereap=debug,idlereap_cli=debug,idlereap_core=debug"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(EnvFilter::new(filter_directive))
        .init();

    tracing::info!(debug_logging, "idlereap logging initialized");
}
