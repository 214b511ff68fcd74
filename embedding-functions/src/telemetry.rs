//! Log output for embedding providers.
//!
//! Provider events carry targets under `embedding_functions::providers`, e.g.
//! `embedding_functions::providers::openai`; registry hydration logs under
//! `embedding_functions::registry`. [`layer`] renders only those, so the
//! binary keeps its own formatter for everything else and filters with
//! [`is_library_target`] to avoid printing provider events twice.

use std::io::{self, IsTerminal};

use tracing::Level;
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, filter, fmt};

/// Root target of every event emitted by this crate.
pub const TARGET_PREFIX: &str = "embedding_functions";

/// `true` for `embedding_functions` and its submodules, not for crates that
/// merely share the prefix.
pub fn is_library_target(target: &str) -> bool {
    target
        .strip_prefix(TARGET_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// Timestamps like `2025-09-12T10:20:30Z`.
#[derive(Clone, Copy, Debug, Default)]
struct UtcSeconds;

impl FormatTime for UtcSeconds {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        w.write_str(&chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true))
    }
}

/// Compact provider log layer: UTC timestamps, target and `file:line`,
/// span close events with the duration of instrumented embedding calls.
/// ANSI colors only on a terminal.
pub fn layer<S>() -> impl Layer<S> + Send + Sync
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_timer(UtcSeconds)
        .with_target(true)
        .with_ansi(io::stdout().is_terminal())
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .event_format(fmt::format().compact().with_source_location(true))
        .with_filter(filter::filter_fn(|meta| is_library_target(meta.target())))
}

/// `embedding_functions=<level>`.
pub fn level_directive(level: Level) -> Directive {
    let mut directive = Directive::from(LevelFilter::from_level(level));
    if let Ok(scoped) = format!("{TARGET_PREFIX}={}", level.as_str().to_lowercase()).parse() {
        directive = scoped;
    }
    directive
}

/// `RUST_LOG` (or `default` when unset or invalid) plus [`level_directive`].
pub fn env_filter_with_level(default: &str, level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default))
        .add_directive(level_directive(level))
}
