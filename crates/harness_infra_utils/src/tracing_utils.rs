use std::sync::OnceLock;

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use tracing::info;
use tracing::metadata::LevelFilter;
use tracing_subscriber::fmt::format::{Compact, DefaultFields, Format};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::fmt::Layer;
use tracing_subscriber::layer::Layered;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

type TracingLayer = Layered<
    Layer<Registry, DefaultFields, Format<Compact, UtcTime<&'static [BorrowedFormatItem<'static>]>>>,
    Registry,
>;

static TRACING_LEVEL_HANDLE: OnceLock<reload::Handle<EnvFilter, TracingLayer>> = OnceLock::new();

/// Installs the global subscriber. Later calls are no-ops.
///
/// `RUST_LOG` directives take precedence over `level`.
pub fn configure_tracing(level: LevelFilter) {
    TRACING_LEVEL_HANDLE.get_or_init(|| {
        let time_format: &'static [BorrowedFormatItem<'static>] = format_description!(
            "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z"
        );
        let timer = UtcTime::new(time_format);

        let fmt_layer = fmt::layer()
            .compact()
            .with_timer(timer)
            .with_target(false)
            .with_file(true)
            .with_line_number(true);

        let (level_filter_layer, reload_handle) =
            reload::Layer::new(get_filter_layer(level, true));

        // A subscriber may already be installed, e.g. by a test harness.
        if tracing_subscriber::registry().with(fmt_layer).with(level_filter_layer).try_init().is_ok()
        {
            info!("Tracing has been successfully initialized.");
        }
        reload_handle
    });
}

fn get_filter_layer(level: LevelFilter, use_env_var: bool) -> EnvFilter {
    let builder = EnvFilter::builder().with_default_directive(level.into());
    if use_env_var { builder.from_env_lossy() } else { builder.parse_lossy("") }
}

pub fn change_tracing_level(level: LevelFilter) {
    match TRACING_LEVEL_HANDLE.get() {
        Some(handle) => {
            info!("Changing tracing level to: {:?}", level);
            if let Err(err) = handle.reload(get_filter_layer(level, false)) {
                tracing::warn!("Failed to reload filter layer: {err}");
            }
        }
        None => tracing::warn!("Tracing level handle is not initialized."),
    }
}
