use crate::logger::Logger;
use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the `tracing` bridge.
///
/// **Fields**
/// - `max_level`: least severe level that is shipped. Events more verbose
///   than this are ignored by the ingest layer.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   installed next to the ingest layer and every event is also printed
///   to the console, including this crate's own delivery diagnostics.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub max_level: Level,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            max_level: Level::INFO,
            enable_stdout: true,
        }
    }
}

/// Install a global `tracing` subscriber that ships events through
/// `logger`.
///
/// **Parameters**
/// - `logger`: source of the transport and of the default app, env and
///   meta applied to every shipped event.
/// - `config`: [`LayerConfig`] controlling level filtering and console
///   output.
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already installed.
///
/// The logger must still be closed before exit to drain its buffer.
pub fn init_tracing_with_config(
    logger: &Logger,
    config: LayerConfig,
) -> Result<(), SetGlobalDefaultError> {
    let layer = logger.layer(config.max_level);

    // `fmt` output is optional; the two registries have different types.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)
    }
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LayerConfig::default`].
pub fn init_tracing(logger: &Logger) -> Result<(), SetGlobalDefaultError> {
    init_tracing_with_config(logger, LayerConfig::default())
}
