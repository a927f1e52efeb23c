use crate::layer::LoggerLayer;
use crate::logger::Logger;
use tokio::runtime::TryCurrentError;
use tokio::task::JoinHandle;
use tracing::subscriber::{DefaultGuard, SetGlobalDefaultError};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the `tracing` bridge.
///
/// **Fields**
/// - `channel_buffer`: maximum number of queued records before new ones
///   are dropped.
/// - `enable_stdout`: also install `tracing_subscriber::fmt::Layer`. Off
///   by default since a console sink already prints every record.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub enable_stdout: bool,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            enable_stdout: false,
        }
    }
}

/// Failures while installing the `tracing` bridge.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("the tracing bridge must be installed inside a Tokio runtime: {0}")]
    NoRuntime(#[from] TryCurrentError),

    #[error("a global tracing subscriber is already installed: {0}")]
    AlreadyInstalled(#[from] SetGlobalDefaultError),
}

/// Route every `tracing` event in the process to `logger`.
///
/// **Parameters**
/// - `logger`: receives one [`LogRecord`](crate::record::LogRecord) per
///   event, at the event's level.
/// - `config`: [`LayerConfig`] controlling buffering and stdout output.
///
/// **Returns**
/// - the handle of the forwarding task.
/// - `Err(..)` outside a Tokio runtime or when a global subscriber is
///   already set.
pub fn init_tracing_with_config(logger: Logger, config: LayerConfig) -> Result<JoinHandle<()>, InitError> {
    let (layer, task) = LoggerLayer::new(logger, config.channel_buffer)?;

    if config.enable_stdout {
        let subscriber = Registry::default().with(layer).with(tracing_subscriber::fmt::layer());
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(task)
}

/// [`init_tracing_with_config`] with [`LayerConfig::default`].
pub fn init_tracing(logger: Logger) -> Result<JoinHandle<()>, InitError> {
    init_tracing_with_config(logger, LayerConfig::default())
}

/// Restores the previous subscriber of the current thread when dropped.
#[must_use = "dropping the guard immediately restores the previous subscriber"]
pub struct InterceptGuard {
    _default: DefaultGuard,
}

/// Route `tracing` events of the current thread to `logger` until the
/// returned guard is dropped.
pub fn intercept(logger: &Logger) -> Result<InterceptGuard, InitError> {
    let (layer, _task) = LoggerLayer::new(logger.clone(), LayerConfig::default().channel_buffer)?;
    let subscriber = Registry::default().with(layer);
    Ok(InterceptGuard {
        _default: tracing::subscriber::set_default(subscriber),
    })
}
