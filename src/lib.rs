pub mod api;
pub mod audio;
mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod overlay;
pub mod poller;
pub mod session;
mod utils;

#[cfg(test)]
mod testing;

pub use api::{FocusBackend, HttpBackend};
pub use audio::{AlertPlayer, AudioEngineHandle};
pub use config::MonitorConfig;
pub use error::{MonitorError, MonitorResult};
pub use identity::DeviceIdentityStore;
pub use overlay::{OverlayMapper, OverlayState};
pub use session::{MonitorSnapshot, SessionController, SessionStatus};

/// Entry point for the `focusai` binary.
pub fn run() -> anyhow::Result<()> {
    let config = MonitorConfig::from_env()?;

    // RUST_LOG, when set, overrides the default level.
    env_logger::Builder::new()
        .filter_level(if config.debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .init();

    log::info!("FocusAI starting up...");

    // One thread: poll ticks and session transitions never run concurrently.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(cli::dispatch(config))
}
