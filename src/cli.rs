use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::{path::PathBuf, sync::Arc};

use crate::{
    api::HttpBackend,
    audio::AudioEngineHandle,
    config::{normalize_base_url, MonitorConfig},
    identity::DeviceIdentityStore,
    models::{session::DEFAULT_DURATION_MINUTES, Category, SessionSpec, Voice},
    poller::{ContextSource, FileContext, PollSettings, StaticContext},
    session::{SessionController, SessionStatus},
};

#[derive(Parser)]
#[command(name = "focusai")]
#[command(about = "Focus session companion", long_about = None)]
struct Cli {
    /// Backend base URL (overrides FOCUSAI_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a focus session until it expires or Ctrl-C is pressed
    Start {
        /// What you are trying to get done
        #[arg(short, long)]
        goal: String,
        /// Planned length: 15-180 in steps of 15
        #[arg(short, long, default_value_t = DEFAULT_DURATION_MINUTES)]
        minutes: u32,
        /// Distraction category to watch (social, nsfw, games); repeatable
        #[arg(short, long = "category")]
        categories: Vec<Category>,
        #[arg(long, default_value_t = Voice::Cluely)]
        voice: Voice,
        /// Window title reported on every tick
        #[arg(long, default_value = "FocusAI", conflicts_with = "context_file")]
        title: String,
        /// URL reported on every tick
        #[arg(long, default_value = "", conflicts_with = "context_file")]
        url: String,
        /// JSON file with the current {"title", "url"}, re-read on every tick
        #[arg(long)]
        context_file: Option<PathBuf>,
    },
    /// Show the focus summary for this device's user
    Summary,
    /// Print this device's persistent id
    DeviceId,
}

pub(crate) async fn dispatch(mut config: MonitorConfig) -> Result<()> {
    let cli = Cli::parse();
    if let Some(url) = cli.backend_url.as_deref() {
        config.backend_url = normalize_base_url(url);
    }

    match cli.command {
        Commands::DeviceId => {
            let device = DeviceIdentityStore::in_dir(&config.data_dir).get_or_create_device_id();
            println!("{}", device.id);
            Ok(())
        }
        Commands::Summary => show_summary(&config).await,
        Commands::Start {
            goal,
            minutes,
            categories,
            voice,
            title,
            url,
            context_file,
        } => {
            let spec = SessionSpec::new(goal, minutes, categories, voice)?;
            let context: Arc<dyn ContextSource> = match context_file {
                Some(path) => Arc::new(FileContext::new(path)),
                None => Arc::new(StaticContext::new(title, url)),
            };
            run_session(&config, spec, context).await
        }
    }
}

async fn connect(config: &MonitorConfig, context: Arc<dyn ContextSource>) -> Result<SessionController> {
    let backend = HttpBackend::new(&config.backend_url, config.request_timeout)
        .context("failed to set up backend client")?;
    let controller = SessionController::new(
        Arc::new(backend),
        context,
        Arc::new(AudioEngineHandle::new()),
        PollSettings::from(config),
    );

    let device = DeviceIdentityStore::in_dir(&config.data_dir).get_or_create_device_id();
    controller.register(&device).await;
    Ok(controller)
}

async fn show_summary(config: &MonitorConfig) -> Result<()> {
    let controller = connect(config, Arc::new(StaticContext::new("", ""))).await?;
    match controller.fetch_summary().await {
        Ok(summary) => {
            println!("Focus time:           {} min", summary.total_focus_minutes());
            println!("Distractions blocked: {}", summary.distractions_blocked);
            println!("Streak:               {} days", summary.streak_days);
        }
        Err(err) => println!("Summary unavailable: {err}"),
    }
    Ok(())
}

async fn run_session(
    config: &MonitorConfig,
    spec: SessionSpec,
    context: Arc<dyn ContextSource>,
) -> Result<()> {
    let controller = connect(config, context).await?;
    let handle = controller
        .start(spec)
        .await
        .context("could not start focus session")?;

    println!(
        "FOCUS MODE ON: '{}' for {} min (session {})",
        handle.spec.goal(),
        handle.spec.duration_minutes(),
        handle.session_id
    );

    let mut overlay = controller.subscribe_overlay();
    let mut status = controller.subscribe_status();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Interrupted; ending session");
                break;
            }
            changed = overlay.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = overlay.borrow_and_update().clone();
                if state.visible {
                    println!("This isn't helping your goal. Return to: {}", state.display_target());
                } else {
                    println!("Back on track.");
                }
            }
            changed = status.changed() => {
                if changed.is_err() || *status.borrow_and_update() == SessionStatus::Idle {
                    println!("Session time is up.");
                    break;
                }
            }
        }
    }

    if let Err(err) = controller.end().await {
        warn!("Session ended locally but the backend was not told: {err}");
    }
    println!("Session ended.");
    Ok(())
}
