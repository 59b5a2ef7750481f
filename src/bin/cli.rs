use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber;
use tracing_subscriber::{fmt, EnvFilter};
use tracing_subscriber::prelude::*;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing::subscriber as tracing_subscriber_global;
use music_top_tracks_playlist_gen as lib;
use lib::api::mock::MockService;
use lib::api::spotify::{RetryPolicy, Session, SpotifyClient};
use lib::api::MusicService;
use lib::cancel::CancelFlag;
use lib::config::Config;
use lib::models::{CollisionPolicy, GenerationRequest, TimeWindow};

#[derive(Parser)]
#[command(name = "music-top-tracks-playlist-gen", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a playlist from the listener's ranked play history
    Generate {
        /// Playlist name; defaults to the previous calendar month, e.g. "Jul 2026"
        #[arg(long)]
        name: Option<String>,

        /// Number of tracks to request (1-50; larger values are capped)
        #[arg(long, default_value_t = 50)]
        limit: usize,

        /// Listening-history window to rank by
        #[arg(long, value_enum, default_value = "short")]
        window: WindowArg,

        /// Create the playlist as private instead of public
        #[arg(long)]
        private: bool,

        /// Behavior when a playlist with the target name already exists
        #[arg(long, value_enum, default_value = "reject")]
        on_existing: OnExisting,

        /// Playlist description; auto-generated when omitted
        #[arg(long)]
        description: Option<String>,

        /// OAuth access token; falls back to $SPOTIFY_ACCESS_TOKEN
        #[arg(long)]
        token: Option<String>,

        /// Run against an in-memory mock service instead of the real API
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate config file and exit
    ConfigValidate,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum WindowArg {
    Short,
    Medium,
    Long,
}

impl From<WindowArg> for TimeWindow {
    fn from(w: WindowArg) -> Self {
        match w {
            WindowArg::Short => TimeWindow::Short,
            WindowArg::Medium => TimeWindow::Medium,
            WindowArg::Long => TimeWindow::Long,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnExisting {
    Reuse,
    Reject,
    AllowDuplicate,
}

impl From<OnExisting> for CollisionPolicy {
    fn from(p: OnExisting) -> Self {
        match p {
            OnExisting::Reuse => CollisionPolicy::Reuse,
            OnExisting::Reject => CollisionPolicy::Reject,
            OnExisting::AllowDuplicate => CollisionPolicy::AllowDuplicate,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref()).context("loading config")?;

    // Initialize log->tracing bridge and structured logging. Logs go to
    // stdout, plus a daily-rotated file when log_dir is configured.
    let _ = LogTracer::init();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let (file_layer, _guard) = match &cfg.log_dir {
        Some(dir) => {
            let file_appender: RollingFileAppender =
                tracing_appender::rolling::daily(dir, "top-tracks-gen.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            (Some(fmt::layer().with_writer(non_blocking)), Some(guard))
        }
        None => (None, None),
    };

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer);
    tracing_subscriber_global::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");

    match cli.command {
        Commands::Generate {
            name,
            limit,
            window,
            private,
            on_existing,
            description,
            token,
            dry_run,
        } => {
            let cancel = CancelFlag::new();
            {
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        log::warn!("interrupt received; stopping after the current batch");
                        cancel.cancel();
                    }
                });
            }

            let window: TimeWindow = window.into();
            let today = chrono::Local::now().date_naive();
            let name = name.unwrap_or_else(|| lib::util::previous_month_label(today));
            let description = description
                .unwrap_or_else(|| lib::util::default_description(limit.min(50), window.label()));

            let request = GenerationRequest {
                name,
                limit,
                window,
                public: !private,
                on_existing: on_existing.into(),
                description: Some(description),
            };

            let service: Box<dyn MusicService> = if dry_run {
                Box::new(MockService::with_library(50))
            } else {
                let token = token
                    .or_else(|| std::env::var("SPOTIFY_ACCESS_TOKEN").ok())
                    .ok_or_else(|| {
                        anyhow!("no access token: pass --token or set SPOTIFY_ACCESS_TOKEN")
                    })?;
                let retry = RetryPolicy {
                    max_attempts: cfg.max_retries_on_error,
                    base_backoff: Duration::from_millis(cfg.retry_backoff_ms),
                    max_backoff: Duration::from_secs(cfg.max_backoff_secs),
                };
                Box::new(
                    SpotifyClient::new(Session::new(token), retry, cancel.clone())
                        .request_timeout(Duration::from_secs(cfg.request_timeout_secs)),
                )
            };

            let handle = lib::generator::generate(
                service.as_ref(),
                &request,
                &cancel,
                cfg.max_batch_size,
            )
            .await
            .with_context(|| format!("generating playlist {:?}", request.name))?;

            println!(
                "Playlist {:?} ready with {} tracks (id {}).",
                handle.name, handle.track_count, handle.id
            );
        }
        Commands::ConfigValidate => {
            match Config::load(cli.config.as_deref()) {
                Ok(_) => println!("OK"),
                Err(e) => {
                    eprintln!("Config validation failed: {}", e);
                    std::process::exit(2);
                }
            }
        }
    }

    Ok(())
}
