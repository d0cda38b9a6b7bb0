use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::time;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use saybot_core::Database;
use saybot_core::audio::TranscoderConfig;
use saybot_core::platforms::discord::DiscordRuntime;
use saybot_core::platforms::polly::PollySynthesizer;
use saybot_core::repositories::postgres::PostgresUserSettingsRepository;
use saybot_core::services::SettingsService;
use saybot_core::services::discord::DiscordEventService;
use saybot_core::services::discord::slashcommands::register_global_slash_commands;
use saybot_core::voice::{VoiceCatalog, VoiceConfig, VoiceModule};

const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Parser, Debug, Clone)]
#[command(name = "saybot")]
#[command(author, version, about = "saybot - speaks your Discord messages in voice chat")]
struct Args {
    /// Bot token.
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true)]
    token: String,

    /// Postgres connection URL.
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,

    /// Overwrite the global slash commands on startup.
    #[arg(long, default_value = "false")]
    register: bool,

    /// Seconds without audio before a voice session disconnects.
    #[arg(long, default_value_t = 600)]
    idle_timeout_secs: u64,

    /// The ffmpeg binary used to decode synthesized speech.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg_path: PathBuf,
}

fn init_tracing() -> anyhow::Result<()> {
    tracing_log::LogTracer::init()?;
    let filter = EnvFilter::from_default_env()
        .add_directive("saybot=info".parse()?)
        .add_directive("saybot_core=info".parse()?);
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be set.
    dotenv::dotenv().ok();
    init_tracing()?;

    let args = Args::parse();
    info!(
        "saybot starting. register={}, idle_timeout={}s, ffmpeg={}",
        args.register,
        args.idle_timeout_secs,
        args.ffmpeg_path.display()
    );

    if let Err(e) = run(args).await {
        error!("saybot error: {e:?}");
        return Err(e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}

async fn run(args: Args) -> anyhow::Result<()> {
    // 1) Storage
    let db = Database::new(&args.database_url).await?;
    db.migrate().await?;
    let settings_repo = Arc::new(PostgresUserSettingsRepository::new(db.pool().clone()));
    let settings = Arc::new(SettingsService::new(settings_repo));

    // 2) Speech synthesis and its voice catalog
    let synthesizer = Arc::new(PollySynthesizer::from_env().await);
    let catalog = Arc::new(VoiceCatalog::load(synthesizer.as_ref()).await?);

    // 3) Gateway, then the voice module on top of its shards
    let mut runtime = DiscordRuntime::connect(args.token.clone()).await?;

    let config = VoiceConfig {
        idle_timeout: Duration::from_secs(args.idle_timeout_secs),
        transcoder: TranscoderConfig::ffmpeg(args.ffmpeg_path.clone()),
    };
    let voice = VoiceModule::builder(
        Arc::new(runtime.voice_connector()),
        Arc::new(runtime.voice_states()),
        synthesizer,
    )
    .config(config)
    .catalog(catalog)
    .build();

    if args.register {
        register_global_slash_commands(&runtime.http(), runtime.application_id()).await?;
    }

    // 4) Start reading events
    let events = Arc::new(DiscordEventService::new(
        runtime.http(),
        runtime.cache(),
        runtime.application_id(),
        runtime.songbird(),
        voice.clone(),
        settings.clone(),
    ));
    runtime.start(events);
    info!("saybot is up; press Ctrl-C to stop");

    // 5) Idle until Ctrl-C, sweeping the settings cache now and then
    let mut sweep = time::interval(CACHE_SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = sweep.tick() => settings.purge_expired(),
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("Failed to listen for Ctrl-C: {e:?}");
                }
                info!("Ctrl-C detected; shutting down...");
                break;
            }
        }
    }

    // 6) Leave every voice channel before the gateway goes away
    voice.close_all().await;
    runtime.disconnect().await;
    db.pool().close().await;

    info!("Shutdown complete.");
    Ok(())
}
