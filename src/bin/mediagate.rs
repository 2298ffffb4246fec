//! CLI for MediaGate - multi-provider media generation gateway.

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use mediagate::config::SessionSettings;
use mediagate::{
    AspectRatio, GenerationRequest, HttpAdapterFactory, MediaKind, Orchestrator, PollSettings,
    ProviderCredentials, ProviderKind, Quality, ServerConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mediagate")]
#[command(about = "Generate images and videos across Grok, DALL-E, Sora, Runway and Luma")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP gateway
    Serve(ServeArgs),

    /// Generate media once and print the result
    Generate(GenerateArgs),

    /// List providers and whether their credentials are set
    Providers,
}

#[derive(Args)]
struct PollArgs {
    /// Seconds between status checks of asynchronous jobs
    #[arg(long, env = "MEDIAGATE_POLL_INTERVAL", default_value_t = 5)]
    poll_interval: u64,

    /// Maximum status checks before a job times out
    #[arg(long, env = "MEDIAGATE_MAX_POLL_ATTEMPTS", default_value_t = 60)]
    max_poll_attempts: u32,
}

impl From<&PollArgs> for PollSettings {
    fn from(args: &PollArgs) -> Self {
        PollSettings {
            interval: Duration::from_secs(args.poll_interval),
            max_attempts: args.max_poll_attempts,
        }
    }
}

#[derive(Args)]
struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "MEDIAGATE_BIND", default_value = "127.0.0.1:3000")]
    bind: String,

    #[command(flatten)]
    poll: PollArgs,

    /// Maximum number of sessions remembered
    #[arg(long, env = "MEDIAGATE_SESSION_CAPACITY", default_value_t = 1024)]
    session_capacity: usize,

    /// Idle session lifetime in seconds
    #[arg(long, env = "MEDIAGATE_SESSION_TTL", default_value_t = 3600)]
    session_ttl: u64,

    /// Generations remembered per session
    #[arg(long, env = "MEDIAGATE_RECENT_PER_SESSION", default_value_t = 20)]
    recent_per_session: usize,
}

#[derive(Args)]
struct GenerateArgs {
    /// The text prompt
    prompt: String,

    /// Kind of media to generate
    #[arg(short = 't', long = "type", value_enum, default_value = "image")]
    media: MediaArg,

    /// Model to request (e.g. sora-2, gen4_turbo, ray-2, dall-e-3)
    #[arg(short, long)]
    model: Option<String>,

    /// Video duration in seconds
    #[arg(short, long)]
    duration: Option<u32>,

    /// Quality tier
    #[arg(short, long, value_enum)]
    quality: Option<QualityArg>,

    /// Aspect ratio
    #[arg(long, value_enum)]
    aspect_ratio: Option<AspectRatioArg>,

    /// Explicit image size (e.g. 1024x1024)
    #[arg(long)]
    size: Option<String>,

    /// Number of images
    #[arg(short = 'n', long)]
    count: Option<u32>,

    /// Fail instead of trying other providers when the requested model fails
    #[arg(long)]
    no_fallback: bool,

    #[command(flatten)]
    poll: PollArgs,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MediaArg {
    Image,
    Video,
}

impl From<MediaArg> for MediaKind {
    fn from(arg: MediaArg) -> Self {
        match arg {
            MediaArg::Image => MediaKind::Image,
            MediaArg::Video => MediaKind::Video,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum QualityArg {
    Standard,
    High,
}

impl From<QualityArg> for Quality {
    fn from(arg: QualityArg) -> Self {
        match arg {
            QualityArg::Standard => Quality::Standard,
            QualityArg::High => Quality::High,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AspectRatioArg {
    #[value(name = "1:1")]
    Square,
    #[value(name = "16:9")]
    Landscape,
    #[value(name = "9:16")]
    Portrait,
    #[value(name = "4:3")]
    Standard,
    #[value(name = "3:4")]
    StandardPortrait,
    #[value(name = "21:9")]
    Ultrawide,
}

impl From<AspectRatioArg> for AspectRatio {
    fn from(arg: AspectRatioArg) -> Self {
        match arg {
            AspectRatioArg::Square => AspectRatio::Square,
            AspectRatioArg::Landscape => AspectRatio::Landscape,
            AspectRatioArg::Portrait => AspectRatio::Portrait,
            AspectRatioArg::Standard => AspectRatio::Standard,
            AspectRatioArg::StandardPortrait => AspectRatio::StandardPortrait,
            AspectRatioArg::Ultrawide => AspectRatio::Ultrawide,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => serve(args).await?,
        Commands::Generate(args) => generate(args, cli.json).await?,
        Commands::Providers => list_providers(cli.json)?,
    }

    Ok(())
}

fn orchestrator(poll: PollSettings) -> Orchestrator {
    Orchestrator::new(
        ProviderCredentials::from_env(),
        Arc::new(HttpAdapterFactory::new()),
        poll,
    )
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = ServerConfig {
        bind: args.bind,
        poll: PollSettings::from(&args.poll),
        sessions: SessionSettings {
            capacity: args.session_capacity,
            ttl: Duration::from_secs(args.session_ttl),
            recent_limit: args.recent_per_session,
        },
    };
    config.validate().context("invalid server configuration")?;

    let orchestrator = orchestrator(config.poll);
    if orchestrator.credentials().is_empty() {
        tracing::warn!("no provider credentials found; every generation will fail");
    }

    mediagate::server::serve(config, orchestrator)
        .await
        .context("server error")
}

async fn generate(args: GenerateArgs, json_output: bool) -> anyhow::Result<()> {
    let poll = PollSettings::from(&args.poll);
    poll.validate()?;

    let mut request = GenerationRequest::new(&args.prompt, args.media.into());
    if let Some(model) = args.model {
        request = request.with_model(model);
    }
    if let Some(duration) = args.duration {
        request = request.with_duration(duration);
    }
    if let Some(quality) = args.quality {
        request = request.with_quality(quality.into());
    }
    if let Some(ratio) = args.aspect_ratio {
        request = request.with_aspect_ratio(ratio.into());
    }
    if let Some(size) = args.size {
        request = request.with_size(size);
    }
    if let Some(count) = args.count {
        request = request.with_count(count);
    }
    if args.no_fallback {
        request = request.without_fallback();
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let generation = orchestrator(poll)
        .generate_with_cancel(&request, &cancel)
        .await?;

    if json_output {
        let result = serde_json::json!({
            "provider": generation.provider,
            "attempts": generation.attempts,
            "providers_tried": generation.providers_tried,
            "duration_ms": generation.elapsed.as_millis() as u64,
            "results": generation.results,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!(
            "Generated {} {} via {} in {}ms",
            generation.results.len(),
            request.media,
            generation.provider.display_name(),
            generation.elapsed.as_millis()
        );
        for result in &generation.results {
            println!("  {} ({})", result.url, result.model);
            if let Some(revised) = &result.revised_prompt {
                println!("    revised prompt: {}", revised);
            }
        }
    }

    Ok(())
}

fn list_providers(json_output: bool) -> anyhow::Result<()> {
    #[derive(serde::Serialize)]
    struct ProviderInfo {
        name: &'static str,
        kind: ProviderKind,
        media_type: MediaKind,
        env_var: &'static str,
        configured: bool,
    }

    let credentials = ProviderCredentials::from_env();
    let providers: Vec<ProviderInfo> = ProviderKind::ALL
        .iter()
        .map(|kind| ProviderInfo {
            name: kind.display_name(),
            kind: *kind,
            media_type: kind.media(),
            env_var: kind.env_var(),
            configured: credentials.is_configured(*kind),
        })
        .collect();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&providers)?);
    } else {
        println!("Providers:\n");
        for media in [MediaKind::Image, MediaKind::Video] {
            println!("{}:", media.to_string().to_uppercase());
            for p in providers.iter().filter(|p| p.media_type == media) {
                let status = if p.configured { "✓" } else { "✗" };
                println!("  {} {} ({})", status, p.name, p.kind);
                println!("    API key: {}", p.env_var);
            }
        }
    }

    Ok(())
}
