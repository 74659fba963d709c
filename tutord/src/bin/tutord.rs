use anyhow::Context as _;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use tutor_core::{GeminiClient, LLMClientRef, TutorConfig};
use tutord::classifier::Classifier;
use tutord::http_server;
use tutord::orchestrator::Orchestrator;
use tutord::registry::HandlerRegistry;
use tutord::service::TutorService;
use tutord::session::{FailoverSessionStore, RedisBackend, SessionStoreRef};
use tutord::specialists::{GeneralTutor, MathHandler, PhysicsHandler};

#[derive(Parser, Debug)]
#[command(name = "tutord", about = "AI tutor daemon: routes questions to subject specialists")]
struct Args {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gemini API key
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Gemini model used for classification and general answers
    #[arg(short = 'o', long)]
    model: Option<String>,

    /// Durable session store URL
    #[arg(long)]
    redis_url: Option<String>,

    /// HTTP server address
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Starting tutor daemon");

    let mut config = match TutorConfig::load(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(anyhow::anyhow!("Configuration error: {}", e));
        }
    };

    // Update config from CLI args
    if let Some(api_key) = args.api_key {
        config.gemini.api_key = Some(api_key);
    }
    if let Some(model) = args.model {
        config.gemini.model_name = Some(model);
    }
    if let Some(redis_url) = args.redis_url {
        config.store.redis_url = redis_url;
    }
    if let Some(addr) = args.http_addr {
        config.server.http_addr = addr.to_string();
    }
    info!(environment = %config.environment, "Configuration loaded");

    // Initialize Gemini clients
    let tutor_llm: LLMClientRef = Arc::new(
        GeminiClient::new(&config.gemini).context("Failed to initialize Gemini client")?,
    );
    let specialist_llm: LLMClientRef = Arc::new(
        GeminiClient::with_model(&config.gemini, config.gemini.specialist_model_name.clone())
            .context("Failed to initialize specialist Gemini client")?,
    );
    info!(
        tutor_model = %tutor_llm.model_name(),
        specialist_model = %specialist_llm.model_name(),
        "Initialized Gemini clients"
    );

    let sessions: SessionStoreRef = match RedisBackend::new(&config.store.redis_url) {
        Ok(backend) => Arc::new(
            FailoverSessionStore::connect(Arc::new(backend), config.store.connect_timeout()).await,
        ),
        Err(e) => {
            warn!(error = %e, "Invalid session store URL, keeping sessions in memory");
            Arc::new(FailoverSessionStore::in_memory())
        }
    };

    let registry = HandlerRegistry::new(Arc::new(GeneralTutor::new(tutor_llm.clone())))
        .with("math", Arc::new(MathHandler::new(specialist_llm.clone())))?
        .with("physics", Arc::new(PhysicsHandler::new(specialist_llm)))?;
    let orchestrator = Arc::new(Orchestrator::new(Classifier::new(tutor_llm), registry));
    let service = TutorService::new(orchestrator, sessions);

    let addr: SocketAddr = config
        .server
        .http_addr
        .parse()
        .with_context(|| format!("Invalid HTTP address '{}'", config.server.http_addr))?;

    if let Err(e) = http_server::run_server(service, addr).await {
        error!(error = %e, "HTTP server failed");
        return Err(e);
    }

    info!("Tutor daemon shutting down");
    Ok(())
}
