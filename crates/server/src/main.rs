use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokenlens_core::codec::{Codec, TokenizerCodec};
use tokenlens_core::config::{EngineConfig, TopKBounds};
use tokenlens_core::ngram::NGramScorer;
use tokenlens_core::scorer::Scorer;
use tokenlens_core::step::StepEngine;

use tokenlens_server::api::{self, AppState, CorsConfig};
use tokenlens_server::config::ServerConfig;
use tokenlens_server::logging;
use tokenlens_server::shutdown::shutdown_signal;

#[derive(Parser)]
#[command(
    name = "tokenlens-server",
    about = "Single-step token inspection service"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP service.
    ///
    /// The codec comes from a HuggingFace tokenizer.json; scoring uses the
    /// built-in weight-free prompt-lookup backend. Real model backends plug
    /// in through the library's Scorer trait.
    Serve {
        /// Path to the tokenizer.json used as the codec
        #[arg(long)]
        tokenizer: Option<PathBuf>,

        /// Model label reported to clients
        #[arg(long, default_value = "prompt-lookup")]
        model_name: String,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(long, default_value_t = 8000)]
        port: u16,

        /// Maximum context length in tokens (older tokens are dropped)
        #[arg(long, default_value_t = 512)]
        context_cap: usize,

        /// Lower clamp bound for requested top-k
        #[arg(long, default_value_t = 5)]
        top_k_min: usize,

        /// Upper clamp bound for requested top-k
        #[arg(long, default_value_t = 30)]
        top_k_max: usize,

        /// End-of-sequence token id, softened together with newline when a
        /// request asks for it
        #[arg(long)]
        eos_token_id: Option<u32>,

        /// Comma-separated list of allowed CORS origins ("*" allows all)
        #[arg(long, default_value = "*")]
        allowed_origins: String,

        /// Comma-separated list of allowed CORS HTTP methods
        #[arg(long, default_value = "GET,POST,OPTIONS")]
        allowed_methods: String,

        /// Comma-separated list of allowed CORS headers ("*" allows all)
        #[arg(long, default_value = "*")]
        allowed_headers: String,

        /// Log level for the server (trace, debug, info, warn, error)
        #[arg(long, default_value = "info")]
        log_level: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let file_config = ServerConfig::load();
    if let Some(path) = ServerConfig::default_path() {
        if path.exists() {
            eprintln!("Loaded config from: {}", path.display());
        }
    }

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            tokenizer,
            model_name,
            host,
            port,
            context_cap,
            top_k_min,
            top_k_max,
            eos_token_id,
            allowed_origins,
            allowed_methods,
            allowed_headers,
            log_level,
        } => {
            // Merge CLI args with file config (CLI takes precedence; a CLI
            // value equal to its default yields to the file).
            let tokenizer = tokenizer
                .or_else(|| file_config.tokenizer.map(PathBuf::from))
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "a codec is required: pass --tokenizer or set `tokenizer` in the config file"
                    )
                })?;
            let model_name = if model_name == "prompt-lookup" {
                file_config.model_name.unwrap_or(model_name)
            } else {
                model_name
            };
            let host = if host == "127.0.0.1" {
                file_config.host.unwrap_or(host)
            } else {
                host
            };
            let port = if port == 8000 {
                file_config.port.unwrap_or(port)
            } else {
                port
            };
            let context_cap = if context_cap == 512 {
                file_config.context_cap.unwrap_or(context_cap)
            } else {
                context_cap
            };
            let top_k_min = if top_k_min == 5 {
                file_config.top_k_min.unwrap_or(top_k_min)
            } else {
                top_k_min
            };
            let top_k_max = if top_k_max == 30 {
                file_config.top_k_max.unwrap_or(top_k_max)
            } else {
                top_k_max
            };
            let eos_token_id = eos_token_id.or(file_config.eos_token_id);
            let allowed_origins = if allowed_origins == "*" {
                file_config.allowed_origins.unwrap_or(allowed_origins)
            } else {
                allowed_origins
            };
            let allowed_methods = if allowed_methods == "GET,POST,OPTIONS" {
                file_config.allowed_methods.unwrap_or(allowed_methods)
            } else {
                allowed_methods
            };
            let allowed_headers = if allowed_headers == "*" {
                file_config.allowed_headers.unwrap_or(allowed_headers)
            } else {
                allowed_headers
            };
            let log_level = if log_level == "info" {
                file_config.log_level.unwrap_or(log_level)
            } else {
                log_level
            };

            if top_k_min == 0 || top_k_min > top_k_max {
                anyhow::bail!(
                    "invalid top-k bounds: min {top_k_min} must be positive and at most max {top_k_max}"
                );
            }

            let cors_config = CorsConfig {
                allowed_origins,
                allowed_methods,
                allowed_headers,
            };

            run_server(ServeOptions {
                tokenizer,
                model_name,
                host,
                port,
                context_cap,
                top_k_bounds: TopKBounds {
                    min: top_k_min,
                    max: top_k_max,
                },
                eos_token_id,
                cors_config,
                log_level,
            })
            .await
        }
    }
}

struct ServeOptions {
    tokenizer: PathBuf,
    model_name: String,
    host: String,
    port: u16,
    context_cap: usize,
    top_k_bounds: TopKBounds,
    eos_token_id: Option<u32>,
    cors_config: CorsConfig,
    log_level: String,
}

async fn run_server(opts: ServeOptions) -> anyhow::Result<()> {
    logging::init_with_level(&opts.log_level);

    let codec: Arc<dyn Codec> = Arc::new(
        TokenizerCodec::from_file(&opts.tokenizer)
            .map_err(|e| anyhow::anyhow!("failed to load codec: {e}"))?,
    );
    let vocab_size = codec.vocab_size();
    let scorer: Arc<dyn Scorer> = Arc::new(NGramScorer::new(vocab_size));

    let engine_config = EngineConfig {
        context_cap: opts.context_cap,
        top_k: opts.top_k_bounds,
        eos_token_id: opts.eos_token_id,
        ..EngineConfig::default()
    };
    let engine = Arc::new(StepEngine::new(codec, scorer, engine_config));
    let state = AppState::new(engine, opts.model_name, "local".to_string());

    let cors = api::build_cors_layer(&opts.cors_config);
    let app = api::create_router_with_cors(state, cors);

    let addr: SocketAddr = format!("{}:{}", opts.host, opts.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, vocab_size, "tokenlens-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
