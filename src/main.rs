use anyhow::Context;
use clap::Parser;
use cy2pw::{Config, OpenAiClient, server};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    name = "cy2pw",
    version,
    author,
    about = "Convert Cypress tests into Playwright tests",
    long_about = "Serve a single-page web tool that converts Cypress test scripts into \
    Playwright tests with an OpenAI-compatible chat completion model.\n\n\
    The API key is read from OPENAI_API_KEY (a .env file in the working directory \
    is loaded first). Converted files are written to the output directory and \
    offered for download.\n\n\
    USAGE EXAMPLES:\n  \
      # Serve on the default address (127.0.0.1:8501)\n  \
      cy2pw\n\n  \
      # Listen on all interfaces with a different model\n  \
      cy2pw --host 0.0.0.0 --model gpt-4o\n\n  \
      # Use a self-hosted endpoint with a timeout\n  \
      cy2pw --api-base-url http://localhost:11434/v1 --request-timeout-secs 120"
)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "CY2PW_HOST", value_name = "HOST")]
    host: Option<String>,

    /// Port to bind
    #[arg(short, long, env = "CY2PW_PORT")]
    port: Option<u16>,

    /// Directory for converted files
    #[arg(short, long = "out", env = "CY2PW_OUTPUT_DIR", value_name = "PATH")]
    output_dir: Option<PathBuf>,

    /// Chat completion model
    #[arg(short, long, env = "CY2PW_MODEL")]
    model: Option<String>,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long, env = "CY2PW_TEMPERATURE")]
    temperature: Option<f32>,

    /// Base URL of the chat completion API
    #[arg(long, env = "CY2PW_API_BASE_URL", value_name = "URL")]
    api_base_url: Option<String>,

    /// Completion request timeout in seconds (transport default if unset)
    #[arg(long, env = "CY2PW_REQUEST_TIMEOUT_SECS", value_name = "SECS")]
    request_timeout_secs: Option<u64>,

    /// Maximum upload size in bytes
    #[arg(long, env = "CY2PW_MAX_UPLOAD_SIZE", value_name = "BYTES")]
    max_upload_size: Option<usize>,

    /// Number of HTTP worker threads
    #[arg(short, long, env = "CY2PW_WORKERS")]
    workers: Option<usize>,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn into_config(self, api_key: secrecy::SecretString) -> cy2pw::Result<Config> {
        let mut builder = Config::builder().api_key_secret(api_key);

        if let Some(host) = self.host {
            builder = builder.host(host);
        }
        if let Some(port) = self.port {
            builder = builder.port(port);
        }
        if let Some(output_dir) = self.output_dir {
            builder = builder.output_dir(output_dir);
        }
        if let Some(model) = self.model {
            builder = builder.model(model);
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(url) = self.api_base_url {
            builder = builder.api_base_url(url);
        }
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Some(bytes) = self.max_upload_size {
            builder = builder.max_upload_size(bytes);
        }
        if let Some(workers) = self.workers {
            builder = builder.workers(workers);
        }

        builder.build()
    }
}

fn main() -> anyhow::Result<()> {
    // Environment file first so clap's env fallbacks see it too
    let dotenv = dotenvy::dotenv().ok();
    let cli = Cli::parse();

    setup_tracing(cli.verbose)?;

    if let Some(path) = dotenv {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let api_key = cy2pw::load_api_key()
        .context("Set OPENAI_API_KEY in the environment or a .env file")?;

    let config = cli
        .into_config(api_key)
        .context("Failed to build configuration")?;

    // The blocking client owns its own runtime; build and drop it outside actix
    let client = Arc::new(OpenAiClient::new(&config).context("Failed to create API client")?);
    tracing::info!("Using model {}", client.model());

    let state = server::AppState::new(&config, client.clone())
        .context("Failed to initialise application state")?;

    actix_web::rt::System::new()
        .block_on(server::serve(&config, state))
        .context("Server terminated with an error")?;

    drop(client);
    Ok(())
}

fn setup_tracing(verbosity: u8) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbosity {
        0 => EnvFilter::new("cy2pw=info,http=info"),
        1 => EnvFilter::new("cy2pw=debug,http=info"),
        _ => EnvFilter::new("cy2pw=trace,http=debug"),
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_thread_ids(false))
        .init();

    Ok(())
}
