//! # cy2pw
//!
//! A small web tool that converts Cypress test scripts into Playwright tests
//! using an OpenAI-compatible chat completion endpoint.
//!
//! ## Features
//!
//! - Single-page upload form for `.js` / `.ts` test files
//! - One completion request per upload, no retries
//! - Timestamped artifacts written atomically to the output directory
//! - Side-by-side source and result view with a download link
//!
//! ## Quick Start
//!
//! ```no_run
//! use cy2pw::{Config, Converter, OpenAiClient, UploadedScript};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .api_key_secret(cy2pw::load_api_key()?)
//!     .output_dir("./converted")
//!     .build()?;
//!
//! let client = Arc::new(OpenAiClient::new(&config)?);
//! let upload = UploadedScript::new("login.cy.js", std::fs::read("login.cy.js")?);
//!
//! let conversion = Converter::new(&config, client)?.convert(&upload)?;
//! println!("Saved {}", conversion.artifact.path.display());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! Every upload runs through the same pipeline:
//! 1. **Decode**: the upload must be UTF-8 text
//! 2. **Prompt**: the source is embedded in fixed conversion instructions
//! 3. **Generate**: the prompt is sent as a single user message
//! 4. **Save**: the response is written verbatim as `<name>_playwright_<timestamp>.spec.ts`
//!
//! The [`server`] module wraps the pipeline in an HTTP shell.

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod error;
mod pipeline;
mod prompt;
mod request_logger;
mod secret;
mod template;
mod upload;
mod view;
mod writer;

pub mod server;

pub use client::{CompletionClient, OpenAiClient};
pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use pipeline::{Conversion, ConversionStats, Converter};
pub use prompt::PromptBuilder;
pub use secret::{API_KEY_VAR, load_api_key};
pub use upload::{SUPPORTED_EXTENSIONS, UploadedScript, artifact_basename, language_for};
pub use writer::{Artifact, ArtifactWriter, TIMESTAMP_FORMAT, artifact_filename, is_artifact_filename};

/// Converts a single upload with the given configuration and client.
///
/// Convenience wrapper for one-off conversions outside the web server.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The upload is not valid UTF-8
/// - The completion endpoint fails
/// - The artifact cannot be written
///
/// # Examples
///
/// ```no_run
/// use cy2pw::{Config, OpenAiClient, UploadedScript, convert};
/// use std::sync::Arc;
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::builder().api_key("sk-...").build()?;
/// let client = Arc::new(OpenAiClient::new(&config)?);
///
/// let upload = UploadedScript::new("cart.cy.ts", std::fs::read("cart.cy.ts")?);
/// convert(&config, client, &upload)?;
/// # Ok(())
/// # }
/// ```
pub fn convert(
    config: &Config,
    client: std::sync::Arc<dyn CompletionClient>,
    upload: &UploadedScript,
) -> Result<Conversion> {
    Converter::new(config, client)?.convert(upload)
}
