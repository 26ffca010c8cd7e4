use crate::{
    client::CompletionClient,
    config::Config,
    error::Result,
    prompt::PromptBuilder,
    template::TemplateEngine,
    upload::UploadedScript,
    writer::{Artifact, ArtifactWriter},
};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, instrument};

/// Statistics collected during one conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionStats {
    /// Size of the uploaded source in bytes
    pub source_bytes: usize,

    /// Size of the generated test in bytes
    pub result_bytes: usize,

    /// Lines in the uploaded source
    pub source_lines: usize,

    /// Lines in the generated test
    pub result_lines: usize,

    /// Time spent waiting on the completion endpoint
    pub generation_duration: Duration,

    /// Time spent writing the artifact
    pub write_duration: Duration,

    /// Total execution time
    pub duration: Duration,
}

/// Outcome of a successful conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// Declared filename of the upload
    pub source_filename: String,

    /// Decoded source text
    pub source: String,

    /// Text returned by the completion endpoint
    pub converted: String,

    /// File the converted text was written to
    pub artifact: Artifact,

    /// Timing and size figures
    pub stats: ConversionStats,
}

/// Main pipeline orchestrator: decode, prompt, generate, save.
pub struct Converter {
    prompt_builder: PromptBuilder,
    client: Arc<dyn CompletionClient>,
    writer: ArtifactWriter,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("prompt_builder", &self.prompt_builder)
            .field("writer", &self.writer)
            .finish_non_exhaustive()
    }
}

impl Converter {
    /// Creates a new converter with the given configuration and client.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The prompt template fails to register
    pub fn new(config: &Config, client: Arc<dyn CompletionClient>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            prompt_builder: PromptBuilder::new()?,
            client,
            writer: ArtifactWriter::new(config),
        })
    }

    pub(crate) fn from_parts(
        engine: Arc<TemplateEngine>,
        client: Arc<dyn CompletionClient>,
        writer: ArtifactWriter,
    ) -> Self {
        Self {
            prompt_builder: PromptBuilder::with_engine(engine),
            client,
            writer,
        }
    }

    /// Returns the artifact writer.
    #[must_use]
    pub fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }

    /// Converts an upload using the current local time for the artifact name.
    ///
    /// # Errors
    ///
    /// See [`Converter::convert_at`].
    pub fn convert(&self, upload: &UploadedScript) -> Result<Conversion> {
        self.convert_at(upload, &Local::now())
    }

    /// Converts an upload, naming the artifact after `now`.
    ///
    /// # Process
    ///
    /// 1. **Decode**: the upload must be UTF-8; nothing is sent otherwise
    /// 2. **Prompt**: the source is embedded in the fixed instructions
    /// 3. **Generate**: one blocking completion call, no retry
    /// 4. **Save**: the response is written verbatim as the artifact
    ///
    /// # Errors
    ///
    /// Returns the first stage failure. No artifact exists unless every stage
    /// succeeded.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use cy2pw::{Config, Converter, OpenAiClient, UploadedScript};
    /// use std::sync::Arc;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder().api_key("sk-...").build()?;
    /// let client = Arc::new(OpenAiClient::new(&config)?);
    /// let converter = Converter::new(&config, client)?;
    ///
    /// let upload = UploadedScript::new("login.cy.js", std::fs::read("login.cy.js")?);
    /// let conversion = converter.convert(&upload)?;
    /// println!("{}", conversion.artifact.path.display());
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self, upload, now), fields(file = %upload.filename))]
    pub fn convert_at(
        &self,
        upload: &UploadedScript,
        now: &DateTime<Local>,
    ) -> Result<Conversion> {
        let start_time = Instant::now();

        info!("Stage 1/4: Decoding upload ({} bytes)...", upload.size_bytes());
        let source = upload.decode().inspect_err(|e| error!("{e}"))?;

        info!("Stage 2/4: Building prompt...");
        let prompt = self.prompt_builder.build(&source)?;

        info!("Stage 3/4: Generating Playwright test...");
        let generation_start = Instant::now();
        let converted = self
            .client
            .complete(&prompt)
            .inspect_err(|e| error!("{e}"))?;
        let generation_duration = generation_start.elapsed();

        info!(
            "✓ Generated {} bytes in {:.2}s",
            converted.len(),
            generation_duration.as_secs_f64()
        );

        info!("Stage 4/4: Saving artifact...");
        let write_start = Instant::now();
        let artifact = self
            .writer
            .save(upload.basename(), &converted, now)
            .inspect_err(|e| error!("{e}"))?;
        let write_duration = write_start.elapsed();

        let stats = ConversionStats {
            source_bytes: source.len(),
            result_bytes: converted.len(),
            source_lines: source.lines().count(),
            result_lines: converted.lines().count(),
            generation_duration,
            write_duration,
            duration: start_time.elapsed(),
        };

        info!(
            "✓ Conversion completed in {:.2}s → {}",
            stats.duration.as_secs_f64(),
            artifact.filename
        );

        Ok(Conversion {
            source_filename: upload.filename.clone(),
            source,
            converted,
            artifact,
            stats,
        })
    }
}
