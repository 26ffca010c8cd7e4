use crate::error::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MODEL: &str = "gpt-4";
const DEFAULT_TEMPERATURE: f32 = 0.2;
const DEFAULT_API_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OUTPUT_DIR: &str = "converted";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8501;
const DEFAULT_MAX_UPLOAD_SIZE: usize = 200 * 1024 * 1024;
const MAX_TEMPERATURE: f32 = 2.0;

/// Configuration for the converter and its web shell.
///
/// Built once at startup and shared by reference with every component that
/// needs it. Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Credential for the completion endpoint
    pub api_key: SecretString,

    /// Model identifier sent with each completion request
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Base URL of the chat-completions API
    pub api_base_url: String,

    /// Request timeout; `None` keeps the transport default
    pub request_timeout: Option<Duration>,

    /// Directory that receives converted artifacts
    pub output_dir: PathBuf,

    /// Address the web shell binds to
    pub host: String,

    /// Port the web shell binds to
    pub port: u16,

    /// Maximum accepted upload size in bytes
    pub max_upload_size: usize,

    /// Number of HTTP worker threads
    pub workers: usize,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use cy2pw::Config;
    ///
    /// let config = Config::builder()
    ///     .api_key("sk-test")
    ///     .output_dir("./converted")
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The API key is empty
    /// - Model or base URL are empty
    /// - Temperature is outside `0.0..=2.0`
    /// - Upload limit or worker count is zero
    pub fn validate(&self) -> Result<()> {
        if self.api_key.expose_secret().trim().is_empty() {
            return Err(Error::missing_secret(crate::secret::API_KEY_VAR));
        }

        if self.model.trim().is_empty() {
            return Err(Error::config("model must not be empty"));
        }

        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(Error::config(format!(
                "temperature ({}) must be between 0.0 and {MAX_TEMPERATURE}",
                self.temperature
            )));
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(Error::config(format!(
                "api_base_url must be an http(s) URL: {}",
                self.api_base_url
            )));
        }

        if self.request_timeout == Some(Duration::ZERO) {
            return Err(Error::config("request_timeout must be greater than 0"));
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(Error::config("output_dir must not be empty"));
        }

        // An existing regular file cannot become the artifact directory
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(Error::config(format!(
                "Output path is not a directory: {}",
                self.output_dir.display()
            )));
        }

        if self.max_upload_size == 0 {
            return Err(Error::config("max_upload_size must be greater than 0"));
        }

        if self.workers == 0 {
            return Err(Error::config("workers must be greater than 0"));
        }

        Ok(())
    }

    /// Returns the `host:port` pair the server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the full chat-completions endpoint URL.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.api_base_url.trim_end_matches('/'))
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    api_key: Option<SecretString>,
    model: Option<String>,
    temperature: Option<f32>,
    api_base_url: Option<String>,
    request_timeout: Option<Duration>,
    output_dir: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    max_upload_size: Option<usize>,
    workers: Option<usize>,
}

impl ConfigBuilder {
    /// Sets the API credential.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self
    }

    /// Sets an already-wrapped API credential.
    #[must_use]
    pub fn api_key_secret(mut self, key: SecretString) -> Self {
        self.api_key = Some(key);
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the base URL of the completion API (without `/chat/completions`).
    #[must_use]
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Overrides the transport's request timeout.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the output directory for converted files.
    #[must_use]
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Sets the bind host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the bind port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the maximum upload size in bytes.
    #[must_use]
    pub fn max_upload_size(mut self, bytes: usize) -> Self {
        self.max_upload_size = Some(bytes);
        self
    }

    /// Sets the number of HTTP workers.
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or validation fails.
    pub fn build(self) -> Result<Config> {
        let api_key = self
            .api_key
            .ok_or_else(|| Error::missing_secret(crate::secret::API_KEY_VAR))?;

        let config = Config {
            api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            api_base_url: self
                .api_base_url
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            request_timeout: self.request_timeout,
            output_dir: self
                .output_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            host: self.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: self.port.unwrap_or(DEFAULT_PORT),
            max_upload_size: self.max_upload_size.unwrap_or(DEFAULT_MAX_UPLOAD_SIZE),
            workers: self.workers.unwrap_or_else(num_cpus::get),
        };

        config.validate()?;
        Ok(config)
    }
}
