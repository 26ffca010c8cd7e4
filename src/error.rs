use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the library's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error types for the cy2pw library.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// IO error with context about the file path.
    #[error("IO error accessing '{path}': {message}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// Template rendering error.
    #[error("Failed to render template '{template}': {message}")]
    Template {
        /// Template name
        template: String,
        /// Error message
        message: String,
    },

    /// Configuration validation error.
    #[error("Invalid configuration: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// Required secret is absent or empty.
    #[error("Secret '{name}' is not set. Add it to the environment or a .env file.")]
    MissingSecret {
        /// Name of the missing secret
        name: String,
    },

    /// Uploaded bytes are not valid UTF-8.
    #[error("Invalid UTF-8 encoding in upload '{filename}'. File may be binary or use unsupported encoding.")]
    InvalidUtf8 {
        /// Declared filename of the upload
        filename: String,
    },

    /// Upload does not carry a supported extension.
    #[error("Unsupported file '{filename}': expected a .js or .ts test file")]
    UnsupportedFile {
        /// Declared filename of the upload
        filename: String,
    },

    /// Upload form is malformed or carries no file.
    #[error("Invalid upload: {message}")]
    InvalidUpload {
        /// Error message
        message: String,
    },

    /// Upload exceeds the configured size limit.
    #[error("Upload is too large: {size} bytes exceeds limit of {limit} bytes")]
    UploadTooLarge {
        /// Bytes received so far
        size: usize,
        /// Maximum allowed bytes
        limit: usize,
    },

    /// The completion endpoint failed to produce text.
    #[error("Generation failed: {message}")]
    Generation {
        /// Error message
        message: String,
    },
}

impl Error {
    /// Creates an IO error with path context.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a template error.
    #[must_use]
    pub fn template(template: impl Into<String>, source: tera::Error) -> Self {
        // tera keeps the useful part of the message in the source chain
        let mut message = source.to_string();
        let mut cause = std::error::Error::source(&source);
        while let Some(inner) = cause {
            message.push_str(": ");
            message.push_str(&inner.to_string());
            cause = inner.source();
        }

        Self::Template {
            template: template.into(),
            message,
        }
    }

    /// Creates a missing secret error.
    #[must_use]
    pub fn missing_secret(name: impl Into<String>) -> Self {
        Self::MissingSecret { name: name.into() }
    }

    /// Creates an invalid UTF-8 error.
    #[must_use]
    pub fn invalid_utf8(filename: impl Into<String>) -> Self {
        Self::InvalidUtf8 {
            filename: filename.into(),
        }
    }

    /// Creates an unsupported file error.
    #[must_use]
    pub fn unsupported_file(filename: impl Into<String>) -> Self {
        Self::UnsupportedFile {
            filename: filename.into(),
        }
    }

    /// Creates an invalid upload error.
    #[must_use]
    pub fn invalid_upload(message: impl Into<String>) -> Self {
        Self::InvalidUpload {
            message: message.into(),
        }
    }

    /// Creates an upload size error.
    #[must_use]
    pub const fn upload_too_large(size: usize, limit: usize) -> Self {
        Self::UploadTooLarge { size, limit }
    }

    /// Creates a generation error.
    #[must_use]
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Returns true if this is an IO error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns true if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config { .. } | Self::MissingSecret { .. })
    }

    /// Returns true if the completion endpoint failed.
    #[must_use]
    pub const fn is_generation(&self) -> bool {
        matches!(self, Self::Generation { .. })
    }

    /// Returns true if the upload itself was rejected.
    #[must_use]
    pub const fn is_rejected_upload(&self) -> bool {
        matches!(
            self,
            Self::InvalidUtf8 { .. }
                | Self::UnsupportedFile { .. }
                | Self::InvalidUpload { .. }
                | Self::UploadTooLarge { .. }
        )
    }

    /// Message shown on the page when a conversion fails.
    ///
    /// Remote and filesystem details stay in the logs.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidUtf8 { filename } => format!(
                "Upload rejected: '{filename}' is not valid UTF-8 text."
            ),
            Self::UnsupportedFile { filename } => format!(
                "Upload rejected: '{filename}' is not a .js or .ts file."
            ),
            Self::InvalidUpload { message } => format!("Upload rejected: {message}."),
            Self::UploadTooLarge { limit, .. } => format!(
                "Upload rejected: file exceeds the {limit} byte limit."
            ),
            Self::Generation { .. } => {
                "Conversion failed: the AI service did not return a result. Please try again."
                    .to_string()
            }
            Self::Io { .. } => {
                "Conversion succeeded but the converted file could not be saved.".to_string()
            }
            Self::Template { .. } | Self::Config { .. } | Self::MissingSecret { .. } => {
                "Internal error while preparing the conversion.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Generation {
            message: e.to_string(),
        }
    }
}
