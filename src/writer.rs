use crate::{
    config::Config,
    error::{Error, Result},
};
use chrono::{DateTime, TimeZone};
use std::{
    fmt::Display,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

/// Timestamp layout embedded in artifact filenames.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Marker between the source basename and the timestamp.
const ARTIFACT_MARKER: &str = "_playwright_";

/// Extension of every artifact.
const ARTIFACT_EXTENSION: &str = ".spec.ts";

/// A converted test written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Full path of the written file
    pub path: PathBuf,

    /// Filename offered for download
    pub filename: String,

    /// Bytes written
    pub size: usize,
}

/// Writes converted tests into the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    /// Creates a new writer from configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self::with_output_dir(&config.output_dir)
    }

    /// Creates a writer for an explicit output directory.
    #[must_use]
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Writes `content` as `<basename>_playwright_<timestamp>.spec.ts`.
    ///
    /// The output directory is created if needed. An artifact with the same
    /// basename from the same second is overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the file
    /// cannot be written.
    pub fn save<Tz>(&self, basename: &str, content: &str, now: &DateTime<Tz>) -> Result<Artifact>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        fs::create_dir_all(&self.output_dir).map_err(|e| Error::io(&self.output_dir, e))?;

        let filename = artifact_filename(basename, now);
        let path = self.output_dir.join(&filename);

        self.write_file_atomic(&path, content)?;

        info!("Saved converted test to {}", path.display());

        Ok(Artifact {
            path,
            filename,
            size: content.len(),
        })
    }

    /// Resolves a download request to an artifact path.
    ///
    /// Only names this writer could have produced are accepted, so a request
    /// can never reach outside the output directory.
    #[must_use]
    pub fn resolve(&self, filename: &str) -> Option<PathBuf> {
        if !is_artifact_filename(filename) {
            debug!("Rejected artifact name {filename:?}");
            return None;
        }

        let path = self.output_dir.join(filename);
        path.is_file().then_some(path)
    }

    /// Writes a file atomically.
    ///
    /// # Process
    ///
    /// 1. Writes content to a uniquely named temporary file in the output directory
    /// 2. Syncs the temporary file to disk
    /// 3. Renames it over the target path
    ///
    /// Concurrent writes to the same path each use their own temporary file;
    /// the last rename wins.
    fn write_file_atomic(&self, path: &Path, content: &str) -> Result<()> {
        let mut temp_file = tempfile::Builder::new()
            .prefix(".cy2pw-")
            .suffix(".tmp")
            .tempfile_in(&self.output_dir)
            .map_err(|e| Error::io(&self.output_dir, e))?;

        temp_file
            .write_all(content.as_bytes())
            .and_then(|()| temp_file.as_file().sync_all())
            .map_err(|e| Error::io(temp_file.path(), e))?;

        // A failed persist drops the temporary file, which removes it
        temp_file
            .persist(path)
            .map_err(|e| Error::io(path, e.error))?;

        debug!("Wrote {} bytes to {}", content.len(), path.display());
        Ok(())
    }
}

/// Builds the artifact filename for `basename` at `now`.
#[must_use]
pub fn artifact_filename<Tz>(basename: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{basename}{ARTIFACT_MARKER}{}{ARTIFACT_EXTENSION}",
        now.format(TIMESTAMP_FORMAT)
    )
}

/// Returns true if `filename` has the shape of a written artifact.
///
/// Every name [`artifact_filename`] produces is accepted. Path separators and
/// NUL are not, so a match always names an entry directly inside the output
/// directory.
#[must_use]
pub fn is_artifact_filename(filename: &str) -> bool {
    let Some(stem) = filename.strip_suffix(ARTIFACT_EXTENSION) else {
        return false;
    };
    let Some((_, timestamp)) = stem.rsplit_once(ARTIFACT_MARKER) else {
        return false;
    };

    timestamp.len() == 14
        && timestamp.bytes().all(|b| b.is_ascii_digit())
        && !filename.contains(['/', '\\', '\0'])
}
