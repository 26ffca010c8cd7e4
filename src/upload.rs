use crate::error::{Error, Result};

/// Extensions accepted for uploaded test scripts.
pub const SUPPORTED_EXTENSIONS: [&str; 2] = ["js", "ts"];

/// A user-supplied test file as received from the upload form.
#[derive(Debug, Clone)]
pub struct UploadedScript {
    /// Declared filename, reduced to its final path component
    pub filename: String,

    /// Raw uploaded bytes
    pub bytes: Vec<u8>,
}

impl UploadedScript {
    /// Creates a new upload.
    ///
    /// Browsers may send a full client-side path; only the last component is
    /// kept so it can never steer where artifacts are written.
    #[must_use]
    pub fn new(filename: impl AsRef<str>, bytes: Vec<u8>) -> Self {
        let filename = filename
            .as_ref()
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .to_string();

        Self { filename, bytes }
    }

    /// Returns the lowercase extension of the declared filename.
    #[must_use]
    pub fn extension(&self) -> Option<String> {
        self.filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
    }

    /// Returns true if the declared extension is `.js` or `.ts`.
    #[must_use]
    pub fn has_supported_extension(&self) -> bool {
        self.extension()
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Fails unless the declared extension is supported.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFile`] for any other extension.
    pub fn ensure_supported(&self) -> Result<()> {
        if self.has_supported_extension() {
            Ok(())
        } else {
            Err(Error::unsupported_file(&self.filename))
        }
    }

    /// Decodes the upload as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUtf8`] if the bytes are not valid UTF-8.
    pub fn decode(&self) -> Result<String> {
        String::from_utf8(self.bytes.clone()).map_err(|_| Error::invalid_utf8(&self.filename))
    }

    /// Returns the filename with one trailing `.js` or `.ts` removed.
    #[must_use]
    pub fn basename(&self) -> &str {
        artifact_basename(&self.filename)
    }

    /// Returns the size in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Strips exactly one trailing `.js` or `.ts` from a filename.
#[must_use]
pub fn artifact_basename(filename: &str) -> &str {
    filename
        .strip_suffix(".js")
        .or_else(|| filename.strip_suffix(".ts"))
        .unwrap_or(filename)
}

/// Maps a filename to the language name used for syntax highlighting.
#[must_use]
pub fn language_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("js" | "mjs" | "cjs" | "jsx") => "javascript",
        Some("ts" | "mts" | "cts" | "tsx") => "typescript",
        _ => "plaintext",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basename_strips_one_suffix() {
        assert_eq!(artifact_basename("login.spec.js"), "login.spec");
        assert_eq!(artifact_basename("login.cy.ts"), "login.cy");
        assert_eq!(artifact_basename("a.ts.js"), "a.ts");
        assert_eq!(artifact_basename("javascript.jsx"), "javascript.jsx");
        assert_eq!(artifact_basename("README"), "README");
    }

    #[test]
    fn test_new_keeps_last_path_component() {
        let upload = UploadedScript::new("../../etc/login.cy.js", vec![]);
        assert_eq!(upload.filename, "login.cy.js");

        let upload = UploadedScript::new(r"C:\Users\qa\checkout.cy.ts", vec![]);
        assert_eq!(upload.filename, "checkout.cy.ts");
    }

    #[test]
    fn test_supported_extensions() {
        assert!(UploadedScript::new("a.js", vec![]).has_supported_extension());
        assert!(UploadedScript::new("a.TS", vec![]).has_supported_extension());
        assert!(!UploadedScript::new("a.py", vec![]).has_supported_extension());
        assert!(!UploadedScript::new("Makefile", vec![]).has_supported_extension());

        let err = UploadedScript::new("notes.txt", vec![]).ensure_supported().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFile { .. }));
    }

    #[test]
    fn test_decode_valid_utf8() {
        let upload = UploadedScript::new("a.js", "cy.visit('/');\n// ✓".as_bytes().to_vec());
        assert_eq!(upload.decode().unwrap(), "cy.visit('/');\n// ✓");
    }

    #[test]
    fn test_decode_invalid_utf8() {
        let upload = UploadedScript::new("a.js", vec![0xff, 0xfe, 0x00, 0x41]);
        let err = upload.decode().unwrap_err();
        assert!(matches!(err, Error::InvalidUtf8 { ref filename } if filename == "a.js"));
    }

    #[test]
    fn test_language_detection() {
        assert_eq!(language_for("login.cy.js"), "javascript");
        assert_eq!(language_for("login.cy.ts"), "typescript");
        assert_eq!(language_for("notes"), "plaintext");
    }
}
