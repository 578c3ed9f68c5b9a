//! Syllabus PDF text extraction.
//!
//! Two backends produce the plain text fed to the curriculum parser:
//!
//! - [`CommandExtractor`] runs an external tool (`pdftotext` by default) and
//!   reads its stdout. This is the default because it keeps one syllabus line
//!   per output line.
//! - [`EmbeddedExtractor`] uses the `pdf-extract` crate in-process, for hosts
//!   without poppler installed.

use std::path::Path;
use std::process::Command;

use crate::config::PdfConfig;
use crate::extract::ExtractError;

/// Source of raw syllabus text.
pub trait PdfTextExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractError>;
}

/// Runs `<command> <args...> <pdf> -` and captures stdout.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    pub command: String,
    pub args: Vec<String>,
}

impl PdfTextExtractor for CommandExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(path)
            .arg("-")
            .output()
            .map_err(|e| ExtractError::PdfTool {
                command: self.command.clone(),
                status: "not started".to_string(),
                stderr: e.to_string(),
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !output.status.success() {
            return Err(ExtractError::PdfTool {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr,
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(ExtractError::PdfTool {
                command: self.command.clone(),
                status: "no output".to_string(),
                stderr,
            });
        }
        Ok(text)
    }
}

/// In-process extraction through `pdf-extract`.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedExtractor;

impl PdfTextExtractor for EmbeddedExtractor {
    fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        let bytes = std::fs::read(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text =
            pdf_extract::extract_text_from_mem(&bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;
        if text.trim().is_empty() {
            return Err(ExtractError::Pdf(format!(
                "no text extracted from {}",
                path.display()
            )));
        }
        Ok(text)
    }
}

/// Build the extractor selected by `[pdf].backend`.
pub fn extractor_from_config(config: &PdfConfig) -> Box<dyn PdfTextExtractor> {
    match config.backend.as_str() {
        "embedded" => Box::new(EmbeddedExtractor),
        _ => Box::new(CommandExtractor {
            command: config.command.clone(),
            args: config.args.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tool_is_reported() {
        let extractor = CommandExtractor {
            command: "studyhall-no-such-pdf-tool".to_string(),
            args: vec![],
        };
        let err = extractor.extract_text(Path::new("syllabus.pdf")).unwrap_err();
        assert!(matches!(err, ExtractError::PdfTool { .. }));
    }

    #[test]
    fn invalid_pdf_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        let err = EmbeddedExtractor.extract_text(&path).unwrap_err();
        assert!(matches!(err, ExtractError::Pdf(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = EmbeddedExtractor
            .extract_text(Path::new("/nonexistent/syllabus.pdf"))
            .unwrap_err();
        assert!(matches!(err, ExtractError::Io { .. }));
    }
}
