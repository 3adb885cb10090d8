//! Proposal document rendering.
//!
//! Turns a draft into a downloadable file:
//!
//! - **PDF** - paginated A4 layout with the standard Helvetica fonts
//! - **Word** - `.docx` package with headings, paragraphs and bullets

mod docx;
mod fonts;
mod pdf;

pub use docx::{build_blocks, parse_sections, render_docx, Block, Section};
pub use fonts::{encode_win_ansi, FontFace};
pub use pdf::{
    layout_proposal, render_pdf, Page, PdfCanvas, TextOp, CONTENT_WIDTH_MM, MARGIN_MM, PAGE_HEIGHT_MM,
    PAGE_WIDTH_MM,
};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Title used when the conversation has not produced one.
pub const DEFAULT_TITLE: &str = "Web Development Proposal";

/// Section titles the PDF layout promotes to headers.
pub const SECTION_HEADERS: &[&str] = &[
    "Project Overview",
    "Scope of Work",
    "Technical Approach",
    "Timeline Estimates",
    "Budget Estimates",
    "Next Steps",
    "Acceptance Criteria",
    "Acceptance Form",
];

static EXCESS_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("valid newline pattern"));
static EXCESS_ASTERISKS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*{3,}").expect("valid asterisk pattern"));
static CARRIAGE_RETURNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r\n?").expect("valid line ending pattern"));
static CONTROL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("valid control character pattern")
});

/// Rendering error types.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to package document: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("Failed to write XML: {0}")]
    Xml(String),

    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
}

/// Output document format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    #[default]
    Docx,
}

impl DocumentFormat {
    /// MIME type for HTTP responses.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for DocumentFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" | "doc" | "word" => Ok(Self::Docx),
            other => Err(RenderError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// A rendered proposal ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub format: DocumentFormat,
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl RenderedDocument {
    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Write the document into `dir` under its filename.
    pub fn save_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Normalize model output before layout.
///
/// Normalizes line endings, drops control characters (XML 1.0 forbids
/// them), and collapses runs of blank lines and malformed `***` emphasis.
pub fn clean_content(content: &str) -> String {
    let content = CARRIAGE_RETURNS.replace_all(content, "\n");
    let content = CONTROL_CHARS.replace_all(&content, "");
    let content = EXCESS_NEWLINES.replace_all(&content, "\n\n");
    EXCESS_ASTERISKS.replace_all(&content, "**").trim().to_string()
}

/// Download filename for a proposal title, e.g. `acme-development-proposal.pdf`.
pub fn document_filename(title: &str, format: DocumentFormat) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');

    let stem = if slug.is_empty() { "web-development-proposal" } else { slug };
    format!("{stem}.{}", format.extension())
}

/// Render a proposal in the requested format.
pub fn render(
    format: DocumentFormat,
    title: &str,
    content: &str,
    date: Option<&str>,
) -> Result<RenderedDocument, RenderError> {
    let title = if title.trim().is_empty() { DEFAULT_TITLE } else { title.trim() };
    let content = clean_content(content);

    let bytes = match format {
        DocumentFormat::Pdf => render_pdf(title, &content, date)?,
        DocumentFormat::Docx => render_docx(title, &content)?,
    };

    tracing::info!(format = %format, size = bytes.len(), "Rendered proposal document");

    Ok(RenderedDocument { format, filename: document_filename(title, format), bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_content() {
        assert_eq!(clean_content("  a\n\n\n\nb ***bold*** \n"), "a\n\nb **bold**");
        assert_eq!(clean_content("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_clean_content_drops_control_characters() {
        assert_eq!(clean_content("Scope\u{0B} of\u{0C} Work\u{0}"), "Scope of Work");
        assert_eq!(clean_content("a\r\nb\rc\tz"), "a\nb\nc\tz");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("PDF".parse::<DocumentFormat>().unwrap(), DocumentFormat::Pdf);
        assert_eq!("word".parse::<DocumentFormat>().unwrap(), DocumentFormat::Docx);
        assert_eq!("doc".parse::<DocumentFormat>().unwrap(), DocumentFormat::Docx);
        assert!("rtf".parse::<DocumentFormat>().is_err());
    }

    #[test]
    fn test_document_filename() {
        assert_eq!(
            document_filename("Acme Portal - Development Proposal", DocumentFormat::Pdf),
            "acme-portal-development-proposal.pdf"
        );
        assert_eq!(document_filename("  ", DocumentFormat::Docx), "web-development-proposal.docx");
        assert_eq!(document_filename("Café!", DocumentFormat::Pdf), "caf.pdf");
    }

    #[test]
    fn test_render_dispatches_on_format() {
        let pdf = render(DocumentFormat::Pdf, "", "Project Overview\n\nText", Some("01/02/2025"))
            .unwrap();
        assert!(pdf.bytes.starts_with(b"%PDF"));
        assert_eq!(pdf.filename, "web-development-proposal.pdf");
        assert_eq!(pdf.content_type(), "application/pdf");

        let docx = render(DocumentFormat::Docx, "Acme", "**Next Steps**\n- Sign", None).unwrap();
        assert!(docx.bytes.starts_with(b"PK"));
        assert_eq!(docx.filename, "acme.docx");
    }

    #[test]
    fn test_save_to_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let doc = RenderedDocument {
            format: DocumentFormat::Pdf,
            filename: "x.pdf".to_string(),
            bytes: vec![1, 2, 3],
        };

        let path = doc.save_to(&dir.path().join("output")).unwrap();
        assert_eq!(std::fs::read(path).unwrap(), vec![1, 2, 3]);
    }
}
