//! PDF rendering.
//!
//! Lays the proposal out on A4 pages using the standard Helvetica faces
//! and serializes a minimal PDF 1.4 file. Layout works in millimetres
//! with the origin at the top-left corner of the page; the serializer
//! converts to PDF points with the origin bottom-left.

use std::io::Write;

use once_cell::sync::Lazy;
use regex::Regex;

use super::fonts::{encode_win_ansi, FontFace};
use super::{RenderError, DEFAULT_TITLE, SECTION_HEADERS};

/// A4 width in millimetres.
pub const PAGE_WIDTH_MM: f32 = 210.0;
/// A4 height in millimetres.
pub const PAGE_HEIGHT_MM: f32 = 297.0;
/// Uniform page margin.
pub const MARGIN_MM: f32 = 20.0;
/// Usable text width.
pub const CONTENT_WIDTH_MM: f32 = PAGE_WIDTH_MM - MARGIN_MM * 2.0;

const PT_PER_MM: f32 = 72.0 / 25.4;

const TITLE_SIZE: f32 = 20.0;
const DATE_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 11.0;
const SECTION_SIZE: f32 = 13.0;

const LINE_HEIGHT_MM: f32 = 5.0;
const PARAGRAPH_GAP_MM: f32 = 3.0;

static BOLD_MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold pattern"));
static ITALIC_MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("valid italic pattern"));

/// A single positioned run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOp {
    /// Left edge in mm
    pub x: f32,
    /// Baseline from the top of the page in mm
    pub y: f32,
    pub face: FontFace,
    pub size: f32,
    /// Unencoded text
    pub text: String,
}

/// One page worth of text runs.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub ops: Vec<TextOp>,
}

/// Drawing surface with a current font.
#[derive(Debug, Clone)]
pub struct PdfCanvas {
    pages: Vec<Page>,
    face: FontFace,
    size: f32,
}

impl Default for PdfCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfCanvas {
    /// Create a canvas with one empty page.
    pub fn new() -> Self {
        Self { pages: vec![Page::default()], face: FontFace::Helvetica, size: BODY_SIZE }
    }

    /// Select the font used by subsequent `text` calls.
    pub fn set_font(&mut self, face: FontFace, size: f32) {
        self.face = face;
        self.size = size;
    }

    /// Start a new page; subsequent text lands on it.
    pub fn add_page(&mut self) {
        self.pages.push(Page::default());
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Draw a line of text at (x, y) on the current page.
    pub fn text(&mut self, x: f32, y: f32, text: &str) {
        let op = TextOp { x, y, face: self.face, size: self.size, text: text.to_string() };
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    /// Width of `text` in mm with the current font.
    pub fn text_width(&self, text: &str) -> f32 {
        let units = self.face.text_width(&encode_win_ansi(text));
        units as f32 * self.size / 1000.0 / PT_PER_MM
    }

    /// Break text into lines no wider than `max_width` mm.
    ///
    /// Explicit newlines always break. Words wider than the limit are
    /// split by character.
    pub fn split_text_to_size(&self, text: &str, max_width: f32) -> Vec<String> {
        let mut lines = Vec::new();

        for raw_line in text.split('\n') {
            let mut current = String::new();

            for word in raw_line.split_whitespace() {
                let candidate = if current.is_empty() {
                    word.to_string()
                } else {
                    format!("{current} {word}")
                };

                if self.text_width(&candidate) <= max_width {
                    current = candidate;
                    continue;
                }

                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }

                if self.text_width(word) <= max_width {
                    current = word.to_string();
                } else {
                    for c in word.chars() {
                        current.push(c);
                        if self.text_width(&current) > max_width && current.chars().count() > 1 {
                            current.pop();
                            lines.push(std::mem::take(&mut current));
                            current.push(c);
                        }
                    }
                }
            }

            lines.push(current);
        }

        lines
    }

    /// Serialize the canvas as a PDF file.
    pub fn to_bytes(&self, title: &str) -> Result<Vec<u8>, RenderError> {
        PdfWriter::new(self, title).write()
    }
}

/// Lay out a proposal on a fresh canvas.
pub fn layout_proposal(title: &str, content: &str, date: Option<&str>) -> PdfCanvas {
    let mut canvas = PdfCanvas::new();
    let bottom = PAGE_HEIGHT_MM - MARGIN_MM;
    let mut y = MARGIN_MM;

    let title = if title.trim().is_empty() { DEFAULT_TITLE } else { title.trim() };
    canvas.set_font(FontFace::HelveticaBold, TITLE_SIZE);
    canvas.text(MARGIN_MM, y, title);
    y += 15.0;

    if let Some(date) = date.map(str::trim).filter(|d| !d.is_empty()) {
        canvas.set_font(FontFace::Helvetica, DATE_SIZE);
        canvas.text(MARGIN_MM, y, &format!("Date: {date}"));
        y += 10.0;
    }

    canvas.set_font(FontFace::Helvetica, BODY_SIZE);

    for paragraph in content.split("\n\n") {
        if paragraph.trim().is_empty() {
            continue;
        }

        let text = strip_emphasis(paragraph);
        let mut text = text.trim();

        if let Some(level) = heading_level(text) {
            // only the first line is the heading; the rest is body text
            let (heading, body) = text.split_once('\n').unwrap_or((text, ""));
            let heading = heading.trim_start_matches('#').trim();
            y += 5.0;

            let size = (16.0 - (level as f32 - 1.0) * 2.0).max(12.0);
            canvas.set_font(FontFace::HelveticaBold, size);

            if y + 10.0 > bottom {
                canvas.add_page();
                y = MARGIN_MM;
            }

            canvas.text(MARGIN_MM, y, heading);
            y += size * 0.8;

            canvas.set_font(FontFace::Helvetica, BODY_SIZE);

            text = body.trim();
            if text.is_empty() {
                continue;
            }
        } else if is_section_header(text) {
            y += 8.0;
            canvas.set_font(FontFace::HelveticaBold, SECTION_SIZE);

            if y + 15.0 > bottom {
                canvas.add_page();
                y = MARGIN_MM;
            }

            canvas.text(MARGIN_MM, y, text);
            y += 15.0;

            canvas.set_font(FontFace::Helvetica, BODY_SIZE);
            continue;
        }

        let text = bulletize(text);
        let lines = canvas.split_text_to_size(&text, CONTENT_WIDTH_MM);

        if y + lines.len() as f32 * LINE_HEIGHT_MM > bottom {
            canvas.add_page();
            y = MARGIN_MM;
        }

        for line in &lines {
            // paragraphs taller than a page continue on the next one
            if y > bottom {
                canvas.add_page();
                y = MARGIN_MM;
            }
            canvas.text(MARGIN_MM, y, line);
            y += LINE_HEIGHT_MM;
        }

        y += PARAGRAPH_GAP_MM;
    }

    canvas
}

/// Render a proposal straight to PDF bytes.
pub fn render_pdf(title: &str, content: &str, date: Option<&str>) -> Result<Vec<u8>, RenderError> {
    let title = if title.trim().is_empty() { DEFAULT_TITLE } else { title.trim() };
    let canvas = layout_proposal(title, content, date);
    tracing::debug!(pages = canvas.page_count(), "Laid out proposal PDF");
    canvas.to_bytes(title)
}

fn strip_emphasis(text: &str) -> String {
    let text = BOLD_MARKUP.replace_all(text, "$1");
    ITALIC_MARKUP.replace_all(&text, "$1").into_owned()
}

fn heading_level(text: &str) -> Option<usize> {
    let level = text.chars().take_while(|&c| c == '#').count();
    (level > 0).then_some(level)
}

fn is_section_header(text: &str) -> bool {
    SECTION_HEADERS.iter().any(|header| text.eq_ignore_ascii_case(header))
}

/// Turn leading `*` / `-` list markers into bullets, line by line.
fn bulletize(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.chars().all(|c| matches!(c, '-' | '*' | '_')))
        .map(|line| match line.strip_prefix(['*', '-']) {
            Some(rest) => format!("\u{2022} {}", rest.trim()),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Serializes a laid-out canvas.
///
/// Object numbering is fixed: 1 catalog, 2 page tree, 3-4 fonts,
/// 5 info, then a (page, content stream) pair per page.
struct PdfWriter<'a> {
    canvas: &'a PdfCanvas,
    title: &'a str,
    out: Vec<u8>,
    offsets: Vec<usize>,
}

const CATALOG_ID: usize = 1;
const PAGES_ID: usize = 2;
const REGULAR_FONT_ID: usize = 3;
const BOLD_FONT_ID: usize = 4;
const INFO_ID: usize = 5;
const FIRST_PAGE_ID: usize = 6;

impl<'a> PdfWriter<'a> {
    fn new(canvas: &'a PdfCanvas, title: &'a str) -> Self {
        let object_count = FIRST_PAGE_ID + canvas.page_count() * 2;
        Self { canvas, title, out: Vec::new(), offsets: vec![0; object_count] }
    }

    fn page_id(index: usize) -> usize {
        FIRST_PAGE_ID + index * 2
    }

    fn write(mut self) -> Result<Vec<u8>, RenderError> {
        self.out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        self.begin_object(CATALOG_ID)?;
        write!(self.out, "<< /Type /Catalog /Pages {PAGES_ID} 0 R >>\nendobj\n")?;

        let kids = (0..self.canvas.page_count())
            .map(|i| format!("{} 0 R", Self::page_id(i)))
            .collect::<Vec<_>>()
            .join(" ");
        self.begin_object(PAGES_ID)?;
        write!(
            self.out,
            "<< /Type /Pages /Kids [{kids}] /Count {} >>\nendobj\n",
            self.canvas.page_count()
        )?;

        for (id, face) in
            [(REGULAR_FONT_ID, FontFace::Helvetica), (BOLD_FONT_ID, FontFace::HelveticaBold)]
        {
            self.begin_object(id)?;
            write!(
                self.out,
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>\nendobj\n",
                face.base_font()
            )?;
        }

        self.begin_object(INFO_ID)?;
        let created = chrono::Local::now().format("D:%Y%m%d%H%M%S").to_string();
        self.out.extend_from_slice(b"<< /Title (");
        self.out.extend_from_slice(&escape_string(&encode_win_ansi(self.title)));
        write!(
            self.out,
            ") /Producer (proposal-agent {}) /CreationDate ({created}) >>\nendobj\n",
            env!("CARGO_PKG_VERSION")
        )?;

        for (index, page) in self.canvas.pages().iter().enumerate() {
            let page_id = Self::page_id(index);
            let content_id = page_id + 1;

            self.begin_object(page_id)?;
            write!(
                self.out,
                "<< /Type /Page /Parent {PAGES_ID} 0 R /MediaBox [0 0 {:.2} {:.2}] \
                 /Resources << /Font << /F1 {REGULAR_FONT_ID} 0 R /F2 {BOLD_FONT_ID} 0 R >> >> \
                 /Contents {content_id} 0 R >>\nendobj\n",
                PAGE_WIDTH_MM * PT_PER_MM,
                PAGE_HEIGHT_MM * PT_PER_MM
            )?;

            let stream = content_stream(page)?;
            self.begin_object(content_id)?;
            write!(self.out, "<< /Length {} >>\nstream\n", stream.len())?;
            self.out.extend_from_slice(&stream);
            self.out.extend_from_slice(b"\nendstream\nendobj\n");
        }

        let xref_offset = self.out.len();
        write!(self.out, "xref\n0 {}\n0000000000 65535 f \n", self.offsets.len())?;
        for offset in &self.offsets[1..] {
            write!(self.out, "{offset:010} 00000 n \n")?;
        }
        write!(
            self.out,
            "trailer\n<< /Size {} /Root {CATALOG_ID} 0 R /Info {INFO_ID} 0 R >>\nstartxref\n{xref_offset}\n%%EOF\n",
            self.offsets.len()
        )?;

        Ok(self.out)
    }

    fn begin_object(&mut self, id: usize) -> Result<(), RenderError> {
        self.offsets[id] = self.out.len();
        write!(self.out, "{id} 0 obj\n")?;
        Ok(())
    }
}

fn content_stream(page: &Page) -> Result<Vec<u8>, RenderError> {
    let mut stream = Vec::new();
    for op in &page.ops {
        write!(
            stream,
            "BT\n/{} {:.2} Tf\n{:.2} {:.2} Td\n(",
            op.face.resource_name(),
            op.size,
            op.x * PT_PER_MM,
            (PAGE_HEIGHT_MM - op.y) * PT_PER_MM
        )?;
        stream.extend_from_slice(&escape_string(&encode_win_ansi(&op.text)));
        stream.extend_from_slice(b") Tj\nET\n");
    }
    Ok(stream)
}

/// Escape bytes for a PDF literal string, keeping the output 7-bit.
fn escape_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            0x20..=0x7E => out.push(b),
            _ => out.extend_from_slice(format!("\\{b:03o}").as_bytes()),
        }
    }
    out
}
