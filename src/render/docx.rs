//! Word (.docx) rendering.
//!
//! The draft is parsed into `**Header**` delimited sections, mapped onto
//! a flat list of paragraph blocks and written out as a minimal
//! WordprocessingML package.

use std::io::{Cursor, Write};

use once_cell::sync::Lazy;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use regex::Regex;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{RenderError, DEFAULT_TITLE};

static HEADER_MARKUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid header pattern"));

const BULLET_NUM_ID: &str = "1";

/// A `**Header**` section of the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub header: String,
    pub body: Vec<String>,
}

/// A paragraph in the generated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Heading(String),
    Bullet(String),
    Paragraph(String),
}

/// Split raw draft text into sections.
///
/// A section starts wherever a line begins with `**`. The first bold span
/// in each block is its header; blocks without one are dropped.
pub fn parse_sections(raw: &str) -> Vec<Section> {
    let mut sections = Vec::new();

    for block in split_blocks(raw) {
        let Some(header_match) = HEADER_MARKUP.captures(block) else {
            continue;
        };
        let (Some(whole), Some(inner)) = (header_match.get(0), header_match.get(1)) else {
            continue;
        };

        let body = block.replacen(whole.as_str(), "", 1);
        let body = body
            .trim()
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        sections.push(Section { header: inner.as_str().trim().to_string(), body });
    }

    sections
}

fn split_blocks(raw: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut start = 0;
    for (idx, _) in raw.match_indices("\n**") {
        blocks.push(&raw[start..idx]);
        start = idx + 1;
    }
    blocks.push(&raw[start..]);
    blocks
}

/// Map a draft onto document blocks.
pub fn build_blocks(title: &str, content: &str) -> Vec<Block> {
    let title = if title.trim().is_empty() { DEFAULT_TITLE } else { title.trim() };
    let mut blocks = vec![Block::Title(title.to_string())];

    for section in parse_sections(content) {
        blocks.push(Block::Heading(section.header));
        for line in section.body {
            match bullet_text(&line) {
                Some(text) => blocks.push(Block::Bullet(text.to_string())),
                None => blocks.push(Block::Paragraph(line)),
            }
        }
    }

    blocks
}

fn bullet_text(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix('\u{2022}') {
        return Some(rest.trim_start());
    }
    line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")).map(str::trim_start)
}

/// Render a proposal as .docx bytes.
pub fn render_docx(title: &str, content: &str) -> Result<Vec<u8>, RenderError> {
    let blocks = build_blocks(title, content);
    tracing::debug!(blocks = blocks.len(), "Built proposal document blocks");

    let document = document_xml(&blocks)?;
    let core = core_properties_xml(title)?;

    let parts: [(&str, &[u8]); 8] = [
        ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ("docProps/core.xml", &core),
        ("docProps/app.xml", APP_PROPERTIES.as_bytes()),
        ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
        ("word/document.xml", &document),
        ("word/styles.xml", STYLES.as_bytes()),
        ("word/numbering.xml", NUMBERING.as_bytes()),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for (name, data) in parts {
        zip.start_file(name, options)?;
        zip.write_all(data)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Thin wrapper that turns quick-xml failures into `RenderError`.
struct XmlOut {
    writer: Writer<Vec<u8>>,
}

impl XmlOut {
    fn new() -> Result<Self, RenderError> {
        let mut out = Self { writer: Writer::new(Vec::new()) };
        out.event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(out)
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), RenderError> {
        self.writer.write_event(event).map_err(|e| RenderError::Xml(e.to_string()))
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
        let mut elem = BytesStart::new(name);
        for &attr in attrs {
            elem.push_attribute(attr);
        }
        self.event(Event::Start(elem))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), RenderError> {
        let mut elem = BytesStart::new(name);
        for &attr in attrs {
            elem.push_attribute(attr);
        }
        self.event(Event::Empty(elem))
    }

    fn end(&mut self, name: &str) -> Result<(), RenderError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn text(&mut self, text: &str) -> Result<(), RenderError> {
        if text.chars().any(is_xml_illegal) {
            let text: String = text.chars().filter(|&c| !is_xml_illegal(c)).collect();
            return self.event(Event::Text(BytesText::new(&text)));
        }
        self.event(Event::Text(BytesText::new(text)))
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// C0 controls other than tab, newline and carriage return.
fn is_xml_illegal(c: char) -> bool {
    matches!(c, '\u{0}'..='\u{8}' | '\u{B}' | '\u{C}' | '\u{E}'..='\u{1F}')
}

fn document_xml(blocks: &[Block]) -> Result<Vec<u8>, RenderError> {
    let mut xml = XmlOut::new()?;
    xml.start(
        "w:document",
        &[
            ("xmlns:w", "http://schemas.openxmlformats.org/wordprocessingml/2006/main"),
            ("xmlns:r", "http://schemas.openxmlformats.org/officeDocument/2006/relationships"),
        ],
    )?;
    xml.start("w:body", &[])?;

    for block in blocks {
        xml.start("w:p", &[])?;
        match block {
            Block::Title(text) => {
                xml.start("w:pPr", &[])?;
                xml.empty("w:spacing", &[("w:after", "300")])?;
                xml.end("w:pPr")?;
                run(&mut xml, text, true, Some("28"))?;
            }
            Block::Heading(text) => {
                xml.start("w:pPr", &[])?;
                xml.empty("w:pStyle", &[("w:val", "Heading2")])?;
                xml.empty("w:spacing", &[("w:before", "200"), ("w:after", "200")])?;
                xml.end("w:pPr")?;
                run(&mut xml, text, false, None)?;
            }
            Block::Bullet(text) => {
                xml.start("w:pPr", &[])?;
                xml.empty("w:pStyle", &[("w:val", "ListParagraph")])?;
                xml.start("w:numPr", &[])?;
                xml.empty("w:ilvl", &[("w:val", "0")])?;
                xml.empty("w:numId", &[("w:val", BULLET_NUM_ID)])?;
                xml.end("w:numPr")?;
                xml.empty("w:spacing", &[("w:before", "100"), ("w:after", "100")])?;
                xml.end("w:pPr")?;
                inline_runs(&mut xml, text, None)?;
            }
            Block::Paragraph(text) => {
                inline_runs(&mut xml, text, Some("24"))?;
            }
        }
        xml.end("w:p")?;
    }

    xml.start("w:sectPr", &[])?;
    xml.empty("w:pgSz", &[("w:w", "11906"), ("w:h", "16838")])?;
    xml.empty(
        "w:pgMar",
        &[
            ("w:top", "1440"),
            ("w:right", "1440"),
            ("w:bottom", "1440"),
            ("w:left", "1440"),
            ("w:header", "708"),
            ("w:footer", "708"),
            ("w:gutter", "0"),
        ],
    )?;
    xml.end("w:sectPr")?;

    xml.end("w:body")?;
    xml.end("w:document")?;
    Ok(xml.finish())
}

/// Write text as runs, rendering `**bold**` spans in bold.
fn inline_runs(xml: &mut XmlOut, text: &str, size: Option<&str>) -> Result<(), RenderError> {
    let mut last = 0;
    for caps in HEADER_MARKUP.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            run(xml, &text[last..whole.start()], false, size)?;
        }
        run(xml, inner.as_str(), true, size)?;
        last = whole.end();
    }
    if last < text.len() || text.is_empty() {
        run(xml, &text[last..], false, size)?;
    }
    Ok(())
}

fn run(xml: &mut XmlOut, text: &str, bold: bool, size: Option<&str>) -> Result<(), RenderError> {
    xml.start("w:r", &[])?;
    if bold || size.is_some() {
        xml.start("w:rPr", &[])?;
        if bold {
            xml.empty("w:b", &[])?;
        }
        if let Some(size) = size {
            xml.empty("w:sz", &[("w:val", size)])?;
        }
        xml.end("w:rPr")?;
    }
    xml.start("w:t", &[("xml:space", "preserve")])?;
    xml.text(text)?;
    xml.end("w:t")?;
    xml.end("w:r")
}

fn core_properties_xml(title: &str) -> Result<Vec<u8>, RenderError> {
    let title = if title.trim().is_empty() { DEFAULT_TITLE } else { title.trim() };
    let created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

    let mut xml = XmlOut::new()?;
    xml.start(
        "cp:coreProperties",
        &[
            ("xmlns:cp", "http://schemas.openxmlformats.org/package/2006/metadata/core-properties"),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
            ("xmlns:xsi", "http://www.w3.org/2001/XMLSchema-instance"),
        ],
    )?;
    xml.start("dc:title", &[])?;
    xml.text(title)?;
    xml.end("dc:title")?;
    xml.start("dc:creator", &[])?;
    xml.text("proposal-agent")?;
    xml.end("dc:creator")?;
    xml.start("dcterms:created", &[("xsi:type", "dcterms:W3CDTF")])?;
    xml.text(&created)?;
    xml.end("dcterms:created")?;
    xml.end("cp:coreProperties")?;
    Ok(xml.finish())
}

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/><Override PartName="/word/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml"/><Override PartName="/word/numbering.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/></Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/></Relationships>"#;

const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/numbering" Target="numbering.xml"/></Relationships>"#;

const APP_PROPERTIES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties"><Application>proposal-agent</Application></Properties>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="Calibri" w:hAnsi="Calibri" w:cs="Calibri"/><w:sz w:val="22"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="120"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style><w:style w:type="paragraph" w:styleId="Heading2"><w:name w:val="heading 2"/><w:basedOn w:val="Normal"/><w:next w:val="Normal"/><w:qFormat/><w:pPr><w:keepNext/><w:outlineLvl w:val="1"/></w:pPr><w:rPr><w:b/><w:color w:val="2E74B5"/><w:sz w:val="26"/></w:rPr></w:style><w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/><w:basedOn w:val="Normal"/><w:qFormat/><w:pPr><w:ind w:left="720"/></w:pPr></w:style></w:styles>"#;

const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:abstractNum w:abstractNumId="0"><w:multiLevelType w:val="hybridMultilevel"/><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/><w:lvlText w:val="&#8226;"/><w:lvlJc w:val="left"/><w:pPr><w:ind w:left="720" w:hanging="360"/></w:pPr></w:lvl></w:abstractNum><w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num></w:numbering>"#;
