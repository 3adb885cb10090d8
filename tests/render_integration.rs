//! Rendering Integration Tests
//!
//! Exercises the public rendering API on realistic model output.

use std::io::{Cursor, Read};

use proposal_agent::render::{
    build_blocks, layout_proposal, render, Block, DocumentFormat, FontFace, CONTENT_WIDTH_MM,
    MARGIN_MM, PAGE_HEIGHT_MM,
};

/// A draft shaped like the language model's replies.
fn model_draft() -> String {
    let mut draft = String::from(
        "**Project Overview**\n\nAcme needs a modern storefront that converts visitors into \
         customers and scales with seasonal demand.\n\n**Scope of Work**\n\n",
    );
    for i in 0..12 {
        draft.push_str(&format!("- Deliverable {i}: responsive pages, checkout flow and reporting\n"));
    }
    draft.push_str("\n**Technical Approach**\n\n* Rust backend\n* React frontend\n\n");
    draft.push_str("**Timeline Estimates**\n\n- Phase 1: 2 weeks\n- Phase 2: 4 weeks\n\n");
    draft.push_str("**Budget Estimates**\n\n- Design: $3,000\n- Build: $9,000\n\n");
    draft.push_str("**Next Steps**\n\n- Review and sign\n\n\n\n***Acceptance Form***\n\nSignature: ________");
    draft
}

fn zip_entry(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut xml = String::new();
    file.read_to_string(&mut xml).unwrap();
    xml
}

// ============================================================================
// PDF
// ============================================================================

#[test]
fn test_pdf_layout_stays_inside_margins() {
    let long = model_draft().repeat(4);
    let canvas = layout_proposal("Acme - Development Proposal", &long, Some("03/08/2025"));

    assert!(canvas.page_count() > 1);
    for page in canvas.pages() {
        assert!(!page.ops.is_empty());
        for op in &page.ops {
            assert!(op.y >= MARGIN_MM);
            assert!(op.y <= PAGE_HEIGHT_MM - MARGIN_MM, "{} at {}", op.text, op.y);
            assert!(canvas.text_width(&op.text) <= CONTENT_WIDTH_MM + 0.01 || op.face != FontFace::Helvetica);
        }
    }
}

#[test]
fn test_pdf_headers_and_bullets() {
    let canvas = layout_proposal("", &model_draft(), None);
    let ops: Vec<_> = canvas.pages().iter().flat_map(|p| p.ops.iter()).collect();

    assert_eq!(ops[0].text, "Web Development Proposal");
    assert_eq!(ops[0].face, FontFace::HelveticaBold);
    assert!(ops.iter().all(|op| !op.text.starts_with("Date:")));

    let overview = ops.iter().find(|op| op.text == "Project Overview").unwrap();
    assert_eq!(overview.face, FontFace::HelveticaBold);
    assert!((overview.size - 13.0).abs() < f32::EPSILON);

    assert!(ops.iter().any(|op| op.text == "\u{2022} Rust backend"));
    assert!(ops.iter().all(|op| !op.text.contains("**")));
}

#[test]
fn test_pdf_document_is_well_formed() {
    let document =
        render(DocumentFormat::Pdf, "Acme - Development Proposal", &model_draft(), Some("03/08/2025"))
            .unwrap();

    let bytes = &document.bytes;
    assert!(bytes.starts_with(b"%PDF-1.4"));
    assert!(bytes.ends_with(b"%%EOF\n"));

    let text = String::from_utf8_lossy(bytes);
    assert!(text.contains("/BaseFont /Helvetica-Bold"));
    assert!(text.contains("/Title (Acme - Development Proposal)"));
    assert!(text.contains("(Date: 03/08/2025) Tj"));
}

// ============================================================================
// DOCX
// ============================================================================

#[test]
fn test_docx_blocks_from_model_output() {
    let blocks = build_blocks("Acme", &model_draft());

    assert_eq!(blocks[0], Block::Title("Acme".to_string()));
    assert_eq!(blocks[1], Block::Heading("Project Overview".to_string()));
    assert!(matches!(&blocks[2], Block::Paragraph(text) if text.starts_with("Acme needs")));
    assert!(blocks.contains(&Block::Bullet("Rust backend".to_string())));
    assert!(blocks.contains(&Block::Heading("Next Steps".to_string())));
}

#[test]
fn test_docx_package_contents() {
    let document = render(DocumentFormat::Docx, "Acme", &model_draft(), None).unwrap();
    assert_eq!(document.filename, "acme.docx");

    let xml = zip_entry(&document.bytes, "word/document.xml");
    assert!(xml.contains("Scope of Work"));
    assert!(xml.contains("Deliverable 11: responsive pages, checkout flow and reporting"));
    assert!(xml.contains(r#"<w:pStyle w:val="Heading2"/>"#));
    assert!(xml.contains(r#"<w:numId w:val="1"/>"#));

    let content_types = zip_entry(&document.bytes, "[Content_Types].xml");
    assert!(content_types.contains("wordprocessingml.document.main+xml"));

    let core = zip_entry(&document.bytes, "docProps/core.xml");
    assert!(core.contains("<dc:title>Acme</dc:title>"));
}
