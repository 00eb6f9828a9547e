//! Per-page PDF text extraction.
//!
//! Pages that fail to decode are skipped with a warning rather than failing
//! the whole ingest; a document with zero extractable text is rejected.

use lopdf::Document;
use papertalk_core::error::RetrievalError;
use tracing::warn;

/// Extract text from PDF bytes, one string per page, in page order.
///
/// Returns `EmptyInput` when the bytes are empty and `Extraction` when the
/// document cannot be parsed at all. Pages whose content streams fail to
/// decode are skipped.
pub fn pdf_pages(bytes: &[u8]) -> Result<Vec<String>, RetrievalError> {
    if bytes.is_empty() {
        return Err(RetrievalError::EmptyInput(
            "no bytes received for ingestion".into(),
        ));
    }

    let doc = Document::load_mem(bytes)
        .map_err(|e| RetrievalError::Extraction(format!("failed to parse PDF: {e}")))?;

    let mut pages = Vec::new();
    for (page_number, _) in doc.get_pages() {
        match doc.extract_text(&[page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => {
                warn!(page = page_number, error = %e, "Skipping undecodable PDF page");
                pages.push(String::new());
            }
        }
    }

    if pages.iter().all(|p| p.trim().is_empty()) {
        return Err(RetrievalError::EmptyInput(
            "document yielded no extractable text".into(),
        ));
    }

    Ok(pages)
}

/// Build a small single- or multi-page PDF for tests, one page per entry.
#[cfg(test)]
pub(crate) fn test_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).expect("serialize test PDF");
    buf
}
