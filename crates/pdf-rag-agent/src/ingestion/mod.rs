//! PDF text and metadata extraction

mod cleanup;
mod extractor;

pub use cleanup::cleanup_pdf_text;
pub use extractor::{
    discover_pdfs, extract_metadata, extract_text, DocumentExtractor, ExtractedPdf, PdfExtractor,
};
