//! Document-to-text boundary. The parser only ever sees plain text; whatever
//! reads the published document format sits behind `first_page_text` and can
//! be swapped without touching the parsing code.

use thiserror::Error;

/// Pages in a text export are separated by a form feed.
const PAGE_BREAK: char = '\u{0c}';

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document is empty")]
    Empty,
    #[error("document is not valid UTF-8 text")]
    NotText,
}

/// Return the textual content of the first page of the document. The daily
/// menu lives entirely on page one; later pages are ignored.
pub fn first_page_text(document: &[u8]) -> Result<String, ExtractError> {
    if document.is_empty() {
        return Err(ExtractError::Empty);
    }
    let text = std::str::from_utf8(document).map_err(|_| ExtractError::NotText)?;
    Ok(text.split(PAGE_BREAK).next().unwrap_or_default().to_string())
}
