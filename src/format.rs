//! Markdown rendering of lookup results.
//!
//! Pure functions with no error paths; failures were already turned into
//! error text by the dispatcher before anything reaches this module. The
//! layouts are fixed and covered by exact-output tests.

use crate::models::{DocumentMetadata, RfcNumber, SearchResults};

/// Longest full-text body returned to a caller, in characters.
pub const MAX_TEXT_CHARS: usize = 50_000;

/// Appended to a full-text body that was cut at [`MAX_TEXT_CHARS`].
pub const TRUNCATION_MARKER: &str = "\n\n[... content truncated for length ...]";

/// Shown for a search hit whose document has no abstract.
pub const NO_ABSTRACT_PLACEHOLDER: &str = "No abstract available";

/// Render a metadata record.
///
/// Heading order is fixed: title line, Metadata section, Abstract section.
/// Absent fields render empty; absent authors render as "N/A".
pub fn metadata(meta: &DocumentMetadata) -> String {
    let authors = if meta.authors.is_empty() {
        "N/A".to_string()
    } else {
        meta.authors.join(", ")
    };
    let pages = meta.pages.map(|p| p.to_string()).unwrap_or_default();

    format!(
        "\n# {name}: {title}\n\n\
         ## Metadata\n\
         - **Authors**: {authors}\n\
         - **Pages**: {pages}\n\
         - **Stream**: {stream}\n\
         - **Group**: {group}\n\
         - **Standard Level**: {level}\n\
         - **RFC Number**: {rfc}\n\n\
         ## Abstract\n\
         {abstract_}\n",
        name = meta.name.to_uppercase(),
        title = meta.title,
        authors = authors,
        pages = pages,
        stream = meta.stream.as_deref().unwrap_or(""),
        group = meta.group.as_deref().unwrap_or(""),
        level = meta.effective_std_level().unwrap_or(""),
        rfc = meta.rfc_number.as_deref().unwrap_or(""),
        abstract_ = meta.r#abstract,
    )
}

/// Render a search result list: count line, then one entry per hit with the
/// document name in bold.
pub fn search_results(results: &SearchResults) -> String {
    let entries: Vec<String> = results
        .hits
        .iter()
        .map(|hit| {
            format!(
                "**{}** - {}\n{}",
                hit.name,
                hit.title,
                hit.summary.as_deref().unwrap_or(NO_ABSTRACT_PLACEHOLDER)
            )
        })
        .collect();

    format!(
        "Found {} RFCs matching '{}':\n\n{}",
        results.hits.len(),
        results.query,
        entries.join("\n\n")
    )
}

/// Cut a text body at [`MAX_TEXT_CHARS`] characters, appending the
/// truncation marker when anything was dropped.
pub fn clip_body(body: &str) -> String {
    match body.char_indices().nth(MAX_TEXT_CHARS) {
        Some((idx, _)) => format!("{}{}", &body[..idx], TRUNCATION_MARKER),
        None => body.to_string(),
    }
}

/// Render a full-text body behind its preamble line, cutting it at
/// [`MAX_TEXT_CHARS`] characters.
pub fn document_text(number: RfcNumber, body: &str) -> String {
    format!("RFC {} Full Text:\n\n{}", number, clip_body(body))
}
