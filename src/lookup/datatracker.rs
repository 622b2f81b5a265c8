//! IETF Datatracker metadata index client.

use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::lookup::LookupError;
use crate::models::{DocumentMetadata, RfcNumber, SearchHit, SearchQuery, SearchResults};

/// Default base URL of the Datatracker REST API.
pub const DATATRACKER_API_BASE: &str = "https://datatracker.ietf.org/api/v1";

/// Length at which search summaries cut off the abstract.
const SUMMARY_MAX_CHARS: usize = 200;

/// Client for the Datatracker document index
///
/// Covers the two metadata operations: substring search over document names
/// and fetching one document record by canonical identifier.
#[derive(Debug, Clone)]
pub struct DatatrackerClient {
    client: Arc<Client>,
    base_url: String,
}

impl DatatrackerClient {
    /// Create a client against the public Datatracker API
    pub fn new(client: Arc<Client>) -> Self {
        Self::with_base_url(client, DATATRACKER_API_BASE)
    }

    /// Create a client against a custom base URL (used by tests)
    pub fn with_base_url(client: Arc<Client>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Search RFCs whose name contains the query string.
    ///
    /// Returns at most `query.limit` hits even when the index sends more.
    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResults, LookupError> {
        let url = format!(
            "{}/doc/document/?type=rfc&limit={}&name__icontains={}",
            self.base_url,
            query.limit,
            urlencoding::encode(&query.query)
        );
        debug!(url = %url, "searching datatracker");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Network(format!("Failed to search datatracker: {}", e)))?;

        if !response.status().is_success() {
            return Err(LookupError::Status {
                status: response.status(),
                url,
            });
        }

        let data: DtDocumentList = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(format!("Failed to parse JSON: {}", e)))?;

        let mut hits: Vec<SearchHit> = data.objects.into_iter().map(parse_hit).collect();
        // The index is asked for at most `limit`; cap locally in case it sends more.
        hits.truncate(query.limit);

        let mut results = SearchResults::new(&query.query, hits);
        if let Some(total) = data.meta.total_count {
            results = results.total_available(total);
        }
        Ok(results)
    }

    /// Fetch the metadata record of a single document.
    pub async fn fetch_metadata(&self, number: RfcNumber) -> Result<DocumentMetadata, LookupError> {
        let url = format!("{}/doc/document/{}/", self.base_url, number.doc_name());
        debug!(url = %url, "fetching document metadata");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LookupError::Network(format!("Failed to fetch metadata: {}", e)))?;

        if !response.status().is_success() {
            return Err(LookupError::Status {
                status: response.status(),
                url,
            });
        }

        let doc: DtDocument = response
            .json()
            .await
            .map_err(|e| LookupError::Parse(format!("Failed to parse JSON: {}", e)))?;

        Ok(parse_metadata(doc))
    }
}

fn parse_hit(doc: DtDocument) -> SearchHit {
    SearchHit {
        summary: summarize_abstract(&doc.r#abstract),
        name: doc.name,
        title: doc.title,
        rev: doc.rev,
    }
}

fn parse_metadata(doc: DtDocument) -> DocumentMetadata {
    DocumentMetadata {
        name: doc.name,
        title: doc.title,
        authors: doc.authors.into_iter().map(|a| a.person).collect(),
        pages: doc.pages,
        stream: doc.stream,
        group: doc.group,
        std_level: doc.std_level,
        intended_std_level: doc.intended_std_level,
        rfc_number: doc.rfc,
        rev: doc.rev,
        r#abstract: doc.r#abstract,
    }
}

/// First `SUMMARY_MAX_CHARS` characters of the abstract plus "...", `None`
/// when the index had no abstract. The ellipsis is appended even for short
/// abstracts.
fn summarize_abstract(text: &str) -> Option<String> {
    if text.is_empty() {
        return None;
    }
    let end = text
        .char_indices()
        .nth(SUMMARY_MAX_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    Some(format!("{}...", &text[..end]))
}

// ===== Datatracker API Types =====

#[derive(Debug, Deserialize)]
struct DtDocumentList {
    #[serde(default)]
    objects: Vec<DtDocument>,
    #[serde(default)]
    meta: DtMeta,
}

#[derive(Debug, Default, Deserialize)]
struct DtMeta {
    #[serde(default)]
    total_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DtDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    rev: String,
    #[serde(default)]
    r#abstract: String,
    #[serde(default)]
    pages: Option<u64>,
    #[serde(default)]
    authors: Vec<DtAuthor>,
    #[serde(default)]
    stream: Option<String>,
    #[serde(default)]
    group: Option<String>,
    #[serde(default)]
    std_level: Option<String>,
    #[serde(default)]
    intended_std_level: Option<String>,
    // The index has sent this as a bare number and as a string over time.
    #[serde(default, deserialize_with = "de_string_or_number")]
    rfc: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DtAuthor {
    #[serde(default)]
    person: String,
}

fn de_string_or_number<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(de)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
