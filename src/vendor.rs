//! Typed vendor payload shapes.
//!
//! Each source's response is parsed into explicit structs whose fields are
//! all optional or default-empty. Fields use the [`lenient`] and
//! [`lenient_vec`] helpers so that a value of the wrong JSON type degrades to
//! the field's empty form instead of failing the whole payload.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Deserialize `T`, falling back to `T::default()` on any shape mismatch.
pub(crate) fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Deserialize a list element by element, dropping elements that do not fit
/// `T`. A non-array value yields an empty list.
pub(crate) fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

// ============ OpenAlex ============

/// One page of `GET /works` results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexResponse {
    #[serde(default, deserialize_with = "lenient")]
    pub meta: Option<OpenAlexMeta>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub results: Vec<OpenAlexWork>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexMeta {
    #[serde(default, deserialize_with = "lenient")]
    pub count: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub page: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexWork {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub ids: Option<OpenAlexIds>,
    #[serde(default, deserialize_with = "lenient")]
    pub doi: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(rename = "abstract", default, deserialize_with = "lenient")]
    pub abstract_text: Option<String>,
    /// Word → positions it occupies in the original abstract.
    #[serde(default, deserialize_with = "lenient")]
    pub abstract_inverted_index: Option<BTreeMap<String, Vec<u32>>>,
    #[serde(default, deserialize_with = "lenient")]
    pub publication_year: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    pub publication_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub primary_location: Option<OpenAlexLocation>,
    #[serde(default, deserialize_with = "lenient")]
    pub host_venue: Option<OpenAlexSource>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub alternate_host_venues: Vec<OpenAlexHostVenue>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub authorships: Vec<OpenAlexAuthorship>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub topics: Vec<OpenAlexTopic>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub referenced_works: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub open_access: Option<OpenAlexOpenAccess>,
    #[serde(default, deserialize_with = "lenient")]
    pub cited_by_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexIds {
    #[serde(default, deserialize_with = "lenient")]
    pub openalex: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub doi: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexLocation {
    #[serde(default, deserialize_with = "lenient")]
    pub landing_page_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub pdf_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub source: Option<OpenAlexSource>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexSource {
    #[serde(default, deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub homepage_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexHostVenue {
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexAuthorship {
    #[serde(default, deserialize_with = "lenient")]
    pub author: Option<OpenAlexAuthor>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexAuthor {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexTopic {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenAlexOpenAccess {
    #[serde(default, deserialize_with = "lenient")]
    pub is_oa: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub oa_url: Option<String>,
}

// ============ arXiv ============

/// A parsed Atom feed. `entries` is always a list, whether the feed held
/// zero, one, or many `<entry>` elements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArxivFeed {
    pub total_results: Option<u64>,
    pub entries: Vec<ArxivEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArxivEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub published: Option<String>,
    pub updated: Option<String>,
    pub authors: Vec<String>,
    pub links: Vec<ArxivLink>,
    pub categories: Vec<String>,
    pub primary_category: Option<String>,
    pub doi: Option<String>,
    pub journal_ref: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArxivLink {
    pub href: Option<String>,
    pub rel: Option<String>,
    #[serde(rename = "type")]
    pub link_type: Option<String>,
    pub title: Option<String>,
}

// ============ Crossref ============

/// Envelope of `GET /works/{doi}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossrefEnvelope {
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub message: Option<CrossrefWork>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossrefWork {
    #[serde(rename = "DOI", default, deserialize_with = "lenient")]
    pub doi: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub title: Vec<String>,
    #[serde(rename = "container-title", default, deserialize_with = "lenient_vec")]
    pub container_title: Vec<String>,
    /// JATS-flavoured markup, e.g. `<jats:p>…</jats:p>`.
    #[serde(rename = "abstract", default, deserialize_with = "lenient")]
    pub abstract_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub author: Vec<CrossrefAuthor>,
    #[serde(default, deserialize_with = "lenient")]
    pub issued: Option<CrossrefDate>,
    #[serde(default, deserialize_with = "lenient")]
    pub published: Option<CrossrefDate>,
    #[serde(rename = "URL", default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub link: Vec<CrossrefLink>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub subject: Vec<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    pub reference: Vec<CrossrefReference>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossrefAuthor {
    #[serde(default, deserialize_with = "lenient")]
    pub given: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub family: Option<String>,
    /// Organisational authors carry only `name`.
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(rename = "ORCID", default, deserialize_with = "lenient")]
    pub orcid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossrefDate {
    #[serde(rename = "date-parts", default, deserialize_with = "lenient_vec")]
    pub date_parts: Vec<Vec<i32>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossrefLink {
    #[serde(rename = "URL", default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(rename = "content-type", default, deserialize_with = "lenient")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrossrefReference {
    #[serde(rename = "DOI", default, deserialize_with = "lenient")]
    pub doi: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub unstructured: Option<String>,
}
