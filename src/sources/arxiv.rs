//! arXiv Atom feed search.
//!
//! Sends `GET {base_url}?search_query=all:<q>&start=0&max_results=<n>&sortBy=relevance`
//! and parses the Atom response with `quick-xml`. The parser is a small
//! state machine over reader events, so a feed with zero, one, or many
//! `<entry>` elements always produces a list.

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::{fetch_text, http_client, RawPayload, SourceAdapter};
use crate::config::ArxivConfig;
use crate::error::SourceError;
use crate::models::SearchFilters;
use crate::vendor::{ArxivEntry, ArxivFeed, ArxivLink};

pub const SOURCE_NAME: &str = "arxiv";

/// The export API caps a single page at this many entries.
pub const MAX_RESULTS: u32 = 100;

pub struct ArxivAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivAdapter {
    pub fn new(config: &ArxivConfig, user_agent: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(SOURCE_NAME, user_agent, config.per_request_timeout_secs)?,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl SourceAdapter for ArxivAdapter {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    /// The arXiv query language has no year or open-access predicates, so
    /// `filters` is ignored.
    async fn search(
        &self,
        query: &str,
        _filters: &SearchFilters,
        limit: u32,
    ) -> Result<RawPayload, SourceError> {
        let request = self
            .client
            .get(&self.base_url)
            .query(&build_query_params(query, limit));

        let body = fetch_text(SOURCE_NAME, request).await?;
        let feed = parse_feed(&body).map_err(|e| SourceError::unavailable(SOURCE_NAME, e))?;
        Ok(RawPayload::Arxiv(feed))
    }
}

pub fn build_query_params(query: &str, limit: u32) -> Vec<(String, String)> {
    vec![
        ("search_query".to_string(), format!("all:{}", query)),
        ("start".to_string(), "0".to_string()),
        ("max_results".to_string(), limit.min(MAX_RESULTS).to_string()),
        ("sortBy".to_string(), "relevance".to_string()),
    ]
}

/// Text-bearing elements the parser keeps.
#[derive(Debug, Clone, Copy)]
enum Field {
    TotalResults,
    Id,
    Title,
    Summary,
    Published,
    Updated,
    AuthorName,
    Doi,
    JournalRef,
    Comment,
}

fn field_for(local_name: &[u8], in_entry: bool, in_author: bool) -> Option<Field> {
    if in_author {
        return match local_name {
            b"name" => Some(Field::AuthorName),
            _ => None,
        };
    }
    if !in_entry {
        return match local_name {
            b"totalResults" => Some(Field::TotalResults),
            _ => None,
        };
    }
    match local_name {
        b"id" => Some(Field::Id),
        b"title" => Some(Field::Title),
        b"summary" => Some(Field::Summary),
        b"published" => Some(Field::Published),
        b"updated" => Some(Field::Updated),
        b"doi" => Some(Field::Doi),
        b"journal_ref" => Some(Field::JournalRef),
        b"comment" => Some(Field::Comment),
        _ => None,
    }
}

/// Parse an Atom feed into [`ArxivFeed`].
///
/// Namespace prefixes are ignored (`arxiv:doi` and `doi` are the same
/// element). Unknown elements are skipped.
pub fn parse_feed(xml: &str) -> Result<ArxivFeed, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut feed = ArxivFeed::default();
    let mut entry: Option<ArxivEntry> = None;
    let mut author: Option<String> = None;
    let mut field: Option<Field> = None;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => entry = Some(ArxivEntry::default()),
                b"author" if entry.is_some() => author = Some(String::new()),
                b"link" | b"category" | b"primary_category" => {
                    if let Some(en) = entry.as_mut() {
                        apply_attributes(en, &e)?;
                    }
                }
                other => {
                    field = field_for(other, entry.is_some(), author.is_some());
                    text.clear();
                }
            },
            Ok(Event::Empty(e)) => {
                if let Some(en) = entry.as_mut() {
                    apply_attributes(en, &e)?;
                }
            }
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    let unescaped = t.unescape().map_err(|e| e.to_string())?;
                    text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(c)) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(en) = entry.take() {
                        feed.entries.push(en);
                    }
                    author = None;
                }
                b"author" => {
                    if let (Some(en), Some(name)) = (entry.as_mut(), author.take()) {
                        let name = name.trim();
                        if !name.is_empty() {
                            en.authors.push(name.to_string());
                        }
                    }
                }
                _ => {
                    if let Some(f) = field.take() {
                        let value = std::mem::take(&mut text);
                        assign(f, value, &mut feed, entry.as_mut(), author.as_mut());
                    }
                }
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "invalid Atom feed at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    Ok(feed)
}

fn assign(
    field: Field,
    value: String,
    feed: &mut ArxivFeed,
    entry: Option<&mut ArxivEntry>,
    author: Option<&mut String>,
) {
    if let Field::TotalResults = field {
        feed.total_results = value.trim().parse().ok();
        return;
    }
    if let Field::AuthorName = field {
        if let Some(a) = author {
            a.push_str(&value);
        }
        return;
    }
    let Some(entry) = entry else { return };
    let slot = match field {
        Field::Id => &mut entry.id,
        Field::Title => &mut entry.title,
        Field::Summary => &mut entry.summary,
        Field::Published => &mut entry.published,
        Field::Updated => &mut entry.updated,
        Field::Doi => &mut entry.doi,
        Field::JournalRef => &mut entry.journal_ref,
        Field::Comment => &mut entry.comment,
        Field::TotalResults | Field::AuthorName => return,
    };
    *slot = Some(value);
}

fn apply_attributes(entry: &mut ArxivEntry, e: &BytesStart) -> Result<(), String> {
    match e.local_name().as_ref() {
        b"link" => {
            let mut link = ArxivLink::default();
            for attr in e.attributes() {
                let attr = attr.map_err(|e| e.to_string())?;
                let value = attr
                    .unescape_value()
                    .map_err(|e| e.to_string())?
                    .into_owned();
                match attr.key.local_name().as_ref() {
                    b"href" => link.href = Some(value),
                    b"rel" => link.rel = Some(value),
                    b"type" => link.link_type = Some(value),
                    b"title" => link.title = Some(value),
                    _ => {}
                }
            }
            entry.links.push(link);
        }
        b"category" => {
            if let Some(term) = attribute(e, b"term")? {
                entry.categories.push(term);
            }
        }
        b"primary_category" => entry.primary_category = attribute(e, b"term")?,
        _ => {}
    }
    Ok(())
}

fn attribute(e: &BytesStart, key: &[u8]) -> Result<Option<String>, String> {
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.local_name().as_ref() == key {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
