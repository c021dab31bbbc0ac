//! Schema normalization: vendor payload → canonical [`Paper`].
//!
//! Every function here is pure and deterministic. Normalization never fails:
//! a missing optional field becomes `None`, and a malformed substructure has
//! already degraded to its empty form while the vendor struct was parsed
//! (see [`crate::vendor`]).
//!
//! | Source | `id` | `source_specific_id` |
//! |--------|------|----------------------|
//! | OpenAlex | `id`, else `ids.openalex` | same as `id` |
//! | arXiv | entry `<id>` | segment after `/abs/`, else the full id |
//! | Crossref | `DOI` | `DOI` |

use std::collections::{BTreeMap, HashSet};

use crate::models::{Author, Paper, PaperSource, Topic};
use crate::vendor::{ArxivEntry, CrossrefWork, OpenAlexWork};

/// A single vendor record tagged with the source it came from.
#[derive(Debug, Clone)]
pub enum VendorPayload {
    OpenAlex(OpenAlexWork),
    Arxiv(ArxivEntry),
    Crossref(CrossrefWork),
}

pub fn normalize(payload: &VendorPayload) -> Paper {
    match payload {
        VendorPayload::OpenAlex(w) => normalize_openalex(w),
        VendorPayload::Arxiv(e) => normalize_arxiv(e),
        VendorPayload::Crossref(w) => normalize_crossref(w),
    }
}

pub fn normalize_openalex(w: &OpenAlexWork) -> Paper {
    let id = non_empty(w.id.as_deref())
        .or_else(|| non_empty(w.ids.as_ref().and_then(|ids| ids.openalex.as_deref())))
        .unwrap_or_default();

    let location = w.primary_location.as_ref();
    let location_source = location.and_then(|l| l.source.as_ref());

    let url = non_empty(location_source.and_then(|s| s.homepage_url.as_deref()))
        .or_else(|| non_empty(location.and_then(|l| l.landing_page_url.as_deref())))
        .or_else(|| non_empty(w.alternate_host_venues.first().and_then(|v| v.url.as_deref())));

    let venue = non_empty(location_source.and_then(|s| s.display_name.as_deref()))
        .or_else(|| non_empty(w.host_venue.as_ref().and_then(|v| v.display_name.as_deref())));

    let abstract_text = match &w.abstract_inverted_index {
        Some(index) if !index.is_empty() => Some(invert_abstract(index)),
        _ => non_empty(w.abstract_text.as_deref()),
    };

    let mut paper = Paper::new(
        id.clone(),
        PaperSource::BibliographicDb,
        w.title
            .as_deref()
            .or(w.display_name.as_deref())
            .unwrap_or_default(),
    );
    paper.abstract_text = abstract_text;
    paper.doi = non_empty(w.doi.as_deref())
        .or_else(|| non_empty(w.ids.as_ref().and_then(|ids| ids.doi.as_deref())));
    paper.source_specific_id = non_empty(Some(&id));
    paper.year = w
        .publication_year
        .or_else(|| w.publication_date.as_deref().and_then(year_prefix));
    paper.venue = venue;
    paper.url = url;
    paper.pdf_url = non_empty(location.and_then(|l| l.pdf_url.as_deref()));
    paper.topics = w
        .topics
        .iter()
        .filter_map(|t| {
            non_empty(t.display_name.as_deref()).map(|name| Topic {
                id: non_empty(t.id.as_deref()),
                name,
                score: t.score,
            })
        })
        .collect();
    paper.authors = w
        .authorships
        .iter()
        .filter_map(|a| a.author.as_ref())
        .filter_map(|a| {
            non_empty(a.display_name.as_deref()).map(|name| Author {
                name,
                external_id: non_empty(a.id.as_deref()),
            })
        })
        .collect();
    paper.references = dedup_ordered(w.referenced_works.iter().map(String::as_str));
    paper
}

pub fn normalize_arxiv(e: &ArxivEntry) -> Paper {
    let id = e.id.as_deref().map(str::trim).unwrap_or_default().to_string();
    let short_id = match id.split_once("/abs/") {
        Some((_, rest)) if !rest.is_empty() => rest.to_string(),
        _ => id.clone(),
    };

    let pdf_url = e
        .links
        .iter()
        .find(|l| {
            l.title.as_deref() == Some("pdf") || l.link_type.as_deref() == Some("application/pdf")
        })
        .and_then(|l| non_empty(l.href.as_deref()));

    let url = e
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("alternate"))
        .and_then(|l| non_empty(l.href.as_deref()))
        .or_else(|| non_empty(Some(&id)));

    let mut paper = Paper::new(
        id.clone(),
        PaperSource::PreprintFeed,
        collapse_ws(e.title.as_deref().unwrap_or_default()),
    );
    paper.abstract_text = non_empty(Some(&collapse_ws(e.summary.as_deref().unwrap_or_default())));
    paper.doi = non_empty(e.doi.as_deref());
    paper.source_specific_id = non_empty(Some(&short_id));
    paper.year = e.published.as_deref().and_then(year_prefix);
    paper.venue = non_empty(e.journal_ref.as_deref());
    paper.url = url;
    paper.pdf_url = pdf_url;
    paper.topics = dedup_ordered(e.categories.iter().map(String::as_str))
        .into_iter()
        .map(|term| Topic {
            id: None,
            name: term,
            score: None,
        })
        .collect();
    paper.authors = e
        .authors
        .iter()
        .filter_map(|name| non_empty(Some(name)))
        .map(|name| Author {
            name,
            external_id: None,
        })
        .collect();
    paper
}

pub fn normalize_crossref(w: &CrossrefWork) -> Paper {
    let doi = non_empty(w.doi.as_deref());
    let year = [w.issued.as_ref(), w.published.as_ref()]
        .into_iter()
        .flatten()
        .find_map(|d| d.date_parts.first().and_then(|parts| parts.first()).copied());

    let mut paper = Paper::new(
        doi.clone().unwrap_or_default(),
        PaperSource::ReferenceResolver,
        w.title.first().map(|t| collapse_ws(t)).unwrap_or_default(),
    );
    paper.abstract_text = w
        .abstract_text
        .as_deref()
        .map(strip_markup)
        .and_then(|s| non_empty(Some(&s)));
    paper.doi = doi.clone();
    paper.source_specific_id = doi;
    paper.year = year;
    paper.venue = non_empty(w.container_title.first().map(String::as_str));
    paper.url = non_empty(w.url.as_deref());
    paper.pdf_url = w
        .link
        .iter()
        .find(|l| l.content_type.as_deref() == Some("application/pdf"))
        .and_then(|l| non_empty(l.url.as_deref()));
    paper.topics = w
        .subject
        .iter()
        .filter_map(|s| non_empty(Some(s)))
        .map(|name| Topic {
            id: None,
            name,
            score: None,
        })
        .collect();
    paper.authors = w
        .author
        .iter()
        .filter_map(|a| {
            let joined = [a.given.as_deref(), a.family.as_deref()]
                .into_iter()
                .flatten()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            non_empty(Some(&joined))
                .or_else(|| non_empty(a.name.as_deref()))
                .map(|name| Author {
                    name,
                    external_id: non_empty(a.orcid.as_deref()),
                })
        })
        .collect();
    paper.references = dedup_ordered(w.reference.iter().filter_map(|r| r.doi.as_deref()));
    paper
}

/// Rebuild flat text from an inverted abstract index.
///
/// Collects every `(position, word)` pair, sorts ascending by position, and
/// joins with single spaces. The sort is stable over the map's key order, so
/// duplicate positions resolve lexicographically by word.
pub fn invert_abstract(index: &BTreeMap<String, Vec<u32>>) -> String {
    let mut positions: Vec<(u32, &str)> = index
        .iter()
        .flat_map(|(word, slots)| slots.iter().map(move |&p| (p, word.as_str())))
        .collect();
    positions.sort_by_key(|(p, _)| *p);
    positions
        .into_iter()
        .map(|(_, w)| w)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Year from the first four characters of an ISO-8601-like date.
fn year_prefix(date: &str) -> Option<i32> {
    date.trim().get(..4)?.parse().ok()
}

fn non_empty<S: AsRef<str>>(s: Option<S>) -> Option<String> {
    let s = s?;
    let trimmed = s.as_ref().trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn dedup_ordered<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .map(str::trim)
        .filter(|s| !s.is_empty() && seen.insert(*s))
        .map(str::to_string)
        .collect()
}

/// Drop `<tag>` markup (Crossref abstracts are JATS XML fragments).
/// Block-level tags become a word break; inline tags vanish.
fn strip_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut tag = String::new();
    let mut in_tag = false;
    for c in s.chars() {
        match c {
            '<' if !in_tag => {
                in_tag = true;
                tag.clear();
            }
            '>' if in_tag => {
                in_tag = false;
                if is_block_tag(&tag) {
                    out.push(' ');
                }
            }
            _ if in_tag => tag.push(c),
            _ => out.push(c),
        }
    }
    collapse_ws(&out)
}

fn is_block_tag(raw: &str) -> bool {
    let name = raw
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default();
    let local = name.rsplit(':').next().unwrap_or(name);
    matches!(
        local,
        "p" | "sec" | "title" | "list" | "list-item" | "br" | "abstract" | "label"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn openalex_fixture() -> OpenAlexWork {
        serde_json::from_value(json!({
            "id": "https://openalex.org/W2741809807",
            "doi": "https://doi.org/10.7717/peerj.4375",
            "title": "The state of OA",
            "publication_year": 2018,
            "publication_date": "2018-02-13",
            "primary_location": {
                "landing_page_url": "https://doi.org/10.7717/peerj.4375",
                "pdf_url": "https://peerj.com/articles/4375.pdf",
                "source": {"display_name": "PeerJ", "homepage_url": null}
            },
            "authorships": [
                {"author": {"id": "https://openalex.org/A1", "display_name": "Heather Piwowar"}},
                {"author": {"display_name": "Jason Priem"}},
                {"author": null}
            ],
            "topics": [{"id": "https://openalex.org/T1", "display_name": "Open access", "score": 0.99}],
            "referenced_works": ["https://openalex.org/W1", "https://openalex.org/W2", "https://openalex.org/W1"],
            "abstract_inverted_index": {"deep": [0], "learning": [1], "rocks": [2]}
        }))
        .unwrap()
    }

    #[test]
    fn test_inverted_abstract_roundtrip() {
        let mut idx = BTreeMap::new();
        idx.insert("deep".to_string(), vec![0]);
        idx.insert("learning".to_string(), vec![1]);
        idx.insert("rocks".to_string(), vec![2]);
        assert_eq!(invert_abstract(&idx), "deep learning rocks");
    }

    #[test]
    fn test_inverted_abstract_repeated_words_and_ties() {
        let mut idx = BTreeMap::new();
        idx.insert("the".to_string(), vec![0, 2]);
        idx.insert("cat".to_string(), vec![1]);
        idx.insert("hat".to_string(), vec![3]);
        assert_eq!(invert_abstract(&idx), "the cat the hat");

        let mut tied = BTreeMap::new();
        tied.insert("zeta".to_string(), vec![0]);
        tied.insert("alpha".to_string(), vec![0]);
        assert_eq!(invert_abstract(&tied), "alpha zeta");
    }

    #[test]
    fn test_openalex_mapping() {
        let p = normalize_openalex(&openalex_fixture());
        assert_eq!(p.id, "https://openalex.org/W2741809807");
        assert_eq!(p.source, PaperSource::BibliographicDb);
        assert_eq!(p.source_specific_id.as_deref(), Some(p.id.as_str()));
        assert_eq!(p.abstract_text.as_deref(), Some("deep learning rocks"));
        assert_eq!(p.year, Some(2018));
        assert_eq!(p.venue.as_deref(), Some("PeerJ"));
        assert_eq!(p.url.as_deref(), Some("https://doi.org/10.7717/peerj.4375"));
        assert_eq!(p.pdf_url.as_deref(), Some("https://peerj.com/articles/4375.pdf"));
        assert_eq!(p.authors.len(), 2);
        assert_eq!(p.authors[0].external_id.as_deref(), Some("https://openalex.org/A1"));
        assert_eq!(p.authors[1].external_id, None);
        assert_eq!(p.topics[0].name, "Open access");
        assert_eq!(
            p.references,
            vec!["https://openalex.org/W1", "https://openalex.org/W2"]
        );
        assert!(p.summary.is_none());
    }

    #[test]
    fn test_openalex_id_fallback_and_date_year() {
        let w: OpenAlexWork = serde_json::from_value(json!({
            "ids": {"openalex": "https://openalex.org/W9", "doi": "https://doi.org/10.1/x"},
            "display_name": "Fallback title",
            "publication_date": "2021-07-01",
            "abstract": "Flat abstract."
        }))
        .unwrap();
        let p = normalize_openalex(&w);
        assert_eq!(p.id, "https://openalex.org/W9");
        assert_eq!(p.title, "Fallback title");
        assert_eq!(p.doi.as_deref(), Some("https://doi.org/10.1/x"));
        assert_eq!(p.year, Some(2021));
        assert_eq!(p.abstract_text.as_deref(), Some("Flat abstract."));
    }

    #[test]
    fn test_openalex_missing_fields_are_absent() {
        let p = normalize_openalex(&OpenAlexWork::default());
        assert_eq!(p.id, "");
        assert_eq!(p.title, "");
        assert!(p.abstract_text.is_none());
        assert!(p.year.is_none());
        assert!(p.url.is_none());
        assert!(p.source_specific_id.is_none());
        assert!(p.authors.is_empty());
        assert!(p.references.is_empty());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let payload = VendorPayload::OpenAlex(openalex_fixture());
        let a = normalize(&payload);
        let b = normalize(&payload);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_vec(&a).unwrap(),
            serde_json::to_vec(&b).unwrap()
        );
    }

    fn arxiv_fixture() -> ArxivEntry {
        use crate::vendor::ArxivLink;
        ArxivEntry {
            id: Some("http://arxiv.org/abs/1706.03762v7".to_string()),
            title: Some("  Attention Is All\n   You Need ".to_string()),
            summary: Some("\n The dominant sequence transduction models...\n".to_string()),
            published: Some("2017-06-12T17:57:34Z".to_string()),
            authors: vec!["Ashish Vaswani".to_string(), "Noam Shazeer".to_string()],
            links: vec![
                ArxivLink {
                    href: Some("http://arxiv.org/abs/1706.03762v7".to_string()),
                    rel: Some("alternate".to_string()),
                    link_type: Some("text/html".to_string()),
                    title: None,
                },
                ArxivLink {
                    href: Some("http://arxiv.org/pdf/1706.03762v7".to_string()),
                    rel: Some("related".to_string()),
                    link_type: Some("application/pdf".to_string()),
                    title: Some("pdf".to_string()),
                },
                ArxivLink {
                    href: Some("http://example.org/second.pdf".to_string()),
                    rel: Some("related".to_string()),
                    link_type: Some("application/pdf".to_string()),
                    title: None,
                },
            ],
            categories: vec!["cs.CL".to_string(), "cs.LG".to_string(), "cs.CL".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_arxiv_mapping() {
        let p = normalize_arxiv(&arxiv_fixture());
        assert_eq!(p.id, "http://arxiv.org/abs/1706.03762v7");
        assert_eq!(p.source, PaperSource::PreprintFeed);
        assert_eq!(p.source_specific_id.as_deref(), Some("1706.03762v7"));
        assert_eq!(p.title, "Attention Is All You Need");
        assert_eq!(
            p.abstract_text.as_deref(),
            Some("The dominant sequence transduction models...")
        );
        assert_eq!(p.year, Some(2017));
        // First PDF rendition wins.
        assert_eq!(p.pdf_url.as_deref(), Some("http://arxiv.org/pdf/1706.03762v7"));
        assert_eq!(p.url.as_deref(), Some("http://arxiv.org/abs/1706.03762v7"));
        assert_eq!(p.authors.len(), 2);
        assert_eq!(p.topics.len(), 2);
    }

    #[test]
    fn test_arxiv_without_abs_segment_or_valid_date() {
        let e = ArxivEntry {
            id: Some("urn:custom:42".to_string()),
            title: Some("T".to_string()),
            published: Some("n/a".to_string()),
            ..Default::default()
        };
        let p = normalize_arxiv(&e);
        assert_eq!(p.source_specific_id.as_deref(), Some("urn:custom:42"));
        assert_eq!(p.year, None);
        assert_eq!(p.url.as_deref(), Some("urn:custom:42"));
        assert!(p.pdf_url.is_none());
        assert!(p.abstract_text.is_none());
    }

    #[test]
    fn test_crossref_mapping() {
        let w: CrossrefWork = serde_json::from_value(json!({
            "DOI": "10.1000/test",
            "title": ["Crossref Title"],
            "container-title": ["Journal of Testing"],
            "abstract": "<jats:p>Hello <jats:italic>world</jats:italic>.</jats:p>",
            "author": [
                {"given": "Ada", "family": "Lovelace", "ORCID": "https://orcid.org/0000-0001"},
                {"name": "The Consortium"}
            ],
            "issued": {"date-parts": [[2021, 6, 1]]},
            "URL": "https://doi.org/10.1000/test",
            "link": [
                {"URL": "https://example.org/a.xml", "content-type": "text/xml"},
                {"URL": "https://example.org/a.pdf", "content-type": "application/pdf"}
            ],
            "subject": ["Computer Science"],
            "reference": [{"key": "r1", "DOI": "10.1000/ref1"}, {"key": "r2", "unstructured": "Some book"}]
        }))
        .unwrap();
        let p = normalize_crossref(&w);
        assert_eq!(p.id, "10.1000/test");
        assert_eq!(p.source, PaperSource::ReferenceResolver);
        assert_eq!(p.title, "Crossref Title");
        assert_eq!(p.abstract_text.as_deref(), Some("Hello world."));
        assert_eq!(p.year, Some(2021));
        assert_eq!(p.venue.as_deref(), Some("Journal of Testing"));
        assert_eq!(p.pdf_url.as_deref(), Some("https://example.org/a.pdf"));
        assert_eq!(p.authors[0].name, "Ada Lovelace");
        assert_eq!(p.authors[1].name, "The Consortium");
        assert_eq!(p.references, vec!["10.1000/ref1"]);
    }

    #[test]
    fn test_strip_markup_keeps_inline_text_tight() {
        assert_eq!(
            strip_markup("<jats:title>Abstract</jats:title><jats:p>A <jats:bold>bold</jats:bold>, claim.</jats:p><jats:p>Next</jats:p>"),
            "Abstract A bold, claim. Next"
        );
        assert_eq!(strip_markup("line<br/>break"), "line break");
        assert_eq!(strip_markup("H<sub>2</sub>O"), "H2O");
    }
}
