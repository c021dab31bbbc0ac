//! Stored-paper inspection and DOI resolution.

use anyhow::{bail, Result};

use crate::config::Config;
use crate::error::RequestError;
use crate::models::Paper;
use crate::normalize::normalize_crossref;
use crate::sources::CrossrefResolver;
use crate::store::{PaperStore, SqliteStore};

/// Resolve a DOI through Crossref and normalize the result.
pub async fn resolve_doi(config: &Config, doi: &str) -> Result<Paper> {
    if doi.trim().is_empty() {
        return Err(RequestError::bad_input("doi must not be empty").into());
    }
    let resolver = CrossrefResolver::new(&config.sources.crossref, &config.sources.user_agent)?;
    let work = resolver.resolve(doi).await?;
    let paper = normalize_crossref(&work);
    if paper.id.is_empty() {
        bail!("Crossref returned a record without a DOI for {}", doi);
    }
    Ok(paper)
}

fn print_paper(paper: &Paper) {
    println!("id: {}", paper.id);
    println!("source: {}", paper.source.as_str());
    println!("title: {}", paper.title);
    if let Some(year) = paper.year {
        println!("year: {}", year);
    }
    if let Some(ref venue) = paper.venue {
        println!("venue: {}", venue);
    }
    if !paper.authors.is_empty() {
        let names: Vec<&str> = paper.authors.iter().map(|a| a.name.as_str()).collect();
        println!("authors: {}", names.join(", "));
    }
    if let Some(ref doi) = paper.doi {
        println!("doi: {}", doi);
    }
    if let Some(ref url) = paper.url {
        println!("url: {}", url);
    }
    if let Some(ref pdf) = paper.pdf_url {
        println!("pdf: {}", pdf);
    }
    if !paper.topics.is_empty() {
        let names: Vec<&str> = paper.topics.iter().map(|t| t.name.as_str()).collect();
        println!("topics: {}", names.join(", "));
    }
    println!("references: {}", paper.references.len());
    if let Some(ref abstract_text) = paper.abstract_text {
        println!("---");
        println!("{}", abstract_text);
    }
    if let Some(ref summary) = paper.summary {
        println!("--- summary");
        println!("{}", summary);
    }
}

pub async fn run_resolve(config: &Config, doi: &str, save: bool) -> Result<()> {
    let paper = resolve_doi(config, doi).await?;
    if save {
        let store = SqliteStore::open(&config.db).await?;
        store.upsert_paper(&paper).await?;
        store.pool().close().await;
        eprintln!("Saved {}.", paper.id);
    }
    print_paper(&paper);
    Ok(())
}

pub async fn run_list(config: &Config, limit: usize) -> Result<()> {
    let store = SqliteStore::open(&config.db).await?;
    let papers = store.list_papers(limit).await?;

    if papers.is_empty() {
        println!("No papers.");
    } else {
        println!("{:<10} {:<6} {:<50} ID", "SOURCE", "YEAR", "TITLE");
        for paper in &papers {
            let year = paper.year.map(|y| y.to_string()).unwrap_or_default();
            let title: String = paper.title.chars().take(48).collect();
            println!(
                "{:<10} {:<6} {:<50} {}",
                paper.source.as_str(),
                year,
                title,
                paper.id
            );
        }
    }

    store.pool().close().await;
    Ok(())
}

pub async fn run_get(config: &Config, id: &str, json: bool) -> Result<()> {
    let store = SqliteStore::open(&config.db).await?;
    let paper = store.get_paper(id).await?;
    store.pool().close().await;

    match paper {
        Some(paper) if json => println!("{}", serde_json::to_string_pretty(&paper)?),
        Some(paper) => print_paper(&paper),
        None => return Err(RequestError::paper_not_found(id).into()),
    }
    Ok(())
}
