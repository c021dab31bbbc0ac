//! Citation graph construction.
//!
//! [`build_graph`] turns a list of papers into nodes and directed
//! `citing → cited` edges. References that do not resolve to a paper in the
//! input become stub nodes labelled by the last segment of their id
//! (`https://openalex.org/W123` → `W123`).

use serde::Serialize;
use std::collections::HashMap;

use crate::models::Paper;

/// Node labels are cut to this many characters.
pub const LABEL_MAX_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    /// Referenced but not present in the input.
    pub stub: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CitationGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl CitationGraph {
    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Build the graph. Node ids are unique; edges are emitted once per
/// `(paper, reference)` pair, so duplicate citations produce duplicate
/// edges. Papers and references without an id are left out.
pub fn build_graph(papers: &[Paper]) -> CitationGraph {
    let mut graph = CitationGraph::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for paper in papers {
        if paper.id.trim().is_empty() {
            tracing::warn!(title = %paper.title, "skipping paper without id in citation graph");
            continue;
        }
        let label = paper_label(paper);
        match index.get(&paper.id) {
            Some(&i) => {
                let node = &mut graph.nodes[i];
                if node.stub {
                    node.label = label;
                    node.stub = false;
                }
            }
            None => {
                index.insert(paper.id.clone(), graph.nodes.len());
                graph.nodes.push(GraphNode {
                    id: paper.id.clone(),
                    label,
                    stub: false,
                });
            }
        }

        for reference in paper.references.iter().filter(|r| !r.trim().is_empty()) {
            if !index.contains_key(reference) {
                index.insert(reference.clone(), graph.nodes.len());
                graph.nodes.push(GraphNode {
                    id: reference.clone(),
                    label: stub_label(reference),
                    stub: true,
                });
            }
            graph.edges.push(GraphEdge {
                id: format!("{}->{}", paper.id, reference),
                source: paper.id.clone(),
                target: reference.clone(),
            });
        }
    }

    graph
}

fn paper_label(paper: &Paper) -> String {
    let title = paper.title.trim();
    if title.is_empty() {
        stub_label(&paper.id)
    } else {
        title.chars().take(LABEL_MAX_CHARS).collect()
    }
}

/// Last `/` segment of an id, ignoring a trailing slash.
fn stub_label(id: &str) -> String {
    let trimmed = id.trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    if last.is_empty() {
        id.to_string()
    } else {
        last.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperSource;

    fn paper(id: &str, title: &str, refs: &[&str]) -> Paper {
        let mut p = Paper::new(id, PaperSource::BibliographicDb, title);
        p.references = refs.iter().map(|r| r.to_string()).collect();
        p
    }

    #[test]
    fn test_papers_without_id_are_skipped() {
        let graph = build_graph(&[
            paper("", "A", &["https://openalex.org/X"]),
            paper("  ", "B", &["https://openalex.org/Y"]),
            paper("https://openalex.org/W1", "Kept", &["", "https://openalex.org/Z"]),
        ]);
        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["https://openalex.org/W1", "https://openalex.org/Z"]);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].source, "https://openalex.org/W1");
    }

    #[test]
    fn test_shared_reference_is_one_stub() {
        let graph = build_graph(&[
            paper("https://openalex.org/W1", "First", &["https://openalex.org/W9"]),
            paper("https://openalex.org/W2", "Second", &["https://openalex.org/W9"]),
        ]);
        assert_eq!(graph.nodes.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        let stub = graph.node("https://openalex.org/W9").unwrap();
        assert!(stub.stub);
        assert_eq!(stub.label, "W9");
        assert_eq!(
            graph.edges[0].id,
            "https://openalex.org/W1->https://openalex.org/W9"
        );
    }

    #[test]
    fn test_reference_to_input_paper_is_not_stub() {
        let graph = build_graph(&[
            paper("A", "Alpha", &["B"]),
            paper("B", "Beta", &[]),
        ]);
        assert_eq!(graph.nodes.len(), 2);
        let b = graph.node("B").unwrap();
        assert!(!b.stub);
        assert_eq!(b.label, "Beta");
    }

    #[test]
    fn test_duplicate_papers_and_edges() {
        let graph = build_graph(&[
            paper("A", "Alpha", &["X"]),
            paper("A", "Alpha again", &["X"]),
        ]);
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.node("A").unwrap().label, "Alpha");
        assert_eq!(graph.edges.len(), 2);
    }

    #[test]
    fn test_labels() {
        let long = "x".repeat(100);
        let graph = build_graph(&[
            paper("https://openalex.org/W5/", "", &[]),
            paper("P", &long, &["https://openalex.org/W7/"]),
        ]);
        assert_eq!(graph.nodes[0].label, "W5");
        assert_eq!(graph.nodes[1].label.chars().count(), LABEL_MAX_CHARS);
        assert_eq!(graph.node("https://openalex.org/W7/").unwrap().label, "W7");
    }

    #[test]
    fn test_empty_input() {
        let graph = build_graph(&[]);
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }
}
