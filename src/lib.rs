//! # Paper Orbit
//!
//! Federated academic literature search with a local semantic library.
//!
//! A query fans out to every enabled source (OpenAlex, arXiv) at once. Each
//! source has its own outcome, so one slow or broken API never sinks the
//! search. Vendor records are normalized into one [`models::Paper`] shape,
//! can be saved to SQLite, embedded, ranked by cosine similarity, and laid
//! out as a citation graph.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌────────────┐
//! │   Sources    │──▶│ Aggregator │──▶│ Normalizer │
//! │ OpenAlex/arX │   │  deadline  │   │   Paper    │
//! └──────────────┘   └─────┬──────┘   └─────┬──────┘
//!                          │ snapshot       │
//!                          ▼                ▼
//!                    ┌──────────┐     ┌───────────┐
//!                    │  SQLite  │◀───▶│ Rank/Graph│
//!                    └────┬─────┘     └───────────┘
//!                ┌────────┴────────┐
//!                ▼                 ▼
//!          ┌──────────┐      ┌──────────┐
//!          │   CLI    │      │   HTTP   │
//!          │ (orbit)  │      │  (axum)  │
//!          └──────────┘      └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`vendor`] | Lenient vendor record shapes |
//! | [`normalize`] | Vendor record to `Paper` mapping |
//! | [`sources`] | OpenAlex, arXiv and Crossref HTTP clients |
//! | [`aggregate`] | Concurrent fan-out with partial failure |
//! | [`rank`] | Cosine similarity ranking |
//! | [`graph`] | Citation graph construction |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Paper, embedding, and snapshot persistence |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod aggregate;
pub mod config;
pub mod db;
pub mod embed_cmd;
pub mod embedding;
pub mod error;
pub mod graph;
pub mod local_search;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod papers;
pub mod rank;
pub mod search;
pub mod server;
pub mod snapshots;
pub mod sources;
pub mod store;
pub mod summary;
pub mod vendor;
