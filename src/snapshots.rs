use anyhow::Result;

use crate::config::Config;
use crate::error::RequestError;
use crate::store::{PaperStore, SqliteStore};

pub async fn run_list(config: &Config, limit: usize) -> Result<()> {
    let store = SqliteStore::open(&config.db).await?;
    let snapshots = store.list_snapshots(limit).await?;
    store.pool().close().await;

    if snapshots.is_empty() {
        println!("No snapshots.");
        return Ok(());
    }

    println!("{:<36}  {:<10}  {:>7}  QUERY", "ID", "DATE", "RESULTS");
    for s in &snapshots {
        let date = chrono::DateTime::from_timestamp(s.created_at, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!("{:<36}  {:<10}  {:>7}  {}", s.id, date, s.result_count, s.query);
    }
    Ok(())
}

pub async fn run_show(config: &Config, id: &str) -> Result<()> {
    let store = SqliteStore::open(&config.db).await?;
    let snapshot = store.get_snapshot(id).await?;
    store.pool().close().await;

    match snapshot {
        Some(s) => println!("{}", serde_json::to_string_pretty(&s)?),
        None => {
            return Err(RequestError::NotFound {
                kind: "snapshot",
                id: id.to_string(),
            }
            .into())
        }
    }
    Ok(())
}
