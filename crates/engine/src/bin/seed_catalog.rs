//! Seed the default exchange catalog into a database file.
//!
//! Usage: seed_catalog <path/to/achievements.db>

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use carx_engine::AchievementsService;
use carx_persistence::Database;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Some(db_path) = std::env::args().nth(1) else {
        bail!("usage: seed_catalog <path/to/achievements.db>");
    };

    let db = Database::connect(Path::new(&db_path))
        .await
        .with_context(|| format!("failed to open database at {db_path}"))?;
    let service = AchievementsService::new(Arc::new(db));

    let added = service.seed_default_catalog().await?;
    if added == 0 {
        println!("Catalog already seeded, nothing to do");
    } else {
        println!("Seeded {added} exchange item(s)");
    }
    Ok(())
}
