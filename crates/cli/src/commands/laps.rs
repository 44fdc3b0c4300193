//! `laps` command implementation.

use anyhow::{Context, Result};
use lap_timing::LapTable;
use lapsync_cli::Pipeline;
use tracing::info;

use super::{load_config, open_store};
use crate::cli::LapsArgs;

/// Execute the `laps` command
pub async fn run_laps(args: &LapsArgs) -> Result<()> {
    let config = load_config(&args.config)?;
    let store = open_store(&args.db, &config)?;
    let pipeline = Pipeline::new(config, store);

    let laps = pipeline
        .resolve_laps()
        .await
        .context("Failed to resolve laps")?;
    let table = LapTable::new(&laps);

    info!(
        laps = table.rows.len(),
        fastest = ?table.fastest_index,
        "Laps resolved"
    );

    if args.json {
        let json =
            serde_json::to_string_pretty(&table).context("Failed to serialize lap table")?;
        println!("{}", json);
    } else {
        print!("{}", table);
        if let Some(fastest) = table.fastest() {
            println!(
                "\nFastest: lap {} in {:.3}s",
                fastest.lap.lap_index, fastest.lap.duration
            );
        } else {
            println!("\nNo valid lap in this session");
        }
    }

    Ok(())
}
