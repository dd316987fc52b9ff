use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{info, warn};

use crate::match_store::{MatchStore, SeasonMatch};
use crate::matches::{Ftr, Match};
use crate::merger::{MergedRow, read_merged_rows};

#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub source: PathBuf,
    pub rows_read: usize,
    pub inserted: usize,
    pub rejected: Vec<String>,
}

/// Replaces the whole match collection with the merged dataset. Rows whose
/// `ftr` is outside 1/X/2 are left out and reported.
pub fn load_merged_file(store: &MatchStore, merged: &Path) -> Result<LoadSummary> {
    let rows = read_merged_rows(merged)?;
    let rows_read = rows.len();
    let (accepted, rejected) = partition_loadable(rows);
    for reason in &rejected {
        warn!("not loading row: {reason}");
    }

    let inserted = store.replace_all(&accepted)?;
    info!(inserted, rejected = rejected.len(), "matches loaded");

    Ok(LoadSummary {
        source: merged.to_path_buf(),
        rows_read,
        inserted,
        rejected,
    })
}

fn partition_loadable(rows: Vec<MergedRow>) -> (Vec<SeasonMatch>, Vec<String>) {
    let mut accepted = Vec::with_capacity(rows.len());
    let mut rejected = Vec::new();
    for (idx, row) in rows.into_iter().enumerate() {
        match row.ftr.parse::<Ftr>() {
            Ok(ftr) => accepted.push(SeasonMatch {
                season: row.season,
                fields: Match {
                    date: row.date,
                    hometeam: row.hometeam,
                    awayteam: row.awayteam,
                    ftr,
                },
            }),
            Err(err) => rejected.push(format!(
                "row {} ({} {} vs {}): {err}",
                idx + 1,
                row.date,
                row.hometeam,
                row.awayteam
            )),
        }
    }
    (accepted, rejected)
}
