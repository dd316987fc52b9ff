use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cleaner::{CleanRow, list_csv_files};

pub const MERGED_HEADER: [&str; 5] = ["date", "hometeam", "awayteam", "ftr", "season"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedRow {
    pub date: NaiveDate,
    pub hometeam: String,
    pub awayteam: String,
    pub ftr: String,
    pub season: String,
}

#[derive(Debug, Clone)]
pub struct MergeSummary {
    pub output: PathBuf,
    pub files_merged: Vec<String>,
    pub rows_written: usize,
}

/// Concatenates every cleaned season file (in file-name order) into
/// `output`, tagging rows with their season. Any unreadable file aborts the
/// merge.
pub fn merge_season_files(clean_dir: &Path, output: &Path) -> Result<MergeSummary> {
    let files = list_csv_files(clean_dir)?;
    if files.is_empty() {
        return Err(anyhow!(
            "no cleaned season files in {}",
            clean_dir.display()
        ));
    }

    let mut merged = Vec::new();
    let mut files_merged = Vec::with_capacity(files.len());
    for path in &files {
        let season = season_name(path)?;
        info!(file = %path.display(), %season, "reading cleaned season file");
        let rows = read_clean_rows(path)?;
        merged.extend(rows.into_iter().map(|row| MergedRow {
            date: row.date,
            hometeam: row.hometeam,
            awayteam: row.awayteam,
            ftr: row.ftr,
            season: season.clone(),
        }));
        files_merged.push(season);
    }

    write_merged_rows(output, &merged)?;
    info!(output = %output.display(), rows = merged.len(), "all seasons merged");

    Ok(MergeSummary {
        output: output.to_path_buf(),
        files_merged,
        rows_written: merged.len(),
    })
}

pub fn season_name(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("no file name in {}", path.display()))
}

pub fn read_clean_rows(path: &Path) -> Result<Vec<CleanRow>> {
    let mut reader = ReaderBuilder::new()
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut rows = Vec::new();
    for (idx, row) in reader.deserialize::<CleanRow>().enumerate() {
        let row = row.with_context(|| format!("parse {} row {}", path.display(), idx + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_merged_rows(path: &Path) -> Result<Vec<MergedRow>> {
    let mut reader = ReaderBuilder::new()
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut rows = Vec::new();
    for (idx, row) in reader.deserialize::<MergedRow>().enumerate() {
        let row = row.with_context(|| format!("parse {} row {}", path.display(), idx + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

fn write_merged_rows(output: &Path, rows: &[MergedRow]) -> Result<()> {
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create merged dir {}", parent.display()))?;
    }
    let tmp = output.with_extension("csv.tmp");
    {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        writer
            .write_record(MERGED_HEADER)
            .context("write merged header")?;
        for row in rows {
            writer.serialize(row).context("write merged row")?;
        }
        writer.flush().context("flush merged file")?;
    }
    fs::rename(&tmp, output).context("swap merged file")?;
    Ok(())
}
