use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use tracing::{debug, info};

use crate::match_query::MatchFilter;
use crate::matches::{Match, MatchKey, MatchPatch, parse_stored_time, stored_day};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonMatch {
    pub season: String,
    pub fields: Match,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Modified,
    NotFound,
    /// The key matched but the patch left every field as it was.
    Unchanged,
}

/// The match collection. One SQLite connection, opened at start-up and
/// handed to whoever needs it; `close` ends its lifetime explicitly.
pub struct MatchStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl MatchStore {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn =
            Connection::open(path).with_context(|| format!("open sqlite db {}", path.display()))?;
        init_schema(&conn)?;
        info!(db = %path.display(), "match store opened");
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory sqlite db")?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn close(self) -> Result<()> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|_| anyhow!("match store lock poisoned"))?;
        conn.close()
            .map_err(|(_, err)| err)
            .context("close sqlite db")?;
        info!("match store closed");
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("match store lock poisoned"))
    }

    pub fn list(&self, filter: &MatchFilter) -> Result<Vec<Match>> {
        let (clause, values) = filter.where_clause();
        let sql = format!(
            "SELECT date, hometeam, awayteam, ftr FROM matches{clause} ORDER BY match_rowid ASC"
        );
        debug!(%sql, ?values, "list matches");

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql).context("prepare list matches query")?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .context("query list matches")?;

        let mut out = Vec::new();
        for row in rows {
            let (date, hometeam, awayteam, ftr) = row.context("decode match row")?;
            out.push(Match {
                date: parse_stored_time(&date)?.date(),
                hometeam,
                awayteam,
                ftr: ftr.parse().context("stored match has invalid ftr")?,
            });
        }
        Ok(out)
    }

    pub fn insert(&self, m: &Match) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO matches (date, hometeam, awayteam, ftr, season) VALUES (?1, ?2, ?3, ?4, NULL)",
            params![stored_day(m.date), m.hometeam, m.awayteam, m.ftr.as_code()],
        )
        .context("insert match")?;
        Ok(())
    }

    /// Applies `patch` to the first match (lowest row id) carrying `key`.
    pub fn update(&self, key: &MatchKey, patch: &MatchPatch) -> Result<UpdateOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("begin update transaction")?;

        let current = tx
            .query_row(
                "SELECT match_rowid, date, hometeam, awayteam, ftr FROM matches
                 WHERE date = ?1 AND hometeam = ?2 AND awayteam = ?3
                 ORDER BY match_rowid ASC LIMIT 1",
                params![stored_day(key.date), key.hometeam, key.awayteam],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .context("look up match by key")?;
        let Some((rowid, date, hometeam, awayteam, ftr)) = current else {
            return Ok(UpdateOutcome::NotFound);
        };
        if patch.is_empty() {
            return Ok(UpdateOutcome::Unchanged);
        }

        let next_date = patch.date.map(stored_day).unwrap_or_else(|| date.clone());
        let next_home = patch.hometeam.clone().unwrap_or_else(|| hometeam.clone());
        let next_away = patch.awayteam.clone().unwrap_or_else(|| awayteam.clone());
        let next_ftr = patch
            .ftr
            .map(|f| f.as_code().to_string())
            .unwrap_or_else(|| ftr.clone());

        if next_date == date && next_home == hometeam && next_away == awayteam && next_ftr == ftr {
            return Ok(UpdateOutcome::Unchanged);
        }

        tx.execute(
            "UPDATE matches SET date = ?1, hometeam = ?2, awayteam = ?3, ftr = ?4
             WHERE match_rowid = ?5",
            params![next_date, next_home, next_away, next_ftr, rowid],
        )
        .context("update match")?;
        tx.commit().context("commit update transaction")?;
        Ok(UpdateOutcome::Modified)
    }

    /// Deletes the first match carrying `key`. Returns whether one was removed.
    pub fn delete(&self, key: &MatchKey) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn
            .execute(
                "DELETE FROM matches WHERE match_rowid = (
                    SELECT match_rowid FROM matches
                    WHERE date = ?1 AND hometeam = ?2 AND awayteam = ?3
                    ORDER BY match_rowid ASC LIMIT 1
                 )",
                params![stored_day(key.date), key.hometeam, key.awayteam],
            )
            .context("delete match")?;
        Ok(deleted > 0)
    }

    /// Empties the collection and inserts `rows` in order, in one transaction.
    pub fn replace_all(&self, rows: &[SeasonMatch]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction().context("begin load transaction")?;
        let removed = tx
            .execute("DELETE FROM matches", [])
            .context("clear matches")?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO matches (date, hometeam, awayteam, ftr, season)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .context("prepare bulk insert")?;
            for row in rows {
                let m = &row.fields;
                stmt.execute(params![
                    stored_day(m.date),
                    m.hometeam,
                    m.awayteam,
                    m.ftr.as_code(),
                    row.season
                ])
                .context("bulk insert match")?;
            }
        }
        tx.commit().context("commit load transaction")?;
        debug!(removed, inserted = rows.len(), "match collection replaced");
        Ok(rows.len())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let n = conn
            .query_row("SELECT COUNT(*) FROM matches", [], |row| row.get::<_, i64>(0))
            .context("count matches")?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    pub fn seasons(&self) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT season FROM matches WHERE season IS NOT NULL ORDER BY season")
            .context("prepare seasons query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("query seasons")?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row.context("decode season row")?);
        }
        Ok(out)
    }
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        CREATE TABLE IF NOT EXISTS matches (
            match_rowid INTEGER PRIMARY KEY AUTOINCREMENT,
            date TEXT NOT NULL,
            hometeam TEXT NOT NULL,
            awayteam TEXT NOT NULL,
            ftr TEXT NOT NULL,
            season TEXT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_matches_date ON matches(date);
        CREATE INDEX IF NOT EXISTS idx_matches_hometeam ON matches(hometeam);
        CREATE INDEX IF NOT EXISTS idx_matches_awayteam ON matches(awayteam);
        "#,
    )
    .context("create sqlite schema")?;
    Ok(())
}
