use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const CLEAN_HEADER: [&str; 4] = ["date", "hometeam", "awayteam", "ftr"];

const TEAM_NAME_CORRECTIONS: &[(&str, &str)] = &[
    ("Espanol", "Español"),
    ("La Coruna", "La Coruña"),
    ("Logrones", "Logroñes"),
    ("Villareal", "Villarreal"),
];

const FTR_CODES: &[(&str, &str)] = &[("H", "1"), ("D", "X"), ("A", "2")];

/// One row of a cleaned season file. `ftr` stays a string: codes outside the
/// H/D/A table pass through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanRow {
    pub date: NaiveDate,
    pub hometeam: String,
    pub awayteam: String,
    pub ftr: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedSeason {
    pub rows: Vec<CleanRow>,
    pub dropped_rows: usize,
    pub malformed_rows: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CleanSummary {
    pub clean_dir: PathBuf,
    pub files_seen: usize,
    pub files_cleaned: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub rows_malformed: usize,
    pub skipped: Vec<String>,
}

/// Cleans every `*.csv` in `raw_dir` into a file of the same name in
/// `clean_dir`. A file that cannot be read is logged and skipped.
pub fn clean_season_files(raw_dir: &Path, clean_dir: &Path) -> Result<CleanSummary> {
    fs::create_dir_all(clean_dir)
        .with_context(|| format!("create clean dir {}", clean_dir.display()))?;

    let files = list_csv_files(raw_dir)?;
    let mut summary = CleanSummary {
        clean_dir: clean_dir.to_path_buf(),
        files_seen: files.len(),
        ..Default::default()
    };

    for path in files {
        let Some(name) = path.file_name() else {
            continue;
        };
        info!(file = %name.to_string_lossy(), "processing raw season file");
        let dest = clean_dir.join(name);
        match clean_season_file(&path, &dest) {
            Ok(season) => {
                summary.files_cleaned += 1;
                summary.rows_kept += season.rows.len();
                summary.rows_dropped += season.dropped_rows;
                summary.rows_malformed += season.malformed_rows;
            }
            Err(err) => {
                warn!(file = %path.display(), "failed to process raw season file: {err:#}");
                summary
                    .skipped
                    .push(format!("{}: {err:#}", name.to_string_lossy()));
            }
        }
    }

    Ok(summary)
}

pub fn clean_season_file(src: &Path, dest: &Path) -> Result<CleanedSeason> {
    let bytes = fs::read(src).with_context(|| format!("read {}", src.display()))?;
    let text = decode_season_text(bytes);
    let season = clean_season_csv(&text)?;
    write_clean_rows(dest, &season.rows)?;
    debug!(
        dest = %dest.display(),
        kept = season.rows.len(),
        dropped = season.dropped_rows,
        malformed = season.malformed_rows,
        "cleaned season written"
    );
    Ok(season)
}

pub fn decode_season_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => match text.strip_prefix('\u{feff}') {
            Some(rest) => rest.to_string(),
            None => text,
        },
        Err(err) => {
            debug!("season file is not utf-8, decoding as latin-1");
            err.into_bytes().into_iter().map(char::from).collect()
        }
    }
}

pub fn clean_season_csv(text: &str) -> Result<CleanedSeason> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = reader.headers().context("read header row")?.clone();
    let columns = required_columns(&headers)?;

    let mut season = CleanedSeason::default();
    for (idx, record) in reader.records().enumerate() {
        // Header is line 1.
        let line = idx + 2;
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(line, "skipping malformed row: {err}");
                season.malformed_rows += 1;
                continue;
            }
        };
        // Short rows are kept; missing trailing fields read as blank.
        if record.len() > headers.len() {
            warn!(
                line,
                fields = record.len(),
                expected = headers.len(),
                "skipping malformed row: too many fields"
            );
            season.malformed_rows += 1;
            continue;
        }
        let fields = columns.map(|col| record.get(col).unwrap_or_default());
        match normalize_fields(fields) {
            Some(row) => season.rows.push(row),
            None => season.dropped_rows += 1,
        }
    }
    Ok(season)
}

/// Positions of date, hometeam, awayteam and ftr, matching header names
/// after trimming and lowercasing.
fn required_columns(headers: &StringRecord) -> Result<[usize; 4]> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    let mut out = [0usize; 4];
    for (slot, wanted) in out.iter_mut().zip(CLEAN_HEADER) {
        *slot = normalized
            .iter()
            .position(|h| h == wanted)
            .ok_or_else(|| anyhow!("missing required column {wanted:?}"))?;
    }
    Ok(out)
}

pub fn normalize_fields(fields: [&str; 4]) -> Option<CleanRow> {
    let [date, hometeam, awayteam, ftr] = fields;
    let date = parse_day_first_date(date)?;
    let hometeam = present(hometeam)?;
    let awayteam = present(awayteam)?;
    let ftr = present(ftr)?;
    Some(CleanRow {
        date,
        hometeam: correct_team_name(hometeam),
        awayteam: correct_team_name(awayteam),
        ftr: recode_ftr(ftr),
    })
}

// Blank means missing; kept values are not trimmed.
fn present(raw: &str) -> Option<&str> {
    (!raw.trim().is_empty()).then_some(raw)
}

pub fn correct_team_name(name: &str) -> String {
    TEAM_NAME_CORRECTIONS
        .iter()
        .find(|(wrong, _)| *wrong == name)
        .map(|(_, right)| *right)
        .unwrap_or(name)
        .to_string()
}

pub fn recode_ftr(code: &str) -> String {
    FTR_CODES
        .iter()
        .find(|(raw, _)| *raw == code)
        .map(|(_, mapped)| *mapped)
        .unwrap_or(code)
        .to_string()
}

/// Parses day-before-month dates (`dd/mm/yyyy`, `dd/mm/yy`, with `/`, `-`
/// or `.` separators) and ISO `yyyy-mm-dd`. Anything after the first
/// whitespace (a time of day) is ignored. Two-digit years 69..=99 are
/// 19xx, the rest 20xx.
pub fn parse_day_first_date(raw: &str) -> Option<NaiveDate> {
    let token = raw.split_whitespace().next()?;
    let parts: Vec<&str> = token.split(['/', '-', '.']).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };
    if a.len() == 4 {
        let year = a.parse::<i32>().ok()?;
        return NaiveDate::from_ymd_opt(year, b.parse().ok()?, c.parse().ok()?);
    }
    let day = a.parse::<u32>().ok()?;
    let month = b.parse::<u32>().ok()?;
    let year = match c.len() {
        2 => {
            let yy = c.parse::<i32>().ok()?;
            if yy >= 69 { 1900 + yy } else { 2000 + yy }
        }
        4 => c.parse::<i32>().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn write_clean_rows(dest: &Path, rows: &[CleanRow]) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(dest)
        .with_context(|| format!("create {}", dest.display()))?;
    writer
        .write_record(CLEAN_HEADER)
        .context("write clean header")?;
    for row in rows {
        writer.serialize(row).context("write clean row")?;
    }
    writer.flush().context("flush clean file")?;
    Ok(())
}

pub fn list_csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))?;
    let mut out = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("list directory {}", dir.display()))?
            .path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
            out.push(path);
        }
    }
    out.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_day_first_dates() {
        assert_eq!(parse_day_first_date("01/08/2019"), Some(day(2019, 8, 1)));
        assert_eq!(parse_day_first_date("13/05/95"), Some(day(1995, 5, 13)));
        assert_eq!(parse_day_first_date("02/09/05"), Some(day(2005, 9, 2)));
        assert_eq!(parse_day_first_date("2020-07-19"), Some(day(2020, 7, 19)));
        assert_eq!(parse_day_first_date("19.07.2020 20:00"), Some(day(2020, 7, 19)));
        assert_eq!(parse_day_first_date("31/02/2020"), None);
        assert_eq!(parse_day_first_date("08/13/2020"), None);
        assert_eq!(parse_day_first_date("yesterday"), None);
        assert_eq!(parse_day_first_date(""), None);
    }

    #[test]
    fn corrects_known_team_names_only() {
        assert_eq!(correct_team_name("Espanol"), "Español");
        assert_eq!(correct_team_name("Villareal"), "Villarreal");
        assert_eq!(correct_team_name("espanol"), "espanol");
        assert_eq!(correct_team_name("Sevilla"), "Sevilla");
    }

    #[test]
    fn recodes_results_and_passes_unknown_through() {
        assert_eq!(recode_ftr("H"), "1");
        assert_eq!(recode_ftr("D"), "X");
        assert_eq!(recode_ftr("A"), "2");
        assert_eq!(recode_ftr("P"), "P");
    }

    #[test]
    fn rows_with_missing_fields_are_dropped() {
        assert!(normalize_fields(["01/09/2019", "", "Celta", "H"]).is_none());
        assert!(normalize_fields(["01/09/2019", "Sevilla", "Celta", " "]).is_none());
        assert!(normalize_fields(["not a date", "Sevilla", "Celta", "H"]).is_none());
        let row = normalize_fields(["01/09/2019", "Espanol", "La Coruna", "D"]).unwrap();
        assert_eq!(row.hometeam, "Español");
        assert_eq!(row.awayteam, "La Coruña");
        assert_eq!(row.ftr, "X");
    }

    #[test]
    fn selects_required_columns_case_insensitively() {
        let text = "Div, date ,HomeTeam,AwayTeam,FTHG,FTR\n\
                    SP1,17/08/2019,Ath Bilbao,Barcelona,1,H\n\
                    SP1,17/08/2019,Celta,Real Madrid,1,A\n";
        let season = clean_season_csv(text).unwrap();
        assert_eq!(season.rows.len(), 2);
        assert_eq!(season.rows[1].awayteam, "Real Madrid");
        assert_eq!(season.rows[1].ftr, "2");
    }

    #[test]
    fn malformed_rows_are_counted_and_skipped() {
        let text = "Date,HomeTeam,AwayTeam,FTR\n\
                    17/08/2019,Ath Bilbao,Barcelona,H\n\
                    17/08/2019,Celta,Real Madrid,A,extra\n\
                    18/08/2019,Valencia,Sociedad,D\n";
        let season = clean_season_csv(text).unwrap();
        assert_eq!(season.rows.len(), 2);
        assert_eq!(season.malformed_rows, 1);
    }

    #[test]
    fn short_rows_keep_their_required_fields() {
        let text = "Div,Date,HomeTeam,AwayTeam,FTR,Referee\n\
                    SP1,16/08/2019,Ath Bilbao,Barcelona,H,Mateu Lahoz\n\
                    SP1,17/08/2019,Celta,Real Madrid,A\n\
                    SP1,17/08/2019,Valencia\n";
        let season = clean_season_csv(text).unwrap();
        assert_eq!(season.rows.len(), 2);
        assert_eq!(season.malformed_rows, 0);
        assert_eq!(season.dropped_rows, 1);
        assert_eq!(season.rows[1].hometeam, "Celta");
        assert_eq!(season.rows[1].ftr, "2");
    }

    #[test]
    fn values_pass_through_untrimmed() {
        let row = normalize_fields(["01/09/2019", "Sevilla ", " Espanol", "H"]).unwrap();
        assert_eq!(row.hometeam, "Sevilla ");
        assert_eq!(row.awayteam, " Espanol");
        assert_eq!(row.ftr, "1");
        let padded = normalize_fields(["01/09/2019", "Sevilla", "Celta", " D"]).unwrap();
        assert_eq!(padded.ftr, " D");
    }

    #[test]
    fn missing_column_fails_the_file() {
        let err = clean_season_csv("Date,HomeTeam,FTR\n17/08/2019,Celta,H\n").unwrap_err();
        assert!(err.to_string().contains("awayteam"));
    }

    #[test]
    fn latin1_bytes_decode() {
        let bytes = b"Espa\xf1ol".to_vec();
        assert_eq!(decode_season_text(bytes), "Español");
        let bom = "\u{feff}Date".as_bytes().to_vec();
        assert_eq!(decode_season_text(bom), "Date");
    }
}
