use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text layout of stored timestamps. Fixed width, so SQL string comparison
/// orders the same way as the timestamps themselves.
pub const STORED_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Ftr {
    HomeWin,
    Draw,
    AwayWin,
}

impl Ftr {
    pub fn as_code(self) -> &'static str {
        match self {
            Ftr::HomeWin => "1",
            Ftr::Draw => "X",
            Ftr::AwayWin => "2",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("ftr must be one of 1, X, 2 (got {0:?})")]
pub struct InvalidFtr(pub String);

impl FromStr for Ftr {
    type Err = InvalidFtr;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "1" => Ok(Ftr::HomeWin),
            "X" => Ok(Ftr::Draw),
            "2" => Ok(Ftr::AwayWin),
            other => Err(InvalidFtr(other.to_string())),
        }
    }
}

impl TryFrom<String> for Ftr {
    type Error = InvalidFtr;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Ftr> for String {
    fn from(ftr: Ftr) -> Self {
        ftr.as_code().to_string()
    }
}

impl fmt::Display for Ftr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub date: NaiveDate,
    pub hometeam: String,
    pub awayteam: String,
    pub ftr: Ftr,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MatchPatch {
    pub date: Option<NaiveDate>,
    pub hometeam: Option<String>,
    pub awayteam: Option<String>,
    pub ftr: Option<Ftr>,
}

impl MatchPatch {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.hometeam.is_none() && self.awayteam.is_none() && self.ftr.is_none()
    }
}

/// Natural key used by update and delete. Not enforced unique by the store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MatchKey {
    pub date: NaiveDate,
    pub hometeam: String,
    pub awayteam: String,
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    // Stored timestamps have second precision.
    date.and_hms_opt(23, 59, 59).unwrap_or_else(|| start_of_day(date))
}

pub fn format_stored_time(time: NaiveDateTime) -> String {
    time.format(STORED_TIME_FORMAT).to_string()
}

pub fn stored_day(date: NaiveDate) -> String {
    format_stored_time(start_of_day(date))
}

pub fn parse_stored_time(raw: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, STORED_TIME_FORMAT)
        .with_context(|| format!("invalid stored timestamp {raw:?}"))
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Season must be in format YYYY/YYYY")]
pub struct InvalidSeason;

/// A season in `YYYY/YYYY` form, spanning Aug 1 of the start year through
/// Jul 31 of the end year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Season {
    pub start_year: i32,
    pub end_year: i32,
}

impl Season {
    pub fn first_moment(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.start_year, 8, 1).map(start_of_day)
    }

    pub fn last_moment(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.end_year, 7, 31).map(end_of_day)
    }
}

impl FromStr for Season {
    type Err = InvalidSeason;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.split('/');
        let (Some(start), Some(end), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(InvalidSeason);
        };
        let start_year = start.trim().parse::<i32>().map_err(|_| InvalidSeason)?;
        let end_year = end.trim().parse::<i32>().map_err(|_| InvalidSeason)?;
        let season = Season {
            start_year,
            end_year,
        };
        // Years chrono cannot represent are a format error as well.
        if season.first_moment().is_none() || season.last_moment().is_none() {
            return Err(InvalidSeason);
        }
        Ok(season)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ftr_accepts_only_closed_set() {
        assert_eq!("1".parse::<Ftr>(), Ok(Ftr::HomeWin));
        assert_eq!("X".parse::<Ftr>(), Ok(Ftr::Draw));
        assert_eq!("2".parse::<Ftr>(), Ok(Ftr::AwayWin));
        for bad in ["H", "x", "", "1 ", "12", "D"] {
            assert!(bad.parse::<Ftr>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn match_json_uses_codes_and_iso_dates() {
        let m = Match {
            date: NaiveDate::from_ymd_opt(2019, 9, 1).unwrap(),
            hometeam: "Sevilla".to_string(),
            awayteam: "Celta".to_string(),
            ftr: Ftr::Draw,
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["date"], "2019-09-01");
        assert_eq!(json["ftr"], "X");

        let err = serde_json::from_str::<Match>(
            r#"{"date":"2019-09-01","hometeam":"A","awayteam":"B","ftr":"H"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("ftr must be one of"));
    }

    #[test]
    fn patch_leaves_absent_fields_unset() {
        let patch: MatchPatch = serde_json::from_str(r#"{"ftr":"X"}"#).unwrap();
        assert_eq!(patch.ftr, Some(Ftr::Draw));
        assert!(patch.date.is_none());
        assert!(patch.hometeam.is_none());
        assert!(patch.awayteam.is_none());
        assert!(serde_json::from_str::<MatchPatch>("{}").unwrap().is_empty());
    }

    #[test]
    fn season_parses_two_slash_separated_years() {
        let season = "2019/2020".parse::<Season>().unwrap();
        assert_eq!(season.start_year, 2019);
        assert_eq!(season.end_year, 2020);
        assert_eq!(
            format_stored_time(season.first_moment().unwrap()),
            "2019-08-01T00:00:00"
        );
        assert_eq!(
            format_stored_time(season.last_moment().unwrap()),
            "2020-07-31T23:59:59"
        );
    }

    #[test]
    fn season_rejects_other_shapes() {
        for bad in ["2019-2020", "2019", "2019/2020/2021", "abcd/efgh", "", "/"] {
            assert_eq!(bad.parse::<Season>(), Err(InvalidSeason), "{bad:?}");
        }
    }

    #[test]
    fn stored_time_round_trips_start_of_day() {
        let day = NaiveDate::from_ymd_opt(2021, 2, 28).unwrap();
        let stored = stored_day(day);
        assert_eq!(stored, "2021-02-28T00:00:00");
        assert_eq!(parse_stored_time(&stored).unwrap().date(), day);
        assert!(parse_stored_time("28/02/2021").is_err());
    }
}
