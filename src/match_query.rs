use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::matches::{InvalidSeason, Season, end_of_day, format_stored_time, start_of_day};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchQuery {
    pub date: Option<NaiveDate>,
    pub season: Option<String>,
    pub team: Option<String>,
    pub home: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamFilter {
    Home(String),
    Away(String),
    Either(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFilter {
    pub date_range: Option<DateRange>,
    pub team: Option<TeamFilter>,
}

impl MatchFilter {
    /// Builds the filter step by step. A season replaces any date range set
    /// from `date`; the two are never intersected.
    pub fn from_query(query: &MatchQuery) -> Result<Self, InvalidSeason> {
        let mut filter = MatchFilter::default();

        if let Some(date) = query.date {
            filter.date_range = Some(DateRange {
                start: start_of_day(date),
                end: end_of_day(date),
            });
        }

        if let Some(team) = non_empty(query.team.as_deref()) {
            let team = team.to_string();
            filter.team = Some(match query.home {
                Some(true) => TeamFilter::Home(team),
                Some(false) => TeamFilter::Away(team),
                None => TeamFilter::Either(team),
            });
        }

        if let Some(raw) = non_empty(query.season.as_deref()) {
            let season = raw.parse::<Season>()?;
            let (Some(start), Some(end)) = (season.first_moment(), season.last_moment()) else {
                return Err(InvalidSeason);
            };
            filter.date_range = Some(DateRange { start, end });
        }

        Ok(filter)
    }

    pub fn is_empty(&self) -> bool {
        self.date_range.is_none() && self.team.is_none()
    }

    /// Renders the filter as a SQL `WHERE` clause (empty when unfiltered) and
    /// its positional parameters.
    pub fn where_clause(&self) -> (String, Vec<String>) {
        if self.is_empty() {
            return (String::new(), Vec::new());
        }
        let mut conditions = Vec::new();
        let mut values = Vec::new();

        if let Some(range) = &self.date_range {
            values.push(format_stored_time(range.start));
            conditions.push(format!("date >= ?{}", values.len()));
            values.push(format_stored_time(range.end));
            conditions.push(format!("date <= ?{}", values.len()));
        }

        match &self.team {
            Some(TeamFilter::Home(team)) => {
                values.push(team.clone());
                conditions.push(format!("hometeam = ?{}", values.len()));
            }
            Some(TeamFilter::Away(team)) => {
                values.push(team.clone());
                conditions.push(format!("awayteam = ?{}", values.len()));
            }
            Some(TeamFilter::Either(team)) => {
                values.push(team.clone());
                let idx = values.len();
                conditions.push(format!("(hometeam = ?{idx} OR awayteam = ?{idx})"));
            }
            None => {}
        }

        (format!(" WHERE {}", conditions.join(" AND ")), values)
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_query_builds_empty_filter() {
        let filter = MatchFilter::from_query(&MatchQuery::default()).unwrap();
        assert!(filter.is_empty());
        assert_eq!(filter.where_clause(), (String::new(), Vec::new()));
    }

    #[test]
    fn date_covers_whole_day() {
        let query = MatchQuery {
            date: Some(day(2020, 1, 5)),
            ..Default::default()
        };
        let (clause, values) = MatchFilter::from_query(&query).unwrap().where_clause();
        assert_eq!(clause, " WHERE date >= ?1 AND date <= ?2");
        assert_eq!(values, vec!["2020-01-05T00:00:00", "2020-01-05T23:59:59"]);
    }

    #[test]
    fn home_flag_selects_team_side() {
        let mut query = MatchQuery {
            team: Some("Real Madrid".to_string()),
            home: Some(true),
            ..Default::default()
        };
        let filter = MatchFilter::from_query(&query).unwrap();
        assert_eq!(filter.team, Some(TeamFilter::Home("Real Madrid".to_string())));
        assert_eq!(filter.where_clause().0, " WHERE hometeam = ?1");

        query.home = Some(false);
        let filter = MatchFilter::from_query(&query).unwrap();
        assert_eq!(filter.where_clause().0, " WHERE awayteam = ?1");

        query.home = None;
        let filter = MatchFilter::from_query(&query).unwrap();
        assert_eq!(
            filter.where_clause().0,
            " WHERE (hometeam = ?1 OR awayteam = ?1)"
        );
    }

    #[test]
    fn home_without_team_is_ignored() {
        let query = MatchQuery {
            home: Some(true),
            team: Some(String::new()),
            ..Default::default()
        };
        assert!(MatchFilter::from_query(&query).unwrap().is_empty());
    }

    #[test]
    fn season_overrides_date() {
        let query = MatchQuery {
            date: Some(day(2015, 3, 1)),
            season: Some("2019/2020".to_string()),
            team: Some("Getafe".to_string()),
            home: None,
        };
        let filter = MatchFilter::from_query(&query).unwrap();
        let range = filter.date_range.unwrap();
        assert_eq!(format_stored_time(range.start), "2019-08-01T00:00:00");
        assert_eq!(format_stored_time(range.end), "2020-07-31T23:59:59");

        let (clause, values) = filter.where_clause();
        assert_eq!(
            clause,
            " WHERE date >= ?1 AND date <= ?2 AND (hometeam = ?3 OR awayteam = ?3)"
        );
        assert_eq!(values[2], "Getafe");
    }

    #[test]
    fn malformed_season_is_rejected() {
        let query = MatchQuery {
            season: Some("2019-2020".to_string()),
            ..Default::default()
        };
        assert_eq!(MatchFilter::from_query(&query), Err(InvalidSeason));
    }
}
