use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{error::ApiError, query::Filter};

/// Airing season, stored upper-case in the `media.season` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl Season {
    pub fn as_str(self) -> &'static str {
        match self {
            Season::Winter => "WINTER",
            Season::Spring => "SPRING",
            Season::Summer => "SUMMER",
            Season::Fall => "FALL",
        }
    }

    /// Jan–Mar winter, Apr–Jun spring, Jul–Sep summer, Oct–Dec fall.
    pub fn of(date: Date) -> Self {
        match date.month() {
            Month::January | Month::February | Month::March => Season::Winter,
            Month::April | Month::May | Month::June => Season::Spring,
            Month::July | Month::August | Month::September => Season::Summer,
            Month::October | Month::November | Month::December => Season::Fall,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Season {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WINTER" => Ok(Season::Winter),
            "SPRING" => Ok(Season::Spring),
            "SUMMER" => Ok(Season::Summer),
            "FALL" => Ok(Season::Fall),
            _ => Err(ApiError::Validation(
                "season must be one of WINTER, SPRING, SUMMER, FALL".into(),
            )),
        }
    }
}

/// Raw `?year=&season=` query. Parsed by hand so bad input renders as an
/// envelope, and blank values count as absent.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub year: Option<String>,
    pub season: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListingFilters {
    pub year: Option<i32>,
    pub season: Option<Season>,
}

fn present(v: Option<&String>) -> Option<&str> {
    v.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl ListingQuery {
    pub fn parse(&self) -> Result<ListingFilters, ApiError> {
        let year = present(self.year.as_ref())
            .map(|y| {
                y.parse::<i32>()
                    .map_err(|_| ApiError::Validation("year must be an integer".into()))
            })
            .transpose()?;
        let season = present(self.season.as_ref())
            .map(Season::from_str)
            .transpose()?;
        Ok(ListingFilters { year, season })
    }
}

impl ListingFilters {
    /// Fill whichever of year/season is missing from `today`.
    pub fn or_current(self, today: Date) -> Self {
        Self {
            year: self.year.or(Some(today.year())),
            season: self.season.or(Some(Season::of(today))),
        }
    }

    pub fn to_filter_spec(self) -> Vec<Filter> {
        vec![
            Filter::new(super::repo::SEASON_YEAR, self.year),
            Filter::new(super::repo::SEASON, self.season.map(Season::as_str)),
        ]
    }
}
