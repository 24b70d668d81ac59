//! Month selection for heatmap series.
//!
//! A selection is either a single render (`all`, or one month) or a series
//! with one render per month (`0` for the whole year, or `start-end`).
//! Series renders share one frame, so callers render them in equal-extent
//! mode.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Which months to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MonthSelection {
    /// One render over every month.
    All,
    /// One render of a single month (1-12).
    Month(u32),
    /// One render per month, `first..=last`. Empty when `first > last`.
    Series { first: u32, last: u32 },
}

impl MonthSelection {
    /// Parse a month argument.
    ///
    /// - `all` (or empty): every month in one render
    /// - `1`..`12`: that month
    /// - `0`: a series over all twelve months
    /// - `a-b`: a series from `a` to `b` inclusive. Reversed ranges are
    ///   swapped; a missing end (`1-`) means the whole year. The start is
    ///   clamped into 1..=13 and the exclusive end `b + 1` into 1..=13, so
    ///   ranges lying wholly outside the year (`0-0`, `13-14`) select no
    ///   month at all.
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            return Ok(MonthSelection::All);
        }
        if s.contains('-') {
            return parse_series(s);
        }
        match s.parse::<u32>() {
            Ok(0) => Ok(MonthSelection::whole_year()),
            Ok(m @ 1..=12) => Ok(MonthSelection::Month(m)),
            _ => Err(format!("invalid month '{}', expected all, 0-12 or a range like 3-9", s)),
        }
    }

    pub fn whole_year() -> Self {
        MonthSelection::Series { first: 1, last: 12 }
    }

    /// Whether this selection produces one render per month.
    pub fn is_series(&self) -> bool {
        matches!(self, MonthSelection::Series { .. })
    }

    /// Months covered, in order.
    pub fn months(&self) -> RangeInclusive<u32> {
        match *self {
            MonthSelection::All => 1..=12,
            MonthSelection::Month(m) => m..=m,
            MonthSelection::Series { first, last } => first..=last,
        }
    }

    /// Whether no month is selected.
    pub fn is_empty(&self) -> bool {
        self.months().is_empty()
    }

    pub fn contains(&self, month: u32) -> bool {
        self.months().contains(&month)
    }
}

fn parse_series(s: &str) -> Result<MonthSelection, String> {
    let parts: Vec<&str> = s.split('-').collect();
    let (head, tail) = match (parts.first(), parts.last()) {
        (Some(head), Some(tail)) if parts.len() >= 2 && !head.is_empty() && !tail.is_empty() => (*head, *tail),
        _ => return Ok(MonthSelection::whole_year()),
    };

    let parse = |v: &str| {
        v.trim()
            .parse::<i64>()
            .map_err(|_| format!("invalid month range '{}'", s))
    };
    let (mut first, mut last) = (parse(head)?, parse(tail)?);
    if first > last {
        std::mem::swap(&mut first, &mut last);
    }

    let first = first.clamp(1, 13);
    let stop = last.saturating_add(1).clamp(1, 13);
    Ok(MonthSelection::Series {
        first: first as u32,
        last: (stop - 1) as u32,
    })
}

impl FromStr for MonthSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for MonthSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthSelection::All => f.write_str("all"),
            MonthSelection::Month(m) => write!(f, "{}", m),
            MonthSelection::Series { first, last } => write!(f, "{}-{}", first, last),
        }
    }
}

/// Output file for one render: `{name}_{year}_{month}.png`.
pub fn output_file_name(name: &str, year: impl fmt::Display, month: impl fmt::Display) -> String {
    format!("{}_{}_{}.png", name, year, month)
}
