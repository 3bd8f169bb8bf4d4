//! Acquisition tokens encoded in EPU movie filenames
//!
//! EPU names every exposure after the foil hole and acquisition spot it was
//! taken from, and nests it under its grid square:
//! `GridSquare_<grid>/Data/FoilHole_<hole>_Data_<spot1>_<spot2>_<date>_<time>…`.

use crate::record::MetadataRecord;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, trace, warn};

const WITH_GRID_SQUARE: &str =
    r"(?:^|/)GridSquare_(\d+)/Data/FoilHole_(\d+)_Data_(\d+)_(\d+)_(\d+)_(\d+)[^/]*$";
const WITHOUT_GRID_SQUARE: &str = r"(?:^|/)FoilHole_(\d+)_Data_(\d+)_(\d+)_(\d+)_(\d+)[^/]*$";

fn patterns() -> &'static [(bool, Regex)] {
    static PATTERNS: OnceLock<Vec<(bool, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [(true, WITH_GRID_SQUARE), (false, WITHOUT_GRID_SQUARE)]
            .into_iter()
            .filter_map(|(grid, pattern)| match Regex::new(pattern) {
                Ok(regex) => Some((grid, regex)),
                Err(e) => {
                    warn!(pattern, error = %e, "filename pattern failed to compile");
                    None
                }
            })
            .collect()
    })
}

/// Tokens recovered from one acquisition filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameTokens {
    pub grid_square: Option<u64>,
    pub hole_number: u64,
    /// Acquisition spot digits as written in the name
    pub spot: (String, String),
    /// `YYYYMMDD`
    pub date: u32,
    /// `HHMM[SS]` with leading zeros dropped
    pub time: u32,
    raw_time: String,
}

impl FilenameTokens {
    /// Matches `path` against the grid-square form first, then the bare form.
    ///
    /// Backslash separators are accepted. Returns `None` when neither form
    /// matches or a number does not fit its field.
    ///
    /// # Examples
    ///
    /// ```
    /// use cryoflow_meta::FilenameTokens;
    ///
    /// let tokens = FilenameTokens::parse(
    ///     "GridSquare_123/Data/FoilHole_28385656_Data_28397105_28397106_20180530_0221_Fractions.mrc",
    /// )
    /// .unwrap();
    /// assert_eq!(tokens.grid_square, Some(123));
    /// assert_eq!(tokens.spot_number(), Some(2839710528397106));
    /// assert_eq!(tokens.time, 221);
    /// ```
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.replace('\\', "/");

        for (has_grid, regex) in patterns() {
            let Some(caps) = regex.captures(&path) else {
                continue;
            };
            let group = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();
            let offset = usize::from(*has_grid);

            let tokens = (|| {
                let grid_square = if *has_grid {
                    Some(group(1).parse().ok()?)
                } else {
                    None
                };
                Some(FilenameTokens {
                    grid_square,
                    hole_number: group(1 + offset).parse().ok()?,
                    spot: (group(2 + offset).to_string(), group(3 + offset).to_string()),
                    date: group(4 + offset).parse().ok()?,
                    time: group(5 + offset).parse().ok()?,
                    raw_time: group(5 + offset).to_string(),
                })
            })();

            match tokens {
                Some(tokens) => {
                    trace!(path = %path, ?tokens, "filename tokens");
                    return Some(tokens);
                }
                None => debug!(path = %path, has_grid = *has_grid, "numeric token out of range"),
            }
        }

        None
    }

    /// Both spot numbers joined without a separator.
    ///
    /// This is the historical `SpotNumber` column; the pair cannot be recovered
    /// from it, use [`spot_pair`](Self::spot_pair) for that.
    pub fn spot_number(&self) -> Option<u128> {
        format!("{}{}", self.spot.0, self.spot.1).parse().ok()
    }

    /// The two spot numbers kept apart.
    pub fn spot_pair(&self) -> Option<(u64, u64)> {
        Some((self.spot.0.parse().ok()?, self.spot.1.parse().ok()?))
    }

    /// Acquisition timestamp from the date and `HHMM` / `HHMMSS` time tokens.
    pub fn acquired_at(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::parse_from_str(&self.date.to_string(), "%Y%m%d").ok()?;
        let time = match self.raw_time.len() {
            4 => NaiveTime::parse_from_str(&self.raw_time, "%H%M").ok()?,
            6 => NaiveTime::parse_from_str(&self.raw_time, "%H%M%S").ok()?,
            _ => return None,
        };
        Some(date.and_time(time))
    }

    /// Record with `GridSquare` (when present), `HoleNumber`, `SpotNumber`,
    /// `Date` and `Time`.
    pub fn into_record(self) -> MetadataRecord {
        let mut record = MetadataRecord::new();
        if let Some(grid) = self.grid_square {
            record.insert("GridSquare", grid.to_string());
        }
        record.insert("HoleNumber", self.hole_number.to_string());
        if let Some(spot) = self.spot_number() {
            record.insert("SpotNumber", spot.to_string());
        }
        record.insert("Date", self.date.to_string());
        record.insert("Time", self.time.to_string());
        record
    }
}

/// Filename tokens as a record; empty when the path has no recognised form.
pub fn parse_filename(path: &str) -> MetadataRecord {
    FilenameTokens::parse(path)
        .map(FilenameTokens::into_record)
        .unwrap_or_default()
}
