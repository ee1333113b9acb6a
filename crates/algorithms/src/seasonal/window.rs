//! Season windows anchored to a water-year start month

use chrono::{Datelike, Months, NaiveDate};
use rivertrend_core::{Error, Result};
use serde::{Deserialize, Serialize};

pub const DRY_BAND_PREFIX: &str = "drySeasCompos";
pub const WET_BAND_PREFIX: &str = "wetSeasCompos";
pub const PERMANENT_BAND_PREFIX: &str = "prmSeasCompos";

/// Dry and wet windows of a composite year.
///
/// Year `Y` starts on the first of `year_start_month` in `Y`; each window
/// begins `offset` months later and spans `season_length` months.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeasonWindows {
    pub year_start_month: u32,
    pub season_length: u32,
    pub dry_offset: u32,
    pub dry_tag: String,
    pub wet_offset: u32,
    pub wet_tag: String,
    pub permanent_tag: String,
}

impl Default for SeasonWindows {
    fn default() -> Self {
        Self {
            year_start_month: 6,
            season_length: 3,
            dry_offset: 8,
            dry_tag: "_fma".into(),
            wet_offset: 4,
            wet_tag: "_ond".into(),
            permanent_tag: "_DnW".into(),
        }
    }
}

impl SeasonWindows {
    pub fn validate(&self) -> Result<()> {
        if !(1..=12).contains(&self.year_start_month) {
            return Err(Error::InvalidParameter {
                name: "year_start_month",
                value: self.year_start_month.to_string(),
                reason: "must be in 1..=12".into(),
            });
        }
        if self.season_length == 0 {
            return Err(Error::InvalidParameter {
                name: "season_length",
                value: "0".into(),
                reason: "must be at least one month".into(),
            });
        }
        // season tags are the last four characters of the band name
        for (name, tag) in [
            ("dry_tag", &self.dry_tag),
            ("wet_tag", &self.wet_tag),
            ("permanent_tag", &self.permanent_tag),
        ] {
            if tag.chars().count() != 4 {
                return Err(Error::InvalidParameter {
                    name,
                    value: tag.clone(),
                    reason: "must be exactly 4 characters".into(),
                });
            }
        }
        Ok(())
    }

    fn window(&self, year: i32, offset: u32) -> Vec<(i32, u32)> {
        let Some(start) = NaiveDate::from_ymd_opt(year, self.year_start_month, 1)
            .and_then(|d| d.checked_add_months(Months::new(offset)))
        else {
            return Vec::new();
        };
        (0..self.season_length)
            .filter_map(|i| start.checked_add_months(Months::new(i)))
            .map(|d| (d.year(), d.month()))
            .collect()
    }

    /// `(year, month)` pairs of the dry window of composite year `year`
    pub fn dry_months(&self, year: i32) -> Vec<(i32, u32)> {
        self.window(year, self.dry_offset)
    }

    pub fn wet_months(&self, year: i32) -> Vec<(i32, u32)> {
        self.window(year, self.wet_offset)
    }

    pub fn dry_band(&self) -> String {
        format!("{}{}", DRY_BAND_PREFIX, self.dry_tag)
    }

    pub fn wet_band(&self) -> String {
        format!("{}{}", WET_BAND_PREFIX, self.wet_tag)
    }

    pub fn permanent_band(&self) -> String {
        format!("{}{}", PERMANENT_BAND_PREFIX, self.permanent_tag)
    }

    /// Band names in page order: dry, wet, permanent
    pub fn band_names(&self) -> [String; 3] {
        [self.dry_band(), self.wet_band(), self.permanent_band()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_windows_follow_the_monsoon_year() {
        let w = SeasonWindows::default();
        assert_eq!(w.dry_months(2000), vec![(2001, 2), (2001, 3), (2001, 4)]);
        assert_eq!(w.wet_months(2000), vec![(2000, 10), (2000, 11), (2000, 12)]);
    }

    #[test]
    fn windows_cross_year_ends() {
        let w = SeasonWindows {
            wet_offset: 6,
            ..SeasonWindows::default()
        };
        assert_eq!(w.wet_months(2000), vec![(2000, 12), (2001, 1), (2001, 2)]);
    }

    #[test]
    fn band_names() {
        let w = SeasonWindows::default();
        assert_eq!(
            w.band_names(),
            [
                "drySeasCompos_fma".to_string(),
                "wetSeasCompos_ond".to_string(),
                "prmSeasCompos_DnW".to_string()
            ]
        );
    }

    #[test]
    fn validation() {
        assert!(SeasonWindows::default().validate().is_ok());
        let bad_month = SeasonWindows {
            year_start_month: 13,
            ..SeasonWindows::default()
        };
        assert!(bad_month.validate().is_err());
        let bad_tag = SeasonWindows {
            dry_tag: "_feb_apr".into(),
            ..SeasonWindows::default()
        };
        assert!(bad_tag.validate().is_err());
    }
}
