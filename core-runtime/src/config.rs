//! # Upload Configuration
//!
//! Provides the policy switches that drive an upload run.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct an
//! `UploadConfig`. It enforces fail-fast validation so contradictory switches
//! are rejected before the server catalogue is even fetched.
//!
//! ## Switch Families
//!
//! - **Run mode**: `dry_run`, `delete_local`
//! - **Albums**: `create_albums`, `create_album_after_folder`,
//!   `import_into_album`, `partner_album`, `keep_untitled`,
//!   `use_folder_as_album_name`
//! - **Selection**: `keep_partner`, `keep_trashed`, `discard_archived`,
//!   `from_album`, `date_range`
//! - **Stacking**: `create_stacks`, `stack_jpg_raw`, `stack_burst`
//!
//! ## Usage
//!
//! ```
//! use core_runtime::config::UploadConfig;
//!
//! let config = UploadConfig::builder()
//!     .import_into_album("Imported")
//!     .date_range("2023-01,2023-06".parse().unwrap())
//!     .dry_run(true)
//!     .build()
//!     .expect("valid config");
//!
//! assert!(config.create_stacks);
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::UploadConfig;
//!
//! // A partner album is useless when partner assets are excluded
//! let config = UploadConfig::builder()
//!     .partner_album("Partner")
//!     .keep_partner(false)
//!     .build()
//!     .expect("Should fail - partner album without partner assets");
//! ```

use crate::error::{Error, Result};
use chrono::{DateTime, Datelike, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Half-open capture-time window `[after, before)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub after: DateTime<Utc>,
    pub before: DateTime<Utc>,
}

impl DateRange {
    pub fn new(after: DateTime<Utc>, before: DateTime<Utc>) -> Result<Self> {
        if after >= before {
            return Err(Error::Config(format!(
                "Date range is empty: {} is not before {}",
                after, before
            )));
        }
        Ok(Self { after, before })
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.after && time < self.before
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{}",
            self.after.format("%Y-%m-%d"),
            self.before.format("%Y-%m-%d")
        )
    }
}

/// Accepts `YYYY`, `YYYY-MM`, `YYYY-MM-DD`, or two of those joined by a comma.
/// A single value covers the whole year, month or day it names.
impl FromStr for DateRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(',') {
            Some((start, end)) => {
                let (after, _) = parse_period(start)?;
                let (_, before) = parse_period(end)?;
                Self::new(after, before)
            }
            None => {
                let (after, before) = parse_period(s)?;
                Self::new(after, before)
            }
        }
    }
}

fn parse_period(s: &str) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let s = s.trim();
    let invalid = || Error::Config(format!("Invalid date '{}', expected YYYY[-MM[-DD]]", s));

    let parts: Vec<&str> = s.split('-').collect();
    let numbers = parts
        .iter()
        .map(|p| p.parse::<u32>().map_err(|_| invalid()))
        .collect::<Result<Vec<u32>>>()?;

    let (start, end) = match numbers.as_slice() {
        [year] => {
            let start = NaiveDate::from_ymd_opt(*year as i32, 1, 1).ok_or_else(invalid)?;
            (start, start.with_year(start.year() + 1).ok_or_else(invalid)?)
        }
        [year, month] => {
            let start = NaiveDate::from_ymd_opt(*year as i32, *month, 1).ok_or_else(invalid)?;
            (start, start.checked_add_months(Months::new(1)).ok_or_else(invalid)?)
        }
        [year, month, day] => {
            let start = NaiveDate::from_ymd_opt(*year as i32, *month, *day).ok_or_else(invalid)?;
            (start, start.succ_opt().ok_or_else(invalid)?)
        }
        _ => return Err(invalid()),
    };

    let to_utc = |d: NaiveDate| Utc.from_utc_datetime(&d.and_time(chrono::NaiveTime::MIN));
    Ok((to_utc(start), to_utc(end)))
}

/// Policy switches for one upload run.
///
/// Use [`UploadConfigBuilder`] to construct instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Report what would happen without touching the server or the source
    pub dry_run: bool,

    /// Delete local originals once they are safely on the server
    pub delete_local: bool,

    /// Recreate the albums found in an archive source
    pub create_albums: bool,

    /// Folder sources: file each asset into an album named after its folder
    pub create_album_after_folder: bool,

    /// Put every asset into this album
    pub import_into_album: Option<String>,

    /// Put partner assets into this album
    pub partner_album: Option<String>,

    /// Import assets from a linked partner account
    pub keep_partner: bool,

    /// Import assets the source marks as trashed
    pub keep_trashed: bool,

    /// Keep albums without a title (named after their folder)
    pub keep_untitled: bool,

    /// Archive sources: name albums after their folder instead of their title
    pub use_folder_as_album_name: bool,

    /// Skip assets the source marks as archived
    pub discard_archived: bool,

    /// Only import assets that belong to this album
    pub from_album: Option<String>,

    /// Only import assets captured inside this window
    pub date_range: Option<DateRange>,

    /// Group raw/jpg pairs and bursts into stacks
    pub create_stacks: bool,

    /// Stack raw and compressed variants of the same shot
    pub stack_jpg_raw: bool,

    /// Stack burst sequences
    pub stack_burst: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            delete_local: false,
            create_albums: true,
            create_album_after_folder: false,
            import_into_album: None,
            partner_album: None,
            keep_partner: true,
            keep_trashed: false,
            keep_untitled: false,
            use_folder_as_album_name: false,
            discard_archived: false,
            from_album: None,
            date_range: None,
            create_stacks: true,
            stack_jpg_raw: true,
            stack_burst: true,
        }
    }
}

impl UploadConfig {
    /// Creates a new builder for constructing an `UploadConfig`.
    pub fn builder() -> UploadConfigBuilder {
        UploadConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Album names, when given, are not blank
    /// - A partner album is only set when partner assets are kept
    /// - Stacking switches are consistent
    pub fn validate(&self) -> Result<()> {
        for (switch, value) in [
            ("import_into_album", &self.import_into_album),
            ("partner_album", &self.partner_album),
            ("from_album", &self.from_album),
        ] {
            if matches!(value, Some(name) if name.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "{} cannot be blank. Omit the switch to disable it.",
                    switch
                )));
            }
        }

        if self.partner_album.is_some() && !self.keep_partner {
            return Err(Error::Config(
                "partner_album is set but partner assets are excluded. \
                 Enable keep_partner or drop the partner album."
                    .to_string(),
            ));
        }

        if !self.create_stacks && (self.stack_jpg_raw || self.stack_burst) {
            return Err(Error::Config(
                "Stacking is disabled but a stack kind is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether any album bookkeeping is needed at the end of the run
    pub fn manages_albums(&self) -> bool {
        self.create_albums
            || self.create_album_after_folder
            || (self.keep_partner && self.partner_album.is_some())
            || self.import_into_album.is_some()
    }
}

/// Builder for constructing [`UploadConfig`] instances.
///
/// Unset switches keep the defaults of [`UploadConfig::default`]. Enabling
/// either stack kind turns stacking on; disabling stacking turns both kinds
/// off.
#[derive(Debug, Default)]
pub struct UploadConfigBuilder {
    dry_run: Option<bool>,
    delete_local: Option<bool>,
    create_albums: Option<bool>,
    create_album_after_folder: Option<bool>,
    import_into_album: Option<String>,
    partner_album: Option<String>,
    keep_partner: Option<bool>,
    keep_trashed: Option<bool>,
    keep_untitled: Option<bool>,
    use_folder_as_album_name: Option<bool>,
    discard_archived: Option<bool>,
    from_album: Option<String>,
    date_range: Option<DateRange>,
    create_stacks: Option<bool>,
    stack_jpg_raw: Option<bool>,
    stack_burst: Option<bool>,
}

impl UploadConfigBuilder {
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = Some(enabled);
        self
    }

    pub fn delete_local(mut self, enabled: bool) -> Self {
        self.delete_local = Some(enabled);
        self
    }

    pub fn create_albums(mut self, enabled: bool) -> Self {
        self.create_albums = Some(enabled);
        self
    }

    pub fn create_album_after_folder(mut self, enabled: bool) -> Self {
        self.create_album_after_folder = Some(enabled);
        self
    }

    pub fn import_into_album(mut self, name: impl Into<String>) -> Self {
        self.import_into_album = Some(name.into());
        self
    }

    pub fn partner_album(mut self, name: impl Into<String>) -> Self {
        self.partner_album = Some(name.into());
        self
    }

    pub fn keep_partner(mut self, enabled: bool) -> Self {
        self.keep_partner = Some(enabled);
        self
    }

    pub fn keep_trashed(mut self, enabled: bool) -> Self {
        self.keep_trashed = Some(enabled);
        self
    }

    pub fn keep_untitled(mut self, enabled: bool) -> Self {
        self.keep_untitled = Some(enabled);
        self
    }

    pub fn use_folder_as_album_name(mut self, enabled: bool) -> Self {
        self.use_folder_as_album_name = Some(enabled);
        self
    }

    pub fn discard_archived(mut self, enabled: bool) -> Self {
        self.discard_archived = Some(enabled);
        self
    }

    pub fn from_album(mut self, name: impl Into<String>) -> Self {
        self.from_album = Some(name.into());
        self
    }

    pub fn date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn create_stacks(mut self, enabled: bool) -> Self {
        self.create_stacks = Some(enabled);
        self
    }

    pub fn stack_jpg_raw(mut self, enabled: bool) -> Self {
        self.stack_jpg_raw = Some(enabled);
        self
    }

    pub fn stack_burst(mut self, enabled: bool) -> Self {
        self.stack_burst = Some(enabled);
        self
    }

    /// Builds the final `UploadConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the switches contradict each other.
    pub fn build(self) -> Result<UploadConfig> {
        let defaults = UploadConfig::default();

        let mut stack_jpg_raw = self.stack_jpg_raw.unwrap_or(defaults.stack_jpg_raw);
        let mut stack_burst = self.stack_burst.unwrap_or(defaults.stack_burst);
        let create_stacks = match self.create_stacks {
            Some(false) => {
                stack_jpg_raw = self.stack_jpg_raw.unwrap_or(false);
                stack_burst = self.stack_burst.unwrap_or(false);
                stack_jpg_raw || stack_burst
            }
            Some(true) => true,
            None => stack_jpg_raw || stack_burst,
        };

        let config = UploadConfig {
            dry_run: self.dry_run.unwrap_or(defaults.dry_run),
            delete_local: self.delete_local.unwrap_or(defaults.delete_local),
            create_albums: self.create_albums.unwrap_or(defaults.create_albums),
            create_album_after_folder: self
                .create_album_after_folder
                .unwrap_or(defaults.create_album_after_folder),
            import_into_album: self.import_into_album,
            partner_album: self.partner_album,
            keep_partner: self.keep_partner.unwrap_or(defaults.keep_partner),
            keep_trashed: self.keep_trashed.unwrap_or(defaults.keep_trashed),
            keep_untitled: self.keep_untitled.unwrap_or(defaults.keep_untitled),
            use_folder_as_album_name: self
                .use_folder_as_album_name
                .unwrap_or(defaults.use_folder_as_album_name),
            discard_archived: self.discard_archived.unwrap_or(defaults.discard_archived),
            from_album: self.from_album,
            date_range: self.date_range,
            create_stacks,
            stack_jpg_raw,
            stack_burst,
        };

        config.validate()?;

        Ok(config)
    }
}
