//! Duplicate / Upgrade Advice
//!
//! Decides how a local asset relates to what the server already holds.
//!
//! ## Overview
//!
//! [`evaluate`] is a pure function of the [`AssetIndex`] and the candidate
//! [`LocalAsset`]:
//!
//! 1. A device-asset-ID hit means the server has this exact file
//! 2. Otherwise the server assets sharing the file name are scanned in
//!    insertion order; the first whose capture time is within
//!    [`DATE_TOLERANCE_MINUTES`] of the local one decides by file size
//! 3. Nothing matched: the asset is new
//!
//! A larger local file is an upgrade of the server copy, a smaller one is
//! inferior to it.
//!
//! ## Usage
//!
//! ```
//! use bridge_traits::{LocalAsset, ServerAsset};
//! use chrono::{TimeZone, Utc};
//! use core_sync::advice::{evaluate, Verdict};
//! use core_sync::asset_index::AssetIndex;
//!
//! let taken = Utc.with_ymd_and_hms(2023, 7, 14, 9, 30, 0).unwrap();
//! let index = AssetIndex::new(vec![
//!     ServerAsset::new("srv-1", "photo.jpg", 100 * 1024).with_capture_time(taken),
//! ]);
//!
//! let local = LocalAsset::new("photo.jpg", 150 * 1024).with_capture_time(taken);
//! let advice = evaluate(&index, &local);
//! assert!(matches!(advice.verdict, Verdict::SmallerOnServer(_)));
//! ```

use crate::asset_index::AssetIndex;
use bridge_traits::{LocalAsset, ServerAsset};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

/// Capture times closer than this many minutes are considered the same shot
pub const DATE_TOLERANCE_MINUTES: i64 = 5;

/// Outcome of comparing a local asset with the server catalogue
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Nothing usable to compare
    IDontKnow,
    /// The server holds a smaller version; the local file is an upgrade
    SmallerOnServer(ServerAsset),
    /// The server holds a larger version
    BetterOnServer(ServerAsset),
    /// The server holds this file
    SameOnServer(ServerAsset),
    NotOnServer,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IDontKnow => "i_dont_know",
            Self::SmallerOnServer(_) => "smaller_on_server",
            Self::BetterOnServer(_) => "better_on_server",
            Self::SameOnServer(_) => "same_on_server",
            Self::NotOnServer => "not_on_server",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Advice {
    pub verdict: Verdict,
    pub message: String,
}

impl Advice {
    /// Server asset the verdict refers to, if any
    pub fn server_asset(&self) -> Option<&ServerAsset> {
        match &self.verdict {
            Verdict::SmallerOnServer(sa) | Verdict::BetterOnServer(sa) | Verdict::SameOnServer(sa) => {
                Some(sa)
            }
            Verdict::IDontKnow | Verdict::NotOnServer => None,
        }
    }

    fn same(sa: &ServerAsset) -> Self {
        Self {
            message: format!(
                "An asset with the same name:'{}', date:'{}' and size:'{}' exists on the server. No need to upload.",
                sa.original_file_name,
                format_date(sa.capture_time),
                format_bytes(sa.file_size)
            ),
            verdict: Verdict::SameOnServer(sa.clone()),
        }
    }

    fn smaller(sa: &ServerAsset) -> Self {
        Self {
            message: format!(
                "The server has a similar asset: '{}', date:'{}' and size:'{}'. The local one is bigger, upgrading the server.",
                sa.original_file_name,
                format_date(sa.capture_time),
                format_bytes(sa.file_size)
            ),
            verdict: Verdict::SmallerOnServer(sa.clone()),
        }
    }

    fn better(sa: &ServerAsset) -> Self {
        Self {
            message: format!(
                "The server has a better asset: '{}', date:'{}' and size:'{}'. The local one is smaller.",
                sa.original_file_name,
                format_date(sa.capture_time),
                format_bytes(sa.file_size)
            ),
            verdict: Verdict::BetterOnServer(sa.clone()),
        }
    }

    fn not_on_server() -> Self {
        Self {
            verdict: Verdict::NotOnServer,
            message: "This is a new asset, upload it.".to_string(),
        }
    }

    fn dont_know(file_name: &str) -> Self {
        Self {
            verdict: Verdict::IDontKnow,
            message: format!("Can't decide what to do with '{}'", file_name),
        }
    }
}

/// Compare two capture times with [`DATE_TOLERANCE_MINUTES`] of slack
///
/// Returns `Equal` when they are less than five minutes apart, otherwise
/// the ordering of `a` relative to `b`.
pub fn compare_dates(a: DateTime<Utc>, b: DateTime<Utc>) -> Ordering {
    let delta = a - b;
    if delta.abs() < Duration::minutes(DATE_TOLERANCE_MINUTES) {
        Ordering::Equal
    } else if delta > Duration::zero() {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

/// Same shot: both capture times known and within tolerance
pub fn same_moment(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if compare_dates(a, b) == Ordering::Equal)
}

/// Decide what to do with `local` given the server catalogue
pub fn evaluate(index: &AssetIndex, local: &LocalAsset) -> Advice {
    if let Some(sa) = index.by_device_id(&local.device_asset_id()) {
        return Advice::same(sa);
    }

    let file_name = local.effective_file_name();
    if file_name.is_empty() {
        return Advice::dont_know(&local.file_name);
    }

    let matched = index
        .by_name(&file_name)
        .find(|sa| match (local.capture_time, sa.capture_time) {
            // both undated: name and size decide
            (None, None) => true,
            (local_time, server_time) => same_moment(local_time, server_time),
        });

    match matched {
        Some(sa) => match local.size.cmp(&sa.file_size) {
            Ordering::Equal => Advice::same(sa),
            Ordering::Greater => Advice::smaller(sa),
            Ordering::Less => Advice::better(sa),
        },
        None => Advice::not_on_server(),
    }
}

/// Human readable byte count: `500 B`, `1.5 KB`, `1.0 MB`
pub fn format_bytes(bytes: u64) -> String {
    const UNIT: f64 = 1024.0;
    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / UNIT;
    let mut suffix = "KB";
    for next in ["MB", "GB"] {
        if value < UNIT {
            break;
        }
        value /= UNIT;
        suffix = next;
    }

    format!("{:.1} {}", (value * 10.0).round() / 10.0, suffix)
}

fn format_date(date: Option<DateTime<Utc>>) -> String {
    match date {
        Some(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 7, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_compare_dates_tolerance() {
        assert_eq!(compare_dates(at(10, 0, 0), at(10, 4, 59)), Ordering::Equal);
        assert_eq!(compare_dates(at(10, 4, 59), at(10, 0, 0)), Ordering::Equal);
        assert_eq!(compare_dates(at(10, 5, 0), at(10, 0, 0)), Ordering::Greater);
        assert_eq!(compare_dates(at(10, 0, 0), at(10, 5, 0)), Ordering::Less);
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(500), "500 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(1_048_576), "1.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024 * 1024), "5120.0 GB");
    }

    #[test]
    fn test_device_id_beats_name_heuristics() {
        let index = AssetIndex::new(vec![
            ServerAsset::new("by-name", "a.jpg", 99).with_capture_time(at(10, 0, 0)),
            ServerAsset::new("by-id", "renamed.jpg", 10).with_device_asset_id("a.jpg-10"),
        ]);
        let local = LocalAsset::new("a.jpg", 10).with_capture_time(at(10, 0, 0));

        let advice = evaluate(&index, &local);
        assert!(matches!(advice.verdict, Verdict::SameOnServer(_)));
        assert_eq!(advice.server_asset().map(|a| a.id.as_str()), Some("by-id"));
    }

    #[test]
    fn test_size_decides_between_same_smaller_and_better() {
        let index = AssetIndex::new(vec![
            ServerAsset::new("srv", "photo.jpg", 100 * 1024).with_capture_time(at(10, 0, 0)),
        ]);

        let same = LocalAsset::new("photo.jpg", 100 * 1024).with_capture_time(at(10, 1, 0));
        let bigger = LocalAsset::new("photo.jpg", 150 * 1024).with_capture_time(at(10, 0, 0));
        let smaller = LocalAsset::new("photo.jpg", 50 * 1024).with_capture_time(at(9, 58, 0));

        assert!(matches!(evaluate(&index, &same).verdict, Verdict::SameOnServer(_)));
        assert!(matches!(evaluate(&index, &bigger).verdict, Verdict::SmallerOnServer(_)));
        assert!(matches!(evaluate(&index, &smaller).verdict, Verdict::BetterOnServer(_)));
    }

    #[test]
    fn test_upgrade_message_mentions_server_copy() {
        let index = AssetIndex::new(vec![
            ServerAsset::new("srv", "photo.jpg", 100 * 1024).with_capture_time(at(10, 0, 0)),
        ]);
        let local = LocalAsset::new("photo.jpg", 150 * 1024).with_capture_time(at(10, 0, 0));

        let advice = evaluate(&index, &local);
        assert!(advice.message.contains("photo.jpg"));
        assert!(advice.message.contains("2023-07-14 10:00:00"));
        assert!(advice.message.contains("100.0 KB"));
    }

    #[test]
    fn test_not_on_server() {
        let index = AssetIndex::new(vec![
            ServerAsset::new("srv", "photo.jpg", 10).with_capture_time(at(10, 0, 0)),
        ]);

        let other_name = LocalAsset::new("other.jpg", 10).with_capture_time(at(10, 0, 0));
        let other_time = LocalAsset::new("photo.jpg", 10).with_capture_time(at(12, 0, 0));
        let no_time = LocalAsset::new("photo.jpg", 10);

        assert_eq!(evaluate(&index, &other_name).verdict, Verdict::NotOnServer);
        assert_eq!(evaluate(&index, &other_time).verdict, Verdict::NotOnServer);
        assert_eq!(evaluate(&index, &no_time).verdict, Verdict::NotOnServer);
    }

    #[test]
    fn test_undated_on_both_sides_compares_size() {
        let index = AssetIndex::new(vec![ServerAsset::new("srv", "scan.jpg", 10)]);

        let same = LocalAsset::new("scans/scan.jpg", 10).with_title("scan");
        let advice = evaluate(&index, &same);
        assert!(matches!(advice.verdict, Verdict::SameOnServer(_)));
        assert_eq!(advice.server_asset().map(|a| a.id.as_str()), Some("srv"));

        let larger = LocalAsset::new("scans/scan.jpg", 20).with_title("scan");
        assert!(matches!(
            evaluate(&index, &larger).verdict,
            Verdict::SmallerOnServer(_)
        ));

        let dated = LocalAsset::new("scans/scan.jpg", 10)
            .with_title("scan")
            .with_capture_time(at(10, 0, 0));
        assert_eq!(evaluate(&index, &dated).verdict, Verdict::NotOnServer);
    }

    #[test]
    fn test_first_matching_candidate_wins() {
        let index = AssetIndex::new(vec![
            ServerAsset::new("far", "IMG.jpg", 10).with_capture_time(at(8, 0, 0)),
            ServerAsset::new("first", "IMG.jpg", 20).with_capture_time(at(10, 2, 0)),
            ServerAsset::new("second", "IMG.jpg", 10).with_capture_time(at(10, 0, 0)),
        ]);
        let local = LocalAsset::new("IMG.jpg", 10).with_capture_time(at(10, 0, 0));

        let advice = evaluate(&index, &local);
        assert!(matches!(advice.verdict, Verdict::BetterOnServer(_)));
        assert_eq!(advice.server_asset().map(|a| a.id.as_str()), Some("first"));
    }

    #[test]
    fn test_empty_name_is_undecidable() {
        let index = AssetIndex::default();
        let local = LocalAsset::new("", 0);
        let advice = evaluate(&index, &local);
        assert_eq!(advice.verdict, Verdict::IDontKnow);
        assert!(advice.server_asset().is_none());
    }

    #[test]
    fn test_evaluate_is_pure() {
        let index = AssetIndex::new(vec![
            ServerAsset::new("srv", "photo.jpg", 10).with_capture_time(at(10, 0, 0)),
        ]);
        let local = LocalAsset::new("photo.jpg", 12).with_capture_time(at(10, 0, 0));
        assert_eq!(evaluate(&index, &local), evaluate(&index, &local));
    }
}
