//! Asset selection filters applied before an asset is evaluated.

use bridge_traits::{LocalAsset, SourceKind};
use core_runtime::config::UploadConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Selected,
    Rejected(String),
}

/// Drop album memberships without a title unless untitled albums are kept
pub fn strip_untitled_albums(asset: &mut LocalAsset, config: &UploadConfig) {
    if !config.keep_untitled {
        asset.albums.retain(|album| !album.name.trim().is_empty());
    }
}

/// Decide whether the run should handle this asset at all
pub fn check(asset: &LocalAsset, config: &UploadConfig, kind: SourceKind) -> Selection {
    if asset.from_partner && !config.keep_partner {
        return Selection::Rejected("partner's asset excluded".to_string());
    }

    if asset.trashed && !config.keep_trashed {
        return Selection::Rejected("trashed asset excluded".to_string());
    }

    if let Some(from_album) = config.from_album.as_deref() {
        let member = asset
            .albums
            .iter()
            .any(|album| crate::dispatch::album_name(album, config, kind) == from_album);
        if !member {
            return Selection::Rejected(format!("asset excluded: not in album '{}'", from_album));
        }
    }

    if asset.archived && config.discard_archived {
        return Selection::Rejected("archived asset discarded".to_string());
    }

    if let Some(range) = config.date_range {
        match asset.capture_time {
            Some(time) if range.contains(time) => {}
            Some(_) => {
                return Selection::Rejected(format!("asset outside of the date range {}", range));
            }
            None => {
                return Selection::Rejected("asset has no capture date, date range set".to_string());
            }
        }
    }

    Selection::Selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::LocalAlbum;
    use chrono::{TimeZone, Utc};

    fn asset() -> LocalAsset {
        LocalAsset::new("Takeout/Photos/IMG_0001.jpg", 100)
            .with_capture_time(Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_default_config_selects_plain_asset() {
        let config = UploadConfig::default();
        assert_eq!(check(&asset(), &config, SourceKind::Folder), Selection::Selected);
    }

    #[test]
    fn test_partner_and_trashed_filters() {
        let mut partner = asset();
        partner.from_partner = true;
        let mut trashed = asset();
        trashed.trashed = true;

        let keep_all = UploadConfig::default();
        assert_eq!(check(&partner, &keep_all, SourceKind::Archive), Selection::Selected);
        assert!(matches!(check(&trashed, &keep_all, SourceKind::Archive), Selection::Rejected(_)));

        let strict = UploadConfig::builder().keep_partner(false).build().unwrap();
        assert!(matches!(check(&partner, &strict, SourceKind::Archive), Selection::Rejected(_)));

        let lenient = UploadConfig::builder().keep_trashed(true).build().unwrap();
        assert_eq!(check(&trashed, &lenient, SourceKind::Archive), Selection::Selected);
    }

    #[test]
    fn test_from_album_filter() {
        let config = UploadConfig::builder().from_album("Trip").build().unwrap();
        let member = asset().with_album(LocalAlbum::new("Trip", "Takeout/Trip"));

        assert_eq!(check(&member, &config, SourceKind::Archive), Selection::Selected);
        assert!(matches!(check(&asset(), &config, SourceKind::Archive), Selection::Rejected(_)));
    }

    #[test]
    fn test_discard_archived() {
        let mut archived = asset();
        archived.archived = true;

        let config = UploadConfig::builder().discard_archived(true).build().unwrap();
        assert!(matches!(check(&archived, &config, SourceKind::Archive), Selection::Rejected(_)));
        assert_eq!(check(&archived, &UploadConfig::default(), SourceKind::Archive), Selection::Selected);
    }

    #[test]
    fn test_date_range_filter() {
        let config = UploadConfig::builder()
            .date_range("2023-05".parse().unwrap())
            .build()
            .unwrap();

        assert_eq!(check(&asset(), &config, SourceKind::Folder), Selection::Selected);

        let undated = LocalAsset::new("x.jpg", 1);
        assert!(matches!(check(&undated, &config, SourceKind::Folder), Selection::Rejected(_)));

        let old = LocalAsset::new("x.jpg", 1)
            .with_capture_time(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        match check(&old, &config, SourceKind::Folder) {
            Selection::Rejected(reason) => assert!(reason.contains("2023-05-01")),
            Selection::Selected => panic!("old asset should be rejected"),
        }
    }

    #[test]
    fn test_strip_untitled_albums() {
        let mut with_untitled = asset()
            .with_album(LocalAlbum::new("", "Takeout/Untitled(1)"))
            .with_album(LocalAlbum::new("Trip", "Takeout/Trip"));

        let keep = UploadConfig::builder().keep_untitled(true).build().unwrap();
        strip_untitled_albums(&mut with_untitled, &keep);
        assert_eq!(with_untitled.albums.len(), 2);

        strip_untitled_albums(&mut with_untitled, &UploadConfig::default());
        assert_eq!(with_untitled.albums.len(), 1);
        assert_eq!(with_untitled.albums[0].name, "Trip");
    }
}
