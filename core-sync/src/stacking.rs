//! Stack Builder
//!
//! Groups uploaded assets that are variants of the same shot.
//!
//! ## Overview
//!
//! Every successful, non-duplicate upload is fed to
//! [`StackBuilder::process_asset`] in upload order. Once the stream is
//! exhausted [`StackBuilder::stacks`] derives the stacks:
//!
//! - **Raw + compressed pairs**: `IMG_0001.CR2` and `IMG_0001.JPG` in the
//!   same folder, taken at the same moment. The compressed file is the cover.
//! - **Bursts**: `IMG_20231014_183246_BURST001_COVER.jpg` style (Huawei,
//!   Pixel) or `20231014_183246_001.jpg` style (Samsung) sequences, split
//!   where two consecutive shots are more than [`BURST_GAP_SECONDS`] apart.
//!
//! Pairing is decided first; an asset belongs to at most one stack and
//! stacks of a single asset are dropped.

use crate::advice::same_moment;
use bridge_traits::source::{base_name, extension};
use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Largest gap between two consecutive shots of one burst
pub const BURST_GAP_SECONDS: i64 = 2;

const RAW_EXTENSIONS: &[&str] = &[
    "3fr", "arw", "cr2", "cr3", "crw", "dng", "erf", "kdc", "mrw", "nef", "nrw", "orf", "pef",
    "raf", "raw", "rw2", "sr2", "srf", "srw", "x3f",
];

const COMPRESSED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "heic", "heif", "png", "webp"];

static HUAWEI_BURST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<prefix>.+)_BURST(?P<seq>\d+)(?P<cover>_COVER)?$").expect("valid regex")
});

static SAMSUNG_BURST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>\d{8}_\d{6})_(?P<seq>\d{3})$").expect("valid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackType {
    RawJpg,
    Burst,
}

impl StackType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RawJpg => "raw_jpg",
            Self::Burst => "burst",
        }
    }
}

impl std::fmt::Display for StackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stack {
    pub cover_id: String,
    /// All members, cover first
    pub ids: Vec<String>,
    pub stack_type: StackType,
    /// File names of the members, in the order of `ids`
    pub names: Vec<String>,
}

impl Stack {
    /// Members other than the cover
    pub fn member_ids(&self) -> &[String] {
        self.ids.get(1..).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
struct Entry {
    id: String,
    file_name: String,
    capture_time: DateTime<Utc>,
}

impl Entry {
    fn directory(&self) -> &str {
        self.file_name
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    }

    fn name(&self) -> &str {
        base_name(&self.file_name)
    }

    fn stem(&self) -> &str {
        let name = self.name();
        match extension(name) {
            Some(ext) => &name[..name.len() - ext.len() - 1],
            None => name,
        }
    }

    fn extension_lowercase(&self) -> Option<String> {
        extension(&self.file_name).map(str::to_ascii_lowercase)
    }

    fn is_raw(&self) -> bool {
        self.extension_lowercase()
            .is_some_and(|ext| RAW_EXTENSIONS.contains(&ext.as_str()))
    }

    fn is_compressed(&self) -> bool {
        self.extension_lowercase()
            .is_some_and(|ext| COMPRESSED_EXTENSIONS.contains(&ext.as_str()))
    }
}

/// Burst membership parsed from a file name
struct BurstKey {
    prefix: String,
    sequence: u64,
    cover: bool,
}

fn burst_key(stem: &str) -> Option<BurstKey> {
    if let Some(caps) = HUAWEI_BURST.captures(stem) {
        return Some(BurstKey {
            prefix: caps["prefix"].to_string(),
            sequence: caps["seq"].parse().unwrap_or(0),
            cover: caps.name("cover").is_some(),
        });
    }
    SAMSUNG_BURST.captures(stem).map(|caps| BurstKey {
        prefix: caps["prefix"].to_string(),
        sequence: caps["seq"].parse().unwrap_or(0),
        cover: false,
    })
}

/// Accumulates uploaded assets and derives their stacks
#[derive(Debug, Default, Clone)]
pub struct StackBuilder {
    entries: Vec<Entry>,
}

impl StackBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an uploaded asset; assets without a capture time are ignored
    pub fn process_asset(
        &mut self,
        id: impl Into<String>,
        file_name: impl Into<String>,
        capture_time: Option<DateTime<Utc>>,
    ) {
        let Some(capture_time) = capture_time else {
            return;
        };
        self.entries.push(Entry {
            id: id.into(),
            file_name: file_name.into(),
            capture_time,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Derive the stacks from everything registered so far
    ///
    /// Pure: calling it twice yields the same stacks.
    pub fn stacks(&self) -> Vec<Stack> {
        let mut used = HashSet::new();
        // (earliest upload position, stack)
        let mut found: Vec<(usize, Stack)> = Vec::new();

        found.extend(self.raw_jpg_stacks(&mut used));
        found.extend(self.burst_stacks(&used));

        found.sort_by_key(|(position, _)| *position);
        found.into_iter().map(|(_, stack)| stack).collect()
    }

    fn raw_jpg_stacks(&self, used: &mut HashSet<usize>) -> Vec<(usize, Stack)> {
        let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
        for (position, entry) in self.entries.iter().enumerate() {
            if entry.is_raw() || entry.is_compressed() {
                groups
                    .entry((entry.directory().to_string(), entry.stem().to_lowercase()))
                    .or_default()
                    .push(position);
            }
        }

        let mut stacks = Vec::new();
        for positions in groups.values() {
            for &cover in positions {
                let cover_entry = &self.entries[cover];
                if used.contains(&cover) || !cover_entry.is_compressed() {
                    continue;
                }

                let mut members = vec![cover];
                members.extend(positions.iter().copied().filter(|&p| {
                    p != cover
                        && !used.contains(&p)
                        && same_moment(
                            Some(self.entries[p].capture_time),
                            Some(cover_entry.capture_time),
                        )
                }));

                if !members.iter().any(|&p| self.entries[p].is_raw()) {
                    continue;
                }

                used.extend(members.iter().copied());
                let earliest = members.iter().copied().min().unwrap_or(cover);
                stacks.push((earliest, self.make_stack(&members, StackType::RawJpg)));
            }
        }
        stacks
    }

    fn burst_stacks(&self, used: &HashSet<usize>) -> Vec<(usize, Stack)> {
        let mut groups: BTreeMap<(String, String), Vec<(usize, BurstKey)>> = BTreeMap::new();
        for (position, entry) in self.entries.iter().enumerate() {
            if used.contains(&position) {
                continue;
            }
            if let Some(key) = burst_key(entry.stem()) {
                groups
                    .entry((entry.directory().to_string(), key.prefix.clone()))
                    .or_default()
                    .push((position, key));
            }
        }

        let gap = Duration::seconds(BURST_GAP_SECONDS);
        let mut stacks = Vec::new();
        for mut members in groups.into_values() {
            members.sort_by_key(|(p, key)| (self.entries[*p].capture_time, key.sequence));

            let mut runs: Vec<Vec<(usize, BurstKey)>> = Vec::new();
            for member in members {
                let continues = runs
                    .last()
                    .and_then(|run| run.last())
                    .is_some_and(|(last, _)| {
                        self.entries[member.0].capture_time - self.entries[*last].capture_time
                            <= gap
                    });
                match runs.last_mut() {
                    Some(run) if continues => run.push(member),
                    _ => runs.push(vec![member]),
                }
            }

            for run in runs.into_iter().filter(|run| run.len() >= 2) {
                let cover = run
                    .iter()
                    .position(|(_, key)| key.cover)
                    .unwrap_or(0);
                let mut ordered: Vec<usize> = run.iter().map(|(p, _)| *p).collect();
                let cover_position = ordered.remove(cover);
                ordered.insert(0, cover_position);

                let earliest = ordered.iter().copied().min().unwrap_or(cover_position);
                stacks.push((earliest, self.make_stack(&ordered, StackType::Burst)));
            }
        }
        stacks
    }

    fn make_stack(&self, positions: &[usize], stack_type: StackType) -> Stack {
        let ids: Vec<String> = positions.iter().map(|&p| self.entries[p].id.clone()).collect();
        Stack {
            cover_id: ids[0].clone(),
            names: positions
                .iter()
                .map(|&p| self.entries[p].name().to_string())
                .collect(),
            ids,
            stack_type,
        }
    }
}
