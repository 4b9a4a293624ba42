//! Figure number → image file reconciliation.
//!
//! Relationship order inside a DOCX often differs from the order figures are
//! captioned in the text, so positional matching is only a fallback. When a
//! hand-curated override table is available it is authoritative.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Warning};
use crate::model::{FigureReference, ImageAsset};

/// Explicit figure number → file name table, e.g. loaded from
/// `{"1": "image16.png", "2": "image13.png"}`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FigureOverrides {
    entries: BTreeMap<u32, String>,
}

impl FigureOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, number: u32, file_name: impl Into<String>) -> Self {
        self.entries.insert(number, file_name.into());
        self
    }

    pub fn get(&self, number: u32) -> Option<&str> {
        self.entries.get(&number).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn from_json_str(json: &str) -> Result<Self, Error> {
        let table: Self = serde_json::from_str(json).map_err(|e| Error::Overrides(e.to_string()))?;
        if table.entries.contains_key(&0) {
            return Err(Error::Overrides("figure numbers start at 1".into()));
        }
        if let Some((n, _)) = table.entries.iter().find(|(_, f)| f.trim().is_empty()) {
            return Err(Error::Overrides(format!("empty file name for figure {n}")));
        }
        Ok(table)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())))
        })?;
        Self::from_json_str(&json)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum ReconcileStrategy {
    /// K-th distinct figure number ↔ K-th extracted image.
    #[default]
    Positional,
    /// The table decides; numbers it does not mention fall back to
    /// positional matching only when `positional_fallback` is set.
    Overrides {
        table: FigureOverrides,
        positional_fallback: bool,
    },
}

/// Resolved figure number → asset file name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FigureMapping {
    entries: BTreeMap<u32, String>,
}

/// Distinct figure numbers in the order they are first captioned.
fn distinct_numbers(captions: &[FigureReference]) -> Vec<u32> {
    let mut seen = HashSet::new();
    captions
        .iter()
        .map(|c| c.number)
        .filter(|n| seen.insert(*n))
        .collect()
}

impl FigureMapping {
    pub fn build(
        captions: &[FigureReference],
        assets: &[ImageAsset],
        strategy: &ReconcileStrategy,
    ) -> Self {
        let mut by_sequence: Vec<&ImageAsset> = assets.iter().collect();
        by_sequence.sort_by_key(|a| a.sequence);

        let (table, fallback) = match strategy {
            ReconcileStrategy::Positional => (None, true),
            ReconcileStrategy::Overrides {
                table,
                positional_fallback,
            } => (Some(table), *positional_fallback),
        };

        let numbers = distinct_numbers(captions);
        // Assets named by an override are not handed out again positionally
        let claimed: HashSet<&str> = table
            .map(|t| t.entries.values().map(String::as_str).collect())
            .unwrap_or_default();
        let mut free = by_sequence
            .iter()
            .filter(|a| !claimed.contains(a.file_name.as_str()));
        let mut entries = BTreeMap::new();
        for number in numbers.iter().copied() {
            if let Some(file) = table.and_then(|t| t.get(number)) {
                entries.insert(number, file.to_string());
            } else if fallback && let Some(asset) = free.next() {
                entries.insert(number, asset.file_name.clone());
            }
        }
        // Overrides may name figures that are never captioned; keep them so
        // `resolve` answers consistently.
        if let Some(table) = table {
            for (number, file) in &table.entries {
                entries.entry(*number).or_insert_with(|| file.clone());
            }
        }

        if numbers.len() > by_sequence.len() && fallback {
            log::info!(
                "{} distinct figures but only {} images; trailing figures stay unmapped",
                numbers.len(),
                by_sequence.len()
            );
        }
        for (number, file) in &entries {
            log::debug!("Figure {number} -> {file}");
        }
        Self { entries }
    }

    /// Asset file name for a figure number, if one is mapped.
    pub fn resolve(&self, number: u32) -> Option<&str> {
        self.entries.get(&number).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.entries.iter().map(|(n, f)| (*n, f.as_str()))
    }

    /// Drop entries whose file does not exist in the asset directory.
    pub fn retain_available(
        &mut self,
        available: impl Fn(&str) -> bool,
        warnings: &mut Vec<Warning>,
    ) {
        let missing: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, f)| !available(f))
            .map(|(n, _)| *n)
            .collect();
        for number in missing {
            if let Some(file_name) = self.entries.remove(&number) {
                Warning::OverrideTargetMissing { number, file_name }.record(warnings);
            }
        }
    }

    /// Captions whose figure number has no mapped asset.
    pub fn unresolved<'a>(&self, captions: &'a [FigureReference]) -> Vec<&'a FigureReference> {
        captions
            .iter()
            .filter(|c| !self.entries.contains_key(&c.number))
            .collect()
    }
}
