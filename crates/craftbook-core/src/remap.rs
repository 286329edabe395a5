//! Recipe identity across rebuilds.
//!
//! Recipe ids are not stable between data exports, yet saved plans refer to
//! them. Each build fingerprints its recipes by content and matches the
//! previous build's retired ids against them, then carries the previous
//! build's own remap table forward so that every historical id resolves to
//! a current recipe in one lookup.
//!
//! Two fingerprints are kept per recipe, both over the category name and
//! the I/O entries in canonical order. Entries with a zero amount are left
//! out unless they are outputs (non-consumed inputs such as programmed
//! circuits are configuration, not content):
//!
//! - strict: each entry's goods id and amount;
//! - loose: each entry's goods id only, so a rebalanced recipe still maps.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::Xxh3;

use crate::dataset::Dataset;
use crate::graph::Recipe;
use crate::model::{IoKind, RecipeDef};

// ---------------------------------------------------------------------------
// Fingerprints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprints {
    pub strict: u128,
    pub loose: u128,
}

impl Fingerprints {
    pub fn of_def(recipe: &RecipeDef) -> Self {
        let mut fp = FingerprintBuilder::new(&recipe.category);
        for io in recipe.canonical_io() {
            fp.entry(io.kind, &io.goods, io.amount);
        }
        fp.finish()
    }

    /// Fingerprints of a recipe read back from an arena. Stored I/O is
    /// already in canonical order.
    pub fn of_view(recipe: &Recipe<'_>) -> Self {
        let category = recipe.category().map(|c| c.name());
        let mut fp = FingerprintBuilder::new(category.as_deref().unwrap_or(""));
        for io in recipe.io() {
            fp.entry(io.kind, io.goods.id(), io.amount);
        }
        fp.finish()
    }
}

/// Streams one recipe into both hashes.
pub struct FingerprintBuilder {
    strict: Xxh3,
    loose: Xxh3,
}

fn hash_str(hasher: &mut Xxh3, s: &str) {
    hasher.update(&(s.len() as u32).to_le_bytes());
    hasher.update(s.as_bytes());
}

impl FingerprintBuilder {
    pub fn new(category: &str) -> Self {
        let mut strict = Xxh3::new();
        let mut loose = Xxh3::new();
        hash_str(&mut strict, category);
        hash_str(&mut loose, category);
        Self { strict, loose }
    }

    /// Feed one I/O entry. Inputs with no amount (circuits, catalysts) are
    /// skipped; outputs always count.
    ///
    /// The role is not hashed, only the goods id and amount, so an entry
    /// that moves between the input and output sides keeps its place in the
    /// stream. Fingerprints stay compatible with arenas produced by earlier
    /// exporters, which hash the same way.
    pub fn entry(&mut self, kind: IoKind, goods: &str, amount: i32) {
        if amount <= 0 && !kind.is_output() {
            return;
        }
        hash_str(&mut self.strict, goods);
        self.strict.update(&amount.to_le_bytes());
        hash_str(&mut self.loose, goods);
    }

    pub fn finish(&self) -> Fingerprints {
        Fingerprints {
            strict: self.strict.digest128(),
            loose: self.loose.digest128(),
        }
    }
}

// ---------------------------------------------------------------------------
// Remap table
// ---------------------------------------------------------------------------

/// How to treat a loose fingerprint shared by several current recipes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemapPolicy {
    /// Take the first current recipe in build order.
    #[default]
    FirstWins,
    /// Leave the old id unresolved.
    RequireUniqueLoose,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapEntry {
    /// Retired recipe id.
    pub from: String,
    /// Current recipe id it resolves to.
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemapTable {
    entries: Vec<RemapEntry>,
}

impl RemapTable {
    pub fn entries(&self) -> &[RemapEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, from: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.from == from)
            .map(|e| e.to.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemapReport {
    /// Retired ids matched by fingerprint in this build.
    pub remapped: usize,
    /// Entries carried over from the previous remap table.
    pub carried: usize,
    /// Retired ids with no matching current recipe.
    pub unresolved: usize,
    /// Previous entries whose target no longer resolves.
    pub dropped_carried: usize,
    /// Loose matches where several current recipes shared the fingerprint.
    pub ambiguous_loose: usize,
    /// The previous arena could not be read and was ignored.
    pub previous_skipped: bool,
}

fn fingerprint_all(current: &[RecipeDef]) -> Vec<Fingerprints> {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        current.par_iter().map(Fingerprints::of_def).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        current.iter().map(Fingerprints::of_def).collect()
    }
}

/// Diff `previous` (a prior build's arena) against the recipes about to be
/// encoded. Never fails: problems are counted in the report.
pub fn compute_remaps(
    previous: Option<&[u8]>,
    current: &[RecipeDef],
    policy: RemapPolicy,
) -> (RemapTable, RemapReport) {
    let mut report = RemapReport::default();
    let mut table = RemapTable::default();
    let Some(previous) = previous else {
        return (table, report);
    };
    let previous = match Dataset::load(previous.to_vec()) {
        Ok(ds) => ds,
        Err(err) => {
            warn!(error = %err, "previous arena unreadable, recipe ids will not be remapped");
            report.previous_skipped = true;
            return (table, report);
        }
    };

    let by_id: FxHashMap<&str, usize> = current
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.as_str(), i))
        .collect();

    let prints = fingerprint_all(current);
    let mut strict: FxHashMap<u128, usize> = FxHashMap::default();
    let mut loose: FxHashMap<u128, (usize, usize)> = FxHashMap::default();
    for (i, fp) in prints.iter().enumerate() {
        strict.entry(fp.strict).or_insert(i);
        loose.entry(fp.loose).or_insert((i, 0)).1 += 1;
    }

    // Retired ids matched by content.
    let mut fresh: FxHashMap<String, usize> = FxHashMap::default();
    for recipe in previous.recipes() {
        let old_id = recipe.id();
        if by_id.contains_key(old_id) || fresh.contains_key(old_id) {
            continue;
        }
        let fp = Fingerprints::of_view(&recipe);
        let target = match strict.get(&fp.strict) {
            Some(&i) => Some(i),
            None => match loose.get(&fp.loose) {
                Some(&(i, 1)) => Some(i),
                Some(&(i, n)) => {
                    report.ambiguous_loose += 1;
                    warn!(
                        recipe = old_id,
                        candidates = n,
                        "loose fingerprint shared by several recipes"
                    );
                    match policy {
                        RemapPolicy::FirstWins => Some(i),
                        RemapPolicy::RequireUniqueLoose => None,
                    }
                }
                None => None,
            },
        };
        match target {
            Some(i) => {
                fresh.insert(old_id.to_owned(), i);
                table.entries.push(RemapEntry {
                    from: old_id.to_owned(),
                    to: current[i].id.clone(),
                });
                report.remapped += 1;
            }
            None => {
                debug!(recipe = old_id, "retired recipe has no counterpart");
                report.unresolved += 1;
            }
        }
    }

    // Older entries, re-pointed at current recipes.
    let mut seen: FxHashSet<String> = fresh.keys().cloned().collect();
    for remap in previous.remaps() {
        let from = remap.from_id();
        if by_id.contains_key(&*from) || seen.contains(&*from) {
            continue;
        }
        let Some(old_target) = Recipe::at(previous.reader(), remap.target()) else {
            report.dropped_carried += 1;
            continue;
        };
        let resolved = by_id
            .get(old_target.id())
            .or_else(|| fresh.get(old_target.id()))
            .copied();
        match resolved {
            Some(i) => {
                seen.insert(from.to_string());
                table.entries.push(RemapEntry {
                    from: from.to_string(),
                    to: current[i].id.clone(),
                });
                report.carried += 1;
            }
            None => report.dropped_carried += 1,
        }
    }

    info!(
        remapped = report.remapped,
        carried = report.carried,
        unresolved = report.unresolved,
        dropped = report.dropped_carried,
        ambiguous = report.ambiguous_loose,
        "recipe remap computed"
    );
    (table, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecipeIoDef;

    fn recipe(category: &str, io: Vec<RecipeIoDef>) -> RecipeDef {
        RecipeDef {
            id: "r:x".into(),
            category: category.into(),
            io,
            machine: None,
        }
    }

    fn base_io() -> Vec<RecipeIoDef> {
        vec![
            RecipeIoDef::new(IoKind::ItemInput, "i:iron", 2),
            RecipeIoDef::new(IoKind::FluidInput, "f:water", 100),
            RecipeIoDef::new(IoKind::ItemOutput, "i:plate", 1),
        ]
    }

    #[test]
    fn role_is_not_part_of_the_fingerprint() {
        let mut io = base_io();
        io.remove(1);
        let a = Fingerprints::of_def(&recipe("press", io.clone()));
        io[1].kind = IoKind::ItemInput;
        let b = Fingerprints::of_def(&recipe("press", io));
        assert_eq!(a, b);
    }

    #[test]
    fn amount_change_keeps_loose() {
        let a = Fingerprints::of_def(&recipe("press", base_io()));
        let mut io = base_io();
        io[0].amount = 3;
        let b = Fingerprints::of_def(&recipe("press", io));
        assert_ne!(a.strict, b.strict);
        assert_eq!(a.loose, b.loose);
    }

    #[test]
    fn category_is_part_of_both() {
        let a = Fingerprints::of_def(&recipe("press", base_io()));
        let b = Fingerprints::of_def(&recipe("mixer", base_io()));
        assert_ne!(a.strict, b.strict);
        assert_ne!(a.loose, b.loose);
    }

    #[test]
    fn goods_change_changes_both() {
        let a = Fingerprints::of_def(&recipe("press", base_io()));
        let mut io = base_io();
        io[2].goods = "i:gear".into();
        let b = Fingerprints::of_def(&recipe("press", io));
        assert_ne!(a.strict, b.strict);
        assert_ne!(a.loose, b.loose);
    }

    #[test]
    fn non_consumed_inputs_are_ignored() {
        let a = Fingerprints::of_def(&recipe("press", base_io()));
        let mut io = base_io();
        io.push(RecipeIoDef::new(IoKind::ItemInput, "i:circuit", 0));
        let b = Fingerprints::of_def(&recipe("press", io));
        assert_eq!(a, b);
    }

    #[test]
    fn zero_amount_outputs_count() {
        let a = Fingerprints::of_def(&recipe("press", base_io()));
        let mut io = base_io();
        io.push(RecipeIoDef::new(IoKind::ItemOutput, "i:slag", 0));
        let b = Fingerprints::of_def(&recipe("press", io));
        assert_ne!(a.loose, b.loose);
    }

    #[test]
    fn declaration_order_across_kinds_is_irrelevant() {
        let a = Fingerprints::of_def(&recipe("press", base_io()));
        let mut io = base_io();
        io.reverse();
        let b = Fingerprints::of_def(&recipe("press", io));
        assert_eq!(a, b);
    }

    #[test]
    fn string_boundaries_are_unambiguous() {
        let a = Fingerprints::of_def(&recipe(
            "ab",
            vec![RecipeIoDef::new(IoKind::ItemOutput, "i:c", 1)],
        ));
        let b = Fingerprints::of_def(&recipe(
            "a",
            vec![RecipeIoDef::new(IoKind::ItemOutput, "bi:c", 1)],
        ));
        assert_ne!(a.loose, b.loose);
    }

    #[test]
    fn no_previous_means_empty_table() {
        let (table, report) = compute_remaps(None, &[], RemapPolicy::FirstWins);
        assert!(table.is_empty());
        assert_eq!(report, RemapReport::default());
    }

    #[test]
    fn unreadable_previous_is_skipped() {
        let mut bytes = crate::arena::ArenaWriter::new().finish();
        bytes[0..4].copy_from_slice(&99i32.to_le_bytes());
        let (table, report) = compute_remaps(Some(&bytes), &[], RemapPolicy::FirstWins);
        assert!(table.is_empty());
        assert!(report.previous_skipped);
    }
}
