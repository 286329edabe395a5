//! Display-text fix-up for glyphs the game draws from a private font.
//!
//! Some mods render symbols (subscripts, tier markers, tool icons) through
//! private-use code points that no standard font carries. Known ones are
//! swapped for a visually close Unicode character; unknown ones are left
//! in place, logged and counted.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::model::Model;

/// Private-use code points rewritten by default.
pub const DEFAULT_REPLACEMENTS: &[(char, char)] = &[
    ('\u{e01a}', '₀'),
    ('\u{e020}', '﹖'),
    ('\u{e010}', '⁰'),
    ('\u{e011}', '¹'),
    ('\u{e012}', '²'),
    ('\u{e013}', '³'),
    ('\u{e014}', '⁴'),
    ('\u{e015}', '⁵'),
    ('\u{e016}', '⁶'),
    ('\u{e017}', '⁷'),
    ('\u{e018}', '⁸'),
    ('\u{e019}', '⁹'),
    ('\u{e000}', '△'),
    ('\u{e001}', '▽'),
    ('\u{e002}', '△'),
    ('\u{e003}', '▽'),
    ('\u{e004}', '△'),
    ('\u{e005}', '▽'),
    ('\u{e006}', '❂'),
    ('\u{e007}', '⛏'),
    ('\u{e008}', '⇲'),
    ('\u{e009}', '⇱'),
    ('\u{e00a}', '⚡'),
    ('\u{e00c}', '❂'),
    ('\u{e00d}', '⁛'),
    ('\u{e00e}', '⍝'),
    ('\u{e00f}', '⊘'),
    ('\u{e01e}', '♛'),
    ('\u{e01d}', '♜'),
    ('\u{e01f}', '⨂'),
];

pub fn is_private_use(c: char) -> bool {
    ('\u{e000}'..='\u{f8ff}').contains(&c)
}

/// What one fix-up pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TextFixReport {
    /// Strings that had at least one character replaced.
    pub fixed_strings: usize,
    pub replaced_chars: usize,
    /// Unknown private-use characters and how often each was seen.
    pub unknown: BTreeMap<char, usize>,
}

impl TextFixReport {
    pub fn unknown_chars(&self) -> usize {
        self.unknown.values().sum()
    }
}

#[derive(Debug, Clone)]
pub struct CharacterFixer {
    table: FxHashMap<char, char>,
}

impl Default for CharacterFixer {
    fn default() -> Self {
        Self::new(std::iter::empty())
    }
}

impl CharacterFixer {
    /// Default table extended (and overridden) by `extra`.
    pub fn new(extra: impl IntoIterator<Item = (char, char)>) -> Self {
        let mut table: FxHashMap<char, char> = DEFAULT_REPLACEMENTS.iter().copied().collect();
        table.extend(extra);
        Self { table }
    }

    /// Rewrite `s` in place. `owner` names the record in log output.
    pub fn fix(&self, s: &mut String, owner: &str, report: &mut TextFixReport) {
        if !s.chars().any(is_private_use) {
            return;
        }
        let mut replaced = 0;
        let fixed: String = s
            .chars()
            .map(|c| {
                if !is_private_use(c) {
                    return c;
                }
                match self.table.get(&c) {
                    Some(&r) => {
                        replaced += 1;
                        r
                    }
                    None => {
                        warn!(
                            code_point = %format_args!("U+{:04X}", c as u32),
                            owner,
                            "unknown private-use character"
                        );
                        *report.unknown.entry(c).or_default() += 1;
                        c
                    }
                }
            })
            .collect();
        if replaced > 0 {
            report.fixed_strings += 1;
            report.replaced_chars += replaced;
        }
        *s = fixed;
    }

    /// Fix names and tooltips of every item and fluid.
    pub fn apply(&self, model: &mut Model) -> TextFixReport {
        let mut report = TextFixReport::default();
        for item in &mut model.items {
            self.fix(&mut item.name, &item.id, &mut report);
            if let Some(tooltip) = &mut item.tooltip {
                self.fix(tooltip, &item.id, &mut report);
            }
        }
        for fluid in &mut model.fluids {
            self.fix(&mut fluid.name, &fluid.id, &mut report);
            if let Some(tooltip) = &mut fluid.tooltip {
                self.fix(tooltip, &fluid.id, &mut report);
            }
        }
        info!(
            fixed = report.fixed_strings,
            replaced = report.replaced_chars,
            unknown = report.unknown_chars(),
            "display text fixed"
        );
        report
    }
}
