//! Build configuration. Every field has a default, so an empty config file
//! (or none at all) is valid.

use serde::{Deserialize, Serialize};

use crate::filter::{BanList, BanRule, standard_rules};
use crate::remap::RemapPolicy;
use crate::text::CharacterFixer;

pub const DEFAULT_CIRCUIT_ITEM: &str = "gt.integrated_circuit";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Apply [`standard_rules`] before `ban_rules`.
    pub standard_bans: bool,
    pub ban_rules: Vec<BanRule>,
    /// Extra or overriding private-use replacements, as (from, to).
    pub font_replacements: Vec<(char, char)>,
    /// Unlocalized name of the programmed-circuit item.
    pub circuit_item: String,
    pub remap_policy: RemapPolicy,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            standard_bans: false,
            ban_rules: Vec::new(),
            font_replacements: Vec::new(),
            circuit_item: DEFAULT_CIRCUIT_ITEM.to_owned(),
            remap_policy: RemapPolicy::default(),
        }
    }
}

impl BuildConfig {
    pub fn ban_list(&self) -> BanList {
        let standard = if self.standard_bans {
            standard_rules()
        } else {
            Vec::new()
        };
        BanList::new(standard.into_iter().chain(self.ban_rules.iter().cloned()))
    }

    pub fn character_fixer(&self) -> CharacterFixer {
        CharacterFixer::new(self.font_replacements.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        let config: BuildConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.circuit_item, DEFAULT_CIRCUIT_ITEM);
        assert!(config.ban_rules.is_empty());
        assert!(!config.standard_bans);
        assert!(config.ban_list().is_empty());
        assert_eq!(config.remap_policy, RemapPolicy::FirstWins);
    }

    #[test]
    fn standard_bans_extend_configured_rules() {
        let config: BuildConfig = serde_json::from_str(
            r#"{"standard_bans": true,
                "ban_rules": [{"mod_name": "mod", "internal_name": "widget"}]}"#,
        )
        .unwrap();
        let list = config.ban_list();
        assert!(list.is_banned("mod", "widget", "Widget", None));
        assert!(list.is_banned("witchery", "louse", "Louse", None));
    }

    #[test]
    fn partial_json_keeps_other_defaults() {
        let config: BuildConfig = serde_json::from_str(
            r#"{"remap_policy": "RequireUniqueLoose", "font_replacements": [["\ue0ff", "*"]]}"#,
        )
        .unwrap();
        assert_eq!(config.remap_policy, RemapPolicy::RequireUniqueLoose);
        assert_eq!(config.font_replacements, vec![('\u{e0ff}', '*')]);
        assert_eq!(config.circuit_item, DEFAULT_CIRCUIT_ITEM);
    }
}
