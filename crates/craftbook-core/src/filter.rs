//! Ban list applied to the model before encoding.
//!
//! A rule names a commodity by mod and internal name and decides, from its
//! display name and NBT, whether that particular variant is banned. Banned
//! commodities disappear together with every recipe that mentions them, and
//! are stripped from groups, category crafters, containers and the
//! well-known list.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::model::Model;

/// Closure form of a ban predicate: `(display name, nbt) -> banned`.
#[derive(Clone)]
pub struct BanFn(pub Arc<dyn Fn(&str, Option<&str>) -> bool + Send + Sync>);

impl fmt::Debug for BanFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BanFn(..)")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum BanPredicate {
    /// Every variant is banned.
    #[default]
    Always,
    /// Display name equals one of these.
    NameEquals(Vec<String>),
    /// Display name contains this.
    NameContains(String),
    /// Display name ends with one of these.
    NameEndsWith(Vec<String>),
    /// Display name equals this and the variant carries NBT.
    NameWithNbt(String),
    AnyOf(Vec<BanPredicate>),
    #[serde(skip)]
    Custom(BanFn),
}

impl BanPredicate {
    pub fn custom(f: impl Fn(&str, Option<&str>) -> bool + Send + Sync + 'static) -> Self {
        BanPredicate::Custom(BanFn(Arc::new(f)))
    }

    pub fn is_banned(&self, name: &str, nbt: Option<&str>) -> bool {
        match self {
            BanPredicate::Always => true,
            BanPredicate::NameEquals(names) => names.iter().any(|n| n == name),
            BanPredicate::NameContains(part) => name.contains(part.as_str()),
            BanPredicate::NameEndsWith(suffixes) => {
                suffixes.iter().any(|s| name.ends_with(s.as_str()))
            }
            BanPredicate::NameWithNbt(n) => n == name && nbt.is_some_and(|nbt| !nbt.is_empty()),
            BanPredicate::AnyOf(preds) => preds.iter().any(|p| p.is_banned(name, nbt)),
            BanPredicate::Custom(f) => (f.0)(name, nbt),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanRule {
    pub mod_name: String,
    pub internal_name: String,
    #[serde(default)]
    pub predicate: BanPredicate,
}

impl BanRule {
    pub fn always(mod_name: &str, internal_name: &str) -> Self {
        Self {
            mod_name: mod_name.to_owned(),
            internal_name: internal_name.to_owned(),
            predicate: BanPredicate::Always,
        }
    }

    pub fn when(mod_name: &str, internal_name: &str, predicate: BanPredicate) -> Self {
        Self {
            mod_name: mod_name.to_owned(),
            internal_name: internal_name.to_owned(),
            predicate,
        }
    }
}

/// Rules indexed by `(mod, internal name)`.
#[derive(Debug, Clone, Default)]
pub struct BanList {
    rules: Vec<BanRule>,
}

impl BanList {
    pub fn new(rules: impl IntoIterator<Item = BanRule>) -> Self {
        Self {
            rules: rules.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn is_banned(
        &self,
        mod_name: &str,
        internal_name: &str,
        name: &str,
        nbt: Option<&str>,
    ) -> bool {
        self.rules
            .iter()
            .filter(|r| r.mod_name == mod_name && r.internal_name == internal_name)
            .any(|r| r.predicate.is_banned(name, nbt))
    }

    /// Remove banned commodities and everything that depends on them.
    pub fn apply(&self, model: &mut Model) -> FilterReport {
        let mut report = FilterReport::default();
        if self.is_empty() {
            return report;
        }

        let mut banned: FxHashSet<String> = FxHashSet::default();
        model.items.retain(|i| {
            let ban = self.is_banned(&i.mod_name, &i.internal_name, &i.name, i.nbt.as_deref());
            if ban {
                banned.insert(i.id.clone());
            }
            !ban
        });
        report.items = banned.len();
        model.fluids.retain(|f| {
            let ban = self.is_banned(&f.mod_name, &f.internal_name, &f.name, f.nbt.as_deref());
            if ban {
                banned.insert(f.id.clone());
            }
            !ban
        });
        report.fluids = banned.len() - report.items;
        if banned.is_empty() {
            return report;
        }

        for item in &mut model.items {
            let drop = item.container.as_ref().is_some_and(|c| banned.contains(&c.fluid));
            if drop {
                item.container = None;
                report.stripped_references += 1;
            } else if let Some(c) = &mut item.container {
                if c.empty.as_ref().is_some_and(|e| banned.contains(e)) {
                    c.empty = None;
                    report.stripped_references += 1;
                }
            }
        }

        for group in &mut model.groups {
            let before = group.items.len();
            group.items.retain(|id| !banned.contains(id));
            report.stripped_references += before - group.items.len();
        }

        for category in &mut model.categories {
            for list in [
                &mut category.crafters,
                &mut category.singleblocks,
                &mut category.multiblocks,
            ] {
                let before = list.len();
                list.retain(|id| !banned.contains(id));
                report.stripped_references += before - list.len();
            }
            if category
                .default_crafter
                .as_ref()
                .is_some_and(|id| banned.contains(id))
            {
                category.default_crafter = None;
                report.stripped_references += 1;
            }
        }

        let before = model.recipes.len();
        model.recipes.retain(|r| {
            let keep = !r.io.iter().any(|io| banned.contains(&io.goods));
            if !keep {
                debug!(recipe = %r.id, "dropping recipe that references a banned commodity");
            }
            keep
        });
        report.recipes = before - model.recipes.len();

        let before = model.well_known.len();
        model.well_known.retain(|id| {
            let keep = !banned.contains(id);
            if !keep {
                warn!(id = %id, "well-known entry is banned");
            }
            keep
        });
        report.stripped_references += before - model.well_known.len();

        info!(
            items = report.items,
            fluids = report.fluids,
            recipes = report.recipes,
            stripped = report.stripped_references,
            "ban list applied"
        );
        report
    }
}

/// Counts of what the ban list removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterReport {
    pub items: usize,
    pub fluids: usize,
    pub recipes: usize,
    /// References removed from groups, categories, containers and the
    /// well-known list.
    pub stripped_references: usize,
}

/// `(mod, internal name)` pairs banned in every variant.
const ALWAYS_BANNED: &[(&str, &str)] = &[
    ("Botania", "twigWand"),
    ("Forestry", "beeDroneGE"),
    ("Forestry", "beeLarvaeGE"),
    ("Forestry", "beePrincessGE"),
    ("Forestry", "beeQueenGE"),
    ("Forestry", "caterpillarGE"),
    ("Forestry", "pollenFertile"),
    ("ForbiddenMagic", "MobCrystal"),
    ("IC2", "itemCropSeed"),
    ("TConstruct", "ArrowAmmo"),
    ("TConstruct", "BoltAmmo"),
    ("TConstruct", "BoltPart"),
    ("TConstruct", "BowLimbPart"),
    ("TConstruct", "CrossbowBodyPart"),
    ("TConstruct", "CrossbowLimbPart"),
    ("TConstruct", "Crossbow"),
    ("TConstruct", "Javelin"),
    ("TConstruct", "LongBow"),
    ("TConstruct", "ShortBow"),
    ("TConstruct", "ShurikenPart"),
    ("TConstruct", "Shuriken"),
    ("TConstruct", "ThrowingKnife"),
    ("TConstruct", "arrowhead"),
    ("TConstruct", "battleaxe"),
    ("TConstruct", "battlesign"),
    ("TConstruct", "binding"),
    ("TConstruct", "broadAxeHead"),
    ("TConstruct", "broadsword"),
    ("TConstruct", "chiselHead"),
    ("TConstruct", "chisel"),
    ("TConstruct", "cleaver"),
    ("TConstruct", "creativeModifier"),
    ("TConstruct", "crossbar"),
    ("TConstruct", "cutlass"),
    ("TConstruct", "dagger"),
    ("TConstruct", "excavatorHead"),
    ("TConstruct", "excavator"),
    ("TConstruct", "frypanHead"),
    ("TConstruct", "frypan"),
    ("TConstruct", "fullGuard"),
    ("TConstruct", "hammerHead"),
    ("TConstruct", "hammer"),
    ("TConstruct", "handGuard"),
    ("TConstruct", "hatchetHead"),
    ("TConstruct", "hatchet"),
    ("TConstruct", "knifeBlade"),
    ("TConstruct", "largeSwordBlade"),
    ("TConstruct", "longsword"),
    ("TConstruct", "lumberaxe"),
    ("TConstruct", "mattock"),
    ("TConstruct", "pickaxeHead"),
    ("TConstruct", "pickaxe"),
    ("TConstruct", "rapier"),
    ("TConstruct", "scytheBlade"),
    ("TConstruct", "scythe"),
    ("TConstruct", "shovelHead"),
    ("TConstruct", "shovel"),
    ("TConstruct", "signHead"),
    ("TConstruct", "swordBlade"),
    ("TConstruct", "toolRod"),
    ("TConstruct", "toolShard"),
    ("TConstruct", "toughBinding"),
    ("TConstruct", "toughRod"),
    ("TGregworks", "tGregToolPartArrowHead"),
    ("TGregworks", "tGregToolPartAxeHead"),
    ("TGregworks", "tGregToolPartBinding"),
    ("TGregworks", "tGregToolPartBowLimb"),
    ("TGregworks", "tGregToolPartChiselHead"),
    ("TGregworks", "tGregToolPartChunk"),
    ("TGregworks", "tGregToolPartCrossbar"),
    ("TGregworks", "tGregToolPartCrossbowBody"),
    ("TGregworks", "tGregToolPartCrossbowLimb"),
    ("TGregworks", "tGregToolPartExcavatorHead"),
    ("TGregworks", "tGregToolPartFrypanHead"),
    ("TGregworks", "tGregToolPartFullGuard"),
    ("TGregworks", "tGregToolPartHammerHead"),
    ("TGregworks", "tGregToolPartKnifeBlade"),
    ("TGregworks", "tGregToolPartLargeGuard"),
    ("TGregworks", "tGregToolPartLargeSwordBlade"),
    ("TGregworks", "tGregToolPartLumberHead"),
    ("TGregworks", "tGregToolPartMediumGuard"),
    ("TGregworks", "tGregToolPartPickaxeHead"),
    ("TGregworks", "tGregToolPartScytheHead"),
    ("TGregworks", "tGregToolPartShovelHead"),
    ("TGregworks", "tGregToolPartShuriken"),
    ("TGregworks", "tGregToolPartSignHead"),
    ("TGregworks", "tGregToolPartSwordBlade"),
    ("TGregworks", "tGregToolPartToolRod"),
    ("TGregworks", "tGregToolPartToughBind"),
    ("TGregworks", "tGregToolPartToughRod"),
    ("gendustry", "GeneSample"),
    ("tinkersdefense", "Heater Shield"),
    ("tinkersdefense", "Round Shield"),
    ("witchery", "louse"),
    ("witchery", "poppet"),
    ("gadomancy", "ItemEtherealFamiliar"),
    ("gregtech", "gt.metatool.01"),
];

/// GT suffixes of tool heads in `gt.metaitem.02`. Turbine blades stay.
const GT_TOOL_HEADS: [&str; 13] = [
    "Wrench Tip",
    "Spade Head",
    "Pickaxe Head",
    "Sense Blade",
    "Plow Head",
    "Buzzsaw Blade",
    "Sword Blade",
    "Axe Head",
    "Hoe Head",
    "Hammer Head",
    "File Head",
    "Shovel Head",
    "Drill Tip",
];

/// The GregTech: New Horizons ban list: tool parts, genetic variants and
/// NBT-only items that would otherwise flood the item list.
///
/// Applied on top of [`BuildConfig::ban_rules`](crate::config::BuildConfig)
/// when `standard_bans` is set.
pub fn standard_rules() -> Vec<BanRule> {
    let mut rules: Vec<BanRule> = ALWAYS_BANNED
        .iter()
        .map(|&(m, n)| BanRule::always(m, n))
        .collect();

    rules.push(BanRule::when(
        "gregtech",
        "gt.detrav.metatool.01",
        BanPredicate::NameContains("Prospector's Scanner".into()),
    ));
    rules.push(BanRule::when(
        "gregtech",
        "gt.metaitem.01",
        BanPredicate::AnyOf(vec![
            BanPredicate::NameWithNbt("Data Orb".into()),
            BanPredicate::NameEquals(vec![
                "Writes Research result".into(),
                "Reads Research result".into(),
            ]),
        ]),
    ));
    rules.push(BanRule::when(
        "gregtech",
        "gt.metaitem.02",
        BanPredicate::NameEndsWith(GT_TOOL_HEADS.map(String::from).to_vec()),
    ));
    // GT steam cell loses to the IC2 one.
    rules.push(BanRule::when(
        "gregtech",
        "gt.metaitem.98",
        BanPredicate::NameEquals(vec!["Steam Cell".into()]),
    ));
    rules.push(BanRule::when(
        "miscutils",
        "gt.plusplus.metatool.01",
        BanPredicate::NameEquals(vec!["Angle Grinder".into(), "Automatic Snips".into()]),
    ));
    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryDef, ContainerDef, GroupDef, IoKind, ItemDef, RecipeDef, RecipeIoDef};

    fn item(id: &str, mod_name: &str, internal: &str, name: &str) -> ItemDef {
        ItemDef {
            id: id.into(),
            name: name.into(),
            mod_name: mod_name.into(),
            internal_name: internal.into(),
            ..Default::default()
        }
    }

    #[test]
    fn predicates() {
        assert!(BanPredicate::Always.is_banned("x", None));
        let ends = BanPredicate::NameEndsWith(vec!["Drill Tip".into()]);
        assert!(ends.is_banned("Steel Drill Tip", None));
        assert!(!ends.is_banned("Steel Drill", None));
        let nbt = BanPredicate::NameWithNbt("Data Orb".into());
        assert!(nbt.is_banned("Data Orb", Some("{x:1}")));
        assert!(!nbt.is_banned("Data Orb", None));
        assert!(!nbt.is_banned("Data Orb", Some("")));
        let custom = BanPredicate::custom(|name, _| name.len() > 3);
        assert!(custom.is_banned("long", None));
        assert!(!custom.is_banned("no", None));
    }

    #[test]
    fn rules_match_mod_and_internal_name() {
        let list = BanList::new(standard_rules());
        assert!(list.is_banned("gregtech", "gt.metaitem.02", "Steel Wrench Tip", None));
        assert!(!list.is_banned("gregtech", "gt.metaitem.02", "Steel Plate", None));
        assert!(!list.is_banned("other", "gt.metaitem.02", "Steel Wrench Tip", None));
        assert!(list.is_banned("TConstruct", "pickaxe", "Anything", None));
        assert!(list.is_banned("TGregworks", "tGregToolPartToughRod", "Steel Tough Rod", None));
        assert!(list.is_banned("witchery", "poppet", "Poppet", None));
        assert!(list.is_banned("ForbiddenMagic", "MobCrystal", "Mob Crystal", None));
        assert!(!list.is_banned("gregtech", "gt.metaitem.02", "Steel Turbine Blade", None));
        assert!(list.is_banned("gregtech", "gt.metaitem.01", "Data Orb", Some("{d:1}")));
        assert!(!list.is_banned("gregtech", "gt.metaitem.01", "Data Orb", None));
    }

    #[test]
    fn standard_rules_have_one_rule_per_name() {
        let rules = standard_rules();
        let keys: FxHashSet<_> = rules
            .iter()
            .map(|r| (r.mod_name.as_str(), r.internal_name.as_str()))
            .collect();
        assert_eq!(keys.len(), rules.len());
        assert_eq!(rules.len(), ALWAYS_BANNED.len() + 5);
    }

    #[test]
    fn apply_removes_dependents() {
        let mut model = Model {
            items: vec![
                item("i:bad", "TConstruct", "pickaxe", "Pickaxe"),
                ItemDef {
                    container: Some(ContainerDef {
                        fluid: "f:w".into(),
                        amount: 1000,
                        empty: Some("i:bad".into()),
                    }),
                    ..item("i:cell", "IC2", "cell", "Water Cell")
                },
                item("i:ok", "minecraft", "stick", "Stick"),
            ],
            groups: vec![GroupDef {
                id: "g:sticks".into(),
                name: "sticks".into(),
                items: vec!["i:bad".into(), "i:ok".into()],
            }],
            categories: vec![CategoryDef {
                name: "crafting".into(),
                crafters: vec!["i:bad".into()],
                default_crafter: Some("i:bad".into()),
                ..Default::default()
            }],
            recipes: vec![
                RecipeDef {
                    id: "r:uses_bad".into(),
                    category: "crafting".into(),
                    io: vec![RecipeIoDef::new(IoKind::ItemInput, "i:bad", 1)],
                    machine: None,
                },
                RecipeDef {
                    id: "r:fine".into(),
                    category: "crafting".into(),
                    io: vec![RecipeIoDef::new(IoKind::ItemOutput, "i:ok", 1)],
                    machine: None,
                },
            ],
            well_known: vec!["i:bad".into(), "i:ok".into()],
            ..Default::default()
        };

        let report = BanList::new([BanRule::always("TConstruct", "pickaxe")]).apply(&mut model);
        assert_eq!(report.items, 1);
        assert_eq!(report.recipes, 1);
        assert_eq!(model.items.len(), 2);
        assert_eq!(model.recipes[0].id, "r:fine");
        assert_eq!(model.groups[0].items, vec!["i:ok".to_string()]);
        assert!(model.categories[0].crafters.is_empty());
        assert!(model.categories[0].default_crafter.is_none());
        assert_eq!(model.well_known, vec!["i:ok".to_string()]);
        assert!(model.items[0].container.as_ref().unwrap().empty.is_none());
        // group, crafter, default crafter, well-known, container empty item
        assert_eq!(report.stripped_references, 5);
    }

    #[test]
    fn rules_deserialize_from_json() {
        let rules: Vec<BanRule> = serde_json::from_str(
            r#"[
                {"mod_name": "IC2", "internal_name": "itemCropSeed"},
                {"mod_name": "gregtech", "internal_name": "gt.metaitem.98",
                 "predicate": {"NameEquals": ["Steam Cell"]}}
            ]"#,
        )
        .unwrap();
        assert!(matches!(rules[0].predicate, BanPredicate::Always));
        assert!(rules[1].predicate.is_banned("Steam Cell", None));
    }
}
