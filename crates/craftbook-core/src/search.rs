//! Text search over a [`Dataset`].
//!
//! Every candidate is first checked against its stored index bits, read
//! straight from the arena, so records that cannot match are never
//! materialized. Survivors are confirmed with an exact substring match.

use crate::arena::Pointer;
use crate::dataset::Dataset;
use crate::graph::{Fluid, GoodsShape, Group, Item, Object, Recipe, RecipeObject, View};
use crate::id::IdKind;
use crate::index::{IndexBits, token_bits};
use crate::schema::header;

/// A parsed search string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    tokens: Vec<String>,
    mod_filter: Option<String>,
    bits: IndexBits,
}

impl SearchQuery {
    /// Split on whitespace and lowercase. A token starting with `@` filters
    /// by source mod. Returns `None` when nothing would restrict the match.
    pub fn parse(text: &str) -> Option<SearchQuery> {
        let mut tokens = Vec::new();
        let mut mod_filter = None;
        for raw in text.split_whitespace() {
            let token = raw.to_lowercase();
            match token.strip_prefix('@') {
                Some("") => {}
                Some(m) => mod_filter = Some(m.to_owned()),
                None => tokens.push(token),
            }
        }
        if tokens.is_empty() && mod_filter.is_none() {
            return None;
        }
        let mut bits = IndexBits::EMPTY;
        for token in tokens.iter().chain(mod_filter.iter()) {
            bits |= token_bits(token);
        }
        Some(SearchQuery {
            tokens,
            mod_filter,
            bits,
        })
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn mod_filter(&self) -> Option<&str> {
        self.mod_filter.as_deref()
    }

    /// Bits any matching record must carry.
    pub fn bits(&self) -> IndexBits {
        self.bits
    }

    pub fn may_match(&self, bits: &IndexBits) -> bool {
        bits.contains(&self.bits)
    }

    /// Exact match against a commodity's mod, name and tooltip.
    pub fn matches_text(&self, mod_name: &str, name: &str, tooltip: Option<&str>) -> bool {
        if let Some(filter) = &self.mod_filter {
            if !mod_name.to_lowercase().contains(filter.as_str()) {
                return false;
            }
        }
        let name = name.to_lowercase();
        if self.tokens.iter().all(|t| name.contains(t.as_str())) {
            return true;
        }
        match tooltip {
            Some(tooltip) => {
                let tooltip = tooltip.to_lowercase();
                self.tokens.iter().all(|t| tooltip.contains(t.as_str()))
            }
            None => false,
        }
    }

    pub fn matches_goods<S: GoodsShape>(&self, goods: &View<'_, S>) -> bool {
        self.may_match(&goods.bits())
            && self.matches_text(&goods.mod_name(), &goods.name(), goods.tooltip().as_deref())
    }

    /// A group matches when one of its members matches on its own.
    pub fn matches_group(&self, group: &Group<'_>) -> bool {
        self.may_match(&group.bits()) && group.items().any(|item| self.matches_goods(&item))
    }

    /// A recipe matches when any of its inputs or outputs matches.
    pub fn matches_recipe(&self, recipe: &Recipe<'_>) -> bool {
        self.may_match(&recipe.bits())
            && recipe.io().any(|io| match &io.goods {
                RecipeObject::Item(v) => self.matches_goods(v),
                RecipeObject::Fluid(v) => self.matches_goods(v),
                RecipeObject::Group(v) => self.matches_group(v),
            })
    }

    pub fn matches(&self, object: &Object<'_>) -> bool {
        match object {
            Object::Item(v) => self.matches_goods(v),
            Object::Fluid(v) => self.matches_goods(v),
            Object::Group(v) => self.matches_group(v),
            Object::Recipe(v) => self.matches_recipe(v),
        }
    }
}

/// Which collections a search walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scope {
    pub items: bool,
    pub fluids: bool,
    pub groups: bool,
    pub recipes: bool,
}

impl Scope {
    pub const ALL: Scope = Scope {
        items: true,
        fluids: true,
        groups: true,
        recipes: true,
    };

    pub const NONE: Scope = Scope {
        items: false,
        fluids: false,
        groups: false,
        recipes: false,
    };

    fn includes(&self, kind: IdKind) -> bool {
        match kind {
            IdKind::Item => self.items,
            IdKind::Fluid => self.fluids,
            IdKind::Group => self.groups,
            IdKind::Recipe => self.recipes,
        }
    }
}

/// A reusable search. Each call to [`Search::iter`] walks the dataset
/// afresh: items, then fluids, then groups, then recipes.
#[derive(Debug, Clone)]
pub struct Search<'a> {
    dataset: &'a Dataset,
    query: Option<SearchQuery>,
    scope: Scope,
}

impl<'a> Search<'a> {
    pub fn new(dataset: &'a Dataset, text: &str) -> Self {
        Self {
            dataset,
            query: SearchQuery::parse(text),
            scope: Scope::ALL,
        }
    }

    /// `None` when every object matches.
    pub fn query(&self) -> Option<&SearchQuery> {
        self.query.as_ref()
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn items(self) -> Self {
        self.with_scope(Scope {
            items: true,
            ..Scope::NONE
        })
    }

    pub fn fluids(self) -> Self {
        self.with_scope(Scope {
            fluids: true,
            ..Scope::NONE
        })
    }

    pub fn groups(self) -> Self {
        self.with_scope(Scope {
            groups: true,
            ..Scope::NONE
        })
    }

    pub fn recipes(self) -> Self {
        self.with_scope(Scope {
            recipes: true,
            ..Scope::NONE
        })
    }

    fn candidates(&self, kind: IdKind, slot: usize) -> impl Iterator<Item = Pointer> + '_ {
        let reader = self.dataset.reader();
        let wanted = self.scope.includes(kind);
        self.dataset
            .collection(slot)
            .filter(move |_| wanted)
            .filter(move |&ptr| {
                self.query
                    .as_ref()
                    .is_none_or(|q| q.may_match(&reader.bits(ptr)))
            })
    }

    /// Lazily yield every matching object.
    pub fn iter(&self) -> impl Iterator<Item = Object<'a>> + '_ {
        let reader = self.dataset.reader();
        let query = self.query.as_ref();

        let items = self
            .candidates(IdKind::Item, header::ITEMS)
            .filter_map(move |p| Item::at(reader, p))
            .filter(move |v| query.is_none_or(|q| q.matches_goods(v)))
            .map(Object::Item);
        let fluids = self
            .candidates(IdKind::Fluid, header::FLUIDS)
            .filter_map(move |p| Fluid::at(reader, p))
            .filter(move |v| query.is_none_or(|q| q.matches_goods(v)))
            .map(Object::Fluid);
        let groups = self
            .candidates(IdKind::Group, header::GROUPS)
            .filter_map(move |p| Group::at(reader, p))
            .filter(move |v| query.is_none_or(|q| q.matches_group(v)))
            .map(Object::Group);
        let recipes = self
            .candidates(IdKind::Recipe, header::RECIPES)
            .filter_map(move |p| Recipe::at(reader, p))
            .filter(move |v| query.is_none_or(|q| q.matches_recipe(v)))
            .map(Object::Recipe);

        items.chain(fluids).chain(groups).chain(recipes)
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }
}
