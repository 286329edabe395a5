//! Programmed-circuit conflicts between recipes of one category.
//!
//! Machines pick a recipe by matching the items they hold. Recipes that
//! share ingredients are told apart by a non-consumed "programmed circuit"
//! input. Recipe `A` conflicts with circuit `c` when some recipe of the same
//! category configured with `c` (a different circuit than `A`'s) consumes a
//! subset of `A`'s ingredients: loading `A`'s inputs with circuit `c` would
//! run that other recipe instead.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::info;

use crate::model::{IoKind, Model};

struct RecipeKey<'m> {
    index: usize,
    circuit: i32,
    ingredients: FxHashSet<&'m str>,
}

/// Conflict bitmask per recipe, parallel to `model.recipes`. Recipes
/// without machine info get 0.
pub fn circuit_conflicts(model: &Model, circuit_item: &str) -> Vec<u32> {
    let circuit_of: FxHashMap<&str, i32> = model
        .items
        .iter()
        .filter(|i| i.unlocalized_name == circuit_item)
        .map(|i| (i.id.as_str(), i.damage))
        .collect();

    let mut by_category: FxHashMap<&str, Vec<RecipeKey<'_>>> = FxHashMap::default();
    for (index, recipe) in model.recipes.iter().enumerate() {
        let ingredients = recipe
            .io
            .iter()
            .filter(|io| !io.kind.is_output() && io.amount > 0)
            .map(|io| io.goods.as_str())
            .collect();
        let circuit = recipe
            .io
            .iter()
            .filter(|io| io.kind == IoKind::ItemInput && io.amount == 0)
            .find_map(|io| circuit_of.get(io.goods.as_str()).copied())
            .unwrap_or(0);
        by_category
            .entry(recipe.category.as_str())
            .or_default()
            .push(RecipeKey {
                index,
                circuit,
                ingredients,
            });
    }

    let mut masks = vec![0u32; model.recipes.len()];
    let mut conflicting = 0;
    for keys in by_category.values() {
        for key in keys {
            if model.recipes[key.index].machine.is_none() {
                continue;
            }
            let mut mask = 0u32;
            for other in keys {
                if other.circuit != key.circuit
                    && (0..32).contains(&other.circuit)
                    && other.ingredients.is_subset(&key.ingredients)
                {
                    mask |= 1 << other.circuit;
                }
            }
            if mask != 0 {
                conflicting += 1;
            }
            masks[key.index] = mask;
        }
    }
    info!(recipes = model.recipes.len(), conflicting, "circuit conflicts computed");
    masks
}
