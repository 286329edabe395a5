//! Criterion benchmarks for building, loading and querying a dataset.
//!
//! Benchmark groups:
//! - `build`: encode a synthetic pack of 5000 items and 5000 recipes
//! - `load`: validate the arena and index every id
//! - `navigate`: id lookup and production walks on a warm dataset
//! - `search`: token queries with and without a prefilter hit

use criterion::{Criterion, criterion_group, criterion_main};
use craftbook_core::build::build;
use craftbook_core::config::BuildConfig;
use craftbook_core::dataset::Dataset;
use craftbook_core::model::Model;
use craftbook_core::test_utils::*;

// ===========================================================================
// Synthetic pack
// ===========================================================================

const MATERIALS: [&str; 10] = [
    "Iron", "Copper", "Tin", "Bronze", "Steel", "Gold", "Silver", "Lead", "Nickel", "Zinc",
];
const FORMS: [&str; 5] = ["Ingot", "Plate", "Rod", "Gear", "Screw"];

/// `n` materials in every form, with one press recipe per non-ingot form.
fn synthetic_model(n: usize) -> Model {
    let mut model = Model {
        categories: vec![category("press")],
        ..Default::default()
    };
    for m in 0..n {
        let material = MATERIALS[m % MATERIALS.len()];
        for form in FORMS {
            let id = format!("i:bench:{}_{}_{m}", form.to_lowercase(), material.to_lowercase());
            model.items.push(item(&id, &format!("{material} {form} {m}")));
        }
        let ingot = format!("i:bench:ingot_{}_{m}", material.to_lowercase());
        for form in &FORMS[1..] {
            let out = format!("i:bench:{}_{}_{m}", form.to_lowercase(), material.to_lowercase());
            let mut r = recipe(
                &format!("r:bench:{}_{m}", form.to_lowercase()),
                "press",
                vec![input(&ingot, 1), output(&out, 1)],
            );
            r.machine = Some(machine(30, 100));
            model.recipes.push(r);
        }
    }
    model
}

fn synthetic_bytes() -> Vec<u8> {
    build_default(synthetic_model(1000)).bytes
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_build(c: &mut Criterion) {
    let model = synthetic_model(1000);
    let config = BuildConfig::default();
    c.bench_function("build_5000_items", |b| {
        b.iter(|| build(model.clone(), None, &config).unwrap())
    });
}

fn bench_load(c: &mut Criterion) {
    let bytes = synthetic_bytes();
    c.bench_function("load_5000_items", |b| {
        b.iter(|| Dataset::load(bytes.clone()).unwrap())
    });
}

fn bench_navigate(c: &mut Criterion) {
    let ds = Dataset::load(synthetic_bytes()).unwrap();
    c.bench_function("get_by_id", |b| {
        b.iter(|| ds.get_by_id("i:bench:gear_steel_504").unwrap())
    });
    c.bench_function("ingot_consumption", |b| {
        b.iter(|| {
            ds.items()
                .take(500)
                .map(|i| i.consumption().count())
                .sum::<usize>()
        })
    });
}

fn bench_search(c: &mut Criterion) {
    let ds = Dataset::load(synthetic_bytes()).unwrap();
    c.bench_function("search_steel_gear", |b| {
        b.iter(|| ds.query("steel gear").count())
    });
    c.bench_function("search_absent", |b| b.iter(|| ds.query("quartz").count()));
    c.bench_function("search_mod_filter", |b| {
        b.iter(|| ds.query("@bench plate").items().count())
    });
}

criterion_group!(benches, bench_build, bench_load, bench_navigate, bench_search);
criterion_main!(benches);
