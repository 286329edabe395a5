//! Resolution pipeline: reads data files, checks cross-references, builds
//! the core model and the arena.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers used by [`load_model`], [`load_config`] and
//! [`build_dir`].

use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use craftbook_core::build::{BuildError, BuildOutput, build};
use craftbook_core::config::BuildConfig;
use craftbook_core::model::{IoKind, Model};
use tracing::{debug, info};

use crate::schema::{CategoryData, FluidData, GroupData, ItemData, RecipeData};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: &'static str, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// An id or name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate id or name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The model loaded but could not be encoded.
    #[error(transparent)]
    Build(#[from] BuildError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &'static str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name,
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => {
            let mut table: toml::Table =
                toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table.remove(toml_key).ok_or_else(|| {
                parse_error(path, format!("missing key '{toml_key}' in TOML file"))
            })?;
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

/// Load the list in `{base_name}.*`, or an empty list if there is none.
fn optional_list<T: DeserializeOwned>(
    dir: &Path,
    base_name: &str,
) -> Result<(Vec<T>, PathBuf), DataLoadError> {
    match find_data_file(dir, base_name)? {
        Some(path) => Ok((deserialize_list(&path, base_name)?, path)),
        None => Ok((Vec::new(), dir.join(base_name))),
    }
}

fn required_list<T: DeserializeOwned>(
    dir: &Path,
    base_name: &'static str,
) -> Result<(Vec<T>, PathBuf), DataLoadError> {
    let path = require_data_file(dir, base_name)?;
    Ok((deserialize_list(&path, base_name)?, path))
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Index `names` by position, rejecting duplicates.
fn index_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
    file: &Path,
) -> Result<HashMap<String, usize>, DataLoadError> {
    let mut map = HashMap::new();
    for (i, name) in names.into_iter().enumerate() {
        check_duplicate(&map, name, file)?;
        map.insert(name.to_owned(), i);
    }
    Ok(map)
}

// ===========================================================================
// Loading pipeline
// ===========================================================================

/// Read the data files in `dir` into a core [`Model`].
///
/// `items`, `categories` and `recipes` are required; `fluids`, `groups` and
/// `well_known` are optional. Ids must be unique per file, and every id or
/// category name a record refers to must be defined.
pub fn load_model(dir: &Path) -> Result<Model, DataLoadError> {
    let (items, items_path): (Vec<ItemData>, _) = required_list(dir, "items")?;
    let (fluids, fluids_path): (Vec<FluidData>, _) = optional_list(dir, "fluids")?;
    let (groups, groups_path): (Vec<GroupData>, _) = optional_list(dir, "groups")?;
    let (categories, categories_path): (Vec<CategoryData>, _) =
        required_list(dir, "categories")?;
    let (recipes, recipes_path): (Vec<RecipeData>, _) = required_list(dir, "recipes")?;
    let (well_known, well_known_path): (Vec<String>, _) = optional_list(dir, "well_known")?;

    let item_ids = index_names(items.iter().map(|i| i.id.as_str()), &items_path)?;
    let fluid_ids = index_names(fluids.iter().map(|f| f.id.as_str()), &fluids_path)?;
    let group_ids = index_names(groups.iter().map(|g| g.id.as_str()), &groups_path)?;
    let category_names =
        index_names(categories.iter().map(|c| c.name.as_str()), &categories_path)?;
    let recipe_ids = index_names(recipes.iter().map(|r| r.id.as_str()), &recipes_path)?;

    for item in &items {
        if let Some(c) = &item.container {
            resolve_name(&fluid_ids, &c.fluid, &items_path, "fluid")?;
            if let Some(empty) = &c.empty {
                resolve_name(&item_ids, empty, &items_path, "item")?;
            }
        }
    }
    for group in &groups {
        for member in &group.items {
            resolve_name(&item_ids, member, &groups_path, "item")?;
        }
    }
    for category in &categories {
        let crafters = category
            .singleblocks
            .iter()
            .chain(&category.multiblocks)
            .chain(&category.crafters)
            .chain(&category.default_crafter);
        for crafter in crafters {
            resolve_name(&item_ids, crafter, &categories_path, "item")?;
        }
    }
    for recipe in &recipes {
        resolve_name(&category_names, &recipe.category, &recipes_path, "category")?;
        for (kind, io) in recipe.io() {
            let (map, expected_kind) = match kind {
                IoKind::ItemInput | IoKind::ItemOutput => (&item_ids, "item"),
                IoKind::FluidInput | IoKind::FluidOutput => (&fluid_ids, "fluid"),
                IoKind::GroupInput => (&group_ids, "group"),
            };
            resolve_name(map, io.goods(), &recipes_path, expected_kind)?;
        }
    }
    for id in &well_known {
        let known = item_ids.contains_key(id)
            || fluid_ids.contains_key(id)
            || group_ids.contains_key(id)
            || recipe_ids.contains_key(id);
        if !known {
            return Err(DataLoadError::UnresolvedRef {
                file: well_known_path,
                name: id.clone(),
                expected_kind: "object",
            });
        }
    }

    let model = Model {
        items: items.into_iter().map(ItemData::into_def).collect(),
        fluids: fluids.into_iter().map(FluidData::into_def).collect(),
        groups: groups.into_iter().map(GroupData::into_def).collect(),
        categories: categories.into_iter().map(CategoryData::into_def).collect(),
        recipes: recipes.into_iter().map(RecipeData::into_def).collect(),
        well_known,
    };
    info!(
        dir = %dir.display(),
        items = model.items.len(),
        fluids = model.fluids.len(),
        groups = model.groups.len(),
        categories = model.categories.len(),
        recipes = model.recipes.len(),
        "model loaded"
    );
    Ok(model)
}

/// Read `build.*` from `dir`. A missing file yields the default config.
pub fn load_config(dir: &Path) -> Result<BuildConfig, DataLoadError> {
    match find_data_file(dir, "build")? {
        Some(path) => {
            debug!(file = %path.display(), "reading build config");
            deserialize_file(&path)
        }
        None => Ok(BuildConfig::default()),
    }
}

/// Load the model and config in `dir` and encode them, remapping recipe ids
/// against `previous` (the prior build's arena) if given.
pub fn build_dir(dir: &Path, previous: Option<&[u8]>) -> Result<BuildOutput, DataLoadError> {
    let config = load_config(dir)?;
    let model = load_model(dir)?;
    Ok(build(model, previous, &config)?)
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "craftbook_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Clean up a test directory.
    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const ITEMS_RON: &str = r#"[
        (id: "i:gt:ore_iron", name: "Iron Ore"),
        (id: "i:gt:dust_iron", name: "Iron Dust"),
        (id: "i:gt:macerator", name: "Macerator"),
    ]"#;

    const CATEGORIES_RON: &str = r#"[
        (name: "macerator", crafters: ["i:gt:macerator"]),
    ]"#;

    const RECIPES_RON: &str = r#"[
        (
            id: "r:dust_iron",
            category: "macerator",
            item_inputs: [("i:gt:ore_iron", 1)],
            item_outputs: [("i:gt:dust_iron", 2)],
        ),
    ]"#;

    /// A minimal valid data directory.
    fn write_pack(dir: &Path) {
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();
        fs::write(dir.join("categories.ron"), CATEGORIES_RON).unwrap();
        fs::write(dir.join("recipes.ron"), RECIPES_RON).unwrap();
    }

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("items.ron")).unwrap(), Format::Ron);
        assert_eq!(
            detect_format(Path::new("items.toml")).unwrap(),
            Format::Toml
        );
        assert_eq!(
            detect_format(Path::new("items.json")).unwrap(),
            Format::Json
        );
    }

    #[test]
    fn detect_format_unsupported() {
        for name in ["items.yaml", "items"] {
            let result = detect_format(Path::new(name));
            assert!(matches!(
                result,
                Err(DataLoadError::UnsupportedFormat { .. })
            ));
        }
    }

    // -----------------------------------------------------------------------
    // find_data_file / require_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_data_file_found_json() {
        let dir = make_test_dir("find_json");
        fs::write(dir.join("items.json"), "[]").unwrap();

        let result = find_data_file(&dir, "items").unwrap();
        assert_eq!(result, Some(dir.join("items.json")));

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_missing() {
        let dir = make_test_dir("find_missing");

        let result = find_data_file(&dir, "items").unwrap();
        assert_eq!(result, None);

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("items.ron"), "[]").unwrap();
        fs::write(dir.join("items.json"), "[]").unwrap();

        let result = find_data_file(&dir, "items");
        assert!(matches!(
            result,
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");

        let result = require_data_file(&dir, "items");
        assert!(matches!(
            result,
            Err(DataLoadError::MissingRequired { file: "items", .. })
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // deserialize_file / deserialize_list
    // -----------------------------------------------------------------------

    #[test]
    fn deserialize_list_ron() {
        let dir = make_test_dir("list_ron");
        let path = dir.join("items.ron");
        fs::write(&path, ITEMS_RON).unwrap();

        let items: Vec<ItemData> = deserialize_list(&path, "items").unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].id, "i:gt:ore_iron");

        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_toml() {
        let dir = make_test_dir("list_toml");
        let path = dir.join("items.toml");
        fs::write(
            &path,
            r#"
[[items]]
id = "i:gt:ore_iron"
name = "Iron Ore"

[[items]]
id = "i:gt:dust_iron"
name = "Iron Dust"
tooltip = "Fine"
"#,
        )
        .unwrap();

        let items: Vec<ItemData> = deserialize_list(&path, "items").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].tooltip.as_deref(), Some("Fine"));

        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_toml_missing_key() {
        let dir = make_test_dir("list_toml_missing");
        let path = dir.join("items.toml");
        fs::write(&path, r#"foo = "bar""#).unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_list(&path, "items");
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("deser_parse_err");
        let path = dir.join("bad.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let result: Result<Vec<ItemData>, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // resolve_name / check_duplicate
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_name_missing() {
        let map: HashMap<String, u32> = HashMap::new();

        let result = resolve_name(&map, "i:gt:ore", Path::new("recipes.ron"), "item");
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "item", .. }) if name == "i:gt:ore"
        ));
    }

    #[test]
    fn check_duplicate_has_dup() {
        let mut map = HashMap::new();
        map.insert("i:gt:ore".to_string(), 42u32);

        let result = check_duplicate(&map, "i:gt:ore", Path::new("items.ron"));
        assert!(matches!(
            result,
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "i:gt:ore"
        ));
    }

    // -----------------------------------------------------------------------
    // load_model
    // -----------------------------------------------------------------------

    #[test]
    fn load_model_minimal_pack() {
        let dir = make_test_dir("model_minimal");
        write_pack(&dir);

        let model = load_model(&dir).unwrap();
        assert_eq!(model.items.len(), 3);
        assert!(model.fluids.is_empty());
        assert_eq!(model.recipes[0].io.len(), 2);
        assert_eq!(model.categories[0].crafters, ["i:gt:macerator"]);

        cleanup(&dir);
    }

    #[test]
    fn load_model_requires_recipes() {
        let dir = make_test_dir("model_no_recipes");
        fs::write(dir.join("items.ron"), ITEMS_RON).unwrap();
        fs::write(dir.join("categories.ron"), CATEGORIES_RON).unwrap();

        let result = load_model(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::MissingRequired { file: "recipes", .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn load_model_rejects_duplicate_ids() {
        let dir = make_test_dir("model_dup");
        write_pack(&dir);
        fs::write(
            dir.join("items.ron"),
            r#"[(id: "i:gt:ore_iron", name: "A"), (id: "i:gt:ore_iron", name: "B")]"#,
        )
        .unwrap();

        let result = load_model(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "i:gt:ore_iron"
        ));

        cleanup(&dir);
    }

    #[test]
    fn load_model_rejects_unknown_category() {
        let dir = make_test_dir("model_bad_category");
        write_pack(&dir);
        fs::write(dir.join("categories.ron"), "[]").unwrap();

        let result = load_model(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { expected_kind: "category", ref name, .. })
                if name == "macerator"
        ));

        cleanup(&dir);
    }

    #[test]
    fn load_model_rejects_unknown_fluid_input() {
        let dir = make_test_dir("model_bad_fluid");
        write_pack(&dir);
        fs::write(
            dir.join("recipes.json"),
            r#"[{"id": "r:x", "category": "macerator", "fluid_inputs": [["f:water", 100]]}]"#,
        )
        .unwrap();
        fs::remove_file(dir.join("recipes.ron")).unwrap();

        let result = load_model(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { expected_kind: "fluid", .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn load_model_checks_well_known() {
        let dir = make_test_dir("model_well_known");
        write_pack(&dir);
        fs::write(dir.join("well_known.json"), r#"["i:gt:macerator", "i:gt:gone"]"#).unwrap();

        let result = load_model(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { expected_kind: "object", ref name, .. })
                if name == "i:gt:gone"
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // load_config / build_dir
    // -----------------------------------------------------------------------

    #[test]
    fn missing_config_is_default() {
        let dir = make_test_dir("config_default");

        let config = load_config(&dir).unwrap();
        assert_eq!(config.circuit_item, "gt.integrated_circuit");
        assert!(config.ban_rules.is_empty());

        cleanup(&dir);
    }

    #[test]
    fn config_from_toml() {
        let dir = make_test_dir("config_toml");
        fs::write(
            dir.join("build.toml"),
            r#"
circuit_item = "gt.circuit"
standard_bans = true

[[ban_rules]]
mod_name = "gt"
internal_name = "dust_iron"
"#,
        )
        .unwrap();

        let config = load_config(&dir).unwrap();
        assert_eq!(config.circuit_item, "gt.circuit");
        assert_eq!(config.ban_rules.len(), 1);
        assert!(config.standard_bans);
        let bans = config.ban_list();
        assert!(bans.is_banned("gt", "dust_iron", "Iron Dust", None));
        assert!(bans.is_banned("TGregworks", "tGregToolPartChunk", "Steel Chunk", None));

        cleanup(&dir);
    }

    #[test]
    fn build_dir_applies_config() {
        let dir = make_test_dir("build_dir");
        write_pack(&dir);
        fs::write(
            dir.join("build.ron"),
            r#"(ban_rules: [(mod_name: "gt", internal_name: "dust_iron")])"#,
        )
        .unwrap();

        let out = build_dir(&dir, None).unwrap();
        assert_eq!(out.report.items, 2);
        assert_eq!(out.report.recipes, 0);
        assert_eq!(out.report.filter.items, 1);
        let ds = out.dataset().unwrap();
        assert!(ds.get_by_id("i:gt:dust_iron").is_none());

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Error display messages
    // -----------------------------------------------------------------------

    #[test]
    fn error_display_messages() {
        let e = DataLoadError::MissingRequired {
            file: "items",
            dir: PathBuf::from("/data"),
        };
        assert!(format!("{e}").contains("items"));
        assert!(format!("{e}").contains("/data"));

        let e = DataLoadError::UnresolvedRef {
            file: PathBuf::from("recipes.ron"),
            name: "i:gt:ore".to_string(),
            expected_kind: "item",
        };
        let msg = format!("{e}");
        assert!(msg.contains("i:gt:ore"));
        assert!(msg.contains("item"));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let data_err: DataLoadError = io_err.into();
        assert!(matches!(data_err, DataLoadError::Io(_)));
        assert!(format!("{data_err}").contains("file not found"));
    }
}
