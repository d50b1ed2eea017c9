//! Loading pipeline: finds data files, parses them by extension, and turns
//! them into a validated [`EngineConfig`] and a frozen [`PatternTable`].
//!
//! A data directory holds `engine.{ron,toml,json}` (required) and
//! `patterns.{ron,toml,json}` (optional). Pattern implementations are code;
//! the patterns file only binds grid layouts to pattern names registered on
//! the [`PatternTableBuilder`] passed in.

use std::path::{Path, PathBuf};

use filler_core::config::{ConfigError, EngineConfig};
use filler_core::fixed::Energy;
use filler_core::id::MaterialId;
use filler_core::registry::{GridRecipe, PatternTable, PatternTableBuilder, RegistryError};
use filler_power::{EnergyConfig, Perdition};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::schema::{EngineData, PatternRecipeData};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// An energy amount does not fit the fixed-point range.
    #[error("{field} = {value} is not a representable energy amount in {file}")]
    EnergyOutOfRange {
        file: PathBuf,
        field: &'static str,
        value: f64,
    },

    /// The settings parsed but are inconsistent.
    #[error("invalid engine config in {file}: {source}")]
    InvalidConfig {
        file: PathBuf,
        #[source]
        source: ConfigError,
    },

    /// A recipe row names a pattern that was never registered.
    #[error("unresolved pattern reference '{name}' in {file}")]
    UnresolvedPattern { file: PathBuf, name: String },

    /// A recipe row has the wrong number of grid cells.
    #[error("recipe for '{pattern}' in {file} has {found} grid cells, expected {expected}")]
    GridSize {
        file: PathBuf,
        pattern: String,
        expected: usize,
        found: usize,
    },

    /// The pattern table refused a recipe.
    #[error("recipe for '{pattern}' in {file}: {source}")]
    Registry {
        file: PathBuf,
        pattern: String,
        #[source]
        source: RegistryError,
    },

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

impl Format {
    const ALL: [(Format, &'static str); 3] = [
        (Format::Ron, "ron"),
        (Format::Toml, "toml"),
        (Format::Json, "json"),
    ];
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    let ext = path.extension().and_then(|e| e.to_str());
    Format::ALL
        .iter()
        .find(|(_, e)| Some(*e) == ext)
        .map(|(f, _)| *f)
        .ok_or_else(|| DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        })
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Find `{base_name}.ron|toml|json` in `dir`. Returns `Ok(None)` if there is
/// none and `ConflictingFormats` if there is more than one.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;
    for (_, ext) in Format::ALL {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if !candidate.exists() {
            continue;
        }
        if let Some(existing) = found.take() {
            return Err(DataLoadError::ConflictingFormats {
                a: existing,
                b: candidate,
            });
        }
        found = Some(candidate);
    }
    Ok(found)
}

/// Like [`find_data_file`], but a missing file is an error.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, e: impl std::fmt::Display) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: e.to_string(),
    }
}

fn parse_str<T: DeserializeOwned>(
    format: Format,
    content: &str,
    path: &Path,
) -> Result<T, DataLoadError> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(content).map_err(|e| parse_error(path, e)),
    }
}

/// Read a file and deserialize it according to its extension.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    parse_str(format, &content, path)
}

/// Deserialize a list. TOML has no top-level arrays, so there the list is
/// read from the array under `toml_key`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    if format != Format::Toml {
        return parse_str(format, &content, path);
    }

    let mut table: toml::Table = parse_str(format, &content, path)?;
    let array = table.remove(toml_key).ok_or_else(|| {
        parse_error(path, format!("missing key '{toml_key}' in TOML file"))
    })?;
    array
        .try_into()
        .map_err(|e: toml::de::Error| parse_error(path, e))
}

// ===========================================================================
// Resolution
// ===========================================================================

fn to_energy(value: f64, field: &'static str, file: &Path) -> Result<Energy, DataLoadError> {
    Energy::checked_from_num(value)
        .filter(|_| value.is_finite())
        .ok_or_else(|| DataLoadError::EnergyOutOfRange {
            file: file.to_path_buf(),
            field,
            value,
        })
}

/// Convert parsed engine data into a validated config.
pub fn resolve_engine_config(data: &EngineData, file: &Path) -> Result<EngineConfig, DataLoadError> {
    let perdition = match &data.perdition {
        Some(p) => Some(Perdition {
            loss: to_energy(p.loss, "perdition.loss", file)?,
            interval: p.interval,
        }),
        None => None,
    };
    let config = EngineConfig {
        step_cost: to_energy(data.step_cost, "step_cost", file)?,
        energy: EnergyConfig {
            capacity: to_energy(data.capacity, "capacity", file)?,
            max_receive: to_energy(data.max_receive, "max_receive", file)?,
            max_extract: to_energy(data.max_extract, "max_extract", file)?,
            min_extract: to_energy(data.min_extract, "min_extract", file)?,
        },
        perdition,
        stack_limit: data.stack_limit,
        grid_slots: data.grid_slots,
        input_slots: data.input_slots,
        grid_whitelist: data.grid_whitelist.iter().copied().map(MaterialId).collect(),
    };
    config
        .validate()
        .map_err(|source| DataLoadError::InvalidConfig {
            file: file.to_path_buf(),
            source,
        })?;
    Ok(config)
}

/// Bind one recipe row onto the builder.
pub fn resolve_recipe(
    row: &PatternRecipeData,
    builder: &mut PatternTableBuilder,
    grid_slots: usize,
    file: &Path,
) -> Result<(), DataLoadError> {
    if row.grid.len() != grid_slots {
        return Err(DataLoadError::GridSize {
            file: file.to_path_buf(),
            pattern: row.pattern.clone(),
            expected: grid_slots,
            found: row.grid.len(),
        });
    }
    let id = builder
        .pattern_id(&row.pattern)
        .ok_or_else(|| DataLoadError::UnresolvedPattern {
            file: file.to_path_buf(),
            name: row.pattern.clone(),
        })?;
    let cells = row
        .grid
        .iter()
        .map(|&m| (m != 0).then_some(MaterialId(m)))
        .collect();
    builder
        .add_recipe(GridRecipe::new(cells), id)
        .map_err(|source| DataLoadError::Registry {
            file: file.to_path_buf(),
            pattern: row.pattern.clone(),
            source,
        })
}

// ===========================================================================
// Top-level loading
// ===========================================================================

/// Everything loaded from a data directory.
#[derive(Debug)]
pub struct FillerData {
    pub config: EngineConfig,
    pub table: PatternTable,
}

/// Load and validate `engine.{ron,toml,json}` from `dir`.
pub fn load_engine_config(dir: &Path) -> Result<EngineConfig, DataLoadError> {
    let path = require_data_file(dir, "engine")?;
    let data: EngineData = deserialize_file(&path)?;
    let config = resolve_engine_config(&data, &path)?;
    debug!(file = %path.display(), step_cost = %config.step_cost, "engine config loaded");
    Ok(config)
}

/// Bind the rows of `patterns.{ron,toml,json}` in `dir`, if present.
/// Returns the number of recipes added.
pub fn load_pattern_recipes(
    dir: &Path,
    builder: &mut PatternTableBuilder,
    grid_slots: usize,
) -> Result<usize, DataLoadError> {
    let Some(path) = find_data_file(dir, "patterns")? else {
        return Ok(0);
    };
    let rows: Vec<PatternRecipeData> = deserialize_list(&path, "patterns")?;
    for row in &rows {
        resolve_recipe(row, builder, grid_slots, &path)?;
    }
    debug!(file = %path.display(), recipes = rows.len(), "pattern recipes loaded");
    Ok(rows.len())
}

/// Load a whole data directory. `builder` must already hold the pattern
/// implementations the recipes refer to.
pub fn load_filler_data(
    dir: &Path,
    mut builder: PatternTableBuilder,
) -> Result<FillerData, DataLoadError> {
    let config = load_engine_config(dir)?;
    load_pattern_recipes(dir, &mut builder, config.grid_slots)?;
    Ok(FillerData {
        config,
        table: builder.build(),
    })
}

// ===========================================================================
// Tests
// ===========================================================================
