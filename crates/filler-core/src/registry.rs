use crate::id::{MaterialId, PatternId};
use crate::pattern::{PatternRegistry, SharedPattern};
use crate::supply::MaterialSupply;
use std::collections::{BTreeMap, HashMap};

/// The grid layout that selects a pattern: one optional material per grid
/// slot, in slot order. Empty slots must be empty to match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GridRecipe {
    pub cells: Vec<Option<MaterialId>>,
}

impl GridRecipe {
    pub fn new(cells: Vec<Option<MaterialId>>) -> Self {
        Self { cells }
    }

    /// A recipe with every one of `len` slots holding `material`.
    pub fn filled(len: usize, material: MaterialId) -> Self {
        Self::new(vec![Some(material); len])
    }

    pub fn matches(&self, supply: &MaterialSupply) -> bool {
        self.cells.as_slice() == supply.grid().slots()
    }
}

/// Builder for constructing an immutable [`PatternTable`].
/// Two-phase lifecycle: registration -> finalization.
#[derive(Debug, Default)]
pub struct PatternTableBuilder {
    patterns: BTreeMap<PatternId, SharedPattern>,
    name_to_id: HashMap<String, PatternId>,
    recipes: Vec<(GridRecipe, PatternId)>,
}

impl PatternTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pattern implementation under its own id.
    pub fn register_pattern(&mut self, pattern: SharedPattern) -> Result<PatternId, RegistryError> {
        let id = pattern.id();
        if id.is_none() {
            return Err(RegistryError::ReservedId);
        }
        if self.patterns.contains_key(&id) {
            return Err(RegistryError::DuplicatePattern(id));
        }
        self.name_to_id.insert(pattern.name().to_string(), id);
        self.patterns.insert(id, pattern);
        Ok(id)
    }

    /// Bind a grid layout to a registered pattern.
    pub fn add_recipe(&mut self, recipe: GridRecipe, id: PatternId) -> Result<(), RegistryError> {
        if !self.patterns.contains_key(&id) {
            return Err(RegistryError::UnknownPattern(id));
        }
        if self.recipes.iter().any(|(r, _)| *r == recipe) {
            return Err(RegistryError::DuplicateRecipe(recipe));
        }
        self.recipes.push((recipe, id));
        Ok(())
    }

    /// Lookup a registered pattern id by name.
    pub fn pattern_id(&self, name: &str) -> Option<PatternId> {
        self.name_to_id.get(name).copied()
    }

    /// Finalize and build the immutable table.
    pub fn build(self) -> PatternTable {
        PatternTable {
            patterns: self.patterns,
            name_to_id: self.name_to_id,
            recipes: self.recipes,
        }
    }
}

/// Immutable pattern table. Frozen after build().
#[derive(Debug)]
pub struct PatternTable {
    patterns: BTreeMap<PatternId, SharedPattern>,
    name_to_id: HashMap<String, PatternId>,
    recipes: Vec<(GridRecipe, PatternId)>,
}

impl PatternTable {
    pub fn pattern_id(&self, name: &str) -> Option<PatternId> {
        self.name_to_id.get(name).copied()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }
}

impl PatternRegistry for PatternTable {
    fn find_matching(&self, supply: &MaterialSupply) -> Option<SharedPattern> {
        self.recipes
            .iter()
            .find(|(recipe, _)| recipe.matches(supply))
            .and_then(|(_, id)| self.patterns.get(id).cloned())
    }

    fn resolve(&self, id: PatternId) -> Option<SharedPattern> {
        self.patterns.get(&id).cloned()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("pattern id 0 is reserved for \"no pattern\"")]
    ReservedId,
    #[error("pattern {0:?} registered twice")]
    DuplicatePattern(PatternId),
    #[error("recipe refers to unregistered pattern {0:?}")]
    UnknownPattern(PatternId),
    #[error("recipe {0:?} already bound")]
    DuplicateRecipe(GridRecipe),
}
