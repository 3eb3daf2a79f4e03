//! Design variables.
//!
//! A variable belongs to a collection and holds one value per mode of that collection. Which mode
//! applies is decided by the explicit variable modes set on the view or its ancestors, falling
//! back to the collection's default mode.

use crate::color::Color;
use crate::view::ColorOrVar;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// alias chains longer than this are treated as cycles
const MAX_ALIAS_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableValue {
    Color(Color),
    /// Refers to another variable by id.
    Alias(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,
    pub name: String,
    pub collection_id: String,
    /// mode id -> value
    pub values_by_mode: HashMap<String, VariableValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    pub default_mode_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VariableMap {
    pub collections: HashMap<String, Collection>,
    pub variables: HashMap<String, Variable>,
}

impl VariableMap {
    /// Resolves a possibly variable-bound color.
    ///
    /// - `modes`: collection id -> mode id, as inherited down the view tree
    pub fn resolve_color(&self, value: &ColorOrVar, modes: &HashMap<String, String>) -> Color {
        match value {
            ColorOrVar::Color(c) => *c,
            ColorOrVar::Var { id, fallback } => {
                self.lookup_color(id, modes, 0).unwrap_or(*fallback)
            }
        }
    }

    fn lookup_color(
        &self,
        id: &str,
        modes: &HashMap<String, String>,
        depth: usize,
    ) -> Option<Color> {
        if depth > MAX_ALIAS_DEPTH {
            warn!("variable alias chain too deep at {}", id);
            return None;
        }
        let variable = self.variables.get(id)?;
        let collection = self.collections.get(&variable.collection_id)?;
        let mode = modes
            .get(&collection.id)
            .filter(|mode| variable.values_by_mode.contains_key(*mode))
            .unwrap_or(&collection.default_mode_id);

        match variable.values_by_mode.get(mode)? {
            VariableValue::Color(c) => Some(*c),
            VariableValue::Alias(target) => self.lookup_color(target, modes, depth + 1),
        }
    }
}
