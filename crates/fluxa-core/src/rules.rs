use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// ParamBound
// ---------------------------------------------------------------------------

/// Closed numeric interval `[min, max]` for one operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamBound {
    pub min: f64,
    pub max: f64,
}

impl ParamBound {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }
}

impl std::fmt::Display for ParamBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "between {} and {}", self.min, self.max)
    }
}

// ---------------------------------------------------------------------------
// ActionShape
// ---------------------------------------------------------------------------

/// The checks that apply to one operation. Both parts may be present.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActionShape<'a> {
    /// Numeric parameters with documented ranges.
    pub bounds: Option<&'a BTreeMap<String, ParamBound>>,
    /// Nested target field that must carry `_kind` and `_path`.
    pub file_target: Option<&'a str>,
}

impl ActionShape<'_> {
    /// Only the operation name is checked.
    pub fn is_opaque(&self) -> bool {
        self.bounds.is_none() && self.file_target.is_none()
    }
}

// ---------------------------------------------------------------------------
// OperationRules
// ---------------------------------------------------------------------------

/// Per-operation checks, keyed by operation name.
///
/// The table is data so the config file can add or override entries. An
/// operation listed in both maps gets both checks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperationRules {
    #[serde(default)]
    pub bounds: BTreeMap<String, BTreeMap<String, ParamBound>>,
    #[serde(default)]
    pub file_targets: BTreeMap<String, String>,
}

impl OperationRules {
    /// Built-in table: emboss ranges, `open` → `null`, `save` → `in`.
    pub fn builtin() -> Self {
        let mut emboss = BTreeMap::new();
        emboss.insert("amount".to_string(), ParamBound::new(1.0, 500.0));
        emboss.insert("angle".to_string(), ParamBound::new(-360.0, 360.0));
        emboss.insert("height".to_string(), ParamBound::new(1.0, 100.0));

        let mut bounds = BTreeMap::new();
        bounds.insert("emboss".to_string(), emboss);

        let mut file_targets = BTreeMap::new();
        file_targets.insert("open".to_string(), "null".to_string());
        file_targets.insert("save".to_string(), "in".to_string());

        Self {
            bounds,
            file_targets,
        }
    }

    /// Overlay `other` on top of `self`. Bounds merge per parameter.
    pub fn merged(mut self, other: &OperationRules) -> Self {
        for (op, params) in &other.bounds {
            let entry = self.bounds.entry(op.clone()).or_default();
            for (name, bound) in params {
                entry.insert(name.clone(), *bound);
            }
        }
        for (op, field) in &other.file_targets {
            self.file_targets.insert(op.clone(), field.clone());
        }
        self
    }

    pub fn shape_of(&self, operation: &str) -> ActionShape<'_> {
        ActionShape {
            bounds: self.bounds.get(operation),
            file_target: self.file_targets.get(operation).map(String::as_str),
        }
    }

    /// Entries whose interval is inverted (`min > max`), as `(op, param)`.
    pub fn inverted_bounds(&self) -> Vec<(&str, &str)> {
        self.bounds
            .iter()
            .flat_map(|(op, params)| {
                params
                    .iter()
                    .filter(|(_, b)| b.min > b.max)
                    .map(move |(name, _)| (op.as_str(), name.as_str()))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
