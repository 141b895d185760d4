use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Key that names the operation of an action record.
pub const OPERATION_KEY: &str = "operation";

/// Photoshop ActionJSON spelling of [`OPERATION_KEY`].
pub const WIRE_OPERATION_KEY: &str = "_obj";

// ---------------------------------------------------------------------------
// ActionRecord
// ---------------------------------------------------------------------------

/// One image-editing operation.
///
/// Keys keep their original order. Everything except the operation name is
/// operation-specific and stays loosely typed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionRecord(Map<String, Value>);

impl ActionRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The operation name, read from `operation` or, failing that, `_obj`.
    ///
    /// Returns `None` when neither key is present or the value is not a string.
    pub fn operation(&self) -> Option<&str> {
        self.operation_value().and_then(Value::as_str)
    }

    /// Raw value stored under the operation key, whatever its type.
    pub fn operation_value(&self) -> Option<&Value> {
        operation_value_of(&self.0)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Operation value of a raw JSON object, `operation` first, then `_obj`.
pub fn operation_value_of(fields: &Map<String, Value>) -> Option<&Value> {
    fields
        .get(OPERATION_KEY)
        .or_else(|| fields.get(WIRE_OPERATION_KEY))
}

impl TryFrom<Value> for ActionRecord {
    type Error = Value;

    /// Succeeds for JSON objects; hands the value back otherwise.
    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(other),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionSequence
// ---------------------------------------------------------------------------

/// Ordered, non-empty list of actions. Execution order is array order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSequence(Vec<ActionRecord>);

impl ActionSequence {
    /// Build a sequence from records. `None` when `records` is empty.
    pub fn from_records(records: Vec<ActionRecord>) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self(records))
        }
    }

    /// Build a sequence from a decoded JSON value.
    ///
    /// `None` unless the value is a non-empty array whose every element is an
    /// object.
    pub fn from_value(value: Value) -> Option<Self> {
        let Value::Array(items) = value else {
            return None;
        };
        let records = items
            .into_iter()
            .map(ActionRecord::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()
            .ok()?;
        Self::from_records(records)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActionRecord> {
        self.0.iter()
    }

    pub fn records(&self) -> &[ActionRecord] {
        &self.0
    }

    pub fn to_value(&self) -> Value {
        Value::Array(self.0.iter().cloned().map(ActionRecord::into_value).collect())
    }
}

impl<'a> IntoIterator for &'a ActionSequence {
    type Item = &'a ActionRecord;
    type IntoIter = std::slice::Iter<'a, ActionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

const DEFAULT_OPERATIONS: &[&str] = &[
    // basic
    "emboss",
    "open",
    "save",
    "close",
    "make",
    "delete",
    "select",
    "show",
    "hide",
    "set",
    "move",
    "fill",
    "reset",
    "exchange",
    "duplicate",
    "merge",
    "flatten",
    "crop",
    "resize",
    "rotate",
    "transform",
    "apply",
    "copy",
    "paste",
    "cut",
    // adjustments
    "desaturate",
    "invert",
    "brightnessEvent",
    "hueSaturation",
    "vibrance",
    "levels",
    "curves",
    "colorBalance",
    "photoFilter",
    "blackAndWhite",
    "exposure",
    "posterize",
    "threshold",
    // filters
    "gaussianBlur",
    "motionBlur",
    "radialBlur",
    "surfaceBlur",
    "addNoise",
    "unsharpMask",
    "highPass",
    "differenceClouds",
    "tiltShift",
    "minimum",
    "maximum",
    // selection
    "autoCutout",
    "inverse",
    "colorRange",
    "modifySelection",
    // layers
    "mergeVisible",
    "mergeLayersNew",
    "newPlacedLayer",
    "placeEvent",
    "layerSection",
    "contentAwareFill",
    "Adobe Camera Raw Filter",
];

/// Set of operation names the validator recognizes.
///
/// Membership only decides whether an advisory finding is raised; unknown
/// names are never rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRegistry {
    names: BTreeSet<String>,
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self {
            names: DEFAULT_OPERATIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl OperationRegistry {
    pub fn empty() -> Self {
        Self {
            names: BTreeSet::new(),
        }
    }

    /// Default registry plus `extra` names.
    pub fn with_extra<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::default();
        registry.extend(extra);
        registry
    }

    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(names.into_iter().map(Into::into));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
