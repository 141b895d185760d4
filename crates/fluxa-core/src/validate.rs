use crate::action::{operation_value_of, OperationRegistry};
use crate::rules::OperationRules;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

// ---------------------------------------------------------------------------
// Severity / FindingKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Invalidates the whole sequence.
    Fatal,
    /// Reported to the caller, never blocks acceptance.
    Advisory,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Fatal => "fatal",
            Severity::Advisory => "advisory",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingKind {
    NotAnArray,
    EmptyArray,
    NotAnObject,
    MissingOperation,
    InvalidOperation,
    MissingTarget,
    MissingTargetKey,
    UnknownOperation,
    OutOfRange,
}

impl FindingKind {
    pub fn severity(self) -> Severity {
        match self {
            FindingKind::UnknownOperation | FindingKind::OutOfRange => Severity::Advisory,
            _ => Severity::Fatal,
        }
    }
}

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// One validation finding. `index` is the 0-based position of the offending
/// record, `None` for findings about the array as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub index: Option<usize>,
    pub kind: FindingKind,
    pub message: String,
}

impl ValidationError {
    fn root(kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            index: None,
            kind,
            message: message.into(),
        }
    }

    fn at(index: usize, kind: FindingKind, message: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            kind,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ---------------------------------------------------------------------------
// ValidationReport
// ---------------------------------------------------------------------------

/// Every finding for one array, in record order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
}

impl ValidationReport {
    /// `true` when no fatal finding is present. Advisory findings do not count.
    pub fn is_valid(&self) -> bool {
        !self.errors.iter().any(ValidationError::is_fatal)
    }

    /// `true` when there are no findings at all.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn fatal(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| e.is_fatal())
    }

    pub fn advisory(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| !e.is_fatal())
    }

    /// Messages joined with `", "`.
    pub fn summary(&self) -> String {
        join_messages(self.errors.iter())
    }

    pub fn fatal_summary(&self) -> String {
        join_messages(self.fatal())
    }

    pub fn into_advisory(self) -> Vec<ValidationError> {
        self.errors.into_iter().filter(|e| !e.is_fatal()).collect()
    }
}

fn join_messages<'a>(errors: impl Iterator<Item = &'a ValidationError>) -> String {
    errors
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Validator
// ---------------------------------------------------------------------------

/// Checks decoded action arrays against the operation registry and rules table.
#[derive(Debug, Clone)]
pub struct Validator {
    registry: OperationRegistry,
    rules: OperationRules,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(OperationRegistry::default(), OperationRules::builtin())
    }
}

impl Validator {
    pub fn new(registry: OperationRegistry, rules: OperationRules) -> Self {
        Self { registry, rules }
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn rules(&self) -> &OperationRules {
        &self.rules
    }

    /// Validate a decoded JSON value.
    ///
    /// A non-array root or an empty array short-circuits with a single fatal
    /// finding. Otherwise every element is checked, even after earlier ones
    /// fail.
    pub fn validate(&self, value: &Value) -> ValidationReport {
        let Value::Array(items) = value else {
            return ValidationReport {
                errors: vec![ValidationError::root(
                    FindingKind::NotAnArray,
                    "root must be an array of actions",
                )],
            };
        };

        if items.is_empty() {
            return ValidationReport {
                errors: vec![ValidationError::root(
                    FindingKind::EmptyArray,
                    "action array is empty",
                )],
            };
        }

        let mut errors = Vec::new();
        for (idx, item) in items.iter().enumerate() {
            self.validate_item(idx, item, &mut errors);
        }
        ValidationReport { errors }
    }

    /// Decode `text` and validate it. Decode failures are returned as-is.
    pub fn validate_str(&self, text: &str) -> serde_json::Result<(Value, ValidationReport)> {
        let value: Value = serde_json::from_str(text)?;
        let report = self.validate(&value);
        Ok((value, report))
    }

    fn validate_item(&self, idx: usize, item: &Value, errors: &mut Vec<ValidationError>) {
        let Value::Object(record) = item else {
            errors.push(ValidationError::at(
                idx,
                FindingKind::NotAnObject,
                format!("action at index {idx} is not an object"),
            ));
            return;
        };

        let Some(op_value) = operation_value_of(record) else {
            errors.push(ValidationError::at(
                idx,
                FindingKind::MissingOperation,
                format!("action at index {idx} is missing required 'operation' field"),
            ));
            return;
        };

        let Some(operation) = op_value.as_str() else {
            errors.push(ValidationError::at(
                idx,
                FindingKind::InvalidOperation,
                format!("action at index {idx}: 'operation' must be a string, got {op_value}"),
            ));
            return;
        };

        if !self.registry.contains(operation) {
            errors.push(ValidationError::at(
                idx,
                FindingKind::UnknownOperation,
                format!(
                    "action at index {idx}: '{operation}' is not a recognized operation \
                     (this may still be valid)"
                ),
            ));
        }

        let shape = self.rules.shape_of(operation);

        if let Some(field) = shape.file_target {
            match record.get(field) {
                Some(Value::Object(target)) => {
                    for key in ["_kind", "_path"] {
                        if !target.contains_key(key) {
                            errors.push(ValidationError::at(
                                idx,
                                FindingKind::MissingTargetKey,
                                format!(
                                    "action at index {idx}: '{operation}' action '{field}' \
                                     missing '{key}' field"
                                ),
                            ));
                        }
                    }
                }
                Some(_) => errors.push(ValidationError::at(
                    idx,
                    FindingKind::MissingTarget,
                    format!("action at index {idx}: '{operation}' action '{field}' must be an object"),
                )),
                None => errors.push(ValidationError::at(
                    idx,
                    FindingKind::MissingTarget,
                    format!("action at index {idx}: '{operation}' action missing '{field}' field"),
                )),
            }
        }

        for (name, bound) in shape.bounds.into_iter().flatten() {
            let Some(value) = record.get(name) else {
                continue;
            };
            let in_range = value.as_f64().is_some_and(|v| bound.contains(v));
            if !in_range {
                errors.push(ValidationError::at(
                    idx,
                    FindingKind::OutOfRange,
                    format!("action at index {idx}: {operation} '{name}' should be {bound}"),
                ));
            }
        }
    }
}

/// Validate with the default registry and rules.
pub fn validate(value: &Value) -> ValidationReport {
    Validator::default().validate(value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_array_is_single_fatal_error() {
        let report = validate(&json!([]));
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("empty"));
        assert_eq!(report.errors[0].index, None);
    }

    #[test]
    fn object_root_is_single_fatal_error() {
        let report = validate(&json!({"operation": "x"}));
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].message.contains("array"));
        assert_eq!(report.errors[0].kind, FindingKind::NotAnArray);
    }

    #[test]
    fn emboss_in_range_is_clean() {
        let report = validate(&json!([
            {"operation": "emboss", "amount": 100, "angle": 135, "height": 3}
        ]));
        assert!(report.is_valid());
        assert!(report.is_clean());
    }

    #[test]
    fn emboss_out_of_range_is_three_advisories() {
        let report = validate(&json!([
            {"operation": "emboss", "amount": 1000, "angle": 500, "height": 200}
        ]));
        assert!(report.is_valid(), "range violations are advisory");
        assert_eq!(report.errors.len(), 3);
        assert!(report
            .errors
            .iter()
            .all(|e| e.kind == FindingKind::OutOfRange && e.index == Some(0)));
        assert!(report.errors.iter().any(|e| e.message.contains("'amount'")));
        assert!(report.errors.iter().any(|e| e.message.contains("'angle'")));
        assert!(report.errors.iter().any(|e| e.message.contains("'height'")));
    }

    #[test]
    fn emboss_non_numeric_parameter_is_advisory() {
        let report = validate(&json!([{"_obj": "emboss", "amount": "lots"}]));
        assert!(report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, FindingKind::OutOfRange);
    }

    #[test]
    fn missing_operation_is_fatal_at_index() {
        let report = validate(&json!([{"amount": 100}]));
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index, Some(0));
        assert_eq!(report.errors[0].kind, FindingKind::MissingOperation);
        assert!(report.errors[0].message.contains("operation"));
    }

    #[test]
    fn non_string_operation_is_fatal() {
        let report = validate(&json!([{"operation": 42}]));
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].kind, FindingKind::InvalidOperation);
    }

    #[test]
    fn all_elements_checked_after_failure() {
        let report = validate(&json!([
            "not an object",
            {"amount": 1},
            {"operation": "mysteryFilter"},
            {"operation": "invert"}
        ]));
        assert!(!report.is_valid());
        let kinds: Vec<_> = report.errors.iter().map(|e| (e.index, e.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (Some(0), FindingKind::NotAnObject),
                (Some(1), FindingKind::MissingOperation),
                (Some(2), FindingKind::UnknownOperation),
            ]
        );
        assert_eq!(report.fatal().count(), 2);
        assert_eq!(report.advisory().count(), 1);
    }

    #[test]
    fn unknown_operation_alone_stays_valid() {
        let report = validate(&json!([{"operation": "sharpenMore"}]));
        assert!(report.is_valid());
        assert!(!report.is_clean());
        assert!(report.errors[0].message.contains("may still be valid"));
    }

    #[test]
    fn open_with_target_is_clean() {
        let report = validate(&json!([{
            "_obj": "open",
            "null": {"_kind": "local", "_path": "/path/to/file.jpg"},
            "template": false
        }]));
        assert!(report.is_clean());
    }

    #[test]
    fn open_without_target_is_fatal() {
        let report = validate(&json!([{"operation": "open"}]));
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.message.contains("'null'")));
    }

    #[test]
    fn save_target_missing_keys_reports_each() {
        let report = validate(&json!([{"operation": "save", "in": {}}]));
        assert!(!report.is_valid());
        assert_eq!(report.errors.len(), 2);
        assert!(report.errors[0].message.contains("'_kind'"));
        assert!(report.errors[1].message.contains("'_path'"));
        assert!(report
            .errors
            .iter()
            .all(|e| e.kind == FindingKind::MissingTargetKey));
    }

    #[test]
    fn save_target_not_an_object_is_fatal() {
        let report = validate(&json!([{"operation": "save", "in": "/tmp/out.psd"}]));
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].kind, FindingKind::MissingTarget);
    }

    #[test]
    fn configured_bounds_apply_to_file_operations() {
        let mut rules = OperationRules::builtin();
        rules.bounds.entry("save".into()).or_default().insert(
            "quality".into(),
            crate::rules::ParamBound::new(0.0, 12.0),
        );
        let validator = Validator::new(OperationRegistry::default(), rules);

        let report = validator.validate(&json!([
            {"operation": "save", "in": {"_kind": "local", "_path": "/o.jpg"}, "quality": 99}
        ]));
        assert!(report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, FindingKind::OutOfRange);

        let report = validator.validate(&json!([{"operation": "save", "quality": 99}]));
        assert!(!report.is_valid());
        let kinds: Vec<_> = report.errors.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![FindingKind::MissingTarget, FindingKind::OutOfRange]);
    }

    #[test]
    fn custom_rules_and_registry() {
        let mut rules = OperationRules::builtin();
        rules.bounds.entry("gaussianBlur".into()).or_default().insert(
            "radius".into(),
            crate::rules::ParamBound::new(0.1, 250.0),
        );
        let validator = Validator::new(OperationRegistry::with_extra(["liquify"]), rules);
        let report = validator.validate(&json!([
            {"operation": "liquify"},
            {"operation": "gaussianBlur", "radius": 900}
        ]));
        assert!(report.is_valid());
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].index, Some(1));
    }

    #[test]
    fn validate_str_propagates_decode_error() {
        let validator = Validator::default();
        assert!(validator.validate_str("[{oops}]").is_err());
        let (value, report) = validator
            .validate_str(r#"[{"operation": "invert"}]"#)
            .unwrap();
        assert!(value.is_array());
        assert!(report.is_clean());
    }

    #[test]
    fn summaries_join_messages() {
        let report = validate(&json!([{"amount": 1}, {"operation": "zzz"}]));
        assert_eq!(
            report.fatal_summary(),
            "action at index 0 is missing required 'operation' field"
        );
        assert!(report.summary().contains(", action at index 1"));
        assert_eq!(report.clone().into_advisory().len(), 1);
    }

    #[test]
    fn finding_serializes_with_snake_case_kind() {
        let report = validate(&json!([]));
        let json = serde_json::to_value(&report.errors[0]).unwrap();
        assert_eq!(json["kind"], "empty_array");
        assert_eq!(json["index"], Value::Null);
    }
}
