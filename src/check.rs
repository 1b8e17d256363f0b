//! Definition self-check - static analysis of request definitions.
//!
//! Catches authoring defects before a definition is compiled for any
//! deployment:
//! - name and wire-name collisions across the whole declared field set
//! - patterns the validation engine cannot compile
//! - defaults that do not fit their field's kind or constraints
//! - contradictory or ineffective constraints
//!
//! A serving process runs this over its definitions at startup; errors
//! should abort before the first request.

use serde::Serialize;
use serde_json::Value;

use crate::definition::RequestDefinition;
use crate::field::{FieldKind, FieldSpec};
use crate::validator::json_type_name;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from checking.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub definition: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

/// Result of checking a set of definitions.
#[derive(Debug, Clone, Serialize)]
pub struct CheckResult {
    pub checked: usize,
    pub errors: usize,
    pub warnings: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckResult {
    /// Returns true if no definition had errors.
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Check a set of request definitions.
pub fn check(definitions: &[RequestDefinition]) -> CheckResult {
    let mut diagnostics = Vec::new();
    for definition in definitions {
        diagnostics.extend(check_definition(definition));
    }

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();

    CheckResult {
        checked: definitions.len(),
        errors,
        warnings,
        diagnostics,
    }
}

/// Check a single request definition.
///
/// Collisions are checked over the full declared field set, gates ignored:
/// two same-named fields may compile fine under one registry and collide
/// under another, so the declaration itself is the hazard.
pub fn check_definition(definition: &RequestDefinition) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    check_name_collisions(definition, &mut diagnostics);
    for field in &definition.fields {
        check_field(definition, field, &mut diagnostics);
    }

    diagnostics
}

fn check_name_collisions(definition: &RequestDefinition, out: &mut Vec<Diagnostic>) {
    let mut internal: Vec<&str> = Vec::new();
    for field in &definition.fields {
        if internal.contains(&field.name.as_str()) {
            out.push(Diagnostic {
                severity: Severity::Error,
                code: "E001".to_string(),
                definition: definition.name.clone(),
                field: Some(field.name.clone()),
                message: format!("field \"{}\" is declared more than once", field.name),
            });
        } else {
            internal.push(&field.name);
        }
    }

    // Same-name pairs are already E001; only report wire collisions that
    // involve distinct fields.
    let mut wire: Vec<(&str, &str)> = Vec::new();
    for field in &definition.fields {
        let external = field.external_name();
        match wire.iter().find(|(seen, _)| *seen == external) {
            Some((_, first)) if *first != field.name => {
                out.push(Diagnostic {
                    severity: Severity::Error,
                    code: "E002".to_string(),
                    definition: definition.name.clone(),
                    field: Some(field.name.clone()),
                    message: format!("wire name \"{}\" is used by more than one field", external),
                });
            }
            Some(_) => {}
            None => wire.push((external, &field.name)),
        }
    }
}

fn check_field(definition: &RequestDefinition, field: &FieldSpec, out: &mut Vec<Diagnostic>) {
    let diagnostic = |severity, code: &str, message: String| Diagnostic {
        severity,
        code: code.to_string(),
        definition: definition.name.clone(),
        field: Some(field.name.clone()),
        message,
    };

    let c = &field.constraints;

    // Contradictory constraints can never be satisfied (or, for a bad
    // multiple_of, never checked meaningfully).
    if let (Some(ge), Some(le)) = (c.ge, c.le) {
        if ge > le {
            out.push(diagnostic(
                Severity::Error,
                "E006",
                format!("minimum bound {ge} exceeds maximum bound {le}"),
            ));
        }
    }
    if let (Some(gt), Some(lt)) = (c.gt, c.lt) {
        if gt >= lt {
            out.push(diagnostic(
                Severity::Error,
                "E006",
                format!("exclusive bounds {gt} and {lt} leave no valid values"),
            ));
        }
    }
    if let (Some(min), Some(max)) = (c.min_length, c.max_length) {
        if min > max {
            out.push(diagnostic(
                Severity::Error,
                "E006",
                format!("min_length {min} exceeds max_length {max}"),
            ));
        }
    }
    if let (Some(min), Some(max)) = (c.min_items, c.max_items) {
        if min > max {
            out.push(diagnostic(
                Severity::Error,
                "E006",
                format!("min_items {min} exceeds max_items {max}"),
            ));
        }
    }
    if let Some(step) = c.multiple_of {
        if step <= 0.0 {
            out.push(diagnostic(
                Severity::Error,
                "E006",
                format!("multiple_of must be positive, got {step}"),
            ));
        }
    }

    // Constraints the kind cannot honor are silently dead at validation
    // time; surface them as warnings.
    let has_numeric =
        c.gt.is_some() || c.ge.is_some() || c.lt.is_some() || c.le.is_some() || c.multiple_of.is_some();
    if has_numeric && !field.kind.is_numeric() {
        out.push(diagnostic(
            Severity::Warning,
            "W001",
            format!("numeric bounds have no effect on a {} field", kind_label(field.kind)),
        ));
    }
    if (c.min_length.is_some() || c.max_length.is_some()) && !field.kind.is_textual() {
        out.push(diagnostic(
            Severity::Warning,
            "W002",
            format!("length bounds have no effect on a {} field", kind_label(field.kind)),
        ));
    }
    if (c.min_items.is_some() || c.max_items.is_some()) && !field.kind.is_listy() {
        out.push(diagnostic(
            Severity::Warning,
            "W002",
            format!("item bounds have no effect on a {} field", kind_label(field.kind)),
        ));
    }
    if c.pattern.is_some() && !field.kind.is_textual() {
        out.push(diagnostic(
            Severity::Warning,
            "W003",
            format!("pattern has no effect on a {} field", kind_label(field.kind)),
        ));
    }
    if field.alias.as_deref() == Some(field.name.as_str()) {
        out.push(diagnostic(
            Severity::Warning,
            "W004",
            "alias repeats the field name".to_string(),
        ));
    }

    if let Some(pattern) = &c.pattern {
        // Probe with a one-property schema so the engine itself judges the
        // regex dialect.
        let probe = serde_json::json!({ "type": "string", "pattern": pattern });
        if let Err(e) = jsonschema::validator_for(&probe) {
            out.push(diagnostic(
                Severity::Error,
                "E003",
                format!("pattern \"{pattern}\" rejected by the validation engine: {e}"),
            ));
        }
    }

    if let Some(default) = &field.default {
        let value = default.produce();
        if !default_fits_kind(field.kind, &value) {
            out.push(diagnostic(
                Severity::Error,
                "E004",
                format!(
                    "default has type {}, which does not fit a {} field",
                    json_type_name(&value),
                    kind_label(field.kind)
                ),
            ));
        } else if let Some(message) = default_bound_violation(field, &value) {
            out.push(diagnostic(Severity::Error, "E005", message));
        }
    }
}

fn kind_label(kind: FieldKind) -> &'static str {
    match kind {
        FieldKind::String => "string",
        FieldKind::OptionalString => "optional string",
        FieldKind::Integer => "integer",
        FieldKind::OptionalInteger => "optional integer",
        FieldKind::CommaList => "comma list",
        FieldKind::StringList => "string list",
        FieldKind::NumberList => "number list",
        FieldKind::Object => "object",
    }
}

fn default_fits_kind(kind: FieldKind, value: &Value) -> bool {
    match kind {
        FieldKind::String => value.is_string(),
        FieldKind::OptionalString | FieldKind::CommaList => value.is_string() || value.is_null(),
        FieldKind::Integer => value.as_i64().is_some(),
        FieldKind::OptionalInteger => value.as_i64().is_some() || value.is_null(),
        FieldKind::StringList => {
            value.is_null()
                || matches!(value, Value::Array(items) if items.iter().all(Value::is_string))
        }
        FieldKind::NumberList => {
            value.is_null()
                || matches!(value, Value::Array(items) if items.iter().all(Value::is_number))
        }
        FieldKind::Object => value.is_object() || value.is_null(),
    }
}

fn default_bound_violation(field: &FieldSpec, value: &Value) -> Option<String> {
    let c = &field.constraints;

    if let Some(n) = value.as_i64() {
        let n = n as f64;
        if let Some(bound) = c.gt {
            if n <= bound {
                return Some(format!("default {n} must be greater than {bound}"));
            }
        }
        if let Some(bound) = c.ge {
            if n < bound {
                return Some(format!("default {n} must be at least {bound}"));
            }
        }
        if let Some(bound) = c.lt {
            if n >= bound {
                return Some(format!("default {n} must be less than {bound}"));
            }
        }
        if let Some(bound) = c.le {
            if n > bound {
                return Some(format!("default {n} must be at most {bound}"));
            }
        }
        if let Some(step) = c.multiple_of {
            if step > 0.0 && n % step != 0.0 {
                return Some(format!("default {n} is not a multiple of {step}"));
            }
        }
    }

    if let Some(s) = value.as_str() {
        let length = s.chars().count() as u64;
        if let Some(bound) = c.min_length {
            if length < bound {
                return Some(format!(
                    "default \"{s}\" has length {length}, below min_length {bound}"
                ));
            }
        }
        if let Some(bound) = c.max_length {
            if length > bound {
                return Some(format!(
                    "default \"{s}\" has length {length}, above max_length {bound}"
                ));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::canonical_definitions;
    use serde_json::json;

    fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
        diagnostics.iter().map(|d| d.code.as_str()).collect()
    }

    #[test]
    fn canonical_definitions_check_clean() {
        let result = check(&canonical_definitions());
        assert!(result.is_ok());
        assert_eq!(result.checked, 6);
        assert_eq!(result.warnings, 0);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn duplicate_name_is_e001() {
        let definition = RequestDefinition::new("search")
            .field(FieldSpec::new("ids", FieldKind::CommaList))
            .field(FieldSpec::new("ids", FieldKind::OptionalString));
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["E001"]);
    }

    #[test]
    fn wire_collision_is_e002() {
        let definition = RequestDefinition::new("item")
            .field(FieldSpec::new("collection_id", FieldKind::String).alias("collection"))
            .field(FieldSpec::new("collection", FieldKind::OptionalString));
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["E002"]);
    }

    #[test]
    fn bad_pattern_is_e003() {
        let definition = RequestDefinition::new("item")
            .field(FieldSpec::new("item_id", FieldKind::String).pattern("(["));
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["E003"]);
    }

    #[test]
    fn mistyped_default_is_e004() {
        let definition = RequestDefinition::new("search").field(
            FieldSpec::new("limit", FieldKind::OptionalInteger).default_value(json!("ten")),
        );
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["E004"]);
    }

    #[test]
    fn factory_output_is_type_checked() {
        let definition = RequestDefinition::new("search")
            .field(FieldSpec::new("field", FieldKind::Object).default_factory(|| json!(7)));
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["E004"]);
    }

    #[test]
    fn out_of_bounds_default_is_e005() {
        let definition = RequestDefinition::new("search").field(
            FieldSpec::new("limit", FieldKind::OptionalInteger)
                .default_value(json!(0))
                .gt(0.0),
        );
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["E005"]);
        assert!(diagnostics[0].message.contains("greater than 0"));
    }

    #[test]
    fn short_string_default_is_e005() {
        let definition = RequestDefinition::new("item").field(
            FieldSpec::new("token", FieldKind::OptionalString)
                .default_value(json!("ab"))
                .min_length(3),
        );
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["E005"]);
    }

    #[test]
    fn contradictory_bounds_are_e006() {
        let definition = RequestDefinition::new("search").field(
            FieldSpec::new("limit", FieldKind::OptionalInteger)
                .ge(100.0)
                .le(10.0),
        );
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["E006"]);
    }

    #[test]
    fn nonpositive_multiple_of_is_e006() {
        let definition = RequestDefinition::new("search")
            .field(FieldSpec::new("limit", FieldKind::OptionalInteger).multiple_of(0.0));
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["E006"]);
    }

    #[test]
    fn numeric_bounds_on_string_warn_w001() {
        let definition = RequestDefinition::new("search")
            .field(FieldSpec::new("token", FieldKind::OptionalString).gt(0.0));
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["W001"]);
        assert_eq!(diagnostics[0].severity, Severity::Warning);
    }

    #[test]
    fn misplaced_length_and_item_bounds_warn_w002() {
        let definition = RequestDefinition::new("search")
            .field(FieldSpec::new("limit", FieldKind::OptionalInteger).min_length(1))
            .field(FieldSpec::new("token", FieldKind::OptionalString).max_items(5));
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["W002", "W002"]);
    }

    #[test]
    fn pattern_on_integer_warns_w003() {
        let definition = RequestDefinition::new("search")
            .field(FieldSpec::new("limit", FieldKind::OptionalInteger).pattern("^[0-9]+$"));
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["W003"]);
    }

    #[test]
    fn redundant_alias_warns_w004() {
        let definition = RequestDefinition::new("search")
            .field(FieldSpec::new("limit", FieldKind::OptionalInteger).alias("limit"));
        let diagnostics = check_definition(&definition);
        assert_eq!(codes(&diagnostics), ["W004"]);
    }

    #[test]
    fn check_aggregates_counts() {
        let good = RequestDefinition::new("collection")
            .field(FieldSpec::new("collection_id", FieldKind::String));
        let bad = RequestDefinition::new("search")
            .field(FieldSpec::new("ids", FieldKind::CommaList))
            .field(FieldSpec::new("ids", FieldKind::CommaList))
            .field(FieldSpec::new("token", FieldKind::OptionalString).gt(0.0));

        let result = check(&[good, bad]);
        assert_eq!(result.checked, 2);
        assert_eq!(result.errors, 1);
        assert_eq!(result.warnings, 1);
        assert!(!result.is_ok());
    }

    #[test]
    fn diagnostics_serialize_with_lowercase_severity() {
        let definition = RequestDefinition::new("search")
            .field(FieldSpec::new("ids", FieldKind::CommaList))
            .field(FieldSpec::new("ids", FieldKind::CommaList));
        let diagnostics = check_definition(&definition);
        let value = serde_json::to_value(&diagnostics[0]).unwrap();

        assert_eq!(value["severity"], json!("error"));
        assert_eq!(value["code"], json!("E001"));
        assert_eq!(value["field"], json!("ids"));
    }
}
