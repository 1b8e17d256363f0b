//! Payload validation and parameter binding against compiled schemas.
//!
//! Two transports feed the same machinery: key/value pairs from a query
//! string (everything arrives as text and is decoded first) and a JSON
//! request body (taken as-is). Both end in [`finish_bind`]: validate the
//! assembled payload, then produce the bound parameter map keyed by
//! internal field name in declaration order.

use serde_json::{Map, Value};

use crate::compiler::CompiledSchema;
use crate::error::{FieldError, ValidateError};
use crate::field::FieldKind;

/// Validate a payload against a compiled schema without binding it.
///
/// # Errors
///
/// Returns `ValidateError::Invalid` carrying every violation found, not
/// just the first.
pub fn validate(schema: &CompiledSchema, payload: &Value) -> Result<(), ValidateError> {
    let errors = collect_errors(schema, payload);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { errors })
    }
}

/// Bind query-string style key/value pairs.
///
/// Values are decoded before validation: pairs targeting an integer field
/// are parsed as integers, everything else stays a string. A value that
/// fails to decode is left as the raw string so the schema reports it with
/// the other violations. Repeated keys keep the last occurrence. Unknown
/// keys are carried through and rejected by the schema.
///
/// # Errors
///
/// Returns `ValidateError::Invalid` if the decoded payload does not
/// conform to the schema.
pub fn bind_pairs<I, K, V>(
    schema: &CompiledSchema,
    pairs: I,
) -> Result<Map<String, Value>, ValidateError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut assembled = Map::new();
    for (key, raw) in pairs {
        let key = key.as_ref();
        let decoded = decode_scalar(schema, key, raw.as_ref());
        assembled.insert(key.to_string(), decoded);
    }
    finish_bind(schema, Value::Object(assembled))
}

/// Bind a JSON request body.
///
/// The body is validated as-is; no decoding happens. Anything other than
/// an object is rejected before validation.
///
/// # Errors
///
/// Returns `ValidateError::Invalid` if the body is not an object or does
/// not conform to the schema.
pub fn bind_body(
    schema: &CompiledSchema,
    body: &Value,
) -> Result<Map<String, Value>, ValidateError> {
    if !body.is_object() {
        return Err(ValidateError::Invalid {
            errors: vec![FieldError {
                path: String::new(),
                message: format!("expected an object, got {}", json_type_name(body)),
            }],
        });
    }
    finish_bind(schema, body.clone())
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn decode_scalar(schema: &CompiledSchema, key: &str, raw: &str) -> Value {
    match schema.get_external(key).map(|f| f.kind) {
        Some(FieldKind::Integer) | Some(FieldKind::OptionalInteger) => raw
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        // Unknown keys stay strings; the schema rejects them by name.
        _ => Value::String(raw.to_string()),
    }
}

fn collect_errors(schema: &CompiledSchema, payload: &Value) -> Vec<FieldError> {
    let mut errors: Vec<FieldError> = schema
        .validator()
        .iter_errors(payload)
        .map(|e| FieldError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();
    errors.extend(comma_item_errors(schema, payload));
    errors
}

// Comma lists travel as strings, so item-count bounds cannot be schema
// keywords; they are enforced here by counting segments. An empty string
// counts as one empty segment, matching how the lists are later split.
fn comma_item_errors(schema: &CompiledSchema, payload: &Value) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for field in schema.fields() {
        if field.kind != FieldKind::CommaList {
            continue;
        }
        let Some(Value::String(raw)) = payload.get(field.external_name()) else {
            continue;
        };
        let count = raw.split(',').count() as u64;
        if let Some(min) = field.constraints.min_items {
            if count < min {
                errors.push(FieldError {
                    path: format!("/{}", field.external_name()),
                    message: format!(
                        "\"{raw}\" has {count} comma-separated item(s), expected at least {min}"
                    ),
                });
            }
        }
        if let Some(max) = field.constraints.max_items {
            if count > max {
                errors.push(FieldError {
                    path: format!("/{}", field.external_name()),
                    message: format!(
                        "\"{raw}\" has {count} comma-separated item(s), expected at most {max}"
                    ),
                });
            }
        }
    }
    errors
}

fn finish_bind(
    schema: &CompiledSchema,
    payload: Value,
) -> Result<Map<String, Value>, ValidateError> {
    let errors = collect_errors(schema, &payload);
    if !errors.is_empty() {
        return Err(ValidateError::Invalid { errors });
    }

    // Defaults fill omissions only: an explicit null was sent by the
    // client and stays null.
    let mut bound = Map::new();
    for field in schema.fields() {
        let value = match payload.get(field.external_name()) {
            Some(value) => value.clone(),
            None => match &field.default {
                Some(default) => default.produce(),
                None => Value::Null,
            },
        };
        bound.insert(field.name.clone(), value);
    }
    Ok(bound)
}
