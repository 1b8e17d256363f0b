//! Schema compilation - turns a request definition into a validating schema.
//!
//! Compilation happens once per deployment, after the extension registry is
//! built. Gated fields whose extension is disabled are dropped entirely, so
//! a disabled capability's parameters are indistinguishable from parameters
//! that never existed: the compiled schema rejects them as unknown.

use std::fmt;

use serde_json::{json, Map, Value};

use crate::definition::RequestDefinition;
use crate::error::ConfigError;
use crate::extensions::ExtensionRegistry;
use crate::field::{Constraints, FieldKind, FieldSpec};

/// A request definition compiled against one extension registry.
///
/// Holds the surviving field declarations (declaration order preserved),
/// the rendered JSON Schema document, and a prebuilt validator. Immutable
/// after compilation; share it freely across threads.
pub struct CompiledSchema {
    name: String,
    fields: Vec<FieldSpec>,
    schema: Value,
    validator: jsonschema::Validator,
}

impl CompiledSchema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Surviving field declarations, in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Look up a surviving field by internal name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a surviving field by wire name.
    pub fn get_external(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.external_name() == name)
    }

    /// The rendered JSON Schema document.
    pub fn as_json_schema(&self) -> &Value {
        &self.schema
    }

    pub(crate) fn validator(&self) -> &jsonschema::Validator {
        &self.validator
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("name", &self.name)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

/// Compile a request definition against an extension registry.
///
/// Fields gated behind a disabled extension are dropped. The remaining
/// fields are rendered into a JSON Schema object keyed by wire name, with
/// `additionalProperties: false` so unknown parameters are rejected.
///
/// # Errors
///
/// Returns `ConfigError` if the surviving fields contain duplicate internal
/// names or colliding wire names, if the rendered schema fails to build
/// (e.g. an invalid `pattern` regex), or if a field default does not
/// satisfy that field's own constraints.
pub fn compile(
    definition: &RequestDefinition,
    registry: &ExtensionRegistry,
) -> Result<CompiledSchema, ConfigError> {
    let fields: Vec<FieldSpec> = definition
        .fields
        .iter()
        .filter(|f| f.requires.map_or(true, |ext| registry.is_enabled(ext)))
        .cloned()
        .collect();

    // Uniqueness is checked over the surviving set: gated-out fields are
    // gone before they can collide with anything.
    let mut internal_names = std::collections::HashSet::new();
    for field in &fields {
        if !internal_names.insert(field.name.as_str()) {
            return Err(ConfigError::DuplicateField {
                definition: definition.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    let mut wire_names = std::collections::HashSet::new();
    for field in &fields {
        if !wire_names.insert(field.external_name()) {
            return Err(ConfigError::AliasCollision {
                definition: definition.name.clone(),
                field: field.name.clone(),
                alias: field.external_name().to_string(),
            });
        }
    }

    let schema = render_schema(&definition.name, &fields);
    let validator =
        jsonschema::validator_for(&schema).map_err(|e| ConfigError::InvalidSchema {
            definition: definition.name.clone(),
            message: e.to_string(),
        })?;

    // Defaults are injected after validation at request time, so they must
    // be proved conformant here or invalid values would leak through.
    for field in &fields {
        if let Some(default) = &field.default {
            let probe = jsonschema::validator_for(&render_field_schema(field)).map_err(|e| {
                ConfigError::InvalidSchema {
                    definition: definition.name.clone(),
                    message: e.to_string(),
                }
            })?;
            if !probe.is_valid(&default.produce()) {
                return Err(ConfigError::InvalidDefault {
                    definition: definition.name.clone(),
                    field: field.name.clone(),
                });
            }
        }
    }

    Ok(CompiledSchema {
        name: definition.name.clone(),
        fields,
        schema,
        validator,
    })
}

fn render_schema(name: &str, fields: &[FieldSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();

    for field in fields {
        properties.insert(field.external_name().to_string(), render_field_schema(field));
        if field.is_required() {
            required.push(Value::String(field.external_name().to_string()));
        }
    }

    let mut schema = Map::new();
    schema.insert(
        "$schema".to_string(),
        json!("https://json-schema.org/draft/2020-12/schema"),
    );
    schema.insert("title".to_string(), json!(name));
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    schema.insert("additionalProperties".to_string(), json!(false));

    Value::Object(schema)
}

/// Render the schema for a single field.
///
/// Optional kinds accept null alongside their base type; constraint
/// keywords only fire on instances of the applicable type, so null always
/// passes them. Item-count bounds on comma lists are not rendered here:
/// the wire form is a string, and the binder enforces them by counting
/// segments.
pub(crate) fn render_field_schema(field: &FieldSpec) -> Value {
    let mut out = Map::new();

    match field.kind {
        FieldKind::String => {
            out.insert("type".to_string(), json!("string"));
        }
        FieldKind::OptionalString | FieldKind::CommaList => {
            out.insert("type".to_string(), json!(["string", "null"]));
        }
        FieldKind::Integer => {
            out.insert("type".to_string(), json!("integer"));
        }
        FieldKind::OptionalInteger => {
            out.insert("type".to_string(), json!(["integer", "null"]));
        }
        FieldKind::StringList => {
            out.insert("type".to_string(), json!(["array", "null"]));
            out.insert("items".to_string(), json!({ "type": "string" }));
        }
        FieldKind::NumberList => {
            out.insert("type".to_string(), json!(["array", "null"]));
            let mut items = Map::new();
            items.insert("type".to_string(), json!("number"));
            apply_numeric(&mut items, &field.constraints);
            out.insert("items".to_string(), Value::Object(items));
        }
        FieldKind::Object => {
            out.insert("type".to_string(), json!(["object", "null"]));
        }
    }

    // Range bounds constrain the integer itself, or each element of a
    // number list (handled above).
    if matches!(field.kind, FieldKind::Integer | FieldKind::OptionalInteger) {
        apply_numeric(&mut out, &field.constraints);
    }

    if field.kind.is_textual() {
        if let Some(n) = field.constraints.min_length {
            out.insert("minLength".to_string(), json!(n));
        }
        if let Some(n) = field.constraints.max_length {
            out.insert("maxLength".to_string(), json!(n));
        }
        if let Some(pattern) = &field.constraints.pattern {
            out.insert("pattern".to_string(), json!(pattern));
        }
    }

    if matches!(field.kind, FieldKind::StringList | FieldKind::NumberList) {
        if let Some(n) = field.constraints.min_items {
            out.insert("minItems".to_string(), json!(n));
        }
        if let Some(n) = field.constraints.max_items {
            out.insert("maxItems".to_string(), json!(n));
        }
    }

    if let Some(default) = &field.default {
        out.insert("default".to_string(), default.produce());
    }

    Value::Object(out)
}

fn apply_numeric(target: &mut Map<String, Value>, constraints: &Constraints) {
    if let Some(bound) = constraints.gt {
        target.insert("exclusiveMinimum".to_string(), json!(bound));
    }
    if let Some(bound) = constraints.ge {
        target.insert("minimum".to_string(), json!(bound));
    }
    if let Some(bound) = constraints.lt {
        target.insert("exclusiveMaximum".to_string(), json!(bound));
    }
    if let Some(bound) = constraints.le {
        target.insert("maximum".to_string(), json!(bound));
    }
    if let Some(step) = constraints.multiple_of {
        target.insert("multipleOf".to_string(), json!(step));
    }
}
