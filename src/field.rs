//! Field declarations: wire kind, default, constraints, extension gate.
//!
//! A [`FieldSpec`] describes one request parameter the way an API author
//! declares it: an internal name, a wire kind, and optional alias, default,
//! numeric/length bounds, and the extension that must be enabled for the
//! field to exist at all. Specs are plain data; [`crate::compile`] turns a
//! set of them into a validating schema.

use serde_json::Value;

use crate::extensions::Extension;

/// Wire representation of a request field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Required string.
    String,
    /// String that may be omitted or null.
    OptionalString,
    /// Required integer.
    Integer,
    /// Integer that may be omitted or null.
    OptionalInteger,
    /// Comma-separated list carried as a single string, e.g. `"a,b,c"`.
    ///
    /// Always optional: the raw string is bound as-is and split later by
    /// the owning request shape.
    CommaList,
    /// JSON array of strings (body requests only). Optional.
    StringList,
    /// JSON array of numbers (body requests only). Optional.
    NumberList,
    /// Free-form JSON object (body requests only). Optional.
    Object,
}

impl FieldKind {
    /// Whether omission (or explicit null) is accepted.
    pub fn is_optional(&self) -> bool {
        !matches!(self, FieldKind::String | FieldKind::Integer)
    }

    /// Whether numeric range constraints (`gt`, `le`, ...) apply.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Integer | FieldKind::OptionalInteger | FieldKind::NumberList
        )
    }

    /// Whether string length and pattern constraints apply.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            FieldKind::String | FieldKind::OptionalString | FieldKind::CommaList
        )
    }

    /// Whether item count constraints apply.
    pub fn is_listy(&self) -> bool {
        matches!(
            self,
            FieldKind::CommaList | FieldKind::StringList | FieldKind::NumberList
        )
    }
}

/// Default for an omitted optional field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldDefault {
    /// A fixed value cloned into every request.
    Literal(Value),
    /// A producer invoked per request, for defaults that must be fresh
    /// (mutable containers, in particular).
    Factory(fn() -> Value),
}

impl FieldDefault {
    /// Produce the default value for one request.
    pub fn produce(&self) -> Value {
        match self {
            FieldDefault::Literal(value) => value.clone(),
            FieldDefault::Factory(factory) => factory(),
        }
    }
}

/// Validation constraints attached to a field.
///
/// Which members are honored depends on the field kind: numeric bounds on
/// integer and number-list kinds, length and pattern on textual kinds,
/// item counts on list kinds. [`crate::check`] flags mismatches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
    pub multiple_of: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub pattern: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Constraints::default()
    }
}

/// Declaration of one request field.
///
/// Built with `new` plus chained setters:
///
/// ```
/// use stac_params::{Extension, FieldKind, FieldSpec};
///
/// let limit = FieldSpec::new("limit", FieldKind::OptionalInteger)
///     .default_value(10.into())
///     .gt(0.0)
///     .le(10_000.0);
/// let sortby = FieldSpec::new("sortby", FieldKind::CommaList).requires(Extension::Sort);
///
/// assert!(limit.kind.is_optional());
/// assert_eq!(sortby.requires, Some(stac_params::Extension::Sort));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Internal name, used as the key in bound parameter maps.
    pub name: String,
    pub kind: FieldKind,
    /// Wire name, when it differs from the internal name.
    pub alias: Option<String>,
    /// Applied only when the field is omitted entirely.
    pub default: Option<FieldDefault>,
    pub constraints: Constraints,
    /// Extension that must be enabled for this field to be compiled in.
    pub requires: Option<Extension>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            alias: None,
            default: None,
            constraints: Constraints::default(),
            requires: None,
        }
    }

    /// Set the wire name clients use for this field.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Set a fixed default applied when the field is omitted.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(FieldDefault::Literal(value));
        self
    }

    /// Set a per-request default producer applied when the field is omitted.
    pub fn default_factory(mut self, factory: fn() -> Value) -> Self {
        self.default = Some(FieldDefault::Factory(factory));
        self
    }

    /// Gate this field behind an extension.
    pub fn requires(mut self, extension: Extension) -> Self {
        self.requires = Some(extension);
        self
    }

    pub fn gt(mut self, bound: f64) -> Self {
        self.constraints.gt = Some(bound);
        self
    }

    pub fn ge(mut self, bound: f64) -> Self {
        self.constraints.ge = Some(bound);
        self
    }

    pub fn lt(mut self, bound: f64) -> Self {
        self.constraints.lt = Some(bound);
        self
    }

    pub fn le(mut self, bound: f64) -> Self {
        self.constraints.le = Some(bound);
        self
    }

    pub fn multiple_of(mut self, step: f64) -> Self {
        self.constraints.multiple_of = Some(step);
        self
    }

    pub fn min_length(mut self, count: u64) -> Self {
        self.constraints.min_length = Some(count);
        self
    }

    pub fn max_length(mut self, count: u64) -> Self {
        self.constraints.max_length = Some(count);
        self
    }

    pub fn min_items(mut self, count: u64) -> Self {
        self.constraints.min_items = Some(count);
        self
    }

    pub fn max_items(mut self, count: u64) -> Self {
        self.constraints.max_items = Some(count);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.constraints.pattern = Some(pattern.into());
        self
    }

    /// Name clients use on the wire: the alias if set, else the internal name.
    pub fn external_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Whether a request missing this field must be rejected.
    ///
    /// A field with a default is never required: omission is exactly the
    /// case the default exists for.
    pub fn is_required(&self) -> bool {
        !self.kind.is_optional() && self.default.is_none()
    }
}
