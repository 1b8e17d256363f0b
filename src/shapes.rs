//! Canonical request definitions and their typed shapes.
//!
//! The definitions here describe the API's request surfaces as data:
//! path parameters for collection and item lookup, the paged listing
//! query, the search query (GET) and search body (POST), and a login
//! payload. The shape structs put typed fields over the bound parameter
//! maps and produce the argument maps handed to catalog backends.
//!
//! Everything in this module is pure: shapes borrow nothing, and every
//! `args()` call builds a fresh map.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::definition::RequestDefinition;
use crate::error::NormalizeError;
use crate::extensions::Extension;
use crate::field::{FieldKind, FieldSpec};
use crate::validator::json_type_name;

/// Argument map handed to a catalog backend.
pub type Args = Map<String, Value>;

/// Page size applied when a request does not set one.
pub const DEFAULT_LIMIT: i64 = 10;

/// Empty field selection, produced fresh for every request that omits one.
pub fn empty_field_selection() -> Value {
    json!({ "include": [], "exclude": [] })
}

/// Path parameters for a collection lookup.
pub fn collection_path() -> RequestDefinition {
    RequestDefinition::new("collection")
        .field(FieldSpec::new("collection_id", FieldKind::String).alias("collectionId"))
}

/// Path parameters for an item lookup.
pub fn item_path() -> RequestDefinition {
    RequestDefinition::new("item")
        .field(FieldSpec::new("collection_id", FieldKind::String).alias("collectionId"))
        .field(FieldSpec::new("item_id", FieldKind::String).alias("itemId"))
}

/// Parameters for listing a collection's items, with paging.
pub fn items_query() -> RequestDefinition {
    RequestDefinition::new("items")
        .field(FieldSpec::new("collection_id", FieldKind::String).alias("collectionId"))
        .field(
            FieldSpec::new("limit", FieldKind::Integer)
                .default_value(json!(DEFAULT_LIMIT))
                .gt(0.0)
                .le(10_000.0),
        )
        .field(FieldSpec::new("token", FieldKind::OptionalString))
}

/// Query-string parameters for item search.
///
/// List parameters travel comma-joined in single values; `query`, `fields`
/// and `sortby` exist only when their extension is enabled.
pub fn search_query() -> RequestDefinition {
    RequestDefinition::new("search")
        .field(FieldSpec::new("collections", FieldKind::CommaList))
        .field(FieldSpec::new("ids", FieldKind::CommaList))
        .field(
            FieldSpec::new("bbox", FieldKind::CommaList)
                .min_items(4)
                .max_items(6),
        )
        .field(FieldSpec::new("datetime", FieldKind::OptionalString))
        .field(
            FieldSpec::new("limit", FieldKind::OptionalInteger)
                .default_value(json!(DEFAULT_LIMIT))
                .gt(0.0)
                .le(10_000.0),
        )
        .field(FieldSpec::new("query", FieldKind::OptionalString).requires(Extension::Query))
        .field(FieldSpec::new("token", FieldKind::OptionalString))
        .field(FieldSpec::new("fields", FieldKind::CommaList).requires(Extension::Fields))
        .field(FieldSpec::new("sortby", FieldKind::CommaList).requires(Extension::Sort))
}

/// Body parameters for item search.
///
/// The same surface as [`search_query`] in its structured form: lists are
/// real arrays, `query` is an object, and the field selection defaults to
/// a fresh empty include/exclude pair.
pub fn search_body() -> RequestDefinition {
    RequestDefinition::new("search_body")
        .field(FieldSpec::new("collections", FieldKind::StringList))
        .field(FieldSpec::new("ids", FieldKind::StringList))
        .field(
            FieldSpec::new("bbox", FieldKind::NumberList)
                .min_items(4)
                .max_items(6),
        )
        .field(FieldSpec::new("datetime", FieldKind::OptionalString))
        .field(
            FieldSpec::new("limit", FieldKind::OptionalInteger)
                .default_value(json!(DEFAULT_LIMIT))
                .gt(0.0)
                .le(10_000.0),
        )
        .field(FieldSpec::new("query", FieldKind::Object).requires(Extension::Query))
        .field(FieldSpec::new("sortby", FieldKind::StringList).requires(Extension::Sort))
        .field(
            FieldSpec::new("field", FieldKind::Object)
                .alias("fields")
                .default_factory(empty_field_selection)
                .requires(Extension::Fields),
        )
}

/// Login payload.
pub fn credentials() -> RequestDefinition {
    RequestDefinition::new("credentials")
        .field(FieldSpec::new("username", FieldKind::String))
        .field(FieldSpec::new("password", FieldKind::String))
}

/// All canonical definitions, for startup checking and the CLI.
pub fn canonical_definitions() -> Vec<RequestDefinition> {
    vec![
        collection_path(),
        item_path(),
        items_query(),
        search_query(),
        search_body(),
        credentials(),
    ]
}

/// A collection lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionRequest {
    pub collection_id: String,
}

impl CollectionRequest {
    pub fn from_bound(bound: &Map<String, Value>) -> Result<Self, NormalizeError> {
        Ok(Self {
            collection_id: required_str(bound, "collection_id")?,
        })
    }

    pub fn args(&self) -> Args {
        let mut args = Args::new();
        args.insert("id".to_string(), Value::String(self.collection_id.clone()));
        args
    }
}

/// An item lookup.
///
/// `args` carries the item id as `id`; the parent collection stays on the
/// struct for callers that need it but does not compete for the `id` key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRequest {
    pub collection_id: String,
    pub item_id: String,
}

impl ItemRequest {
    pub fn from_bound(bound: &Map<String, Value>) -> Result<Self, NormalizeError> {
        Ok(Self {
            collection_id: required_str(bound, "collection_id")?,
            item_id: required_str(bound, "item_id")?,
        })
    }

    pub fn args(&self) -> Args {
        let mut args = Args::new();
        args.insert("id".to_string(), Value::String(self.item_id.clone()));
        args
    }
}

/// A paged listing of one collection's items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemsRequest {
    pub collection_id: String,
    pub limit: i64,
    pub token: Option<String>,
}

impl ItemsRequest {
    pub fn from_bound(bound: &Map<String, Value>) -> Result<Self, NormalizeError> {
        Ok(Self {
            collection_id: required_str(bound, "collection_id")?,
            limit: required_i64(bound, "limit")?,
            token: optional_str(bound, "token")?,
        })
    }

    pub fn args(&self) -> Args {
        let mut args = Args::new();
        args.insert("id".to_string(), Value::String(self.collection_id.clone()));
        args.insert("limit".to_string(), Value::from(self.limit));
        args.insert("token".to_string(), opt_string(&self.token));
        args
    }
}

/// A search request in its raw query-string form.
///
/// Fields hold the wire values unsplit; [`SearchRequest::args`] performs
/// the comma splitting. Omission and emptiness stay distinguishable all
/// the way through: an absent list is `null` in the argument map, an empty
/// string stays `""`, and only non-empty strings split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub collections: Option<String>,
    pub ids: Option<String>,
    pub bbox: Option<String>,
    pub datetime: Option<String>,
    pub limit: Option<i64>,
    pub query: Option<String>,
    pub token: Option<String>,
    pub fields: Option<String>,
    pub sortby: Option<String>,
}

impl Default for SearchRequest {
    fn default() -> Self {
        Self {
            collections: None,
            ids: None,
            bbox: None,
            datetime: None,
            limit: Some(DEFAULT_LIMIT),
            query: None,
            token: None,
            fields: None,
            sortby: None,
        }
    }
}

impl SearchRequest {
    pub fn from_bound(bound: &Map<String, Value>) -> Result<Self, NormalizeError> {
        Ok(Self {
            collections: optional_str(bound, "collections")?,
            ids: optional_str(bound, "ids")?,
            bbox: optional_str(bound, "bbox")?,
            datetime: optional_str(bound, "datetime")?,
            limit: optional_i64(bound, "limit")?,
            query: optional_str(bound, "query")?,
            token: optional_str(bound, "token")?,
            fields: optional_str(bound, "fields")?,
            sortby: optional_str(bound, "sortby")?,
        })
    }

    pub fn args(&self) -> Args {
        let mut args = Args::new();
        args.insert("collections".to_string(), split_list(&self.collections));
        args.insert("ids".to_string(), split_list(&self.ids));
        args.insert("bbox".to_string(), split_list(&self.bbox));
        args.insert("datetime".to_string(), opt_string(&self.datetime));
        args.insert(
            "limit".to_string(),
            self.limit.map_or(Value::Null, Value::from),
        );
        args.insert("query".to_string(), opt_string(&self.query));
        args.insert("token".to_string(), opt_string(&self.token));
        args.insert("fields".to_string(), split_list(&self.fields));
        args.insert("sortby".to_string(), split_list(&self.sortby));
        args
    }
}

/// Any of the typed request shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiRequest {
    Collection(CollectionRequest),
    Item(ItemRequest),
    Items(ItemsRequest),
    Search(SearchRequest),
}

impl ApiRequest {
    pub fn args(&self) -> Args {
        match self {
            ApiRequest::Collection(r) => r.args(),
            ApiRequest::Item(r) => r.args(),
            ApiRequest::Items(r) => r.args(),
            ApiRequest::Search(r) => r.args(),
        }
    }
}

/// A login payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn from_bound(bound: &Map<String, Value>) -> Result<Self, NormalizeError> {
        Ok(Self {
            username: required_str(bound, "username")?,
            password: required_str(bound, "password")?,
        })
    }
}

// Comma splitting preserves empty segments; splitting "" would yield one
// empty segment, so the empty string is passed through instead of split.
fn split_list(raw: &Option<String>) -> Value {
    match raw.as_deref() {
        None => Value::Null,
        Some("") => Value::String(String::new()),
        Some(joined) => Value::Array(
            joined
                .split(',')
                .map(|part| Value::String(part.to_string()))
                .collect(),
        ),
    }
}

fn opt_string(value: &Option<String>) -> Value {
    match value {
        Some(s) => Value::String(s.clone()),
        None => Value::Null,
    }
}

fn required_str(bound: &Map<String, Value>, field: &'static str) -> Result<String, NormalizeError> {
    match bound.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(NormalizeError::UnexpectedShape {
            field,
            expected: "string",
            actual: json_type_name(other).to_string(),
        }),
        None => Err(NormalizeError::MissingField { field }),
    }
}

// Optional fields gated out of a narrower deployment are missing from the
// bound map entirely; they read as absent.
fn optional_str(
    bound: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, NormalizeError> {
    match bound.get(field) {
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(NormalizeError::UnexpectedShape {
            field,
            expected: "string or null",
            actual: json_type_name(other).to_string(),
        }),
    }
}

fn required_i64(bound: &Map<String, Value>, field: &'static str) -> Result<i64, NormalizeError> {
    match bound.get(field) {
        Some(Value::Number(n)) => n.as_i64().ok_or(NormalizeError::UnexpectedShape {
            field,
            expected: "integer",
            actual: "number".to_string(),
        }),
        Some(other) => Err(NormalizeError::UnexpectedShape {
            field,
            expected: "integer",
            actual: json_type_name(other).to_string(),
        }),
        None => Err(NormalizeError::MissingField { field }),
    }
}

fn optional_i64(
    bound: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<i64>, NormalizeError> {
    match bound.get(field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or(NormalizeError::UnexpectedShape {
                field,
                expected: "integer or null",
                actual: "number".to_string(),
            }),
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(NormalizeError::UnexpectedShape {
            field,
            expected: "integer or null",
            actual: json_type_name(other).to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::extensions::ExtensionRegistry;
    use crate::validator::{bind_body, bind_pairs};

    #[test]
    fn collection_args_rename_to_id() {
        let request = CollectionRequest {
            collection_id: "landsat".into(),
        };
        let args = request.args();
        assert_eq!(args["id"], json!("landsat"));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn item_args_use_item_id() {
        let request = ItemRequest {
            collection_id: "landsat".into(),
            item_id: "abc123".into(),
        };
        let args = request.args();
        assert_eq!(args["id"], json!("abc123"));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn items_args_carry_paging() {
        let request = ItemsRequest {
            collection_id: "landsat".into(),
            limit: 10,
            token: None,
        };
        let args = request.args();
        assert_eq!(args["id"], json!("landsat"));
        assert_eq!(args["limit"], json!(10));
        assert_eq!(args["token"], Value::Null);
    }

    #[test]
    fn search_args_split_comma_lists() {
        let request = SearchRequest {
            collections: Some("naip,landsat".into()),
            ..Default::default()
        };
        let args = request.args();
        assert_eq!(args["collections"], json!(["naip", "landsat"]));
        assert_eq!(args["limit"], json!(10));
    }

    #[test]
    fn search_args_distinguish_absent_from_empty() {
        let request = SearchRequest {
            ids: Some(String::new()),
            ..Default::default()
        };
        let args = request.args();
        assert_eq!(args["ids"], json!(""));
        assert_eq!(args["collections"], Value::Null);
    }

    #[test]
    fn search_args_preserve_empty_segments() {
        let request = SearchRequest {
            ids: Some("a,,b".into()),
            ..Default::default()
        };
        assert_eq!(request.args()["ids"], json!(["a", "", "b"]));
    }

    #[test]
    fn search_args_key_order_is_stable() {
        let keys: Vec<String> = SearchRequest::default().args().keys().cloned().collect();
        assert_eq!(
            keys,
            [
                "collections",
                "ids",
                "bbox",
                "datetime",
                "limit",
                "query",
                "token",
                "fields",
                "sortby"
            ]
        );
    }

    #[test]
    fn search_default_has_default_limit() {
        let request = SearchRequest::default();
        assert_eq!(request.limit, Some(DEFAULT_LIMIT));
        assert!(request.collections.is_none());
    }

    #[test]
    fn canonical_definitions_all_compile() {
        let registry = ExtensionRegistry::with_all_extensions();
        for definition in canonical_definitions() {
            compile(&definition, &registry).unwrap();
        }
    }

    #[test]
    fn search_from_bound_round_trip() {
        let registry = ExtensionRegistry::with_all_extensions();
        let schema = compile(&search_query(), &registry).unwrap();
        let bound = bind_pairs(&schema, [("collections", "naip,landsat"), ("limit", "50")]).unwrap();

        let request = SearchRequest::from_bound(&bound).unwrap();
        assert_eq!(request.collections.as_deref(), Some("naip,landsat"));
        assert_eq!(request.limit, Some(50));
        assert!(request.bbox.is_none());
    }

    #[test]
    fn search_from_bound_reads_gated_out_fields_as_absent() {
        let schema = compile(&search_query(), &ExtensionRegistry::empty()).unwrap();
        let bound = bind_pairs(&schema, [("collections", "naip")]).unwrap();
        assert!(!bound.contains_key("sortby"));

        let request = SearchRequest::from_bound(&bound).unwrap();
        assert!(request.sortby.is_none());
        assert!(request.query.is_none());
        assert!(request.fields.is_none());
    }

    #[test]
    fn item_from_bound_reads_internal_names() {
        let schema = compile(&item_path(), &ExtensionRegistry::empty()).unwrap();
        let bound =
            bind_pairs(&schema, [("collectionId", "landsat"), ("itemId", "abc123")]).unwrap();

        let request = ItemRequest::from_bound(&bound).unwrap();
        assert_eq!(request.collection_id, "landsat");
        assert_eq!(request.item_id, "abc123");
    }

    #[test]
    fn from_bound_rejects_missing_field() {
        let bound = Map::new();
        let result = CollectionRequest::from_bound(&bound);
        assert!(matches!(
            result,
            Err(NormalizeError::MissingField { field: "collection_id" })
        ));
    }

    #[test]
    fn from_bound_rejects_wrong_shape() {
        let mut bound = Map::new();
        bound.insert("collection_id".to_string(), json!(42));
        let result = CollectionRequest::from_bound(&bound);
        assert!(matches!(
            result,
            Err(NormalizeError::UnexpectedShape { field: "collection_id", .. })
        ));
    }

    #[test]
    fn search_body_field_selection_defaults_fresh() {
        let registry = ExtensionRegistry::with_all_extensions();
        let schema = compile(&search_body(), &registry).unwrap();

        let first = bind_body(&schema, &json!({})).unwrap();
        let second = bind_body(&schema, &json!({})).unwrap();
        assert_eq!(first["field"], empty_field_selection());
        assert_eq!(first["field"], second["field"]);
    }

    #[test]
    fn search_body_bbox_is_numeric() {
        let registry = ExtensionRegistry::with_all_extensions();
        let schema = compile(&search_body(), &registry).unwrap();

        assert!(bind_body(&schema, &json!({ "bbox": [0.0, 0.0, 1.0, 1.0] })).is_ok());
        assert!(bind_body(&schema, &json!({ "bbox": ["0", "0", "1", "1"] })).is_err());
        assert!(bind_body(&schema, &json!({ "bbox": [0.0, 1.0] })).is_err());
    }

    #[test]
    fn credentials_from_bound() {
        let schema = compile(&credentials(), &ExtensionRegistry::empty()).unwrap();
        let bound = bind_body(&schema, &json!({ "username": "kirk", "password": "enterprise" }))
            .unwrap();

        let login = Credentials::from_bound(&bound).unwrap();
        assert_eq!(login.username, "kirk");
        assert_eq!(login.password, "enterprise");
    }

    #[test]
    fn api_request_dispatches_args() {
        let request = ApiRequest::Item(ItemRequest {
            collection_id: "landsat".into(),
            item_id: "abc123".into(),
        });
        assert_eq!(request.args()["id"], json!("abc123"));
    }
}
