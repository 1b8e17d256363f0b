//! STAC request parameters
//!
//! Extension-aware compilation of catalog API request schemas and
//! normalization of request parameters.
//!
//! A deployment declares which optional API extensions it enables; request
//! definitions declare their fields, some gated behind an extension.
//! Compiling a definition against the deployment's registry drops the
//! gated-off fields and produces a JSON Schema with a prebuilt validator,
//! so a disabled capability's parameters are rejected as unknown rather
//! than silently accepted. Validated input is bound into a parameter map
//! and lifted into typed request shapes whose argument maps feed catalog
//! backends.
//!
//! # Example
//!
//! ```
//! use stac_params::{bind_pairs, compile, search_query, DeploymentConfig, ExtensionRegistry};
//!
//! let config = DeploymentConfig {
//!     extensions: vec!["query".into(), "sort".into()],
//!     ..Default::default()
//! };
//! let registry = ExtensionRegistry::from_config(&config).unwrap();
//! let schema = compile(&search_query(), &registry).unwrap();
//!
//! // "sort" is enabled, so sortby exists; "fields" is not, so it doesn't
//! assert!(schema.get("sortby").is_some());
//! assert!(schema.get("fields").is_none());
//!
//! let bound = bind_pairs(&schema, [("collections", "naip,landsat"), ("limit", "50")]).unwrap();
//! assert_eq!(bound["limit"], 50);
//! ```
//!
//! # Comma lists
//!
//! List parameters travel comma-joined in query strings and stay unsplit
//! through binding; the typed shapes do the splitting, keeping omission
//! and emptiness distinguishable end to end:
//!
//! ```
//! use stac_params::SearchRequest;
//! use serde_json::json;
//!
//! let request = SearchRequest {
//!     collections: Some("naip,landsat".into()),
//!     ids: Some("".into()),
//!     ..Default::default()
//! };
//! let args = request.args();
//!
//! assert_eq!(args["collections"], json!(["naip", "landsat"]));
//! assert_eq!(args["ids"], json!(""));    // empty is not absent
//! assert_eq!(args["bbox"], json!(null)); // absent is null
//! ```

mod check;
mod compiler;
mod definition;
mod error;
mod extensions;
mod field;
mod loader;
mod shapes;
mod validator;

pub use check::{check, check_definition, CheckResult, Diagnostic, Severity};
pub use compiler::{compile, CompiledSchema};
pub use definition::RequestDefinition;
pub use error::{ConfigError, FieldError, LoadError, NormalizeError, ValidateError};
pub use extensions::{DeploymentConfig, Extension, ExtensionRegistry};
pub use field::{Constraints, FieldDefault, FieldKind, FieldSpec};
pub use loader::{load_config, load_json, load_json_str};
pub use shapes::{
    canonical_definitions, collection_path, credentials, empty_field_selection, item_path,
    items_query, search_body, search_query, ApiRequest, Args, CollectionRequest, Credentials,
    ItemRequest, ItemsRequest, SearchRequest, DEFAULT_LIMIT,
};
pub use validator::{bind_body, bind_pairs, json_type_name, validate};
