//! Request definitions: a named, ordered set of field declarations.

use crate::field::FieldSpec;

/// One request surface (e.g. item search, collection lookup) as declared
/// by an API author.
///
/// Field order is meaningful: compiled schemas list properties and bound
/// parameter maps list entries in declaration order. Duplicate names and
/// alias collisions are legal here and rejected by [`crate::compile`],
/// which is where the gated field set becomes known.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDefinition {
    pub name: String,
    pub fields: Vec<FieldSpec>,
}

impl RequestDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field declaration.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Look up a declaration by internal name.
    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldKind;

    #[test]
    fn fields_keep_declaration_order() {
        let definition = RequestDefinition::new("search")
            .field(FieldSpec::new("collections", FieldKind::CommaList))
            .field(FieldSpec::new("ids", FieldKind::CommaList))
            .field(FieldSpec::new("limit", FieldKind::OptionalInteger));

        let names: Vec<&str> = definition.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["collections", "ids", "limit"]);
    }

    #[test]
    fn get_finds_by_internal_name() {
        let definition = RequestDefinition::new("item")
            .field(FieldSpec::new("collection_id", FieldKind::String).alias("collectionId"));

        assert!(definition.get("collection_id").is_some());
        assert!(definition.get("collectionId").is_none());
        assert!(definition.get("item_id").is_none());
    }
}
