//! Entity schemas built from field declarations
//!
//! An entity declares its fields once as a static table of [`FieldDecl`]s.
//! Each annotation is parsed into a [`TypeDescriptor`] when the schema is
//! built, so mapping never re-parses annotations per document.
//!
//! Accepted annotation shapes:
//! - `type` / `type[]`
//! - `@var type` / `@var type[]`, optionally surrounded by other doc text

use docbind_common::{DocbindError, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::TypeDescriptor;

/// `@var` tag anywhere in a doc-comment style annotation
static VAR_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@var\s+(?P<type>[^\[\]\s]+)(?P<array>\[\])?").expect("valid @var regex")
});

/// Bare `type` or `type[]`
static BARE_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<type>[^\[\]\s]+)(?P<array>\[\])?$").expect("valid type regex")
});

/// Static declaration of one entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    pub name: &'static str,
    pub annotation: Option<&'static str>,
}

impl FieldDecl {
    pub const fn new(name: &'static str, annotation: &'static str) -> Self {
        Self {
            name,
            annotation: Some(annotation),
        }
    }

    /// A field without annotation. Building a schema from it fails.
    pub const fn untyped(name: &'static str) -> Self {
        Self {
            name,
            annotation: None,
        }
    }
}

/// Parse a field annotation into a type descriptor
///
/// Returns `None` when the annotation carries no recognizable type.
pub fn parse_annotation(annotation: &str) -> Option<TypeDescriptor> {
    let trimmed = annotation.trim();
    let captures = if trimmed.contains("@var") {
        VAR_TAG_RE.captures(trimmed)?
    } else {
        BARE_TYPE_RE.captures(trimmed)?
    };
    let type_name = captures.name("type")?.as_str();
    let is_array = captures.name("array").is_some();
    Some(TypeDescriptor::from_type_name(type_name, is_array))
}

/// One parsed entity field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub descriptor: TypeDescriptor,
}

/// Ordered field list of one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySchema {
    name: String,
    fields: Vec<FieldSchema>,
}

impl EntitySchema {
    /// Build a schema from field declarations
    ///
    /// # Errors
    /// Returns `MissingAnnotation` naming the first field whose annotation is
    /// absent or unparseable.
    pub fn build(name: &str, decls: &[FieldDecl]) -> Result<Self> {
        let mut fields = Vec::with_capacity(decls.len());
        for decl in decls {
            let descriptor = decl
                .annotation
                .and_then(parse_annotation)
                .ok_or_else(|| DocbindError::MissingAnnotation {
                    entity: name.to_string(),
                    field: decl.name.to_string(),
                })?;
            fields.push(FieldSchema {
                name: decl.name.to_string(),
                descriptor,
            });
        }

        Ok(Self {
            name: name.to_string(),
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn declares(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ScalarKind, TypeKind};

    #[test]
    fn test_parse_bare_annotation() {
        let desc = parse_annotation("integer").unwrap();
        assert_eq!(desc.kind, TypeKind::Scalar(ScalarKind::Integer));
        assert!(!desc.is_array);

        let desc = parse_annotation("string[]").unwrap();
        assert_eq!(desc.kind, TypeKind::Scalar(ScalarKind::String));
        assert!(desc.is_array);
    }

    #[test]
    fn test_parse_var_annotation() {
        let desc = parse_annotation("@var Address[]").unwrap();
        assert_eq!(desc.kind, TypeKind::Entity("Address".to_string()));
        assert!(desc.is_array);

        let desc = parse_annotation("The owner's age. @var int").unwrap();
        assert_eq!(desc.kind, TypeKind::Scalar(ScalarKind::Integer));
    }

    #[test]
    fn test_parse_invalid_annotation() {
        assert!(parse_annotation("").is_none());
        assert!(parse_annotation("   ").is_none());
        assert!(parse_annotation("@var").is_none());
        assert!(parse_annotation("two words").is_none());
        assert!(parse_annotation("[]").is_none());
    }

    #[test]
    fn test_build_schema_keeps_order() {
        let schema = EntitySchema::build(
            "User",
            &[
                FieldDecl::new("id", "string"),
                FieldDecl::new("name", "@var string"),
                FieldDecl::new("tags", "string[]"),
            ],
        )
        .unwrap();

        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name", "tags"]);
        assert!(schema.declares("tags"));
        assert!(!schema.declares("email"));
    }

    #[test]
    fn test_build_schema_missing_annotation() {
        let err = EntitySchema::build(
            "User",
            &[FieldDecl::new("name", "string"), FieldDecl::untyped("email")],
        )
        .unwrap_err();

        match err {
            DocbindError::MissingAnnotation { entity, field } => {
                assert_eq!(entity, "User");
                assert_eq!(field, "email");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_build_schema_unparseable_annotation() {
        let err = EntitySchema::build("User", &[FieldDecl::new("email", "@var")]).unwrap_err();
        assert!(matches!(err, DocbindError::MissingAnnotation { ref field, .. } if field == "email"));
    }
}
