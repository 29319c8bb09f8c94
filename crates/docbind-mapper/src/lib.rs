//! Docbind Mapper
//!
//! Maps raw BSON documents onto typed entities. Each entity declares its
//! fields with type annotations (`string`, `integer[]`, `@var Address`,
//! `Child[]`); the mapper coerces every document field to its declared type
//! and builds nested entities recursively.
//!
//! Schema problems (a field without an annotation, an annotation naming an
//! unregistered entity) are errors. Data problems never are: a value that
//! cannot be coerced leaves the field `Null`.
//!
//! # Example
//!
//! ```rust
//! use bson::doc;
//! use docbind_mapper::{Entity, EntityRegistry, FieldDecl, Mapper, Record, Result};
//! use std::sync::Arc;
//!
//! struct Point {
//!     x: Option<i64>,
//!     label: Option<String>,
//! }
//!
//! impl Entity for Point {
//!     const FIELDS: &'static [FieldDecl] = &[
//!         FieldDecl::new("x", "integer"),
//!         FieldDecl::new("label", "@var string"),
//!     ];
//!
//!     fn from_record(mut record: Record) -> Result<Self> {
//!         Ok(Self {
//!             x: record.take("x")?,
//!             label: record.take("label")?,
//!         })
//!     }
//! }
//!
//! let registry = Arc::new(EntityRegistry::new());
//! registry.register::<Point>().unwrap();
//!
//! let mapper = Mapper::new(registry);
//! let point: Point = mapper.map(Some(&doc! { "x": "12", "label": 7 })).unwrap();
//! assert_eq!(point.x, Some(12));
//! assert_eq!(point.label.as_deref(), Some("7"));
//! ```

pub mod coercion;
pub mod entity;
pub mod mapper;
pub mod record;
pub mod registry;
pub mod schema;
pub mod types;

pub use coercion::{coerce_scalar, Coercion};
pub use entity::{short_type_name, Entity};
pub use mapper::{MapOptions, Mapper, ID_FIELD, MAX_ENTITY_DEPTH, OBJECT_ID_KEY};
pub use record::{FromValue, Many, Record};
pub use registry::{global_registry, EntityRegistry};
pub use schema::{parse_annotation, EntitySchema, FieldDecl, FieldSchema};
pub use types::{ScalarKind, TypeDescriptor, TypeKind, Value};

pub use docbind_common::{DocbindError, Result};
