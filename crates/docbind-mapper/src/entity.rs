//! Entity trait implemented by user record types
//!
//! # Example
//!
//! ```ignore
//! use docbind_mapper::{Entity, FieldDecl, Record, Result};
//!
//! struct User {
//!     id: Option<String>,
//!     name: Option<String>,
//!     age: Option<i64>,
//! }
//!
//! impl Entity for User {
//!     const FIELDS: &'static [FieldDecl] = &[
//!         FieldDecl::new("id", "string"),
//!         FieldDecl::new("name", "@var string"),
//!         FieldDecl::new("age", "@var integer"),
//!     ];
//!
//!     fn from_record(mut record: Record) -> Result<Self> {
//!         Ok(Self {
//!             id: record.take("id")?,
//!             name: record.take("name")?,
//!             age: record.take("age")?,
//!         })
//!     }
//! }
//! ```

use docbind_common::Result;

use crate::record::Record;
use crate::schema::{EntitySchema, FieldDecl};

/// A typed entity mapped from documents
pub trait Entity: Sized + Send + 'static {
    /// Name used in annotations and as the registry key
    ///
    /// Defaults to the type's short name (`app::model::User` -> `User`).
    fn entity_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Declared fields, in mapping order
    const FIELDS: &'static [FieldDecl];

    /// Build the entity from a mapped record
    fn from_record(record: Record) -> Result<Self>;

    /// Parse the declared fields into a schema
    fn schema() -> Result<EntitySchema> {
        EntitySchema::build(Self::entity_name(), Self::FIELDS)
    }
}

/// Last path segment of a type name, without generic arguments
pub fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
