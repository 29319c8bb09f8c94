//! Input validation for MongoDB operations
//!
//! Collection names derived from repository types and identifiers passed as
//! strings are always checked. The server-side JavaScript guard over filters
//! and pipelines is opt-in through `RepositoryConfig::validate_queries`.

use bson::{oid::ObjectId, Bson, Document as BsonDocument};
use docbind_common::DocbindError;

use crate::Result;

/// Longest collection name accepted; the server allows more
const MAX_COLLECTION_NAME_LEN: usize = 120;

/// Collection name a repository binds to, checked before first use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCollectionName(String);

impl ValidatedCollectionName {
    /// # Errors
    /// Returns `Validation` naming the broken rule.
    pub fn new(name: &str) -> Result<Self> {
        match collection_name_problem(name) {
            Some(problem) => Err(DocbindError::Validation(format!(
                "Invalid collection name {:?}: {}",
                name, problem
            ))),
            None => Ok(Self(name.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ValidatedCollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn collection_name_problem(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("name is empty".to_string());
    }
    if name.len() > MAX_COLLECTION_NAME_LEN {
        return Some(format!("longer than {} bytes", MAX_COLLECTION_NAME_LEN));
    }
    if name.starts_with("system.") {
        return Some("'system.' is reserved".to_string());
    }
    name.chars()
        .find(|c| matches!(c, '$' | '\0'))
        .map(|c| format!("contains {:?}", c))
}

/// Parse a 24-character hex identifier into an ObjectId
///
/// # Errors
/// Returns `Validation` for anything that is not exactly 24 hex digits.
pub fn parse_object_id(id: &str) -> Result<ObjectId> {
    if id.len() != 24 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DocbindError::Validation(format!("Invalid ObjectId: '{}'", id)));
    }
    Ok(ObjectId::parse_str(id)?)
}

/// Operators that run JavaScript on the server
const DANGEROUS_OPERATORS: &[&str] = &[
    "$where",       // JavaScript execution
    "$function",    // JavaScript execution
    "$accumulator", // Custom JavaScript in aggregation
];

/// Validates a query value for dangerous operators, recursing into
/// nested documents and arrays
///
/// # Errors
/// Returns `Validation` naming the first dangerous operator found.
pub fn validate_query(query: &Bson) -> Result<()> {
    match query {
        Bson::Document(doc) => validate_document(doc),
        Bson::Array(arr) => arr.iter().try_for_each(validate_query),
        _ => Ok(()),
    }
}

/// [`validate_query`] over a filter document
pub fn validate_document(doc: &BsonDocument) -> Result<()> {
    for (key, value) in doc.iter() {
        if DANGEROUS_OPERATORS.contains(&key.as_str()) {
            return Err(DocbindError::Validation(format!(
                "Dangerous operator '{}' is not allowed for security reasons",
                key
            )));
        }
        validate_query(value)?;
    }
    Ok(())
}

/// [`validate_query`] over every stage of an aggregation pipeline
pub fn validate_pipeline(pipeline: &[BsonDocument]) -> Result<()> {
    pipeline.iter().try_for_each(validate_document)
}
