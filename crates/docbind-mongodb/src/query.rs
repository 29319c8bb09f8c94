//! Filter and sort state accumulated by fluent repository calls

use bson::{Bson, Document as BsonDocument};

/// Sort direction for `order_by`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// MongoDB sort value (`1` / `-1`)
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }

    /// Parse `"asc"` / `"desc"` (case-insensitive)
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Ascending),
            "desc" | "descending" => Some(SortDirection::Descending),
            _ => None,
        }
    }
}

impl From<SortDirection> for Bson {
    fn from(direction: SortDirection) -> Self {
        Bson::Int32(direction.as_i32())
    }
}

/// Filter and sort accumulated across calls
///
/// Both merge the same way: a key added later never replaces a key that is
/// already present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    filter: BsonDocument,
    sort: BsonDocument,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge filter keys; existing keys are kept
    pub fn filter(mut self, filter: BsonDocument) -> Self {
        self.merge_filter(filter);
        self
    }

    /// Add a sort key; an existing key keeps its direction
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.merge_sort(field, direction);
        self
    }

    pub fn merge_filter(&mut self, filter: BsonDocument) {
        merge_missing(&mut self.filter, filter);
    }

    pub fn merge_sort(&mut self, field: impl Into<String>, direction: SortDirection) {
        let field = field.into();
        if !self.sort.contains_key(&field) {
            self.sort.insert(field, direction);
        }
    }

    /// Get the filter document
    pub fn get_filter(&self) -> &BsonDocument {
        &self.filter
    }

    /// Get the sort document, `None` when no sort key was added
    pub fn get_sort(&self) -> Option<&BsonDocument> {
        if self.sort.is_empty() {
            None
        } else {
            Some(&self.sort)
        }
    }

    /// Drop all accumulated state
    pub fn clear(&mut self) {
        self.filter.clear();
        self.sort.clear();
    }
}

fn merge_missing(target: &mut BsonDocument, source: BsonDocument) {
    for (key, value) in source {
        if !target.contains_key(&key) {
            target.insert(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_query_builder_new() {
        let qb = QueryBuilder::new();
        assert!(qb.get_filter().is_empty());
        assert!(qb.get_sort().is_none());
    }

    #[test]
    fn test_query_builder_filter() {
        let filter = doc! { "email": "test@example.com" };
        let qb = QueryBuilder::new().filter(filter.clone());
        assert_eq!(qb.get_filter(), &filter);
    }

    #[test]
    fn test_filter_merge_keeps_existing_keys() {
        let qb = QueryBuilder::new()
            .filter(doc! { "status": "active", "age": { "$gte": 18 } })
            .filter(doc! { "status": "banned", "country": "NO" });

        assert_eq!(
            qb.get_filter(),
            &doc! { "status": "active", "age": { "$gte": 18 }, "country": "NO" }
        );
    }

    #[test]
    fn test_sort_directions() {
        let qb = QueryBuilder::new()
            .sort("created_at", SortDirection::Descending)
            .sort("name", SortDirection::Ascending)
            .sort("created_at", SortDirection::Ascending);

        assert_eq!(qb.get_sort(), Some(&doc! { "created_at": -1, "name": 1 }));
    }

    #[test]
    fn test_sort_direction_parse() {
        assert_eq!(SortDirection::parse("DESC"), Some(SortDirection::Descending));
        assert_eq!(SortDirection::parse("asc"), Some(SortDirection::Ascending));
        assert_eq!(SortDirection::parse("sideways"), None);
        assert_eq!(SortDirection::default(), SortDirection::Ascending);
    }

    #[test]
    fn test_clear() {
        let mut qb = QueryBuilder::new()
            .filter(doc! { "a": 1 })
            .sort("a", SortDirection::Ascending);
        qb.clear();
        assert_eq!(qb, QueryBuilder::new());
    }
}
