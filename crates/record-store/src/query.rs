use crate::Entity;

/// Query over a single collection.
///
/// Filters match document fields by JSON equality and are combined with AND.
/// A field may be a dotted path (`creator.user_id`) into nested objects.
/// Results come back in insertion order.
#[derive(Debug, Clone)]
pub struct RecordQuery {
    /// Collection to read from.
    pub collection: String,

    /// Field/value pairs that must all match.
    pub filters: Vec<(String, serde_json::Value)>,

    /// Maximum number of records to return.
    pub limit: Option<usize>,

    /// Number of records to skip.
    pub offset: Option<usize>,
}

impl RecordQuery {
    /// Creates a query over a named collection.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filters: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Creates a query over the collection of an entity type.
    pub fn of<T: Entity>() -> Self {
        Self::new(T::COLLECTION)
    }

    /// Requires `field` to equal `value`.
    pub fn filter(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.filters.push((field.into(), value));
        self
    }

    /// Limits the number of records returned.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skips this many records before returning results.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if the document satisfies every filter.
    pub fn matches(&self, data: &serde_json::Value) -> bool {
        self.filters.iter().all(|(field, value)| {
            field
                .split('.')
                .try_fold(data, |node, segment| node.get(segment))
                == Some(value)
        })
    }

    /// Builds a JSON object usable for containment matching (`@>`).
    pub fn containment(&self) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        for (field, value) in &self.filters {
            insert_path(&mut root, field, value.clone());
        }
        serde_json::Value::Object(root)
    }
}

fn insert_path(
    map: &mut serde_json::Map<String, serde_json::Value>,
    path: &str,
    value: serde_json::Value,
) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = map
                .entry(head.to_string())
                .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
            if !child.is_object() {
                *child = serde_json::Value::Object(serde_json::Map::new());
            }
            if let serde_json::Value::Object(inner) = child {
                insert_path(inner, rest, value);
            }
        }
    }
}
