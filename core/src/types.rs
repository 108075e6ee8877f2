//! Domain types for the Fieldbook API.
//!
//! # Design
//! Sheets are schemaless, so a `Record` is a field map plus the numeric id
//! the server assigns on creation. Requests are built per call and dropped
//! afterwards; nothing here carries state between calls.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Server-assigned record identifier.
pub type RecordId = u64;

/// HTTP Basic credentials (API key and secret from the book's API-access page).
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Field projection applied to returned records. `None` means "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
}

impl Projection {
    pub fn include<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn exclude<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

/// Parameters of a list call against one sheet.
///
/// `limit == 0` fetches every record: the offset is not sent and the result
/// never reports more pages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// `"<book_id>/<sheet_name>"`.
    pub query: String,
    pub limit: u64,
    pub offset: u64,
    /// `"key=value"` filters, sent in order.
    pub filters: Vec<String>,
    pub projection: Projection,
}

impl ListRequest {
    /// Unbounded listing of `query`.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filters.push(filter.into());
        self
    }

    pub fn projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn is_paged(&self) -> bool {
        self.limit > 0
    }
}

/// One row of a sheet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Records returned by a list call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListResult {
    pub records: Vec<Record>,
    /// Only meaningful for paged requests; always false otherwise.
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_splits_id_from_fields() {
        let record: Record =
            serde_json::from_value(json!({"id": 7, "col_1": "a", "col_2": 3})).unwrap();
        assert_eq!(record.id, Some(7));
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.get("col_2"), Some(&json!(3)));
        assert!(record.get("id").is_none());
    }

    #[test]
    fn record_without_id_serializes_fields_only() {
        let mut fields = Map::new();
        fields.insert("col_1".to_string(), json!("x"));
        let record = Record { id: None, fields };
        assert_eq!(serde_json::to_value(&record).unwrap(), json!({"col_1": "x"}));
    }

    #[test]
    fn list_request_defaults_to_unbounded() {
        let request = ListRequest::new("b1/s1").filter("col_1=a");
        assert!(!request.is_paged());
        assert_eq!(request.filters, vec!["col_1=a".to_string()]);
        assert!(request.limit(5).offset(10).is_paged());
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("key-3", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("key-3"));
        assert!(!debug.contains("hunter2"));
    }
}
