//! Document list predicates
//!
//! Encoded as the platform's JSON query strings, one `queries[]` parameter
//! per predicate.

use serde::Serialize;
use serde_json::Value;

/// One list predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// `attribute == value`
    Equal(String, Value),
    OrderAsc(String),
    OrderDesc(String),
    Limit(usize),
    /// Start after the document with this id
    CursorAfter(String),
    /// Full-text search of `attribute` for `term`
    Search(String, String),
}

#[derive(Serialize)]
struct Encoded<'a> {
    method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attribute: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    values: Vec<Value>,
}

impl Query {
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equal(attribute.into(), value.into())
    }

    pub fn order_asc(attribute: impl Into<String>) -> Self {
        Self::OrderAsc(attribute.into())
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Self::OrderDesc(attribute.into())
    }

    pub fn limit(limit: usize) -> Self {
        Self::Limit(limit)
    }

    pub fn cursor_after(document_id: impl Into<String>) -> Self {
        Self::CursorAfter(document_id.into())
    }

    pub fn search(attribute: impl Into<String>, term: impl Into<String>) -> Self {
        Self::Search(attribute.into(), term.into())
    }

    pub fn method(&self) -> &'static str {
        match self {
            Self::Equal(..) => "equal",
            Self::OrderAsc(_) => "orderAsc",
            Self::OrderDesc(_) => "orderDesc",
            Self::Limit(_) => "limit",
            Self::CursorAfter(_) => "cursorAfter",
            Self::Search(..) => "search",
        }
    }

    /// JSON form sent in the `queries[]` parameter
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let (attribute, values) = match self {
            Self::Equal(attribute, value) => {
                let values = match value {
                    Value::Array(values) => values.clone(),
                    value => vec![value.clone()],
                };
                (Some(attribute.as_str()), values)
            }
            Self::OrderAsc(attribute) | Self::OrderDesc(attribute) => {
                (Some(attribute.as_str()), Vec::new())
            }
            Self::Limit(limit) => (None, vec![Value::from(*limit)]),
            Self::CursorAfter(id) => (None, vec![Value::from(id.as_str())]),
            Self::Search(attribute, term) => {
                (Some(attribute.as_str()), vec![Value::from(term.as_str())])
            }
        };

        serde_json::to_string(&Encoded {
            method: self.method(),
            attribute,
            values,
        })
    }
}
