use crate::basis::types::BasisLineItem;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a line item.
///
/// The Basis API sends ids as integers on some endpoints and as strings on
/// others, so both forms are accepted and compared by their text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawLineItemId")]
pub struct LineItemId(String);

impl LineItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LineItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLineItemId {
    Int(i64),
    Text(String),
}

impl From<RawLineItemId> for LineItemId {
    fn from(raw: RawLineItemId) -> Self {
        match raw {
            RawLineItemId::Int(n) => LineItemId(n.to_string()),
            RawLineItemId::Text(s) => LineItemId(s),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub id: LineItemId,
    pub name: String,
}

impl TryFrom<BasisLineItem> for LineItem {
    type Error = BasisLineItem;

    /// Line items without an id cannot be joined to stats and are rejected.
    fn try_from(li: BasisLineItem) -> Result<Self, Self::Error> {
        match li {
            BasisLineItem { id: Some(id), name } if !id.as_str().is_empty() => Ok(LineItem {
                id,
                name: name.unwrap_or_default(),
            }),
            rejected => Err(rejected),
        }
    }
}
