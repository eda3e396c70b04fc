//! Core types for declarative resource graphs

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum length of a logical id
const MAX_LOGICAL_ID_LEN: usize = 255;

/// Template-local name of a resource
///
/// Logical ids are 1-255 ASCII alphanumeric characters. They are the only
/// way resources refer to each other inside a graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalId(String);

impl LogicalId {
    /// Create a logical id, validating its characters
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_LOGICAL_ID_LEN
            && id.chars().all(|c| c.is_ascii_alphanumeric());
        if valid {
            Ok(Self(id))
        } else {
            Err(GraphError::InvalidLogicalId(id))
        }
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Derive a child id by appending a suffix (e.g. `Vpc` + `PublicSubnet1`)
    pub fn child(&self, suffix: &str) -> Result<Self> {
        Self::new(format!("{}{}", self.0, suffix))
    }
}

impl TryFrom<String> for LogicalId {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl TryFrom<&str> for LogicalId {
    type Error = GraphError;

    fn try_from(value: &str) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LogicalId> for String {
    fn from(id: LogicalId) -> Self {
        id.0
    }
}

impl AsRef<str> for LogicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the provisioning engine does with a resource when it leaves the graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionPolicy {
    /// Delete the physical resource
    Delete,
    /// Keep the physical resource, orphaned from the stack
    Retain,
    /// Take a snapshot, then delete
    Snapshot,
}

/// Values the engine supplies at deploy time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PseudoParameter {
    AccountId,
    Partition,
    Region,
    StackName,
    UrlSuffix,
}

impl PseudoParameter {
    /// Name used in `Ref` expressions
    pub fn name(&self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Partition => "AWS::Partition",
            Self::Region => "AWS::Region",
            Self::StackName => "AWS::StackName",
            Self::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

/// A property value, literal or resolved by the engine at deploy time
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A plain JSON value
    Literal(Value),
    /// A list of expressions
    List(Vec<Expr>),
    /// A map of expressions
    Map(BTreeMap<String, Expr>),
    /// The primary identifier of another resource
    Ref(LogicalId),
    /// A named attribute of another resource
    GetAtt { target: LogicalId, attribute: String },
    /// String concatenation
    Join { separator: String, parts: Vec<Expr> },
    /// One element of a list
    Select { index: usize, list: Box<Expr> },
    /// Availability zones of a region (empty string = current region)
    GetAzs(Box<Expr>),
    /// Engine-supplied value such as the partition
    Pseudo(PseudoParameter),
}

impl Expr {
    /// A list expression from anything iterable
    pub fn list<I, E>(items: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// A map expression from key/value pairs
    pub fn map<I, K, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, E)>,
        K: Into<String>,
        E: Into<Expr>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// `Fn::Join` with the given separator
    pub fn join<I, E>(separator: &str, parts: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Expr>,
    {
        Self::Join {
            separator: separator.to_string(),
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// The n-th availability zone of the current region
    pub fn availability_zone(index: usize) -> Self {
        Self::Select {
            index,
            list: Box::new(Self::GetAzs(Box::new(Self::from("")))),
        }
    }

    /// Every logical id this expression refers to, in encounter order
    pub fn references(&self) -> Vec<&LogicalId> {
        let mut refs = Vec::new();
        self.collect_references(&mut refs);
        refs
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<&'a LogicalId>) {
        match self {
            Self::Ref(id) | Self::GetAtt { target: id, .. } => out.push(id),
            Self::List(items) | Self::Join { parts: items, .. } => {
                for item in items {
                    item.collect_references(out);
                }
            }
            Self::Map(entries) => {
                for value in entries.values() {
                    value.collect_references(out);
                }
            }
            Self::Select { list, .. } => list.collect_references(out),
            Self::GetAzs(region) => region.collect_references(out),
            Self::Literal(_) | Self::Pseudo(_) => {}
        }
    }

    /// Whether this expression is the literal string `*`
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Literal(Value::String(s)) if s == "*")
    }

    /// Render as CloudFormation JSON
    pub fn to_json(&self) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Ref(id) => json!({ "Ref": id.as_str() }),
            Self::GetAtt { target, attribute } => {
                json!({ "Fn::GetAtt": [target.as_str(), attribute] })
            }
            Self::Join { separator, parts } => {
                let parts: Vec<Value> = parts.iter().map(Self::to_json).collect();
                json!({ "Fn::Join": [separator, parts] })
            }
            Self::Select { index, list } => json!({ "Fn::Select": [index, list.to_json()] }),
            Self::GetAzs(region) => json!({ "Fn::GetAZs": region.to_json() }),
            Self::Pseudo(param) => json!({ "Ref": param.name() }),
        }
    }
}

impl Serialize for Expr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Literal(Value::String(value.to_string()))
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Literal(Value::String(value))
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Self::Literal(Value::Bool(value))
    }
}

impl From<u16> for Expr {
    fn from(value: u16) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<u32> for Expr {
    fn from(value: u32) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Literal(Value::from(value))
    }
}

impl From<PseudoParameter> for Expr {
    fn from(value: PseudoParameter) -> Self {
        Self::Pseudo(value)
    }
}

/// Resource properties, ordered by name for deterministic output
pub type Properties = BTreeMap<String, Expr>;
