//! Rich query selectors.
//!
//! A small subset of the CouchDB Mango query language, enough for the
//! registry's listings:
//!
//! ```text
//! {"selector": {"@certificate": "<kid>", "revoked_time": {"$exists": false}},
//!  "use_index": "certificate"}
//! ```
//!
//! Supported per-field conditions are plain values (equality), `$eq`, `$ne`
//! and `$exists`. Nested objects address nested fields. `use_index` is
//! accepted and ignored; backends scan in key order.

use crate::errors::{LedgerError, Result};
use serde_json::{Map, Value};

/// Parsed rich query
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub selector: Selector,
    pub use_index: Option<String>,
    pub limit: Option<usize>,
}

impl Query {
    /// Parse a JSON query string
    pub fn parse(query: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(query)
            .map_err(|e| LedgerError::InvalidQuery(format!("not JSON: {}", e)))?;
        let object = value
            .as_object()
            .ok_or_else(|| LedgerError::InvalidQuery("query must be an object".to_string()))?;

        let selector = match object.get("selector") {
            Some(Value::Object(fields)) => Selector::from_fields(fields)?,
            Some(_) => {
                return Err(LedgerError::InvalidQuery(
                    "selector must be an object".to_string(),
                ))
            }
            None => return Err(LedgerError::InvalidQuery("missing selector".to_string())),
        };

        let use_index = match object.get("use_index") {
            None => None,
            Some(Value::String(s)) => Some(s.clone()),
            // ["design_doc", "index_name"]
            Some(Value::Array(parts)) => Some(
                parts
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("/"),
            ),
            Some(_) => {
                return Err(LedgerError::InvalidQuery(
                    "use_index must be a string or array".to_string(),
                ))
            }
        };

        let limit = match object.get("limit") {
            None => None,
            Some(v) => Some(v.as_u64().ok_or_else(|| {
                LedgerError::InvalidQuery("limit must be a non-negative integer".to_string())
            })? as usize),
        };

        Ok(Self {
            selector,
            use_index,
            limit,
        })
    }
}

/// Field condition
#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(Value),
    Ne(Value),
    Exists(bool),
}

/// Conjunction of field conditions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selector {
    clauses: Vec<(Vec<String>, Condition)>,
}

impl Selector {
    fn from_fields(fields: &Map<String, Value>) -> Result<Self> {
        let mut selector = Selector::default();
        selector.collect(&[], fields)?;
        Ok(selector)
    }

    fn collect(&mut self, prefix: &[String], fields: &Map<String, Value>) -> Result<()> {
        for (field, condition) in fields {
            if field.starts_with('$') {
                return Err(LedgerError::InvalidQuery(format!(
                    "unsupported combination operator: {}",
                    field
                )));
            }

            let mut path = prefix.to_vec();
            path.push(field.clone());

            match condition {
                Value::Object(inner) => {
                    let (operators, nested): (Map<String, Value>, Map<String, Value>) = inner
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .partition(|(k, _)| k.starts_with('$'));

                    for (op, arg) in operators {
                        self.clauses.push((path.clone(), parse_operator(&op, arg)?));
                    }
                    if !nested.is_empty() {
                        self.collect(&path, &nested)?;
                    }
                }
                other => self.clauses.push((path, Condition::Eq(other.clone()))),
            }
        }
        Ok(())
    }

    /// Check a stored document against the selector
    ///
    /// Documents that are not JSON objects never match.
    pub fn matches(&self, document: &[u8]) -> bool {
        let value: Value = match serde_json::from_slice(document) {
            Ok(v) => v,
            Err(_) => return false,
        };
        if !value.is_object() {
            return false;
        }

        self.clauses.iter().all(|(path, condition)| {
            let field = lookup(&value, path);
            match condition {
                Condition::Eq(expected) => field == Some(expected),
                Condition::Ne(unexpected) => field != Some(unexpected),
                Condition::Exists(should_exist) => field.is_some() == *should_exist,
            }
        })
    }
}

fn parse_operator(op: &str, arg: Value) -> Result<Condition> {
    match op {
        "$eq" => Ok(Condition::Eq(arg)),
        "$ne" => Ok(Condition::Ne(arg)),
        "$exists" => match arg {
            Value::Bool(b) => Ok(Condition::Exists(b)),
            _ => Err(LedgerError::InvalidQuery(
                "$exists expects a boolean".to_string(),
            )),
        },
        other => Err(LedgerError::InvalidQuery(format!(
            "unsupported operator: {}",
            other
        ))),
    }
}

fn lookup<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, segment| current.as_object()?.get(segment))
}
