//! Document serialization
//!
//! The textual form of a document is deterministic JSON: top-level keys in
//! lexicographic order, scalar system fields as plain scalars, and every
//! revision-keyed map as an object whose keys are revision strings in
//! descending stable order. `from_json_str` is the exact inverse of
//! `to_json_string`; any deviation parses as a `MalformedDocument` error.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::revision::{Revision, RevisionMap};

use super::errors::{DocumentError, DocumentResult};
use super::node_document::NodeDocument;
use super::value::{DocValue, Scalar};

/// Serializes a document into its deterministic textual form.
pub fn to_json_string(doc: &NodeDocument) -> String {
    let mut out = String::with_capacity(256);
    out.push('{');
    for (i, (key, value)) in doc.data().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(&mut out, key);
        out.push(':');
        match value {
            DocValue::Scalar(Scalar::Bool(b)) => out.push_str(if *b { "true" } else { "false" }),
            DocValue::Scalar(Scalar::Int(n)) => out.push_str(&n.to_string()),
            DocValue::Scalar(Scalar::String(s)) => write_string(&mut out, s),
            DocValue::Map(map) => write_map(&mut out, map),
        }
    }
    out.push('}');
    out
}

/// Parses the textual form back into a sealed document.
pub fn from_json_str(input: &str) -> DocumentResult<NodeDocument> {
    let value: Value = serde_json::from_str(input)
        .map_err(|e| DocumentError::malformed(format!("not valid JSON: {}", e)))?;
    let object = match value {
        Value::Object(object) => object,
        other => {
            return Err(DocumentError::malformed(format!(
                "expected an object, got {}",
                type_name(&other)
            )))
        }
    };
    let mut data = BTreeMap::new();
    for (key, value) in object {
        let parsed = match value {
            Value::Bool(b) => DocValue::Scalar(Scalar::Bool(b)),
            Value::Number(n) => {
                let n = n.as_i64().ok_or_else(|| {
                    DocumentError::malformed(format!("non-integer number under '{}'", key))
                })?;
                DocValue::Scalar(Scalar::Int(n))
            }
            Value::String(s) => DocValue::Scalar(Scalar::String(s)),
            Value::Object(entries) => {
                let mut map = RevisionMap::new();
                for (rev, entry) in entries {
                    let revision: Revision = rev.parse()?;
                    match entry {
                        Value::String(s) => map.insert(revision, s),
                        other => {
                            return Err(DocumentError::malformed(format!(
                                "non-string map value under '{}': {}",
                                key,
                                type_name(&other)
                            )))
                        }
                    };
                }
                DocValue::Map(map)
            }
            other => {
                return Err(DocumentError::malformed(format!(
                    "unsupported value under '{}': {}",
                    key,
                    type_name(&other)
                )))
            }
        };
        data.insert(key, parsed);
    }
    let mut doc = NodeDocument::from_data(data);
    doc.seal();
    Ok(doc)
}

fn write_map(out: &mut String, map: &RevisionMap<String>) {
    out.push('{');
    for (i, (revision, value)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_string(out, &revision.to_string());
        out.push(':');
        write_string(out, value);
    }
    out.push('}');
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                out.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
