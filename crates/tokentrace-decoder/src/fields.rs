use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{ShapeMismatch, ShapeProblem};

/// Collects shape diagnostics for a single line
pub(crate) struct Diagnostics<'a> {
    line: usize,
    issues: &'a mut Vec<ShapeMismatch>,
}

impl<'a> Diagnostics<'a> {
    pub(crate) fn new(line: usize, issues: &'a mut Vec<ShapeMismatch>) -> Self {
        Self { line, issues }
    }

    pub(crate) fn record(&mut self, field: String, problem: ShapeProblem) {
        self.issues.push(ShapeMismatch {
            line: self.line,
            field,
            problem,
        });
    }

    fn wrong_type(&mut self, field: String, expected: &'static str, found: &Value) {
        self.record(
            field,
            ShapeProblem::WrongType {
                expected,
                found: json_type(found),
            },
        );
    }
}

/// Lenient view over a JSON object.
///
/// Missing fields and nulls read as absent. Present values of the wrong
/// type are reported and read as absent, so callers only choose defaults.
#[derive(Clone, Copy)]
pub(crate) struct Fields<'a> {
    obj: Option<&'a Map<String, Value>>,
    prefix: &'a str,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(obj: &'a Map<String, Value>) -> Self {
        Self {
            obj: Some(obj),
            prefix: "",
        }
    }

    fn empty(prefix: &'a str) -> Self {
        Self { obj: None, prefix }
    }

    fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.prefix, key)
        }
    }

    pub(crate) fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.obj
            .and_then(|obj| obj.get(key))
            .filter(|value| !value.is_null())
    }

    pub(crate) fn opt_f64(&self, key: &str, diag: &mut Diagnostics) -> Option<f64> {
        let value = self.get(key)?;
        match as_f64(value) {
            Some(n) => Some(n),
            None => {
                diag.wrong_type(self.path(key), "number", value);
                None
            }
        }
    }

    pub(crate) fn f64(&self, key: &str, diag: &mut Diagnostics) -> f64 {
        self.opt_f64(key, diag).unwrap_or(0.0)
    }

    pub(crate) fn opt_i64(&self, key: &str, diag: &mut Diagnostics) -> Option<i64> {
        let value = self.get(key)?;
        match as_i64(value) {
            Some(n) => Some(n),
            None => {
                diag.wrong_type(self.path(key), "integer", value);
                None
            }
        }
    }

    pub(crate) fn i64(&self, key: &str, diag: &mut Diagnostics) -> i64 {
        self.opt_i64(key, diag).unwrap_or(0)
    }

    pub(crate) fn opt_u64(&self, key: &str, diag: &mut Diagnostics) -> Option<u64> {
        let value = self.get(key)?;
        match as_i64(value).and_then(|n| u64::try_from(n).ok()) {
            Some(n) => Some(n),
            None => {
                diag.wrong_type(self.path(key), "unsigned integer", value);
                None
            }
        }
    }

    pub(crate) fn u64(&self, key: &str, diag: &mut Diagnostics) -> u64 {
        self.opt_u64(key, diag).unwrap_or(0)
    }

    pub(crate) fn opt_string(&self, key: &str, diag: &mut Diagnostics) -> Option<String> {
        let value = self.get(key)?;
        match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            other => {
                diag.wrong_type(self.path(key), "string", other);
                None
            }
        }
    }

    pub(crate) fn string(&self, key: &str, diag: &mut Diagnostics) -> String {
        self.opt_string(key, diag).unwrap_or_default()
    }

    /// Nested object. A missing object yields an empty reader.
    pub(crate) fn object(&self, key: &'a str, diag: &mut Diagnostics) -> Option<Fields<'a>> {
        let value = self.get(key)?;
        match value {
            Value::Object(map) => Some(Fields {
                obj: Some(map),
                prefix: key,
            }),
            other => {
                diag.wrong_type(self.path(key), "object", other);
                None
            }
        }
    }

    pub(crate) fn object_or_empty(&self, key: &'a str, diag: &mut Diagnostics) -> Fields<'a> {
        self.object(key, diag)
            .unwrap_or_else(|| Fields::empty(key))
    }

    fn array(&self, key: &str, diag: &mut Diagnostics) -> &'a [Value] {
        match self.get(key) {
            None => &[],
            Some(Value::Array(items)) => items,
            Some(other) => {
                diag.wrong_type(self.path(key), "array", other);
                &[]
            }
        }
    }

    /// Elements of the wrong type become the default at their position,
    /// so parallel arrays stay aligned.
    fn typed_array<T: Default>(
        &self,
        key: &str,
        expected: &'static str,
        convert: impl Fn(&Value) -> Option<T>,
        diag: &mut Diagnostics,
    ) -> Vec<T> {
        let items = self.array(key, diag);
        let mut first_bad: Option<&Value> = None;
        let out = items
            .iter()
            .map(|item| {
                convert(item).unwrap_or_else(|| {
                    first_bad.get_or_insert(item);
                    T::default()
                })
            })
            .collect();
        if let Some(bad) = first_bad {
            diag.wrong_type(format!("{}[]", self.path(key)), expected, bad);
        }
        out
    }

    pub(crate) fn i64_array(&self, key: &str, diag: &mut Diagnostics) -> Vec<i64> {
        self.typed_array(key, "integer", as_i64, diag)
    }

    pub(crate) fn f64_array(&self, key: &str, diag: &mut Diagnostics) -> Vec<f64> {
        self.typed_array(key, "number", as_f64, diag)
    }

    pub(crate) fn string_array(&self, key: &str, diag: &mut Diagnostics) -> Vec<String> {
        self.typed_array(
            key,
            "string",
            |value| value.as_str().map(str::to_string),
            diag,
        )
    }

    /// Array of objects; non-object elements read as empty objects
    pub(crate) fn object_array(&self, key: &'a str, diag: &mut Diagnostics) -> Vec<Fields<'a>> {
        let items = self.array(key, diag);
        let mut reported = false;
        items
            .iter()
            .map(|item| match item {
                Value::Object(map) => Fields {
                    obj: Some(map),
                    prefix: key,
                },
                other => {
                    if !reported {
                        diag.wrong_type(format!("{}[]", self.path(key)), "object", other);
                        reported = true;
                    }
                    Fields::empty(key)
                }
            })
            .collect()
    }

    /// Flat map of numeric values; other entries are reported and dropped
    pub(crate) fn number_map(&self, key: &str, diag: &mut Diagnostics) -> BTreeMap<String, f64> {
        let Some(value) = self.get(key) else {
            return BTreeMap::new();
        };
        let Value::Object(map) = value else {
            diag.wrong_type(self.path(key), "object", value);
            return BTreeMap::new();
        };

        let mut out = BTreeMap::new();
        for (name, entry) in map {
            match as_f64(entry) {
                Some(n) => {
                    out.insert(name.clone(), n);
                }
                None if entry.is_null() => {}
                None => diag.wrong_type(format!("{}.{}", self.path(key), name), "number", entry),
            }
        }
        out
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub(crate) fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
