use serde_json::{Map, Value};

use crate::schema::coercion::{first_present, kind_of, scalar_text};
use crate::schema::Violations;

/// Character-count bounds for a text field (inclusive).
#[derive(Debug, Clone, Copy)]
pub struct Len {
    pub min: usize,
    pub max: Option<usize>,
}

impl Len {
    pub const ANY: Len = Len { min: 0, max: None };

    pub const fn between(min: usize, max: usize) -> Len {
        Len {
            min,
            max: Some(max),
        }
    }

    pub const fn at_most(max: usize) -> Len {
        Len { min: 0, max: Some(max) }
    }

    pub fn check(&self, value: &str) -> Result<(), String> {
        let len = value.chars().count();
        if len < self.min {
            return Err(if self.min == 1 {
                "must not be empty".to_string()
            } else {
                format!("must be at least {} characters", self.min)
            });
        }
        match self.max {
            Some(max) if len > max => Err(format!("must be at most {max} characters")),
            _ => Ok(()),
        }
    }
}

/// A JSON object being read at a known path. Every accessor records a
/// violation instead of returning early, so one pass reports every bad field.
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    pub fn root(map: &'a Map<String, Value>) -> Self {
        Fields {
            map,
            path: String::new(),
        }
    }

    /// Full path of `key` below this object, e.g. `experience[2].company`.
    pub fn path_of(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    /// Value under the canonical name, else under the first legacy alias.
    pub fn get(&self, names: &[&'a str]) -> Option<(&'a str, &'a Value)> {
        first_present(self.map, names)
    }

    pub fn required_str(&self, violations: &mut Violations, names: &[&'a str], len: Len) -> String {
        match self.get(names) {
            Some((key, value)) => self.text(violations, key, value, len).unwrap_or_default(),
            None => {
                violations.push(self.path_of(names[0]), "field required");
                String::new()
            }
        }
    }

    pub fn optional_str(
        &self,
        violations: &mut Violations,
        names: &[&'a str],
        len: Len,
    ) -> Option<String> {
        let (key, value) = self.get(names)?;
        self.text(violations, key, value, len)
    }

    fn text(&self, violations: &mut Violations, key: &str, value: &Value, len: Len) -> Option<String> {
        let text = match value {
            Value::String(s) => s.clone(),
            // Legacy exports sometimes send GPA or years as numbers.
            Value::Number(_) => scalar_text(value)?,
            other => {
                violations.push(
                    self.path_of(key),
                    format!("expected a string, found {}", kind_of(other)),
                );
                return None;
            }
        };
        match len.check(&text) {
            Ok(()) => Some(text),
            Err(message) => {
                violations.push(self.path_of(key), message);
                None
            }
        }
    }

    /// A list of strings, kept verbatim. Absent means empty.
    pub fn string_list(&self, violations: &mut Violations, name: &'a str) -> Vec<String> {
        match self.get(&[name]) {
            None => Vec::new(),
            Some((_, Value::Array(items))) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match item {
                        Value::String(s) => out.push(s.clone()),
                        other => violations.push(
                            format!("{}[{i}]", self.path_of(name)),
                            format!("expected a string, found {}", kind_of(other)),
                        ),
                    }
                }
                out
            }
            Some((_, other)) => {
                violations.push(
                    self.path_of(name),
                    format!("expected a list, found {}", kind_of(other)),
                );
                Vec::new()
            }
        }
    }

    /// A field read through a coercion function; failures become violations.
    pub fn coerced<T>(
        &self,
        violations: &mut Violations,
        names: &[&'a str],
        coerce: impl FnOnce(&Value) -> Result<T, String>,
    ) -> Option<T> {
        let (key, value) = self.get(names)?;
        match coerce(value) {
            Ok(v) => Some(v),
            Err(message) => {
                violations.push(self.path_of(key), message);
                None
            }
        }
    }

    /// A nested object; a missing one is recorded when `required`.
    pub fn object(&self, violations: &mut Violations, name: &'a str, required: bool) -> Option<Fields<'a>> {
        match self.get(&[name]) {
            Some((_, Value::Object(map))) => Some(Fields {
                map,
                path: self.path_of(name),
            }),
            Some((_, other)) => {
                violations.push(
                    self.path_of(name),
                    format!("expected an object, found {}", kind_of(other)),
                );
                None
            }
            None => {
                if required {
                    violations.push(self.path_of(name), "field required");
                }
                None
            }
        }
    }

    /// A list of objects, each read by `read`. Entries that fail to read are
    /// dropped from the result but their violations are kept.
    pub fn objects<T>(
        &self,
        violations: &mut Violations,
        name: &'a str,
        mut read: impl FnMut(&Fields<'a>, &mut Violations) -> T,
    ) -> Vec<T> {
        let items = match self.get(&[name]) {
            None => return Vec::new(),
            Some((_, Value::Array(items))) => items,
            Some((_, other)) => {
                violations.push(
                    self.path_of(name),
                    format!("expected a list, found {}", kind_of(other)),
                );
                return Vec::new();
            }
        };

        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            let path = format!("{}[{i}]", self.path_of(name));
            match item {
                Value::Object(map) => out.push(read(&Fields { map, path }, violations)),
                other => violations.push(path, format!("expected an object, found {}", kind_of(other))),
            }
        }
        out
    }
}
