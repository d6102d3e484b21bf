use std::collections::BTreeMap;

use serde_json::Value;

/// Id → name mapping of the classes a detector can report.
///
/// Loaded once at startup and shared read-only. Lookups never fail: an id
/// without a usable name resolves to its decimal representation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassCatalog {
    names: BTreeMap<i64, String>,
}

impl ClassCatalog {
    pub fn from_map(names: BTreeMap<i64, String>) -> Self {
        Self { names }
    }

    /// Positional list: the index is the class id.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names
            .into_iter()
            .enumerate()
            .map(|(i, n)| (i as i64, n.into()))
            .collect();
        Self { names }
    }

    /// Accepts either `{"0": "person", ...}` or `["person", ...]`.
    /// Any other shape yields an empty catalog, which still resolves every id.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => Self::from_names(
                items
                    .iter()
                    .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())),
            ),
            Value::Object(map) => {
                let names = map
                    .iter()
                    .filter_map(|(k, v)| {
                        let id = k.trim().parse::<i64>().ok()?;
                        let name = v.as_str()?.to_string();
                        Some((id, name))
                    })
                    .collect();
                Self { names }
            }
            _ => {
                tracing::warn!("class names have an unexpected shape, falling back to numeric ids");
                Self::default()
            }
        }
    }

    /// Parses the `names` metadata entry written by Ultralytics exports,
    /// e.g. `{0: 'person', 1: "driver's seat"}`.
    pub fn from_ultralytics_metadata(raw: &str) -> Option<Self> {
        parse_python_dict(raw).map(Self::from_map)
    }

    /// One class name per line; blank lines are ignored.
    pub fn from_labels_text(text: &str) -> Self {
        Self::from_names(text.lines().map(str::trim).filter(|l| !l.is_empty()))
    }

    pub fn name_for(&self, class_id: i64) -> String {
        match self.names.get(&class_id) {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => class_id.to_string(),
        }
    }

    /// Names ordered by class id.
    pub fn names(&self) -> Vec<String> {
        self.names.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn parse_python_dict(raw: &str) -> Option<BTreeMap<i64, String>> {
    let body = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
    let mut chars = body.chars().peekable();
    let mut out = BTreeMap::new();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace() || *c == ',') {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }

        let mut key = String::new();
        for c in chars.by_ref() {
            if c == ':' {
                break;
            }
            key.push(c);
        }
        let id = key.trim().parse::<i64>().ok()?;

        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        let quote = chars.next().filter(|c| *c == '\'' || *c == '"')?;

        let mut name = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
            match c {
                '\\' => name.push(chars.next()?),
                c if c == quote => {
                    closed = true;
                    break;
                }
                c => name.push(c),
            }
        }
        if !closed {
            return None;
        }
        out.insert(id, name);
    }

    Some(out)
}
