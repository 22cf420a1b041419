// ── Template variables ──
//
// A fixed name → value mapping applied to query expressions before they
// are sent. Tokens are `$name` or `${name}` where `name` is a run of
// `[A-Za-z0-9_]`. Substitution is a single left-to-right scan, so the
// outcome never depends on map order and inserted values are not
// re-expanded.

use std::collections::BTreeMap;

/// Built-in defaults, overridden by dashboard, config and CLI values.
pub const DEFAULT_VARIABLES: &[(&str, &str)] = &[
    ("node", "localhost:9100"),
    ("job", "node-exporter"),
    ("__rate_interval", "1m"),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    values: BTreeMap<String, String>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in defaults.
    pub fn with_defaults() -> Self {
        DEFAULT_VARIABLES.iter().copied().collect()
    }

    /// Bind `name` (without the leading `$`), replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let mut name = name.into();
        if name.starts_with('$') {
            name.remove(0);
        }
        self.values.insert(name, value.into());
    }

    /// Overlay `other` on top of `self`; later layers win.
    pub fn merge<I, K, V>(&mut self, other: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in other {
            self.insert(k, v);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every bound `$name` / `${name}` token in `expr`.
    /// Unbound tokens are copied through untouched.
    pub fn substitute(&self, expr: &str) -> String {
        let mut out = String::with_capacity(expr.len());
        let mut rest = expr;

        while let Some(pos) = rest.find('$') {
            out.push_str(&rest[..pos]);
            let after = &rest[pos + 1..];

            let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
                match braced.find('}') {
                    Some(end) if is_ident(&braced[..end]) => (&braced[..end], end + 2),
                    _ => ("", 0),
                }
            } else {
                let len = after
                    .find(|c: char| !is_ident_char(c))
                    .unwrap_or(after.len());
                (&after[..len], len)
            };

            match self.values.get(name) {
                Some(value) if !name.is_empty() => {
                    out.push_str(value);
                    rest = &after[consumed..];
                }
                _ => {
                    out.push('$');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Variables {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut vars = Self::new();
        vars.merge(iter);
        vars
    }
}

/// Parse a `NAME=VALUE` pair as given to `--var`.
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got {s:?}"))?;
    let name = name.trim().trim_start_matches('$');
    if !is_ident(name) {
        return Err(format!("invalid variable name {name:?}"));
    }
    Ok((name.to_owned(), value.to_owned()))
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_ident_char)
}
