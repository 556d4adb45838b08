use std::fmt;

use serde_json::Value as Json;

/// A value read from a message by path.
///
/// A value that does not exist converts to the zero value of every type
/// (empty string, `0`, `false`, empty array) instead of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Value {
    inner: Option<Json>,
}

impl Value {
    pub(crate) const fn new(inner: Option<Json>) -> Self {
        Self { inner }
    }

    /// A value that does not exist.
    #[must_use]
    pub const fn missing() -> Self {
        Self { inner: None }
    }

    #[must_use]
    pub const fn exists(&self) -> bool {
        self.inner.is_some()
    }

    /// Borrows the underlying JSON, if the value exists.
    #[must_use]
    pub const fn json(&self) -> Option<&Json> {
        self.inner.as_ref()
    }

    /// Consumes the value, yielding `null` if it does not exist.
    #[must_use]
    pub fn into_json(self) -> Json {
        self.inner.unwrap_or(Json::Null)
    }

    /// Strings are returned without quotes, `null` as the empty string and
    /// every other value as its JSON text.
    #[must_use]
    pub fn string(&self) -> String {
        match &self.inner {
            None | Some(Json::Null) => String::new(),
            Some(Json::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    #[must_use]
    pub fn bytes(&self) -> Vec<u8> {
        self.string().into_bytes()
    }

    /// The value encoded as JSON text; empty if the value does not exist.
    #[must_use]
    pub fn raw(&self) -> Vec<u8> {
        self.inner
            .as_ref()
            .and_then(|v| serde_json::to_vec(v).ok())
            .unwrap_or_default()
    }

    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn int(&self) -> i64 {
        match &self.inner {
            Some(Json::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or_default(),
            Some(Json::String(s)) => s
                .trim()
                .parse::<i64>()
                .ok()
                .or_else(|| s.trim().parse::<f64>().ok().map(|f| f as i64))
                .unwrap_or_default(),
            Some(Json::Bool(b)) => i64::from(*b),
            _ => 0,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn float(&self) -> f64 {
        match &self.inner {
            Some(Json::Number(n)) => n.as_f64().unwrap_or_default(),
            Some(Json::String(s)) => s.trim().parse().unwrap_or_default(),
            Some(Json::Bool(b)) => f64::from(u8::from(*b)),
            _ => 0.0,
        }
    }

    #[must_use]
    pub fn bool(&self) -> bool {
        match &self.inner {
            Some(Json::Bool(b)) => *b,
            Some(Json::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Json::String(s)) => matches!(s.trim(), "true" | "1" | "t" | "T" | "TRUE" | "True"),
            _ => false,
        }
    }

    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self.inner, Some(Json::Array(_)))
    }

    /// Array elements. A non-array value yields itself as the only element;
    /// `null` and missing values yield nothing.
    #[must_use]
    pub fn array(&self) -> Vec<Self> {
        match &self.inner {
            None | Some(Json::Null) => Vec::new(),
            Some(Json::Array(items)) => items.iter().cloned().map(Self::from).collect(),
            Some(other) => vec![Self::from(other.clone())],
        }
    }

    /// Object entries in document order; empty for anything but an object.
    #[must_use]
    pub fn map(&self) -> Vec<(String, Self)> {
        match &self.inner {
            Some(Json::Object(map)) => map
                .iter()
                .map(|(k, v)| (k.clone(), Self::from(v.clone())))
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<Json> for Value {
    fn from(value: Json) -> Self {
        Self::new(Some(value))
    }
}

impl From<Value> for Json {
    fn from(value: Value) -> Self {
        value.into_json()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string())
    }
}
