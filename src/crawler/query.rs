//! Query-string building for sites with unusual parameter encodings.

use url::form_urlencoded;

/// Ordered key/value pairs; repeated keys are kept ("tipo[]=a&tipo[]=b").
#[derive(Debug, Clone, Default)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, key: &str, value: impl ToString) -> Self {
        self.pairs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn push_all<I, V>(mut self, key: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: ToString,
    {
        for value in values {
            self.pairs.push((key.to_string(), value.to_string()));
        }
        self
    }

    /// `application/x-www-form-urlencoded`, spaces as `+`.
    pub fn encode(&self) -> String {
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &self.pairs {
            ser.append_pair(k, v);
        }
        ser.finish()
    }

    /// `base?query`, or `base` alone when there are no pairs.
    pub fn to_url(&self, base: &str) -> String {
        if self.pairs.is_empty() {
            base.to_string()
        } else {
            format!("{}?{}", base, self.encode())
        }
    }
}

/// Percent-encode a single component with spaces as `%20`.
pub fn encode_component(s: &str) -> String {
    form_urlencoded::byte_serialize(s.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
