//! Parameter assembly for `sam deploy --parameter-overrides`
//!
//! The override list is built in one pass and is deterministic for identical
//! input so that invocations are reproducible and testable. Parameters with
//! empty values are omitted rather than emitted blank.

use crate::resolve::ResolvedEndpoint;

/// At most this many address ranges are forwarded; later entries are
/// silently dropped.
pub const MAX_CIDR_RANGES: usize = 3;

/// Ordered template parameter overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterSet {
    entries: Vec<(String, String)>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter; empty values are dropped.
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.entries.push((name.to_string(), value));
        }
    }

    /// Append a toggle serialized as a literal "true"/"false".
    pub fn push_bool(&mut self, name: &str, value: bool) {
        self.push(name, if value { "true" } else { "false" });
    }

    /// Append one resolved create-or-reuse endpoint. The identifier override
    /// is emitted only for the reuse outcome; emitting an identifier next to
    /// a create toggle would make the template reuse it, contradicting the
    /// toggle.
    pub fn push_endpoint(&mut self, toggle_name: &str, id_name: &str, resolved: &ResolvedEndpoint) {
        match resolved {
            ResolvedEndpoint::Create => self.push_bool(toggle_name, true),
            ResolvedEndpoint::Reuse(id) => {
                self.push_bool(toggle_name, false);
                self.push(id_name, id.clone());
            }
        }
    }

    /// Split a delimiter-flexible address-range list and append the first
    /// `MAX_CIDR_RANGES` entries as `Cidr1..CidrN`.
    pub fn push_cidrs(&mut self, raw: &str) {
        for (i, cidr) in split_cidr_list(raw).into_iter().enumerate() {
            self.push(&format!("Cidr{}", i + 1), cidr);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Render as `Key=Value` strings in insertion order.
    pub fn to_overrides(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect()
    }
}

/// Split an address-range list on commas and/or whitespace, collapsing
/// repeated separators and truncating silently past `MAX_CIDR_RANGES`.
pub fn split_cidr_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|entry| !entry.is_empty())
        .take(MAX_CIDR_RANGES)
        .map(str::to_string)
        .collect()
}
