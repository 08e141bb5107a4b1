//! Ordered registry of enrolled identities with stable classifier labels.
//!
//! Each identity gets an integer label from an append-only counter.
//! Labels are never reused after deletion, so a delete followed by a
//! new enrollment cannot silently inherit the freed label and
//! misattribute old training data.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub label: u32,
    pub identity: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityRegistry {
    entries: Vec<RegistryEntry>,
    next_label: u32,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.entries.iter().any(|e| e.identity == identity)
    }

    pub fn label_of(&self, identity: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|e| e.identity == identity)
            .map(|e| e.label)
    }

    pub fn identity_of(&self, label: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.identity.as_str())
    }

    /// Identities in enrollment order.
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.identity.as_str())
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Register a new identity under the next stable label. Returns
    /// `None` without mutating anything if the identity already exists.
    pub fn register(&mut self, identity: &str) -> Option<u32> {
        if self.contains(identity) {
            return None;
        }
        let label = self.next_label;
        self.next_label += 1;
        self.entries.push(RegistryEntry {
            label,
            identity: identity.to_string(),
        });
        Some(label)
    }

    /// Remove an identity, returning its label. The label stays
    /// retired; `next_label` never moves backwards.
    pub fn remove(&mut self, identity: &str) -> Option<u32> {
        let pos = self.entries.iter().position(|e| e.identity == identity)?;
        Some(self.entries.remove(pos).label)
    }
}
