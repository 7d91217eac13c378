//! Tags 256/25: the string-reference protocol. Tag 256 opens a namespace
//! around a subtree; inside that namespace, each distinct text/byte string
//! is recorded in encounter order and later occurrences are replaced with
//! tag 25 wrapping the string's index.
//!
//! A namespace is a stack (nested namespaces shadow but don't merge with
//! their parent's table), and only strings long enough that a reference is
//! smaller than the literal are worth emitting (left to the caller via
//! [`StringRefTable::should_reference`]).

use crate::error::{DecodeError, DecodeValueErrorKind};
use crate::value::Value;
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Namespace {
    entries: Vec<Value>,
}

/// Decoder-side stack of string-reference namespaces.
///
/// Every literal text/byte string decoded while a namespace is open gets
/// the next index in that namespace, whether or not it repeats an earlier
/// one — the table is an encounter-order log, not a dedup map. Only the
/// *encoder* decides whether a repeat is worth replacing with a tag-25
/// back-reference; a back-reference itself never adds a new entry.
#[derive(Debug, Default)]
pub struct StringRefTable {
    stack: Vec<Namespace>,
}

impl StringRefTable {
    pub fn new() -> Self {
        StringRefTable { stack: Vec::new() }
    }

    pub fn push_namespace(&mut self) {
        self.stack.push(Namespace::default());
    }

    pub fn pop_namespace(&mut self) {
        self.stack.pop();
    }

    pub fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Record a freshly decoded literal string/byte-string value in the
    /// innermost namespace, if any namespace is open.
    pub fn record(&mut self, value: &Value) {
        if let Some(ns) = self.stack.last_mut() {
            ns.entries.push(value.clone());
        }
    }

    pub fn resolve(&self, index: u64, offset: u64) -> Result<Value, DecodeError> {
        let ns = self
            .stack
            .last()
            .ok_or_else(|| DecodeError::value(offset, DecodeValueErrorKind::OutOfNamespace(index)))?;
        ns.entries
            .get(index as usize)
            .cloned()
            .ok_or_else(|| DecodeError::value(offset, DecodeValueErrorKind::ShareableNotFound(index)))
    }
}

/// Encoder-side table: per open namespace, a map from string bytes to the
/// index assigned on first encounter.
#[derive(Debug, Default)]
pub struct StringRefEncodeTable {
    stack: Vec<HashMap<Vec<u8>, usize>>,
}

impl StringRefEncodeTable {
    pub fn new() -> Self {
        StringRefEncodeTable { stack: Vec::new() }
    }

    pub fn push_namespace(&mut self) {
        self.stack.push(HashMap::new());
    }

    pub fn pop_namespace(&mut self) {
        self.stack.pop();
    }

    pub fn is_active(&self) -> bool {
        !self.stack.is_empty()
    }

    /// Returns `Some(index)` to emit a tag-25 backreference, or records
    /// the string under a fresh index and returns `None` to emit it
    /// literally.
    pub fn mark_or_lookup(&mut self, bytes: &[u8]) -> Option<usize> {
        let ns = self.stack.last_mut()?;
        if let Some(&index) = ns.get(bytes) {
            Some(index)
        } else {
            let next = ns.len();
            ns.insert(bytes.to_vec(), next);
            None
        }
    }

    /// Strings under this length never earn back a shorter encoding by
    /// referencing, so literal encoding is cheaper; mirrors the
    /// minimum-gain heuristic in the string-reference draft.
    pub fn should_reference(bytes: &[u8], index: usize) -> bool {
        let reference_cost =
            crate::head::encode_length(0xc0, 25).len() + crate::head::encode_length(0, index as u64).len();
        bytes.len() > reference_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_assigns_indices_in_order() {
        let mut table = StringRefTable::new();
        table.push_namespace();
        table.record(&Value::Text("hello".into()));
        table.record(&Value::Text("world".into()));
        table.record(&Value::Text("hello".into()));
        assert_eq!(table.resolve(0, 0).unwrap(), Value::Text("hello".into()));
        assert_eq!(table.resolve(1, 0).unwrap(), Value::Text("world".into()));
        assert_eq!(table.resolve(2, 0).unwrap(), Value::Text("hello".into()));
    }

    #[test]
    fn resolve_without_namespace_errors() {
        let table = StringRefTable::new();
        assert!(table.resolve(0, 0).is_err());
    }

    #[test]
    fn encoder_marks_repeats() {
        let mut table = StringRefEncodeTable::new();
        table.push_namespace();
        assert_eq!(table.mark_or_lookup(b"hello"), None);
        assert_eq!(table.mark_or_lookup(b"hello"), Some(0));
    }
}
