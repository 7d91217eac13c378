//! Tags 28/29: the value-sharing protocol, used both to deduplicate
//! repeated container values and to carry genuine cycles.
//!
//! On decode, a slot is reserved and marked shareable *before* its children
//! are decoded, so a self-reference encountered while decoding those
//! children resolves to the same, still-being-built container. On encode,
//! containers are keyed by identity (`Rc::as_ptr`), and a repeat identity
//! emits a tag-29 back-reference instead of re-encoding.

use crate::error::{DecodeError, DecodeValueErrorKind};
use crate::value::Value;
use std::collections::HashMap;

/// Decoder-side table of shareable slots, indexed by share id in
/// encounter order.
#[derive(Debug, Default)]
pub struct ShareableTable {
    slots: Vec<Option<Value>>,
}

impl ShareableTable {
    pub fn new() -> Self {
        ShareableTable { slots: Vec::new() }
    }

    /// Reserve the next slot, returning its index. Call before decoding
    /// the children of the value this slot will hold.
    pub fn reserve(&mut self) -> usize {
        let index = self.slots.len();
        self.slots.push(None);
        index
    }

    /// Fill a previously reserved slot once the container identity is
    /// known (the `Rc` has been allocated, even if not yet populated).
    pub fn fill(&mut self, index: usize, value: Value) {
        self.slots[index] = Some(value);
    }

    pub fn resolve(&self, index: u64, offset: u64) -> Result<Value, DecodeError> {
        let slot = self
            .slots
            .get(index as usize)
            .ok_or_else(|| DecodeError::value(offset, DecodeValueErrorKind::ShareableNotFound(index)))?;
        slot.clone()
            .ok_or_else(|| DecodeError::value(offset, DecodeValueErrorKind::ShareableNotInitialized(index)))
    }
}

/// Encoder-side identity table mapping a container's address to the index
/// it was first assigned. Containers are looked up by `Rc::as_ptr`, which
/// is stable for the container's lifetime and distinguishes separately
/// allocated but value-equal containers, matching Python's `id()`-keyed
/// `container_indexes` map.
#[derive(Debug, Default)]
pub struct ContainerIndexes {
    seen: HashMap<usize, usize>,
}

impl ContainerIndexes {
    pub fn new() -> Self {
        ContainerIndexes { seen: HashMap::new() }
    }

    /// Returns `Some(index)` if this identity was already assigned an
    /// index (caller should emit a tag-29 backreference), or `None` after
    /// assigning it a fresh index (caller should emit tag 28 and encode
    /// the container body).
    pub fn mark_or_lookup(&mut self, identity: usize) -> Option<usize> {
        if let Some(&index) = self.seen.get(&identity) {
            Some(index)
        } else {
            let next = self.seen.len();
            self.seen.insert(identity, next);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn reserve_then_fill_then_resolve() {
        let mut table = ShareableTable::new();
        let idx = table.reserve();
        table.fill(idx, Value::Int(42));
        assert_eq!(table.resolve(idx as u64, 0).unwrap(), Value::Int(42));
    }

    #[test]
    fn resolving_uninitialized_slot_errors() {
        let mut table = ShareableTable::new();
        let idx = table.reserve();
        assert!(table.resolve(idx as u64, 0).is_err());
    }

    #[test]
    fn resolving_out_of_range_errors() {
        let table = ShareableTable::new();
        assert!(table.resolve(0, 0).is_err());
    }

    #[test]
    fn container_indexes_assigns_then_finds() {
        let mut table = ContainerIndexes::new();
        assert_eq!(table.mark_or_lookup(0x1000), None);
        assert_eq!(table.mark_or_lookup(0x1000), Some(0));
        assert_eq!(table.mark_or_lookup(0x2000), None);
        assert_eq!(table.mark_or_lookup(0x2000), Some(1));
    }
}
