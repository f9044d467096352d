//! Fragment arena tracking every generated MQTT packet until its
//! PUBACK (or, for QoS 0, immediately) frees it.
//!
//! A chain is a sequence of fragments rather than one contiguous
//! `Vec<u8>` so a caller-supplied payload could in principle be
//! referenced in place (`PayloadOwner::CallerResponsibility`) instead
//! of copied into the arena alongside the codec's own header/property
//! bytes (`PayloadOwner::Owned`). `MqttCodec::generate_publish` does
//! not take that path today — see DESIGN.md's arena entry — so in the
//! live send path every chain is a single `Owned` fragment; `append`
//! and `CallerResponsibility` are exercised directly by this module's
//! own tests. Fragments are addressed by index into `slots`, never by
//! raw pointer, so indices stay valid across a `Vec` reallocation.

use crate::error::MqttError;

/// Who is responsible for a fragment's bytes outliving the packet.
pub enum PayloadOwner {
    /// Bytes copied into the arena; reclaimed on GC like everything else.
    Owned(Box<[u8]>),
    /// Bytes borrowed from a caller-supplied buffer that must remain
    /// valid until the packet has been fully written to the wire.
    CallerResponsibility(&'static [u8]),
}

impl PayloadOwner {
    fn as_slice(&self) -> &[u8] {
        match self {
            PayloadOwner::Owned(b) => b,
            PayloadOwner::CallerResponsibility(b) => b,
        }
    }

    fn len(&self) -> usize {
        self.as_slice().len()
    }
}

struct FragmentSlot {
    data: PayloadOwner,
    next: Option<usize>,
    /// Set once the fragment's bytes have been fully written to the
    /// wire; a GC pass reclaims only slots with `consumed == true`.
    consumed: bool,
}

/// A handle to the head of one fragment chain (one generated packet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHandle(usize);

/// Arena owning every live fragment chain. `Session`/`MqttCodec` hold
/// exactly one of these for the client's whole lifetime.
pub struct Arena {
    slots: Vec<FragmentSlot>,
    /// Reclaimed slot indices available for reuse before growing `slots`.
    free_list: Vec<usize>,
    in_transaction: bool,
    /// Slots allocated since the last `transaction_start`, so
    /// `transaction_rollback` can free exactly those and nothing else.
    transaction_log: Vec<usize>,
}

impl Arena {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            in_transaction: false,
            transaction_log: Vec::new(),
        }
    }

    fn alloc_slot(&mut self, data: PayloadOwner) -> usize {
        let slot = FragmentSlot {
            data,
            next: None,
            consumed: false,
        };
        let idx = if let Some(reused) = self.free_list.pop() {
            self.slots[reused] = slot;
            reused
        } else {
            self.slots.push(slot);
            self.slots.len() - 1
        };
        if self.in_transaction {
            self.transaction_log.push(idx);
        }
        idx
    }

    /// Starts a new chain with one fragment, returning its handle.
    pub fn new_chain(&mut self, data: PayloadOwner) -> ChainHandle {
        ChainHandle(self.alloc_slot(data))
    }

    /// Appends a fragment to the end of `chain`.
    pub fn append(&mut self, chain: ChainHandle, data: PayloadOwner) {
        let new_idx = self.alloc_slot(data);
        let mut cursor = chain.0;
        while let Some(next) = self.slots[cursor].next {
            cursor = next;
        }
        self.slots[cursor].next = Some(new_idx);
    }

    /// Total byte length of the chain starting at `chain`.
    pub fn chain_len(&self, chain: ChainHandle) -> usize {
        let mut len = 0;
        let mut cursor = Some(chain.0);
        while let Some(idx) = cursor {
            len += self.slots[idx].data.len();
            cursor = self.slots[idx].next;
        }
        len
    }

    /// Copies the whole chain into one contiguous buffer. Used at the
    /// point a packet is handed to the WebSocket layer for framing.
    pub fn flatten(&self, chain: ChainHandle) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.chain_len(chain));
        let mut cursor = Some(chain.0);
        while let Some(idx) = cursor {
            out.extend_from_slice(self.slots[idx].data.as_slice());
            cursor = self.slots[idx].next;
        }
        out
    }

    /// Marks every fragment in `chain` as written to the wire and
    /// therefore reclaimable. Called once a PUBLISH/PUBACK pair
    /// resolves (or immediately, for fire-and-forget packets like
    /// PINGREQ) — see spec.md property 5.
    pub fn mark_consumed(&mut self, chain: ChainHandle) {
        let mut cursor = Some(chain.0);
        while let Some(idx) = cursor {
            self.slots[idx].consumed = true;
            cursor = self.slots[idx].next;
        }
    }

    /// Fraction of allocated slots that are consumed and reclaimable,
    /// in `0.0..=1.0`.
    pub fn reclaimable_fraction(&self) -> f64 {
        if self.slots.is_empty() {
            return 0.0;
        }
        let consumed = self.slots.iter().filter(|s| s.consumed).count();
        consumed as f64 / self.slots.len() as f64
    }

    /// Runs a GC pass if at least a quarter of slots are reclaimable,
    /// compacting `slots` down and remapping `free_list`. Called by
    /// `Session::service()` once per tick; cheap no-op otherwise.
    pub fn gc_if_needed(&mut self) {
        if self.in_transaction || self.reclaimable_fraction() < 0.25 {
            return;
        }
        self.compact();
    }

    fn compact(&mut self) {
        let mut kept = Vec::with_capacity(self.slots.len());
        let mut remap = vec![None; self.slots.len()];
        for (old_idx, slot) in self.slots.drain(..).enumerate() {
            if slot.consumed {
                continue;
            }
            remap[old_idx] = Some(kept.len());
            kept.push(slot);
        }
        for slot in &mut kept {
            slot.next = slot.next.and_then(|n| remap[n]);
        }
        self.slots = kept;
        self.free_list.clear();
    }

    /// Begins a transaction: fragments allocated from here are rolled
    /// back together on `transaction_rollback` if packet generation
    /// fails partway through (e.g. a property encode error after the
    /// fixed header was already allocated).
    pub fn transaction_start(&mut self) {
        debug_assert!(!self.in_transaction, "nested transactions are not supported");
        self.in_transaction = true;
        self.transaction_log.clear();
    }

    pub fn transaction_commit(&mut self) {
        self.in_transaction = false;
        self.transaction_log.clear();
    }

    /// Frees every slot allocated since `transaction_start`.
    pub fn transaction_rollback(&mut self) {
        self.in_transaction = false;
        for idx in self.transaction_log.drain(..) {
            self.slots[idx].consumed = true;
            self.free_list.push(idx);
        }
    }

    /// Allocates a chain, running `build` to populate it; rolls back
    /// automatically if `build` returns an error.
    pub fn build_chain<F>(&mut self, build: F) -> Result<ChainHandle, MqttError>
    where
        F: FnOnce(&mut Arena) -> Result<ChainHandle, MqttError>,
    {
        self.transaction_start();
        match build(self) {
            Ok(handle) => {
                self.transaction_commit();
                Ok(handle)
            }
            Err(e) => {
                self.transaction_rollback();
                Err(e)
            }
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_append_and_flatten() {
        let mut arena = Arena::new();
        let chain = arena.new_chain(PayloadOwner::Owned(b"hello ".to_vec().into_boxed_slice()));
        arena.append(chain, PayloadOwner::Owned(b"world".to_vec().into_boxed_slice()));
        assert_eq!(arena.chain_len(chain), 11);
        assert_eq!(arena.flatten(chain), b"hello world");
    }

    #[test]
    fn gc_reclaims_only_past_quarter_threshold() {
        let mut arena = Arena::new();
        let a = arena.new_chain(PayloadOwner::Owned(vec![0u8; 4].into_boxed_slice()));
        let _b = arena.new_chain(PayloadOwner::Owned(vec![0u8; 4].into_boxed_slice()));
        let _c = arena.new_chain(PayloadOwner::Owned(vec![0u8; 4].into_boxed_slice()));
        let _d = arena.new_chain(PayloadOwner::Owned(vec![0u8; 4].into_boxed_slice()));
        arena.mark_consumed(a);
        assert_eq!(arena.reclaimable_fraction(), 0.25);
        arena.gc_if_needed();
        assert_eq!(arena.slots.len(), 3);
    }

    #[test]
    fn rollback_frees_partial_chain() {
        let mut arena = Arena::new();
        let result: Result<ChainHandle, MqttError> = arena.build_chain(|a| {
            let _chain = a.new_chain(PayloadOwner::Owned(b"ok".to_vec().into_boxed_slice()));
            Err(MqttError::MessageTooBig)
        });
        assert!(result.is_err());
        assert_eq!(arena.reclaimable_fraction(), 1.0);
    }

    #[test]
    fn caller_responsibility_payload_is_not_copied() {
        static PAYLOAD: &[u8] = b"static-bytes";
        let mut arena = Arena::new();
        let chain = arena.new_chain(PayloadOwner::CallerResponsibility(PAYLOAD));
        assert_eq!(arena.flatten(chain), PAYLOAD);
    }
}
