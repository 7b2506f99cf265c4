// Sequence evaluator: does one (permutation, operator sequence, constant)
// candidate reproduce every expected checksum in the dataset?
//
// This is the innermost hot path of the whole system: a search calls it
// once per enumerated sequence, i.e. up to billions of times. It performs
// no allocation, no locking, and no I/O; all synchronization lives in the
// worker loop around it.

use crate::dataset::{Dataset, Packet};
use crate::ops::{ArityClass, Op};

// ---------------------------------------------------------------------------
// Extraction and masking
// ---------------------------------------------------------------------------

/// Mask a value to `size` bytes; `size == 8` leaves it unchanged.
#[inline(always)]
pub fn mask_to_size(value: u64, size: usize) -> u64 {
    if size >= 8 {
        value
    } else {
        value & ((1u64 << (size * 8)) - 1)
    }
}

/// Read up to `size` bytes of `bytes` starting at `index`, packed
/// big-endian. Fewer bytes are read when the packet ends first; there is no
/// padding.
#[inline(always)]
pub fn extract_field(bytes: &[u8], index: usize, size: usize) -> u64 {
    let end = (index + size.max(1)).min(bytes.len());
    let mut value = 0u64;
    for &byte in &bytes[index..end] {
        value = (value << 8) | byte as u64;
    }
    value
}

// ---------------------------------------------------------------------------
// Field cache
// ---------------------------------------------------------------------------

/// Pre-extracted `packet × field_index → value` table, replacing the inline
/// `extract_field` call with an array read. Valid for one (dataset,
/// checksum size) pair; read-only during the search.
#[derive(Debug)]
pub struct FieldCache {
    values: Vec<u64>,
    width: usize,
}

impl FieldCache {
    /// Precompute field values for indices `0..dataset.min_packet_len()`.
    pub fn build(dataset: &Dataset, checksum_size: usize) -> FieldCache {
        let width = dataset.min_packet_len();
        let mut values = Vec::with_capacity(dataset.len() * width);
        for packet in dataset.packets() {
            for index in 0..width {
                values.push(extract_field(packet.bytes(), index, checksum_size));
            }
        }
        FieldCache { values, width }
    }

    #[inline(always)]
    fn get(&self, packet_index: usize, field_index: usize) -> u64 {
        self.values[packet_index * self.width + field_index]
    }

    #[inline(always)]
    fn covers(&self, field_index: usize) -> bool {
        field_index < self.width
    }
}

// ---------------------------------------------------------------------------
// Evaluator
// ---------------------------------------------------------------------------

/// Evaluates candidate sequences against a dataset at a fixed checksum
/// width, optionally through a pre-built field cache.
pub struct Evaluator<'a> {
    dataset: &'a Dataset,
    checksum_size: usize,
    cache: Option<FieldCache>,
}

impl<'a> Evaluator<'a> {
    pub fn new(dataset: &'a Dataset, checksum_size: usize) -> Evaluator<'a> {
        Evaluator {
            dataset,
            checksum_size,
            cache: None,
        }
    }

    /// Same evaluator, with the field-extraction cache built up front.
    pub fn with_cache(dataset: &'a Dataset, checksum_size: usize) -> Evaluator<'a> {
        Evaluator {
            dataset,
            checksum_size,
            cache: Some(FieldCache::build(dataset, checksum_size)),
        }
    }

    pub fn checksum_size(&self) -> usize {
        self.checksum_size
    }

    #[inline(always)]
    fn field_value(&self, packet_index: usize, packet: &Packet, field_index: usize) -> u64 {
        match &self.cache {
            Some(cache) if cache.covers(field_index) => cache.get(packet_index, field_index),
            _ => extract_field(packet.bytes(), field_index, self.checksum_size),
        }
    }

    /// True iff executing `ops` over `perm` with `constant` reproduces the
    /// expected checksum of every packet.
    ///
    /// Per packet: the live value starts as the first field; unary operators
    /// transform it in place, const-using operators fold in the constant,
    /// binary operators consume the next field of the permutation and stop
    /// the sequence early once fields run out. The result is masked to the
    /// checksum width and compared against the (equally masked) expectation.
    pub fn evaluate(&self, perm: &[u8], ops: &[Op], constant: u64) -> bool {
        if perm.is_empty() {
            return false;
        }
        for (packet_index, packet) in self.dataset.packets().iter().enumerate() {
            if packet.checksum_size() != self.checksum_size {
                return false;
            }
            if perm.iter().any(|&f| f as usize >= packet.len()) {
                return false;
            }

            let mut live = self.field_value(packet_index, packet, perm[0] as usize);
            let mut next_field = 1usize;
            for &op in ops {
                match op.arity() {
                    ArityClass::Unary => live = op.apply(live, 0, 0),
                    ArityClass::ConstUsing => live = op.apply(live, 0, constant),
                    ArityClass::Binary => {
                        if next_field >= perm.len() {
                            break;
                        }
                        let b = self.field_value(packet_index, packet, perm[next_field] as usize);
                        live = op.apply(live, b, 0);
                        next_field += 1;
                    }
                }
            }

            let calculated = mask_to_size(live, self.checksum_size);
            let expected = mask_to_size(packet.expected_checksum(), self.checksum_size);
            if calculated != expected {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
