//! Dictionaries (`HashmapE n X`) keyed by fixed-width unsigned integers.
//!
//! ```text
//! hme_empty$0 {n:#} {X:Type} = HashmapE n X;
//! hme_root$1 {n:#} {X:Type} root:^(Hashmap n X) = HashmapE n X;
//!
//! hm_edge#_ {n:#} {X:Type} {l:#} {m:#} label:(HmLabel ~l n)
//!           {n = (~m) + l} node:(HashmapNode m X) = Hashmap n X;
//! hmn_leaf#_ {X:Type} value:X = HashmapNode 0 X;
//! hmn_fork#_ {n:#} {X:Type} left:^(Hashmap n X)
//!            right:^(Hashmap n X) = HashmapNode (n + 1) X;
//!
//! hml_short$0 {m:#} {n:#} len:(Unary ~n) {n <= m} s:(n * Bit) = HmLabel ~n m;
//! hml_long$10 {m:#} n:(#<= m) s:(n * Bit) = HmLabel ~n m;
//! hml_same$11 {m:#} v:Bit n:(#<= m) = HmLabel ~n m;
//! ```
//!
//! Each edge uses the shortest label form, preferring short, then long,
//! then same on ties. This matches the network's reference serializer, so
//! the same entries always produce the same root hash.

use std::collections::BTreeMap;

use tracing::trace;

use crate::{Cell, CellBuilder, CellError, CellResult, CellSlice};

/// A value that can sit in a dictionary leaf.
pub trait DictValue: Sized {
    /// Write the value into the leaf after the edge label.
    fn store_value(&self, builder: &mut CellBuilder) -> CellResult<()>;

    /// Read the value back from a leaf.
    fn load_value(slice: &mut CellSlice<'_>) -> CellResult<Self>;
}

/// Sparse integer-keyed map serialized as `HashmapE key_bits V`.
///
/// # Example
///
/// ```
/// use cookie_cell::{CellBuilder, CellResult, CellSlice, DictValue, Dictionary};
///
/// struct Flag(bool);
///
/// impl DictValue for Flag {
///     fn store_value(&self, builder: &mut CellBuilder) -> CellResult<()> {
///         builder.store_bit(self.0)?;
///         Ok(())
///     }
///     fn load_value(slice: &mut CellSlice<'_>) -> CellResult<Self> {
///         Ok(Flag(slice.load_bit()?))
///     }
/// }
///
/// let mut dict = Dictionary::new(64).unwrap();
/// dict.insert(7, Flag(true)).unwrap();
/// let root = dict.build_root().unwrap().unwrap();
/// let parsed = Dictionary::<Flag>::load_root(&root, 64).unwrap();
/// assert!(parsed.get(7).unwrap().0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary<V> {
    key_bits: usize,
    entries: BTreeMap<u64, V>,
}

impl<V: DictValue> Dictionary<V> {
    /// Create an empty dictionary with `key_bits`-wide keys (1..=64).
    pub fn new(key_bits: usize) -> CellResult<Self> {
        if key_bits == 0 || key_bits > 64 {
            return Err(CellError::InvalidBitLength(key_bits));
        }
        Ok(Dictionary {
            key_bits,
            entries: BTreeMap::new(),
        })
    }

    /// Key width in bits.
    pub fn key_bits(&self) -> usize {
        self.key_bits
    }

    /// Insert a value, returning the one previously stored under `key`.
    pub fn insert(&mut self, key: u64, value: V) -> CellResult<Option<V>> {
        if key & !mask(self.key_bits) != 0 {
            return Err(CellError::InvalidDictKey {
                key,
                bits: self.key_bits,
            });
        }
        Ok(self.entries.insert(key, value))
    }

    pub fn get(&self, key: u64) -> Option<&V> {
        self.entries.get(&key)
    }

    pub fn contains_key(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Build the root `Hashmap` cell; `None` for an empty dictionary.
    pub fn build_root(&self) -> CellResult<Option<Cell>> {
        if self.entries.is_empty() {
            return Ok(None);
        }
        let entries: Vec<(u64, &V)> = self.iter().collect();
        let root = build_edge(&entries, self.key_bits)?;
        trace!(
            "Built dictionary: {} entries, root depth {}",
            entries.len(),
            root.depth()
        );
        Ok(Some(root))
    }

    /// Store as `HashmapE`: a 0 bit when empty, else a 1 bit and the root ref.
    pub fn store(&self, builder: &mut CellBuilder) -> CellResult<()> {
        builder.store_maybe_ref(self.build_root()?)?;
        Ok(())
    }

    /// Load a `HashmapE` from the slice.
    pub fn load(slice: &mut CellSlice<'_>, key_bits: usize) -> CellResult<Self> {
        match slice.load_maybe_ref()? {
            Some(root) => Self::load_root(root, key_bits),
            None => Self::new(key_bits),
        }
    }

    /// Parse a root `Hashmap` cell.
    pub fn load_root(root: &Cell, key_bits: usize) -> CellResult<Self> {
        let mut dict = Self::new(key_bits)?;
        parse_edge(root, key_bits, 0, &mut dict.entries)?;
        Ok(dict)
    }
}

/// Low `bits` bits set.
fn mask(bits: usize) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

/// Width of the `#<= m` length field.
fn len_bits(m: usize) -> usize {
    (usize::BITS - m.leading_zeros()) as usize
}

/// Build one `hm_edge` for `entries`, whose keys carry `m` significant bits.
fn build_edge<V: DictValue>(entries: &[(u64, &V)], m: usize) -> CellResult<Cell> {
    let mut builder = CellBuilder::new();

    if let [(key, value)] = entries {
        store_label(&mut builder, key & mask(m), m, m)?;
        value.store_value(&mut builder)?;
        return builder.build();
    }

    // Keys are sorted, so the first and last share the common prefix of all.
    let first = entries[0].0 & mask(m);
    let last = entries[entries.len() - 1].0 & mask(m);
    let diff = first ^ last;
    let prefix_len = diff.leading_zeros() as usize - (64 - m);

    let rest = m - prefix_len;
    // rest is 64 when a 64-bit fork splits on the top bit
    let label = first.checked_shr(rest as u32).unwrap_or(0);
    store_label(&mut builder, label, prefix_len, m)?;

    let child_bits = rest - 1;
    let split = entries.partition_point(|(key, _)| (key >> child_bits) & 1 == 0);
    let (left, right) = entries.split_at(split);
    builder.store_ref(build_edge(left, child_bits)?)?;
    builder.store_ref(build_edge(right, child_bits)?)?;

    builder.build()
}

/// Store `HmLabel ~len m` for the low `len` bits of `label`.
fn store_label(builder: &mut CellBuilder, label: u64, len: usize, m: usize) -> CellResult<()> {
    let k = len_bits(m);
    let short_len = 2 + 2 * len;
    let long_len = 2 + k + len;
    let same_len = 3 + k;
    let same_bit = if label == 0 {
        Some(false)
    } else if label == mask(len) {
        Some(true)
    } else {
        None
    };

    let mut best = short_len;
    let mut use_long = false;
    if long_len < best {
        best = long_len;
        use_long = true;
    }

    match same_bit {
        Some(v) if same_len < best => {
            builder.store_bits(&[true, true, v])?;
            builder.store_uint(len as u64, k)?;
        }
        _ if use_long => {
            builder.store_bits(&[true, false])?;
            builder.store_uint(len as u64, k)?;
            builder.store_uint(label, len)?;
        }
        _ => {
            builder.store_bit(false)?;
            for _ in 0..len {
                builder.store_bit(true)?;
            }
            builder.store_bit(false)?;
            builder.store_uint(label, len)?;
        }
    }
    Ok(())
}

/// Parse one `hm_edge` whose keys have `m` bits left below `prefix`.
fn parse_edge<V: DictValue>(
    cell: &Cell,
    m: usize,
    prefix: u64,
    out: &mut BTreeMap<u64, V>,
) -> CellResult<()> {
    let mut slice = CellSlice::new(cell);
    let (label, len) = load_label(&mut slice, m)?;
    let key = if len == 64 { label } else { (prefix << len) | label };

    if len == m {
        let value = V::load_value(&mut slice)?;
        if out.insert(key, value).is_some() {
            return Err(CellError::InvalidDict(format!("Duplicate key {}", key)));
        }
        return Ok(());
    }

    let child_bits = m - len - 1;
    let left = slice.load_ref()?;
    let right = slice.load_ref()?;
    parse_edge(left, child_bits, key << 1, out)?;
    parse_edge(right, child_bits, (key << 1) | 1, out)
}

fn load_label(slice: &mut CellSlice<'_>, m: usize) -> CellResult<(u64, usize)> {
    let k = len_bits(m);

    let (label, len) = if !slice.load_bit()? {
        let mut len = 0;
        while slice.load_bit()? {
            len += 1;
            if len > m {
                return Err(CellError::InvalidDict(format!("Label longer than {} bits", m)));
            }
        }
        (slice.load_uint(len)?, len)
    } else if !slice.load_bit()? {
        let len = slice.load_uint(k)? as usize;
        if len > m {
            return Err(CellError::InvalidDict(format!("Label longer than {} bits", m)));
        }
        (slice.load_uint(len)?, len)
    } else {
        let bit = slice.load_bit()?;
        let len = slice.load_uint(k)? as usize;
        if len > m {
            return Err(CellError::InvalidDict(format!("Label longer than {} bits", m)));
        }
        (if bit { mask(len) } else { 0 }, len)
    };

    Ok((label, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Word(u16);

    impl DictValue for Word {
        fn store_value(&self, builder: &mut CellBuilder) -> CellResult<()> {
            builder.store_u16(self.0)?;
            Ok(())
        }

        fn load_value(slice: &mut CellSlice<'_>) -> CellResult<Self> {
            Ok(Word(slice.load_u16()?))
        }
    }

    #[test]
    fn test_invalid_key_width() {
        assert!(Dictionary::<Word>::new(0).is_err());
        assert!(Dictionary::<Word>::new(65).is_err());

        let mut dict = Dictionary::new(8).unwrap();
        assert!(matches!(
            dict.insert(256, Word(1)),
            Err(CellError::InvalidDictKey { key: 256, bits: 8 })
        ));
    }

    #[test]
    fn test_empty_dict_is_single_zero_bit() {
        let dict = Dictionary::<Word>::new(64).unwrap();
        let mut builder = CellBuilder::new();
        dict.store(&mut builder).unwrap();
        let cell = builder.build().unwrap();
        assert_eq!(cell.bit_len(), 1);
        assert_eq!(cell.reference_count(), 0);

        let loaded = Dictionary::<Word>::load(&mut CellSlice::new(&cell), 64).unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_single_entry_uses_long_label() {
        let mut dict = Dictionary::new(64).unwrap();
        dict.insert(5, Word(0xABCD)).unwrap();
        let root = dict.build_root().unwrap().unwrap();

        // hml_long$10, len:7 bits = 64, 64 key bits, 16 value bits
        assert_eq!(root.bit_len(), 2 + 7 + 64 + 16);
        let mut slice = CellSlice::new(&root);
        assert_eq!(slice.load_uint(2).unwrap(), 0b10);
        assert_eq!(slice.load_uint(7).unwrap(), 64);
        assert_eq!(slice.load_u64().unwrap(), 5);
        assert_eq!(slice.load_u16().unwrap(), 0xABCD);
    }

    #[test]
    fn test_fork_layout() {
        let mut dict = Dictionary::new(8).unwrap();
        dict.insert(1, Word(10)).unwrap();
        dict.insert(3, Word(30)).unwrap();
        let root = dict.build_root().unwrap().unwrap();

        // Common prefix 000000 encoded as hml_same$11 v=0 n=6 (4-bit length).
        assert_eq!(root.bit_len(), 7);
        assert_eq!(root.data(), &[0b1100_1100]);
        assert_eq!(root.reference_count(), 2);

        // Each child keeps one key bit: hml_short$0 len=1 ("10") bit 1.
        let mut left = CellSlice::new(root.reference(0).unwrap());
        assert_eq!(left.load_uint(4).unwrap(), 0b0101);
        assert_eq!(left.load_u16().unwrap(), 10);
        let mut right = CellSlice::new(root.reference(1).unwrap());
        assert_eq!(right.load_uint(4).unwrap(), 0b0101);
        assert_eq!(right.load_u16().unwrap(), 30);
    }

    #[test]
    fn test_roundtrip_many_keys() {
        let mut dict = Dictionary::new(64).unwrap();
        for i in 0..250u64 {
            dict.insert(i * 7919, Word(i as u16)).unwrap();
        }
        dict.insert(u64::MAX, Word(0xFFFF)).unwrap();

        let mut builder = CellBuilder::new();
        dict.store(&mut builder).unwrap();
        let cell = builder.build().unwrap();

        let loaded = Dictionary::<Word>::load(&mut CellSlice::new(&cell), 64).unwrap();
        assert_eq!(loaded, dict);
    }

    #[test]
    fn test_top_bit_split_at_root() {
        let mut dict = Dictionary::new(64).unwrap();
        dict.insert(1, Word(1)).unwrap();
        dict.insert(1u64 << 63, Word(2)).unwrap();
        let root = dict.build_root().unwrap().unwrap();

        // empty root label, then one fork per top-bit value
        let mut slice = CellSlice::new(&root);
        assert_eq!(slice.load_uint(2).unwrap(), 0b00);
        assert_eq!(root.reference_count(), 2);

        let mut builder = CellBuilder::new();
        dict.store(&mut builder).unwrap();
        let cell = builder.build().unwrap();
        let loaded = Dictionary::<Word>::load(&mut CellSlice::new(&cell), 64).unwrap();
        assert_eq!(loaded, dict);
        assert_eq!(loaded.get(1u64 << 63), Some(&Word(2)));
    }

    #[test]
    fn test_same_entries_same_hash() {
        let mut a = Dictionary::new(16).unwrap();
        let mut b = Dictionary::new(16).unwrap();
        for k in [9u64, 2, 700, 41] {
            a.insert(k, Word(k as u16)).unwrap();
        }
        for k in [41u64, 700, 2, 9] {
            b.insert(k, Word(k as u16)).unwrap();
        }
        assert_eq!(
            a.build_root().unwrap().unwrap().hash(),
            b.build_root().unwrap().unwrap().hash()
        );
    }
}
