use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::marker::PhantomData;
use core::ops::Range;

use crate::cursor::Cursor;
use crate::error::SetError;

/// Load factor used when none is given.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Capacity used by `new()` constructors.
pub const DEFAULT_INITIAL_CAPACITY: usize = 8;

/// Number of entries a freshly promoted chain has room for.
const CHAIN_INITIAL_CAPACITY: usize = 4;

/// Folds the high bits of a 64-bit hash into the bits selected by the
/// slot mask, so strategies with weak low bits still spread over the table.
#[inline(always)]
fn spread(hash: u64) -> usize {
    let h = hash ^ (hash >> 32);
    let h = h ^ (h >> 20) ^ (h >> 12);
    (h ^ (h >> 7) ^ (h >> 4)) as usize
}

#[inline(always)]
fn threshold_for(slot_count: usize, load_factor: f32) -> usize {
    (slot_count as f64 * load_factor as f64).floor() as usize
}

/// Smallest power-of-two slot count whose threshold admits `capacity`
/// elements, or `None` if it does not fit in `usize`.
fn slot_count_for(capacity: usize, load_factor: f32) -> Option<usize> {
    let required = (capacity as f64 / load_factor as f64).ceil();
    if required > (1usize << (usize::BITS - 1)) as f64 {
        return None;
    }

    let mut slot_count = (required as usize).max(1).checked_next_power_of_two()?;
    while threshold_for(slot_count, load_factor) < capacity {
        slot_count = slot_count.checked_mul(2)?;
    }
    Some(slot_count)
}

fn validate_load_factor(load_factor: f32) -> Result<(), SetError> {
    // Written so that NaN is rejected.
    if load_factor > 0.0 && load_factor <= 1.0 {
        Ok(())
    } else {
        Err(SetError::InvalidLoadFactor(load_factor))
    }
}

fn empty_slots<T>(slot_count: usize) -> Box<[Slot<T>]> {
    (0..slot_count).map(|_| Slot::Empty).collect()
}

#[derive(Clone)]
pub(crate) struct Stored<T> {
    hash: u64,
    value: T,
}

/// One addressable position of the table.
///
/// A chain always holds at least two entries; removing down to one entry
/// demotes it back to `Single`.
#[derive(Clone)]
pub(crate) enum Slot<T> {
    Empty,
    Single(Stored<T>),
    Chain(Vec<Stored<T>>),
}

impl<T> Slot<T> {
    #[inline]
    fn entries(&self) -> &[Stored<T>] {
        match self {
            Slot::Empty => &[],
            Slot::Single(stored) => core::slice::from_ref(stored),
            Slot::Chain(chain) => chain,
        }
    }

    #[inline]
    fn entries_mut(&mut self) -> &mut [Stored<T>] {
        match self {
            Slot::Empty => &mut [],
            Slot::Single(stored) => core::slice::from_mut(stored),
            Slot::Chain(chain) => chain,
        }
    }

    #[inline]
    fn len(&self) -> usize {
        match self {
            Slot::Empty => 0,
            Slot::Single(_) => 1,
            Slot::Chain(chain) => chain.len(),
        }
    }

    /// Appends an entry, promoting the slot to a chain on collision.
    ///
    /// Returns `true` if the slot was promoted from `Single` to `Chain`.
    fn push(&mut self, stored: Stored<T>) -> bool {
        match core::mem::replace(self, Slot::Empty) {
            Slot::Empty => {
                *self = Slot::Single(stored);
                false
            }
            Slot::Single(first) => {
                let mut chain = Vec::with_capacity(CHAIN_INITIAL_CAPACITY);
                chain.push(first);
                chain.push(stored);
                *self = Slot::Chain(chain);
                true
            }
            Slot::Chain(mut chain) => {
                if chain.len() == chain.capacity() {
                    chain.reserve_exact(chain.capacity());
                }
                chain.push(stored);
                *self = Slot::Chain(chain);
                false
            }
        }
    }

    /// Removes the entry at `offset`, moving the trailing entry of the chain
    /// into its place.
    ///
    /// The caller must pass an `offset` smaller than `self.len()`.
    fn swap_remove(&mut self, offset: usize) -> Stored<T> {
        debug_assert!(offset < self.len());
        match core::mem::replace(self, Slot::Empty) {
            Slot::Single(stored) => stored,
            Slot::Chain(mut chain) => {
                let removed = chain.swap_remove(offset);
                if chain.len() == 1 {
                    if let Some(last) = chain.pop() {
                        log::trace!("demoting chain to a single entry");
                        *self = Slot::Single(last);
                    }
                } else {
                    *self = Slot::Chain(chain);
                }
                removed
            }
            Slot::Empty => unreachable!("removal from an empty slot"),
        }
    }
}

/// Debug statistics for chain and slot analysis.
///
/// Requires the `stats` feature.
#[cfg(feature = "stats")]
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table, null included
    pub populated: usize,
    /// Maximum population before the table grows
    pub threshold: usize,
    /// Total number of slots allocated
    pub total_slots: usize,
    /// Number of slots holding at least one element
    pub occupied_slots: usize,
    /// Number of slots holding a chain
    pub chained_slots: usize,
    /// Number of elements living in chains
    pub chained_entries: usize,
    /// Length of the longest chain
    pub longest_chain: usize,
    /// Configured load factor
    pub load_factor: f32,
    /// Slot utilization (occupied_slots / total_slots)
    pub slot_utilization: f64,
    /// Approximate bytes owned by the slot array and its chains
    pub total_bytes: usize,
}

#[cfg(feature = "stats")]
impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Chained Table Debug Statistics ===");
        println!(
            "Population: {}/{} (load factor {:.2})",
            self.populated, self.threshold, self.load_factor
        );
        println!(
            "Slot Usage: {}/{} ({:.2}% utilization)",
            self.occupied_slots,
            self.total_slots,
            self.slot_utilization * 100.0
        );
        println!(
            "Chains: {} slots holding {} entries (longest {})",
            self.chained_slots, self.chained_entries, self.longest_chain
        );
        println!("Total Allocated: {} bytes", self.total_bytes);
    }
}

/// Histogram of slot lengths: bin `n` counts the slots holding `n` entries.
///
/// Requires the `stats` feature.
#[cfg(feature = "stats")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainHistogram {
    /// Slot counts indexed by number of entries in the slot.
    pub bins: Vec<usize>,
}

#[cfg(feature = "stats")]
impl ChainHistogram {
    /// Pretty-prints the histogram horizontally using stdout.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.bins.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("chain histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!("chain histogram ({} slots):", self.bins.iter().sum::<usize>());

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = ['▏', '▎', '▍', '▌', '▋', '▊', '▉'];
            if units % 8 > 0 {
                bar.push(partial[units % 8 - 1]);
            }
            bar
        };

        for (len, &count) in self.bins.iter().enumerate() {
            println!("{:>3} | {} ({})", len, make_bar(count), count);
        }
    }
}

/// A resizable hash table that resolves collisions by chaining entries
/// inside their home slot.
///
/// `ChainedTable<T>` stores values of type `T` and leaves hashing and
/// equality to the caller: every operation takes a precomputed hash plus an
/// equality predicate. [`UnifiedSet`](crate::UnifiedSet) wraps it with a
/// [`HashingStrategy`](crate::HashingStrategy).
///
/// The table additionally tracks a single null element in a flag. Null
/// never occupies a slot, is homed on slot 0 for partitioning purposes, and
/// is yielded as `None` by iterators.
///
/// ## Layout
///
/// - The slot array length is always a power of two.
/// - A slot is empty, holds one entry, or holds a chain of two or more
///   colliding entries.
/// - Every entry keeps its 64-bit hash, so growing the table never calls
///   back into hashing code and lookups reject most non-matches without
///   running the equality predicate.
///
/// ## Example
///
/// ```rust
/// # use unified_set::hash_table::ChainedTable;
/// # use unified_set::hash_table::Entry;
/// #
/// let mut table = ChainedTable::new();
///
/// // Deliberately colliding hashes end up chained in one slot.
/// for word in ["alpha", "beta", "gamma"] {
///     match table.entry(7, |w: &&str| *w == word) {
///         Entry::Vacant(entry) => {
///             entry.insert(word);
///         }
///         Entry::Occupied(_) => unreachable!(),
///     }
/// }
///
/// assert_eq!(table.len(), 3);
/// assert_eq!(table.find(7, |w| *w == "beta"), Some(&"beta"));
/// ```
#[derive(Clone)]
pub struct ChainedTable<T> {
    slots: Box<[Slot<T>]>,
    populated: usize,
    threshold: usize,
    load_factor: f32,
    has_null: bool,
}

impl<T> Debug for ChainedTable<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::format;
        use alloc::string::String;

        let layout = self
            .slots
            .chunks(16)
            .map(|row| {
                row.iter()
                    .map(|slot| match slot {
                        Slot::Empty => String::from(".."),
                        Slot::Single(_) => String::from("01"),
                        Slot::Chain(chain) => format!("{:02}", chain.len()),
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .collect::<Vec<_>>();

        f.debug_struct("ChainedTable")
            .field("slots", &layout)
            .field("populated", &self.populated)
            .field("threshold", &self.threshold)
            .field("load_factor", &self.load_factor)
            .field("has_null", &self.has_null)
            .finish()
    }
}

impl<T> Default for ChainedTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ChainedTable<T> {
    /// Creates an empty table with the default capacity and load factor.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_INITIAL_CAPACITY)
    }

    /// Creates a table that can hold at least `capacity` elements without
    /// growing, using the default load factor.
    ///
    /// # Panics
    ///
    /// Panics if the required slot count overflows `usize`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use unified_set::hash_table::ChainedTable;
    /// #
    /// let table: ChainedTable<String> = ChainedTable::with_capacity(100);
    /// assert!(table.threshold() >= 100);
    /// assert!(table.slot_count().is_power_of_two());
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_load_factor(capacity, DEFAULT_LOAD_FACTOR)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Creates a table that can hold at least `capacity` elements without
    /// growing while keeping `len <= slot_count * load_factor`.
    ///
    /// Fails with [`SetError::InvalidLoadFactor`] unless `load_factor` is in
    /// `(0, 1]` and large enough for a single element to fit in an
    /// addressable table, and with [`SetError::CapacityOverflow`] if the slot
    /// count would not fit in `usize`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use unified_set::hash_table::ChainedTable;
    /// # use unified_set::SetError;
    /// #
    /// let table: ChainedTable<u32> = ChainedTable::with_capacity_and_load_factor(6, 0.5).unwrap();
    /// assert_eq!(table.slot_count(), 16);
    /// assert_eq!(table.threshold(), 8);
    ///
    /// assert_eq!(
    ///     ChainedTable::<u32>::with_capacity_and_load_factor(6, 1.5).unwrap_err(),
    ///     SetError::InvalidLoadFactor(1.5)
    /// );
    /// ```
    pub fn with_capacity_and_load_factor(
        capacity: usize,
        load_factor: f32,
    ) -> Result<Self, SetError> {
        validate_load_factor(load_factor)?;
        let slot_count =
            slot_count_for(capacity, load_factor).ok_or(SetError::CapacityOverflow(capacity))?;
        // An empty table must still be able to grow to hold one element.
        if capacity == 0 && slot_count_for(1, load_factor).is_none() {
            return Err(SetError::InvalidLoadFactor(load_factor));
        }

        Ok(Self {
            slots: empty_slots(slot_count),
            populated: 0,
            threshold: threshold_for(slot_count, load_factor),
            load_factor,
            has_null: false,
        })
    }

    /// Returns the number of elements in the table, null included.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table contains no elements.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the length of the slot array. Always a power of two.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of elements the table holds before it grows.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns the configured load factor.
    pub fn load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Returns `true` if the null element is present.
    pub fn has_null(&self) -> bool {
        self.has_null
    }

    #[inline(always)]
    fn slot_index(&self, hash: u64) -> usize {
        spread(hash) & (self.slots.len() - 1)
    }

    #[inline]
    fn locate(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<(usize, usize)> {
        let slot = self.slot_index(hash);
        let offset = self.slots[slot]
            .entries()
            .iter()
            .position(|stored| stored.hash == hash && eq(&stored.value))?;
        Some((slot, offset))
    }

    /// Finds a value in the table by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use unified_set::hash_table::ChainedTable;
    /// #
    /// let mut table = ChainedTable::new();
    /// table.entry(42, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.find(42, |&n| n == 42), Some(&42));
    /// assert_eq!(table.find(99, |&n| n == 99), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&T> {
        let (slot, offset) = self.locate(hash, eq)?;
        Some(&self.slots[slot].entries()[offset].value)
    }

    /// Finds a value in the table by hash and equality predicate, returning a
    /// mutable reference.
    ///
    /// The caller must not change the value in a way that changes its hash
    /// or its equality with other values.
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<&mut T> {
        let (slot, offset) = self.locate(hash, eq)?;
        Some(&mut self.slots[slot].entries_mut()[offset].value)
    }

    /// Gets an entry for the given hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use unified_set::hash_table::ChainedTable;
    /// # use unified_set::hash_table::Entry;
    /// #
    /// let mut table = ChainedTable::new();
    ///
    /// match table.entry(1, |s: &String| s == "one") {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert("one".to_string());
    ///     }
    ///     Entry::Occupied(_) => unreachable!(),
    /// }
    ///
    /// let stored = table.entry(1, |s: &String| s == "one").or_insert("uno".to_string());
    /// assert_eq!(stored, "one");
    /// ```
    #[inline]
    pub fn entry(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Entry<'_, T> {
        match self.locate(hash, eq) {
            Some((slot, offset)) => Entry::Occupied(OccupiedEntry {
                table: self,
                slot,
                offset,
            }),
            None => Entry::Vacant(VacantEntry { table: self, hash }),
        }
    }

    /// Removes and returns a value from the table.
    ///
    /// A chain left with a single entry is demoted back to a plain slot. The
    /// slot array never shrinks.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use unified_set::hash_table::ChainedTable;
    /// #
    /// let mut table = ChainedTable::new();
    /// table.entry(42, |&n: &u64| n == 42).or_insert(42);
    ///
    /// assert_eq!(table.remove(42, |&n| n == 42), Some(42));
    /// assert_eq!(table.remove(42, |&n| n == 42), None);
    /// assert!(table.is_empty());
    /// ```
    pub fn remove(&mut self, hash: u64, eq: impl Fn(&T) -> bool) -> Option<T> {
        let (slot, offset) = self.locate(hash, eq)?;
        Some(self.remove_at(slot, offset))
    }

    /// Marks the null element as present. Returns `true` if it was absent.
    pub fn insert_null(&mut self) -> bool {
        if self.has_null {
            return false;
        }
        self.grow_for(self.populated + 1);
        self.has_null = true;
        self.populated += 1;
        true
    }

    /// Marks the null element as absent. Returns `true` if it was present.
    pub fn remove_null(&mut self) -> bool {
        if !self.has_null {
            return false;
        }
        self.has_null = false;
        self.populated -= 1;
        true
    }

    /// Removes all elements from the table, keeping its slot count.
    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = Slot::Empty;
        }
        self.populated = 0;
        self.has_null = false;
    }

    /// Reserves room for at least `additional` more elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use unified_set::hash_table::ChainedTable;
    /// #
    /// let mut table: ChainedTable<i32> = ChainedTable::with_capacity(4);
    /// table.reserve(50);
    /// assert!(table.threshold() >= 50);
    /// ```
    pub fn reserve(&mut self, additional: usize) {
        let required = self
            .populated
            .checked_add(additional)
            .unwrap_or_else(|| panic!("{}", SetError::CapacityOverflow(additional)));
        self.grow_for(required);
    }

    /// Grows the slot array until `required` elements fit under the
    /// threshold.
    #[inline]
    fn grow_for(&mut self, required: usize) {
        if required <= self.threshold {
            return;
        }

        let mut slot_count = self.slots.len();
        while threshold_for(slot_count, self.load_factor) < required {
            slot_count = slot_count
                .checked_mul(2)
                .unwrap_or_else(|| panic!("{}", SetError::CapacityOverflow(required)));
        }
        self.rehash(slot_count);
    }

    /// Rebuilds the table with `slot_count` slots, redistributing every
    /// entry by its stored hash. Chains are flattened and rebuilt.
    #[cold]
    #[inline(never)]
    fn rehash(&mut self, slot_count: usize) {
        debug_assert!(slot_count.is_power_of_two() && slot_count > self.slots.len());
        log::debug!(
            "rehashing {} elements from {} to {} slots",
            self.populated,
            self.slots.len(),
            slot_count
        );

        let old_slots = core::mem::replace(&mut self.slots, empty_slots(slot_count));
        let mask = slot_count - 1;
        for slot in old_slots.into_vec() {
            match slot {
                Slot::Empty => {}
                Slot::Single(stored) => {
                    self.slots[spread(stored.hash) & mask].push(stored);
                }
                Slot::Chain(chain) => {
                    for stored in chain {
                        self.slots[spread(stored.hash) & mask].push(stored);
                    }
                }
            }
        }
        self.threshold = threshold_for(slot_count, self.load_factor);
    }

    #[inline]
    pub(crate) fn slot_len(&self, slot: usize) -> usize {
        self.slots[slot].len()
    }

    #[inline]
    pub(crate) fn value_at(&self, slot: usize, offset: usize) -> &T {
        &self.slots[slot].entries()[offset].value
    }

    /// Removes the entry at a known position. If the slot held a chain, its
    /// trailing entry now lives at `offset`.
    pub(crate) fn remove_at(&mut self, slot: usize, offset: usize) -> T {
        let stored = self.slots[slot].swap_remove(offset);
        self.populated -= 1;
        stored.value
    }

    /// Returns an iterator over all elements, yielding `None` for null.
    ///
    /// The null element, if present, comes first; the remaining order is
    /// unspecified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use unified_set::hash_table::ChainedTable;
    /// #
    /// let mut table = ChainedTable::new();
    /// table.entry(1, |&n: &u32| n == 1).or_insert(1);
    /// table.insert_null();
    ///
    /// let items: Vec<Option<&u32>> = table.iter().collect();
    /// assert_eq!(items, vec![None, Some(&1)]);
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            null_pending: self.has_null,
            slots: self.slots.iter(),
            entries: [].iter(),
            remaining: self.populated,
        }
    }

    /// Returns a cursor over the table that can remove the element it last
    /// yielded.
    pub fn cursor(&mut self) -> Cursor<'_, T> {
        Cursor::new(self)
    }

    /// Returns an iterator that removes and yields all elements, `None`
    /// standing for null.
    ///
    /// The table is empty as soon as this is called; elements not consumed
    /// are dropped with the iterator.
    pub fn drain(&mut self) -> Drain<'_, T> {
        let slot_count = self.slots.len();
        let slots = core::mem::replace(&mut self.slots, empty_slots(slot_count));
        let inner = IntoIter::new(slots, self.has_null, self.populated);
        self.populated = 0;
        self.has_null = false;
        Drain {
            inner,
            _phantom: PhantomData,
        }
    }

    /// Returns the number of sections to split the slot array into so that
    /// each covers about `batch_size` slots. Always at least one.
    ///
    /// A `batch_size` of zero is treated as one.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use unified_set::hash_table::ChainedTable;
    /// #
    /// let table: ChainedTable<u32> = ChainedTable::with_capacity_and_load_factor(12, 0.75).unwrap();
    /// assert_eq!(table.slot_count(), 16);
    /// assert_eq!(table.batch_count(3), 5);
    /// assert_eq!(table.batch_count(64), 1);
    /// ```
    pub fn batch_count(&self, batch_size: usize) -> usize {
        (self.slots.len() / batch_size.max(1)).max(1)
    }

    /// Returns the slot range covered by section `section_index` out of
    /// `section_count` contiguous sections. The last section absorbs the
    /// remainder.
    pub fn section_bounds(
        &self,
        section_index: usize,
        section_count: usize,
    ) -> Result<Range<usize>, SetError> {
        if section_count == 0 || section_index >= section_count {
            return Err(SetError::InvalidSection {
                index: section_index,
                count: section_count,
            });
        }

        let slot_count = self.slots.len();
        let section_size = slot_count / section_count;
        let start = section_index * section_size;
        let end = if section_index == section_count - 1 {
            slot_count
        } else {
            start + section_size
        };
        Ok(start..end)
    }

    /// Returns an iterator over the elements whose home slot lies in section
    /// `section_index` of `section_count`. Chains are yielded whole; null
    /// belongs to section 0.
    ///
    /// Sections are disjoint and together cover every element exactly once.
    pub fn section_iter(
        &self,
        section_index: usize,
        section_count: usize,
    ) -> Result<Iter<'_, T>, SetError> {
        let range = self.section_bounds(section_index, section_count)?;
        let slots = &self.slots[range];
        let null_pending = self.has_null && section_index == 0;
        let remaining =
            slots.iter().map(Slot::len).sum::<usize>() + usize::from(null_pending);

        Ok(Iter {
            null_pending,
            slots: slots.iter(),
            entries: [].iter(),
            remaining,
        })
    }

    /// Computes a histogram of slot lengths for the current table state.
    ///
    /// Requires the `stats` feature.
    #[cfg(feature = "stats")]
    pub fn chain_histogram(&self) -> ChainHistogram {
        let mut bins = alloc::vec![0usize; 2];
        for slot in self.slots.iter() {
            let len = slot.len();
            if len >= bins.len() {
                bins.resize(len + 1, 0);
            }
            bins[len] += 1;
        }
        ChainHistogram { bins }
    }

    /// Returns detailed utilization statistics for debugging.
    ///
    /// Requires the `stats` feature.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> DebugStats {
        let mut occupied_slots = 0;
        let mut chained_slots = 0;
        let mut chained_entries = 0;
        let mut longest_chain = 0;
        let mut chain_bytes = 0;

        for slot in self.slots.iter() {
            match slot {
                Slot::Empty => {}
                Slot::Single(_) => occupied_slots += 1,
                Slot::Chain(chain) => {
                    occupied_slots += 1;
                    chained_slots += 1;
                    chained_entries += chain.len();
                    longest_chain = longest_chain.max(chain.len());
                    chain_bytes += chain.capacity() * core::mem::size_of::<Stored<T>>();
                }
            }
        }

        let total_slots = self.slots.len();
        DebugStats {
            populated: self.populated,
            threshold: self.threshold,
            total_slots,
            occupied_slots,
            chained_slots,
            chained_entries,
            longest_chain,
            load_factor: self.load_factor,
            slot_utilization: occupied_slots as f64 / total_slots as f64,
            total_bytes: total_slots * core::mem::size_of::<Slot<T>>() + chain_bytes,
        }
    }
}

/// A view into a single entry in the table, which may be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`ChainedTable`].
///
/// [`entry`]: ChainedTable::entry
pub enum Entry<'a, T> {
    /// No stored value matched the predicate
    Vacant(VacantEntry<'a, T>),
    /// A stored value matched the predicate
    Occupied(OccupiedEntry<'a, T>),
}

impl<'a, T> Entry<'a, T> {
    /// Inserts `default` if the entry is vacant and returns a reference to
    /// the stored value either way.
    pub fn or_insert(self, default: T) -> &'a T {
        match self {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the value computed by `default` if the entry is vacant and
    /// returns a reference to the stored value either way.
    ///
    /// `default` is not called for occupied entries.
    pub fn or_insert_with(self, default: impl FnOnce() -> T) -> &'a T {
        match self {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Returns `true` if a stored value matched.
    pub fn is_occupied(&self) -> bool {
        matches!(self, Entry::Occupied(_))
    }
}

/// A view into a vacant entry in the table.
pub struct VacantEntry<'a, T> {
    table: &'a mut ChainedTable<T>,
    hash: u64,
}

impl<'a, T> VacantEntry<'a, T> {
    /// Inserts a value and returns a reference to it.
    ///
    /// If the insertion would push the table above its threshold, the table
    /// first grows to double its slot count.
    pub fn insert(self, value: T) -> &'a T {
        let table = self.table;
        table.grow_for(table.populated + 1);
        table.populated += 1;

        let slot = table.slot_index(self.hash);
        let target = &mut table.slots[slot];
        let offset = target.len();
        if target.push(Stored {
            hash: self.hash,
            value,
        }) {
            log::trace!("promoted slot {slot} to a chain");
        }
        &target.entries()[offset].value
    }
}

/// A view into an occupied entry in the table.
pub struct OccupiedEntry<'a, T> {
    table: &'a mut ChainedTable<T>,
    slot: usize,
    offset: usize,
}

impl<'a, T> OccupiedEntry<'a, T> {
    /// Gets a reference to the stored value.
    pub fn get(&self) -> &T {
        self.table.value_at(self.slot, self.offset)
    }

    /// Converts the entry into a reference to the stored value with the
    /// lifetime of the table borrow.
    pub fn into_ref(self) -> &'a T {
        let table = self.table;
        &table.slots[self.slot].entries()[self.offset].value
    }

    /// Removes the stored value from the table and returns it.
    pub fn remove(self) -> T {
        self.table.remove_at(self.slot, self.offset)
    }
}

/// An iterator over the elements of a [`ChainedTable`] or one of its
/// sections.
///
/// Yields `None` for the null element and `Some(&T)` otherwise.
pub struct Iter<'a, T> {
    null_pending: bool,
    slots: core::slice::Iter<'a, Slot<T>>,
    entries: core::slice::Iter<'a, Stored<T>>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = Option<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.null_pending {
            self.null_pending = false;
            self.remaining -= 1;
            return Some(None);
        }

        loop {
            if let Some(stored) = self.entries.next() {
                self.remaining -= 1;
                return Some(Some(&stored.value));
            }
            self.entries = self.slots.next()?.entries().iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Self {
            null_pending: self.null_pending,
            slots: self.slots.clone(),
            entries: self.entries.clone(),
            remaining: self.remaining,
        }
    }
}

enum SlotIntoIter<T> {
    Single(Option<Stored<T>>),
    Chain(alloc::vec::IntoIter<Stored<T>>),
}

impl<T> Iterator for SlotIntoIter<T> {
    type Item = Stored<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SlotIntoIter::Single(stored) => stored.take(),
            SlotIntoIter::Chain(chain) => chain.next(),
        }
    }
}

/// An owning iterator over the elements of a [`ChainedTable`].
///
/// Yields `None` for the null element and `Some(T)` otherwise.
pub struct IntoIter<T> {
    null_pending: bool,
    slots: alloc::vec::IntoIter<Slot<T>>,
    entries: SlotIntoIter<T>,
    remaining: usize,
}

impl<T> IntoIter<T> {
    fn new(slots: Box<[Slot<T>]>, null_pending: bool, remaining: usize) -> Self {
        Self {
            null_pending,
            slots: slots.into_vec().into_iter(),
            entries: SlotIntoIter::Single(None),
            remaining,
        }
    }
}

impl<T> Iterator for IntoIter<T> {
    type Item = Option<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.null_pending {
            self.null_pending = false;
            self.remaining -= 1;
            return Some(None);
        }

        loop {
            if let Some(stored) = self.entries.next() {
                self.remaining -= 1;
                return Some(Some(stored.value));
            }
            self.entries = match self.slots.next()? {
                Slot::Empty => SlotIntoIter::Single(None),
                Slot::Single(stored) => SlotIntoIter::Single(Some(stored)),
                Slot::Chain(chain) => SlotIntoIter::Chain(chain.into_iter()),
            };
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for IntoIter<T> {}

impl<T> FusedIterator for IntoIter<T> {}

impl<T> IntoIterator for ChainedTable<T> {
    type IntoIter = IntoIter<T>;
    type Item = Option<T>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.slots, self.has_null, self.populated)
    }
}

impl<'a, T> IntoIterator for &'a ChainedTable<T> {
    type IntoIter = Iter<'a, T>;
    type Item = Option<&'a T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A draining iterator over the elements of a [`ChainedTable`].
///
/// This struct is created by the [`drain`] method on [`ChainedTable`].
///
/// [`drain`]: ChainedTable::drain
pub struct Drain<'a, T> {
    inner: IntoIter<T>,
    _phantom: PhantomData<&'a mut ChainedTable<T>>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = Option<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for Drain<'_, T> {}

impl<T> FusedIterator for Drain<'_, T> {}

#[cfg(test)]
mod tests {
    use alloc::collections::BTreeSet;
    use alloc::string::String;
    use alloc::string::ToString;
    use alloc::vec;
    use core::hash::Hasher;

    use rand::TryRngCore;
    use rand::rngs::OsRng;
    use siphasher::sip::SipHasher;

    use super::*;

    struct HashState {
        k0: u64,
        k1: u64,
    }

    impl HashState {
        fn default() -> Self {
            let mut rng = OsRng;
            Self {
                k0: rng.try_next_u64().unwrap(),
                k1: rng.try_next_u64().unwrap(),
            }
        }

        fn build_hasher(&self) -> SipHasher {
            SipHasher::new_with_keys(self.k0, self.k1)
        }
    }

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        key: u64,
        value: i32,
    }

    fn hash_key(state: &HashState, key: u64) -> u64 {
        let mut h = state.build_hasher();
        h.write_u64(key);
        h.finish()
    }

    fn insert_item(table: &mut ChainedTable<Item>, hash: u64, key: u64) -> bool {
        match table.entry(hash, |v| v.key == key) {
            Entry::Vacant(v) => {
                v.insert(Item {
                    key,
                    value: key as i32,
                });
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    fn assert_invariants<T>(table: &ChainedTable<T>) {
        assert!(table.slot_count().is_power_of_two());
        assert!(table.len() <= table.threshold(), "{:#?}", table);
        let mask = table.slot_count() - 1;
        let mut counted = usize::from(table.has_null());
        for (index, slot) in table.slots.iter().enumerate() {
            if let Slot::Chain(chain) = slot {
                assert!(chain.len() >= 2, "chain of one entry at {index}");
            }
            for stored in slot.entries() {
                assert_eq!(spread(stored.hash) & mask, index);
                counted += 1;
            }
        }
        assert_eq!(counted, table.len());
    }

    #[test]
    fn construction_sizes_are_powers_of_two() {
        let table: ChainedTable<u32> = ChainedTable::with_capacity_and_load_factor(0, 0.75).unwrap();
        assert_eq!(table.slot_count(), 1);
        assert_eq!(table.threshold(), 0);

        let table: ChainedTable<u32> = ChainedTable::with_capacity_and_load_factor(4, 0.75).unwrap();
        assert_eq!(table.slot_count(), 8);
        assert_eq!(table.threshold(), 6);

        let table: ChainedTable<u32> = ChainedTable::with_capacity_and_load_factor(16, 1.0).unwrap();
        assert_eq!(table.slot_count(), 16);
        assert_eq!(table.threshold(), 16);

        for capacity in 0..200 {
            for load_factor in [0.1f32, 0.3, 0.5, 0.75, 0.9, 1.0] {
                let table: ChainedTable<u32> =
                    ChainedTable::with_capacity_and_load_factor(capacity, load_factor).unwrap();
                assert!(table.threshold() >= capacity);
                if table.slot_count() > 1 {
                    assert!(threshold_for(table.slot_count() / 2, load_factor) < capacity);
                }
            }
        }
    }

    #[test]
    fn construction_rejects_bad_arguments() {
        for load_factor in [0.0f32, -0.5, 1.01, f32::NAN, f32::INFINITY] {
            let err = ChainedTable::<u32>::with_capacity_and_load_factor(8, load_factor).unwrap_err();
            assert!(matches!(err, SetError::InvalidLoadFactor(_)));
        }
        assert_eq!(
            ChainedTable::<u32>::with_capacity_and_load_factor(usize::MAX, 0.5).unwrap_err(),
            SetError::CapacityOverflow(usize::MAX)
        );
        // No addressable slot count gives a threshold of one.
        assert_eq!(
            ChainedTable::<u32>::with_capacity_and_load_factor(0, 1e-30).unwrap_err(),
            SetError::InvalidLoadFactor(1e-30)
        );
        assert_eq!(
            ChainedTable::<u32>::with_capacity_and_load_factor(1, 1e-30).unwrap_err(),
            SetError::CapacityOverflow(1)
        );
    }

    #[test]
    fn tiny_load_factor_accepted_only_if_growable() {
        let mut table: ChainedTable<u64> = ChainedTable::with_capacity_and_load_factor(0, 0.01).unwrap();
        assert_eq!(table.threshold(), 0);
        table.entry(5, |&v| v == 5).or_insert(5);
        assert_eq!(table.len(), 1);
        assert!(table.threshold() >= 1);
        assert_invariants(&table);
    }

    #[test]
    fn insert_and_find() {
        let state = HashState::default();
        let mut table: ChainedTable<Item> = ChainedTable::with_capacity(0);
        for k in 0..32u64 {
            let hash = hash_key(&state, k);
            assert!(insert_item(&mut table, hash, k));
            assert_eq!(
                table.find(hash, |v| v.key == k),
                Some(&Item {
                    key: k,
                    value: k as i32
                }),
                "{:#?}",
                table
            );
        }
        assert_eq!(table.len(), 32);
        assert_invariants(&table);

        let miss_hash = hash_key(&state, 999);
        assert!(table.find(miss_hash, |v| v.key == 999).is_none());
    }

    #[test]
    fn duplicate_entry_is_occupied() {
        let state = HashState::default();
        let mut table: ChainedTable<Item> = ChainedTable::new();
        let hash = hash_key(&state, 42);

        assert!(insert_item(&mut table, hash, 42));
        assert!(!insert_item(&mut table, hash, 42));
        match table.entry(hash, |v| v.key == 42) {
            Entry::Occupied(occ) => assert_eq!(occ.get().value, 42),
            Entry::Vacant(_) => panic!("should be occupied: {:#?}", table),
        }
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn find_mut_and_modify() {
        let state = HashState::default();
        let mut table: ChainedTable<Item> = ChainedTable::new();
        for k in 0..5u64 {
            insert_item(&mut table, hash_key(&state, k), k);
        }

        for k in 0..5u64 {
            if let Some(v) = table.find_mut(hash_key(&state, k), |v| v.key == k) {
                v.value += 9;
            }
        }
        for k in 0..5u64 {
            let v = table.find(hash_key(&state, k), |v| v.key == k).unwrap();
            assert_eq!(v.value, k as i32 + 9);
        }
    }

    #[test]
    fn explicit_collision_builds_one_chain() {
        let mut table: ChainedTable<Item> = ChainedTable::with_capacity(64);
        let slot_count = table.slot_count();
        for k in 0..20u64 {
            assert!(insert_item(&mut table, 0, k));
        }

        assert_eq!(table.len(), 20);
        assert_eq!(table.slot_count(), slot_count);
        match &table.slots[0] {
            Slot::Chain(chain) => {
                assert_eq!(chain.len(), 20);
                assert!(chain.capacity().is_power_of_two());
            }
            _ => panic!("expected a chain: {:#?}", table),
        }
        for k in 0..20u64 {
            assert_eq!(table.find(0, |v| v.key == k).map(|v| v.key), Some(k));
        }
        assert_invariants(&table);
    }

    #[test]
    fn chain_demotes_to_single() {
        let mut table: ChainedTable<Item> = ChainedTable::new();
        insert_item(&mut table, 5, 1);
        insert_item(&mut table, 5, 2);
        let slot = table.slot_index(5);
        assert!(matches!(table.slots[slot], Slot::Chain(_)));

        assert_eq!(table.remove(5, |v| v.key == 1).map(|v| v.key), Some(1));
        assert!(matches!(table.slots[slot], Slot::Single(_)));
        assert_eq!(table.find(5, |v| v.key == 2).map(|v| v.key), Some(2));

        assert_eq!(table.remove(5, |v| v.key == 2).map(|v| v.key), Some(2));
        assert!(matches!(table.slots[slot], Slot::Empty));
        assert!(table.is_empty());
    }

    #[test]
    fn remove_second_to_last_of_chain() {
        let mut table: ChainedTable<Item> = ChainedTable::new();
        for k in 0..4u64 {
            insert_item(&mut table, 9, k);
        }

        assert_eq!(table.remove(9, |v| v.key == 2).map(|v| v.key), Some(2));
        assert_eq!(table.len(), 3);
        let slot = table.slot_index(9);
        assert_eq!(table.slots[slot].len(), 3);
        for k in [0u64, 1, 3] {
            assert_eq!(table.find(9, |v| v.key == k).map(|v| v.key), Some(k));
        }
        assert!(table.find(9, |v| v.key == 2).is_none());
        assert_invariants(&table);
    }

    #[test]
    fn remove_items() {
        let state = HashState::default();
        let mut table: ChainedTable<Item> = ChainedTable::with_capacity(0);
        for k in 0..8u64 {
            insert_item(&mut table, hash_key(&state, k), k);
        }
        let slot_count = table.slot_count();
        for k in [0u64, 3, 7] {
            let removed = table
                .remove(hash_key(&state, k), |v| v.key == k)
                .expect("should remove");
            assert_eq!(removed.key, k);
        }
        assert_eq!(table.len(), 5);
        assert_eq!(table.slot_count(), slot_count);
        assert!(table.remove(hash_key(&state, 1000), |v| v.key == 1000).is_none());
        assert_invariants(&table);
    }

    #[test]
    #[cfg_attr(miri, ignore)]
    fn insert_many_grows_and_keeps_threshold() {
        let state = HashState::default();
        let mut table: ChainedTable<Item> = ChainedTable::with_capacity(0);
        let mut last_slot_count = table.slot_count();
        for k in 0..20000u64 {
            insert_item(&mut table, hash_key(&state, k), k);
            assert!(table.len() <= table.threshold());
            if table.slot_count() != last_slot_count {
                assert_eq!(table.slot_count(), last_slot_count * 2);
                last_slot_count = table.slot_count();
            }
        }

        assert_eq!(table.len(), 20000);
        for k in 0..20000u64 {
            assert_eq!(
                table.find(hash_key(&state, k), |v| v.key == k).map(|v| v.key),
                Some(k)
            );
        }
        assert_invariants(&table);
    }

    #[test]
    fn growth_triggers_exactly_above_threshold() {
        let mut table: ChainedTable<u64> = ChainedTable::with_capacity_and_load_factor(6, 0.75).unwrap();
        assert_eq!(table.slot_count(), 8);
        for k in 0..6u64 {
            table.entry(k, |&v| v == k).or_insert(k);
        }
        assert_eq!(table.slot_count(), 8);

        // A duplicate does not count as an insertion.
        table.entry(0, |&v| v == 0).or_insert(0);
        assert_eq!(table.slot_count(), 8);

        table.entry(6, |&v| v == 6).or_insert(6);
        assert_eq!(table.slot_count(), 16);
        assert_eq!(table.threshold(), 12);
    }

    #[test]
    fn small_load_factor_grows_past_empty_thresholds() {
        let mut table: ChainedTable<u64> = ChainedTable::with_capacity_and_load_factor(0, 0.1).unwrap();
        for k in 0..50u64 {
            table.entry(k, |&v| v == k).or_insert(k);
            assert!(table.len() <= table.threshold());
        }
        assert_invariants(&table);
    }

    #[test]
    fn null_is_tracked_outside_slots() {
        let mut table: ChainedTable<u64> = ChainedTable::with_capacity_and_load_factor(0, 1.0).unwrap();
        assert!(table.insert_null());
        assert!(!table.insert_null());
        assert!(table.has_null());
        assert_eq!(table.len(), 1);
        assert!(table.len() <= table.threshold());

        // Hash 0 lands on the slot null is homed on.
        table.entry(0, |&v| v == 0).or_insert(0);
        assert_eq!(table.find(0, |&v| v == 0), Some(&0));
        assert_eq!(table.len(), 2);

        assert!(table.remove_null());
        assert!(!table.remove_null());
        assert_eq!(table.find(0, |&v| v == 0), Some(&0));
        assert_eq!(table.len(), 1);
        assert_invariants(&table);
    }

    #[test]
    fn iter_and_drain() {
        let state = HashState::default();
        let mut table: ChainedTable<Item> = ChainedTable::with_capacity(0);
        for k in 10..20u64 {
            insert_item(&mut table, hash_key(&state, k), k);
        }
        table.insert_null();

        let iter = table.iter();
        assert_eq!(iter.len(), 11);
        let items: Vec<_> = iter.collect();
        assert_eq!(items[0], None);
        let keys: BTreeSet<u64> = items.iter().flatten().map(|v| v.key).collect();
        assert_eq!(keys, (10..20).collect::<BTreeSet<_>>());

        let slot_count = table.slot_count();
        let drained: Vec<Option<Item>> = table.drain().collect();
        assert_eq!(drained.len(), 11);
        assert!(table.is_empty());
        assert!(!table.has_null());
        assert_eq!(table.slot_count(), slot_count);
        assert_eq!(table.iter().count(), 0);
    }

    #[test]
    fn dropped_drain_empties_table() {
        let mut table: ChainedTable<String> = ChainedTable::new();
        for (k, word) in ["a", "b", "c"].into_iter().enumerate() {
            table
                .entry(k as u64, |s| s == word)
                .or_insert(word.to_string());
        }
        let mut drain = table.drain();
        assert!(drain.next().is_some());
        drop(drain);
        assert!(table.is_empty());
    }

    #[test]
    fn into_iter_yields_everything() {
        let mut table: ChainedTable<u64> = ChainedTable::new();
        for k in 0..10u64 {
            table.entry(k % 3, |&v| v == k).or_insert(k);
        }
        table.insert_null();
        let mut values: Vec<Option<u64>> = table.into_iter().collect();
        values.sort();
        let mut expected = vec![None];
        expected.extend((0..10).map(Some));
        assert_eq!(values, expected);
    }

    #[test]
    fn clear_keeps_slot_count() {
        let mut table: ChainedTable<u64> = ChainedTable::new();
        for k in 0..100u64 {
            table.entry(k, |&v| v == k).or_insert(k);
        }
        table.insert_null();
        let slot_count = table.slot_count();
        table.clear();
        assert!(table.is_empty());
        assert!(!table.has_null());
        assert_eq!(table.slot_count(), slot_count);
        assert!(table.find(5, |&v| v == 5).is_none());
    }

    #[test]
    fn batch_count_matches_slot_count() {
        let table: ChainedTable<u64> = ChainedTable::with_capacity_and_load_factor(0, 1.0).unwrap();
        assert_eq!(table.batch_count(3), 1);
        assert_eq!(table.batch_count(0), 1);

        let table: ChainedTable<u64> = ChainedTable::with_capacity_and_load_factor(64, 1.0).unwrap();
        assert_eq!(table.slot_count(), 64);
        assert_eq!(table.batch_count(1), 64);
        assert_eq!(table.batch_count(10), 6);
        assert_eq!(table.batch_count(100), 1);
    }

    #[test]
    fn section_bounds_cover_slots() {
        let table: ChainedTable<u64> = ChainedTable::with_capacity_and_load_factor(10, 1.0).unwrap();
        assert_eq!(table.slot_count(), 16);
        assert_eq!(table.section_bounds(0, 3).unwrap(), 0..5);
        assert_eq!(table.section_bounds(1, 3).unwrap(), 5..10);
        assert_eq!(table.section_bounds(2, 3).unwrap(), 10..16);

        // More sections than slots: the last one takes everything.
        assert_eq!(table.section_bounds(0, 32).unwrap(), 0..0);
        assert_eq!(table.section_bounds(31, 32).unwrap(), 0..16);

        assert_eq!(
            table.section_bounds(3, 3).unwrap_err(),
            SetError::InvalidSection { index: 3, count: 3 }
        );
        assert!(table.section_bounds(0, 0).is_err());
    }

    #[test]
    fn sections_partition_elements() {
        let state = HashState::default();
        let mut table: ChainedTable<Item> = ChainedTable::with_capacity(0);
        for k in 0..500u64 {
            insert_item(&mut table, hash_key(&state, k), k);
        }
        for k in 500..520u64 {
            insert_item(&mut table, 3, k);
        }
        table.insert_null();

        for batch_size in [1usize, 3, 7, 64, 10_000] {
            let count = table.batch_count(batch_size);
            let mut seen = BTreeSet::new();
            let mut nulls = 0;
            let mut visited = 0;
            for index in 0..count {
                let section = table.section_iter(index, count).unwrap();
                let expected = section.len();
                let mut yielded = 0;
                for item in section {
                    yielded += 1;
                    match item {
                        None => nulls += 1,
                        Some(item) => assert!(seen.insert(item.key), "duplicate {}", item.key),
                    }
                }
                assert_eq!(yielded, expected);
                visited += yielded;
            }
            assert_eq!(nulls, 1);
            assert_eq!(visited, table.len());
            assert_eq!(seen.len(), 520);
        }
    }

    #[test]
    fn test_clone() {
        let state = HashState::default();
        let mut table: ChainedTable<Item> = ChainedTable::new();
        for k in 0..100u64 {
            insert_item(&mut table, hash_key(&state, k), k);
        }
        insert_item(&mut table, 0, 1000);
        insert_item(&mut table, 0, 1001);

        let mut cloned = table.clone();
        assert_eq!(cloned.len(), table.len());
        assert_eq!(cloned.slot_count(), table.slot_count());
        for k in 0..100u64 {
            assert!(cloned.find(hash_key(&state, k), |v| v.key == k).is_some());
        }

        cloned.remove(0, |v| v.key == 1000);
        assert!(table.find(0, |v| v.key == 1000).is_some());
        assert_invariants(&cloned);
    }

    #[test]
    fn entry_or_insert_with_skips_closure_when_occupied() {
        let mut table: ChainedTable<String> = ChainedTable::new();
        let stored = table
            .entry(1, |s| s == "key")
            .or_insert_with(|| "key".to_string());
        assert_eq!(stored, "key");

        let existing = table
            .entry(1, |s| s == "key")
            .or_insert_with(|| panic!("should not be called"));
        assert_eq!(existing, "key");
    }

    #[test]
    fn occupied_entry_remove() {
        let mut table: ChainedTable<u64> = ChainedTable::new();
        table.entry(8, |&v| v == 8).or_insert(8);
        match table.entry(8, |&v| v == 8) {
            Entry::Occupied(entry) => assert_eq!(entry.remove(), 8),
            Entry::Vacant(_) => panic!("expected occupied"),
        }
        assert!(table.is_empty());
    }

    #[test]
    fn debug_output_shows_layout() {
        let mut table: ChainedTable<u64> = ChainedTable::with_capacity_and_load_factor(2, 1.0).unwrap();
        table.entry(0, |&v| v == 1).or_insert(1);
        table.entry(0, |&v| v == 2).or_insert(2);
        let debug = alloc::format!("{:?}", table);
        assert!(debug.contains("02"), "{debug}");
        assert!(debug.contains("populated: 2"), "{debug}");
    }

    #[cfg(feature = "stats")]
    #[test]
    fn stats_report_chains() {
        let mut table: ChainedTable<u64> = ChainedTable::with_capacity(32);
        for k in 0..5u64 {
            table.entry(0, |&v| v == k).or_insert(k);
        }
        table.entry(1 << 40, |&v| v == 99).or_insert(99);

        let stats = table.debug_stats();
        assert_eq!(stats.populated, 6);
        assert_eq!(stats.chained_slots, 1);
        assert_eq!(stats.chained_entries, 5);
        assert_eq!(stats.longest_chain, 5);

        let histogram = table.chain_histogram();
        assert_eq!(histogram.bins.iter().sum::<usize>(), table.slot_count());
        assert_eq!(histogram.bins[5], 1);
    }
}
