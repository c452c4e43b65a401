use core::fmt::Debug;
use core::iter::FusedIterator;

use crate::cursor::Cursor;
use crate::error::SetError;
use crate::hash_table::ChainedTable;
use crate::hash_table::DEFAULT_INITIAL_CAPACITY;
use crate::hash_table::Drain;
use crate::hash_table::Entry;
use crate::hash_table::IntoIter;
use crate::hash_table::Iter;
use crate::strategy::HashingStrategy;
use crate::strategy::NaturalStrategy;

/// A hash set whose hashing and equality come from a [`HashingStrategy`],
/// backed by a [`ChainedTable`].
///
/// Besides the usual set operations, `UnifiedSet` supports:
///
/// - **Pool operations**: [`get`](Self::get), [`put`](Self::put) and
///   [`remove_from_pool`](Self::remove_from_pool) hand back the *stored*
///   instance equal to a probe, which makes the set usable as an interner.
/// - **A null element**: added through [`add_null`](Self::add_null) and
///   friends when the strategy is null-safe, yielded as `None` by iteration.
/// - **Batch traversal**: [`batch_count`](Self::batch_count) and
///   [`batch_for_each`](Self::batch_for_each) split the slot array into
///   disjoint sections for an external parallel driver.
///
/// # Examples
///
/// ```rust
/// # #[cfg(any(feature = "std", feature = "foldhash"))]
/// # {
/// use unified_set::FnStrategy;
/// use unified_set::UnifiedSet;
///
/// // Case-insensitive interning pool.
/// let mut pool = UnifiedSet::with_strategy(FnStrategy::new(|s: &String| s.to_lowercase()));
///
/// let first: *const String = pool.put("Hello".to_string());
/// let again: *const String = pool.put("HELLO".to_string());
/// assert_eq!(first, again);
/// assert_eq!(pool.get(&"hello".to_string()).unwrap(), "Hello");
/// assert_eq!(pool.len(), 1);
/// # }
/// ```
#[derive(Clone)]
pub struct UnifiedSet<T, H = NaturalStrategy> {
    table: ChainedTable<T>,
    strategy: H,
}

impl<T, H> PartialEq for UnifiedSet<T, H>
where
    H: HashingStrategy<T>,
{
    fn eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter().all(|v| match v {
            Some(v) => other.contains(v),
            None => other.contains_null(),
        })
    }
}

impl<T, H> Eq for UnifiedSet<T, H> where H: HashingStrategy<T> {}

struct DebugElement<'a, T>(Option<&'a T>);

impl<T: Debug> Debug for DebugElement<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.0 {
            Some(value) => value.fmt(f),
            None => f.write_str("null"),
        }
    }
}

impl<T: Debug, H> Debug for UnifiedSet<T, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set()
            .entries(self.iter().map(DebugElement))
            .finish()
    }
}

#[cfg(any(feature = "std", feature = "foldhash"))]
impl<T> UnifiedSet<T, NaturalStrategy> {
    /// Creates an empty set using `Hash + Eq` and the default hasher.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let set: UnifiedSet<i32> = UnifiedSet::new();
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn new() -> Self {
        Self::with_strategy(NaturalStrategy::new())
    }

    /// Creates an empty set using `Hash + Eq` that holds at least `capacity`
    /// elements before growing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let set: UnifiedSet<i32> = UnifiedSet::with_capacity(100);
    /// assert!(set.threshold() >= 100);
    /// # }
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_strategy(capacity, NaturalStrategy::new())
    }
}

impl<T, H> Default for UnifiedSet<T, H>
where
    H: Default,
{
    fn default() -> Self {
        Self::with_strategy(H::default())
    }
}

impl<T, H> UnifiedSet<T, H> {
    /// Creates an empty set with the given strategy, the default capacity
    /// and the default load factor.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::FnStrategy;
    /// use unified_set::UnifiedSet;
    ///
    /// let set: UnifiedSet<(u32, &str), _> = UnifiedSet::with_strategy(FnStrategy::new(|p: &(u32, &str)| p.0));
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn with_strategy(strategy: H) -> Self {
        Self::with_capacity_and_strategy(DEFAULT_INITIAL_CAPACITY, strategy)
    }

    /// Creates an empty set with the given strategy that holds at least
    /// `capacity` elements before growing.
    ///
    /// # Panics
    ///
    /// Panics if the required slot count overflows `usize`.
    pub fn with_capacity_and_strategy(capacity: usize, strategy: H) -> Self {
        Self {
            table: ChainedTable::with_capacity(capacity),
            strategy,
        }
    }

    /// Creates an empty set with an explicit capacity, load factor and
    /// strategy.
    ///
    /// Fails with [`SetError::InvalidLoadFactor`] unless the load factor is
    /// in `(0, 1]`, and with [`SetError::CapacityOverflow`] if the table
    /// length would overflow `usize`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::NaturalStrategy;
    /// use unified_set::SetError;
    /// use unified_set::UnifiedSet;
    ///
    /// let set = UnifiedSet::<u8, _>::with_capacity_load_factor_and_strategy(4, 0.75, NaturalStrategy::new()).unwrap();
    /// assert_eq!(set.slot_count(), 8);
    ///
    /// let err = UnifiedSet::<u8, _>::with_capacity_load_factor_and_strategy(4, 0.0, NaturalStrategy::new()).unwrap_err();
    /// assert_eq!(err, SetError::InvalidLoadFactor(0.0));
    /// # }
    /// ```
    pub fn with_capacity_load_factor_and_strategy(
        capacity: usize,
        load_factor: f32,
        strategy: H,
    ) -> Result<Self, SetError> {
        Ok(Self {
            table: ChainedTable::with_capacity_and_load_factor(capacity, load_factor)?,
            strategy,
        })
    }

    /// Returns the number of elements in the set, null included.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let mut set: UnifiedSet<i32> = UnifiedSet::new();
    /// assert_eq!(set.len(), 0);
    /// set.add(1);
    /// set.add_null().unwrap();
    /// assert_eq!(set.len(), 2);
    /// # }
    /// ```
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the length of the underlying slot array.
    pub fn slot_count(&self) -> usize {
        self.table.slot_count()
    }

    /// Returns the number of elements the set holds before it grows.
    pub fn threshold(&self) -> usize {
        self.table.threshold()
    }

    /// Returns the load factor the set was created with.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// Returns the hashing strategy.
    pub fn strategy(&self) -> &H {
        &self.strategy
    }

    /// Returns the underlying table.
    pub fn table(&self) -> &ChainedTable<T> {
        &self.table
    }

    /// Returns `true` if the set contains the null element.
    ///
    /// Always `false` under a strategy that is not null-safe, since null can
    /// never be stored there.
    pub fn contains_null(&self) -> bool {
        self.table.has_null()
    }

    /// Removes the null element. Returns `true` if it was present.
    pub fn remove_null(&mut self) -> bool {
        self.table.remove_null()
    }

    /// Removes all elements from the set, keeping its slot count.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let mut set: UnifiedSet<i32> = (0..100).collect();
    /// let slots = set.slot_count();
    /// set.clear();
    /// assert!(set.is_empty());
    /// assert_eq!(set.slot_count(), slots);
    /// # }
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Reserves room for at least `additional` more elements.
    pub fn reserve(&mut self, additional: usize) {
        self.table.reserve(additional);
    }

    /// Returns an iterator over all elements, `None` standing for null.
    ///
    /// Null comes first if present; the remaining order is unspecified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let mut set: UnifiedSet<i32> = UnifiedSet::new();
    /// set.add(3);
    /// set.add_null().unwrap();
    ///
    /// let items: Vec<_> = set.iter().collect();
    /// assert_eq!(items, vec![None, Some(&3)]);
    /// # }
    /// ```
    pub fn iter(&self) -> Iter<'_, T> {
        self.table.iter()
    }

    /// Returns an iterator over the non-null elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let mut set: UnifiedSet<i32> = UnifiedSet::new();
    /// set.add(3);
    /// set.add_null().unwrap();
    ///
    /// let values: Vec<_> = set.values().collect();
    /// assert_eq!(values, vec![&3]);
    /// # }
    /// ```
    pub fn values(&self) -> Values<'_, T> {
        Values {
            inner: self.table.iter(),
        }
    }

    /// Returns a cursor that walks the set once and can remove the element
    /// it last yielded.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::SetError;
    /// use unified_set::UnifiedSet;
    ///
    /// let mut set: UnifiedSet<i32> = UnifiedSet::new();
    /// set.add(1);
    ///
    /// let mut cursor = set.cursor();
    /// assert_eq!(cursor.remove(), Err(SetError::IllegalState));
    /// assert_eq!(cursor.advance(), Ok(Some(&1)));
    /// assert_eq!(cursor.remove(), Ok(Some(1)));
    /// assert_eq!(cursor.advance(), Err(SetError::NoSuchElement));
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn cursor(&mut self) -> Cursor<'_, T> {
        self.table.cursor()
    }

    /// Removes and yields every element, `None` standing for null.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let mut set: UnifiedSet<i32> = (1..=3).collect();
    /// let mut drained: Vec<_> = set.drain().flatten().collect();
    /// drained.sort();
    /// assert_eq!(drained, vec![1, 2, 3]);
    /// assert!(set.is_empty());
    /// # }
    /// ```
    pub fn drain(&mut self) -> Drain<'_, T> {
        self.table.drain()
    }

    /// Keeps only the elements for which `f` returns `true`. Null is passed
    /// to `f` as `None`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let mut set: UnifiedSet<i32> = (0..10).collect();
    /// set.add_null().unwrap();
    /// set.retain(|v| v.is_some_and(|v| v % 3 == 0));
    ///
    /// let mut kept: Vec<_> = set.values().copied().collect();
    /// kept.sort();
    /// assert_eq!(kept, vec![0, 3, 6, 9]);
    /// assert!(!set.contains_null());
    /// # }
    /// ```
    pub fn retain(&mut self, f: impl FnMut(Option<&T>) -> bool) {
        self.table.cursor().retain(f);
    }

    /// Returns the number of sections to split the slot array into so that
    /// each covers about `batch_size` slots. Always at least one, so an
    /// empty set still yields a single no-op section.
    pub fn batch_count(&self, batch_size: usize) -> usize {
        self.table.batch_count(batch_size)
    }

    /// Calls `f` on every element whose home slot lies in section
    /// `section_index` of `section_count`. Null belongs to section 0.
    ///
    /// Running every section of one partition visits each element exactly
    /// once. Sections only read, so they may run concurrently against a
    /// shared reference.
    ///
    /// Fails with [`SetError::InvalidSection`] if `section_count` is zero or
    /// `section_index >= section_count`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let set: UnifiedSet<u32> = (0..100).collect();
    /// let sections = set.batch_count(16);
    ///
    /// let mut total = 0;
    /// for index in 0..sections {
    ///     set.batch_for_each(index, sections, |v| total += v.copied().unwrap_or(0))
    ///         .unwrap();
    /// }
    /// assert_eq!(total, (0..100).sum::<u32>());
    /// # }
    /// ```
    pub fn batch_for_each<F>(
        &self,
        section_index: usize,
        section_count: usize,
        f: F,
    ) -> Result<(), SetError>
    where
        F: FnMut(Option<&T>),
    {
        let section = self.table.section_iter(section_index, section_count)?;
        log::trace!(
            "visiting batch section {section_index} of {section_count} ({} elements)",
            section.len()
        );
        section.for_each(f);
        Ok(())
    }
}

impl<T, H> UnifiedSet<T, H>
where
    H: HashingStrategy<T>,
{
    /// Builds a set from `iter` under `strategy`. The result holds one
    /// element per equivalence class of the strategy; for duplicates, the
    /// first occurrence is kept.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::FnStrategy;
    /// use unified_set::UnifiedSet;
    ///
    /// let set = UnifiedSet::from_iter_with_strategy(
    ///     ["a", "B", "b", "A", "c"],
    ///     FnStrategy::new(|s: &&str| s.to_ascii_lowercase()),
    /// );
    /// assert_eq!(set.len(), 3);
    /// assert_eq!(set.get(&"b"), Some(&"B"));
    /// # }
    /// ```
    pub fn from_iter_with_strategy<I>(iter: I, strategy: H) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut set = Self::with_strategy(strategy);
        set.extend(iter);
        set
    }

    /// Adds a value to the set.
    ///
    /// Returns `true` if the value was newly inserted. An equal stored value
    /// is left untouched and `value` is dropped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let mut set: UnifiedSet<i32> = UnifiedSet::new();
    /// assert!(set.add(1));
    /// assert!(!set.add(1));
    /// assert_eq!(set.len(), 1);
    /// # }
    /// ```
    pub fn add(&mut self, value: T) -> bool {
        let hash = self.strategy.compute_hash(&value);
        match self
            .table
            .entry(hash, |stored| self.strategy.equals(stored, &value))
        {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(value);
                true
            }
        }
    }

    /// Returns `true` if the set contains a value equal to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let mut set: UnifiedSet<i32> = UnifiedSet::new();
    /// set.add(1);
    /// assert!(set.contains(&1));
    /// assert!(!set.contains(&2));
    /// # }
    /// ```
    pub fn contains(&self, value: &T) -> bool {
        self.get(value).is_some()
    }

    /// Removes the value equal to `value`. Returns `true` if one was
    /// present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::UnifiedSet;
    ///
    /// let mut set: UnifiedSet<i32> = UnifiedSet::new();
    /// set.add(1);
    /// assert!(set.remove(&1));
    /// assert!(!set.remove(&1));
    /// # }
    /// ```
    pub fn remove(&mut self, value: &T) -> bool {
        self.remove_from_pool(value).is_some()
    }

    /// Returns the stored value equal to `value`, if any.
    ///
    /// The returned reference points at the instance held by the set, which
    /// may be distinguishable from `value` under a custom strategy.
    pub fn get(&self, value: &T) -> Option<&T> {
        let hash = self.strategy.compute_hash(value);
        self.table
            .find(hash, |stored| self.strategy.equals(stored, value))
    }

    /// Returns the stored value equal to `value`, inserting `value` first if
    /// no such value exists.
    ///
    /// An existing value is never replaced, so repeated `put`s of equal
    /// values all return the instance that was stored first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::FnStrategy;
    /// use unified_set::UnifiedSet;
    ///
    /// let mut pool = UnifiedSet::with_strategy(FnStrategy::new(|p: &(u32, char)| p.0));
    ///
    /// assert_eq!(pool.put((7, 'a')), &(7, 'a'));
    /// assert_eq!(pool.put((7, 'b')), &(7, 'a'));
    /// assert_eq!(pool.len(), 1);
    /// # }
    /// ```
    pub fn put(&mut self, value: T) -> &T {
        let hash = self.strategy.compute_hash(&value);
        match self
            .table
            .entry(hash, |stored| self.strategy.equals(stored, &value))
        {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => entry.insert(value),
        }
    }

    /// Removes and returns the stored value equal to `value`, if any.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::FnStrategy;
    /// use unified_set::UnifiedSet;
    ///
    /// let mut pool = UnifiedSet::with_strategy(FnStrategy::new(|p: &(u32, char)| p.0));
    /// pool.put((7, 'a'));
    ///
    /// assert_eq!(pool.remove_from_pool(&(7, 'z')), Some((7, 'a')));
    /// assert_eq!(pool.remove_from_pool(&(7, 'z')), None);
    /// # }
    /// ```
    pub fn remove_from_pool(&mut self, value: &T) -> Option<T> {
        let hash = self.strategy.compute_hash(value);
        self.table
            .remove(hash, |stored| self.strategy.equals(stored, value))
    }

    fn require_null_safe(&self) -> Result<(), SetError> {
        if self.strategy.is_null_safe() {
            Ok(())
        } else {
            Err(SetError::NullElement)
        }
    }

    /// Adds the null element. Returns `Ok(true)` if it was absent.
    ///
    /// Fails with [`SetError::NullElement`] if the strategy is not
    /// null-safe.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # #[cfg(any(feature = "std", feature = "foldhash"))]
    /// # {
    /// use unified_set::FnStrategy;
    /// use unified_set::SetError;
    /// use unified_set::UnifiedSet;
    ///
    /// let mut set: UnifiedSet<i32> = UnifiedSet::new();
    /// assert_eq!(set.add_null(), Ok(true));
    /// assert_eq!(set.add_null(), Ok(false));
    /// assert!(set.contains_null());
    ///
    /// let mut keyed: UnifiedSet<i32, _> = UnifiedSet::with_strategy(FnStrategy::new(|v: &i32| v.abs()));
    /// assert_eq!(keyed.add_null(), Err(SetError::NullElement));
    /// assert!(keyed.is_empty());
    /// # }
    /// ```
    pub fn add_null(&mut self) -> Result<bool, SetError> {
        self.require_null_safe()?;
        Ok(self.table.insert_null())
    }

    /// Pool lookup for null. Null has no stored instance, so this is
    /// `Ok(None)` whenever the strategy is null-safe.
    ///
    /// Fails with [`SetError::NullElement`] if the strategy is not
    /// null-safe.
    pub fn get_null(&self) -> Result<Option<&T>, SetError> {
        self.require_null_safe()?;
        Ok(None)
    }

    /// Pool insertion for null: adds null if absent. Returns `Ok(None)`,
    /// the canonical null.
    ///
    /// Fails with [`SetError::NullElement`] if the strategy is not
    /// null-safe.
    pub fn put_null(&mut self) -> Result<Option<&T>, SetError> {
        self.require_null_safe()?;
        self.table.insert_null();
        Ok(None)
    }

    /// Pool removal for null: removes null if present. Returns `Ok(None)`.
    ///
    /// Fails with [`SetError::NullElement`] if the strategy is not
    /// null-safe.
    pub fn remove_null_from_pool(&mut self) -> Result<Option<T>, SetError> {
        self.require_null_safe()?;
        self.table.remove_null();
        Ok(None)
    }
}

/// An iterator over the non-null values of a [`UnifiedSet`].
///
/// This struct is created by the [`values`](UnifiedSet::values) method.
pub struct Values<'a, T> {
    inner: Iter<'a, T>,
}

impl<'a, T> Iterator for Values<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(value) = self.inner.next()? {
                return Some(value);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.inner.size_hint().1)
    }
}

impl<T> FusedIterator for Values<'_, T> {}

impl<T, H> IntoIterator for UnifiedSet<T, H> {
    type IntoIter = IntoIter<T>;
    type Item = Option<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.table.into_iter()
    }
}

impl<'a, T, H> IntoIterator for &'a UnifiedSet<T, H> {
    type IntoIter = Iter<'a, T>;
    type Item = Option<&'a T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T, H> FromIterator<T> for UnifiedSet<T, H>
where
    H: HashingStrategy<T> + Default,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_iter_with_strategy(iter, H::default())
    }
}

impl<T, H> Extend<T> for UnifiedSet<T, H>
where
    H: HashingStrategy<T>,
{
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        // Growth is left to insertion: the input may repeat elements.
        for value in iter {
            self.add(value);
        }
    }
}
