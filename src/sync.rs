use parking_lot::Mutex;

use crate::cursor::Cursor;
use crate::error::SetError;
use crate::hash_set::UnifiedSet;
use crate::strategy::HashingStrategy;
use crate::strategy::NaturalStrategy;

/// A [`UnifiedSet`] behind a single [`parking_lot::Mutex`].
///
/// Every operation takes the lock for its whole duration, readers included.
/// Pool lookups hand out clones since references cannot outlive the lock.
/// Traversals that may remove elements run inside
/// [`with_cursor`](Self::with_cursor), which holds the lock until the
/// closure returns.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::thread;
///
/// use unified_set::SynchronizedSet;
///
/// let set: Arc<SynchronizedSet<u32>> = Arc::new(SynchronizedSet::default());
/// let handles: Vec<_> = (0..4)
///     .map(|t| {
///         let set = Arc::clone(&set);
///         thread::spawn(move || {
///             for v in 0..100 {
///                 set.add(t * 100 + v);
///             }
///         })
///     })
///     .collect();
/// for handle in handles {
///     handle.join().unwrap();
/// }
/// assert_eq!(set.len(), 400);
/// ```
pub struct SynchronizedSet<T, H = NaturalStrategy> {
    inner: Mutex<UnifiedSet<T, H>>,
}

impl<T, H: Default> Default for SynchronizedSet<T, H> {
    fn default() -> Self {
        Self::new(UnifiedSet::default())
    }
}

impl<T, H> From<UnifiedSet<T, H>> for SynchronizedSet<T, H> {
    fn from(set: UnifiedSet<T, H>) -> Self {
        Self::new(set)
    }
}

impl<T, H> SynchronizedSet<T, H> {
    /// Wraps `set`.
    pub fn new(set: UnifiedSet<T, H>) -> Self {
        Self {
            inner: Mutex::new(set),
        }
    }

    /// Unwraps the set.
    pub fn into_inner(self) -> UnifiedSet<T, H> {
        self.inner.into_inner()
    }

    /// Returns the number of elements, null included.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns `true` if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns `true` if the set contains null.
    pub fn contains_null(&self) -> bool {
        self.inner.lock().contains_null()
    }

    /// Removes null. Returns `true` if it was present.
    pub fn remove_null(&self) -> bool {
        self.inner.lock().remove_null()
    }

    /// Runs `f` with a cursor over the set, holding the lock throughout.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use unified_set::SynchronizedSet;
    ///
    /// let set: SynchronizedSet<i32> = SynchronizedSet::new((0..10).collect());
    /// let removed = set.with_cursor(|cursor| {
    ///     let mut removed = 0;
    ///     while cursor.has_next() {
    ///         if cursor.advance().unwrap().is_some_and(|v| *v >= 5) {
    ///             cursor.remove().unwrap();
    ///             removed += 1;
    ///         }
    ///     }
    ///     removed
    /// });
    /// assert_eq!(removed, 5);
    /// assert_eq!(set.len(), 5);
    /// ```
    pub fn with_cursor<R>(&self, f: impl FnOnce(&mut Cursor<'_, T>) -> R) -> R {
        let mut guard = self.inner.lock();
        let mut cursor = guard.cursor();
        f(&mut cursor)
    }

    /// See [`UnifiedSet::batch_count`].
    pub fn batch_count(&self, batch_size: usize) -> usize {
        self.inner.lock().batch_count(batch_size)
    }

    /// Runs one batch section while holding the lock. See
    /// [`UnifiedSet::batch_for_each`].
    pub fn batch_for_each<F>(
        &self,
        section_index: usize,
        section_count: usize,
        f: F,
    ) -> Result<(), SetError>
    where
        F: FnMut(Option<&T>),
    {
        self.inner
            .lock()
            .batch_for_each(section_index, section_count, f)
    }
}

impl<T, H> SynchronizedSet<T, H>
where
    H: HashingStrategy<T>,
{
    /// Adds `value`. Returns `true` if it was newly inserted.
    pub fn add(&self, value: T) -> bool {
        self.inner.lock().add(value)
    }

    /// Returns `true` if an equal value is present.
    pub fn contains(&self, value: &T) -> bool {
        self.inner.lock().contains(value)
    }

    /// Removes the equal value. Returns `true` if one was present.
    pub fn remove(&self, value: &T) -> bool {
        self.inner.lock().remove(value)
    }

    /// Removes and returns the stored value equal to `value`.
    pub fn remove_from_pool(&self, value: &T) -> Option<T> {
        self.inner.lock().remove_from_pool(value)
    }

    /// Adds null. See [`UnifiedSet::add_null`].
    pub fn add_null(&self) -> Result<bool, SetError> {
        self.inner.lock().add_null()
    }

    /// Removes null. See [`UnifiedSet::remove_null_from_pool`].
    pub fn remove_null_from_pool(&self) -> Result<Option<T>, SetError> {
        self.inner.lock().remove_null_from_pool()
    }
}

impl<T, H> SynchronizedSet<T, H>
where
    T: Clone,
    H: HashingStrategy<T>,
{
    /// Returns a clone of the stored value equal to `value`.
    pub fn get_cloned(&self, value: &T) -> Option<T> {
        self.inner.lock().get(value).cloned()
    }

    /// Returns a clone of the stored value equal to `value`, storing `value`
    /// first if none exists.
    ///
    /// Concurrent `put_cloned` calls with equal values all observe the same
    /// stored instance.
    pub fn put_cloned(&self, value: T) -> T {
        self.inner.lock().put(value).clone()
    }

    /// Pool lookup for null. See [`UnifiedSet::get_null`].
    pub fn get_null(&self) -> Result<Option<T>, SetError> {
        self.inner.lock().get_null().map(|v| v.cloned())
    }

    /// Pool insertion for null. See [`UnifiedSet::put_null`].
    pub fn put_null(&self) -> Result<Option<T>, SetError> {
        self.inner.lock().put_null().map(|v| v.cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use siphasher::sip::SipHasher;

    use super::*;
    use crate::strategy::FnStrategy;

    #[derive(Clone, Default)]
    struct SipHashBuilder;

    impl core::hash::BuildHasher for SipHashBuilder {
        type Hasher = SipHasher;

        fn build_hasher(&self) -> Self::Hasher {
            SipHasher::new_with_keys(1, 2)
        }
    }

    #[test]
    fn concurrent_puts_agree_on_one_instance() {
        let strategy = FnStrategy::with_hasher(|p: &(u32, usize)| p.0, SipHashBuilder);
        let set = Arc::new(SynchronizedSet::new(UnifiedSet::with_strategy(strategy)));

        let handles: Vec<_> = (0..8usize)
            .map(|t| {
                let set = Arc::clone(&set);
                thread::spawn(move || {
                    (0..200u32)
                        .map(|key| set.put_cloned((key, t)))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<(u32, usize)>> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert_eq!(set.len(), 200);
        for key in 0..200u32 {
            let stored = set.get_cloned(&(key, usize::MAX)).unwrap();
            for result in &results {
                assert_eq!(result[key as usize], stored);
            }
        }
    }

    #[test]
    fn cursor_removal_under_lock() {
        let set: SynchronizedSet<u32, NaturalStrategy<SipHashBuilder>> =
            SynchronizedSet::new((0..100).collect());
        set.add_null().unwrap();

        let removed = set.with_cursor(|cursor| {
            let mut removed = 0;
            while cursor.has_next() {
                if cursor.advance().unwrap().is_none_or(|v| v % 10 != 0) {
                    cursor.remove().unwrap();
                    removed += 1;
                }
            }
            removed
        });

        assert_eq!(removed, 91);
        assert_eq!(set.len(), 10);
        assert!(!set.contains_null());
        assert!(set.contains(&40));
        assert!(!set.contains(&41));
    }

    #[test]
    fn batches_through_the_lock() {
        let set: SynchronizedSet<u32, NaturalStrategy<SipHashBuilder>> =
            SynchronizedSet::new((0..64).collect());
        let sections = set.batch_count(4);
        let mut total = 0;
        for index in 0..sections {
            set.batch_for_each(index, sections, |v| total += v.copied().unwrap_or(0))
                .unwrap();
        }
        assert_eq!(total, (0..64).sum::<u32>());
        assert!(set.batch_for_each(sections, sections, |_| {}).is_err());

        let inner = set.into_inner();
        assert_eq!(inner.len(), 64);
    }

    #[test]
    fn pool_removal_and_null() {
        let set: SynchronizedSet<u32, NaturalStrategy<SipHashBuilder>> = SynchronizedSet::default();
        assert!(set.is_empty());
        assert!(set.add(3));
        assert!(!set.add(3));
        assert_eq!(set.remove_from_pool(&3), Some(3));
        assert!(!set.remove(&3));
        assert_eq!(set.add_null(), Ok(true));
        assert!(set.remove_null());
        assert!(set.is_empty());
    }

    #[test]
    fn null_pool_operations_under_lock() {
        let set: SynchronizedSet<u32, NaturalStrategy<SipHashBuilder>> = SynchronizedSet::default();
        assert_eq!(set.get_null(), Ok(None));
        assert_eq!(set.put_null(), Ok(None));
        assert!(set.contains_null());
        assert_eq!(set.put_null(), Ok(None));
        assert_eq!(set.len(), 1);
        assert_eq!(set.remove_null_from_pool(), Ok(None));
        assert!(!set.contains_null());

        let strict = SynchronizedSet::new(UnifiedSet::with_strategy(FnStrategy::with_hasher(
            |v: &u32| *v,
            SipHashBuilder,
        )));
        assert_eq!(strict.get_null(), Err(SetError::NullElement));
        assert_eq!(strict.put_null(), Err(SetError::NullElement));
        assert_eq!(strict.remove_null_from_pool(), Err(SetError::NullElement));
        assert!(strict.is_empty());
    }
}
