use alloc::rc::Rc;
use alloc::sync::Arc;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::marker::PhantomData;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by [`NaturalStrategy`] and [`FnStrategy`]
        /// when none is given.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by [`NaturalStrategy`] and [`FnStrategy`]
        /// when none is given.
        pub type DefaultHashBuilder = std::collections::hash_map::RandomState;
    } else {
        /// Placeholder used when neither `foldhash` nor `std` is enabled.
        ///
        /// It cannot be constructed, so a hasher builder must be supplied
        /// explicitly.
        #[derive(Clone, Copy, Debug)]
        pub enum DefaultHashBuilder {}
    }
}

/// The hashing and equality policy of a set.
///
/// A strategy decides which values are considered the same element. Two
/// values for which [`equals`](HashingStrategy::equals) returns `true` must
/// produce the same [`compute_hash`](HashingStrategy::compute_hash).
///
/// Null elements never reach `compute_hash` or `equals`; they are stored in
/// a dedicated flag. A strategy only declares whether null is an acceptable
/// element through [`is_null_safe`](HashingStrategy::is_null_safe).
pub trait HashingStrategy<T: ?Sized> {
    /// Computes the hash of `value`.
    fn compute_hash(&self, value: &T) -> u64;

    /// Returns `true` if `a` and `b` are the same element.
    fn equals(&self, a: &T, b: &T) -> bool;

    /// Returns `true` if the strategy defines a behavior for null elements.
    fn is_null_safe(&self) -> bool {
        false
    }
}

impl<T: ?Sized, H: HashingStrategy<T> + ?Sized> HashingStrategy<T> for &H {
    #[inline]
    fn compute_hash(&self, value: &T) -> u64 {
        (**self).compute_hash(value)
    }

    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        (**self).equals(a, b)
    }

    #[inline]
    fn is_null_safe(&self) -> bool {
        (**self).is_null_safe()
    }
}

/// Hashes with [`Hash`] and compares with [`Eq`].
///
/// This is the default strategy of a set. It is null-safe.
#[derive(Clone, Debug, Default)]
pub struct NaturalStrategy<S = DefaultHashBuilder> {
    hash_builder: S,
}

#[cfg(any(feature = "std", feature = "foldhash"))]
impl NaturalStrategy {
    /// Creates a strategy using the default hasher builder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S> NaturalStrategy<S> {
    /// Creates a strategy using the given hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self { hash_builder }
    }

    /// Returns the hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }
}

impl<T, S> HashingStrategy<T> for NaturalStrategy<S>
where
    T: Hash + Eq + ?Sized,
    S: BuildHasher,
{
    #[inline]
    fn compute_hash(&self, value: &T) -> u64 {
        self.hash_builder.hash_one(value)
    }

    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        a == b
    }

    fn is_null_safe(&self) -> bool {
        true
    }
}

/// Hashes and compares elements by a key derived from them.
///
/// Two elements are the same when `key(a) == key(b)`.
///
/// # Examples
///
/// ```rust
/// # #[cfg(any(feature = "std", feature = "foldhash"))]
/// # {
/// use unified_set::FnStrategy;
/// use unified_set::UnifiedSet;
///
/// let mut set = UnifiedSet::with_strategy(FnStrategy::new(|s: &String| s.to_lowercase()));
/// assert!(set.add("Hello".to_string()));
/// assert!(!set.add("HELLO".to_string()));
/// assert_eq!(set.get(&"hello".to_string()).map(String::as_str), Some("Hello"));
/// # }
/// ```
pub struct FnStrategy<F, S = DefaultHashBuilder> {
    key: F,
    hash_builder: S,
    null_safe: bool,
}

impl<F, S> FnStrategy<F, S> {
    /// Creates a function-derived strategy with an explicit hasher builder.
    pub fn with_hasher(key: F, hash_builder: S) -> Self {
        Self {
            key,
            hash_builder,
            null_safe: false,
        }
    }

    /// Marks the strategy as accepting null elements.
    pub fn null_safe(mut self) -> Self {
        self.null_safe = true;
        self
    }
}

#[cfg(any(feature = "std", feature = "foldhash"))]
impl<F> FnStrategy<F, DefaultHashBuilder> {
    /// Creates a function-derived strategy using the default hasher builder.
    pub fn new(key: F) -> Self {
        Self::with_hasher(key, DefaultHashBuilder::default())
    }
}

impl<F: Clone, S: Clone> Clone for FnStrategy<F, S> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            hash_builder: self.hash_builder.clone(),
            null_safe: self.null_safe,
        }
    }
}

impl<T, K, F, S> HashingStrategy<T> for FnStrategy<F, S>
where
    T: ?Sized,
    F: Fn(&T) -> K,
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn compute_hash(&self, value: &T) -> u64 {
        self.hash_builder.hash_one((self.key)(value))
    }

    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        (self.key)(a) == (self.key)(b)
    }

    fn is_null_safe(&self) -> bool {
        self.null_safe
    }
}

/// Hashes and compares shared pointers by address.
///
/// Two `Rc`/`Arc`/`&T` elements are the same only if they point to the same
/// allocation.
#[derive(Debug)]
pub struct IdentityStrategy<S = DefaultHashBuilder> {
    hash_builder: S,
}

impl<S: Default> Default for IdentityStrategy<S> {
    fn default() -> Self {
        Self {
            hash_builder: S::default(),
        }
    }
}

impl<S: Clone> Clone for IdentityStrategy<S> {
    fn clone(&self) -> Self {
        Self {
            hash_builder: self.hash_builder.clone(),
        }
    }
}

impl<S> IdentityStrategy<S> {
    /// Creates an identity strategy using the given hasher builder.
    pub fn with_hasher(hash_builder: S) -> Self {
        Self { hash_builder }
    }
}

impl<S: BuildHasher> IdentityStrategy<S> {
    #[inline]
    fn hash_address<T: ?Sized>(&self, ptr: *const T) -> u64 {
        self.hash_builder.hash_one(ptr.cast::<()>() as usize)
    }
}

impl<T: ?Sized, S: BuildHasher> HashingStrategy<Rc<T>> for IdentityStrategy<S> {
    fn compute_hash(&self, value: &Rc<T>) -> u64 {
        self.hash_address(Rc::as_ptr(value))
    }

    fn equals(&self, a: &Rc<T>, b: &Rc<T>) -> bool {
        Rc::ptr_eq(a, b)
    }

    fn is_null_safe(&self) -> bool {
        true
    }
}

impl<T: ?Sized, S: BuildHasher> HashingStrategy<Arc<T>> for IdentityStrategy<S> {
    fn compute_hash(&self, value: &Arc<T>) -> u64 {
        self.hash_address(Arc::as_ptr(value))
    }

    fn equals(&self, a: &Arc<T>, b: &Arc<T>) -> bool {
        Arc::ptr_eq(a, b)
    }

    fn is_null_safe(&self) -> bool {
        true
    }
}

impl<T: ?Sized, S: BuildHasher> HashingStrategy<&T> for IdentityStrategy<S> {
    fn compute_hash(&self, value: &&T) -> u64 {
        self.hash_address(*value as *const T)
    }

    fn equals(&self, a: &&T, b: &&T) -> bool {
        core::ptr::eq(*a, *b)
    }

    fn is_null_safe(&self) -> bool {
        true
    }
}

/// Wraps a strategy so that it accepts null elements.
#[derive(Clone, Debug, Default)]
pub struct NullSafe<H>(pub H);

impl<T: ?Sized, H: HashingStrategy<T>> HashingStrategy<T> for NullSafe<H> {
    #[inline]
    fn compute_hash(&self, value: &T) -> u64 {
        self.0.compute_hash(value)
    }

    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        self.0.equals(a, b)
    }

    fn is_null_safe(&self) -> bool {
        true
    }
}

/// A strategy assembled from a hash function and an equality function.
///
/// Not null-safe unless wrapped in [`NullSafe`].
pub struct FunctionPair<T: ?Sized, HF, EF> {
    hash: HF,
    eq: EF,
    _phantom: PhantomData<fn(&T)>,
}

impl<T: ?Sized, HF, EF> FunctionPair<T, HF, EF>
where
    HF: Fn(&T) -> u64,
    EF: Fn(&T, &T) -> bool,
{
    /// Creates a strategy from its two functions.
    pub fn new(hash: HF, eq: EF) -> Self {
        Self {
            hash,
            eq,
            _phantom: PhantomData,
        }
    }
}

impl<T: ?Sized, HF: Clone, EF: Clone> Clone for FunctionPair<T, HF, EF> {
    fn clone(&self) -> Self {
        Self {
            hash: self.hash.clone(),
            eq: self.eq.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T: ?Sized, HF, EF> HashingStrategy<T> for FunctionPair<T, HF, EF>
where
    HF: Fn(&T) -> u64,
    EF: Fn(&T, &T) -> bool,
{
    #[inline]
    fn compute_hash(&self, value: &T) -> u64 {
        (self.hash)(value)
    }

    #[inline]
    fn equals(&self, a: &T, b: &T) -> bool {
        (self.eq)(a, b)
    }
}
