//! Errors reported by the set and its table.

/// Coarse classification of a [`SetError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A construction or partition parameter was out of range.
    InvalidArgument,
    /// A null element was given to a strategy that cannot hash it.
    NullElement,
    /// A cursor operation was called in the wrong state.
    IllegalState,
    /// A cursor was advanced past its last element.
    NoSuchElement,
}

/// Errors that can be returned by [`UnifiedSet`](crate::UnifiedSet) and
/// [`ChainedTable`](crate::ChainedTable).
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum SetError {
    /// The load factor was not in `(0, 1]`.
    #[error("invalid load factor {0}: must be greater than 0 and at most 1")]
    InvalidLoadFactor(f32),

    /// The requested capacity needs more slots than `usize` can address.
    #[error("capacity {0} overflows the addressable table length")]
    CapacityOverflow(usize),

    /// A batch section did not name a valid slice of the table.
    #[error("invalid batch section {index} of {count}")]
    InvalidSection {
        /// Requested section index.
        index: usize,
        /// Requested number of sections.
        count: usize,
    },

    /// A null element was passed to a pool operation under a hashing
    /// strategy that is not null-safe.
    #[error("null element given to a hashing strategy that is not null-safe")]
    NullElement,

    /// `remove` was called on a cursor without a preceding unconsumed
    /// `advance`.
    #[error("cursor has no current element to remove")]
    IllegalState,

    /// A cursor was advanced after its last element.
    #[error("cursor has no more elements")]
    NoSuchElement,
}

impl SetError {
    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidLoadFactor(_) | Self::CapacityOverflow(_) | Self::InvalidSection { .. } => {
                ErrorKind::InvalidArgument
            }
            Self::NullElement => ErrorKind::NullElement,
            Self::IllegalState => ErrorKind::IllegalState,
            Self::NoSuchElement => ErrorKind::NoSuchElement,
        }
    }

    /// Returns `true` for errors caused by bad constructor or partition
    /// arguments.
    pub fn is_invalid_argument(&self) -> bool {
        self.kind() == ErrorKind::InvalidArgument
    }
}
