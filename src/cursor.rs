//! A removal-capable cursor over a [`ChainedTable`].

use crate::error::SetError;
use crate::hash_table::ChainedTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Null,
    Entry { slot: usize, offset: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    ReadyToAdvance,
    AwaitingRemoveDecision(Position),
}

/// A cursor that walks every element of a table once and can remove the
/// element it last yielded.
///
/// The walk yields null first (as `None`), then slots in ascending order and
/// chain entries in storage order. Removing an element from a chain moves the
/// chain's trailing entry into the freed position; the cursor accounts for
/// that and still yields every remaining element exactly once.
///
/// # Examples
///
/// ```rust
/// # #[cfg(any(feature = "std", feature = "foldhash"))]
/// # {
/// use unified_set::UnifiedSet;
///
/// let mut set: UnifiedSet<u32> = (0..10).collect();
///
/// let mut cursor = set.cursor();
/// while cursor.has_next() {
///     let odd = cursor.advance().unwrap().is_some_and(|v| v % 2 == 1);
///     if odd {
///         cursor.remove().unwrap();
///     }
/// }
///
/// assert_eq!(set.len(), 5);
/// assert!(set.values().all(|v| v % 2 == 0));
/// # }
/// ```
pub struct Cursor<'a, T> {
    table: &'a mut ChainedTable<T>,
    null_pending: bool,
    slot: usize,
    offset: usize,
    state: CursorState,
}

impl<'a, T> Cursor<'a, T> {
    pub(crate) fn new(table: &'a mut ChainedTable<T>) -> Self {
        let mut cursor = Self {
            null_pending: table.has_null(),
            table,
            slot: 0,
            offset: 0,
            state: CursorState::ReadyToAdvance,
        };
        cursor.seek();
        cursor
    }

    /// Moves the pending position forward to the next occupied entry.
    fn seek(&mut self) {
        let slot_count = self.table.slot_count();
        while self.slot < slot_count && self.offset >= self.table.slot_len(self.slot) {
            self.slot += 1;
            self.offset = 0;
        }
    }

    /// Returns `true` if a call to [`advance`](Self::advance) would yield an
    /// element.
    pub fn has_next(&self) -> bool {
        self.null_pending || self.slot < self.table.slot_count()
    }

    /// Yields the next element, `None` standing for null.
    ///
    /// Returns [`SetError::NoSuchElement`] once every element has been
    /// yielded.
    pub fn advance(&mut self) -> Result<Option<&T>, SetError> {
        if self.null_pending {
            self.null_pending = false;
            self.state = CursorState::AwaitingRemoveDecision(Position::Null);
            return Ok(None);
        }

        if self.slot >= self.table.slot_count() {
            return Err(SetError::NoSuchElement);
        }

        let (slot, offset) = (self.slot, self.offset);
        self.offset += 1;
        self.seek();
        self.state = CursorState::AwaitingRemoveDecision(Position::Entry { slot, offset });
        Ok(Some(self.table.value_at(slot, offset)))
    }

    /// Removes the element most recently yielded by
    /// [`advance`](Self::advance) and returns it. Removing null returns
    /// `Ok(None)`.
    ///
    /// Returns [`SetError::IllegalState`] if nothing has been yielded since
    /// the last removal.
    pub fn remove(&mut self) -> Result<Option<T>, SetError> {
        match core::mem::replace(&mut self.state, CursorState::ReadyToAdvance) {
            CursorState::ReadyToAdvance => Err(SetError::IllegalState),
            CursorState::AwaitingRemoveDecision(Position::Null) => {
                self.table.remove_null();
                Ok(None)
            }
            CursorState::AwaitingRemoveDecision(Position::Entry { slot, offset }) => {
                let value = self.table.remove_at(slot, offset);
                // The slot's trailing entry now sits at `offset` and has not
                // been yielded yet.
                if offset < self.table.slot_len(slot) {
                    self.slot = slot;
                    self.offset = offset;
                }
                Ok(Some(value))
            }
        }
    }

    /// Walks every element not yet yielded, removing those for which `keep`
    /// returns `false`.
    pub(crate) fn retain(mut self, mut keep: impl FnMut(Option<&T>) -> bool) {
        if self.null_pending {
            self.null_pending = false;
            if !keep(None) {
                self.table.remove_null();
            }
        }

        while self.slot < self.table.slot_count() {
            let (slot, offset) = (self.slot, self.offset);
            if keep(Some(self.table.value_at(slot, offset))) {
                self.offset += 1;
            } else {
                // The slot's trailing entry, if any, moves into `offset`.
                self.table.remove_at(slot, offset);
            }
            self.seek();
        }
    }
}
