//! Shared management surface for process composites.

use thermand_types::ErrorCode;
use thiserror::Error;

use crate::Process;

/// Error from a composite's structural mutation.
///
/// Structure is configuration: these are raised when a composition is
/// built or edited, never at tick time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// A child with this name already exists in the composite.
    #[error("duplicate child name: {0}")]
    DuplicateChild(String),

    /// The named insertion target does not exist.
    #[error("child not found: {0}")]
    ChildNotFound(String),
}

impl ErrorCode for CollectionError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateChild(_) => "COLLECTION_DUPLICATE_CHILD",
            Self::ChildNotFound(_) => "COLLECTION_CHILD_NOT_FOUND",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Management surface shared by [`Pipeline`](crate::Pipeline) and
/// [`System`](crate::System).
///
/// The two composites schedule their children very differently - a
/// pipeline threads state through them in order, a system interleaves
/// them on independent cadences - but are built and edited the same
/// way. Child names are unique within a composite; lookups are by
/// name.
///
/// For a pipeline, position is data-flow order. For a system, position
/// is the tie-break order between children due at the same instant, so
/// `insert_before`/`insert_after` are meaningful there too.
pub trait Collection {
    /// Number of children.
    fn count(&self) -> usize;

    /// Returns `true` if there are no children.
    fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Returns `true` if a child with the given name exists.
    fn has(&self, name: &str) -> bool;

    /// Looks up a child by name.
    fn child(&self, name: &str) -> Option<&dyn Process>;

    /// Child names in positional order.
    fn child_names(&self) -> Vec<&str>;

    /// Adds a child at the end.
    ///
    /// # Errors
    ///
    /// [`CollectionError::DuplicateChild`] if the name is taken.
    fn append(&mut self, child: Box<dyn Process>) -> Result<(), CollectionError>;

    /// Inserts a child immediately before the named target.
    ///
    /// # Errors
    ///
    /// [`CollectionError::ChildNotFound`] if the target is absent;
    /// [`CollectionError::DuplicateChild`] if the name is taken.
    fn insert_before(
        &mut self,
        target: &str,
        child: Box<dyn Process>,
    ) -> Result<(), CollectionError>;

    /// Inserts a child immediately after the named target.
    ///
    /// # Errors
    ///
    /// Same as [`Collection::insert_before`].
    fn insert_after(
        &mut self,
        target: &str,
        child: Box<dyn Process>,
    ) -> Result<(), CollectionError>;

    /// Removes a child by name; returns `true` if one was removed.
    fn remove(&mut self, name: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermand_types::assert_error_codes;

    #[test]
    fn codes_follow_convention() {
        assert_error_codes(
            &[
                CollectionError::DuplicateChild("a".into()),
                CollectionError::ChildNotFound("b".into()),
            ],
            "COLLECTION_",
        );
    }

    #[test]
    fn errors_are_not_recoverable() {
        assert!(!CollectionError::DuplicateChild("a".into()).is_recoverable());
        assert!(!CollectionError::ChildNotFound("b".into()).is_recoverable());
    }
}
