//! Ownership guard

use crate::error::{Error, Result};
use crate::models::{Note, UserId};

/// Pass only when `caller` owns `note`.
///
/// Every operation that addresses a note by ID goes through this check
/// before reading or mutating it.
pub fn authorize(caller: &UserId, note: &Note) -> Result<()> {
    if note.owner == *caller {
        Ok(())
    } else {
        Err(Error::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewNote;

    #[test]
    fn owner_is_granted() {
        let owner = UserId::new("alice");
        let note = Note::new(owner.clone(), NewNote::titled("Mine"));
        assert!(authorize(&owner, &note).is_ok());
    }

    #[test]
    fn other_user_is_forbidden() {
        let note = Note::new(UserId::new("alice"), NewNote::titled("Mine"));
        let err = authorize(&UserId::new("bob"), &note).unwrap_err();
        assert!(matches!(err, Error::Forbidden));
    }
}
