//! Explicit init/uninit lifecycle around a [`Matcher`]

use tracing::debug;

use crate::matcher::{Matcher, MatcherError};

/// Storage that holds a matcher once initialized.
///
/// Initializing twice or adding to an empty slot is an error; checking an
/// empty slot is a miss that records nothing.
#[derive(Debug, Default)]
pub struct MatcherSlot {
    matcher: Option<Matcher>,
}

impl MatcherSlot {
    /// Create an uninitialized slot
    pub const fn new() -> Self {
        Self { matcher: None }
    }

    pub fn is_initialized(&self) -> bool {
        self.matcher.is_some()
    }

    /// Build a matcher from `list` in this slot
    pub fn init(&mut self, list: Option<&str>) -> Result<&mut Matcher, MatcherError> {
        if self.matcher.is_some() {
            return Err(MatcherError::AlreadyInitialized);
        }
        Ok(self.matcher.insert(Matcher::new(list)))
    }

    /// Drop the matcher, if any. Safe to call repeatedly.
    pub fn uninit(&mut self) {
        if let Some(matcher) = self.matcher.take() {
            debug!(patterns = matcher.len(), version = matcher.version(), "Released matcher");
        }
    }

    pub fn add(&mut self, pattern: &str) -> Result<bool, MatcherError> {
        self.matcher
            .as_mut()
            .ok_or(MatcherError::NotInitialized)?
            .add(pattern)
    }

    /// `false` for an uninitialized slot
    pub fn check(&mut self, input: &[u8]) -> bool {
        self.matcher.as_mut().map_or(false, |m| m.check(input))
    }

    /// Clone this slot's matcher into an uninitialized `dest`.
    ///
    /// On failure `dest` stays uninitialized.
    pub fn clone_to(&self, dest: &mut MatcherSlot) -> Result<(), MatcherError> {
        let source = self.matcher.as_ref().ok_or(MatcherError::NotInitialized)?;
        if dest.is_initialized() {
            return Err(MatcherError::AlreadyInitialized);
        }
        dest.matcher = Some(source.try_clone()?);
        Ok(())
    }

    pub fn get(&self) -> Option<&Matcher> {
        self.matcher.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut Matcher> {
        self.matcher.as_mut()
    }
}

impl From<Matcher> for MatcherSlot {
    fn from(matcher: Matcher) -> Self {
        Self {
            matcher: Some(matcher),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_init_rejected() {
        let mut slot = MatcherSlot::new();
        slot.init(Some("a")).unwrap();
        assert_eq!(slot.init(None).unwrap_err(), MatcherError::AlreadyInitialized);
        // First matcher untouched
        assert_eq!(slot.get().unwrap().len(), 1);
    }

    #[test]
    fn test_uninitialized_slot() {
        let mut slot = MatcherSlot::default();
        assert!(!slot.check(b"abc"));
        assert_eq!(slot.add("abc"), Err(MatcherError::NotInitialized));
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_uninit_then_reinit() {
        let mut slot = MatcherSlot::new();
        slot.init(Some("old|stale")).unwrap();
        assert!(slot.check(b"older"));

        slot.uninit();
        assert!(!slot.is_initialized());

        let matcher = slot.init(Some("new")).unwrap();
        assert_eq!(matcher.patterns().collect::<Vec<_>>(), vec!["new"]);
        assert_eq!(matcher.misses(), 0);
        assert!(!slot.check(b"older"));
    }

    #[test]
    fn test_uninit_twice() {
        let mut slot = MatcherSlot::new();
        slot.init(Some("x")).unwrap();
        slot.uninit();
        slot.uninit();
        assert!(!slot.is_initialized());

        let mut never = MatcherSlot::new();
        never.uninit();
        assert!(!never.is_initialized());
    }

    #[test]
    fn test_add_through_slot() {
        let mut slot = MatcherSlot::new();
        let version = slot.init(None).unwrap().version();
        assert_eq!(slot.add("cmd:"), Ok(true));
        assert_eq!(slot.add(""), Ok(false));
        assert!(slot.check(b"cmd:run"));
        assert_eq!(slot.get().unwrap().version(), version + 1);
    }

    #[test]
    fn test_get_mut() {
        let mut slot = MatcherSlot::new();
        assert!(slot.get_mut().is_none());

        slot.init(Some("a|b")).unwrap();
        slot.check(b"apple");
        slot.check(b"zebra");

        let matcher = slot.get_mut().unwrap();
        assert_eq!(matcher.add("z"), Ok(true));
        matcher.reset_stats();
        assert!(slot.check(b"zebra"));
        assert_eq!(slot.get().unwrap().hits(2), Some(1));
        assert_eq!(slot.get().unwrap().misses(), 0);
    }

    #[test]
    fn test_clone_to() {
        let mut source = MatcherSlot::new();
        source.init(Some("ab|cd")).unwrap();
        source.check(b"abc");

        let mut dest = MatcherSlot::new();
        source.clone_to(&mut dest).unwrap();

        let copy = dest.get().unwrap();
        assert_eq!(copy.version(), source.get().unwrap().version());
        assert_eq!(copy.hits(0), Some(0));
        assert_eq!(copy.capacity(), 2);
    }

    #[test]
    fn test_clone_preconditions() {
        let empty = MatcherSlot::new();
        let mut dest = MatcherSlot::new();
        assert_eq!(empty.clone_to(&mut dest), Err(MatcherError::NotInitialized));
        assert!(!dest.is_initialized());

        let source = MatcherSlot::from(Matcher::new(Some("a")));
        let mut taken = MatcherSlot::from(Matcher::new(Some("b")));
        assert_eq!(source.clone_to(&mut taken), Err(MatcherError::AlreadyInitialized));
        assert_eq!(taken.get().unwrap().to_string(), "b");
    }
}
