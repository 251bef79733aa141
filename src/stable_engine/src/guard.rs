use crate::logs::DEBUG;
use ic_canister_log::log;
use std::cell::Cell;

#[derive(Debug, PartialEq, Eq)]
pub enum GuardError {
    AlreadyProcessing,
}

/// Non-reentrancy lock held for the whole of a mutating operation.
///
/// Entering while another guarded operation is in progress fails immediately.
/// The flag is cleared on drop, so early returns and failures release it too.
#[must_use]
pub struct ReentrancyGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> ReentrancyGuard<'a> {
    pub fn new(flag: &'a Cell<bool>, operation_name: &str) -> Result<Self, GuardError> {
        if flag.get() {
            log!(
                DEBUG,
                "[guard] rejected re-entry into '{}' while another operation is in progress",
                operation_name
            );
            return Err(GuardError::AlreadyProcessing);
        }
        flag.set(true);
        Ok(Self { flag })
    }
}

impl Drop for ReentrancyGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_rejects_nested_entry() {
        let flag = Cell::new(false);
        let guard = ReentrancyGuard::new(&flag, "outer").unwrap();
        assert_eq!(
            ReentrancyGuard::new(&flag, "inner").err(),
            Some(GuardError::AlreadyProcessing)
        );
        drop(guard);
        assert!(!flag.get());
        assert!(ReentrancyGuard::new(&flag, "again").is_ok());
    }

    #[test]
    fn test_guard_released_on_early_return() {
        fn failing(flag: &Cell<bool>) -> Result<(), GuardError> {
            let _guard = ReentrancyGuard::new(flag, "failing")?;
            Err(GuardError::AlreadyProcessing)
        }
        let flag = Cell::new(false);
        assert!(failing(&flag).is_err());
        assert!(!flag.get());
    }
}
