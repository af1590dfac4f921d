//! Capture on/off state and recorded transaction count.

/// Whether capture is active, and how many transactions have been recorded.
///
/// `active` only changes through [`CaptureState::toggle`], once per executed sentinel.
/// The count only grows, and callers only bump it while active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaptureState {
    active: bool,
    recorded: u64,
}

impl CaptureState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: false,
            recorded: 0,
        }
    }

    /// Flip capture and return the new state.
    pub const fn toggle(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }

    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Count one recorded transaction.
    #[inline]
    pub const fn record_one(&mut self) {
        debug_assert!(self.active);
        self.recorded += 1;
    }

    #[must_use]
    pub const fn snapshot_count(&self) -> u64 {
        self.recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_inactive() {
        let state = CaptureState::new();
        assert!(!state.is_active());
        assert_eq!(state.snapshot_count(), 0);
        assert_eq!(state, CaptureState::default());
    }

    #[test]
    fn test_toggle_parity() {
        let mut state = CaptureState::new();
        for n in 1..=7u32 {
            let active = state.toggle();
            assert_eq!(active, n % 2 == 1);
            assert_eq!(state.is_active(), active);
        }
    }

    #[test]
    fn test_record_counts() {
        let mut state = CaptureState::new();
        state.toggle();
        state.record_one();
        state.record_one();
        state.toggle();
        assert_eq!(state.snapshot_count(), 2);
        assert!(!state.is_active());
    }
}
