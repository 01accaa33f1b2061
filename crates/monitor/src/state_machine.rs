#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezeState {
    Live,
    Frozen,
}

/// Debounced freeze classification. Only transitions are reported, so a
/// sustained freeze yields a single `Frozen` event.
#[derive(Debug)]
pub struct FreezeContext {
    current_state: FreezeState,
    consecutive_similar_count: u32,
}

impl FreezeContext {
    pub fn new() -> Self {
        Self {
            current_state: FreezeState::Live,
            consecutive_similar_count: 0,
        }
    }

    pub fn update(&mut self, similar: bool, threshold: u32) -> Option<FreezeState> {
        let old_state = self.current_state;

        if similar {
            self.consecutive_similar_count = self.consecutive_similar_count.saturating_add(1);
            if self.consecutive_similar_count >= threshold.max(1) {
                self.current_state = FreezeState::Frozen;
            }
        } else {
            self.consecutive_similar_count = 0;
            self.current_state = FreezeState::Live;
        }

        if old_state != self.current_state {
            Some(self.current_state)
        } else {
            None
        }
    }

    pub fn current_state(&self) -> FreezeState {
        self.current_state
    }

    pub fn is_frozen(&self) -> bool {
        self.current_state == FreezeState::Frozen
    }

    pub fn consecutive_similar_count(&self) -> u32 {
        self.consecutive_similar_count
    }
}

impl Default for FreezeContext {
    fn default() -> Self {
        Self::new()
    }
}
