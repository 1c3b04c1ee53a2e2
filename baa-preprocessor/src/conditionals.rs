//! Conditional-compilation state: the pair of parallel stacks recording,
//! per open `#إذا`, whether the current branch is active and whether any
//! branch at that level has been taken yet.

use tracing::warn;

#[derive(Debug, Default)]
pub struct ConditionalStack {
    active: Vec<bool>,
    branch_taken: Vec<bool>,
    skipping: bool,
}

impl ConditionalStack {
    /// True while the current line lies in an inactive conditional region.
    pub fn skipping(&self) -> bool {
        self.skipping
    }

    pub fn depth(&self) -> usize {
        self.active.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Both stacks always move together; `skipping` is recomputed after
    /// every change.
    fn recompute_skipping(&mut self) {
        self.skipping = self.active.iter().any(|&met| !met);
    }

    /// Opens a conditional level with the given condition result.
    pub fn push(&mut self, met: bool) {
        self.active.push(met);
        self.branch_taken.push(met);
        self.recompute_skipping();
    }

    /// Closes the innermost level. Returns false when there is none.
    pub fn pop(&mut self) -> bool {
        if self.active.is_empty() {
            return false;
        }
        self.active.pop();
        self.branch_taken.pop();
        self.recompute_skipping();
        true
    }

    /// Whether a branch at the innermost level has already been taken.
    /// Returns `None` when no level is open.
    pub fn branch_already_taken(&self) -> Option<bool> {
        self.branch_taken.last().copied()
    }

    /// `#إلا` / `#وإلا_إذا` with a met condition: activate the branch and
    /// mark the level as taken.
    pub fn take_branch(&mut self) {
        if let (Some(active), Some(taken)) =
            (self.active.last_mut(), self.branch_taken.last_mut())
        {
            *active = true;
            *taken = true;
        }
        self.recompute_skipping();
    }

    /// Deactivates the innermost branch without marking the level taken.
    pub fn reject_branch(&mut self) {
        if let Some(active) = self.active.last_mut() {
            *active = false;
        }
        self.recompute_skipping();
    }

    /// Recovery: caps the depth, re-synchronises the two stacks if they
    /// have drifted apart, and recomputes the skipping state.
    pub fn recover(&mut self, max_depth: usize) {
        if self.active.len() != self.branch_taken.len() {
            warn!(
                active = self.active.len(),
                branch_taken = self.branch_taken.len(),
                "conditional stacks drifted; re-synchronising"
            );
            let len = self.active.len().min(self.branch_taken.len());
            self.active.truncate(len);
            self.branch_taken.truncate(len);
        }
        if self.active.len() > max_depth {
            self.active.truncate(max_depth);
            self.branch_taken.truncate(max_depth);
        }
        self.recompute_skipping();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stacks_stay_parallel() {
        let mut stack = ConditionalStack::default();
        stack.push(true);
        stack.push(false);
        assert_eq!(stack.depth(), 2);
        assert!(stack.skipping());
        assert!(stack.pop());
        assert!(!stack.skipping());
        assert!(stack.pop());
        assert!(!stack.pop());
    }

    #[test]
    fn else_flips_untaken_level() {
        let mut stack = ConditionalStack::default();
        stack.push(false);
        assert!(stack.skipping());
        assert_eq!(stack.branch_already_taken(), Some(false));
        stack.take_branch();
        assert!(!stack.skipping());
        assert_eq!(stack.branch_already_taken(), Some(true));
    }

    #[test]
    fn else_after_taken_branch_deactivates() {
        let mut stack = ConditionalStack::default();
        stack.push(true);
        assert_eq!(stack.branch_already_taken(), Some(true));
        stack.reject_branch();
        assert!(stack.skipping());
    }

    #[test]
    fn recovery_caps_depth() {
        let mut stack = ConditionalStack::default();
        for _ in 0..40 {
            stack.push(true);
        }
        stack.recover(32);
        assert_eq!(stack.depth(), 32);
        assert!(!stack.skipping());
    }
}
