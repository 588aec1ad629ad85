// Scene lifecycle: Uninitialized → Running → Disposed.
//
// The frame driver checks `may_tick()` before doing any per-frame work and
// before scheduling the next redraw, so teardown only has to flip the phase
// to guarantee no tick touches a released resource. Disposal is idempotent.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Running,
    Disposed,
}

#[derive(Debug)]
pub struct Lifecycle {
    phase: Phase,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            phase: Phase::Uninitialized,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Mount finished; ticks may start. A disposed scene stays disposed.
    pub fn start(&mut self) {
        if self.phase == Phase::Uninitialized {
            self.phase = Phase::Running;
        }
    }

    /// True while frame ticks (and redraw rescheduling) are allowed.
    pub fn may_tick(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Begin teardown. Returns true on the transition, false on repeat
    /// calls — tearing down twice must not fault and must do nothing.
    pub fn dispose(&mut self) -> bool {
        if self.phase == Phase::Disposed {
            return false;
        }
        self.phase = Phase::Disposed;
        true
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_only_happen_while_running() {
        let mut lc = Lifecycle::new();
        assert!(!lc.may_tick());
        lc.start();
        assert!(lc.may_tick());
        lc.dispose();
        assert!(!lc.may_tick());
    }

    #[test]
    fn dispose_before_first_tick_is_safe() {
        let mut lc = Lifecycle::new();
        assert!(lc.dispose());
        assert!(!lc.may_tick());
        // A disposed scene cannot be restarted.
        lc.start();
        assert_eq!(lc.phase(), Phase::Disposed);
        assert!(!lc.may_tick());
    }

    #[test]
    fn double_dispose_is_a_no_op() {
        let mut lc = Lifecycle::new();
        lc.start();
        assert!(lc.dispose());
        assert!(!lc.dispose());
        assert_eq!(lc.phase(), Phase::Disposed);
    }
}
