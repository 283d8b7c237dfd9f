//! Two-branch completion join used whenever two backends are queried together.
//!
//! Branch A is conventionally the legacy platform API and branch B the unified
//! credential broker. One armed cycle yields exactly one [`BarrierDecision`].

use crate::status::AuthStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarrierMode {
    /// Decide once both branches succeeded; the first failure decides at once.
    RequireBoth,
    /// Decide on the first success; fail only once both branches failed.
    RaceEitherSucceeds,
    /// Only branch A is armed.
    OnlyBranchA,
    /// Only branch B is armed.
    OnlyBranchB,
}

impl BarrierMode {
    fn arms(self, branch: Branch) -> bool {
        match self {
            Self::RequireBoth | Self::RaceEitherSucceeds => true,
            Self::OnlyBranchA => branch == Branch::A,
            Self::OnlyBranchB => branch == Branch::B,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    A,
    B,
}

/// Terminal decision of one armed cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarrierDecision<A, B> {
    Both(A, B),
    BranchA(A),
    BranchB(B),
    Failed(AuthStatus),
    Cancelled,
}

#[derive(Debug)]
pub struct Barrier<A, B> {
    mode: BarrierMode,
    slot_a: Option<A>,
    slot_b: Option<B>,
    reported_a: bool,
    reported_b: bool,
    first_failure: Option<AuthStatus>,
    decided: bool,
    cancelled: bool,
}

impl<A, B> Default for Barrier<A, B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, B> Barrier<A, B> {
    /// A barrier with no armed cycle.
    pub fn new() -> Self {
        Self {
            mode: BarrierMode::RequireBoth,
            slot_a: None,
            slot_b: None,
            reported_a: false,
            reported_b: false,
            first_failure: None,
            decided: true,
            cancelled: false,
        }
    }

    /// Arm a new cycle. Must not be called while the previous one is undecided.
    pub fn reset(&mut self, mode: BarrierMode) {
        debug_assert!(
            !self.is_outstanding(),
            "Barrier reset while a join is outstanding"
        );
        if self.is_outstanding() {
            tracing::error!(?mode, "Barrier reset while a join is outstanding");
        }
        *self = Self {
            mode,
            decided: false,
            ..Self::new()
        };
        tracing::debug!(?mode, "Barrier armed");
    }

    pub fn mode(&self) -> BarrierMode {
        self.mode
    }

    /// True between `reset` and the cycle's decision.
    pub fn is_outstanding(&self) -> bool {
        !self.decided
    }

    pub fn on_branch_a_success(&mut self, value: A) -> Option<BarrierDecision<A, B>> {
        if !self.accept(Branch::A) {
            return None;
        }
        self.slot_a = Some(value);
        self.on_success()
    }

    pub fn on_branch_a_failure(&mut self, status: AuthStatus) -> Option<BarrierDecision<A, B>> {
        if !self.accept(Branch::A) {
            return None;
        }
        self.on_failure(status)
    }

    pub fn on_branch_b_success(&mut self, value: B) -> Option<BarrierDecision<A, B>> {
        if !self.accept(Branch::B) {
            return None;
        }
        self.slot_b = Some(value);
        self.on_success()
    }

    pub fn on_branch_b_failure(&mut self, status: AuthStatus) -> Option<BarrierDecision<A, B>> {
        if !self.accept(Branch::B) {
            return None;
        }
        self.on_failure(status)
    }

    /// Stop the cycle. Reports `Cancelled` only if no decision was made yet;
    /// branch replies arriving afterwards are dropped.
    pub fn cancel(&mut self) -> Option<BarrierDecision<A, B>> {
        if self.cancelled {
            return None;
        }
        self.cancelled = true;
        if self.decided {
            return None;
        }
        self.decided = true;
        self.slot_a = None;
        self.slot_b = None;
        tracing::debug!(mode = ?self.mode, "Barrier cancelled");
        Some(BarrierDecision::Cancelled)
    }

    /// Records that `branch` reported and tells whether its reply may drive
    /// a decision.
    fn accept(&mut self, branch: Branch) -> bool {
        let reported = match branch {
            Branch::A => &mut self.reported_a,
            Branch::B => &mut self.reported_b,
        };
        if *reported {
            tracing::error!(?branch, "Barrier branch reported twice in one cycle");
            debug_assert!(false, "Barrier branch {branch:?} reported twice in one cycle");
            return false;
        }
        *reported = true;

        if self.cancelled {
            tracing::debug!(?branch, "Dropping branch reply after barrier cancellation");
            return false;
        }
        if self.decided {
            tracing::debug!(?branch, "Dropping branch reply after barrier decision");
            return false;
        }
        if !self.mode.arms(branch) {
            tracing::error!(?branch, mode = ?self.mode, "Reply from a branch that was not armed");
            return false;
        }
        true
    }

    fn on_success(&mut self) -> Option<BarrierDecision<A, B>> {
        let decision = match self.mode {
            BarrierMode::RequireBoth => {
                if self.slot_a.is_none() || self.slot_b.is_none() {
                    return None;
                }
                match (self.slot_a.take(), self.slot_b.take()) {
                    (Some(a), Some(b)) => BarrierDecision::Both(a, b),
                    _ => return None,
                }
            }
            BarrierMode::RaceEitherSucceeds
            | BarrierMode::OnlyBranchA
            | BarrierMode::OnlyBranchB => {
                if let Some(a) = self.slot_a.take() {
                    BarrierDecision::BranchA(a)
                } else if let Some(b) = self.slot_b.take() {
                    BarrierDecision::BranchB(b)
                } else {
                    return None;
                }
            }
        };
        Some(self.decide(decision))
    }

    fn on_failure(&mut self, status: AuthStatus) -> Option<BarrierDecision<A, B>> {
        let first = *self.first_failure.get_or_insert(status);
        match self.mode {
            BarrierMode::RequireBoth | BarrierMode::OnlyBranchA | BarrierMode::OnlyBranchB => {
                Some(self.decide(BarrierDecision::Failed(first)))
            }
            BarrierMode::RaceEitherSucceeds => {
                if self.reported_a && self.reported_b {
                    Some(self.decide(BarrierDecision::Failed(first)))
                } else {
                    None
                }
            }
        }
    }

    fn decide(&mut self, decision: BarrierDecision<A, B>) -> BarrierDecision<A, B> {
        self.decided = true;
        self.slot_a = None;
        self.slot_b = None;
        tracing::debug!(mode = ?self.mode, "Barrier decided");
        decision
    }
}
