//! # Control state machine
//!
//! ## Module purpose
//! A control is a single refine/de-refine/rebalance operation wrapped into a
//! uniform result: an action telling the driving simulation loop what to do
//! next, plus an info tag telling it what happened to the mesh. The typical
//! use in an AMR loop is
//! ```text
//! for step in 0.. {
//!     // computations ...
//!     while control.update(&mut mesh) {
//!         // update finite-element spaces and solution fields here
//!         if control.is_continue() { break; }
//!     }
//!     if control.is_stop() { break; }
//! }
//! ```
//! where the inner `while` handles controls that request to be re-invoked
//! against refreshed dependent state ([`Action::Again`]).
//!
//! ## Main items
//! - [`Action`] / [`InfoTag`] / [`ActionInfo`]: the discrete result type
//! - [`MeshControl`]: the control capability with the public
//!   update/stop/continue/again protocol

use crate::meshcontrol::mesh_api::AmrMesh;

/// What the driving loop should do after an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// The mesh was not modified; continue computations as-is.
    #[default]
    None,
    /// The mesh was modified; refresh dependent state and continue.
    Continue,
    /// A stopping criterion was satisfied.
    Stop,
    /// The mesh was modified; refresh dependent state, then call
    /// [`MeshControl::update`] on this same control again.
    Again,
}

/// What happened to the mesh during an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InfoTag {
    #[default]
    None,
    Refine,
    Derefine,
    Rebalance,
}

/// Combined action/info result of a single control application.
///
/// The info tag is only meaningful when the action requires a dependent-state
/// update (`Continue` or `Again`); the constructors make other combinations
/// unrepresentable. [`ActionInfo::code`] exposes the packed integer view
/// (action in the low two bits, info shifted left by two) and round-trips
/// exactly through [`ActionInfo::from_code`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActionInfo {
    action: Action,
    info: InfoTag,
}

impl ActionInfo {
    /// Bit mask for the action part of a packed code.
    pub const ACTION_MASK: i32 = 3;
    /// Bit set on every action that requires a dependent-state update.
    pub const UPDATE_BIT: i32 = 1;
    /// Bit mask for the info part of a packed code.
    pub const INFO_MASK: i32 = !3;

    /// The mesh was not modified.
    pub fn none() -> Self {
        ActionInfo {
            action: Action::None,
            info: InfoTag::None,
        }
    }

    /// A stopping criterion was satisfied.
    pub fn stop() -> Self {
        ActionInfo {
            action: Action::Stop,
            info: InfoTag::None,
        }
    }

    /// The mesh was modified as described by `info`; computations continue.
    pub fn continue_with(info: InfoTag) -> Self {
        ActionInfo {
            action: Action::Continue,
            info,
        }
    }

    /// The mesh was modified as described by `info`; the control must be
    /// re-invoked after dependent state is refreshed.
    pub fn again_with(info: InfoTag) -> Self {
        ActionInfo {
            action: Action::Again,
            info,
        }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn info(&self) -> InfoTag {
        self.info
    }

    /// True for `Continue` and `Again`: finite-element spaces and solution
    /// fields must be updated before computations proceed.
    pub fn update_required(&self) -> bool {
        matches!(self.action, Action::Continue | Action::Again)
    }

    /// Packed integer view: `code & ACTION_MASK` is the action,
    /// `(code & INFO_MASK) >> 2` is the info tag, and `code & UPDATE_BIT`
    /// mirrors [`ActionInfo::update_required`].
    pub fn code(&self) -> i32 {
        let action = match self.action {
            Action::None => 0,
            Action::Continue => 1,
            Action::Stop => 2,
            Action::Again => 3,
        };
        let info = match self.info {
            InfoTag::None => 0,
            InfoTag::Refine => 1,
            InfoTag::Derefine => 2,
            InfoTag::Rebalance => 3,
        };
        action | (info << 2)
    }

    /// Inverse of [`ActionInfo::code`]. Panics on codes outside the valid
    /// range or carrying an info tag without an update action.
    pub fn from_code(code: i32) -> Self {
        assert!(
            (0..16).contains(&code),
            "action/info code out of range: {}",
            code
        );
        let action = match code & Self::ACTION_MASK {
            0 => Action::None,
            1 => Action::Continue,
            2 => Action::Stop,
            _ => Action::Again,
        };
        let info = match (code & Self::INFO_MASK) >> 2 {
            0 => InfoTag::None,
            1 => InfoTag::Refine,
            2 => InfoTag::Derefine,
            _ => InfoTag::Rebalance,
        };
        assert!(
            info == InfoTag::None || matches!(action, Action::Continue | Action::Again),
            "info tag requires an update action, got code {}",
            code
        );
        ActionInfo { action, info }
    }
}

/// A single mesh-manipulation operation in the AMR pipeline.
///
/// Implementors provide [`MeshControl::apply`] plus storage for the last
/// produced [`ActionInfo`]; the public protocol (`update` and the query
/// methods) is supplied by the trait. Before the first `update` the stored
/// state is `ActionInfo::none()`.
pub trait MeshControl {
    /// Perform the mesh operation. Invoked by [`MeshControl::update`].
    fn apply(&mut self, mesh: &mut dyn AmrMesh) -> ActionInfo;

    /// The ActionInfo produced by the last call to [`MeshControl::update`].
    fn action_info(&self) -> ActionInfo;

    /// Store the ActionInfo of the current update.
    fn record_action(&mut self, state: ActionInfo);

    /// Perform the mesh operation. Returns true if finite-element spaces and
    /// solution fields need to be updated.
    fn update(&mut self, mesh: &mut dyn AmrMesh) -> bool {
        let state = self.apply(mesh);
        self.record_action(state);
        state.update_required()
    }

    /// A stopping criterion was satisfied.
    fn is_stop(&self) -> bool {
        self.action_info().action() == Action::Stop
    }

    /// Dependent state must be refreshed and computations continue.
    fn is_continue(&self) -> bool {
        self.action_info().action() == Action::Continue
    }

    /// Dependent state must be refreshed and `update` called again.
    fn is_again(&self) -> bool {
        self.action_info().action() == Action::Again
    }

    /// The mesh was refined by the last update.
    fn refined(&self) -> bool {
        self.action_info().info() == InfoTag::Refine
    }

    /// The mesh was de-refined by the last update.
    fn derefined(&self) -> bool {
        self.action_info().info() == InfoTag::Derefine
    }

    /// The mesh was rebalanced by the last update.
    fn rebalanced(&self) -> bool {
        self.action_info().info() == InfoTag::Rebalance
    }

    /// Packed integer view of the last ActionInfo.
    fn action_info_code(&self) -> i32 {
        self.action_info().code()
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  TESTS
///////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_none() {
        let state = ActionInfo::default();
        assert_eq!(state.action(), Action::None);
        assert_eq!(state.info(), InfoTag::None);
        assert_eq!(state.code(), 0);
        assert!(!state.update_required());
    }

    #[test]
    fn code_round_trips_through_masks() {
        let all_valid = [
            ActionInfo::none(),
            ActionInfo::stop(),
            ActionInfo::continue_with(InfoTag::None),
            ActionInfo::continue_with(InfoTag::Refine),
            ActionInfo::continue_with(InfoTag::Derefine),
            ActionInfo::continue_with(InfoTag::Rebalance),
            ActionInfo::again_with(InfoTag::None),
            ActionInfo::again_with(InfoTag::Refine),
            ActionInfo::again_with(InfoTag::Derefine),
            ActionInfo::again_with(InfoTag::Rebalance),
        ];
        for state in all_valid {
            let code = state.code();
            assert_eq!(ActionInfo::from_code(code), state);
            assert_eq!(
                code & ActionInfo::UPDATE_BIT != 0,
                state.update_required(),
                "update bit mismatch for code {}",
                code
            );
        }
        // spot checks of the documented layout
        assert_eq!(ActionInfo::stop().code(), 2);
        assert_eq!(ActionInfo::continue_with(InfoTag::Refine).code(), 1 | 4);
        assert_eq!(ActionInfo::again_with(InfoTag::Derefine).code(), 3 | 8);
        assert_eq!(ActionInfo::continue_with(InfoTag::Rebalance).code(), 1 | 12);
    }

    #[test]
    #[should_panic(expected = "info tag requires an update action")]
    fn from_code_rejects_info_without_update() {
        // STOP combined with REFINE is not a legal state
        let _ = ActionInfo::from_code(2 | 4);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn from_code_rejects_out_of_range() {
        let _ = ActionInfo::from_code(16);
    }
}
