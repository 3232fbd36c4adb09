//! Composition of controls into an ordered sequence.
//!
//! A [`MeshControlSequence`] is itself a control: on each application it
//! walks its members cyclically, starting after the member that ended the
//! previous pass (or at that same member, if it asked to be re-invoked with
//! AGAIN), and returns the first non-NONE member result verbatim. A full
//! pass in which every member returns NONE yields NONE. This composes
//! multi-step AMR policies such as "refine, then rebalance".

use crate::meshcontrol::control::{Action, ActionInfo, MeshControl};
use crate::meshcontrol::mesh_api::AmrMesh;
use log::debug;

/// Ordered sequence of controls.
///
/// Appended controls are owned exclusively by the sequence and dropped with
/// it. The type deliberately implements neither `Clone` nor `Copy`: copying
/// would create ambiguous ownership of the contained controls. Moving the
/// sequence transfers ownership as a whole.
pub struct MeshControlSequence {
    step: isize, // index of the member invoked last, -1 before the first pass
    resume_again: bool,
    sequence: Vec<Box<dyn MeshControl>>,
    state: ActionInfo,
}

impl MeshControlSequence {
    /// Construct an empty sequence; populate it with
    /// [`MeshControlSequence::append`].
    pub fn new() -> Self {
        MeshControlSequence {
            step: -1,
            resume_again: false,
            sequence: Vec::new(),
            state: ActionInfo::none(),
        }
    }

    /// Add a control to the end of the sequence, transferring ownership.
    pub fn append(&mut self, control: Box<dyn MeshControl>) {
        self.sequence.push(control);
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Access the contained controls, e.g. to reconfigure them in place.
    pub fn controls_mut(&mut self) -> &mut [Box<dyn MeshControl>] {
        &mut self.sequence
    }
}

impl Default for MeshControlSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshControl for MeshControlSequence {
    fn apply(&mut self, mesh: &mut dyn AmrMesh) -> ActionInfo {
        let n = self.sequence.len();
        if n == 0 {
            return ActionInfo::none();
        }
        let mut resume = self.resume_again;
        self.resume_again = false;
        for _ in 0..n {
            if resume {
                // re-invoke the member that returned AGAIN, same cursor
                resume = false;
            } else {
                self.step = (self.step + 1) % n as isize;
            }
            let control = &mut self.sequence[self.step as usize];
            control.update(mesh);
            let state = control.action_info();
            if state.action() != Action::None {
                debug!(
                    "sequence resolved at member {} with code {}",
                    self.step,
                    state.code()
                );
                self.resume_again = state.action() == Action::Again;
                return state;
            }
        }
        ActionInfo::none()
    }

    fn action_info(&self) -> ActionInfo {
        self.state
    }

    fn record_action(&mut self, state: ActionInfo) {
        self.state = state;
    }
}
