//! Rebalancing control for distributed non-conforming meshes.
//!
//! Redistributes elements across workers for load balance. On any other mesh
//! kind (serial, or distributed but conforming) this is a normal, silent
//! no-op returning NONE, not an error.

use crate::meshcontrol::control::{ActionInfo, InfoTag, MeshControl};
use crate::meshcontrol::mesh_api::AmrMesh;
use log::info;

#[derive(Default)]
pub struct RebalanceControl {
    state: ActionInfo,
}

impl RebalanceControl {
    pub fn new() -> Self {
        RebalanceControl {
            state: ActionInfo::none(),
        }
    }
}

impl MeshControl for RebalanceControl {
    fn apply(&mut self, mesh: &mut dyn AmrMesh) -> ActionInfo {
        if mesh.is_distributed() && mesh.is_nonconforming() {
            mesh.rebalance();
            info!("rebalanced the distributed mesh");
            ActionInfo::continue_with(InfoTag::Rebalance)
        } else {
            ActionInfo::none()
        }
    }

    fn action_info(&self) -> ActionInfo {
        self.state
    }

    fn record_action(&mut self, state: ActionInfo) {
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshcontrol::control::Action;
    use crate::meshcontrol::interval_mesh::IntervalMesh;
    use crate::meshcontrol::mesh_api::{Refinement, RefinementMode, SiblingGroup};

    /// Minimal distributed non-conforming mesh recording rebalance calls.
    struct DistributedMeshStub {
        sequence: u64,
        rebalanced: usize,
    }

    impl AmrMesh for DistributedMeshStub {
        fn sequence(&self) -> u64 {
            self.sequence
        }
        fn num_elements(&self) -> usize {
            4
        }
        fn refine(&mut self, _: &[Refinement], _: RefinementMode, _: usize) {}
        fn leaf_sibling_groups(&self) -> Vec<SiblingGroup> {
            Vec::new()
        }
        fn derefine(&mut self, _: &[SiblingGroup], _: usize) -> bool {
            false
        }
        fn enforce_nc_limit(&mut self, _: usize) -> bool {
            false
        }
        fn is_distributed(&self) -> bool {
            true
        }
        fn is_nonconforming(&self) -> bool {
            true
        }
        fn rebalance(&mut self) {
            self.rebalanced += 1;
            self.sequence += 1;
        }
    }

    #[test]
    fn serial_mesh_is_a_silent_no_op() {
        let mut mesh = IntervalMesh::uniform(4);
        let mut control = RebalanceControl::new();
        assert!(!control.update(&mut mesh));
        assert_eq!(control.action_info().action(), Action::None);
        assert!(!control.rebalanced());
        assert_eq!(mesh.sequence(), 0);
    }

    #[test]
    fn distributed_nonconforming_mesh_is_rebalanced() {
        let mut mesh = DistributedMeshStub {
            sequence: 0,
            rebalanced: 0,
        };
        let mut control = RebalanceControl::new();
        assert!(control.update(&mut mesh));
        assert!(control.is_continue());
        assert!(control.rebalanced());
        assert_eq!(mesh.rebalanced, 1);
    }
}
