//! Refinement control driven by a [`MeshMarker`].
//!
//! Fetches the marked-element list from its marker and instructs the mesh to
//! refine exactly those elements. Returns STOP when the marker yields no
//! candidates or reports its stopping criterion satisfied, and
//! CONTINUE + REFINE otherwise.

use crate::meshcontrol::control::{ActionInfo, InfoTag, MeshControl};
use crate::meshcontrol::marker::MeshMarker;
use crate::meshcontrol::mesh_api::{AmrMesh, RefinementMode};
use log::info;

pub struct RefinementControl {
    marker: Box<dyn MeshMarker>,
    mode: RefinementMode,
    nc_limit: usize,
    state: ActionInfo,
}

impl RefinementControl {
    /// Construct a RefinementControl around the given marker. The control
    /// owns the marker for its whole lifetime, so every update has a
    /// configured marking policy.
    pub fn new(marker: Box<dyn MeshMarker>) -> Self {
        RefinementControl {
            marker,
            mode: RefinementMode::Conforming,
            nc_limit: 0,
            state: ActionInfo::none(),
        }
    }

    /// Use non-conforming refinement with the given level limit
    /// (0 = unlimited).
    pub fn set_nonconforming_refinement(&mut self, nc_limit: usize) {
        self.mode = RefinementMode::NonConforming;
        self.nc_limit = nc_limit;
    }

    /// Use conforming refinement (the default).
    pub fn set_conforming_refinement(&mut self, nc_limit: usize) {
        self.mode = RefinementMode::Conforming;
        self.nc_limit = nc_limit;
    }

    pub fn marker(&self) -> &dyn MeshMarker {
        self.marker.as_ref()
    }
}

impl MeshControl for RefinementControl {
    fn apply(&mut self, mesh: &mut dyn AmrMesh) -> ActionInfo {
        let marked = self.marker.marked_elements(&*mesh).to_vec();
        if marked.is_empty() || self.marker.refinement_complete(&*mesh) {
            return ActionInfo::stop();
        }
        info!("refining {} marked elements", marked.len());
        mesh.refine(&marked, self.mode, self.nc_limit);
        ActionInfo::continue_with(InfoTag::Refine)
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
    use crate::meshcontrol::interval_mesh::{FixedErrorField, IntervalMesh};
    use crate::meshcontrol::marker::ThresholdMarker;

    #[test]
    fn empty_marked_set_stops() {
        let mut mesh = IntervalMesh::uniform(5);
        let marker = ThresholdMarker::new(Box::new(FixedErrorField::new(vec![0.0; 5])));
        let mut control = RefinementControl::new(Box::new(marker));
        assert!(!control.update(&mut mesh));
        assert!(control.is_stop());
        assert!(!control.refined());
        assert_eq!(mesh.num_elements(), 5);
    }

    #[test]
    fn single_outlier_refines_one_element() {
        let mut mesh = IntervalMesh::uniform(5);
        let marker =
            ThresholdMarker::new(Box::new(FixedErrorField::new(vec![0.0, 0.0, 9.0, 0.0, 0.0])));
        let mut control = RefinementControl::new(Box::new(marker));
        control.set_nonconforming_refinement(0);
        assert!(control.update(&mut mesh));
        assert!(control.is_continue());
        assert!(control.refined());
        assert_eq!(control.marker().num_marked_elements(), 1);
        // one interval split in two
        assert_eq!(mesh.num_elements(), 6);
    }

    #[test]
    fn marker_stopping_criterion_wins_over_candidates() {
        let mut mesh = IntervalMesh::uniform(2);
        let mut marker =
            ThresholdMarker::new(Box::new(FixedErrorField::new(vec![1.0, 1.0])));
        marker.set_total_error_norm_p(1.0);
        marker.set_total_error_goal(3.0); // total error 2 <= goal
        marker.set_total_error_fraction(0.1); // both elements exceed the threshold
        let mut control = RefinementControl::new(Box::new(marker));
        assert!(!control.update(&mut mesh));
        assert!(control.is_stop());
        assert_eq!(mesh.num_elements(), 2);
    }
}
