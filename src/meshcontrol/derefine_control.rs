//! # Threshold-based de-refinement controls
//!
//! ## Module purpose
//! De-refinement merges groups of sibling leaf elements back into their
//! parent when the group's combined error has dropped below a threshold,
//! reclaiming resolution where the solution has smoothed out. Two controls
//! are provided which differ only in how the non-conforming level limit is
//! enforced:
//!
//! - [`ThresholdDerefineControl`]: the mesh honors the limit during the
//!   de-refinement itself, skipping groups that would violate it.
//! - [`ThresholdDerefineControl2`]: all marked groups are de-refined first
//!   (AGAIN is returned so the caller refreshes dependent state), then a
//!   second stage restores the limit by corrective refinement. Needed when
//!   the corrective refinements must see up-to-date dependent state.
//!
//! The errors of the children in a group are combined by a configurable
//! reduction, [`DerefineOp`]; the sum is the default.

use crate::meshcontrol::control::{ActionInfo, InfoTag, MeshControl};
use crate::meshcontrol::mesh_api::{AmrMesh, ErrorEstimator, SiblingGroup};
use log::info;
use strum_macros::EnumIter;

/// Reduction combining the errors of sibling leaves into one group error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumIter)]
pub enum DerefineOp {
    Min,
    #[default]
    Sum,
    Max,
}

impl DerefineOp {
    fn combine(self, errors: &[f64]) -> f64 {
        match self {
            DerefineOp::Min => errors.iter().cloned().fold(f64::INFINITY, f64::min),
            DerefineOp::Sum => errors.iter().sum(),
            DerefineOp::Max => errors.iter().cloned().fold(0.0, f64::max),
        }
    }
}

/// De-refinement control marking sibling-leaf groups whose combined error is
/// at or below the threshold.
pub struct ThresholdDerefineControl {
    estimator: Box<dyn ErrorEstimator>,
    threshold: f64,
    nc_limit: usize,
    op: DerefineOp,
    state: ActionInfo,
}

impl ThresholdDerefineControl {
    pub fn new(estimator: Box<dyn ErrorEstimator>) -> Self {
        ThresholdDerefineControl {
            estimator,
            threshold: 0.0,
            nc_limit: 0,
            op: DerefineOp::Sum,
            state: ActionInfo::none(),
        }
    }

    /// De-refinement threshold. The default is zero.
    pub fn set_threshold(&mut self, threshold: f64) {
        assert!(threshold >= 0.0, "threshold must be non-negative");
        self.threshold = threshold;
    }

    /// Reduction combining the child errors of a group. The default is Sum.
    pub fn set_op(&mut self, op: DerefineOp) {
        self.op = op;
    }

    /// Non-conforming level limit honored while de-refining (0 = unlimited).
    pub fn set_nc_limit(&mut self, nc_limit: usize) {
        self.nc_limit = nc_limit;
    }

    /// Sibling-leaf groups whose combined error is at or below the threshold.
    fn marked_groups(&mut self, mesh: &dyn AmrMesh) -> Vec<SiblingGroup> {
        let local_err = self.estimator.local_errors();
        assert_eq!(
            local_err.len(),
            mesh.num_elements(),
            "estimator must produce one local error per mesh element"
        );
        mesh.leaf_sibling_groups()
            .into_iter()
            .filter(|group| {
                let child_errors: Vec<f64> =
                    group.children.iter().map(|&e| local_err[e]).collect();
                self.op.combine(&child_errors) <= self.threshold
            })
            .collect()
    }
}

impl MeshControl for ThresholdDerefineControl {
    fn apply(&mut self, mesh: &mut dyn AmrMesh) -> ActionInfo {
        let groups = self.marked_groups(&*mesh);
        if groups.is_empty() {
            return ActionInfo::none();
        }
        if mesh.derefine(&groups, self.nc_limit) {
            info!("de-refined up to {} sibling groups", groups.len());
            ActionInfo::continue_with(InfoTag::Derefine)
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

/// Staged variant of [`ThresholdDerefineControl`].
///
/// Stage 0 de-refines every marked group regardless of the level limit and
/// returns AGAIN + DEREFINE so the driving loop refreshes dependent state;
/// stage 1 then refines just enough to restore the limit, returning
/// CONTINUE + REFINE if any corrective refinement was needed. De-refinement
/// can transiently violate the level limit, and the limit must be restored
/// against refreshed dependent state.
pub struct ThresholdDerefineControl2 {
    base: ThresholdDerefineControl,
    stage: u8, // 0 - de-refine, 1 - limit the non-conforming level
    state: ActionInfo,
}

impl ThresholdDerefineControl2 {
    pub fn new(estimator: Box<dyn ErrorEstimator>) -> Self {
        ThresholdDerefineControl2 {
            base: ThresholdDerefineControl::new(estimator),
            stage: 0,
            state: ActionInfo::none(),
        }
    }

    pub fn set_threshold(&mut self, threshold: f64) {
        self.base.set_threshold(threshold);
    }

    pub fn set_op(&mut self, op: DerefineOp) {
        self.base.set_op(op);
    }

    /// Level limit restored by the stage-1 corrective refinement
    /// (0 = unlimited, which makes stage 1 a no-op).
    pub fn set_nc_limit(&mut self, nc_limit: usize) {
        self.base.set_nc_limit(nc_limit);
    }
}

impl MeshControl for ThresholdDerefineControl2 {
    fn apply(&mut self, mesh: &mut dyn AmrMesh) -> ActionInfo {
        match self.stage {
            0 => {
                let groups = self.base.marked_groups(&*mesh);
                if groups.is_empty() {
                    return ActionInfo::none();
                }
                // de-refine without the limit; stage 1 restores it
                if mesh.derefine(&groups, 0) {
                    info!(
                        "de-refined {} sibling groups, level limit deferred to stage 1",
                        groups.len()
                    );
                    self.stage = 1;
                    ActionInfo::again_with(InfoTag::Derefine)
                } else {
                    ActionInfo::none()
                }
            }
            _ => {
                self.stage = 0;
                if mesh.enforce_nc_limit(self.base.nc_limit) {
                    info!("corrective refinement restored the level limit");
                    ActionInfo::continue_with(InfoTag::Refine)
                } else {
                    ActionInfo::none()
                }
            }
        }
    }

    fn action_info(&self) -> ActionInfo {
        self.state
    }

    fn record_action(&mut self, state: ActionInfo) {
        self.state = state;
    }
}

///////////////////////////////////////////////////////////////////////////////
//                                  TESTS
///////////////////////////////////////////////////////////////////////////////
#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshcontrol::control::Action;
    use crate::meshcontrol::interval_mesh::{FixedErrorField, IntervalMesh};
    use crate::meshcontrol::mesh_api::{Refinement, RefinementMode};
    use strum::IntoEnumIterator;

    #[test]
    fn reduction_ops() {
        for op in DerefineOp::iter() {
            let combined = op.combine(&[1.0, 3.0]);
            let expected = match op {
                DerefineOp::Min => 1.0,
                DerefineOp::Sum => 4.0,
                DerefineOp::Max => 3.0,
            };
            assert_eq!(combined, expected, "{:?}", op);
        }
    }

    /// Leaves at levels [2, 2, 3, 3, 2]; the two level-2 leaves on the left
    /// are siblings, as are the two level-3 leaves in the middle.
    fn stepped_mesh() -> IntervalMesh {
        let mut mesh = IntervalMesh::uniform(1);
        mesh.refine(&[Refinement::isotropic(0)], RefinementMode::NonConforming, 0);
        mesh.refine(
            &[Refinement::isotropic(0), Refinement::isotropic(1)],
            RefinementMode::NonConforming,
            0,
        );
        mesh.refine(&[Refinement::isotropic(2)], RefinementMode::NonConforming, 0);
        assert_eq!(mesh.levels(), vec![2, 2, 3, 3, 2]);
        mesh
    }

    fn smooth_on_the_left() -> Box<FixedErrorField> {
        Box::new(FixedErrorField::new(vec![0.01, 0.01, 1.0, 1.0, 0.5]))
    }

    #[test]
    fn quiet_group_is_derefined() {
        let mut mesh = stepped_mesh();
        let mut control = ThresholdDerefineControl::new(smooth_on_the_left());
        control.set_threshold(0.1);
        assert!(control.update(&mut mesh));
        assert!(control.is_continue());
        assert!(control.derefined());
        assert_eq!(mesh.levels(), vec![1, 3, 3, 2]);
    }

    #[test]
    fn level_limit_blocks_the_merge() {
        let mut mesh = stepped_mesh();
        let mut control = ThresholdDerefineControl::new(smooth_on_the_left());
        control.set_threshold(0.1);
        control.set_nc_limit(1);
        // merging the left pair would put a level-1 leaf next to level 3
        assert!(!control.update(&mut mesh));
        assert_eq!(control.action_info().action(), Action::None);
        assert_eq!(mesh.levels(), vec![2, 2, 3, 3, 2]);
    }

    #[test]
    fn loud_groups_are_left_alone() {
        let mut mesh = stepped_mesh();
        let mut control =
            ThresholdDerefineControl::new(Box::new(FixedErrorField::new(vec![1.0; 5])));
        control.set_threshold(0.1);
        assert!(!control.update(&mut mesh));
        assert_eq!(mesh.levels(), vec![2, 2, 3, 3, 2]);
    }

    #[test]
    fn staged_control_restores_the_level_limit() {
        let mut mesh = stepped_mesh();
        let mut control = ThresholdDerefineControl2::new(smooth_on_the_left());
        control.set_threshold(0.1);
        control.set_nc_limit(1);

        // stage 0: the merge happens even though it violates the limit
        assert!(control.update(&mut mesh));
        assert!(control.is_again());
        assert!(control.derefined());
        assert_eq!(mesh.levels(), vec![1, 3, 3, 2]);

        // stage 1: corrective refinement brings every jump back within 1
        assert!(control.update(&mut mesh));
        assert!(control.is_continue());
        assert!(control.refined());
        let levels = mesh.levels();
        assert_eq!(levels, vec![2, 2, 3, 3, 2]);
        for pair in levels.windows(2) {
            assert!(pair[0].abs_diff(pair[1]) <= 1);
        }
    }

    #[test]
    fn staged_control_with_nothing_to_merge_is_a_no_op() {
        let mut mesh = stepped_mesh();
        let mut control =
            ThresholdDerefineControl2::new(Box::new(FixedErrorField::new(vec![1.0; 5])));
        control.set_threshold(0.1);
        control.set_nc_limit(1);
        assert!(!control.update(&mut mesh));
        assert_eq!(control.action_info(), ActionInfo::none());
    }
}
