//MIT License
#![allow(non_snake_case)]
pub mod Examples;

/// Adaptive mesh refinement control layer: element marking policies, the
/// refine/de-refine/rebalance controls with their continue/stop/again
/// protocol, control sequencing, and the AMR step driver.
///
///  Example
/// ```
/// use RustedAMR::meshcontrol::control::MeshControl;
/// use RustedAMR::meshcontrol::mesh_api::AmrMesh;
/// use RustedAMR::meshcontrol::interval_mesh::{FixedErrorField, IntervalMesh};
/// use RustedAMR::meshcontrol::marker::ThresholdMarker;
/// use RustedAMR::meshcontrol::refine_control::RefinementControl;
///
/// // mark every element whose local error exceeds half of the maximum error
/// let mut mesh = IntervalMesh::uniform(5);
/// let estimator = FixedErrorField::new(vec![0.0, 0.0, 9.0, 0.0, 0.0]);
/// let marker = ThresholdMarker::new(Box::new(estimator));
/// let mut control = RefinementControl::new(Box::new(marker));
/// control.set_nonconforming_refinement(1);
///
/// assert!(control.update(&mut mesh)); // spaces and fields must be refreshed
/// assert!(control.is_continue());
/// assert!(control.refined());
/// assert_eq!(mesh.num_elements(), 6);
/// ```
pub mod meshcontrol;
