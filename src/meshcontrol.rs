//! # Adaptive mesh refinement control layer
//!
//! The decision layer of an AMR simulation: given per-element error
//! estimates, decide which elements to refine, de-refine or rebalance, and
//! compose such decisions into an ordered pipeline applied once per
//! simulation step. The mesh itself, the finite-element spaces and the error
//! estimation numerics are external collaborators reached through the traits
//! in [`mesh_api`].

/// consumed collaborator interfaces: the mesh and error-estimator traits
pub mod mesh_api;
/// element marking policies based on error thresholds
pub mod marker;
/// the action/info protocol and the MeshControl trait
pub mod control;
/// refinement control driven by a marker
pub mod refine_control;
/// threshold-based de-refinement controls, plain and staged
pub mod derefine_control;
/// rebalancing control for distributed non-conforming meshes
pub mod rebalance_control;
/// composition of controls into an ordered sequence
pub mod control_sequence;
/// AMR step driver, logging setup and step statistics
pub mod amr_loop;
/// 1-D interval mesh and error-field fixtures
pub mod interval_mesh;
