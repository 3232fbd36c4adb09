//! # Mesh and error-estimator interfaces
//!
//! ## Module purpose
//! The AMR control layer does not own a mesh or an error estimator; it drives
//! them through the narrow interfaces defined here. The mesh collaborator is
//! expected to perform the actual geometric/topological work (refinement,
//! de-refinement, rebalancing) and to keep a monotonically non-decreasing
//! generation counter that advances on every topology change. The estimator
//! collaborator produces one non-negative error value per current mesh
//! element.
//!
//! ## Main items
//! - [`Refinement`]: (element id, refinement type) request
//! - [`SiblingGroup`]: group of leaf siblings, the unit of de-refinement
//! - [`RefinementMode`]: conforming vs non-conforming refinement
//! - [`AmrMesh`]: the mesh capability consumed by markers and controls
//! - [`ErrorEstimator`]: the error-source capability consumed by markers and
//!   de-refinement controls

use nalgebra::DVector;

/// Refinement request for a single element.
///
/// `ref_type` is a bitmask of direction bits: splitting along X, Y and/or Z.
/// [`Refinement::ISOTROPIC`] (all three bits) splits the element uniformly
/// and is the default produced by purely isotropic markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refinement {
    /// Current element id, index-aligned with the estimator's error vector.
    pub index: usize,
    /// Direction bitmask, see the associated constants.
    pub ref_type: u8,
}

impl Refinement {
    pub const X: u8 = 1;
    pub const Y: u8 = 2;
    pub const Z: u8 = 4;
    pub const ISOTROPIC: u8 = 7;

    pub fn new(index: usize, ref_type: u8) -> Self {
        assert!(
            ref_type > 0 && ref_type <= Self::ISOTROPIC,
            "refinement type must be a non-empty XYZ bitmask"
        );
        Refinement { index, ref_type }
    }

    /// Uniform refinement of the given element.
    pub fn isotropic(index: usize) -> Self {
        Refinement {
            index,
            ref_type: Self::ISOTROPIC,
        }
    }
}

/// A group of sibling leaf elements produced by a prior refinement.
///
/// De-refinement merges the children back into their parent. `parent` is an
/// opaque id assigned by the mesh and stays valid across de-refinements of
/// other groups; `children` are current element ids, valid for indexing an
/// error vector computed against the same mesh generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingGroup {
    pub parent: usize,
    pub children: Vec<usize>,
}

/// How marked elements are refined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefinementMode {
    /// Keep element interfaces matched (the default).
    #[default]
    Conforming,
    /// Allow hanging nodes, tracked via a non-conforming level limit.
    NonConforming,
}

/// Mesh capability consumed by the AMR control layer.
///
/// All mutating operations must advance [`AmrMesh::sequence`]; the counter
/// must never decrease. A `nc_limit` of zero means "no limit" throughout.
pub trait AmrMesh {
    /// Generation counter, bumped on every topology change.
    fn sequence(&self) -> u64;

    /// Number of current (leaf) elements.
    fn num_elements(&self) -> usize;

    /// Refine exactly the given elements, honoring the mode and level limit.
    fn refine(&mut self, refinements: &[Refinement], mode: RefinementMode, nc_limit: usize);

    /// All groups of sibling leaves that could be merged back into their
    /// parent, in deterministic order.
    fn leaf_sibling_groups(&self) -> Vec<SiblingGroup>;

    /// De-refine the given groups, skipping any group whose merge would
    /// violate the level limit. Returns true if at least one group was
    /// actually de-refined.
    fn derefine(&mut self, groups: &[SiblingGroup], nc_limit: usize) -> bool;

    /// Refine until no pair of adjacent leaves differs by more than
    /// `nc_limit` levels. Returns true if any corrective refinement was
    /// needed.
    fn enforce_nc_limit(&mut self, nc_limit: usize) -> bool;

    /// Whether the mesh is partitioned across workers.
    fn is_distributed(&self) -> bool {
        false
    }

    /// Whether the mesh tracks non-conforming interfaces.
    fn is_nonconforming(&self) -> bool;

    /// Redistribute elements across workers for load balance. Only meaningful
    /// for distributed non-conforming meshes; the default is a no-op.
    fn rebalance(&mut self) {}
}

/// Per-element error source consumed by markers and de-refinement controls.
///
/// `local_errors` produces a fresh vector on every call, one non-negative
/// value per current mesh element, index-aligned with element ids.
pub trait ErrorEstimator {
    fn local_errors(&mut self) -> DVector<f64>;

    /// Per-element directional refinement hints, index-aligned with
    /// `local_errors`. `None` for purely isotropic estimators; a zero flag
    /// for an individual element falls back to isotropic refinement.
    fn anisotropic_flags(&mut self) -> Option<Vec<u8>> {
        None
    }
}
