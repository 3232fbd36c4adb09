//! # Element marking policies
//!
//! ## Module purpose
//! A marker translates continuous per-element error estimates into a discrete
//! list of elements to act on. The marked list is memoized against the mesh
//! generation counter: it is recomputed only when the mesh actually changed,
//! and a generation counter that goes backwards is a protocol violation by
//! the caller, reported by an assertion.
//!
//! ## Main structures
//! - [`MeshMarker`]: the marking capability consumed by refinement controls
//! - [`ThresholdMarker`]: marks every element whose local error exceeds a
//!   threshold derived from the global error norm
//!
//! The threshold is computed as
//! ```text
//! threshold = max(total_err * total_fraction * ne^(-1/p), local_err_goal)
//! ```
//! where `total_err = (sum_i local_err_i^p)^(1/p)` for finite p and
//! `total_err = max_i local_err_i` for p = infinity (in which case the
//! element-count factor is 1).

use crate::meshcontrol::mesh_api::{AmrMesh, ErrorEstimator, Refinement};
use itertools::Itertools;
use log::{debug, info};
use nalgebra::DVector;

/// Marking capability: produce a list of elements to refine, current against
/// the mesh's present generation.
pub trait MeshMarker {
    /// Return the marked-element list, recomputing it lazily if the mesh
    /// generation advanced since the last computation. Panics if the
    /// generation went backwards.
    fn marked_elements(&mut self, mesh: &dyn AmrMesh) -> &[Refinement];

    /// Number of elements marked by the most recent computation.
    fn num_marked_elements(&self) -> usize;

    /// Marker-level stopping criterion, consulted by refinement controls
    /// after the marked set has been computed. The default never stops.
    fn refinement_complete(&self, mesh: &dyn AmrMesh) -> bool {
        let _ = mesh;
        false
    }
}

/// Marker selecting every element `i` with `local_err_i > threshold`.
///
/// When the estimator supplies anisotropic flags, each marked element carries
/// the estimator's directional refinement type (a zero flag falls back to
/// isotropic); otherwise all marks are isotropic.
pub struct ThresholdMarker {
    estimator: Box<dyn ErrorEstimator>,

    total_norm_p: f64,
    total_err_goal: f64,
    total_fraction: f64,
    local_err_goal: f64,
    max_elements: usize,

    threshold: f64,
    total_err: f64,
    marked_elements: Vec<Refinement>,
    num_marked_elements: usize,
    current_sequence: Option<u64>,
}

impl ThresholdMarker {
    pub fn new(estimator: Box<dyn ErrorEstimator>) -> Self {
        ThresholdMarker {
            estimator,
            total_norm_p: f64::INFINITY,
            total_err_goal: 0.0,
            total_fraction: 0.5,
            local_err_goal: 0.0,
            max_elements: usize::MAX,
            threshold: 0.0,
            total_err: 0.0,
            marked_elements: Vec::new(),
            num_marked_elements: 0,
            current_sequence: None,
        }
    }

    ////////////////////////////SETTERS///////////////////////////////////////

    /// Exponent p of the discrete p-norm combining local errors into the
    /// total error. The default is infinity (max norm).
    pub fn set_total_error_norm_p(&mut self, norm_p: f64) {
        assert!(
            norm_p >= 1.0 || norm_p.is_infinite(),
            "norm exponent p must be >= 1 or infinite"
        );
        self.total_norm_p = norm_p;
    }

    /// Total-error stopping criterion: refinement is complete when
    /// `total_err <= total_err_goal`. The default (zero) disables it.
    pub fn set_total_error_goal(&mut self, err_goal: f64) {
        assert!(err_goal >= 0.0, "total error goal must be non-negative");
        self.total_err_goal = err_goal;
    }

    /// Fraction of the total error entering the threshold. The default is
    /// 1/2. With a zero fraction the total error is ignored and the
    /// threshold equals the local error goal.
    pub fn set_total_error_fraction(&mut self, fraction: f64) {
        assert!(fraction >= 0.0, "total error fraction must be non-negative");
        self.total_fraction = fraction;
    }

    /// Per-element error goal: elements with `local_err_i <= local_err_goal`
    /// are never marked. The default (zero) makes it inert.
    pub fn set_local_error_goal(&mut self, err_goal: f64) {
        assert!(err_goal >= 0.0, "local error goal must be non-negative");
        self.local_err_goal = err_goal;
    }

    /// Cap on the number of marked elements. If more candidates exceed the
    /// threshold, the list is truncated deterministically by descending local
    /// error (ascending element id on ties). Unbounded by default.
    pub fn set_max_elements(&mut self, max_elem: usize) {
        assert!(max_elem > 0, "max elements must be positive");
        self.max_elements = max_elem;
    }

    ////////////////////////////ACCESSORS/////////////////////////////////////

    /// The threshold used by the most recent marking.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// The total error norm computed by the most recent marking.
    pub fn total_error(&self) -> f64 {
        self.total_err
    }

    ////////////////////////////MARKING///////////////////////////////////////

    fn total_norm(&self, local_err: &DVector<f64>) -> f64 {
        let p = self.total_norm_p;
        if p.is_infinite() {
            local_err.iter().cloned().fold(0.0, f64::max)
        } else {
            local_err
                .iter()
                .map(|err| err.powf(p))
                .sum::<f64>()
                .powf(1.0 / p)
        }
    }

    fn mark_elements(&mut self, mesh: &dyn AmrMesh) {
        let local_err = self.estimator.local_errors();
        let ne = mesh.num_elements();
        assert_eq!(
            local_err.len(),
            ne,
            "estimator must produce one local error per mesh element"
        );

        self.total_err = self.total_norm(&local_err);
        let count_factor = if self.total_norm_p.is_infinite() {
            1.0
        } else {
            (ne as f64).powf(-1.0 / self.total_norm_p)
        };
        self.threshold = (self.total_err * self.total_fraction * count_factor)
            .max(self.local_err_goal);

        let mut candidates: Vec<usize> = (0..ne)
            .filter(|&i| local_err[i] > self.threshold)
            .collect();
        if candidates.len() > self.max_elements {
            debug!(
                "truncating {} candidates to the cap of {}",
                candidates.len(),
                self.max_elements
            );
            candidates = candidates
                .into_iter()
                .sorted_by(|&a, &b| {
                    local_err[b]
                        .partial_cmp(&local_err[a])
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(a.cmp(&b))
                })
                .take(self.max_elements)
                .sorted_unstable()
                .collect();
        }

        let aniso_flags = self.estimator.anisotropic_flags();
        if let Some(flags) = &aniso_flags {
            assert_eq!(
                flags.len(),
                ne,
                "estimator must produce one anisotropic flag per mesh element"
            );
        }
        self.marked_elements = candidates
            .iter()
            .map(|&i| match &aniso_flags {
                Some(flags) if flags[i] != 0 => Refinement::new(i, flags[i]),
                _ => Refinement::isotropic(i),
            })
            .collect();
        self.num_marked_elements = self.marked_elements.len();
        info!(
            "marked {} of {} elements, threshold = {:.3e}, total error = {:.3e}",
            self.num_marked_elements, ne, self.threshold, self.total_err
        );
    }
}

impl MeshMarker for ThresholdMarker {
    fn marked_elements(&mut self, mesh: &dyn AmrMesh) -> &[Refinement] {
        let sequence = mesh.sequence();
        match self.current_sequence {
            Some(current) => {
                assert!(
                    current <= sequence,
                    "mesh generation counter went backwards: {} -> {}",
                    current,
                    sequence
                );
                if current < sequence {
                    self.mark_elements(mesh);
                }
            }
            None => self.mark_elements(mesh),
        }
        self.current_sequence = Some(sequence);
        &self.marked_elements
    }

    fn num_marked_elements(&self) -> usize {
        self.num_marked_elements
    }

    fn refinement_complete(&self, mesh: &dyn AmrMesh) -> bool {
        let _ = mesh;
        self.total_err_goal > 0.0 && self.total_err <= self.total_err_goal
    }
}
