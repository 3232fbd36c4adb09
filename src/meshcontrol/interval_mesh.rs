//! # 1-D interval mesh fixture
//!
//! ## Module purpose
//! A small hierarchical mesh over a chain of unit intervals, refined by
//! binary splitting, implementing the [`AmrMesh`] capability. Adjacent leaves
//! may differ in refinement level (non-conforming interfaces); the level
//! limit bounds that difference. Used by the tests, the examples, the binary
//! and the benches as a stand-in for a real finite-element mesh.
//!
//! Also provides [`FixedErrorField`], an error-estimator fixture returning a
//! caller-supplied error vector.

use crate::meshcontrol::mesh_api::{
    AmrMesh, ErrorEstimator, Refinement, RefinementMode, SiblingGroup,
};
use log::debug;
use nalgebra::DVector;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone)]
struct Node {
    level: u32,
    children: Option<(usize, usize)>,
}

/// Hierarchical 1-D mesh over `[0, n]` built from `n` root intervals.
///
/// Element ids are positions in the left-to-right leaf ordering and are
/// renumbered by every topology change; the generation counter advances
/// alongside.
#[derive(Debug)]
pub struct IntervalMesh {
    nodes: Vec<Node>,
    roots: Vec<usize>,
    leaves: Vec<usize>, // node ids in left-to-right order
    sequence: u64,
}

impl IntervalMesh {
    /// `n` unrefined root intervals.
    pub fn uniform(n: usize) -> Self {
        assert!(n > 0, "a mesh needs at least one interval");
        IntervalMesh {
            nodes: (0..n)
                .map(|_| Node {
                    level: 0,
                    children: None,
                })
                .collect(),
            roots: (0..n).collect(),
            leaves: (0..n).collect(),
            sequence: 0,
        }
    }

    /// Refinement level of the given element.
    pub fn level(&self, elem: usize) -> u32 {
        self.nodes[self.leaves[elem]].level
    }

    /// Levels of all elements in left-to-right order.
    pub fn levels(&self) -> Vec<u32> {
        self.leaves.iter().map(|&n| self.nodes[n].level).collect()
    }

    /// The `[left, right)` span of every element, roots being unit intervals.
    pub fn leaf_spans(&self) -> Vec<(f64, f64)> {
        let mut spans = Vec::with_capacity(self.leaves.len());
        for (i, &root) in self.roots.iter().enumerate() {
            self.collect_spans(root, i as f64, (i + 1) as f64, &mut spans);
        }
        spans
    }

    fn collect_spans(&self, node: usize, left: f64, right: f64, out: &mut Vec<(f64, f64)>) {
        match self.nodes[node].children {
            Some((a, b)) => {
                let mid = 0.5 * (left + right);
                self.collect_spans(a, left, mid, out);
                self.collect_spans(b, mid, right, out);
            }
            None => out.push((left, right)),
        }
    }

    fn collect_leaves(&self, node: usize, out: &mut Vec<usize>) {
        match self.nodes[node].children {
            Some((a, b)) => {
                self.collect_leaves(a, out);
                self.collect_leaves(b, out);
            }
            None => out.push(node),
        }
    }

    fn rebuild_leaves(&mut self) {
        let mut leaves = Vec::with_capacity(self.leaves.len() + 1);
        for i in 0..self.roots.len() {
            self.collect_leaves(self.roots[i], &mut leaves);
        }
        self.leaves = leaves;
    }

    fn split_node(&mut self, node: usize) {
        debug_assert!(self.nodes[node].children.is_none());
        let level = self.nodes[node].level + 1;
        let first = self.nodes.len();
        self.nodes.push(Node {
            level,
            children: None,
        });
        self.nodes.push(Node {
            level,
            children: None,
        });
        self.nodes[node].children = Some((first, first + 1));
    }

    /// Element id of the coarser leaf in the first adjacent pair whose level
    /// difference exceeds the limit.
    fn nc_violation(&self, nc_limit: usize) -> Option<usize> {
        let limit = nc_limit as u32;
        for i in 0..self.leaves.len().saturating_sub(1) {
            let la = self.nodes[self.leaves[i]].level;
            let lb = self.nodes[self.leaves[i + 1]].level;
            if la.abs_diff(lb) > limit {
                return Some(if la < lb { i } else { i + 1 });
            }
        }
        None
    }

    fn limit_levels(&mut self, nc_limit: usize) -> bool {
        let mut changed = false;
        while let Some(elem) = self.nc_violation(nc_limit) {
            let node = self.leaves[elem];
            self.split_node(node);
            self.rebuild_leaves();
            changed = true;
        }
        changed
    }
}

impl AmrMesh for IntervalMesh {
    fn sequence(&self) -> u64 {
        self.sequence
    }

    fn num_elements(&self) -> usize {
        self.leaves.len()
    }

    fn refine(&mut self, refinements: &[Refinement], _mode: RefinementMode, nc_limit: usize) {
        if refinements.is_empty() {
            return;
        }
        // an interval splits in two whatever the direction bits say
        let targets: Vec<usize> = refinements
            .iter()
            .map(|r| {
                assert!(
                    r.index < self.leaves.len(),
                    "refinement index {} out of range",
                    r.index
                );
                self.leaves[r.index]
            })
            .collect();
        for node in targets {
            self.split_node(node);
        }
        self.rebuild_leaves();
        if nc_limit > 0 {
            self.limit_levels(nc_limit);
        }
        self.sequence += 1;
        debug!(
            "refined {} elements, mesh now has {} leaves",
            refinements.len(),
            self.leaves.len()
        );
    }

    fn leaf_sibling_groups(&self) -> Vec<SiblingGroup> {
        let elem_of_node: HashMap<usize, usize> = self
            .leaves
            .iter()
            .enumerate()
            .map(|(elem, &node)| (node, elem))
            .collect();
        let mut groups = Vec::new();
        for (id, node) in self.nodes.iter().enumerate() {
            if let Some((a, b)) = node.children {
                if let (Some(&ea), Some(&eb)) = (elem_of_node.get(&a), elem_of_node.get(&b)) {
                    groups.push(SiblingGroup {
                        parent: id,
                        children: vec![ea, eb],
                    });
                }
            }
        }
        groups.sort_by_key(|g| g.children[0]);
        groups
    }

    fn derefine(&mut self, groups: &[SiblingGroup], nc_limit: usize) -> bool {
        let mut changed = false;
        for group in groups {
            let parent = group.parent;
            let Some((a, b)) = self.nodes[parent].children else {
                continue;
            };
            if self.nodes[a].children.is_some() || self.nodes[b].children.is_some() {
                continue;
            }
            if nc_limit > 0 {
                // merging must not leave a neighbor more than nc_limit
                // levels finer than the restored parent
                let parent_level = self.nodes[parent].level;
                let Some(ea) = self.leaves.iter().position(|&n| n == a) else {
                    continue;
                };
                let Some(eb) = self.leaves.iter().position(|&n| n == b) else {
                    continue;
                };
                let lo = ea.min(eb);
                let hi = ea.max(eb);
                let limit = parent_level + nc_limit as u32;
                let left_ok = lo == 0 || self.nodes[self.leaves[lo - 1]].level <= limit;
                let right_ok = hi + 1 == self.leaves.len()
                    || self.nodes[self.leaves[hi + 1]].level <= limit;
                if !(left_ok && right_ok) {
                    debug!("skipping group at parent {}: level limit", parent);
                    continue;
                }
            }
            self.nodes[parent].children = None;
            self.rebuild_leaves();
            changed = true;
        }
        if changed {
            self.sequence += 1;
        }
        changed
    }

    fn enforce_nc_limit(&mut self, nc_limit: usize) -> bool {
        if nc_limit == 0 {
            return false;
        }
        let changed = self.limit_levels(nc_limit);
        if changed {
            self.sequence += 1;
        }
        changed
    }

    fn is_nonconforming(&self) -> bool {
        true
    }
}

/// Error-estimator fixture returning a caller-supplied error field.
///
/// `set_errors` lets a driving loop feed fresh errors after each topology
/// change; wrap the field in `Rc<RefCell<...>>` to keep a handle while a
/// marker or control owns the estimator.
#[derive(Debug, Clone)]
pub struct FixedErrorField {
    errors: Vec<f64>,
    aniso_flags: Option<Vec<u8>>,
}

impl FixedErrorField {
    pub fn new(errors: Vec<f64>) -> Self {
        FixedErrorField {
            errors,
            aniso_flags: None,
        }
    }

    pub fn with_anisotropy(errors: Vec<f64>, flags: Vec<u8>) -> Self {
        FixedErrorField {
            errors,
            aniso_flags: Some(flags),
        }
    }

    pub fn set_errors(&mut self, errors: Vec<f64>) {
        self.errors = errors;
    }
}

impl ErrorEstimator for FixedErrorField {
    fn local_errors(&mut self) -> DVector<f64> {
        DVector::from_vec(self.errors.clone())
    }

    fn anisotropic_flags(&mut self) -> Option<Vec<u8>> {
        self.aniso_flags.clone()
    }
}

impl ErrorEstimator for Rc<RefCell<FixedErrorField>> {
    fn local_errors(&mut self) -> DVector<f64> {
        self.borrow_mut().local_errors()
    }

    fn anisotropic_flags(&mut self) -> Option<Vec<u8>> {
        self.borrow_mut().anisotropic_flags()
    }
}
