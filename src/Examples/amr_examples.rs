use crate::meshcontrol::amr_loop::run_amr_step;
use crate::meshcontrol::control::MeshControl;
use crate::meshcontrol::control_sequence::MeshControlSequence;
use crate::meshcontrol::derefine_control::{DerefineOp, ThresholdDerefineControl2};
use crate::meshcontrol::interval_mesh::{FixedErrorField, IntervalMesh};
use crate::meshcontrol::marker::ThresholdMarker;
use crate::meshcontrol::mesh_api::AmrMesh;
use crate::meshcontrol::rebalance_control::RebalanceControl;
use crate::meshcontrol::refine_control::RefinementControl;
use std::cell::RefCell;
use std::rc::Rc;

/// Width-weighted error field of a moving front at position `front`: wide
/// elements near the front carry large errors, elements far away almost none.
fn front_errors(mesh: &IntervalMesh, front: f64) -> Vec<f64> {
    mesh.leaf_spans()
        .iter()
        .map(|&(left, right)| {
            let center = 0.5 * (left + right);
            (right - left) * (-8.0 * (center - front).abs()).exp()
        })
        .collect()
}

pub fn amr_examples(example: usize) {
    match example {
        0 => {
            // Refine a boundary layer at the left end of the domain until the
            // per-element error goal is met everywhere.
            let mut mesh = IntervalMesh::uniform(4);
            let field = Rc::new(RefCell::new(FixedErrorField::new(front_errors(&mesh, 0.0))));
            let mut marker = ThresholdMarker::new(Box::new(Rc::clone(&field)));
            marker.set_local_error_goal(0.02);
            marker.set_total_error_fraction(0.0);
            let mut control = RefinementControl::new(Box::new(marker));
            control.set_nonconforming_refinement(1);

            loop {
                let report = run_amr_step(&mut control, &mut mesh, |_| {});
                field.borrow_mut().set_errors(front_errors(&mesh, 0.0));
                println!("{}", report.statistics_table());
                if report.stopped {
                    break;
                }
            }
            println!("final element levels: {:?}", mesh.levels());
        }
        1 => {
            // Full pipeline on a moving front: refine where the front is,
            // de-refine behind it, rebalance (a no-op on this serial mesh).
            let mut mesh = IntervalMesh::uniform(4);
            let field = Rc::new(RefCell::new(FixedErrorField::new(front_errors(&mesh, 0.5))));

            let mut marker = ThresholdMarker::new(Box::new(Rc::clone(&field)));
            marker.set_local_error_goal(0.03);
            marker.set_total_error_fraction(0.0);
            let mut refine = RefinementControl::new(Box::new(marker));
            refine.set_nonconforming_refinement(1);

            let mut derefine = ThresholdDerefineControl2::new(Box::new(Rc::clone(&field)));
            derefine.set_threshold(0.001);
            derefine.set_op(DerefineOp::Sum);
            derefine.set_nc_limit(1);

            let mut pipeline = MeshControlSequence::new();
            pipeline.append(Box::new(refine));
            pipeline.append(Box::new(derefine));
            pipeline.append(Box::new(RebalanceControl::new()));

            for step in 0..24 {
                let front = 0.05 * step as f64;
                field.borrow_mut().set_errors(front_errors(&mesh, front));
                loop {
                    let update_required = pipeline.update(&mut mesh);
                    // the error field depends on the mesh and must be refreshed
                    // after every update before the pipeline runs again
                    field.borrow_mut().set_errors(front_errors(&mesh, front));
                    if !update_required || pipeline.is_continue() {
                        break;
                    }
                }
                println!(
                    "step {:2}: front at {:.2}, {} elements, code {}",
                    step,
                    front,
                    mesh.num_elements(),
                    pipeline.action_info_code()
                );
            }
            println!("final element levels: {:?}", mesh.levels());
        }
        _ => panic!("no such example"),
    }
}
