//! # AMR step driver
//!
//! ## Module purpose
//! Convenience layer for the driving simulation loop: applies a control once
//! per simulation step, handling the AGAIN protocol (refresh dependent state,
//! re-invoke the same control) until the control settles on CONTINUE, STOP or
//! NONE. Also hosts the logging initializer and a pretty statistics table for
//! a finished step.
//!
//! ## Main items
//! - [`run_amr_step`]: one simulation step worth of control updates
//! - [`AmrStepReport`]: what happened during the step
//! - [`init_logging`]: terminal logger setup gated on a string log level

use crate::meshcontrol::control::MeshControl;
use crate::meshcontrol::mesh_api::AmrMesh;
use log::info;
use simplelog::*;
use tabled::{builder::Builder, settings::Style};

/// Summary of one AMR step.
#[derive(Debug, Clone, Default)]
pub struct AmrStepReport {
    /// Number of control updates performed (more than one only when a
    /// control requested AGAIN).
    pub updates: usize,
    pub refined: bool,
    pub derefined: bool,
    pub rebalanced: bool,
    /// The control reported its stopping criterion satisfied.
    pub stopped: bool,
    pub elements_before: usize,
    pub elements_after: usize,
}

impl AmrStepReport {
    /// Render the report as a table for logging.
    pub fn statistics_table(&self) -> String {
        let mut builder = Builder::default();
        builder.push_record(["AMR step", "value"]);
        builder.push_record(["elements before", &self.elements_before.to_string()]);
        builder.push_record(["elements after", &self.elements_after.to_string()]);
        builder.push_record(["control updates", &self.updates.to_string()]);
        builder.push_record(["refined", &self.refined.to_string()]);
        builder.push_record(["de-refined", &self.derefined.to_string()]);
        builder.push_record(["rebalanced", &self.rebalanced.to_string()]);
        builder.push_record(["stopped", &self.stopped.to_string()]);
        let mut table = builder.build();
        table.with(Style::modern_rounded());
        table.to_string()
    }
}

/// Apply `control` once for this simulation step.
///
/// `refresh` is called after every mesh modification and must bring the
/// dependent state (finite-element spaces, solution fields) up to date with
/// the mesh; for AGAIN the control is then re-invoked before the step ends.
pub fn run_amr_step<F>(
    control: &mut dyn MeshControl,
    mesh: &mut dyn AmrMesh,
    mut refresh: F,
) -> AmrStepReport
where
    F: FnMut(&dyn AmrMesh),
{
    let mut report = AmrStepReport {
        elements_before: mesh.num_elements(),
        ..Default::default()
    };
    loop {
        let update_required = control.update(mesh);
        report.updates += 1;
        report.refined |= control.refined();
        report.derefined |= control.derefined();
        report.rebalanced |= control.rebalanced();
        if !update_required {
            report.stopped = control.is_stop();
            break;
        }
        refresh(&*mesh);
        if control.is_continue() {
            break;
        }
        // AGAIN: re-invoke against the refreshed state
    }
    report.elements_after = mesh.num_elements();
    info!(
        "AMR step finished after {} update(s): {} -> {} elements",
        report.updates, report.elements_before, report.elements_after
    );
    report
}

/// Initialize a terminal logger for the given level ("debug", "info",
/// "warn", "error"; "off"/"none" disables logging; `None` defaults to info).
/// Repeated initialization is ignored.
pub fn init_logging(loglevel: Option<String>) {
    let log_option = if let Some(level) = loglevel {
        match level.as_str() {
            "debug" => LevelFilter::Debug,
            "info" => LevelFilter::Info,
            "warn" => LevelFilter::Warn,
            "error" => LevelFilter::Error,
            "off" | "none" => return,
            _ => panic!("loglevel must be debug, info, warn or error"),
        }
    } else {
        LevelFilter::Info
    };
    let _ = CombinedLogger::init(vec![TermLogger::new(
        log_option,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meshcontrol::derefine_control::ThresholdDerefineControl2;
    use crate::meshcontrol::interval_mesh::{FixedErrorField, IntervalMesh};
    use crate::meshcontrol::mesh_api::{Refinement, RefinementMode};

    #[test]
    fn again_protocol_runs_both_stages_in_one_step() {
        let mut mesh = IntervalMesh::uniform(1);
        mesh.refine(&[Refinement::isotropic(0)], RefinementMode::NonConforming, 0);
        mesh.refine(
            &[Refinement::isotropic(0), Refinement::isotropic(1)],
            RefinementMode::NonConforming,
            0,
        );
        mesh.refine(&[Refinement::isotropic(2)], RefinementMode::NonConforming, 0);
        assert_eq!(mesh.levels(), vec![2, 2, 3, 3, 2]);

        let estimator = FixedErrorField::new(vec![0.01, 0.01, 1.0, 1.0, 0.5]);
        let mut control = ThresholdDerefineControl2::new(Box::new(estimator));
        control.set_threshold(0.1);
        control.set_nc_limit(1);

        let mut refreshes = 0usize;
        let report = run_amr_step(&mut control, &mut mesh, |_| refreshes += 1);
        assert_eq!(report.updates, 2);
        assert_eq!(refreshes, 2);
        assert!(report.derefined);
        assert!(report.refined);
        assert!(!report.stopped);
        for pair in mesh.levels().windows(2) {
            assert!(pair[0].abs_diff(pair[1]) <= 1);
        }
        let table = report.statistics_table();
        assert!(table.contains("control updates"));
    }

    #[test]
    fn stop_ends_the_step_without_refresh() {
        use crate::meshcontrol::marker::ThresholdMarker;
        use crate::meshcontrol::refine_control::RefinementControl;

        let mut mesh = IntervalMesh::uniform(3);
        let marker = ThresholdMarker::new(Box::new(FixedErrorField::new(vec![0.0; 3])));
        let mut control = RefinementControl::new(Box::new(marker));
        let mut refreshes = 0usize;
        let report = run_amr_step(&mut control, &mut mesh, |_| refreshes += 1);
        assert_eq!(report.updates, 1);
        assert_eq!(refreshes, 0);
        assert!(report.stopped);
        assert_eq!(report.elements_before, report.elements_after);
    }
}
