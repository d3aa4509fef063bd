//! Newton convergence check on the terminal currents.

use junction_core::SimContext;
use log::trace;

use super::load::within;
use super::temp::ResolvedModel;
use super::{BjtInstance, Term, slot};
use crate::error::Result;

impl BjtInstance {
    /// Compare the currents predicted from the last linearization at the
    /// present solution with the currents evaluated there. Counts one
    /// non-converged device when either misses tolerance.
    pub(crate) fn conv_test(&self, model: &ResolvedModel, ckt: &mut SimContext) -> Result<()> {
        let s = self.state_base()?;
        let sign = model.sign();
        let vbe = self.branch(ckt, sign, Term::Bp, Term::Ep);
        let vbc = self.branch(ckt, sign, Term::Bp, Term::Cp);

        let s0 = &ckt.states.s0;
        let delvbe = vbe - s0[s + slot::VBE];
        let delvbc = vbc - s0[s + slot::VBC];
        let cc = s0[s + slot::CC];
        let cb = s0[s + slot::CB];
        let cchat = cc + (s0[s + slot::GM] + s0[s + slot::GO]) * delvbe
            - (s0[s + slot::GO] + s0[s + slot::GMU]) * delvbc;
        let cbhat = cb + s0[s + slot::GPI] * delvbe + s0[s + slot::GMU] * delvbc;

        let tol = &ckt.tolerances;
        if !within(cchat, cc, tol.reltol, tol.abstol) || !within(cbhat, cb, tol.reltol, tol.abstol)
        {
            trace!("{}: not converged, ic {cc:e} -> {cchat:e}, ib {cb:e} -> {cbhat:e}", self.name);
            ckt.report_nonconvergence(&self.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::bjt::{Bjt, BjtInstance, BjtModelParams};
    use crate::device::Device;
    use junction_core::{Analysis, InitPhase, Mode, NodeId, SimContext};

    fn converged_at(vb: f64) -> (Bjt, SimContext) {
        converged_group(vb, &["Q1"])
    }

    fn converged_group(vb: f64, names: &[&str]) -> (Bjt, SimContext) {
        let mut ckt = SimContext::default();
        for id in 1..=3 {
            ckt.nodes.get_or_create(id);
        }
        ckt.resize_vectors();
        let params = BjtModelParams {
            is: Some(1e-16),
            bf: Some(100.0),
            ..Default::default()
        };
        let mut q = Bjt::new("qmod", params);
        for name in names {
            q.add_instance(BjtInstance::three_terminal(
                *name,
                NodeId::new(1),
                NodeId::new(2),
                NodeId::new(3),
            ));
        }
        q.setup(&mut ckt).unwrap();
        q.temperature(&ckt).unwrap();
        ckt.set_voltage(NodeId::new(1), 2.0);
        ckt.set_voltage(NodeId::new(2), vb);
        ckt.mode = Mode::new(Analysis::DcOp, InitPhase::Float);
        q.load(&mut ckt).unwrap();
        ckt.noncon = 0;
        (q, ckt)
    }

    #[test]
    fn test_unchanged_solution_converges() {
        let (q, mut ckt) = converged_at(0.65);
        q.conv_test(&mut ckt).unwrap();
        assert_eq!(ckt.noncon, 0);
    }

    #[test]
    fn test_moved_solution_does_not_converge() {
        let (q, mut ckt) = converged_at(0.65);
        ckt.set_voltage(NodeId::new(2), 0.66);
        q.conv_test(&mut ckt).unwrap();
        assert_eq!(ckt.noncon, 1);
        assert_eq!(ckt.trouble_element.as_deref(), Some("Q1"));
    }

    #[test]
    fn test_collector_swing_alone_is_tolerated() {
        // With no Early effect the collector current barely depends on vbc.
        let (q, mut ckt) = converged_at(0.65);
        ckt.set_voltage(NodeId::new(1), 2.5);
        q.conv_test(&mut ckt).unwrap();
        assert_eq!(ckt.noncon, 0);
    }

    #[test]
    fn test_first_failing_instance_stops_the_check() {
        let (q, mut ckt) = converged_group(0.65, &["Q1", "Q2"]);
        ckt.set_voltage(NodeId::new(2), 0.66);
        q.conv_test(&mut ckt).unwrap();
        assert_eq!(ckt.noncon, 1);
        assert_eq!(ckt.trouble_element.as_deref(), Some("Q1"));
    }
}
