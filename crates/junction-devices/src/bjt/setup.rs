//! Topology setup: internal nodes, state slots and matrix handles.

use junction_core::{NodeId, SimContext};
use log::debug;

use super::{BjtInstance, BjtModelParams, ModelParam, STAMP_POSITIONS, Term, slot};
use crate::error::Result;

impl BjtInstance {
    /// Insert internal nodes for nonzero parasitic resistances, reserve
    /// state slots and resolve matrix handles.
    ///
    /// Calling it again keeps the nodes and slots already assigned.
    pub(crate) fn setup(&mut self, params: &BjtModelParams, ckt: &mut SimContext) -> Result<()> {
        if self.state.is_none() {
            self.state = Some(ckt.states.allocate(slot::COUNT));
        }

        let parasitics = [
            (ModelParam::Rc, Term::C, Term::Cp, "collector"),
            (ModelParam::Rb, Term::B, Term::Bp, "base"),
            (ModelParam::Re, Term::E, Term::Ep, "emitter"),
        ];
        for (resistance, external, internal, suffix) in parasitics {
            let outer = self.nodes.node(external);
            let inner = if params.value(resistance) == 0.0 {
                outer
            } else if self.nodes.node(internal) == outer {
                let node = ckt.nodes.make_internal(&self.name, suffix)?;
                self.created.push(node);
                node
            } else {
                self.nodes.node(internal)
            };
            self.set_internal(internal, inner);
        }

        ckt.resize_vectors();
        self.resolve_entries(ckt)
    }

    fn set_internal(&mut self, term: Term, node: NodeId) {
        match term {
            Term::Cp => self.nodes.col_prime = node,
            Term::Bp => self.nodes.base_prime = node,
            Term::Ep => self.nodes.emit_prime = node,
            Term::C | Term::B | Term::E | Term::S => {}
        }
    }

    /// Find or create every stamp position in the present matrix.
    pub(crate) fn resolve_entries(&mut self, ckt: &mut SimContext) -> Result<()> {
        let nodes = self.nodes;
        self.entries = Some(
            STAMP_POSITIONS.map(|(row, col)| ckt.matrix.entry(nodes.node(row), nodes.node(col))),
        );
        debug!(
            "{}: resolved {} matrix entries (generation {})",
            self.name,
            STAMP_POSITIONS.len(),
            ckt.matrix.generation()
        );
        Ok(())
    }

    /// Remove the internal nodes created by `setup` and forget every handle.
    pub(crate) fn unsetup(&mut self, ckt: &mut SimContext) -> Result<()> {
        for node in self.created.drain(..) {
            ckt.nodes.remove(node)?;
            debug!("{}: removed internal node {}", self.name, node);
        }
        self.nodes.col_prime = self.nodes.collector;
        self.nodes.base_prime = self.nodes.base;
        self.nodes.emit_prime = self.nodes.emitter;
        self.entries = None;
        self.state = None;
        Ok(())
    }

    /// Take initial conditions that were not given from the solution.
    pub(crate) fn getic(&mut self, ckt: &SimContext) {
        let n = &self.nodes;
        if self.ic.vbe.is_none() {
            self.ic_solved[0] = ckt.rhs[n.base.index()] - ckt.rhs[n.emitter.index()];
        }
        if self.ic.vce.is_none() {
            self.ic_solved[1] = ckt.rhs[n.collector.index()] - ckt.rhs[n.emitter.index()];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bjt::{Bjt, pos};
    use crate::device::Device;
    use junction_core::MatrixEntry;

    fn circuit() -> SimContext {
        let mut ckt = SimContext::default();
        for id in 1..=4 {
            ckt.nodes.get_or_create(id);
        }
        ckt.resize_vectors();
        ckt
    }

    fn transistor(params: BjtModelParams) -> Bjt {
        Bjt::new("qmod", params).with_instance(BjtInstance::new(
            "Q1",
            NodeId::new(1),
            NodeId::new(2),
            NodeId::new(3),
            NodeId::new(4),
        ))
    }

    #[test]
    fn test_no_internal_nodes_without_resistance() {
        let mut ckt = circuit();
        let mut q = transistor(BjtModelParams::default());
        q.setup(&mut ckt).unwrap();

        let inst = &q.instances[0];
        assert_eq!(inst.nodes.col_prime, NodeId::new(1));
        assert_eq!(inst.nodes.base_prime, NodeId::new(2));
        assert_eq!(inst.nodes.emit_prime, NodeId::new(3));
        assert_eq!(ckt.nodes.num_nodes(), 4);
        assert_eq!(inst.state, Some(0));
        assert_eq!(ckt.states.len(), slot::COUNT);
    }

    #[test]
    fn test_internal_nodes_for_resistances() {
        let mut ckt = circuit();
        let mut q = transistor(BjtModelParams {
            rb: Some(100.0),
            rc: Some(10.0),
            re: Some(1.0),
            ..Default::default()
        });
        q.setup(&mut ckt).unwrap();

        let inst = &q.instances[0];
        assert_eq!(ckt.nodes.find("Q1#collector"), Some(inst.nodes.col_prime));
        assert_eq!(ckt.nodes.find("Q1#base"), Some(inst.nodes.base_prime));
        assert_eq!(ckt.nodes.find("Q1#emitter"), Some(inst.nodes.emit_prime));
        assert_eq!(ckt.nodes.num_nodes(), 7);
        assert_eq!(ckt.size(), 8);
        let entries = inst.entries.unwrap();
        assert!(entries.iter().all(|e| *e != MatrixEntry::Trash));
        assert_eq!(ckt.matrix.len(), pos::COUNT);
    }

    #[test]
    fn test_setup_is_reinvocable() {
        let mut ckt = circuit();
        let mut q = transistor(BjtModelParams {
            rb: Some(100.0),
            ..Default::default()
        });
        q.setup(&mut ckt).unwrap();
        let first = q.instances[0].clone();
        q.setup(&mut ckt).unwrap();

        let inst = &q.instances[0];
        assert_eq!(inst.nodes, first.nodes);
        assert_eq!(inst.state, first.state);
        assert_eq!(inst.entries, first.entries);
        assert_eq!(ckt.nodes.num_nodes(), 5);
    }

    #[test]
    fn test_resetup_after_reallocation() {
        let mut ckt = circuit();
        let mut q = transistor(BjtModelParams::default());
        q.setup(&mut ckt).unwrap();
        ckt.matrix.reallocate();

        let stale = q.instances[0].entries.unwrap()[pos::BPBP];
        assert!(ckt.matrix.try_add(stale, 1.0).is_err());

        q.resetup(&mut ckt).unwrap();
        let fresh = q.instances[0].entries.unwrap()[pos::BPBP];
        ckt.matrix.try_add(fresh, 1.0).unwrap();
        assert_eq!(ckt.matrix.value(NodeId::new(2), NodeId::new(2)), 1.0);
    }

    #[test]
    fn test_unsetup_removes_internal_nodes() {
        let mut ckt = circuit();
        let mut q = transistor(BjtModelParams {
            re: Some(2.0),
            ..Default::default()
        });
        q.setup(&mut ckt).unwrap();
        assert!(ckt.nodes.find("Q1#emitter").is_some());

        q.unsetup(&mut ckt).unwrap();
        let inst = &q.instances[0];
        assert!(ckt.nodes.find("Q1#emitter").is_none());
        assert_eq!(inst.nodes.emit_prime, NodeId::new(3));
        assert!(inst.entries.is_none());

        q.setup(&mut ckt).unwrap();
        assert!(ckt.nodes.find("Q1#emitter").is_some());
    }

    #[test]
    fn test_ground_substrate_uses_trash() {
        let mut ckt = circuit();
        let mut q = Bjt::new("qmod", BjtModelParams::default()).with_instance(
            BjtInstance::three_terminal("Q1", NodeId::new(1), NodeId::new(2), NodeId::new(3)),
        );
        q.setup(&mut ckt).unwrap();
        let entries = q.instances[0].entries.unwrap();
        assert_eq!(entries[pos::SS], MatrixEntry::Trash);
        assert_eq!(entries[pos::CPS], MatrixEntry::Trash);
        assert_ne!(entries[pos::CPCP], MatrixEntry::Trash);
    }

    #[test]
    fn test_getic_reads_solution() {
        let mut ckt = circuit();
        let mut q = transistor(BjtModelParams::default());
        q.setup(&mut ckt).unwrap();
        ckt.rhs[1] = 5.0;
        ckt.rhs[2] = 0.7;
        ckt.rhs[3] = 0.1;
        q.instances[0].ic.vce = Some(3.0);
        q.getic(&ckt).unwrap();

        let inst = &q.instances[0];
        assert!((inst.ic_vbe() - 0.6).abs() < 1e-12);
        assert_eq!(inst.ic_vce(), 3.0);
    }
}
