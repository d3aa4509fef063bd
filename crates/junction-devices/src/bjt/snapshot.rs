//! Save and restore of an instance for step rejection.
//!
//! A [`Snapshot`] holds every mutable field of an instance together with
//! its slots of the state vectors, so that restoring it undoes any number
//! of loads.

use junction_core::{MatrixEntry, NodeId, SimContext};
use log::debug;

use super::distortion::DistoCoeffs;
use super::temp::TempParams;
use super::{BjtInstance, BjtNodes, InitialConditions, pos, slot};
use crate::device::BackupMode;
use crate::error::Result;

/// Copy of the mutable part of a [`BjtInstance`].
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    area: f64,
    off: bool,
    ic: InitialConditions,
    temp: Option<f64>,
    nodes: BjtNodes,
    created: Vec<NodeId>,
    ic_solved: [f64; 2],
    state: Option<usize>,
    entries: Option<[MatrixEntry; pos::COUNT]>,
    tp: Option<TempParams>,
    disto: Option<DistoCoeffs>,
    /// State slots of the instance in layers s0, s1, s2.
    states: Option<[Vec<f64>; 3]>,
}

impl Snapshot {
    pub fn capture(inst: &BjtInstance, ckt: &SimContext) -> Self {
        Self {
            area: inst.area,
            off: inst.off,
            ic: inst.ic,
            temp: inst.temp,
            nodes: inst.nodes,
            created: inst.created.clone(),
            ic_solved: inst.ic_solved,
            state: inst.state,
            entries: inst.entries,
            tp: inst.tp,
            disto: inst.disto,
            states: inst
                .state
                .map(|base| ckt.states.snapshot(base, slot::COUNT)),
        }
    }

    fn apply(&self, inst: &mut BjtInstance, ckt: &mut SimContext) {
        inst.area = self.area;
        inst.off = self.off;
        inst.ic = self.ic;
        inst.temp = self.temp;
        inst.nodes = self.nodes;
        inst.created.clone_from(&self.created);
        inst.ic_solved = self.ic_solved;
        inst.state = self.state;
        inst.entries = self.entries;
        inst.tp = self.tp;
        inst.disto = self.disto;
        if let (Some(base), Some(layers)) = (self.state, &self.states) {
            ckt.states.restore(base, layers);
        }
    }
}

impl BjtInstance {
    pub(crate) fn backup(&mut self, ckt: &mut SimContext, mode: BackupMode) -> Result<()> {
        match mode {
            BackupMode::Save => {
                let snap = Snapshot::capture(self, ckt);
                match self.backup.as_deref_mut() {
                    Some(buf) => *buf = snap,
                    None => self.backup = Some(Box::new(snap)),
                }
                debug!("{}: saved", self.name);
            }
            BackupMode::Restore => match self.backup.take() {
                Some(snap) => {
                    snap.apply(self, ckt);
                    self.backup = Some(snap);
                    debug!("{}: restored", self.name);
                }
                None => debug!("{}: nothing saved to restore", self.name),
            },
            BackupMode::Clear => self.backup = None,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bjt::{Bjt, BjtModelParams};
    use crate::device::Device;
    use junction_core::{Analysis, InitPhase, Mode};

    fn loaded() -> (Bjt, SimContext) {
        let mut ckt = SimContext::default();
        for id in 1..=3 {
            ckt.nodes.get_or_create(id);
        }
        let params = BjtModelParams {
            rb: Some(50.0),
            cje: Some(1e-12),
            ..Default::default()
        };
        let mut q = Bjt::new("qmod", params).with_instance(BjtInstance::three_terminal(
            "Q1",
            NodeId::new(1),
            NodeId::new(2),
            NodeId::new(3),
        ));
        q.setup(&mut ckt).unwrap();
        q.temperature(&ckt).unwrap();
        ckt.set_voltage(NodeId::new(1), 2.0);
        ckt.set_voltage(NodeId::new(2), 0.7);
        let bp = q.instances[0].nodes().base_prime;
        ckt.set_voltage(bp, 0.69);
        ckt.mode = Mode::new(Analysis::DcOp, InitPhase::Float);
        q.load(&mut ckt).unwrap();
        (q, ckt)
    }

    #[test]
    fn test_restore_undoes_loads() {
        let (mut q, mut ckt) = loaded();
        let before = Snapshot::capture(&q.instances[0], &ckt);
        q.backup(&mut ckt, BackupMode::Save).unwrap();

        ckt.set_voltage(NodeId::new(2), 0.75);
        let bp = q.instances[0].nodes().base_prime;
        ckt.set_voltage(bp, 0.74);
        q.load(&mut ckt).unwrap();
        q.instances[0].off = true;
        q.instances[0].ic_solved = [1.0, 2.0];
        assert_ne!(Snapshot::capture(&q.instances[0], &ckt), before);

        q.backup(&mut ckt, BackupMode::Restore).unwrap();
        assert_eq!(Snapshot::capture(&q.instances[0], &ckt), before);
        assert!(q.instances[0].backup.is_some());
    }

    #[test]
    fn test_clear_drops_buffer_and_restore_is_noop() {
        let (mut q, mut ckt) = loaded();
        q.backup(&mut ckt, BackupMode::Save).unwrap();
        q.backup(&mut ckt, BackupMode::Clear).unwrap();
        assert!(q.instances[0].backup.is_none());

        q.instances[0].area = 4.0;
        q.backup(&mut ckt, BackupMode::Restore).unwrap();
        assert_eq!(q.instances[0].area, 4.0);
    }

    #[test]
    fn test_save_overwrites_previous_snapshot() {
        let (mut q, mut ckt) = loaded();
        q.backup(&mut ckt, BackupMode::Save).unwrap();
        q.instances[0].area = 2.0;
        q.backup(&mut ckt, BackupMode::Save).unwrap();
        q.instances[0].area = 3.0;
        q.backup(&mut ckt, BackupMode::Restore).unwrap();
        assert_eq!(q.instances[0].area, 2.0);
    }
}
