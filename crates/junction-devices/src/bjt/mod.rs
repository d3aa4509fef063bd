//! Gummel-Poon bipolar junction transistor.
//!
//! A [`Bjt`] holds one model card and every instance that uses it. The
//! solver drives it through the [`Device`] trait:
//!
//! - `setup` inserts internal collector/base/emitter nodes when the
//!   corresponding parasitic resistance is nonzero, reserves state slots
//!   and resolves the 23 matrix positions of the 7-node Jacobian
//! - `temperature` resolves model defaults and scales saturation currents,
//!   betas, junction capacitances and potentials to the device temperature
//! - `load` evaluates currents, charges and their derivatives and stamps
//!   the linearized companion model
//! - `ac_load`/`pz_load` stamp the frozen small-signal admittance
//! - `disto_setup`/`disto_load` compute Taylor coefficients and inject
//!   intermodulation currents

mod ac;
mod conv;
mod distortion;
mod load;
mod params;
mod setup;
mod snapshot;
mod temp;

use junction_core::{DistoMode, DistortionJob, MatrixEntry, NodeId, SimContext};
use num_complex::Complex;

use crate::device::{BackupMode, Device};
use crate::error::{Error, Result};

pub use ac::AcCurrents;
pub use distortion::DistoCoeffs;
pub use params::{BjtModelParams, INSTANCE_PARAMS, InstanceParam, MODEL_PARAMS, ModelParam};
pub use snapshot::Snapshot;
pub use temp::{ResolvedModel, TempParams};

/// Device polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum BjtType {
    /// NPN transistor.
    #[default]
    Npn,
    /// PNP transistor.
    Pnp,
}

impl BjtType {
    /// +1 for NPN, -1 for PNP. Branch voltages and stamped currents are
    /// multiplied by this so the model equations are written for NPN only.
    pub fn sign(self) -> f64 {
        match self {
            BjtType::Npn => 1.0,
            BjtType::Pnp => -1.0,
        }
    }
}

/// Offsets of the per-instance state slots.
pub(crate) mod slot {
    pub const VBE: usize = 0;
    pub const VBC: usize = 1;
    pub const CC: usize = 2;
    pub const CB: usize = 3;
    pub const GPI: usize = 4;
    pub const GMU: usize = 5;
    pub const GM: usize = 6;
    pub const GO: usize = 7;
    pub const QBE: usize = 8;
    pub const CQBE: usize = 9;
    pub const QBC: usize = 10;
    pub const CQBC: usize = 11;
    pub const QCS: usize = 12;
    pub const CQCS: usize = 13;
    pub const QBX: usize = 14;
    pub const CQBX: usize = 15;
    pub const GX: usize = 16;
    pub const CEXBC: usize = 17;
    pub const GEQCB: usize = 18;
    pub const GCCS: usize = 19;
    pub const GEQBX: usize = 20;
    pub const VCS: usize = 21;

    pub const COUNT: usize = 22;
}

/// Device terminals, external and internal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Term {
    C,
    B,
    E,
    S,
    /// Internal collector.
    Cp,
    /// Internal base.
    Bp,
    /// Internal emitter.
    Ep,
}

/// Indices into the stamp arrays.
pub(crate) mod pos {
    pub const CC: usize = 0;
    pub const BB: usize = 1;
    pub const EE: usize = 2;
    pub const CPCP: usize = 3;
    pub const BPBP: usize = 4;
    pub const EPEP: usize = 5;
    pub const CCP: usize = 6;
    pub const BBP: usize = 7;
    pub const EEP: usize = 8;
    pub const CPC: usize = 9;
    pub const CPBP: usize = 10;
    pub const CPEP: usize = 11;
    pub const BPB: usize = 12;
    pub const BPCP: usize = 13;
    pub const BPEP: usize = 14;
    pub const EPE: usize = 15;
    pub const EPCP: usize = 16;
    pub const EPBP: usize = 17;
    pub const SS: usize = 18;
    pub const CPS: usize = 19;
    pub const SCP: usize = 20;
    pub const BCP: usize = 21;
    pub const CPB: usize = 22;

    pub const COUNT: usize = 23;
}

/// (row, column) of every structural nonzero, indexed by [`pos`].
pub(crate) const STAMP_POSITIONS: [(Term, Term); pos::COUNT] = [
    (Term::C, Term::C),
    (Term::B, Term::B),
    (Term::E, Term::E),
    (Term::Cp, Term::Cp),
    (Term::Bp, Term::Bp),
    (Term::Ep, Term::Ep),
    (Term::C, Term::Cp),
    (Term::B, Term::Bp),
    (Term::E, Term::Ep),
    (Term::Cp, Term::C),
    (Term::Cp, Term::Bp),
    (Term::Cp, Term::Ep),
    (Term::Bp, Term::B),
    (Term::Bp, Term::Cp),
    (Term::Bp, Term::Ep),
    (Term::Ep, Term::E),
    (Term::Ep, Term::Cp),
    (Term::Ep, Term::Bp),
    (Term::S, Term::S),
    (Term::Cp, Term::S),
    (Term::S, Term::Cp),
    (Term::B, Term::Cp),
    (Term::Cp, Term::B),
];

/// Node numbers of one instance. Internal nodes equal their external
/// counterparts until setup inserts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BjtNodes {
    pub collector: NodeId,
    pub base: NodeId,
    pub emitter: NodeId,
    pub substrate: NodeId,
    pub col_prime: NodeId,
    pub base_prime: NodeId,
    pub emit_prime: NodeId,
}

impl BjtNodes {
    pub(crate) fn node(&self, term: Term) -> NodeId {
        match term {
            Term::C => self.collector,
            Term::B => self.base,
            Term::E => self.emitter,
            Term::S => self.substrate,
            Term::Cp => self.col_prime,
            Term::Bp => self.base_prime,
            Term::Ep => self.emit_prime,
        }
    }
}

/// User initial conditions for UIC transients.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InitialConditions {
    pub vbe: Option<f64>,
    pub vce: Option<f64>,
}

/// One transistor.
#[derive(Debug, Clone)]
pub struct BjtInstance {
    pub name: String,
    pub area: f64,
    /// Held off during the initial operating-point iterations.
    pub off: bool,
    pub ic: InitialConditions,
    /// Instance temperature override (K).
    pub temp: Option<f64>,
    pub(crate) nodes: BjtNodes,
    /// Internal nodes this instance created, removed again by `unsetup`.
    pub(crate) created: Vec<NodeId>,
    /// Initial conditions read back from a solution by `getic`.
    pub(crate) ic_solved: [f64; 2],
    pub(crate) state: Option<usize>,
    pub(crate) entries: Option<[MatrixEntry; pos::COUNT]>,
    pub(crate) tp: Option<TempParams>,
    pub(crate) disto: Option<DistoCoeffs>,
    pub(crate) backup: Option<Box<Snapshot>>,
}

impl BjtInstance {
    /// A transistor between collector, base, emitter and substrate.
    pub fn new(
        name: impl Into<String>,
        collector: NodeId,
        base: NodeId,
        emitter: NodeId,
        substrate: NodeId,
    ) -> Self {
        Self {
            name: name.into(),
            area: 1.0,
            off: false,
            ic: InitialConditions::default(),
            temp: None,
            nodes: BjtNodes {
                collector,
                base,
                emitter,
                substrate,
                col_prime: collector,
                base_prime: base,
                emit_prime: emitter,
            },
            created: Vec::new(),
            ic_solved: [0.0; 2],
            state: None,
            entries: None,
            tp: None,
            disto: None,
            backup: None,
        }
    }

    /// A three-terminal transistor with the substrate grounded.
    pub fn three_terminal(
        name: impl Into<String>,
        collector: NodeId,
        base: NodeId,
        emitter: NodeId,
    ) -> Self {
        Self::new(name, collector, base, emitter, NodeId::GROUND)
    }

    pub fn with_area(mut self, area: f64) -> Self {
        self.area = area;
        self
    }

    pub fn with_off(mut self, off: bool) -> Self {
        self.off = off;
        self
    }

    pub fn with_ic(mut self, vbe: f64, vce: f64) -> Self {
        self.ic = InitialConditions {
            vbe: Some(vbe),
            vce: Some(vce),
        };
        self
    }

    pub fn nodes(&self) -> &BjtNodes {
        &self.nodes
    }

    /// Base offset of the state slots, once set up.
    pub fn state_offset(&self) -> Option<usize> {
        self.state
    }

    /// Temperature-adjusted parameters, once computed.
    pub fn temp_params(&self) -> Option<&TempParams> {
        self.tp.as_ref()
    }

    /// Distortion coefficients, once computed.
    pub fn disto_coeffs(&self) -> Option<&DistoCoeffs> {
        self.disto.as_ref()
    }

    /// Initial B-E voltage: user value, else the one read by `getic`.
    pub fn ic_vbe(&self) -> f64 {
        self.ic.vbe.unwrap_or(self.ic_solved[0])
    }

    /// Initial C-E voltage: user value, else the one read by `getic`.
    pub fn ic_vce(&self) -> f64 {
        self.ic.vce.unwrap_or(self.ic_solved[1])
    }

    pub(crate) fn state_base(&self) -> Result<usize> {
        self.state.ok_or_else(|| Error::NotSetUp(self.name.clone()))
    }

    pub(crate) fn matrix_entries(&self) -> Result<&[MatrixEntry; pos::COUNT]> {
        self.entries
            .as_ref()
            .ok_or_else(|| Error::NotSetUp(self.name.clone()))
    }

    pub(crate) fn temp_params_checked(&self) -> Result<&TempParams> {
        self.tp
            .as_ref()
            .ok_or_else(|| Error::NotTemperatureUpdated(self.name.clone()))
    }

    /// Branch voltage `type * (v(a) - v(b))` from the present solution.
    pub(crate) fn branch(&self, ckt: &SimContext, sign: f64, a: Term, b: Term) -> f64 {
        sign * (ckt.voltage(self.nodes.node(a)) - ckt.voltage(self.nodes.node(b)))
    }

    /// Add one value per stamp position into the real part of the matrix.
    pub(crate) fn stamp_real(&self, ckt: &mut SimContext, values: &[f64; pos::COUNT]) -> Result<()> {
        let entries = self.matrix_entries()?;
        for (&entry, &value) in entries.iter().zip(values) {
            ckt.matrix.try_add(entry, value)?;
        }
        Ok(())
    }

    /// Add one complex value per stamp position into the matrix.
    pub(crate) fn stamp_complex(
        &self,
        ckt: &mut SimContext,
        values: &[Complex<f64>; pos::COUNT],
    ) -> Result<()> {
        let entries = self.matrix_entries()?;
        for (&entry, &value) in entries.iter().zip(values) {
            ckt.matrix.try_add_complex(entry, value)?;
        }
        Ok(())
    }
}

/// A BJT model card and the instances that use it.
#[derive(Debug, Clone)]
pub struct Bjt {
    pub name: String,
    pub(crate) params: BjtModelParams,
    pub(crate) model: Option<ResolvedModel>,
    pub instances: Vec<BjtInstance>,
}

impl Bjt {
    pub fn new(name: impl Into<String>, params: BjtModelParams) -> Self {
        Self {
            name: name.into(),
            params,
            model: None,
            instances: Vec::new(),
        }
    }

    pub fn add_instance(&mut self, instance: BjtInstance) -> &mut Self {
        self.instances.push(instance);
        self
    }

    pub fn with_instance(mut self, instance: BjtInstance) -> Self {
        self.instances.push(instance);
        self
    }

    pub fn params(&self) -> &BjtModelParams {
        &self.params
    }

    /// Replace the model card. Temperature-adjusted values must be recomputed.
    pub fn set_params(&mut self, params: BjtModelParams) {
        self.params = params;
        self.model = None;
    }

    /// Model values resolved by the last temperature update.
    pub fn resolved(&self) -> Option<&ResolvedModel> {
        self.model.as_ref()
    }

    pub fn instance(&self, name: &str) -> Option<&BjtInstance> {
        self.instances.iter().find(|inst| inst.name == name)
    }

    fn resolved_checked(&self) -> Result<&ResolvedModel> {
        self.model
            .as_ref()
            .ok_or_else(|| Error::NotTemperatureUpdated(self.name.clone()))
    }
}

impl Device for Bjt {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, ckt: &mut SimContext) -> Result<()> {
        let params = &self.params;
        for inst in &mut self.instances {
            inst.setup(params, ckt)?;
        }
        ckt.resize_vectors();
        Ok(())
    }

    fn unsetup(&mut self, ckt: &mut SimContext) -> Result<()> {
        for inst in &mut self.instances {
            inst.unsetup(ckt)?;
        }
        Ok(())
    }

    fn resetup(&mut self, ckt: &mut SimContext) -> Result<()> {
        for inst in &mut self.instances {
            inst.resolve_entries(ckt)?;
        }
        Ok(())
    }

    fn temperature(&mut self, ckt: &SimContext) -> Result<()> {
        let model = ResolvedModel::resolve(&self.name, &self.params, ckt);
        for inst in &mut self.instances {
            inst.tp = Some(TempParams::compute(&model, inst, ckt));
        }
        self.model = Some(model);
        Ok(())
    }

    fn getic(&mut self, ckt: &SimContext) -> Result<()> {
        for inst in &mut self.instances {
            inst.getic(ckt);
        }
        Ok(())
    }

    fn load(&mut self, ckt: &mut SimContext) -> Result<()> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::NotTemperatureUpdated(self.name.clone()))?;
        for inst in &mut self.instances {
            inst.load(model, ckt)?;
        }
        Ok(())
    }

    fn conv_test(&self, ckt: &mut SimContext) -> Result<()> {
        let model = self.resolved_checked()?;
        let before = ckt.noncon;
        for inst in &self.instances {
            inst.conv_test(model, ckt)?;
            if ckt.noncon != before {
                break;
            }
        }
        Ok(())
    }

    fn ac_load(&self, ckt: &mut SimContext) -> Result<()> {
        let model = self.resolved_checked()?;
        for inst in &self.instances {
            inst.ac_load(model, ckt)?;
        }
        Ok(())
    }

    fn pz_load(&self, ckt: &mut SimContext, s: Complex<f64>) -> Result<()> {
        let model = self.resolved_checked()?;
        for inst in &self.instances {
            inst.pz_load(model, ckt, s)?;
        }
        Ok(())
    }

    fn disto_setup(&mut self, ckt: &SimContext) -> Result<()> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| Error::NotTemperatureUpdated(self.name.clone()))?;
        for inst in &mut self.instances {
            inst.disto_setup(model, ckt)?;
        }
        Ok(())
    }

    fn disto_load(
        &self,
        mode: DistoMode,
        job: &DistortionJob,
        ckt: &mut SimContext,
    ) -> Result<()> {
        let model = self.resolved_checked()?;
        for inst in &self.instances {
            inst.disto_load(model, mode, job, ckt)?;
        }
        Ok(())
    }

    fn backup(&mut self, ckt: &mut SimContext, mode: BackupMode) -> Result<()> {
        for inst in &mut self.instances {
            inst.backup(ckt, mode)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polarity_sign() {
        assert_eq!(BjtType::Npn.sign(), 1.0);
        assert_eq!(BjtType::Pnp.sign(), -1.0);
        assert_eq!(BjtType::default(), BjtType::Npn);
    }

    #[test]
    fn test_stamp_positions_are_distinct() {
        for (i, a) in STAMP_POSITIONS.iter().enumerate() {
            for b in &STAMP_POSITIONS[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_unset_instance_has_external_nodes() {
        let q = BjtInstance::three_terminal("Q1", NodeId::new(1), NodeId::new(2), NodeId::new(3));
        assert_eq!(q.nodes().col_prime, NodeId::new(1));
        assert_eq!(q.nodes().base_prime, NodeId::new(2));
        assert_eq!(q.nodes().emit_prime, NodeId::new(3));
        assert_eq!(q.nodes().substrate, NodeId::GROUND);
        assert!(matches!(q.state_base(), Err(Error::NotSetUp(_))));
    }

    #[test]
    fn test_initial_conditions_fall_back_to_solution() {
        let mut q = BjtInstance::three_terminal("Q1", NodeId::new(1), NodeId::new(2), NodeId::new(3));
        q.ic_solved = [0.6, 2.0];
        assert_eq!(q.ic_vbe(), 0.6);
        let q = q.with_ic(0.7, 5.0);
        assert_eq!(q.ic_vbe(), 0.7);
        assert_eq!(q.ic_vce(), 5.0);
    }
}
