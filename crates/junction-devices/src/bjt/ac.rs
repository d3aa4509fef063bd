//! Frequency-domain stamps from the frozen operating point.
//!
//! The small-signal quantities come from the last load in the
//! `SmallSignal` phase: conductances in their usual slots and the
//! capacitances in the charge-current slots.

use junction_core::SimContext;
use num_complex::Complex;

use super::load::Scaled;
use super::temp::ResolvedModel;
use super::{Bjt, BjtInstance, STAMP_POSITIONS, Term, pos, slot};
use crate::error::Result;

/// Complex terminal currents of one instance, positive into the device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AcCurrents {
    /// Into the collector terminal.
    pub collector: Complex<f64>,
    /// Into the base terminal.
    pub base: Complex<f64>,
    /// Into the emitter terminal.
    pub emitter: Complex<f64>,
    /// Into the substrate terminal.
    pub substrate: Complex<f64>,
}

impl AcCurrents {
    /// Sum of the terminal currents, zero up to rounding.
    pub fn sum(&self) -> Complex<f64> {
        self.collector + self.base + self.emitter + self.substrate
    }
}

impl BjtInstance {
    /// Admittance of every stamp position at complex frequency `s`.
    ///
    /// `delay` applies the excess-phase rotation `exp(-s td)` to the
    /// transconductance.
    fn admittance(
        &self,
        model: &ResolvedModel,
        ckt: &SimContext,
        s: Complex<f64>,
        delay: bool,
    ) -> Result<[Complex<f64>; pos::COUNT]> {
        let base = self.state_base()?;
        let tp = self.temp_params_checked()?;
        let sc = Scaled::new(model, tp, self.area);
        let s0 = |k: usize| ckt.states.s0[base + k];

        let gpi = Complex::from(s0(slot::GPI));
        let gmu = Complex::from(s0(slot::GMU));
        let go = Complex::from(s0(slot::GO));
        let gx = Complex::from(s0(slot::GX));
        let gcpr = Complex::from(sc.gcpr);
        let gepr = Complex::from(sc.gepr);
        let mut gm = Complex::from(s0(slot::GM));
        if delay && sc.td != 0.0 {
            gm = (gm + go) * (-s * sc.td).exp() - go;
        }

        let cpi = s * s0(slot::CQBE);
        let cmu = s * s0(slot::CQBC);
        let cbx = s * s0(slot::CQBX);
        let ccs = s * s0(slot::CQCS);
        let cmcb = s * s0(slot::CEXBC);

        let mut y = [Complex::default(); pos::COUNT];
        y[pos::CC] = gcpr;
        y[pos::BB] = gx + cbx;
        y[pos::EE] = gepr;
        y[pos::CPCP] = gmu + go + gcpr + cmu + ccs + cbx;
        y[pos::BPBP] = gx + gpi + gmu + cpi + cmu + cmcb;
        y[pos::EPEP] = gpi + gepr + gm + go + cpi;
        y[pos::CCP] = -gcpr;
        y[pos::BBP] = -gx;
        y[pos::EEP] = -gepr;
        y[pos::CPC] = -gcpr;
        y[pos::CPBP] = -gmu + gm - cmu;
        y[pos::CPEP] = -gm - go;
        y[pos::BPB] = -gx;
        y[pos::BPCP] = -gmu - cmu - cmcb;
        y[pos::BPEP] = -gpi - cpi;
        y[pos::EPE] = -gepr;
        y[pos::EPCP] = -go + cmcb;
        y[pos::EPBP] = -gpi - gm - cpi - cmcb;
        y[pos::SS] = ccs;
        y[pos::CPS] = -ccs;
        y[pos::SCP] = -ccs;
        y[pos::BCP] = -cbx;
        y[pos::CPB] = -cbx;
        Ok(y)
    }

    pub(crate) fn ac_load(&self, model: &ResolvedModel, ckt: &mut SimContext) -> Result<()> {
        let y = self.admittance(model, ckt, Complex::new(0.0, ckt.omega), true)?;
        self.stamp_complex(ckt, &y)
    }

    /// Pole-zero stamp at `s`. The excess-phase delay has no rational
    /// form and is left out.
    pub(crate) fn pz_load(
        &self,
        model: &ResolvedModel,
        ckt: &mut SimContext,
        s: Complex<f64>,
    ) -> Result<()> {
        let y = self.admittance(model, ckt, s, false)?;
        self.stamp_complex(ckt, &y)
    }

    /// Terminal currents from the present complex solution at `ckt.omega`.
    pub(crate) fn ac_currents(&self, model: &ResolvedModel, ckt: &SimContext) -> Result<AcCurrents> {
        let y = self.admittance(model, ckt, Complex::new(0.0, ckt.omega), true)?;
        let n = &self.nodes;
        let into = |rows: &[Term]| -> Complex<f64> {
            STAMP_POSITIONS
                .iter()
                .zip(&y)
                .filter(|((row, _), _)| rows.contains(row))
                .map(|((_, col), yv)| yv * ckt.voltage_complex(n.node(*col)))
                .sum()
        };
        // A terminal without its series resistance shares the internal node.
        let merged = |outer: Term, inner: Term| -> Complex<f64> {
            if n.node(outer) == n.node(inner) {
                into(&[outer, inner])
            } else {
                into(&[outer])
            }
        };
        Ok(AcCurrents {
            collector: merged(Term::C, Term::Cp),
            base: merged(Term::B, Term::Bp),
            emitter: merged(Term::E, Term::Ep),
            substrate: into(&[Term::S]),
        })
    }
}

impl Bjt {
    /// Complex terminal currents of the named instance at `ckt.omega`.
    pub fn ac_currents(&self, instance: &str, ckt: &SimContext) -> Result<Option<AcCurrents>> {
        let model = self.resolved_checked()?;
        self.instances
            .iter()
            .find(|inst| inst.name == instance)
            .map(|inst| inst.ac_currents(model, ckt))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bjt::BjtModelParams;
    use crate::device::Device;
    use junction_core::{Analysis, InitPhase, Mode, NodeId, SimOptions};
    use std::f64::consts::PI;

    const C: NodeId = NodeId::new(1);
    const B: NodeId = NodeId::new(2);
    const E: NodeId = NodeId::new(3);
    const S: NodeId = NodeId::new(4);

    /// Operating point at vbe = 0.65, vce = 3, then the small-signal pass.
    fn biased(params: BjtModelParams) -> (Bjt, SimContext) {
        let options = SimOptions {
            bypass: false,
            ..Default::default()
        };
        let mut ckt = SimContext::new(&options);
        for id in 1..=4 {
            ckt.nodes.get_or_create(id);
        }
        let mut q = Bjt::new("qmod", params).with_instance(BjtInstance::new("Q1", C, B, E, S));
        q.setup(&mut ckt).unwrap();
        q.temperature(&ckt).unwrap();
        ckt.set_voltage(C, 3.0);
        ckt.set_voltage(B, 0.65);
        ckt.mode = Mode::new(Analysis::DcOp, InitPhase::Float);
        q.load(&mut ckt).unwrap();
        ckt.mode = Mode::new(Analysis::DcOp, InitPhase::SmallSignal);
        q.load(&mut ckt).unwrap();
        (q, ckt)
    }

    fn base_params() -> BjtModelParams {
        BjtModelParams {
            is: Some(1e-16),
            bf: Some(100.0),
            vaf: Some(50.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_ac_stamp_reduces_to_dc_without_capacitance() {
        let (mut q, mut ckt) = biased(base_params());
        let size = ckt.size();
        ckt.clear_load();
        ckt.mode = Mode::new(Analysis::DcOp, InitPhase::Float);
        q.load(&mut ckt).unwrap();
        let dc = ckt.matrix.to_dense(size);

        ckt.clear_load();
        ckt.mode = Mode::new(Analysis::Ac, InitPhase::Float);
        ckt.omega = 2.0 * PI * 1e6;
        q.ac_load(&mut ckt).unwrap();
        let ac = ckt.matrix.to_dense_complex(size);
        for i in 0..dc.nrows() {
            for j in 0..dc.ncols() {
                assert!((ac[(i, j)].re - dc[(i, j)]).abs() <= 1e-15 * dc[(i, j)].abs().max(1.0));
                assert_eq!(ac[(i, j)].im, 0.0);
            }
        }
    }

    #[test]
    fn test_capacitances_stamp_imaginary_part() {
        let params = BjtModelParams {
            cje: Some(1e-12),
            cjc: Some(5e-13),
            ..base_params()
        };
        let (q, mut ckt) = biased(params);
        let base = q.instances[0].state.unwrap();
        let cpi = ckt.states.s0[base + slot::CQBE];
        let cmu = ckt.states.s0[base + slot::CQBC];
        assert!(cpi > 0.0 && cmu > 0.0);

        ckt.clear_load();
        ckt.omega = 2.0 * PI * 1e8;
        q.ac_load(&mut ckt).unwrap();
        let y = ckt.matrix.complex_value(B, B);
        assert!((y.im - ckt.omega * (cpi + cmu)).abs() < 1e-9 * y.im);
        let y = ckt.matrix.complex_value(B, C);
        assert!((y.im + ckt.omega * cmu).abs() < 1e-9 * ckt.omega * cmu);
    }

    #[test]
    fn test_excess_phase_rotates_transconductance() {
        let params = BjtModelParams {
            tf: Some(1e-10),
            ptf: Some(30.0),
            ..base_params()
        };
        let (q, mut ckt) = biased(params);
        let base = q.instances[0].state.unwrap();
        let gm = ckt.states.s0[base + slot::GM];
        let go = ckt.states.s0[base + slot::GO];
        let td = q.resolved().unwrap().excess_phase;

        ckt.clear_load();
        ckt.omega = 2.0 * PI * 1e9;
        q.ac_load(&mut ckt).unwrap();
        let y = ckt.matrix.complex_value(C, E);
        let expected = -Complex::from(gm + go) * Complex::new(0.0, -ckt.omega * td).exp();
        assert!((y - expected).norm() < 1e-9 * expected.norm());
        assert!(y.im > 0.0);
    }

    #[test]
    fn test_pole_zero_stamp_scales_capacitance_by_s() {
        let params = BjtModelParams {
            cje: Some(1e-12),
            tf: Some(1e-10),
            ptf: Some(30.0),
            ..base_params()
        };
        let (q, mut ckt) = biased(params);
        let base = q.instances[0].state.unwrap();
        let cpi = ckt.states.s0[base + slot::CQBE];
        let gm = ckt.states.s0[base + slot::GM];
        let go = ckt.states.s0[base + slot::GO];

        ckt.clear_load();
        let s = Complex::new(-1e6, 0.0);
        q.pz_load(&mut ckt, s).unwrap();
        let y = ckt.matrix.complex_value(B, E);
        assert!(y.im.abs() < 1e-20);
        assert!((y.re + ckt.states.s0[base + slot::GPI] - 1e6 * cpi).abs() < 1e-9);
        // No delay in the pole-zero stamp.
        let y = ckt.matrix.complex_value(C, E);
        assert!((y.re + gm + go).abs() < 1e-12 * (gm + go));
    }

    #[test]
    fn test_terminal_currents_obey_kcl() {
        let params = BjtModelParams {
            cje: Some(1e-12),
            cjc: Some(5e-13),
            cjs: Some(2e-13),
            tf: Some(1e-10),
            ..base_params()
        };
        let (q, mut ckt) = biased(params);
        ckt.omega = 2.0 * PI * 1e7;
        ckt.set_voltage_complex(B, Complex::new(1e-3, 0.0));
        ckt.set_voltage_complex(C, Complex::new(-0.1, 0.0));
        ckt.set_voltage_complex(E, Complex::new(0.0, 0.0));
        ckt.set_voltage_complex(S, Complex::new(0.0, 0.0));

        let i = q.ac_currents("Q1", &ckt).unwrap().unwrap();
        assert!(i.sum().norm() < 1e-15, "sum {}", i.sum());
        assert!(i.collector.re > 0.0);
        assert!(i.base.norm() > 0.0);
        assert!(q.ac_currents("Q2", &ckt).unwrap().is_none());
    }
}
