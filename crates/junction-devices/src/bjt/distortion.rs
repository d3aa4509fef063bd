//! Volterra-series distortion of the Gummel-Poon model.
//!
//! `disto_setup` re-evaluates the large-signal equations at the operating
//! point with [`Dual3`] arguments and keeps the normalized Taylor
//! coefficients of every nonlinear branch. `disto_load` turns the circuit's
//! lower-order kernels into branch phasors and injects the resulting
//! intermodulation currents.
//!
//! Variables, all in the NPN frame:
//!
//! | branch | x     | y     | z                        |
//! |--------|-------|-------|--------------------------|
//! | `ic`   | `vbe` | `vbc` | `vbe` delayed by `td`    |
//! | `ib`   | `vbe` | `vbc` |                          |
//! | `ibb`  | `vbe` | `vbc` | `vbb` across `rb`        |
//! | `qbe`  | `vbe` | `vbc` |                          |
//! | `qbc`  | `vbc` |       |                          |
//! | `qbx`  | `vbx` |       |                          |
//! | `qcs`  | `vcs` |       |                          |

use junction_core::{DistoMode, DistortionJob, NodeId, SimContext};
use log::debug;
use nalgebra::DVector;
use num_complex::Complex;

use super::load::Scaled;
use super::temp::{ResolvedModel, TempParams};
use super::{BjtInstance, BjtNodes, Term, slot};
use crate::dual::Dual3;
use crate::error::{Error, Result};
use crate::volterra::{Phasor3, TaylorCoeffs, Tones};

/// Taylor coefficients of the nonlinear branches at one operating point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DistoCoeffs {
    /// Collector current, C' to E'.
    pub ic: TaylorCoeffs,
    /// Base current, B' to E'.
    pub ib: TaylorCoeffs,
    /// Current through the base resistance, B to B'.
    pub ibb: TaylorCoeffs,
    /// Base-emitter charge.
    pub qbe: TaylorCoeffs,
    /// Internal base-collector charge.
    pub qbc: TaylorCoeffs,
    /// External base-collector charge.
    pub qbx: TaylorCoeffs,
    /// Collector-substrate charge.
    pub qcs: TaylorCoeffs,
}

fn diode(csat: f64, v: Dual3, vtn: f64, gmin: f64) -> Dual3 {
    if v.value > -5.0 * vtn {
        csat * ((v / vtn).exp() - 1.0) + gmin * v
    } else {
        (-csat / v.value + gmin) * v
    }
}

fn leakage(c: f64, v: Dual3, vtn: f64, vtl: f64) -> Dual3 {
    if c == 0.0 {
        Dual3::constant(0.0)
    } else if v.value > -5.0 * vtn {
        c * ((v / vtl).exp() - 1.0)
    } else {
        (-c / v.value) * v
    }
}

#[allow(clippy::too_many_arguments)]
fn depletion(v: Dual3, czero: f64, pot: f64, grading: f64, vfit: f64, f1: f64, f2: f64, f3: f64) -> Dual3 {
    if v.value < vfit {
        let arg = 1.0 - v / pot;
        pot * czero * (1.0 - arg.powf(1.0 - grading)) / (1.0 - grading)
    } else {
        czero * f1
            + czero / f2 * (f3 * (v - vfit) + grading / (pot + pot) * (v * v - vfit * vfit))
    }
}

fn substrate(v: Dual3, czcs: f64, pot: f64, grading: f64) -> Dual3 {
    if v.value < 0.0 {
        let arg = 1.0 - v / pot;
        pot * czcs * (1.0 - arg.powf(1.0 - grading)) / (1.0 - grading)
    } else {
        czcs * (v + grading / (2.0 * pot) * v * v)
    }
}

/// Operating-point voltages the coefficients are taken around.
#[derive(Debug, Clone, Copy)]
struct Bias {
    vbe: f64,
    vbc: f64,
    vbb: f64,
    vbx: f64,
    vcs: f64,
}

fn coefficients(
    model: &ResolvedModel,
    tp: &TempParams,
    sc: &Scaled,
    gmin: f64,
    bias: Bias,
) -> DistoCoeffs {
    let x = Dual3::variable(bias.vbe, 0);
    let y = Dual3::variable(bias.vbc, 1);
    let delayed = Dual3::variable(bias.vbe, 2);
    let vtn_f = sc.vt * model.nf;
    let vtn_r = sc.vt * model.nr;

    let cbe = diode(sc.csat, x, vtn_f, gmin);
    let cbe_delayed = diode(sc.csat, delayed, vtn_f, gmin);
    let cben = leakage(sc.c2, x, vtn_f, sc.vte);
    let cbc = diode(sc.csat, y, vtn_r, gmin);
    let cbcn = leakage(sc.c4, y, vtn_r, sc.vtc);

    let q1 = (1.0 - model.inv_early_f * y - model.inv_early_r * x).recip();
    let qb = if sc.oik == 0.0 && sc.oikr == 0.0 {
        q1
    } else {
        let arg = (1.0 + 4.0 * (sc.oik * cbe + sc.oikr * cbc)).max_const(0.0);
        let sqarg = if arg.value != 0.0 {
            arg.sqrt()
        } else {
            Dual3::constant(1.0)
        };
        q1 * (1.0 + sqarg) / 2.0
    };

    let ic = (cbe_delayed - cbc) / qb - cbc / tp.beta_r - cbcn;
    let ib = cbe / tp.beta_f + cben + cbc / tp.beta_r + cbcn;

    let ibb = {
        let rx = if sc.xjrb != 0.0 {
            let arg1 = (ib / sc.xjrb).max_const(1e-9);
            let z = ((1.0 + 14.59025 * arg1).sqrt() - 1.0) / 2.4317 / arg1.sqrt();
            let tz = z.tan();
            sc.rbpr + 3.0 * sc.rbpi * (tz - z) / z / tz / tz
        } else {
            sc.rbpr + sc.rbpi / qb
        };
        if rx.value != 0.0 {
            Dual3::variable(bias.vbb, 2) * rx.recip()
        } else {
            Dual3::constant(0.0)
        }
    };

    let mut qbe = depletion(
        x, sc.czbe, tp.be_pot, model.mje, tp.dep_cap, tp.f1, model.f2, model.f3,
    );
    let diffusion = if model.tf != 0.0 && bias.vbe > 0.0 {
        let mut argtf = Dual3::constant(0.0);
        if model.xtf != 0.0 {
            argtf = Dual3::constant(model.xtf);
            if model.vtf_factor != 0.0 {
                argtf = argtf * (y * model.vtf_factor).exp();
            }
            if sc.xjtf != 0.0 {
                let t = cbe / (cbe + sc.xjtf);
                argtf = argtf * t * t;
            }
        }
        cbe * (1.0 + argtf) / qb
    } else {
        cbe
    };
    qbe = qbe + model.tf * diffusion;

    let vbc_only = Dual3::variable(bias.vbc, 0);
    let qbc = model.tr * diode(sc.csat, vbc_only, vtn_r, gmin)
        + depletion(
            vbc_only, sc.czbc, tp.bc_pot, model.mjc, tp.f4, tp.f5, model.f6, model.f7,
        );
    let qbx = depletion(
        Dual3::variable(bias.vbx, 0),
        sc.czbx,
        tp.bc_pot,
        model.mjc,
        tp.f4,
        tp.f5,
        model.f6,
        model.f7,
    );
    let qcs = substrate(Dual3::variable(bias.vcs, 0), sc.czcs, model.vjs, model.mjs);

    DistoCoeffs {
        ic: TaylorCoeffs::from_dual(&ic),
        ib: TaylorCoeffs::from_dual(&ib),
        ibb: TaylorCoeffs::from_dual(&ibb),
        qbe: TaylorCoeffs::from_dual(&qbe),
        qbc: TaylorCoeffs::from_dual(&qbc),
        qbx: TaylorCoeffs::from_dual(&qbx),
        qcs: TaylorCoeffs::from_dual(&qcs),
    }
}

/// Branch phasors of one kernel, NPN frame.
#[derive(Debug, Clone, Copy)]
struct Branches {
    vbe: Complex<f64>,
    vbc: Complex<f64>,
    vbb: Complex<f64>,
    vbx: Complex<f64>,
    vcs: Complex<f64>,
}

impl Branches {
    fn of(kernel: &DVector<Complex<f64>>, nodes: &BjtNodes, sign: f64) -> Self {
        let v = |a: Term, b: Term| (kernel[nodes.node(a).index()] - kernel[nodes.node(b).index()]) * sign;
        Self {
            vbe: v(Term::Bp, Term::Ep),
            vbc: v(Term::Bp, Term::Cp),
            vbb: v(Term::B, Term::Bp),
            vbx: v(Term::B, Term::Cp),
            vcs: v(Term::S, Term::Cp),
        }
    }
}

impl BjtInstance {
    pub(crate) fn disto_setup(&mut self, model: &ResolvedModel, ckt: &SimContext) -> Result<()> {
        let base = self.state_base()?;
        let tp = self.temp_params_checked()?;
        let sc = Scaled::new(model, tp, self.area);
        let sign = model.sign();
        let s0 = &ckt.states.s0;
        let bias = Bias {
            vbe: s0[base + slot::VBE],
            vbc: s0[base + slot::VBC],
            vbb: self.branch(ckt, sign, Term::B, Term::Bp),
            vbx: self.branch(ckt, sign, Term::B, Term::Cp),
            vcs: s0[base + slot::VCS],
        };
        let coeffs = coefficients(model, tp, &sc, ckt.tolerances.gmin, bias);
        debug!(
            "{}: distortion coefficients at vbe={:.6} vbc={:.6}",
            self.name, bias.vbe, bias.vbc
        );
        self.disto = Some(coeffs);
        Ok(())
    }

    pub(crate) fn disto_load(
        &self,
        model: &ResolvedModel,
        mode: DistoMode,
        job: &DistortionJob,
        ckt: &mut SimContext,
    ) -> Result<()> {
        let coeffs = self
            .disto
            .as_ref()
            .ok_or_else(|| Error::MissingDistortionSetup(self.name.clone()))?;
        job.check_size(ckt.size())?;
        let sign = model.sign();
        let td = model.excess_phase;
        let n = self.nodes;

        let kernels = [&job.h1, &job.h2, &job.h11, &job.h1m2].map(|h| Branches::of(h, &n, sign));
        let pick = |f: fn(&Branches) -> Phasor3| Tones {
            h1: f(&kernels[0]),
            h2: f(&kernels[1]),
            h11: f(&kernels[2]),
            h1m2: f(&kernels[3]),
        };
        let zero = Complex::new(0.0, 0.0);
        let junction = pick(|b| [b.vbe, b.vbc, b.vbe]).map(job.omega1, job.omega2, |p, w| {
            [p[0], p[1], p[2] * Complex::from_polar(1.0, -w * td)]
        });
        let intrinsic = pick(|b| [b.vbe, b.vbc, Complex::new(0.0, 0.0)]);
        let spread = pick(|b| [b.vbe, b.vbc, b.vbb]);
        let bc = pick(|b| [b.vbc, Complex::new(0.0, 0.0), Complex::new(0.0, 0.0)]);
        let bx = pick(|b| [b.vbx, Complex::new(0.0, 0.0), Complex::new(0.0, 0.0)]);
        let cs = pick(|b| [b.vcs, Complex::new(0.0, 0.0), Complex::new(0.0, 0.0)]);

        let jw = Complex::new(0.0, mode.omega(job.omega1, job.omega2));
        let flows: [(NodeId, NodeId, Complex<f64>); 7] = [
            (n.col_prime, n.emit_prime, coeffs.ic.response(mode, &junction)),
            (n.base_prime, n.emit_prime, coeffs.ib.response(mode, &intrinsic)),
            (n.base, n.base_prime, coeffs.ibb.response(mode, &spread)),
            (n.base_prime, n.emit_prime, jw * coeffs.qbe.response(mode, &intrinsic)),
            (n.base_prime, n.col_prime, jw * coeffs.qbc.response(mode, &bc)),
            (n.base, n.col_prime, jw * coeffs.qbx.response(mode, &bx)),
            (n.substrate, n.col_prime, jw * coeffs.qcs.response(mode, &cs)),
        ];
        for (from, to, i) in flows {
            if i == zero {
                continue;
            }
            let i = i * sign;
            ckt.rhs_add(from, -i.re);
            ckt.irhs_add(from, -i.im);
            ckt.rhs_add(to, i.re);
            ckt.irhs_add(to, i.im);
        }
        Ok(())
    }
}
