//! DC and transient evaluation of the Gummel-Poon model.
//!
//! One call per Newton iteration: pick junction voltages for the iteration
//! phase, limit them, evaluate currents, base charge and junction charges,
//! integrate the charges in transient analysis and stamp the companion
//! model.

use junction_core::{InitPhase, SimContext};
use log::trace;

use super::temp::{ResolvedModel, TempParams};
use super::{BjtInstance, Term, pos, slot};
use crate::error::Result;
use crate::junction::pnjlim;

/// Instance values scaled by area.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scaled {
    /// Thermal voltage (V).
    pub vt: f64,
    /// Saturation current (A).
    pub csat: f64,
    /// Minimum base resistance (ohm).
    pub rbpr: f64,
    /// Current-dependent part of the base resistance (ohm).
    pub rbpi: f64,
    /// Collector series conductance (S).
    pub gcpr: f64,
    /// Emitter series conductance (S).
    pub gepr: f64,
    /// Inverse forward knee current (1/A).
    pub oik: f64,
    /// Inverse reverse knee current (1/A).
    pub oikr: f64,
    /// B-E leakage saturation current (A).
    pub c2: f64,
    /// B-C leakage saturation current (A).
    pub c4: f64,
    /// B-E leakage emission voltage `ne * vt`.
    pub vte: f64,
    /// B-C leakage emission voltage `nc * vt`.
    pub vtc: f64,
    /// Excess-phase delay (s).
    pub td: f64,
    /// Current where the base resistance falls halfway to its minimum (A).
    pub xjrb: f64,
    /// Transit-time high-current corner (A).
    pub xjtf: f64,
    /// Zero-bias B-E depletion capacitance (F).
    pub czbe: f64,
    /// Zero-bias B-C depletion capacitance seen by the internal base (F).
    pub czbc: f64,
    /// Zero-bias B-C depletion capacitance seen by the external base (F).
    pub czbx: f64,
    /// Zero-bias C-S capacitance (F).
    pub czcs: f64,
}

impl Scaled {
    pub fn new(model: &ResolvedModel, tp: &TempParams, area: f64) -> Self {
        let rbpr = model.rbm / area;
        let ctot = tp.bc_cap * area;
        let czbc = ctot * model.xcjc;
        Self {
            vt: tp.vt,
            csat: tp.sat_cur * area,
            rbpr,
            rbpi: model.rb / area - rbpr,
            gcpr: model.collector_conduct * area,
            gepr: model.emitter_conduct * area,
            oik: model.inv_rolloff_f / area,
            oikr: model.inv_rolloff_r / area,
            c2: tp.be_leak_cur * area,
            c4: tp.bc_leak_cur * area,
            vte: model.ne * tp.vt,
            vtc: model.nc * tp.vt,
            td: model.excess_phase,
            xjrb: model.irb * area,
            xjtf: model.itf * area,
            czbe: tp.be_cap * area,
            czbc,
            czbx: ctot - czbc,
            czcs: model.cjs * area,
        }
    }
}

/// Ideal and leakage diode currents with their conductances.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Junctions {
    pub cbe: f64,
    pub gbe: f64,
    pub cben: f64,
    pub gben: f64,
    pub cbc: f64,
    pub gbc: f64,
    pub cbcn: f64,
    pub gbcn: f64,
}

/// Diode current and conductance; linear below `-5 vtn`.
fn diode(csat: f64, v: f64, vtn: f64, gmin: f64) -> (f64, f64) {
    if v > -5.0 * vtn {
        let ev = (v / vtn).exp();
        (csat * (ev - 1.0) + gmin * v, csat * ev / vtn + gmin)
    } else {
        let g = -csat / v + gmin;
        (g * v, g)
    }
}

fn leakage(c: f64, v: f64, vtn: f64, vtl: f64) -> (f64, f64) {
    if c == 0.0 {
        (0.0, 0.0)
    } else if v > -5.0 * vtn {
        let ev = (v / vtl).exp();
        (c * (ev - 1.0), c * ev / vtl)
    } else {
        let g = -c / v;
        (g * v, g)
    }
}

pub(crate) fn junction_currents(
    model: &ResolvedModel,
    sc: &Scaled,
    vbe: f64,
    vbc: f64,
    gmin: f64,
) -> Junctions {
    let vtn_f = sc.vt * model.nf;
    let vtn_r = sc.vt * model.nr;
    let (cbe, gbe) = diode(sc.csat, vbe, vtn_f, gmin);
    let (cben, gben) = leakage(sc.c2, vbe, vtn_f, sc.vte);
    let (cbc, gbc) = diode(sc.csat, vbc, vtn_r, gmin);
    let (cbcn, gbcn) = leakage(sc.c4, vbc, vtn_r, sc.vtc);
    Junctions {
        cbe,
        gbe,
        cben,
        gben,
        cbc,
        gbc,
        cbcn,
        gbcn,
    }
}

/// Normalized base charge and its partial derivatives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BaseCharge {
    pub qb: f64,
    pub dqbdve: f64,
    pub dqbdvc: f64,
}

pub(crate) fn base_charge(
    model: &ResolvedModel,
    sc: &Scaled,
    j: &Junctions,
    vbe: f64,
    vbc: f64,
) -> BaseCharge {
    let q1 = 1.0 / (1.0 - model.inv_early_f * vbc - model.inv_early_r * vbe);
    if sc.oik == 0.0 && sc.oikr == 0.0 {
        BaseCharge {
            qb: q1,
            dqbdve: q1 * q1 * model.inv_early_r,
            dqbdvc: q1 * q1 * model.inv_early_f,
        }
    } else {
        let q2 = sc.oik * j.cbe + sc.oikr * j.cbc;
        let arg = (1.0 + 4.0 * q2).max(0.0);
        let sqarg = if arg != 0.0 { arg.sqrt() } else { 1.0 };
        let qb = q1 * (1.0 + sqarg) / 2.0;
        BaseCharge {
            qb,
            dqbdve: q1 * (qb * model.inv_early_r + sc.oik * j.gbe / sqarg),
            dqbdvc: q1 * (qb * model.inv_early_f + sc.oikr * j.gbc / sqarg),
        }
    }
}

/// Conductance of the base spreading resistance at base current `cb`.
pub(crate) fn base_conductance(sc: &Scaled, qb: f64, cb: f64) -> f64 {
    let mut rx = sc.rbpr + sc.rbpi / qb;
    if sc.xjrb != 0.0 {
        let arg1 = (cb / sc.xjrb).max(1e-9);
        let z = (-1.0 + (1.0 + 14.59025 * arg1).sqrt()) / 2.4317 / arg1.sqrt();
        let tz = z.tan();
        rx = sc.rbpr + 3.0 * sc.rbpi * (tz - z) / z / tz / tz;
    }
    if rx != 0.0 { 1.0 / rx } else { 0.0 }
}

/// Depletion charge and capacitance of a junction.
///
/// Above `vfit` the `(1 - v/pot)^(1 - m)` law is replaced by its quadratic
/// extension with fit coefficients `f1`, `f2`, `f3`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn depletion(
    v: f64,
    czero: f64,
    pot: f64,
    grading: f64,
    vfit: f64,
    f1: f64,
    f2: f64,
    f3: f64,
) -> (f64, f64) {
    if v < vfit {
        let arg = 1.0 - v / pot;
        let sarg = (-grading * arg.ln()).exp();
        (
            pot * czero * (1.0 - arg * sarg) / (1.0 - grading),
            czero * sarg,
        )
    } else {
        let czf2 = czero / f2;
        (
            czero * f1
                + czf2 * (f3 * (v - vfit) + (grading / (pot + pot)) * (v * v - vfit * vfit)),
            czf2 * (f3 + grading * v / pot),
        )
    }
}

/// Substrate junction charge and capacitance; linear in forward bias.
pub(crate) fn substrate(vcs: f64, czcs: f64, pot: f64, grading: f64) -> (f64, f64) {
    if vcs < 0.0 {
        let arg = 1.0 - vcs / pot;
        let sarg = (-grading * arg.ln()).exp();
        (pot * czcs * (1.0 - arg * sarg) / (1.0 - grading), czcs * sarg)
    } else {
        (
            vcs * czcs * (1.0 + grading * vcs / (2.0 * pot)),
            czcs * (1.0 + grading * vcs / pot),
        )
    }
}

/// Junction charges and small-signal capacitances at one bias point.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Charges {
    pub qbe: f64,
    pub capbe: f64,
    pub qbc: f64,
    pub capbc: f64,
    pub qbx: f64,
    pub capbx: f64,
    pub qcs: f64,
    pub capcs: f64,
    /// d(qbe)/d(vbc) from the bias-dependent transit time.
    pub geqcb: f64,
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn charges(
    model: &ResolvedModel,
    tp: &TempParams,
    sc: &Scaled,
    j: &Junctions,
    b: &BaseCharge,
    vbe: f64,
    vbc: f64,
    vbx: f64,
    vcs: f64,
) -> Charges {
    let tf = model.tf;
    let tr = model.tr;
    let mut cbe = j.cbe;
    let mut gbe = j.gbe;
    let mut geqcb = 0.0;
    if tf != 0.0 && vbe > 0.0 {
        let mut argtf = 0.0;
        let mut arg2 = 0.0;
        let mut arg3 = 0.0;
        if model.xtf != 0.0 {
            argtf = model.xtf;
            if model.vtf_factor != 0.0 {
                argtf *= (vbc * model.vtf_factor).exp();
            }
            arg2 = argtf;
            if sc.xjtf != 0.0 {
                let temp = cbe / (cbe + sc.xjtf);
                argtf *= temp * temp;
                arg2 = argtf * (3.0 - temp - temp);
            }
            arg3 = cbe * argtf * model.vtf_factor;
        }
        cbe = cbe * (1.0 + argtf) / b.qb;
        gbe = (gbe * (1.0 + arg2) - cbe * b.dqbdve) / b.qb;
        geqcb = tf * (arg3 - cbe * b.dqbdvc) / b.qb;
    }

    let (qde, cde) = depletion(
        vbe, sc.czbe, tp.be_pot, model.mje, tp.dep_cap, tp.f1, model.f2, model.f3,
    );
    let (qdc, cdc) = depletion(
        vbc, sc.czbc, tp.bc_pot, model.mjc, tp.f4, tp.f5, model.f6, model.f7,
    );
    let (qbx, capbx) = depletion(
        vbx, sc.czbx, tp.bc_pot, model.mjc, tp.f4, tp.f5, model.f6, model.f7,
    );
    let (qcs, capcs) = substrate(vcs, sc.czcs, model.vjs, model.mjs);

    Charges {
        qbe: tf * cbe + qde,
        capbe: tf * gbe + cde,
        qbc: tr * j.cbc + qdc,
        capbc: tr * j.gbc + cdc,
        qbx,
        capbx,
        qcs,
        capcs,
        geqcb,
    }
}

/// Final currents and conductances of one evaluation, NPN frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Linearization {
    pub vbe: f64,
    pub vbc: f64,
    pub vbx: f64,
    pub vcs: f64,
    pub cc: f64,
    pub cb: f64,
    pub gpi: f64,
    pub gmu: f64,
    pub gm: f64,
    pub go: f64,
    pub gx: f64,
    pub geqcb: f64,
    pub gccs: f64,
    pub geqbx: f64,
    /// Charge current of the substrate junction.
    pub cqcs: f64,
    /// Charge current of the external base-collector junction.
    pub cqbx: f64,
}

impl Linearization {
    /// Conductance contributions in [`pos`] order.
    pub fn conductances(&self, gcpr: f64, gepr: f64) -> [f64; pos::COUNT] {
        let &Self {
            gpi,
            gmu,
            gm,
            go,
            gx,
            geqcb,
            gccs,
            geqbx,
            ..
        } = self;
        let mut g = [0.0; pos::COUNT];
        g[pos::CC] = gcpr;
        g[pos::BB] = gx + geqbx;
        g[pos::EE] = gepr;
        g[pos::CPCP] = gmu + go + gcpr + gccs + geqbx;
        g[pos::BPBP] = gx + gpi + gmu + geqcb;
        g[pos::EPEP] = gpi + gepr + gm + go;
        g[pos::CCP] = -gcpr;
        g[pos::BBP] = -gx;
        g[pos::EEP] = -gepr;
        g[pos::CPC] = -gcpr;
        g[pos::CPBP] = -gmu + gm;
        g[pos::CPEP] = -gm - go;
        g[pos::BPB] = -gx;
        g[pos::BPCP] = -gmu - geqcb;
        g[pos::BPEP] = -gpi;
        g[pos::EPE] = -gepr;
        g[pos::EPCP] = -go + geqcb;
        g[pos::EPBP] = -gpi - gm - geqcb;
        g[pos::SS] = gccs;
        g[pos::CPS] = -gccs;
        g[pos::SCP] = -gccs;
        g[pos::BCP] = -geqbx;
        g[pos::CPB] = -geqbx;
        g
    }

    /// Companion current sources `(ceqbe, ceqbc, ceqbx, ceqcs)`, polarity applied.
    pub fn sources(&self, sign: f64) -> (f64, f64, f64, f64) {
        let l = self;
        let ceqcs = sign * (l.cqcs - l.vcs * l.gccs);
        let ceqbx = sign * (l.cqbx - l.vbx * l.geqbx);
        let ceqbe = sign
            * (l.cc + l.cb - l.vbe * (l.gm + l.go + l.gpi) + l.vbc * (l.go - l.geqcb));
        let ceqbc = sign * (-l.cc + l.vbe * (l.gm + l.go) - l.vbc * (l.gmu + l.go));
        (ceqbe, ceqbc, ceqbx, ceqcs)
    }
}

/// Relative/absolute tolerance test used by bypass and convergence checks.
pub(crate) fn within(a: f64, b: f64, reltol: f64, abstol: f64) -> bool {
    (a - b).abs() <= reltol * a.abs().max(b.abs()) + abstol
}

/// Ratio of the present to the previous step, zero before any step.
fn step_ratio(ckt: &SimContext) -> f64 {
    if ckt.delta_prev != 0.0 {
        ckt.delta / ckt.delta_prev
    } else {
        0.0
    }
}

impl BjtInstance {
    pub(crate) fn load(&mut self, model: &ResolvedModel, ckt: &mut SimContext) -> Result<()> {
        let base = self.state_base()?;
        let tp = *self.temp_params_checked()?;
        let sc = Scaled::new(model, &tp, self.area);
        let sign = model.sign();
        let mode = ckt.mode;
        let gmin = ckt.tolerances.gmin;
        let s = base;

        let vbx_now = self.branch(ckt, sign, Term::B, Term::Cp);
        let vcs_now = self.branch(ckt, sign, Term::S, Term::Cp);

        // Junction voltages for this phase. Initialization phases leave
        // `icheck` set so the solver iterates at least once more.
        let mut icheck = true;
        let (vbe, vbc, vbx, vcs) = match mode.init {
            InitPhase::SmallSignal => (
                ckt.states.s0[s + slot::VBE],
                ckt.states.s0[s + slot::VBC],
                vbx_now,
                vcs_now,
            ),
            InitPhase::Transient => {
                let vbe = ckt.states.s1[s + slot::VBE];
                let vbc = ckt.states.s1[s + slot::VBC];
                if mode.is_tran() && mode.uic {
                    (vbe, vbc, sign * (self.ic_vbe() - self.ic_vce()), 0.0)
                } else {
                    (vbe, vbc, vbx_now, vcs_now)
                }
            }
            InitPhase::Junction if mode.is_tran_op() && mode.uic => {
                let vbe = sign * self.ic_vbe();
                let vce = sign * self.ic_vce();
                let vbc = vbe - vce;
                (vbe, vbc, vbc, 0.0)
            }
            InitPhase::Junction if !self.off => (tp.vcrit, 0.0, 0.0, 0.0),
            InitPhase::Junction => (0.0, 0.0, 0.0, 0.0),
            InitPhase::Fix if self.off => (0.0, 0.0, 0.0, 0.0),
            InitPhase::Float | InitPhase::Predict | InitPhase::Fix => {
                let (vbe, vbc) = if mode.init == InitPhase::Predict {
                    let xfact = step_ratio(ckt);
                    let st = &mut ckt.states;
                    let vbe = (1.0 + xfact) * st.s1[s + slot::VBE] - xfact * st.s2[s + slot::VBE];
                    let vbc = (1.0 + xfact) * st.s1[s + slot::VBC] - xfact * st.s2[s + slot::VBC];
                    // Limiting below is relative to the last accepted point.
                    for k in [
                        slot::VBE,
                        slot::VBC,
                        slot::CC,
                        slot::CB,
                        slot::GPI,
                        slot::GMU,
                        slot::GM,
                        slot::GO,
                        slot::GX,
                    ] {
                        st.s0[s + k] = st.s1[s + k];
                    }
                    (vbe, vbc)
                } else {
                    (
                        self.branch(ckt, sign, Term::Bp, Term::Ep),
                        self.branch(ckt, sign, Term::Bp, Term::Cp),
                    )
                };

                if mode.init != InitPhase::Predict && ckt.bypass {
                    if let Some(lin) = self.try_bypass(ckt, s, vbe, vbc, vbx_now, vcs_now) {
                        trace!("{}: bypass", self.name);
                        return self.stamp(ckt, sign, &sc, &lin);
                    }
                }

                let st = &ckt.states;
                let (vbe_lim, be_limited) =
                    pnjlim(vbe, st.s0[s + slot::VBE], sc.vt, tp.vcrit);
                let (vbc_lim, bc_limited) =
                    pnjlim(vbc, st.s0[s + slot::VBC], sc.vt, tp.vcrit);
                icheck = be_limited || bc_limited;
                if icheck {
                    trace!(
                        "{}: limited vbe {vbe:.6} -> {vbe_lim:.6}, vbc {vbc:.6} -> {vbc_lim:.6}",
                        self.name
                    );
                }
                (vbe_lim, vbc_lim, vbx_now, vcs_now)
            }
        };

        let j = junction_currents(model, &sc, vbe, vbc, gmin);
        let b = base_charge(model, &sc, &j, vbe, vbc);

        // Weil's excess-phase approximation, backward Euler in time.
        let mut cc = 0.0;
        let mut cex = j.cbe;
        let mut gex = j.gbe;
        if sc.td != 0.0 && ckt.delta > 0.0 && mode.is_dynamic() {
            let arg1 = ckt.delta / sc.td;
            let arg2 = 3.0 * arg1;
            let arg1 = arg2 * arg1;
            let denom = 1.0 + arg1 + arg2;
            let arg3 = arg1 / denom;
            let st = &mut ckt.states;
            if mode.init == InitPhase::Transient {
                st.s1[s + slot::CEXBC] = j.cbe / b.qb;
                st.s2[s + slot::CEXBC] = st.s1[s + slot::CEXBC];
            }
            let ratio = step_ratio(ckt);
            let st = &mut ckt.states;
            cc = (st.s1[s + slot::CEXBC] * (1.0 + ratio + arg2) - st.s2[s + slot::CEXBC] * ratio)
                / denom;
            cex = j.cbe * arg3;
            gex = j.gbe * arg3;
            st.s0[s + slot::CEXBC] = cc + cex / b.qb;
        }

        let mut cc = cc + (cex - j.cbc) / b.qb - j.cbc / tp.beta_r - j.cbcn;
        let mut cb = j.cbe / tp.beta_f + j.cben + j.cbc / tp.beta_r + j.cbcn;
        let gx = base_conductance(&sc, b.qb, cb);
        let mut gpi = j.gbe / tp.beta_f + j.gben;
        let mut gmu = j.gbc / tp.beta_r + j.gbcn;
        let go = (j.gbc + (cex - j.cbc) * b.dqbdvc / b.qb) / b.qb;
        let gm = (gex - (cex - j.cbc) * b.dqbdve / b.qb) / b.qb - go;

        let mut geqcb = 0.0;
        let needs_charges = mode.is_dynamic()
            || (mode.is_tran_op() && mode.uic)
            || mode.init == InitPhase::SmallSignal;
        let mut q = Charges::default();
        if needs_charges {
            q = charges(model, &tp, &sc, &j, &b, vbe, vbc, vbx, vcs);
            geqcb = q.geqcb;
            let st = &mut ckt.states;
            st.s0[s + slot::QBE] = q.qbe;
            st.s0[s + slot::QBC] = q.qbc;
            st.s0[s + slot::QBX] = q.qbx;
            st.s0[s + slot::QCS] = q.qcs;

            if mode.init == InitPhase::SmallSignal {
                st.s0[s + slot::CQBE] = q.capbe;
                st.s0[s + slot::CQBC] = q.capbc;
                st.s0[s + slot::CQCS] = q.capcs;
                st.s0[s + slot::CQBX] = q.capbx;
                st.s0[s + slot::CEXBC] = geqcb;
                self.store(ckt, s, &Linearization {
                    vbe,
                    vbc,
                    vbx,
                    vcs,
                    cc,
                    cb,
                    gpi,
                    gmu,
                    gm,
                    go,
                    gx,
                    geqcb,
                    ..Default::default()
                });
                return Ok(());
            }

            if mode.is_tran() {
                if mode.init == InitPhase::Transient {
                    for k in [slot::QBE, slot::QBC, slot::QBX, slot::QCS] {
                        st.s1[s + k] = st.s0[s + k];
                    }
                }
                let (geq, _) = ckt.integrate(q.capbe, s + slot::QBE)?;
                geqcb *= ckt.integrator.ag[0];
                gpi += geq;
                cb += ckt.states.s0[s + slot::CQBE];
                let (geq, _) = ckt.integrate(q.capbc, s + slot::QBC)?;
                gmu += geq;
                cb += ckt.states.s0[s + slot::CQBC];
                cc -= ckt.states.s0[s + slot::CQBC];
                if mode.init == InitPhase::Transient {
                    let st = &mut ckt.states;
                    st.s1[s + slot::CQBE] = st.s0[s + slot::CQBE];
                    st.s1[s + slot::CQBC] = st.s0[s + slot::CQBC];
                }
            }
        }

        if icheck && !(mode.init == InitPhase::Fix && self.off) {
            ckt.report_nonconvergence(&self.name);
        }

        let mut gccs = 0.0;
        let mut geqbx = 0.0;
        let mut cqcs = 0.0;
        let mut cqbx = 0.0;
        if mode.is_tran() {
            gccs = ckt.integrate(q.capcs, s + slot::QCS)?.0;
            geqbx = ckt.integrate(q.capbx, s + slot::QBX)?.0;
            let st = &mut ckt.states;
            if mode.init == InitPhase::Transient {
                st.s1[s + slot::CQBX] = st.s0[s + slot::CQBX];
                st.s1[s + slot::CQCS] = st.s0[s + slot::CQCS];
            }
            cqcs = st.s0[s + slot::CQCS];
            cqbx = st.s0[s + slot::CQBX];
        }

        let lin = Linearization {
            vbe,
            vbc,
            vbx,
            vcs,
            cc,
            cb,
            gpi,
            gmu,
            gm,
            go,
            gx,
            geqcb,
            gccs,
            geqbx,
            cqcs,
            cqbx,
        };
        self.store(ckt, s, &lin);
        self.stamp(ckt, sign, &sc, &lin)
    }

    /// Reuse the stored linearization when neither the junction voltages nor
    /// the predicted currents moved beyond tolerance.
    fn try_bypass(
        &self,
        ckt: &SimContext,
        s: usize,
        vbe: f64,
        vbc: f64,
        vbx: f64,
        vcs: f64,
    ) -> Option<Linearization> {
        let s0 = |k: usize| ckt.states.s0[s + k];
        let tol = &ckt.tolerances;
        let delvbe = vbe - s0(slot::VBE);
        let delvbc = vbc - s0(slot::VBC);
        let cchat = s0(slot::CC) + (s0(slot::GM) + s0(slot::GO)) * delvbe
            - (s0(slot::GO) + s0(slot::GMU)) * delvbc;
        let cbhat = s0(slot::CB) + s0(slot::GPI) * delvbe + s0(slot::GMU) * delvbc;

        let unchanged = within(vbe, s0(slot::VBE), tol.reltol, tol.voltol)
            && within(vbc, s0(slot::VBC), tol.reltol, tol.voltol)
            && within(vcs, s0(slot::VCS), tol.reltol, tol.voltol)
            && within(cchat, s0(slot::CC), tol.reltol, tol.abstol)
            && within(cbhat, s0(slot::CB), tol.reltol, tol.abstol);
        if !unchanged {
            return None;
        }

        let tran = ckt.mode.is_tran();
        Some(Linearization {
            vbe: s0(slot::VBE),
            vbc: s0(slot::VBC),
            vbx,
            vcs,
            cc: s0(slot::CC),
            cb: s0(slot::CB),
            gpi: s0(slot::GPI),
            gmu: s0(slot::GMU),
            gm: s0(slot::GM),
            go: s0(slot::GO),
            gx: s0(slot::GX),
            geqcb: s0(slot::GEQCB),
            gccs: s0(slot::GCCS),
            geqbx: s0(slot::GEQBX),
            cqcs: if tran { s0(slot::CQCS) } else { 0.0 },
            cqbx: if tran { s0(slot::CQBX) } else { 0.0 },
        })
    }

    fn store(&self, ckt: &mut SimContext, s: usize, lin: &Linearization) {
        let s0 = &mut ckt.states.s0;
        s0[s + slot::VBE] = lin.vbe;
        s0[s + slot::VBC] = lin.vbc;
        s0[s + slot::VCS] = lin.vcs;
        s0[s + slot::CC] = lin.cc;
        s0[s + slot::CB] = lin.cb;
        s0[s + slot::GPI] = lin.gpi;
        s0[s + slot::GMU] = lin.gmu;
        s0[s + slot::GM] = lin.gm;
        s0[s + slot::GO] = lin.go;
        s0[s + slot::GX] = lin.gx;
        s0[s + slot::GEQCB] = lin.geqcb;
        s0[s + slot::GCCS] = lin.gccs;
        s0[s + slot::GEQBX] = lin.geqbx;
    }

    fn stamp(
        &self,
        ckt: &mut SimContext,
        sign: f64,
        sc: &Scaled,
        lin: &Linearization,
    ) -> Result<()> {
        let n = self.nodes;
        let (ceqbe, ceqbc, ceqbx, ceqcs) = lin.sources(sign);
        ckt.rhs_add(n.base, -ceqbx);
        ckt.rhs_add(n.col_prime, ceqcs + ceqbx + ceqbc);
        ckt.rhs_add(n.base_prime, -ceqbe - ceqbc);
        ckt.rhs_add(n.emit_prime, ceqbe);
        ckt.rhs_add(n.substrate, -ceqcs);
        self.stamp_real(ckt, &lin.conductances(sc.gcpr, sc.gepr))
    }
}
