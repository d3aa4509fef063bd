//! Temperature update: model defaults and temperature-scaled parameters.

use std::f64::consts::PI;

use junction_core::SimContext;
use log::{debug, warn};

use super::{BjtInstance, BjtModelParams, BjtType, ModelParam as P};
use crate::junction::{K_BOLTZMANN, Q_ELECTRON, REFTEMP, critical_voltage, thermal_voltage};

/// Largest forward-bias depletion coefficient accepted.
const FC_MAX: f64 = 0.9999;

/// Model values with every default applied, plus temperature-independent
/// coefficients derived from them.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedModel {
    pub bjt_type: BjtType,
    pub tnom: f64,
    pub is: f64,
    pub bf: f64,
    pub nf: f64,
    pub ise: f64,
    pub ne: f64,
    pub br: f64,
    pub nr: f64,
    pub isc: f64,
    pub nc: f64,
    pub rb: f64,
    pub rbm: f64,
    pub irb: f64,
    pub cje: f64,
    pub vje: f64,
    pub mje: f64,
    pub tf: f64,
    pub xtf: f64,
    pub itf: f64,
    pub cjc: f64,
    pub vjc: f64,
    pub mjc: f64,
    pub xcjc: f64,
    pub tr: f64,
    pub cjs: f64,
    pub vjs: f64,
    pub mjs: f64,
    pub xtb: f64,
    pub eg: f64,
    pub xti: f64,
    pub fc: f64,
    pub inv_early_f: f64,
    pub inv_early_r: f64,
    pub inv_rolloff_f: f64,
    pub inv_rolloff_r: f64,
    pub collector_conduct: f64,
    pub emitter_conduct: f64,
    /// `1 / (1.44 vtf)`, zero when `vtf` is not given.
    pub vtf_factor: f64,
    /// Excess-phase delay `ptf (rad) * tf` (s).
    pub excess_phase: f64,
    /// `ln(1 - fc)`.
    pub xfc: f64,
    pub f2: f64,
    pub f3: f64,
    pub f6: f64,
    pub f7: f64,
}

fn inverse(v: f64) -> f64 {
    if v != 0.0 { 1.0 / v } else { 0.0 }
}

impl ResolvedModel {
    pub fn resolve(name: &str, p: &BjtModelParams, ckt: &SimContext) -> Self {
        let is = p.value(P::Is);
        let rb = p.value(P::Rb);
        let tf = p.value(P::Tf);
        let mje = p.value(P::Mje);
        let mjc = p.value(P::Mjc);

        let ise = p.effective(P::Ise);
        let isc = p.effective(P::Isc);

        let mut fc = p.value(P::Fc);
        if fc > FC_MAX {
            warn!("{name}: fc too large, limited to {FC_MAX}");
            fc = FC_MAX;
        }
        let xfc = (1.0 - fc).ln();

        Self {
            bjt_type: p.bjt_type,
            tnom: p.tnom.unwrap_or(ckt.nom_temp),
            is,
            bf: p.value(P::Bf),
            nf: p.value(P::Nf),
            ise,
            ne: p.value(P::Ne),
            br: p.value(P::Br),
            nr: p.value(P::Nr),
            isc,
            nc: p.value(P::Nc),
            rb,
            rbm: p.effective(P::Rbm),
            irb: p.value(P::Irb),
            cje: p.value(P::Cje),
            vje: p.value(P::Vje),
            mje,
            tf,
            xtf: p.value(P::Xtf),
            itf: p.value(P::Itf),
            cjc: p.value(P::Cjc),
            vjc: p.value(P::Vjc),
            mjc,
            xcjc: p.value(P::Xcjc),
            tr: p.value(P::Tr),
            cjs: p.value(P::Cjs),
            vjs: p.value(P::Vjs),
            mjs: p.value(P::Mjs),
            xtb: p.value(P::Xtb),
            eg: p.value(P::Eg),
            xti: p.value(P::Xti),
            fc,
            inv_early_f: inverse(p.value(P::Vaf)),
            inv_early_r: inverse(p.value(P::Var)),
            inv_rolloff_f: inverse(p.value(P::Ikf)),
            inv_rolloff_r: inverse(p.value(P::Ikr)),
            collector_conduct: inverse(p.value(P::Rc)),
            emitter_conduct: inverse(p.value(P::Re)),
            vtf_factor: inverse(p.value(P::Vtf) * 1.44),
            excess_phase: p.value(P::Ptf) * PI / 180.0 * tf,
            xfc,
            f2: ((1.0 + mje) * xfc).exp(),
            f3: 1.0 - fc * (1.0 + mje),
            f6: ((1.0 + mjc) * xfc).exp(),
            f7: 1.0 - fc * (1.0 + mjc),
        }
    }

    pub fn sign(&self) -> f64 {
        self.bjt_type.sign()
    }
}

/// Parameters of one instance scaled to its temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempParams {
    /// Device temperature (K).
    pub temp: f64,
    /// Thermal voltage at `temp`.
    pub vt: f64,
    /// Transport saturation current (A).
    pub sat_cur: f64,
    /// Ideal maximum forward beta.
    pub beta_f: f64,
    /// Ideal maximum reverse beta.
    pub beta_r: f64,
    /// B-E leakage saturation current (A).
    pub be_leak_cur: f64,
    /// B-C leakage saturation current (A).
    pub bc_leak_cur: f64,
    /// Zero-bias B-E depletion capacitance (F).
    pub be_cap: f64,
    /// B-E built-in potential (V).
    pub be_pot: f64,
    /// Zero-bias B-C depletion capacitance (F).
    pub bc_cap: f64,
    /// B-C built-in potential (V).
    pub bc_pot: f64,
    /// B-E voltage where the depletion charge switches to its quadratic fit.
    pub dep_cap: f64,
    /// Depletion charge of the B-E junction at `dep_cap`, per unit capacitance.
    pub f1: f64,
    /// B-C voltage where the depletion charge switches to its quadratic fit.
    pub f4: f64,
    /// Depletion charge of the B-C junction at `f4`, per unit capacitance.
    pub f5: f64,
    /// Critical voltage for junction limiting.
    pub vcrit: f64,
}

/// Temperature dependence of built-in potentials relative to `REFTEMP`.
fn potential_shift(temp: f64) -> f64 {
    let vt = thermal_voltage(temp);
    let egfet = 1.16 - (7.02e-4 * temp * temp) / (temp + 1108.0);
    let arg = -egfet / (2.0 * K_BOLTZMANN * temp)
        + 1.1150877 / (K_BOLTZMANN * (REFTEMP + REFTEMP));
    -2.0 * vt * (1.5 * (temp / REFTEMP).ln() + Q_ELECTRON * arg)
}

/// Junction values measured at `tnom`, rescaled to `temp`.
#[derive(Debug, Clone, Copy)]
struct JunctionScaling {
    tnom: f64,
    temp: f64,
    /// Potential shift at `tnom`.
    pb_nom: f64,
    /// Potential shift at `temp`.
    pb_temp: f64,
}

impl JunctionScaling {
    fn new(tnom: f64, temp: f64) -> Self {
        Self {
            tnom,
            temp,
            pb_nom: potential_shift(tnom),
            pb_temp: potential_shift(temp),
        }
    }

    /// `(capacitance, potential)` at `temp` of a junction with the given
    /// zero-bias capacitance, potential and grading at `tnom`.
    fn scale(&self, cap: f64, pot: f64, grading: f64) -> (f64, f64) {
        let pbo = (pot - self.pb_nom) / (self.tnom / REFTEMP);
        let gmaold = (pot - pbo) / pbo;
        let cap_ref = cap / (1.0 + grading * (4e-4 * (self.tnom - REFTEMP) - gmaold));
        let tpot = self.temp / REFTEMP * pbo + self.pb_temp;
        let gmanew = (tpot - pbo) / pbo;
        let tcap = cap_ref * (1.0 + grading * (4e-4 * (self.temp - REFTEMP) - gmanew));
        (tcap, tpot)
    }
}

impl TempParams {
    pub fn compute(model: &ResolvedModel, inst: &BjtInstance, ckt: &SimContext) -> Self {
        let temp = inst.temp.unwrap_or(ckt.temp);
        let tnom = model.tnom;
        let vt = thermal_voltage(temp);

        let ratlog = (temp / tnom).ln();
        let ratio1 = temp / tnom - 1.0;
        let factlog = ratio1 * model.eg / vt + model.xti * ratlog;
        let factor = factlog.exp();
        let bfactor = (ratlog * model.xtb).exp();

        let junction = JunctionScaling::new(tnom, temp);
        let (be_cap, be_pot) = junction.scale(model.cje, model.vje, model.mje);
        let (bc_cap, bc_pot) = junction.scale(model.cjc, model.vjc, model.mjc);

        let tp = Self {
            temp,
            vt,
            sat_cur: model.is * factor,
            beta_f: model.bf * bfactor,
            beta_r: model.br * bfactor,
            be_leak_cur: model.ise * (factlog / model.ne).exp() / bfactor,
            bc_leak_cur: model.isc * (factlog / model.nc).exp() / bfactor,
            be_cap,
            be_pot,
            bc_cap,
            bc_pot,
            dep_cap: model.fc * be_pot,
            f1: be_pot * (1.0 - ((1.0 - model.mje) * model.xfc).exp()) / (1.0 - model.mje),
            f4: model.fc * bc_pot,
            f5: bc_pot * (1.0 - ((1.0 - model.mjc) * model.xfc).exp()) / (1.0 - model.mjc),
            vcrit: critical_voltage(vt, model.is),
        };
        debug!(
            "{}: T={:.2}K is={:.4e} bf={:.4} vcrit={:.4}",
            inst.name, temp, tp.sat_cur, tp.beta_f, tp.vcrit
        );
        tp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use junction_core::{NodeId, SimOptions};

    fn rel_close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * a.abs().max(b.abs()).max(1e-300)
    }

    fn instance() -> BjtInstance {
        BjtInstance::three_terminal("Q1", NodeId::new(1), NodeId::new(2), NodeId::new(3))
    }

    fn full_params() -> BjtModelParams {
        BjtModelParams {
            is: Some(2e-16),
            bf: Some(150.0),
            br: Some(2.0),
            ise: Some(1e-14),
            isc: Some(5e-15),
            xtb: Some(1.5),
            cje: Some(1e-12),
            cjc: Some(5e-13),
            vje: Some(0.8),
            vjc: Some(0.6),
            ..Default::default()
        }
    }

    #[test]
    fn test_nominal_temperature_reproduces_parameters() {
        for tnom in [REFTEMP, 320.0] {
            let ckt = SimContext::new(&SimOptions {
                temp: tnom,
                tnom,
                ..Default::default()
            });
            let model = ResolvedModel::resolve("qmod", &full_params(), &ckt);
            let tp = TempParams::compute(&model, &instance(), &ckt);

            assert!(rel_close(tp.sat_cur, 2e-16, 1e-12));
            assert!(rel_close(tp.beta_f, 150.0, 1e-12));
            assert!(rel_close(tp.beta_r, 2.0, 1e-12));
            assert!(rel_close(tp.be_leak_cur, 1e-14, 1e-12));
            assert!(rel_close(tp.bc_leak_cur, 5e-15, 1e-12));
            assert!(rel_close(tp.be_cap, 1e-12, 1e-9));
            assert!(rel_close(tp.bc_cap, 5e-13, 1e-9));
            assert!(rel_close(tp.be_pot, 0.8, 1e-9));
            assert!(rel_close(tp.bc_pot, 0.6, 1e-9));
        }
    }

    #[test]
    fn test_hot_device_scaling() {
        let ckt = SimContext::default();
        let model = ResolvedModel::resolve("qmod", &full_params(), &ckt);
        let mut hot = instance();
        hot.temp = Some(REFTEMP + 50.0);
        let cold = TempParams::compute(&model, &instance(), &ckt);
        let hot = TempParams::compute(&model, &hot, &ckt);

        assert!(hot.sat_cur > 100.0 * cold.sat_cur);
        assert!(hot.beta_f > cold.beta_f);
        assert!(hot.be_pot < cold.be_pot);
        assert!(hot.be_cap > cold.be_cap);
        assert!(hot.vt > cold.vt);
    }

    #[test]
    fn test_model_defaults() {
        let ckt = SimContext::default();
        let model = ResolvedModel::resolve("qmod", &BjtModelParams::default(), &ckt);
        assert_eq!(model.is, 1e-16);
        assert_eq!(model.bf, 100.0);
        assert_eq!(model.ne, 1.5);
        assert_eq!(model.nc, 2.0);
        assert_eq!(model.vje, 0.75);
        assert_eq!(model.mje, 0.33);
        assert_eq!(model.mjs, 0.0);
        assert_eq!(model.xcjc, 1.0);
        assert_eq!(model.eg, 1.11);
        assert_eq!(model.xti, 3.0);
        assert_eq!(model.fc, 0.5);
        assert_eq!(model.tnom, REFTEMP);
        assert_eq!(model.inv_early_f, 0.0);
        assert_eq!(model.collector_conduct, 0.0);
        assert_eq!(model.vtf_factor, 0.0);
        assert_eq!(model.ise, 0.0);
    }

    #[test]
    fn test_derived_model_coefficients() {
        let ckt = SimContext::default();
        let params = BjtModelParams {
            vaf: Some(50.0),
            var: Some(10.0),
            ikf: Some(0.01),
            rc: Some(20.0),
            re: Some(0.5),
            rb: Some(200.0),
            vtf: Some(2.0),
            tf: Some(1e-10),
            ptf: Some(30.0),
            c2: Some(100.0),
            c4: Some(10.0),
            ..Default::default()
        };
        let model = ResolvedModel::resolve("qmod", &params, &ckt);
        assert_eq!(model.inv_early_f, 1.0 / 50.0);
        assert_eq!(model.inv_early_r, 1.0 / 10.0);
        assert_eq!(model.inv_rolloff_f, 100.0);
        assert_eq!(model.collector_conduct, 1.0 / 20.0);
        assert_eq!(model.emitter_conduct, 2.0);
        assert_eq!(model.rbm, 200.0);
        assert!(rel_close(model.vtf_factor, 1.0 / 2.88, 1e-12));
        assert!(rel_close(model.excess_phase, PI / 6.0 * 1e-10, 1e-12));
        assert!(rel_close(model.ise, 1e-14, 1e-12));
        assert!(rel_close(model.isc, 1e-15, 1e-12));
        assert!(rel_close(model.f2, 0.5_f64.powf(1.33), 1e-12));
        assert!(rel_close(model.f3, 1.0 - 0.5 * 1.33, 1e-12));
    }

    #[test]
    fn test_fc_is_clamped() {
        let ckt = SimContext::default();
        let params = BjtModelParams {
            fc: Some(1.5),
            ..Default::default()
        };
        let model = ResolvedModel::resolve("qmod", &params, &ckt);
        assert_eq!(model.fc, FC_MAX);
        assert!(model.xfc.is_finite());
    }

    #[test]
    fn test_critical_voltage_uses_model_current() {
        let ckt = SimContext::default();
        let model = ResolvedModel::resolve("qmod", &BjtModelParams::default(), &ckt);
        let tp = TempParams::compute(&model, &instance(), &ckt);
        let vt = thermal_voltage(REFTEMP);
        assert!(rel_close(tp.vcrit, vt * (vt / (2f64.sqrt() * 1e-16)).ln(), 1e-12));
    }
}
