//! BJT model and instance parameter tables.

use junction_core::{SimContext, mode::Analysis};

use super::{Bjt, BjtInstance, BjtType, slot};
use crate::error::{Error, Result};
use crate::junction::CELSIUS_TO_KELVIN;
use crate::param::{
    Access, ParamInfo, ParamKind, ParamTag, ParamValue, find_by_name, find_by_tag,
};

/// Gummel-Poon model card. `None` means "not given": the default (or a
/// value derived from other parameters) is used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BjtModelParams {
    pub bjt_type: BjtType,
    /// Transport saturation current (A).
    pub is: Option<f64>,
    /// Ideal maximum forward beta.
    pub bf: Option<f64>,
    /// Forward emission coefficient.
    pub nf: Option<f64>,
    /// Forward Early voltage (V).
    pub vaf: Option<f64>,
    /// Forward beta roll-off corner current (A).
    pub ikf: Option<f64>,
    /// B-E leakage saturation current (A).
    pub ise: Option<f64>,
    /// B-E leakage as a multiple of `is`.
    pub c2: Option<f64>,
    /// B-E leakage emission coefficient.
    pub ne: Option<f64>,
    /// Ideal maximum reverse beta.
    pub br: Option<f64>,
    /// Reverse emission coefficient.
    pub nr: Option<f64>,
    /// Reverse Early voltage (V).
    pub var: Option<f64>,
    /// Reverse beta roll-off corner current (A).
    pub ikr: Option<f64>,
    /// B-C leakage saturation current (A).
    pub isc: Option<f64>,
    /// B-C leakage as a multiple of `is`.
    pub c4: Option<f64>,
    /// B-C leakage emission coefficient.
    pub nc: Option<f64>,
    /// Zero-bias base resistance (ohm).
    pub rb: Option<f64>,
    /// Current where base resistance falls halfway (A).
    pub irb: Option<f64>,
    /// Minimum base resistance (ohm).
    pub rbm: Option<f64>,
    /// Emitter resistance (ohm).
    pub re: Option<f64>,
    /// Collector resistance (ohm).
    pub rc: Option<f64>,
    /// Zero-bias B-E depletion capacitance (F).
    pub cje: Option<f64>,
    /// B-E built-in potential (V).
    pub vje: Option<f64>,
    /// B-E junction grading coefficient.
    pub mje: Option<f64>,
    /// Ideal forward transit time (s).
    pub tf: Option<f64>,
    /// Transit-time bias dependence coefficient.
    pub xtf: Option<f64>,
    /// Transit-time dependency on Vbc (V).
    pub vtf: Option<f64>,
    /// Transit-time dependency on Ic (A).
    pub itf: Option<f64>,
    /// Excess phase at 1/(2 pi tf) Hz (degrees).
    pub ptf: Option<f64>,
    /// Zero-bias B-C depletion capacitance (F).
    pub cjc: Option<f64>,
    /// B-C built-in potential (V).
    pub vjc: Option<f64>,
    /// B-C junction grading coefficient.
    pub mjc: Option<f64>,
    /// Fraction of B-C capacitance tied to the internal base.
    pub xcjc: Option<f64>,
    /// Ideal reverse transit time (s).
    pub tr: Option<f64>,
    /// Zero-bias collector-substrate capacitance (F).
    pub cjs: Option<f64>,
    /// Substrate junction built-in potential (V).
    pub vjs: Option<f64>,
    /// Substrate junction grading coefficient.
    pub mjs: Option<f64>,
    /// Forward and reverse beta temperature exponent.
    pub xtb: Option<f64>,
    /// Energy gap for the `is` temperature dependence (eV).
    pub eg: Option<f64>,
    /// Temperature exponent of `is`.
    pub xti: Option<f64>,
    /// Forward-bias depletion capacitance coefficient.
    pub fc: Option<f64>,
    /// Parameter measurement temperature (K).
    pub tnom: Option<f64>,
}

/// Model parameter identifiers. Discriminants are the numeric tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ModelParam {
    Npn = 101,
    Pnp,
    Is,
    Bf,
    Nf,
    Vaf,
    Ikf,
    Ise,
    C2,
    Ne,
    Br,
    Nr,
    Var,
    Ikr,
    Isc,
    C4,
    Nc,
    Rb,
    Irb,
    Rbm,
    Re,
    Rc,
    Cje,
    Vje,
    Mje,
    Tf,
    Xtf,
    Vtf,
    Itf,
    Ptf,
    Cjc,
    Vjc,
    Mjc,
    Xcjc,
    Tr,
    Cjs,
    Vjs,
    Mjs,
    Xtb,
    Eg,
    Xti,
    Fc,
    Tnom,
    Type = 301,
    InvEarlyVoltF,
    InvEarlyVoltR,
    InvRollOffF,
    InvRollOffR,
    CollectorConduct,
    EmitterConduct,
    TransitTimeVbcFactor,
    ExcessPhaseFactor,
}

impl ParamTag for ModelParam {
    fn tag(self) -> u32 {
        self as u32
    }
}

/// Instance parameter identifiers. Discriminants are the numeric tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum InstanceParam {
    Area = 1,
    Off,
    IcVbe,
    IcVce,
    Ic,
    Temp,
    ColNode = 201,
    BaseNode,
    EmitNode,
    SubstNode,
    ColPrimeNode,
    BasePrimeNode,
    EmitPrimeNode,
    Vbe = 211,
    Vbc,
    Cc,
    Cb,
    Ce,
    Cs,
    Power,
    Gpi,
    Gmu,
    Gm,
    Go,
    Gx,
    Qbe,
    Cqbe,
    Qbc,
    Cqbc,
    Qcs,
    Cqcs,
    Qbx,
    Cqbx,
    Cexbc,
    Geqcb,
    Gccs,
    Geqbx,
}

impl ParamTag for InstanceParam {
    fn tag(self) -> u32 {
        self as u32
    }
}

use Access::{Ask, Set, SetAsk};
use ParamKind::{Flag, Int, Node, Real, RealVec};

const fn m(
    name: &'static str,
    param: ModelParam,
    kind: ParamKind,
    access: Access,
    description: &'static str,
) -> ParamInfo<ModelParam> {
    ParamInfo::new(name, param, kind, access, description)
}

const fn i(
    name: &'static str,
    param: InstanceParam,
    kind: ParamKind,
    access: Access,
    description: &'static str,
) -> ParamInfo<InstanceParam> {
    ParamInfo::new(name, param, kind, access, description)
}

pub const MODEL_PARAMS: &[ParamInfo<ModelParam>] = &[
    m("npn", ModelParam::Npn, Flag, Set, "NPN type device"),
    m("pnp", ModelParam::Pnp, Flag, Set, "PNP type device"),
    m("is", ModelParam::Is, Real, SetAsk, "Saturation Current"),
    m("bf", ModelParam::Bf, Real, SetAsk, "Ideal forward beta"),
    m("nf", ModelParam::Nf, Real, SetAsk, "Forward emission coefficient"),
    m("vaf", ModelParam::Vaf, Real, SetAsk, "Forward Early voltage"),
    m("va", ModelParam::Vaf, Real, SetAsk, "Forward Early voltage"),
    m("ikf", ModelParam::Ikf, Real, SetAsk, "Forward beta roll-off corner current"),
    m("ik", ModelParam::Ikf, Real, SetAsk, "Forward beta roll-off corner current"),
    m("ise", ModelParam::Ise, Real, SetAsk, "B-E leakage saturation current"),
    m("c2", ModelParam::C2, Real, SetAsk, "Obsolete parameter name"),
    m("ne", ModelParam::Ne, Real, SetAsk, "B-E leakage emission coefficient"),
    m("br", ModelParam::Br, Real, SetAsk, "Ideal reverse beta"),
    m("nr", ModelParam::Nr, Real, SetAsk, "Reverse emission coefficient"),
    m("var", ModelParam::Var, Real, SetAsk, "Reverse Early voltage"),
    m("vb", ModelParam::Var, Real, SetAsk, "Reverse Early voltage"),
    m("ikr", ModelParam::Ikr, Real, SetAsk, "reverse beta roll-off corner current"),
    m("isc", ModelParam::Isc, Real, SetAsk, "B-C leakage saturation current"),
    m("c4", ModelParam::C4, Real, SetAsk, "Obsolete parameter name"),
    m("nc", ModelParam::Nc, Real, SetAsk, "B-C leakage emission coefficient"),
    m("rb", ModelParam::Rb, Real, SetAsk, "Zero bias base resistance"),
    m("irb", ModelParam::Irb, Real, SetAsk, "Current for base resistance=(rb+rbm)/2"),
    m("rbm", ModelParam::Rbm, Real, SetAsk, "Minimum base resistance"),
    m("re", ModelParam::Re, Real, SetAsk, "Emitter resistance"),
    m("rc", ModelParam::Rc, Real, SetAsk, "Collector resistance"),
    m("cje", ModelParam::Cje, Real, SetAsk, "Zero bias B-E depletion capacitance"),
    m("vje", ModelParam::Vje, Real, SetAsk, "B-E built in potential"),
    m("pe", ModelParam::Vje, Real, SetAsk, "B-E built in potential"),
    m("mje", ModelParam::Mje, Real, SetAsk, "B-E junction grading coefficient"),
    m("me", ModelParam::Mje, Real, SetAsk, "B-E junction grading coefficient"),
    m("tf", ModelParam::Tf, Real, SetAsk, "Ideal forward transit time"),
    m("xtf", ModelParam::Xtf, Real, SetAsk, "Coefficient for bias dependence of TF"),
    m("vtf", ModelParam::Vtf, Real, SetAsk, "Voltage giving VBC dependence of TF"),
    m("itf", ModelParam::Itf, Real, SetAsk, "High current dependence of TF"),
    m("ptf", ModelParam::Ptf, Real, SetAsk, "Excess phase"),
    m("cjc", ModelParam::Cjc, Real, SetAsk, "Zero bias B-C depletion capacitance"),
    m("vjc", ModelParam::Vjc, Real, SetAsk, "B-C built in potential"),
    m("pc", ModelParam::Vjc, Real, SetAsk, "B-C built in potential"),
    m("mjc", ModelParam::Mjc, Real, SetAsk, "B-C junction grading coefficient"),
    m("mc", ModelParam::Mjc, Real, SetAsk, "B-C junction grading coefficient"),
    m("xcjc", ModelParam::Xcjc, Real, SetAsk, "Fraction of B-C cap to internal base"),
    m("tr", ModelParam::Tr, Real, SetAsk, "Ideal reverse transit time"),
    m("cjs", ModelParam::Cjs, Real, SetAsk, "Zero bias C-S capacitance"),
    m("ccs", ModelParam::Cjs, Real, SetAsk, "Zero bias C-S capacitance"),
    m("vjs", ModelParam::Vjs, Real, SetAsk, "Substrate junction built in potential"),
    m("ps", ModelParam::Vjs, Real, SetAsk, "Substrate junction built in potential"),
    m("mjs", ModelParam::Mjs, Real, SetAsk, "Substrate junction grading coefficient"),
    m("ms", ModelParam::Mjs, Real, SetAsk, "Substrate junction grading coefficient"),
    m("xtb", ModelParam::Xtb, Real, SetAsk, "Forward and reverse beta temp. exp."),
    m("eg", ModelParam::Eg, Real, SetAsk, "Energy gap for IS temp. dependency"),
    m("xti", ModelParam::Xti, Real, SetAsk, "Temp. exponent for IS"),
    m("fc", ModelParam::Fc, Real, SetAsk, "Forward bias junction fit parameter"),
    m("tnom", ModelParam::Tnom, Real, SetAsk, "Parameter measurement temperature (C)"),
    m("type", ModelParam::Type, Int, Ask, "NPN or PNP"),
    m("invearlyvoltf", ModelParam::InvEarlyVoltF, Real, Ask, "Inverse early voltage:forward"),
    m("invearlyvoltr", ModelParam::InvEarlyVoltR, Real, Ask, "Inverse early voltage:reverse"),
    m("invrollofff", ModelParam::InvRollOffF, Real, Ask, "Inverse roll off - forward"),
    m("invrolloffr", ModelParam::InvRollOffR, Real, Ask, "Inverse roll off - reverse"),
    m("collectorconduct", ModelParam::CollectorConduct, Real, Ask, "Collector conductance"),
    m("emitterconduct", ModelParam::EmitterConduct, Real, Ask, "Emitter conductance"),
    m("transtimevbcfact", ModelParam::TransitTimeVbcFactor, Real, Ask, "Transit time VBC factor"),
    m("excessphasefactor", ModelParam::ExcessPhaseFactor, Real, Ask, "Excess phase fact."),
];

pub const INSTANCE_PARAMS: &[ParamInfo<InstanceParam>] = &[
    i("area", InstanceParam::Area, Real, SetAsk, "Area factor"),
    i("off", InstanceParam::Off, Flag, SetAsk, "Device initially off"),
    i("icvbe", InstanceParam::IcVbe, Real, SetAsk, "Initial B-E voltage"),
    i("icvce", InstanceParam::IcVce, Real, SetAsk, "Initial C-E voltage"),
    i("ic", InstanceParam::Ic, RealVec, Set, "Initial condition vector"),
    i("temp", InstanceParam::Temp, Real, SetAsk, "instance temperature"),
    i("colnode", InstanceParam::ColNode, Node, Ask, "Number of collector node"),
    i("basenode", InstanceParam::BaseNode, Node, Ask, "Number of base node"),
    i("emitnode", InstanceParam::EmitNode, Node, Ask, "Number of emitter node"),
    i("substnode", InstanceParam::SubstNode, Node, Ask, "Number of substrate node"),
    i("colprimenode", InstanceParam::ColPrimeNode, Node, Ask, "Internal collector node"),
    i("baseprimenode", InstanceParam::BasePrimeNode, Node, Ask, "Internal base node"),
    i("emitprimenode", InstanceParam::EmitPrimeNode, Node, Ask, "Internal emitter node"),
    i("vbe", InstanceParam::Vbe, Real, Ask, "B-E voltage"),
    i("vbc", InstanceParam::Vbc, Real, Ask, "B-C voltage"),
    i("cc", InstanceParam::Cc, Real, Ask, "Current at collector node"),
    i("cb", InstanceParam::Cb, Real, Ask, "Current at base node"),
    i("ce", InstanceParam::Ce, Real, Ask, "Emitter current"),
    i("cs", InstanceParam::Cs, Real, Ask, "Substrate current"),
    i("p", InstanceParam::Power, Real, Ask, "Power dissipation"),
    i("gpi", InstanceParam::Gpi, Real, Ask, "Small signal input conductance - pi"),
    i("gmu", InstanceParam::Gmu, Real, Ask, "Small signal conductance - mu"),
    i("gm", InstanceParam::Gm, Real, Ask, "Small signal transconductance"),
    i("go", InstanceParam::Go, Real, Ask, "Small signal output conductance"),
    i("gx", InstanceParam::Gx, Real, Ask, "Conductance from base to internal base"),
    i("qbe", InstanceParam::Qbe, Real, Ask, "Charge storage B-E junction"),
    i("cqbe", InstanceParam::Cqbe, Real, Ask, "Cap. due to charge storage in B-E jct."),
    i("qbc", InstanceParam::Qbc, Real, Ask, "Charge storage B-C junction"),
    i("cqbc", InstanceParam::Cqbc, Real, Ask, "Cap. due to charge storage in B-C jct."),
    i("qcs", InstanceParam::Qcs, Real, Ask, "Charge storage C-S junction"),
    i("cqcs", InstanceParam::Cqcs, Real, Ask, "Cap. due to charge storage in C-S jct."),
    i("qbx", InstanceParam::Qbx, Real, Ask, "Charge storage B-X junction"),
    i("cqbx", InstanceParam::Cqbx, Real, Ask, "Cap. due to charge storage in B-X jct."),
    i("cexbc", InstanceParam::Cexbc, Real, Ask, "Total Capacitance in B-X junction"),
    i("geqcb", InstanceParam::Geqcb, Real, Ask, "d(Ibe)/d(Vbc)"),
    i("gccs", InstanceParam::Gccs, Real, Ask, "Internal C-S cap. equiv. cond."),
    i("geqbx", InstanceParam::Geqbx, Real, Ask, "Internal C-B-base cap. equiv. cond."),
];

impl BjtModelParams {
    fn field(&self, param: ModelParam) -> Option<&Option<f64>> {
        let p = self;
        let field = match param {
            ModelParam::Is => &p.is,
            ModelParam::Bf => &p.bf,
            ModelParam::Nf => &p.nf,
            ModelParam::Vaf => &p.vaf,
            ModelParam::Ikf => &p.ikf,
            ModelParam::Ise => &p.ise,
            ModelParam::C2 => &p.c2,
            ModelParam::Ne => &p.ne,
            ModelParam::Br => &p.br,
            ModelParam::Nr => &p.nr,
            ModelParam::Var => &p.var,
            ModelParam::Ikr => &p.ikr,
            ModelParam::Isc => &p.isc,
            ModelParam::C4 => &p.c4,
            ModelParam::Nc => &p.nc,
            ModelParam::Rb => &p.rb,
            ModelParam::Irb => &p.irb,
            ModelParam::Rbm => &p.rbm,
            ModelParam::Re => &p.re,
            ModelParam::Rc => &p.rc,
            ModelParam::Cje => &p.cje,
            ModelParam::Vje => &p.vje,
            ModelParam::Mje => &p.mje,
            ModelParam::Tf => &p.tf,
            ModelParam::Xtf => &p.xtf,
            ModelParam::Vtf => &p.vtf,
            ModelParam::Itf => &p.itf,
            ModelParam::Ptf => &p.ptf,
            ModelParam::Cjc => &p.cjc,
            ModelParam::Vjc => &p.vjc,
            ModelParam::Mjc => &p.mjc,
            ModelParam::Xcjc => &p.xcjc,
            ModelParam::Tr => &p.tr,
            ModelParam::Cjs => &p.cjs,
            ModelParam::Vjs => &p.vjs,
            ModelParam::Mjs => &p.mjs,
            ModelParam::Xtb => &p.xtb,
            ModelParam::Eg => &p.eg,
            ModelParam::Xti => &p.xti,
            ModelParam::Fc => &p.fc,
            ModelParam::Tnom => &p.tnom,
            _ => return None,
        };
        Some(field)
    }

    fn field_mut(&mut self, param: ModelParam) -> Option<&mut Option<f64>> {
        let p = self;
        let field = match param {
            ModelParam::Is => &mut p.is,
            ModelParam::Bf => &mut p.bf,
            ModelParam::Nf => &mut p.nf,
            ModelParam::Vaf => &mut p.vaf,
            ModelParam::Ikf => &mut p.ikf,
            ModelParam::Ise => &mut p.ise,
            ModelParam::C2 => &mut p.c2,
            ModelParam::Ne => &mut p.ne,
            ModelParam::Br => &mut p.br,
            ModelParam::Nr => &mut p.nr,
            ModelParam::Var => &mut p.var,
            ModelParam::Ikr => &mut p.ikr,
            ModelParam::Isc => &mut p.isc,
            ModelParam::C4 => &mut p.c4,
            ModelParam::Nc => &mut p.nc,
            ModelParam::Rb => &mut p.rb,
            ModelParam::Irb => &mut p.irb,
            ModelParam::Rbm => &mut p.rbm,
            ModelParam::Re => &mut p.re,
            ModelParam::Rc => &mut p.rc,
            ModelParam::Cje => &mut p.cje,
            ModelParam::Vje => &mut p.vje,
            ModelParam::Mje => &mut p.mje,
            ModelParam::Tf => &mut p.tf,
            ModelParam::Xtf => &mut p.xtf,
            ModelParam::Vtf => &mut p.vtf,
            ModelParam::Itf => &mut p.itf,
            ModelParam::Ptf => &mut p.ptf,
            ModelParam::Cjc => &mut p.cjc,
            ModelParam::Vjc => &mut p.vjc,
            ModelParam::Mjc => &mut p.mjc,
            ModelParam::Xcjc => &mut p.xcjc,
            ModelParam::Tr => &mut p.tr,
            ModelParam::Cjs => &mut p.cjs,
            ModelParam::Vjs => &mut p.vjs,
            ModelParam::Mjs => &mut p.mjs,
            ModelParam::Xtb => &mut p.xtb,
            ModelParam::Eg => &mut p.eg,
            ModelParam::Xti => &mut p.xti,
            ModelParam::Fc => &mut p.fc,
            ModelParam::Tnom => &mut p.tnom,
            _ => return None,
        };
        Some(field)
    }

    /// Default used when a plain parameter is not given.
    pub fn default_value(param: ModelParam) -> f64 {
        match param {
            ModelParam::Is => 1e-16,
            ModelParam::Bf => 100.0,
            ModelParam::Nf | ModelParam::Br | ModelParam::Nr | ModelParam::Xcjc => 1.0,
            ModelParam::Ne => 1.5,
            ModelParam::Nc => 2.0,
            ModelParam::Vje | ModelParam::Vjc | ModelParam::Vjs => 0.75,
            ModelParam::Mje | ModelParam::Mjc => 0.33,
            ModelParam::Eg => 1.11,
            ModelParam::Xti => 3.0,
            ModelParam::Fc => 0.5,
            _ => 0.0,
        }
    }

    /// Given value of `param`, or its default.
    pub fn value(&self, param: ModelParam) -> f64 {
        self.field(param)
            .copied()
            .flatten()
            .unwrap_or_else(|| Self::default_value(param))
    }

    /// Value in effect after cross-parameter defaults: `ise`/`isc` derived
    /// from `c2`/`c4` and `rbm` following `rb`.
    pub fn effective(&self, param: ModelParam) -> f64 {
        match param {
            ModelParam::Ise => self
                .ise
                .or(self.c2.map(|c2| c2 * self.value(ModelParam::Is)))
                .unwrap_or(0.0),
            ModelParam::Isc => self
                .isc
                .or(self.c4.map(|c4| c4 * self.value(ModelParam::Is)))
                .unwrap_or(0.0),
            ModelParam::Rbm => self.rbm.unwrap_or_else(|| self.value(ModelParam::Rb)),
            param => self.value(param),
        }
    }

    /// Whether `param` was given explicitly.
    pub fn is_given(&self, param: ModelParam) -> bool {
        matches!(self.field(param), Some(Some(_)))
    }

    pub fn set(&mut self, param: ModelParam, value: &ParamValue) -> Result<()> {
        let info = model_info(param);
        if !info.access.can_set() {
            return Err(Error::ReadOnlyParameter(info.name));
        }
        match param {
            ModelParam::Npn => {
                if value.as_flag(info.name)? {
                    self.bjt_type = BjtType::Npn;
                }
            }
            ModelParam::Pnp => {
                if value.as_flag(info.name)? {
                    self.bjt_type = BjtType::Pnp;
                }
            }
            ModelParam::Tnom => {
                self.tnom = Some(value.as_real(info.name)? + CELSIUS_TO_KELVIN);
            }
            _ => {
                let v = value.as_real(info.name)?;
                if let Some(field) = self.field_mut(param) {
                    *field = Some(v);
                }
            }
        }
        Ok(())
    }
}

fn model_info(param: ModelParam) -> &'static ParamInfo<ModelParam> {
    // Every variant has a row; fall back to the first row only to keep the lookup total.
    MODEL_PARAMS
        .iter()
        .find(|info| info.param == param)
        .unwrap_or(&MODEL_PARAMS[0])
}

fn instance_info(param: InstanceParam) -> &'static ParamInfo<InstanceParam> {
    INSTANCE_PARAMS
        .iter()
        .find(|info| info.param == param)
        .unwrap_or(&INSTANCE_PARAMS[0])
}

impl Bjt {
    /// Set a model parameter by numeric tag. Invalidates temperature-adjusted values.
    pub fn set_model_param(&mut self, tag: u32, value: &ParamValue) -> Result<()> {
        let param = find_by_tag(MODEL_PARAMS, tag)?.param;
        self.params.set(param, value)?;
        self.model = None;
        Ok(())
    }

    /// Set a model parameter by name.
    pub fn set_model_param_by_name(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        let tag = find_by_name(MODEL_PARAMS, name)?.param.tag();
        self.set_model_param(tag, value)
    }

    /// Read a model parameter by numeric tag.
    ///
    /// Derived quantities need a prior temperature update.
    pub fn ask_model_param(&self, tag: u32) -> Result<ParamValue> {
        let info = find_by_tag(MODEL_PARAMS, tag)?;
        if !info.access.can_ask() {
            return Err(Error::BadParameter { tag });
        }
        let resolved = || {
            self.model
                .as_ref()
                .ok_or_else(|| Error::NotTemperatureUpdated(self.name.clone()))
        };
        let value = match info.param {
            ModelParam::Type => ParamValue::Int(self.params.bjt_type.sign() as i64),
            ModelParam::InvEarlyVoltF => ParamValue::Real(resolved()?.inv_early_f),
            ModelParam::InvEarlyVoltR => ParamValue::Real(resolved()?.inv_early_r),
            ModelParam::InvRollOffF => ParamValue::Real(resolved()?.inv_rolloff_f),
            ModelParam::InvRollOffR => ParamValue::Real(resolved()?.inv_rolloff_r),
            ModelParam::CollectorConduct => ParamValue::Real(resolved()?.collector_conduct),
            ModelParam::EmitterConduct => ParamValue::Real(resolved()?.emitter_conduct),
            ModelParam::TransitTimeVbcFactor => ParamValue::Real(resolved()?.vtf_factor),
            ModelParam::ExcessPhaseFactor => ParamValue::Real(resolved()?.excess_phase),
            ModelParam::Tnom => {
                let tnom = match self.params.tnom {
                    Some(tnom) => tnom,
                    None => resolved()?.tnom,
                };
                ParamValue::Real(tnom - CELSIUS_TO_KELVIN)
            }
            param => ParamValue::Real(self.params.effective(param)),
        };
        Ok(value)
    }

    pub fn ask_model_param_by_name(&self, name: &str) -> Result<ParamValue> {
        self.ask_model_param(find_by_name(MODEL_PARAMS, name)?.param.tag())
    }

    /// Set an instance parameter by numeric tag.
    pub fn set_instance_param(&mut self, index: usize, tag: u32, value: &ParamValue) -> Result<()> {
        let param = find_by_tag(INSTANCE_PARAMS, tag)?.param;
        let inst = self
            .instances
            .get_mut(index)
            .ok_or(Error::BadParameter { tag })?;
        inst.set_param(param, value)
    }

    /// Read an instance parameter by numeric tag.
    pub fn ask_instance_param(&self, index: usize, tag: u32, ckt: &SimContext) -> Result<ParamValue> {
        let param = find_by_tag(INSTANCE_PARAMS, tag)?.param;
        let inst = self
            .instances
            .get(index)
            .ok_or(Error::BadParameter { tag })?;
        inst.ask_param(param, self.params.bjt_type, ckt)
    }
}

impl BjtInstance {
    pub fn set_param(&mut self, param: InstanceParam, value: &ParamValue) -> Result<()> {
        let info = instance_info(param);
        if !info.access.can_set() {
            return Err(Error::ReadOnlyParameter(info.name));
        }
        match param {
            InstanceParam::Area => self.area = value.as_real(info.name)?,
            InstanceParam::Off => self.off = value.as_flag(info.name)?,
            InstanceParam::IcVbe => self.ic.vbe = Some(value.as_real(info.name)?),
            InstanceParam::IcVce => self.ic.vce = Some(value.as_real(info.name)?),
            InstanceParam::Ic => match *value.as_vec(info.name)? {
                [vbe] => self.ic.vbe = Some(vbe),
                [vbe, vce] => {
                    self.ic.vbe = Some(vbe);
                    self.ic.vce = Some(vce);
                }
                _ => {
                    return Err(Error::InvalidValue {
                        name: info.name,
                        value: format!("{value:?}"),
                    });
                }
            },
            InstanceParam::Temp => self.temp = Some(value.as_real(info.name)? + CELSIUS_TO_KELVIN),
            _ => return Err(Error::ReadOnlyParameter(info.name)),
        }
        Ok(())
    }

    pub fn ask_param(
        &self,
        param: InstanceParam,
        bjt_type: BjtType,
        ckt: &SimContext,
    ) -> Result<ParamValue> {
        let nodes = &self.nodes;
        let value = match param {
            InstanceParam::Area => ParamValue::Real(self.area),
            InstanceParam::Off => ParamValue::Flag(self.off),
            InstanceParam::IcVbe => ParamValue::Real(self.ic_vbe()),
            InstanceParam::IcVce => ParamValue::Real(self.ic_vce()),
            InstanceParam::Temp => {
                let temp = self
                    .tp
                    .as_ref()
                    .map(|tp| tp.temp)
                    .or(self.temp)
                    .unwrap_or(ckt.temp);
                ParamValue::Real(temp - CELSIUS_TO_KELVIN)
            }
            InstanceParam::ColNode => ParamValue::Node(nodes.collector),
            InstanceParam::BaseNode => ParamValue::Node(nodes.base),
            InstanceParam::EmitNode => ParamValue::Node(nodes.emitter),
            InstanceParam::SubstNode => ParamValue::Node(nodes.substrate),
            InstanceParam::ColPrimeNode => ParamValue::Node(nodes.col_prime),
            InstanceParam::BasePrimeNode => ParamValue::Node(nodes.base_prime),
            InstanceParam::EmitPrimeNode => ParamValue::Node(nodes.emit_prime),
            InstanceParam::Ic => {
                return Err(Error::BadParameter {
                    tag: param.tag(),
                });
            }
            op => {
                let base = self
                    .state
                    .ok_or_else(|| Error::NotSetUp(self.name.clone()))?;
                let s0 = |offset: usize| ckt.states.s0[base + offset];
                let tran = ckt.mode.analysis == Analysis::Tran;
                let v = match op {
                    InstanceParam::Vbe => s0(slot::VBE),
                    InstanceParam::Vbc => s0(slot::VBC),
                    InstanceParam::Cc => s0(slot::CC),
                    InstanceParam::Cb => s0(slot::CB),
                    InstanceParam::Ce => -s0(slot::CC) - s0(slot::CB),
                    InstanceParam::Cs => {
                        if tran {
                            -s0(slot::CQCS)
                        } else {
                            0.0
                        }
                    }
                    InstanceParam::Power => {
                        let (cc, cb) = (s0(slot::CC), s0(slot::CB));
                        bjt_type.sign()
                            * (cc * ckt.voltage(nodes.collector) + cb * ckt.voltage(nodes.base)
                                - (cc + cb) * ckt.voltage(nodes.emitter))
                    }
                    InstanceParam::Gpi => s0(slot::GPI),
                    InstanceParam::Gmu => s0(slot::GMU),
                    InstanceParam::Gm => s0(slot::GM),
                    InstanceParam::Go => s0(slot::GO),
                    InstanceParam::Gx => s0(slot::GX),
                    InstanceParam::Qbe => s0(slot::QBE),
                    InstanceParam::Cqbe => s0(slot::CQBE),
                    InstanceParam::Qbc => s0(slot::QBC),
                    InstanceParam::Cqbc => s0(slot::CQBC),
                    InstanceParam::Qcs => s0(slot::QCS),
                    InstanceParam::Cqcs => s0(slot::CQCS),
                    InstanceParam::Qbx => s0(slot::QBX),
                    InstanceParam::Cqbx => s0(slot::CQBX),
                    InstanceParam::Cexbc => s0(slot::CEXBC),
                    InstanceParam::Geqcb => s0(slot::GEQCB),
                    InstanceParam::Gccs => s0(slot::GCCS),
                    InstanceParam::Geqbx => s0(slot::GEQBX),
                    _ => return Err(Error::BadParameter { tag: op.tag() }),
                };
                ParamValue::Real(v)
            }
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::Device;
    use junction_core::NodeId;

    fn group() -> Bjt {
        let mut q = Bjt::new("qmod", BjtModelParams::default());
        q.add_instance(BjtInstance::new(
            "Q1",
            NodeId::new(1),
            NodeId::new(2),
            NodeId::new(3),
            NodeId::GROUND,
        ));
        q
    }

    #[test]
    fn test_tags_are_unique_per_parameter() {
        for (a, info_a) in MODEL_PARAMS.iter().enumerate() {
            for info_b in &MODEL_PARAMS[a + 1..] {
                assert!(
                    !info_a.name.eq_ignore_ascii_case(info_b.name),
                    "duplicate name {}",
                    info_a.name
                );
            }
        }
        assert_eq!(find_by_tag(MODEL_PARAMS, 103).unwrap().name, "is");
        assert_eq!(find_by_tag(INSTANCE_PARAMS, 1).unwrap().name, "area");
    }

    #[test]
    fn test_set_and_ask_by_name() {
        let mut q = group();
        q.set_model_param_by_name("BF", &ParamValue::Real(250.0)).unwrap();
        q.set_model_param_by_name("va", &ParamValue::Real(50.0)).unwrap();
        assert_eq!(q.params().bf, Some(250.0));
        assert_eq!(q.params().vaf, Some(50.0));
        assert_eq!(
            q.ask_model_param_by_name("vaf").unwrap(),
            ParamValue::Real(50.0)
        );
        assert_eq!(
            q.ask_model_param_by_name("nc").unwrap(),
            ParamValue::Real(2.0)
        );
    }

    #[test]
    fn test_polarity_flags() {
        let mut q = group();
        q.set_model_param_by_name("pnp", &ParamValue::Flag(true)).unwrap();
        assert_eq!(q.ask_model_param(ModelParam::Type as u32).unwrap(), ParamValue::Int(-1));
    }

    #[test]
    fn test_unknown_tag_is_bad_parameter() {
        let mut q = group();
        assert!(matches!(
            q.set_model_param(9999, &ParamValue::Real(1.0)),
            Err(Error::BadParameter { tag: 9999 })
        ));
        assert!(matches!(
            q.ask_model_param(12),
            Err(Error::BadParameter { tag: 12 })
        ));
        let ckt = SimContext::default();
        assert!(matches!(
            q.ask_instance_param(0, 4242, &ckt),
            Err(Error::BadParameter { tag: 4242 })
        ));
        assert!(matches!(
            q.set_model_param_by_name("bogus", &ParamValue::Real(1.0)),
            Err(Error::UnknownParameter(_))
        ));
    }

    #[test]
    fn test_read_only_parameters() {
        let mut q = group();
        assert!(matches!(
            q.set_model_param(ModelParam::InvEarlyVoltF as u32, &ParamValue::Real(1.0)),
            Err(Error::ReadOnlyParameter("invearlyvoltf"))
        ));
        assert!(matches!(
            q.set_instance_param(0, InstanceParam::Gm as u32, &ParamValue::Real(1.0)),
            Err(Error::ReadOnlyParameter("gm"))
        ));
    }

    #[test]
    fn test_derived_values_need_temperature_update() {
        let q = group();
        assert!(matches!(
            q.ask_model_param(ModelParam::InvEarlyVoltF as u32),
            Err(Error::NotTemperatureUpdated(_))
        ));
    }

    #[test]
    fn test_instance_initial_conditions() {
        let mut q = group();
        q.set_instance_param(0, InstanceParam::Ic as u32, &ParamValue::RealVec(vec![0.7, 3.0]))
            .unwrap();
        assert_eq!(q.instances[0].ic.vbe, Some(0.7));
        assert_eq!(q.instances[0].ic.vce, Some(3.0));
        assert!(q
            .set_instance_param(0, InstanceParam::Ic as u32, &ParamValue::RealVec(vec![]))
            .is_err());

        q.set_instance_param(0, InstanceParam::Temp as u32, &ParamValue::Real(50.0))
            .unwrap();
        let ckt = SimContext::default();
        match q.ask_instance_param(0, InstanceParam::Temp as u32, &ckt).unwrap() {
            ParamValue::Real(t) => assert!((t - 50.0).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_nominal_temperature_is_in_celsius() {
        let mut q = group();
        let ckt = SimContext::default();
        q.temperature(&ckt).unwrap();
        let reference = q.instances[0].temp_params().unwrap().sat_cur;
        match q.ask_model_param_by_name("tnom").unwrap() {
            ParamValue::Real(t) => assert!((t - 27.0).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }

        q.set_model_param_by_name("tnom", &ParamValue::Real(27.0)).unwrap();
        assert!((q.params().tnom.unwrap() - 300.15).abs() < 1e-9);
        q.temperature(&ckt).unwrap();
        let sat_cur = q.instances[0].temp_params().unwrap().sat_cur;
        assert!((sat_cur - reference).abs() <= 1e-12 * reference);
        match q.ask_model_param_by_name("tnom").unwrap() {
            ParamValue::Real(t) => assert!((t - 27.0).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_nominal_temperature_needs_update_when_not_given() {
        let q = group();
        assert!(matches!(
            q.ask_model_param_by_name("tnom"),
            Err(Error::NotTemperatureUpdated(_))
        ));
    }

    #[test]
    fn test_derived_defaults_are_reported() {
        let mut q = group();
        q.set_model_param_by_name("is", &ParamValue::Real(1e-15)).unwrap();
        q.set_model_param_by_name("c2", &ParamValue::Real(50.0)).unwrap();
        q.set_model_param_by_name("c4", &ParamValue::Real(5.0)).unwrap();
        q.set_model_param_by_name("rb", &ParamValue::Real(120.0)).unwrap();
        let real = |name: &str| match q.ask_model_param_by_name(name).unwrap() {
            ParamValue::Real(v) => v,
            other => panic!("unexpected {other:?}"),
        };
        assert!((real("ise") - 5e-14).abs() < 1e-27);
        assert!((real("isc") - 5e-15).abs() < 1e-28);
        assert_eq!(real("rbm"), 120.0);
        assert_eq!(real("ikf"), 0.0);
    }

    #[test]
    fn test_operating_point_needs_setup() {
        let q = group();
        let ckt = SimContext::default();
        assert!(matches!(
            q.ask_instance_param(0, InstanceParam::Gm as u32, &ckt),
            Err(Error::NotSetUp(_))
        ));
    }
}
