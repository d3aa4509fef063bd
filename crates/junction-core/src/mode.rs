//! Analysis and iteration-phase flags passed to device loads.

/// The analysis being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum Analysis {
    /// DC operating point.
    #[default]
    DcOp,
    /// DC transfer curve.
    DcSweep,
    /// Operating point preceding a transient run.
    TranOp,
    /// Transient time stepping.
    Tran,
    /// AC small-signal sweep.
    Ac,
}

/// Phase of the Newton iteration a load call belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitPhase {
    /// Ordinary iteration from the last solution.
    #[default]
    Float,
    /// First iteration of a time point, voltages extrapolated from history.
    Predict,
    /// Devices marked OFF are held off.
    Fix,
    /// First load of a transient run; charges are made continuous.
    Transient,
    /// Evaluate the operating point for small-signal analyses; no stamping.
    SmallSignal,
    /// First iteration of an operating point; junction voltages are guessed.
    Junction,
}

/// Mode word of a load call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mode {
    pub analysis: Analysis,
    pub init: InitPhase,
    /// Use initial conditions instead of solving for an operating point.
    pub uic: bool,
}

impl Mode {
    pub fn new(analysis: Analysis, init: InitPhase) -> Self {
        Self {
            analysis,
            init,
            uic: false,
        }
    }

    pub fn with_uic(mut self, uic: bool) -> Self {
        self.uic = uic;
        self
    }

    pub fn is_tran(&self) -> bool {
        self.analysis == Analysis::Tran
    }

    pub fn is_ac(&self) -> bool {
        self.analysis == Analysis::Ac
    }

    pub fn is_tran_op(&self) -> bool {
        self.analysis == Analysis::TranOp
    }

    /// Time stepping or frequency sweep, where charge dynamics matter.
    pub fn is_dynamic(&self) -> bool {
        self.is_tran() || self.is_ac()
    }
}
