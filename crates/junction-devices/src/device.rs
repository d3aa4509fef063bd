//! The interface between device models and the circuit solver.

use junction_core::{DistoMode, DistortionJob, SimContext};
use num_complex::Complex;

use crate::error::Result;

/// Snapshot operation requested by the solver around a rejected step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupMode {
    /// Copy the present instance state into the backing buffer.
    Save,
    /// Copy the backing buffer back into the instance.
    Restore,
    /// Release the backing buffer.
    Clear,
}

/// A device model together with all instances sharing its parameters.
///
/// Calls happen in this order: [`setup`](Device::setup) once per topology
/// change, [`temperature`](Device::temperature) once per analysis
/// temperature, then any number of load calls. Every load accumulates into
/// the shared matrix and right-hand side with `+=` only, so device order is
/// irrelevant.
pub trait Device: std::fmt::Debug {
    /// Model name.
    fn name(&self) -> &str;

    /// Create internal nodes, reserve state slots and resolve matrix entries.
    fn setup(&mut self, ckt: &mut SimContext) -> Result<()>;

    /// Undo [`setup`](Device::setup): remove internal nodes and forget handles.
    fn unsetup(&mut self, ckt: &mut SimContext) -> Result<()>;

    /// Resolve matrix entries again after the matrix was reallocated.
    fn resetup(&mut self, ckt: &mut SimContext) -> Result<()>;

    /// Resolve defaults and compute temperature-dependent parameters.
    fn temperature(&mut self, ckt: &SimContext) -> Result<()>;

    /// Take initial conditions not given by the user from the solution.
    fn getic(&mut self, ckt: &SimContext) -> Result<()>;

    /// Evaluate at the present solution and stamp the linearized model.
    fn load(&mut self, ckt: &mut SimContext) -> Result<()>;

    /// Check whether the linearization predicts the nonlinear currents.
    /// Stops at the first instance that misses tolerance.
    fn conv_test(&self, ckt: &mut SimContext) -> Result<()>;

    /// Stamp the small-signal admittance at `ckt.omega`.
    fn ac_load(&self, ckt: &mut SimContext) -> Result<()>;

    /// Stamp the small-signal admittance at complex frequency `s`.
    fn pz_load(&self, ckt: &mut SimContext, s: Complex<f64>) -> Result<()>;

    /// Compute Taylor coefficients at the present operating point.
    fn disto_setup(&mut self, ckt: &SimContext) -> Result<()>;

    /// Inject the distortion currents of one intermodulation product.
    fn disto_load(&self, mode: DistoMode, job: &DistortionJob, ckt: &mut SimContext)
    -> Result<()>;

    /// Save, restore or release per-instance snapshots.
    fn backup(&mut self, ckt: &mut SimContext, mode: BackupMode) -> Result<()>;
}
