//! The circuit-wide context a device load runs against.

use nalgebra::DVector;
use num_complex::Complex;

use crate::error::Result;
use crate::integrate::Integrator;
use crate::matrix::SparseMatrix;
use crate::mode::Mode;
use crate::node::NodeId;
use crate::node_table::NodeTable;
use crate::options::{SimOptions, Tolerances};
use crate::state::StateVectors;

/// Shared solver state for one circuit.
///
/// Devices accumulate into `matrix`, `rhs` and `irhs` with `+=` only and read
/// the present Newton solution from `rhs_old`/`irhs_old`. Vectors are
/// indexed by [`NodeId::index`]; slot 0 belongs to ground and is ignored by
/// the solver.
#[derive(Debug)]
pub struct SimContext {
    pub nodes: NodeTable,
    pub matrix: SparseMatrix,
    /// Right-hand side being assembled (real part).
    pub rhs: DVector<f64>,
    /// Right-hand side being assembled (imaginary part).
    pub irhs: DVector<f64>,
    /// Present solution (real part).
    pub rhs_old: DVector<f64>,
    /// Present solution (imaginary part).
    pub irhs_old: DVector<f64>,
    pub states: StateVectors,
    pub integrator: Integrator,
    pub mode: Mode,
    pub tolerances: Tolerances,
    /// Devices may reuse their last evaluation when inputs are unchanged.
    pub bypass: bool,
    /// Circuit temperature (K).
    pub temp: f64,
    /// Nominal model temperature (K).
    pub nom_temp: f64,
    /// Angular frequency of the present AC point (rad/s).
    pub omega: f64,
    /// Present time step (s).
    pub delta: f64,
    /// Previous time step (s).
    pub delta_prev: f64,
    /// Devices that reported non-convergence in this iteration.
    pub noncon: usize,
    /// Name of the last device to report non-convergence.
    pub trouble_element: Option<String>,
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new(&SimOptions::default())
    }
}

impl SimContext {
    pub fn new(options: &SimOptions) -> Self {
        let empty = DVector::zeros(1);
        Self {
            nodes: NodeTable::new(),
            matrix: SparseMatrix::new(),
            rhs: empty.clone(),
            irhs: empty.clone(),
            rhs_old: empty.clone(),
            irhs_old: empty,
            states: StateVectors::new(),
            integrator: Integrator::new(options.method, 1).with_max_order(options.max_order),
            mode: Mode::default(),
            tolerances: Tolerances::from(options),
            bypass: options.bypass,
            temp: options.temp,
            nom_temp: options.tnom,
            omega: 0.0,
            delta: 0.0,
            delta_prev: 0.0,
            noncon: 0,
            trouble_element: None,
        }
    }

    /// Length of the solution vectors, ground slot included.
    pub fn size(&self) -> usize {
        self.rhs.len()
    }

    /// Grow every vector to cover all nodes created so far, keeping values.
    pub fn resize_vectors(&mut self) {
        let len = self.nodes.vector_len();
        if len > self.rhs.len() {
            for v in [
                &mut self.rhs,
                &mut self.irhs,
                &mut self.rhs_old,
                &mut self.irhs_old,
            ] {
                let old = std::mem::replace(v, DVector::zeros(0));
                *v = old.resize_vertically(len, 0.0);
            }
        }
    }

    /// Zero the matrix and right-hand sides before a new load pass.
    pub fn clear_load(&mut self) {
        self.matrix.clear();
        self.rhs.fill(0.0);
        self.irhs.fill(0.0);
    }

    pub fn rhs_add(&mut self, node: NodeId, value: f64) {
        self.rhs[node.index()] += value;
    }

    pub fn irhs_add(&mut self, node: NodeId, value: f64) {
        self.irhs[node.index()] += value;
    }

    /// Present solution voltage of a node.
    pub fn voltage(&self, node: NodeId) -> f64 {
        self.rhs_old[node.index()]
    }

    /// Present complex solution of a node.
    pub fn voltage_complex(&self, node: NodeId) -> Complex<f64> {
        Complex::new(self.rhs_old[node.index()], self.irhs_old[node.index()])
    }

    /// Set the present solution voltage of a node. Ground stays at zero.
    pub fn set_voltage(&mut self, node: NodeId, value: f64) {
        if !node.is_ground() {
            self.rhs_old[node.index()] = value;
        }
    }

    /// Set the present complex solution of a node. Ground stays at zero.
    pub fn set_voltage_complex(&mut self, node: NodeId, value: Complex<f64>) {
        if !node.is_ground() {
            self.rhs_old[node.index()] = value.re;
            self.irhs_old[node.index()] = value.im;
        }
    }

    /// Count a non-converged device and remember it.
    pub fn report_nonconvergence(&mut self, device: &str) {
        self.noncon += 1;
        self.trouble_element = Some(device.to_string());
    }

    /// Set the time step and recompute integration coefficients.
    pub fn set_step(&mut self, delta: f64, delta_prev: f64) -> Result<()> {
        self.delta = delta;
        self.delta_prev = delta_prev;
        self.integrator.compute_coefficients(delta, delta_prev)
    }

    /// Integrate the charge at state offset `q`; see [`Integrator::integrate`].
    pub fn integrate(&mut self, cap: f64, q: usize) -> Result<(f64, f64)> {
        self.integrator.integrate(&mut self.states, cap, q)
    }
}
