//! Solver-side structures for device evaluation in Junction.
//!
//! A device model never owns the circuit equations. It reads the present
//! solution and state history from a [`SimContext`], and accumulates its
//! linearized contribution into the shared [`SparseMatrix`] and right-hand
//! side through handles resolved once per topology change.

pub mod context;
pub mod distortion;
pub mod error;
pub mod integrate;
pub mod matrix;
pub mod mode;
pub mod node;
pub mod node_table;
pub mod options;
pub mod state;

pub use context::SimContext;
pub use distortion::{DistoMode, DistortionJob};
pub use error::{Error, Result};
pub use integrate::{IntegrationMethod, Integrator};
pub use matrix::{MatrixEntry, SparseMatrix};
pub use mode::{Analysis, InitPhase, Mode};
pub use node::{Node, NodeId};
pub use node_table::NodeTable;
pub use options::{SimOptions, Tolerances};
pub use state::StateVectors;
