//! Per-device state history.
//!
//! Devices keep voltages, charges and small-signal values in solver-owned
//! arrays addressed by offsets handed out at setup. Three layers are kept:
//! the present iteration and the two previously accepted time points.

/// Present and historical state layers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateVectors {
    /// Present values, rewritten every Newton iteration.
    pub s0: Vec<f64>,
    /// Last accepted time point.
    pub s1: Vec<f64>,
    /// The time point before that.
    pub s2: Vec<f64>,
}

impl StateVectors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve `count` contiguous slots in every layer and return the base offset.
    pub fn allocate(&mut self, count: usize) -> usize {
        let base = self.s0.len();
        let len = base + count;
        self.s0.resize(len, 0.0);
        self.s1.resize(len, 0.0);
        self.s2.resize(len, 0.0);
        base
    }

    /// Number of slots per layer.
    pub fn len(&self) -> usize {
        self.s0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.s0.is_empty()
    }

    /// Shift history after a time point is accepted: s2 <- s1 <- s0.
    ///
    /// The present layer keeps its values as the starting point of the next step.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.s1, &mut self.s2);
        self.s1.copy_from_slice(&self.s0);
    }

    /// Zero every layer.
    pub fn clear(&mut self) {
        self.s0.fill(0.0);
        self.s1.fill(0.0);
        self.s2.fill(0.0);
    }

    /// Copy of the slots `base..base + count` from every layer.
    pub fn snapshot(&self, base: usize, count: usize) -> [Vec<f64>; 3] {
        let range = base..base + count;
        [
            self.s0[range.clone()].to_vec(),
            self.s1[range.clone()].to_vec(),
            self.s2[range].to_vec(),
        ]
    }

    /// Write back slots captured by [`StateVectors::snapshot`].
    pub fn restore(&mut self, base: usize, layers: &[Vec<f64>; 3]) {
        let count = layers[0].len();
        self.s0[base..base + count].copy_from_slice(&layers[0]);
        self.s1[base..base + count].copy_from_slice(&layers[1]);
        self.s2[base..base + count].copy_from_slice(&layers[2]);
    }
}
