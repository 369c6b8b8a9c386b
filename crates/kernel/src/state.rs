//! Flow state for an ideal gas.
//!
//! The solver field stores five conserved variables per node in node-major,
//! variable-minor order: `[rho, rho*u, rho*v, rho*w, rho*E]` at
//! `idx * DIM_U + c`. Reconstruction works on primitives `(rho, u, v, w, p)`.
//!
//! ```text
//! p     = (gamma - 1) * (rho*E - 0.5 * rho * |v|^2)
//! rho*E = p / (gamma - 1) + 0.5 * rho * |v|^2
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{IbmError, Result};

/// Conserved variables per node.
pub const DIM_U: usize = 5;

/// Ratio of specific heats for diatomic gases such as air.
pub const AIR_GAMMA: f64 = 1.4;

/// Primitive flow variables at one node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Primitive {
    /// Density
    pub rho: f64,
    /// Velocity x
    pub u: f64,
    /// Velocity y
    pub v: f64,
    /// Velocity z
    pub w: f64,
    /// Pressure
    pub p: f64,
}

impl Primitive {
    /// Variables as `[rho, u, v, w, p]`.
    pub fn to_array(self) -> [f64; DIM_U] {
        [self.rho, self.u, self.v, self.w, self.p]
    }

    /// Inverse of [`Primitive::to_array`].
    pub fn from_array(a: [f64; DIM_U]) -> Self {
        Self {
            rho: a[0],
            u: a[1],
            v: a[2],
            w: a[3],
            p: a[4],
        }
    }

    /// Recover primitives from a conserved record.
    #[inline]
    pub fn from_conserved(c: &[f64], gamma: f64) -> Self {
        let rho = c[0];
        let u = c[1] / rho;
        let v = c[2] / rho;
        let w = c[3] / rho;
        let e_t = c[4] / rho;
        Self {
            rho,
            u,
            v,
            w,
            p: (gamma - 1.0) * rho * (e_t - 0.5 * (u * u + v * v + w * w)),
        }
    }

    /// Conserved record of this state.
    #[inline]
    pub fn to_conserved(self, gamma: f64) -> [f64; DIM_U] {
        let ke = 0.5 * self.rho * (self.u * self.u + self.v * self.v + self.w * self.w);
        [
            self.rho,
            self.rho * self.u,
            self.rho * self.v,
            self.rho * self.w,
            self.p / (gamma - 1.0) + ke,
        ]
    }

    /// Wall image across a no-slip surface: scalars kept, velocity flipped.
    #[inline]
    pub fn mirrored(self) -> Self {
        Self {
            u: -self.u,
            v: -self.v,
            w: -self.w,
            ..self
        }
    }
}

/// Check that `gamma` describes a physical ideal gas.
pub fn validate_gamma(gamma: f64) -> Result<()> {
    if gamma.is_finite() && gamma > 1.0 {
        Ok(())
    } else {
        Err(IbmError::FlowConfiguration(format!(
            "ratio of specific heats must exceed 1, got {}",
            gamma
        )))
    }
}

/// Conserved-variable field over all grid nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct ConservedField {
    data: Vec<f64>,
}

impl ConservedField {
    /// Field of `nodes` nodes all holding `state`.
    pub fn uniform(nodes: usize, state: Primitive, gamma: f64) -> Self {
        let record = state.to_conserved(gamma);
        let mut data = Vec::with_capacity(nodes * DIM_U);
        for _ in 0..nodes {
            data.extend_from_slice(&record);
        }
        Self { data }
    }

    /// Wrap an existing flat array of conserved records.
    pub fn from_vec(data: Vec<f64>) -> Result<Self> {
        if data.len() % DIM_U != 0 {
            return Err(IbmError::FlowConfiguration(format!(
                "conserved field length {} is not a multiple of {}",
                data.len(),
                DIM_U
            )));
        }
        Ok(Self { data })
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.data.len() / DIM_U
    }

    /// Return `true` if the field holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Conserved record of node `idx`.
    #[inline]
    pub fn conserved(&self, idx: usize) -> &[f64] {
        &self.data[idx * DIM_U..(idx + 1) * DIM_U]
    }

    /// Primitive state of node `idx`.
    #[inline]
    pub fn primitive(&self, idx: usize, gamma: f64) -> Primitive {
        Primitive::from_conserved(self.conserved(idx), gamma)
    }

    /// Overwrite node `idx` with `state`.
    #[inline]
    pub fn set_primitive(&mut self, idx: usize, state: Primitive, gamma: f64) {
        self.data[idx * DIM_U..(idx + 1) * DIM_U].copy_from_slice(&state.to_conserved(gamma));
    }

    /// Flat conserved array.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}
