//! Structured grid descriptor and linear index mapping.
//!
//! Nodes are addressed in extended index space, which pads the `n` physical
//! nodes of each axis with `ng` ghost layers on both sides. Flat storage is
//! i-fastest: `idx = (k * j_max + j) * i_max + i`.

use crate::error::{IbmError, Result};

/// Coordinate axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// West to east
    X,
    /// South to north
    Y,
    /// Front to back
    Z,
}

impl Axis {
    /// All axes in storage order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component slot of this axis in `[x, y, z]` arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Metadata of a structured 3-D grid.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDescriptor {
    /// Physical node count per axis [nx, ny, nz]
    pub nodes: [usize; 3],
    /// Ghost layer width on each side
    pub ng: usize,
    /// Node spacing [dx, dy, dz]
    pub spacing: [f64; 3],
    /// Reciprocal spacing [1/dx, 1/dy, 1/dz]
    pub inv_spacing: [f64; 3],
    /// Position of the first physical node
    pub min: [f64; 3],
    /// Extended node count per axis [i_max, j_max, k_max]
    pub extent: [usize; 3],
}

impl GridDescriptor {
    /// Build a grid whose physical nodes span `[min, max]` inclusively.
    pub fn new(min: [f64; 3], max: [f64; 3], nodes: [usize; 3], ng: usize) -> Result<Self> {
        let mut spacing = [0.0; 3];
        for axis in Axis::ALL {
            let a = axis.index();
            if nodes[a] < 3 {
                return Err(IbmError::GridConfiguration(format!(
                    "axis {:?} needs at least 3 nodes, got {}",
                    axis, nodes[a]
                )));
            }
            spacing[a] = (max[a] - min[a]) / (nodes[a] - 1) as f64;
        }
        Self::from_spacing(min, spacing, nodes, ng)
    }

    /// Build a grid from its first node position and spacing.
    pub fn from_spacing(
        min: [f64; 3],
        spacing: [f64; 3],
        nodes: [usize; 3],
        ng: usize,
    ) -> Result<Self> {
        if ng == 0 {
            return Err(IbmError::GridConfiguration(
                "ghost width must be at least 1".to_string(),
            ));
        }
        let mut inv_spacing = [0.0; 3];
        let mut extent = [0; 3];
        for axis in Axis::ALL {
            let a = axis.index();
            if nodes[a] < 3 {
                return Err(IbmError::GridConfiguration(format!(
                    "axis {:?} needs at least 3 nodes, got {}",
                    axis, nodes[a]
                )));
            }
            if !(spacing[a].is_finite() && spacing[a] > 0.0) {
                return Err(IbmError::GridConfiguration(format!(
                    "axis {:?} spacing must be positive, got {}",
                    axis, spacing[a]
                )));
            }
            if !min[a].is_finite() {
                return Err(IbmError::GridConfiguration(format!(
                    "axis {:?} origin is not finite",
                    axis
                )));
            }
            inv_spacing[a] = 1.0 / spacing[a];
            extent[a] = nodes[a] + 2 * ng;
        }
        Ok(Self {
            nodes,
            ng,
            spacing,
            inv_spacing,
            min,
            extent,
        })
    }

    /// Total number of nodes including ghost layers.
    pub fn len(&self) -> usize {
        self.extent[0] * self.extent[1] * self.extent[2]
    }

    /// Return `true` if the grid holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Nodes per k-slab.
    #[inline]
    pub fn slab_len(&self) -> usize {
        self.extent[0] * self.extent[1]
    }

    /// Flat index of node (i, j, k).
    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.extent[1] + j) * self.extent[0] + i
    }

    /// Flat index of a possibly out-of-range node.
    #[inline]
    pub fn checked_index(&self, i: i64, j: i64, k: i64) -> Option<usize> {
        let in_range = |v: i64, max: usize| v >= 0 && (v as usize) < max;
        if in_range(i, self.extent[0]) && in_range(j, self.extent[1]) && in_range(k, self.extent[2])
        {
            Some(self.index(i as usize, j as usize, k as usize))
        } else {
            None
        }
    }

    /// Inverse of [`GridDescriptor::index`].
    #[inline]
    pub fn coords(&self, idx: usize) -> [usize; 3] {
        let i = idx % self.extent[0];
        let j = (idx / self.extent[0]) % self.extent[1];
        let k = idx / self.slab_len();
        [i, j, k]
    }

    /// Physical position of node (i, j, k). Ghost layers extrapolate past `min`.
    #[inline]
    pub fn node_position(&self, i: usize, j: usize, k: usize) -> [f64; 3] {
        let ng = self.ng as f64;
        [
            self.min[0] + (i as f64 - ng) * self.spacing[0],
            self.min[1] + (j as f64 - ng) * self.spacing[1],
            self.min[2] + (k as f64 - ng) * self.spacing[2],
        ]
    }

    /// Extended index of the node at or below `coord` along `axis`.
    ///
    /// Returned as a float and left unbounded, so coordinates far outside the
    /// grid stay representable.
    #[inline]
    pub fn node_floor(&self, axis: Axis, coord: f64) -> f64 {
        let a = axis.index();
        ((coord - self.min[a]) * self.inv_spacing[a]).floor() + self.ng as f64
    }

    /// Flat indices of the six face neighbors (W, E, S, N, F, B).
    ///
    /// The node must not lie on the outermost layer of the extended grid.
    #[inline]
    pub fn face_neighbors(&self, i: usize, j: usize, k: usize) -> [usize; 6] {
        let idx = self.index(i, j, k);
        let row = self.extent[0];
        let slab = self.slab_len();
        [idx - 1, idx + 1, idx - row, idx + row, idx - slab, idx + slab]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid() -> GridDescriptor {
        GridDescriptor::new([0.0; 3], [9.0, 9.0, 9.0], [10, 10, 10], 2).unwrap()
    }

    #[test]
    fn extent_adds_ghost_layers() {
        let grid = unit_grid();
        assert_eq!(grid.extent, [14, 14, 14]);
        assert_eq!(grid.len(), 14 * 14 * 14);
        assert!(!grid.is_empty());
        assert_eq!(grid.spacing, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn index_round_trips_through_coords() {
        let grid = unit_grid();
        let idx = grid.index(3, 7, 11);
        assert_eq!(idx, (11 * 14 + 7) * 14 + 3);
        assert_eq!(grid.coords(idx), [3, 7, 11]);
    }

    #[test]
    fn node_position_accounts_for_ghost_width() {
        let grid = unit_grid();
        assert_eq!(grid.node_position(2, 2, 2), [0.0, 0.0, 0.0]);
        assert_eq!(grid.node_position(0, 5, 11), [-2.0, 3.0, 9.0]);
        assert_eq!(grid.node_floor(Axis::Y, 3.5), 5.0);
        assert_eq!(grid.node_floor(Axis::X, -2.5), -1.0);
    }

    #[test]
    fn checked_index_rejects_out_of_range() {
        let grid = unit_grid();
        assert!(grid.checked_index(-1, 0, 0).is_none());
        assert!(grid.checked_index(0, 14, 0).is_none());
        assert_eq!(grid.checked_index(1, 2, 3), Some(grid.index(1, 2, 3)));
    }

    #[test]
    fn face_neighbors_are_unit_steps() {
        let grid = unit_grid();
        let n = grid.face_neighbors(5, 6, 7);
        assert_eq!(n[0], grid.index(4, 6, 7));
        assert_eq!(n[1], grid.index(6, 6, 7));
        assert_eq!(n[2], grid.index(5, 5, 7));
        assert_eq!(n[3], grid.index(5, 7, 7));
        assert_eq!(n[4], grid.index(5, 6, 6));
        assert_eq!(n[5], grid.index(5, 6, 8));
    }

    #[test]
    fn invalid_descriptors_are_rejected() {
        assert!(GridDescriptor::new([0.0; 3], [1.0; 3], [2, 10, 10], 2).is_err());
        assert!(GridDescriptor::new([0.0; 3], [1.0; 3], [10, 10, 10], 0).is_err());
        assert!(GridDescriptor::new([0.0; 3], [-1.0, 1.0, 1.0], [10, 10, 10], 1).is_err());
    }
}
