//! Linear reconstruction of ghost and solid node states.
//!
//! A non-fluid node takes its state from its image point, the reflection of
//! the node across the sphere surface along the outward normal:
//!
//! ```text
//! phi_node  = 2 * phi_wall - phi_image
//! scalars:  phi_wall = phi_image  =>  phi_node =  phi_image
//! vectors:  phi_wall = 0          =>  phi_node = -phi_image
//! phi_image = a0 + a1 * i + a2 * j + a3 * k
//! ```
//!
//! The coefficients come from an exact fit through four fluid nodes found
//! around the image point. By default the first four fluid nodes along the
//! search path are taken as they come, and a degenerate set is reported as a
//! singular system. [`StencilPolicy::AffinelyIndependent`] passes over
//! candidates that would make the set degenerate. The fit is done in node-index coordinates taken
//! relative to the stencil anchor, which keeps the position matrix well
//! scaled on large grids without changing the fitted model.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::{IbmError, Result};
use crate::flag::{NodeFlags, FLUID_FLAG};
use crate::geometry::GeometryStore;
use crate::grid::{Axis, GridDescriptor};
use crate::linsys;
use crate::state::{ConservedField, Primitive, DIM_U};

/// Fluid nodes in one interpolation stencil.
pub const STENCIL_SIZE: usize = 4;

/// Candidate offsets around the image anchor, in order of preference.
///
/// The anchor is truncated toward the node, so the current node and the
/// upward directions come first.
pub const SEARCH_PATH: [[i64; 3]; 27] = [
    [0, 0, 0], [1, 1, 1], [1, 1, 0], [1, 0, 1],
    [0, 1, 1], [1, 0, 0], [0, 1, 0], [0, 0, 1],
    [-1, 0, 0], [0, -1, 0], [0, 0, -1], [-1, 1, 0],
    [-1, 0, 1], [1, -1, 0], [0, -1, 1], [1, 0, -1],
    [0, 1, -1], [-1, 1, 1], [1, -1, 1], [1, 1, -1],
    [-1, -1, 0], [-1, 0, -1], [0, -1, -1], [-1, -1, 1],
    [-1, 1, -1], [1, -1, -1], [-1, -1, -1],
];

/// How fluid candidates along [`SEARCH_PATH`] enter a stencil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StencilPolicy {
    /// Accept the first four fluid nodes.
    #[default]
    FirstFluid,
    /// Pass over fluid nodes collinear or coplanar with the nodes already
    /// accepted.
    AffinelyIndependent,
}

/// Image point of a node in node-index space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePoint {
    /// Integer anchor of the stencil search (offset truncated toward the node)
    pub anchor: [i64; 3],
    /// Exact image coordinates
    pub coords: [f64; 3],
}

/// Fluid nodes selected around an image point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stencil {
    /// Node indices (i, j, k) of the accepted nodes
    pub nodes: [[usize; 3]; STENCIL_SIZE],
    /// Number of accepted nodes
    pub len: usize,
}

impl Stencil {
    /// Return `true` if all four slots are filled.
    pub fn is_complete(&self) -> bool {
        self.len == STENCIL_SIZE
    }
}

/// Reconstructs wall-mirrored states for ghost and solid nodes.
///
/// Borrows the classification state; one instance serves a whole sweep.
pub struct Reconstructor<'a> {
    grid: &'a GridDescriptor,
    flags: &'a NodeFlags,
    geometries: &'a GeometryStore,
    gamma: f64,
    policy: StencilPolicy,
}

impl<'a> Reconstructor<'a> {
    /// Create a reconstructor over classified flags, using
    /// [`StencilPolicy::FirstFluid`].
    pub fn new(
        grid: &'a GridDescriptor,
        flags: &'a NodeFlags,
        geometries: &'a GeometryStore,
        gamma: f64,
    ) -> Self {
        Self {
            grid,
            flags,
            geometries,
            gamma,
            policy: StencilPolicy::default(),
        }
    }

    /// Select how stencil candidates are accepted.
    pub fn with_stencil_policy(mut self, policy: StencilPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Image point of `node` across the surface of `geometry`.
    pub fn image_point(&self, node: [usize; 3], geometry: usize) -> Result<ImagePoint> {
        let sphere = self.geometries.get(geometry);
        let pos = self.grid.node_position(node[0], node[1], node[2]);
        let dist = [
            pos[0] - sphere.center[0],
            pos[1] - sphere.center[1],
            pos[2] - sphere.center[2],
        ];
        let dist_to_center = (dist[0] * dist[0] + dist[1] * dist[1] + dist[2] * dist[2]).sqrt();
        if dist_to_center <= f64::EPSILON * sphere.radius {
            return Err(IbmError::DegenerateNormal { node, geometry });
        }
        let dist_to_surface = sphere.radius - dist_to_center;

        let mut anchor = [0; 3];
        let mut coords = [0.0; 3];
        for axis in Axis::ALL {
            let a = axis.index();
            let normal = dist[a] / dist_to_center;
            let shift = 2.0 * dist_to_surface * normal * self.grid.inv_spacing[a];
            anchor[a] = node[a] as i64 + shift.trunc() as i64;
            coords[a] = node[a] as f64 + shift;
        }
        Ok(ImagePoint { anchor, coords })
    }

    /// First [`STENCIL_SIZE`] fluid nodes along [`SEARCH_PATH`] from `anchor`.
    ///
    /// Under [`StencilPolicy::AffinelyIndependent`] a fluid node is passed
    /// over when it lies on the line or plane spanned by the nodes already
    /// accepted, so a complete stencil always yields a regular position
    /// matrix.
    pub fn find_stencil(&self, anchor: [i64; 3]) -> Stencil {
        let mut stencil = Stencil {
            nodes: [[0; 3]; STENCIL_SIZE],
            len: 0,
        };
        let mut accepted = [[0i64; 3]; STENCIL_SIZE];
        for offset in SEARCH_PATH.iter() {
            if stencil.is_complete() {
                break;
            }
            let (ih, jh, kh) = (
                anchor[0] + offset[0],
                anchor[1] + offset[1],
                anchor[2] + offset[2],
            );
            let fluid = self
                .grid
                .checked_index(ih, jh, kh)
                .is_some_and(|idx| self.flags.get(idx) == FLUID_FLAG);
            let usable = match self.policy {
                StencilPolicy::FirstFluid => fluid,
                StencilPolicy::AffinelyIndependent => {
                    fluid && extends_span(&accepted[..stencil.len], *offset)
                }
            };
            if usable {
                accepted[stencil.len] = *offset;
                stencil.nodes[stencil.len] = [ih as usize, jh as usize, kh as usize];
                stencil.len += 1;
            }
        }
        stencil
    }

    /// Primitive state at the image point of `node`, before mirroring.
    pub fn image_state(
        &self,
        field: &ConservedField,
        node: [usize; 3],
        geometry: usize,
    ) -> Result<Primitive> {
        let image = self.image_point(node, geometry)?;
        let stencil = self.find_stencil(image.anchor);
        if !stencil.is_complete() {
            return Err(IbmError::StencilUnderdetermined {
                node,
                geometry,
                found: stencil.len,
            });
        }

        let mut positions = DMatrix::<f64>::zeros(STENCIL_SIZE, 4);
        let mut rhs = DMatrix::<f64>::zeros(STENCIL_SIZE, DIM_U);
        for (row, h) in stencil.nodes.iter().enumerate() {
            positions[(row, 0)] = 1.0;
            for a in 0..3 {
                positions[(row, a + 1)] = (h[a] as i64 - image.anchor[a]) as f64;
            }
            let state = field
                .primitive(self.grid.index(h[0], h[1], h[2]), self.gamma)
                .to_array();
            for (m, value) in state.iter().enumerate() {
                rhs[(row, m)] = *value;
            }
        }

        let coeffs = linsys::solve(&positions, &rhs)
            .map_err(|_| IbmError::SingularSystem { node, geometry })?;

        let local = [
            image.coords[0] - image.anchor[0] as f64,
            image.coords[1] - image.anchor[1] as f64,
            image.coords[2] - image.anchor[2] as f64,
        ];
        let mut values = [0.0; DIM_U];
        for (m, value) in values.iter_mut().enumerate() {
            *value = coeffs[(0, m)]
                + coeffs[(1, m)] * local[0]
                + coeffs[(2, m)] * local[1]
                + coeffs[(3, m)] * local[2];
        }
        Ok(Primitive::from_array(values))
    }

    /// Wall state of `node`: the image state with its velocity reversed.
    pub fn reconstruct(
        &self,
        field: &ConservedField,
        node: [usize; 3],
        geometry: usize,
    ) -> Result<Primitive> {
        self.image_state(field, node, geometry).map(Primitive::mirrored)
    }
}

/// Whether `candidate` is affinely independent of `accepted`.
fn extends_span(accepted: &[[i64; 3]], candidate: [i64; 3]) -> bool {
    let rel = |p: [i64; 3]| {
        [
            p[0] - accepted[0][0],
            p[1] - accepted[0][1],
            p[2] - accepted[0][2],
        ]
    };
    match accepted.len() {
        0 => true,
        1 => candidate != accepted[0],
        2 => cross(rel(accepted[1]), rel(candidate)) != [0; 3],
        3 => dot(cross(rel(accepted[1]), rel(accepted[2])), rel(candidate)) != 0,
        _ => false,
    }
}

fn cross(a: [i64; 3], b: [i64; 3]) -> [i64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn dot(a: [i64; 3], b: [i64; 3]) -> i64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flag::FlagEncoding;

    fn grid() -> GridDescriptor {
        GridDescriptor::new([0.0; 3], [9.0; 3], [10, 10, 10], 2).unwrap()
    }

    fn all_fluid(grid: &GridDescriptor, geometries: usize) -> NodeFlags {
        let mut flags = NodeFlags::new(grid.len(), FlagEncoding::new(geometries).unwrap());
        flags.as_mut_slice().fill(FLUID_FLAG);
        flags
    }

    #[test]
    fn search_path_visits_every_offset_once() {
        let mut seen = std::collections::HashSet::new();
        for o in SEARCH_PATH.iter() {
            assert!(o.iter().all(|c| (-1..=1).contains(c)));
            assert!(seen.insert(*o));
        }
        assert_eq!(seen.len(), 27);
        assert_eq!(SEARCH_PATH[0], [0, 0, 0]);
    }

    #[test]
    fn image_point_reflects_across_surface() {
        let g = grid();
        let flags = all_fluid(&g, 1);
        let mut store = GeometryStore::new();
        store.push([4.0, 4.0, 4.0], 2.0).unwrap();
        let rec = Reconstructor::new(&g, &flags, &store, 1.4);
        // node one spacing east of the center, surface one spacing further
        let image = rec.image_point([7, 6, 6], 0).unwrap();
        assert_eq!(image.anchor, [9, 6, 6]);
        assert!((image.coords[0] - 9.0).abs() < 1e-12);
        assert!((image.coords[1] - 6.0).abs() < 1e-12);
    }

    #[test]
    fn image_anchor_truncates_toward_node() {
        let g = grid();
        let flags = all_fluid(&g, 1);
        let mut store = GeometryStore::new();
        store.push([4.0, 4.0, 4.0], 2.0).unwrap();
        let rec = Reconstructor::new(&g, &flags, &store, 1.4);
        // (-1, -1, 0) from the center: shift = 2 * (2 - sqrt 2) / sqrt 2 per axis
        let image = rec.image_point([5, 5, 6], 0).unwrap();
        let shift = 2.0 * (2.0 - 2f64.sqrt()) / 2f64.sqrt();
        assert_eq!(image.anchor, [5, 5, 6]);
        assert!((image.coords[0] - (5.0 - shift)).abs() < 1e-12);
    }

    #[test]
    fn center_node_has_no_normal() {
        let g = grid();
        let flags = all_fluid(&g, 1);
        let mut store = GeometryStore::new();
        store.push([4.0, 4.0, 4.0], 2.0).unwrap();
        let rec = Reconstructor::new(&g, &flags, &store, 1.4);
        assert!(matches!(
            rec.image_point([6, 6, 6], 0),
            Err(IbmError::DegenerateNormal { node: [6, 6, 6], geometry: 0 })
        ));
    }

    #[test]
    fn stencil_skips_non_fluid_and_out_of_range_nodes() {
        let g = grid();
        let mut flags = all_fluid(&g, 1);
        flags.as_mut_slice()[g.index(4, 4, 4)] = 10;
        let store = GeometryStore::new();
        let rec = Reconstructor::new(&g, &flags, &store, 1.4);

        let s = rec.find_stencil([4, 4, 4]);
        assert!(s.is_complete());
        assert_eq!(s.nodes, [[5, 5, 5], [5, 5, 4], [5, 4, 5], [4, 5, 5]]);

        // corner of the extended grid: only non-positive offsets stay in range
        let s = rec.find_stencil([13, 13, 13]);
        assert!(s.is_complete());
        assert_eq!(s.nodes, [[13, 13, 13], [12, 13, 13], [13, 12, 13], [13, 13, 12]]);
    }

    /// Flags whose first four fluid nodes around anchor (4, 4, 4) all lie in
    /// the plane i = 5, with a sphere imaging node (6, 4, 4) onto that anchor.
    fn coplanar_setup() -> (GridDescriptor, NodeFlags, GeometryStore) {
        let g = grid();
        let mut flags = all_fluid(&g, 1);
        flags.as_mut_slice()[g.index(4, 4, 4)] = 10;
        flags.as_mut_slice()[g.index(4, 5, 5)] = 10;
        let mut store = GeometryStore::new();
        // node (6, 4, 4) sits one spacing inside, the surface one further
        store.push([5.0, 2.0, 2.0], 2.0).unwrap();
        (g, flags, store)
    }

    #[test]
    fn first_fluid_stencil_keeps_coplanar_nodes() {
        let (g, flags, store) = coplanar_setup();
        let rec = Reconstructor::new(&g, &flags, &store, 1.4);
        let s = rec.find_stencil([4, 4, 4]);
        assert_eq!(s.nodes, [[5, 5, 5], [5, 5, 4], [5, 4, 5], [5, 4, 4]]);

        let field = ConservedField::uniform(
            g.len(),
            Primitive { rho: 1.0, u: 0.1, v: 0.0, w: 0.0, p: 1.0 },
            1.4,
        );
        assert_eq!(rec.image_point([6, 4, 4], 0).unwrap().anchor, [4, 4, 4]);
        assert!(matches!(
            rec.reconstruct(&field, [6, 4, 4], 0),
            Err(IbmError::SingularSystem { node: [6, 4, 4], geometry: 0 })
        ));
    }

    #[test]
    fn independent_stencil_passes_over_coplanar_nodes() {
        let (g, flags, store) = coplanar_setup();
        let rec = Reconstructor::new(&g, &flags, &store, 1.4)
            .with_stencil_policy(StencilPolicy::AffinelyIndependent);

        // (1, 0, 0) shares i = 5 with the first three and is skipped
        let s = rec.find_stencil([4, 4, 4]);
        assert_eq!(s.nodes, [[5, 5, 5], [5, 5, 4], [5, 4, 5], [4, 5, 4]]);

        let field = ConservedField::uniform(
            g.len(),
            Primitive { rho: 1.0, u: 0.1, v: 0.0, w: 0.0, p: 1.0 },
            1.4,
        );
        let state = rec.reconstruct(&field, [6, 4, 4], 0).unwrap();
        assert!((state.rho - 1.0).abs() < 1e-12);
        assert!((state.u + 0.1).abs() < 1e-12);
    }

    #[test]
    fn isolated_anchor_is_underdetermined() {
        let g = grid();
        let mut flags = NodeFlags::new(g.len(), FlagEncoding::new(1).unwrap());
        flags.as_mut_slice()[g.index(9, 6, 6)] = FLUID_FLAG;
        flags.as_mut_slice()[g.index(10, 7, 7)] = FLUID_FLAG;
        let mut store = GeometryStore::new();
        store.push([4.0, 4.0, 4.0], 2.0).unwrap();
        let field = ConservedField::uniform(
            g.len(),
            Primitive { rho: 1.0, u: 0.0, v: 0.0, w: 0.0, p: 1.0 },
            1.4,
        );
        let rec = Reconstructor::new(&g, &flags, &store, 1.4);
        assert_eq!(rec.find_stencil([9, 6, 6]).len, 2);
        // node (7, 6, 6) images onto anchor (9, 6, 6)
        assert!(matches!(
            rec.reconstruct(&field, [7, 6, 6], 0),
            Err(IbmError::StencilUnderdetermined { node: [7, 6, 6], geometry: 0, found: 2 })
        ));
    }
}
