//! Node classification for the ghost-cell immersed boundary method.
//!
//! Four passes run in strict order, each reading the flags left by the
//! previous one:
//!
//! 1. Initialize: everything boundary, interior fluid.
//! 2. Rasterize solids: interior nodes strictly inside a sphere become solid.
//! 3. Detect ghosts: solid nodes with a fluid face neighbor become ghosts.
//! 4. Detect solids next to ghosts: solid nodes with a ghost face neighbor
//!    move to the solid-with-ghost band.
//!
//! Within a pass the work is split over k-slabs with rayon. Passes 3 and 4
//! read a snapshot of the previous pass, so the parallel result matches a
//! sequential sweep exactly.

use rayon::prelude::*;

use crate::error::{IbmError, Result};
use crate::flag::{FlagCounts, FlagEncoding, NodeFlags, BOUNDARY_FLAG, FLUID_FLAG};
use crate::geometry::{GeometryStore, Sphere};
use crate::grid::{Axis, GridDescriptor};
use crate::partition::{IndexRange, Partition};

/// Search box padding relative to the radius.
pub const SEARCH_SAFETY_FACTOR: f64 = 1.5;

/// Classify every node of `flags` against `geometries`.
///
/// The flag encoding must have been sized for `geometries.len()`. All search
/// boxes are validated before any flag is written.
pub fn classify_nodes(
    flags: &mut NodeFlags,
    grid: &GridDescriptor,
    partition: &Partition,
    geometries: &GeometryStore,
) -> Result<FlagCounts> {
    if flags.len() != grid.len() {
        return Err(IbmError::GridConfiguration(format!(
            "flag array holds {} nodes, grid has {}",
            flags.len(),
            grid.len()
        )));
    }
    let encoding = *flags.encoding();
    if encoding.total_geometries() != geometries.len() {
        return Err(IbmError::GeometryConfiguration(format!(
            "flag encoding sized for {} geometries, store holds {}",
            encoding.total_geometries(),
            geometries.len()
        )));
    }

    let interior = partition.interior();
    let boxes = geometries
        .iter()
        .enumerate()
        .map(|(g, sphere)| search_box(grid, interior, &sphere, g))
        .collect::<Result<Vec<_>>>()?;

    initialize(flags, grid, interior);
    for (g, bounds) in boxes.iter().enumerate() {
        rasterize(flags, grid, &geometries.get(g), bounds, encoding.solid(g));
    }
    identify_ghosts(flags, grid, interior);
    identify_solids_with_ghost_neighbors(flags, grid, interior, &encoding);

    let counts = flags.counts();
    tracing::debug!(
        "Classified {} nodes: {} fluid, {} solid, {} ghost, {} solid-with-ghost, {} boundary",
        flags.len(),
        counts.fluid,
        counts.solid,
        counts.ghost,
        counts.solid_with_ghost,
        counts.boundary
    );
    Ok(counts)
}

/// Index box around a sphere, clamped to the interior.
///
/// Bounds are computed in floating point and clamped before conversion, so
/// any finite center and radius yields either a box or a configuration
/// error.
pub fn search_box(
    grid: &GridDescriptor,
    interior: &IndexRange,
    sphere: &Sphere,
    geometry: usize,
) -> Result<IndexRange> {
    let mut sub = [0; 3];
    let mut sup = [0; 3];
    for axis in Axis::ALL {
        let a = axis.index();
        let center = grid.node_floor(axis, sphere.center[a]);
        let reach = (SEARCH_SAFETY_FACTOR * sphere.radius * grid.inv_spacing[a]).ceil();
        let (lo, hi) = (center - reach, center + reach + 1.0);
        if !(lo.is_finite() && hi.is_finite()) {
            return Err(IbmError::GeometryConfiguration(format!(
                "geometry {} (center {:?}, radius {}) exceeds the index range along {:?}",
                geometry, sphere.center, sphere.radius, axis
            )));
        }
        let clamp = |v: f64| v.clamp(interior.sub[a] as f64, interior.sup[a] as f64) as usize;
        let (lo, hi) = (clamp(lo), clamp(hi));
        if lo >= hi {
            return Err(IbmError::GeometryConfiguration(format!(
                "geometry {} (center {:?}, radius {}) lies outside the grid interior along {:?}",
                geometry, sphere.center, sphere.radius, axis
            )));
        }
        sub[a] = lo;
        sup[a] = hi;
    }
    Ok(IndexRange { sub, sup })
}

/// Pass 1.
fn initialize(flags: &mut NodeFlags, grid: &GridDescriptor, interior: &IndexRange) {
    let row = grid.extent[0];
    flags
        .as_mut_slice()
        .par_chunks_mut(grid.slab_len())
        .enumerate()
        .for_each(|(k, slab)| {
            slab.fill(BOUNDARY_FLAG);
            if k < interior.sub[2] || k >= interior.sup[2] {
                return;
            }
            for j in interior.sub[1]..interior.sup[1] {
                slab[j * row + interior.sub[0]..j * row + interior.sup[0]].fill(FLUID_FLAG);
            }
        });
}

/// Pass 2, for a single geometry. Overwrites whatever an earlier geometry set.
fn rasterize(
    flags: &mut NodeFlags,
    grid: &GridDescriptor,
    sphere: &Sphere,
    bounds: &IndexRange,
    solid_flag: i32,
) {
    let row = grid.extent[0];
    flags
        .as_mut_slice()
        .par_chunks_mut(grid.slab_len())
        .enumerate()
        .skip(bounds.sub[2])
        .take(bounds.sup[2] - bounds.sub[2])
        .for_each(|(k, slab)| {
            for j in bounds.sub[1]..bounds.sup[1] {
                for i in bounds.sub[0]..bounds.sup[0] {
                    if sphere.inside_measure(grid.node_position(i, j, k)) < 0.0 {
                        slab[j * row + i] = solid_flag;
                    }
                }
            }
        });
}

/// Apply `update` to every interior node, reading from a snapshot of the
/// current flags. `update` returns the new flag or `None` to keep it.
fn sweep_interior<F>(flags: &mut NodeFlags, grid: &GridDescriptor, interior: &IndexRange, update: F)
where
    F: Fn(i32, [i32; 6]) -> Option<i32> + Sync,
{
    let snapshot = flags.as_slice().to_vec();
    let row = grid.extent[0];
    flags
        .as_mut_slice()
        .par_chunks_mut(grid.slab_len())
        .enumerate()
        .skip(interior.sub[2])
        .take(interior.sup[2] - interior.sub[2])
        .for_each(|(k, slab)| {
            for j in interior.sub[1]..interior.sup[1] {
                for i in interior.sub[0]..interior.sup[0] {
                    let current = snapshot[grid.index(i, j, k)];
                    let neighbors = grid.face_neighbors(i, j, k).map(|n| snapshot[n]);
                    if let Some(flag) = update(current, neighbors) {
                        slab[j * row + i] = flag;
                    }
                }
            }
        });
}

/// Pass 3: negating a solid flag moves it into the ghost band and keeps the
/// geometry id.
fn identify_ghosts(flags: &mut NodeFlags, grid: &GridDescriptor, interior: &IndexRange) {
    let encoding = *flags.encoding();
    sweep_interior(flags, grid, interior, |flag, neighbors| {
        (encoding.is_solid(flag) && neighbors.contains(&FLUID_FLAG)).then(|| -flag)
    });
}

/// Pass 4.
fn identify_solids_with_ghost_neighbors(
    flags: &mut NodeFlags,
    grid: &GridDescriptor,
    interior: &IndexRange,
    encoding: &FlagEncoding,
) {
    let total = encoding.total_geometries() as i32;
    sweep_interior(flags, grid, interior, |flag, neighbors| {
        (encoding.is_solid(flag) && neighbors.iter().any(|&n| encoding.is_ghost(n)))
            .then(|| flag - total)
    });
}
