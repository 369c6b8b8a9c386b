//! Spherical solid geometries embedded in the grid.
//!
//! Geometries are stored in SoA (struct-of-arrays) format and identified by
//! their insertion index. The store is read-only while a classification or
//! boundary sweep runs; moving the spheres between steps belongs to the
//! caller.

use crate::error::{IbmError, Result};

/// A single sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Center [x, y, z]
    pub center: [f64; 3],
    /// Radius
    pub radius: f64,
}

impl Sphere {
    /// Squared distance from `point` to the center, minus the squared radius.
    ///
    /// Negative strictly inside the sphere.
    #[inline]
    pub fn inside_measure(&self, point: [f64; 3]) -> f64 {
        let dx = point[0] - self.center[0];
        let dy = point[1] - self.center[1];
        let dz = point[2] - self.center[2];
        dx * dx + dy * dy + dz * dz - self.radius * self.radius
    }
}

/// Sphere geometries in SoA layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeometryStore {
    /// Center x
    pub x: Vec<f64>,
    /// Center y
    pub y: Vec<f64>,
    /// Center z
    pub z: Vec<f64>,
    /// Radius
    pub radius: Vec<f64>,
}

impl GeometryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a list of spheres, validating every radius.
    pub fn from_spheres(spheres: &[Sphere]) -> Result<Self> {
        let mut store = Self::new();
        for s in spheres {
            store.push(s.center, s.radius)?;
        }
        Ok(store)
    }

    /// Number of geometries.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    /// Return `true` if there are no geometries.
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Append a sphere and return its geometry index.
    pub fn push(&mut self, center: [f64; 3], radius: f64) -> Result<usize> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(IbmError::GeometryConfiguration(format!(
                "geometry {} radius must be positive and finite, got {}",
                self.len(),
                radius
            )));
        }
        if center.iter().any(|c| !c.is_finite()) {
            return Err(IbmError::GeometryConfiguration(format!(
                "geometry {} center is not finite",
                self.len()
            )));
        }
        self.x.push(center[0]);
        self.y.push(center[1]);
        self.z.push(center[2]);
        self.radius.push(radius);
        Ok(self.len() - 1)
    }

    /// Sphere with index `id`.
    #[inline]
    pub fn get(&self, id: usize) -> Sphere {
        Sphere {
            center: [self.x[id], self.y[id], self.z[id]],
            radius: self.radius[id],
        }
    }

    /// Iterate over all spheres in index order.
    pub fn iter(&self) -> impl Iterator<Item = Sphere> + '_ {
        (0..self.len()).map(move |id| self.get(id))
    }
}
