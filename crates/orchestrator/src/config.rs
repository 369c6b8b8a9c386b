//! Configuration parsing and validation for immersed boundary scenarios

use kernel::flag::FLAG_OFFSET_MARGIN;
use kernel::{FailurePolicy, Primitive, StencilPolicy, AIR_GAMMA};
use serde::{Deserialize, Serialize};
use std::fs;

/// Main scenario configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Human-readable scenario name
    pub name: String,
    /// Structured grid layout
    pub grid: GridConfig,
    /// Ratio of specific heats
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    /// Immersed spheres, in rasterization order
    #[serde(default)]
    pub geometries: Vec<GeometryConfig>,
    /// Uniform state the field starts from
    #[serde(default)]
    pub initial_state: InitialState,
    /// Explicit flag band offset; sized from the geometry count when absent
    #[serde(default)]
    pub flag_offset: Option<i32>,
    /// Handling of nodes whose reconstruction fails
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Which fluid nodes a reconstruction stencil accepts
    #[serde(default)]
    pub stencil_policy: StencilPolicy,
}

/// Grid bounds and resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    /// Position of the first physical node [x, y, z]
    pub min: [f64; 3],
    /// Position of the last physical node [x, y, z]
    pub max: [f64; 3],
    /// Physical node count per axis
    pub nodes: [usize; 3],
    /// Ghost layers on each side
    #[serde(default = "default_ghost_width")]
    pub ghost_width: usize,
}

/// One spherical solid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Sphere center [x, y, z]
    pub center: [f64; 3],
    /// Sphere radius
    pub radius: f64,
}

/// Uniform initial flow state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialState {
    /// Density
    pub density: f64,
    /// Velocity [u, v, w]
    #[serde(default)]
    pub velocity: [f64; 3],
    /// Pressure
    pub pressure: f64,
}

// Default values
fn default_gamma() -> f64 {
    AIR_GAMMA
}

fn default_ghost_width() -> usize {
    2
}

impl Default for InitialState {
    fn default() -> Self {
        Self {
            density: 1.0,
            velocity: [0.0; 3],
            pressure: 1.0,
        }
    }
}

impl InitialState {
    /// Primitive view of this state
    pub fn to_primitive(&self) -> Primitive {
        Primitive {
            rho: self.density,
            u: self.velocity[0],
            v: self.velocity[1],
            w: self.velocity[2],
            p: self.pressure,
        }
    }
}

impl ScenarioConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &str) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;

        let config: ScenarioConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse config JSON: {}", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        // Check grid bounds and resolution
        for (axis, name) in ["x", "y", "z"].iter().enumerate() {
            if !(self.grid.min[axis] < self.grid.max[axis]) {
                return Err(format!("Grid min.{} must be less than max.{}", name, name));
            }
            if self.grid.nodes[axis] < 3 {
                return Err(format!("Grid needs at least 3 nodes along {}", name));
            }
        }
        if self.grid.ghost_width == 0 {
            return Err("Ghost width must be at least 1".to_string());
        }

        // Check gas
        if !(self.gamma.is_finite() && self.gamma > 1.0) {
            return Err("Gamma must be greater than 1".to_string());
        }

        // Check geometries
        for (g, geometry) in self.geometries.iter().enumerate() {
            if !(geometry.radius.is_finite() && geometry.radius > 0.0) {
                return Err(format!("Geometry {} radius must be positive", g));
            }
            if geometry.center.iter().any(|c| !c.is_finite()) {
                return Err(format!("Geometry {} center must be finite", g));
            }
        }

        // Check flag offset against the geometry count
        if let Some(offset) = self.flag_offset {
            let minimum = self.geometries.len() as i64 + FLAG_OFFSET_MARGIN as i64;
            if offset as i64 <= minimum {
                return Err(format!(
                    "Flag offset {} must exceed {} (geometries plus margin)",
                    offset, minimum
                ));
            }
        }

        // Check initial state
        if !(self.initial_state.density > 0.0) {
            return Err("Initial density must be positive".to_string());
        }
        if !(self.initial_state.pressure > 0.0) {
            return Err("Initial pressure must be positive".to_string());
        }
        if self.initial_state.velocity.iter().any(|v| !v.is_finite()) {
            return Err("Initial velocity must be finite".to_string());
        }

        Ok(())
    }

    /// Node spacing per axis
    pub fn spacing(&self) -> [f64; 3] {
        let g = &self.grid;
        [0usize, 1, 2].map(|a| (g.max[a] - g.min[a]) / (g.nodes[a] - 1) as f64)
    }
}
