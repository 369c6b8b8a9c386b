//! Orchestration Layer
//!
//! This crate turns a JSON scenario into a ready-to-use immersed boundary
//! setup:
//! - Scenario parsing and validation
//! - Grid, geometry and initial field construction
//! - Kernel creation and node classification

#![warn(missing_docs)]

pub mod config;
pub mod domain;

pub use config::ScenarioConfig;
pub use domain::{setup_domain, Domain};

use kernel::{
    BoundaryOptions, BoundaryReport, BoundaryTreatment, ConservedField, FlagCounts,
    GeometryStore, GhostCellKernel, IbmError,
};

/// A classified scenario ready for boundary application
pub struct BoundarySetup {
    /// Scenario the setup was built from
    pub config: ScenarioConfig,
    /// Kernel holding the classified flags
    pub kernel: GhostCellKernel,
    /// Spheres the kernel was classified against
    pub geometries: GeometryStore,
    /// Flow field the boundary is applied to
    pub field: ConservedField,
    /// Node counts from classification
    pub counts: FlagCounts,
}

impl BoundarySetup {
    /// Apply the boundary condition to `self.field` with the scenario's gas,
    /// failure policy and stencil policy
    pub fn apply(&mut self) -> Result<BoundaryReport, IbmError> {
        let options = BoundaryOptions {
            failure: self.config.failure_policy,
            stencil: self.config.stencil_policy,
        };
        let report =
            self.kernel
                .apply(&mut self.field, &self.geometries, self.config.gamma, options)?;
        if !report.is_clean() {
            tracing::warn!(
                "{} of {} boundary nodes kept their previous state",
                report.failures.len(),
                report.updated() + report.failures.len()
            );
        }
        Ok(report)
    }
}

/// Create a classified boundary setup from a configuration file
///
/// This function performs the full setup pipeline:
/// 1. Load and validate the configuration
/// 2. Build the grid, geometry store and initial field
/// 3. Create the ghost-cell kernel
/// 4. Classify every node against the geometries
///
/// # Arguments
/// * `config_path` - Path to the JSON configuration file
///
/// # Returns
/// A `BoundarySetup` ready for boundary application, or an error if setup fails
///
/// # Example
/// ```no_run
/// use orchestrator::create_boundary;
///
/// let mut setup = create_boundary("configs/single-sphere.json")?;
/// let report = setup.apply()?;
/// println!("{} nodes updated", report.updated());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn create_boundary(config_path: &str) -> Result<BoundarySetup, Box<dyn std::error::Error>> {
    tracing::info!("Creating boundary setup from config: {}", config_path);

    // 1. Load and validate configuration
    let config = ScenarioConfig::load(config_path)?;
    tracing::info!("Configuration loaded: {}", config.name);

    // 2. Grid, geometries and initial field
    let Domain {
        grid,
        geometries,
        field,
    } = setup_domain(&config)?;

    // 3. Kernel
    let mut kernel = GhostCellKernel::new(grid, config.flag_offset)?;

    // 4. Classification
    let counts = kernel.classify(&geometries)?;
    tracing::info!(
        "Classification: {} fluid, {} ghost, {} solid, {} solid-with-ghost, {} boundary",
        counts.fluid,
        counts.ghost,
        counts.solid,
        counts.solid_with_ghost,
        counts.boundary
    );

    tracing::info!("Boundary setup ready");
    Ok(BoundarySetup {
        config,
        kernel,
        geometries,
        field,
        counts,
    })
}
