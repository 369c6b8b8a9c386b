//! Reference test binary entry point
//!
//! Runs every reference scenario from the workspace root.

use reference_tests::{CountCheck, ExpectedResult, MirrorCheck, ReferenceTest, TestResult};
use tracing_subscriber::EnvFilter;

/// Sphere of radius 2.04 spacings on a node: one pure solid node survives
/// at the centre.
fn single_sphere_test() -> ReferenceTest {
    ReferenceTest {
        name: "Single Sphere".to_string(),
        config_path: "configs/single-sphere.json".to_string(),
        expected: ExpectedResult {
            counts: Some(CountCheck {
                ghost: 26,
                solid_with_ghost: 6,
                solid: 1,
            }),
            ownership: true,
            neighbor_bands: true,
            mirror: Some(MirrorCheck { tolerance: 1e-9 }),
            max_failures: 0,
        },
    }
}

/// Sphere of radius exactly 2 spacings on a node: the centre node touches
/// only ghosts and has no surface normal.
fn node_centred_sphere_test() -> ReferenceTest {
    ReferenceTest {
        name: "Node-Centred Sphere".to_string(),
        config_path: "configs/node-centred-sphere.json".to_string(),
        expected: ExpectedResult {
            counts: Some(CountCheck {
                ghost: 26,
                solid_with_ghost: 1,
                solid: 0,
            }),
            ownership: true,
            neighbor_bands: true,
            mirror: Some(MirrorCheck { tolerance: 1e-6 }),
            max_failures: 10,
        },
    }
}

/// Two spheres sharing a lens-shaped overlap.
fn overlapping_spheres_test() -> ReferenceTest {
    ReferenceTest {
        name: "Overlapping Spheres".to_string(),
        config_path: "configs/overlapping-spheres.json".to_string(),
        expected: ExpectedResult {
            counts: Some(CountCheck {
                ghost: 42,
                solid_with_ghost: 3,
                solid: 0,
            }),
            ownership: true,
            neighbor_bands: true,
            mirror: Some(MirrorCheck { tolerance: 1e-9 }),
            max_failures: 22,
        },
    }
}

/// Four spheres of two sizes on a 33^3 grid.
fn sphere_array_test() -> ReferenceTest {
    ReferenceTest {
        name: "Sphere Array".to_string(),
        config_path: "configs/sphere-array.json".to_string(),
        expected: ExpectedResult {
            counts: Some(CountCheck {
                ghost: 576,
                solid_with_ghost: 364,
                solid: 230,
            }),
            ownership: true,
            neighbor_bands: true,
            mirror: Some(MirrorCheck { tolerance: 1e-6 }),
            max_failures: 7,
        },
    }
}

/// Get all reference tests
fn all_tests() -> Vec<ReferenceTest> {
    vec![
        single_sphere_test(),
        node_centred_sphere_test(),
        overlapping_spheres_test(),
        sphere_array_test(),
    ]
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    tracing::info!("Immersed Boundary Reference Test Suite");
    tracing::info!("======================================");

    let tests = all_tests();
    tracing::info!("Found {} reference tests", tests.len());

    // Run all tests
    let mut results: Vec<TestResult> = Vec::new();
    let mut passed_count = 0;
    let mut failed_count = 0;

    for test in tests {
        match test.run() {
            Ok(result) => {
                if result.passed {
                    passed_count += 1;
                } else {
                    failed_count += 1;
                }
                result.print_summary();
                results.push(result);
            }
            Err(e) => {
                eprintln!("\nERROR running test {}: {}", test.name, e);
                failed_count += 1;
            }
        }
    }

    // Print overall summary
    println!("\n{}", "=".repeat(80));
    println!("OVERALL SUMMARY");
    println!("{}", "=".repeat(80));
    println!("Total tests: {}", results.len());
    println!("Passed: {}", passed_count);
    println!("Failed: {}", failed_count);
    println!("{}", "=".repeat(80));

    // Exit with error code if any tests failed
    if failed_count > 0 {
        std::process::exit(1);
    }
}
