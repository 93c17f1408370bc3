//! Aggregation Deterministic Simulation Tests
//!
//! DST tests for bucket aggregation with multiple seeds.

use sensor_summary::repository::{
    run_aggregate_batch, summarize_aggregate_batch, AggregateDSTConfig, AggregateDSTHarness,
};

// =============================================================================
// Standard Configuration Tests - 100+ Seeds
// =============================================================================

#[test]
fn test_aggregate_dst_100_seeds_standard() {
    let results = run_aggregate_batch(0, 100, 300, AggregateDSTConfig::new);
    let summary = summarize_aggregate_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 100, "All 100 seeds should pass with standard config");
}

#[test]
fn test_aggregate_dst_100_seeds_hot_buckets() {
    let results = run_aggregate_batch(1000, 100, 300, AggregateDSTConfig::hot_buckets);
    let summary = summarize_aggregate_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 100, "All 100 seeds should pass with hot buckets");
}

#[test]
fn test_aggregate_dst_100_seeds_wide_spread() {
    let results = run_aggregate_batch(2000, 100, 300, AggregateDSTConfig::wide_spread);
    let summary = summarize_aggregate_batch(&results);
    println!("{}", summary);

    let passed = results.iter().filter(|r| r.is_success()).count();
    assert_eq!(passed, 100, "All 100 seeds should pass with wide spread");
}

// =============================================================================
// Stress Tests
// =============================================================================

#[test]
fn test_aggregate_dst_stress_5000_ops() {
    let mut harness = AggregateDSTHarness::new(AggregateDSTConfig::new(12345));
    harness.run(5000);
    let result = harness.result();
    println!("Stress 5000 ops: {}", result.summary());
    assert!(result.is_success(), "5000 ops should maintain invariants");
}

#[test]
fn test_aggregate_dst_stress_hot_buckets_3000_ops() {
    let mut harness = AggregateDSTHarness::new(AggregateDSTConfig::hot_buckets(99999));
    harness.run(3000);
    let result = harness.result();
    println!(
        "Stress hot buckets 3000 ops: {} (last: {:?})",
        result.summary(),
        result.last_observation
    );
    assert!(result.is_success(), "Hot bucket stress should maintain invariants");
    assert!(result.queries > 0);
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_aggregate_dst_same_seed_same_run() {
    let run = |seed| {
        let mut harness = AggregateDSTHarness::new(AggregateDSTConfig::new(seed));
        harness.run(500);
        let result = harness.result();
        (
            result.observations,
            result.queries,
            result.sensors_registered,
            result.last_observation,
        )
    };
    assert_eq!(run(7), run(7));
}
