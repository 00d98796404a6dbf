//! Integration test: pollution source rules, priority and batch rebalancing

use airfuse::labeling::{
    LabelingConfig, RebalancePolicy, RuleThresholds, SourceEvidence, SourceLabel, SourceLabelEngine,
};
use airfuse::pipeline::LabelingStage;
use polars::prelude::*;

fn labels_of(df: &DataFrame) -> Vec<String> {
    df.column("pollution_source")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap().to_string())
        .collect()
}

#[test]
fn test_industrial_wins_over_vehicular() {
    let df = df!(
        "latitude" => &[28.6],
        "longitude" => &[77.2],
        "industrial_zones_dist_km" => &[0.2],
        "so2" => &[60.0],
        "roads_dist_km" => &[0.1],
        "no2" => &[100.0]
    )
    .unwrap();

    let (labeled, _) = SourceLabelEngine::default().label_frame(&df).unwrap();
    assert_eq!(labels_of(&labeled), vec!["Industrial"]);
}

#[test]
fn test_burning_without_proximity() {
    let df = df!(
        "latitude" => &[28.6],
        "longitude" => &[77.2],
        "pm25" => &[150.0],
        "humidity" => &[30.0]
    )
    .unwrap();

    let (labeled, outcome) = SourceLabelEngine::default().label_frame(&df).unwrap();
    assert_eq!(labels_of(&labeled), vec!["Burning"]);
    assert!(!outcome.proximity_available);
}

#[test]
fn test_natural_fallback() {
    let df = df!(
        "latitude" => &[28.6],
        "longitude" => &[77.2],
        "pm25" => &[0.0],
        "pm10" => &[0.0],
        "no2" => &[0.0],
        "co" => &[0.0],
        "so2" => &[0.0],
        "o3" => &[0.0],
        "humidity" => &[80.0]
    )
    .unwrap();

    let (labeled, _) = SourceLabelEngine::default().label_frame(&df).unwrap();
    assert_eq!(labels_of(&labeled), vec!["Natural"]);
}

fn mostly_natural_batch() -> DataFrame {
    // 95 clean rows, 5 burning rows
    let n = 100;
    let pm25: Vec<f64> = (0..n).map(|i| if i % 20 == 0 { 150.0 } else { 10.0 + i as f64 * 0.1 }).collect();
    let humidity: Vec<f64> = (0..n).map(|i| if i % 20 == 0 { 25.0 } else { 60.0 }).collect();
    df!(
        "latitude" => &vec![28.6; n],
        "longitude" => &vec![77.2; n],
        "pm25" => &pm25,
        "humidity" => &humidity
    )
    .unwrap()
}

#[test]
fn test_rebalancing_trigger_is_deterministic() {
    let df = mostly_natural_batch();
    let stage = LabelingStage::default();

    let (first, outcome) = stage.run(&df).unwrap();
    let (second, _) = stage.run(&df).unwrap();

    assert!(outcome.rebalanced, "95/100 Natural exceeds the 0.9 threshold");
    assert_eq!(outcome.distribution.count(SourceLabel::Natural), 95);
    assert_eq!(outcome.distribution.count(SourceLabel::Burning), 5);
    assert_eq!(labels_of(&first), labels_of(&second));
}

#[test]
fn test_rebalancing_can_be_disabled() {
    let config = LabelingConfig::default().with_rebalance(RebalancePolicy::disabled());
    let (_, outcome) = SourceLabelEngine::new(config).label_frame(&mostly_natural_batch()).unwrap();
    assert!(!outcome.rebalanced);
}

#[test]
fn test_custom_thresholds() {
    let config = LabelingConfig::default().with_thresholds(RuleThresholds {
        pm_high: 50.0,
        ..Default::default()
    });
    let engine = SourceLabelEngine::new(config);
    let evidence = SourceEvidence {
        pm10: Some(60.0),
        humidity: Some(20.0),
        ..Default::default()
    };
    assert_eq!(engine.label(&evidence), SourceLabel::Burning);
    assert_eq!(SourceLabelEngine::default().label(&evidence), SourceLabel::Natural);
}

#[test]
fn test_null_inputs_never_fire() {
    let df = df!(
        "latitude" => &[28.6, 28.6],
        "longitude" => &[77.2, 77.2],
        "roads_dist_km" => &[None, Some(0.1)],
        "no2" => &[Some(200.0), None]
    )
    .unwrap();

    let (labeled, outcome) = SourceLabelEngine::default().label_frame(&df).unwrap();
    assert_eq!(labels_of(&labeled), vec!["Natural", "Natural"]);
    assert_eq!(outcome.distribution.distinct(), 1);
}
