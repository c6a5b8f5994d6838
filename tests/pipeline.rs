// EASGEN END-TO-END PIPELINE TEST
// TWO CLUSTERS, TWO FREQUENCIES EACH, DRIVEN ENTIRELY IN MEMORY:
// PARSE -> TABLES -> EFFICIENT SUBSET -> ENERGY MODELS.
//
// MIRRORS WHAT THE BINARY DOES, MINUS THE FILESYSTEM.

use std::collections::HashSet;

use easgen::dataset::build_tables;
use easgen::model::{model_file_name, render_model, KeyType, ValueType};
use easgen::parser::{ClusterParser, Dataset, ParseSummary};

// CLUSTER 0 SWEEPS {1000, 2000} kHz
const CLUSTER0_LOG: &str = "\
bench: START: CPU0: [ 1000 kHz]
bench: START: CPU1: [ 1000 kHz]
bench: power usage [ 30 mW]
bench: power usage [ 32 mW]
bench: power usage [ 34 mW]
bench: STOP: CPU0: [ 1000 kHz] [ 8000 us]
bench: START: CPU0: [ 2000 kHz]
bench: START: CPU1: [ 2000 kHz]
bench: power usage [ 60 mW]
bench: power usage [ 62 mW]
bench: power usage [ 64 mW]
bench: STOP: CPU0: [ 2000 kHz] [ 4000 us]
";

// CLUSTER 1 SWEEPS {1200, 2400} kHz, WITH NOISE SPRINKLED IN
const CLUSTER1_LOG: &str = "\
bench: power usage [ 5 mW]
bench: START: CPU0: [ 1200 kHz]
bench: power usage [ 20 mW]
bench: power usage [ 22 mW]
bench: power usage [ 24 mW]
other_driver: interference
bench: STOP: CPU0: [ 1200 kHz] [ 7000 us]
bench: START: CPU0: [ 2400 kHz]
bench: power usage [ 70 mW]
bench: power usage [ 72 mW]
bench: power usage [ 74 mW]
bench: STOP: CPU0: [ 2400 kHz] [ 3500 us]
";

fn parse(log: &str) -> ParseSummary {
    let parser = ClusterParser::new().unwrap();
    let mut diag = Vec::new();
    parser.parse(log.as_bytes(), &mut diag).unwrap()
}

// NON-EMPTY COST DATA ROWS (THE EMPTY IDLE-COST LINE DOESN'T COUNT)
fn data_rows(model: &str) -> usize {
    model
        .lines()
        .filter(|l| l.starts_with("\t\t\t\t") && !l.trim().is_empty())
        .count()
}

#[test]
fn two_cluster_sweep_produces_four_models() {
    let cl0 = parse(CLUSTER0_LOG);
    let cl1 = parse(CLUSTER1_LOG);
    assert_eq!(cl0.dataset.len(), 2);
    assert_eq!(cl1.dataset.len(), 2);
    assert_eq!(cl0.cores, 2);
    assert_eq!(cl1.cores, 1);

    let freq_data = vec![cl0.dataset, cl1.dataset];

    // PHASE 2: PER-CLUSTER TABLES FEED THE EFFICIENCY MODELS
    let mut eff_freq_data = Vec::new();
    for dataset in &freq_data {
        let tables = build_tables(dataset).unwrap();
        eff_freq_data.push(Dataset::from_records(tables.efficient_records));
    }

    // ONE MODEL FILE PER (KEY, VALUE) COMBINATION, FOUR DISTINCT NAMES
    let mut names = HashSet::new();
    for key in [KeyType::Frequency, KeyType::Capacity] {
        names.insert(model_file_name(key, ValueType::Power));
        names.insert(model_file_name(key, ValueType::Efficiency));
    }
    assert_eq!(names.len(), 4);

    // POWER MODELS: TWO PER-CORE BLOCKS (ONE PER CLUSTER), TWO ROWS EACH
    for key in [KeyType::Frequency, KeyType::Capacity] {
        let out = render_model(&freq_data, key, ValueType::Power, None).unwrap();
        assert_eq!(out.matches("CPU_COST_").count(), 2);
        assert_eq!(out.matches("CLUSTER_COST_").count(), 2);
        assert_eq!(data_rows(&out), 4);
    }

    // EFFICIENCY MODELS RENDER FROM THE EFFICIENT SUBSETS
    for key in [KeyType::Frequency, KeyType::Capacity] {
        let out = render_model(&eff_freq_data, key, ValueType::Efficiency, None).unwrap();
        assert_eq!(out.matches("CPU_COST_").count(), 2);
        assert_eq!(out.matches("CLUSTER_COST_").count(), 2);
    }
}

#[test]
fn capacity_scale_spans_clusters() {
    let freq_data = vec![parse(CLUSTER0_LOG).dataset, parse(CLUSTER1_LOG).dataset];
    let out = render_model(&freq_data, KeyType::Capacity, ValueType::Power, None).unwrap();

    // GLOBAL BEST TIMING IS CLUSTER 1'S 3500 US ENTRY -> CAPACITY 1024.
    // MIDRANGE POWERS: [70, 72, 74] -> 72
    assert!(out.contains("\t\t\t\t1024   72\n"));

    // CLUSTER 0'S ENTRIES SCALE AGAINST THE SAME REFERENCE:
    // 3500 * 1024 / 8000 = 448, 3500 * 1024 / 4000 = 896
    assert!(out.contains("\t\t\t\t 448   32\n"));
    assert!(out.contains("\t\t\t\t 896   62\n"));
}

#[test]
fn noise_lands_in_diagnostics_not_data() {
    let parser = ClusterParser::new().unwrap();
    let mut diag = Vec::new();
    let summary = parser.parse(CLUSTER1_LOG.as_bytes(), &mut diag).unwrap();
    let diag = String::from_utf8(diag).unwrap();

    assert!(diag.contains("Ignored stray power value: 5 mW"));
    assert!(diag.contains("Ignored unknown line: \"other_driver: interference\""));
    assert!(diag.contains("Frequency: 1200 kHz"));
    assert!(diag.contains("Midrange power usage: 22.0 mW"));
    assert!(diag.contains("Median performance: 7000.0 μs"));

    let records = summary.dataset.records();
    assert_eq!(records[0].power_mw, 22.0);
    assert_eq!(records[0].time_us, 7000.0);
    assert_eq!(records[1].power_mw, 72.0);
    assert_eq!(records[1].time_us, 3500.0);
}
