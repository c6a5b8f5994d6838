// EAS ENERGY MODEL GENERATOR
// DERIVES SCHEDULER COST TABLES FROM THE PER-CLUSTER FREQUENCY TABLES AND
// RENDERS THEM AS A DEVICE-TREE FRAGMENT.
//
// KEYS:   RAW FREQUENCY, OR RELATIVE CAPACITY (1024 = FASTEST TIMING
//         OBSERVED ACROSS ALL CLUSTERS).
// VALUES: RAW POWER, OR RELATIVE EFFICIENCY COST (1024 = LEAST EFFICIENT
//         POINT ACROSS ALL CLUSTERS).
//
// GLOBAL REFERENCES SPAN EVERY CLUSTER'S ENTRIES, WHICH IS WHY MODEL
// GENERATION ONLY RUNS AFTER ALL STREAMS HAVE BEEN PARSED.

use std::fmt::Write;

use anyhow::{ensure, Result};

use crate::parser::{Dataset, FreqRecord};

pub const SCHED_CAPACITY_SCALE: f64 = 1024.0;

// FIXED PER-CORE CAPACITY HEADER: UNIFORM CAPACITY FOR 8 CORES
const NR_CPUS: usize = 8;

// DEVICE-TREE LITERAL TEMPLATES. INDENTATION AND NESTING ARE PART OF THE
// OUTPUT FORMAT.
const DT_ROOT_HEADER: &str = "\n/ {\n";
const DT_ROOT_FOOTER: &str = "};\n";
const DT_CPU_CORE_FOOTER: &str = "};\n";
const DT_EM_HEADER: &str = "\tenergy_costs: energy-costs {\n\t\tcompatible = \"sched-energy\";\n";
const DT_EM_COSTS_FOOTER: &str =
    "\t\t\t>;\n\t\t\tidle-cost-data = <\n\t\t\t\t\n\t\t\t>;\n\t\t};\n";
const DT_EM_FOOTER: &str = "\t}; /* energy-costs */\n";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyType {
    Frequency,
    Capacity,
}

impl KeyType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Frequency => "freq",
            Self::Capacity => "cap",
        }
    }

    // RENDERED FIELD WIDTH: FREQUENCIES RUN TO 7 DIGITS, CAPACITIES TO 4
    fn width(self) -> usize {
        match self {
            Self::Frequency => 7,
            Self::Capacity => 4,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueType {
    Power,
    Efficiency,
}

impl ValueType {
    pub fn label(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Efficiency => "eff",
        }
    }
}

// OPTIONAL AFFINE RESCALE: FIT THE NEW COSTS INTO THE NUMERIC RANGE OF A
// PREVIOUSLY PUBLISHED COST TABLE WITHOUT ALTERING RELATIVE ORDERING.
#[derive(Clone, Copy, Debug)]
pub struct Normalization {
    pub old_min: f64,
    pub old_max: f64,
}

pub fn model_file_name(key_type: KeyType, value_type: ValueType) -> String {
    format!(
        "eas_energy_model_{}-{}.dtsi",
        key_type.label(),
        value_type.label()
    )
}

pub fn render_model(
    tables: &[Dataset],
    key_type: KeyType,
    value_type: ValueType,
    norm: Option<Normalization>,
) -> Result<String> {
    let all: Vec<&FreqRecord> = tables.iter().flat_map(|t| t.records()).collect();
    ensure!(!all.is_empty(), "energy model needs at least one frequency record");

    // FASTEST TIMING ACROSS ALL CLUSTERS: CAPACITY AND EFFICIENCY REFERENCE
    let best_time_us = all
        .iter()
        .map(|r| r.time_us)
        .fold(f64::INFINITY, f64::min);

    // LEAST EFFICIENT POINT ANCHORS THE TOP OF THE COST SCALE
    let max_mw_perf = all
        .iter()
        .map(|r| r.power_mw * r.time_us / best_time_us)
        .fold(f64::NEG_INFINITY, f64::max);

    // NORMALIZATION IS ANCHORED ON RAW POWER EXTREMA, NOT DERIVED VALUES
    let (factor, base) = match norm {
        Some(n) => {
            let new_min_power = all
                .iter()
                .map(|r| r.power_mw)
                .fold(f64::INFINITY, f64::min);
            let new_max_power = all
                .iter()
                .map(|r| r.power_mw)
                .fold(f64::NEG_INFINITY, f64::max);
            ensure!(
                new_max_power > new_min_power,
                "cannot normalize: all entries share one power value"
            );
            let factor = (n.old_max - n.old_min) / (new_max_power - new_min_power);
            (factor, n.old_min - factor * new_min_power)
        }
        None => (1.0, 0.0),
    };

    let mut out = String::new();
    render_cpu_caps(&mut out);

    out.push_str(DT_ROOT_HEADER);
    out.push_str(DT_EM_HEADER);

    // PER-CORE COST BLOCKS, ONE PER CLUSTER, TABLE ITERATION ORDER
    for (cluster, table) in tables.iter().enumerate() {
        push_costs_header(&mut out, "CPU", "core", cluster);

        for record in table.records() {
            let key = match key_type {
                KeyType::Frequency => record.freq_khz as f64,
                KeyType::Capacity => best_time_us * SCHED_CAPACITY_SCALE / record.time_us,
            };

            let value = match value_type {
                ValueType::Power => record.power_mw,
                ValueType::Efficiency => {
                    let mw_perf = record.power_mw * record.time_us / best_time_us;
                    max_mw_perf * SCHED_CAPACITY_SCALE / mw_perf
                }
            };
            let value = value * factor + base;

            let _ = writeln!(
                out,
                "\t\t\t\t{:width$} {:4.0}",
                key as u64,
                value,
                width = key_type.width()
            );
        }

        out.push_str(DT_EM_COSTS_FOOTER);
    }

    // PER-CLUSTER COST BLOCKS: STRUCTURAL PLACEHOLDERS ONLY.
    // CLUSTER-LEVEL AGGREGATE COSTS ARE NOT COMPUTED.
    for cluster in 0..tables.len() {
        push_costs_header(&mut out, "CLUSTER", "cluster", cluster);
        out.push_str(DT_EM_COSTS_FOOTER);
    }

    out.push_str(DT_EM_FOOTER);
    out.push_str(DT_ROOT_FOOTER);

    Ok(out)
}

fn render_cpu_caps(out: &mut String) {
    for cpu in 0..NR_CPUS {
        let _ = write!(out, "\n&CPU{cpu} {{\n");
        out.push_str("\tcapacity-dmips-mhz = <1024>;\n");
        out.push_str(DT_CPU_CORE_FOOTER);
    }
}

fn push_costs_header(out: &mut String, prefix: &str, kind: &str, cluster: usize) {
    let _ = write!(
        out,
        "\n\t\t{prefix}_COST_{cluster}: {kind}-cost{cluster} {{\n\t\t\tbusy-cost-data = <\n"
    );
}
