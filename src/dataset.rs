// PER-CLUSTER DATA TABLES
// TURNS A COMPLETED FREQUENCY TABLE INTO SORTED, FILTERED TEXT VIEWS:
//   1. SORTED BY FREQUENCY (REFERENCE TIMING = FIRST ROW'S TIME)
//   2. SORTED BY EFFICIENCY (POWER * TIME / REFERENCE TIME, ASCENDING)
//   3. EFFICIENT SUBSET: EFFICIENCY ORDER WITH FREQUENCY REGRESSIONS REMOVED
// PLUS A RAW C-STYLE DUMP OF EVERY RECORD IN DISCOVERY ORDER.
//
// RENDERING PRODUCES STRINGS; THE BINARY DECIDES WHERE THEY LAND.

use std::fmt::Write;

use anyhow::{ensure, Result};

use crate::parser::{Dataset, FreqRecord};

const STAT_TABLE_HEADER: &str =
    "Frequency      Power          Speed          Perf Ratio  Efficiency\n\n";

pub struct ClusterTables {
    pub c_table: String,
    pub by_khz: String,
    pub by_eff: String,
    pub efficient: String,
    // EFFICIENT SUBSET IN EFFICIENCY ORDER, FOR THE EFFICIENCY-BASED MODELS
    pub efficient_records: Vec<FreqRecord>,
}

pub fn build_tables(dataset: &Dataset) -> Result<ClusterTables> {
    ensure!(!dataset.is_empty(), "no usable frequency records in cluster");

    let c_table = render_c_table(dataset);

    let mut khz_sorted = dataset.records().to_vec();
    khz_sorted.sort_by_key(|r| r.freq_khz);

    // REFERENCE TIMING: THE LOWEST FREQUENCY'S (SLOWEST) TIME
    let first_time_us = khz_sorted[0].time_us;
    let by_khz = render_stat_table(&khz_sorted, first_time_us);

    let mut eff_sorted = dataset.records().to_vec();
    eff_sorted.sort_by(|a, b| {
        let ea = a.power_mw * a.time_us / first_time_us;
        let eb = b.power_mw * b.time_us / first_time_us;
        ea.total_cmp(&eb)
    });
    let by_eff = render_stat_table(&eff_sorted, first_time_us);

    let efficient_records = efficient_subset(&eff_sorted);
    let efficient = render_stat_table(&efficient_records, first_time_us);

    Ok(ClusterTables {
        c_table,
        by_khz,
        by_eff,
        efficient,
        efficient_records,
    })
}

// WALK IN EFFICIENCY ORDER AND DROP ANY ENTRY WHOSE FREQUENCY IS BELOW THE
// HIGHEST KEPT FREQUENCY: A LESS EFFICIENT, LOWER-FREQUENCY POINT BEHIND A
// HIGHER-FREQUENCY ONE IS REDUNDANT FOR SCHEDULER COST PURPOSES.
// SURVIVORS KEEP THEIR EFFICIENCY ORDER.
pub fn efficient_subset(eff_sorted: &[FreqRecord]) -> Vec<FreqRecord> {
    let mut kept = Vec::with_capacity(eff_sorted.len());
    let mut last_freq_khz = 0u64;

    for rec in eff_sorted {
        if rec.freq_khz < last_freq_khz {
            continue;
        }
        last_freq_khz = rec.freq_khz;
        kept.push(*rec);
    }

    kept
}

pub fn render_stat_table(records: &[FreqRecord], first_time_us: f64) -> String {
    let mut out = String::from(STAT_TABLE_HEADER);

    for rec in records {
        let perf_ratio = first_time_us / rec.time_us;
        let pwr_perf_ratio = rec.power_mw * rec.time_us / first_time_us;

        let _ = writeln!(
            out,
            "{:7} kHz\t {:8.1} mW\t {:9} μs\t {:.3} x\t {:5.1} mW/perf",
            rec.freq_khz, rec.power_mw, rec.time_us as u64, perf_ratio, pwr_perf_ratio
        );
    }

    out
}

// RAW DISCOVERY-ORDER DUMP FOR FURTHER ANALYSIS. A ROW WHOSE POWER IS
// LOWER THAN ITS PREDECESSOR'S GETS A DIAGNOSTIC COMMENT, NOT AN ERROR.
pub fn render_c_table(dataset: &Dataset) -> String {
    let mut out = String::from("\t/* Format: { freq_khz, power_mw, time_us } */\n");

    let mut last_power_mw: Option<f64> = None;
    for rec in dataset.records() {
        if let Some(last) = last_power_mw {
            if last > rec.power_mw {
                let _ = writeln!(
                    out,
                    "\t/* Power usage dropped: {:.1} -> {:.1} mW */",
                    last, rec.power_mw
                );
            }
        }

        let _ = writeln!(
            out,
            "\t{{ {:7}, {:6.1}, {:11.1} }},",
            rec.freq_khz, rec.power_mw, rec.time_us
        );
        last_power_mw = Some(rec.power_mw);
    }

    out
}
