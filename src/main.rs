// EASGEN -- CPU FREQUENCY SWEEP ANALYZER AND EAS ENERGY MODEL GENERATOR
//
// TWO-PHASE PIPELINE:
//   PHASE 1: PARSE EVERY SWEEP LOG (ONE PER CLUSTER) INTO A FREQUENCY TABLE
//   PHASE 2: TABLES, STATS, AND ENERGY MODELS OVER THE COMPLETED SET
// THE BARRIER IS MANDATORY: COST NORMALIZATION AND CAPACITY SCALING USE
// EXTREMA DEFINED ACROSS THE UNION OF ALL CLUSTERS.

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use flate2::read::GzDecoder;

use easgen::dataset::{self, ClusterTables};
use easgen::model::{self, KeyType, Normalization, ValueType};
use easgen::parser::{ClusterParser, Dataset};

const INFO_BEGIN: &str = "\x1b[1;32m";
const ERROR_BEGIN: &str = "\x1b[1;31m";
const COLOR_END: &str = "\x1b[0m";

#[derive(Parser)]
#[command(name = "easgen")]
#[command(about = "Analyze CPU frequency sweep logs and produce data tables, stats, and EAS core costs")]
struct Cli {
    // SWEEP LOGS TO ANALYZE, ONE PER CLUSTER (PLAIN TEXT OR GZIP)
    #[arg(short = 'i', long = "input-logs", num_args = 1.., required = true)]
    input_logs: Vec<PathBuf>,

    // DIRECTORY TO WRITE RESULTS TO (CREATED IF MISSING)
    #[arg(short = 'o', long = "output-dir")]
    output_dir: PathBuf,

    // OLD MIN EAS CORE COST: FIT NEW COSTS INTO AN EXISTING MODEL'S RANGE
    #[arg(short = 'n', long = "old-min-cost")]
    old_min_cost: Option<f64>,

    // OLD MAX EAS CORE COST
    #[arg(short = 'x', long = "old-max-cost")]
    old_max_cost: Option<f64>,
}

fn log_header(message: &str) {
    println!("{INFO_BEGIN}{message}{COLOR_END}");
}

fn log_item(message: &str) {
    println!("    • {message}");
}

fn log_error(cluster: usize, message: &str) {
    eprintln!("Cluster {cluster}: {ERROR_BEGIN}{message}{COLOR_END}");
}

// TRANSPARENT GZIP SUPPORT: CAPTURED KERNEL LOGS OFTEN ARRIVE COMPRESSED
fn open_log(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

fn write_cluster_tables(out_dir: &Path, cluster: usize, tables: &ClusterTables) -> Result<()> {
    let write = |name: &str, contents: &str| -> Result<()> {
        let path = out_dir.join(format!("cl{cluster}_{name}"));
        fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))
    };

    log_item("C data table");
    write("data.c", &tables.c_table)?;

    log_item("Stat table (sorted by frequency)");
    write("stats_by_khz.tsv", &tables.by_khz)?;

    log_item("Stat table (sorted by efficiency)");
    write("stats_by_eff.tsv", &tables.by_eff)?;

    log_item("Efficient frequency table");
    write("efficient_freqs.tsv", &tables.efficient)?;

    Ok(())
}

fn write_models(
    out_dir: &Path,
    tables: &[Dataset],
    value_type: ValueType,
    norm: Option<Normalization>,
    comment: &str,
) -> Result<()> {
    for key_type in [KeyType::Frequency, KeyType::Capacity] {
        log_item(&format!(
            "In ({}, {}) format{comment}",
            key_type.label(),
            value_type.label()
        ));

        let rendered = model::render_model(tables, key_type, value_type, norm)?;
        let path = out_dir.join(model::model_file_name(key_type, value_type));
        fs::write(&path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    fs::create_dir_all(&cli.output_dir).with_context(|| {
        format!("failed to create output directory {}", cli.output_dir.display())
    })?;

    let norm = match (cli.old_min_cost, cli.old_max_cost) {
        (Some(old_min), Some(old_max)) => Some(Normalization { old_min, old_max }),
        _ => None,
    };

    // PHASE 1: PARSE ALL. A BROKEN STREAM ONLY TAKES DOWN ITS OWN CLUSTER.
    log_header("Parsing data...");
    let mut parsed: Vec<(usize, Dataset)> = Vec::new();
    for (cluster, path) in cli.input_logs.iter().enumerate() {
        log_item(&format!("Cluster {cluster}"));

        let input = open_log(path)?;
        let diag_path = cli.output_dir.join(format!("cl{cluster}_parse.log"));
        let mut diag = File::create(&diag_path)
            .with_context(|| format!("failed to create {}", diag_path.display()))?;

        match ClusterParser::new()?.parse(input, &mut diag) {
            Ok(summary) => {
                println!("        > Found {} cores", summary.cores);
                parsed.push((cluster, summary.dataset));
            }
            Err(err) => {
                log_error(cluster, &format!("Error on line {}: {}", err.line_num, err.source));
            }
        }
    }

    // PHASE 2: TABLES AND MODELS OVER THE COMPLETED SET
    log_header("\nProcessing data...");
    let mut freq_data: Vec<Dataset> = Vec::new();
    let mut eff_freq_data: Vec<Dataset> = Vec::new();
    for (cluster, dataset) in parsed {
        println!("Cluster {cluster}");

        let tables = dataset::build_tables(&dataset)
            .with_context(|| format!("failed to process cluster {cluster}"))?;
        write_cluster_tables(&cli.output_dir, cluster, &tables)?;

        eff_freq_data.push(Dataset::from_records(tables.efficient_records));
        freq_data.push(dataset);
    }

    log_header("\nGenerating power-based EAS energy models...");
    write_models(&cli.output_dir, &freq_data, ValueType::Power, norm, "")?;

    log_header("\nGenerating efficiency-based EAS energy models...");
    write_models(
        &cli.output_dir,
        &eff_freq_data,
        ValueType::Efficiency,
        norm,
        " (for use with efficient frequency table)",
    )?;

    Ok(())
}
