// EASGEN -- CPU FREQUENCY SWEEP ANALYZER AND EAS ENERGY MODEL GENERATOR
// TURNS RAW PER-CORE FREQUENCY/POWER/LATENCY SWEEP LOGS INTO CLEANED DATA
// TABLES AND SCHEDULER COST TABLES FOR ENERGY-AWARE SCHEDULING.
//
// PURE-RUST LIBRARY CRATE: PARSING, STATISTICS, TABLES, MODEL RENDERING.
// ZERO FILE I/O. THE BINARY (main.rs) HANDLES CLI AND THE FILESYSTEM.

pub mod dataset;
pub mod model;
pub mod parser;
pub mod stats;
