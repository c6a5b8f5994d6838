// SWEEP LOG PARSER
// ONE STATE MACHINE PER INPUT STREAM (= PER CLUSTER). CONSUMES TEXT LINES,
// PRODUCES ONE (POWER, TIME) RECORD PER OBSERVED FREQUENCY.
//
// THE LOGS ARE NOISY AND INTERLEAVED: EVERY CORE PRINTS ITS OWN START LINE
// FOR A SHARED FREQUENCY PHASE, POWER SAMPLING RUNS ON AN INDEPENDENT
// CADENCE AND STRADDLES PHASE BOUNDARIES, AND OTHER DRIVERS MAY WRITE INTO
// THE SAME LOG. ANOMALIES ARE DIAGNOSED AND SKIPPED, NEVER FATAL.
//
// A GENUINE FAULT (UNPARSEABLE FIELD, DEGENERATE SAMPLE SET, DIAGNOSTIC
// SINK ERROR) ABORTS ONLY ITS OWN STREAM AND CARRIES THE 1-BASED LINE
// NUMBER AT WHICH IT OCCURRED.

use std::fmt;
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use regex::Regex;

use crate::stats;

// LINE GRAMMARS. MARKER TEXT SELECTS THE KIND, THE REGEX VALIDATES IT.
const START_PATTERN: &str = r"START: CPU(\d+): \[\s*(\d+) kHz\]";
const POWER_PATTERN: &str = r"power usage \[\s*(\d+) mW\]";
const STOP_PATTERN: &str = r"STOP: CPU(\d+): \[\s*(\d+) kHz\] \[\s*(\d+) us\]";

// REDUCED REPRESENTATIVE SAMPLE FOR ONE FREQUENCY ON ONE CLUSTER
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FreqRecord {
    pub freq_khz: u64,
    pub power_mw: f64,
    pub time_us: f64,
}

// DISCOVERY-ORDERED FREQUENCY TABLE FOR ONE CLUSTER.
// AT MOST ONE RECORD PER FREQUENCY: RE-RETIRING A FREQUENCY OVERWRITES
// THE EXISTING RECORD IN PLACE, KEEPING ITS ORIGINAL POSITION.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    records: Vec<FreqRecord>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<FreqRecord>) -> Self {
        let mut ds = Self::new();
        for rec in records {
            ds.insert(rec);
        }
        ds
    }

    pub fn insert(&mut self, rec: FreqRecord) {
        match self.records.iter_mut().find(|r| r.freq_khz == rec.freq_khz) {
            Some(existing) => *existing = rec,
            None => self.records.push(rec),
        }
    }

    pub fn records(&self) -> &[FreqRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// FATAL PER-STREAM FAULT. THE LINE COUNTER IS OWNED BY THE STREAM'S PARSE,
// SO THE REPORTED NUMBER CANNOT BE POLLUTED BY OTHER STREAMS.
#[derive(Debug)]
pub struct StreamError {
    pub line_num: usize,
    pub source: anyhow::Error,
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error on line {}: {}", self.line_num, self.source)
    }
}

impl std::error::Error for StreamError {}

#[derive(Debug)]
pub struct ParseSummary {
    pub dataset: Dataset,
    // APPARENT CORE COUNT (START LINES SEEN BEFORE THE FIRST RECORDED STOP).
    // DIAGNOSTIC ONLY.
    pub cores: u32,
}

pub struct ClusterParser {
    start_re: Regex,
    power_re: Regex,
    stop_re: Regex,

    dataset: Dataset,
    cur_freq: u64, // 0 = NO FREQUENCY ACTIVE
    power_samples: Vec<f64>,
    time_samples: Vec<f64>,
    benching: bool,
    cores: u32,
    count_cores: bool,
}

impl ClusterParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            start_re: Regex::new(START_PATTERN)?,
            power_re: Regex::new(POWER_PATTERN)?,
            stop_re: Regex::new(STOP_PATTERN)?,
            dataset: Dataset::new(),
            cur_freq: 0,
            power_samples: Vec::new(),
            time_samples: Vec::new(),
            benching: false,
            cores: 0,
            count_cores: true,
        })
    }

    // CONSUME ONE STREAM TO COMPLETION. DIAGNOSTICS GO TO `diag`
    // (THE PER-CLUSTER PARSE LOG). STREAM END RETIRES THE LAST FREQUENCY.
    pub fn parse<R: BufRead, W: Write>(
        mut self,
        input: R,
        diag: &mut W,
    ) -> Result<ParseSummary, StreamError> {
        let mut line_num = 0usize;

        for line in input.lines() {
            line_num += 1;
            let result = line
                .context("failed to read input line")
                .and_then(|l| self.consume_line(&l, diag));
            if let Err(source) = result {
                return Err(StreamError { line_num, source });
            }
        }

        if let Err(source) = self.finish_freq(diag) {
            return Err(StreamError { line_num, source });
        }

        Ok(ParseSummary {
            dataset: self.dataset,
            cores: self.cores,
        })
    }

    fn consume_line<W: Write>(&mut self, line: &str, diag: &mut W) -> Result<()> {
        if line.contains("START") {
            // A MALFORMED LINE TERMINATES PROCESSING OF THAT LINE ONLY
            let caps = match self.start_re.captures(line) {
                Some(c) => c,
                None => {
                    writeln!(diag, "  * Ignoring malformed START line: \"{line}\"")?;
                    return Ok(());
                }
            };
            let freq_khz: u64 = caps[2].parse().context("bad frequency field")?;

            if self.count_cores {
                self.cores += 1;
            }

            // EACH CORE PRINTS ITS OWN START FOR A SHARED FREQUENCY PHASE
            if freq_khz == self.cur_freq {
                return Ok(());
            }

            // A NEW FREQUENCY MEANS THE PREVIOUS ONE IS DONE FOR GOOD
            self.finish_freq(diag)?;

            self.cur_freq = freq_khz;
            self.power_samples.clear();
            self.time_samples.clear();
            self.benching = true;

            writeln!(diag, "\nFrequency: {} kHz", self.cur_freq)?;
        } else if line.contains("power usage") {
            let caps = match self.power_re.captures(line) {
                Some(c) => c,
                None => {
                    writeln!(diag, "  * Ignoring malformed power usage line: \"{line}\"")?;
                    return Ok(());
                }
            };
            let power_mw: u64 = caps[1].parse().context("bad power field")?;

            if self.cur_freq != 0 && self.benching {
                self.power_samples.push(power_mw as f64);
            } else {
                // POWER READINGS COME FROM A SEPARATE THREAD AND MAY
                // STRADDLE PHASE BOUNDARIES. EXPECTED, NOT AN ERROR.
                writeln!(diag, "  * Ignored stray power value: {power_mw} mW")?;
            }
        } else if line.contains("STOP") {
            let caps = match self.stop_re.captures(line) {
                Some(c) => c,
                None => {
                    writeln!(diag, "  * Ignoring malformed STOP line: \"{line}\"")?;
                    return Ok(());
                }
            };
            let freq_khz: u64 = caps[2].parse().context("bad frequency field")?;
            let time_us: u64 = caps[3].parse().context("bad time field")?;

            if self.cur_freq == 0 {
                writeln!(diag, "  * Ignored stray performance value: {time_us} μs")?;
                writeln!(diag, "      * Log may be incomplete")?;
            } else if freq_khz != self.cur_freq {
                writeln!(
                    diag,
                    "  * Ignored performance value ({time_us} μs) for {freq_khz} kHz"
                )?;
                writeln!(diag, "      * There may be synchronization issues")?;
            } else {
                // FIRST CORE TO STOP DEFINES THE CANONICAL TIMING.
                // FURTHER POWER SAMPLES FOR THIS FREQUENCY ARE STRAY.
                self.count_cores = false;
                self.time_samples.push(time_us as f64);
                self.benching = false;
            }
        } else {
            // ANOTHER DRIVER WROTE INTO THE LOG
            writeln!(diag, "  * Ignored unknown line: \"{line}\"")?;
            writeln!(diag, "      * Proper isolation is necessary for good results")?;
        }

        Ok(())
    }

    // RETIRE THE ACTIVE FREQUENCY: REDUCE ITS SAMPLE LISTS INTO ONE RECORD.
    // INVOKED ON EVERY FREQUENCY SWITCH AND ONCE MORE AT STREAM END.
    // A FREQUENCY WITH NO USABLE SAMPLES IS DROPPED, NOT ZERO-FILLED.
    fn finish_freq<W: Write>(&mut self, diag: &mut W) -> Result<()> {
        if self.cur_freq == 0 {
            return Ok(());
        }

        if !self.power_samples.is_empty() && !self.time_samples.is_empty() {
            let power_mw = stats::midrange(&self.power_samples)?;
            let time_us = stats::median(&self.time_samples)?;

            writeln!(diag, "  - Midrange power usage: {power_mw:.1} mW")?;
            writeln!(diag, "  - Median performance: {time_us:.1} μs")?;

            self.dataset.insert(FreqRecord {
                freq_khz: self.cur_freq,
                power_mw,
                time_us,
            });
        } else {
            writeln!(diag, "  * Ignored incomplete frequency: {} kHz", self.cur_freq)?;
        }

        Ok(())
    }
}
