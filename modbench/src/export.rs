//! Summary and detail exporters.
//!
//! Summaries are written as CSV (one flat row per run) and pretty JSON; detailed logs are one CSV
//! row per request. Readers are provided for the summary formats.
use crate::matrix::MatrixReport;
use crate::recorder::OutcomeSequence;
use chrono::Local;
use modbench_core::{ErrorBreakdown, ErrorKind, LatencyStats, OutputConfig, RegisterType, SummaryRecord};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};

mod table;

pub use table::SummaryTable;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error while exporting: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Flat CSV form of a [`SummaryRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRow {
    pub frequency_hz: f64,
    pub register_count: u16,
    pub start_address: u16,
    pub register_type: RegisterType,
    pub duration_secs: f64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub empty_run: bool,
    pub latency_mean_ms: Option<f64>,
    pub latency_median_ms: Option<f64>,
    pub latency_min_ms: Option<f64>,
    pub latency_max_ms: Option<f64>,
    pub latency_stddev_ms: Option<f64>,
    pub latency_samples: u64,
    pub dropout_count: u64,
    pub max_consecutive_failures: u64,
    pub timeout_errors: u64,
    pub connection_errors: u64,
    pub protocol_errors: u64,
    pub fatal_error: Option<String>,
}

impl From<&SummaryRecord> for SummaryRow {
    fn from(record: &SummaryRecord) -> Self {
        let latency = record.latency.as_ref();
        Self {
            frequency_hz: record.frequency_hz,
            register_count: record.register_count,
            start_address: record.start_address,
            register_type: record.register_type,
            duration_secs: record.duration_secs,
            total_requests: record.total_requests,
            successful_requests: record.successful_requests,
            failed_requests: record.failed_requests,
            success_rate: record.success_rate,
            empty_run: record.empty_run,
            latency_mean_ms: latency.map(|l| l.mean_ms),
            latency_median_ms: latency.map(|l| l.median_ms),
            latency_min_ms: latency.map(|l| l.min_ms),
            latency_max_ms: latency.map(|l| l.max_ms),
            latency_stddev_ms: latency.map(|l| l.stddev_ms),
            latency_samples: latency.map(|l| l.samples).unwrap_or(0),
            dropout_count: record.dropout_count,
            max_consecutive_failures: record.max_consecutive_failures,
            timeout_errors: record.errors.timeout,
            connection_errors: record.errors.connection,
            protocol_errors: record.errors.protocol,
            fatal_error: record.fatal_error.clone(),
        }
    }
}

impl From<SummaryRow> for SummaryRecord {
    fn from(row: SummaryRow) -> Self {
        let latency = match (
            row.latency_mean_ms,
            row.latency_median_ms,
            row.latency_min_ms,
            row.latency_max_ms,
            row.latency_stddev_ms,
        ) {
            (Some(mean_ms), Some(median_ms), Some(min_ms), Some(max_ms), Some(stddev_ms)) => {
                Some(LatencyStats {
                    mean_ms,
                    median_ms,
                    min_ms,
                    max_ms,
                    stddev_ms,
                    samples: row.latency_samples,
                })
            }
            _ => None,
        };

        Self {
            frequency_hz: row.frequency_hz,
            register_count: row.register_count,
            start_address: row.start_address,
            register_type: row.register_type,
            duration_secs: row.duration_secs,
            total_requests: row.total_requests,
            successful_requests: row.successful_requests,
            failed_requests: row.failed_requests,
            success_rate: row.success_rate,
            empty_run: row.empty_run,
            latency,
            dropout_count: row.dropout_count,
            max_consecutive_failures: row.max_consecutive_failures,
            errors: ErrorBreakdown {
                timeout: row.timeout_errors,
                connection: row.connection_errors,
                protocol: row.protocol_errors,
            },
            fatal_error: row.fatal_error,
        }
    }
}

/// One request in the detailed log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailRow {
    pub frequency_hz: f64,
    pub register_count: u16,
    /// Wall-clock issue time, seconds since the Unix epoch.
    pub timestamp: f64,
    pub offset_ms: f64,
    pub latency_ms: f64,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
}

impl DetailRow {
    fn rows(sequence: &OutcomeSequence) -> impl Iterator<Item = DetailRow> + '_ {
        let params = sequence.params();
        let started = sequence.started_at().timestamp_millis() as f64 / 1e3;
        sequence.outcomes().iter().map(move |outcome| DetailRow {
            frequency_hz: params.frequency_hz,
            register_count: params.register_count,
            timestamp: started + outcome.offset.as_secs_f64(),
            offset_ms: outcome.offset.as_nanos() as f64 / 1e6,
            latency_ms: outcome.latency_ms(),
            success: outcome.is_success(),
            error_kind: outcome.error_kind(),
            error_message: outcome.error_detail().map(str::to_string),
        })
    }
}

pub fn write_summary_csv<W: Write>(writer: W, records: &[SummaryRecord]) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    for record in records {
        writer.serialize(SummaryRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_summary_csv<R: Read>(reader: R) -> Result<Vec<SummaryRecord>, ExportError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = vec![];
    for row in reader.deserialize::<SummaryRow>() {
        records.push(row?.into());
    }
    Ok(records)
}

pub fn write_summary_json<W: Write>(
    writer: W,
    records: &[SummaryRecord],
) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(writer, records)?;
    Ok(())
}

pub fn read_summary_json<R: Read>(reader: R) -> Result<Vec<SummaryRecord>, ExportError> {
    Ok(serde_json::from_reader(reader)?)
}

pub fn write_details_csv<W: Write>(
    writer: W,
    sequences: &[OutcomeSequence],
) -> Result<(), ExportError> {
    let mut writer = csv::Writer::from_writer(writer);
    for row in sequences.iter().flat_map(DetailRow::rows) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes a [`MatrixReport`] into timestamped files under one directory.
#[derive(Debug, Clone)]
pub struct Exporter {
    directory: PathBuf,
    save_summary: bool,
    save_details: bool,
}

impl Exporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            save_summary: true,
            save_details: true,
        }
    }

    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.output_directory)
            .save_summary(config.save_summary_stats)
            .save_details(config.save_detailed_logs)
    }

    pub fn save_summary(mut self, enabled: bool) -> Self {
        self.save_summary = enabled;
        self
    }

    pub fn save_details(mut self, enabled: bool) -> Self {
        self.save_details = enabled;
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Export using the current local time as the file stamp.
    pub fn export(&self, report: &MatrixReport) -> Result<Vec<PathBuf>, ExportError> {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        self.export_with_stamp(report, &stamp)
    }

    /// Export and return the paths written, in write order.
    pub fn export_with_stamp(
        &self,
        report: &MatrixReport,
        stamp: &str,
    ) -> Result<Vec<PathBuf>, ExportError> {
        fs::create_dir_all(&self.directory)?;
        let mut written = vec![];

        if self.save_summary {
            let path = self.directory.join(format!("test_stats_{stamp}.csv"));
            write_summary_csv(BufWriter::new(File::create(&path)?), &report.summaries)?;
            written.push(path);

            let path = self.directory.join(format!("test_stats_{stamp}.json"));
            let mut file = BufWriter::new(File::create(&path)?);
            write_summary_json(&mut file, &report.summaries)?;
            file.flush()?;
            written.push(path);
        }

        if self.save_details {
            if report.outcomes.is_empty() {
                warn!("Detailed logs requested but no outcomes were captured");
            } else {
                let path = self.directory.join(format!("detailed_results_{stamp}.csv"));
                write_details_csv(BufWriter::new(File::create(&path)?), &report.outcomes)?;
                written.push(path);
            }
        }

        for path in &written {
            info!("Saved {}", path.display());
        }
        Ok(written)
    }
}
