use modbench_core::SummaryRecord;
use std::fmt;

const HEADERS: [&str; 8] = [
    "Freq (Hz)",
    "Registers",
    "Success %",
    "Avg Lat (ms)",
    "Med Lat (ms)",
    "Max Lat (ms)",
    "Dropouts",
    "Max Fails",
];

/// Fixed-width text table of summaries, one row per run.
pub struct SummaryTable<'a> {
    records: &'a [SummaryRecord],
}

impl<'a> SummaryTable<'a> {
    pub fn new(records: &'a [SummaryRecord]) -> Self {
        Self { records }
    }

    fn cells(record: &SummaryRecord) -> [String; 8] {
        let latency = |f: fn(&modbench_core::LatencyStats) -> f64| {
            record
                .latency
                .as_ref()
                .map(|l| format!("{:.2}", f(l)))
                .unwrap_or_else(|| "-".to_string())
        };

        let success = if record.is_fatal() {
            "FAILED".to_string()
        } else if record.empty_run {
            "-".to_string()
        } else {
            format!("{:.1}", record.success_percent())
        };

        [
            format!("{}", record.frequency_hz),
            record.register_count.to_string(),
            success,
            latency(|l| l.mean_ms),
            latency(|l| l.median_ms),
            latency(|l| l.max_ms),
            record.dropout_count.to_string(),
            record.max_consecutive_failures.to_string(),
        ]
    }
}

impl fmt::Display for SummaryTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<_> = self.records.iter().map(Self::cells).collect();

        let mut widths = HEADERS.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }

        let line = |f: &mut fmt::Formatter<'_>, cells: &[&str]| -> fmt::Result {
            let mut first = true;
            for (cell, width) in cells.iter().zip(widths) {
                if !first {
                    f.write_str(" | ")?;
                }
                first = false;
                write!(f, "{cell:>width$}")?;
            }
            writeln!(f)
        };

        line(f, &HEADERS)?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let rule: Vec<&str> = rule.iter().map(String::as_str).collect();
        f.write_str(&rule.join("-+-"))?;
        writeln!(f)?;

        for row in &rows {
            let cells: Vec<&str> = row.iter().map(String::as_str).collect();
            line(f, &cells)?;
        }
        Ok(())
    }
}
