mod utils;
#[allow(unused)]
use utils::*;

use modbench::export::{read_summary_csv, read_summary_json, DetailRow};
use modbench::prelude::*;
use modbench_core::{ErrorKind, OutputConfig};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn files_with_prefix(dir: &Path, prefix: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut found = vec![];
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix));
        if matches {
            found.push(path);
        }
    }
    Ok(found)
}

fn assert_same(a: &SummaryRecord, b: &SummaryRecord) {
    let close = |x: f64, y: f64| (x - y).abs() <= 1e-9 * x.abs().max(1.);
    assert_eq!(a.frequency_hz, b.frequency_hz);
    assert_eq!(a.register_count, b.register_count);
    assert_eq!(a.total_requests, b.total_requests);
    assert_eq!(a.failed_requests, b.failed_requests);
    assert_eq!(a.dropout_count, b.dropout_count);
    assert_eq!(a.max_consecutive_failures, b.max_consecutive_failures);
    assert_eq!(a.errors, b.errors);
    assert_eq!(a.fatal_error, b.fatal_error);
    assert!(close(a.success_rate, b.success_rate));
    match (&a.latency, &b.latency) {
        (Some(x), Some(y)) => {
            assert!(close(x.mean_ms, y.mean_ms));
            assert!(close(x.median_ms, y.median_ms));
            assert!(close(x.stddev_ms, y.stddev_ms));
            assert_eq!(x.samples, y.samples);
        }
        (None, None) => {}
        _ => panic!("latency presence differs"),
    }
}

#[tokio::test(start_paused = true)]
async fn exported_files_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("results");
    let connector = steady_device(3)
        .pattern("SSTTS")
        .refuse_connection(3)
        .build();

    let report = MatrixRunner::new(&connector, base(Duration::from_secs(1)))
        .frequencies(&[4., 8.])
        .register_counts(&[10, 20])
        .capture_outcomes(true)
        .progress(())
        .run()
        .await;
    assert!(report.summaries[2].is_fatal());
    assert_eq!(report.outcomes.len(), 3);

    let written = Exporter::new(&out).export(&report)?;
    assert_eq!(written.len(), 3);

    let csv_files = files_with_prefix(&out, "test_stats_")?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "csv"))
        .collect::<Vec<_>>();
    assert_eq!(csv_files.len(), 1);
    let from_csv = read_summary_csv(File::open(&csv_files[0])?)?;

    let json_files = files_with_prefix(&out, "test_stats_")?
        .into_iter()
        .filter(|p| p.extension().is_some_and(|e| e == "json"))
        .collect::<Vec<_>>();
    let from_json = read_summary_json(File::open(&json_files[0])?)?;

    assert_eq!(from_csv.len(), 4);
    assert_eq!(from_json.len(), 4);
    for ((original, csv), json) in report.summaries.iter().zip(&from_csv).zip(&from_json) {
        assert_same(original, csv);
        assert_same(original, json);
    }

    let details = files_with_prefix(&out, "detailed_results_")?;
    assert_eq!(details.len(), 1);
    let rows: Vec<DetailRow> = csv::Reader::from_path(&details[0])?
        .deserialize()
        .collect::<Result<_, _>>()?;

    let expected: usize = report.outcomes.iter().map(|s| s.len()).sum();
    assert_eq!(rows.len(), expected);
    assert_eq!(rows.len(), 4 + 4 + 8);

    // The first run saw the scripted pair of timeouts.
    let kinds: Vec<_> = rows.iter().take(4).map(|r| r.error_kind).collect();
    assert_eq!(
        kinds,
        vec![None, None, Some(ErrorKind::Timeout), Some(ErrorKind::Timeout)]
    );
    assert!(rows
        .iter()
        .filter(|r| !r.success)
        .all(|r| r.error_message.is_some()));
    assert!(rows.windows(2).take(3).all(|w| w[1].timestamp > w[0].timestamp));

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn config_drives_session_and_outputs() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("out");
    let config_path = dir.path().join("config.yaml");
    fs::write(
        &config_path,
        format!(
            r#"
modbus:
  host: "127.0.0.1"
  timeout: 0.05
registers:
  start_address: 40011
  type: holding
test:
  frequencies: [5]
  register_counts: [1, 125]
  duration_minutes: 0.5
output:
  output_directory: "{}"
  save_detailed_logs: false
"#,
            out.display()
        ),
    )?;

    let config = BenchConfig::load(&config_path)?;
    let base = config.base_parameters()?;
    assert_eq!(base.start_address, 10);
    assert_eq!(base.duration, Duration::from_secs(30));

    let connector = steady(1);
    let report = MatrixRunner::new(&connector, base)
        .frequencies(&config.test.frequencies)
        .register_counts(&config.test.register_counts)
        .capture_outcomes(config.output.save_detailed_logs)
        .progress(())
        .run()
        .await;

    assert_eq!(report.summaries.len(), 2);
    assert!(report.summaries.iter().all(|s| s.total_requests == 150));
    assert!(report.outcomes.is_empty());

    let exporter = Exporter::from_config(&config.output);
    let written = exporter.export(&report)?;
    assert_eq!(written.len(), 2);
    assert!(files_with_prefix(&out, "detailed_results_")?.is_empty());

    let defaults = Exporter::from_config(&OutputConfig::default());
    assert_eq!(defaults.directory(), Path::new("results"));

    let table = SummaryTable::new(&report.summaries).to_string();
    assert_eq!(table.lines().count(), 4);
    assert!(table.contains("125"));

    Ok(())
}
