mod utils;
#[allow(unused)]
use utils::*;

use modbench::prelude::*;
use modbench::run_all;
use std::time::Duration;

#[tokio::test(start_paused = true)]
#[ntest::timeout(5_000)]
async fn full_matrix_in_enumeration_order() {
    let connector = steady(2);

    let report = MatrixRunner::new(&connector, base(Duration::from_secs(2)))
        .frequencies(&[2., 10.])
        .register_counts(&[1, 50])
        .progress(())
        .run()
        .await;

    let keys: Vec<_> = report
        .summaries
        .iter()
        .map(|s| (s.frequency_hz, s.register_count))
        .collect();
    assert_eq!(keys, vec![(2., 1), (2., 50), (10., 1), (10., 50)]);

    let totals: Vec<_> = report.summaries.iter().map(|s| s.total_requests).collect();
    assert_eq!(totals, vec![4, 4, 20, 20]);

    for summary in &report.summaries {
        assert_eq!(summary.success_rate, 1.);
        assert_eq!(summary.dropout_count, 0);
        assert_eq!(summary.start_address, 100);
        assert_eq!(summary.register_type, RegisterType::Holding);
        let latency = summary.latency.as_ref().unwrap();
        assert_eq!(latency.mean_ms, 2.);
        assert_eq!(latency.stddev_ms, 0.);
    }

    assert_eq!(connector.connects(), 4);
    assert_eq!(connector.served(), 48);
}

#[tracing_test::traced_test]
#[tokio::test(start_paused = true)]
async fn refused_connection_only_fails_its_own_run() {
    let connector = steady_device(1).refuse_connection(2).build();

    let summaries = run_all(&connector, &[5.], &[1, 2, 3], base(Duration::from_secs(1))).await;

    assert_eq!(summaries.len(), 3);
    assert!(!summaries[0].is_fatal());
    assert!(!summaries[2].is_fatal());
    assert_eq!(summaries[2].total_requests, 5);

    let fatal = &summaries[1];
    assert!(fatal.is_fatal());
    assert!(fatal.empty_run);
    assert_eq!(fatal.total_requests, 0);
    assert_eq!(fatal.success_rate, 0.);
    assert!(fatal.latency.is_none());
    assert!(fatal
        .fatal_error
        .as_deref()
        .unwrap()
        .contains("connection refused"));

    assert!(logs_contain("Test 2/3"));
    assert!(logs_contain("could not start"));
}

#[tokio::test(start_paused = true)]
async fn scripted_failures_become_dropouts() {
    let connector = steady_device(1).pattern("STTSTTTS").build();

    let summaries = run_all(&connector, &[10.], &[4], base(Duration::from_secs(1))).await;
    let summary = &summaries[0];

    assert_eq!(summary.total_requests, 10);
    assert_eq!(summary.failed_requests, 5);
    assert_eq!(summary.success_rate, 0.5);
    assert_eq!(summary.dropout_count, 2);
    assert_eq!(summary.max_consecutive_failures, 3);
    assert_eq!(summary.errors.timeout, 5);

    // Only successes contribute to latency.
    let latency = summary.latency.as_ref().unwrap();
    assert_eq!(latency.samples, 5);
    assert_eq!(latency.max_ms, 1.);
}

#[tokio::test(start_paused = true)]
async fn dropped_connection_fails_rest_of_run() {
    let connector = steady_device(1).pattern("SSD").build();

    let summaries = run_all(&connector, &[10.], &[1], base(Duration::from_secs(1))).await;
    let summary = &summaries[0];

    assert!(!summary.is_fatal());
    assert_eq!(summary.total_requests, 10);
    assert_eq!(summary.successful_requests, 2);
    assert_eq!(summary.errors.connection, 8);
    assert_eq!(summary.dropout_count, 1);
    assert_eq!(summary.max_consecutive_failures, 8);
}

#[tokio::test(start_paused = true)]
async fn rate_ceiling_shows_up_as_protocol_errors() {
    let connector = steady_device(1).max_rps(1).build();

    let summaries = run_all(&connector, &[20.], &[1], base(Duration::from_secs(1))).await;
    let summary = &summaries[0];

    assert_eq!(summary.total_requests, 20);
    assert!(summary.successful_requests >= 1);
    assert!(summary.failed_requests > 0);
    assert_eq!(summary.errors.protocol, summary.failed_requests);
}

#[tokio::test(start_paused = true)]
async fn invalid_register_count_is_degenerate() {
    let connector = steady(1);

    let summaries = run_all(&connector, &[1.], &[126, 125], base(Duration::from_secs(1))).await;

    assert!(summaries[0].is_fatal());
    assert!(!summaries[1].is_fatal());
    // The invalid combination never connected.
    assert_eq!(connector.connects(), 1);
}

#[tokio::test(start_paused = true)]
#[ntest::timeout(5_000)]
async fn unrepresentable_frequencies_are_degenerate() {
    let connector = steady(1);

    let summaries = run_all(
        &connector,
        &[1e10, 1e-20, 2.],
        &[4],
        base(Duration::from_secs(1)),
    )
    .await;

    assert_eq!(summaries.len(), 3);
    for summary in &summaries[..2] {
        assert!(summary.is_fatal());
        assert_eq!(summary.total_requests, 0);
        assert!(summary
            .fatal_error
            .as_deref()
            .unwrap()
            .contains("Frequency"));
    }
    assert!(!summaries[2].is_fatal());
    assert_eq!(summaries[2].total_requests, 2);
    assert_eq!(connector.connects(), 1);
}
