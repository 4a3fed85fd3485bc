use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus exporter and register all application metrics.
/// Returns a `PrometheusHandle` whose `render()` method produces the
/// text/plain Prometheus scrape payload.
pub fn init_metrics() -> PrometheusHandle {
    let builder = PrometheusBuilder::new();
    let handle = builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // Pre-register counters so they appear even before the first increment.
    counter!("events_ingested_total").absolute(0);
    counter!("events_duplicate_total").absolute(0);
    counter!("questions_resolved_total").absolute(0);
    counter!("assets_registered_total").absolute(0);
    counter!("reorg_retractions_total").absolute(0);
    counter!("feed_lines_skipped_total").absolute(0);
    for kind in [
        "derivation_mismatch",
        "conflicting_question_data",
        "catalog_conflict",
        "invalid_input",
        "unresolvable",
    ] {
        counter!("index_faults_total", "kind" => kind).absolute(0);
    }

    // Pre-register gauges at zero.
    gauge!("catalog_questions").set(0.0);
    gauge!("catalog_assets").set(0.0);

    // Histogram is lazily created on first record; force creation.
    histogram!("ingest_latency_seconds").record(0.0);

    handle
}
