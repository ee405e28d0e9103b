//! Prometheus metrics for the chunk relay
//!
//! Everything registers into [`REGISTRY`], which the HTTP layer renders at `/metrics`.

use prometheus::{
    register_int_counter_vec_with_registry, register_int_counter_with_registry,
    register_int_gauge_with_registry, Encoder, IntCounter, IntCounterVec, IntGauge, Registry,
    TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: std::sync::LazyLock<Registry> = std::sync::LazyLock::new(Registry::new);

/// Chunks accepted by ingest
pub static CHUNKS_INGESTED: std::sync::LazyLock<IntCounter> = std::sync::LazyLock::new(|| {
    register_int_counter_with_registry!(
        "chunkrelay_chunks_ingested_total",
        "Total number of chunks accepted by ingest",
        REGISTRY.clone()
    ).expect("Failed to register CHUNKS_INGESTED")
});

/// Payload bytes accepted by ingest
pub static BYTES_INGESTED: std::sync::LazyLock<IntCounter> = std::sync::LazyLock::new(|| {
    register_int_counter_with_registry!(
        "chunkrelay_bytes_ingested_total",
        "Total payload bytes accepted by ingest",
        REGISTRY.clone()
    ).expect("Failed to register BYTES_INGESTED")
});

/// Retrieval calls by outcome ("found", "not_yet_available", "stream_absent")
pub static RETRIEVALS: std::sync::LazyLock<IntCounterVec> = std::sync::LazyLock::new(|| {
    register_int_counter_vec_with_registry!(
        "chunkrelay_retrievals_total",
        "Total number of retrieval calls",
        &["outcome"],
        REGISTRY.clone()
    ).expect("Failed to register RETRIEVALS")
});

/// Streams currently held in memory
pub static ACTIVE_STREAMS: std::sync::LazyLock<IntGauge> = std::sync::LazyLock::new(|| {
    register_int_gauge_with_registry!(
        "chunkrelay_active_streams",
        "Current number of streams held in memory",
        REGISTRY.clone()
    ).expect("Failed to register ACTIVE_STREAMS")
});

/// Retention sweeper activity
pub mod retention {
    use super::{register_int_counter_with_registry, IntCounter, REGISTRY};

    pub static CHUNKS_TRIMMED: std::sync::LazyLock<IntCounter> = std::sync::LazyLock::new(|| {
        register_int_counter_with_registry!(
            "chunkrelay_chunks_trimmed_total",
            "Total number of chunks removed by the retention sweeper",
            REGISTRY.clone()
        ).expect("Failed to register CHUNKS_TRIMMED")
    });

    pub static CONSUMERS_EVICTED: std::sync::LazyLock<IntCounter> = std::sync::LazyLock::new(|| {
        register_int_counter_with_registry!(
            "chunkrelay_consumers_evicted_total",
            "Total number of idle consumer cursors evicted",
            REGISTRY.clone()
        ).expect("Failed to register CONSUMERS_EVICTED")
    });

    pub static STREAMS_REMOVED: std::sync::LazyLock<IntCounter> = std::sync::LazyLock::new(|| {
        register_int_counter_with_registry!(
            "chunkrelay_streams_removed_total",
            "Total number of empty streams removed",
            REGISTRY.clone()
        ).expect("Failed to register STREAMS_REMOVED")
    });
}

/// Archival side effect
pub mod archive {
    use super::{register_int_counter_vec_with_registry, IntCounterVec, REGISTRY};

    /// Archive attempts by outcome ("ok", "failed", "dropped")
    pub static ARCHIVE_RESULTS: std::sync::LazyLock<IntCounterVec> = std::sync::LazyLock::new(|| {
        register_int_counter_vec_with_registry!(
            "chunkrelay_archive_results_total",
            "Archive attempts by outcome",
            &["backend", "outcome"],
            REGISTRY.clone()
        ).expect("Failed to register ARCHIVE_RESULTS")
    });
}

/// Render all registered metrics in the Prometheus text format
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|_| prometheus::Error::Msg("Invalid UTF-8".to_string()))
}
