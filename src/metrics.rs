use tracing::trace;

// Trace-level metric events; the Prometheus recorder only serves /metrics.

pub fn inc_requests(route: &'static str) {
    trace!(
        target = "hermes.metrics",
        route = route,
        "requests_total_inc"
    );
}

pub fn stage_elapsed(stage: &'static str, elapsed_ms: u128) {
    trace!(
        target = "hermes.metrics",
        stage = stage,
        elapsed_ms = elapsed_ms as u64,
        "stage_elapsed"
    );
}

pub fn flags_raised(marketplace: &'static str, count: usize) {
    trace!(
        target = "hermes.metrics",
        marketplace = marketplace,
        count = count as u64,
        "quality_flags_total_inc"
    );
}
