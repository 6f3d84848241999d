use opentelemetry::global;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter, UpDownCounter};
use opentelemetry::KeyValue;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::Registry;
use std::sync::Arc;

pub mod labels {
    pub const ERROR_TYPE: &str = "error_type";
    pub const STATUS_CODE: &str = "status_code";
    pub const METHOD: &str = "method";
    pub const KIND: &str = "kind";
    pub const ENCODING: &str = "encoding";
    pub const DISPOSITION: &str = "disposition";
    pub const TIMEOUT_TYPE: &str = "timeout_type";
    pub const VERSION: &str = "version";
    pub const RUST_VERSION: &str = "rust_version";
}

pub mod values {
    pub const TIMEOUT_UPSTREAM: &str = "upstream";
    pub const TIMEOUT_CONNECTION_HANDLING: &str = "connection_handling";
    pub const DISPOSITION_REDIRECT: &str = "redirect";
    pub const DISPOSITION_STREAMING: &str = "streaming";
    pub const DISPOSITION_BUFFERING: &str = "buffering";
}

#[derive(Clone)]
pub struct Metrics {
    pub connections_total: Counter<u64>,
    pub connections_active: UpDownCounter<i64>,

    pub requests_total: Counter<u64>,
    pub requests_duration_seconds: Histogram<f64>,

    pub upstream_requests_total: Counter<u64>,
    pub upstream_errors_total: Counter<u64>,
    pub upstream_duration_seconds: Histogram<f64>,

    // Transcoding
    pub responses_by_disposition_total: Counter<u64>,
    pub rewrites_total: Counter<u64>,
    pub rewrite_fallbacks_total: Counter<u64>,
    pub decompression_fallbacks_total: Counter<u64>,

    pub cookies_recorded_total: Counter<u64>,

    pub timeouts_total: Counter<u64>,

    pub build_info: Gauge<u64>,
}

impl Metrics {
    fn new(meter: Meter) -> Self {
        Self {
            connections_total: meter
                .u64_counter("veil_connections_total")
                .with_description("Total number of connections accepted")
                .build(),
            connections_active: meter
                .i64_up_down_counter("veil_connections_active")
                .with_description("Number of active connections")
                .build(),

            requests_total: meter
                .u64_counter("veil_requests_total")
                .with_description("Total number of requests processed")
                .build(),
            requests_duration_seconds: meter
                .f64_histogram("veil_requests_duration_seconds")
                .with_description("Request duration in seconds")
                .build(),

            upstream_requests_total: meter
                .u64_counter("veil_upstream_requests_total")
                .with_description("Total number of requests sent to origins")
                .build(),
            upstream_errors_total: meter
                .u64_counter("veil_upstream_errors_total")
                .with_description("Total number of failed origin exchanges")
                .build(),
            upstream_duration_seconds: meter
                .f64_histogram("veil_upstream_duration_seconds")
                .with_description("Time until origin response headers, in seconds")
                .build(),

            responses_by_disposition_total: meter
                .u64_counter("veil_responses_by_disposition_total")
                .with_description("Origin responses by redirect, streaming or buffering path")
                .build(),
            rewrites_total: meter
                .u64_counter("veil_rewrites_total")
                .with_description("Total number of bodies rewritten")
                .build(),
            rewrite_fallbacks_total: meter
                .u64_counter("veil_rewrite_fallbacks_total")
                .with_description("Bodies served unmodified after a rewrite failure")
                .build(),
            decompression_fallbacks_total: meter
                .u64_counter("veil_decompression_fallbacks_total")
                .with_description("Bodies passed through compressed after a decode failure")
                .build(),

            cookies_recorded_total: meter
                .u64_counter("veil_cookies_recorded_total")
                .with_description("Set-Cookie values recorded in the cookie table")
                .build(),

            timeouts_total: meter
                .u64_counter("veil_timeouts_total")
                .with_description("Total number of timeouts")
                .build(),

            build_info: meter
                .u64_gauge("veil_build_info")
                .with_description("Build information")
                .build(),
        }
    }

    pub fn set_build_info(&self) {
        let version = env!("CARGO_PKG_VERSION");
        let rust_version = env!("CARGO_PKG_RUST_VERSION");

        self.build_info.record(
            1,
            &[
                KeyValue::new(labels::VERSION, version),
                KeyValue::new(labels::RUST_VERSION, rust_version),
            ],
        );
    }

    pub fn record_request(&self, method: &str, status_code: u16, duration_secs: f64) {
        let attrs = [
            KeyValue::new(labels::METHOD, method.to_string()),
            KeyValue::new(labels::STATUS_CODE, status_code.to_string()),
        ];
        self.requests_total.add(1, &attrs);
        self.requests_duration_seconds.record(duration_secs, &attrs);
    }

    pub fn record_upstream(&self, status_code: u16, duration_secs: f64) {
        let attrs = [KeyValue::new(labels::STATUS_CODE, status_code.to_string())];
        self.upstream_requests_total.add(1, &attrs);
        self.upstream_duration_seconds.record(duration_secs, &attrs);
    }

    pub fn record_upstream_error(&self, error_type: &str) {
        self.upstream_errors_total
            .add(1, &[KeyValue::new(labels::ERROR_TYPE, error_type.to_string())]);
    }

    pub fn record_disposition(&self, disposition: &'static str) {
        self.responses_by_disposition_total
            .add(1, &[KeyValue::new(labels::DISPOSITION, disposition)]);
    }

    pub fn record_rewrite(&self, kind: &'static str) {
        self.rewrites_total.add(1, &[KeyValue::new(labels::KIND, kind)]);
    }

    pub fn record_rewrite_fallback(&self, kind: &'static str) {
        self.rewrite_fallbacks_total
            .add(1, &[KeyValue::new(labels::KIND, kind)]);
    }

    pub fn record_decompression_fallback(&self, encoding: &str) {
        self.decompression_fallbacks_total
            .add(1, &[KeyValue::new(labels::ENCODING, encoding.to_string())]);
    }

    pub fn record_cookies(&self, count: usize) {
        if count > 0 {
            self.cookies_recorded_total.add(count as u64, &[]);
        }
    }

    pub fn record_timeout(&self, timeout_type: &'static str) {
        self.timeouts_total
            .add(1, &[KeyValue::new(labels::TIMEOUT_TYPE, timeout_type)]);
    }
}

pub fn init_metrics() -> Result<(Arc<Metrics>, Registry), Box<dyn std::error::Error + Send + Sync>>
{
    let registry = Registry::default();

    let exporter = opentelemetry_prometheus::exporter()
        .with_registry(registry.clone())
        .build()?;

    let meter_provider = SdkMeterProvider::builder().with_reader(exporter).build();

    global::set_meter_provider(meter_provider);

    let meter = global::meter("veil-proxy");
    let metrics = Arc::new(Metrics::new(meter));

    metrics.set_build_info();

    Ok((metrics, registry))
}
