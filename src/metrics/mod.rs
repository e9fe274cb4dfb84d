//! Prometheus metrics for artifact loading and prediction.
//!
//! # Example
//! ```no_run
//! use retention_ai::metrics::{self, PREDICTIONS_TOTAL};
//!
//! metrics::init_metrics().unwrap();
//! PREDICTIONS_TOTAL.with_label_values(&["HIGH"]).inc();
//! println!("{}", metrics::gather_metrics());
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, Histogram, HistogramOpts, IntGauge, Opts, Registry};

const NAMESPACE: &str = "retention_ai";

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Predictions returned, by risk tier
    ///
    /// Labels: risk_level
    pub static ref PREDICTIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("predictions_total", "Total number of predictions returned")
            .namespace(NAMESPACE),
        &["risk_level"]
    ).expect("Failed to create PREDICTIONS_TOTAL metric");

    /// Failed predictions, by error code
    ///
    /// Labels: code
    pub static ref PREDICTION_ERRORS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("prediction_errors_total", "Total number of failed predictions")
            .namespace(NAMESPACE),
        &["code"]
    ).expect("Failed to create PREDICTION_ERRORS_TOTAL metric");

    /// Scoring latency per request (single record or whole batch)
    ///
    /// Buckets: 0.0001 .. 1.0
    pub static ref PREDICTION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "prediction_duration_seconds",
            "Time spent scoring one request in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
    ).expect("Failed to create PREDICTION_DURATION_SECONDS metric");

    /// Predictor load attempts, by outcome
    ///
    /// Labels: outcome (success, error, timeout)
    pub static ref ARTIFACT_LOADS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("artifact_loads_total", "Total number of predictor load attempts")
            .namespace(NAMESPACE),
        &["outcome"]
    ).expect("Failed to create ARTIFACT_LOADS_TOTAL metric");

    /// Time spent loading both artifacts into a predictor
    pub static ref ARTIFACT_LOAD_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "artifact_load_duration_seconds",
            "Time spent loading the predictor artifacts in seconds"
        )
        .namespace(NAMESPACE)
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]),
    ).expect("Failed to create ARTIFACT_LOAD_DURATION_SECONDS metric");

    /// Width of the loaded feature vector (0 until a predictor is loaded)
    pub static ref PREDICTOR_FEATURES: IntGauge = IntGauge::with_opts(
        Opts::new("predictor_features", "Number of features of the loaded predictor")
            .namespace(NAMESPACE),
    ).expect("Failed to create PREDICTOR_FEATURES metric");
}

fn register<C>(collector: &C) -> Result<(), prometheus::Error>
where
    C: prometheus::core::Collector + Clone + 'static,
{
    match PROMETHEUS_REGISTRY.register(Box::new(collector.clone())) {
        Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Register every collector with the global registry; safe to call more than once
pub fn init_metrics() -> Result<(), prometheus::Error> {
    register(&*PREDICTIONS_TOTAL)?;
    register(&*PREDICTION_ERRORS_TOTAL)?;
    register(&*PREDICTION_DURATION_SECONDS)?;
    register(&*ARTIFACT_LOADS_TOTAL)?;
    register(&*ARTIFACT_LOAD_DURATION_SECONDS)?;
    register(&*PREDICTOR_FEATURES)?;

    tracing::debug!("Prometheus metrics registered");
    Ok(())
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
