use aws_sdk_cloudwatch::Client as CloudWatchClient;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum, StandardUnit};
use aws_smithy_types::date_time::DateTime;
use std::time::{Instant, SystemTime};

use aws_config::BehaviorVersion;
use std::sync::Arc;

use crate::models::notifications::DispatchResult;
use crate::utilities::config::get_environment;

pub async fn create_cloudwatch_client() -> CloudWatchClient {
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    CloudWatchClient::new(&config)
}

pub fn metrics_namespace(environment: &str) -> String {
    format!("{}/Hooldus/Metrics", environment)
}

/// Publishes per-operation metrics. Without a client every call is a no-op,
/// which is how tests and metric-less deployments run.
#[derive(Clone, Debug)]
pub struct OperationMetricTracker {
    cloudwatch: Option<Arc<CloudWatchClient>>,
    start: Instant,
    environment: String,
    operation: &'static str,
}

impl OperationMetricTracker {
    pub fn new(cloudwatch: Option<Arc<CloudWatchClient>>, operation: &'static str) -> Self {
        Self {
            cloudwatch,
            start: Instant::now(),
            environment: get_environment(),
            operation,
        }
    }

    pub fn disabled(operation: &'static str) -> Self {
        Self::new(None, operation)
    }

    pub async fn build(operation: &'static str) -> Self {
        let cloudwatch = create_cloudwatch_client().await;
        Self::new(Some(Arc::new(cloudwatch)), operation)
    }

    pub fn is_enabled(&self) -> bool {
        self.cloudwatch.is_some()
    }

    /// Same sink, fresh latency clock.
    pub fn restart(&self) -> Self {
        Self { start: Instant::now(), ..self.clone() }
    }

    pub async fn track<T, E>(&self, result: &Result<T, E>) {
        let status = if result.is_ok() { "Success" } else { "Error" };
        let elapsed = self.start.elapsed().as_millis() as f64;

        self.emit("Latency", elapsed, "Milliseconds", &[("Status", status)])
            .await;

        self.emit("Calls", 1.0, "Count", &[("Status", status)])
            .await;
    }

    pub async fn record_dispatch(&self, result: &DispatchResult) {
        self.emit("PushAttempted", result.attempted as f64, "Count", &[]).await;
        self.emit("PushSucceeded", result.success as f64, "Count", &[]).await;
        self.emit("PushFailed", result.failure as f64, "Count", &[]).await;
        self.emit("PushTokensPruned", result.pruned as f64, "Count", &[]).await;
    }

    pub async fn emit_mint_failure(&self) {
        self.emit("AccessTokenMintFailures", 1.0, "Count", &[]).await;
    }

    pub async fn emit(
        &self,
        metric_name: &str,
        value: f64,
        unit: &str,
        dimensions: &[(&str, &str)],
    ) {
        let Some(cloudwatch) = &self.cloudwatch else {
            return;
        };

        let datum = self.datum(metric_name, value, unit, dimensions);

        if let Err(e) = cloudwatch
            .put_metric_data()
            .namespace(metrics_namespace(&self.environment))
            .metric_data(datum)
            .send()
            .await
        {
            log::error!("Failed to emit {} metric: {:?}", metric_name, e);
        }
    }

    fn datum(
        &self,
        metric_name: &str,
        value: f64,
        unit: &str,
        dimensions: &[(&str, &str)],
    ) -> MetricDatum {
        let mut dims = vec![
            Dimension::builder()
                .name("Operation")
                .value(self.operation)
                .build(),
        ];

        dims.extend(dimensions.iter().map(|(k, v)| {
            Dimension::builder()
                .name(*k)
                .value(*v)
                .build()
        }));

        MetricDatum::builder()
            .metric_name(metric_name)
            .timestamp(DateTime::from(SystemTime::now()))
            .value(value)
            .unit(StandardUnit::from(unit))
            .set_dimensions(Some(dims))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_includes_environment() {
        assert_eq!(metrics_namespace("prod"), "prod/Hooldus/Metrics");
    }

    #[test]
    fn test_datum_carries_operation_dimension() {
        let tracker = OperationMetricTracker::disabled("Dispatch");
        let datum = tracker.datum("Calls", 1.0, "Count", &[("Status", "Success")]);

        assert_eq!(datum.metric_name(), Some("Calls"));
        assert_eq!(datum.value(), Some(1.0));
        assert_eq!(datum.unit(), Some(&StandardUnit::Count));

        let dims: Vec<(Option<&str>, Option<&str>)> = datum
            .dimensions()
            .iter()
            .map(|d| (d.name(), d.value()))
            .collect();
        assert_eq!(
            dims,
            vec![(Some("Operation"), Some("Dispatch")), (Some("Status"), Some("Success"))]
        );
    }

    #[tokio::test]
    async fn test_disabled_tracker_is_noop() {
        let tracker = OperationMetricTracker::disabled("Dispatch");
        assert!(!tracker.is_enabled());

        tracker.track(&Ok::<(), ()>(())).await;
        tracker.record_dispatch(&DispatchResult::default()).await;
        tracker.emit_mint_failure().await;
        assert!(!tracker.restart().is_enabled());
    }
}
