use opentelemetry::{KeyValue, metrics::UpDownCounter};
use std::sync::LazyLock;

static STATDS: LazyLock<UpDownCounter<i64>> = LazyLock::new(|| {
    logfire::i64_up_down_counter("wa_webhook_statds")
        .with_description("Webhook event store statistics")
        .with_unit("event")
        .build()
});

fn incr_statds(metric: String, value: String) {
    STATDS.add(1, &[KeyValue::new(metric, value)]);
}

pub fn incr_webhook_event_statds(extraction: &str) {
    incr_statds("webhook_event".to_string(), extraction.into())
}

pub fn incr_persistence_failure_statds(step: &str) {
    incr_statds("persistence_failure".to_string(), step.into())
}

pub fn incr_auto_reply_statds(status: &str) {
    incr_statds("auto_reply".to_string(), status.into())
}
