use std::{collections::HashMap, env, time::Duration};

use anyhow::bail;
use log::{info, warn};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{Protocol, WithExportConfig, WithHttpConfig};
use opentelemetry_sdk::{metrics::SdkMeterProvider, Resource};

/// Creates an OpenTelemetry Resource from environment variables following semantic conventions,
/// including OTEL_RESOURCE_ATTRIBUTES for additional key-value pairs.
pub fn create_resource_from_env() -> Resource {
    let mut attributes = Vec::new();

    let service_name = env::var("OTEL_SERVICE_NAME").unwrap_or_else(|_| "beacon".to_string());
    attributes.push(KeyValue::new("service.name", service_name));

    if let Ok(service_version) = env::var("OTEL_SERVICE_VERSION") {
        attributes.push(KeyValue::new("service.version", service_version));
    }

    if let Ok(service_instance_id) = env::var("OTEL_SERVICE_INSTANCE_ID") {
        attributes.push(KeyValue::new("service.instance.id", service_instance_id));
    }

    // Parse OTEL_RESOURCE_ATTRIBUTES (comma-separated key=value pairs)
    if let Ok(resource_attributes) = env::var("OTEL_RESOURCE_ATTRIBUTES") {
        for (key, value) in parse_pairs(&resource_attributes) {
            if !attributes.iter().any(|kv| kv.key.as_str() == key) {
                attributes.push(KeyValue::new(key, value));
            }
        }
    }

    Resource::builder().with_attributes(attributes).build()
}

fn parse_pairs(raw: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for pair in raw.split(',') {
        if let Some((k, v)) = pair.split_once('=') {
            let (k, v) = (k.trim(), v.trim());
            if k.is_empty() || v.is_empty() {
                warn!("Ignoring malformed OTEL key-value pair '{pair}'");
                continue;
            }
            map.insert(k.to_string(), v.to_string());
        }
    }
    map
}

fn build_metric_exporter() -> anyhow::Result<opentelemetry_otlp::MetricExporter> {
    let endpoint = dotenvy::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4318/v1/metrics".into());
    let protocol = dotenvy::var("OTEL_EXPORTER_OTLP_PROTOCOL")
        .unwrap_or_else(|_| "http/protobuf".into())
        .to_lowercase();

    info!("Sending metric to {}", endpoint);

    let timeout = dotenvy::var("OTEL_EXPORTER_OTLP_TIMEOUT")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(3));

    let headers = dotenvy::var("OTEL_EXPORTER_OTLP_HEADERS")
        .map(|raw| parse_pairs(&raw))
        .unwrap_or_default();

    let wire = match protocol.as_str() {
        "http/protobuf" => Protocol::HttpBinary,
        "http/json" => Protocol::HttpJson,
        other => bail!("Unsupported OTLP protocol: {other}"),
    };

    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_protocol(wire)
        .with_endpoint(endpoint)
        .with_timeout(timeout)
        .with_headers(headers)
        .build()?;
    Ok(exporter)
}

pub fn init_meter() -> anyhow::Result<SdkMeterProvider> {
    let metric_exporter = build_metric_exporter()?;
    let resource = create_resource_from_env();

    #[allow(unused_mut)]
    let mut builder = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .with_resource(resource);

    #[cfg(feature = "verbose")]
    {
        builder =
            builder.with_periodic_exporter(opentelemetry_stdout::MetricExporter::builder().build());
    }

    let meter_provider = builder.build();
    global::set_meter_provider(meter_provider.clone());
    Ok(meter_provider)
}
