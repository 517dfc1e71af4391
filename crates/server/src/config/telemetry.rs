use std::collections::HashMap;

use serde::Deserialize;

/// OTLP transport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

impl OtlpProtocol {
    /// Conventional collector endpoint for this transport.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            Self::Grpc => "http://localhost:4317",
            Self::Http => "http://localhost:4318",
        }
    }
}

/// Span export for depot's lifecycle and sweep instrumentation.
///
/// Off by default; logs still go to stdout through the `fmt` layer.
///
/// ```toml
/// [telemetry]
/// enabled = true
/// protocol = "http"
/// sample_ratio = 0.25
/// ```
#[derive(Debug, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Collector endpoint. Defaults to the protocol's conventional port.
    pub endpoint: Option<String>,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Fraction of traces kept, clamped to `0.0..=1.0`.
    #[serde(default = "default_sample_ratio")]
    pub sample_ratio: f64,
    #[serde(default)]
    pub protocol: OtlpProtocol,
    /// Export timeout in seconds.
    #[serde(default = "default_export_timeout")]
    pub timeout_seconds: u64,
    /// Extra resource attributes, e.g. `deployment.environment`.
    #[serde(default)]
    pub resource_attributes: HashMap<String, String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: None,
            service_name: default_service_name(),
            sample_ratio: default_sample_ratio(),
            protocol: OtlpProtocol::default(),
            timeout_seconds: default_export_timeout(),
            resource_attributes: HashMap::new(),
        }
    }
}

impl TelemetryConfig {
    /// Configured endpoint, or the protocol default.
    pub fn endpoint(&self) -> &str {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.protocol.default_endpoint())
    }
}

fn default_service_name() -> String {
    "depot".to_owned()
}

fn default_sample_ratio() -> f64 {
    1.0
}

fn default_export_timeout() -> u64 {
    5
}
