use std::fmt;

use opentelemetry::{
    metrics::{Counter, Gauge, Meter},
    KeyValue,
};

pub struct HandshakeMetrics {
    open: Counter<u64>,
    attempts: Counter<u64>,
    failures: Counter<u64>,
    status: Counter<u64>,
}

impl HandshakeMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            open: meter.u64_counter("beacon_socket_open_total").build(),
            attempts: meter.u64_counter("beacon_handshake_total").build(),
            failures: meter.u64_counter("beacon_handshake_fail_total").build(),
            status: meter.u64_counter("beacon_status_response_total").build(),
        }
    }

    pub fn record_open(&self) {
        self.open.add(1, &[]);
    }

    pub fn record_attempt(&self, state: &'static str) {
        self.attempts.add(1, &[KeyValue::new("state", state)]);
    }

    pub fn record_failure(&self, reason: &'static str) {
        self.failures.add(1, &[KeyValue::new("reason", reason)]);
    }

    pub fn record_status(&self) {
        self.status.add(1, &[]);
    }
}

pub struct RegistryMetrics {
    connections_active: Gauge<u64>,
}

impl fmt::Debug for RegistryMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryMetrics").finish_non_exhaustive()
    }
}

impl RegistryMetrics {
    pub fn new(meter: &Meter) -> Self {
        Self {
            connections_active: meter.u64_gauge("beacon_connections_active").build(),
        }
    }

    pub fn record_connections_active(&self, total: u64) {
        self.connections_active.record(total, &[]);
    }
}
