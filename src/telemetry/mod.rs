pub mod oltp;

use opentelemetry::{global, metrics::Meter};

/// Meter for all server instruments. A no-op unless an exporter was
/// installed with [`oltp::init_meter`].
pub fn get_meter() -> Meter {
    global::meter("beacon")
}
