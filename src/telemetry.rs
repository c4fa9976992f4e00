//! Usage telemetry

use crate::error::Result;

/// Receives usage events
pub trait Telemetry {
    /// Record that the command finished successfully
    fn emit_success(&mut self) -> Result<()>;
}

/// Telemetry that only logs events
#[derive(Debug, Default)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn emit_success(&mut self) -> Result<()> {
        tracing::info!(event = "success", "usage event");
        Ok(())
    }
}
