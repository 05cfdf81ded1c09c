use tracing::{debug, info};

use crate::broker::MessageBroker;
use crate::domain::{QueueMessage, Reading, SampleClock};
use crate::error::PipelineError;
use crate::meter::ConsumptionMeter;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerReport {
    /// Readings published, the stop message excluded
    pub published: u64,
}

/// Publish one meter reading per clock tick, then the stop message
pub async fn produce(
    broker: &dyn MessageBroker,
    queue: &str,
    clock: &SampleClock,
    meter: &mut dyn ConsumptionMeter,
) -> Result<ProducerReport, PipelineError> {
    let mut report = ProducerReport::default();

    for at in clock.timestamps() {
        let reading = Reading {
            timestamp: at.fixed_offset(),
            value: meter.read(&at),
        };
        let body = QueueMessage::from(reading)
            .encode()
            .map_err(PipelineError::Encode)?;
        broker.publish(queue, &body).await?;
        report.published += 1;
    }

    let stop = QueueMessage::stop().encode().map_err(PipelineError::Encode)?;
    broker.publish(queue, &stop).await?;
    debug!(queue, "stop message published");

    info!(queue, published = report.published, "meter readings published");
    Ok(report)
}
