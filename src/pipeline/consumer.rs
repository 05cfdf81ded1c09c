use tokio::io::AsyncWrite;
use tracing::{info, warn};

use super::sink::RecordSink;
use crate::broker::{BrokerError, MessageBroker};
use crate::domain::{format_timestamp, CombinedRecord, PvSeries, QueueMessage};
use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerReport {
    pub written: u64,
    /// Readings with no PV value for their timestamp
    pub skipped: u64,
}

/// Join readings from `queue` with `series` until the stop message arrives
pub async fn consume<W>(
    broker: &dyn MessageBroker,
    queue: &str,
    series: &PvSeries,
    sink: &mut RecordSink<W>,
) -> Result<ConsumerReport, PipelineError>
where
    W: AsyncWrite + Unpin + Send,
{
    let mut report = ConsumerReport::default();

    loop {
        let body = broker
            .receive(queue)
            .await?
            .ok_or(PipelineError::Broker(BrokerError::Closed))?;
        let message = QueueMessage::decode(&body).map_err(|source| PipelineError::Decode {
            body: body.clone(),
            source,
        })?;

        let reading = match message {
            QueueMessage::Stop { .. } => break,
            QueueMessage::Reading(reading) => reading,
        };

        match series.get(&reading.timestamp) {
            Some(pv_w) => {
                sink.write(&CombinedRecord::new(reading.timestamp, reading.value, pv_w))
                    .await?;
                report.written += 1;
            }
            None => {
                warn!(
                    timestamp = %format_timestamp(&reading.timestamp),
                    "no PV value for reading, skipped"
                );
                report.skipped += 1;
            }
        }
    }

    info!(
        queue,
        written = report.written,
        skipped = report.skipped,
        "stop message received"
    );
    Ok(report)
}
