use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::domain::CombinedRecord;
use crate::error::PipelineError;

/// Layout of the result file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// `<timestamp> <consumption> <pv> <total>` per line
    #[default]
    Text,
    /// One JSON object per line
    Jsonl,
}

/// Writes combined records to the result file
pub struct RecordSink<W> {
    writer: W,
    format: OutputFormat,
    written: u64,
}

impl<W: AsyncWrite + Unpin + Send> RecordSink<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            written: 0,
        }
    }

    pub async fn write(&mut self, record: &CombinedRecord) -> Result<(), PipelineError> {
        let mut line = match self.format {
            OutputFormat::Text => record.to_string(),
            OutputFormat::Jsonl => serde_json::to_string(record).map_err(PipelineError::Encode)?,
        };
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush buffered lines and hand back the writer
    pub async fn finish(mut self) -> Result<W, PipelineError> {
        self.writer.flush().await?;
        Ok(self.writer)
    }
}
