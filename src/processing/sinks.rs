//! Payload sinks: where decoded frames go.
//!
//! Sinks receive every delivered [`DecodedFrame`]. The [`SinkMultiplexer`] fans a
//! frame out to all sinks concurrently, retries a sink whose error allows it, and
//! reports the first failure that remains.

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures_util::future::join_all;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::warn;

use crate::error::{classify, ShareError};
use crate::processing::decoder::DecodedFrame;

/// Abstract payload output interface.
#[async_trait]
pub trait PayloadSink: Send {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Prepare the sink before the first frame.
    async fn initialize(&mut self) -> Result<()> {
        Ok(())
    }

    /// Deliver one decoded frame.
    async fn deliver(&mut self, frame: &DecodedFrame) -> Result<()>;

    /// Flush and release resources.
    async fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes `Received: <text>` lines, as the receiving screen shows them.
pub struct TextSink<W> {
    writer: W,
}

impl TextSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> PayloadSink for TextSink<W> {
    fn name(&self) -> &str {
        "text"
    }

    async fn deliver(&mut self, frame: &DecodedFrame) -> Result<()> {
        let line = format!("Received: {}\n", frame.text());
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| ShareError::sink("text", e.to_string()))?;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// Keeps the latest payload bytes in a file, replacing it on every delivery.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl PayloadSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn deliver(&mut self, frame: &DecodedFrame) -> Result<()> {
        tokio::fs::write(&self.path, &frame.payload)
            .await
            .map_err(|e| {
                ShareError::sink(self.path.display().to_string(), e.to_string())
                    .with_metadata("frame", frame.index.to_string())
            })?;
        Ok(())
    }
}

/// Writes one JSON object per frame, with the payload base64 encoded.
pub struct JsonSink<W> {
    writer: W,
}

impl JsonSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W: AsyncWrite + Unpin + Send> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// JSON record for one decoded frame.
pub fn frame_record(frame: &DecodedFrame) -> serde_json::Value {
    serde_json::json!({
        "frame": frame.index,
        "pts_ns": frame.pts_ns,
        "grid": frame.grid.size().dimension(),
        "ambiguous_cells": frame.ambiguous_cells,
        "payload": STANDARD.encode(&frame.payload),
    })
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> PayloadSink for JsonSink<W> {
    fn name(&self) -> &str {
        "json"
    }

    async fn deliver(&mut self, frame: &DecodedFrame) -> Result<()> {
        let mut line = serde_json::to_vec(&frame_record(frame)).map_err(ShareError::from)?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .map_err(|e| ShareError::sink("json", e.to_string()))?;
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }
}

/// Multiplexer for delivering frames to multiple sinks concurrently.
#[derive(Default)]
pub struct SinkMultiplexer {
    pub sinks: Vec<Box<dyn PayloadSink>>,
}

impl SinkMultiplexer {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn push<S: PayloadSink + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    /// Initialize all sinks in the multiplexer.
    pub async fn initialize(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.initialize().await?;
        }
        Ok(())
    }

    /// Deliver a frame to all sinks concurrently.
    /// Every sink sees the frame even when another one fails, and only the failing
    /// sink is retried.
    pub async fn deliver(&mut self, frame: &DecodedFrame) -> Result<()> {
        let futures = self
            .sinks
            .iter_mut()
            .map(|sink| deliver_with_retry(sink.as_mut(), frame));
        for result in join_all(futures).await {
            result?;
        }
        Ok(())
    }

    /// Shut down all sinks in the multiplexer.
    pub async fn shutdown(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.shutdown().await?;
        }
        Ok(())
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

async fn deliver_with_retry(sink: &mut dyn PayloadSink, frame: &DecodedFrame) -> Result<()> {
    let mut attempt = 0;
    loop {
        let Err(e) = sink.deliver(frame).await else {
            return Ok(());
        };
        attempt += 1;
        let Some(delay) = classify::find(&e).and_then(|share| classify::retry_after(share, attempt))
        else {
            return Err(e);
        };
        warn!(sink = sink.name(), frame = frame.index, attempt, error = %e, "retrying delivery");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_codec::codec::encode;
    use grid_codec::GridSize;

    fn decoded(index: u64, text: &[u8]) -> DecodedFrame {
        let size = GridSize::new(4).unwrap();
        let grid = encode(text, size);
        DecodedFrame {
            index,
            payload: grid_codec::codec::decode(&grid),
            grid,
            ambiguous_cells: 0,
            pts_ns: None,
        }
    }

    #[tokio::test]
    async fn test_text_sink_format() {
        let mut sink = TextSink::new(Vec::new());
        sink.deliver(&decoded(0, b"Hi")).await.unwrap();
        sink.deliver(&decoded(1, b"Yo!")).await.unwrap();
        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "Received: Hi\nReceived: Yo!\n");
    }

    #[tokio::test]
    async fn test_json_sink_record() {
        let mut sink = JsonSink::new(Vec::new());
        sink.deliver(&decoded(3, b"Hi")).await.unwrap();
        let out = sink.into_inner();
        let record: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(record["frame"], 3);
        assert_eq!(record["grid"], 4);
        assert_eq!(record["payload"], "SGkAAA==");
        assert!(record["pts_ns"].is_null());
    }

    #[tokio::test]
    async fn test_file_sink_keeps_latest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.bin");
        let mut sink = FileSink::new(&path);

        sink.deliver(&decoded(0, b"ab")).await.unwrap();
        sink.deliver(&decoded(1, b"cd")).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"cd\0\0");
    }

    /// Fails the first `failures` deliveries with a sink error.
    struct FlakySink {
        failures: u32,
        attempts: u32,
    }

    #[async_trait]
    impl PayloadSink for FlakySink {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn deliver(&mut self, _frame: &DecodedFrame) -> Result<()> {
            self.attempts += 1;
            if self.attempts <= self.failures {
                return Err(ShareError::sink("flaky", "busy").into());
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_multiplexer_retries_failing_sink_once() {
        let mut sink = FlakySink { failures: 1, attempts: 0 };
        deliver_with_retry(&mut sink, &decoded(0, b"ok")).await.unwrap();
        assert_eq!(sink.attempts, 2);

        let mut sink = FlakySink { failures: 2, attempts: 0 };
        assert!(deliver_with_retry(&mut sink, &decoded(0, b"ok")).await.is_err());
        assert_eq!(sink.attempts, 2);
    }

    #[tokio::test]
    async fn test_multiplexer_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("ok.bin");
        let bad = dir.path().join("missing").join("nope.bin");

        let mut mux = SinkMultiplexer::new();
        mux.push(FileSink::new(&good));
        mux.push(FileSink::new(&bad));
        mux.initialize().await.unwrap();
        assert_eq!(mux.sink_count(), 2);

        assert!(mux.deliver(&decoded(0, b"ok")).await.is_err());
        assert_eq!(std::fs::read(&good).unwrap(), b"ok\0\0");
    }
}
