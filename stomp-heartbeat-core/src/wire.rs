//! Frame writer seam between the heart-beat monitors and the connection

use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::frame::Frame;

/// Writes frames onto the connection
///
/// Implementations are shared by every producer on the connection and must
/// serialize concurrent writers themselves.
#[async_trait]
pub trait FrameWriter: Send + Sync {
    /// Write one frame, resolving once it has been handed to the transport
    async fn write_frame(&self, frame: Frame) -> Result<()>;
}

pub type SharedFrameWriter = Arc<dyn FrameWriter>;

/// Default depth of the writer's request queue
pub const DEFAULT_WIRE_QUEUE: usize = 64;

/// A frame plus the channel its completion is reported on
#[derive(Debug)]
pub struct WireRequest {
    pub frame: Frame,
    pub reply: oneshot::Sender<Result<()>>,
}

/// Cloneable handle to a connection's writer task
#[derive(Debug, Clone)]
pub struct WireWriter {
    tx: mpsc::Sender<WireRequest>,
}

impl WireWriter {
    /// Wrap an existing request channel
    pub fn new(tx: mpsc::Sender<WireRequest>) -> Self {
        Self { tx }
    }

    /// Spawn a writer task that owns `sink` and serves requests in order
    ///
    /// The task ends once every handle has been dropped.
    pub fn spawn<W>(sink: W, queue: usize) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(queue.max(1));
        let task = tokio::spawn(write_loop(sink, rx));
        (Self::new(tx), task)
    }
}

#[async_trait]
impl FrameWriter for WireWriter {
    async fn write_frame(&self, frame: Frame) -> Result<()> {
        let (reply, done) = oneshot::channel();
        self.tx
            .send(WireRequest { frame, reply })
            .await
            .map_err(|_| Error::WriterClosed)?;
        done.await.map_err(|_| Error::WriterClosed)?
    }
}

async fn write_loop<W>(mut sink: W, mut rx: mpsc::Receiver<WireRequest>)
where
    W: AsyncWrite + Unpin + Send,
{
    debug!("Wire writer started");
    while let Some(WireRequest { frame, reply }) = rx.recv().await {
        let encoded = frame.encode();
        let outcome = match sink.write_all(&encoded).await {
            Ok(()) => sink.flush().await,
            Err(e) => Err(e),
        };
        let outcome = outcome.map_err(|e| {
            warn!(error = %e, "Wire write failed");
            Error::Wire(e.to_string())
        });
        // The requester may have given up waiting
        let _ = reply.send(outcome);
    }
    debug!("Wire writer stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::AsyncReadExt;

    struct BrokenPipe;

    impl AsyncWrite for BrokenPipe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_writer_delivers_encoded_frames_in_order() {
        let (client, mut server) = tokio::io::duplex(256);
        let (writer, task) = WireWriter::spawn(client, DEFAULT_WIRE_QUEUE);

        tokio_test::assert_ok!(writer.write_frame(Frame::heartbeat()).await);
        tokio_test::assert_ok!(writer.write_frame(Frame::new("DISCONNECT")).await);
        drop(writer);
        task.await.unwrap();

        let mut received = Vec::new();
        server.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"\nDISCONNECT\n\n\0");
    }

    #[tokio::test]
    async fn test_write_error_is_reported_to_requester() {
        let (writer, _task) = WireWriter::spawn(BrokenPipe, 1);
        let err = writer.write_frame(Frame::heartbeat()).await.unwrap_err();
        assert!(matches!(err, Error::Wire(_)));
    }

    #[tokio::test]
    async fn test_closed_channel_reports_writer_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let writer = WireWriter::new(tx);
        let err = writer.write_frame(Frame::heartbeat()).await.unwrap_err();
        assert!(matches!(err, Error::WriterClosed));
    }
}
