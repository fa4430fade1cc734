//! WebSocket Connection
//!
//! A dialed WebSocket split into a read half owned by the listen loop and
//! a single writer task that owns the write half. Every other task writes
//! through a cloneable [`WsSender`], which queues frames to the writer and
//! waits for the write result.

use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::infrastructure::exchange::error::SendError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WRITE_QUEUE_CAPACITY: usize = 64;
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

enum WriterCommand {
    Send {
        message: Message,
        done: oneshot::Sender<Result<(), tungstenite::Error>>,
    },
    Close,
}

/// Cloneable handle that writes frames through the connection's writer task.
#[derive(Debug, Clone)]
pub struct WsSender {
    tx: mpsc::Sender<WriterCommand>,
}

impl std::fmt::Debug for WriterCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Send { message, .. } => f.debug_tuple("Send").field(message).finish(),
            Self::Close => f.write_str("Close"),
        }
    }
}

impl WsSender {
    /// Write one frame and wait until the transport accepted it.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::WriterClosed`] once the connection is closing,
    /// or the transport error from the write.
    pub async fn send(&self, message: Message) -> Result<(), SendError> {
        let (done, result) = oneshot::channel();
        self.tx
            .send(WriterCommand::Send { message, done })
            .await
            .map_err(|_| SendError::WriterClosed)?;
        result.await.map_err(|_| SendError::WriterClosed)??;
        Ok(())
    }

    /// Serialize `value` as JSON and write it as a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::Encode`] if serialization fails, otherwise as
    /// [`WsSender::send`].
    pub async fn send_json<T: Serialize + Sync>(&self, value: &T) -> Result<(), SendError> {
        let text = serde_json::to_string(value)?;
        self.send(Message::Text(text.into())).await
    }
}

/// An open WebSocket connection.
pub struct WsConnection {
    sender: WsSender,
    reader: SplitStream<WsStream>,
    writer: JoinHandle<()>,
}

impl std::fmt::Debug for WsConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsConnection")
            .field("writer_finished", &self.writer.is_finished())
            .finish_non_exhaustive()
    }
}

impl WsConnection {
    /// Dial `url` and start the writer task.
    ///
    /// # Errors
    ///
    /// Returns the handshake or transport error.
    pub async fn dial(url: &str) -> Result<Self, tungstenite::Error> {
        let (stream, _response) = tokio_tungstenite::connect_async(url).await?;
        let (sink, reader) = stream.split();
        let (tx, rx) = mpsc::channel(WRITE_QUEUE_CAPACITY);
        let writer = tokio::spawn(run_writer(sink, rx));

        Ok(Self {
            sender: WsSender { tx },
            reader,
            writer,
        })
    }

    /// Handle for writing frames.
    #[must_use]
    pub fn sender(&self) -> WsSender {
        self.sender.clone()
    }

    /// Next inbound frame, or `None` when the stream has ended.
    pub async fn next_message(&mut self) -> Option<Result<Message, tungstenite::Error>> {
        self.reader.next().await
    }

    /// Send a close frame and stop the writer task.
    ///
    /// Outstanding [`WsSender`] clones fail with [`SendError::WriterClosed`]
    /// afterwards.
    pub async fn close(self) {
        let Self {
            sender,
            reader,
            mut writer,
        } = self;

        let _ = sender.tx.send(WriterCommand::Close).await;
        drop(sender);

        if tokio::time::timeout(CLOSE_TIMEOUT, &mut writer).await.is_err() {
            tracing::warn!("WebSocket writer did not stop in time, aborting");
            writer.abort();
        }
        drop(reader);
    }
}

async fn run_writer(
    mut sink: SplitSink<WsStream, Message>,
    mut rx: mpsc::Receiver<WriterCommand>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            WriterCommand::Send { message, done } => {
                let result = sink.send(message).await;
                let _ = done.send(result);
            }
            WriterCommand::Close => break,
        }
    }

    if let Err(e) = sink.close().await {
        tracing::debug!(error = %e, "WebSocket close handshake failed");
    }
}
