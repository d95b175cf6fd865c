//! Delivery path from the arena to one connection's writer
//!
//! Messages go through a bounded queue and may be dropped when it is full.
//! A close travels on its own one-shot slot, so it always arrives and is
//! handed to the writer ahead of anything still queued.

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;

use crate::ws::protocol::ServerMsg;

/// Queue depth from the arena to one connection's writer
pub const OUTBOUND_CHANNEL_CAPACITY: usize = 256;

/// Item handed to a connection's writer
#[derive(Debug, Clone)]
pub enum Outbound {
    Message(ServerMsg),
    Close { code: u16, reason: &'static str },
}

type CloseSignal = (u16, &'static str);

/// Create the sender kept by the arena and the receiver drained by the writer
pub fn channel() -> (OutboundTx, OutboundRx) {
    let (message_tx, message_rx) = mpsc::channel(OUTBOUND_CHANNEL_CAPACITY);
    let (close_tx, close_rx) = oneshot::channel();

    (
        OutboundTx {
            messages: message_tx,
            close: close_tx,
        },
        OutboundRx {
            messages: message_rx,
            close: Some(close_rx),
        },
    )
}

/// Arena side of a connection
#[derive(Debug)]
pub struct OutboundTx {
    messages: mpsc::Sender<ServerMsg>,
    close: oneshot::Sender<CloseSignal>,
}

impl OutboundTx {
    /// Queue a message without waiting
    pub fn try_send(&self, msg: ServerMsg) -> Result<(), TrySendError<ServerMsg>> {
        self.messages.try_send(msg)
    }

    /// Ask the writer to close the socket with `code`
    pub fn close(self, code: u16, reason: &'static str) {
        let _ = self.close.send((code, reason));
    }
}

/// Writer side of a connection
#[derive(Debug)]
pub struct OutboundRx {
    messages: mpsc::Receiver<ServerMsg>,
    close: Option<oneshot::Receiver<CloseSignal>>,
}

enum Next {
    Close(Result<CloseSignal, oneshot::error::RecvError>),
    Message(Option<ServerMsg>),
}

impl OutboundRx {
    /// Next item, a pending close first. `None` once the arena has dropped
    /// the connection and the queue is drained.
    pub async fn recv(&mut self) -> Option<Outbound> {
        let next = match self.close.as_mut() {
            Some(close) => tokio::select! {
                biased;
                signal = close => Next::Close(signal),
                msg = self.messages.recv() => Next::Message(msg),
            },
            None => Next::Message(self.messages.recv().await),
        };

        match next {
            Next::Close(Ok((code, reason))) => {
                self.close = None;
                Some(Outbound::Close { code, reason })
            }
            Next::Close(Err(_)) => {
                self.close = None;
                self.messages.recv().await.map(Outbound::Message)
            }
            Next::Message(msg) => msg.map(Outbound::Message),
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<Outbound> {
        if let Some(close) = self.close.as_mut() {
            match close.try_recv() {
                Ok((code, reason)) => {
                    self.close = None;
                    return Some(Outbound::Close { code, reason });
                }
                Err(oneshot::error::TryRecvError::Closed) => self.close = None,
                Err(oneshot::error::TryRecvError::Empty) => {}
            }
        }
        self.messages.try_recv().ok().map(Outbound::Message)
    }
}
