//! Bus abstraction layer: wraps `tokio::sync::broadcast` so callers never
//! touch the broadcast types directly.

use tokio::sync::broadcast;

use broadside::BroadsideMessage;

/// Capacity of the shared broadcast channel.
pub const BUS_CAPACITY: usize = 1024;

/// Create the bus and its first sender.
pub fn channel(source: impl Into<String>) -> BusSender {
    let (tx, _) = broadcast::channel(BUS_CAPACITY);
    BusSender::new(source.into(), tx)
}

// ---------------------------------------------------------------------------
// PollError
// ---------------------------------------------------------------------------

/// Error from `BusReceiver::poll()` / `recv()`: every sender is gone.
#[derive(Debug, PartialEq, Eq)]
pub enum PollError {
    Closed,
}

// ---------------------------------------------------------------------------
// BusSender
// ---------------------------------------------------------------------------

/// Cloneable sender that auto-stamps `source` on every outbound message.
#[derive(Clone)]
pub struct BusSender {
    source: String,
    inner: broadcast::Sender<BroadsideMessage>,
}

impl BusSender {
    pub fn new(source: String, inner: broadcast::Sender<BroadsideMessage>) -> Self {
        Self { source, inner }
    }

    /// Send a message, auto-stamping source. Having no subscribers is fine.
    pub fn send(&self, msg: BroadsideMessage) {
        let _ = self.inner.send(msg.source(self.source.clone()));
    }

    pub fn subscribe(&self) -> BusReceiver {
        BusReceiver {
            inner: self.inner.subscribe(),
        }
    }
}

// ---------------------------------------------------------------------------
// BusReceiver
// ---------------------------------------------------------------------------

/// Receiver wrapper. Lagging subscribers skip dropped messages with a warning.
pub struct BusReceiver {
    inner: broadcast::Receiver<BroadsideMessage>,
}

impl BusReceiver {
    /// Non-blocking drain: returns the next message, `Ok(None)` if empty,
    /// or `Err(PollError::Closed)` once the bus is gone.
    #[cfg(test)]
    pub fn poll(&mut self) -> Result<Option<BroadsideMessage>, PollError> {
        loop {
            match self.inner.try_recv() {
                Ok(msg) => return Ok(Some(msg)),
                Err(broadcast::error::TryRecvError::Empty) => return Ok(None),
                Err(broadcast::error::TryRecvError::Closed) => return Err(PollError::Closed),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("bus: lagged, dropped {n} events");
                    continue;
                }
            }
        }
    }

    /// Wait for the next message.
    pub async fn recv(&mut self) -> Result<BroadsideMessage, PollError> {
        loop {
            match self.inner.recv().await {
                Ok(msg) => return Ok(msg),
                Err(broadcast::error::RecvError::Closed) => return Err(PollError::Closed),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("bus: lagged, dropped {n} events");
                }
            }
        }
    }

    /// Drain everything currently queued.
    #[cfg(test)]
    pub fn drain(&mut self) -> Vec<BroadsideMessage> {
        let mut out = Vec::new();
        while let Ok(Some(msg)) = self.poll() {
            out.push(msg);
        }
        out
    }
}
