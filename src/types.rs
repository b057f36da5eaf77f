//! Core types for the event feed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Position in the event stream.
///
/// Checkpoints are opaque to subscriptions: they are only compared and handed
/// back to the event source, which defines what the number means.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Checkpoint(pub u64);

impl fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checkpoint({})", self.0)
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Checkpoint {
    pub fn next(self) -> Self {
        Checkpoint(self.0 + 1)
    }
}

/// Unique identifier for a committed transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Microseconds since Unix epoch.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Current time.
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or_default();
        Timestamp(micros)
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

/// Payload encoding format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PayloadEncoding {
    #[default]
    Json,
    Raw,
}

/// A single event inside a transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Application-defined type (e.g., "order-placed").
    pub event_type: String,

    /// Application-defined payload.
    pub payload: Vec<u8>,

    /// Payload encoding.
    pub encoding: PayloadEncoding,
}

impl Event {
    /// Decode a JSON payload into `T`.
    pub fn decode_json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

/// Input for creating a new event (before it is committed).
#[derive(Clone, Debug)]
pub struct EventInput {
    pub event_type: String,
    pub payload: Vec<u8>,
    pub encoding: PayloadEncoding,
}

impl EventInput {
    /// Create a new event input with JSON payload.
    pub fn json(event_type: impl Into<String>, payload: &impl Serialize) -> crate::Result<Self> {
        Ok(Self {
            event_type: event_type.into(),
            payload: serde_json::to_vec(payload)?,
            encoding: PayloadEncoding::Json,
        })
    }

    /// Create a new event input with raw bytes.
    pub fn raw(event_type: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            encoding: PayloadEncoding::Raw,
        }
    }

    pub(crate) fn into_event(self) -> Event {
        Event {
            event_type: self.event_type,
            payload: self.payload,
            encoding: self.encoding,
        }
    }
}

/// One committed unit of events.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier (assigned by the store).
    pub id: TransactionId,

    /// Stream the events were committed to.
    pub stream_id: String,

    /// Position of this transaction in the store.
    pub checkpoint: Checkpoint,

    /// When the transaction was committed.
    pub timestamp: Timestamp,

    /// Events in commit order.
    pub events: Vec<Event>,
}

/// One batch returned by an event source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Transactions in store order.
    pub transactions: Vec<Transaction>,

    /// Checkpoint marking the end of this batch.
    pub checkpoint: Checkpoint,
}

impl Page {
    pub fn new(transactions: Vec<Transaction>, checkpoint: Checkpoint) -> Self {
        Self {
            transactions,
            checkpoint,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_ordering() {
        assert!(Checkpoint(10) < Checkpoint(25));
        assert_eq!(Checkpoint(5).next(), Checkpoint(6));
        assert_eq!(Checkpoint::default(), Checkpoint(0));
        assert_eq!(Some(Checkpoint(1)).max(None), Some(Checkpoint(1)));
    }

    #[test]
    fn test_event_input_json() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct OrderPlaced {
            order: u32,
        }

        let input = EventInput::json("order-placed", &OrderPlaced { order: 7 }).unwrap();
        assert_eq!(input.event_type, "order-placed");
        assert_eq!(input.encoding, PayloadEncoding::Json);

        let event = input.into_event();
        let decoded: OrderPlaced = event.decode_json().unwrap();
        assert_eq!(decoded, OrderPlaced { order: 7 });
    }

    #[test]
    fn test_raw_event_is_not_json() {
        let event = EventInput::raw("blob", vec![0xff, 0x00]).into_event();
        assert_eq!(event.encoding, PayloadEncoding::Raw);
        assert!(event.decode_json::<serde_json::Value>().is_err());
    }
}
