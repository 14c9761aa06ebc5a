//! Timestamped packets exchanged with a task runner
//!
//! A [`Packet`] is an immutable, type-erased payload stamped with a
//! [`Timestamp`]. Runners route packets by stream name through a
//! [`PacketMap`]. Cloning a packet shares the payload.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Number of runner ticks per millisecond
pub const MICROS_PER_MILLI: i64 = 1000;

/// Packets keyed by stream name
pub type PacketMap = HashMap<String, Packet>;

/// Runner timestamp in ticks (microseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Sentinel for packets that have not been stamped
    pub const UNSET: Timestamp = Timestamp(i64::MIN);

    /// Create a timestamp from raw ticks
    pub const fn new(ticks: i64) -> Self {
        Timestamp(ticks)
    }

    /// Convert caller milliseconds into ticks
    ///
    /// # Errors
    ///
    /// * `Error::UnsupportedInput` - `ms` has no tick representation
    pub fn from_millis(ms: i64) -> Result<Self> {
        ms.checked_mul(MICROS_PER_MILLI)
            .map(Timestamp)
            .filter(Timestamp::is_set)
            .ok_or_else(|| {
                Error::UnsupportedInput(format!(
                    "Timestamp {} ms is outside the supported range",
                    ms
                ))
            })
    }

    /// Raw tick value
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Tick value converted back to milliseconds (truncating)
    pub fn to_millis(&self) -> i64 {
        self.0 / MICROS_PER_MILLI
    }

    /// Whether the timestamp carries a real value
    pub fn is_set(&self) -> bool {
        *self != Timestamp::UNSET
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::UNSET
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            write!(f, "{}", self.0)
        } else {
            f.write_str("Timestamp::Unset")
        }
    }
}

/// Immutable payload plus timestamp
#[derive(Clone)]
pub struct Packet {
    payload: Option<Arc<dyn Any + Send + Sync>>,
    type_name: &'static str,
    timestamp: Timestamp,
}

impl Packet {
    /// Wrap a value in an unstamped packet
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            payload: Some(Arc::new(value)),
            type_name: type_name::<T>(),
            timestamp: Timestamp::UNSET,
        }
    }

    /// Packet with no payload
    pub fn empty() -> Self {
        Self {
            payload: None,
            type_name: "<empty>",
            timestamp: Timestamp::UNSET,
        }
    }

    /// Builder pattern: stamp the packet
    pub fn at(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Packet timestamp (may be unset)
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Whether the packet has no payload
    pub fn is_empty(&self) -> bool {
        self.payload.is_none()
    }

    /// Name of the payload type, for diagnostics
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the payload as `T`
    ///
    /// # Errors
    ///
    /// * `Error::Backend` - packet is empty or holds a different type
    pub fn get<T: Any>(&self) -> Result<&T> {
        let payload = self
            .payload
            .as_ref()
            .ok_or_else(|| Error::Backend(format!("Packet at {} is empty", self.timestamp)))?;
        payload.downcast_ref::<T>().ok_or_else(|| {
            Error::Backend(format!(
                "Packet holds {} but {} was requested",
                self.type_name,
                type_name::<T>()
            ))
        })
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("type", &self.type_name)
            .field("timestamp", &self.timestamp)
            .field("empty", &self.is_empty())
            .finish()
    }
}
