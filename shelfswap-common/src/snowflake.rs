//! Snowflake ids for every record in the marketplace.
//!
//! Layout, from most to least significant bit:
//! 42 bits of milliseconds since [`Epoch::EPOCH_TIME`], a 5 bit worker id,
//! a 5 bit process id and a 12 bit sequence number.
//!
//! See <https://discord.com/developers/docs/reference#snowflakes>

use derive_where::derive_where;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

pub const TIMESTAMP_OFFSET: u32 = 22;
pub const TIMESTAMP_LENGTH: u32 = 42;
pub const WORKER_ID_OFFSET: u32 = 17;
pub const WORKER_ID_LENGTH: u32 = 5;
pub const PROCESS_ID_OFFSET: u32 = 12;
pub const PROCESS_ID_LENGTH: u32 = 5;
pub const SEQUENCE_LENGTH: u32 = 12;

const fn mask(length: u32) -> u64 {
    (1 << length) - 1
}

pub trait Epoch {
    const EPOCH_TIME: OffsetDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("{name} must fit into {length} bits, got {value}")]
pub struct SnowflakePartOutOfRangeError {
    name: &'static str,
    length: u32,
    value: u8,
}

macro_rules! node_part {
    ($name:ident, $length:ident) => {
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(u8);

        impl $name {
            pub fn new(value: u8) -> Result<Self, SnowflakePartOutOfRangeError> {
                if u64::from(value) <= mask($length) {
                    Ok(Self(value))
                } else {
                    Err(SnowflakePartOutOfRangeError {
                        name: stringify!($name),
                        length: $length,
                        value,
                    })
                }
            }

            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let inner = u8::deserialize(deserializer)?;
                Self::new(inner).map_err(|_| {
                    Error::invalid_value(Unexpected::Unsigned(inner.into()), &stringify!($name))
                })
            }
        }
    };
}

node_part!(WorkerId, WORKER_ID_LENGTH);
node_part!(ProcessId, PROCESS_ID_LENGTH);

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    #[must_use]
    pub fn from_parts(millis: u64, worker_id: WorkerId, process_id: ProcessId, sequence: u16) -> Self {
        let snowflake = (millis & mask(TIMESTAMP_LENGTH)) << TIMESTAMP_OFFSET
            | u64::from(worker_id.get()) << WORKER_ID_OFFSET
            | u64::from(process_id.get()) << PROCESS_ID_OFFSET
            | u64::from(sequence) & mask(SEQUENCE_LENGTH);

        Self::new(snowflake)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Milliseconds since the epoch at which this snowflake was generated.
    #[must_use]
    pub fn millis(self) -> u64 {
        self.0 >> TIMESTAMP_OFFSET
    }

    #[must_use]
    pub fn sequence(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let sequence = (self.0 & mask(SEQUENCE_LENGTH)) as u16;
        sequence
    }

    #[must_use]
    pub fn created_at(self) -> OffsetDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        #[allow(clippy::cast_possible_wrap)]
        let millis = self.millis() as i64;
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(millis)
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Hands out strictly increasing snowflakes for one worker/process pair.
///
/// When the clock has not advanced (or went backwards) since the last id,
/// the previous millisecond is reused with the next sequence number. A
/// sequence overflow borrows the following millisecond.
#[derive_where(Clone, Eq, PartialEq, Debug, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    last_millis: Option<u64>,
    sequence: u16,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch: Epoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            last_millis: None,
            sequence: 0,
            phantom_data: PhantomData,
        }
    }

    pub fn generate_at(&mut self, time: OffsetDateTime) -> Snowflake<SnowflakeEpoch> {
        let elapsed = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
        let millis = u64::try_from(elapsed.max(0)).unwrap_or(u64::MAX) & mask(TIMESTAMP_LENGTH);

        match self.last_millis {
            Some(last) if millis <= last => {
                if u64::from(self.sequence) == mask(SEQUENCE_LENGTH) {
                    self.last_millis = Some(last + 1);
                    self.sequence = 0;
                } else {
                    self.sequence += 1;
                }
            }
            _ => {
                self.last_millis = Some(millis);
                self.sequence = 0;
            }
        }

        Snowflake::from_parts(
            self.last_millis.unwrap_or(millis),
            self.worker_id,
            self.process_id,
            self.sequence,
        )
    }

    pub fn generate(&mut self) -> Snowflake<SnowflakeEpoch> {
        self.generate_at(OffsetDateTime::now_utc())
    }
}
