// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Payload Codecs
//!
//! A codec turns a typed value into the bytes carried by an AMQP message and back.
//! Two interchangeable formats are provided: [`JsonCodec`], which keeps field names
//! and is readable from the management UI, and [`BincodeCodec`], a compact binary
//! format coupled to the Rust type layout on both ends.

use crate::errors::CodecError;
use serde::{de::DeserializeOwned, Serialize};

/// Content type used for JSON payloads
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Content type used for bincode payloads
pub const BINCODE_CONTENT_TYPE: &str = "application/x-bincode";

/// A serialization format for message payloads.
pub trait Codec: Send + Sync + 'static {
    /// The value set as the AMQP `content-type` property of published messages.
    fn content_type(&self) -> &'static str;

    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, CodecError>
    where
        T: Serialize + ?Sized;

    fn decode<T>(&self, data: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned;
}

/// JSON payloads through `serde_json`, keeping the wire field names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        JSON_CONTENT_TYPE
    }

    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, CodecError>
    where
        T: Serialize + ?Sized,
    {
        serde_json::to_vec(value).map_err(|err| CodecError::Encode(err.to_string()))
    }

    fn decode<T>(&self, data: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        serde_json::from_slice(data).map_err(|err| CodecError::Decode(err.to_string()))
    }
}

/// Compact binary payloads through `bincode`. Both ends must share the Rust type
/// layout; field names are not carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BincodeCodec;

impl Codec for BincodeCodec {
    fn content_type(&self) -> &'static str {
        BINCODE_CONTENT_TYPE
    }

    fn encode<T>(&self, value: &T) -> Result<Vec<u8>, CodecError>
    where
        T: Serialize + ?Sized,
    {
        bincode::serialize(value).map_err(|err| CodecError::Encode(err.to_string()))
    }

    fn decode<T>(&self, data: &[u8]) -> Result<T, CodecError>
    where
        T: DeserializeOwned,
    {
        bincode::deserialize(data).map_err(|err| CodecError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::{ArmyMove, GameLog, Player, PlayingState, Unit, UnitRank};
    use chrono::{TimeZone, Utc};

    fn sample_move() -> ArmyMove {
        ArmyMove {
            player: Player::new("alice"),
            units: vec![
                Unit {
                    id: 1,
                    rank: UnitRank::Infantry,
                    location: "europe".to_owned(),
                },
                Unit {
                    id: 2,
                    rank: UnitRank::Artillery,
                    location: "europe".to_owned(),
                },
            ],
            to_location: "asia".to_owned(),
        }
    }

    fn sample_log() -> GameLog {
        GameLog {
            current_time: Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap(),
            message: "alice won a war against bob".to_owned(),
            username: "alice".to_owned(),
        }
    }

    #[test]
    fn json_round_trips_game_payloads() {
        let codec = JsonCodec;

        let mv = sample_move();
        let decoded: ArmyMove = codec.decode(&codec.encode(&mv).unwrap()).unwrap();
        assert_eq!(decoded, mv);

        let log = sample_log();
        let decoded: GameLog = codec.decode(&codec.encode(&log).unwrap()).unwrap();
        assert_eq!(decoded, log);
    }

    #[test]
    fn bincode_round_trips_game_payloads() {
        let codec = BincodeCodec;

        let mv = sample_move();
        let decoded: ArmyMove = codec.decode(&codec.encode(&mv).unwrap()).unwrap();
        assert_eq!(decoded, mv);

        let log = sample_log();
        let decoded: GameLog = codec.decode(&codec.encode(&log).unwrap()).unwrap();
        assert_eq!(decoded, log);
    }

    #[test]
    fn json_keeps_wire_field_names() {
        let data = JsonCodec.encode(&PlayingState { is_paused: true }).unwrap();
        assert_eq!(data, br#"{"IsPaused":true}"#.to_vec());
    }

    #[test]
    fn decode_failure_is_reported() {
        let err = JsonCodec.decode::<PlayingState>(b"not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));

        let err = BincodeCodec.decode::<GameLog>(&[1, 2]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn content_types_differ() {
        assert_eq!(JsonCodec.content_type(), JSON_CONTENT_TYPE);
        assert_eq!(BincodeCodec.content_type(), BINCODE_CONTENT_TYPE);
    }
}
