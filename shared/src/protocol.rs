//! Application message catalog and byte layout.
//!
//! Every message starts with one tag byte; the remaining fields follow in a
//! fixed, type-specific little-endian order:
//!
//! | tag | message       | fields                                          |
//! |-----|---------------|-------------------------------------------------|
//! | 0   | join          | (none)                                          |
//! | 1   | player-move   | id u16, x f32, y f32                            |
//! | 2   | welcome       | id u16                                          |
//! | 3   | entity-joined | id u16, x f32, y f32, color u32                 |
//! | 4   | entity-left   | id u16                                          |
//! | 5   | snapshot      | id u16, x f32, y f32, size f32                  |
//! | 6   | devoured      | devoured u16, devourer u16, size f32, x f32, y f32 |
//! | 7   | score-update  | id u16, score i32                               |
//! | 8   | game-time     | seconds i32                                     |
//! | 9   | game-over     | winner u16, score i32                           |
//!
//! Encoding is pure and total. Decoding never reads past the supplied
//! length: a truncated payload or an unknown tag is reported as
//! [`DecodeError`] and dropped by callers, while a buffer shorter than one
//! byte decodes as [`Message::Join`], a defensive default kept for wire
//! compatibility, not an error.

use crate::wire::{ByteReader, ByteWriter};
use std::fmt;

/// Delivery class a message travels on. The transport guarantees delivery
/// and ordering for [`Channel::Reliable`], delivery only for
/// [`Channel::ReliableUnordered`], and nothing for [`Channel::Unreliable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Reliable,
    ReliableUnordered,
    Unreliable,
}

/// Wire tags. The numbering is part of the protocol and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageType {
    Join = 0,
    PlayerMove = 1,
    Welcome = 2,
    EntityJoined = 3,
    EntityLeft = 4,
    Snapshot = 5,
    Devoured = 6,
    ScoreUpdate = 7,
    GameTime = 8,
    GameOver = 9,
}

impl MessageType {
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Join),
            1 => Some(Self::PlayerMove),
            2 => Some(Self::Welcome),
            3 => Some(Self::EntityJoined),
            4 => Some(Self::EntityLeft),
            5 => Some(Self::Snapshot),
            6 => Some(Self::Devoured),
            7 => Some(Self::ScoreUpdate),
            8 => Some(Self::GameTime),
            9 => Some(Self::GameOver),
            _ => None,
        }
    }
}

/// Returns the tag of a raw buffer without decoding it. O(1) and
/// side-effect-free. Buffers shorter than one byte, and unknown tags, fall
/// back to the lowest-numbered type, `Join`.
pub fn type_of(bytes: &[u8]) -> MessageType {
    bytes
        .first()
        .and_then(|tag| MessageType::from_tag(*tag))
        .unwrap_or(MessageType::Join)
}

#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    UnknownTag(u8),
    Truncated(MessageType),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownTag(tag) => write!(f, "unknown message tag {}", tag),
            DecodeError::Truncated(ty) => write!(f, "truncated {:?} payload", ty),
        }
    }
}

impl std::error::Error for DecodeError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Client requests to enter the arena.
    Join,
    /// Client-reported position of its controlled entity.
    PlayerMove { id: u16, x: f32, y: f32 },
    /// Tells the joining client which entity it controls.
    Welcome { id: u16 },
    /// A new entity exists; sent once per entity per viewer.
    EntityJoined { id: u16, x: f32, y: f32, color: u32 },
    /// The controlling viewer of this entity went away.
    EntityLeft { id: u16 },
    /// Authoritative per-tick position and size for one entity.
    Snapshot { id: u16, x: f32, y: f32, size: f32 },
    /// A devour resolved: `new_size` is the devourer's grown size,
    /// `new_x`/`new_y` the devoured entity's respawn position.
    Devoured {
        devoured: u16,
        devourer: u16,
        new_size: f32,
        new_x: f32,
        new_y: f32,
    },
    ScoreUpdate { id: u16, score: i32 },
    GameTime { seconds_remaining: i32 },
    GameOver { winner: u16, winner_score: i32 },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Join => MessageType::Join,
            Message::PlayerMove { .. } => MessageType::PlayerMove,
            Message::Welcome { .. } => MessageType::Welcome,
            Message::EntityJoined { .. } => MessageType::EntityJoined,
            Message::EntityLeft { .. } => MessageType::EntityLeft,
            Message::Snapshot { .. } => MessageType::Snapshot,
            Message::Devoured { .. } => MessageType::Devoured,
            Message::ScoreUpdate { .. } => MessageType::ScoreUpdate,
            Message::GameTime { .. } => MessageType::GameTime,
            Message::GameOver { .. } => MessageType::GameOver,
        }
    }

    /// Channel policy. Lifecycle and event messages ride the reliable
    /// ordered channel; per-tick positional messages are expendable, since the
    /// next tick supersedes them.
    pub fn channel(&self) -> Channel {
        match self.message_type() {
            MessageType::PlayerMove | MessageType::Snapshot => Channel::Unreliable,
            _ => Channel::Reliable,
        }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(16);
        w.write_u8(self.message_type() as u8);
        match self {
            Message::Join => {}
            Message::PlayerMove { id, x, y } => {
                w.write_u16(*id);
                w.write_f32(*x);
                w.write_f32(*y);
            }
            Message::Welcome { id } => {
                w.write_u16(*id);
            }
            Message::EntityJoined { id, x, y, color } => {
                w.write_u16(*id);
                w.write_f32(*x);
                w.write_f32(*y);
                w.write_u32(*color);
            }
            Message::EntityLeft { id } => {
                w.write_u16(*id);
            }
            Message::Snapshot { id, x, y, size } => {
                w.write_u16(*id);
                w.write_f32(*x);
                w.write_f32(*y);
                w.write_f32(*size);
            }
            Message::Devoured {
                devoured,
                devourer,
                new_size,
                new_x,
                new_y,
            } => {
                w.write_u16(*devoured);
                w.write_u16(*devourer);
                w.write_f32(*new_size);
                w.write_f32(*new_x);
                w.write_f32(*new_y);
            }
            Message::ScoreUpdate { id, score } => {
                w.write_u16(*id);
                w.write_i32(*score);
            }
            Message::GameTime { seconds_remaining } => {
                w.write_i32(*seconds_remaining);
            }
            Message::GameOver {
                winner,
                winner_score,
            } => {
                w.write_u16(*winner);
                w.write_i32(*winner_score);
            }
        }
        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Message, DecodeError> {
        let mut r = ByteReader::new(bytes);
        let tag = match r.read_u8() {
            Some(tag) => tag,
            // Shorter than one byte: defensive join fallback.
            None => return Ok(Message::Join),
        };
        let ty = MessageType::from_tag(tag).ok_or(DecodeError::UnknownTag(tag))?;
        let truncated = DecodeError::Truncated(ty);

        let message = match ty {
            MessageType::Join => Message::Join,
            MessageType::PlayerMove => Message::PlayerMove {
                id: r.read_u16().ok_or_else(|| truncated.clone())?,
                x: r.read_f32().ok_or_else(|| truncated.clone())?,
                y: r.read_f32().ok_or(truncated)?,
            },
            MessageType::Welcome => Message::Welcome {
                id: r.read_u16().ok_or(truncated)?,
            },
            MessageType::EntityJoined => Message::EntityJoined {
                id: r.read_u16().ok_or_else(|| truncated.clone())?,
                x: r.read_f32().ok_or_else(|| truncated.clone())?,
                y: r.read_f32().ok_or_else(|| truncated.clone())?,
                color: r.read_u32().ok_or(truncated)?,
            },
            MessageType::EntityLeft => Message::EntityLeft {
                id: r.read_u16().ok_or(truncated)?,
            },
            MessageType::Snapshot => Message::Snapshot {
                id: r.read_u16().ok_or_else(|| truncated.clone())?,
                x: r.read_f32().ok_or_else(|| truncated.clone())?,
                y: r.read_f32().ok_or_else(|| truncated.clone())?,
                size: r.read_f32().ok_or(truncated)?,
            },
            MessageType::Devoured => Message::Devoured {
                devoured: r.read_u16().ok_or_else(|| truncated.clone())?,
                devourer: r.read_u16().ok_or_else(|| truncated.clone())?,
                new_size: r.read_f32().ok_or_else(|| truncated.clone())?,
                new_x: r.read_f32().ok_or_else(|| truncated.clone())?,
                new_y: r.read_f32().ok_or(truncated)?,
            },
            MessageType::ScoreUpdate => Message::ScoreUpdate {
                id: r.read_u16().ok_or_else(|| truncated.clone())?,
                score: r.read_i32().ok_or(truncated)?,
            },
            MessageType::GameTime => Message::GameTime {
                seconds_remaining: r.read_i32().ok_or(truncated)?,
            },
            MessageType::GameOver => Message::GameOver {
                winner: r.read_u16().ok_or_else(|| truncated.clone())?,
                winner_score: r.read_i32().ok_or(truncated)?,
            },
        };
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_messages() -> Vec<Message> {
        vec![
            Message::Join,
            Message::PlayerMove {
                id: 7,
                x: -12.5,
                y: 450.0,
            },
            Message::Welcome { id: 0 },
            Message::EntityJoined {
                id: u16::MAX - 1,
                x: 0.0,
                y: -0.0,
                color: 0xFF44CC88,
            },
            Message::EntityLeft { id: 12 },
            Message::Snapshot {
                id: 3,
                x: 499.9,
                y: -499.9,
                size: 100.0,
            },
            Message::Devoured {
                devoured: 1,
                devourer: 2,
                new_size: 11.0,
                new_x: -40.0,
                new_y: 320.0,
            },
            Message::ScoreUpdate {
                id: 9,
                score: i32::MAX,
            },
            Message::GameTime {
                seconds_remaining: 0,
            },
            Message::GameOver {
                winner: 4,
                winner_score: i32::MIN,
            },
        ]
    }

    #[test]
    fn test_roundtrip_all_messages() {
        for message in all_messages() {
            let encoded = message.encode();
            let decoded = Message::decode(&encoded).unwrap();
            assert_eq!(decoded, message);
        }
    }

    #[test]
    fn test_tag_byte_leads() {
        for message in all_messages() {
            let encoded = message.encode();
            assert_eq!(encoded[0], message.message_type() as u8);
            assert_eq!(type_of(&encoded), message.message_type());
        }
    }

    #[test]
    fn test_empty_buffer_is_join_fallback() {
        assert_eq!(Message::decode(&[]).unwrap(), Message::Join);
        assert_eq!(type_of(&[]), MessageType::Join);
    }

    #[test]
    fn test_unknown_tag_is_an_error() {
        let err = Message::decode(&[200, 1, 2, 3]).unwrap_err();
        assert_eq!(err, DecodeError::UnknownTag(200));
    }

    #[test]
    fn test_truncated_payload_is_an_error() {
        let full = Message::Snapshot {
            id: 3,
            x: 1.0,
            y: 2.0,
            size: 5.0,
        }
        .encode();
        for cut in 1..full.len() {
            let err = Message::decode(&full[..cut]).unwrap_err();
            assert_eq!(err, DecodeError::Truncated(MessageType::Snapshot));
        }
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut encoded = Message::Welcome { id: 41 }.encode();
        encoded.extend_from_slice(&[0xFF; 8]);
        assert_eq!(
            Message::decode(&encoded).unwrap(),
            Message::Welcome { id: 41 }
        );
    }

    #[test]
    fn test_channel_policy() {
        for message in all_messages() {
            let expected = match message.message_type() {
                MessageType::PlayerMove | MessageType::Snapshot => Channel::Unreliable,
                _ => Channel::Reliable,
            };
            assert_eq!(message.channel(), expected);
        }
    }

    #[test]
    fn test_boundary_field_values() {
        let message = Message::Devoured {
            devoured: 0,
            devourer: u16::MAX,
            new_size: f32::MIN_POSITIVE,
            new_x: f32::MAX,
            new_y: f32::MIN,
        };
        assert_eq!(Message::decode(&message.encode()).unwrap(), message);
    }
}
