//! Text codec for the LAN presence beacon.
//!
//! Wire format (ASCII, one datagram per beacon):
//! ```text
//! LANBU_SERVER:<game_version>:<advertised_port>
//! ```
//! `<game_version>` is any non-empty string without `:`.  `<advertised_port>`
//! is a decimal integer in `1..=65535` naming the port the game session will
//! later be reached on; it is unrelated to the discovery port the beacon
//! travels over.
//!
//! # Why plain text? (for beginners)
//!
//! Beacons are tiny, sent once a second, and must be understood by every
//! engine build that wants to join a LAN game.  A colon-delimited string is
//! trivial to produce from any language and easy to inspect with a packet
//! sniffer, so the format trades compactness for interoperability.
//!
//! Receivers are strict: anything that does not match the shape exactly is
//! rejected with a [`ParseError`] and the caller drops the datagram.

use std::fmt;

use thiserror::Error;

/// Literal tag every beacon starts with.
pub const PROTOCOL_TAG: &str = "LANBU_SERVER";

/// Field separator used on the wire.
pub const FIELD_SEPARATOR: char = ':';

/// Largest datagram a well-formed beacon can plausibly need.
///
/// Receivers size their buffer with this; longer datagrams are truncated by
/// the OS and then fail to parse.
pub const MAX_BEACON_LEN: usize = 512;

/// Errors produced while decoding a beacon datagram.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The datagram is not valid UTF-8 text.
    #[error("beacon is not valid UTF-8")]
    NotUtf8,

    /// The text does not start with `LANBU_SERVER:`.
    #[error("missing `LANBU_SERVER:` prefix")]
    WrongPrefix,

    /// The payload after the prefix does not contain exactly two fields.
    #[error("expected 2 fields after prefix, found {found}")]
    FieldCount { found: usize },

    /// The game version field is empty.
    #[error("game version field is empty")]
    EmptyVersion,

    /// The port field is not a decimal integer in `1..=65535`.
    #[error("invalid advertised port {0:?}")]
    InvalidPort(String),
}

/// A host's presence announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconMessage {
    /// Version string of the game build hosting the session.
    pub game_version: String,
    /// Port on which the game session accepts connections.
    pub port: u16,
}

impl BeaconMessage {
    pub fn new(game_version: impl Into<String>, port: u16) -> Self {
        Self {
            game_version: game_version.into(),
            port,
        }
    }
}

impl fmt::Display for BeaconMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PROTOCOL_TAG}{FIELD_SEPARATOR}{}{FIELD_SEPARATOR}{}",
            self.game_version, self.port
        )
    }
}

/// Encodes a beacon into the bytes sent on the wire.
///
/// # Examples
///
/// ```rust
/// use lanbu_core::protocol::{encode_beacon, BeaconMessage};
///
/// let bytes = encode_beacon(&BeaconMessage::new("0.53", 7777));
/// assert_eq!(bytes, b"LANBU_SERVER:0.53:7777");
/// ```
pub fn encode_beacon(msg: &BeaconMessage) -> Vec<u8> {
    msg.to_string().into_bytes()
}

/// Decodes a raw datagram.
///
/// # Errors
///
/// Returns [`ParseError::NotUtf8`] for binary payloads, otherwise whatever
/// [`decode_beacon`] reports.
pub fn decode_datagram(bytes: &[u8]) -> Result<BeaconMessage, ParseError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ParseError::NotUtf8)?;
    decode_beacon(text)
}

/// Parses beacon text.
///
/// Trailing NUL bytes and whitespace are ignored; some engines terminate
/// their strings with `\0` or a newline before sending.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first rule the text violates.
///
/// # Examples
///
/// ```rust
/// use lanbu_core::protocol::{decode_beacon, ParseError};
///
/// let msg = decode_beacon("LANBU_SERVER:0.53:7777").unwrap();
/// assert_eq!(msg.game_version, "0.53");
/// assert_eq!(msg.port, 7777);
///
/// assert_eq!(decode_beacon("HELLO:1:2"), Err(ParseError::WrongPrefix));
/// ```
pub fn decode_beacon(text: &str) -> Result<BeaconMessage, ParseError> {
    let text = text.trim_end_matches(|c: char| c == '\0' || c.is_ascii_whitespace());

    let body = text
        .strip_prefix(PROTOCOL_TAG)
        .and_then(|rest| rest.strip_prefix(FIELD_SEPARATOR))
        .ok_or(ParseError::WrongPrefix)?;

    let fields: Vec<&str> = body.split(FIELD_SEPARATOR).collect();
    let [version, port] = fields.as_slice() else {
        return Err(ParseError::FieldCount {
            found: fields.len(),
        });
    };

    if version.is_empty() {
        return Err(ParseError::EmptyVersion);
    }

    Ok(BeaconMessage {
        game_version: (*version).to_string(),
        port: parse_port(port)?,
    })
}

fn parse_port(field: &str) -> Result<u16, ParseError> {
    // `u16::from_str` accepts a leading `+`; the wire format does not.
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidPort(field.to_string()));
    }
    match field.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(ParseError::InvalidPort(field.to_string())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
