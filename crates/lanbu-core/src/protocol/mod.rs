//! Wire protocol: the presence beacon and its text codec.

pub mod beacon;

pub use beacon::{
    decode_beacon, decode_datagram, encode_beacon, BeaconMessage, ParseError, MAX_BEACON_LEN,
    PROTOCOL_TAG,
};

/// Well-known UDP port beacons are broadcast on.
pub const DEFAULT_DISCOVERY_PORT: u16 = 47777;
