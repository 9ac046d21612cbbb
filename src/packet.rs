use byteorder::{ByteOrder, LittleEndian};

use crate::error::QueryError;

/// Out-of-band datagrams start with four `0xFF` bytes (-1 as a little-endian i32).
pub const OUT_OF_BAND: i32 = -1;

/// Size of the out-of-band marker.
pub const HEADER_LEN: usize = 4;

/// Big enough for a full `statusResponse` with a crowded player list.
pub const RECV_BUF_LEN: usize = 4096;

/// An out-of-band request: the marker followed by an ASCII command.
#[derive(Debug, PartialEq, Eq)]
pub struct RequestPacket {
    body: String,
}

impl RequestPacket {
    pub fn new(command: impl Into<String>) -> Self {
        RequestPacket { body: command.into() }
    }

    /// `rcon <password> <command>`
    pub fn rcon(password: &str, command: &str) -> Self {
        RequestPacket::new(format!("rcon {} {}", password, command))
    }

    /// Serializes the request into a single datagram.
    pub fn pack(&self) -> Vec<u8> {
        let mut payload: Vec<u8> = vec![0u8; HEADER_LEN];
        LittleEndian::write_i32(&mut payload[..HEADER_LEN], OUT_OF_BAND);
        payload.extend_from_slice(self.body.as_bytes());
        payload
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

/// A received out-of-band datagram with its marker removed.
#[derive(Debug, PartialEq, Eq)]
pub struct ResponsePacket {
    body: Vec<u8>,
}

impl ResponsePacket {
    /// Checks the echoed marker and splits it off.
    pub fn unpack(incoming: &[u8]) -> Result<Self, QueryError> {
        if incoming.len() < HEADER_LEN {
            return Err(QueryError::MalformedFraming(format!(
                "datagram of {} bytes is shorter than the header",
                incoming.len()
            )));
        }
        let header = LittleEndian::read_i32(&incoming[..HEADER_LEN]);
        if header != OUT_OF_BAND {
            return Err(QueryError::MalformedFraming(format!(
                "unexpected header {:#010x}",
                header
            )));
        }
        Ok(ResponsePacket {
            body: incoming[HEADER_LEN..].to_vec(),
        })
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }
}
