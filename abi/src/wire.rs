//! Little-endian cursor codec shared by requests, replies and events.
//!
//! Every message is a 4-byte type tag followed by a fixed body. Fields are
//! written at their natural alignment; callers insert explicit padding so the
//! byte layout matches the equivalent `#[repr(C)]` struct.

use core::fmt;

/// Largest message body accepted on any display channel.
pub const MAX_PAYLOAD: usize = 8192;

/// Kernel handles that may ride along with one message.
pub const MAX_HANDLES: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// Body shorter than the layout for its tag.
    Truncated,
    /// Output buffer cannot hold the encoded message.
    BufferTooSmall,
    /// Tag not part of the compiled-in protocol.
    UnknownType(u32),
    /// A field holds a value outside its domain.
    InvalidField,
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated => write!(f, "truncated message"),
            Self::BufferTooSmall => write!(f, "buffer too small"),
            Self::UnknownType(t) => write!(f, "unknown message type {:#x}", t),
            Self::InvalidField => write!(f, "invalid field value"),
        }
    }
}

pub type WireResult<T> = Result<T, ProtocolError>;

pub struct WireWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WireWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> WireResult<()> {
        let end = self.pos + bytes.len();
        let dst = self
            .buf
            .get_mut(self.pos..end)
            .ok_or(ProtocolError::BufferTooSmall)?;
        dst.copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    pub fn put_u32(&mut self, v: u32) -> WireResult<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    pub fn put_i32(&mut self, v: i32) -> WireResult<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    pub fn put_u16(&mut self, v: u16) -> WireResult<()> {
        self.put_bytes(&v.to_le_bytes())
    }

    pub fn put_u8(&mut self, v: u8) -> WireResult<()> {
        self.put_bytes(&[v])
    }

    pub fn put_bool(&mut self, v: bool) -> WireResult<()> {
        self.put_u8(v as u8)
    }

    pub fn pad(&mut self, n: usize) -> WireResult<()> {
        for _ in 0..n {
            self.put_u8(0)?;
        }
        Ok(())
    }

    /// Bytes written so far.
    pub fn finish(self) -> usize {
        self.pos
    }
}

pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn get_bytes(&mut self, n: usize) -> WireResult<&'a [u8]> {
        let end = self.pos + n;
        let src = self.buf.get(self.pos..end).ok_or(ProtocolError::Truncated)?;
        self.pos = end;
        Ok(src)
    }

    pub fn get_array<const N: usize>(&mut self) -> WireResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.get_bytes(N)?);
        Ok(out)
    }

    pub fn get_u32(&mut self) -> WireResult<u32> {
        Ok(u32::from_le_bytes(self.get_array::<4>()?))
    }

    pub fn get_i32(&mut self) -> WireResult<i32> {
        Ok(i32::from_le_bytes(self.get_array::<4>()?))
    }

    pub fn get_u16(&mut self) -> WireResult<u16> {
        Ok(u16::from_le_bytes(self.get_array::<2>()?))
    }

    pub fn get_u8(&mut self) -> WireResult<u8> {
        Ok(self.get_array::<1>()?[0])
    }

    pub fn get_bool(&mut self) -> WireResult<bool> {
        Ok(self.get_u8()? != 0)
    }

    pub fn skip(&mut self, n: usize) -> WireResult<()> {
        self.get_bytes(n).map(|_| ())
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// Read the leading type tag without consuming the message.
pub fn peek_tag(buf: &[u8]) -> WireResult<u32> {
    WireReader::new(buf).get_u32()
}
