//! Save state blobs.
//!
//! Every subsystem serializes itself into its own blob: a 4-byte magic, a
//! version byte, then little-endian fields in a fixed order. Restores decode
//! and validate the whole blob before touching any live state, so a bad blob
//! never leaves a half-restored machine behind.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("bad magic: expected {expected:?}, found {found:?}")]
    BadMagic { expected: [u8; 4], found: [u8; 4] },

    #[error("unsupported {subsystem} state version {found} (expected {expected})")]
    UnsupportedVersion {
        subsystem: &'static str,
        expected: u8,
        found: u8,
    },

    #[error("{subsystem} state truncated: needed {needed} more bytes")]
    Truncated {
        subsystem: &'static str,
        needed: usize,
    },

    #[error("{subsystem} state has {extra} trailing bytes")]
    Oversized {
        subsystem: &'static str,
        extra: usize,
    },

    #[error("{subsystem} state is {found} bytes, expected {expected}")]
    SizeMismatch {
        subsystem: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("corrupt {subsystem} state: {reason}")]
    Corrupt {
        subsystem: &'static str,
        reason: String,
    },
}

/// Appends fields to a blob.
pub struct StateWriter {
    data: Vec<u8>,
}

impl StateWriter {
    #[must_use]
    pub fn new(magic: &[u8; 4], version: u8) -> Self {
        let mut data = Vec::new();
        data.extend_from_slice(magic);
        data.push(version);
        Self { data }
    }

    pub fn u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn bool(&mut self, value: bool) {
        self.data.push(u8::from(value));
    }

    pub fn u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn u32s(&mut self, values: &[u32]) {
        for value in values {
            self.u32(*value);
        }
    }

    pub fn bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// A length-prefixed byte run.
    pub fn chunk(&mut self, bytes: &[u8]) {
        self.u32(bytes.len() as u32);
        self.bytes(bytes);
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// Reads fields back in the order they were written.
pub struct StateReader<'a> {
    subsystem: &'static str,
    data: &'a [u8],
}

impl<'a> StateReader<'a> {
    /// Checks magic and version and positions the reader on the first field.
    pub fn new(
        subsystem: &'static str,
        data: &'a [u8],
        magic: &[u8; 4],
        version: u8,
    ) -> Result<Self, StateError> {
        let mut reader = Self { subsystem, data };
        let found = reader.take(4)?;
        if found != magic {
            let mut found_magic = [0; 4];
            found_magic.copy_from_slice(found);
            return Err(StateError::BadMagic {
                expected: *magic,
                found: found_magic,
            });
        }
        let found = reader.u8()?;
        if found != version {
            return Err(StateError::UnsupportedVersion {
                subsystem,
                expected: version,
                found,
            });
        }
        Ok(reader)
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8], StateError> {
        if self.data.len() < len {
            return Err(StateError::Truncated {
                subsystem: self.subsystem,
                needed: len - self.data.len(),
            });
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    pub fn u8(&mut self) -> Result<u8, StateError> {
        Ok(self.take(1)?[0])
    }

    pub fn bool(&mut self) -> Result<bool, StateError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(self.corrupt(format!("boolean byte {other}"))),
        }
    }

    pub fn u16(&mut self) -> Result<u16, StateError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn u32(&mut self) -> Result<u32, StateError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn u32s<const N: usize>(&mut self) -> Result<[u32; N], StateError> {
        let mut values = [0; N];
        for value in &mut values {
            *value = self.u32()?;
        }
        Ok(values)
    }

    pub fn chunk(&mut self) -> Result<&'a [u8], StateError> {
        let len = self.u32()? as usize;
        self.take(len)
    }

    /// A length-prefixed run that must be exactly `expected` bytes.
    pub fn sized_chunk(&mut self, expected: usize) -> Result<&'a [u8], StateError> {
        let found = self.u32()? as usize;
        if found != expected {
            return Err(StateError::SizeMismatch {
                subsystem: self.subsystem,
                expected,
                found,
            });
        }
        self.take(found)
    }

    #[must_use]
    pub fn corrupt(&self, reason: impl Into<String>) -> StateError {
        StateError::Corrupt {
            subsystem: self.subsystem,
            reason: reason.into(),
        }
    }

    /// Fails when bytes are left over.
    pub fn finish(self) -> Result<(), StateError> {
        if self.data.is_empty() {
            Ok(())
        } else {
            Err(StateError::Oversized {
                subsystem: self.subsystem,
                extra: self.data.len(),
            })
        }
    }
}
