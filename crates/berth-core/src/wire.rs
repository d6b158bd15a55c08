//! berth wire format — the on-wire shape of a scheduler assignment.
//!
//! An encoded assignment is a fixed 44-byte `AssignmentHeader` followed by
//! exactly `length` bytes of task template blob. Every field of the header
//! is part of the format; changing anything here breaks in-flight
//! assignments.
//!
//! The header is `#[repr(C, packed)]` with zerocopy derives, so it is read
//! and written without allocation and without unsafe code. Multi-byte
//! integers are little-endian regardless of host.

use bytes::{Bytes, BytesMut};
use static_assertions::assert_eq_size;
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{AsBytes, FromBytes, FromZeroes};

// ── Assignment Header ────────────────────────────────────────────────────────

/// Fixed prefix of every encoded assignment.
///
/// The receiver can verify the blob against `content_hash` before handing
/// anything to the resolver.
///
/// Wire size: 44 bytes.
#[derive(Debug, Clone, AsBytes, FromBytes, FromZeroes)]
#[repr(C, packed)]
pub struct AssignmentHeader {
    /// BLAKE3 hash of the template blob.
    /// A mismatch rejects the whole assignment.
    pub content_hash: [u8; 32],

    /// Which instance of the job this assignment binds.
    pub instance_id: U32<LittleEndian>,

    /// Length of the template blob in bytes, not including this header.
    pub length: U32<LittleEndian>,

    /// Reserved, must be zero.
    pub flags: u8,

    /// Wire format version. Currently 0x01.
    pub version: u8,

    /// Reserved, must be zero.
    pub reserved: [u8; 2],
}

// Compile-time size guard. If this fails, the wire format has silently changed.
assert_eq_size!(AssignmentHeader, [u8; 44]);

impl AssignmentHeader {
    /// Build the header describing `blob` for the given instance.
    pub fn for_blob(instance_id: u32, blob: &[u8]) -> Result<Self, EncodeError> {
        Ok(Self {
            content_hash: *blake3::hash(blob).as_bytes(),
            instance_id: U32::new(instance_id),
            length: U32::new(wire_length(blob.len())?),
            flags: 0,
            version: ASSIGNMENT_VERSION,
            reserved: [0u8; 2],
        })
    }
}

/// Blob length as carried in the header. Blobs past `u32::MAX` bytes
/// cannot be framed.
fn wire_length(len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::TemplateTooLarge(len))
}

// ── Constants ─────────────────────────────────────────────────────────────────

/// Current assignment format version.
pub const ASSIGNMENT_VERSION: u8 = 0x01;

/// Size of `AssignmentHeader` on the wire.
pub const HEADER_LEN: usize = 44;

/// Default upper bound on the template blob: 1 MiB.
pub const MAX_TEMPLATE_BYTES: usize = 1 << 20;

// ── Assigned Task ─────────────────────────────────────────────────────────────

/// A decoded scheduler assignment.
///
/// `task` is the embedded task template blob, left as text. Interpreting it
/// is the resolver's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignedTask {
    pub task: String,
    pub instance_id: u32,
}

impl AssignedTask {
    pub fn new(task: impl Into<String>, instance_id: u32) -> Self {
        Self {
            task: task.into(),
            instance_id,
        }
    }

    /// Serialize to header + blob.
    pub fn encode(&self) -> Result<Bytes, EncodeError> {
        let blob = self.task.as_bytes();
        let header = AssignmentHeader::for_blob(self.instance_id, blob)?;

        let mut buf = BytesMut::with_capacity(HEADER_LEN + blob.len());
        buf.extend_from_slice(header.as_bytes());
        buf.extend_from_slice(blob);
        Ok(buf.freeze())
    }

    /// Decode with the default blob limit.
    pub fn decode(raw: &[u8]) -> Result<Self, DecodeError> {
        Self::decode_bounded(raw, MAX_TEMPLATE_BYTES)
    }

    /// Decode, rejecting blobs longer than `max_template_bytes`.
    ///
    /// Either the whole assignment is accepted or an error is returned;
    /// there is no partial result.
    pub fn decode_bounded(raw: &[u8], max_template_bytes: usize) -> Result<Self, DecodeError> {
        let header = AssignmentHeader::read_from_prefix(raw).ok_or(DecodeError::Truncated {
            needed: HEADER_LEN,
            available: raw.len(),
        })?;

        // Copy packed fields to locals before inspecting them.
        let version = header.version;
        let flags = header.flags;
        let reserved = header.reserved;
        let content_hash = header.content_hash;
        let instance_id = header.instance_id.get();
        let length = header.length.get() as usize;

        if version != ASSIGNMENT_VERSION {
            return Err(DecodeError::UnknownVersion(version));
        }
        if flags != 0 {
            return Err(DecodeError::ReservedFlagsSet(flags));
        }
        if reserved != [0u8; 2] {
            return Err(DecodeError::ReservedBytesSet);
        }
        if length > max_template_bytes {
            return Err(DecodeError::TemplateTooLarge {
                length,
                max: max_template_bytes,
            });
        }

        let body = &raw[HEADER_LEN..];
        if body.len() < length {
            return Err(DecodeError::Truncated {
                needed: HEADER_LEN + length,
                available: raw.len(),
            });
        }
        if body.len() > length {
            return Err(DecodeError::TrailingBytes(body.len() - length));
        }

        if blake3::hash(body).as_bytes() != &content_hash {
            return Err(DecodeError::ChecksumMismatch);
        }

        let task = std::str::from_utf8(body)
            .map_err(|e| DecodeError::InvalidUtf8(e.valid_up_to()))?
            .to_owned();

        Ok(Self { task, instance_id })
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Errors that can arise when decoding an assignment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("premature end of input: needed {needed} bytes, got {available}")]
    Truncated { needed: usize, available: usize },

    #[error("unknown assignment version: 0x{0:02x}")]
    UnknownVersion(u8),

    #[error("reserved flags are non-zero: 0x{0:02x}")]
    ReservedFlagsSet(u8),

    #[error("reserved header bytes are non-zero")]
    ReservedBytesSet,

    #[error("template length {length} exceeds maximum {max}")]
    TemplateTooLarge { length: usize, max: usize },

    #[error("{0} trailing bytes after template blob")]
    TrailingBytes(usize),

    #[error("template blob does not match content hash")]
    ChecksumMismatch,

    #[error("template blob is not UTF-8 (valid up to byte {0})")]
    InvalidUtf8(usize),
}

/// Errors that can arise when encoding an assignment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("template length {0} does not fit the 32-bit length field")]
    TemplateTooLarge(usize),
}

// ── Tests ─────────────────────────────────────────────────────────────────────
