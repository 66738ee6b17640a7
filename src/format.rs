//! The mpylib container format.
//!
//! A container is a flat concatenation of (header, payload) records with no
//! separators or trailing index; readers discover record boundaries by
//! scanning forward from the start. Every header carries two fixed magic
//! words followed by the name length and payload size as little-endian u32s,
//! then the raw name bytes.

use thiserror::Error;

/// First magic word of every record header (`"Wokw"` on the wire).
pub const MAGIC0: u32 = 0x776B_6F57;

/// Second magic word of every record header (`"iAR0"` on the wire).
pub const MAGIC1: u32 = 0x3052_4169;

/// Fixed byte length of the integer portion of a header.
pub const HEADER_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Value does not fit in a 32-bit header field: {what} = {value}")]
    Overflow { what: &'static str, value: u64 },

    #[error("Bad magic word at offset {offset}: expected {expected:#010x}, got {actual:#010x}")]
    BadMagic {
        offset: usize,
        expected: u32,
        actual: u32,
    },

    #[error("Truncated container: needed {needed} more bytes at offset {offset}")]
    Truncated { offset: usize, needed: usize },

    #[error("Record name is not valid UTF-8 at offset {offset}")]
    InvalidName { offset: usize },
}

/// Encode a record header for `name` and a payload of `payload_size` bytes.
///
/// The returned buffer is the four u32 fields in little-endian order followed
/// by the raw name bytes; the caller appends the payload immediately after.
///
/// # Errors
///
/// Returns [`FormatError::Overflow`] if the name length or payload size does
/// not fit in a u32 field. Values are never truncated or wrapped.
pub fn encode_header(name: &str, payload_size: u64) -> Result<Vec<u8>, FormatError> {
    let name_len = u32::try_from(name.len()).map_err(|_| FormatError::Overflow {
        what: "name length",
        value: name.len() as u64,
    })?;
    let size = u32::try_from(payload_size).map_err(|_| FormatError::Overflow {
        what: "payload size",
        value: payload_size,
    })?;

    let mut buf = Vec::with_capacity(HEADER_LEN + name.len());
    buf.extend_from_slice(&MAGIC0.to_le_bytes());
    buf.extend_from_slice(&MAGIC1.to_le_bytes());
    buf.extend_from_slice(&name_len.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    buf.extend_from_slice(name.as_bytes());
    Ok(buf)
}

/// A single record recovered from a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Archive-relative name, e.g. `mylib/a/x.mpy`.
    pub name: String,
    /// Raw payload bytes.
    pub payload: Vec<u8>,
}

/// Scan a container from the start and return its records in order.
///
/// This is the consumer-side contract of the format: record boundaries exist
/// only in the headers, so the whole stream is walked sequentially, checking
/// both magic words per record and the exact name/payload byte counts.
///
/// # Errors
///
/// Returns [`FormatError::BadMagic`] on a magic-word mismatch,
/// [`FormatError::Truncated`] if the stream ends mid-record, and
/// [`FormatError::InvalidName`] if a name is not UTF-8.
pub fn read_entries(bytes: &[u8]) -> Result<Vec<Entry>, FormatError> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let magic0 = read_u32(bytes, &mut offset)?;
        if magic0 != MAGIC0 {
            return Err(FormatError::BadMagic {
                offset: offset - 4,
                expected: MAGIC0,
                actual: magic0,
            });
        }
        let magic1 = read_u32(bytes, &mut offset)?;
        if magic1 != MAGIC1 {
            return Err(FormatError::BadMagic {
                offset: offset - 4,
                expected: MAGIC1,
                actual: magic1,
            });
        }

        let name_len = read_u32(bytes, &mut offset)? as usize;
        let payload_size = read_u32(bytes, &mut offset)? as usize;

        let name_bytes = take(bytes, &mut offset, name_len)?;
        let name = std::str::from_utf8(name_bytes)
            .map_err(|_| FormatError::InvalidName {
                offset: offset - name_len,
            })?
            .to_string();

        let payload = take(bytes, &mut offset, payload_size)?.to_vec();
        entries.push(Entry { name, payload });
    }

    Ok(entries)
}

fn read_u32(bytes: &[u8], offset: &mut usize) -> Result<u32, FormatError> {
    let slice = take(bytes, offset, 4)?;
    Ok(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn take<'a>(bytes: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8], FormatError> {
    let end = offset.checked_add(len).ok_or(FormatError::Truncated {
        offset: *offset,
        needed: len,
    })?;
    if end > bytes.len() {
        return Err(FormatError::Truncated {
            offset: *offset,
            needed: end - bytes.len(),
        });
    }
    let slice = &bytes[*offset..end];
    *offset = end;
    Ok(slice)
}
