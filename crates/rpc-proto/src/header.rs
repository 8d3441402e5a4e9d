//! `RequestHeader` / `ResponseHeader` marshal and unmarshal.
//!
//! Both headers share the same field shape: a fixed-width compression tag,
//! a length-prefixed string, a pair of uvarints, and a trailing CRC32. The
//! two structs are kept distinct (rather than one generic header) because
//! their string field carries a different meaning (method name vs. error
//! message) and only the request side names a method.
//!
//! Each header wraps its fields behind a [`parking_lot::RwLock`] so a
//! pooled, reused record can be read by an accessor on one task while a
//! concurrent `unmarshal` call repopulates it on another -- mirroring how
//! the client and server codecs share one scratch record between a reader
//! task and the pool.

use parking_lot::RwLock;

use crate::errors::HeaderError;
use crate::varint;

/// Upper bound on a marshaled header excluding its variable-length string:
/// `2` (`CompressType`) + `10` (string length varint) + `10` (`ID`/`RequestLen`)
/// + `10` (second uvarint slot shared by both header kinds) + `4` (`Checksum`).
pub const FIXED_OVERHEAD: usize = 2 + 10 + 10 + 10 + 4;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct RequestFields {
    compress_type: u16,
    method: String,
    id: u64,
    request_len: u64,
    checksum: u32,
}

/// A pooled, reusable request header record.
#[derive(Debug, Default)]
pub struct RequestHeader {
    inner: RwLock<RequestFields>,
}

impl RequestHeader {
    /// Build a populated header directly, bypassing `unmarshal`.
    pub fn new(compress_type: u16, method: impl Into<String>, id: u64, request_len: u64, checksum: u32) -> Self {
        Self {
            inner: RwLock::new(RequestFields { compress_type, method: method.into(), id, request_len, checksum }),
        }
    }

    /// Registered [`crate::compress::CompressionTag`] value carried on the wire.
    pub fn compress_type(&self) -> u16 {
        self.inner.read().compress_type
    }

    /// Fully-qualified method name, e.g. `"ArithService.Add"`.
    pub fn method(&self) -> String {
        self.inner.read().method.clone()
    }

    /// Caller-chosen call identifier, opaque to the codec.
    pub fn id(&self) -> u64 {
        self.inner.read().id
    }

    /// Length of the compressed body frame that follows.
    pub fn request_len(&self) -> u64 {
        self.inner.read().request_len
    }

    /// CRC32-IEEE of the compressed body; `0` means "skip verification".
    pub fn checksum(&self) -> u32 {
        self.inner.read().checksum
    }

    /// Zero every field. Called by the pool before a record is reused.
    pub fn reset(&self) {
        *self.inner.write() = RequestFields::default();
    }

    /// Overwrite every field directly, without a marshal/unmarshal round trip.
    /// Used when populating a record acquired from [`crate::pool::HeaderPool`].
    pub fn populate(&self, compress_type: u16, method: impl Into<String>, id: u64, request_len: u64, checksum: u32) {
        *self.inner.write() = RequestFields { compress_type, method: method.into(), id, request_len, checksum };
    }

    /// Serialize in wire order: `CompressType, Method, ID, RequestLen, Checksum`.
    pub fn marshal(&self) -> Vec<u8> {
        let fields = self.inner.read();
        let mut buf = Vec::with_capacity(FIXED_OVERHEAD + fields.method.len());
        buf.extend_from_slice(&fields.compress_type.to_le_bytes());
        varint::encode(fields.method.len() as u64, &mut buf);
        buf.extend_from_slice(fields.method.as_bytes());
        varint::encode(fields.id, &mut buf);
        varint::encode(fields.request_len, &mut buf);
        buf.extend_from_slice(&fields.checksum.to_le_bytes());
        buf
    }

    /// Parse `buf` and overwrite this record's fields.
    ///
    /// On error the record's contents are left in a partially-overwritten,
    /// unspecified state; callers must treat it as invalid and not read it.
    pub fn unmarshal(&self, buf: &[u8]) -> Result<(), HeaderError> {
        let mut cursor = Cursor::new(buf);
        let compress_type = cursor.take_u16("CompressType")?;
        let method = cursor.take_string("Method")?;
        let id = cursor.take_varint("ID")?;
        let request_len = cursor.take_varint("RequestLen")?;
        let checksum = cursor.take_u32("Checksum")?;

        *self.inner.write() = RequestFields { compress_type, method, id, request_len, checksum };
        Ok(())
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ResponseFields {
    compress_type: u16,
    id: u64,
    error: String,
    response_len: u64,
    checksum: u32,
}

/// A pooled, reusable response header record.
#[derive(Debug, Default)]
pub struct ResponseHeader {
    inner: RwLock<ResponseFields>,
}

impl ResponseHeader {
    /// Build a populated header directly, bypassing `unmarshal`.
    pub fn new(compress_type: u16, id: u64, error: impl Into<String>, response_len: u64, checksum: u32) -> Self {
        Self {
            inner: RwLock::new(ResponseFields { compress_type, id, error: error.into(), response_len, checksum }),
        }
    }

    /// [`crate::compress::CompressionTag`] pinned from the request this answers.
    pub fn compress_type(&self) -> u16 {
        self.inner.read().compress_type
    }

    /// Echoes the caller's request ID.
    pub fn id(&self) -> u64 {
        self.inner.read().id
    }

    /// Empty string means success; otherwise the error message delivered verbatim.
    pub fn error(&self) -> String {
        self.inner.read().error.clone()
    }

    /// Length of the compressed body frame that follows.
    pub fn response_len(&self) -> u64 {
        self.inner.read().response_len
    }

    /// CRC32-IEEE of the compressed body; `0` means "skip verification".
    pub fn checksum(&self) -> u32 {
        self.inner.read().checksum
    }

    /// Zero every field. Called by the pool before a record is reused.
    pub fn reset(&self) {
        *self.inner.write() = ResponseFields::default();
    }

    /// Overwrite every field directly, without a marshal/unmarshal round trip.
    /// Used when populating a record acquired from [`crate::pool::HeaderPool`].
    pub fn populate(&self, compress_type: u16, id: u64, error: impl Into<String>, response_len: u64, checksum: u32) {
        *self.inner.write() = ResponseFields { compress_type, id, error: error.into(), response_len, checksum };
    }

    /// Serialize in wire order: `CompressType, ID, Error, ResponseLen, Checksum`.
    pub fn marshal(&self) -> Vec<u8> {
        let fields = self.inner.read();
        let mut buf = Vec::with_capacity(FIXED_OVERHEAD + fields.error.len());
        buf.extend_from_slice(&fields.compress_type.to_le_bytes());
        varint::encode(fields.id, &mut buf);
        varint::encode(fields.error.len() as u64, &mut buf);
        buf.extend_from_slice(fields.error.as_bytes());
        varint::encode(fields.response_len, &mut buf);
        buf.extend_from_slice(&fields.checksum.to_le_bytes());
        buf
    }

    pub fn unmarshal(&self, buf: &[u8]) -> Result<(), HeaderError> {
        let mut cursor = Cursor::new(buf);
        let compress_type = cursor.take_u16("CompressType")?;
        let id = cursor.take_varint("ID")?;
        let error = cursor.take_string("Error")?;
        let response_len = cursor.take_varint("ResponseLen")?;
        let checksum = cursor.take_u32("Checksum")?;

        *self.inner.write() = ResponseFields { compress_type, id, error, response_len, checksum };
        Ok(())
    }
}

/// A minimal checked reader over a byte slice, used only by `unmarshal`.
struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take_u16(&mut self, field: &'static str) -> Result<u16, HeaderError> {
        let bytes = self.take(2, field)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn take_u32(&mut self, field: &'static str) -> Result<u32, HeaderError> {
        let bytes = self.take(4, field)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn take_varint(&mut self, field: &'static str) -> Result<u64, HeaderError> {
        let (value, consumed) =
            varint::decode(&self.buf[self.pos..]).map_err(|source| HeaderError::InvalidVarint { field, source })?;
        self.pos += consumed;
        Ok(value)
    }

    fn take_string(&mut self, field: &'static str) -> Result<String, HeaderError> {
        let len = self.take_varint(field)?;
        let bytes = self.take(len as usize, field)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| HeaderError::InvalidUtf8 { field })
    }

    fn take(&mut self, n: usize, field: &'static str) -> Result<&'a [u8], HeaderError> {
        let end = self.pos.checked_add(n).ok_or(HeaderError::Truncated { field })?;
        let slice = self.buf.get(self.pos..end).ok_or(HeaderError::Truncated { field })?;
        self.pos = end;
        Ok(slice)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn request_header_round_trips() {
        let h = RequestHeader::new(1, "ArithService.Add", 42, 7, 0xdead_beef);
        let out = RequestHeader::default();
        out.unmarshal(&h.marshal()).unwrap();
        assert_eq!(out.compress_type(), 1);
        assert_eq!(out.method(), "ArithService.Add");
        assert_eq!(out.id(), 42);
        assert_eq!(out.request_len(), 7);
        assert_eq!(out.checksum(), 0xdead_beef);
    }

    #[test]
    fn response_header_round_trips() {
        let h = ResponseHeader::new(3, 99, "divided is zero", 0, 0);
        let out = ResponseHeader::default();
        out.unmarshal(&h.marshal()).unwrap();
        assert_eq!(out.compress_type(), 3);
        assert_eq!(out.id(), 99);
        assert_eq!(out.error(), "divided is zero");
        assert_eq!(out.response_len(), 0);
        assert_eq!(out.checksum(), 0);
    }

    #[test]
    fn request_header_varint_boundary() {
        let method = "m".repeat(4096);
        let h = RequestHeader::new(0, method.clone(), u64::MAX >> 1, u64::from(u32::MAX), 0);
        let out = RequestHeader::default();
        out.unmarshal(&h.marshal()).unwrap();
        assert_eq!(out.method(), method);
        assert_eq!(out.id(), u64::MAX >> 1);
        assert_eq!(out.request_len(), u64::from(u32::MAX));
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let h = RequestHeader::new(1, "ArithService.Add", 42, 7, 0xdead_beef);
        let mut bytes = h.marshal();
        bytes.truncate(bytes.len() - 1);
        let out = RequestHeader::default();
        assert!(out.unmarshal(&bytes).is_err());
    }

    #[test]
    fn reset_clears_fields() {
        let h = RequestHeader::new(1, "ArithService.Add", 42, 7, 0xdead_beef);
        h.reset();
        assert_eq!(h.compress_type(), 0);
        assert_eq!(h.method(), "");
        assert_eq!(h.id(), 0);
    }

    proptest! {
        #[test]
        fn request_header_arbitrary_round_trip(
            compress_type: u16,
            method in "[a-zA-Z.]{0,64}",
            id: u64,
            request_len: u64,
            checksum: u32,
        ) {
            let h = RequestHeader::new(compress_type, method.clone(), id, request_len, checksum);
            let out = RequestHeader::default();
            out.unmarshal(&h.marshal()).unwrap();
            prop_assert_eq!(out.compress_type(), compress_type);
            prop_assert_eq!(out.method(), method);
            prop_assert_eq!(out.id(), id);
            prop_assert_eq!(out.request_len(), request_len);
            prop_assert_eq!(out.checksum(), checksum);
        }

        #[test]
        fn response_header_arbitrary_round_trip(
            compress_type: u16,
            id: u64,
            error in "[a-zA-Z ]{0,64}",
            response_len: u64,
            checksum: u32,
        ) {
            let h = ResponseHeader::new(compress_type, id, error.clone(), response_len, checksum);
            let out = ResponseHeader::default();
            out.unmarshal(&h.marshal()).unwrap();
            prop_assert_eq!(out.compress_type(), compress_type);
            prop_assert_eq!(out.id(), id);
            prop_assert_eq!(out.error(), error);
            prop_assert_eq!(out.response_len(), response_len);
            prop_assert_eq!(out.checksum(), checksum);
        }
    }
}
