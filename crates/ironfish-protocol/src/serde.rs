use thiserror::Error;

// ERRORS
// ================================================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeserializationError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("{0} trailing bytes after the last field")]
    TrailingBytes(usize),
}

// BYTE WRITER
// ================================================================================================

/// A sink for the canonical wire encoding.
///
/// All multi-byte integers are written little-endian. Collections are length-prefixed with a
/// `u32` count. The encoding must stay byte-exact: block and transaction identities are hashes
/// of these bytes.
pub trait ByteWriter {
    fn write_bytes(&mut self, bytes: &[u8]);

    fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    fn write_u128(&mut self, value: u128) {
        self.write_bytes(&value.to_le_bytes());
    }

    fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Writes a `u32` length prefix for the given collection size.
    ///
    /// Sizes beyond `u32::MAX` cannot occur in any protocol object; this panics rather than
    /// silently truncating.
    fn write_len(&mut self, len: usize) {
        let len: u32 = len.try_into().expect("collection length exceeds u32");
        self.write_u32(len);
    }

    fn write<S: Serializable>(&mut self, value: &S) {
        value.write_into(self);
    }
}

impl ByteWriter for Vec<u8> {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}

// BYTE READER
// ================================================================================================

/// A source for the canonical wire encoding. The counterpart of [`ByteWriter`].
pub trait ByteReader {
    fn read_slice(&mut self, len: usize) -> Result<&[u8], DeserializationError>;

    /// Returns the number of bytes left in the source.
    fn remaining(&self) -> usize;

    fn read_u8(&mut self) -> Result<u8, DeserializationError> {
        Ok(self.read_slice(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, DeserializationError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_le_bytes(bytes.try_into().expect("slice length checked")))
    }

    fn read_u32(&mut self) -> Result<u32, DeserializationError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().expect("slice length checked")))
    }

    fn read_u64(&mut self) -> Result<u64, DeserializationError> {
        let bytes = self.read_slice(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().expect("slice length checked")))
    }

    fn read_u128(&mut self) -> Result<u128, DeserializationError> {
        let bytes = self.read_slice(16)?;
        Ok(u128::from_le_bytes(bytes.try_into().expect("slice length checked")))
    }

    fn read_i64(&mut self) -> Result<i64, DeserializationError> {
        let bytes = self.read_slice(8)?;
        Ok(i64::from_le_bytes(bytes.try_into().expect("slice length checked")))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DeserializationError> {
        let bytes = self.read_slice(N)?;
        Ok(bytes.try_into().expect("slice length checked"))
    }

    /// Reads a `u32` length prefix, bounded by the number of remaining bytes so a corrupt
    /// prefix cannot trigger an oversized allocation.
    fn read_len(&mut self) -> Result<usize, DeserializationError> {
        let len = self.read_u32()? as usize;
        if len > self.remaining() {
            return Err(DeserializationError::InvalidValue(format!(
                "length prefix {len} exceeds {} remaining bytes",
                self.remaining()
            )));
        }
        Ok(len)
    }

    fn read<D: Deserializable>(&mut self) -> Result<D, DeserializationError> {
        D::read_from(self)
    }
}

/// A [`ByteReader`] over an in-memory slice.
pub struct SliceReader<'a> {
    source: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self { source, pos: 0 }
    }
}

impl ByteReader for SliceReader<'_> {
    fn read_slice(&mut self, len: usize) -> Result<&[u8], DeserializationError> {
        if self.pos + len > self.source.len() {
            return Err(DeserializationError::UnexpectedEnd);
        }
        let slice = &self.source[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn remaining(&self) -> usize {
        self.source.len() - self.pos
    }
}

// SERIALIZABLE / DESERIALIZABLE
// ================================================================================================

pub trait Serializable {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W);

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        self.write_into(&mut bytes);
        bytes
    }

    /// Returns the size of the wire encoding in bytes.
    fn serialized_size(&self) -> usize {
        self.to_bytes().len()
    }
}

pub trait Deserializable: Sized {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError>;

    fn read_from_bytes(bytes: &[u8]) -> Result<Self, DeserializationError> {
        let mut reader = SliceReader::new(bytes);
        let value = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(DeserializationError::TrailingBytes(reader.remaining()));
        }
        Ok(value)
    }
}

// IMPLS FOR FOUNDATION TYPES
// ================================================================================================

impl Serializable for u8 {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_u8(*self);
    }
}

impl Deserializable for u8 {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        source.read_u8()
    }
}

impl Serializable for u16 {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_u16(*self);
    }
}

impl Deserializable for u16 {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        source.read_u16()
    }
}

impl Serializable for u32 {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_u32(*self);
    }
}

impl Deserializable for u32 {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        source.read_u32()
    }
}

impl Serializable for u64 {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_u64(*self);
    }
}

impl Deserializable for u64 {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        source.read_u64()
    }
}

impl Serializable for u128 {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_u128(*self);
    }
}

impl Deserializable for u128 {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        source.read_u128()
    }
}

impl Serializable for i64 {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_i64(*self);
    }
}

impl Deserializable for i64 {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        source.read_i64()
    }
}

impl Serializable for bool {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_u8(*self as u8);
    }
}

impl Deserializable for bool {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        match source.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => {
                Err(DeserializationError::InvalidValue(format!("invalid boolean byte {other}")))
            },
        }
    }
}

impl<const N: usize> Serializable for [u8; N] {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_bytes(self);
    }
}

impl<const N: usize> Deserializable for [u8; N] {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        source.read_array()
    }
}

impl<T: Serializable> Serializable for Vec<T> {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_len(self.len());
        for item in self {
            item.write_into(target);
        }
    }
}

impl<T: Deserializable> Deserializable for Vec<T> {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        let len = source.read_len()?;
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::read_from(source)?);
        }
        Ok(items)
    }
}

impl<T: Serializable> Serializable for Option<T> {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        match self {
            Some(value) => {
                target.write_u8(1);
                value.write_into(target);
            },
            None => target.write_u8(0),
        }
    }
}

impl<T: Deserializable> Deserializable for Option<T> {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        match source.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(T::read_from(source)?)),
            other => {
                Err(DeserializationError::InvalidValue(format!("invalid option tag {other}")))
            },
        }
    }
}

impl Serializable for String {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        target.write_len(self.len());
        target.write_bytes(self.as_bytes());
    }
}

impl Deserializable for String {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        let len = source.read_len()?;
        let bytes = source.read_slice(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|err| DeserializationError::InvalidValue(format!("invalid utf-8: {err}")))
    }
}

impl<A: Serializable, B: Serializable> Serializable for (A, B) {
    fn write_into<W: ByteWriter + ?Sized>(&self, target: &mut W) {
        self.0.write_into(target);
        self.1.write_into(target);
    }
}

impl<A: Deserializable, B: Deserializable> Deserializable for (A, B) {
    fn read_from<R: ByteReader + ?Sized>(source: &mut R) -> Result<Self, DeserializationError> {
        Ok((A::read_from(source)?, B::read_from(source)?))
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn primitives_round_trip() {
        let mut bytes = Vec::new();
        bytes.write_u8(7);
        bytes.write_u32(0xdead_beef);
        bytes.write_u64(u64::MAX);
        bytes.write_i64(-42);

        let mut reader = SliceReader::new(&bytes);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(reader.read_u64().unwrap(), u64::MAX);
        assert_eq!(reader.read_i64().unwrap(), -42);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn vec_round_trip() {
        let values: Vec<u32> = vec![1, 2, 3, u32::MAX];
        let bytes = values.to_bytes();
        assert_eq!(Vec::<u32>::read_from_bytes(&bytes).unwrap(), values);
    }

    #[test]
    fn trailing_bytes_rejected() {
        let mut bytes = 5u32.to_bytes();
        bytes.push(0);
        assert_matches!(
            u32::read_from_bytes(&bytes).unwrap_err(),
            DeserializationError::TrailingBytes(1)
        );
    }

    #[test]
    fn oversized_length_prefix_rejected() {
        // a length prefix claiming more elements than bytes remain
        let bytes = u32::MAX.to_bytes();
        assert_matches!(
            Vec::<u64>::read_from_bytes(&bytes).unwrap_err(),
            DeserializationError::InvalidValue(_)
        );
    }

    #[test]
    fn truncated_input_rejected() {
        let bytes = [1u8, 2];
        let mut reader = SliceReader::new(&bytes);
        assert_matches!(reader.read_u32().unwrap_err(), DeserializationError::UnexpectedEnd);
    }
}
