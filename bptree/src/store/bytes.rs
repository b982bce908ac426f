//! Byte-level conversion of typed values.
//!
//! # Encoding
//!
//! - Fixed-size scalars are written as their little-endian byte image.
//! - `usize` is widened to `u64`.
//! - Variable-size values (`String`, `Vec<T>`) carry a `u64` length prefix.
//! - `Option<T>` is a one-byte tag followed by the value when present.
//! - Tuples and structs are the concatenation of their fields in
//!   declaration order.
//!
//! Values that point at other stored objects record the target labels in
//! `ObjectBytes::references` while writing, so the store can track which
//! objects are reachable from which.

use super::allocator::Label;

/// Errors that can occur while decoding bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// Input ended before the value did.
    UnexpectedEof { needed: usize, remaining: usize },
    /// A tag byte has no meaning for the type.
    InvalidTag { type_name: &'static str, tag: u8 },
    /// String bytes are not valid UTF-8.
    InvalidUtf8,
    /// A length does not fit in memory on this platform.
    LengthOverflow(u64),
    /// Bytes were left over after the value was decoded.
    TrailingBytes(usize),
}

impl std::fmt::Display for ConvertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEof { needed, remaining } => write!(
                f,
                "unexpected end of input: needed {needed} bytes, {remaining} remaining"
            ),
            Self::InvalidTag { type_name, tag } => write!(f, "invalid tag {tag} for {type_name}"),
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            Self::LengthOverflow(len) => write!(f, "length {len} does not fit in memory"),
            Self::TrailingBytes(count) => write!(f, "{count} trailing bytes after value"),
        }
    }
}

impl std::error::Error for ConvertError {}

/// Serialized form of one object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectBytes {
    bytes: Vec<u8>,
    references: Vec<Label>,
}

impl ObjectBytes {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn add(&mut self, data: &[u8]) {
        self.bytes.extend_from_slice(data);
    }

    /// Record that this object points at the object stored under `label`.
    pub fn add_reference(&mut self, label: Label) {
        self.references.push(label);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn references(&self) -> &[Label] {
        &self.references
    }

    #[must_use]
    pub fn into_parts(self) -> (Vec<u8>, Vec<Label>) {
        (self.bytes, self.references)
    }
}

/// Cursor over encoded bytes.
#[derive(Debug)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Take the next `len` bytes.
    pub fn read(&mut self, len: usize) -> Result<&'a [u8], ConvertError> {
        if len > self.remaining() {
            return Err(ConvertError::UnexpectedEof {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let slice = &self.bytes[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ConvertError> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.read(N)?);
        Ok(array)
    }

    /// Read a `u64` length prefix as `usize`.
    pub fn read_len(&mut self) -> Result<usize, ConvertError> {
        let len = u64::from_le_bytes(self.read_array()?);
        usize::try_from(len).map_err(|_| ConvertError::LengthOverflow(len))
    }
}

/// Conversion between a value and its byte representation.
pub trait ByteConverter: Sized {
    /// Encoded size when it is the same for every value of the type.
    const FIXED_SIZE: Option<usize> = None;

    /// Append the encoding of `self`.
    fn write_down(&self, out: &mut ObjectBytes);

    /// Decode one value, advancing the reader past it.
    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError>;
}

/// Encode a value into a fresh buffer.
pub fn to_bytes<T: ByteConverter>(value: &T) -> ObjectBytes {
    let mut out = ObjectBytes::new();
    value.write_down(&mut out);
    out
}

/// Decode a value that must span all of `bytes`.
pub fn from_bytes<T: ByteConverter>(bytes: &[u8]) -> Result<T, ConvertError> {
    let mut reader = ByteReader::new(bytes);
    let value = T::read_out(&mut reader)?;
    match reader.remaining() {
        0 => Ok(value),
        extra => Err(ConvertError::TrailingBytes(extra)),
    }
}

fn write_len(len: usize, out: &mut ObjectBytes) {
    out.add(&(len as u64).to_le_bytes());
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ByteConverter for $ty {
                const FIXED_SIZE: Option<usize> = Some(std::mem::size_of::<$ty>());

                fn write_down(&self, out: &mut ObjectBytes) {
                    out.add(&self.to_le_bytes());
                }

                fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
                    Ok(<$ty>::from_le_bytes(reader.read_array()?))
                }
            }
        )*
    };
}

impl_scalar!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, f32, f64);

impl ByteConverter for usize {
    const FIXED_SIZE: Option<usize> = Some(8);

    fn write_down(&self, out: &mut ObjectBytes) {
        write_len(*self, out);
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        reader.read_len()
    }
}

impl ByteConverter for bool {
    const FIXED_SIZE: Option<usize> = Some(1);

    fn write_down(&self, out: &mut ObjectBytes) {
        out.add(&[u8::from(*self)]);
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        match reader.read_array::<1>()?[0] {
            0 => Ok(false),
            1 => Ok(true),
            tag => Err(ConvertError::InvalidTag {
                type_name: "bool",
                tag,
            }),
        }
    }
}

impl ByteConverter for () {
    const FIXED_SIZE: Option<usize> = Some(0);

    fn write_down(&self, _out: &mut ObjectBytes) {}

    fn read_out(_reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        Ok(())
    }
}

impl<const N: usize> ByteConverter for [u8; N] {
    const FIXED_SIZE: Option<usize> = Some(N);

    fn write_down(&self, out: &mut ObjectBytes) {
        out.add(self);
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        reader.read_array()
    }
}

impl ByteConverter for String {
    fn write_down(&self, out: &mut ObjectBytes) {
        write_len(self.len(), out);
        out.add(self.as_bytes());
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        let len = reader.read_len()?;
        let bytes = reader.read(len)?;
        Self::from_utf8(bytes.to_vec()).map_err(|_| ConvertError::InvalidUtf8)
    }
}

impl<T: ByteConverter> ByteConverter for Vec<T> {
    fn write_down(&self, out: &mut ObjectBytes) {
        write_len(self.len(), out);
        for item in self {
            item.write_down(out);
        }
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        let len = reader.read_len()?;
        // Bound the preallocation by what the input could possibly hold.
        let item_size = T::FIXED_SIZE.unwrap_or(1).max(1);
        let mut items = Self::with_capacity(len.min(reader.remaining() / item_size));
        for _ in 0..len {
            items.push(T::read_out(reader)?);
        }
        Ok(items)
    }
}

impl<T: ByteConverter> ByteConverter for Option<T> {
    fn write_down(&self, out: &mut ObjectBytes) {
        match self {
            None => out.add(&[0]),
            Some(value) => {
                out.add(&[1]);
                value.write_down(out);
            }
        }
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        match reader.read_array::<1>()?[0] {
            0 => Ok(None),
            1 => Ok(Some(T::read_out(reader)?)),
            tag => Err(ConvertError::InvalidTag {
                type_name: "Option",
                tag,
            }),
        }
    }
}

const fn sum_fixed(sizes: &[Option<usize>]) -> Option<usize> {
    let mut total = 0;
    let mut i = 0;
    while i < sizes.len() {
        match sizes[i] {
            Some(size) => total += size,
            None => return None,
        }
        i += 1;
    }
    Some(total)
}

impl<A: ByteConverter, B: ByteConverter> ByteConverter for (A, B) {
    const FIXED_SIZE: Option<usize> = sum_fixed(&[A::FIXED_SIZE, B::FIXED_SIZE]);

    fn write_down(&self, out: &mut ObjectBytes) {
        self.0.write_down(out);
        self.1.write_down(out);
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        let a = A::read_out(reader)?;
        let b = B::read_out(reader)?;
        Ok((a, b))
    }
}

impl<A: ByteConverter, B: ByteConverter, C: ByteConverter> ByteConverter for (A, B, C) {
    const FIXED_SIZE: Option<usize> =
        sum_fixed(&[A::FIXED_SIZE, B::FIXED_SIZE, C::FIXED_SIZE]);

    fn write_down(&self, out: &mut ObjectBytes) {
        self.0.write_down(out);
        self.1.write_down(out);
        self.2.write_down(out);
    }

    fn read_out(reader: &mut ByteReader<'_>) -> Result<Self, ConvertError> {
        let a = A::read_out(reader)?;
        let b = B::read_out(reader)?;
        let c = C::read_out(reader)?;
        Ok((a, b, c))
    }
}
