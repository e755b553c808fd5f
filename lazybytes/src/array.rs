//! Self-describing byte arrays.
//!
//! Layout of a serialized array:
//!  - a 2-byte big-endian prefix word. The top 2 bits select the element length class
//!    (0, 1, 2 or 4 bytes, see [`LengthClass`]), the low 14 bits hold the element count.
//!  - every element as a length field of the selected class (big-endian) followed by its bytes.
//!
//! The class is the narrowest one able to represent the longest element, so an array whose
//! elements are all empty is just its prefix. `[0, 0]` is the array with zero elements, which
//! is distinct from an array built from absent bytes ([`ByteArray::nil`]).
use strum::EnumIs;

use crate::error::{Error, Result};

pub const PREFIX_LEN: usize = 2;

/// Largest element count the 14-bit prefix field can carry.
pub const MAX_ELEMENTS: usize = 0x3fff;

/// Serialized form of an array with zero elements.
pub const EMPTY_ARRAY: [u8; PREFIX_LEN] = [0, 0];

const COUNT_MASK: u16 = 0x3fff;
const CLASS_SHIFT: u16 = 14;

/// Width of the per-element length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIs)]
pub enum LengthClass {
    Zero,
    One,
    Two,
    Four,
}

impl LengthClass {
    /// Number of bytes used by each element length field.
    pub fn width(self) -> usize {
        match self {
            LengthClass::Zero => 0,
            LengthClass::One => 1,
            LengthClass::Two => 2,
            LengthClass::Four => 4,
        }
    }

    /// Narrowest class able to encode an element of `len` bytes.
    pub fn for_len(len: usize) -> Result<Self> {
        match len {
            0 => Ok(LengthClass::Zero),
            1..=0xff => Ok(LengthClass::One),
            0x100..=0xffff => Ok(LengthClass::Two),
            _ if u32::try_from(len).is_ok() => Ok(LengthClass::Four),
            _ => Err(Error::ElementTooLong { len }),
        }
    }

    fn bits(self) -> u16 {
        match self {
            LengthClass::Zero => 0,
            LengthClass::One => 1,
            LengthClass::Two => 2,
            LengthClass::Four => 3,
        }
    }

    fn from_bits(bits: u16) -> Self {
        match bits & 0b11 {
            0 => LengthClass::Zero,
            1 => LengthClass::One,
            2 => LengthClass::Two,
            _ => LengthClass::Four,
        }
    }
}

fn take<'a>(raw: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8]> {
    let available = raw.len().saturating_sub(*offset);
    if available < len {
        return Err(Error::Truncated {
            offset: *offset,
            expected: len - available,
        });
    }
    let slice = &raw[*offset..*offset + len];
    *offset += len;
    Ok(slice)
}

/// Serialize `elements`, choosing the narrowest length class.
pub fn encode_elements<T: AsRef<[u8]>>(elements: &[T]) -> Result<Vec<u8>> {
    if elements.len() > MAX_ELEMENTS {
        return Err(Error::TooManyElements { max: MAX_ELEMENTS });
    }
    let longest = elements
        .iter()
        .map(|e| e.as_ref().len())
        .max()
        .unwrap_or(0);
    let class = LengthClass::for_len(longest)?;

    let total = PREFIX_LEN
        + elements
            .iter()
            .map(|e| class.width() + e.as_ref().len())
            .sum::<usize>();
    let mut out = Vec::with_capacity(total);

    let word = (class.bits() << CLASS_SHIFT) | elements.len() as u16;
    out.extend_from_slice(&word.to_be_bytes());
    for element in elements {
        let element = element.as_ref();
        // Length already checked against the class, the cast cannot truncate.
        let len_field = (element.len() as u32).to_be_bytes();
        out.extend_from_slice(&len_field[4 - class.width()..]);
        out.extend_from_slice(element);
    }
    Ok(out)
}

/// Parse a serialized array, refusing more than `max_elements` elements.
pub fn decode_elements(raw: &[u8], max_elements: usize) -> Result<Vec<Vec<u8>>> {
    let mut offset = 0;
    let prefix = take(raw, &mut offset, PREFIX_LEN)?;
    let word = u16::from_be_bytes([prefix[0], prefix[1]]);
    let class = LengthClass::from_bits(word >> CLASS_SHIFT);
    let count = (word & COUNT_MASK) as usize;
    if count > max_elements {
        return Err(Error::TooManyElements { max: max_elements });
    }

    let mut elements = Vec::with_capacity(count);
    for _ in 0..count {
        let len = take(raw, &mut offset, class.width())?
            .iter()
            .fold(0usize, |acc, b| (acc << 8) | *b as usize);
        elements.push(take(raw, &mut offset, len)?.to_vec());
    }

    if offset != raw.len() {
        return Err(Error::TrailingBytes {
            count: raw.len() - offset,
        });
    }
    Ok(elements)
}

#[derive(Debug, Clone, EnumIs)]
enum Repr {
    /// Built from absent bytes; every access fails.
    Nil,
    /// Serialized form only, not parsed yet.
    Raw(Vec<u8>),
    /// Parsed elements are authoritative. `serialized` caches their encoding until the
    /// next mutation.
    Parsed {
        elements: Vec<Vec<u8>>,
        serialized: Option<Vec<u8>>,
    },
}

/// A variable-length sequence of byte strings with a lazily reconciled serialized form.
///
/// The array holds either its serialized bytes or its parsed elements. Reading elements
/// parses the bytes once, reading bytes serializes the elements once, and every mutation
/// drops the cached bytes. Both conversions are deterministic, so an array that was not
/// mutated serializes back to the exact bytes it was built from.
///
/// ```
/// use lazybytes::array::ByteArray;
///
/// let mut arr = ByteArray::new();
/// arr.push(b"abc".to_vec()).unwrap();
/// arr.push(Vec::new()).unwrap();
/// let bytes = arr.bytes().unwrap().to_vec();
///
/// let mut back = ByteArray::from_bytes(bytes);
/// assert_eq!(back.len().unwrap(), 2);
/// assert_eq!(back.at(0).unwrap(), b"abc");
/// ```
#[derive(Debug, Clone)]
pub struct ByteArray {
    repr: Repr,
    max_elements: usize,
}

impl ByteArray {
    /// An empty array accepting up to [`MAX_ELEMENTS`] elements.
    pub fn new() -> Self {
        Self::with_max_elements(MAX_ELEMENTS)
    }

    /// An empty array accepting up to `max_elements` elements (clamped to [`MAX_ELEMENTS`]).
    pub fn with_max_elements(max_elements: usize) -> Self {
        Self {
            repr: Repr::Parsed {
                elements: Vec::new(),
                serialized: None,
            },
            max_elements: max_elements.min(MAX_ELEMENTS),
        }
    }

    /// The array of absent bytes. Reading its length or elements fails with
    /// [`Error::EmptyArrayAccess`].
    pub fn nil() -> Self {
        Self {
            repr: Repr::Nil,
            max_elements: MAX_ELEMENTS,
        }
    }

    /// Wrap serialized bytes without parsing them.
    pub fn from_bytes(raw: impl Into<Vec<u8>>) -> Self {
        Self::from_bytes_with_max(raw, MAX_ELEMENTS)
    }

    pub fn from_bytes_with_max(raw: impl Into<Vec<u8>>, max_elements: usize) -> Self {
        Self {
            repr: Repr::Raw(raw.into()),
            max_elements: max_elements.min(MAX_ELEMENTS),
        }
    }

    /// Optional bytes, where `None` stands for absent data.
    pub fn from_optional_bytes(raw: Option<&[u8]>) -> Self {
        match raw {
            Some(raw) => Self::from_bytes(raw),
            None => Self::nil(),
        }
    }

    pub fn from_elements<I, T>(elements: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<Vec<u8>>,
    {
        let mut arr = Self::new();
        for element in elements {
            arr.push(element)?;
        }
        Ok(arr)
    }

    pub fn max_elements(&self) -> usize {
        self.max_elements
    }

    pub fn is_nil(&self) -> bool {
        self.repr.is_nil()
    }

    /// Whether the elements are currently materialized.
    pub fn is_parsed(&self) -> bool {
        self.repr.is_parsed()
    }

    /// Parse the serialized form if it was not parsed yet. Idempotent.
    pub fn materialize(&mut self) -> Result<()> {
        if let Repr::Raw(raw) = &mut self.repr {
            let elements = decode_elements(raw, self.max_elements)?;
            let raw = std::mem::take(raw);
            self.repr = Repr::Parsed {
                elements,
                serialized: Some(raw),
            };
        }
        match self.repr {
            Repr::Nil => Err(Error::EmptyArrayAccess),
            _ => Ok(()),
        }
    }

    /// Parsed elements.
    pub fn elements(&mut self) -> Result<&[Vec<u8>]> {
        self.materialize()?;
        match &self.repr {
            Repr::Parsed { elements, .. } => Ok(elements),
            _ => Err(Error::EmptyArrayAccess),
        }
    }

    // Materializes and drops the cached serialization, every mutation goes through here.
    fn elements_mut(&mut self) -> Result<&mut Vec<Vec<u8>>> {
        self.materialize()?;
        match &mut self.repr {
            Repr::Parsed {
                elements,
                serialized,
            } => {
                *serialized = None;
                Ok(elements)
            }
            _ => Err(Error::EmptyArrayAccess),
        }
    }

    pub fn len(&mut self) -> Result<usize> {
        Ok(self.elements()?.len())
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    pub fn is_full(&mut self) -> Result<bool> {
        let max = self.max_elements;
        Ok(self.len()? >= max)
    }

    pub fn at(&mut self, index: usize) -> Result<&[u8]> {
        let elements = self.elements()?;
        elements
            .get(index)
            .map(Vec::as_slice)
            .ok_or(Error::IndexOutOfBounds {
                index,
                len: elements.len(),
            })
    }

    /// Append an element and return its index.
    pub fn push(&mut self, data: impl Into<Vec<u8>>) -> Result<usize> {
        let data = data.into();
        LengthClass::for_len(data.len())?;
        let max = self.max_elements;
        let elements = self.elements_mut()?;
        if elements.len() >= max {
            return Err(Error::TooManyElements { max });
        }
        elements.push(data);
        Ok(elements.len() - 1)
    }

    pub fn set_at(&mut self, index: usize, data: impl Into<Vec<u8>>) -> Result<()> {
        let data = data.into();
        LengthClass::for_len(data.len())?;
        // Bounds check first so a failed write keeps the cached bytes.
        let len = self.len()?;
        if index >= len {
            return Err(Error::IndexOutOfBounds { index, len });
        }
        self.elements_mut()?[index] = data;
        Ok(())
    }

    /// Serialized form, encoding the elements if they changed since the last call.
    pub fn bytes(&mut self) -> Result<&[u8]> {
        match &mut self.repr {
            Repr::Nil => Err(Error::EmptyArrayAccess),
            Repr::Raw(raw) => Ok(raw.as_slice()),
            Repr::Parsed {
                elements,
                serialized,
            } => {
                let bytes = match serialized.take() {
                    Some(bytes) => bytes,
                    None => encode_elements(elements)?,
                };
                Ok(serialized.insert(bytes).as_slice())
            }
        }
    }

    pub fn into_bytes(mut self) -> Result<Vec<u8>> {
        self.bytes()?;
        match self.repr {
            Repr::Raw(raw) => Ok(raw),
            Repr::Parsed {
                serialized: Some(bytes),
                ..
            } => Ok(bytes),
            _ => Err(Error::EmptyArrayAccess),
        }
    }
}

impl Default for ByteArray {
    fn default() -> Self {
        Self::new()
    }
}
