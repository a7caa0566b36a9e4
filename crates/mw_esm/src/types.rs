//! Base types for the structure of a plugin file.

use std::fmt;
use std::str::FromStr;

use binrw::{BinRead, BinWrite};
use byteorder::{ByteOrder, LittleEndian};
use indexmap::IndexMap;

use crate::error::{Error, Result};

/// Tag carried by the mandatory first record of any valid plugin stream.
pub const HEADER_TAG: TypeTag = TypeTag(*b"TES3");

/// Tag of the sub-record inside the header record that holds the file
/// metadata (version, author, description, record count).
pub const HEADER_META_TAG: TypeTag = TypeTag(*b"HEDR");

/// Byte offset of the record count field within the header metadata payload.
pub const RECORD_COUNT_OFFSET: usize = 296;

/// Serialized size of a sub-record header (tag plus length).
pub(crate) const SUB_HEADER_SIZE: usize = 8;

/// Bytes stripped from both ends of a payload by [`SubRecord::get_string`].
const STRING_PADDING: &[u8] = b" \t\n\r\0\x0B";

/// A four byte identifier distinguishing record and sub-record kinds.
///
/// Tags are conventionally printable ASCII (`TES3`, `STAT`, `NAME`) but the
/// format only guarantees four raw bytes.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeTag(pub [u8; 4]);

impl TypeTag {
    /// Tag from four raw bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        TypeTag(bytes)
    }

    /// The raw tag bytes.
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl From<&[u8; 4]> for TypeTag {
    fn from(bytes: &[u8; 4]) -> Self {
        TypeTag(*bytes)
    }
}

impl FromStr for TypeTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| Error::InvalidTag(s.to_owned()))?;
        Ok(TypeTag(bytes))
    }
}

/// Fixed-size portion of a record as stored on disk, minus the leading tag.
///
/// `length` covers only the sub-record block that follows, never this header
/// itself.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq)]
#[brw(little)]
pub(crate) struct RecordHead {
    pub length: i32,
    pub reserved: i32,
    pub flags: i32,
}

/// Header of a sub-record as stored on disk.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq)]
#[brw(little)]
pub(crate) struct SubRecordHead {
    pub tag: TypeTag,
    pub length: i32,
}

/// Kind selector for [`SubRecord::unpack`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// 4 byte little endian signed integer
    Long,
    /// 4 byte IEEE 754 single precision float
    Float,
    /// Fixed width NUL padded string
    Str,
}

/// A typed value packed into or unpacked from a sub-record payload.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 4 byte little endian signed integer
    Long(i32),
    /// 4 byte IEEE 754 single precision float
    Float(f32),
    /// Fixed width NUL padded string
    Str(String),
}

impl FieldValue {
    /// The contained integer, if this is a [`FieldValue::Long`].
    pub fn as_long(&self) -> Option<i32> {
        match self {
            FieldValue::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// The contained float, if this is a [`FieldValue::Float`].
    pub fn as_float(&self) -> Option<f32> {
        match self {
            FieldValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The contained string, if this is a [`FieldValue::Str`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A type-tagged chunk of opaque payload bytes nested inside a record.
///
/// The container never interprets the payload. Callers encode and decode
/// fields either with the whole-buffer accessors ([`SubRecord::set_string`],
/// [`SubRecord::set_long`], ...) or at specific byte offsets with
/// [`SubRecord::pack`] and [`SubRecord::unpack`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubRecord {
    tag: TypeTag,
    data: Vec<u8>,
}

impl SubRecord {
    /// An empty sub-record carrying `tag`.
    pub fn new(tag: TypeTag) -> Self {
        SubRecord {
            tag,
            data: Vec::new(),
        }
    }

    /// A sub-record carrying `tag` with an initial payload.
    pub fn with_payload(tag: TypeTag, data: impl Into<Vec<u8>>) -> Self {
        SubRecord {
            tag,
            data: data.into(),
        }
    }

    /// The sub-record's tag.
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// The raw payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data
    }

    /// Replace the raw payload.
    pub fn set_payload(&mut self, data: impl Into<Vec<u8>>) {
        self.data = data.into();
    }

    /// The payload as text, with surrounding whitespace and NUL bytes
    /// stripped from both ends.
    pub fn get_string(&self) -> String {
        let start = self
            .data
            .iter()
            .position(|b| !STRING_PADDING.contains(b))
            .unwrap_or(self.data.len());
        let end = self
            .data
            .iter()
            .rposition(|b| !STRING_PADDING.contains(b))
            .map_or(start, |p| p + 1);
        String::from_utf8_lossy(&self.data[start..end]).into_owned()
    }

    /// Replace the payload with `s`, appending a NUL terminator when `s`
    /// does not already end with one.
    pub fn set_string(&mut self, s: &str) {
        self.data.clear();
        self.data.extend_from_slice(s.as_bytes());
        if self.data.last() != Some(&0) {
            self.data.push(0);
        }
    }

    /// Decode the whole payload as a little endian signed 32 bit integer.
    ///
    /// Bytes past the first four are ignored; a payload shorter than four
    /// bytes is an error.
    pub fn get_long(&self) -> Result<i32> {
        if self.data.len() < 4 {
            return Err(Error::CorruptLength(format!(
                "payload of {} holds {} bytes, need 4",
                self.tag,
                self.data.len()
            )));
        }
        Ok(LittleEndian::read_i32(&self.data))
    }

    /// Replace the payload with `n` as a little endian signed 32 bit integer.
    pub fn set_long(&mut self, n: i32) {
        self.data = n.to_le_bytes().to_vec();
    }

    /// Decode the whole payload as a little endian IEEE 754 single.
    ///
    /// Bytes past the first four are ignored; a payload shorter than four
    /// bytes is an error.
    pub fn get_float(&self) -> Result<f32> {
        if self.data.len() < 4 {
            return Err(Error::CorruptLength(format!(
                "payload of {} holds {} bytes, need 4",
                self.tag,
                self.data.len()
            )));
        }
        Ok(LittleEndian::read_f32(&self.data))
    }

    /// Replace the payload with `f` as a little endian IEEE 754 single.
    pub fn set_float(&mut self, f: f32) {
        self.data = f.to_le_bytes().to_vec();
    }

    /// Splice `value` into the payload at `[offset, offset + length)`.
    ///
    /// The payload is grown with NUL bytes up to `offset` when it is
    /// shorter; bytes outside the spliced range keep their previous values.
    /// A string wider than `length` fails with [`Error::ValueTooLarge`] and
    /// leaves the payload untouched; a narrower one is right padded with
    /// NULs to exactly `length`.
    pub fn pack(&mut self, value: FieldValue, offset: usize, length: usize) -> Result<()> {
        let encoded = match value {
            FieldValue::Long(n) => n.to_le_bytes().to_vec(),
            FieldValue::Float(f) => f.to_le_bytes().to_vec(),
            FieldValue::Str(s) => {
                if s.len() > length {
                    return Err(Error::ValueTooLarge {
                        found: s.len(),
                        expected: length,
                    });
                }
                let mut bytes = s.into_bytes();
                bytes.resize(length, 0);
                bytes
            }
        };

        if self.data.len() < offset {
            self.data.resize(offset, 0);
        }

        let end = (offset + length).min(self.data.len());
        self.data.splice(offset..end, encoded);
        Ok(())
    }

    /// Decode a value of `kind` from `[offset, offset + length)`.
    ///
    /// A `length` of zero reads from `offset` to the end of the payload.
    /// String fields come back with their trailing NUL padding stripped.
    pub fn unpack(&self, kind: FieldKind, offset: usize, length: usize) -> Result<FieldValue> {
        let end = if length == 0 {
            self.data.len()
        } else {
            offset + length
        };
        if offset > end || end > self.data.len() {
            return Err(Error::CorruptLength(format!(
                "field [{offset}, {end}) lies outside a {} byte payload",
                self.data.len()
            )));
        }

        let bytes = &self.data[offset..end];
        Ok(match kind {
            FieldKind::Long => {
                if bytes.len() < 4 {
                    return Err(Error::CorruptLength(format!(
                        "field [{offset}, {end}) holds {} bytes, need 4",
                        bytes.len()
                    )));
                }
                FieldValue::Long(LittleEndian::read_i32(bytes))
            }
            FieldKind::Float => {
                if bytes.len() < 4 {
                    return Err(Error::CorruptLength(format!(
                        "field [{offset}, {end}) holds {} bytes, need 4",
                        bytes.len()
                    )));
                }
                FieldValue::Float(LittleEndian::read_f32(bytes))
            }
            FieldKind::Str => {
                let trimmed = match bytes.iter().rposition(|b| *b != 0) {
                    Some(p) => &bytes[..=p],
                    None => &[],
                };
                FieldValue::Str(String::from_utf8_lossy(trimmed).into_owned())
            }
        })
    }
}

/// A top-level, type-tagged, length-prefixed chunk of a plugin stream.
///
/// Holds two opaque header words and an ordered sequence of sub-records.
/// Duplicate sub-record tags are allowed and insertion order is preserved.
/// The serialized length of the sub-record block is recomputed at write
/// time, never cached here.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    tag: TypeTag,
    flags: i32,
    reserved: i32,
    sub_records: Vec<SubRecord>,
}

impl Record {
    /// An empty record carrying `tag`.
    pub fn new(tag: TypeTag) -> Self {
        Record {
            tag,
            flags: 0,
            reserved: 0,
            sub_records: Vec::new(),
        }
    }

    /// The record's tag.
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    /// The record flags word.
    pub fn flags(&self) -> i32 {
        self.flags
    }

    /// Set the record flags word.
    pub fn set_flags(&mut self, flags: i32) {
        self.flags = flags;
    }

    /// The opaque reserved header word.
    ///
    /// Its meaning is unspecified; it is preserved byte-for-byte through a
    /// read/write cycle.
    pub fn reserved(&self) -> i32 {
        self.reserved
    }

    /// Set the opaque reserved header word.
    pub fn set_reserved(&mut self, reserved: i32) {
        self.reserved = reserved;
    }

    /// Append a sub-record and return it for further mutation.
    pub fn add_sub_record(&mut self, sub: SubRecord) -> &mut SubRecord {
        self.sub_records.push(sub);
        self.sub_records
            .last_mut()
            .expect("sub-record was just pushed")
    }

    /// The `index`-th sub-record carrying `tag`, counted in insertion order.
    pub fn sub_record(&self, tag: TypeTag, index: usize) -> Option<&SubRecord> {
        self.sub_records.iter().filter(|s| s.tag() == tag).nth(index)
    }

    /// Mutable access to the `index`-th sub-record carrying `tag`.
    pub fn sub_record_mut(&mut self, tag: TypeTag, index: usize) -> Option<&mut SubRecord> {
        self.sub_records
            .iter_mut()
            .filter(|s| s.tag() == tag)
            .nth(index)
    }

    /// All sub-records in insertion order.
    pub fn sub_records(&self) -> &[SubRecord] {
        &self.sub_records
    }
}

/// In-memory model of a plugin file: records bucketed by type tag.
///
/// Buckets preserve insertion order within a tag and the first-insertion
/// order of distinct tags. The cross-type order of a loaded file is *not*
/// retained; see [`Plugin::records`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plugin {
    records: IndexMap<TypeTag, Vec<Record>>,
}

impl Plugin {
    /// An empty plugin.
    pub fn new() -> Self {
        Plugin::default()
    }

    /// Append `record` to the bucket for its tag.
    pub fn add_record(&mut self, record: Record) {
        self.records.entry(record.tag()).or_default().push(record);
    }

    /// All records carrying `tag` in insertion order, or an empty slice when
    /// no such bucket exists.
    pub fn records_by_type(&self, tag: TypeTag) -> &[Record] {
        self.records.get(&tag).map(Vec::as_slice).unwrap_or_default()
    }

    /// The `index`-th record carrying `tag`, counted within that bucket.
    pub fn record_by_type(&self, tag: TypeTag, index: usize) -> Option<&Record> {
        self.records_by_type(tag).get(index)
    }

    /// Mutable access to the `index`-th record carrying `tag`.
    pub fn record_by_type_mut(&mut self, tag: TypeTag, index: usize) -> Option<&mut Record> {
        self.records.get_mut(&tag)?.get_mut(index)
    }

    /// Total number of records across every bucket.
    pub fn record_count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    /// Distinct record tags in first-insertion order.
    pub fn types(&self) -> impl Iterator<Item = TypeTag> + '_ {
        self.records.keys().copied()
    }

    /// A freshly flattened view of every record, concatenating buckets in
    /// their first-insertion order.
    ///
    /// This does **not** match the on-disk order of a loaded file. Only the
    /// header-first position is restored when writing; callers must not
    /// assume anything else about cross-type ordering.
    pub fn records(&self) -> Vec<&Record> {
        self.records.values().flatten().collect()
    }

    /// Whether this plugin holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
