//! Type-filtered streaming decode of plugin files.

use std::fs;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use binrw::BinRead;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::types::{
    Plugin, Record, RecordHead, SubRecord, SubRecordHead, TypeTag, HEADER_TAG, SUB_HEADER_SIZE,
};

/// Selects which record types the reader materializes.
///
/// Records whose tag is filtered out are skipped with a forward seek and
/// never buffered. The header tag is always admitted, even when left out of
/// a [`TypeFilter::Only`] list: a stream cannot be interpreted without its
/// header record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    /// Materialize every record.
    All,
    /// Materialize only records carrying one of these tags (plus the header).
    Only(Vec<TypeTag>),
}

impl TypeFilter {
    /// Filter admitting exactly `tags`, plus the header tag.
    pub fn only(tags: impl IntoIterator<Item = TypeTag>) -> Self {
        TypeFilter::Only(tags.into_iter().collect())
    }

    fn admits(&self, tag: TypeTag) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Only(tags) => tag == HEADER_TAG || tags.contains(&tag),
        }
    }
}

/// Load the plugin file at `path` into `plugin`.
///
/// Loading is additive: records already held by `plugin` are kept. Any
/// structural error aborts the whole load; there is no record-level
/// recovery.
#[instrument(skip(plugin, filter), fields(path = %path.as_ref().display()), err)]
pub fn load(plugin: &mut Plugin, path: impl AsRef<Path>, filter: &TypeFilter) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_owned(),
        });
    }
    if !path.is_file() {
        return Err(Error::NotAFile {
            path: path.to_owned(),
        });
    }

    let file = fs::File::open(path)?;
    read_plugin(plugin, BufReader::new(file), filter)
}

/// Decode a plugin stream from any seekable reader into `plugin`.
///
/// The record count stored inside the header is unreliable in files found
/// in the wild, so the decode loop runs on byte position until the end of
/// the stream is reached.
#[instrument(skip_all, err)]
pub fn read_plugin<R: Read + Seek>(
    plugin: &mut Plugin,
    mut reader: R,
    filter: &TypeFilter,
) -> Result<()> {
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let header = match read_record(&mut reader, filter) {
        Ok(Some(record)) if record.tag() == HEADER_TAG => record,
        Ok(_) => return Err(Error::MalformedHeader),
        Err(err) if is_eof(&err) => return Err(Error::MalformedHeader),
        Err(err) => return Err(err),
    };
    plugin.add_record(header);

    while reader.stream_position()? < len {
        if let Some(record) = read_record(&mut reader, filter)? {
            plugin.add_record(record);
        }
    }

    Ok(())
}

/// Read one record at the current position.
///
/// Returns `None` when the record's tag is filtered out; the reader is left
/// at the start of the next record either way.
fn read_record<R: Read + Seek>(reader: &mut R, filter: &TypeFilter) -> Result<Option<Record>> {
    let mut tag = [0u8; 4];
    reader.read_exact(&mut tag)?;
    let tag = TypeTag(tag);

    let head = RecordHead::read(reader)?;
    if head.length < 0 {
        return Err(Error::CorruptLength(format!(
            "record {tag} declares {} bytes",
            head.length
        )));
    }

    if !filter.admits(tag) {
        debug!(%tag, length = head.length, "skipping record");
        reader.seek(SeekFrom::Current(head.length as i64))?;
        return Ok(None);
    }

    let mut block = vec![0u8; head.length as usize];
    reader.read_exact(&mut block)?;

    let mut record = Record::new(tag);
    record.set_flags(head.flags);
    record.set_reserved(head.reserved);
    for sub in read_sub_records(&block)? {
        record.add_sub_record(sub);
    }

    Ok(Some(record))
}

/// Peel sub-records off `block` until it is exactly consumed.
fn read_sub_records(block: &[u8]) -> Result<Vec<SubRecord>> {
    let mut cursor = Cursor::new(block);
    let mut subs = Vec::new();

    while (cursor.position() as usize) < block.len() {
        let remaining = block.len() - cursor.position() as usize;
        if remaining < SUB_HEADER_SIZE {
            return Err(Error::CorruptLength(format!(
                "{remaining} trailing bytes cannot hold a sub-record header"
            )));
        }

        let head = SubRecordHead::read(&mut cursor)?;
        let remaining = block.len() - cursor.position() as usize;
        if head.length < 0 || head.length as usize > remaining {
            return Err(Error::CorruptLength(format!(
                "sub-record {} declares {} bytes with {remaining} left in the block",
                head.tag, head.length
            )));
        }

        let mut payload = vec![0u8; head.length as usize];
        cursor.read_exact(&mut payload)?;
        subs.push(SubRecord::with_payload(head.tag, payload));
    }

    Ok(subs)
}

fn is_eof(err: &Error) -> bool {
    match err {
        Error::IOError(e) => e.kind() == io::ErrorKind::UnexpectedEof,
        Error::BinRWError(binrw::Error::Io(e)) => e.kind() == io::ErrorKind::UnexpectedEof,
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::read::{read_plugin, TypeFilter};
    use crate::types::{Plugin, TypeTag, HEADER_TAG};

    const STAT: TypeTag = TypeTag(*b"STAT");
    const BODY: TypeTag = TypeTag(*b"BODY");

    #[traced_test]
    #[test]
    fn read_header_only_stream() -> Result<()> {
        #[rustfmt::skip]
        let input = vec![
            b'T', b'E', b'S', b'3',  // tag
            0x00, 0x00, 0x00, 0x00,  // length
            0x2A, 0x00, 0x00, 0x00,  // reserved
            0x01, 0x00, 0x00, 0x00,  // flags
        ];

        let mut plugin = Plugin::new();
        read_plugin(&mut plugin, Cursor::new(input), &TypeFilter::All)?;

        assert_eq!(plugin.record_count(), 1);
        let header = plugin.record_by_type(HEADER_TAG, 0).unwrap();
        assert_eq!(header.reserved(), 42);
        assert_eq!(header.flags(), 1);
        assert!(header.sub_records().is_empty());

        Ok(())
    }

    #[traced_test]
    #[test]
    fn read_record_with_sub_records() -> Result<()> {
        #[rustfmt::skip]
        let input = vec![
            b'T', b'E', b'S', b'3',  // tag
            0x00, 0x00, 0x00, 0x00,  // length
            0x00, 0x00, 0x00, 0x00,  // reserved
            0x00, 0x00, 0x00, 0x00,  // flags

            b'S', b'T', b'A', b'T',  // tag
            0x11, 0x00, 0x00, 0x00,  // length (17)
            0x00, 0x00, 0x00, 0x00,  // reserved
            0x00, 0x00, 0x00, 0x00,  // flags
            b'N', b'A', b'M', b'E',  // sub tag
            0x09, 0x00, 0x00, 0x00,  // payload length (9)
            b'M', b'y', b'S', b't', b'a', b't', b'i', b'c', 0x00,
        ];

        let mut plugin = Plugin::new();
        read_plugin(&mut plugin, Cursor::new(input), &TypeFilter::All)?;

        assert_eq!(plugin.record_count(), 2);
        let stat = plugin.record_by_type(STAT, 0).unwrap();
        let name = stat.sub_record(TypeTag(*b"NAME"), 0).unwrap();
        assert_eq!(name.get_string(), "MyStatic");

        Ok(())
    }

    #[traced_test]
    #[test]
    fn read_skips_filtered_types() -> Result<()> {
        #[rustfmt::skip]
        let input = vec![
            b'T', b'E', b'S', b'3',  // tag
            0x00, 0x00, 0x00, 0x00,  // length
            0x00, 0x00, 0x00, 0x00,  // reserved
            0x00, 0x00, 0x00, 0x00,  // flags

            b'B', b'O', b'D', b'Y',  // tag
            0x0A, 0x00, 0x00, 0x00,  // length (10)
            0x00, 0x00, 0x00, 0x00,  // reserved
            0x00, 0x00, 0x00, 0x00,  // flags
            b'N', b'A', b'M', b'E',  // sub tag
            0x02, 0x00, 0x00, 0x00,  // payload length (2)
            b'a', 0x00,

            b'S', b'T', b'A', b'T',  // tag
            0x0A, 0x00, 0x00, 0x00,  // length (10)
            0x00, 0x00, 0x00, 0x00,  // reserved
            0x00, 0x00, 0x00, 0x00,  // flags
            b'N', b'A', b'M', b'E',  // sub tag
            0x02, 0x00, 0x00, 0x00,  // payload length (2)
            b'b', 0x00,
        ];

        let mut plugin = Plugin::new();
        read_plugin(
            &mut plugin,
            Cursor::new(&input),
            &TypeFilter::only([STAT]),
        )?;

        assert_eq!(plugin.record_count(), 2);
        assert!(plugin.records_by_type(BODY).is_empty());
        assert_eq!(plugin.records_by_type(STAT).len(), 1);
        assert_eq!(plugin.records_by_type(HEADER_TAG).len(), 1);

        // the same stream with BODY admitted yields the skipped record
        let mut plugin = Plugin::new();
        read_plugin(
            &mut plugin,
            Cursor::new(&input),
            &TypeFilter::only([BODY]),
        )?;

        assert_eq!(plugin.record_count(), 2);
        assert_eq!(plugin.records_by_type(BODY).len(), 1);
        assert!(plugin.records_by_type(STAT).is_empty());

        Ok(())
    }

    #[traced_test]
    #[test]
    fn read_rejects_wrong_first_tag() {
        #[rustfmt::skip]
        let input = vec![
            b'S', b'T', b'A', b'T',  // tag
            0x00, 0x00, 0x00, 0x00,  // length
            0x00, 0x00, 0x00, 0x00,  // reserved
            0x00, 0x00, 0x00, 0x00,  // flags
        ];

        let mut plugin = Plugin::new();
        let result = read_plugin(&mut plugin, Cursor::new(input), &TypeFilter::All);

        assert!(matches!(result, Err(Error::MalformedHeader)));
    }

    #[traced_test]
    #[test]
    fn read_rejects_empty_stream() {
        let mut plugin = Plugin::new();
        let result = read_plugin(&mut plugin, Cursor::new(Vec::new()), &TypeFilter::All);

        assert!(matches!(result, Err(Error::MalformedHeader)));
    }

    #[traced_test]
    #[test]
    fn read_rejects_negative_record_length() {
        #[rustfmt::skip]
        let input = vec![
            b'T', b'E', b'S', b'3',  // tag
            0xFF, 0xFF, 0xFF, 0xFF,  // length (-1)
            0x00, 0x00, 0x00, 0x00,  // reserved
            0x00, 0x00, 0x00, 0x00,  // flags
        ];

        let mut plugin = Plugin::new();
        let result = read_plugin(&mut plugin, Cursor::new(input), &TypeFilter::All);

        assert!(matches!(result, Err(Error::CorruptLength(_))));
    }

    #[traced_test]
    #[test]
    fn read_rejects_overrunning_sub_record() {
        #[rustfmt::skip]
        let input = vec![
            b'T', b'E', b'S', b'3',  // tag
            0x0A, 0x00, 0x00, 0x00,  // length (10)
            0x00, 0x00, 0x00, 0x00,  // reserved
            0x00, 0x00, 0x00, 0x00,  // flags
            b'H', b'E', b'D', b'R',  // sub tag
            0x09, 0x00, 0x00, 0x00,  // payload length (9, but only 2 left)
            0x00, 0x00,
        ];

        let mut plugin = Plugin::new();
        let result = read_plugin(&mut plugin, Cursor::new(input), &TypeFilter::All);

        assert!(matches!(result, Err(Error::CorruptLength(_))));
    }

    #[traced_test]
    #[test]
    fn read_rejects_truncated_sub_record_header() {
        #[rustfmt::skip]
        let input = vec![
            b'T', b'E', b'S', b'3',  // tag
            0x05, 0x00, 0x00, 0x00,  // length (5, under the 8 byte header)
            0x00, 0x00, 0x00, 0x00,  // reserved
            0x00, 0x00, 0x00, 0x00,  // flags
            b'H', b'E', b'D', b'R', 0x00,
        ];

        let mut plugin = Plugin::new();
        let result = read_plugin(&mut plugin, Cursor::new(input), &TypeFilter::All);

        assert!(matches!(result, Err(Error::CorruptLength(_))));
    }

    #[traced_test]
    #[test]
    fn load_is_additive() -> Result<()> {
        #[rustfmt::skip]
        let input = vec![
            b'T', b'E', b'S', b'3',  // tag
            0x00, 0x00, 0x00, 0x00,  // length
            0x00, 0x00, 0x00, 0x00,  // reserved
            0x00, 0x00, 0x00, 0x00,  // flags
        ];

        let mut plugin = Plugin::new();
        read_plugin(&mut plugin, Cursor::new(&input), &TypeFilter::All)?;
        read_plugin(&mut plugin, Cursor::new(&input), &TypeFilter::All)?;

        assert_eq!(plugin.record_count(), 2);
        assert_eq!(plugin.records_by_type(HEADER_TAG).len(), 2);

        Ok(())
    }
}
