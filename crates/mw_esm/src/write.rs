//! Exact-layout encode of plugin files with post-hoc length patching.

use std::fs;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use binrw::BinWrite;
use byteorder::{LittleEndian, WriteBytesExt};
use tracing::instrument;

use crate::error::{Error, Result};
use crate::types::{
    FieldValue, Plugin, Record, RecordHead, SubRecord, SubRecordHead, HEADER_META_TAG, HEADER_TAG,
    RECORD_COUNT_OFFSET,
};

/// Serialize `plugin` to a file at `path`, creating or truncating it.
///
/// Fails with [`Error::MissingHeader`] before any bytes are written when
/// the plugin holds no header record.
#[instrument(skip(plugin), fields(path = %path.as_ref().display()), err)]
pub fn save(plugin: &mut Plugin, path: impl AsRef<Path>) -> Result<()> {
    if plugin.record_by_type(HEADER_TAG, 0).is_none() {
        return Err(Error::MissingHeader);
    }

    let file = fs::File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write_plugin(plugin, &mut writer)?;
    writer.flush()?;

    Ok(())
}

/// Encode `plugin` to any seekable writer.
///
/// The header record is emitted first, with the plugin's total record count
/// packed into its metadata sub-record beforehand. The remaining records
/// follow in the flattened bucket order; any extra record carrying the
/// header tag is not emitted a second time.
#[instrument(skip_all, err)]
pub fn write_plugin<W: Write + Seek>(plugin: &mut Plugin, writer: &mut W) -> Result<()> {
    let count = plugin.record_count();

    let Some(header) = plugin.record_by_type_mut(HEADER_TAG, 0) else {
        return Err(Error::MissingHeader);
    };
    if let Some(meta) = header.sub_record_mut(HEADER_META_TAG, 0) {
        meta.pack(FieldValue::Long(count as i32), RECORD_COUNT_OFFSET, 4)?;
    }

    let header = plugin
        .record_by_type(HEADER_TAG, 0)
        .expect("header presence was checked above");
    write_record(writer, header)?;

    for record in plugin.records() {
        if record.tag() == HEADER_TAG {
            continue;
        }
        write_record(writer, record)?;
    }

    Ok(())
}

/// Write one record: tag, a placeholder header, the sub-record block, then
/// seek back and patch the real block length into the header.
///
/// The block length is only known once the sub-records have been emitted;
/// the format has no forward declaration for it.
fn write_record<W: Write + Seek>(writer: &mut W, record: &Record) -> Result<()> {
    writer.write_all(record.tag().as_bytes())?;

    let head_pos = writer.stream_position()?;
    RecordHead {
        length: 0,
        reserved: record.reserved(),
        flags: record.flags(),
    }
    .write(writer)?;

    let block_start = writer.stream_position()?;
    for sub in record.sub_records() {
        write_sub_record(writer, sub)?;
    }
    let block_len = writer.stream_position()? - block_start;

    writer.seek(SeekFrom::Start(head_pos))?;
    writer.write_i32::<LittleEndian>(block_len as i32)?;
    writer.seek(SeekFrom::End(0))?;

    Ok(())
}

fn write_sub_record<W: Write + Seek>(writer: &mut W, sub: &SubRecord) -> Result<()> {
    SubRecordHead {
        tag: sub.tag(),
        length: sub.payload().len() as i32,
    }
    .write(writer)?;
    writer.write_all(sub.payload())?;

    Ok(())
}
