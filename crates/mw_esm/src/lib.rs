//! This library handles reading from and creating **ESM/ESP** plugin files used by
//! *The Elder Scrolls III: Morrowind*.
//!
//! # Plugin Format Documentation
//!
//! This crate provides utilities to read and write the plugin format used to ship mods
//! for the game. A plugin is a flat stream of type-tagged, length-prefixed records; each
//! record carries an ordered sequence of type-tagged, length-prefixed sub-records whose
//! payload bytes are opaque to the container. Plugin files are typically identified with
//! the `.esm` (master) or `.esp` (plugin) extension.
//!
//! ## File Structure
//!
//! A plugin file is nothing but records back to back; there is no file header beyond the
//! first record and no trailer. Each record has the following structure:
//!
//! | Offset (bytes) | Field            | Description                                         |
//! |----------------|------------------|-----------------------------------------------------|
//! | 0x0000         | Type Tag         | 4 bytes: record kind, e.g. `TES3`, `STAT`, `NPC_`   |
//! | 0x0004         | Length           | 4 bytes: size of the sub-record block               |
//! | 0x0008         | Reserved         | 4 bytes: opaque word, preserved through round trips |
//! | 0x000C         | Flags            | 4 bytes: record flags                               |
//! | 0x0010         | Sub-record Block | `Length` bytes: consecutive sub-records             |
//!
//! The sub-record block consumes exactly `Length` bytes and consists of zero or more
//! sub-records:
//!
//! | Offset (bytes) | Field          | Description                                  |
//! |----------------|----------------|----------------------------------------------|
//! | 0x0000         | Type Tag       | 4 bytes: sub-record kind, e.g. `NAME`, `HEDR`|
//! | 0x0004         | Payload Length | 4 bytes: size of the payload                 |
//! | 0x0008         | Payload        | `Payload Length` bytes: opaque field data    |
//!
//! ### Header Record
//!
//! The first record of a valid plugin always carries the tag `TES3`. It conventionally
//! holds a single `HEDR` sub-record whose 300 byte payload is laid out as:
//!
//! | Offset (bytes) | Field        | Description                                        |
//! |----------------|--------------|----------------------------------------------------|
//! | 0x0000         | Version      | 4 bytes: file format version as an IEEE 754 float  |
//! | 0x0004         | Unknown      | 4 bytes: float of unknown purpose                  |
//! | 0x0008         | Author       | 32 bytes: NUL padded author name                   |
//! | 0x0028         | Description  | 256 bytes: NUL padded description                  |
//! | 0x0128         | Record Count | 4 bytes: number of records in the file             |
//!
//! The stored record count is known to be wrong in files found in the wild, so the
//! reader walks the stream by byte position instead of trusting it. The writer patches
//! it to the real count on every save.
//!
//! ## Additional Information
//!
//! - **File Extensions**: `.esm`, `.esp`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Integers**: 32-bit signed throughout
//!

pub mod error;
pub mod read;
pub mod types;
pub mod write;

pub use read::{load, read_plugin, TypeFilter};
pub use types::{FieldKind, FieldValue, Plugin, Record, SubRecord, TypeTag};
pub use write::{save, write_plugin};
