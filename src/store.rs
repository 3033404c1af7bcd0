// store.rs
//
// Copyright (c) 2026  Douglas Lau
//

//! Structured record store boundary
//!
//! One section per decoded block plus one for the global header, each an
//! editable key/value map.  Scalars serialize as decimal strings and byte
//! arrays as lowercase hex pairs, so a store survives text tools without
//! loss; every section keeps the complete verbatim bytes of its block in a
//! `raw` field.
use crate::bitfield;
use crate::block::*;
use crate::decode::Decoder;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// Section name of the global header record
pub const GLOBAL_SECTION: &str = "global";

/// One key/value section of the structured store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Section identifier: `global`, or the 1-based block number
    pub section: String,
    /// Field values, keyed by normalized name
    fields: BTreeMap<String, String>,
}

impl Record {
    /// Create an empty record
    pub fn new(section: &str) -> Self {
        Record {
            section: section.to_string(),
            fields: BTreeMap::new(),
        }
    }
    /// Normalize a field key: lowercased, embedded spaces as underscores
    fn normalize(key: &str) -> String {
        key.replace(' ', "_").to_lowercase()
    }
    /// Set a scalar field (decimal string)
    pub fn set_scalar(&mut self, key: &str, value: u64) {
        self.fields.insert(Self::normalize(key), value.to_string());
    }
    /// Set a byte-array field (lowercase hex pairs)
    pub fn set_bytes(&mut self, key: &str, value: &[u8]) {
        self.fields.insert(Self::normalize(key), to_hex(value));
    }
    /// Set a text field
    pub fn set_text(&mut self, key: &str, value: &str) {
        self.fields.insert(Self::normalize(key), value.to_string());
    }
    /// Look up a scalar field
    pub fn scalar(&self, key: &str) -> Option<u64> {
        self.fields.get(key)?.parse().ok()
    }
    /// Look up a byte-array field
    pub fn bytes(&self, key: &str) -> Option<Vec<u8>> {
        from_hex(self.fields.get(key)?)
    }
    /// Look up a text field
    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
    /// Look up an optional flag field; absent means unset
    pub fn flag(&self, key: &str) -> bool {
        self.scalar(key).unwrap_or(0) != 0
    }
}

/// Encode bytes as lowercase hex pairs
fn to_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push(char::from(HEX[usize::from(b >> 4)]));
        s.push(char::from(HEX[usize::from(b & 0xF)]));
    }
    s
}

/// Decode lowercase hex pairs into bytes
fn from_hex(s: &str) -> Option<Vec<u8>> {
    let s = s.as_bytes();
    if s.len() % 2 != 0 {
        return None;
    }
    let mut bytes = Vec::with_capacity(s.len() / 2);
    for pair in s.chunks(2) {
        let hi = char::from(pair[0]).to_digit(16)?;
        let lo = char::from(pair[1]).to_digit(16)?;
        bytes.push((hi << 4 | lo) as u8);
    }
    Some(bytes)
}

/// Ordered store of sections recovered from one GIF stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    /// Decode a GIF stream into a record store.
    ///
    /// Sections are `global` followed by `1`, `2`, … in stream order.
    ///
    /// ## Example
    /// ```
    /// # fn main() -> Result<(), gifstruct::Error> {
    /// # let gif = &[
    /// #   0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00,
    /// #   0x01, 0x00, 0x00, 0x00, 0x00, 0x3b,
    /// # ][..];
    /// let store = gifstruct::RecordStore::from_gif(gif)?;
    /// assert_eq!(store.records().len(), 2);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_gif<R: Read>(reader: R) -> Result<Self> {
        let mut blocks = Decoder::new(reader).into_blocks();
        let mut store = RecordStore::default();
        store.push(blocks.screen()?.to_record());
        for (num, block) in (1u32..).zip(&mut blocks) {
            store.push(block?.to_record(&num.to_string()));
        }
        Ok(store)
    }
    /// Append a record
    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }
    /// Get all records in stream order
    pub fn records(&self) -> &[Record] {
        &self.records
    }
    /// Get the global header record
    pub fn global(&self) -> Option<&Record> {
        self.records.iter().find(|r| r.section == GLOBAL_SECTION)
    }
    /// Iterate over the block records, in stream order
    pub fn blocks(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.section != GLOBAL_SECTION)
    }
    /// Serialize the store as JSON
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
    /// Deserialize a store from JSON
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }
}

impl LogicalScreen {
    /// Build the global header record
    pub fn to_record(&self) -> Record {
        let mut rec = Record::new(GLOBAL_SECTION);
        rec.set_text("version", &String::from_utf8_lossy(self.version()));
        rec.set_scalar("width", self.width().into());
        rec.set_scalar("height", self.height().into());
        for (name, value) in bitfield::unpack(self.flags().into(), SCREEN_FLAGS)
        {
            rec.set_scalar(name, value.into());
        }
        rec.set_scalar("bgcolor index", self.background_color_idx().into());
        rec.set_scalar("ratio", self.pixel_aspect_ratio().into());
        rec.set_scalar("GCT len", self.color_table_len() as u64);
        if let Some(colors) = self.color_table() {
            rec.set_bytes("colors", colors);
        }
        rec.set_bytes("raw", self.raw());
        rec
    }
}

impl Block {
    /// Build a store record for this block
    pub fn to_record(&self, section: &str) -> Record {
        use self::Block::*;
        match self {
            Image(b) => b.to_record(section),
            GraphicControl(b) => b.to_record(section),
            Application(b) => b.to_record(section),
            Opaque(b) => b.to_record(section),
            Trailer(b) => b.to_record(section),
            Unknown(b) => b.to_record(section),
        }
    }
}

impl ImageDescriptor {
    /// Build a store record
    pub fn to_record(&self, section: &str) -> Record {
        let mut rec = Record::new(section);
        rec.set_scalar("block id", IMAGE_SEPARATOR.into());
        rec.set_scalar("x", self.x().into());
        rec.set_scalar("y", self.y().into());
        rec.set_scalar("width", self.width().into());
        rec.set_scalar("height", self.height().into());
        for (name, value) in bitfield::unpack(self.flags().into(), IMAGE_FLAGS)
        {
            rec.set_scalar(name, value.into());
        }
        rec.set_scalar("LCT len", self.color_table_len() as u64);
        if let Some(colors) = self.color_table() {
            rec.set_bytes("colors", colors);
        }
        rec.set_bytes("raw", self.raw());
        rec
    }
}

impl GraphicControl {
    /// Build a store record
    pub fn to_record(&self, section: &str) -> Record {
        let mut rec = Record::new(section);
        rec.set_scalar("block id", EXTENSION_INTRODUCER.into());
        rec.set_scalar("ext id", GRAPHIC_CONTROL.into());
        for (name, value) in
            bitfield::unpack(self.flags().into(), CONTROL_FLAGS)
        {
            rec.set_scalar(name, value.into());
        }
        rec.set_scalar("delay", self.delay_time_cs().into());
        rec.set_scalar("transparent index", self.transparent_color_idx().into());
        rec.set_bytes("raw", self.raw());
        rec
    }
}

impl Application {
    /// Build a store record
    pub fn to_record(&self, section: &str) -> Record {
        let mut rec = Record::new(section);
        rec.set_scalar("block id", EXTENSION_INTRODUCER.into());
        rec.set_scalar("ext id", APPLICATION.into());
        rec.set_text(
            "application id",
            &String::from_utf8_lossy(self.app_id()),
        );
        rec.set_text(
            "application id code",
            &String::from_utf8_lossy(self.auth_code()),
        );
        if let Some(count) = self.loop_count() {
            rec.set_scalar("loop", count.into());
        }
        rec.set_bytes("raw", self.raw());
        rec
    }
}

impl Opaque {
    /// Build a store record
    pub fn to_record(&self, section: &str) -> Record {
        let mut rec = Record::new(section);
        rec.set_scalar("block id", EXTENSION_INTRODUCER.into());
        rec.set_scalar("ext id", self.ext_id().into());
        rec.set_bytes("raw", self.raw());
        rec
    }
}

impl Trailer {
    /// Build a store record
    pub fn to_record(&self, section: &str) -> Record {
        let mut rec = Record::new(section);
        rec.set_scalar("block id", TRAILER.into());
        rec.set_bytes("raw", self.raw());
        rec
    }
}

impl Unknown {
    /// Build a store record
    pub fn to_record(&self, section: &str) -> Record {
        let mut rec = Record::new(section);
        if let Some(id) = self.block_id() {
            rec.set_scalar("block id", id.into());
        }
        rec.set_bytes("raw", self.raw());
        rec
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn minimal_gif() -> Vec<u8> {
        let mut gif = b"GIF89a".to_vec();
        gif.extend_from_slice(&[1, 0, 1, 0, 0, 0, 0, 0x3B]);
        gif
    }

    #[test]
    fn minimal_two_records() -> Result<()> {
        let store = RecordStore::from_gif(&minimal_gif()[..])?;
        assert_eq!(store.records().len(), 2);
        let global = &store.records()[0];
        assert_eq!(global.section, GLOBAL_SECTION);
        assert_eq!(global.text("version"), Some("89a"));
        assert_eq!(global.scalar("width"), Some(1));
        assert_eq!(global.scalar("height"), Some(1));
        assert!(!global.flag("has_gct"));
        assert_eq!(global.scalar("gct_len"), Some(6));
        assert_eq!(global.bytes("raw").map(|r| r.len()), Some(13));
        let trailer = &store.records()[1];
        assert_eq!(trailer.section, "1");
        assert_eq!(trailer.scalar("block_id"), Some(0x3B));
        assert_eq!(trailer.bytes("raw"), Some(vec![0x3B]));
        Ok(())
    }

    #[test]
    fn sections_in_stream_order() -> Result<()> {
        let mut gif = b"GIF89a".to_vec();
        gif.extend_from_slice(&[1, 0, 1, 0, 0, 0, 0]);
        gif.extend_from_slice(&[0x21, 0xF9, 4, 0, 10, 0, 0, 0]);
        gif.extend_from_slice(&[0x21, 0xFE, 2, b'h', b'i', 0]);
        gif.push(0x3B);
        let store = RecordStore::from_gif(&gif[..])?;
        let sections: Vec<&str> =
            store.records().iter().map(|r| r.section.as_str()).collect();
        assert_eq!(sections, ["global", "1", "2", "3"]);
        let gce = &store.records()[1];
        assert_eq!(gce.scalar("block_id"), Some(0x21));
        assert_eq!(gce.scalar("ext_id"), Some(0xF9));
        assert_eq!(gce.scalar("delay"), Some(10));
        assert_eq!(gce.scalar("transparent_flag"), Some(0));
        let comment = &store.records()[2];
        assert_eq!(comment.scalar("ext_id"), Some(0xFE));
        assert_eq!(comment.bytes("raw"), Some(vec![0x21, 0xFE, 2, b'h', b'i', 0]));
        Ok(())
    }

    #[test]
    fn netscape_record() -> Result<()> {
        let mut gif = b"GIF89a".to_vec();
        gif.extend_from_slice(&[1, 0, 1, 0, 0, 0, 0]);
        gif.extend_from_slice(&[0x21, 0xFF, 0x0B]);
        gif.extend_from_slice(b"NETSCAPE2.0");
        gif.extend_from_slice(&[3, 1, 2, 0, 0]);
        gif.push(0x3B);
        let store = RecordStore::from_gif(&gif[..])?;
        let app = &store.records()[1];
        assert_eq!(app.text("application_id"), Some("NETSCAPE"));
        assert_eq!(app.text("application_id_code"), Some("2.0"));
        assert_eq!(app.scalar("loop"), Some(2));
        assert_eq!(app.bytes("raw").map(|r| r.len()), Some(19));
        Ok(())
    }

    #[test]
    fn key_normalization() {
        let mut rec = Record::new("1");
        rec.set_scalar("GCT size", 3);
        assert_eq!(rec.scalar("gct_size"), Some(3));
        rec.set_text("application id code", "2.0");
        assert_eq!(rec.text("application_id_code"), Some("2.0"));
    }

    #[test]
    fn absent_fields_default() {
        let rec = Record::new("1");
        assert!(!rec.flag("has_lct"));
        assert_eq!(rec.scalar("block_id"), None);
        assert_eq!(rec.bytes("raw"), None);
        assert_eq!(rec.text("version"), None);
    }

    #[test]
    fn hex_fields() {
        let mut rec = Record::new("1");
        rec.set_bytes("colors", &[0xAB, 0x01, 0xFF]);
        assert_eq!(rec.text("colors"), Some("ab01ff"));
        assert_eq!(rec.bytes("colors"), Some(vec![0xAB, 0x01, 0xFF]));
        rec.set_text("colors", "xyz");
        assert_eq!(rec.bytes("colors"), None);
    }

    #[test]
    fn json_round_trip() -> Result<()> {
        let store = RecordStore::from_gif(&minimal_gif()[..])?;
        let mut buf = vec![];
        store.to_writer(&mut buf)?;
        let recovered = RecordStore::from_reader(&buf[..])?;
        assert_eq!(store, recovered);
        Ok(())
    }
}
