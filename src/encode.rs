// encode.rs
//
// Copyright (c) 2026  Douglas Lau
//
use crate::block::*;
use crate::error::{Error, Result};
use crate::store::{Record, RecordStore};
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Source of substitute image-body payloads, indexed in image encounter
/// order starting from zero
pub trait BodySource {
    /// Get the body payload for one image
    fn body(&self, index: usize) -> Result<Vec<u8>>;
}

/// Directory of numbered body files: `000.raw`, `001.raw`, …
pub struct BodyDir {
    dir: PathBuf,
}

impl BodyDir {
    /// Create a body source reading from a directory
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        BodyDir { dir: dir.into() }
    }
}

impl BodySource for BodyDir {
    fn body(&self, index: usize) -> Result<Vec<u8>> {
        let path = self.dir.join(format!("{:03}.raw", index));
        fs::read(&path).map_err(|_| Error::MissingBodyFile(path))
    }
}

/// In-memory body payloads, in image encounter order
impl BodySource for [Vec<u8>] {
    fn body(&self, index: usize) -> Result<Vec<u8>> {
        match self.get(index) {
            Some(body) => Ok(body.clone()),
            None => {
                Err(Error::MissingBodyFile(format!("{:03}.raw", index).into()))
            }
        }
    }
}

/// Rebuilds a GIF byte stream from a record store plus substitute bodies.
///
/// Selection is conservative: the global header, image descriptors, graphic
/// control extensions and the Netscape looping extension are re-emitted from
/// their verbatim bytes; every other stored block is dropped.  No trailer is
/// written.  Each image descriptor takes the next numbered body payload in
/// place of its originally decoded body.
pub struct Reconstructor<'a> {
    store: &'a RecordStore,
}

impl<'a> Reconstructor<'a> {
    /// Create a reconstructor over a record store
    pub fn new(store: &'a RecordStore) -> Self {
        Reconstructor { store }
    }

    /// Write the reconstructed stream
    pub fn write_to<W: Write, B: BodySource + ?Sized>(
        &self,
        writer: W,
        bodies: &B,
    ) -> Result<()> {
        let mut w = BufWriter::new(writer);
        if let Some(rec) = self.store.global() {
            format_global(rec, &mut w)?;
        }
        let mut pict = 0;
        for rec in self.store.blocks() {
            match Block::from_record(rec)? {
                Block::Image(b) => {
                    b.format(&mut w)?;
                    w.write_all(&bodies.body(pict)?)?;
                    pict += 1;
                }
                Block::GraphicControl(b) => b.format(&mut w)?,
                Block::Application(b) => {
                    if b.is_looping() {
                        b.format(&mut w)?;
                    } else {
                        debug!("dropping application ext: {}", rec.section);
                    }
                }
                _ => debug!("dropping section: {}", rec.section),
            }
        }
        w.flush()?;
        Ok(())
    }
}

/// Write the global header record: raw bytes, then the global color table
/// when one is flagged
fn format_global<W: Write>(rec: &Record, w: &mut BufWriter<W>) -> Result<()> {
    w.write_all(&raw_field(rec)?)?;
    if rec.flag("has_gct") {
        if let Some(colors) = rec.bytes("colors") {
            w.write_all(&colors)?;
        }
    }
    Ok(())
}

/// Get a record's mandatory verbatim bytes
fn raw_field(rec: &Record) -> Result<Vec<u8>> {
    rec.bytes("raw").ok_or_else(|| Error::MissingField {
        section: rec.section.clone(),
        key: "raw",
    })
}

impl Block {
    /// Recover a block from a store record.
    ///
    /// Only the fields reconstruction needs are read; unrecognized
    /// discriminants fall back to [Unknown](block/struct.Unknown.html).
    pub fn from_record(rec: &Record) -> Result<Self> {
        let block_id = rec.scalar("block_id").map(|id| id as u8);
        match block_id {
            Some(IMAGE_SEPARATOR) => {
                let raw = raw_field(rec)?;
                let colors = if rec.flag("has_lct") {
                    rec.bytes("colors")
                } else {
                    None
                };
                Ok(ImageDescriptor::new(raw).with_color_table(colors).into())
            }
            Some(EXTENSION_INTRODUCER) => {
                match rec.scalar("ext_id").map(|id| id as u8) {
                    Some(GRAPHIC_CONTROL) => {
                        Ok(GraphicControl::new(raw_field(rec)?).into())
                    }
                    Some(APPLICATION) => {
                        let raw = raw_field(rec)?;
                        let data = application_chain(&raw);
                        Ok(Application::new(raw, data).into())
                    }
                    _ => {
                        let raw = rec.bytes("raw").unwrap_or_default();
                        Ok(Opaque::new(raw).into())
                    }
                }
            }
            Some(TRAILER) => Ok(Trailer::default().into()),
            id => {
                let raw = rec.bytes("raw").unwrap_or_default();
                Ok(Unknown::new(id, raw).into())
            }
        }
    }
}

/// Recover the chained content of an application extension from its raw
/// bytes (identifier ends at offset 14)
fn application_chain(raw: &[u8]) -> SubBlockChain {
    if raw.len() > 14 {
        SubBlockChain::from_raw(raw[14..].to_vec())
    } else {
        SubBlockChain::default()
    }
}

impl ImageDescriptor {
    /// Format descriptor and color table bytes.  The pixel body is supplied
    /// separately during reconstruction.
    fn format<W: Write>(&self, w: &mut BufWriter<W>) -> io::Result<()> {
        w.write_all(self.raw())?;
        if let Some(colors) = self.color_table() {
            w.write_all(colors)?;
        }
        Ok(())
    }
}

impl GraphicControl {
    /// Format the extension verbatim
    fn format<W: Write>(&self, w: &mut BufWriter<W>) -> io::Result<()> {
        w.write_all(self.raw())
    }
}

impl Application {
    /// Format the extension verbatim
    fn format<W: Write>(&self, w: &mut BufWriter<W>) -> io::Result<()> {
        w.write_all(self.raw())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decode::Decoder;
    use std::path::Path;

    /// Build a GIF with one of every block kind, plus the bytes expected
    /// back from reconstruction (comment, foreign application extension and
    /// trailer dropped)
    fn build() -> (Vec<u8>, Vec<u8>) {
        let mut screen = b"GIF89a".to_vec();
        screen.extend_from_slice(&[4, 0, 4, 0, 0x91, 0, 0]);
        let gct: Vec<u8> = (0..12).collect();
        let gce = [0x21, 0xF9, 4, 0x01, 0x0A, 0x00, 0x02, 0];
        let comment = [0x21, 0xFE, 2, b'h', b'i', 0];
        let mut netscape = vec![0x21, 0xFF, 0x0B];
        netscape.extend_from_slice(b"NETSCAPE2.0");
        netscape.extend_from_slice(&[3, 1, 0, 0, 0]);
        let mut foreign = vec![0x21, 0xFF, 0x0B];
        foreign.extend_from_slice(b"EXAMPLE10.0");
        foreign.extend_from_slice(&[2, 0xAA, 0xBB, 0]);
        let desc = [0x2C, 0, 0, 0, 0, 4, 0, 4, 0, 0x80];
        let lct: Vec<u8> = (100..106).collect();
        let body = [0x02, 0x03, 0x8C, 0x2D, 0x99, 0x00];

        let mut gif = vec![];
        gif.extend_from_slice(&screen);
        gif.extend_from_slice(&gct);
        gif.extend_from_slice(&gce);
        gif.extend_from_slice(&comment);
        gif.extend_from_slice(&netscape);
        gif.extend_from_slice(&foreign);
        gif.extend_from_slice(&desc);
        gif.extend_from_slice(&lct);
        gif.extend_from_slice(&body);
        gif.push(0x3B);

        let mut expected = vec![];
        expected.extend_from_slice(&screen);
        expected.extend_from_slice(&gct);
        expected.extend_from_slice(&gce);
        expected.extend_from_slice(&netscape);
        expected.extend_from_slice(&desc);
        expected.extend_from_slice(&lct);
        expected.extend_from_slice(&body);
        (gif, expected)
    }

    /// Extract body payloads in image encounter order
    fn extract_bodies(gif: &[u8]) -> Result<Vec<Vec<u8>>> {
        let mut bodies = vec![];
        for block in Decoder::new(gif).into_blocks() {
            if let Block::Image(b) = block? {
                if let Some(body) = b.body() {
                    bodies.push(body.bytes());
                }
            }
        }
        Ok(bodies)
    }

    #[test]
    fn round_trip() -> Result<()> {
        let (gif, expected) = build();
        let bodies = extract_bodies(&gif)?;
        let store = RecordStore::from_gif(&gif[..])?;
        let mut out = vec![];
        Reconstructor::new(&store).write_to(&mut out, bodies.as_slice())?;
        assert_eq!(out, expected);
        Ok(())
    }

    #[test]
    fn missing_body_is_fatal() -> Result<()> {
        let (gif, _) = build();
        let store = RecordStore::from_gif(&gif[..])?;
        let bodies: Vec<Vec<u8>> = vec![];
        let mut out = vec![];
        match Reconstructor::new(&store).write_to(&mut out, bodies.as_slice())
        {
            Err(Error::MissingBodyFile(path)) => {
                assert_eq!(path, Path::new("000.raw"));
            }
            r => panic!("unexpected result: {:?}", r),
        }
        Ok(())
    }

    #[test]
    fn tolerant_global() -> Result<()> {
        let mut store = RecordStore::default();
        let mut rec = Record::new("global");
        rec.set_bytes("raw", b"GIF89a\x01\x00\x01\x00\x00\x00\x00");
        store.push(rec);
        let bodies: Vec<Vec<u8>> = vec![];
        let mut out = vec![];
        Reconstructor::new(&store).write_to(&mut out, bodies.as_slice())?;
        assert_eq!(out, b"GIF89a\x01\x00\x01\x00\x00\x00\x00");
        Ok(())
    }

    #[test]
    fn trailer_not_emitted() -> Result<()> {
        let mut gif = b"GIF89a".to_vec();
        gif.extend_from_slice(&[1, 0, 1, 0, 0, 0, 0, 0x3B]);
        let store = RecordStore::from_gif(&gif[..])?;
        let bodies: Vec<Vec<u8>> = vec![];
        let mut out = vec![];
        Reconstructor::new(&store).write_to(&mut out, bodies.as_slice())?;
        assert_eq!(out, &gif[..13]);
        Ok(())
    }

    #[test]
    fn missing_raw_is_fatal() {
        let mut store = RecordStore::default();
        let mut rec = Record::new("1");
        rec.set_scalar("block id", 0x2C);
        store.push(rec);
        let bodies: Vec<Vec<u8>> = vec![];
        let mut out = vec![];
        match Reconstructor::new(&store).write_to(&mut out, bodies.as_slice())
        {
            Err(Error::MissingField { section, key }) => {
                assert_eq!(section, "1");
                assert_eq!(key, "raw");
            }
            r => panic!("unexpected result: {:?}", r),
        }
    }
}
