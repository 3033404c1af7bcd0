// decode.rs
//
// Copyright (c) 2026  Douglas Lau
//
use crate::block::*;
use crate::error::{Error, Result};
use std::io::{BufReader, ErrorKind, Read};

/// Byte source tracking the stream offset for error context
struct ByteReader<R: Read> {
    reader: R,
    offset: u64,
}

impl<R: Read> ByteReader<R> {
    fn new(reader: R) -> Self {
        ByteReader { reader, offset: 0 }
    }
    /// Read exactly `len` bytes
    fn read_buf(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0; len];
        let mut pos = 0;
        while pos < len {
            match self.reader.read(&mut buf[pos..]) {
                Ok(0) => {
                    return Err(Error::UnexpectedEndOfStream {
                        offset: self.offset + pos as u64,
                    });
                }
                Ok(n) => pos += n,
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        self.offset += len as u64;
        Ok(buf)
    }
    /// Read a single byte
    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_buf(1)?[0])
    }
    /// Read a single byte, or `None` at end of stream
    fn try_read_u8(&mut self) -> Result<Option<u8>> {
        let mut buf = [0];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(buf[0]));
                }
                Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
    fn offset(&self) -> u64 {
        self.offset
    }
}

impl SubBlockChain {
    /// Read a chain from a byte source, keeping the terminating zero length
    /// byte with the chunk data
    fn read_from<R: Read>(reader: &mut ByteReader<R>) -> Result<Self> {
        let mut data = vec![];
        loop {
            let len = reader.read_u8()?;
            data.push(len);
            if len == 0 {
                break;
            }
            data.extend_from_slice(&reader.read_buf(len.into())?);
        }
        Ok(SubBlockChain::from_raw(data))
    }
}

/// GIF structure decoder
///
/// ## Example
/// ```
/// # fn main() -> Result<(), gifstruct::Error> {
/// # let gif = &[
/// #   0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00,
/// #   0x01, 0x00, 0x00, 0x00, 0x00, 0x3b,
/// # ][..];
/// let mut blocks = gifstruct::Decoder::new(gif).into_blocks();
/// let screen = blocks.screen()?.clone();
/// assert_eq!(screen.width(), 1);
/// for block in blocks {
///     println!("block: {:?}", block?);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Decoder<R: Read> {
    reader: R,
}

impl<R: Read> Decoder<BufReader<R>> {
    /// Create a new buffered GIF structure decoder
    pub fn new(reader: R) -> Self {
        Self::new_unbuffered(BufReader::new(reader))
    }
}

impl<R: Read> Decoder<R> {
    /// Create a new unbuffered GIF structure decoder
    pub fn new_unbuffered(reader: R) -> Self {
        Decoder { reader }
    }
    /// Convert into a block `Iterator`
    pub fn into_blocks(self) -> Blocks<R> {
        Blocks::new(self.reader)
    }
}

/// Iterator over every [Block] in a GIF stream
///
/// The logical screen precedes all blocks; read it with
/// [screen](struct.Blocks.html#method.screen) before iterating, or let the
/// first call to `next` consume it silently.
///
/// [Block]: block/enum.Block.html
pub struct Blocks<R: Read> {
    reader: ByteReader<R>,
    screen: Option<LogicalScreen>,
    screen_read: bool,
    done: bool,
}

impl<R: Read> Iterator for Blocks<R> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.screen_read {
            if let Err(e) = self.read_screen() {
                self.done = true;
                return Some(Err(e));
            }
        }
        match self.next_block() {
            Ok(Some(b)) => {
                if let Block::Trailer(_) = b {
                    self.done = true;
                }
                Some(Ok(b))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> Blocks<R> {
    fn new(reader: R) -> Self {
        Blocks {
            reader: ByteReader::new(reader),
            screen: None,
            screen_read: false,
            done: false,
        }
    }
    /// Read the logical screen
    pub fn screen(&mut self) -> Result<&LogicalScreen> {
        if !self.screen_read {
            self.read_screen()?;
        }
        match &self.screen {
            Some(screen) => Ok(screen),
            None => Err(Error::UnexpectedEndOfStream {
                offset: self.reader.offset(),
            }),
        }
    }
    /// Read the logical screen descriptor and optional global color table
    fn read_screen(&mut self) -> Result<()> {
        self.screen_read = true;
        let raw = self.reader.read_buf(13)?;
        let mut screen = LogicalScreen::new(raw);
        if screen.has_color_table() {
            let len = screen.color_table_len();
            screen.set_color_table(self.reader.read_buf(len)?);
        }
        debug!("screen: {}x{}", screen.width(), screen.height());
        self.screen = Some(screen);
        Ok(())
    }
    /// Decode the next block; `None` on a clean end of stream
    fn next_block(&mut self) -> Result<Option<Block>> {
        let code = match self.reader.try_read_u8()? {
            Some(code) => code,
            None => return Ok(None),
        };
        debug!("block: {:#04x} at {}", code, self.reader.offset() - 1);
        let block = match code {
            IMAGE_SEPARATOR => self.read_image(code)?,
            EXTENSION_INTRODUCER => self.read_extension(code)?,
            TRAILER => Trailer::default().into(),
            _ => {
                return Err(Error::InvalidBlockCode {
                    code,
                    offset: self.reader.offset() - 1,
                });
            }
        };
        Ok(Some(block))
    }
    /// Read an image descriptor with its color table and body
    fn read_image(&mut self, code: u8) -> Result<Block> {
        let mut raw = Vec::with_capacity(10);
        raw.push(code);
        raw.extend_from_slice(&self.reader.read_buf(9)?);
        let desc = ImageDescriptor::new(raw);
        let colors = if desc.has_color_table() {
            Some(self.reader.read_buf(desc.color_table_len())?)
        } else {
            None
        };
        let min_code_size = self.reader.read_u8()?;
        let data = SubBlockChain::read_from(&mut self.reader)?;
        Ok(desc
            .with_color_table(colors)
            .with_body(ImageBody::new(min_code_size, data))
            .into())
    }
    /// Read an extension block, dispatching on its label
    fn read_extension(&mut self, code: u8) -> Result<Block> {
        let label = self.reader.read_u8()?;
        match label {
            GRAPHIC_CONTROL => self.read_graphic_control(code, label),
            APPLICATION => self.read_application(code, label),
            _ => self.read_opaque(code, label),
        }
    }
    /// Read a graphic control extension
    fn read_graphic_control(&mut self, code: u8, label: u8) -> Result<Block> {
        let mut raw = Vec::with_capacity(8);
        raw.push(code);
        raw.push(label);
        // block size, flags, delay, transparent index, terminator
        raw.extend_from_slice(&self.reader.read_buf(6)?);
        Ok(GraphicControl::new(raw).into())
    }
    /// Read an application extension
    fn read_application(&mut self, code: u8, label: u8) -> Result<Block> {
        let mut raw = Vec::with_capacity(19);
        raw.push(code);
        raw.push(label);
        // identifier block size, 8-byte identifier, 3-byte auth code
        raw.extend_from_slice(&self.reader.read_buf(12)?);
        let data = SubBlockChain::read_from(&mut self.reader)?;
        raw.extend_from_slice(data.bytes());
        Ok(Application::new(raw, data).into())
    }
    /// Read an extension with an unhandled label, preserving raw bytes
    fn read_opaque(&mut self, code: u8, label: u8) -> Result<Block> {
        let data = SubBlockChain::read_from(&mut self.reader)?;
        let mut raw = Vec::with_capacity(2 + data.len());
        raw.push(code);
        raw.push(label);
        raw.extend_from_slice(data.bytes());
        Ok(Opaque::new(raw).into())
    }
}
