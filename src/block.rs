// block.rs
//
// Copyright (c) 2026  Douglas Lau
//

//! Block types for the GIF structure model
use crate::bitfield::{self, BitField, RESERVED};

/// Image separator introducer (0x2C)
pub(crate) const IMAGE_SEPARATOR: u8 = 0x2C;
/// Extension introducer (0x21)
pub(crate) const EXTENSION_INTRODUCER: u8 = 0x21;
/// GIF trailer (0x3B)
pub(crate) const TRAILER: u8 = 0x3B;
/// Graphic control extension label
pub(crate) const GRAPHIC_CONTROL: u8 = 0xF9;
/// Application extension label
pub(crate) const APPLICATION: u8 = 0xFF;
/// Identifier + authentication code of the Netscape looping extension
pub(crate) const NETSCAPE: &[u8] = b"NETSCAPE2.0";

/// Packed flag layout of the logical screen descriptor
pub const SCREEN_FLAGS: &[BitField] = &[
    ("gct_size", 3),
    ("sorted", 1),
    ("color_resolution", 3),
    ("has_gct", 1),
];

/// Packed flag layout of an image descriptor
pub const IMAGE_FLAGS: &[BitField] = &[
    ("lct_size", 3),
    (RESERVED, 2),
    ("sorted", 1),
    ("interlaced", 1),
    ("has_lct", 1),
];

/// Packed flag layout of a graphic control extension
pub const CONTROL_FLAGS: &[BitField] = &[
    ("transparent_flag", 1),
    ("user_input", 1),
    ("disposal_method", 3),
    (RESERVED, 3),
];

/// Color table byte length for a 3-bit size field: `3 · 2^(size+1)`
pub fn color_table_len(size: u16) -> usize {
    3 * (2usize << size)
}

/// Decode a little-endian `u16` at a byte offset
pub(crate) fn le16(buf: &[u8], i: usize) -> u16 {
    u16::from(buf[i + 1]) << 8 | u16::from(buf[i])
}

/// GIF's generic chained payload: length-prefixed chunks terminated by a
/// zero length byte, kept verbatim.
///
/// The same primitive carries compressed pixel data and all extension
/// content.  A chain is never empty; its minimum content is the single
/// terminating zero byte, which is stored with the chunk data rather than
/// re-synthesized on write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubBlockChain {
    data: Vec<u8>,
}

impl Default for SubBlockChain {
    fn default() -> Self {
        SubBlockChain { data: vec![0] }
    }
}

impl SubBlockChain {
    /// Create a chain from chunk payloads, each shorter than 256 bytes
    pub fn with_chunks(chunks: &[&[u8]]) -> Self {
        let mut data = vec![];
        for c in chunks {
            assert!(c.len() < 256);
            data.push(c.len() as u8);
            data.extend_from_slice(c);
        }
        data.push(0);
        SubBlockChain { data }
    }
    /// Wrap a verbatim byte run (length bytes, payloads and terminator)
    pub(crate) fn from_raw(data: Vec<u8>) -> Self {
        debug_assert_eq!(data.last(), Some(&0));
        SubBlockChain { data }
    }
    /// Get the verbatim bytes, terminator included
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
    /// Total length in bytes: 1 terminator + (1 + payload length) per chunk
    pub fn len(&self) -> usize {
        self.data.len()
    }
    /// Check if the chain holds no chunks
    pub fn is_empty(&self) -> bool {
        self.data.len() <= 1
    }
    /// Iterate over chunk payloads, without their length bytes
    pub fn chunks(&self) -> Chunks {
        Chunks { data: &self.data }
    }
}

/// Iterator over the chunk payloads of a [SubBlockChain]
///
/// [SubBlockChain]: struct.SubBlockChain.html
pub struct Chunks<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        let len = *self.data.first()? as usize;
        if len == 0 {
            return None;
        }
        let (chunk, rest) = self.data[1..].split_at(len);
        self.data = rest;
        Some(chunk)
    }
}

/// Logical screen descriptor with its optional global color table.
///
/// Exactly one per stream, decoded before the block loop starts.
#[derive(Debug, Clone)]
pub struct LogicalScreen {
    raw: Vec<u8>,            // 13 verbatim bytes, signature through ratio
    colors: Option<Vec<u8>>, // global color table
}

impl LogicalScreen {
    pub(crate) fn new(raw: Vec<u8>) -> Self {
        debug_assert_eq!(raw.len(), 13);
        LogicalScreen { raw, colors: None }
    }
    pub(crate) fn set_color_table(&mut self, colors: Vec<u8>) {
        self.colors = Some(colors);
    }
    /// Get the verbatim header bytes
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
    /// Get the format version, e.g. `89a`
    pub fn version(&self) -> &[u8] {
        &self.raw[3..6]
    }
    /// Get the canvas width
    pub fn width(&self) -> u16 {
        le16(&self.raw, 6)
    }
    /// Get the canvas height
    pub fn height(&self) -> u16 {
        le16(&self.raw, 8)
    }
    /// Get the packed flag byte
    pub fn flags(&self) -> u8 {
        self.raw[10]
    }
    /// Get the background color index
    pub fn background_color_idx(&self) -> u8 {
        self.raw[11]
    }
    /// Get the pixel aspect ratio
    pub fn pixel_aspect_ratio(&self) -> u8 {
        self.raw[12]
    }
    fn flag(&self, name: &str) -> u16 {
        bitfield::get(self.flags().into(), SCREEN_FLAGS, name)
    }
    /// Check whether a global color table is present
    pub fn has_color_table(&self) -> bool {
        self.flag("has_gct") != 0
    }
    /// Byte length declared for the global color table, whether or not one
    /// is present
    pub fn color_table_len(&self) -> usize {
        color_table_len(self.flag("gct_size"))
    }
    /// Get the global color table
    pub fn color_table(&self) -> Option<&[u8]> {
        self.colors.as_deref()
    }
}

/// Opaque compressed pixel payload: one LZW minimum code size byte plus a
/// sub-block chain.  Never interpreted by this crate.
#[derive(Debug, Clone)]
pub struct ImageBody {
    min_code_size: u8,
    data: SubBlockChain,
}

impl ImageBody {
    pub(crate) fn new(min_code_size: u8, data: SubBlockChain) -> Self {
        ImageBody { min_code_size, data }
    }
    /// Get the LZW minimum code size
    pub fn min_code_size(&self) -> u8 {
        self.min_code_size
    }
    /// Get the chained compressed data
    pub fn data(&self) -> &SubBlockChain {
        &self.data
    }
    /// Get the full body bytes as written in the stream
    pub fn bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(1 + self.data.len());
        buf.push(self.min_code_size);
        buf.extend_from_slice(self.data.bytes());
        buf
    }
}

/// Image descriptor block with its optional local color table and body
#[derive(Debug, Clone)]
pub struct ImageDescriptor {
    raw: Vec<u8>,            // introducer + 9 descriptor bytes
    colors: Option<Vec<u8>>, // local color table
    body: Option<ImageBody>, // absent when recovered from a record store
}

impl ImageDescriptor {
    pub(crate) fn new(raw: Vec<u8>) -> Self {
        ImageDescriptor {
            raw,
            colors: None,
            body: None,
        }
    }
    pub(crate) fn with_color_table(mut self, colors: Option<Vec<u8>>) -> Self {
        self.colors = colors;
        self
    }
    pub(crate) fn with_body(mut self, body: ImageBody) -> Self {
        self.body = Some(body);
        self
    }
    /// Get the verbatim descriptor bytes, introducer included
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
    /// Get the left position
    pub fn x(&self) -> u16 {
        le16(&self.raw, 1)
    }
    /// Get the top position
    pub fn y(&self) -> u16 {
        le16(&self.raw, 3)
    }
    /// Get the image width
    pub fn width(&self) -> u16 {
        le16(&self.raw, 5)
    }
    /// Get the image height
    pub fn height(&self) -> u16 {
        le16(&self.raw, 7)
    }
    /// Get the packed flag byte
    pub fn flags(&self) -> u8 {
        self.raw[9]
    }
    fn flag(&self, name: &str) -> u16 {
        bitfield::get(self.flags().into(), IMAGE_FLAGS, name)
    }
    /// Check whether the image is interlaced
    pub fn interlaced(&self) -> bool {
        self.flag("interlaced") != 0
    }
    /// Check whether a local color table is present
    pub fn has_color_table(&self) -> bool {
        self.flag("has_lct") != 0
    }
    /// Byte length declared for the local color table, whether or not one
    /// is present
    pub fn color_table_len(&self) -> usize {
        color_table_len(self.flag("lct_size"))
    }
    /// Get the local color table
    pub fn color_table(&self) -> Option<&[u8]> {
        self.colors.as_deref()
    }
    /// Get the compressed pixel body
    pub fn body(&self) -> Option<&ImageBody> {
        self.body.as_ref()
    }
}

/// Frame disposal method from a graphic control extension
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DisposalMethod {
    /// No disposal specified
    NoAction,
    /// Keep the frame in place
    Keep,
    /// Restore to background color
    Background,
    /// Restore to previous frame
    Previous,
    /// Reserved values
    Reserved(u8),
}

impl From<u8> for DisposalMethod {
    fn from(n: u8) -> Self {
        use self::DisposalMethod::*;
        match n & 0b0111 {
            0 => NoAction,
            1 => Keep,
            2 => Background,
            3 => Previous,
            _ => Reserved(n),
        }
    }
}

impl From<DisposalMethod> for u8 {
    fn from(d: DisposalMethod) -> Self {
        use self::DisposalMethod::*;
        match d {
            NoAction => 0,
            Keep => 1,
            Background => 2,
            Previous => 3,
            Reserved(n) => n & 0b0111,
        }
    }
}

/// Graphic control extension: per-frame timing and transparency
#[derive(Debug, Clone)]
pub struct GraphicControl {
    raw: Vec<u8>, // 8 verbatim bytes
}

impl GraphicControl {
    pub(crate) fn new(raw: Vec<u8>) -> Self {
        debug_assert_eq!(raw.len(), 8);
        GraphicControl { raw }
    }
    /// Get the verbatim extension bytes
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
    /// Get the packed flag byte
    pub fn flags(&self) -> u8 {
        self.raw[3]
    }
    fn flag(&self, name: &str) -> u16 {
        bitfield::get(self.flags().into(), CONTROL_FLAGS, name)
    }
    /// Get the frame delay in centiseconds
    pub fn delay_time_cs(&self) -> u16 {
        le16(&self.raw, 4)
    }
    /// Check the user input flag
    pub fn user_input(&self) -> bool {
        self.flag("user_input") != 0
    }
    /// Get the disposal method
    pub fn disposal_method(&self) -> DisposalMethod {
        (self.flag("disposal_method") as u8).into()
    }
    /// Get the transparent color index field
    pub fn transparent_color_idx(&self) -> u8 {
        self.raw[6]
    }
    /// Get the transparent color index, if the transparency flag is set
    pub fn transparent_color(&self) -> Option<u8> {
        if self.flag("transparent_flag") != 0 {
            Some(self.transparent_color_idx())
        } else {
            None
        }
    }
}

/// Application extension block
#[derive(Debug, Clone)]
pub struct Application {
    raw: Vec<u8>, // introducer, label, identifier and chained content
    data: SubBlockChain,
}

impl Application {
    pub(crate) fn new(raw: Vec<u8>, data: SubBlockChain) -> Self {
        Application { raw, data }
    }
    /// Get the verbatim extension bytes
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
    /// Get the 8-byte application identifier
    pub fn app_id(&self) -> &[u8] {
        &self.raw[3..11]
    }
    /// Get the 3-byte authentication code
    pub fn auth_code(&self) -> &[u8] {
        &self.raw[11..14]
    }
    /// Get the chained extension content
    pub fn data(&self) -> &SubBlockChain {
        &self.data
    }
    /// Check for the Netscape looping extension
    pub fn is_looping(&self) -> bool {
        self.raw.len() >= 14 && &self.raw[3..14] == NETSCAPE
    }
    /// Number of times to loop an animation; zero means loop forever.
    ///
    /// `None` unless this is a well-formed Netscape looping extension.
    pub fn loop_count(&self) -> Option<u16> {
        if !self.is_looping() {
            return None;
        }
        let chunk = self.data.chunks().next()?;
        if chunk.len() == 3 {
            // sub-block ID, then loop count at offset 1
            Some(le16(chunk, 1))
        } else {
            warn!("malformed looping extension data: {:?}", chunk);
            None
        }
    }
}

/// Extension with a label outside the dispatch table, kept as raw bytes
#[derive(Debug, Clone)]
pub struct Opaque {
    raw: Vec<u8>, // introducer, label and chained content
}

impl Opaque {
    pub(crate) fn new(raw: Vec<u8>) -> Self {
        Opaque { raw }
    }
    /// Get the verbatim extension bytes
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
    /// Get the extension label
    pub fn ext_id(&self) -> u8 {
        self.raw[1]
    }
}

/// Trailer block, terminating the stream
#[derive(Debug, Clone, Default)]
pub struct Trailer {}

impl Trailer {
    /// Get the verbatim trailer byte
    pub fn raw(&self) -> &[u8] {
        &[TRAILER]
    }
}

/// Store section with an unrecognized discriminant, kept as raw bytes.
///
/// Never produced by the decoder; recovered from hand-edited or foreign
/// record stores, and always dropped on reconstruction.
#[derive(Debug, Clone, Default)]
pub struct Unknown {
    block_id: Option<u8>,
    raw: Vec<u8>,
}

impl Unknown {
    pub(crate) fn new(block_id: Option<u8>, raw: Vec<u8>) -> Self {
        Unknown { block_id, raw }
    }
    /// Get the block discriminant, if one was stored
    pub fn block_id(&self) -> Option<u8> {
        self.block_id
    }
    /// Get the stored raw bytes
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }
}

/// A single block from a GIF stream
#[derive(Debug, Clone)]
pub enum Block {
    /// Image descriptor (0x2C)
    Image(ImageDescriptor),
    /// Graphic control extension (0x21 / 0xF9)
    GraphicControl(GraphicControl),
    /// Application extension (0x21 / 0xFF)
    Application(Application),
    /// Any other extension kind (0x21)
    Opaque(Opaque),
    /// Trailer (0x3B)
    Trailer(Trailer),
    /// Unrecognized store section
    Unknown(Unknown),
}

impl Block {
    /// Get the introducer byte of this block
    pub fn block_id(&self) -> Option<u8> {
        use self::Block::*;
        match self {
            Image(_) => Some(IMAGE_SEPARATOR),
            GraphicControl(_) | Application(_) | Opaque(_) => {
                Some(EXTENSION_INTRODUCER)
            }
            Trailer(_) => Some(TRAILER),
            Unknown(b) => b.block_id(),
        }
    }
}

impl From<ImageDescriptor> for Block {
    fn from(b: ImageDescriptor) -> Self {
        Block::Image(b)
    }
}

impl From<GraphicControl> for Block {
    fn from(b: GraphicControl) -> Self {
        Block::GraphicControl(b)
    }
}

impl From<Application> for Block {
    fn from(b: Application) -> Self {
        Block::Application(b)
    }
}

impl From<Opaque> for Block {
    fn from(b: Opaque) -> Self {
        Block::Opaque(b)
    }
}

impl From<Trailer> for Block {
    fn from(b: Trailer) -> Self {
        Block::Trailer(b)
    }
}

impl From<Unknown> for Block {
    fn from(b: Unknown) -> Self {
        Block::Unknown(b)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn color_table_len_formula() {
        for size in 0..=7 {
            assert_eq!(color_table_len(size), 3 * 2usize.pow(u32::from(size) + 1));
        }
        assert_eq!(color_table_len(0), 6);
        assert_eq!(color_table_len(7), 768);
    }

    #[test]
    fn chain_terminated() {
        let chain = SubBlockChain::default();
        assert!(chain.is_empty());
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.bytes(), [0]);
        let chain = SubBlockChain::with_chunks(&[b"abc", b"de"]);
        assert!(!chain.is_empty());
        assert_eq!(chain.len(), 1 + (1 + 3) + (1 + 2));
        assert_eq!(chain.bytes().last(), Some(&0));
        let chunks: Vec<&[u8]> = chain.chunks().collect();
        assert_eq!(chunks, [&b"abc"[..], &b"de"[..]]);
    }

    #[test]
    fn disposal_method() {
        assert_eq!(DisposalMethod::from(0), DisposalMethod::NoAction);
        assert_eq!(DisposalMethod::from(1), DisposalMethod::Keep);
        assert_eq!(DisposalMethod::from(2), DisposalMethod::Background);
        assert_eq!(DisposalMethod::from(3), DisposalMethod::Previous);
        assert_eq!(DisposalMethod::from(5), DisposalMethod::Reserved(5));
        assert_eq!(u8::from(DisposalMethod::Background), 2);
    }

    #[test]
    fn loop_count() {
        let mut raw = vec![EXTENSION_INTRODUCER, APPLICATION, 11];
        raw.extend_from_slice(NETSCAPE);
        let data = SubBlockChain::with_chunks(&[&[1, 7, 0]]);
        raw.extend_from_slice(data.bytes());
        let b = Application::new(raw, data);
        assert!(b.is_looping());
        assert_eq!(b.loop_count(), Some(7));

        let mut raw = vec![EXTENSION_INTRODUCER, APPLICATION, 11];
        raw.extend_from_slice(b"EXAMPLE10.0");
        let data = SubBlockChain::with_chunks(&[&[1, 7, 0]]);
        raw.extend_from_slice(data.bytes());
        let b = Application::new(raw, data);
        assert!(!b.is_looping());
        assert_eq!(b.loop_count(), None);
    }

    #[test]
    fn screen_flags() {
        let mut raw = b"GIF89a".to_vec();
        raw.extend_from_slice(&[10, 0, 10, 0, 0x91, 2, 3]);
        let screen = LogicalScreen::new(raw);
        assert_eq!(screen.version(), b"89a");
        assert_eq!(screen.width(), 10);
        assert_eq!(screen.height(), 10);
        assert!(screen.has_color_table());
        assert_eq!(screen.color_table_len(), 12);
        assert_eq!(screen.background_color_idx(), 2);
        assert_eq!(screen.pixel_aspect_ratio(), 3);
    }
}
