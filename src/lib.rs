// lib.rs      gifstruct crate.
//
// Copyright (c) 2026  Douglas Lau
//

//! Take apart GIF images into editable structure records, and put them back
//! together with externally re-encoded pixel bodies.
//!
//! Decoding walks a GIF89a byte stream and builds one [Record] per block,
//! each carrying its decoded fields alongside the verbatim `raw` bytes.
//! Compressed pixel bodies are opaque; they travel through a side channel of
//! numbered payloads instead of the [RecordStore], so they can be replaced
//! (for example after recompression) before the [Reconstructor] emits a new
//! stream.
//!
//! [Record]: struct.Record.html
//! [RecordStore]: struct.RecordStore.html
//! [Reconstructor]: struct.Reconstructor.html
#[macro_use]
extern crate log;

pub mod bitfield;
pub mod block;
mod decode;
mod encode;
mod error;
mod store;

pub use crate::decode::{Blocks, Decoder};
pub use crate::encode::{BodyDir, BodySource, Reconstructor};
pub use crate::error::{Error, Result};
pub use crate::store::{Record, RecordStore, GLOBAL_SECTION};
