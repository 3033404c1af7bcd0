// error.rs
//
// Copyright (c) 2026  Douglas Lau
//
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Errors encountered while decoding or reconstructing
#[derive(Debug)]
pub enum Error {
    /// A wrapped I/O error.
    Io(io::Error),
    /// Record store (de)serialization failed.
    Json(serde_json::Error),
    /// Stream ended inside a region of declared size.
    UnexpectedEndOfStream {
        /// Offset of the byte which could not be read
        offset: u64,
    },
    /// Introducer byte outside the block dispatch table.
    InvalidBlockCode {
        /// The offending byte
        code: u8,
        /// Offset where it was read
        offset: u64,
    },
    /// No body payload for an image expected during reconstruction.
    MissingBodyFile(PathBuf),
    /// A record selected for re-emission lacks a required field.
    MissingField {
        /// Store section
        section: String,
        /// Field key
        key: &'static str,
    },
}

/// Gifstruct result type
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(fmt),
            Error::Json(err) => err.fmt(fmt),
            _ => fmt::Debug::fmt(self, fmt),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
