// main.rs      gifstruct command
//
// Copyright (c) 2026  Douglas Lau
//
#![forbid(unsafe_code)]

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use gifstruct::block::Block;
use gifstruct::{BodyDir, Decoder, Reconstructor, RecordStore};
use std::error::Error;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Crate version
const VERSION: &'static str = std::env!("CARGO_PKG_VERSION");

/// Main entry point
fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder().format_timestamp(None).init();
    let res = match create_app().get_matches().subcommand() {
        ("read", Some(matches)) => read(matches),
        ("write", Some(matches)) => write(matches),
        _ => panic!(),
    };
    if let Err(e) = res {
        let mut err = StandardStream::stderr(ColorChoice::Auto);
        let mut red = ColorSpec::new();
        red.set_fg(Some(Color::Red)).set_intense(true);
        err.set_color(&red)?;
        writeln!(err, "error: {}", e)?;
        err.reset()?;
        std::process::exit(1);
    }
    Ok(())
}

/// Create clap App
fn create_app() -> App<'static, 'static> {
    App::new("gifstruct")
        .version(VERSION)
        .setting(AppSettings::GlobalVersion)
        .about("GIF structure utility")
        .setting(AppSettings::ArgRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("read")
                .about("Read a GIF into structure records on stdout")
                .arg(
                    Arg::with_name("file")
                        .required(true)
                        .help("input file, or - for stdin"),
                )
                .arg(
                    Arg::with_name("body")
                        .long("body")
                        .help("emit only the first image body"),
                ),
        )
        .subcommand(
            SubCommand::with_name("write")
                .about("Write a GIF from structure records and body files")
                .arg(
                    Arg::with_name("dir")
                        .required(true)
                        .help("directory with structure.json and body files"),
                ),
        )
}

/// Handle read subcommand
fn read(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let path = matches.value_of("file").unwrap();
    let body_only = matches.is_present("body");
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if path == "-" {
        let stdin = io::stdin();
        read_gif(stdin.lock(), body_only, &mut out)
    } else {
        read_gif(File::open(path)?, body_only, &mut out)
    }
}

/// Read a GIF into structure records, or its first image body
fn read_gif<R: Read, W: Write>(
    reader: R,
    body_only: bool,
    out: &mut W,
) -> Result<(), Box<dyn Error>> {
    if body_only {
        for block in Decoder::new(reader).into_blocks() {
            if let Block::Image(image) = block? {
                if let Some(body) = image.body() {
                    out.write_all(&body.bytes())?;
                }
                // stop scanning further blocks
                return Ok(());
            }
        }
        Ok(())
    } else {
        let store = RecordStore::from_gif(reader)?;
        store.to_writer(&mut *out)?;
        Ok(())
    }
}

/// Handle write subcommand
fn write(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let dir = Path::new(matches.value_of("dir").unwrap());
    let file = File::open(dir.join("structure.json"))?;
    let store = RecordStore::from_reader(file)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    Reconstructor::new(&store).write_to(&mut out, &BodyDir::new(dir))?;
    Ok(())
}
