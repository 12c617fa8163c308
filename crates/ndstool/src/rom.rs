use eyre_pretty::{Context, Result};
use nitro::{
    binrw::{BinRead, Endian, io::BufReader},
    fnt::{Fnt, FntOptions},
};
use std::{
    fs::File,
    io::{Seek, SeekFrom},
    path::PathBuf,
};

/// The part of a .nds header describing where the filesystem tables are.
#[derive(Debug, BinRead)]
#[br(little)]
pub struct Header {
    pub game_title: [u8; 12],
    pub game_code: [u8; 4],
    pub maker_code: [u8; 2],
    #[br(pad_before = 0x2E)]
    pub fnt_offset: u32,
    pub fnt_size: u32,
    pub fat_offset: u32,
    pub fat_size: u32,
}

impl Header {
    pub fn game_title(&self) -> String {
        let end = self
            .game_title
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.game_title.len());

        String::from_utf8_lossy(&self.game_title[..end]).into_owned()
    }

    pub fn game_code(&self) -> String {
        String::from_utf8_lossy(&self.game_code).into_owned()
    }
}

fn parse_offset(value: &str) -> std::result::Result<u64, String> {
    let value = value.replace('_', "");
    let parsed = if let Some(hex) = value.strip_prefix("0x") {
        u64::from_str_radix(hex, 16)
    } else {
        value.parse()
    };

    parsed.map_err(|e| e.to_string())
}

/// Where to find a FNT.
#[derive(Debug, clap::Args)]
pub struct Source {
    /// Path to the input file
    #[arg(short, long)]
    pub input: PathBuf,
    /// Offset of the FNT in the input file. If missing, the input is treated as a .nds ROM and
    /// the offset is taken from its header
    #[arg(long, value_parser = parse_offset)]
    pub offset: Option<u64>,
    /// Whether integers in the FNT are big-endian
    #[arg(long, default_value_t = false)]
    pub big_endian: bool,
}

/// A FNT read from a [`Source`].
pub struct Located {
    pub fnt: Fnt,
    pub offset: u64,
    /// ROM header, if the offset was taken from it.
    pub header: Option<Header>,
    pub reader: BufReader<File>,
}

impl Source {
    pub fn options(&self) -> FntOptions {
        FntOptions {
            endian: if self.big_endian {
                Endian::Big
            } else {
                Endian::Little
            },
        }
    }

    pub fn read(&self) -> Result<Located> {
        let file = File::open(&self.input).context("opening input file")?;
        let mut reader = BufReader::new(file);

        let (offset, header) = match self.offset {
            Some(offset) => (offset, None),
            None => {
                let header = Header::read(&mut reader).context("parsing .nds header")?;
                (header.fnt_offset as u64, Some(header))
            }
        };

        tracing::debug!(offset, "reading file name table");
        reader
            .seek(SeekFrom::Start(offset))
            .context("seeking to file name table")?;

        let fnt = Fnt::read(&mut reader, self.options()).context("parsing file name table")?;
        if fnt.len() != fnt.declared_directories() as usize {
            tracing::warn!(
                declared = fnt.declared_directories(),
                found = fnt.len(),
                "file name table declares more directories than it holds"
            );
        }

        Ok(Located {
            fnt,
            offset,
            header,
            reader,
        })
    }
}
