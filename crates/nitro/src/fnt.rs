//! The File Name Table (FNT) of a Nitro ROM maps directory and file ids to names, describing the
//! hierarchy of the ROM filesystem.
//!
//! The table is made of two regions: a main table with one 8 byte [`Record`] per directory,
//! followed by one subtable per directory listing the names of its files and subfolders. Every
//! offset in the main table is relative to the start of the FNT.

mod build;

pub use build::first_file_id;

use crate::{
    sjis,
    tree::{DIRECTORY_INDEX_MASK, File, Folder},
};
use binrw::{BinRead, BinResult, BinWrite, Endian};
use easyerr::{Error, ResultExt};
use std::{
    borrow::Cow,
    io::{Read, Seek, SeekFrom, Write},
};

/// Size of a record in the main table.
pub const RECORD_SIZE: u32 = 0x08;
/// First file id of directories without any file below them.
pub const NO_FILE: u16 = 0xFFFF;
/// Maximum length of an encoded name.
pub const MAX_NAME_LEN: usize = 0x7F;
/// Maximum number of directories in a table, since indices are 12 bits wide.
pub const MAX_DIRECTORIES: usize = 0x1000;

const END_OF_SUBTABLE: u8 = 0x00;
const FOLDER_FLAG: u8 = 0x80;

/// A record of the main table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, BinRead, BinWrite)]
pub struct Record {
    /// Offset of the subtable of this directory.
    pub subtable_offset: u32,
    /// Id of the first file in this directory or in any directory below it.
    pub first_file_id: u16,
    /// Tagged index of the parent directory. In the root record, this is the directory count
    /// instead.
    pub parent_id: u16,
}

/// A name in a subtable, along with the id of the file or directory it names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameEntry {
    pub name: String,
    pub id: u16,
}

/// The table of a single directory: its main table record and the contents of its subtable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub subtable_offset: u32,
    pub first_file_id: u16,
    pub parent_id: u16,
    /// Files of this directory, in the order they appear in the subtable.
    pub files: Vec<NameEntry>,
    /// Subfolders of this directory, in the order they appear in the subtable.
    pub folders: Vec<NameEntry>,
}

#[derive(Debug, Error)]
pub enum FntError {
    #[error(transparent)]
    ReadMainTable { source: binrw::Error },
    #[error("failed to read the subtable of directory {directory}")]
    ReadSubtable {
        directory: usize,
        source: binrw::Error,
    },
    #[error(transparent)]
    Write { source: binrw::Error },
    #[error("directory index {index} is out of bounds (table has {count} directories)")]
    DirectoryOutOfBounds { index: usize, count: usize },
    #[error("directory {index} is reachable through more than one path")]
    DirectoryRevisited { index: usize },
    #[error("folder {name:?} has no directory id")]
    MissingDirectoryId { name: String },
    #[error("no file with id {id} is available")]
    MissingFile { id: u16 },
    #[error("tree has {count} directories, but at most 4096 are supported")]
    TooManyDirectories { count: usize },
    #[error("file ids do not fit in 16 bits")]
    TooManyFiles,
    #[error("names must not be empty")]
    EmptyName,
    #[error("name {name:?} is {len} bytes long, but at most 127 are supported")]
    NameTooLong { name: String, len: usize },
    #[error("name {name:?} has no Shift-JIS representation")]
    Unencodable { name: String },
    #[error("{operation} is not supported for file name tables")]
    Unsupported { operation: &'static str },
}

/// Options for reading and writing a [`Fnt`].
#[derive(Debug, Clone, Copy)]
pub struct FntOptions {
    /// Byte order of integers. Names are always Shift-JIS regardless of this.
    pub endian: Endian,
}

impl Default for FntOptions {
    fn default() -> Self {
        Self {
            endian: Endian::Little,
        }
    }
}

/// Encodes a name, checking it fits in a subtable entry.
fn encode_name(name: &str) -> Result<Cow<'_, [u8]>, FntError> {
    if name.is_empty() {
        return Err(FntError::EmptyName);
    }

    let bytes = sjis::encode(name).ok_or_else(|| FntError::Unencodable {
        name: name.to_owned(),
    })?;

    if bytes.len() > MAX_NAME_LEN {
        return Err(FntError::NameTooLong {
            name: name.to_owned(),
            len: bytes.len(),
        });
    }

    Ok(bytes)
}

fn read_name<R: Read>(reader: &mut R, len: usize) -> BinResult<String> {
    let mut bytes = vec![0; len];
    reader.read_exact(&mut bytes)?;

    let (name, had_errors) = sjis::decode(&bytes);
    if had_errors {
        tracing::debug!(?bytes, "name is not valid Shift-JIS");
    }

    Ok(name.into_owned())
}

fn seek<S: Seek>(stream: &mut S, position: u64) -> BinResult<()> {
    stream.seek(SeekFrom::Start(position))?;
    Ok(())
}

impl DirectoryEntry {
    fn from_record(record: Record) -> Self {
        Self {
            subtable_offset: record.subtable_offset,
            first_file_id: record.first_file_id,
            parent_id: record.parent_id,
            files: Vec::new(),
            folders: Vec::new(),
        }
    }

    /// The main table record of this directory.
    pub fn record(&self) -> Record {
        Record {
            subtable_offset: self.subtable_offset,
            first_file_id: self.first_file_id,
            parent_id: self.parent_id,
        }
    }

    pub fn add_file(&mut self, name: impl Into<String>, id: u16) {
        self.files.push(NameEntry {
            name: name.into(),
            id,
        });
    }

    pub fn add_folder(&mut self, name: impl Into<String>, id: u16) {
        self.folders.push(NameEntry {
            name: name.into(),
            id,
        });
    }

    /// Size of the subtable of this directory, in bytes.
    pub fn subtable_size(&self) -> Result<u32, FntError> {
        let mut size = 1;
        for info in &self.files {
            size += 1 + encode_name(&info.name)?.len() as u32;
        }

        for info in &self.folders {
            size += 3 + encode_name(&info.name)?.len() as u32;
        }

        Ok(size)
    }

    /// Reads the subtable at the current position. File ids are numbered sequentially from the
    /// record's first file id.
    fn read_subtable<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        record: Record,
    ) -> BinResult<Self> {
        let mut entry = Self::from_record(record);
        let mut file_id = record.first_file_id;

        loop {
            let node = u8::read_options(reader, endian, ())?;
            match node {
                END_OF_SUBTABLE => break,
                0x01..=0x7F => {
                    let name = read_name(reader, node as usize)?;
                    entry.add_file(name, file_id);
                    file_id = file_id.wrapping_add(1);
                }
                _ => {
                    let name = read_name(reader, (node & !FOLDER_FLAG) as usize)?;
                    let id = u16::read_options(reader, endian, ())?;
                    entry.add_folder(name, id);
                }
            }
        }

        Ok(entry)
    }

    fn write_subtable<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
    ) -> Result<(), FntError> {
        let node = |writer: &mut W, ty: u8, name: &[u8]| -> BinResult<()> {
            ty.write_options(writer, endian, ())?;
            writer.write_all(name)?;
            Ok(())
        };

        for info in &self.files {
            let name = encode_name(&info.name)?;
            node(&mut *writer, name.len() as u8, &name).context(FntCtx::Write)?;
        }

        for info in &self.folders {
            let name = encode_name(&info.name)?;
            node(&mut *writer, FOLDER_FLAG | name.len() as u8, &name).context(FntCtx::Write)?;
            info.id
                .write_options(writer, endian, ())
                .context(FntCtx::Write)?;
        }

        END_OF_SUBTABLE
            .write_options(writer, endian, ())
            .context(FntCtx::Write)?;

        Ok(())
    }
}

/// A File Name Table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fnt {
    /// Directory tables, indexed by directory index. The root is at index zero.
    entries: Vec<DirectoryEntry>,
    /// Directory count declared by the root record.
    declared: u16,
}

impl Fnt {
    pub const FORMAT_NAME: &'static str = "Nitro.FNT";

    /// Reads a FNT starting at the current position of the reader.
    ///
    /// Some ROMs declare more directories than the main table can hold: records that would
    /// overlap the subtables region are not read, and the table ends up shorter than declared
    /// (see [`Fnt::declared_directories`]).
    pub fn read<R: Read + Seek>(reader: &mut R, options: FntOptions) -> Result<Self, FntError> {
        let endian = options.endian;
        let fnt_offset = reader
            .stream_position()
            .map_err(binrw::Error::Io)
            .context(FntCtx::ReadMainTable)?;

        // the root record holds the offset of the subtables region and the directory count
        let root = Record::read_options(reader, endian, ()).context(FntCtx::ReadMainTable)?;
        let subtables_start = fnt_offset + root.subtable_offset as u64;
        let declared = root.parent_id;

        let mut entries = Vec::with_capacity(declared as usize);
        for directory in 0..declared as usize {
            let position = fnt_offset + directory as u64 * RECORD_SIZE as u64;
            if position > subtables_start {
                tracing::warn!(
                    declared,
                    found = directory,
                    "directory count overruns the subtables region, truncating"
                );
                break;
            }

            seek(reader, position).context(FntCtx::ReadMainTable)?;
            let record =
                Record::read_options(reader, endian, ()).context(FntCtx::ReadMainTable)?;

            let entry = seek(reader, fnt_offset + record.subtable_offset as u64)
                .and_then(|()| DirectoryEntry::read_subtable(reader, endian, record))
                .map_err(|source| FntError::ReadSubtable { directory, source })?;

            tracing::trace!(
                directory,
                files = entry.files.len(),
                folders = entry.folders.len(),
                "read directory table"
            );

            entries.push(entry);
        }

        Ok(Self { entries, declared })
    }

    /// Writes this FNT: the main table, followed by every subtable in directory order.
    pub fn write<W: Write + Seek>(
        &self,
        writer: &mut W,
        options: FntOptions,
    ) -> Result<(), FntError> {
        let endian = options.endian;
        for entry in &self.entries {
            entry
                .record()
                .write_options(writer, endian, ())
                .context(FntCtx::Write)?;
        }

        for entry in &self.entries {
            entry.write_subtable(writer, endian)?;
        }

        Ok(())
    }

    /// Directory tables, indexed by directory index.
    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    /// Number of directories in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of directories declared by the root record. Larger than [`Fnt::len`] if the
    /// declared count was inconsistent.
    pub fn declared_directories(&self) -> u16 {
        self.declared
    }

    /// Size of this FNT once written, in bytes.
    pub fn size(&self) -> Result<u32, FntError> {
        let mut size = self.entries.len() as u32 * RECORD_SIZE;
        for entry in &self.entries {
            size += entry.subtable_size()?;
        }

        Ok(size)
    }

    /// Assembles the folder tree described by this table. `files` are the file nodes of the
    /// filesystem, indexed by file id: each one is moved into its folder and renamed.
    pub fn create_tree(&self, files: Vec<File>) -> Result<Folder, FntError> {
        let mut files = files.into_iter().map(Some).collect::<Vec<_>>();
        let mut visited = vec![false; self.entries.len()];

        let mut root = Folder::with_id("ROM", self.entries.len() as u32);
        self.fill_folder(&mut root, 0, &mut files, &mut visited)?;

        Ok(root)
    }

    /// Assembles the folder tree described by this table, with files carrying nothing but their
    /// names and ids.
    pub fn tree(&self) -> Result<Folder, FntError> {
        let count = self
            .entries
            .iter()
            .flat_map(|entry| &entry.files)
            .map(|info| info.id as usize + 1)
            .max()
            .unwrap_or_default();

        self.create_tree(vec![File::default(); count])
    }

    fn fill_folder(
        &self,
        folder: &mut Folder,
        index: usize,
        files: &mut [Option<File>],
        visited: &mut [bool],
    ) -> Result<(), FntError> {
        let entry = self
            .entries
            .get(index)
            .ok_or(FntError::DirectoryOutOfBounds {
                index,
                count: self.entries.len(),
            })?;

        if std::mem::replace(&mut visited[index], true) {
            return Err(FntError::DirectoryRevisited { index });
        }

        for info in &entry.files {
            let mut file = files
                .get_mut(info.id as usize)
                .and_then(Option::take)
                .ok_or(FntError::MissingFile { id: info.id })?;

            file.name.clone_from(&info.name);
            file.file_id = Some(info.id as u32);
            folder.add_file(file);
        }

        for info in &entry.folders {
            let mut subfolder = Folder::with_id(info.name.clone(), info.id as u32);
            let index = (info.id as u32 & DIRECTORY_INDEX_MASK) as usize;
            self.fill_folder(&mut subfolder, index, files, visited)?;
            folder.add_folder(subfolder);
        }

        Ok(())
    }

    /// Exporting a FNT to another representation is not supported.
    pub fn export<W: Write>(&self, _writer: W) -> Result<(), FntError> {
        Err(FntError::Unsupported {
            operation: "export",
        })
    }

    /// Importing a FNT from another representation is not supported.
    pub fn import<R: Read>(_reader: R) -> Result<Self, FntError> {
        Err(FntError::Unsupported {
            operation: "import",
        })
    }
}
