//! In-memory representation of a Nitro filesystem hierarchy.

/// Mask selecting the table index out of a directory id.
pub const DIRECTORY_INDEX_MASK: u32 = 0x0FFF;
/// Tag carried by the ids of non-root directories.
pub const DIRECTORY_TAG: u32 = 0xF000;

/// A file in the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    pub name: String,
    /// Id of the file, i.e. its index into the allocation table.
    pub file_id: Option<u32>,
}

impl File {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_id: None,
        }
    }

    pub fn with_id(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            file_id: Some(id),
        }
    }
}

/// A folder in the tree. Files and subfolders are kept in insertion order, which is also the
/// order they are serialized in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Folder {
    pub name: String,
    /// Id of the directory. For non-root folders this is usually `0xF000 | index`.
    pub directory_id: Option<u32>,
    pub folders: Vec<Folder>,
    pub files: Vec<File>,
}

/// A reference to an entry of a [`Folder`].
#[derive(Debug, Clone, Copy)]
pub enum Entry<'a> {
    File(&'a File),
    Folder(&'a Folder),
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_id(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            directory_id: Some(id),
            ..Default::default()
        }
    }

    pub fn add_file(&mut self, file: File) {
        self.files.push(file);
    }

    pub fn add_folder(&mut self, folder: Folder) {
        self.folders.push(folder);
    }

    /// Index of this folder in a directory table, if it has an id. Only meaningful for non-root
    /// folders: the root always lives at index zero.
    pub fn directory_index(&self) -> Option<usize> {
        self.directory_id.map(|id| (id & DIRECTORY_INDEX_MASK) as usize)
    }

    /// Number of folders below this one, not counting itself.
    pub fn count_folders(&self) -> usize {
        self.folders
            .iter()
            .map(|folder| 1 + folder.count_folders())
            .sum()
    }

    /// Number of files in this folder and every folder below it.
    pub fn count_files(&self) -> usize {
        self.files.len() + self.folders.iter().map(Folder::count_files).sum::<usize>()
    }

    /// Gives every folder an id in pre-order: the root gets `0xF000`, the folders below it get
    /// `0xF001`, `0xF002` and so on.
    pub fn assign_directory_ids(&mut self) {
        fn recur(folder: &mut Folder, next: &mut u32) {
            for subfolder in &mut folder.folders {
                subfolder.directory_id = Some(DIRECTORY_TAG | *next);
                *next += 1;
                recur(subfolder, next);
            }
        }

        self.directory_id = Some(DIRECTORY_TAG);
        let mut next = 1;
        recur(self, &mut next);
    }

    /// Finds the entry at the given `/`-separated path, relative to this folder.
    pub fn get(&self, path: impl AsRef<str>) -> Option<Entry<'_>> {
        let mut current = self;
        let mut segments = path
            .as_ref()
            .split('/')
            .filter(|s| !s.is_empty())
            .peekable();

        while let Some(segment) = segments.next() {
            let last = segments.peek().is_none();
            if last && let Some(file) = current.files.iter().find(|f| f.name == segment) {
                return Some(Entry::File(file));
            }

            current = current.folders.iter().find(|f| f.name == segment)?;
        }

        Some(Entry::Folder(current))
    }

    /// Every file in this folder and below it, in pre-order.
    pub fn walk_files(&self) -> Vec<&File> {
        fn recur<'a>(folder: &'a Folder, out: &mut Vec<&'a File>) {
            out.extend(&folder.files);
            for subfolder in &folder.folders {
                recur(subfolder, out);
            }
        }

        let mut out = Vec::new();
        recur(self, &mut out);
        out
    }
}
