//! Building the directory tables of a [`Fnt`] out of a folder tree.

use super::{DirectoryEntry, Fnt, FntError, MAX_DIRECTORIES, NO_FILE, RECORD_SIZE};
use crate::tree::{DIRECTORY_INDEX_MASK, DIRECTORY_TAG, Folder};

/// Smallest file id in the given folder or in any folder below it, or [`NO_FILE`] if there are
/// no files with an id.
pub fn first_file_id(folder: &Folder) -> u16 {
    let own = folder
        .files
        .iter()
        .filter_map(|file| file.file_id)
        .filter_map(|id| u16::try_from(id).ok())
        .min()
        .unwrap_or(NO_FILE);

    folder
        .folders
        .iter()
        .map(first_file_id)
        .fold(own, u16::min)
}

/// Assigns ids to every file below the given folder in pre-order: files of a folder come before
/// the files of its subfolders.
fn reassign_file_ids(folder: &mut Folder, next: &mut u32) -> Result<(), FntError> {
    for file in &mut folder.files {
        if *next > u16::MAX as u32 {
            return Err(FntError::TooManyFiles);
        }

        file.file_id = Some(*next);
        *next += 1;
    }

    for subfolder in &mut folder.folders {
        reassign_file_ids(subfolder, next)?;
    }

    Ok(())
}

struct TableBuilder {
    entries: Vec<DirectoryEntry>,
    filled: Vec<bool>,
    /// Offset of the next subtable.
    subtables_offset: u32,
}

impl TableBuilder {
    fn new(count: usize) -> Self {
        Self {
            entries: vec![DirectoryEntry::default(); count],
            filled: vec![false; count],
            subtables_offset: count as u32 * RECORD_SIZE,
        }
    }

    /// Fills the table of `folder`, which lives at `index`, and then the tables of its subfolders.
    fn fill(&mut self, folder: &Folder, index: usize, parent_id: u16) -> Result<(), FntError> {
        let count = self.entries.len();
        if index >= count {
            return Err(FntError::DirectoryOutOfBounds { index, count });
        }

        if std::mem::replace(&mut self.filled[index], true) {
            return Err(FntError::DirectoryRevisited { index });
        }

        let mut entry = DirectoryEntry {
            subtable_offset: self.subtables_offset,
            first_file_id: first_file_id(folder),
            parent_id,
            ..Default::default()
        };

        for file in &folder.files {
            let id = file
                .file_id
                .and_then(|id| u16::try_from(id).ok())
                .ok_or(FntError::TooManyFiles)?;

            entry.add_file(file.name.clone(), id);
        }

        let mut children = Vec::with_capacity(folder.folders.len());
        for subfolder in &folder.folders {
            let id = subfolder
                .directory_id
                .ok_or_else(|| FntError::MissingDirectoryId {
                    name: subfolder.name.clone(),
                })?;

            let child = (id & DIRECTORY_INDEX_MASK) as usize;
            let id = u16::try_from(id)
                .map_err(|_| FntError::DirectoryOutOfBounds { index: child, count })?;

            entry.add_folder(subfolder.name.clone(), id);
            children.push(child);
        }

        self.subtables_offset += entry.subtable_size()?;
        self.entries[index] = entry;

        let tag = DIRECTORY_TAG as u16 | index as u16;
        for (subfolder, child) in folder.folders.iter().zip(children) {
            self.fill(subfolder, child, tag)?;
        }

        Ok(())
    }
}

impl Fnt {
    /// Builds the tables describing the given tree.
    ///
    /// Files are given new ids in pre-order starting at `first_id`, and those ids are written back
    /// to the tree. Every folder other than the root must already have a directory id (see
    /// [`Folder::assign_directory_ids`]); the root always lives at index zero.
    pub fn from_tree(root: &mut Folder, first_id: u16) -> Result<Self, FntError> {
        let count = root.count_folders() + 1;
        if count > MAX_DIRECTORIES {
            return Err(FntError::TooManyDirectories { count });
        }

        reassign_file_ids(root, &mut (first_id as u32))?;

        // the parent id of the root record holds the directory count
        let mut builder = TableBuilder::new(count);
        builder.fill(root, 0, count as u16)?;

        tracing::debug!(
            directories = count,
            size = builder.subtables_offset,
            "built file name table"
        );

        Ok(Self {
            entries: builder.entries,
            declared: count as u16,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tree::File;

    /// ```text
    /// ROM
    /// ├── arm9.bin
    /// ├── data
    /// │   ├── a.bin
    /// │   ├── b.bin
    /// │   ├── empty
    /// │   └── sound
    /// │       └── bgm.sdat
    /// ├── nothing
    /// │   └── deeper
    /// └── zzz
    ///     └── last.bin
    /// ```
    fn sample() -> Folder {
        let mut sound = Folder::new("sound");
        sound.add_file(File::new("bgm.sdat"));

        let mut data = Folder::new("data");
        data.add_file(File::new("a.bin"));
        data.add_file(File::new("b.bin"));
        data.add_folder(Folder::new("empty"));
        data.add_folder(sound);

        let mut nothing = Folder::new("nothing");
        nothing.add_folder(Folder::new("deeper"));

        let mut zzz = Folder::new("zzz");
        zzz.add_file(File::new("last.bin"));

        let mut root = Folder::new("ROM");
        root.add_file(File::new("arm9.bin"));
        root.add_folder(data);
        root.add_folder(nothing);
        root.add_folder(zzz);
        root.assign_directory_ids();
        root
    }

    /// Directory indices in pre-order.
    fn preorder(folder: &Folder, out: &mut Vec<usize>) {
        for subfolder in &folder.folders {
            out.push(subfolder.directory_index().unwrap());
            preorder(subfolder, out);
        }
    }

    #[test]
    fn file_ids_are_preorder() {
        let mut root = sample();
        Fnt::from_tree(&mut root, 0x20).unwrap();

        let ids = root
            .walk_files()
            .into_iter()
            .map(|f| f.file_id.unwrap())
            .collect::<Vec<_>>();
        assert_eq!(ids, [0x20, 0x21, 0x22, 0x23, 0x24]);
        assert_eq!(root.folders[0].folders[1].files[0].file_id, Some(0x23));
    }

    #[test]
    fn first_file_ids() {
        let mut root = sample();
        let fnt = Fnt::from_tree(&mut root, 3).unwrap();
        let first = |index: usize| fnt.entries()[index].first_file_id;

        assert_eq!(first(0), 3); // ROM
        assert_eq!(first(1), 4); // data
        assert_eq!(first(2), NO_FILE); // data/empty
        assert_eq!(first(3), 6); // data/sound
        assert_eq!(first(4), NO_FILE); // nothing
        assert_eq!(first(5), NO_FILE); // nothing/deeper
        assert_eq!(first(6), 7); // zzz
    }

    #[test]
    fn first_file_id_follows_mutations() {
        let mut root = sample();
        Fnt::from_tree(&mut root, 0).unwrap();

        // move arm9.bin into the deepest folder and rebuild
        let file = root.files.remove(0);
        root.folders[1].folders[0].add_file(file);
        let fnt = Fnt::from_tree(&mut root, 0).unwrap();

        for (index, entry) in fnt.entries().iter().enumerate() {
            let expected = match index {
                0 | 1 => 0,
                2 => NO_FILE,
                3 => 2,
                4 | 5 => 3,
                6 => 4,
                _ => unreachable!(),
            };

            assert_eq!(entry.first_file_id, expected, "directory {index}");
        }

        assert_eq!(first_file_id(&root.folders[1]), 3);
    }

    #[test]
    fn parent_ids_are_tagged() {
        let mut root = sample();
        let fnt = Fnt::from_tree(&mut root, 0).unwrap();

        // format quirk: the root record stores the directory count instead of a parent
        assert_eq!(fnt.entries()[0].parent_id, 7);
        assert_eq!(fnt.declared_directories(), 7);

        let parents = [0, 1, 1, 0, 4, 0];
        for (entry, parent) in fnt.entries()[1..].iter().zip(parents) {
            assert_eq!(entry.parent_id & 0xF000, 0xF000);
            assert_eq!(entry.parent_id & 0x0FFF, parent);
        }
    }

    #[test]
    fn offsets_are_cumulative() {
        let mut root = sample();
        let fnt = Fnt::from_tree(&mut root, 0).unwrap();
        let entries = fnt.entries();

        assert_eq!(entries[0].subtable_offset, 7 * RECORD_SIZE);

        let mut order = vec![0];
        preorder(&root, &mut order);

        for pair in order.windows(2) {
            let (current, next) = (&entries[pair[0]], &entries[pair[1]]);
            assert_eq!(
                current.subtable_offset + current.subtable_size().unwrap(),
                next.subtable_offset
            );
        }

        let last = &entries[*order.last().unwrap()];
        assert_eq!(
            last.subtable_offset + last.subtable_size().unwrap(),
            fnt.size().unwrap()
        );
    }

    #[test]
    fn subtable_sizes() {
        let mut root = sample();
        let fnt = Fnt::from_tree(&mut root, 0).unwrap();

        // 1 + (1 + 8) + (3 + 4) + (3 + 7) + (3 + 3)
        assert_eq!(fnt.entries()[0].subtable_size().unwrap(), 33);
        // empty
        assert_eq!(fnt.entries()[2].subtable_size().unwrap(), 1);
    }

    #[test]
    fn directory_indices_follow_ids() {
        // ids don't need to be in pre-order
        let mut b = Folder::with_id("b", 0xF001);
        b.add_file(File::new("in_b"));

        let mut root = Folder::new("ROM");
        root.add_folder(Folder::with_id("a", 0xF002));
        root.add_folder(b);

        let fnt = Fnt::from_tree(&mut root, 0).unwrap();
        assert_eq!(fnt.entries()[1].files[0].name, "in_b");
        assert!(fnt.entries()[2].files.is_empty());
        assert_eq!(fnt.entries()[0].folders[0].id, 0xF002);

        // subtables are still laid out in traversal order
        assert!(fnt.entries()[2].subtable_offset < fnt.entries()[1].subtable_offset);
    }

    #[test]
    fn missing_directory_id() {
        let mut root = Folder::new("ROM");
        root.add_folder(Folder::new("anonymous"));

        assert!(matches!(
            Fnt::from_tree(&mut root, 0),
            Err(FntError::MissingDirectoryId { name }) if name == "anonymous"
        ));
    }

    #[test]
    fn directory_id_out_of_bounds() {
        let mut root = Folder::new("ROM");
        root.add_folder(Folder::with_id("far", 0xF009));

        assert!(matches!(
            Fnt::from_tree(&mut root, 0),
            Err(FntError::DirectoryOutOfBounds { index: 9, count: 2 })
        ));
    }

    #[test]
    fn duplicate_directory_ids() {
        let mut root = Folder::new("ROM");
        root.add_folder(Folder::with_id("a", 0xF001));
        root.add_folder(Folder::with_id("b", 0xF001));

        assert!(matches!(
            Fnt::from_tree(&mut root, 0),
            Err(FntError::DirectoryRevisited { index: 1 })
        ));
    }

    #[test]
    fn invalid_names() {
        let mut root = Folder::new("ROM");
        root.add_file(File::new("x".repeat(0x80)));
        assert!(matches!(
            Fnt::from_tree(&mut root, 0),
            Err(FntError::NameTooLong { len: 0x80, .. })
        ));

        // 0x3F two-byte characters plus one ascii byte fit exactly
        let mut root = Folder::new("ROM");
        root.add_file(File::new(format!("{}a", "セ".repeat(0x3F))));
        assert!(Fnt::from_tree(&mut root, 0).is_ok());

        let mut root = Folder::new("ROM");
        root.add_file(File::new(""));
        assert!(matches!(
            Fnt::from_tree(&mut root, 0),
            Err(FntError::EmptyName)
        ));

        let mut root = Folder::new("ROM");
        root.add_file(File::new("🦀.bin"));
        assert!(matches!(
            Fnt::from_tree(&mut root, 0),
            Err(FntError::Unencodable { .. })
        ));
    }

    #[test]
    fn file_id_overflow() {
        let mut root = Folder::new("ROM");
        root.add_file(File::new("a"));
        root.add_file(File::new("b"));

        assert!(Fnt::from_tree(&mut root.clone(), 0xFFFE).is_ok());
        assert!(matches!(
            Fnt::from_tree(&mut root, 0xFFFF),
            Err(FntError::TooManyFiles)
        ));
    }
}
