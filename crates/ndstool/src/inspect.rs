use bytesize::ByteSize;
use comfy_table::{
    Cell, CellAlignment, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};
use eyre_pretty::{Result, bail};
use nitro::{
    fnt::{Fnt, NO_FILE},
    tree::{Entry, File, Folder},
};

use crate::rom::{self, Located};

fn print_file(file: &File, depth: usize, current: &str) {
    let id = file
        .file_id
        .map_or_else(|| "#?".to_owned(), |id| format!("#{id}"));

    println!("{:depth$}{} ({id}) ({current}/{})", "", file.name, file.name);
}

fn print_folder(folder: &Folder, depth: usize, current: &str) {
    let base = format!(
        "{current}{}{}",
        if current.is_empty() { "" } else { "/" },
        folder.name
    );

    match folder.directory_id {
        Some(id) if depth > 0 => println!("{:depth$}{}/ [0x{id:04X}]", "", folder.name),
        _ => println!("{:depth$}{}/", "", folder.name),
    }

    for file in &folder.files {
        print_file(file, depth + 2, &base);
    }

    for subfolder in &folder.folders {
        print_folder(subfolder, depth + 2, &base);
    }
}

pub fn print_tree(source: rom::Source, path: Option<String>) -> Result<()> {
    let Located { fnt, .. } = source.read()?;
    let root = fnt.tree()?;

    let Some(path) = path else {
        print_folder(&root, 0, "");
        return Ok(());
    };

    match root.get(&path) {
        Some(Entry::Folder(folder)) => print_folder(folder, 0, path.trim_end_matches('/')),
        Some(Entry::File(file)) => {
            let parent = path.rsplit_once('/').map_or("", |(parent, _)| parent);
            print_file(file, 0, parent);
        }
        None => bail!("no entry with such path in the file name table"),
    }

    Ok(())
}

fn header_table(located: &Located, fnt: &Fnt) -> Result<Table> {
    let mut info = Table::new();
    info.load_preset(comfy_table::presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let size = fnt.size()?;
    let mut cells = vec![Cell::new(format!(
        "{} @ 0x{:08X} ({})",
        Fnt::FORMAT_NAME,
        located.offset,
        ByteSize(size as u64).display()
    ))];

    if let Some(header) = &located.header {
        cells.push(Cell::new(format!(
            "{} [{}] (maker 0x{:04X})",
            header.game_title(),
            header.game_code(),
            u16::from_le_bytes(header.maker_code)
        )));
        cells.push(Cell::new(format!(
            "Declared Size: 0x{:08X}, FAT: 0x{:08X} ({})",
            header.fnt_size,
            header.fat_offset,
            ByteSize(header.fat_size as u64).display()
        )));
    }

    info.set_header(cells);
    Ok(info)
}

pub fn print_tables(source: rom::Source) -> Result<()> {
    let located = source.read()?;
    let fnt = &located.fnt;

    let mut tables = Table::new();
    tables
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Directory").set_alignment(CellAlignment::Center),
            Cell::new("Subtable Offset").set_alignment(CellAlignment::Center),
            Cell::new("First File").set_alignment(CellAlignment::Center),
            Cell::new("Parent").set_alignment(CellAlignment::Center),
            Cell::new("Files").set_alignment(CellAlignment::Center),
            Cell::new("Folders").set_alignment(CellAlignment::Center),
        ]);

    for (index, entry) in fnt.entries().iter().enumerate() {
        let first = if entry.first_file_id == NO_FILE {
            "-".to_owned()
        } else {
            entry.first_file_id.to_string()
        };

        let parent = if index == 0 {
            format!("{} (count)", entry.parent_id)
        } else {
            format!("0x{:04X}", entry.parent_id)
        };

        tables.add_row(vec![
            Cell::new(format!("0x{index:03X}")),
            Cell::new(format!("0x{:08X}", entry.subtable_offset)),
            Cell::new(first).set_alignment(CellAlignment::Right),
            Cell::new(parent),
            Cell::new(entry.files.len()).set_alignment(CellAlignment::Right),
            Cell::new(entry.folders.len()).set_alignment(CellAlignment::Right),
        ]);
    }

    println!("{}", header_table(&located, fnt)?);
    println!("{tables}");

    if fnt.len() != fnt.declared_directories() as usize {
        println!(
            "root record declares {} directories, only {} were read",
            fnt.declared_directories(),
            fnt.len()
        );
    }

    Ok(())
}
