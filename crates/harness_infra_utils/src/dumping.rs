use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

/// Serializes `data` as pretty-printed JSON into `file_path`, creating parent directories as
/// needed. The file ends with a newline.
pub fn serialize_to_file<T: Serialize>(data: &T, file_path: &Path) -> std::io::Result<()> {
    if let Some(parent) = file_path.parent() {
        create_dir_all(parent)?;
    }
    let file = File::create(file_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, data)?;
    writer.write_all(b"\n")?;
    writer.flush()
}
