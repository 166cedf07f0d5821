use std::path::{Path, PathBuf};

/// Path of table file `number` inside the database directory.
///
/// Table files are named `<number>.sst`, zero-padded to six digits so a
/// directory listing sorts in creation order.
pub fn table_file_name(dbname: &Path, number: u64) -> PathBuf {
    dbname.join(format!("{number:06}.sst"))
}

/// Path of log file `number` inside the database directory.
pub fn log_file_name(dbname: &Path, number: u64) -> PathBuf {
    dbname.join(format!("{number:06}.log"))
}
