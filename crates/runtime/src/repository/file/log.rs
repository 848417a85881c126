//! Append-only log file repository.
//!
//! This module provides a generic `FileRepository<T>` that can store any
//! serializable type in an append-only log format. The event log builds on
//! it to persist [`EventRecord`](crate::repository::EventRecord)s.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{Serialize, de::DeserializeOwned};

use crate::repository::{RepositoryError, Result};

const WRITE_BUFFER: usize = 64 * 1024;

/// Generic file-based repository for append-only logs.
///
/// Stores items of type `T` in a file using the format:
/// ```text
/// [u32 length][bincode serialized T]
/// [u32 length][bincode serialized T]
/// ...
/// ```
///
/// A record cut short by a crash mid-append is dropped when the file is
/// reopened.
pub struct FileRepository<T> {
    /// File name without directory, used in log lines
    name: String,
    path: PathBuf,
    writer: BufWriter<File>,
    /// Byte offset of the next write
    current_offset: u64,
    _phantom: PhantomData<T>,
}

impl<T> FileRepository<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Open or create a file repository.
    ///
    /// Creates the directory and file if they don't exist, or opens the
    /// existing file for appending. A torn final record is truncated away.
    pub fn open_or_create(base_dir: impl AsRef<Path>, filename: impl AsRef<str>) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        std::fs::create_dir_all(base_dir)?;

        let filename = filename.as_ref();
        let path = base_dir.join(filename);

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;
        let file_size = file.metadata()?.len();
        let current_offset = complete_prefix(&file, file_size)?;
        if current_offset < file_size {
            tracing::warn!(
                "Truncating {} torn bytes at the end of {}",
                file_size - current_offset,
                path.display()
            );
            file.set_len(current_offset)?;
        }
        let writer = BufWriter::with_capacity(WRITE_BUFFER, file);

        tracing::debug!(
            "Opened/created log {} at offset {}",
            path.display(),
            current_offset
        );

        Ok(Self {
            name: filename.to_string(),
            path,
            writer,
            current_offset,
            _phantom: PhantomData,
        })
    }

    /// Append an item to the log.
    ///
    /// Returns the byte offset where the item was written. Data stays in the
    /// write buffer until [`flush`](Self::flush).
    pub fn append(&mut self, item: &T) -> Result<u64> {
        let offset = self.current_offset;

        let bytes =
            bincode::serialize(item).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
        let len = bytes.len() as u32;

        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(&bytes)?;

        self.current_offset += 4 + bytes.len() as u64;

        Ok(offset)
    }

    /// Reads every item from `byte_offset` to the end of the file, each
    /// paired with the offset it starts at. A record cut short while the
    /// file is open is reported as [`RepositoryError::CorruptedData`].
    pub fn read_entries_from(&self, byte_offset: u64) -> Result<Vec<(u64, T)>> {
        let file = File::open(&self.path)?;
        let file_size = file.metadata()?.len();

        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(byte_offset))?;

        let mut entries = Vec::new();
        let mut offset = byte_offset;
        while offset < file_size {
            let (item, next) = read_record(&mut reader, offset, file_size)?;
            entries.push((offset, item));
            offset = next;
        }
        Ok(entries)
    }

    /// Reads every item from the start of the file.
    pub fn read_all(&self) -> Result<Vec<T>> {
        Ok(self
            .read_entries_from(0)?
            .into_iter()
            .map(|(_, item)| item)
            .collect())
    }

    /// Drops every record before `byte_offset`, which must be a record
    /// boundary. Offsets of the kept records shift down by `byte_offset`.
    ///
    /// The kept tail is copied to a temp file that replaces the log.
    pub fn retain_from(&mut self, byte_offset: u64) -> Result<()> {
        self.writer.flush()?;
        let byte_offset = byte_offset.min(self.current_offset);
        if byte_offset == 0 {
            return Ok(());
        }

        let temp_path = self.path.with_extension("compact");
        {
            let mut source = File::open(&self.path)?;
            source.seek(SeekFrom::Start(byte_offset))?;
            let mut target = File::create(&temp_path)?;
            io::copy(&mut source, &mut target)?;
            target.sync_all()?;
        }
        std::fs::rename(&temp_path, &self.path)?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        self.writer = BufWriter::with_capacity(WRITE_BUFFER, file);
        self.current_offset -= byte_offset;

        tracing::debug!(
            "Compacted {}: dropped {} bytes, {} kept",
            self.name,
            byte_offset,
            self.current_offset
        );
        Ok(())
    }

    /// Flush buffered writes to disk.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Current size of the log in bytes, including buffered writes.
    pub fn size(&self) -> u64 {
        self.current_offset
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_record<T: DeserializeOwned>(
    reader: &mut impl Read,
    offset: u64,
    file_size: u64,
) -> Result<(T, u64)> {
    let mut len_bytes = [0u8; 4];
    read_record_part(reader, &mut len_bytes, offset)?;
    let len = u32::from_le_bytes(len_bytes) as usize;
    if offset + 4 + len as u64 > file_size {
        return Err(truncated(offset));
    }

    let mut data = vec![0u8; len];
    read_record_part(reader, &mut data, offset)?;

    let item =
        bincode::deserialize(&data).map_err(|e| RepositoryError::Serialization(e.to_string()))?;
    Ok((item, offset + 4 + len as u64))
}

/// Length of the longest run of complete `[len][data]` records at the
/// start of `file`.
fn complete_prefix(file: &File, file_size: u64) -> Result<u64> {
    let mut reader = BufReader::new(file);
    reader.seek(SeekFrom::Start(0))?;

    let mut offset = 0;
    while file_size - offset >= 4 {
        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let len = u64::from(u32::from_le_bytes(len_bytes));
        if offset + 4 + len > file_size {
            break;
        }
        reader.seek_relative(len as i64)?;
        offset += 4 + len;
    }
    Ok(offset)
}

fn read_record_part(reader: &mut impl Read, buf: &mut [u8], offset: u64) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == ErrorKind::UnexpectedEof {
            truncated(offset)
        } else {
            RepositoryError::Io(e)
        }
    })
}

fn truncated(offset: u64) -> RepositoryError {
    RepositoryError::CorruptedData(format!("truncated record at offset {offset}"))
}

impl<T> Drop for FileRepository<T> {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            tracing::warn!("Failed to flush log '{}' on drop: {}", self.name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: u64,
        subject: String,
    }

    fn entry(id: u64) -> Entry {
        Entry {
            id,
            subject: format!("game.test_{id}"),
        }
    }

    #[test]
    fn offsets_chain_between_records() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = FileRepository::<Entry>::open_or_create(temp_dir.path(), "t.log").unwrap();

        let first = repo.append(&entry(1)).unwrap();
        let second = repo.append(&entry(2)).unwrap();
        repo.flush().unwrap();

        let entries = repo.read_entries_from(first).unwrap();
        assert_eq!(entries, vec![(first, entry(1)), (second, entry(2))]);
        assert_eq!(repo.read_entries_from(second).unwrap(), vec![(second, entry(2))]);
        assert!(repo.read_entries_from(repo.size()).unwrap().is_empty());
    }

    #[test]
    fn reopening_appends_after_existing_records() {
        let temp_dir = TempDir::new().unwrap();
        {
            let mut repo =
                FileRepository::<Entry>::open_or_create(temp_dir.path(), "t.log").unwrap();
            repo.append(&entry(1)).unwrap();
        }

        let mut repo = FileRepository::<Entry>::open_or_create(temp_dir.path(), "t.log").unwrap();
        assert!(repo.size() > 0);
        repo.append(&entry(2)).unwrap();
        repo.flush().unwrap();

        assert_eq!(repo.read_all().unwrap(), vec![entry(1), entry(2)]);
    }

    #[test]
    fn truncated_tail_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = FileRepository::<Entry>::open_or_create(temp_dir.path(), "t.log").unwrap();
        repo.append(&entry(1)).unwrap();
        repo.flush().unwrap();

        let mut file = OpenOptions::new().append(true).open(repo.path()).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(b"short").unwrap();

        let err = repo.read_all().unwrap_err();
        assert!(matches!(err, RepositoryError::CorruptedData(_)));
    }

    #[test]
    fn reopening_truncates_torn_tail() {
        let temp_dir = TempDir::new().unwrap();
        let intact = {
            let mut repo =
                FileRepository::<Entry>::open_or_create(temp_dir.path(), "t.log").unwrap();
            repo.append(&entry(1)).unwrap();
            repo.flush().unwrap();
            repo.size()
        };
        let path = temp_dir.path().join("t.log");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&100u32.to_le_bytes()).unwrap();
        file.write_all(b"partial").unwrap();
        drop(file);

        let mut repo = FileRepository::<Entry>::open_or_create(temp_dir.path(), "t.log").unwrap();
        assert_eq!(repo.size(), intact);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), intact);

        repo.append(&entry(2)).unwrap();
        repo.flush().unwrap();
        assert_eq!(repo.read_all().unwrap(), vec![entry(1), entry(2)]);
    }

    #[test]
    fn reopening_drops_a_lone_length_fragment() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("t.log"), [7u8, 0]).unwrap();

        let repo = FileRepository::<Entry>::open_or_create(temp_dir.path(), "t.log").unwrap();
        assert_eq!(repo.size(), 0);
        assert!(repo.read_all().unwrap().is_empty());
    }

    #[test]
    fn retain_from_keeps_the_tail() {
        let temp_dir = TempDir::new().unwrap();
        let mut repo = FileRepository::<Entry>::open_or_create(temp_dir.path(), "t.log").unwrap();
        repo.append(&entry(1)).unwrap();
        let second = repo.append(&entry(2)).unwrap();
        let third = repo.append(&entry(3)).unwrap();

        repo.retain_from(second).unwrap();
        let next = repo.append(&entry(4)).unwrap();
        repo.flush().unwrap();

        let entries = repo.read_entries_from(0).unwrap();
        assert_eq!(entries[0], (0, entry(2)));
        assert_eq!(entries[1], (third - second, entry(3)));
        assert_eq!(entries[2], (next, entry(4)));
        assert_eq!(entries.len(), 3);
    }
}
