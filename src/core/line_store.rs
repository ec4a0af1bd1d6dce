//! Per-slot line logs
//!
//! Each slot owns one newline-delimited file, `<slot>.txt`, inside the store
//! directory. Collection appends the bytes exactly as the device sent them;
//! transmission reads them back by line index. The file format is the
//! contract between a collection run and a later transmission run, so lines
//! are handled as bytes and only decoded for display.

use super::slot::Slot;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Display form of a raw line: lossy UTF-8 with one terminator stripped
pub fn line_text(raw: &[u8]) -> String {
    let line = raw
        .strip_suffix(b"\r\n")
        .or_else(|| raw.strip_suffix(b"\n"))
        .or_else(|| raw.strip_suffix(b"\r"))
        .unwrap_or(raw);
    String::from_utf8_lossy(line).into_owned()
}

/// Directory of per-slot line logs
#[derive(Debug, Clone)]
pub struct LineStore {
    dir: PathBuf,
}

impl Default for LineStore {
    fn default() -> Self {
        Self::new(".")
    }
}

impl LineStore {
    /// Create a store rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the log for `slot`
    pub fn path(&self, slot: Slot) -> PathBuf {
        self.dir.join(slot.log_file_name())
    }

    /// Whether a log exists for `slot`
    pub fn exists(&self, slot: Slot) -> bool {
        self.path(slot).is_file()
    }

    /// Append one raw line to the log, creating it if needed.
    ///
    /// The bytes are written unchanged; `\n` is added only when `line` does
    /// not already end with one.
    pub fn append(&self, slot: Slot, line: &[u8]) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path(slot))?;

        let mut record = line.to_vec();
        if !record.ends_with(b"\n") {
            record.push(b'\n');
        }
        file.write_all(&record)?;
        file.flush()
    }

    /// Raw line at `index`, terminator included.
    ///
    /// `None` when the log does not exist or is shorter than `index + 1`.
    pub fn line_at(&self, slot: Slot, index: usize) -> io::Result<Option<Vec<u8>>> {
        let Some(content) = self.read(slot)? else {
            return Ok(None);
        };

        Ok(content.split_inclusive(|b| *b == b'\n').nth(index).map(<[u8]>::to_vec))
    }

    /// Display text of every line; empty when the log is absent
    pub fn lines(&self, slot: Slot) -> io::Result<Vec<String>> {
        let Some(content) = self.read(slot)? else {
            return Ok(Vec::new());
        };

        Ok(content.split_inclusive(|b| *b == b'\n').map(line_text).collect())
    }

    fn read(&self, slot: Slot) -> io::Result<Option<Vec<u8>>> {
        match fs::read(self.path(slot)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_line_text() {
        assert_eq!(line_text(b"x\r\n"), "x");
        assert_eq!(line_text(b"x\n"), "x");
        assert_eq!(line_text(b"partial"), "partial");
        assert_eq!(line_text(b"\n"), "");
        assert_eq!(line_text(b"a\r\n\n"), "a\r\n");
        assert_eq!(line_text(b"T=25\xb0C\r\n"), "T=25\u{FFFD}C");
    }

    #[test]
    fn test_append_creates_and_extends() {
        let dir = TempDir::new().unwrap();
        let store = LineStore::new(dir.path());

        assert!(!store.exists(Slot::A));
        store.append(Slot::A, b"first").unwrap();
        store.append(Slot::A, b"second\n").unwrap();

        assert!(store.exists(Slot::A));
        assert_eq!(store.lines(Slot::A).unwrap(), vec!["first", "second"]);
        assert_eq!(fs::read(dir.path().join("port_A.txt")).unwrap(), b"first\nsecond\n");
    }

    #[test]
    fn test_append_keeps_received_bytes() {
        let dir = TempDir::new().unwrap();
        let store = LineStore::new(dir.path());

        store.append(Slot::A, b"T=25\xb0C\r\n").unwrap();
        store.append(Slot::A, b"ok\r\n").unwrap();

        assert_eq!(fs::read(store.path(Slot::A)).unwrap(), b"T=25\xb0C\r\nok\r\n");
        assert_eq!(store.line_at(Slot::A, 0).unwrap(), Some(b"T=25\xb0C\r\n".to_vec()));
        assert_eq!(store.lines(Slot::A).unwrap(), vec!["T=25\u{FFFD}C", "ok"]);
    }

    #[test]
    fn test_append_keeps_existing_content() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("port_B.txt"), "old 1\nold 2\n").unwrap();

        let store = LineStore::new(dir.path());
        store.append(Slot::B, b"new").unwrap();

        assert_eq!(store.lines(Slot::B).unwrap(), vec!["old 1", "old 2", "new"]);
    }

    #[test]
    fn test_line_at() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("port_C.txt"), "L0\nL1\nL2").unwrap();

        let store = LineStore::new(dir.path());
        assert_eq!(store.line_at(Slot::C, 0).unwrap(), Some(b"L0\n".to_vec()));
        // Last line without a terminator is still a line
        assert_eq!(store.line_at(Slot::C, 2).unwrap(), Some(b"L2".to_vec()));
        assert_eq!(store.line_at(Slot::C, 3).unwrap(), None);
        assert_eq!(store.line_at(Slot::D, 0).unwrap(), None);
    }

    #[test]
    fn test_line_at_tolerates_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("port_A.txt"), b"L0\nL1\n\xff\n").unwrap();

        let store = LineStore::new(dir.path());
        assert_eq!(store.line_at(Slot::A, 1).unwrap(), Some(b"L1\n".to_vec()));
        assert_eq!(store.line_at(Slot::A, 2).unwrap(), Some(b"\xff\n".to_vec()));
    }

    #[test]
    fn test_unreadable_log_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("port_A.txt")).unwrap();

        let store = LineStore::new(dir.path());
        assert!(store.line_at(Slot::A, 0).is_err());
    }

    #[test]
    fn test_lines_of_missing_log() {
        let dir = TempDir::new().unwrap();
        let store = LineStore::new(dir.path());
        assert!(store.lines(Slot::A).unwrap().is_empty());
    }
}
