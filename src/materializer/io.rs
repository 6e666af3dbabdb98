use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Creates or truncates `path` and writes `content` as UTF-8, optionally
/// preceded by a byte order mark. Returns the number of bytes written.
pub fn write_file(path: &Path, content: &str, bom: bool) -> Result<u64, std::io::Error> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    let mut written = 0;
    if bom {
        writer.write_all(&UTF8_BOM)?;
        written += UTF8_BOM.len();
    }
    writer.write_all(content.as_bytes())?;
    writer.flush()?;
    written += content.len();

    Ok(written as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_write_with_bom() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");

        let written = write_file(&path, "hello", true).unwrap();
        assert_eq!(written, 8);
        assert_eq!(fs::read(&path).unwrap(), b"\xEF\xBB\xBFhello");
    }

    #[test]
    fn test_write_truncates_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("a.txt");
        fs::write(&path, "a much longer previous body").unwrap();

        write_file(&path, "short", false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "short");
    }

    #[test]
    fn test_write_into_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("a.txt");
        assert!(write_file(&path, "x", true).is_err());
    }
}
