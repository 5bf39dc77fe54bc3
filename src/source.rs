//! Document loading for the command-line tools
//!
//! Plain or gzip-compressed `.nsmf` text, from a file or any reader.

use crate::error::Result;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Read a whole document, decompressing it if it starts with the gzip magic
pub fn read_document<R: Read>(mut input: R) -> Result<String> {
    let mut data = Vec::new();
    input.read_to_end(&mut data)?;

    if data.starts_with(&GZIP_MAGIC) {
        let mut decompressed = Vec::new();
        GzDecoder::new(data.as_slice()).read_to_end(&mut decompressed)?;
        data = decompressed;
    }

    String::from_utf8(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

/// Load a document from disk
pub fn load_document(path: &Path) -> Result<String> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Failed to open '{}': {}", path.display(), e),
        )
    })?;
    read_document(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_plain_text() {
        let text = read_document("#META filetype nsmf\n".as_bytes()).unwrap();
        assert_eq!(text, "#META filetype nsmf\n");
    }

    #[test]
    fn test_gzip_text() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"#META filetype nsmf\nglobalconfig").unwrap();
        let compressed = encoder.finish().unwrap();

        let text = read_document(compressed.as_slice()).unwrap();
        assert_eq!(text, "#META filetype nsmf\nglobalconfig");
    }

    #[test]
    fn test_invalid_utf8() {
        let err = read_document(&[0xffu8, 0xfe, 0x00][..]).unwrap_err();
        assert!(matches!(err, crate::Error::Io(ref e) if e.kind() == io::ErrorKind::InvalidData));
    }
}
