//! SQLite file header and input sniffing

use crate::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// The 16-byte magic string at the start of every database file
pub const SQLITE_HEADER_MAGIC: &[u8; 16] = b"SQLite format 3\0";

/// Size of the database file header
pub const HEADER_SIZE: usize = 100;

/// Database file header fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub page_size: u32,
    pub write_version: u8,
    pub read_version: u8,
    pub reserved_space: u8,
    pub file_change_counter: u32,
    /// Size of the database in pages
    pub database_size: u32,
    pub first_freelist_page: u32,
    pub freelist_pages: u32,
    pub schema_cookie: u32,
    pub schema_format: u32,
    pub text_encoding: TextEncoding,
    pub user_version: u32,
    pub application_id: u32,
    pub sqlite_version: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    /// Zero in a freshly created, still empty database
    Unspecified,
}

impl FileHeader {
    /// Parse the first 100 bytes of a database image
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::InvalidFormat(format!(
                "header needs {} bytes, got {}",
                HEADER_SIZE,
                data.len()
            )));
        }
        if &data[0..16] != SQLITE_HEADER_MAGIC {
            return Err(Error::InvalidFormat("Not a SQLite database".into()));
        }

        let page_size = BigEndian::read_u16(&data[16..18]);
        // 1 encodes the 64 KiB page size, which does not fit in a u16
        let page_size = if page_size == 1 { 65536u32 } else { page_size as u32 };

        let text_encoding = match BigEndian::read_u32(&data[56..60]) {
            0 => TextEncoding::Unspecified,
            1 => TextEncoding::Utf8,
            2 => TextEncoding::Utf16Le,
            3 => TextEncoding::Utf16Be,
            other => {
                return Err(Error::InvalidFormat(format!(
                    "unknown text encoding {}",
                    other
                )))
            }
        };

        Ok(FileHeader {
            page_size,
            write_version: data[18],
            read_version: data[19],
            reserved_space: data[20],
            file_change_counter: BigEndian::read_u32(&data[24..28]),
            database_size: BigEndian::read_u32(&data[28..32]),
            first_freelist_page: BigEndian::read_u32(&data[32..36]),
            freelist_pages: BigEndian::read_u32(&data[36..40]),
            schema_cookie: BigEndian::read_u32(&data[40..44]),
            schema_format: BigEndian::read_u32(&data[44..48]),
            text_encoding,
            user_version: BigEndian::read_u32(&data[60..64]),
            application_id: BigEndian::read_u32(&data[68..72]),
            sqlite_version: BigEndian::read_u32(&data[96..100]),
        })
    }

    /// Size of the image in bytes according to the header
    pub fn image_size(&self) -> u64 {
        self.page_size as u64 * self.database_size as u64
    }
}

/// What a byte buffer handed to the session contains
#[derive(Debug, Clone, PartialEq)]
pub enum SourceKind {
    /// A native database image
    Database(FileHeader),
    /// UTF-8 SQL text to run against an empty database
    SqlScript(String),
}

impl SourceKind {
    pub fn detect(bytes: &[u8]) -> Result<Self> {
        if bytes.starts_with(SQLITE_HEADER_MAGIC) {
            return FileHeader::parse(bytes).map(SourceKind::Database);
        }
        // Anything without the magic must be SQL text
        let text = core::str::from_utf8(bytes)?;
        Ok(SourceKind::SqlScript(text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn header_bytes(page_size: u16, pages: u32) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[..16].copy_from_slice(SQLITE_HEADER_MAGIC);
        BigEndian::write_u16(&mut data[16..18], page_size);
        data[18] = 1;
        data[19] = 1;
        BigEndian::write_u32(&mut data[28..32], pages);
        BigEndian::write_u32(&mut data[56..60], 1);
        let mut version = Vec::new();
        version.write_u32::<BigEndian>(3_045_001).unwrap();
        data[96..100].copy_from_slice(&version);
        data
    }

    #[test]
    fn test_parse_header() {
        let header = FileHeader::parse(&header_bytes(4096, 3)).unwrap();
        assert_eq!(header.page_size, 4096);
        assert_eq!(header.database_size, 3);
        assert_eq!(header.image_size(), 4096 * 3);
        assert_eq!(header.text_encoding, TextEncoding::Utf8);
        assert_eq!(header.sqlite_version, 3_045_001);
    }

    #[test]
    fn test_page_size_one_means_64k() {
        let header = FileHeader::parse(&header_bytes(1, 1)).unwrap();
        assert_eq!(header.page_size, 65536);
    }

    #[test]
    fn test_short_or_foreign_header() {
        assert!(matches!(
            FileHeader::parse(b"SQLite format 3\0"),
            Err(Error::InvalidFormat(_))
        ));
        let mut data = header_bytes(4096, 1);
        data[0] = b'X';
        assert!(matches!(FileHeader::parse(&data), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_detect_source() {
        assert!(matches!(
            SourceKind::detect(&header_bytes(4096, 1)),
            Ok(SourceKind::Database(_))
        ));
        assert_eq!(
            SourceKind::detect(b"CREATE TABLE t(x);").unwrap(),
            SourceKind::SqlScript("CREATE TABLE t(x);".into())
        );
        assert!(matches!(
            SourceKind::detect(&[0xff, 0xfe, 0x00]),
            Err(Error::Utf8Error(_))
        ));
    }
}
