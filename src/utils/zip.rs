//! Sequential reader for zip archives.
//!
//! Mirrors how `java.util.zip.ZipInputStream` reads an archive: front to back through the
//! local file headers, never consulting the central directory. Only the `stored` and
//! `deflated` methods are supported.

use crate::{utils::decompress::inflate_raw, Result};

const LOCAL_HEADER: u32 = 0x0403_4b50;
const DATA_DESCRIPTOR: u32 = 0x0807_4b50;
const LOCAL_HEADER_SIZE: usize = 30;
const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATED: u16 = 8;

/// One decoded archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntryData {
    /// Entry name
    pub name: String,
    /// Extra field bytes
    pub extra: Vec<u8>,
    /// Decompressed contents
    pub data: Vec<u8>,
}

/// Walks the local headers of an in-memory archive.
#[derive(Debug, Clone, Default)]
pub struct ZipReader {
    data: Vec<u8>,
    position: usize,
    finished: bool,
}

impl ZipReader {
    /// Creates a reader positioned at the first local header.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        ZipReader {
            data,
            position: 0,
            finished: false,
        }
    }

    fn u16_at(&self, offset: usize) -> Result<u16> {
        self.data
            .get(offset..offset + 2)
            .map(|bytes| u16::from_le_bytes([bytes[0], bytes[1]]))
            .ok_or_else(|| malformed_error!("Truncated zip header at offset {}", offset))
    }

    fn u32_at(&self, offset: usize) -> Result<u32> {
        self.data
            .get(offset..offset + 4)
            .map(|bytes| u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .ok_or_else(|| malformed_error!("Truncated zip header at offset {}", offset))
    }

    fn slice(&self, start: usize, length: usize) -> Result<&[u8]> {
        self.data
            .get(start..start.saturating_add(length))
            .ok_or_else(|| malformed_error!("Zip entry exceeds archive at offset {}", start))
    }

    /// Reads the next entry, `None` once the local headers are exhausted.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for truncated archives, corrupt deflate data
    /// and unsupported compression methods.
    pub fn next_entry(&mut self) -> Result<Option<ZipEntryData>> {
        if self.finished {
            return Ok(None);
        }
        let start = self.position;
        if self.data.len() < start + 4 || self.u32_at(start)? != LOCAL_HEADER {
            // central directory, end record or trailing bytes
            self.finished = true;
            return Ok(None);
        }

        let flags = self.u16_at(start + 6)?;
        let method = self.u16_at(start + 8)?;
        let compressed_size = self.u32_at(start + 18)? as usize;
        let name_length = self.u16_at(start + 26)? as usize;
        let extra_length = self.u16_at(start + 28)? as usize;

        let name_start = start + LOCAL_HEADER_SIZE;
        let name = String::from_utf8_lossy(self.slice(name_start, name_length)?).into_owned();
        let extra = self.slice(name_start + name_length, extra_length)?.to_vec();
        let body = name_start + name_length + extra_length;
        let has_descriptor = flags & FLAG_DATA_DESCRIPTOR != 0;

        let (data, consumed) = match method {
            METHOD_STORED => (self.slice(body, compressed_size)?.to_vec(), compressed_size),
            METHOD_DEFLATED if has_descriptor && compressed_size == 0 => {
                let remaining = self
                    .data
                    .get(body..)
                    .ok_or_else(|| malformed_error!("Zip entry exceeds archive at offset {}", body))?;
                inflate_raw(remaining)?
            }
            METHOD_DEFLATED => {
                let (data, _) = inflate_raw(self.slice(body, compressed_size)?)?;
                (data, compressed_size)
            }
            other => {
                return Err(malformed_error!(
                    "Unsupported zip compression method {} for entry {}",
                    other,
                    name
                ))
            }
        };

        let mut next = body + consumed;
        if has_descriptor {
            // crc, compressed and uncompressed size, optionally preceded by a signature
            next += if self.u32_at(next).ok() == Some(DATA_DESCRIPTOR) {
                16
            } else {
                12
            };
        }
        self.position = next;

        Ok(Some(ZipEntryData { name, extra, data }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::zip_archive as archive;

    #[test]
    fn test_walks_entries() {
        let bytes = archive(&[
            ("META-INF/MANIFEST.MF", &[][..], &b"Manifest-Version: 1.0\r\n"[..]),
            ("a/B.class", &[0xca, 0xfe][..], &[1, 2, 3, 4][..]),
        ]);
        let mut reader = ZipReader::new(bytes);

        let first = reader.next_entry().unwrap().unwrap();
        assert_eq!(first.name, "META-INF/MANIFEST.MF");
        assert_eq!(first.data, b"Manifest-Version: 1.0\r\n");

        let second = reader.next_entry().unwrap().unwrap();
        assert_eq!(second.name, "a/B.class");
        assert_eq!(second.extra, vec![0xca, 0xfe]);
        assert_eq!(second.data, vec![1, 2, 3, 4]);

        assert!(reader.next_entry().unwrap().is_none());
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn test_not_an_archive() {
        let mut reader = ZipReader::new(b"plain text".to_vec());
        assert!(reader.next_entry().unwrap().is_none());
    }
}
