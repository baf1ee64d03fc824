//! The part manifest: every ZIP entry's path, compression method, and
//! original order, captured at read time so unmodified parts stream
//! back out byte-for-byte on write.

use std::io::{Read, Seek, Write};

use zip::read::ZipArchive;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{OoxmlError, OoxmlResult};

/// One ZIP entry as read from the source archive: its path, the exact
/// bytes stored for it, and the compression method it was stored with.
#[derive(Debug, Clone)]
pub struct ManifestEntry {
    pub name: String,
    pub bytes: Vec<u8>,
    pub compression: CompressionMethod,
}

/// Every entry of the source archive, in original ZIP order. The writer
/// walks this list and, for each entry, either streams `bytes` unchanged
/// or substitutes regenerated bytes for a part the caller modified —
/// entries never present in the source are appended, never inserted, so
/// pass-through entries keep their original relative order.
#[derive(Debug, Clone, Default)]
pub struct PartManifest {
    entries: Vec<ManifestEntry>,
}

impl PartManifest {
    pub fn read<R: Read + Seek>(archive: &mut ZipArchive<R>) -> OoxmlResult<Self> {
        let mut entries = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();
            let compression = file.compression();
            let mut bytes = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut bytes)?;
            entries.push(ManifestEntry { name, bytes, compression });
        }
        Ok(Self { entries })
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.bytes.as_slice())
    }

    pub fn part_str(&self, name: &str) -> OoxmlResult<Option<String>> {
        match self.part(name) {
            Some(bytes) => Ok(Some(String::from_utf8(bytes.to_vec()).map_err(|e| OoxmlError::InvalidFormat {
                part: name.to_string(),
                detail: e.to_string(),
            })?)),
            None => Ok(None),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Stream every entry out, substituting regenerated bytes for parts
    /// named in `overrides` and passing the rest through byte-for-byte at
    /// their original compression method and position. Parts in
    /// `overrides` with no matching source entry are appended at the
    /// end, in the order given.
    pub fn write<W: Write + Seek>(
        &self,
        zip: &mut ZipWriter<W>,
        mut overrides: Vec<(String, Vec<u8>)>,
    ) -> OoxmlResult<()> {
        for entry in &self.entries {
            let bytes = match overrides.iter().position(|(name, _)| name == &entry.name) {
                Some(idx) => overrides.remove(idx).1,
                None => entry.bytes.clone(),
            };
            let options = zip::write::SimpleFileOptions::default().compression_method(entry.compression);
            zip.start_file(entry.name.clone(), options)?;
            zip.write_all(&bytes)?;
        }
        for (name, bytes) in overrides {
            let options =
                zip::write::SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            zip.start_file(name, options)?;
            zip.write_all(&bytes)?;
        }
        Ok(())
    }
}
