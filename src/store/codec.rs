//! Blob format of the in-memory store
//!
//! Layout: magic, entry count, then per entry a flag byte, the internal path,
//! the modification time, the seal header of protected entries and the
//! payload. Protected payloads are sealed by [`super::crypto`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::crypto::{CHECK_LEN, SALT_LEN, Seal};
use crate::error::{Error, Result};

const MAGIC: &[u8; 4] = b"ZNAV";
const VERSION: u8 = 2;

const FLAG_DIRECTORY: u8 = 0b01;
const FLAG_PROTECTED: u8 = 0b10;

#[derive(Clone, Debug, PartialEq)]
pub struct RawEntry {
    pub path: String,
    pub directory: bool,
    pub modified: Option<SystemTime>,
    /// Set when the payload is sealed with a password
    pub seal: Option<Seal>,
    pub data: Vec<u8>,
}

pub fn encode(entries: &[RawEntry]) -> Result<Vec<u8>> {
    let count = u32::try_from(entries.len())
        .map_err(|_| Error::format(None, "too many entries"))?;
    let mut out = Vec::with_capacity(16 + entries.iter().map(|e| e.data.len() + 32).sum::<usize>());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&count.to_le_bytes());

    for entry in entries {
        let mut flags = 0;
        if entry.directory {
            flags |= FLAG_DIRECTORY;
        }
        if entry.seal.is_some() {
            flags |= FLAG_PROTECTED;
        }
        let path_len = u16::try_from(entry.path.len())
            .map_err(|_| Error::format(Some(entry.path.clone()), "entry path too long"))?;
        out.push(flags);
        out.extend_from_slice(&path_len.to_le_bytes());
        out.extend_from_slice(entry.path.as_bytes());
        out.extend_from_slice(&encode_time(entry.modified).to_le_bytes());
        if let Some(seal) = &entry.seal {
            out.extend_from_slice(&seal.salt);
            out.extend_from_slice(&seal.check);
        }
        out.extend_from_slice(&(entry.data.len() as u64).to_le_bytes());
        out.extend_from_slice(&entry.data);
    }

    Ok(out)
}

pub fn decode(blob: &[u8]) -> Result<Vec<RawEntry>> {
    let mut reader = Reader { blob, pos: 0 };

    if reader.take(MAGIC.len(), None)? != MAGIC {
        return Err(Error::format(None, "not an archive"));
    }
    let version = reader.take(1, None)?[0];
    if version != VERSION {
        return Err(Error::format(None, format!("unsupported archive version {version}")));
    }

    let count = reader.u32(None)?;
    let mut entries = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        let flags = reader.take(1, None)?[0];
        let path_len = reader.u16(None)? as usize;
        let path = String::from_utf8(reader.take(path_len, None)?.to_vec())
            .map_err(|_| Error::format(None, "entry path is not valid UTF-8"))?;
        let at = Some(path.as_str());
        let modified = decode_time(reader.u64(at)?);
        let seal = if flags & FLAG_PROTECTED != 0 {
            let mut salt = [0u8; SALT_LEN];
            salt.copy_from_slice(reader.take(SALT_LEN, at)?);
            let mut check = [0u8; CHECK_LEN];
            check.copy_from_slice(reader.take(CHECK_LEN, at)?);
            Some(Seal { salt, check })
        } else {
            None
        };
        let data_len = reader.u64(at)? as usize;
        let data = reader.take(data_len, at)?.to_vec();
        entries.push(RawEntry {
            directory: flags & FLAG_DIRECTORY != 0,
            path,
            modified,
            seal,
            data,
        });
    }

    Ok(entries)
}

struct Reader<'a> {
    blob: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize, path: Option<&str>) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.blob.len())
            .ok_or_else(|| Error::format(path.map(str::to_string), "unexpected end of archive"))?;
        let slice = &self.blob[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u16(&mut self, path: Option<&str>) -> Result<u16> {
        let bytes = self.take(2, path)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self, path: Option<&str>) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4, path)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self, path: Option<&str>) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8, path)?);
        Ok(u64::from_le_bytes(buf))
    }
}

// 0 means "no timestamp"
fn encode_time(time: Option<SystemTime>) -> u64 {
    time.and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() + 1)
        .unwrap_or(0)
}

fn decode_time(raw: u64) -> Option<SystemTime> {
    (raw > 0).then(|| UNIX_EPOCH + Duration::from_secs(raw - 1))
}
