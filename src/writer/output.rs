//! Final container buffer, either in memory or a memory-mapped file.
//!
//! The writer knows the exact size of the container before it copies the index and data
//! regions into place, so an [`Output`] is created at that size and filled with positioned
//! writes. A file-backed output that is dropped before [`Output::finalize`] removes its file,
//! so an interrupted write never leaves a truncated container behind.

use std::path::{Path, PathBuf};

use memmap2::{MmapMut, MmapOptions};

use crate::{Error, Result};

enum Backing {
    File { mmap: MmapMut, path: PathBuf },
    Memory { data: Vec<u8> },
}

/// A fixed-size output buffer for one container.
pub struct Output {
    backing: Backing,
    finalized: bool,
}

impl Output {
    /// Creates (or truncates) the file at `path`, sizes it to `size` bytes and maps it.
    ///
    /// # Errors
    /// Returns [`crate::Error::MmapFailed`] if the file cannot be created, resized or mapped.
    pub fn create<P: AsRef<Path>>(path: P, size: u64) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| Error::MmapFailed(format!("Failed to create {}: {e}", path.display())))?;

        file.set_len(size)
            .map_err(|e| Error::MmapFailed(format!("Failed to set file size: {e}")))?;

        // `size` is at least one header, zero-length mappings never occur
        let mmap = unsafe {
            MmapOptions::new()
                .map_mut(&file)
                .map_err(|e| Error::MmapFailed(format!("Failed to map {}: {e}", path.display())))?
        };

        Ok(Self {
            backing: Backing::File { mmap, path },
            finalized: false,
        })
    }

    /// Creates a zero-filled in-memory buffer of `size` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::MmapFailed`] if the size does not fit the address space.
    pub fn create_in_memory(size: u64) -> Result<Self> {
        let size = usize::try_from(size)
            .map_err(|_| Error::MmapFailed(format!("Size {size} too large for target")))?;

        Ok(Self {
            backing: Backing::Memory {
                data: vec![0u8; size],
            },
            finalized: false,
        })
    }

    /// Returns `true` if the output has no file behind it.
    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        matches!(self.backing, Backing::Memory { .. })
    }

    /// The whole buffer.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        match &self.backing {
            Backing::File { mmap, .. } => &mmap[..],
            Backing::Memory { data } => &data[..],
        }
    }

    /// The whole buffer, mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        match &mut self.backing {
            Backing::File { mmap, .. } => &mut mmap[..],
            Backing::Memory { data } => &mut data[..],
        }
    }

    /// Copies `data` to `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::MmapFailed`] if the write would run past the end of the buffer.
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        let size = self.size();
        let start = usize::try_from(offset)
            .map_err(|_| Error::MmapFailed(format!("Offset {offset} too large for target")))?;
        let end = start
            .checked_add(data.len())
            .filter(|end| *end <= size)
            .ok_or_else(|| {
                Error::MmapFailed(format!(
                    "Write of {} bytes at {offset:#x} exceeds buffer size {size:#x}",
                    data.len()
                ))
            })?;

        self.as_mut_slice()[start..end].copy_from_slice(data);
        Ok(())
    }

    /// Size of the buffer in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        match &self.backing {
            Backing::File { mmap, .. } => mmap.len(),
            Backing::Memory { data } => data.len(),
        }
    }

    /// Flushes the mapping to its file. A no-op for in-memory output.
    ///
    /// # Errors
    /// Returns [`crate::Error::MmapFailed`] if the flush fails.
    pub fn flush(&mut self) -> Result<()> {
        match &mut self.backing {
            Backing::File { mmap, .. } => mmap
                .flush()
                .map_err(|e| Error::MmapFailed(format!("Failed to flush mapping: {e}"))),
            Backing::Memory { .. } => Ok(()),
        }
    }

    /// Flushes a file-backed output and keeps the file. Optionally truncates it to
    /// `actual_size` bytes first.
    ///
    /// # Errors
    /// Returns [`crate::Error::FinalizationFailed`] for in-memory output, or if the flush or
    /// truncation fails.
    pub fn finalize(mut self, actual_size: Option<u64>) -> Result<()> {
        let backing = std::mem::replace(&mut self.backing, Backing::Memory { data: Vec::new() });

        match backing {
            Backing::File { mmap, path } => {
                // From here on the file is no longer owned by `self`
                self.finalized = true;

                mmap.flush().map_err(|e| {
                    Error::FinalizationFailed(format!("Failed to flush mapping: {e}"))
                })?;
                drop(mmap);

                if let Some(size) = actual_size {
                    std::fs::OpenOptions::new()
                        .write(true)
                        .open(&path)
                        .and_then(|file| file.set_len(size))
                        .map_err(|e| {
                            Error::FinalizationFailed(format!(
                                "Failed to truncate {} to {size} bytes: {e}",
                                path.display()
                            ))
                        })?;
                }
                Ok(())
            }
            Backing::Memory { .. } => Err(Error::FinalizationFailed(
                "in-memory output has no file, use into_vec()".to_string(),
            )),
        }
    }

    /// Takes the buffer out of the output, copying it for file-backed output. Optionally
    /// truncates it to `actual_size` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::FinalizationFailed`] if `actual_size` exceeds the buffer.
    pub fn into_vec(mut self, actual_size: Option<u64>) -> Result<Vec<u8>> {
        let backing = std::mem::replace(&mut self.backing, Backing::Memory { data: Vec::new() });
        let mut data = match backing {
            Backing::Memory { data } => data,
            Backing::File { mmap, .. } => mmap[..].to_vec(),
        };

        if let Some(size) = actual_size {
            let size = usize::try_from(size)
                .ok()
                .filter(|size| *size <= data.len())
                .ok_or_else(|| {
                    Error::FinalizationFailed(format!(
                        "Requested size {size} exceeds buffer size {}",
                        data.len()
                    ))
                })?;
            data.truncate(size);
        }

        self.finalized = true;
        Ok(data)
    }

    /// Path of a file-backed output.
    #[must_use]
    pub fn target_path(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File { path, .. } => Some(path.as_path()),
            Backing::Memory { .. } => None,
        }
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        if self.finalized {
            return;
        }
        if let Backing::File { path, .. } = &self.backing {
            let _ = std::fs::remove_file(path);
        }
    }
}
