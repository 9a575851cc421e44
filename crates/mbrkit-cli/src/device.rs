//! Disk image or block device holding an MBR at offset 0

use anyhow::{Context, Result};
use mbrkit_core::security::{sectors_in, validate_sector_size};
use mbrkit_core::MasterBootRecord;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Configuration for opening a device
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Logical sector size in bytes
    pub sector_size: u32,
    /// Flush data to the medium after writing the MBR
    pub sync_writes: bool,
    /// Open read-write
    pub writable: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            sector_size: 512,
            sync_writes: true,
            writable: false,
        }
    }
}

impl DeviceConfig {
    /// Same configuration, opened for writing
    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }
}

/// An image file or block device
///
/// Block devices report a zero length in their metadata, so the length is
/// taken by seeking to the end instead.
pub struct Device {
    file: File,
    path: PathBuf,
    length: u64,
    config: DeviceConfig,
}

impl Device {
    /// Open a device from a file path
    ///
    /// # Errors
    ///
    /// Returns an error if the sector size is invalid or the file cannot be
    /// opened or measured
    pub fn open(path: &Path, config: DeviceConfig) -> Result<Self> {
        validate_sector_size(config.sector_size)?;

        let mut file = OpenOptions::new()
            .read(true)
            .write(config.writable)
            .open(path)
            .with_context(|| format!("Can't open {}", path.display()))?;
        let length = file
            .seek(SeekFrom::End(0))
            .with_context(|| format!("Can't determine size of {}", path.display()))?;

        tracing::debug!(
            "Opened {} ({} bytes, sector size {}, writable: {})",
            path.display(),
            length,
            config.sector_size,
            config.writable
        );

        Ok(Self {
            file,
            path: path.to_path_buf(),
            length,
            config,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total size in bytes
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn sector_size(&self) -> u32 {
        self.config.sector_size
    }

    /// Number of whole sectors on the device
    pub fn disk_sectors(&self) -> Result<u64> {
        Ok(sectors_in(self.length, self.config.sector_size)?)
    }

    /// Read sector 0
    ///
    /// I/O failures are returned as errors. The MBR's own validation result is
    /// handed back alongside it so the caller can decide whether to repair it.
    pub fn read_mbr(&mut self) -> Result<(MasterBootRecord, mbrkit_core::Result<()>)> {
        self.file.seek(SeekFrom::Start(0))?;
        let (mbr, result) = MasterBootRecord::read(&mut self.file);
        match result {
            Err(e) if !e.is_validation() => Err(e)
                .with_context(|| format!("Error while reading MBR from {}", self.path.display())),
            result => Ok((mbr, result)),
        }
    }

    /// Write the MBR back to sector 0
    pub fn write_mbr(&mut self, mbr: &MasterBootRecord) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        mbr.write(&mut self.file)
            .with_context(|| format!("Error while writing MBR to {}", self.path.display()))?;
        if self.config.sync_writes {
            self.file.sync_all()?;
        }
        tracing::info!("Wrote MBR to {}", self.path.display());
        Ok(())
    }
}
