//! GPT protective MBR construction
//!
//! A protective MBR occupies LBA 0 of a GPT disk so that MBR-only tools see a
//! single partition of type 0xEE covering the disk instead of free space.

use crate::error::{Error, Result};
use crate::table::MasterBootRecord;
use crate::types::{PartitionType, ProtectiveType};
use crate::validate::MAX_SECTOR;

/// First sector of the protective partition (the GPT header)
pub const PROTECTIVE_START: u32 = 1;

/// Length of the protective partition for a disk of `disk_size` bytes
///
/// # Errors
///
/// - [`Error::InvalidSectorSize`] if `sector_size` is zero
/// - [`Error::DiskSizeNotEvenSectors`] if `disk_size` is not a multiple of `sector_size`
pub fn protective_length(sector_size: u32, disk_size: u64, kind: ProtectiveType) -> Result<u32> {
    if sector_size == 0 {
        return Err(Error::InvalidSectorSize(sector_size));
    }
    if disk_size % u64::from(sector_size) != 0 {
        return Err(Error::DiskSizeNotEvenSectors {
            disk_size,
            sector_size,
        });
    }

    let len = match kind {
        ProtectiveType::Default | ProtectiveType::MaxSize => MAX_SECTOR,
        ProtectiveType::DiskSize => {
            let actual = (disk_size / u64::from(sector_size)).saturating_sub(u64::from(PROTECTIVE_START));
            actual.min(MAX_SECTOR)
        }
    };
    // Both arms are capped at MAX_SECTOR
    Ok(len as u32)
}

impl MasterBootRecord {
    /// Turn this MBR into a GPT protective MBR
    ///
    /// Entry 1 becomes a non-bootable GPT partition starting at LBA 1, entries
    /// 2-4 are cleared and the signature is fixed. Boot code and CHS bytes are
    /// not touched.
    ///
    /// # Arguments
    ///
    /// * `sector_size` - Logical sector size in bytes (usually 512 or 4096)
    /// * `disk_size` - Size of the entire disk in bytes
    /// * `kind` - How to size the protective partition
    ///
    /// # Errors
    ///
    /// Fails before modifying anything if the sizes are inconsistent; see
    /// [`protective_length`].
    pub fn make_protective(
        &mut self,
        sector_size: u32,
        disk_size: u64,
        kind: ProtectiveType,
    ) -> Result<()> {
        let len = protective_length(sector_size, disk_size, kind)?;

        self.fix_signature();
        for mut p in self.partitions_mut() {
            if p.number() == 1 {
                p.set_partition_type(PartitionType::Gpt);
                p.set_lba_start(PROTECTIVE_START);
                p.set_lba_len(len);
                p.set_bootable(false);
            } else {
                p.clear();
            }
        }

        tracing::debug!(
            "Built protective MBR: mode={}, sector_size={}, disk_size={}, length={:#X}",
            kind,
            sector_size,
            disk_size,
            len
        );
        Ok(())
    }
}
