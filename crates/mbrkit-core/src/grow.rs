//! Growing a partition entry into the free space that follows it
//!
//! Only the table entry changes. Resizing the filesystem inside the partition
//! is left to filesystem tools.

use crate::error::{Error, Result};
use crate::table::MasterBootRecord;
use crate::validate::MAX_SECTOR;

/// How far to grow a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowRequest {
    /// Up to the next partition, the end of the disk or the 32-bit limit
    ToMax,
    /// By exactly this many sectors
    BySectors(u64),
}

/// Result of a successful grow attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowOutcome {
    /// The entry's length was changed
    Grown { old_len: u32, new_len: u32 },
    /// There was nothing to do
    AlreadyMax,
}

impl MasterBootRecord {
    /// Largest length partition `num` can take without overlapping the next
    /// partition or running past `disk_sectors`
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidPartitionNumber`] for numbers outside 1-4
    /// - [`Error::CannotGrow`] for empty entries
    pub fn max_partition_len(&self, num: usize, disk_sectors: u64) -> Result<u32> {
        let target = self.entry(num)?;
        if target.is_empty() {
            return Err(Error::cannot_grow(num, "partition entry is empty"));
        }
        let start = u64::from(target.lba_start());

        let next_start = self
            .partitions()
            .iter()
            .filter(|p| !p.is_empty() && p.number() != num)
            .map(|p| u64::from(p.lba_start()))
            .filter(|&s| s > start)
            .min()
            .unwrap_or(u64::MAX);

        let ceiling = next_start.min(disk_sectors).min(MAX_SECTOR);
        // ceiling <= MAX_SECTOR, so the difference fits
        Ok(ceiling.saturating_sub(start) as u32)
    }

    /// Grow partition `num` on a disk of `disk_sectors` sectors
    ///
    /// The table must be valid before and after; nothing is modified unless the
    /// grown table passes [`check`](Self::check).
    ///
    /// # Errors
    ///
    /// - any [`check`](Self::check) failure of the current table
    /// - [`Error::CannotGrow`] for GPT disks, empty entries, or when the
    ///   requested size does not fit
    pub fn grow_partition(
        &mut self,
        num: usize,
        disk_sectors: u64,
        request: GrowRequest,
    ) -> Result<GrowOutcome> {
        self.check()?;
        if self.is_gpt() {
            return Err(Error::cannot_grow(
                num,
                "disk uses GPT, the MBR entry is only protective",
            ));
        }

        let max_len = self.max_partition_len(num, disk_sectors)?;
        let old_len = self.entry(num)?.lba_len();

        let new_len = match request {
            GrowRequest::ToMax => {
                if old_len >= max_len {
                    return Ok(GrowOutcome::AlreadyMax);
                }
                max_len
            }
            GrowRequest::BySectors(0) => return Ok(GrowOutcome::AlreadyMax),
            GrowRequest::BySectors(extra) => {
                let wanted = u64::from(old_len).saturating_add(extra);
                if wanted > u64::from(max_len) {
                    return Err(Error::cannot_grow(
                        num,
                        format!(
                            "needs {} sectors but only {} are available",
                            wanted, max_len
                        ),
                    ));
                }
                wanted as u32
            }
        };

        let mut grown = self.clone();
        grown.entry_mut(num)?.set_lba_len(new_len);
        grown.check()?;
        *self = grown;

        tracing::info!(
            "Partition {} grown from {} to {} sectors",
            num,
            old_len,
            new_len
        );
        Ok(GrowOutcome::Grown { old_len, new_len })
    }
}
