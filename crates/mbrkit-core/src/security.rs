//! Validation limits for caller-supplied geometry
//!
//! Sector sizes reach the sizing arithmetic as divisors, so they are checked
//! once at the boundary instead of at every use.

use crate::error::{Error, Result};

/// Smallest logical sector size that can hold an MBR
pub const MIN_SECTOR_SIZE: u32 = 512;

/// Maximum sector size we'll accept (4KB - common for advanced format)
pub const MAX_SECTOR_SIZE: u32 = 4096;

/// Validate sector size is reasonable
pub fn validate_sector_size(sector_size: u32) -> Result<()> {
    if !(MIN_SECTOR_SIZE..=MAX_SECTOR_SIZE).contains(&sector_size) {
        tracing::warn!(
            "Rejected sector size {} (must be {}-{})",
            sector_size,
            MIN_SECTOR_SIZE,
            MAX_SECTOR_SIZE
        );
        return Err(Error::InvalidSectorSize(sector_size));
    }

    // Sector size should be power of 2
    if !sector_size.is_power_of_two() {
        return Err(Error::InvalidSectorSize(sector_size));
    }

    Ok(())
}

/// Number of whole sectors in `bytes`
pub fn sectors_in(bytes: u64, sector_size: u32) -> Result<u64> {
    validate_sector_size(sector_size)?;
    Ok(bytes / u64::from(sector_size))
}
