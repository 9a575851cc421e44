//! MBR error types

use thiserror::Error;

/// The main error type for MBR operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error from the underlying byte source or sink
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The last two bytes of the sector are not 0x55 0xAA
    #[error("MBR: bad signature (found {:02X} {:02X})", .found[0], .found[1])]
    BadSignature { found: [u8; 2] },

    /// The start sector of one partition falls inside another
    #[error("MBR: partitions {first} and {second} intersect")]
    PartitionsIntersect { first: usize, second: usize },

    /// A partition ends beyond the 32-bit sector address range
    #[error("MBR: partition {partition} runs up to sector {last:#X}, beyond the 32-bit range")]
    LastSectorTooHigh { partition: usize, last: u64 },

    /// Boot indicator is neither 0x00 nor 0x80
    #[error("MBR: partition {partition} has bad boot flag {value:#04X}")]
    BadBootFlag { partition: usize, value: u8 },

    /// Disk size is not a whole number of sectors
    #[error("MBR: disk size {disk_size} is not evenly divisible by sector size {sector_size}")]
    DiskSizeNotEvenSectors { disk_size: u64, sector_size: u32 },

    /// Unknown protective MBR sizing mode
    #[error("Invalid value for protective type: {0}")]
    InvalidProtectiveType(String),

    /// Source ended before a full sector was read
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Sink stopped accepting bytes before a full sector was written
    #[error("Short write: expected {expected} bytes, wrote {actual}")]
    ShortWrite { expected: usize, actual: usize },

    /// Last sector of a partition cannot be expressed as a 32-bit address
    #[error("Sector address overflow in partition {partition}: last sector exceeds 0xFFFFFFFF")]
    SectorAddressOverflow { partition: usize },

    /// Partition number outside 1..=4
    #[error("Invalid partition number {0} (must be 1-4)")]
    InvalidPartitionNumber(usize),

    /// Sector size rejected before any arithmetic uses it
    #[error("Invalid sector size: {0}")]
    InvalidSectorSize(u32),

    /// A partition entry could not be grown
    #[error("Partition {partition} can't be extended: {reason}")]
    CannotGrow { partition: usize, reason: String },
}

/// Result type alias for MBR operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a cannot-grow error
    pub fn cannot_grow(partition: usize, reason: impl Into<String>) -> Self {
        Error::CannotGrow {
            partition,
            reason: reason.into(),
        }
    }

    /// Create an invalid protective type error
    pub fn invalid_protective_type(value: impl Into<String>) -> Self {
        Error::InvalidProtectiveType(value.into())
    }

    /// True for the errors produced by [`crate::MasterBootRecord::check`]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::BadSignature { .. }
                | Error::PartitionsIntersect { .. }
                | Error::LastSectorTooHigh { .. }
                | Error::BadBootFlag { .. }
        )
    }
}
