//! MBR partition types and protective sizing modes

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// MBR partition type codes
///
/// The type byte at offset 4 of each partition entry. Only a handful of values
/// carry meaning for validation (empty, GPT, hybrid GPT); the rest are named for
/// display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionType {
    /// Empty/unused partition entry
    Empty,
    /// FAT12, CHS
    Fat12,
    /// FAT16 < 32MB, CHS
    Fat16Small,
    /// Extended partition, CHS
    Extended,
    /// FAT16 >= 32MB, CHS
    Fat16,
    /// NTFS/exFAT/HPFS
    Ntfs,
    /// FAT32, CHS
    Fat32Chs,
    /// FAT32, LBA
    Fat32Lba,
    /// FAT16, LBA
    Fat16Lba,
    /// Extended partition, LBA
    ExtendedLba,
    /// Linux swap (shares its code with Solaris)
    LinuxSwap,
    /// Linux native (ext2/ext3/ext4)
    LinuxNative,
    /// Linux LVM physical volume
    Lvm,
    /// Hybrid MBR on a GPT disk
    HybridGpt,
    /// GPT protective MBR
    Gpt,
    /// EFI system partition
    EfiSystem,
    /// Unknown partition type
    Unknown(u8),
}

impl PartitionType {
    /// Create a partition type from a byte value
    pub fn from_byte(b: u8) -> Self {
        match b {
            0x00 => Self::Empty,
            0x01 => Self::Fat12,
            0x04 => Self::Fat16Small,
            0x05 => Self::Extended,
            0x06 => Self::Fat16,
            0x07 => Self::Ntfs,
            0x0B => Self::Fat32Chs,
            0x0C => Self::Fat32Lba,
            0x0E => Self::Fat16Lba,
            0x0F => Self::ExtendedLba,
            0x82 => Self::LinuxSwap,
            0x83 => Self::LinuxNative,
            0x8E => Self::Lvm,
            0xED => Self::HybridGpt,
            0xEE => Self::Gpt,
            0xEF => Self::EfiSystem,
            _ => Self::Unknown(b),
        }
    }

    /// Get the byte value of this partition type
    pub fn to_byte(self) -> u8 {
        match self {
            Self::Empty => 0x00,
            Self::Fat12 => 0x01,
            Self::Fat16Small => 0x04,
            Self::Extended => 0x05,
            Self::Fat16 => 0x06,
            Self::Ntfs => 0x07,
            Self::Fat32Chs => 0x0B,
            Self::Fat32Lba => 0x0C,
            Self::Fat16Lba => 0x0E,
            Self::ExtendedLba => 0x0F,
            Self::LinuxSwap => 0x82,
            Self::LinuxNative => 0x83,
            Self::Lvm => 0x8E,
            Self::HybridGpt => 0xED,
            Self::Gpt => 0xEE,
            Self::EfiSystem => 0xEF,
            Self::Unknown(b) => b,
        }
    }

    /// True for the two types that mark a GPT disk
    pub fn is_gpt(self) -> bool {
        matches!(self, Self::Gpt | Self::HybridGpt)
    }

    /// Get a human-readable name for this partition type
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Fat12 => "FAT12",
            Self::Fat16Small => "FAT16 (<32MB)",
            Self::Extended => "Extended",
            Self::Fat16 => "FAT16",
            Self::Ntfs => "NTFS/exFAT",
            Self::Fat32Chs => "FAT32 (CHS)",
            Self::Fat32Lba => "FAT32 (LBA)",
            Self::Fat16Lba => "FAT16 (LBA)",
            Self::ExtendedLba => "Extended (LBA)",
            Self::LinuxSwap => "Linux swap / Solaris",
            Self::LinuxNative => "Linux",
            Self::Lvm => "Linux LVM",
            Self::HybridGpt => "Hybrid GPT",
            Self::Gpt => "GPT Protective",
            Self::EfiSystem => "EFI System",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl From<u8> for PartitionType {
    fn from(b: u8) -> Self {
        Self::from_byte(b)
    }
}

impl From<PartitionType> for u8 {
    fn from(t: PartitionType) -> Self {
        t.to_byte()
    }
}

impl fmt::Display for PartitionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(b) => write!(f, "Unknown (0x{:02X})", b),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// How [`crate::MasterBootRecord::make_protective`] sizes the protective partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtectiveType {
    /// Implementation default, currently the same as `MaxSize`
    #[default]
    Default,
    /// Length 0xFFFFFFFF, as written by Linux and Windows partitioners
    MaxSize,
    /// Actual disk length in sectors, capped at 0xFFFFFFFF
    DiskSize,
}

impl ProtectiveType {
    /// Raw integer code of this mode
    pub fn code(self) -> i32 {
        match self {
            Self::Default => 0,
            Self::DiskSize => 1,
            Self::MaxSize => 2,
        }
    }
}

impl TryFrom<i32> for ProtectiveType {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Default),
            1 => Ok(Self::DiskSize),
            2 => Ok(Self::MaxSize),
            other => Err(Error::invalid_protective_type(other.to_string())),
        }
    }
}

impl FromStr for ProtectiveType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" => Ok(Self::Default),
            "max-size" | "maxsize" | "max" => Ok(Self::MaxSize),
            "disk-size" | "disksize" | "disk" => Ok(Self::DiskSize),
            _ => Err(Error::invalid_protective_type(s)),
        }
    }
}

impl fmt::Display for ProtectiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::MaxSize => "max-size",
            Self::DiskSize => "disk-size",
        };
        f.write_str(name)
    }
}
