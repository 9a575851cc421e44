//! Serializable snapshot of an MBR for display and JSON output

use crate::entry::PartitionRef;
use crate::table::MasterBootRecord;
use crate::validate::diagnose;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One non-empty partition entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionReport {
    /// Slot number (1-4)
    pub number: usize,

    /// Raw type byte
    pub type_byte: u8,

    /// Human-readable type name
    pub type_name: String,

    pub bootable: bool,

    /// First sector
    pub lba_start: u32,

    /// Length in sectors
    pub lba_len: u32,

    /// Last sector, if it is a valid 32-bit address
    pub lba_last: Option<u32>,

    /// Offset from start of disk in bytes
    pub offset: u64,

    /// Size in bytes
    pub size: u64,
}

impl PartitionReport {
    fn from_entry(p: &PartitionRef<'_>, sector_size: u32) -> Self {
        let partition_type = p.partition_type();
        Self {
            number: p.number(),
            type_byte: partition_type.to_byte(),
            type_name: partition_type.to_string(),
            bootable: p.is_bootable(),
            lba_start: p.lba_start(),
            lba_len: p.lba_len(),
            lba_last: p.lba_last().ok(),
            offset: u64::from(p.lba_start()) * u64::from(sector_size),
            size: u64::from(p.lba_len()) * u64::from(sector_size),
        }
    }
}

impl fmt::Display for PartitionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Partition {} [{} @ LBA {}, {} sectors]",
            self.number, self.type_name, self.lba_start, self.lba_len
        )?;
        if self.bootable {
            write!(f, " *")?;
        }
        Ok(())
    }
}

/// Everything worth showing about an MBR
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    /// Sector size used for byte offsets
    pub sector_size: u32,

    /// Signature bytes as found
    pub signature: [u8; 2],

    pub signature_valid: bool,

    /// True if the disk is GPT with a protective or hybrid MBR
    pub is_gpt: bool,

    /// Non-empty partitions in slot order
    pub partitions: Vec<PartitionReport>,

    /// Every validation failure, empty for a valid table
    pub problems: Vec<String>,
}

impl TableReport {
    pub fn from_table(mbr: &MasterBootRecord, sector_size: u32) -> Self {
        let partitions = mbr
            .partitions()
            .iter()
            .filter(|p| !p.is_empty())
            .map(|p| PartitionReport::from_entry(p, sector_size))
            .collect();

        Self {
            sector_size,
            signature: mbr.signature(),
            signature_valid: mbr.has_valid_signature(),
            is_gpt: mbr.is_gpt(),
            partitions,
            problems: diagnose(mbr).iter().map(|e| e.to_string()).collect(),
        }
    }

    /// True if no validation rule failed
    pub fn is_valid(&self) -> bool {
        self.problems.is_empty()
    }
}
