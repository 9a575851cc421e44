//! Partition entry views

use crate::codec::{decode_u32, encode_u32};
use crate::error::{Error, Result};
use crate::types::PartitionType;

/// Size of each partition entry in bytes
pub const ENTRY_SIZE: usize = 16;

/// Offset of the boot indicator within an entry
pub const BOOTABLE_OFFSET: usize = 0;

/// Offset of the type byte within an entry
pub const TYPE_OFFSET: usize = 4;

/// Offset of the starting LBA within an entry
pub const LBA_START_OFFSET: usize = 8;

/// Offset of the sector count within an entry
pub const LBA_LEN_OFFSET: usize = 12;

/// Boot indicator for an active partition
pub const BOOTABLE: u8 = 0x80;

/// Boot indicator for an inactive partition
pub const NON_BOOTABLE: u8 = 0x00;

/// A view of one 16-byte partition record inside a [`crate::MasterBootRecord`]
///
/// The view borrows the table's buffer, so every change made through a
/// [`PartitionMut`] lands in the table immediately and no other view can
/// observe the entry while it is being changed.
///
/// # Structure
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x0     1     Boot indicator (0x00 / 0x80)
/// 0x1     3     CHS start (unused)
/// 0x4     1     Partition type
/// 0x5     3     CHS end (unused)
/// 0x8     4     LBA start
/// 0xC     4     LBA length
/// ```
#[derive(Debug)]
pub struct PartitionEntry<B> {
    num: usize,
    bytes: B,
}

/// Read-only entry view
pub type PartitionRef<'a> = PartitionEntry<&'a [u8]>;

/// Mutable entry view
pub type PartitionMut<'a> = PartitionEntry<&'a mut [u8]>;

impl<B: AsRef<[u8]>> PartitionEntry<B> {
    /// Wrap exactly [`ENTRY_SIZE`] bytes belonging to slot `num`
    pub(crate) fn new(num: usize, bytes: B) -> Self {
        debug_assert_eq!(bytes.as_ref().len(), ENTRY_SIZE);
        Self { num, bytes }
    }

    fn window(&self, offset: usize) -> [u8; 4] {
        let b = self.bytes.as_ref();
        [b[offset], b[offset + 1], b[offset + 2], b[offset + 3]]
    }

    /// Slot number, 1 through 4
    pub fn number(&self) -> usize {
        self.num
    }

    /// True if the type byte is zero
    pub fn is_empty(&self) -> bool {
        self.partition_type() == PartitionType::Empty
    }

    pub fn partition_type(&self) -> PartitionType {
        PartitionType::from_byte(self.bytes.as_ref()[TYPE_OFFSET])
    }

    /// Number of the first sector of the partition. Sector 0 is the MBR itself.
    pub fn lba_start(&self) -> u32 {
        decode_u32(&self.window(LBA_START_OFFSET))
    }

    /// Count of sectors in the partition
    pub fn lba_len(&self) -> u32 {
        decode_u32(&self.window(LBA_LEN_OFFSET))
    }

    /// Number of the last sector of the partition
    ///
    /// # Errors
    ///
    /// Returns [`Error::SectorAddressOverflow`] if `start + len - 1` is not a
    /// valid 32-bit sector address. This can only happen on entries that fail
    /// [`crate::MasterBootRecord::check`], or on zero-length entries at sector 0.
    pub fn lba_last(&self) -> Result<u32> {
        let end = u64::from(self.lba_start()) + u64::from(self.lba_len());
        end.checked_sub(1)
            .and_then(|last| u32::try_from(last).ok())
            .ok_or(Error::SectorAddressOverflow {
                partition: self.num,
            })
    }

    /// Raw boot indicator byte
    pub fn boot_flag(&self) -> u8 {
        self.bytes.as_ref()[BOOTABLE_OFFSET]
    }

    pub fn is_bootable(&self) -> bool {
        self.boot_flag() == BOOTABLE
    }

    /// The raw 16 bytes of this entry, CHS fields included
    pub fn as_bytes(&self) -> &[u8] {
        self.bytes.as_ref()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> PartitionEntry<B> {
    fn put_u32(&mut self, offset: usize, value: u32) {
        let mut window = [0u8; 4];
        encode_u32(value, &mut window);
        self.bytes.as_mut()[offset..offset + 4].copy_from_slice(&window);
    }

    pub fn set_partition_type(&mut self, partition_type: PartitionType) {
        self.bytes.as_mut()[TYPE_OFFSET] = partition_type.to_byte();
    }

    /// Set the first sector. Zero is only meaningful on an empty entry.
    pub fn set_lba_start(&mut self, start: u32) {
        self.put_u32(LBA_START_OFFSET, start);
    }

    /// Set the length in sectors
    pub fn set_lba_len(&mut self, len: u32) {
        self.put_u32(LBA_LEN_OFFSET, len);
    }

    pub fn set_bootable(&mut self, bootable: bool) {
        self.bytes.as_mut()[BOOTABLE_OFFSET] = if bootable { BOOTABLE } else { NON_BOOTABLE };
    }

    /// Reset type, start, length and boot flag. CHS bytes are left alone.
    pub fn clear(&mut self) {
        self.set_partition_type(PartitionType::Empty);
        self.set_lba_start(0);
        self.set_lba_len(0);
        self.set_bootable(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> [u8; ENTRY_SIZE] {
        [
            0x80, // Bootable
            0x20, 0x21, 0x00, // CHS start
            0x83, // Type: Linux
            0xFE, 0xFF, 0xFF, // CHS end
            0x00, 0x08, 0x00, 0x00, // LBA start: 2048
            0x00, 0x00, 0x10, 0x00, // LBA length: 1048576
        ]
    }

    #[test]
    fn test_entry_accessors() {
        let bytes = sample_entry();
        let entry = PartitionEntry::new(1, &bytes[..]);

        assert_eq!(entry.number(), 1);
        assert!(!entry.is_empty());
        assert!(entry.is_bootable());
        assert_eq!(entry.partition_type(), PartitionType::LinuxNative);
        assert_eq!(entry.lba_start(), 2048);
        assert_eq!(entry.lba_len(), 1_048_576);
        assert_eq!(entry.lba_last().unwrap(), 2048 + 1_048_576 - 1);
    }

    #[test]
    fn test_entry_mutators_preserve_chs() {
        let mut bytes = sample_entry();
        {
            let mut entry = PartitionEntry::new(2, &mut bytes[..]);
            entry.set_partition_type(PartitionType::Lvm);
            entry.set_lba_start(100);
            entry.set_lba_len(50);
            entry.set_bootable(false);
        }

        assert_eq!(bytes[TYPE_OFFSET], 0x8E);
        assert_eq!(bytes[BOOTABLE_OFFSET], 0x00);
        assert_eq!(&bytes[LBA_START_OFFSET..LBA_START_OFFSET + 4], &[100, 0, 0, 0]);
        assert_eq!(&bytes[LBA_LEN_OFFSET..LBA_LEN_OFFSET + 4], &[50, 0, 0, 0]);
        assert_eq!(&bytes[1..4], &[0x20, 0x21, 0x00]);
        assert_eq!(&bytes[5..8], &[0xFE, 0xFF, 0xFF]);
    }

    #[test]
    fn test_boot_flag_only_0x80_is_bootable() {
        let mut bytes = sample_entry();
        bytes[BOOTABLE_OFFSET] = 0x81;
        let entry = PartitionEntry::new(1, &bytes[..]);
        assert!(!entry.is_bootable());
        assert_eq!(entry.boot_flag(), 0x81);
    }

    #[test]
    fn test_lba_last_at_upper_bound() {
        let mut bytes = [0u8; ENTRY_SIZE];
        let mut entry = PartitionEntry::new(1, &mut bytes[..]);
        entry.set_lba_start(1);
        entry.set_lba_len(u32::MAX - 1);
        assert_eq!(entry.lba_last().unwrap(), u32::MAX - 1);

        entry.set_lba_len(u32::MAX);
        assert_eq!(entry.lba_last().unwrap(), u32::MAX);
    }

    #[test]
    fn test_lba_last_overflow_is_an_error() {
        let mut bytes = [0u8; ENTRY_SIZE];
        let mut entry = PartitionEntry::new(3, &mut bytes[..]);
        entry.set_lba_start(2);
        entry.set_lba_len(u32::MAX);

        assert!(matches!(
            entry.lba_last(),
            Err(Error::SectorAddressOverflow { partition: 3 })
        ));
    }

    #[test]
    fn test_lba_last_of_zeroed_entry_is_an_error() {
        let bytes = [0u8; ENTRY_SIZE];
        let entry = PartitionEntry::new(4, &bytes[..]);
        assert!(entry.lba_last().is_err());
    }

    #[test]
    fn test_clear() {
        let mut bytes = sample_entry();
        PartitionEntry::new(1, &mut bytes[..]).clear();

        let entry = PartitionEntry::new(1, &bytes[..]);
        assert!(entry.is_empty());
        assert!(!entry.is_bootable());
        assert_eq!(entry.lba_start(), 0);
        assert_eq!(entry.lba_len(), 0);
        assert_eq!(&bytes[1..4], &[0x20, 0x21, 0x00]);
    }
}
