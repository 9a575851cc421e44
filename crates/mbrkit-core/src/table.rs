//! The 512-byte MBR sector image

use crate::entry::{PartitionEntry, PartitionMut, PartitionRef, ENTRY_SIZE};
use crate::error::{Error, Result};
use std::fmt;
use std::io::{ErrorKind, Read, Write};

/// Master Boot Record
///
/// Owns the whole sector image. Boot code and CHS fields are carried through
/// unchanged; only the boot indicator, type, LBA fields and signature are
/// interpreted.
///
/// # Structure
///
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0x000   446   Bootstrap code
/// 0x1BE   16    Partition entry 1
/// 0x1CE   16    Partition entry 2
/// 0x1DE   16    Partition entry 3
/// 0x1EE   16    Partition entry 4
/// 0x1FE   2     Boot signature (0x55 0xAA)
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct MasterBootRecord {
    bytes: [u8; Self::MBR_SIZE],
}

impl MasterBootRecord {
    /// Size of the MBR in bytes, whatever the sector size of the medium
    pub const MBR_SIZE: usize = 512;

    /// Size of the bootstrap code area
    pub const BOOT_CODE_SIZE: usize = 446;

    /// Offset of the first partition entry
    pub const PARTITION_TABLE_OFFSET: usize = 0x1BE;

    /// Offset of the boot signature
    pub const SIGNATURE_OFFSET: usize = 0x1FE;

    /// The two signature bytes
    pub const SIGNATURE: [u8; 2] = [0x55, 0xAA];

    /// Number of partition entries in MBR
    pub const NUM_PARTITIONS: usize = 4;

    /// A zeroed sector with a valid signature and four empty entries
    pub fn new() -> Self {
        let mut mbr = Self::from_bytes([0u8; Self::MBR_SIZE]);
        mbr.fix_signature();
        mbr
    }

    /// Wrap an existing sector image without validating it
    pub fn from_bytes(bytes: [u8; Self::MBR_SIZE]) -> Self {
        Self { bytes }
    }

    /// Read an MBR from a byte source
    ///
    /// Always returns the table, even when reading or validation failed, so the
    /// caller can inspect or repair it. Bytes that could not be read are left
    /// zeroed.
    ///
    /// # Errors
    ///
    /// The second element is:
    /// - [`Error::ShortRead`] if the source ends before 512 bytes
    /// - [`Error::Io`] if the source fails
    /// - otherwise the result of [`check`](Self::check)
    pub fn read<R: Read + ?Sized>(source: &mut R) -> (Self, Result<()>) {
        let mut mbr = Self::from_bytes([0u8; Self::MBR_SIZE]);

        let mut filled = 0;
        while filled < Self::MBR_SIZE {
            match source.read(&mut mbr.bytes[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return (mbr, Err(Error::Io(e))),
            }
        }

        if filled < Self::MBR_SIZE {
            tracing::debug!("MBR read stopped after {} bytes", filled);
            return (
                mbr,
                Err(Error::ShortRead {
                    expected: Self::MBR_SIZE,
                    actual: filled,
                }),
            );
        }

        let result = mbr.check();
        if let Err(ref e) = result {
            tracing::debug!("MBR read but failed validation: {}", e);
        }
        (mbr, result)
    }

    /// Read an MBR and discard it unless it is valid
    pub fn read_checked<R: Read + ?Sized>(source: &mut R) -> Result<Self> {
        let (mbr, result) = Self::read(source);
        result.map(|()| mbr)
    }

    /// Write all 512 bytes to a byte sink
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShortWrite`] if the sink stops accepting bytes before the
    /// whole sector is written.
    pub fn write<W: Write + ?Sized>(&self, sink: &mut W) -> Result<()> {
        let mut written = 0;
        while written < Self::MBR_SIZE {
            match sink.write(&self.bytes[written..]) {
                Ok(0) => {
                    return Err(Error::ShortWrite {
                        expected: Self::MBR_SIZE,
                        actual: written,
                    })
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        sink.flush()?;
        Ok(())
    }

    /// Overwrite the signature with 0x55 0xAA
    pub fn fix_signature(&mut self) {
        self.bytes[Self::SIGNATURE_OFFSET..].copy_from_slice(&Self::SIGNATURE);
    }

    pub fn signature(&self) -> [u8; 2] {
        [
            self.bytes[Self::SIGNATURE_OFFSET],
            self.bytes[Self::SIGNATURE_OFFSET + 1],
        ]
    }

    pub fn has_valid_signature(&self) -> bool {
        self.signature() == Self::SIGNATURE
    }

    /// The opaque bootstrap code
    pub fn boot_code(&self) -> &[u8] {
        &self.bytes[..Self::BOOT_CODE_SIZE]
    }

    /// The whole sector image
    pub fn as_bytes(&self) -> &[u8; Self::MBR_SIZE] {
        &self.bytes
    }

    fn entry_range(num: usize) -> Option<std::ops::Range<usize>> {
        if !(1..=Self::NUM_PARTITIONS).contains(&num) {
            return None;
        }
        let start = Self::PARTITION_TABLE_OFFSET + (num - 1) * ENTRY_SIZE;
        Some(start..start + ENTRY_SIZE)
    }

    /// View of partition `num` (1-4), or `None` for any other number
    pub fn partition(&self, num: usize) -> Option<PartitionRef<'_>> {
        let range = Self::entry_range(num)?;
        Some(PartitionEntry::new(num, &self.bytes[range]))
    }

    /// Mutable view of partition `num` (1-4), or `None` for any other number
    pub fn partition_mut(&mut self, num: usize) -> Option<PartitionMut<'_>> {
        let range = Self::entry_range(num)?;
        Some(PartitionEntry::new(num, &mut self.bytes[range]))
    }

    /// Like [`partition`](Self::partition), with out-of-range numbers as an error
    pub fn entry(&self, num: usize) -> Result<PartitionRef<'_>> {
        self.partition(num).ok_or(Error::InvalidPartitionNumber(num))
    }

    /// Like [`partition_mut`](Self::partition_mut), with out-of-range numbers as an error
    pub fn entry_mut(&mut self, num: usize) -> Result<PartitionMut<'_>> {
        self.partition_mut(num).ok_or(Error::InvalidPartitionNumber(num))
    }

    fn entries_region(&self) -> &[u8] {
        let start = Self::PARTITION_TABLE_OFFSET;
        &self.bytes[start..start + Self::NUM_PARTITIONS * ENTRY_SIZE]
    }

    /// All four entries, numbered 1 through 4
    pub fn partitions(&self) -> Vec<PartitionRef<'_>> {
        self.entries_region()
            .chunks_exact(ENTRY_SIZE)
            .enumerate()
            .map(|(i, bytes)| PartitionEntry::new(i + 1, bytes))
            .collect()
    }

    /// Mutable iterator over all four entries, numbered 1 through 4
    pub fn partitions_mut(&mut self) -> impl Iterator<Item = PartitionMut<'_>> {
        let start = Self::PARTITION_TABLE_OFFSET;
        self.bytes[start..start + Self::NUM_PARTITIONS * ENTRY_SIZE]
            .chunks_exact_mut(ENTRY_SIZE)
            .enumerate()
            .map(|(i, bytes)| PartitionEntry::new(i + 1, bytes))
    }

    /// True if any entry is a GPT protective or hybrid GPT partition
    pub fn is_gpt(&self) -> bool {
        self.partitions()
            .iter()
            .any(|p| p.partition_type().is_gpt())
    }

    /// Validate signature, bounds, boot flags and overlaps
    ///
    /// Read-only; see [`crate::validate::check`].
    pub fn check(&self) -> Result<()> {
        crate::validate::check(self)
    }
}

impl Default for MasterBootRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MasterBootRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MasterBootRecord")
            .field("signature", &self.signature())
            .field("partitions", &self.partitions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PartitionType;
    use std::io::Cursor;

    /// Create a minimal valid MBR with one partition
    fn create_test_mbr() -> Vec<u8> {
        let mut mbr = vec![0u8; 512];

        // Some boot code
        mbr[0] = 0xEB;
        mbr[1] = 0x63;
        mbr[2] = 0x90;

        // Partition entry 1: FAT32 LBA, 2048 sectors starting at LBA 2048
        let entry_offset = 0x1BE;
        mbr[entry_offset] = 0x80; // Bootable
        mbr[entry_offset + 1] = 0x00; // CHS start (head)
        mbr[entry_offset + 2] = 0x02; // CHS start (sector/cyl)
        mbr[entry_offset + 3] = 0x00; // CHS start (cyl low)
        mbr[entry_offset + 4] = 0x0C; // Type: FAT32 LBA

        // LBA start: 2048
        mbr[entry_offset + 9] = 0x08;

        // LBA length: 2048
        mbr[entry_offset + 13] = 0x08;

        // Boot signature
        mbr[0x1FE] = 0x55;
        mbr[0x1FF] = 0xAA;

        mbr
    }

    #[test]
    fn test_read_valid_mbr() {
        let mut cursor = Cursor::new(create_test_mbr());
        let (mbr, result) = MasterBootRecord::read(&mut cursor);

        assert!(result.is_ok());
        let p = mbr.partition(1).unwrap();
        assert!(p.is_bootable());
        assert_eq!(p.partition_type(), PartitionType::Fat32Lba);
        assert_eq!(p.lba_start(), 2048);
        assert_eq!(p.lba_len(), 2048);
        assert!(mbr.partition(2).unwrap().is_empty());
        assert_eq!(&mbr.boot_code()[..3], &[0xEB, 0x63, 0x90]);
    }

    #[test]
    fn test_zeroed_sector_with_fixed_signature_is_valid() {
        let mut cursor = Cursor::new(vec![0u8; 512]);
        let (mut mbr, result) = MasterBootRecord::read(&mut cursor);

        assert!(matches!(result, Err(Error::BadSignature { .. })));
        mbr.fix_signature();
        assert!(mbr.check().is_ok());
        assert!(mbr.partitions().iter().all(|p| p.is_empty()));
        assert_eq!(mbr.as_bytes()[510], 0x55);
        assert_eq!(mbr.as_bytes()[511], 0xAA);
    }

    #[test]
    fn test_fix_signature_touches_only_signature() {
        let mut data = create_test_mbr();
        data[0x1FE] = 0x12;
        data[0x1FF] = 0x34;
        let (mut mbr, result) = MasterBootRecord::read(&mut Cursor::new(data.clone()));
        assert!(matches!(
            result,
            Err(Error::BadSignature { found: [0x12, 0x34] })
        ));

        mbr.fix_signature();
        assert!(mbr.check().is_ok());
        assert_eq!(&mbr.as_bytes()[..510], &data[..510]);
    }

    #[test]
    fn test_short_read_returns_table() {
        let mut cursor = Cursor::new(vec![0xAB; 100]);
        let (mbr, result) = MasterBootRecord::read(&mut cursor);

        assert!(matches!(
            result,
            Err(Error::ShortRead { expected: 512, actual: 100 })
        ));
        assert_eq!(mbr.as_bytes()[99], 0xAB);
        assert_eq!(mbr.as_bytes()[100], 0x00);
    }

    #[test]
    fn test_read_checked() {
        assert!(MasterBootRecord::read_checked(&mut Cursor::new(create_test_mbr())).is_ok());
        assert!(MasterBootRecord::read_checked(&mut Cursor::new(vec![0u8; 512])).is_err());
    }

    #[test]
    fn test_write_round_trip() {
        let data = create_test_mbr();
        let mbr = MasterBootRecord::read_checked(&mut Cursor::new(data.clone())).unwrap();

        let mut sink = Vec::new();
        mbr.write(&mut sink).unwrap();
        assert_eq!(sink, data);

        let reread = MasterBootRecord::read_checked(&mut Cursor::new(sink)).unwrap();
        for (a, b) in mbr.partitions().iter().zip(reread.partitions().iter()) {
            assert_eq!(a.partition_type(), b.partition_type());
            assert_eq!(a.lba_start(), b.lba_start());
            assert_eq!(a.lba_len(), b.lba_len());
            assert_eq!(a.is_bootable(), b.is_bootable());
        }
    }

    #[test]
    fn test_short_write() {
        let mbr = MasterBootRecord::new();
        let mut buf = [0u8; 200];
        let mut sink = Cursor::new(&mut buf[..]);

        assert!(matches!(
            mbr.write(&mut sink),
            Err(Error::ShortWrite { expected: 512, actual: 200 })
        ));
    }

    #[test]
    fn test_partition_numbering() {
        let mbr = MasterBootRecord::new();
        assert!(mbr.partition(0).is_none());
        assert!(mbr.partition(5).is_none());
        assert!(matches!(mbr.entry(5), Err(Error::InvalidPartitionNumber(5))));

        let numbers: Vec<usize> = mbr.partitions().iter().map(|p| p.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_mutation_through_view_is_visible_in_table() {
        let mut mbr = MasterBootRecord::new();
        {
            let mut p = mbr.partition_mut(3).unwrap();
            p.set_partition_type(PartitionType::LinuxSwap);
            p.set_lba_start(0x0102_0304);
        }

        let offset = MasterBootRecord::PARTITION_TABLE_OFFSET + 2 * ENTRY_SIZE;
        assert_eq!(mbr.as_bytes()[offset + 4], 0x82);
        assert_eq!(&mbr.as_bytes()[offset + 8..offset + 12], &[4, 3, 2, 1]);
        assert_eq!(mbr.partition(3).unwrap().lba_start(), 0x0102_0304);
    }

    #[test]
    fn test_partitions_mut() {
        let mut mbr = MasterBootRecord::new();
        for mut p in mbr.partitions_mut() {
            let n = p.number() as u32;
            p.set_partition_type(PartitionType::LinuxNative);
            p.set_lba_start(n * 1000);
            p.set_lba_len(10);
        }

        assert!(mbr.check().is_ok());
        assert_eq!(mbr.partition(4).unwrap().lba_start(), 4000);
    }

    #[test]
    fn test_is_gpt() {
        let mut mbr = MasterBootRecord::new();
        assert!(!mbr.is_gpt());

        mbr.partition_mut(2)
            .unwrap()
            .set_partition_type(PartitionType::HybridGpt);
        assert!(mbr.is_gpt());

        mbr.partition_mut(2).unwrap().set_partition_type(PartitionType::Gpt);
        assert!(mbr.is_gpt());
    }
}
