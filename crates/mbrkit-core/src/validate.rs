//! Structural and semantic consistency checks for an MBR

use crate::entry::{PartitionRef, BOOTABLE, NON_BOOTABLE};
use crate::error::{Error, Result};
use crate::table::MasterBootRecord;
use crate::types::PartitionType;

/// Largest sector address an MBR entry can express
pub const MAX_SECTOR: u64 = 0xFFFF_FFFF;

/// Run every rule and stop at the first failure
///
/// Rules, in order:
/// 1. The signature is 0x55 0xAA.
/// 2. For each non-empty entry, in slot order:
///    - `start + len` stays within 32 bits, except for a GPT protective entry
///      in slot 1 ending exactly at 2^32 (the 0xFFFFFFFF length most GPT
///      partitioners write);
///    - the boot indicator is 0x00 or 0x80;
///    - its start sector does not fall strictly inside another non-empty entry.
///
/// Two entries with the same start sector are not reported by the overlap
/// rule. Some producers write such tables and rely on it being accepted.
pub fn check(mbr: &MasterBootRecord) -> Result<()> {
    check_signature(mbr)?;

    let partitions = mbr.partitions();
    for l in partitions.iter().filter(|p| !p.is_empty()) {
        check_bounds(l)?;
        check_boot_flag(l)?;
        for r in partitions.iter().filter(|p| !p.is_empty()) {
            check_intersection(l, r)?;
        }
    }

    Ok(())
}

/// Run every rule and collect all failures instead of stopping at the first
///
/// An empty result means [`check`] succeeds.
pub fn diagnose(mbr: &MasterBootRecord) -> Vec<Error> {
    let mut findings = Vec::new();
    if let Err(e) = check_signature(mbr) {
        findings.push(e);
    }

    let partitions = mbr.partitions();
    for l in partitions.iter().filter(|p| !p.is_empty()) {
        if let Err(e) = check_bounds(l) {
            findings.push(e);
        }
        if let Err(e) = check_boot_flag(l) {
            findings.push(e);
        }
        for r in partitions.iter().filter(|p| !p.is_empty()) {
            if let Err(e) = check_intersection(l, r) {
                findings.push(e);
            }
        }
    }

    findings
}

fn check_signature(mbr: &MasterBootRecord) -> Result<()> {
    if !mbr.has_valid_signature() {
        return Err(Error::BadSignature {
            found: mbr.signature(),
        });
    }
    Ok(())
}

/// True for the conventional protective entry that ends one past the last sector
fn is_protective_exception(p: &PartitionRef<'_>, end: u64) -> bool {
    p.number() == 1 && p.partition_type() == PartitionType::Gpt && end == MAX_SECTOR + 1
}

fn check_bounds(p: &PartitionRef<'_>) -> Result<()> {
    let end = u64::from(p.lba_start()) + u64::from(p.lba_len());
    if end > MAX_SECTOR && !is_protective_exception(p, end) {
        return Err(Error::LastSectorTooHigh {
            partition: p.number(),
            last: end,
        });
    }
    Ok(())
}

fn check_boot_flag(p: &PartitionRef<'_>) -> Result<()> {
    let value = p.boot_flag();
    if value != BOOTABLE && value != NON_BOOTABLE {
        return Err(Error::BadBootFlag {
            partition: p.number(),
            value,
        });
    }
    Ok(())
}

/// Fails if the start of `l` lies strictly inside `r`
fn check_intersection(l: &PartitionRef<'_>, r: &PartitionRef<'_>) -> Result<()> {
    if l.number() == r.number() {
        return Ok(());
    }

    let l_start = u64::from(l.lba_start());
    let r_start = u64::from(r.lba_start());
    let r_end = r_start + u64::from(r.lba_len());
    if l_start > r_start && l_start < r_end {
        return Err(Error::PartitionsIntersect {
            first: l.number(),
            second: r.number(),
        });
    }
    Ok(())
}
