//! Subcommand implementations

use crate::device::{Device, DeviceConfig};
use anyhow::{bail, Context, Result};
use mbrkit_core::{
    GrowOutcome, GrowRequest, MasterBootRecord, PartitionType, ProtectiveType, TableReport,
};
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

/// Exit status of `extend` when the partition was already as large as it can get
const EXIT_ALREADY_MAX: u8 = 1;

/// Exit status of `extend` on any failure
const EXIT_EXTEND_ERROR: u8 = 2;

/// Bytes per unit of the `+SIZE` argument to `extend`
const GIB: u64 = 1024 * 1024 * 1024;

/// Read an MBR, logging rather than failing on validation errors
fn read_lenient(device: &mut Device) -> Result<MasterBootRecord> {
    let (mbr, result) = device.read_mbr()?;
    if let Err(e) = result {
        tracing::warn!("{}: {}", device.path().display(), e);
    }
    Ok(mbr)
}

fn commit(device: &mut Device, mbr: &MasterBootRecord, dry_run: bool) -> Result<()> {
    if dry_run {
        tracing::info!("Dry run, not writing {}", device.path().display());
        return Ok(());
    }
    device.write_mbr(mbr)
}

pub fn cmd_dump(image: &Path, config: DeviceConfig, raw: bool) -> Result<ExitCode> {
    let mut device = Device::open(image, config)?;
    let mbr = read_lenient(&mut device)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if raw {
        mbr.write(&mut out)
            .context("Error while writing MBR to stdout")?;
        return Ok(ExitCode::SUCCESS);
    }

    for (i, chunk) in mbr.as_bytes().chunks(16).enumerate() {
        writeln!(out, "{:04X}: {}", i * 16, hex::encode(chunk))?;
    }
    Ok(ExitCode::SUCCESS)
}

pub fn cmd_info(image: &Path, config: DeviceConfig, json: bool) -> Result<ExitCode> {
    let mut device = Device::open(image, config)?;
    let mbr = read_lenient(&mut device)?;
    let report = TableReport::from_table(&mbr, device.sector_size());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(ExitCode::SUCCESS);
    }

    println!("=== Master Boot Record ===");
    println!("Path:        {}", image.display());
    println!("Size:        {}", format_bytes(device.length()));
    println!("Sector size: {}", report.sector_size);
    println!(
        "Signature:   {:02X} {:02X} ({})",
        report.signature[0],
        report.signature[1],
        if report.signature_valid { "valid" } else { "invalid" }
    );
    println!();

    if report.partitions.is_empty() {
        println!("No partitions found.");
    } else {
        println!(
            "{:<3} {:<5} {:<24} {:<12} {:<12} {:<12}",
            "#", "Boot", "Type", "Start", "Sectors", "Size"
        );
        println!("{}", "-".repeat(72));

        for p in &report.partitions {
            println!(
                "{:<3} {:<5} {:<24} {:<12} {:<12} {:<12}",
                p.number,
                if p.bootable { "*" } else { "" },
                format!("{} ({:02X})", p.type_name, p.type_byte),
                p.lba_start,
                p.lba_len,
                format_bytes(p.size)
            );
        }
    }

    if report.is_gpt {
        println!();
        println!("Note: This disk has a GPT protective or hybrid MBR.");
    }

    if !report.is_valid() {
        println!();
        println!("Problems:");
        for problem in &report.problems {
            println!("  {}", problem);
        }
    }

    Ok(ExitCode::SUCCESS)
}

pub fn cmd_check(image: &Path, config: DeviceConfig) -> Result<ExitCode> {
    let mut device = Device::open(image, config)?;
    let (_, result) = device.read_mbr()?;

    match result {
        Ok(()) => {
            println!("OK");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("{}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

pub fn cmd_fix_signature(image: &Path, config: DeviceConfig, dry_run: bool) -> Result<ExitCode> {
    let mut device = Device::open(image, config.writable())?;
    let mut mbr = read_lenient(&mut device)?;

    if mbr.has_valid_signature() {
        println!("Signature already valid");
        return Ok(ExitCode::SUCCESS);
    }

    mbr.fix_signature();
    if let Err(e) = mbr.check() {
        tracing::warn!("Signature fixed but the table is still invalid: {}", e);
    }
    commit(&mut device, &mbr, dry_run)?;
    println!("Signature fixed");
    Ok(ExitCode::SUCCESS)
}

pub fn cmd_protect(
    image: &Path,
    config: DeviceConfig,
    disk_size: Option<u64>,
    mode: ProtectiveType,
    dry_run: bool,
) -> Result<ExitCode> {
    let mut device = Device::open(image, config.writable())?;
    let mut mbr = read_lenient(&mut device)?;
    let disk_size = disk_size.unwrap_or(device.length());

    mbr.make_protective(device.sector_size(), disk_size, mode)?;
    commit(&mut device, &mbr, dry_run)?;

    let p = mbr.entry(1)?;
    println!(
        "Protective MBR written: start {}, length {:#X} sectors ({})",
        p.lba_start(),
        p.lba_len(),
        mode
    );
    Ok(ExitCode::SUCCESS)
}

/// Field changes for one entry
#[derive(Debug, Default)]
pub struct EntryEdit {
    pub partition_type: Option<u8>,
    pub start: Option<u32>,
    pub len: Option<u32>,
    pub bootable: Option<bool>,
}

pub fn cmd_set(
    image: &Path,
    config: DeviceConfig,
    num: usize,
    edit: EntryEdit,
    dry_run: bool,
) -> Result<ExitCode> {
    let mut device = Device::open(image, config.writable())?;
    let mut mbr = read_lenient(&mut device)?;

    {
        let mut p = mbr.entry_mut(num)?;
        if let Some(t) = edit.partition_type {
            p.set_partition_type(PartitionType::from_byte(t));
        }
        if let Some(start) = edit.start {
            p.set_lba_start(start);
        }
        if let Some(len) = edit.len {
            p.set_lba_len(len);
        }
        if let Some(bootable) = edit.bootable {
            p.set_bootable(bootable);
        }
    }

    mbr.check()
        .context("Refusing to write an invalid partition table")?;
    commit(&mut device, &mbr, dry_run)?;

    let report = TableReport::from_table(&mbr, device.sector_size());
    match report.partitions.iter().find(|p| p.number == num) {
        Some(p) => println!("{}", p),
        None => println!("Partition {} is now empty", num),
    }
    Ok(ExitCode::SUCCESS)
}

/// Parse the optional `+SIZE` argument of `extend` (whole GiB)
pub fn parse_grow_size(arg: &str) -> Result<u64> {
    let digits = match arg.strip_prefix('+') {
        Some(d) => d,
        None => bail!("size must look like +N (N in GB), got {:?}", arg),
    };
    let gib: u64 = digits
        .parse()
        .with_context(|| format!("bad size {:?}", arg))?;
    gib.checked_mul(GIB)
        .with_context(|| format!("size {:?} is too large", arg))
}

fn extend(
    device_path: &Path,
    config: DeviceConfig,
    num: usize,
    size: Option<&str>,
    dry_run: bool,
) -> Result<GrowOutcome> {
    let mut device = Device::open(device_path, config.writable())?;
    let (mut mbr, result) = device.read_mbr()?;
    result.context("Partition table is not valid")?;

    let request = match size {
        Some(arg) => GrowRequest::BySectors(parse_grow_size(arg)? / u64::from(device.sector_size())),
        None => GrowRequest::ToMax,
    };

    let outcome = mbr.grow_partition(num, device.disk_sectors()?, request)?;
    if let GrowOutcome::Grown { .. } = outcome {
        commit(&mut device, &mbr, dry_run)?;
    }
    Ok(outcome)
}

/// Partition extender
///
/// Output protocol for scripts:
///
/// ```text
/// exit 0, "OK"            partition was extended
/// exit 1, "ALREADY_MAX"   partition already has its max size (autoresize only)
/// exit 2, "ERR\n<msg>"    partition can't be extended
/// ```
pub fn cmd_extend(
    device_path: &Path,
    config: DeviceConfig,
    num: usize,
    size: Option<&str>,
    dry_run: bool,
) -> ExitCode {
    match extend(device_path, config, num, size, dry_run) {
        Ok(GrowOutcome::Grown { .. }) => {
            println!("OK");
            ExitCode::SUCCESS
        }
        Ok(GrowOutcome::AlreadyMax) => {
            println!("ALREADY_MAX");
            ExitCode::from(EXIT_ALREADY_MAX)
        }
        Err(e) => {
            println!("ERR\n{:#}", e);
            ExitCode::from(EXIT_EXTEND_ERROR)
        }
    }
}

/// Parse a partition type byte given as hex, with or without `0x`
pub fn parse_type_byte(s: &str) -> std::result::Result<u8, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u8::from_str_radix(digits, 16).map_err(|e| format!("invalid type byte {:?}: {}", s, e))
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1_048_576 {
        format!("{:.2} KB", bytes as f64 / 1024.0)
    } else if bytes < 1_073_741_824 {
        format!("{:.2} MB", bytes as f64 / 1_048_576.0)
    } else {
        format!("{:.2} GB", bytes as f64 / 1_073_741_824.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn image(mbr: &MasterBootRecord, sectors: usize) -> NamedTempFile {
        let mut tmpfile = NamedTempFile::new().unwrap();
        let mut data = vec![0u8; sectors * 512];
        data[..512].copy_from_slice(mbr.as_bytes());
        tmpfile.write_all(&data).unwrap();
        tmpfile.flush().unwrap();
        tmpfile
    }

    fn read_back(tmpfile: &NamedTempFile) -> MasterBootRecord {
        let mut device = Device::open(tmpfile.path(), DeviceConfig::default()).unwrap();
        device.read_mbr().unwrap().0
    }

    fn one_linux_partition() -> MasterBootRecord {
        let mut mbr = MasterBootRecord::new();
        let mut p = mbr.partition_mut(1).unwrap();
        p.set_partition_type(PartitionType::LinuxNative);
        p.set_lba_start(64);
        p.set_lba_len(100);
        mbr
    }

    #[test]
    fn test_parse_grow_size() {
        assert_eq!(parse_grow_size("+10").unwrap(), 10 * GIB);
        assert!(parse_grow_size("10").is_err());
        assert!(parse_grow_size("+ten").is_err());
        assert!(parse_grow_size("+99999999999999").is_err());
    }

    #[test]
    fn test_parse_type_byte() {
        assert_eq!(parse_type_byte("0xEE").unwrap(), 0xEE);
        assert_eq!(parse_type_byte("83").unwrap(), 0x83);
        assert!(parse_type_byte("0x100").is_err());
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(2 * 1_048_576), "2.00 MB");
    }

    #[test]
    fn test_extend_to_max() {
        let tmpfile = image(&one_linux_partition(), 1024);
        let outcome = extend(tmpfile.path(), DeviceConfig::default(), 1, None, false).unwrap();

        assert_eq!(
            outcome,
            GrowOutcome::Grown {
                old_len: 100,
                new_len: 1024 - 64
            }
        );
        assert_eq!(read_back(&tmpfile).partition(1).unwrap().lba_len(), 960);

        let again = extend(tmpfile.path(), DeviceConfig::default(), 1, None, false).unwrap();
        assert_eq!(again, GrowOutcome::AlreadyMax);
    }

    #[test]
    fn test_extend_dry_run_does_not_write() {
        let tmpfile = image(&one_linux_partition(), 1024);
        extend(tmpfile.path(), DeviceConfig::default(), 1, None, true).unwrap();
        assert_eq!(read_back(&tmpfile).partition(1).unwrap().lba_len(), 100);
    }

    #[test]
    fn test_extend_by_more_than_disk_fails() {
        let tmpfile = image(&one_linux_partition(), 1024);
        let result = extend(tmpfile.path(), DeviceConfig::default(), 1, Some("+1"), false);
        assert!(result.unwrap_err().to_string().contains("can't be extended"));
        assert_eq!(read_back(&tmpfile).partition(1).unwrap().lba_len(), 100);
    }

    #[test]
    fn test_protect_uses_image_length() {
        let tmpfile = image(&one_linux_partition(), 4096);
        cmd_protect(
            tmpfile.path(),
            DeviceConfig::default(),
            None,
            ProtectiveType::DiskSize,
            false,
        )
        .unwrap();

        let mbr = read_back(&tmpfile);
        assert!(mbr.is_gpt());
        assert_eq!(mbr.partition(1).unwrap().lba_len(), 4095);
        assert!(mbr.partition(2).unwrap().is_empty());
    }

    #[test]
    fn test_protect_rejects_uneven_disk_size() {
        let tmpfile = image(&one_linux_partition(), 16);
        let result = cmd_protect(
            tmpfile.path(),
            DeviceConfig::default(),
            Some(1000),
            ProtectiveType::DiskSize,
            false,
        );
        assert!(result.is_err());
        assert_eq!(read_back(&tmpfile), one_linux_partition());
    }

    #[test]
    fn test_fix_signature() {
        let mut bytes = *one_linux_partition().as_bytes();
        bytes[510] = 0;
        bytes[511] = 0;
        let tmpfile = image(&MasterBootRecord::from_bytes(bytes), 16);

        cmd_fix_signature(tmpfile.path(), DeviceConfig::default(), false).unwrap();
        assert_eq!(read_back(&tmpfile), one_linux_partition());
    }

    #[test]
    fn test_set_refuses_invalid_result() {
        let tmpfile = image(&one_linux_partition(), 1024);
        let edit = EntryEdit {
            partition_type: Some(0x82),
            start: Some(100),
            len: Some(10),
            bootable: None,
        };

        // Starts inside partition 1
        assert!(cmd_set(tmpfile.path(), DeviceConfig::default(), 2, edit, false).is_err());
        assert!(read_back(&tmpfile).partition(2).unwrap().is_empty());
    }

    #[test]
    fn test_set_writes_valid_edit() {
        let tmpfile = image(&one_linux_partition(), 1024);
        let edit = EntryEdit {
            partition_type: Some(0x82),
            start: Some(200),
            len: Some(10),
            bootable: Some(true),
        };

        cmd_set(tmpfile.path(), DeviceConfig::default(), 2, edit, false).unwrap();
        let mbr = read_back(&tmpfile);
        let p = mbr.partition(2).unwrap();
        assert_eq!(p.partition_type(), PartitionType::LinuxSwap);
        assert_eq!(p.lba_start(), 200);
        assert!(p.is_bootable());
    }
}
