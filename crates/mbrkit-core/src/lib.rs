//! # mbrkit core
//!
//! Model, validation and rewriting of the legacy Master Boot Record found at
//! sector 0 of a disk or disk image.
//!
//! - **Table**: the 512-byte sector image and its four partition entry views
//! - **Validate**: signature, bounds, boot flag and overlap checks
//! - **Protective**: building a GPT protective MBR
//! - **Grow**: extending a partition entry into the free space after it
//!
//! ## Example
//!
//! ```rust,no_run
//! use mbrkit_core::{MasterBootRecord, ProtectiveType};
//! use std::fs::File;
//!
//! let mut file = File::open("disk.img").unwrap();
//! let (mut mbr, result) = MasterBootRecord::read(&mut file);
//! if let Err(e) = result {
//!     println!("MBR is not valid: {}", e);
//! }
//!
//! for p in mbr.partitions().iter().filter(|p| !p.is_empty()) {
//!     println!("{}: {} @ {}", p.number(), p.partition_type(), p.lba_start());
//! }
//!
//! mbr.make_protective(512, 512 * 1_000_000, ProtectiveType::DiskSize).unwrap();
//! assert!(mbr.check().is_ok());
//! ```

pub mod codec;
pub mod entry;
pub mod error;
pub mod grow;
pub mod protective;
pub mod report;
pub mod security;
pub mod table;
pub mod types;
pub mod validate;

// Re-export commonly used items
pub use entry::{PartitionEntry, PartitionMut, PartitionRef};
pub use error::{Error, Result};
pub use grow::{GrowOutcome, GrowRequest};
pub use report::{PartitionReport, TableReport};
pub use table::MasterBootRecord;
pub use types::{PartitionType, ProtectiveType};
