//! # custody-audit
//!
//! Append-only chain-of-custody manifest and content hashing for Custody.
//!
//! Every file that passes integrity verification is recorded as a [`Record`]
//! in a CSV manifest. Each record carries the SHA-256 digest of the file as it
//! was when it was picked up, so the vault copy can be checked against it later.
//!
//! ## Quick Example
//!
//! ```rust,no_run
//! use custody_audit::{CustodyManifest, Record};
//!
//! let manifest = CustodyManifest::open("/tmp/forensic_manifest.csv").unwrap();
//! let record = Record::new("Recorder", "/tmp/input/evidence.txt", "e3b0c442...", 0);
//! manifest.append(&record).unwrap();
//! ```

pub mod error;
pub mod hasher;
pub mod manifest;
pub mod record;

pub use error::AuditError;
pub use manifest::CustodyManifest;
pub use record::{HashAlgorithm, Record};
