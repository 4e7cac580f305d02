//! Media inventory builder for vidupe.
//!
//! Walks a directory tree with jwalk and collects every regular file whose
//! extension is in the configured set. Traversal is sorted so the resulting
//! inventory order, and therefore every greedy clustering downstream, is
//! reproducible between runs.
//!
//! # Example
//!
//! ```rust,no_run
//! use vidupe_scan::{InventoryConfig, InventoryScanner};
//!
//! let config = InventoryConfig::new("/path/to/videos");
//! let inventory = InventoryScanner::new().scan(&config).unwrap();
//!
//! println!("{} videos, {} bytes", inventory.len(), inventory.total_size());
//! ```

mod scanner;

pub use scanner::InventoryScanner;

// Re-export core types for convenience
pub use vidupe_core::{
    FileWarning, Inventory, InventoryConfig, InventoryError, InventoryStats, MediaFile,
    WarningKind,
};
