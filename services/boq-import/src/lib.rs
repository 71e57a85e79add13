//! SPK BOQ import service.
//!
//! Turns a BOQ spreadsheet into a persisted work order plus any catalog
//! entries it references for the first time.

pub mod assembler;
pub mod importer;

pub use assembler::{Assembler, CreatedCounts};
pub use importer::{BoqImporter, ImportOutcome, ImportReport};
