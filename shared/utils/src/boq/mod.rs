//! BOQ (Bill of Quantities) worksheet reading.
//!
//! Pure stages of the SPK import: grid loading, label extraction, date
//! normalization, hierarchy parsing and budget aggregation.

pub mod budget;
pub mod dates;
pub mod document;
pub mod grid;
pub mod hierarchy;
pub mod labels;

pub use budget::{BudgetAggregator, BudgetSummary, ExplicitTotal};
pub use dates::{from_serial, DateInput, DateNormalizer};
pub use document::{BoqDocument, RequiredMetadata, WorkOrderMetadata};
pub use grid::{parse_number, Cell, Grid, GridLoader, SpreadsheetFormat};
pub use hierarchy::{BoqItemRow, ColumnMap, HierarchyParser, HierarchyState, ParsedBoq, RowClass, RowDecision};
pub use labels::{LabelExtractor, Strategy};
