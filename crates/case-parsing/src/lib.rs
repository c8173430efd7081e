//! Parsing and delta arithmetic for case transaction blocks.
//!
//! A case block (`<case>` in the transaction v2 dialect) is validated into a
//! [`Transaction`], projected onto a [`Delta`], and deltas for the same case
//! are merged in time order into one cumulative change.
//!
//! # Example
//!
//! ```
//! use case_parsing::{case_delta, merge_deltas, CASEXML_XMLNS};
//! use serde_json::json;
//!
//! let created = case_delta(json!({
//!     "@xmlns": CASEXML_XMLNS,
//!     "@case_id": "c1",
//!     "@date_modified": "2014-01-15T13:12:33.139-05",
//!     "create": {"case_type": "household", "case_name": "Smith"},
//! }))
//! .unwrap();
//! let closed = case_delta(json!({
//!     "@xmlns": CASEXML_XMLNS,
//!     "@case_id": "c1",
//!     "@date_modified": "2014-01-16T09:00:00Z",
//!     "close": "",
//! }))
//! .unwrap();
//!
//! let total = merge_deltas([created, closed]).unwrap().unwrap();
//! assert!(total.create && total.close);
//! assert_eq!(total.case_name.as_deref(), Some("Smith"));
//! ```

pub mod api;
pub mod codec;
pub mod delta;
pub mod error;
pub mod merge;
pub mod model;
pub mod projection;
pub mod schema;

pub use api::{
    case_delta, case_delta_all, parse_casexml, parse_casexml_json, parse_casexml_string,
    parse_casexml_string_with, parse_casexml_tree, CaseInput,
};
pub use case_xml::ConvertOptions;
pub use delta::{Delta, DeltaAttachmentEntry, DeltaIndexEntry, SPECIAL_PROPERTIES};
pub use error::{CaseError, MergeError, ParsingError, TimestampError, ValidationError};
pub use merge::{merge, merge_deltas};
pub use model::{
    AttachmentEntry, CreateAction, IndexEntry, Relationship, SourceType, Transaction,
    UpdateAction, CASEXML_XMLNS,
};
pub use projection::{project, CaseTransaction, TransactionView};
