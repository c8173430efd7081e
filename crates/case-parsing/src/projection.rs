//! Projection of a transaction onto a [`Delta`].

use chrono::NaiveDateTime;
use indexmap::IndexMap;

use crate::delta::{Delta, DeltaAttachmentEntry, DeltaIndexEntry};
use crate::model::{AttachmentEntry, CreateAction, IndexEntry, Transaction, UpdateAction};

/// Borrowed view of the parts of a transaction that projection reads.
#[derive(Debug, Clone, Copy)]
pub struct TransactionView<'a> {
    pub case_id: &'a str,
    pub date_modified: NaiveDateTime,
    pub close: bool,
    pub create: Option<&'a CreateAction>,
    pub update: &'a UpdateAction,
    pub index: &'a IndexMap<String, IndexEntry>,
    pub attachment: &'a IndexMap<String, AttachmentEntry>,
}

/// Anything that can be projected: a case block of some schema version.
pub trait CaseTransaction {
    fn view(&self) -> TransactionView<'_>;
}

impl CaseTransaction for Transaction {
    fn view(&self) -> TransactionView<'_> {
        TransactionView {
            case_id: &self.case_id,
            date_modified: self.date_modified,
            close: self.close(),
            create: self.create.as_ref(),
            update: &self.update,
            index: &self.index,
            attachment: &self.attachment,
        }
    }
}

/// Computes the delta of a single transaction.
///
/// Update values win over create values. `date_opened` falls back to the
/// transaction's own `date_modified` when the transaction creates the case.
pub fn project<T: CaseTransaction + ?Sized>(transaction: &T) -> Delta {
    let view = transaction.view();
    let create = view.create;
    let update = view.update;

    let delta = Delta {
        case_id: view.case_id.to_string(),
        date_modified: view.date_modified,
        create: create.is_some(),
        close: view.close,

        case_type: update
            .case_type
            .clone()
            .or_else(|| create.map(|c| c.case_type.clone())),
        case_name: update
            .case_name
            .clone()
            .or_else(|| create.map(|c| c.case_name.clone())),
        date_opened: update
            .date_opened
            .or_else(|| create.map(|_| view.date_modified)),
        owner_id: update
            .owner_id
            .clone()
            .or_else(|| create.and_then(|c| c.owner_id.clone())),

        update: update.properties.clone(),
        index: view
            .index
            .iter()
            .map(|(name, entry)| (name.clone(), DeltaIndexEntry::from(entry)))
            .collect(),
        attachment: view
            .attachment
            .iter()
            .map(|(name, entry)| (name.clone(), DeltaAttachmentEntry::from(entry)))
            .collect(),
    };
    tracing::trace!(
        case_id = %delta.case_id,
        create = delta.create,
        close = delta.close,
        properties = delta.update.len(),
        "projected case block"
    );
    delta
}

impl Transaction {
    pub fn to_delta(&self) -> Delta {
        project(self)
    }
}

impl From<&Transaction> for Delta {
    fn from(transaction: &Transaction) -> Self {
        project(transaction)
    }
}

impl From<&IndexEntry> for DeltaIndexEntry {
    fn from(entry: &IndexEntry) -> Self {
        Self {
            case_type: entry.case_type.clone(),
            relationship: entry.relationship,
            case_id: entry.case_id.clone(),
        }
    }
}

impl From<&AttachmentEntry> for DeltaAttachmentEntry {
    fn from(entry: &AttachmentEntry) -> Self {
        Self {
            src: entry.src.clone(),
            src_type: entry.src_type,
            name: entry.name.clone(),
            data: entry.data().map(<[u8]>::to_vec),
        }
    }
}
