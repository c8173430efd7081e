//! Sequential composition of deltas for one case.
//!
//! Merging is only defined for deltas already ordered by real time: the right
//! operand happened after the left one. Under that ordering the operation is
//! associative, so a case's history can be folded in any grouping.

use crate::delta::Delta;
use crate::error::MergeError;

impl Delta {
    /// Applies `later` on top of `self`.
    ///
    /// Fails without touching `self` when the deltas belong to different cases,
    /// when `later` creates the case again, or when `self` is already closed.
    pub fn merge_in_place(&mut self, later: &Delta) -> Result<(), MergeError> {
        if let Err(err) = self.check_mergeable(later) {
            tracing::debug!(case_id = %self.case_id, error = %err, "rejected delta merge");
            return Err(err);
        }

        self.date_modified = later.date_modified;
        self.close = later.close;
        self.create |= later.create;

        overwrite(&mut self.case_type, &later.case_type);
        overwrite(&mut self.case_name, &later.case_name);
        overwrite(&mut self.date_opened, &later.date_opened);
        overwrite(&mut self.owner_id, &later.owner_id);

        self.update.extend(
            later
                .update
                .iter()
                .map(|(key, value)| (key.clone(), value.clone())),
        );
        self.index.extend(
            later
                .index
                .iter()
                .map(|(key, entry)| (key.clone(), entry.clone())),
        );
        self.attachment.extend(
            later
                .attachment
                .iter()
                .map(|(key, entry)| (key.clone(), entry.clone())),
        );

        tracing::trace!(
            case_id = %self.case_id,
            close = self.close,
            properties = self.update.len(),
            "merged delta"
        );
        Ok(())
    }

    /// Returns `self` followed by `later`, leaving both operands untouched.
    pub fn merge(&self, later: &Delta) -> Result<Delta, MergeError> {
        let mut merged = self.clone();
        merged.merge_in_place(later)?;
        Ok(merged)
    }

    fn check_mergeable(&self, later: &Delta) -> Result<(), MergeError> {
        if later.case_id != self.case_id {
            return Err(MergeError::CaseIdMismatch {
                left: self.case_id.clone(),
                right: later.case_id.clone(),
            });
        }
        if later.create {
            return Err(MergeError::DoubleCreate {
                case_id: self.case_id.clone(),
            });
        }
        if self.close {
            return Err(MergeError::AlreadyClosed {
                case_id: self.case_id.clone(),
            });
        }
        Ok(())
    }
}

fn overwrite<T: Clone>(slot: &mut Option<T>, later: &Option<T>) {
    if let Some(value) = later {
        *slot = Some(value.clone());
    }
}

/// Free-function form of [`Delta::merge`].
pub fn merge(left: &Delta, right: &Delta) -> Result<Delta, MergeError> {
    left.merge(right)
}

/// Folds a chronologically ordered sequence of deltas into one.
///
/// Returns `None` for an empty sequence and stops at the first failing merge.
pub fn merge_deltas<I>(deltas: I) -> Result<Option<Delta>, MergeError>
where
    I: IntoIterator<Item = Delta>,
{
    let mut deltas = deltas.into_iter();
    let Some(mut merged) = deltas.next() else {
        return Ok(None);
    };
    for delta in deltas {
        merged.merge_in_place(&delta)?;
    }
    Ok(Some(merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(hour: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2014, 1, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn failed_merge_leaves_left_untouched() {
        let mut left = Delta::new("a", at(1));
        left.update.insert("k".to_string(), "v".to_string());
        let snapshot = left.clone();

        let mut right = Delta::new("a", at(2));
        right.create = true;
        right.update.insert("k".to_string(), "w".to_string());

        assert!(left.merge_in_place(&right).is_err());
        assert_eq!(left, snapshot);
    }

    #[test]
    fn unset_special_property_keeps_left_value() {
        let mut left = Delta::new("a", at(1));
        left.owner_id = Some("o1".to_string());
        left.case_name = Some("n1".to_string());
        let mut right = Delta::new("a", at(2));
        right.case_name = Some("n2".to_string());

        let merged = left.merge(&right).unwrap();
        assert_eq!(merged.owner_id.as_deref(), Some("o1"));
        assert_eq!(merged.case_name.as_deref(), Some("n2"));
        assert_eq!(merged.date_modified, at(2));
    }

    #[test]
    fn case_id_is_checked_before_create() {
        let left = Delta::new("a", at(1));
        let mut right = Delta::new("b", at(2));
        right.create = true;
        assert!(matches!(
            left.merge(&right),
            Err(MergeError::CaseIdMismatch { .. })
        ));
    }

    #[test]
    fn merge_deltas_of_nothing_is_none() {
        assert_eq!(merge_deltas(Vec::new()), Ok(None));
    }
}
