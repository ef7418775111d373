//! Chunking key selection.

use sift_core::{ColumnType, Index, Table};

/// Pick the index used to split `table` into ranges.
///
/// Returns the chosen index and whether it is a safe unique key (primary key
/// or unique index without nullable columns). Indexes starting with an `ENUM`
/// column are never chosen: enum values sort by ordinal but compare as strings
/// in range predicates.
pub fn select_index(table: &Table) -> (Option<&Index>, bool) {
    if let Some(primary) = table.primary_key.as_ref().filter(|i| is_safe(i)) {
        return (Some(primary), true);
    }

    if let Some(index) = best_of(&table.primary_key_equivalents) {
        return (Some(index), true);
    }

    if let Some(index) = best_of(&table.unique_keys) {
        return (Some(index), false);
    }

    (None, false)
}

fn is_safe(index: &Index) -> bool {
    index
        .columns
        .first()
        .is_some_and(|c| c.column_type != ColumnType::Enum)
}

fn best_of(candidates: &[Index]) -> Option<&Index> {
    candidates
        .iter()
        .filter(|i| is_safe(i))
        .reduce(|champion, candidate| {
            if prefers(candidate, champion) {
                candidate
            } else {
                champion
            }
        })
}

/// Whether `candidate` should replace `champion`.
fn prefers(candidate: &Index, champion: &Index) -> bool {
    if candidate.columns.len() != champion.columns.len() {
        return candidate.columns.len() < champion.columns.len();
    }

    for (current, other) in champion.columns.iter().zip(&candidate.columns) {
        let current_is_integer = current.column_type.is_integer();
        let other_is_integer = other.column_type.is_integer();

        if current_is_integer != other_is_integer {
            return other_is_integer;
        }
        if current.nullable != other.nullable {
            return !other.nullable;
        }
        if !current_is_integer {
            return false;
        }
    }

    false
}
