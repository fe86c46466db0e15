//! Merge/dedup of name operations
//!
//! Folding rule for a day's document:
//! 1. Existing entries first, then the incoming batch
//! 2. One entry per `(nameId, nameValue)`
//! 3. Larger `blocktime` wins; on equal `blocktime` the first one seen stays
//! 4. Output keeps the position where each key was first seen

use crate::model::NameOp;
use std::collections::HashMap;

/// Merge `incoming` into `existing` and deduplicate
pub fn merge_name_ops(existing: Vec<NameOp>, incoming: Vec<NameOp>) -> Vec<NameOp> {
    dedup_name_ops(existing.into_iter().chain(incoming))
}

/// Keep the newest entry per dedup key, in first-seen order
pub fn dedup_name_ops(ops: impl IntoIterator<Item = NameOp>) -> Vec<NameOp> {
    let mut merged: Vec<NameOp> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for op in ops {
        let (name_id, name_value) = op.dedup_key();
        let key = (name_id.to_string(), name_value.to_string());
        match index.get(&key) {
            Some(&pos) => {
                if op.blocktime > merged[pos].blocktime {
                    merged[pos] = op;
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(op);
            }
        }
    }

    merged
}
