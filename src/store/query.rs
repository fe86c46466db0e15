//! Time-ordered, paginated reads over all day documents

use crate::model::NameOp;

/// One page of a newest-first listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_size: usize,
    pub offset: usize,
}

impl PageRequest {
    pub fn new(page_size: usize, offset: usize) -> Self {
        Self { page_size, offset }
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_size: 50,
            offset: 0,
        }
    }
}

/// Common predicates over name operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameOpFilter {
    /// Keep ops whose `nameId` starts with this (e.g. `e/`, `nft/`)
    pub name_prefix: Option<String>,
    /// Drop ops with an empty `nameValue`
    pub with_value_only: bool,
    /// Keep ops with `blocktime >= min_blocktime`
    pub min_blocktime: Option<i64>,
}

impl NameOpFilter {
    pub fn matches(&self, op: &NameOp) -> bool {
        if let Some(prefix) = &self.name_prefix {
            if !op.name_id.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if self.with_value_only && op.name_value.is_empty() {
            return false;
        }
        if let Some(min) = self.min_blocktime {
            if op.blocktime < min {
                return false;
            }
        }
        true
    }
}

/// Sort newest first, filter, then slice `[offset, offset + page_size)`.
///
/// An offset past the end yields an empty page.
pub fn paginate(
    mut ops: Vec<NameOp>,
    page: PageRequest,
    filter: Option<&(dyn Fn(&NameOp) -> bool + Send + Sync)>,
) -> Vec<NameOp> {
    ops.sort_by(|a, b| b.blocktime.cmp(&a.blocktime));

    if let Some(keep) = filter {
        ops.retain(|op| keep(op));
    }

    ops.into_iter()
        .skip(page.offset)
        .take(page.page_size)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(name_id: &str, name_value: &str, blocktime: i64) -> NameOp {
        NameOp {
            name_id: name_id.to_string(),
            name_value: name_value.to_string(),
            blocktime,
            txid: format!("tx{}", blocktime),
            address: "addr".to_string(),
            vout: 0,
            op_type: "name_op".to_string(),
        }
    }

    fn corpus(n: i64) -> Vec<NameOp> {
        (0..n).map(|i| op(&format!("n{}", i), "", i * 10)).collect()
    }

    #[test]
    fn test_first_page_is_newest_descending() {
        let page = paginate(corpus(25), PageRequest::new(10, 0), None);
        let times: Vec<i64> = page.iter().map(|o| o.blocktime).collect();
        assert_eq!(times, vec![240, 230, 220, 210, 200, 190, 180, 170, 160, 150]);
    }

    #[test]
    fn test_last_partial_page() {
        let page = paginate(corpus(25), PageRequest::new(10, 20), None);
        assert_eq!(page.len(), 5);
        assert_eq!(page[4].blocktime, 0);
    }

    #[test]
    fn test_offset_at_or_past_end_is_empty() {
        assert!(paginate(corpus(25), PageRequest::new(10, 25), None).is_empty());
        assert!(paginate(corpus(25), PageRequest::new(10, 1_000), None).is_empty());
        assert!(paginate(Vec::new(), PageRequest::default(), None).is_empty());
    }

    #[test]
    fn test_default_page_starts_at_zero() {
        let page = PageRequest::default();
        assert_eq!(page.offset, 0);
        assert_eq!(paginate(corpus(3), page, None).len(), 3);
    }

    #[test]
    fn test_filter_applies_before_slicing() {
        let mut ops = corpus(10);
        ops.push(op("e/alice", "hello", 5));
        ops.push(op("e/bob", "", 3));

        let filter = NameOpFilter {
            name_prefix: Some("e/".to_string()),
            ..Default::default()
        };
        let keep = |o: &NameOp| filter.matches(o);
        let page = paginate(ops, PageRequest::new(1, 1), Some(&keep));
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name_id, "e/bob");
    }

    #[test]
    fn test_name_op_filter_rules() {
        let filter = NameOpFilter {
            name_prefix: Some("nft/".to_string()),
            with_value_only: true,
            min_blocktime: Some(100),
        };
        assert!(filter.matches(&op("nft/1", "v", 100)));
        assert!(!filter.matches(&op("nft/1", "", 100)));
        assert!(!filter.matches(&op("nft/1", "v", 99)));
        assert!(!filter.matches(&op("e/1", "v", 100)));
        assert!(NameOpFilter::default().matches(&op("", "", 0)));
    }
}
