use crate::cache::{KeySegment, QueryKey};
use crate::category::DataCategory;

/// Selects cached queries for invalidation, refetch or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryFilter {
    All,
    Category(DataCategory),
    /// Entries of a category that belong to one entity, keyed either as
    /// `[tag, id, ..]` or `["tag-id", ..]`.
    CategoryWithId(DataCategory, KeySegment),
    Exact(QueryKey),
    Prefix(QueryKey),
}

impl QueryFilter {
    pub fn matches(&self, key: &QueryKey, category: DataCategory) -> bool {
        match self {
            QueryFilter::All => true,
            QueryFilter::Category(wanted) => *wanted == category,
            QueryFilter::CategoryWithId(wanted, id) => {
                if *wanted != category {
                    return false;
                }
                let id_segment = key.get(1).is_some_and(|segment| segment.matches_id(id));
                let joined = format!("{}-{}", wanted.as_str(), id);
                let joined_head = key
                    .get(0)
                    .and_then(KeySegment::as_str)
                    .is_some_and(|head| head == joined);
                id_segment || joined_head
            }
            QueryFilter::Exact(wanted) => wanted == key,
            QueryFilter::Prefix(prefix) => key.starts_with(prefix),
        }
    }
}
