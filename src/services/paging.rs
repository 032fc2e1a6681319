use serde::{Deserialize, Serialize};

#[cfg(feature = "server")]
use utoipa::ToSchema;

pub const DEFAULT_PAGE_SIZE: u64 = 50;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub page_count: u64,
}

impl PageMeta {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let page_count = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            page,
            per_page,
            total,
            page_count,
        }
    }
}

/// One-based page number, defaulting to the first page
pub fn page_number(page: Option<u64>) -> u64 {
    page.filter(|p| *p > 0).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(PageMeta::new(1, 50, 0).page_count, 0);
        assert_eq!(PageMeta::new(1, 50, 50).page_count, 1);
        assert_eq!(PageMeta::new(2, 50, 51).page_count, 2);
    }

    #[test]
    fn test_page_number_defaults() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some(0)), 1);
        assert_eq!(page_number(Some(4)), 4);
    }
}
