//! Page slicing

use serde::Serialize;

/// One page of a list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number after clamping
    pub current: usize,
    pub total_pages: usize,
    pub per_page: usize,
    /// Total number of items across all pages
    pub total: usize,
}

impl<T> Page<T> {
    pub fn prev(&self) -> Option<usize> {
        (self.current > 1).then(|| self.current - 1)
    }

    pub fn next(&self) -> Option<usize> {
        (self.current < self.total_pages).then(|| self.current + 1)
    }
}

/// Slice `items` into page `page` of `per_page` items.
///
/// Page K holds items `[(K-1)*P, K*P)`. Requests outside `1..=total_pages`
/// are clamped, so a non-empty list never yields an empty page. An empty
/// list yields one empty page.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page).max(1);
    let current = page.clamp(1, total_pages);

    let start = (current - 1) * per_page;
    let end = (start + per_page).min(total);

    Page {
        items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
        current,
        total_pages,
        per_page,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        let items: Vec<u32> = (1..=13).collect();

        let first = paginate(&items, 1, 6);
        assert_eq!(first.items, vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.prev(), None);
        assert_eq!(first.next(), Some(2));

        let last = paginate(&items, 3, 6);
        assert_eq!(last.items, vec![13]);
        assert_eq!(last.next(), None);
        assert_eq!(last.prev(), Some(2));
    }

    #[test]
    fn test_page_clamping() {
        let items: Vec<u32> = (1..=12).collect();
        let beyond = paginate(&items, 99, 6);
        assert_eq!(beyond.current, 2);
        assert_eq!(beyond.items, vec![7, 8, 9, 10, 11, 12]);

        assert_eq!(paginate(&items, 0, 6).current, 1);
    }

    #[test]
    fn test_last_page_never_empty() {
        for n in 1..30usize {
            let items: Vec<usize> = (0..n).collect();
            for per_page in 1..8 {
                let last = paginate(&items, usize::MAX, per_page);
                assert!(!last.items.is_empty());
                let seen: usize = (1..=last.total_pages)
                    .map(|k| paginate(&items, k, per_page).items.len())
                    .sum();
                assert_eq!(seen, n);
            }
        }
    }

    #[test]
    fn test_empty_list() {
        let page = paginate::<u32>(&[], 3, 6);
        assert!(page.items.is_empty());
        assert_eq!(page.current, 1);
        assert_eq!(page.total_pages, 1);
    }
}
