//! Load-more paging over a sheet.
//!
//! A `Pager` remembers how many records it has handed out and asks for the
//! next page starting from there, until the server reports nothing more.

use crate::types::{ListRequest, ListResult, Record};

#[derive(Debug, Clone)]
pub struct Pager {
    template: ListRequest,
    page_size: u64,
    loaded: u64,
    has_more: bool,
}

impl Pager {
    /// `template` supplies query, filters and projection; its own limit and
    /// offset are replaced. A zero `page_size` is treated as one.
    pub fn new(template: ListRequest, page_size: u64) -> Self {
        Self {
            template,
            page_size: page_size.max(1),
            loaded: 0,
            has_more: true,
        }
    }

    /// Request for the next page, or `None` when the sheet is exhausted.
    pub fn next_request(&self) -> Option<ListRequest> {
        self.has_more.then(|| {
            self.template
                .clone()
                .limit(self.page_size)
                .offset(self.loaded)
        })
    }

    /// Record a fetched page and return its records.
    pub fn advance(&mut self, page: ListResult) -> Vec<Record> {
        self.loaded += page.records.len() as u64;
        // An empty page can't move the offset forward.
        self.has_more = page.has_more && !page.records.is_empty();
        page.records
    }

    /// Stop paging without fetching anything more. `reset` starts over.
    pub fn finish(&mut self) {
        self.has_more = false;
    }

    /// Forget everything loaded so far and start from the first page.
    pub fn reset(&mut self) {
        self.loaded = 0;
        self.has_more = true;
    }

    pub fn loaded(&self) -> u64 {
        self.loaded
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(ids: &[u64], has_more: bool) -> ListResult {
        ListResult {
            records: ids
                .iter()
                .map(|&id| Record {
                    id: Some(id),
                    ..Record::default()
                })
                .collect(),
            has_more,
        }
    }

    #[test]
    fn offsets_follow_loaded_count() {
        let mut pager = Pager::new(ListRequest::new("b1/s1").filter("col_1=a"), 5);
        let first = pager.next_request().unwrap();
        assert_eq!((first.limit, first.offset), (5, 0));
        assert_eq!(first.filters, vec!["col_1=a".to_string()]);

        let records = pager.advance(page(&[1, 2, 3, 4, 5], true));
        assert_eq!(records.len(), 5);
        let second = pager.next_request().unwrap();
        assert_eq!((second.limit, second.offset), (5, 5));

        pager.advance(page(&[6, 7], false));
        assert_eq!(pager.loaded(), 7);
        assert!(pager.next_request().is_none());
    }

    #[test]
    fn empty_page_stops_paging() {
        let mut pager = Pager::new(ListRequest::new("b1/s1"), 5);
        pager.advance(page(&[], true));
        assert!(!pager.has_more());
    }

    #[test]
    fn finish_stops_before_the_next_request() {
        let mut pager = Pager::new(ListRequest::new("b1/s1"), 2);
        pager.advance(page(&[1, 2], true));
        pager.finish();
        assert!(pager.next_request().is_none());
        assert_eq!(pager.loaded(), 2);
    }

    #[test]
    fn reset_starts_over() {
        let mut pager = Pager::new(ListRequest::new("b1/s1"), 2);
        pager.advance(page(&[1, 2], false));
        assert!(pager.next_request().is_none());

        pager.reset();
        assert_eq!(pager.next_request().unwrap().offset, 0);
    }

    #[test]
    fn zero_page_size_still_pages() {
        let pager = Pager::new(ListRequest::new("b1/s1"), 0);
        assert!(pager.next_request().unwrap().is_paged());
    }
}
