use std::collections::{HashSet, VecDeque};

use tracing::debug;

use quill_shared::{classify, ContentItem, TrxKind};

use crate::client::ContentParams;
use crate::error::Result;

/// Window for the seen-cursor and emitted-id sets. Bounded so an arbitrarily
/// long history cannot grow memory without limit.
const DEDUP_WINDOW: usize = 512;

/// Anything that can serve pages of group content. The client implements
/// this against the node; tests implement it in memory.
pub trait FetchPage {
    fn fetch_page(&self, params: &ContentParams) -> Result<Vec<ContentItem>>;
}

/// How to walk a group's history.
#[derive(Debug, Clone)]
pub struct TraverseOptions {
    /// Resume point: the last trx id already consumed. `None` starts from
    /// the beginning of the history.
    pub start_cursor: Option<String>,
    /// Initial page size; grows by `page_size_increment` on every stall.
    pub page_size: u64,
    pub page_size_increment: u64,
    /// Consecutive stalled pages tolerated before giving up. Progress
    /// resets the budget.
    pub retry_budget: u32,
    /// Keep only these publishers. Empty keeps everyone.
    pub senders: Vec<String>,
    /// Keep only these kinds. Empty keeps everything.
    pub kinds: Vec<TrxKind>,
    pub deep_reply: bool,
}

impl Default for TraverseOptions {
    fn default() -> Self {
        Self {
            start_cursor: None,
            page_size: 20,
            page_size_increment: 20,
            retry_budget: 30,
            senders: Vec::new(),
            kinds: Vec::new(),
            deep_reply: false,
        }
    }
}

/// A pull-based walk over a group's history, in chain order.
///
/// The stream first probes the newest trx id, then pages forward from the
/// start cursor. The cursor advances per record, so a page that ends where
/// it started is a stall: the page size grows and one unit of retry budget
/// burns. Reaching the probed head, or exhausting the budget, ends the
/// stream. A transport error is yielded once and ends the stream.
pub struct ContentStream<'a, F: FetchPage + ?Sized> {
    source: &'a F,
    options: TraverseOptions,
    cursor: Option<String>,
    head_id: Option<String>,
    page_size: u64,
    budget: u32,
    started: bool,
    done: bool,
    buffer: VecDeque<ContentItem>,
    seen_cursors: RecentSet,
    emitted: RecentSet,
}

impl<'a, F: FetchPage + ?Sized> ContentStream<'a, F> {
    pub fn new(source: &'a F, options: TraverseOptions) -> Self {
        Self {
            cursor: options.start_cursor.clone(),
            page_size: options.page_size,
            budget: options.retry_budget,
            options,
            source,
            head_id: None,
            started: false,
            done: false,
            buffer: VecDeque::new(),
            seen_cursors: RecentSet::new(DEDUP_WINDOW),
            emitted: RecentSet::new(DEDUP_WINDOW),
        }
    }

    /// Newest trx id right now; records appended later are out of scope for
    /// this walk.
    fn probe_head(&self) -> Result<Option<String>> {
        let params = ContentParams {
            start_trx: None,
            num: 1,
            reverse: true,
            include_start_trx: true,
        };
        let newest = self.source.fetch_page(&params)?;
        Ok(newest.first().and_then(|item| item_id(item).map(str::to_string)))
    }

    fn fetch_next_page(&mut self) -> Result<()> {
        let params = ContentParams {
            start_trx: self.cursor.clone(),
            num: self.page_size,
            reverse: false,
            include_start_trx: false,
        };
        let page = self.source.fetch_page(&params)?;
        debug!(
            cursor = self.cursor.as_deref().unwrap_or(""),
            num = self.page_size,
            got = page.len(),
            "history page"
        );
        self.buffer.extend(page);
        Ok(())
    }

    fn passes(&self, item: &ContentItem) -> bool {
        // sealed records cannot be filtered; pass them through
        let record = match item {
            Ok(record) => record,
            Err(_) => return true,
        };
        if !self.options.senders.is_empty() && !self.options.senders.contains(&record.publisher) {
            return false;
        }
        if !self.options.kinds.is_empty() {
            let kind = classify(record, self.options.deep_reply);
            if !self.options.kinds.contains(&kind) {
                return false;
            }
        }
        true
    }
}

impl<'a, F: FetchPage + ?Sized> Iterator for ContentStream<'a, F> {
    type Item = Result<ContentItem>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }

            // drain the buffered page first; the cursor tracks every record
            // so resumption is exact even when filters drop the record
            if let Some(item) = self.buffer.pop_front() {
                let id = item_id(&item).map(str::to_string);
                if let Some(id) = &id {
                    self.cursor = Some(id.clone());
                }
                if !self.passes(&item) {
                    continue;
                }
                if let Some(id) = id {
                    if !self.emitted.insert(id) {
                        continue;
                    }
                }
                return Some(Ok(item));
            }

            if !self.started {
                self.started = true;
                match self.probe_head() {
                    Ok(head_id) => self.head_id = head_id,
                    Err(err) => {
                        self.done = true;
                        return Some(Err(err));
                    }
                }
            }

            if self.cursor == self.head_id {
                self.done = true;
                return None;
            }

            // a cursor we have already paged from means no forward progress
            let cursor_key = self.cursor.clone().unwrap_or_default();
            if self.seen_cursors.insert(cursor_key) {
                self.budget = self.options.retry_budget;
            } else {
                if self.budget == 0 {
                    debug!("retry budget exhausted, ending walk");
                    self.done = true;
                    return None;
                }
                self.budget -= 1;
                self.page_size += self.options.page_size_increment;
            }

            if let Err(err) = self.fetch_next_page() {
                self.done = true;
                return Some(Err(err));
            }
        }
    }
}

fn item_id(item: &ContentItem) -> Option<&str> {
    let id = match item {
        Ok(record) => record.trx_id.as_str(),
        Err(trx) => trx.trx_id.as_str(),
    };
    (!id.is_empty()).then_some(id)
}

/// Insertion-ordered set with a capacity; the oldest entry falls out when a
/// new one would exceed it. `insert` reports whether the value was new.
struct RecentSet {
    set: HashSet<String>,
    order: VecDeque<String>,
    capacity: usize,
}

impl RecentSet {
    fn new(capacity: usize) -> Self {
        Self {
            set: HashSet::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn insert(&mut self, value: String) -> bool {
        if self.set.contains(&value) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.order.push_back(value.clone());
        self.set.insert(value);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_set_deduplicates() {
        let mut set = RecentSet::new(2);
        assert!(set.insert("a".into()));
        assert!(!set.insert("a".into()));
        assert!(set.insert("b".into()));
        // "a" falls out once capacity is exceeded
        assert!(set.insert("c".into()));
        assert!(set.insert("a".into()));
    }
}
