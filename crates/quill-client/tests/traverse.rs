// Traversal behavior against in-memory page sources: ordering, resumption,
// stall handling, filtering and duplicate suppression.

use std::cell::Cell;

use quill_client::{
    classify_item, ClientError, ContentItem, ContentParams, DecryptedRecord, EncryptedTrx,
    FetchPage, TraverseOptions, TrxKind,
};
use quill_shared::TypeUrl;

fn note(id: &str, publisher: &str, text: &str) -> ContentItem {
    Ok(DecryptedRecord {
        trx_id: id.to_string(),
        publisher: publisher.to_string(),
        content: serde_json::json!({"type": "Note", "content": text}),
        type_url: TypeUrl::Object,
        timestamp: 0,
    })
}

fn person(id: &str, publisher: &str, name: &str) -> ContentItem {
    Ok(DecryptedRecord {
        trx_id: id.to_string(),
        publisher: publisher.to_string(),
        content: serde_json::json!({"name": name}),
        type_url: TypeUrl::Person,
        timestamp: 0,
    })
}

fn sealed(id: &str) -> ContentItem {
    Err(EncryptedTrx {
        trx_id: id.to_string(),
        data: Some("opaque".into()),
        ..EncryptedTrx::default()
    })
}

fn item_id(item: &ContentItem) -> &str {
    match item {
        Ok(record) => &record.trx_id,
        Err(trx) => &trx.trx_id,
    }
}

/// Serves pages the way a well-behaved node does: `start_trx` exclusive,
/// chain order, newest-first when reversed.
struct LinearSource {
    items: Vec<ContentItem>,
    calls: Cell<u32>,
}

impl LinearSource {
    fn new(items: Vec<ContentItem>) -> Self {
        Self {
            items,
            calls: Cell::new(0),
        }
    }

    fn page(&self, params: &ContentParams) -> Vec<ContentItem> {
        if params.reverse {
            return self
                .items
                .iter()
                .rev()
                .take(params.num as usize)
                .cloned()
                .collect();
        }
        let start = match &params.start_trx {
            None => 0,
            Some(id) => self
                .items
                .iter()
                .position(|item| item_id(item) == id)
                .map(|pos| pos + 1)
                .unwrap_or(0),
        };
        self.items
            .iter()
            .skip(start)
            .take(params.num as usize)
            .cloned()
            .collect()
    }
}

impl FetchPage for LinearSource {
    fn fetch_page(&self, params: &ContentParams) -> Result<Vec<ContentItem>, ClientError> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.page(params))
    }
}

fn stream<'a, F: FetchPage>(
    source: &'a F,
    options: TraverseOptions,
) -> quill_client::ContentStream<'a, F> {
    quill_client::ContentStream::new(source, options)
}

fn collect_ids<F: FetchPage>(source: &F, options: TraverseOptions) -> Vec<String> {
    stream(source, options)
        .map(|item| item_id(&item.unwrap()).to_string())
        .collect()
}

#[test]
fn test_full_history_in_order_exactly_once() {
    let items: Vec<ContentItem> = (0..50).map(|i| note(&format!("t{i}"), "pk1", "x")).collect();
    let source = LinearSource::new(items);

    let ids = collect_ids(&source, TraverseOptions::default());
    let expected: Vec<String> = (0..50).map(|i| format!("t{i}")).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_resumes_after_cursor() {
    let items: Vec<ContentItem> = (0..30).map(|i| note(&format!("t{i}"), "pk1", "x")).collect();
    let source = LinearSource::new(items);

    let options = TraverseOptions {
        start_cursor: Some("t19".into()),
        ..TraverseOptions::default()
    };
    let ids = collect_ids(&source, options);
    let expected: Vec<String> = (20..30).map(|i| format!("t{i}")).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_empty_group_ends_immediately() {
    let source = LinearSource::new(Vec::new());
    let mut walk = stream(&source, TraverseOptions::default());
    assert!(walk.next().is_none());
    // only the head probe went out
    assert_eq!(source.calls.get(), 1);
}

/// Serves only a prefix of the history, like a node that lost its tail.
struct TruncatedSource {
    inner: LinearSource,
    available: usize,
}

impl FetchPage for TruncatedSource {
    fn fetch_page(&self, params: &ContentParams) -> Result<Vec<ContentItem>, ClientError> {
        self.inner.calls.set(self.inner.calls.get() + 1);
        if params.reverse {
            return Ok(self.inner.page(params));
        }
        let mut page = self.inner.page(params);
        page.retain(|item| {
            self.inner
                .items
                .iter()
                .take(self.available)
                .any(|kept| item_id(kept) == item_id(item))
        });
        Ok(page)
    }
}

#[test]
fn test_stalled_walk_terminates_within_budget() {
    let items: Vec<ContentItem> = (0..50).map(|i| note(&format!("t{i}"), "pk1", "x")).collect();
    let source = TruncatedSource {
        inner: LinearSource::new(items),
        available: 10,
    };

    let options = TraverseOptions {
        retry_budget: 5,
        ..TraverseOptions::default()
    };
    let ids = collect_ids(&source, options);
    let expected: Vec<String> = (0..10).map(|i| format!("t{i}")).collect();
    assert_eq!(ids, expected);
    // head probe + first page + one page per budget unit, nothing unbounded
    assert!(source.inner.calls.get() <= 2 + 5 + 1);
}

/// Returns nothing past the gap until the requested page is large enough,
/// like a node that only surfaces late records in bigger windows.
struct GappySource {
    inner: LinearSource,
    gap_after: String,
    min_num: u64,
}

impl FetchPage for GappySource {
    fn fetch_page(&self, params: &ContentParams) -> Result<Vec<ContentItem>, ClientError> {
        if !params.reverse
            && params.start_trx.as_deref() == Some(self.gap_after.as_str())
            && params.num < self.min_num
        {
            return Ok(Vec::new());
        }
        self.inner.fetch_page(params)
    }
}

#[test]
fn test_stall_recovers_by_growing_pages() {
    let items: Vec<ContentItem> = (0..50).map(|i| note(&format!("t{i}"), "pk1", "x")).collect();
    let source = GappySource {
        inner: LinearSource::new(items),
        gap_after: "t19".into(),
        min_num: 60,
    };

    let ids = collect_ids(&source, TraverseOptions::default());
    let expected: Vec<String> = (0..50).map(|i| format!("t{i}")).collect();
    assert_eq!(ids, expected);
}

/// Pages overlap: the start record comes back again on the next page.
struct OverlappingSource {
    inner: LinearSource,
}

impl FetchPage for OverlappingSource {
    fn fetch_page(&self, params: &ContentParams) -> Result<Vec<ContentItem>, ClientError> {
        if params.reverse {
            return self.inner.fetch_page(params);
        }
        // re-serve the cursor record at the top of each page
        let start = match &params.start_trx {
            None => 0,
            Some(id) => self
                .inner
                .items
                .iter()
                .position(|item| item_id(item) == id)
                .unwrap_or(0),
        };
        Ok(self
            .inner
            .items
            .iter()
            .skip(start)
            .take(params.num as usize)
            .cloned()
            .collect())
    }
}

#[test]
fn test_overlapping_pages_deduplicated() {
    let items: Vec<ContentItem> = (0..25).map(|i| note(&format!("t{i}"), "pk1", "x")).collect();
    let source = OverlappingSource {
        inner: LinearSource::new(items),
    };

    let ids = collect_ids(&source, TraverseOptions::default());
    let expected: Vec<String> = (0..25).map(|i| format!("t{i}")).collect();
    assert_eq!(ids, expected);
}

#[test]
fn test_sender_and_kind_filters() {
    let items = vec![
        note("t0", "alice", "hello"),
        person("t1", "alice", "Alice"),
        note("t2", "bob", "hi"),
        person("t3", "bob", "Bob"),
    ];
    let source = LinearSource::new(items);

    let options = TraverseOptions {
        senders: vec!["alice".into()],
        ..TraverseOptions::default()
    };
    assert_eq!(collect_ids(&source, options), ["t0", "t1"]);

    let options = TraverseOptions {
        kinds: vec![TrxKind::Person],
        ..TraverseOptions::default()
    };
    assert_eq!(collect_ids(&source, options), ["t1", "t3"]);

    let options = TraverseOptions {
        senders: vec!["bob".into()],
        kinds: vec![TrxKind::TextOnly],
        ..TraverseOptions::default()
    };
    assert_eq!(collect_ids(&source, options), ["t2"]);
}

#[test]
fn test_sealed_records_bypass_filters() {
    let items = vec![note("t0", "alice", "hello"), sealed("t1"), note("t2", "bob", "hi")];
    let source = LinearSource::new(items);

    let options = TraverseOptions {
        senders: vec!["alice".into()],
        kinds: vec![TrxKind::TextOnly],
        ..TraverseOptions::default()
    };
    let collected: Vec<ContentItem> = stream(&source, options).map(Result::unwrap).collect();
    assert_eq!(collected.len(), 2);
    assert_eq!(item_id(&collected[0]), "t0");
    assert_eq!(item_id(&collected[1]), "t1");
    assert_eq!(classify_item(&collected[1], false), TrxKind::Encrypted);
}

struct FailingSource;

impl FetchPage for FailingSource {
    fn fetch_page(&self, _params: &ContentParams) -> Result<Vec<ContentItem>, ClientError> {
        Err(ClientError::Response("node unreachable".into()))
    }
}

#[test]
fn test_transport_error_yielded_once_then_ends() {
    let source = FailingSource;
    let mut walk = stream(&source, TraverseOptions::default());

    assert!(matches!(walk.next(), Some(Err(ClientError::Response(_)))));
    assert!(walk.next().is_none());
    assert!(walk.next().is_none());
}
