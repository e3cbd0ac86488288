//! In-memory index store used by the unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use geo_indexer_repository::{
    BatchOperationResult, BatchOperationSummary, BulkItem, IndexDocumentRequest, IndexStore,
    IndexStoreError, PartialUpdateRequest, SearchHit, SearchPage, SearchRequest, StoredDocument,
};
use geo_indexer_shared::EntityKind;
use serde_json::{Map, Value};

type Documents = BTreeMap<String, Map<String, Value>>;

/// Stores documents per kind, replays scripted search results and records
/// every request it receives.
#[derive(Default)]
pub struct MockStore {
    documents: Mutex<HashMap<EntityKind, Documents>>,
    scripted: Mutex<HashMap<EntityKind, VecDeque<Result<SearchPage, IndexStoreError>>>>,
    scrolls: Mutex<HashMap<String, VecDeque<SearchPage>>>,
    next_id: AtomicUsize,
    pub searches: Mutex<Vec<(EntityKind, Value)>>,
    pub indexed: Mutex<Vec<IndexDocumentRequest>>,
    pub updates: Mutex<Vec<PartialUpdateRequest>>,
    pub bulks: Mutex<Vec<(EntityKind, Vec<BulkItem>)>>,
    pub cleared_scrolls: Mutex<Vec<String>>,
    pub fail_updates: Mutex<Option<IndexStoreError>>,
    /// Per-id item statuses returned by the next bulk requests, 200 when unset.
    item_statuses: Mutex<HashMap<String, VecDeque<u16>>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, kind: EntityKind, id: &str, source: Value) {
        let source = source.as_object().cloned().unwrap_or_default();
        self.documents
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .insert(id.to_string(), source);
    }

    /// Queue the result of the next search against `kind`.
    pub fn script_search(&self, kind: EntityKind, result: Result<Vec<SearchHit>, IndexStoreError>) {
        let result = result.map(|hits| SearchPage {
            total: hits.len() as u64,
            hits,
            scroll_id: None,
        });
        self.scripted
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(result);
    }

    /// Answer the next bulk items for `id` with `statuses`, one per request.
    pub fn script_item_statuses(&self, id: &str, statuses: &[u16]) {
        self.item_statuses
            .lock()
            .unwrap()
            .insert(id.to_string(), statuses.iter().copied().collect());
    }

    pub fn searched_kinds(&self) -> Vec<EntityKind> {
        self.searches.lock().unwrap().iter().map(|(k, _)| *k).collect()
    }
}

pub fn hit(id: &str, source: Value) -> SearchHit {
    SearchHit::new(id, source.as_object().cloned().unwrap_or_default())
}

#[async_trait]
impl IndexStore for MockStore {
    async fn ensure_index_exists(&self) -> Result<(), IndexStoreError> {
        Ok(())
    }

    async fn get_document(
        &self,
        kind: EntityKind,
        id: &str,
    ) -> Result<Option<StoredDocument>, IndexStoreError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .get(&kind)
            .and_then(|docs| docs.get(id))
            .map(|source| StoredDocument {
                id: id.to_string(),
                source: source.clone(),
            }))
    }

    async fn index_document(
        &self,
        request: &IndexDocumentRequest,
    ) -> Result<String, IndexStoreError> {
        let id = request.id.clone().unwrap_or_else(|| {
            format!("generated-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
        });
        self.indexed.lock().unwrap().push(request.clone());
        self.insert(request.kind, &id, Value::Object(request.body.clone()));
        Ok(id)
    }

    async fn update_document(&self, request: &PartialUpdateRequest) -> Result<(), IndexStoreError> {
        if let Some(err) = self.fail_updates.lock().unwrap().clone() {
            return Err(err);
        }
        self.updates.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn bulk(
        &self,
        kind: EntityKind,
        items: &[BulkItem],
    ) -> Result<BatchOperationSummary, IndexStoreError> {
        self.bulks.lock().unwrap().push((kind, items.to_vec()));
        let mut statuses = self.item_statuses.lock().unwrap();
        Ok(BatchOperationSummary::from_results(
            items
                .iter()
                .map(|item| {
                    let id = item.id().map(str::to_string);
                    let status = id
                        .as_ref()
                        .and_then(|id| statuses.get_mut(id))
                        .and_then(VecDeque::pop_front)
                        .unwrap_or(200);
                    if (200..300).contains(&status) {
                        BatchOperationResult::ok(id, status)
                    } else {
                        BatchOperationResult {
                            id,
                            success: false,
                            status,
                            error: Some(IndexStoreError::bulk(format!("status {}", status))),
                        }
                    }
                })
                .collect(),
        ))
    }

    async fn search(
        &self,
        kind: EntityKind,
        request: &SearchRequest,
    ) -> Result<SearchPage, IndexStoreError> {
        self.searches.lock().unwrap().push((kind, request.to_body()));
        self.scripted
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(SearchPage::default()))
    }

    async fn open_scroll(
        &self,
        kind: EntityKind,
        request: &SearchRequest,
        _keep_alive: Duration,
    ) -> Result<SearchPage, IndexStoreError> {
        self.searches.lock().unwrap().push((kind, request.to_body()));
        let size = request.size.unwrap_or(10).max(1);
        let hits: Vec<SearchHit> = self
            .documents
            .lock()
            .unwrap()
            .get(&kind)
            .map(|docs| {
                docs.iter()
                    .map(|(id, source)| SearchHit::new(id.clone(), source.clone()))
                    .collect()
            })
            .unwrap_or_default();
        let total = hits.len() as u64;
        let scroll_id = format!("scroll-{}", kind);

        let mut pages: VecDeque<SearchPage> = hits
            .chunks(size)
            .map(|chunk| SearchPage {
                hits: chunk.to_vec(),
                total,
                scroll_id: Some(scroll_id.clone()),
            })
            .collect();
        let first = pages.pop_front().unwrap_or(SearchPage {
            hits: Vec::new(),
            total,
            scroll_id: Some(scroll_id.clone()),
        });
        self.scrolls.lock().unwrap().insert(scroll_id, pages);
        Ok(first)
    }

    async fn scroll(
        &self,
        scroll_id: &str,
        _keep_alive: Duration,
    ) -> Result<SearchPage, IndexStoreError> {
        let mut scrolls = self.scrolls.lock().unwrap();
        let pages = scrolls
            .get_mut(scroll_id)
            .ok_or_else(|| IndexStoreError::query("unknown scroll id"))?;
        Ok(pages.pop_front().unwrap_or(SearchPage {
            hits: Vec::new(),
            total: 0,
            scroll_id: Some(scroll_id.to_string()),
        }))
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), IndexStoreError> {
        self.cleared_scrolls.lock().unwrap().push(scroll_id.to_string());
        self.scrolls.lock().unwrap().remove(scroll_id);
        Ok(())
    }
}
