//! In-memory provider for tests.
//!
//! Answers with the same response envelopes as the engine for the subset of
//! the query DSL this tool exercises: `match_all`, `term`, `terms`, `match`,
//! `range`, `exists` and `bool`, plus `terms`/`avg`/`sum`/`min`/`max`/
//! `value_count` aggregations. Anything else is rejected as an invalid query.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::errors::SearchError;
use crate::interfaces::SearchIndexProvider;
use search_miner_shared::Document;

const DEFAULT_PAGE_SIZE: usize = 10;
const DEFAULT_TERMS_SIZE: usize = 10;

#[derive(Default)]
struct StoredIndex {
    body: Value,
    documents: Vec<(String, Document)>,
}

impl StoredIndex {
    fn with_body(body: Value) -> Self {
        Self {
            body,
            documents: Vec::new(),
        }
    }

    /// Insert or overwrite; returns true when the id was new.
    fn upsert(&mut self, id: &str, document: Document) -> bool {
        match self.documents.iter_mut().find(|(existing, _)| existing == id) {
            Some((_, slot)) => {
                *slot = document;
                false
            }
            None => {
                self.documents.push((id.to_string(), document));
                true
            }
        }
    }
}

struct ScrollCursor {
    hits: Vec<Value>,
    offset: usize,
    page_size: usize,
}

#[derive(Default)]
struct State {
    indexes: BTreeMap<String, StoredIndex>,
    scrolls: HashMap<String, ScrollCursor>,
    next_scroll: u64,
    search_requests: Vec<Value>,
}

/// A [`SearchIndexProvider`] holding everything in process memory.
///
/// Clones share state, so a test can hand one clone to a connector and
/// inspect the other.
#[derive(Clone, Default)]
pub struct InMemoryProvider {
    state: Arc<Mutex<State>>,
    failing_ids: Arc<HashSet<String>>,
    unreachable: bool,
    page_size: Option<usize>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider whose engine never answers: `ping` is false and every
    /// other call is a connection error.
    pub fn unreachable() -> Self {
        Self {
            unreachable: true,
            ..Self::default()
        }
    }

    /// Reject bulk items submitted under any of `ids` with a 400.
    pub fn with_failing_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing_ids = Arc::new(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Page size used when a search body has no `size`.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }

    pub fn has_index(&self, index: &str) -> bool {
        self.lock().indexes.contains_key(index)
    }

    /// The body the index was created with.
    pub fn mapping(&self, index: &str) -> Option<Value> {
        self.lock().indexes.get(index).map(|stored| stored.body.clone())
    }

    /// Stored `(id, source)` pairs in insertion order.
    pub fn documents(&self, index: &str) -> Vec<(String, Document)> {
        self.lock()
            .indexes
            .get(index)
            .map(|stored| stored.documents.clone())
            .unwrap_or_default()
    }

    /// Every search body received, in order.
    pub fn search_requests(&self) -> Vec<Value> {
        self.lock().search_requests.clone()
    }

    /// Scroll contexts opened and not yet cleared.
    pub fn open_scrolls(&self) -> usize {
        self.lock().scrolls.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reachable(&self) -> Result<(), SearchError> {
        if self.unreachable {
            return Err(SearchError::connection("Connection refused"));
        }
        Ok(())
    }

    fn default_page_size(&self) -> usize {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

fn index_not_found(index: &str) -> SearchError {
    SearchError::not_found(format!("no such index [{}]", index))
}

#[async_trait]
impl SearchIndexProvider for InMemoryProvider {
    async fn ping(&self) -> Result<bool, SearchError> {
        Ok(!self.unreachable)
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchError> {
        self.reachable()?;
        Ok(self.has_index(index))
    }

    async fn create_index(&self, index: &str, body: Option<&Value>) -> Result<(), SearchError> {
        self.reachable()?;
        let mut state = self.lock();
        if state.indexes.contains_key(index) {
            return Err(SearchError::index_creation(format!(
                "resource_already_exists_exception: index [{}] already exists",
                index
            )));
        }

        let body = body.cloned().unwrap_or_else(|| json!({ "mappings": {} }));
        state
            .indexes
            .insert(index.to_string(), StoredIndex::with_body(body));
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<(), SearchError> {
        self.reachable()?;
        self.lock()
            .indexes
            .remove(index)
            .map(|_| ())
            .ok_or_else(|| index_not_found(index))
    }

    async fn get_mapping(&self, index: &str) -> Result<Value, SearchError> {
        self.reachable()?;
        let state = self.lock();
        let stored = state.indexes.get(index).ok_or_else(|| index_not_found(index))?;
        let mappings = stored.body.get("mappings").cloned().unwrap_or_else(|| json!({}));
        Ok(json!({ index: { "mappings": mappings } }))
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        document: &Document,
    ) -> Result<Value, SearchError> {
        self.reachable()?;
        let mut state = self.lock();
        let stored = state.indexes.entry(index.to_string()).or_default();
        let created = stored.upsert(id, document.clone());

        Ok(json!({
            "_index": index,
            "_id": id,
            "result": if created { "created" } else { "updated" },
            "status": if created { 201 } else { 200 }
        }))
    }

    async fn bulk(&self, index: &str, operations: Vec<Value>) -> Result<Value, SearchError> {
        self.reachable()?;
        if operations.len() % 2 != 0 {
            return Err(SearchError::bulk_index("Bulk body must hold action/source pairs"));
        }

        let mut state = self.lock();
        let mut items = Vec::with_capacity(operations.len() / 2);
        let mut errors = false;

        for pair in operations.chunks(2) {
            let action = pair[0]
                .get("index")
                .ok_or_else(|| SearchError::bulk_index("Only 'index' actions are supported"))?;
            let target = action.get("_index").and_then(Value::as_str).unwrap_or(index);
            let id = action
                .get("_id")
                .and_then(Value::as_str)
                .ok_or_else(|| SearchError::bulk_index("Bulk action is missing '_id'"))?;

            if self.failing_ids.contains(id) {
                errors = true;
                items.push(json!({ "index": {
                    "_index": target,
                    "_id": id,
                    "status": 400,
                    "error": {
                        "type": "mapper_parsing_exception",
                        "reason": format!("failed to parse document [{}]", id)
                    }
                }}));
                continue;
            }

            let source = pair[1]
                .as_object()
                .cloned()
                .ok_or_else(|| SearchError::bulk_index("Bulk source must be an object"))?;
            let created = state
                .indexes
                .entry(target.to_string())
                .or_default()
                .upsert(id, source);

            items.push(json!({ "index": {
                "_index": target,
                "_id": id,
                "result": if created { "created" } else { "updated" },
                "status": if created { 201 } else { 200 }
            }}));
        }

        Ok(json!({ "took": 1, "errors": errors, "items": items }))
    }

    async fn search(
        &self,
        index: &str,
        body: &Value,
        scroll: Option<&str>,
    ) -> Result<Value, SearchError> {
        self.reachable()?;
        let mut state = self.lock();
        state.search_requests.push(body.clone());

        let stored = state.indexes.get(index).ok_or_else(|| index_not_found(index))?;
        let matched = matching_documents(stored, body.get("query"))?;

        let aggregations = match body.get("aggs").or_else(|| body.get("aggregations")) {
            Some(aggs) => Some(run_aggregations(aggs, &matched)?),
            None => None,
        };

        let source_filter = body.get("_source");
        let hits: Vec<Value> = matched
            .iter()
            .map(|(id, source)| {
                json!({
                    "_index": index,
                    "_id": id,
                    "_score": 1.0,
                    "_source": filter_source(source, source_filter)
                })
            })
            .collect();
        let total = hits.len();

        let size = body
            .get("size")
            .and_then(Value::as_u64)
            .map(|s| s as usize)
            .unwrap_or_else(|| self.default_page_size());
        let from = body.get("from").and_then(Value::as_u64).unwrap_or(0) as usize;

        let mut response = Map::new();
        response.insert("took".to_string(), json!(1));
        response.insert("timed_out".to_string(), json!(false));

        let page: Vec<Value> = if scroll.is_some() {
            state.next_scroll += 1;
            let scroll_id = format!("scroll-{}", state.next_scroll);
            let page = hits.iter().take(size).cloned().collect();
            state.scrolls.insert(
                scroll_id.clone(),
                ScrollCursor {
                    hits,
                    offset: size,
                    page_size: size,
                },
            );
            response.insert("_scroll_id".to_string(), json!(scroll_id));
            page
        } else {
            hits.into_iter().skip(from).take(size).collect()
        };

        response.insert(
            "hits".to_string(),
            json!({
                "total": { "value": total, "relation": "eq" },
                "hits": page
            }),
        );
        if let Some(aggregations) = aggregations {
            response.insert("aggregations".to_string(), aggregations);
        }

        Ok(Value::Object(response))
    }

    async fn scroll(&self, scroll_id: &str, _keep_alive: &str) -> Result<Value, SearchError> {
        self.reachable()?;
        let mut state = self.lock();
        let cursor = state
            .scrolls
            .get_mut(scroll_id)
            .ok_or_else(|| SearchError::not_found(format!("No search context [{}]", scroll_id)))?;

        let page: Vec<Value> = cursor
            .hits
            .iter()
            .skip(cursor.offset)
            .take(cursor.page_size)
            .cloned()
            .collect();
        cursor.offset += cursor.page_size;

        Ok(json!({
            "_scroll_id": scroll_id,
            "hits": {
                "total": { "value": cursor.hits.len(), "relation": "eq" },
                "hits": page
            }
        }))
    }

    async fn clear_scroll(&self, scroll_id: &str) -> Result<(), SearchError> {
        self.reachable()?;
        self.lock()
            .scrolls
            .remove(scroll_id)
            .map(|_| ())
            .ok_or_else(|| SearchError::not_found(format!("No search context [{}]", scroll_id)))
    }

    async fn count(&self, index: &str, body: Option<&Value>) -> Result<Value, SearchError> {
        self.reachable()?;
        let state = self.lock();
        let stored = state.indexes.get(index).ok_or_else(|| index_not_found(index))?;
        let matched = matching_documents(stored, body.and_then(|b| b.get("query")))?;
        Ok(json!({ "count": matched.len() }))
    }
}

fn matching_documents<'a>(
    stored: &'a StoredIndex,
    query: Option<&Value>,
) -> Result<Vec<&'a (String, Document)>, SearchError> {
    let mut matched = Vec::new();
    for entry in &stored.documents {
        let is_match = match query {
            Some(query) => matches(query, &entry.1)?,
            None => true,
        };
        if is_match {
            matched.push(entry);
        }
    }
    Ok(matched)
}

/// Evaluate one query clause against a document.
fn matches(query: &Value, document: &Document) -> Result<bool, SearchError> {
    let clause = query
        .as_object()
        .filter(|clause| clause.len() == 1)
        .ok_or_else(|| SearchError::invalid_query(format!("Malformed query clause: {}", query)))?;
    let Some((kind, params)) = clause.iter().next() else {
        return Err(SearchError::invalid_query("Empty query clause"));
    };

    match kind.as_str() {
        "match_all" => Ok(true),
        "term" => {
            let (field, expected) = single_field(params)?;
            let expected = expected.get("value").unwrap_or(expected);
            Ok(field_values(document, field).any(|v| values_equal(v, expected)))
        }
        "terms" => {
            let (field, expected) = single_field(params)?;
            let expected = expected
                .as_array()
                .ok_or_else(|| SearchError::invalid_query("'terms' expects an array"))?;
            Ok(field_values(document, field).any(|v| expected.iter().any(|e| values_equal(v, e))))
        }
        "match" => {
            let (field, text) = single_field(params)?;
            let text = text.get("query").unwrap_or(text);
            Ok(field_values(document, field).any(|v| text_matches(v, text)))
        }
        "range" => {
            let (field, bounds) = single_field(params)?;
            Ok(field_values(document, field).any(|v| in_range(v, bounds)))
        }
        "exists" => {
            let field = params
                .get("field")
                .and_then(Value::as_str)
                .ok_or_else(|| SearchError::invalid_query("'exists' expects a field"))?;
            Ok(field_values(document, field).any(|v| !v.is_null()))
        }
        "bool" => bool_matches(params, document),
        other => Err(SearchError::invalid_query(format!(
            "Unsupported query type '{}'",
            other
        ))),
    }
}

fn bool_clauses<'a>(params: &'a Value, key: &str) -> Vec<&'a Value> {
    match params.get(key) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
        None => Vec::new(),
    }
}

fn bool_matches(params: &Value, document: &Document) -> Result<bool, SearchError> {
    let required: Vec<&Value> = bool_clauses(params, "must")
        .into_iter()
        .chain(bool_clauses(params, "filter"))
        .collect();
    for clause in &required {
        if !matches(clause, document)? {
            return Ok(false);
        }
    }
    for clause in bool_clauses(params, "must_not") {
        if matches(clause, document)? {
            return Ok(false);
        }
    }

    let should = bool_clauses(params, "should");
    if should.is_empty() || !required.is_empty() {
        return Ok(true);
    }
    for clause in should {
        if matches(clause, document)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn single_field(params: &Value) -> Result<(&str, &Value), SearchError> {
    params
        .as_object()
        .filter(|fields| fields.len() == 1)
        .and_then(|fields| fields.iter().next())
        .map(|(field, value)| (field.as_str(), value))
        .ok_or_else(|| SearchError::invalid_query(format!("Expected a single field in {}", params)))
}

/// Values at a dotted path, flattening arrays.
fn field_values<'a>(document: &'a Document, path: &str) -> impl Iterator<Item = &'a Value> {
    let mut current: Option<&Value> = None;
    let mut parts = path.split('.');
    if let Some(first) = parts.next() {
        current = document.get(first);
    }
    for part in parts {
        current = current.and_then(|value| value.get(part));
    }

    let values: Vec<&Value> = match current {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(value) => vec![value],
        None => Vec::new(),
    };
    values.into_iter()
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    match (actual.as_f64(), expected.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => actual == expected,
    }
}

/// Case-insensitive token overlap, the way an analyzed text field matches.
fn text_matches(actual: &Value, text: &Value) -> bool {
    match (actual.as_str(), text.as_str()) {
        (Some(actual), Some(text)) => {
            let tokens: HashSet<String> = tokenize(actual).collect();
            tokenize(text).any(|token| tokens.contains(&token))
        }
        _ => values_equal(actual, text),
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn compare(actual: &Value, bound: &Value) -> Option<Ordering> {
    match (actual.as_f64(), bound.as_f64()) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match (actual.as_str(), bound.as_str()) {
            (Some(a), Some(b)) => Some(a.cmp(b)),
            _ => None,
        },
    }
}

fn in_range(actual: &Value, bounds: &Value) -> bool {
    let check = |key: &str, accept: fn(Ordering) -> bool| match bounds.get(key) {
        Some(bound) => compare(actual, bound).is_some_and(accept),
        None => true,
    };

    check("gte", |o| o != Ordering::Less)
        && check("gt", |o| o == Ordering::Greater)
        && check("lte", |o| o != Ordering::Greater)
        && check("lt", |o| o == Ordering::Less)
}

fn filter_source(source: &Document, filter: Option<&Value>) -> Value {
    match filter {
        Some(Value::Bool(false)) => json!({}),
        Some(Value::String(field)) => pick_fields(source, std::slice::from_ref(field)),
        Some(Value::Array(fields)) => {
            let fields: Vec<String> = fields
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            pick_fields(source, &fields)
        }
        _ => Value::Object(source.clone()),
    }
}

fn pick_fields(source: &Document, fields: &[String]) -> Value {
    let picked: Map<String, Value> = source
        .iter()
        .filter(|(key, _)| fields.contains(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Value::Object(picked)
}

fn run_aggregations(
    aggs: &Value,
    documents: &[&(String, Document)],
) -> Result<Value, SearchError> {
    let aggs = aggs
        .as_object()
        .ok_or_else(|| SearchError::invalid_query("'aggs' must be an object"))?;

    let mut results = Map::new();
    for (name, definition) in aggs {
        let (kind, params) = definition
            .as_object()
            .and_then(|d| d.iter().next())
            .ok_or_else(|| SearchError::invalid_query(format!("Malformed aggregation '{}'", name)))?;
        let field = params
            .get("field")
            .and_then(Value::as_str)
            .ok_or_else(|| SearchError::invalid_query(format!("Aggregation '{}' needs a field", name)))?;

        let values: Vec<&Value> = documents
            .iter()
            .flat_map(|(_, source)| field_values(source, field))
            .filter(|v| !v.is_null())
            .collect();
        let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();

        let result = match kind.as_str() {
            "terms" => {
                let size = params
                    .get("size")
                    .and_then(Value::as_u64)
                    .map(|s| s as usize)
                    .unwrap_or(DEFAULT_TERMS_SIZE);
                terms_buckets(&values, size)
            }
            "avg" if numbers.is_empty() => json!({ "value": null }),
            "avg" => json!({ "value": numbers.iter().sum::<f64>() / numbers.len() as f64 }),
            "sum" => json!({ "value": numbers.iter().sum::<f64>() }),
            "min" => json!({ "value": numbers.iter().copied().reduce(f64::min) }),
            "max" => json!({ "value": numbers.iter().copied().reduce(f64::max) }),
            "value_count" => json!({ "value": values.len() }),
            other => {
                return Err(SearchError::invalid_query(format!(
                    "Unsupported aggregation type '{}'",
                    other
                )))
            }
        };
        results.insert(name.clone(), result);
    }

    Ok(Value::Object(results))
}

fn terms_buckets(values: &[&Value], size: usize) -> Value {
    let mut counts: Vec<(Value, u64)> = Vec::new();
    for value in values {
        match counts.iter_mut().find(|(key, _)| values_equal(key, value)) {
            Some((_, count)) => *count += 1,
            None => counts.push(((*value).clone(), 1)),
        }
    }
    // Highest count first; ties keep first-seen order.
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let buckets: Vec<Value> = counts
        .into_iter()
        .take(size)
        .map(|(key, doc_count)| json!({ "key": key, "doc_count": doc_count }))
        .collect();

    json!({
        "doc_count_error_upper_bound": 0,
        "sum_other_doc_count": 0,
        "buckets": buckets
    })
}
