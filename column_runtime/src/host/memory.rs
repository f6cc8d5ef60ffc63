//! In-memory host
//!
//! Single-document stand-ins for every host interface. They back the unit
//! tests and the preview binary, and record what the runtime did to them so
//! callers can inspect it afterwards.

use super::{
    AttributeStore, DataSource, DerivationCallback, DeriveError, FieldDeriver, HostError, Record,
    RecordId, Scheduler, Task, TaskId, ViewHost, ViewId,
};
use crate::cache::FieldMap;
use crate::element::ColumnElement;
use crate::handler::ColumnHandler;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

// ============================================================================
// RECORDS AND DATA SOURCE
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct MemoryRecord {
    id: String,
    properties: HashMap<String, String>,
}

impl MemoryRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, name: &str, value: impl Into<String>) -> Self {
        self.properties.insert(name.to_lowercase(), value.into());
        self
    }
}

impl Record for MemoryRecord {
    fn id(&self) -> RecordId {
        RecordId::new(self.id.clone())
    }

    fn property(&self, name: &str) -> Option<String> {
        self.properties.get(name).cloned()
    }
}

struct Row {
    record: Option<Rc<dyn Record>>,
    flags: u32,
}

/// Data source over a fixed list of rows
#[derive(Default)]
pub struct MemoryDataSource {
    rows: RefCell<Vec<Row>>,
    handlers: RefCell<BTreeMap<String, Rc<ColumnHandler>>>,
    changes: RefCell<Vec<(usize, usize)>>,
    rejection: RefCell<Option<String>>,
}

impl MemoryDataSource {
    pub fn new(records: Vec<MemoryRecord>) -> Self {
        let source = Self::default();
        for record in records {
            source.push_record(record);
        }
        source
    }

    pub fn push_record(&self, record: MemoryRecord) {
        self.rows.borrow_mut().push(Row {
            record: Some(Rc::new(record)),
            flags: 0,
        });
    }

    /// Append a synthetic row, e.g. a group header
    pub fn push_placeholder(&self, flags: u32) {
        self.rows.borrow_mut().push(Row {
            record: None,
            flags,
        });
    }

    pub fn record(&self, row: usize) -> Option<Rc<dyn Record>> {
        self.rows.borrow().get(row).and_then(|r| r.record.clone())
    }

    pub fn handler(&self, column_id: &str) -> Option<Rc<ColumnHandler>> {
        self.handlers.borrow().get(column_id).cloned()
    }

    pub fn handler_ids(&self) -> Vec<String> {
        self.handlers.borrow().keys().cloned().collect()
    }

    /// Every `note_change` range received so far
    pub fn changes(&self) -> Vec<(usize, usize)> {
        self.changes.borrow().clone()
    }

    /// Make handler registration fail with `reason` until reset with `None`
    pub fn reject_handlers(&self, reason: Option<&str>) {
        *self.rejection.borrow_mut() = reason.map(str::to_string);
    }

    fn check_rejection(&self) -> Result<(), HostError> {
        match self.rejection.borrow().as_ref() {
            Some(reason) => Err(HostError::Rejected {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl DataSource for MemoryDataSource {
    fn row_count(&self) -> usize {
        self.rows.borrow().len()
    }

    fn row_flags(&self, row: usize) -> u32 {
        self.rows.borrow().get(row).map(|r| r.flags).unwrap_or(0)
    }

    fn record_at(&self, row: usize) -> Option<Rc<dyn Record>> {
        self.record(row)
    }

    fn add_column_handler(&self, column_id: &str, handler: Rc<ColumnHandler>) -> Result<(), HostError> {
        self.check_rejection()?;
        self.handlers.borrow_mut().insert(column_id.to_string(), handler);
        Ok(())
    }

    fn remove_column_handler(&self, column_id: &str) -> Result<(), HostError> {
        self.check_rejection()?;
        self.handlers.borrow_mut().remove(column_id);
        Ok(())
    }

    fn note_change(&self, first: usize, last: usize) {
        self.changes.borrow_mut().push((first, last));
    }
}

// ============================================================================
// VIEWS
// ============================================================================

pub struct MemoryView {
    id: ViewId,
    document_url: String,
    data_source: RefCell<Option<Rc<MemoryDataSource>>>,
    elements: RefCell<Vec<ColumnElement>>,
    rejection: RefCell<Option<String>>,
}

impl MemoryView {
    pub fn new(id: ViewId, document_url: impl Into<String>) -> Self {
        Self {
            id,
            document_url: document_url.into(),
            data_source: RefCell::new(None),
            elements: RefCell::new(Vec::new()),
            rejection: RefCell::new(None),
        }
    }

    pub fn with_data_source(self, source: Rc<MemoryDataSource>) -> Self {
        self.set_data_source(Some(source));
        self
    }

    /// Replace the data source; handlers on the old one are not carried over
    pub fn set_data_source(&self, source: Option<Rc<MemoryDataSource>>) {
        *self.data_source.borrow_mut() = source;
    }

    pub fn memory_data_source(&self) -> Option<Rc<MemoryDataSource>> {
        self.data_source.borrow().clone()
    }

    pub fn element(&self, column_id: &str) -> Option<ColumnElement> {
        self.elements
            .borrow()
            .iter()
            .find(|e| e.id == column_id)
            .cloned()
    }

    /// Element ids in document order
    pub fn element_ids(&self) -> Vec<String> {
        self.elements.borrow().iter().map(|e| e.id.clone()).collect()
    }

    /// Make element insertion and removal fail with `reason` until reset
    pub fn reject_elements(&self, reason: Option<&str>) {
        *self.rejection.borrow_mut() = reason.map(str::to_string);
    }

    fn check_rejection(&self) -> Result<(), HostError> {
        match self.rejection.borrow().as_ref() {
            Some(reason) => Err(HostError::Rejected {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }
}

impl ViewHost for MemoryView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn document_url(&self) -> String {
        self.document_url.clone()
    }

    fn data_source(&self) -> Option<Rc<dyn DataSource>> {
        let source: Rc<dyn DataSource> = self.data_source.borrow().clone()?;
        Some(source)
    }

    fn append_column_element(&self, element: ColumnElement) -> Result<(), HostError> {
        self.check_rejection()?;
        self.elements.borrow_mut().push(element);
        Ok(())
    }

    fn remove_column_element(&self, column_id: &str) -> Result<bool, HostError> {
        self.check_rejection()?;
        let mut elements = self.elements.borrow_mut();
        let before = elements.len();
        elements.retain(|e| e.id != column_id);
        Ok(elements.len() != before)
    }
}

// ============================================================================
// ATTRIBUTE STORE
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryAttributeStore {
    values: RefCell<BTreeMap<(String, String), BTreeMap<String, String>>>,
}

impl MemoryAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, document: &str, column_id: &str, attribute: &str, value: &str) {
        self.values
            .borrow_mut()
            .entry((document.to_string(), column_id.to_string()))
            .or_default()
            .insert(attribute.to_string(), value.to_string());
    }
}

impl AttributeStore for MemoryAttributeStore {
    fn attribute_names(&self, document: &str, column_id: &str) -> Vec<String> {
        self.values
            .borrow()
            .get(&(document.to_string(), column_id.to_string()))
            .map(|attrs| attrs.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn value(&self, document: &str, column_id: &str, attribute: &str) -> Option<String> {
        self.values
            .borrow()
            .get(&(document.to_string(), column_id.to_string()))
            .and_then(|attrs| attrs.get(attribute).cloned())
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Scheduler driven by a virtual clock
///
/// Nothing runs until the clock is advanced. Tasks due at the same instant
/// run in scheduling order.
#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    queue: RefCell<BTreeMap<(Duration, u64), Task>>,
    deadlines: RefCell<HashMap<u64, Duration>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now.get()
    }

    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Move the clock forward by `by`, running every task that falls due;
    /// returns how many ran
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now.get() + by;
        let mut ran = 0;
        while let Some(task) = self.pop_due(Some(target)) {
            task();
            ran += 1;
        }
        self.now.set(target);
        ran
    }

    /// Run tasks in deadline order until none are left, moving the clock along
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.pop_due(None) {
            task();
            ran += 1;
        }
        ran
    }

    fn pop_due(&self, limit: Option<Duration>) -> Option<Task> {
        let mut queue = self.queue.borrow_mut();
        let (&(deadline, id), _) = queue.iter().next()?;
        if limit.is_some_and(|limit| deadline > limit) {
            return None;
        }
        let task = queue.remove(&(deadline, id))?;
        self.deadlines.borrow_mut().remove(&id);
        if deadline > self.now.get() {
            self.now.set(deadline);
        }
        Some(task)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> TaskId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);

        let deadline = self.now.get() + delay;
        self.queue.borrow_mut().insert((deadline, id), task);
        self.deadlines.borrow_mut().insert(id, deadline);
        TaskId(id)
    }

    fn cancel(&self, task: TaskId) {
        if let Some(deadline) = self.deadlines.borrow_mut().remove(&task.0) {
            self.queue.borrow_mut().remove(&(deadline, task.0));
        }
    }
}

// ============================================================================
// DERIVERS
// ============================================================================

/// Deriver whose requests wait until the caller completes them
#[derive(Default)]
pub struct QueuedDeriver {
    queue: RefCell<VecDeque<DerivationCallback>>,
    requests: Cell<usize>,
    immediate: Cell<bool>,
}

impl QueuedDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete every later request inside `derive` with empty fields
    pub fn complete_immediately(&self, immediate: bool) {
        self.immediate.set(immediate);
    }

    /// Total number of `derive` calls
    pub fn request_count(&self) -> usize {
        self.requests.get()
    }

    /// Requests not completed yet
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Complete the oldest request; false when nothing is queued
    pub fn complete_next(&self, result: Result<FieldMap, DeriveError>) -> bool {
        let next = self.queue.borrow_mut().pop_front();
        match next {
            Some(done) => {
                done(result);
                true
            }
            None => false,
        }
    }
}

impl FieldDeriver for QueuedDeriver {
    fn derive(&self, _record: Rc<dyn Record>, done: DerivationCallback) {
        self.requests.set(self.requests.get() + 1);
        if self.immediate.get() {
            done(Ok(FieldMap::new()));
        } else {
            self.queue.borrow_mut().push_back(done);
        }
    }
}

/// Deriver backed by a fixed table of field maps, completing through the
/// scheduler after `latency`
pub struct StaticDeriver {
    scheduler: Rc<dyn Scheduler>,
    latency: Duration,
    fields: HashMap<RecordId, FieldMap>,
}

impl StaticDeriver {
    pub fn new(scheduler: Rc<dyn Scheduler>, latency: Duration) -> Self {
        Self {
            scheduler,
            latency,
            fields: HashMap::new(),
        }
    }

    pub fn insert(&mut self, id: RecordId, fields: FieldMap) {
        self.fields.insert(id, fields);
    }
}

impl FieldDeriver for StaticDeriver {
    fn derive(&self, record: Rc<dyn Record>, done: DerivationCallback) {
        let result = self
            .fields
            .get(&record.id())
            .cloned()
            .ok_or(DeriveError::RecordUnavailable);
        self.scheduler.schedule(self.latency, Box::new(move || done(result)));
    }
}
