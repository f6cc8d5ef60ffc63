//! Shared cache of derived record fields
//!
//! One cache serves every view. A record's entry moves from absent to
//! pending when a handler first asks for it and to ready when the host
//! deriver completes; ready entries are never replaced or evicted, so each
//! record is derived at most once for the lifetime of the cache.

mod fields;

pub use fields::FieldMap;

use crate::host::{DeriveError, FieldDeriver, Record, RecordId, ViewHost};
use crate::refresh::RefreshDebouncer;
use column_template::logging::codes;
use column_template::{log_debug, log_warning};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

/// Observable state of one record's entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState {
    Absent,
    Pending,
    Ready(Rc<FieldMap>),
}

enum Entry {
    Pending,
    Ready(Rc<FieldMap>),
}

/// Cheaply cloneable handle; clones share the same entries
#[derive(Clone)]
pub struct FieldCache {
    inner: Rc<CacheState>,
}

struct CacheState {
    entries: RefCell<HashMap<RecordId, Entry>>,
    deriver: Rc<dyn FieldDeriver>,
    refresh: RefreshDebouncer,
    derivations: Cell<usize>,
}

impl FieldCache {
    pub fn new(deriver: Rc<dyn FieldDeriver>, refresh: RefreshDebouncer) -> Self {
        Self {
            inner: Rc::new(CacheState {
                entries: RefCell::new(HashMap::new()),
                deriver,
                refresh,
                derivations: Cell::new(0),
            }),
        }
    }

    /// Fields of `record` if they are ready
    ///
    /// Otherwise returns `None`; the first such call starts the derivation,
    /// and `view` is refreshed once it completes.
    pub fn fields_for(
        &self,
        record: &Rc<dyn Record>,
        view: &Rc<dyn ViewHost>,
    ) -> Option<Rc<FieldMap>> {
        let id = record.id();
        {
            let mut entries = self.inner.entries.borrow_mut();
            match entries.get(&id) {
                Some(Entry::Ready(fields)) => return Some(fields.clone()),
                Some(Entry::Pending) => return None,
                None => {
                    entries.insert(id.clone(), Entry::Pending);
                }
            }
        }

        self.start_derivation(id, record.clone(), Rc::downgrade(view));
        None
    }

    pub fn state(&self, id: &RecordId) -> FieldState {
        match self.inner.entries.borrow().get(id) {
            None => FieldState::Absent,
            Some(Entry::Pending) => FieldState::Pending,
            Some(Entry::Ready(fields)) => FieldState::Ready(fields.clone()),
        }
    }

    /// Number of derivations started so far
    pub fn derivations_started(&self) -> usize {
        self.inner.derivations.get()
    }

    pub fn len(&self) -> usize {
        self.inner.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.borrow().is_empty()
    }

    pub fn refresh(&self) -> &RefreshDebouncer {
        &self.inner.refresh
    }

    fn start_derivation(&self, id: RecordId, record: Rc<dyn Record>, view: Weak<dyn ViewHost>) {
        self.inner.derivations.set(self.inner.derivations.get() + 1);
        log_debug!("Deriving record fields", "record" => &id);

        // The callback must not keep the cache alive on its own
        let state = Rc::downgrade(&self.inner);
        self.inner.deriver.derive(
            record,
            Box::new(move |result| {
                if let Some(inner) = state.upgrade() {
                    FieldCache { inner }.complete(id, result, view);
                }
            }),
        );
    }

    fn complete(&self, id: RecordId, result: Result<FieldMap, DeriveError>, view: Weak<dyn ViewHost>) {
        let fields = match result {
            Ok(fields) => fields,
            Err(err) => {
                log_warning!(
                    err.code(),
                    "Field derivation failed, caching empty fields",
                    "record" => &id,
                    "error" => &err
                );
                FieldMap::new()
            }
        };

        {
            let mut entries = self.inner.entries.borrow_mut();
            if let Some(Entry::Ready(_)) = entries.get(&id) {
                return;
            }
            entries.insert(id.clone(), Entry::Ready(Rc::new(fields)));
        }

        log_debug!(
            "Record fields ready",
            "record" => &id,
            "code" => codes::success::FIELDS_DERIVED
        );
        self.inner.refresh.request(view);
    }
}
