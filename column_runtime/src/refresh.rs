//! Debounced view refreshes
//!
//! Derived fields arrive one record at a time. Each arrival asks for a
//! refresh of the view that requested it; requests for the same view within
//! the delay window collapse into one invalidation of all its rows.

use crate::host::{Scheduler, TaskId, ViewHost, ViewId};
use column_template::log_debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::time::Duration;

#[derive(Clone)]
pub struct RefreshDebouncer {
    inner: Rc<DebounceState>,
}

struct DebounceState {
    scheduler: Rc<dyn Scheduler>,
    delay: Duration,
    pending: RefCell<HashMap<ViewId, TaskId>>,
}

impl RefreshDebouncer {
    pub fn new(scheduler: Rc<dyn Scheduler>, delay: Duration) -> Self {
        Self {
            inner: Rc::new(DebounceState {
                scheduler,
                delay,
                pending: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Restart the view's refresh timer; a view that is already gone is ignored
    pub fn request(&self, view: Weak<dyn ViewHost>) {
        let Some(view_id) = view.upgrade().map(|live| live.id()) else {
            return;
        };

        self.cancel(view_id);

        let state = Rc::downgrade(&self.inner);
        let task = self.inner.scheduler.schedule(
            self.inner.delay,
            Box::new(move || {
                if let Some(state) = state.upgrade() {
                    state.pending.borrow_mut().remove(&view_id);
                }
                refresh_view(&view);
            }),
        );
        self.inner.pending.borrow_mut().insert(view_id, task);
    }

    /// Drop the view's pending refresh, if any
    pub fn cancel(&self, view_id: ViewId) {
        let previous = self.inner.pending.borrow_mut().remove(&view_id);
        if let Some(task) = previous {
            self.inner.scheduler.cancel(task);
        }
    }

    pub fn cancel_all(&self) {
        let pending: Vec<TaskId> = self.inner.pending.borrow_mut().drain().map(|(_, t)| t).collect();
        for task in pending {
            self.inner.scheduler.cancel(task);
        }
    }

    pub fn is_pending(&self, view_id: ViewId) -> bool {
        self.inner.pending.borrow().contains_key(&view_id)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    pub fn delay(&self) -> Duration {
        self.inner.delay
    }
}

fn refresh_view(view: &Weak<dyn ViewHost>) {
    let Some(view) = view.upgrade() else {
        return;
    };
    let Some(source) = view.data_source() else {
        return;
    };
    let rows = source.row_count();
    if rows == 0 {
        return;
    }

    log_debug!("Refreshing view rows", "view" => view.id(), "rows" => rows);
    source.note_change(0, rows - 1);
}
