//! Runs registered columns over sample records in one in-memory view

use crate::input::{ColumnSpec, RecordSpec};
use column_runtime::host::memory::{
    ManualScheduler, MemoryAttributeStore, MemoryDataSource, MemoryView, StaticDeriver,
};
use column_runtime::host::{RecordId, ViewHost, ViewId};
use column_runtime::{ColumnCoordinator, CoordinatorContext, CoordinatorError, RowSortKey};
use column_template::config::RuntimeConfig;
use column_template::log_info;
use column_template::logging::codes::{self, Code};
use serde::Serialize;
use std::rc::Rc;
use std::time::Duration;

/// Simulated decoder latency for derived fields
const DERIVE_LATENCY: Duration = Duration::from_millis(5);

const PREVIEW_DOCUMENT: &str = "about:column-preview";

#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error(transparent)]
    Column(#[from] CoordinatorError),

    #[error("Cannot sort by '{0}': no such column")]
    UnknownSortColumn(String),
}

impl PreviewError {
    pub fn code(&self) -> Code {
        match self {
            Self::Column(err) => err.code(),
            Self::UnknownSortColumn(_) => codes::registry::UNKNOWN_COLUMN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortOrder {
    pub column_id: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewColumn {
    pub id: String,
    pub label: String,
    pub numeric: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewRow {
    pub record: String,
    pub values: Vec<String>,
    #[serde(skip)]
    pub sort_key: Option<RowSortKey>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Preview {
    pub columns: Vec<PreviewColumn>,
    pub rows: Vec<PreviewRow>,
    pub derivations: usize,
}

pub fn run(
    config: RuntimeConfig,
    columns: &[ColumnSpec],
    records: &[RecordSpec],
    sort: Option<&SortOrder>,
) -> Result<Preview, PreviewError> {
    if let Some(order) = sort {
        if !columns.iter().any(|c| c.id == order.column_id) {
            return Err(PreviewError::UnknownSortColumn(order.column_id.clone()));
        }
    }

    let scheduler = Rc::new(ManualScheduler::new());
    let mut deriver = StaticDeriver::new(scheduler.clone(), DERIVE_LATENCY);
    for record in records {
        if let Some(fields) = &record.derived {
            deriver.insert(RecordId::new(record.id.clone()), fields.clone());
        }
    }

    let mut coordinator = ColumnCoordinator::new(CoordinatorContext {
        config,
        scheduler: scheduler.clone(),
        deriver: Rc::new(deriver),
        attributes: Rc::new(MemoryAttributeStore::new()),
    });

    for column in columns {
        coordinator.register_column_json(
            &column.id,
            &column.label,
            &column.tooltip,
            &column.template,
            &column.options,
        )?;
    }

    let source = Rc::new(MemoryDataSource::new(
        records.iter().map(RecordSpec::to_memory_record).collect(),
    ));
    let view = Rc::new(MemoryView::new(ViewId(1), PREVIEW_DOCUMENT).with_data_source(source.clone()));
    let host: Rc<dyn ViewHost> = view.clone();
    coordinator.view_created(&host)?;

    // First pass starts derivations; values settle once the clock runs out
    let handlers: Vec<_> = columns
        .iter()
        .filter_map(|c| source.handler(&c.id))
        .collect();
    for handler in &handlers {
        for row in 0..records.len() {
            handler.value_for_row(row);
        }
    }
    let settled = scheduler.run_until_idle();
    log_info!("Preview settled", "tasks" => settled, "records" => records.len());

    let sort_handler = sort.and_then(|order| source.handler(&order.column_id));
    let mut rows: Vec<PreviewRow> = records
        .iter()
        .enumerate()
        .map(|(row, record)| PreviewRow {
            record: record.id.clone(),
            values: handlers.iter().map(|h| h.value_for_row(row)).collect(),
            sort_key: sort_handler.as_ref().map(|h| h.sort_key_for_row(row)),
        })
        .collect();

    if let Some(order) = sort {
        rows.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        if order.descending {
            rows.reverse();
        }
    }

    let preview = Preview {
        columns: handlers
            .iter()
            .map(|h| PreviewColumn {
                id: h.column_id().to_string(),
                label: h.definition().label.clone(),
                numeric: h.is_numeric(),
            })
            .collect(),
        rows,
        derivations: coordinator.field_cache().derivations_started(),
    };

    coordinator.shutdown()?;
    Ok(preview)
}
