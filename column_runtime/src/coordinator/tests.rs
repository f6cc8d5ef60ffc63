use super::*;
use crate::cache::FieldMap;
use crate::column::FieldSource;
use crate::host::memory::{
    ManualScheduler, MemoryAttributeStore, MemoryDataSource, MemoryRecord, MemoryView,
    QueuedDeriver,
};
use crate::host::DeriveError;
use assert_matches::assert_matches;
use column_template::template::TemplateError;
use serde_json::json;
use std::time::Duration;

const DOC: &str = "chrome://messenger/content/messenger.xhtml";

struct Harness {
    scheduler: Rc<ManualScheduler>,
    deriver: Rc<QueuedDeriver>,
    attributes: Rc<MemoryAttributeStore>,
    coordinator: ColumnCoordinator,
}

fn harness() -> Harness {
    let scheduler = Rc::new(ManualScheduler::new());
    let deriver = Rc::new(QueuedDeriver::new());
    let attributes = Rc::new(MemoryAttributeStore::new());
    let config = RuntimeConfig {
        refresh_delay_ms: 100,
        max_template_depth: 8,
        host_version: "115.0".to_string(),
        ..RuntimeConfig::default()
    };

    let coordinator = ColumnCoordinator::new(CoordinatorContext {
        config,
        scheduler: scheduler.clone(),
        deriver: deriver.clone(),
        attributes: attributes.clone(),
    });

    Harness {
        scheduler,
        deriver,
        attributes,
        coordinator,
    }
}

fn host(view: &Rc<MemoryView>) -> Rc<dyn ViewHost> {
    view.clone()
}

fn ready_view(id: u64, records: Vec<MemoryRecord>) -> Rc<MemoryView> {
    let source = Rc::new(MemoryDataSource::new(records));
    Rc::new(MemoryView::new(ViewId(id), DOC).with_data_source(source))
}

fn register(h: &mut Harness, id: &str) {
    h.coordinator
        .register_column(id, id, "", ParseNode::field("subject"), ColumnOptions::default())
        .unwrap();
}

fn assert_synchronized(h: &Harness, views: &[&Rc<MemoryView>]) {
    let mut registered: Vec<String> = h
        .coordinator
        .registered_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    registered.sort();

    for view in views {
        let view_id = view.id();
        assert_eq!(h.coordinator.attached_columns(view_id), registered, "{}", view_id);
        assert_eq!(h.coordinator.materialized_columns(view_id), registered, "{}", view_id);

        let source = view.memory_data_source().unwrap();
        assert_eq!(source.handler_ids(), registered, "{}", view_id);

        let mut elements = view.element_ids();
        elements.sort();
        assert_eq!(elements, registered, "{}", view_id);
    }
}

#[test]
fn test_lifecycle_keeps_views_synchronized() {
    let mut h = harness();
    register(&mut h, "a");
    register(&mut h, "b");

    let v1 = ready_view(1, vec![]);
    let v2 = ready_view(2, vec![]);
    h.coordinator.view_created(&host(&v1)).unwrap();
    h.coordinator.view_created(&host(&v2)).unwrap();
    assert_synchronized(&h, &[&v1, &v2]);

    h.coordinator.unregister_column("a").unwrap();
    register(&mut h, "c");
    assert_synchronized(&h, &[&v1, &v2]);

    h.coordinator.view_destroyed(v1.id());
    let v3 = ready_view(3, vec![]);
    h.coordinator.view_created(&host(&v3)).unwrap();
    register(&mut h, "d");
    assert_synchronized(&h, &[&v2, &v3]);

    // The destroyed view is left alone
    assert_eq!(v1.element_ids(), vec!["b", "c"]);
    assert_eq!(h.coordinator.live_views(), vec![ViewId(2), ViewId(3)]);
}

#[test]
fn test_elements_follow_registration_order() {
    let mut h = harness();
    register(&mut h, "zeta");
    register(&mut h, "alpha");

    let view = ready_view(1, vec![]);
    h.coordinator.view_created(&host(&view)).unwrap();

    assert_eq!(h.coordinator.registered_ids(), vec!["zeta", "alpha"]);
    assert_eq!(view.element_ids(), vec!["zeta", "alpha"]);
}

#[test]
fn test_reregistration_replaces_definition() {
    let mut h = harness();
    let view = ready_view(1, vec![MemoryRecord::new("m1").with_property("subject", "Hello")]);
    h.coordinator.view_created(&host(&view)).unwrap();

    h.coordinator
        .register_column("col", "Old", "", ParseNode::literal("old"), ColumnOptions::default())
        .unwrap();
    h.coordinator
        .register_column("col", "New", "", ParseNode::field("subject"), ColumnOptions::default().numeric())
        .unwrap();

    assert_eq!(h.coordinator.registered_ids(), vec!["col"]);
    assert_eq!(view.element_ids(), vec!["col"]);
    assert_eq!(view.element("col").unwrap().label, "New");

    let handler = view.memory_data_source().unwrap().handler("col").unwrap();
    assert_eq!(handler.value_for_row(0), "Hello");
    assert!(handler.is_numeric());
}

#[test]
fn test_handlers_wait_for_data_source() {
    let mut h = harness();
    register(&mut h, "a");

    let view = Rc::new(MemoryView::new(ViewId(1), DOC));
    h.coordinator.view_created(&host(&view)).unwrap();
    assert_eq!(view.element_ids(), vec!["a"]);
    assert!(h.coordinator.attached_columns(ViewId(1)).is_empty());

    view.set_data_source(Some(Rc::new(MemoryDataSource::new(vec![]))));
    h.coordinator.view_data_source_ready(ViewId(1)).unwrap();
    assert_synchronized(&h, &[&view]);
}

#[test]
fn test_recreated_data_source_gets_fresh_handlers() {
    let mut h = harness();
    register(&mut h, "a");
    let view = ready_view(1, vec![]);
    h.coordinator.view_created(&host(&view)).unwrap();
    let old = view.memory_data_source().unwrap();

    // Folder switch
    view.set_data_source(Some(Rc::new(MemoryDataSource::new(vec![]))));
    h.coordinator.data_sources_changed().unwrap();

    assert_synchronized(&h, &[&view]);
    assert_eq!(old.handler_ids(), vec!["a"]);
    assert_eq!(view.element_ids(), vec!["a"]);
}

#[test]
fn test_persisted_attributes_restored() {
    let mut h = harness();
    h.attributes.set(DOC, "a", "width", "80");
    h.attributes.set(DOC, "a", "ordinal", "5");
    register(&mut h, "a");

    let view = ready_view(1, vec![]);
    h.coordinator.view_created(&host(&view)).unwrap();

    let element = view.element("a").unwrap();
    assert_eq!(element.attribute("width"), Some("80"));
    assert_eq!(element.ordinal.as_deref(), Some("5"));
    assert!(h.coordinator.capabilities().ordinal_as_property);
}

#[test]
fn test_attach_failure_is_reported_and_not_recorded() {
    let mut h = harness();
    let good = ready_view(1, vec![]);
    let bad = ready_view(2, vec![]);
    bad.memory_data_source()
        .unwrap()
        .reject_handlers(Some("view is closing"));
    h.coordinator.view_created(&host(&good)).unwrap();
    h.coordinator.view_created(&host(&bad)).unwrap();

    let err = h
        .coordinator
        .register_column("a", "A", "", ParseNode::literal("x"), ColumnOptions::default())
        .unwrap_err();

    assert_matches!(&err, CoordinatorError::Attachment { failures } if failures.len() == 1);
    let failure = &err.failures()[0];
    assert_eq!(failure.view_id, ViewId(2));
    assert_eq!(failure.target, AttachmentTarget::Handler);
    assert_eq!(failure.action, AttachmentAction::Attach);

    // The column is registered and the healthy view is complete
    assert_eq!(h.coordinator.registered_ids(), vec!["a"]);
    assert_synchronized(&h, &[&good]);
    assert!(h.coordinator.attached_columns(ViewId(2)).is_empty());
    assert_eq!(h.coordinator.materialized_columns(ViewId(2)), vec!["a"]);
}

#[test]
fn test_detach_failure_still_updates_bookkeeping() {
    let mut h = harness();
    register(&mut h, "a");
    let view = ready_view(1, vec![]);
    h.coordinator.view_created(&host(&view)).unwrap();

    view.reject_elements(Some("document closed"));
    let err = h.coordinator.unregister_column("a").unwrap_err();

    assert_eq!(err.failures().len(), 1);
    assert_eq!(err.failures()[0].target, AttachmentTarget::Element);
    assert_eq!(err.failures()[0].action, AttachmentAction::Detach);
    assert!(h.coordinator.attached_columns(ViewId(1)).is_empty());
    assert!(h.coordinator.materialized_columns(ViewId(1)).is_empty());
}

#[test]
fn test_unregister_unknown_column() {
    let mut h = harness();
    let view = ready_view(1, vec![]);
    h.coordinator.view_created(&host(&view)).unwrap();

    assert!(h.coordinator.unregister_column("missing").is_ok());
    assert!(h.coordinator.registered_ids().is_empty());
}

#[test]
fn test_rejected_registrations() {
    let mut h = harness();

    let mut deep = ParseNode::literal("x");
    for _ in 0..10 {
        deep = ParseNode::concat(vec![deep]);
    }
    assert_matches!(
        h.coordinator
            .register_column("deep", "", "", deep, ColumnOptions::default()),
        Err(CoordinatorError::Template {
            source: TemplateError::DepthExceeded { .. },
            ..
        })
    );

    assert_matches!(
        h.coordinator
            .register_column(" ", "", "", ParseNode::literal("x"), ColumnOptions::default()),
        Err(CoordinatorError::InvalidColumn { .. })
    );

    assert_matches!(
        h.coordinator.register_column_json(
            "bad",
            "",
            "",
            &json!({"nodeType": "literal"}),
            &json!(null)
        ),
        Err(CoordinatorError::Template {
            source: TemplateError::Parse { .. },
            ..
        })
    );

    assert!(h.coordinator.registered_ids().is_empty());
}

#[test]
fn test_invalid_pattern_is_accepted() {
    let mut h = harness();
    let result = h.coordinator.register_column(
        "a",
        "",
        "",
        ParseNode::regex(ParseNode::field("from"), "(", "", ""),
        ColumnOptions::default(),
    );

    assert!(result.is_ok());
    assert_eq!(h.coordinator.registered_ids(), vec!["a"]);
}

#[test]
fn test_register_from_json() {
    let mut h = harness();
    h.coordinator
        .register_column_json(
            "listId",
            "List",
            "Mailing list",
            &json!({"nodeType": "header", "headerName": "List-Id"}),
            &json!({"useDBHeaders": false}),
        )
        .unwrap();

    let definition = h.coordinator.definition("listId").unwrap();
    assert_eq!(definition.field_source(), FieldSource::CachedDerived);
    assert!(!definition.sort_numeric());
    assert_eq!(definition.tooltip, "Mailing list");

    assert_matches!(
        h.coordinator.register_column_json(
            "x",
            "",
            "",
            &json!({"nodeType": "literal", "literalString": ""}),
            &json!({"fieldSource": "elsewhere"})
        ),
        Err(CoordinatorError::Options { .. })
    );
}

#[test]
fn test_sender_domain_end_to_end() {
    let mut h = harness();
    h.coordinator
        .register_column(
            "senderDomain",
            "Domain",
            "",
            ParseNode::regex(ParseNode::field("author"), ".*@", "", ""),
            ColumnOptions::default(),
        )
        .unwrap();

    let view = ready_view(
        1,
        vec![MemoryRecord::new("m1").with_property("author", "Jane Doe <jane@example.com>")],
    );
    h.coordinator.view_created(&host(&view)).unwrap();

    let handler = view.memory_data_source().unwrap().handler("senderDomain").unwrap();
    assert_eq!(handler.value_for_row(0), "example.com>");
    assert_eq!(h.deriver.request_count(), 0);
}

#[test]
fn test_derived_column_across_views() {
    let mut h = harness();
    h.coordinator
        .register_column(
            "list",
            "List",
            "",
            ParseNode::field("list-id"),
            ColumnOptions::default().derived(),
        )
        .unwrap();

    let v1 = ready_view(1, vec![MemoryRecord::new("m1")]);
    let v2 = ready_view(2, vec![MemoryRecord::new("m1")]);
    h.coordinator.view_created(&host(&v1)).unwrap();
    h.coordinator.view_created(&host(&v2)).unwrap();

    let h1 = v1.memory_data_source().unwrap().handler("list").unwrap();
    let h2 = v2.memory_data_source().unwrap().handler("list").unwrap();
    for _ in 0..50 {
        assert_eq!(h1.value_for_row(0), "");
        assert_eq!(h2.value_for_row(0), "");
    }
    // One shared cache: the same record is derived once for both views
    assert_eq!(h.deriver.request_count(), 1);

    h.deriver
        .complete_next(Ok(FieldMap::new().with("list-id", "<dev.example.org>")));
    h.scheduler.advance(Duration::from_millis(100));

    assert_eq!(v1.memory_data_source().unwrap().changes(), vec![(0, 0)]);
    assert_eq!(h1.value_for_row(0), "<dev.example.org>");
    assert_eq!(h2.value_for_row(0), "<dev.example.org>");
}

#[test]
fn test_destroyed_view_refresh_cancelled() {
    let mut h = harness();
    h.coordinator
        .register_column("list", "", "", ParseNode::field("list-id"), ColumnOptions::default().derived())
        .unwrap();
    let view = ready_view(1, vec![MemoryRecord::new("m1")]);
    h.coordinator.view_created(&host(&view)).unwrap();

    let handler = view.memory_data_source().unwrap().handler("list").unwrap();
    handler.value_for_row(0);
    h.deriver.complete_next(Err(DeriveError::DecodeFailed {
        reason: "truncated".to_string(),
    }));
    assert_eq!(h.scheduler.pending(), 1);

    h.coordinator.view_destroyed(ViewId(1));
    assert_eq!(h.scheduler.pending(), 0);
    assert!(view.memory_data_source().unwrap().changes().is_empty());
    assert!(h.coordinator.live_views().is_empty());
}

#[test]
fn test_dropped_views_are_pruned() {
    let mut h = harness();
    let view = ready_view(1, vec![]);
    h.coordinator.view_created(&host(&view)).unwrap();
    drop(view);

    register(&mut h, "a");
    assert!(h.coordinator.live_views().is_empty());
    assert!(h.coordinator.attached_columns(ViewId(1)).is_empty());
}

#[test]
fn test_shutdown_detaches_everything() {
    let mut h = harness();
    register(&mut h, "a");
    register(&mut h, "b");
    let v1 = ready_view(1, vec![]);
    let v2 = ready_view(2, vec![]);
    h.coordinator.view_created(&host(&v1)).unwrap();
    h.coordinator.view_created(&host(&v2)).unwrap();

    h.coordinator.shutdown().unwrap();

    for view in [&v1, &v2] {
        assert!(view.element_ids().is_empty());
        assert!(view.memory_data_source().unwrap().handler_ids().is_empty());
    }
    assert!(h.coordinator.live_views().is_empty());
}

#[test]
fn test_duplicate_view_created_is_idempotent() {
    let mut h = harness();
    register(&mut h, "a");
    let view = ready_view(1, vec![]);

    h.coordinator.view_created(&host(&view)).unwrap();
    h.coordinator.view_created(&host(&view)).unwrap();

    assert_synchronized(&h, &[&view]);
    assert_eq!(view.element_ids(), vec!["a"]);
}
