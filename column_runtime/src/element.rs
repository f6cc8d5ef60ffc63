//! Column elements materialized into view documents

use crate::column::ColumnDefinition;
use crate::host::{AttributeStore, HostCapabilities};
use column_template::config::constants::element::{
    DEFAULT_CLOSEMENU, DEFAULT_FLEX, ORDINAL_ATTRIBUTE, PERSISTED_ATTRIBUTES,
};
use std::collections::BTreeMap;

/// Visual column header handed to a view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnElement {
    pub id: String,
    pub label: String,
    pub tooltip: String,
    /// Defaults overlaid with the persisted attributes
    pub attributes: BTreeMap<String, String>,
    /// Ordinal restored as an element property (current hosts only)
    pub ordinal: Option<String>,
}

impl ColumnElement {
    /// Build the element for `definition` in `document`, restoring whatever
    /// the host persisted for it last time
    pub fn materialize(
        definition: &ColumnDefinition,
        document: &str,
        store: &dyn AttributeStore,
        capabilities: HostCapabilities,
    ) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert("persist".to_string(), PERSISTED_ATTRIBUTES.to_string());
        attributes.insert("flex".to_string(), DEFAULT_FLEX.to_string());
        attributes.insert("closemenu".to_string(), DEFAULT_CLOSEMENU.to_string());

        let mut element = Self {
            id: definition.id.clone(),
            label: definition.label.clone(),
            tooltip: definition.tooltip.clone(),
            attributes,
            ordinal: None,
        };

        for name in store.attribute_names(document, &definition.id) {
            let Some(value) = store.value(document, &definition.id, &name) else {
                continue;
            };
            match name.as_str() {
                "label" => element.label = value,
                "tooltiptext" => element.tooltip = value,
                // The column id stays the key the element is removed by
                "id" => {}
                ORDINAL_ATTRIBUTE if capabilities.ordinal_as_property => {
                    element.ordinal = Some(value);
                }
                _ => {
                    element.attributes.insert(name, value);
                }
            }
        }

        element
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnOptions;
    use crate::host::memory::MemoryAttributeStore;
    use column_template::ParseNode;

    const DOC: &str = "chrome://messenger/content/messenger.xhtml";

    fn definition() -> ColumnDefinition {
        ColumnDefinition::new(
            "senderDomain",
            "Domain",
            "Sender domain",
            ParseNode::field("from"),
            ColumnOptions::default(),
            8,
        )
        .unwrap()
    }

    #[test]
    fn test_defaults_without_persisted_state() {
        let store = MemoryAttributeStore::new();
        let element = ColumnElement::materialize(
            &definition(),
            DOC,
            &store,
            HostCapabilities::from_version("115.0"),
        );

        assert_eq!(element.id, "senderDomain");
        assert_eq!(element.label, "Domain");
        assert_eq!(element.tooltip, "Sender domain");
        assert_eq!(element.attribute("persist"), Some("hidden ordinal sortDirection width"));
        assert_eq!(element.attribute("flex"), Some("2"));
        assert_eq!(element.attribute("closemenu"), Some("none"));
        assert_eq!(element.ordinal, None);
    }

    #[test]
    fn test_restores_persisted_attributes() {
        let store = MemoryAttributeStore::new();
        store.set(DOC, "senderDomain", "width", "120");
        store.set(DOC, "senderDomain", "hidden", "true");
        store.set(DOC, "senderDomain", "ordinal", "7");
        store.set("other-document", "senderDomain", "width", "999");

        let current = ColumnElement::materialize(
            &definition(),
            DOC,
            &store,
            HostCapabilities::from_version("115.0"),
        );
        assert_eq!(current.attribute("width"), Some("120"));
        assert_eq!(current.attribute("hidden"), Some("true"));
        assert_eq!(current.attribute("ordinal"), None);
        assert_eq!(current.ordinal.as_deref(), Some("7"));

        let legacy = ColumnElement::materialize(
            &definition(),
            DOC,
            &store,
            HostCapabilities::from_version("68.0"),
        );
        assert_eq!(legacy.attribute("ordinal"), Some("7"));
        assert_eq!(legacy.ordinal, None);
    }

    #[test]
    fn test_persisted_label_and_tooltip_override_definition() {
        let store = MemoryAttributeStore::new();
        store.set(DOC, "senderDomain", "label", "From domain");
        store.set(DOC, "senderDomain", "tooltiptext", "Domain of the sender");
        store.set(DOC, "senderDomain", "id", "renamed");

        let element = ColumnElement::materialize(
            &definition(),
            DOC,
            &store,
            HostCapabilities::from_version("115.0"),
        );

        assert_eq!(element.label, "From domain");
        assert_eq!(element.tooltip, "Domain of the sender");
        assert_eq!(element.id, "senderDomain");
        assert_eq!(element.attribute("label"), None);
        assert_eq!(element.attribute("id"), None);
    }
}
