//! Widget instance configuration
//!
//! `WidgetConfig` is the typed record the listing reads. `WidgetForm` is the
//! raw shape the settings form submits. The mapping between them is pure so
//! any front end can reuse it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::MwResult;
use crate::pagination::DEFAULT_PAGE_SIZE;
use crate::types::{Category, Id, InstanceId};

/// Persisted configuration of one widget instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WidgetConfig {
    pub title: String,
    pub category_id: Option<Id>,
    pub page_size: u32,
    pub open_in_new_tab: bool,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            title: String::new(),
            category_id: None,
            page_size: DEFAULT_PAGE_SIZE,
            open_in_new_tab: true,
        }
    }
}

impl WidgetConfig {
    pub fn new(title: impl Into<String>, category_id: Id) -> Self {
        Self {
            title: title.into(),
            category_id: Some(category_id),
            ..Default::default()
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_new_tab(mut self, open_in_new_tab: bool) -> Self {
        self.open_in_new_tab = open_in_new_tab;
        self
    }

    /// Page size actually used for queries; zero falls back to the default
    pub fn effective_page_size(&self) -> u32 {
        if self.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }

    /// Build a config from submitted form values.
    ///
    /// Only integer coercion is applied: a missing, empty, zero, or
    /// non-numeric `maxitems` becomes the default page size, an unparsable
    /// `category` becomes unset, and any non-empty `newwindow` other than
    /// `"0"` enables opening in a new tab.
    pub fn from_form(form: &WidgetForm) -> Self {
        let category_id = form
            .category
            .as_deref()
            .and_then(|c| c.trim().parse::<Id>().ok());

        let page_size = form
            .maxitems
            .as_deref()
            .and_then(|m| m.trim().parse::<u32>().ok())
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        let open_in_new_tab = form
            .newwindow
            .as_deref()
            .map(|v| !v.is_empty() && v != "0")
            .unwrap_or(false);

        Self {
            title: form.title.clone().unwrap_or_default(),
            category_id,
            page_size,
            open_in_new_tab,
        }
    }

    /// Inverse of [`WidgetConfig::from_form`]
    pub fn to_form(&self) -> WidgetForm {
        WidgetForm {
            title: Some(self.title.clone()),
            category: self.category_id.map(|c| c.to_string()),
            maxitems: Some(self.effective_page_size().to_string()),
            newwindow: self.open_in_new_tab.then(|| "1".to_string()),
        }
    }

    /// Describe the settings form for this config
    pub fn form_fields(&self, categories: &[Category]) -> Vec<FormField> {
        let form = self.to_form();
        vec![
            FormField {
                name: "title",
                label: "Title:",
                kind: FieldKind::Text,
                value: form.title.unwrap_or_default(),
            },
            FormField {
                name: "category",
                label: "Category:",
                kind: FieldKind::Select {
                    options: categories
                        .iter()
                        .map(|c| SelectOption {
                            value: c.id.to_string(),
                            label: c.name.clone(),
                            selected: Some(c.id) == self.category_id,
                        })
                        .collect(),
                },
                value: form.category.unwrap_or_default(),
            },
            FormField {
                name: "maxitems",
                label: "Max items to show:",
                kind: FieldKind::Number,
                value: form.maxitems.unwrap_or_default(),
            },
            FormField {
                name: "newwindow",
                label: "Open in new tab:",
                kind: FieldKind::Checkbox {
                    checked: self.open_in_new_tab,
                },
                value: "1".to_string(),
            },
        ]
    }
}

/// Raw settings form submission
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetForm {
    pub title: Option<String>,
    pub category: Option<String>,
    pub maxitems: Option<String>,
    pub newwindow: Option<String>,
}

/// One field of the settings form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Select { options: Vec<SelectOption> },
    Checkbox { checked: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Persistence for widget instance settings
#[async_trait]
pub trait WidgetSettings: Send + Sync {
    /// Load the settings of one instance
    async fn load(&self, instance: &str) -> MwResult<Option<WidgetConfig>>;

    /// Replace the whole record of an instance
    async fn replace(&self, instance: &str, config: WidgetConfig) -> MwResult<()>;

    /// All instances, ordered by id
    async fn list(&self) -> MwResult<Vec<(InstanceId, WidgetConfig)>>;
}

/// In-memory widget settings
#[derive(Default)]
pub struct MemoryWidgetSettings {
    instances: RwLock<BTreeMap<InstanceId, WidgetConfig>>,
}

impl MemoryWidgetSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_instance(self, instance: impl Into<InstanceId>, config: WidgetConfig) -> Self {
        self.instances.write().insert(instance.into(), config);
        self
    }
}

#[async_trait]
impl WidgetSettings for MemoryWidgetSettings {
    async fn load(&self, instance: &str) -> MwResult<Option<WidgetConfig>> {
        Ok(self.instances.read().get(instance).cloned())
    }

    async fn replace(&self, instance: &str, config: WidgetConfig) -> MwResult<()> {
        self.instances.write().insert(instance.to_string(), config);
        Ok(())
    }

    async fn list(&self) -> MwResult<Vec<(InstanceId, WidgetConfig)>> {
        Ok(self
            .instances
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
