//! Type id to constructor tables for buttons and panels.
use std::{
    collections::BTreeMap,
    fmt,
    path::Path,
    sync::Arc,
};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{Behavior, Error, PanelBehavior, PlainPanel, Result, builtin};

/// Constructor input: the declaration of one item.
#[derive(Debug, Clone, Copy)]
pub struct ItemSpec<'a> {
    /// Item name.
    pub name: &'a str,
    /// Declared path, already resolved against the declaring panel.
    pub path: Option<&'a Path>,
    /// Free-form constructor parameters.
    pub params: &'a Map<String, Value>,
}

impl ItemSpec<'_> {
    /// Deserialize the parameter map into a typed struct.
    pub fn params<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.params.clone())).map_err(|e| Error::InvalidParams {
            name: self.name.to_string(),
            message: e.to_string(),
        })
    }
}

/// Builds a button behaviour.
pub type ButtonFactory = Arc<dyn Fn(&ItemSpec<'_>) -> Result<Box<dyn Behavior>> + Send + Sync>;

/// Builds a panel behaviour.
pub type PanelFactory = Arc<dyn Fn(&ItemSpec<'_>) -> Result<Box<dyn PanelBehavior>> + Send + Sync>;

/// Type id used when a button declaration names no class.
pub const DEFAULT_BUTTON: &str = "button";
/// Type id used when a panel declaration names no class.
pub const DEFAULT_PANEL: &str = "panel";

/// Item type catalog.
///
/// Declarations name a type id; the catalog maps it to a constructor.
/// Plugins extend it before their panels are mounted.
#[derive(Clone, Default)]
pub struct Catalog {
    /// Button constructors by id.
    buttons: BTreeMap<String, ButtonFactory>,
    /// Panel constructors by id.
    panels: BTreeMap<String, PanelFactory>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog with the built-in types registered.
    pub fn with_builtins() -> Self {
        let mut c = Self::new();
        builtin::register(&mut c);
        c.register_panel(DEFAULT_PANEL, |_| Ok(Box::new(PlainPanel)));
        c
    }

    /// Register (or replace) a button type.
    pub fn register_button<F>(&mut self, id: impl Into<String>, f: F)
    where
        F: Fn(&ItemSpec<'_>) -> Result<Box<dyn Behavior>> + Send + Sync + 'static,
    {
        self.buttons.insert(id.into(), Arc::new(f));
    }

    /// Register (or replace) a panel type.
    pub fn register_panel<F>(&mut self, id: impl Into<String>, f: F)
    where
        F: Fn(&ItemSpec<'_>) -> Result<Box<dyn PanelBehavior>> + Send + Sync + 'static,
    {
        self.panels.insert(id.into(), Arc::new(f));
    }

    /// Construct a button of type `id`.
    pub fn button(&self, id: &str, spec: &ItemSpec<'_>) -> Result<Box<dyn Behavior>> {
        let f = self
            .buttons
            .get(id)
            .ok_or_else(|| Error::UnknownItemType(id.to_string()))?;
        f(spec)
    }

    /// Construct a panel of type `id`.
    pub fn panel(&self, id: &str, spec: &ItemSpec<'_>) -> Result<Box<dyn PanelBehavior>> {
        let f = self
            .panels
            .get(id)
            .ok_or_else(|| Error::UnknownItemType(id.to_string()))?;
        f(spec)
    }

    /// Whether a button type is registered.
    pub fn has_button(&self, id: &str) -> bool {
        self.buttons.contains_key(id)
    }

    /// Whether a panel type is registered.
    pub fn has_panel(&self, id: &str) -> bool {
        self.panels.contains_key(id)
    }

    /// Registered button ids, sorted.
    pub fn button_types(&self) -> impl Iterator<Item = &str> {
        self.buttons.keys().map(String::as_str)
    }

    /// Registered panel ids, sorted.
    pub fn panel_types(&self) -> impl Iterator<Item = &str> {
        self.panels.keys().map(String::as_str)
    }
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("buttons", &self.buttons.keys().collect::<Vec<_>>())
            .field("panels", &self.panels.keys().collect::<Vec<_>>())
            .finish()
    }
}
