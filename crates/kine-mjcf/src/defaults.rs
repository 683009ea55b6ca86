//! MuJoCo defaults system for element attributes.

use crate::attrs::AttrMap;
use crate::{MjcfError, Result};
use std::collections::HashMap;

/// Name of the implicit top-level default class.
pub const MAIN_CLASS: &str = "main";

/// Default attribute values of one class, per element kind.
#[derive(Debug, Clone, Default)]
pub struct ElementDefaults {
    pub joint: AttrMap,
    pub geom: AttrMap,
    pub motor: AttrMap,
}

impl ElementDefaults {
    fn for_tag_mut(&mut self, tag: &str) -> Option<&mut AttrMap> {
        match tag {
            "joint" => Some(&mut self.joint),
            "geom" => Some(&mut self.geom),
            "motor" => Some(&mut self.motor),
            _ => None,
        }
    }

    fn for_tag(&self, tag: &str) -> Option<&AttrMap> {
        match tag {
            "joint" => Some(&self.joint),
            "geom" => Some(&self.geom),
            "motor" => Some(&self.motor),
            _ => None,
        }
    }
}

/// Manages default values for different element classes.
#[derive(Debug)]
pub struct DefaultsManager {
    defaults: HashMap<String, ElementDefaults>,
}

impl Default for DefaultsManager {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultsManager {
    pub fn new() -> Self {
        let mut defaults = HashMap::new();
        defaults.insert(MAIN_CLASS.to_string(), ElementDefaults::default());
        Self { defaults }
    }

    /// Declare `name` as a child class of `parent`, inheriting its current values.
    pub fn begin_class(&mut self, name: &str, parent: &str) -> Result<()> {
        if name != MAIN_CLASS && self.defaults.contains_key(name) {
            return Err(MjcfError::InvalidMjcf(format!(
                "default class '{name}' is defined twice"
            )));
        }
        let inherited = self.defaults.get(parent).cloned().unwrap_or_default();
        self.defaults.insert(name.to_string(), inherited);
        Ok(())
    }

    /// Record default attributes for `tag` elements in `class`.
    ///
    /// Tags other than joint, geom and motor carry no defaults and are ignored.
    pub fn set(&mut self, class: &str, tag: &str, attrs: AttrMap) {
        if let Some(target) = self
            .defaults
            .get_mut(class)
            .and_then(|d| d.for_tag_mut(tag))
        {
            target.extend(attrs);
        }
    }

    /// Merge the class defaults for `tag` under the explicit attributes.
    pub fn resolve(&self, class: Option<&str>, tag: &str, explicit: &AttrMap) -> Result<AttrMap> {
        let class = class.unwrap_or(MAIN_CLASS);
        let defaults = self.defaults.get(class).ok_or_else(|| {
            MjcfError::InvalidMjcf(format!("unknown default class '{class}'"))
        })?;
        let mut merged = defaults.for_tag(tag).cloned().unwrap_or_default();
        merged.extend(explicit.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.remove("class");
        Ok(merged)
    }
}
