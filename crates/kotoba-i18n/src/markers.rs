//! Marker attributes that bind UI nodes to resource keys

use crate::dom::Element;
use crate::error::{I18nError, I18nResult};
use crate::resource::Params;
use std::fmt;

/// Default marker attribute prefix
pub const DEFAULT_PREFIX: &str = "data-i18n";

/// Where a translated string is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// Text content
    Text,
    /// `placeholder` attribute
    Placeholder,
    /// `title` attribute
    Title,
    /// `aria-label` attribute
    AriaLabel,
    /// `alt` attribute
    Alt,
}

impl Slot {
    /// Slots addressed by an explicit `<prefix>-<attribute>` marker
    pub const ATTRIBUTE_SLOTS: [Slot; 4] = [Slot::Placeholder, Slot::Title, Slot::AriaLabel, Slot::Alt];

    /// Target attribute name, `None` for text content
    pub fn attribute(self) -> Option<&'static str> {
        match self {
            Self::Text => None,
            Self::Placeholder => Some("placeholder"),
            Self::Title => Some("title"),
            Self::AriaLabel => Some("aria-label"),
            Self::Alt => Some("alt"),
        }
    }

    /// Primary slot of `element` for the default marker
    pub fn primary_for(element: &Element) -> Self {
        match element.tag() {
            "input" | "textarea" => Self::Placeholder,
            "img" => Self::Alt,
            _ => Self::Text,
        }
    }

    /// Write `value` into this slot of `element`
    pub fn write(self, element: &Element, value: &str) -> I18nResult<()> {
        match self.attribute() {
            Some(name) => {
                element.set_attribute(name, value);
                Ok(())
            }
            None => element.set_text(value),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute().unwrap_or("text"))
    }
}

/// One (element, key, slot) association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerBinding {
    /// Bound element
    pub element: Element,
    /// Dot-separated key path
    pub key: String,
    /// Target slot
    pub slot: Slot,
}

/// The attribute names used to mark translatable nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerVocabulary {
    prefix: String,
}

impl Default for MarkerVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_PREFIX)
    }
}

impl MarkerVocabulary {
    /// Create a vocabulary rooted at `prefix`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The default-slot marker, i.e. the prefix itself
    pub fn default_marker(&self) -> &str {
        &self.prefix
    }

    /// Marker for an explicit attribute slot
    pub fn slot_marker(&self, slot: Slot) -> Option<String> {
        slot.attribute().map(|attr| format!("{}-{attr}", self.prefix))
    }

    /// Marker carrying JSON parameters
    pub fn args_marker(&self) -> String {
        format!("{}-args", self.prefix)
    }

    /// Whether `element` carries any binding marker
    pub fn is_marked(&self, element: &Element) -> bool {
        element.attribute(self.default_marker()).is_some()
            || Slot::ATTRIBUTE_SLOTS
                .iter()
                .filter_map(|slot| self.slot_marker(*slot))
                .any(|marker| element.attribute(&marker).is_some())
    }

    /// Every binding declared on `element`, at most one per slot
    ///
    /// An explicit slot marker wins over the default marker when both target
    /// the same slot. Empty keys are ignored.
    pub fn bindings_for(&self, element: &Element) -> Vec<MarkerBinding> {
        let mut bindings: Vec<MarkerBinding> = Slot::ATTRIBUTE_SLOTS
            .iter()
            .filter_map(|slot| {
                let marker = self.slot_marker(*slot)?;
                let key = element.attribute(&marker)?;
                Some((*slot, key))
            })
            .filter(|(_, key)| !key.trim().is_empty())
            .map(|(slot, key)| MarkerBinding {
                element: element.clone(),
                key: key.trim().to_string(),
                slot,
            })
            .collect();

        if let Some(key) = element.attribute(self.default_marker()) {
            let slot = Slot::primary_for(element);
            if !key.trim().is_empty() && bindings.iter().all(|b| b.slot != slot) {
                bindings.insert(
                    0,
                    MarkerBinding {
                        element: element.clone(),
                        key: key.trim().to_string(),
                        slot,
                    },
                );
            }
        }

        bindings
    }

    /// Interpolation parameters declared on `element`
    ///
    /// The args marker holds a JSON object. String values are used as-is,
    /// anything else is rendered as JSON text.
    pub fn params_for(&self, element: &Element) -> I18nResult<Params> {
        let Some(raw) = element.attribute(&self.args_marker()) else {
            return Ok(Params::new());
        };

        match serde_json::from_str::<serde_json::Value>(&raw)? {
            serde_json::Value::Object(map) => Ok(map
                .into_iter()
                .map(|(name, value)| {
                    let value = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    (name, value)
                })
                .collect()),
            other => Err(I18nError::UiWriteFailure {
                key: self.args_marker(),
                slot: "args".to_string(),
                reason: format!("expected a JSON object, found {other}"),
            }),
        }
    }
}
