// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core types shared by the coordinator: identities, activation modes, keys, and handler outcomes.

use std::fmt;
use std::sync::Arc;

/// Opaque key correlating a trigger element with its overlay content.
///
/// Read from the trigger's `data-popover-for` and the content's `data-popover-id`
/// attributes. Cheap to clone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OverlayIdentity(Arc<str>);

impl OverlayIdentity {
    /// Wrap a string as an identity.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// The identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OverlayIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OverlayIdentity {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for OverlayIdentity {
    fn from(id: String) -> Self {
        Self(Arc::from(id))
    }
}

/// Name of an exclusive family: at most one overlay per family is open at a time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Family(Arc<str>);

impl Family {
    /// Wrap a string as a family name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The family name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a trigger activates its overlay.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ActivationMode {
    /// A press (click) toggles the overlay.
    #[default]
    Press,
    /// Pointer enter/leave opens and closes the overlay after a delay.
    Hover,
}

impl ActivationMode {
    /// Parse the `data-popover-type` attribute value.
    ///
    /// An absent or empty value means [`ActivationMode::Press`]; `click` is accepted as an alias.
    /// Unknown values yield `None`.
    pub fn from_attr(value: Option<&str>) -> Option<Self> {
        match value.map(str::trim) {
            None | Some("" | "press" | "click") => Some(Self::Press),
            Some("hover") => Some(Self::Hover),
            Some(_) => None,
        }
    }
}

/// Keyboard keys the coordinator reacts to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    /// Dismisses open overlays that listen for it.
    Escape,
    /// Confirms the focused item.
    Enter,
    /// Confirms the focused item.
    Space,
    /// Any other key, by name.
    Other(String),
}

/// Handler outcome controlling propagation.
///
/// Element handlers run from the event target up to the document root; returning
/// [`Outcome::Stop`] keeps the event away from the remaining ancestors and from the
/// document-level dismissal listeners.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Continue propagation.
    Continue,
    /// Stop propagation.
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activation_mode_defaults_to_press() {
        assert_eq!(ActivationMode::from_attr(None), Some(ActivationMode::Press));
        assert_eq!(ActivationMode::from_attr(Some("")), Some(ActivationMode::Press));
        assert_eq!(
            ActivationMode::from_attr(Some("click")),
            Some(ActivationMode::Press)
        );
        assert_eq!(
            ActivationMode::from_attr(Some(" hover ")),
            Some(ActivationMode::Hover)
        );
        assert_eq!(ActivationMode::from_attr(Some("focus")), None);
    }

    #[test]
    fn identity_round_trips_through_display() {
        let id = OverlayIdentity::from("menu1");
        assert_eq!(id.to_string(), "menu1");
        assert_eq!(id, OverlayIdentity::from(String::from("menu1")));
    }
}
