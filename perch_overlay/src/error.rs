// Copyright 2025 the Perch Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coordinator error types.
//!
//! None of these escape the public open/close entry points; they are logged there and
//! the overlay stays in its previous state.

use thiserror::Error;

use crate::geometry::GeometryError;
use crate::types::OverlayIdentity;

/// Internal failure of a lifecycle step.
#[derive(Debug, Error)]
pub enum OverlayError {
    /// No registry entry for the identity.
    #[error("no overlay registered as `{0}`")]
    UnknownOverlay(OverlayIdentity),

    /// The trigger or content element is gone.
    #[error("overlay `{identity}` has no live {role} element")]
    MissingElement {
        /// Overlay concerned.
        identity: OverlayIdentity,
        /// `trigger` or `content`.
        role: &'static str,
    },

    /// No geometry engine has been installed yet.
    #[error("geometry engine is not installed")]
    EngineUnavailable,

    /// Another open/close transition has not finished its cleanup.
    #[error("cannot start a transition for `{requested}` while `{pending}` is in flight")]
    TransitionInFlight {
        /// Overlay whose transition was rejected.
        requested: OverlayIdentity,
        /// Overlay whose transition is still running.
        pending: OverlayIdentity,
    },

    /// The engine failed to place the overlay.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}
