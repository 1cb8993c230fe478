//! Surface Events
//!
//! Events sent from the UI surface to the Companion. Surfaces are "dumb"
//! renderers: they report what the user did and let the core decide how to
//! respond.

use serde::{Deserialize, Serialize};

/// Events from the UI surface to the Companion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum SurfaceEvent {
    /// User submitted a message (typed, or a finished voice transcript)
    UserMessage {
        /// The message content
        content: String,
    },

    /// User toggled the microphone control
    ///
    /// The core decides whether this starts or stops capture; the surface
    /// only reports the press. Hidden (never sent) when capture is
    /// unsupported.
    MicToggled,

    /// User requested quit
    QuitRequested,
}
