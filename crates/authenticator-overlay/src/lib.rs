//! Authenticator Overlay - PIN entry on top of the running application
//!
//! Ties the renderer and the credential store together: the
//! [`OverlayController`] polls a shared [`OverlayHandle`] for show/hide
//! requests, takes input focus and the controllers while the panel is
//! visible, feeds button presses into a [`PinSession`] and redraws the
//! panel whenever the session changes.

pub mod controller;
pub mod error;
pub mod focus;
pub mod input;
pub mod logging;
pub mod screen;
pub mod session;

pub use controller::{OverlayController, OverlayHandle, OverlayOutcome};
pub use error::{OverlayError, Result};
pub use focus::{FocusGrant, InputFocus};
pub use input::{InputDevice, PadId, OVERLAY_PADS};
pub use session::{PinSession, PinStage, Transition};
