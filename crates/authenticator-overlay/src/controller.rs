//! Overlay polling loop
//!
//! The monitor side talks to the overlay only through an [`OverlayHandle`].
//! The [`OverlayController`] owns every platform resource and is driven from
//! a single thread: each [`tick`](OverlayController::tick) applies the
//! latest show/hide request, reads one button mask and redraws the panel
//! when the session changed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use authenticator_core::{AccountUid, AuthenticatorConfig, CredentialStore, UserProfile};
use authenticator_gfx::{DisplayBackend, Presenter};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::focus::{FocusGrant, InputFocus};
use crate::input::{self, InputDevice, OVERLAY_PADS};
use crate::screen;
use crate::session::{PinSession, Transition};

/// How an authentication panel ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayOutcome {
    /// The user entered (or set up) their PIN
    Authenticated(AccountUid),
    /// The panel was hidden before the PIN was entered
    Cancelled(AccountUid),
}

#[derive(Debug, Default)]
struct OverlayRequest {
    visible: bool,
    user: UserProfile,
    /// Bumped by every show request
    generation: u64,
    outcome: Option<OverlayOutcome>,
}

/// What the controller has to do for the current request
enum Pending {
    Hidden,
    Unchanged,
    Show { generation: u64, user: UserProfile },
}

/// Shared show/hide requests
#[derive(Debug, Clone, Default)]
pub struct OverlayHandle {
    request: Arc<Mutex<OverlayRequest>>,
}

impl OverlayHandle {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, OverlayRequest> {
        self.request.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Ask for the PIN panel of `user`, replacing any panel shown
    pub fn show_authentication_panel(&self, user: UserProfile) {
        let mut request = self.lock();
        request.visible = true;
        request.user = user;
        request.generation += 1;
        request.outcome = None;
    }

    /// Ask for the overlay to disappear
    pub fn hide_all(&self) {
        self.lock().visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    /// Outcome of the last panel, if it ended since the previous call
    pub fn take_outcome(&self) -> Option<OverlayOutcome> {
        self.lock().outcome.take()
    }

    fn pending(&self, shown_generation: u64) -> Pending {
        let request = self.lock();
        if !request.visible {
            Pending::Hidden
        } else if request.generation == shown_generation {
            Pending::Unchanged
        } else {
            Pending::Show {
                generation: request.generation,
                user: request.user.clone(),
            }
        }
    }

    /// Publish the outcome of request `generation` and hide it
    ///
    /// Dropped when a newer request arrived meanwhile; the monitor only
    /// hears about the panel it asked for last.
    fn complete(&self, generation: u64, outcome: OverlayOutcome) {
        let mut request = self.lock();
        if request.generation != generation {
            debug!("Dropping {:?} of superseded request {}", outcome, generation);
            return;
        }
        request.visible = false;
        request.outcome = Some(outcome);
    }
}

/// Drives the PIN panel
pub struct OverlayController<B: DisplayBackend, I: InputDevice, F: InputFocus> {
    config: AuthenticatorConfig,
    handle: OverlayHandle,
    presenter: Presenter<B>,
    input: I,
    focus: F,
    store: CredentialStore,
    session: Option<PinSession>,
    focus_grant: Option<FocusGrant>,
    input_acquired: bool,
    shown_generation: u64,
}

impl<B: DisplayBackend, I: InputDevice, F: InputFocus> OverlayController<B, I, F> {
    pub fn new(config: AuthenticatorConfig, backend: B, input: I, focus: F) -> Result<Self> {
        config.validate()?;
        let store = CredentialStore::new(config.credential_path.clone());

        Ok(Self {
            config,
            handle: OverlayHandle::new(),
            presenter: Presenter::new(backend),
            input,
            focus,
            store,
            session: None,
            focus_grant: None,
            input_acquired: false,
            shown_generation: 0,
        })
    }

    /// Handle for the monitor side
    pub fn handle(&self) -> OverlayHandle {
        self.handle.clone()
    }

    /// Whether a panel is on screen
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&PinSession> {
        self.session.as_ref()
    }

    pub fn presenter(&self) -> &Presenter<B> {
        &self.presenter
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn focus(&self) -> &F {
        &self.focus
    }

    /// One polling iteration
    pub fn tick(&mut self) -> Result<()> {
        self.apply_request()?;

        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let mask = input::poll_mask(&mut self.input);
        if mask != 0 {
            match session.press(mask, &self.store) {
                Transition::Collecting { entered } => debug!("PIN press {}", entered),
                Transition::Stage { from, to } => {
                    debug!("PIN entered in {:?}, now {:?}", from, to)
                }
                Transition::Finished => {}
            }
        }

        self.redraw()?;

        if let Some(uid) = self
            .session
            .as_ref()
            .filter(|session| session.is_authenticated())
            .map(|session| session.user().uid)
        {
            self.handle
                .complete(self.shown_generation, OverlayOutcome::Authenticated(uid));
            self.close();
        }

        Ok(())
    }

    /// Poll until `exit` is set, then close the overlay
    pub fn run(&mut self, exit: &AtomicBool) {
        info!(
            "Overlay polling every {} ms",
            self.config.poll_interval().as_millis()
        );

        while !exit.load(Ordering::Acquire) {
            if let Err(e) = self.tick() {
                error!("Overlay iteration failed: {}", e);
            }
            thread::sleep(self.config.poll_interval());
        }

        self.close();
        info!("Overlay polling stopped");
    }

    fn apply_request(&mut self) -> Result<()> {
        match self.handle.pending(self.shown_generation) {
            Pending::Unchanged => Ok(()),
            Pending::Hidden => {
                if let Some(session) = &self.session {
                    let uid = session.user().uid;
                    self.handle
                        .complete(self.shown_generation, OverlayOutcome::Cancelled(uid));
                    self.close();
                }
                Ok(())
            }
            Pending::Show { generation, user } => {
                // A failed request is not retried
                self.shown_generation = generation;
                self.close();

                if !user.is_valid() {
                    warn!("Not showing the panel for invalid profile {}", user.uid);
                    return Ok(());
                }
                self.open(user)
            }
        }
    }

    fn open(&mut self, user: UserProfile) -> Result<()> {
        let (x, y) = self.config.centered();
        self.presenter.set_opacity(self.config.opacity);
        self.presenter.init(
            u32::from(self.config.overlay_width),
            u32::from(self.config.overlay_height),
            i32::from(x),
            i32::from(y),
        )?;

        match FocusGrant::acquire(&mut self.focus) {
            Ok(grant) => self.focus_grant = Some(grant),
            Err(e) => {
                self.close();
                return Err(e);
            }
        }

        if let Err(e) = self.input.acquire(&OVERLAY_PADS) {
            self.close();
            return Err(e);
        }
        self.input_acquired = true;

        info!("Showing authentication panel for {}", user.uid);
        self.session = Some(PinSession::open(user, &self.store));
        Ok(())
    }

    fn close(&mut self) {
        let was_open = self.session.take().is_some();

        if let Some(grant) = self.focus_grant.take() {
            grant.restore(&mut self.focus);
        }
        if std::mem::take(&mut self.input_acquired) {
            self.input.release();
        }

        if let Some(mut frame) = self.presenter.start_frame() {
            frame.clear_screen();
            if let Err(e) = frame.end() {
                warn!("Failed to clear the overlay: {}", e);
            }
        }
        self.presenter.exit();

        if was_open {
            info!("Authentication panel closed");
        }
    }

    fn redraw(&mut self) -> Result<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        if !session.take_redraw() {
            return Ok(());
        }
        let Some(mut frame) = self.presenter.start_frame() else {
            return Ok(());
        };

        screen::draw_panel(&mut frame, session);
        frame.end()?;
        Ok(())
    }
}

impl<B: DisplayBackend, I: InputDevice, F: InputFocus> Drop for OverlayController<B, I, F> {
    fn drop(&mut self) {
        self.close();
    }
}
