//! PIN entry state machine
//!
//! A session lives while the panel is visible. Presses accumulate until a
//! PIN is complete; the complete PIN then drives the stage:
//!
//! ```text
//! Setup ──> SetupVerification ──> Ok
//!   ^              │
//!   │              v
//!   └──────── PinsDontMatch ──> SetupVerification
//!
//! Verification ──> Ok
//!      ^    │
//!      │    v
//!      └─ PinError
//! ```

use authenticator_core::pin::PinInput;
use authenticator_core::{CredentialStore, PinCode, UserProfile};
use tracing::{debug, info, warn};

/// Where the user is in the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinStage {
    /// No PIN stored yet; choose one
    Setup,
    /// Enter the chosen PIN a second time
    SetupVerification,
    /// The confirmation differed; choose again
    PinsDontMatch,
    /// Enter the stored PIN
    Verification,
    /// The entered PIN was wrong
    PinError,
    /// Authenticated
    Ok,
}

impl PinStage {
    /// Instruction shown under the user's name
    pub fn instruction(&self) -> &'static str {
        match self {
            PinStage::Setup => "Choose a 4-button PIN",
            PinStage::SetupVerification => "Enter the PIN again to confirm",
            PinStage::PinsDontMatch => "The PINs don't match. Choose a new PIN",
            PinStage::Verification => "Enter your PIN",
            PinStage::PinError => "Wrong PIN, try again",
            PinStage::Ok => "Unlocked",
        }
    }

    /// Stages showing the result of a rejected PIN
    pub fn is_failure(&self) -> bool {
        matches!(self, PinStage::PinsDontMatch | PinStage::PinError)
    }
}

/// Effect of one press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The press was buffered; `entered` presses so far
    Collecting { entered: usize },
    /// A complete PIN moved the flow
    Stage { from: PinStage, to: PinStage },
    /// The flow already ended; the press was ignored
    Finished,
}

/// One authentication attempt
#[derive(Debug)]
pub struct PinSession {
    user: UserProfile,
    stage: PinStage,
    input: PinInput,
    /// First entry of a PIN being set up
    pending: Option<PinCode>,
    needs_redraw: bool,
}

impl PinSession {
    /// Start a session; verification if the user has a PIN, setup otherwise
    pub fn open(user: UserProfile, store: &CredentialStore) -> Self {
        let stage = if store.has_credential(&user.uid) {
            PinStage::Verification
        } else {
            PinStage::Setup
        };
        Self::with_stage(user, stage)
    }

    /// Start a session at a given stage
    pub fn with_stage(user: UserProfile, stage: PinStage) -> Self {
        debug!("PIN session for {} starts in {:?}", user.uid, stage);
        Self {
            user,
            stage,
            input: PinInput::new(),
            pending: None,
            needs_redraw: true,
        }
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub fn stage(&self) -> PinStage {
        self.stage
    }

    /// Presses entered towards the current PIN (0-3)
    pub fn entered(&self) -> usize {
        self.input.len()
    }

    pub fn pending(&self) -> Option<&PinCode> {
        self.pending.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.stage == PinStage::Ok
    }

    pub fn needs_redraw(&self) -> bool {
        self.needs_redraw
    }

    /// Read and reset the redraw flag
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.needs_redraw)
    }

    /// Feed one raw press code
    pub fn press(&mut self, code: u64, store: &CredentialStore) -> Transition {
        if self.stage == PinStage::Ok {
            return Transition::Finished;
        }
        self.needs_redraw = true;

        // The press that dismisses the error starts the next attempt
        if self.stage == PinStage::PinError {
            self.stage = PinStage::Verification;
        }

        let Some(pin) = self.input.push(code) else {
            return Transition::Collecting {
                entered: self.input.len(),
            };
        };

        let from = self.stage;
        self.stage = self.complete(pin, store);
        if from != self.stage {
            debug!("PIN stage {:?} -> {:?}", from, self.stage);
        }

        Transition::Stage {
            from,
            to: self.stage,
        }
    }

    fn complete(&mut self, pin: PinCode, store: &CredentialStore) -> PinStage {
        match self.stage {
            PinStage::Setup | PinStage::PinsDontMatch => {
                self.pending = Some(pin);
                PinStage::SetupVerification
            }
            PinStage::SetupVerification => {
                let Some(pending) = self.pending.take() else {
                    return PinStage::Setup;
                };
                if pending != pin {
                    return PinStage::PinsDontMatch;
                }
                match store.save(&self.user.uid, &pin) {
                    Ok(()) => {
                        info!("PIN set up for {}", self.user.uid);
                        PinStage::Ok
                    }
                    Err(e) => {
                        warn!("Could not store PIN for {}: {}", self.user.uid, e);
                        PinStage::Setup
                    }
                }
            }
            PinStage::Verification | PinStage::PinError => match store.get(&self.user.uid) {
                Some(stored) if stored == pin => {
                    info!("PIN verified for {}", self.user.uid);
                    PinStage::Ok
                }
                Some(_) => PinStage::PinError,
                None => {
                    warn!("No stored PIN for {} during verification", self.user.uid);
                    PinStage::PinError
                }
            },
            PinStage::Ok => PinStage::Ok,
        }
    }
}
