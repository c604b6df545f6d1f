//! PIN values and press accumulation
//!
//! A PIN is four raw button-press codes. The codes are stored and compared
//! in an encoded string form: the decimal codes joined by [`PIN_SEPARATOR`].
//! The same four codes in the same order always encode identically.

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CoreError, Result};

/// Number of presses in a PIN
pub const PIN_LENGTH: usize = 4;

/// Separator between the encoded press codes
pub const PIN_SEPARATOR: &str = ",";

/// An encoded PIN, wiped from memory on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PinCode(String);

impl PinCode {
    /// Encode four press codes
    pub fn encode(presses: &[u64; PIN_LENGTH]) -> Self {
        let encoded = presses
            .iter()
            .map(|code| code.to_string())
            .collect::<Vec<_>>()
            .join(PIN_SEPARATOR);
        Self(encoded)
    }

    /// Encode a press sequence of unchecked length
    pub fn try_encode(presses: &[u64]) -> Result<Self> {
        let presses: &[u64; PIN_LENGTH] =
            presses
                .try_into()
                .map_err(|_| CoreError::InvalidPinLength {
                    expected: PIN_LENGTH,
                    actual: presses.len(),
                })?;
        Ok(Self::encode(presses))
    }

    /// Wrap a value read back from the credential store
    pub fn from_stored(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The encoded form, as written to the credential store
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Compare without bailing out on the first differing byte
impl PartialEq for PinCode {
    fn eq(&self, other: &Self) -> bool {
        let a = self.0.as_bytes();
        let b = other.0.as_bytes();
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl Eq for PinCode {}

impl fmt::Debug for PinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinCode(****)")
    }
}

/// Accumulates raw presses until a full PIN has been entered
#[derive(Default, Clone)]
pub struct PinInput {
    presses: Vec<u64>,
}

impl fmt::Debug for PinInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinInput")
            .field("entered", &self.presses.len())
            .finish()
    }
}

impl PinInput {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self {
            presses: Vec::with_capacity(PIN_LENGTH),
        }
    }

    /// Push one press; returns the encoded PIN once four have accumulated
    pub fn push(&mut self, code: u64) -> Option<PinCode> {
        self.presses.push(code);

        if self.presses.len() < PIN_LENGTH {
            return None;
        }

        let pin = PinCode::try_encode(&self.presses).ok();
        self.clear();
        pin
    }

    /// Number of presses entered so far (0-3 between PINs)
    pub fn len(&self) -> usize {
        self.presses.len()
    }

    /// Whether no press has been entered yet
    pub fn is_empty(&self) -> bool {
        self.presses.is_empty()
    }

    /// Drop the presses entered so far
    pub fn clear(&mut self) {
        self.presses.zeroize();
        self.presses.clear();
    }
}
