//! Per-decode state threaded through the nested decoders.

use fabrichub_core::{DecodeError, Diagnostic};

/// A config envelope embeds its last update envelope, which could in turn
/// embed another; real blocks nest at most twice.
pub(crate) const MAX_ENVELOPE_NESTING: usize = 4;

#[derive(Debug, Default)]
pub(crate) struct DecodeContext {
    pub diagnostics: Vec<Diagnostic>,
    envelope_depth: usize,
}

impl DecodeContext {
    pub fn enter_envelope(&mut self) -> Result<(), DecodeError> {
        if self.envelope_depth >= MAX_ENVELOPE_NESTING {
            return Err(DecodeError::TooDeep {
                what: "envelope",
                limit: MAX_ENVELOPE_NESTING,
            });
        }
        self.envelope_depth += 1;
        Ok(())
    }

    pub fn leave_envelope(&mut self) {
        self.envelope_depth = self.envelope_depth.saturating_sub(1);
    }
}
