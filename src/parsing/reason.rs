//! Reasons for a consumer to leave its loop
//!
//! Every consume function returns one of these on success; hard failures
//! travel on the error channel instead.

use std::fmt;

/// Why a consume function wants the loop to continue or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// More tokens, please.
    Continue,
    /// A blank line ended the current section or expression.
    TwoNewline,
    /// A `NEWLINE LONG_BLANK PROG_NAME` sequence started a new usage line.
    ProgNameSequence,
    /// End of input.
    EofReached,
    /// The matching group closer was consumed.
    EndOfGroup,
}

impl Reason {
    /// Whether the consume loop should exit.
    pub fn is_leaving(self) -> bool {
        !matches!(self, Reason::Continue)
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reason::Continue => "Continue",
            Reason::TwoNewline => "TWO_NEWLINE",
            Reason::ProgNameSequence => "PROG_NAME_sequence",
            Reason::EofReached => "EOF_reached",
            Reason::EndOfGroup => "EOG_reached",
        };
        f.write_str(name)
    }
}
