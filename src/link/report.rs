//! Report lines sent back over the control channel.
//!
//! Exactly one report follows every received byte.  Lines are terminated
//! with CRLF.

use core::fmt;

use super::transport::Transport;
use crate::vision::classify::Label;

pub const LINE_END: &[u8] = b"\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    Label(Label),
    NoCapture,
}

impl Report {
    /// Text of the report, without line terminator.
    pub fn line(self) -> &'static str {
        match self {
            Self::Label(Label::Cat) => "It's a cat",
            Self::Label(Label::Person) => "It's a person",
            Self::NoCapture => "No capture",
        }
    }

    /// Write the report line and flush.
    pub fn write_to<T: Transport>(self, link: &mut T) -> Result<(), T::Error> {
        link.write_all(self.line().as_bytes())?;
        link.write_all(LINE_END)?;
        link.flush()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.line())
    }
}
