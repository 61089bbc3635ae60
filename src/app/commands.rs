//! Inbound commands to the command loop.
//!
//! The control channel carries single bytes.  One configured byte starts a
//! perception cycle; every other byte is acknowledged and otherwise
//! ignored.

/// Commands the control channel can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Run one capture → classify cycle.
    Capture,

    /// Any byte other than the trigger.  Answered with "No capture".
    Ignored(u8),
}

impl AppCommand {
    /// Decode one received byte.
    pub fn from_byte(byte: u8, trigger: u8) -> Self {
        if byte == trigger {
            Self::Capture
        } else {
            Self::Ignored(byte)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_byte_captures() {
        assert_eq!(AppCommand::from_byte(b'1', b'1'), AppCommand::Capture);
    }

    #[test]
    fn everything_else_is_ignored() {
        for b in [b'0', b'2', b'\n', b'\r', 0, 0xff] {
            assert_eq!(AppCommand::from_byte(b, b'1'), AppCommand::Ignored(b));
        }
    }

    #[test]
    fn trigger_is_configurable() {
        assert_eq!(AppCommand::from_byte(b'c', b'c'), AppCommand::Capture);
        assert_eq!(AppCommand::from_byte(b'1', b'c'), AppCommand::Ignored(b'1'));
    }
}
