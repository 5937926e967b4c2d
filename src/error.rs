use core::fmt::{Debug, Display, Formatter};

/// Panel error type
///
/// Generic over the error of the [`CommandTransport`](crate::traits::CommandTransport)
/// so callers can still match on the underlying bus failure.
///
/// Only failures that leave the caller with something to do are surfaced here.
/// Vsync timeouts, sensor read failures and unsupported refresh combinations are
/// logged and recovered from internally.
#[derive(Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ErrorKind<E> {
    /// Encountered an error on the command channel.
    ///
    /// The committed feature mirror may already hold the requested state, the next
    /// commit has to be enforced once the link is back.
    Transport(E),

    /// Requested refresh rate exceeds the operating rate ceiling
    InvalidRefreshRate {
        /// Requested refresh rate in Hz
        vrefresh: u32,
        /// Current operating rate ceiling in Hz
        op_hz: u32,
    },

    /// Operating rate is not one the panel can run at
    InvalidOperatingRate(u32),

    /// A lifecycle hook needed the current mode but none was set yet
    NoMode,

    /// A command batch does not fit the fixed capacity buffer
    BatchOverflow,
}

impl<E: Clone> Clone for ErrorKind<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Transport(err) => Self::Transport(err.clone()),
            Self::InvalidRefreshRate { vrefresh, op_hz } => Self::InvalidRefreshRate {
                vrefresh: *vrefresh,
                op_hz: *op_hz,
            },
            Self::InvalidOperatingRate(hz) => Self::InvalidOperatingRate(*hz),
            Self::NoMode => Self::NoMode,
            Self::BatchOverflow => Self::BatchOverflow,
        }
    }
}

impl<E: Copy> Copy for ErrorKind<E> {}

impl<E: Debug> Display for ErrorKind<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "command transport error: {err:?}"),
            Self::InvalidRefreshRate { vrefresh, op_hz } => {
                write!(f, "invalid refresh rate {vrefresh}Hz above operating rate {op_hz}Hz")
            }
            Self::InvalidOperatingRate(hz) => write!(f, "invalid operating rate {hz}Hz"),
            Self::NoMode => write!(f, "no current mode set"),
            Self::BatchOverflow => write!(f, "command batch capacity exceeded"),
        }
    }
}

impl<E: Debug> Debug for ErrorKind<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Transport(err) => f.debug_tuple("Transport").field(err).finish(),
            Self::InvalidRefreshRate { vrefresh, op_hz } => f
                .debug_struct("InvalidRefreshRate")
                .field("vrefresh", vrefresh)
                .field("op_hz", op_hz)
                .finish(),
            Self::InvalidOperatingRate(hz) => {
                f.debug_tuple("InvalidOperatingRate").field(hz).finish()
            }
            Self::NoMode => write!(f, "NoMode"),
            Self::BatchOverflow => write!(f, "BatchOverflow"),
        }
    }
}

impl<E: Debug> core::error::Error for ErrorKind<E> {}

/// Marker returned when a [`CommandBatch`](crate::sequencer::CommandBatch) is full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOverflow;

impl<E> From<BatchOverflow> for ErrorKind<E> {
    fn from(_: BatchOverflow) -> Self {
        ErrorKind::BatchOverflow
    }
}

/// Errors while building a [`PanelConfig`](crate::config::PanelConfig)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuilderError {
    /// Operating rate is neither 60 nor 120 Hz
    InvalidOperatingRate(u32),
}

impl Display for BuilderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidOperatingRate(hz) => {
                write!(f, "operating rate {hz}Hz, expected 60 or 120")
            }
        }
    }
}

impl core::error::Error for BuilderError {}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use std::format;

    #[test]
    fn display_invalid_refresh() {
        let err: ErrorKind<()> = ErrorKind::InvalidRefreshRate {
            vrefresh: 120,
            op_hz: 60,
        };
        assert_eq!(
            format!("{err}"),
            "invalid refresh rate 120Hz above operating rate 60Hz"
        );
    }

    #[test]
    fn overflow_converts() {
        let err: ErrorKind<u8> = BatchOverflow.into();
        assert_eq!(err, ErrorKind::BatchOverflow);
    }
}
