//! Connection state of a broadcaster
//!
//! Streaming audio to the sink only happens while `Connected`. Error states
//! are sticky: they stop the broadcaster and hold until an explicit reset.

use std::sync::atomic::{AtomicU8, Ordering};

/// Broadcaster connection state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BroadcastState {
    /// Initial state, never connected
    #[default]
    Ready,
    /// Connection attempt in progress
    Connecting,
    /// Connected and streaming
    Connected,
    /// Disconnected, may reconnect
    Disconnected,
    /// Recoverable broadcast error, the sink will retry
    TemporaryBroadcastError,
    /// Broadcaster disabled by configuration
    Disabled,

    /// Configuration is incomplete or invalid
    ConfigurationError,
    /// Server rejected the credentials
    InvalidCredentials,
    /// Server rejected the mount point
    InvalidMountPoint,
    /// Server rejected the stream settings
    InvalidSettings,
    /// Another source is already using the mount point
    MountPointInUse,
    /// Network is unreachable
    NetworkUnavailable,
    /// No server is listening at the configured address
    NoServer,
    /// Server does not accept the audio format
    UnsupportedAudioFormat,
    /// Unrecoverable broadcast error
    BroadcastError,
}

impl BroadcastState {
    /// All states, indexed by discriminant
    const ALL: [BroadcastState; 15] = [
        BroadcastState::Ready,
        BroadcastState::Connecting,
        BroadcastState::Connected,
        BroadcastState::Disconnected,
        BroadcastState::TemporaryBroadcastError,
        BroadcastState::Disabled,
        BroadcastState::ConfigurationError,
        BroadcastState::InvalidCredentials,
        BroadcastState::InvalidMountPoint,
        BroadcastState::InvalidSettings,
        BroadcastState::MountPointInUse,
        BroadcastState::NetworkUnavailable,
        BroadcastState::NoServer,
        BroadcastState::UnsupportedAudioFormat,
        BroadcastState::BroadcastError,
    ];

    fn from_u8(value: u8) -> Self {
        Self::ALL
            .get(value as usize)
            .copied()
            .unwrap_or(BroadcastState::Ready)
    }

    /// Whether this state stops the broadcaster until reset
    pub fn is_error_state(&self) -> bool {
        matches!(
            self,
            BroadcastState::ConfigurationError
                | BroadcastState::InvalidCredentials
                | BroadcastState::InvalidMountPoint
                | BroadcastState::InvalidSettings
                | BroadcastState::MountPointInUse
                | BroadcastState::NetworkUnavailable
                | BroadcastState::NoServer
                | BroadcastState::UnsupportedAudioFormat
                | BroadcastState::BroadcastError
        )
    }

    pub fn is_connected(&self) -> bool {
        *self == BroadcastState::Connected
    }

    /// Human readable label
    pub fn label(&self) -> &'static str {
        match self {
            BroadcastState::Ready => "Ready",
            BroadcastState::Connecting => "Connecting",
            BroadcastState::Connected => "Connected",
            BroadcastState::Disconnected => "Disconnected",
            BroadcastState::TemporaryBroadcastError => "Temporary Broadcast Error",
            BroadcastState::Disabled => "Disabled",
            BroadcastState::ConfigurationError => "Configuration Error",
            BroadcastState::InvalidCredentials => "Invalid Credentials",
            BroadcastState::InvalidMountPoint => "Invalid Mount Point",
            BroadcastState::InvalidSettings => "Invalid Settings",
            BroadcastState::MountPointInUse => "Mount Point In Use",
            BroadcastState::NetworkUnavailable => "Network Unavailable",
            BroadcastState::NoServer => "No Server",
            BroadcastState::UnsupportedAudioFormat => "Unsupported Audio Format",
            BroadcastState::BroadcastError => "Broadcast Error",
        }
    }
}

impl std::fmt::Display for BroadcastState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Lock-free holder for the current state
///
/// Readers (producer threads checking whether to queue) never block.
#[derive(Debug)]
pub(crate) struct AtomicBroadcastState(AtomicU8);

impl AtomicBroadcastState {
    pub fn new(state: BroadcastState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> BroadcastState {
        BroadcastState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next`, returning the previous state if anything changed
    ///
    /// An error state only gives way to another error state unless `force`
    /// is set.
    pub fn transition(&self, next: BroadcastState, force: bool) -> Option<BroadcastState> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let current = BroadcastState::from_u8(current);
                if current == next
                    || (current.is_error_state() && !next.is_error_state() && !force)
                {
                    None
                } else {
                    Some(next as u8)
                }
            })
            .ok()
            .map(BroadcastState::from_u8)
    }
}
