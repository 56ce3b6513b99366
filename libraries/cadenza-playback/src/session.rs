//! Loaded-track session
//!
//! A session owns the source stage for one decoded track. Dropping it
//! releases the source, so replacing or clearing the slot never leaks.

use cadenza_core::SourceStage;
use std::fmt;
use std::time::Duration;

/// Source stage plus metadata for the loaded track
pub struct PlaybackSession {
    source: Box<dyn SourceStage>,
    duration: Duration,
    url: String,
}

impl PlaybackSession {
    pub fn new(source: Box<dyn SourceStage>, url: impl Into<String>) -> Self {
        let duration = source.duration();
        Self {
            source,
            duration,
            url: url.into(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn source(&self) -> &dyn SourceStage {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut dyn SourceStage {
        self.source.as_mut()
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("source", &self.source.id())
            .field("duration", &self.duration)
            .field("url", &self.url)
            .finish()
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.source.dispose();
    }
}

/// Either no track is loaded or exactly one session is
#[derive(Debug, Default)]
pub enum SessionSlot {
    #[default]
    NoSession,
    Active(PlaybackSession),
}

impl SessionSlot {
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        match self {
            Self::Active(session) => Some(session),
            Self::NoSession => None,
        }
    }

    pub fn session_mut(&mut self) -> Option<&mut PlaybackSession> {
        match self {
            Self::Active(session) => Some(session),
            Self::NoSession => None,
        }
    }

    /// Install `session`, returning the one it replaced
    pub fn replace(&mut self, session: PlaybackSession) -> Option<PlaybackSession> {
        match std::mem::replace(self, Self::Active(session)) {
            Self::Active(previous) => Some(previous),
            Self::NoSession => None,
        }
    }

    /// Empty the slot, returning the session it held
    pub fn take(&mut self) -> Option<PlaybackSession> {
        match std::mem::take(self) {
            Self::Active(previous) => Some(previous),
            Self::NoSession => None,
        }
    }
}
