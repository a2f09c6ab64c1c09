//! Compositing pipeline state machine.

use std::fmt;

use thiserror::Error;

/// Phase of a compositing session.
///
/// ```text
/// Idle -> FetchingBoundary -> [FetchingRoads] -> Stitching -> Projecting -> Rendering
///      -> LiveOverlayReady | ExportArtifactReady
/// ```
///
/// View changes re-enter at `Projecting`. `Aborted` (cancellation) and
/// `Error` (failure of any in-flight step) end a run;
/// the next fetch or view change starts a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionState {
    #[default]
    Idle,
    FetchingBoundary,
    FetchingRoads,
    Stitching,
    Projecting,
    Rendering,
    LiveOverlayReady,
    ExportArtifactReady,
    Aborted,
    Error,
}

impl SessionState {
    /// A fetch is outstanding.
    pub fn is_fetching(&self) -> bool {
        matches!(self, SessionState::FetchingBoundary | SessionState::FetchingRoads)
    }

    /// Work is under way: fetching, stitching, projecting or rendering.
    pub fn is_in_flight(&self) -> bool {
        self.is_fetching()
            || matches!(
                self,
                SessionState::Stitching | SessionState::Projecting | SessionState::Rendering
            )
    }

    /// No work is under way and a new run may start.
    pub fn is_settled(&self) -> bool {
        !self.is_in_flight()
    }

    /// Applies `event`, returning the next state.
    pub fn transition(self, event: SessionEvent) -> Result<SessionState, InvalidTransition> {
        use SessionEvent as E;
        use SessionState as S;

        let startable = self.is_settled() || self.is_fetching();
        let next = match (self, event) {
            (_, E::Reset) => Some(S::Idle),
            (_, E::BeginBoundaryFetch) if startable => Some(S::FetchingBoundary),
            (_, E::BeginRoadFetch) if startable => Some(S::FetchingRoads),
            (s, E::BoundaryFetched | E::RoadsFetched) if s.is_fetching() => Some(S::Stitching),
            (S::Stitching, E::Stitched) => Some(S::Projecting),
            (_, E::ViewChanged | E::DataReady) if startable => Some(S::Projecting),
            (S::Projecting, E::Projected) => Some(S::Rendering),
            (S::Rendering, E::Rendered { export: false }) => Some(S::LiveOverlayReady),
            (S::Rendering, E::Rendered { export: true }) => Some(S::ExportArtifactReady),
            (s, E::Cancel) if s.is_in_flight() => Some(S::Aborted),
            (s, E::Fail) if s.is_in_flight() => Some(S::Error),
            _ => None,
        };

        next.ok_or(InvalidTransition { from: self, event })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Something that moves a session between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionEvent {
    BeginBoundaryFetch,
    BeginRoadFetch,
    BoundaryFetched,
    RoadsFetched,
    Stitched,
    /// Source data changed without a fetch (removal, reload).
    DataReady,
    ViewChanged,
    Projected,
    Rendered { export: bool },
    Cancel,
    Fail,
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition from {from} on {event:?}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub event: SessionEvent,
}
