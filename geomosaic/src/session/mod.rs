//! Compositing orchestration
//!
//! A [`CompositingSession`] sequences the pipeline:
//!
//! ```text
//! fetch (regions, roads, settlements) -> stitch -> project -> render
//!     -> live overlay | exported SVG
//! ```
//!
//! # Fetch slots
//!
//! Fetches are split into `begin_*` (issue a ticket, build a `'static`
//! future) and `apply_*` (check the ticket, install the data). Roads,
//! settlements and the focused city each have a superseding
//! [`FetchSlot`]: starting a new fetch cancels the previous one, and a
//! result whose ticket is no longer current is discarded whatever order
//! the futures finish in. Region additions accumulate instead.
//!
//! # Views
//!
//! [`ViewTransform`](crate::coord::ViewTransform) is `Copy`. The live
//! overlay and every export work on their own snapshot, so a pan during an
//! export cannot tear the raster and vector projections apart.

mod compositor;
mod settings;
mod slot;
mod state;

pub use compositor::{
    ApplyOutcome, CompositingSession, ExportOutcome, Fetched, LiveOverlay, PendingFetch, SessionInputs,
};
pub use settings::{default_export_dir, ExportSettings, StyleSettings};
pub use slot::{FetchSlot, FetchTicket, SlotMode};
pub use state::{InvalidTransition, SessionEvent, SessionState};

use thiserror::Error;

use crate::coord::CoordError;
use crate::export::ExportError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Coord(#[from] CoordError),
}
