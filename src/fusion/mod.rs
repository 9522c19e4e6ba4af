//! Classification fusion and prioritization.
//!
//! ```text
//!  SoundEvent ─┐
//!  Direction  ─┼─► AlertFusion ──► SoundAlert ──► AlertFeed (bounded)
//!  Outcome    ─┘        │
//!                 PriorityMapper
//! ```
//!
//! Low-confidence classifications still produce an alert (labelled
//! "Unknown sound"), as do timeouts (labelled "unknown"); geometric
//! information is never withheld because the label is uncertain.

pub mod alert;
pub mod feed;
pub mod priority;

pub use alert::{
    AlertFusion, AlertId, AlertRecord, ClassificationOutcome, SoundAlert, UNKNOWN_LABEL,
    UNKNOWN_SOUND_LABEL,
};
pub use feed::{AlertFeed, AlertPage, AlertQuery};
pub use priority::{priority_for_label, Priority, PriorityMapper};
