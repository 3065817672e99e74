// Quote freshness guard.
// Decides whether a generated quote is too close to one used inside the
// rolling window, and keeps the history of admitted quotes on disk.

pub mod aliases;
pub mod clock;
pub mod guard;
pub mod lock;
pub mod normalize;
pub mod store;

use std::path::PathBuf;

use thiserror::Error;

pub use aliases::{AliasTable, SourceStatus};
pub use clock::{Clock, FixedClock, SystemClock};
pub use guard::{with_locked_store, Admission, GuardConfig, LoadStatus, QuoteGuard, RejectReason, Thresholds};
pub use store::QuoteRecord;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("invalid quote date '{value}': expected YYYY-MM-DD ({reason})")]
    InvalidDate { value: String, reason: String },

    #[error("quote store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("quote store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not lock quote store {}: {source}", .path.display())]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
