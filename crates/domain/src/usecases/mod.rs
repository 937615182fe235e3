//! Application use cases / business logic

pub mod analytics;
pub mod caption;
pub mod publish;
pub mod scheduler;
pub mod selection;

pub use analytics::Analytics;
pub use caption::{CaptionGenerator, CaptionStyle};
pub use publish::{EngineOptions, PublishEngine, PublisherSet, RunError, RunReport};
pub use scheduler::{Scheduler, TickOutcome};
pub use selection::select_products;

use time::{Duration, OffsetDateTime, UtcOffset};

/// Start of the calendar day containing `now` in the given zone
pub(crate) fn local_day_start(now: OffsetDateTime, tz: UtcOffset) -> OffsetDateTime {
    now.to_offset(tz).date().midnight().assume_offset(tz)
}

/// Half-open `[start, end)` bounds of the local calendar day containing
/// `now`. Offsets are fixed (no DST), so the day is exactly 24 hours.
pub(crate) fn local_day_bounds(now: OffsetDateTime, tz: UtcOffset) -> (OffsetDateTime, OffsetDateTime) {
    let start = local_day_start(now, tz);
    (start, start + Duration::days(1))
}
