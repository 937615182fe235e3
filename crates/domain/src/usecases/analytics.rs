//! Analytics rollups derived from the post ledger
//!
//! Nothing here is cached or stored. Every read recomputes from committed
//! ledger rows, so the numbers are safe to serve while a run is in flight.

use std::sync::Arc;

use time::{Duration, UtcOffset};

use crate::{
    model::{AnalyticsOverview, ChartPoint, Platform, PostCounts, PostStatus},
    ports::{Clock, Ledger, LedgerError},
    usecases::local_day_bounds,
};

/// Read-side aggregation over the ledger
pub struct Analytics<L, Cl>
where
    L: Ledger + ?Sized,
    Cl: Clock + ?Sized,
{
    ledger: Arc<L>,
    clock: Arc<Cl>,
    timezone: UtcOffset,
}

impl<L, Cl> Analytics<L, Cl>
where
    L: Ledger + ?Sized,
    Cl: Clock + ?Sized,
{
    pub fn new(ledger: Arc<L>, clock: Arc<Cl>, timezone: UtcOffset) -> Self {
        Self {
            ledger,
            clock,
            timezone,
        }
    }

    /// All-time totals plus a slice restricted to the current local day
    pub async fn overview(&self) -> Result<AnalyticsOverview, LedgerError> {
        let posts = self.ledger.post_totals().await?;
        let total_products = self.ledger.count_products().await?;

        let (day_start, day_end) = local_day_bounds(self.clock.now(), self.timezone);
        let mut today = PostCounts::default();
        for post in self
            .ledger
            .posts_scheduled_between(day_start, day_end)
            .await?
        {
            today.record(post.platform, post.status);
        }

        Ok(AnalyticsOverview {
            posts,
            total_products,
            today,
        })
    }

    /// Daily activity for the trailing window ending today, oldest first.
    ///
    /// `days` is clamped to 1..=90. The series is dense: exactly `days`
    /// points come back, zero-filled where nothing was posted.
    pub async fn chart(&self, days: u16) -> Result<Vec<ChartPoint>, LedgerError> {
        let days = i64::from(days.clamp(1, 90));
        let now = self.clock.now();
        let (day_start, day_end) = local_day_bounds(now, self.timezone);
        let window_start = day_start - Duration::days(days - 1);
        let first_date = window_start.date();

        let mut points: Vec<ChartPoint> = (0..days)
            .map(|offset| ChartPoint::empty(first_date + Duration::days(offset)))
            .collect();

        for post in self
            .ledger
            .posts_scheduled_between(window_start, day_end)
            .await?
        {
            let local_date = post.scheduled_at.to_offset(self.timezone).date();
            let index = (local_date - first_date).whole_days();
            let Some(point) = usize::try_from(index).ok().and_then(|i| points.get_mut(i)) else {
                continue;
            };
            point.total_posts += 1;
            if post.status == PostStatus::Posted {
                point.successful_posts += 1;
            }
            match post.platform {
                Platform::Instagram => point.instagram_posts += 1,
                Platform::Facebook => point.facebook_posts += 1,
                Platform::Pinterest => point.pinterest_posts += 1,
            }
        }

        Ok(points)
    }
}
