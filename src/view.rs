//! Batch view assembly. Each filter change triggers one batch of independent
//! fetches; the composed view replaces the displayed state only as a whole,
//! and only while its filter tag is still the one the consumer wants.

use serde::Serialize;
use sqlx::PgPool;

use crate::aggregate::{closing, prospecting, revenue, weekly};
use crate::db;
use crate::filters::{ClosingFilters, ProspectingFilters, RevenueFilters};
use crate::models::{
    AgentSummary, ChannelFunnels, ChannelSummary, CloserSummary, ClosingFunnel, ClosingKpis,
    MonthlyTrend, OriginSummary, ProspectingFunnel, ProspectingKpis, RecordKind, RevenueKpis,
    RevenueSlice, WeekRollup,
};

#[derive(Debug, Clone, Serialize)]
pub struct ProspectingView {
    pub kpis: ProspectingKpis,
    pub by_agent: Vec<AgentSummary>,
    pub by_channel: Vec<ChannelSummary>,
    pub funnel: ProspectingFunnel,
    pub channel_funnels: ChannelFunnels,
}

/// Loads the prospecting page's batch. Each panel issues its own fetch, all
/// running concurrently; the view is assembled only once every fetch has
/// resolved, so consumers never see a partial mix.
pub async fn load_prospecting_view(
    pool: &PgPool,
    filters: &ProspectingFilters,
) -> ProspectingView {
    let (kpi_rows, agent_rows, channel_rows, funnel_rows) = tokio::join!(
        db::fetch_prospecting(pool, filters),
        db::fetch_prospecting(pool, filters),
        db::fetch_prospecting(pool, filters),
        db::fetch_prospecting(pool, filters),
    );
    ProspectingView {
        kpis: prospecting::reduce_kpis(&kpi_rows),
        by_agent: prospecting::by_agent(&agent_rows),
        by_channel: prospecting::by_channel(&channel_rows),
        funnel: prospecting::funnel(&funnel_rows),
        channel_funnels: prospecting::channel_funnels(&funnel_rows),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosingView {
    pub kpis: ClosingKpis,
    pub by_closer: Vec<CloserSummary>,
    pub by_origin: Vec<OriginSummary>,
    pub funnel: ClosingFunnel,
}

pub async fn load_closing_view(pool: &PgPool, filters: &ClosingFilters) -> ClosingView {
    let (kpi_rows, closer_rows, origin_rows) = tokio::join!(
        db::fetch_closing(pool, filters),
        db::fetch_closing(pool, filters),
        db::fetch_closing(pool, filters),
    );
    ClosingView {
        kpis: closing::reduce_kpis(&kpi_rows),
        by_closer: closing::by_closer(&closer_rows),
        by_origin: closing::by_origin(&origin_rows),
        funnel: closing::funnel(&kpi_rows),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueView {
    pub kpis: RevenueKpis,
    pub by_offer: Vec<RevenueSlice>,
    pub by_payment_mode: Vec<RevenueSlice>,
    pub by_channel: Vec<RevenueSlice>,
    pub by_closer: Vec<RevenueSlice>,
    pub by_consultant: Vec<RevenueSlice>,
    pub by_market: Vec<RevenueSlice>,
    pub monthly_trend: Vec<MonthlyTrend>,
}

/// Revenue views force the project kind onto the filter before fetching;
/// the aggregator excludes cost rows again for callers that bypass this.
pub async fn load_revenue_view(pool: &PgPool, filters: &RevenueFilters) -> RevenueView {
    let mut filters = filters.clone();
    filters.kind = Some(RecordKind::Project);
    let (kpi_rows, closer_rows, consultant_rows, market_rows, trend_rows) = tokio::join!(
        db::fetch_revenue(pool, &filters),
        db::fetch_revenue(pool, &filters),
        db::fetch_revenue(pool, &filters),
        db::fetch_revenue(pool, &filters),
        db::fetch_revenue(pool, &filters),
    );
    RevenueView {
        kpis: revenue::reduce_kpis(&kpi_rows),
        by_offer: revenue::by_offer(&kpi_rows),
        by_payment_mode: revenue::by_payment_mode(&kpi_rows),
        by_channel: revenue::by_channel(&kpi_rows),
        by_closer: revenue::by_closer(&closer_rows),
        by_consultant: revenue::by_consultant(&consultant_rows),
        by_market: revenue::by_market(&market_rows),
        monthly_trend: revenue::monthly_trend(&trend_rows),
    }
}

/// Weekly roll-up batch: both source domains fetched concurrently from the
/// same start date, deduplicated and merged by `aggregate::weekly`.
pub async fn load_weekly_rollup(pool: &PgPool, since: Option<&str>) -> Vec<WeekRollup> {
    let prospecting_filters = ProspectingFilters {
        start_date: since.map(str::to_string),
        ..ProspectingFilters::default()
    };
    let closing_filters = ClosingFilters {
        start_date: since.map(str::to_string),
        ..ClosingFilters::default()
    };
    let (prospecting_rows, closing_rows) = tokio::join!(
        db::fetch_prospecting(pool, &prospecting_filters),
        db::fetch_closing(pool, &closing_filters),
    );
    weekly::weekly_rollup(&prospecting_rows, &closing_rows)
}

/// The single-writer slot holding the currently displayed view. In-flight
/// batches are never cancelled; a batch publishes with the filter tag that
/// spawned it, and a tag that no longer matches the wanted filters is
/// discarded instead of overwriting a newer result.
#[derive(Debug)]
pub struct ViewSlot<F, V> {
    wanted: F,
    current: Option<V>,
}

impl<F: Clone + PartialEq, V> ViewSlot<F, V> {
    pub fn new(wanted: F) -> Self {
        ViewSlot {
            wanted,
            current: None,
        }
    }

    /// Records the filters the consumer now wants and returns the tag the
    /// next batch must publish with.
    pub fn request(&mut self, filters: F) -> F {
        self.wanted = filters.clone();
        filters
    }

    pub fn wanted(&self) -> &F {
        &self.wanted
    }

    /// Installs the view if its tag is still current. Returns false when the
    /// batch is stale and was dropped.
    pub fn publish(&mut self, tag: F, view: V) -> bool {
        if tag == self.wanted {
            self.current = Some(view);
            true
        } else {
            false
        }
    }

    pub fn current(&self) -> Option<&V> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_batches_are_discarded() {
        let mut slot: ViewSlot<u32, &str> = ViewSlot::new(0);
        let first_tag = slot.request(1);
        let second_tag = slot.request(2);
        // The newer batch resolves first.
        assert!(slot.publish(second_tag, "new"));
        // The older batch completes later and must not overwrite.
        assert!(!slot.publish(first_tag, "old"));
        assert_eq!(slot.current(), Some(&"new"));
    }

    #[test]
    fn latest_still_current_batch_wins() {
        let mut slot: ViewSlot<u32, &str> = ViewSlot::new(0);
        let tag = slot.request(7);
        assert!(slot.publish(tag.clone(), "first paint"));
        // A re-request of the same filters stays current.
        let tag_again = slot.request(7);
        assert!(slot.publish(tag_again, "refreshed"));
        assert_eq!(slot.current(), Some(&"refreshed"));
    }

    #[test]
    fn nothing_is_displayed_until_a_batch_publishes() {
        let slot: ViewSlot<u32, &str> = ViewSlot::new(0);
        assert_eq!(slot.current(), None);
    }
}
