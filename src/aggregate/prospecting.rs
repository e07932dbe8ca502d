use crate::models::{
    AdsFunnel, AgentSummary, ChannelFunnels, ChannelSummary, ColdCallFunnel, EmailFunnel,
    ProspectingFunnel, ProspectingKpis, ProspectingRecord, ProspectingTotals,
};

use super::{group_by, mean, pct, reduce, Accumulate, GroupKey};

pub const CHANNEL_COLD_CALLING: &str = "Cold Calling";
pub const CHANNEL_ADS: &str = "Ads";
pub const CHANNEL_EMAIL: &str = "Email Marketing";

impl Accumulate<ProspectingRecord> for ProspectingTotals {
    fn absorb(&mut self, row: &ProspectingRecord) {
        self.calls_made += row.calls_made as i64;
        self.calls_answered += row.calls_answered as i64;
        self.decision_makers_reached += row.decision_makers_reached as i64;
        self.decision_makers_qualified += row.decision_makers_qualified as i64;
        self.outbound_messages += row.outbound_messages as i64;
        self.replies += row.replies as i64;
        self.qualified_replies += row.qualified_replies as i64;
        self.submissions += row.submissions as i64;
        self.leads_responded += row.leads_responded as i64;
        self.meetings_booked += row.meetings_booked as i64;
        self.leads_booked += row.leads_booked as i64;
        self.leads_showed += row.leads_showed as i64;
    }
}

pub fn reduce_kpis(rows: &[ProspectingRecord]) -> ProspectingKpis {
    let totals: ProspectingTotals = reduce(rows);

    // Nullable durations are averaged over the rows that carry them; rows
    // without a value stay out of both numerator and denominator.
    let response_times: Vec<f64> = rows.iter().filter_map(|r| r.avg_response_time).collect();
    let discovery_days: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.days_to_discovery.map(f64::from))
        .collect();

    ProspectingKpis {
        answer_rate: pct(totals.calls_answered, totals.calls_made),
        // Show-up divides by booked meetings, not booked leads.
        show_up_rate: pct(totals.leads_showed, totals.meetings_booked),
        conversion_rate: pct(totals.meetings_booked, totals.submissions),
        avg_response_time: mean(&response_times),
        avg_days_to_discovery: mean(&discovery_days),
        totals,
    }
}

#[derive(Default)]
struct AgentMeasures {
    calls_made: i64,
    calls_answered: i64,
    submissions: i64,
    meetings_booked: i64,
    leads_booked: i64,
    leads_showed: i64,
}

impl Accumulate<ProspectingRecord> for AgentMeasures {
    fn absorb(&mut self, row: &ProspectingRecord) {
        self.calls_made += row.calls_made as i64;
        self.calls_answered += row.calls_answered as i64;
        self.submissions += row.submissions as i64;
        self.meetings_booked += row.meetings_booked as i64;
        self.leads_booked += row.leads_booked as i64;
        self.leads_showed += row.leads_showed as i64;
    }
}

pub fn by_agent(rows: &[ProspectingRecord]) -> Vec<AgentSummary> {
    let groups: Vec<(String, AgentMeasures)> =
        group_by(rows, |r| GroupKey::Value(r.agent.clone()));
    let mut summaries: Vec<AgentSummary> = groups
        .into_iter()
        .map(|(agent, m)| AgentSummary {
            agent,
            calls_made: m.calls_made,
            calls_answered: m.calls_answered,
            submissions: m.submissions,
            meetings_booked: m.meetings_booked,
            leads_booked: m.leads_booked,
            leads_showed: m.leads_showed,
            answer_rate: pct(m.calls_answered, m.calls_made),
            show_up_rate: pct(m.leads_showed, m.meetings_booked),
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.meetings_booked
            .cmp(&a.meetings_booked)
            .then_with(|| a.agent.cmp(&b.agent))
    });
    summaries
}

#[derive(Default)]
struct ChannelMeasures {
    calls_made: i64,
    outbound_messages: i64,
    replies: i64,
    submissions: i64,
    meetings_booked: i64,
    leads_showed: i64,
}

impl Accumulate<ProspectingRecord> for ChannelMeasures {
    fn absorb(&mut self, row: &ProspectingRecord) {
        self.calls_made += row.calls_made as i64;
        self.outbound_messages += row.outbound_messages as i64;
        self.replies += row.replies as i64;
        self.submissions += row.submissions as i64;
        self.meetings_booked += row.meetings_booked as i64;
        self.leads_showed += row.leads_showed as i64;
    }
}

pub fn by_channel(rows: &[ProspectingRecord]) -> Vec<ChannelSummary> {
    let groups: Vec<(String, ChannelMeasures)> =
        group_by(rows, |r| GroupKey::Value(r.channel.clone()));
    let mut summaries: Vec<ChannelSummary> = groups
        .into_iter()
        .map(|(channel, m)| ChannelSummary {
            channel,
            calls_made: m.calls_made,
            outbound_messages: m.outbound_messages,
            replies: m.replies,
            submissions: m.submissions,
            meetings_booked: m.meetings_booked,
            leads_showed: m.leads_showed,
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.meetings_booked
            .cmp(&a.meetings_booked)
            .then_with(|| a.channel.cmp(&b.channel))
    });
    summaries
}

/// Global funnel. Stages are independent sums over the same rows and are
/// never clamped to decrease monotonically; inconsistent source data shows
/// through as computed.
pub fn funnel(rows: &[ProspectingRecord]) -> ProspectingFunnel {
    let totals: ProspectingTotals = reduce(rows);
    ProspectingFunnel {
        outreach: totals.calls_made + totals.outbound_messages,
        responses: totals.calls_answered + totals.replies,
        submissions: totals.submissions,
        bookings: totals.meetings_booked,
        show_ups: totals.leads_showed,
    }
}

/// Per-channel funnels: each named channel reads its own stage fields.
pub fn channel_funnels(rows: &[ProspectingRecord]) -> ChannelFunnels {
    let mut funnels = ChannelFunnels::default();
    for row in rows {
        match row.channel.as_str() {
            CHANNEL_COLD_CALLING => absorb_cold_calling(&mut funnels.cold_calling, row),
            CHANNEL_ADS => absorb_ads(&mut funnels.ads, row),
            CHANNEL_EMAIL => absorb_email(&mut funnels.email, row),
            _ => {}
        }
    }
    funnels
}

fn absorb_cold_calling(funnel: &mut ColdCallFunnel, row: &ProspectingRecord) {
    funnel.calls_made += row.calls_made as i64;
    funnel.calls_answered += row.calls_answered as i64;
    funnel.decision_makers_qualified += row.decision_makers_qualified as i64;
    funnel.bookings += row.meetings_booked as i64;
}

fn absorb_ads(funnel: &mut AdsFunnel, row: &ProspectingRecord) {
    funnel.submissions += row.submissions as i64;
    funnel.leads_responded += row.leads_responded as i64;
    funnel.bookings += row.meetings_booked as i64;
    funnel.show_ups += row.leads_showed as i64;
}

fn absorb_email(funnel: &mut EmailFunnel, row: &ProspectingRecord) {
    funnel.outbound_messages += row.outbound_messages as i64;
    funnel.replies += row.replies as i64;
    funnel.qualified_replies += row.qualified_replies as i64;
    funnel.bookings += row.meetings_booked as i64;
}
