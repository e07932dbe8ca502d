use std::collections::HashMap;

use crate::models::{
    CloserSummary, ClosingFunnel, ClosingKpis, ClosingRecord, ClosingTotals, OriginSummary,
};

use super::{group_by, mean, pct, reduce, Accumulate, GroupKey};

impl Accumulate<ClosingRecord> for ClosingTotals {
    fn absorb(&mut self, row: &ClosingRecord) {
        self.discoveries_held += row.discoveries_held as i64;
        self.discoveries_no_show += row.discoveries_no_show as i64;
        self.discoveries_rescheduled += row.discoveries_rescheduled as i64;
        self.follow_ups_held += row.follow_ups_held as i64;
        self.follow_ups_no_show += row.follow_ups_no_show as i64;
        self.follow_ups_rescheduled += row.follow_ups_rescheduled as i64;
        self.qas_held += row.qas_held as i64;
        self.qas_no_show += row.qas_no_show as i64;
        self.qas_rescheduled += row.qas_rescheduled as i64;
        self.mqls += row.mqls as i64;
        self.sqls += row.sqls as i64;
        self.verbal_agreements += row.verbal_agreements as i64;
        self.mqls_origin += row.mqls_origin as i64;
        self.sqls_origin += row.sqls_origin as i64;
        self.verbal_agreements_origin += row.verbal_agreements_origin as i64;
        self.leads_contacted += row.leads_contacted as i64;
        self.calls_answered += row.calls_answered as i64;
        self.messages_sent += row.messages_sent as i64;
        self.replies += row.replies as i64;
        self.cancellations += row.cancellations as i64;
        self.discovery_attended += row.discovery_attended as i64;
        self.leads_showed += row.leads_showed as i64;
    }
}

/// Stage show-up rate: held meetings that were not no-shows, over held.
fn stage_show_up_rate(held: i64, no_show: i64) -> f64 {
    pct(held - no_show, held)
}

pub fn reduce_kpis(rows: &[ClosingRecord]) -> ClosingKpis {
    let totals: ClosingTotals = reduce(rows);

    let discovery_gaps: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.days_discovery_to_follow_up.map(f64::from))
        .collect();
    let cycle_days: Vec<f64> = rows
        .iter()
        .filter_map(|r| r.sales_cycle_days.map(f64::from))
        .collect();

    ClosingKpis {
        discovery_show_up_rate: stage_show_up_rate(
            totals.discoveries_held,
            totals.discoveries_no_show,
        ),
        follow_up_show_up_rate: stage_show_up_rate(
            totals.follow_ups_held,
            totals.follow_ups_no_show,
        ),
        qa_show_up_rate: stage_show_up_rate(totals.qas_held, totals.qas_no_show),
        mql_to_sql_rate: pct(totals.sqls, totals.mqls),
        sql_to_verbal_rate: pct(totals.verbal_agreements, totals.sqls),
        avg_days_discovery_to_follow_up: mean(&discovery_gaps),
        avg_sales_cycle_days: mean(&cycle_days),
        totals,
    }
}

#[derive(Default)]
struct CloserMeasures {
    discoveries_held: i64,
    follow_ups_held: i64,
    qas_held: i64,
    mqls: i64,
    sqls: i64,
    verbal_agreements: i64,
    no_shows_total: i64,
}

impl Accumulate<ClosingRecord> for CloserMeasures {
    fn absorb(&mut self, row: &ClosingRecord) {
        self.discoveries_held += row.discoveries_held as i64;
        self.follow_ups_held += row.follow_ups_held as i64;
        self.qas_held += row.qas_held as i64;
        self.mqls += row.mqls as i64;
        self.sqls += row.sqls as i64;
        self.verbal_agreements += row.verbal_agreements as i64;
        self.no_shows_total +=
            (row.discoveries_no_show + row.follow_ups_no_show + row.qas_no_show) as i64;
    }
}

pub fn by_closer(rows: &[ClosingRecord]) -> Vec<CloserSummary> {
    let groups: Vec<(String, CloserMeasures)> =
        group_by(rows, |r| GroupKey::Value(r.closer.clone()));
    let mut summaries: Vec<CloserSummary> = groups
        .into_iter()
        .map(|(closer, m)| CloserSummary {
            closer,
            discoveries_held: m.discoveries_held,
            follow_ups_held: m.follow_ups_held,
            qas_held: m.qas_held,
            mqls: m.mqls,
            sqls: m.sqls,
            verbal_agreements: m.verbal_agreements,
            no_shows_total: m.no_shows_total,
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.verbal_agreements
            .cmp(&a.verbal_agreements)
            .then_with(|| a.closer.cmp(&b.closer))
    });
    summaries
}

/// Groups origin-attributed qualification counts by the (agent, channel)
/// pair that generated the lead. Rows missing either origin component are
/// dropped, not bucketed.
pub fn by_origin(rows: &[ClosingRecord]) -> Vec<OriginSummary> {
    let mut groups: HashMap<(String, String), OriginSummary> = HashMap::new();
    for row in rows {
        let (agent, channel) = match (row.origin_agent.as_deref(), row.origin_channel.as_deref()) {
            (Some(agent), Some(channel)) if !agent.is_empty() && !channel.is_empty() => {
                (agent, channel)
            }
            _ => continue,
        };
        let entry = groups
            .entry((agent.to_string(), channel.to_string()))
            .or_insert_with(|| OriginSummary {
                agent: agent.to_string(),
                channel: channel.to_string(),
                mqls: 0,
                sqls: 0,
                verbal_agreements: 0,
            });
        entry.mqls += row.mqls_origin as i64;
        entry.sqls += row.sqls_origin as i64;
        entry.verbal_agreements += row.verbal_agreements_origin as i64;
    }
    let mut summaries: Vec<OriginSummary> = groups.into_values().collect();
    summaries.sort_by(|a, b| {
        b.verbal_agreements
            .cmp(&a.verbal_agreements)
            .then_with(|| (a.agent.as_str(), a.channel.as_str()).cmp(&(b.agent.as_str(), b.channel.as_str())))
    });
    summaries
}

/// Tier funnel mql -> sql -> verbal agreement, with the conversion rate
/// between each consecutive pair.
pub fn funnel(rows: &[ClosingRecord]) -> ClosingFunnel {
    let totals: ClosingTotals = reduce(rows);
    ClosingFunnel {
        mqls: totals.mqls,
        sqls: totals.sqls,
        verbal_agreements: totals.verbal_agreements,
        mql_to_sql_rate: pct(totals.sqls, totals.mqls),
        sql_to_verbal_rate: pct(totals.verbal_agreements, totals.sqls),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn sample(closer: &str) -> ClosingRecord {
        ClosingRecord {
            id: Uuid::new_v4(),
            day: NaiveDate::from_ymd_opt(2025, 10, 7).unwrap(),
            year: 2025,
            quarter: "Q4".to_string(),
            month: "october".to_string(),
            week: "2025-W41".to_string(),
            closer: closer.to_string(),
            offer: None,
            origin_agent: None,
            origin_channel: None,
            discoveries_held: 0,
            discoveries_no_show: 0,
            discoveries_rescheduled: 0,
            follow_ups_held: 0,
            follow_ups_no_show: 0,
            follow_ups_rescheduled: 0,
            qas_held: 0,
            qas_no_show: 0,
            qas_rescheduled: 0,
            mqls: 0,
            sqls: 0,
            verbal_agreements: 0,
            mqls_origin: 0,
            sqls_origin: 0,
            verbal_agreements_origin: 0,
            leads_contacted: 0,
            calls_answered: 0,
            messages_sent: 0,
            replies: 0,
            cancellations: 0,
            discovery_attended: 0,
            leads_showed: 0,
            days_discovery_to_follow_up: None,
            sales_cycle_days: None,
            created_at: Utc.with_ymd_and_hms(2025, 10, 7, 18, 0, 0).unwrap(),
        }
    }

    #[test]
    fn discovery_show_up_rate_is_seventy_percent_for_ten_held_three_no_show() {
        let mut row = sample("Marta");
        row.discoveries_held = 10;
        row.discoveries_no_show = 3;
        let kpis = reduce_kpis(&[row]);
        assert_eq!(kpis.discovery_show_up_rate, 70.0);
    }

    #[test]
    fn every_rate_is_zero_on_empty_input() {
        let kpis = reduce_kpis(&[]);
        assert_eq!(kpis.discovery_show_up_rate, 0.0);
        assert_eq!(kpis.follow_up_show_up_rate, 0.0);
        assert_eq!(kpis.qa_show_up_rate, 0.0);
        assert_eq!(kpis.mql_to_sql_rate, 0.0);
        assert_eq!(kpis.sql_to_verbal_rate, 0.0);
        assert!(by_closer(&[]).is_empty());
        assert!(by_origin(&[]).is_empty());
    }

    #[test]
    fn tier_conversions_divide_down_the_funnel() {
        let mut row = sample("Marta");
        row.mqls = 20;
        row.sqls = 10;
        row.verbal_agreements = 4;
        let f = funnel(&[row]);
        assert_eq!(f.mql_to_sql_rate, 50.0);
        assert_eq!(f.sql_to_verbal_rate, 40.0);
    }

    #[test]
    fn closers_sort_by_verbal_agreements() {
        let mut a = sample("Marta");
        a.verbal_agreements = 2;
        let mut b = sample("Nuno");
        b.verbal_agreements = 5;
        let summaries = by_closer(&[a, b]);
        assert_eq!(summaries[0].closer, "Nuno");
        assert_eq!(summaries[1].closer, "Marta");
    }

    #[test]
    fn no_shows_total_spans_all_three_stages() {
        let mut row = sample("Marta");
        row.discoveries_no_show = 1;
        row.follow_ups_no_show = 2;
        row.qas_no_show = 3;
        let summaries = by_closer(&[row]);
        assert_eq!(summaries[0].no_shows_total, 6);
    }

    #[test]
    fn origin_grouping_uses_attributed_counts_and_drops_null_origins() {
        let mut attributed = sample("Marta");
        attributed.origin_agent = Some("Ana".to_string());
        attributed.origin_channel = Some("Ads".to_string());
        attributed.mqls = 9;
        attributed.mqls_origin = 4;
        attributed.sqls_origin = 2;
        attributed.verbal_agreements_origin = 1;
        let mut unattributed = sample("Nuno");
        unattributed.mqls_origin = 7;
        let summaries = by_origin(&[attributed, unattributed]);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].agent, "Ana");
        assert_eq!(summaries[0].channel, "Ads");
        // Attributed sub-counts, not the closer totals.
        assert_eq!(summaries[0].mqls, 4);
        assert_eq!(summaries[0].verbal_agreements, 1);
    }

    #[test]
    fn cycle_averages_skip_rows_without_a_duration() {
        let mut with_cycle = sample("Marta");
        with_cycle.sales_cycle_days = Some(30);
        let without_cycle = sample("Nuno");
        let kpis = reduce_kpis(&[with_cycle, without_cycle]);
        assert_eq!(kpis.avg_sales_cycle_days, 30.0);
    }
}
