use std::cmp::Ordering;

use crate::models::{month_index, MonthlyTrend, RevenueKpis, RevenueRecord, RevenueSlice, UNSPECIFIED};

use super::{group_by, pct_f, reduce, Accumulate, GroupKey};

#[derive(Default)]
struct RevenueMeasures {
    projects: i64,
    revenue: f64,
}

impl Accumulate<RevenueRecord> for RevenueMeasures {
    fn absorb(&mut self, row: &RevenueRecord) {
        self.projects += 1;
        // A null deal value contributes nothing to the sum.
        self.revenue += row.deal_value.unwrap_or(0.0);
    }
}

/// Cost rows never reach a revenue aggregation.
fn projects(rows: &[RevenueRecord]) -> impl Iterator<Item = &RevenueRecord> {
    rows.iter().filter(|r| r.is_project())
}

pub fn reduce_kpis(rows: &[RevenueRecord]) -> RevenueKpis {
    let m: RevenueMeasures = reduce(projects(rows));
    RevenueKpis {
        projects: m.projects,
        revenue: m.revenue,
        avg_deal_value: if m.projects == 0 {
            0.0
        } else {
            m.revenue / m.projects as f64
        },
    }
}

fn key_or_skip(value: Option<&str>) -> GroupKey {
    match value {
        Some(v) if !v.is_empty() => GroupKey::Value(v.to_string()),
        _ => GroupKey::Skip,
    }
}

fn key_or_unspecified(value: Option<&str>) -> GroupKey {
    match value {
        Some(v) if !v.is_empty() => GroupKey::Value(v.to_string()),
        _ => GroupKey::Value(UNSPECIFIED.to_string()),
    }
}

fn grouped(rows: &[RevenueRecord], key: impl Fn(&RevenueRecord) -> GroupKey) -> Vec<RevenueSlice> {
    let groups: Vec<(String, RevenueMeasures)> = group_by(projects(rows), key);
    let mut slices: Vec<RevenueSlice> = groups
        .into_iter()
        .map(|(label, m)| RevenueSlice {
            label,
            projects: m.projects,
            revenue: m.revenue,
        })
        .collect();
    slices.sort_by(|a, b| {
        b.revenue
            .partial_cmp(&a.revenue)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });
    slices
}

// Null-key policy is per dimension: actor-like dimensions drop unattributed
// rows, descriptive dimensions bucket them under an explicit label.

pub fn by_closer(rows: &[RevenueRecord]) -> Vec<RevenueSlice> {
    grouped(rows, |r| key_or_skip(r.closer.as_deref()))
}

pub fn by_consultant(rows: &[RevenueRecord]) -> Vec<RevenueSlice> {
    grouped(rows, |r| key_or_skip(r.consultant.as_deref()))
}

pub fn by_channel(rows: &[RevenueRecord]) -> Vec<RevenueSlice> {
    grouped(rows, |r| key_or_skip(r.channel.as_deref()))
}

pub fn by_market(rows: &[RevenueRecord]) -> Vec<RevenueSlice> {
    grouped(rows, |r| key_or_unspecified(r.market.as_deref()))
}

pub fn by_payment_mode(rows: &[RevenueRecord]) -> Vec<RevenueSlice> {
    grouped(rows, |r| key_or_unspecified(r.payment_mode.as_deref()))
}

pub fn by_offer(rows: &[RevenueRecord]) -> Vec<RevenueSlice> {
    grouped(rows, |r| key_or_unspecified(r.offer.as_deref()))
}

/// Project count and revenue per (year, month), in calendar order.
pub fn monthly_trend(rows: &[RevenueRecord]) -> Vec<MonthlyTrend> {
    let groups: Vec<(String, RevenueMeasures)> = group_by(projects(rows), |r| {
        GroupKey::Value(format!("{}|{}", r.year, r.month))
    });
    let mut trend: Vec<MonthlyTrend> = groups
        .into_iter()
        .map(|(key, m)| {
            let (year, month) = key.split_once('|').unwrap_or(("0", ""));
            MonthlyTrend {
                year: year.parse().unwrap_or(0),
                month: month.to_string(),
                projects: m.projects,
                revenue: m.revenue,
            }
        })
        .collect();
    trend.sort_by(|a, b| {
        a.year
            .cmp(&b.year)
            .then_with(|| month_index(&a.month).cmp(&month_index(&b.month)))
    });
    trend
}

/// Share of total revenue represented by one slice.
pub fn revenue_share(slice: &RevenueSlice, kpis: &RevenueKpis) -> f64 {
    pct_f(slice.revenue, kpis.revenue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn sample(executive: &str, kind: &str, deal_value: Option<f64>) -> RevenueRecord {
        RevenueRecord {
            id: Uuid::new_v4(),
            day: NaiveDate::from_ymd_opt(2025, 11, 3).unwrap(),
            year: 2025,
            quarter: "Q4".to_string(),
            month: "november".to_string(),
            week: "2025-W45".to_string(),
            executive: executive.to_string(),
            client: None,
            market: None,
            offer: None,
            deal_value,
            payment_mode: None,
            project_start: None,
            project_duration_days: None,
            channel: None,
            consultant: None,
            closer: None,
            kind: kind.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 11, 3, 18, 0, 0).unwrap(),
        }
    }

    #[test]
    fn cost_rows_are_excluded_from_every_revenue_aggregation() {
        let project = sample("Eva", "project", Some(12_000.0));
        let cost = sample("Eva", "cost", Some(4_000.0));
        let kpis = reduce_kpis(&[project, cost]);
        assert_eq!(kpis.projects, 1);
        assert_eq!(kpis.revenue, 12_000.0);
        assert_eq!(kpis.avg_deal_value, 12_000.0);
    }

    #[test]
    fn null_deal_values_count_the_project_but_add_no_revenue() {
        let valued = sample("Eva", "project", Some(10_000.0));
        let unvalued = sample("Eva", "project", None);
        let kpis = reduce_kpis(&[valued, unvalued]);
        assert_eq!(kpis.projects, 2);
        assert_eq!(kpis.revenue, 10_000.0);
        assert_eq!(kpis.avg_deal_value, 5_000.0);
    }

    #[test]
    fn empty_rows_yield_zero_kpis() {
        let kpis = reduce_kpis(&[]);
        assert_eq!(kpis.projects, 0);
        assert_eq!(kpis.revenue, 0.0);
        assert_eq!(kpis.avg_deal_value, 0.0);
    }

    #[test]
    fn null_closer_rows_are_dropped_from_by_closer() {
        let mut attributed = sample("Eva", "project", Some(8_000.0));
        attributed.closer = Some("Marta".to_string());
        let unattributed = sample("Eva", "project", Some(2_000.0));
        let slices = by_closer(&[attributed, unattributed]);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].label, "Marta");
        assert_eq!(slices[0].revenue, 8_000.0);
    }

    #[test]
    fn null_market_rows_are_bucketed_under_unspecified() {
        let mut named = sample("Eva", "project", Some(8_000.0));
        named.market = Some("Iberia".to_string());
        let unnamed = sample("Eva", "project", Some(2_000.0));
        let slices = by_market(&[named, unnamed]);
        assert_eq!(slices.len(), 2);
        assert_eq!(slices[0].label, "Iberia");
        assert_eq!(slices[1].label, UNSPECIFIED);
        assert_eq!(slices[1].revenue, 2_000.0);
    }

    #[test]
    fn slices_sort_by_revenue_descending() {
        let mut small = sample("Eva", "project", Some(1_000.0));
        small.market = Some("DACH".to_string());
        let mut large = sample("Eva", "project", Some(9_000.0));
        large.market = Some("Iberia".to_string());
        let slices = by_market(&[small, large]);
        assert_eq!(slices[0].label, "Iberia");
        assert_eq!(slices[1].label, "DACH");
    }

    #[test]
    fn monthly_trend_sorts_by_calendar_order_not_name() {
        let mut march = sample("Eva", "project", Some(1.0));
        march.month = "march".to_string();
        let mut january = sample("Eva", "project", Some(2.0));
        january.month = "january".to_string();
        let mut december_prior = sample("Eva", "project", Some(3.0));
        december_prior.year = 2024;
        december_prior.month = "december".to_string();
        let trend = monthly_trend(&[march, january, december_prior]);
        let labels: Vec<(i32, &str)> = trend.iter().map(|t| (t.year, t.month.as_str())).collect();
        assert_eq!(
            labels,
            vec![(2024, "december"), (2025, "january"), (2025, "march")]
        );
    }
}
