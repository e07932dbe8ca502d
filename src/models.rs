use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

pub const UNSPECIFIED: &str = "Unspecified";

pub const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Calendar dimensions stored alongside every record. Computed once at write
/// time; readers never re-derive them from `day`.
#[derive(Debug, Clone)]
pub struct Calendar {
    pub year: i32,
    pub quarter: String,
    pub month: String,
    pub week: String,
}

impl Calendar {
    pub fn for_day(day: NaiveDate) -> Self {
        let month_idx = day.month0() as usize;
        let iso = day.iso_week();
        Calendar {
            year: day.year(),
            quarter: format!("Q{}", month_idx / 3 + 1),
            month: MONTH_NAMES[month_idx].to_string(),
            week: format!("{}-W{:02}", iso.year(), iso.week()),
        }
    }
}

/// Position of a month name in the calendar, used to sort monthly trends.
/// Unknown names sort last.
pub fn month_index(name: &str) -> usize {
    MONTH_NAMES
        .iter()
        .position(|m| *m == name)
        .unwrap_or(MONTH_NAMES.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Project,
    Cost,
}

impl From<&str> for RecordKind {
    fn from(s: &str) -> Self {
        match s {
            "project" => RecordKind::Project,
            // Unknown kinds must never count as revenue.
            _ => RecordKind::Cost,
        }
    }
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Project => "project",
            RecordKind::Cost => "cost",
        }
    }
}

/// One agent's end-of-day prospecting log for one acquisition context.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProspectingRecord {
    pub id: Uuid,
    pub day: NaiveDate,
    pub year: i32,
    pub quarter: String,
    pub month: String,
    pub week: String,
    pub agent: String,
    pub channel: String,
    pub offer: Option<String>,
    pub calls_made: i32,
    pub calls_answered: i32,
    pub decision_makers_reached: i32,
    pub decision_makers_qualified: i32,
    pub outbound_messages: i32,
    pub replies: i32,
    pub qualified_replies: i32,
    pub submissions: i32,
    pub leads_responded: i32,
    pub avg_response_time: Option<f64>,
    pub meetings_booked: i32,
    pub leads_booked: i32,
    pub leads_showed: i32,
    pub days_to_discovery: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// One closer's daily log for the post-first-contact pipeline. Origin fields
/// carry the prospecting agent/channel that generated the lead at hand-off.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ClosingRecord {
    pub id: Uuid,
    pub day: NaiveDate,
    pub year: i32,
    pub quarter: String,
    pub month: String,
    pub week: String,
    pub closer: String,
    pub offer: Option<String>,
    pub origin_agent: Option<String>,
    pub origin_channel: Option<String>,
    pub discoveries_held: i32,
    pub discoveries_no_show: i32,
    pub discoveries_rescheduled: i32,
    pub follow_ups_held: i32,
    pub follow_ups_no_show: i32,
    pub follow_ups_rescheduled: i32,
    pub qas_held: i32,
    pub qas_no_show: i32,
    pub qas_rescheduled: i32,
    pub mqls: i32,
    pub sqls: i32,
    pub verbal_agreements: i32,
    pub mqls_origin: i32,
    pub sqls_origin: i32,
    pub verbal_agreements_origin: i32,
    pub leads_contacted: i32,
    pub calls_answered: i32,
    pub messages_sent: i32,
    pub replies: i32,
    pub cancellations: i32,
    pub discovery_attended: i32,
    pub leads_showed: i32,
    pub days_discovery_to_follow_up: Option<i32>,
    pub sales_cycle_days: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// One closed deal or cost entry.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RevenueRecord {
    pub id: Uuid,
    pub day: NaiveDate,
    pub year: i32,
    pub quarter: String,
    pub month: String,
    pub week: String,
    pub executive: String,
    pub client: Option<String>,
    pub market: Option<String>,
    pub offer: Option<String>,
    pub deal_value: Option<f64>,
    pub payment_mode: Option<String>,
    pub project_start: Option<NaiveDate>,
    pub project_duration_days: Option<i32>,
    pub channel: Option<String>,
    pub consultant: Option<String>,
    pub closer: Option<String>,
    pub kind: String,
    pub created_at: DateTime<Utc>,
}

impl RevenueRecord {
    pub fn is_project(&self) -> bool {
        RecordKind::from(self.kind.as_str()) == RecordKind::Project
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProspectingTotals {
    pub calls_made: i64,
    pub calls_answered: i64,
    pub decision_makers_reached: i64,
    pub decision_makers_qualified: i64,
    pub outbound_messages: i64,
    pub replies: i64,
    pub qualified_replies: i64,
    pub submissions: i64,
    pub leads_responded: i64,
    pub meetings_booked: i64,
    pub leads_booked: i64,
    pub leads_showed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProspectingKpis {
    #[serde(flatten)]
    pub totals: ProspectingTotals,
    pub answer_rate: f64,
    pub show_up_rate: f64,
    pub conversion_rate: f64,
    pub avg_response_time: f64,
    pub avg_days_to_discovery: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSummary {
    pub agent: String,
    pub calls_made: i64,
    pub calls_answered: i64,
    pub submissions: i64,
    pub meetings_booked: i64,
    pub leads_booked: i64,
    pub leads_showed: i64,
    pub answer_rate: f64,
    pub show_up_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub channel: String,
    pub calls_made: i64,
    pub outbound_messages: i64,
    pub replies: i64,
    pub submissions: i64,
    pub meetings_booked: i64,
    pub leads_showed: i64,
}

/// Ordered stage counts for the prospecting funnel. Each stage is an
/// independent sum; a later stage may exceed an earlier one when the source
/// rows are inconsistent, and is reported as computed.
#[derive(Debug, Clone, Serialize)]
pub struct ProspectingFunnel {
    pub outreach: i64,
    pub responses: i64,
    pub submissions: i64,
    pub bookings: i64,
    pub show_ups: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ColdCallFunnel {
    pub calls_made: i64,
    pub calls_answered: i64,
    pub decision_makers_qualified: i64,
    pub bookings: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AdsFunnel {
    pub submissions: i64,
    pub leads_responded: i64,
    pub bookings: i64,
    pub show_ups: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EmailFunnel {
    pub outbound_messages: i64,
    pub replies: i64,
    pub qualified_replies: i64,
    pub bookings: i64,
}

/// Each acquisition channel reads its own funnel stages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChannelFunnels {
    pub cold_calling: ColdCallFunnel,
    pub ads: AdsFunnel,
    pub email: EmailFunnel,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClosingTotals {
    pub discoveries_held: i64,
    pub discoveries_no_show: i64,
    pub discoveries_rescheduled: i64,
    pub follow_ups_held: i64,
    pub follow_ups_no_show: i64,
    pub follow_ups_rescheduled: i64,
    pub qas_held: i64,
    pub qas_no_show: i64,
    pub qas_rescheduled: i64,
    pub mqls: i64,
    pub sqls: i64,
    pub verbal_agreements: i64,
    pub mqls_origin: i64,
    pub sqls_origin: i64,
    pub verbal_agreements_origin: i64,
    pub leads_contacted: i64,
    pub calls_answered: i64,
    pub messages_sent: i64,
    pub replies: i64,
    pub cancellations: i64,
    pub discovery_attended: i64,
    pub leads_showed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosingKpis {
    #[serde(flatten)]
    pub totals: ClosingTotals,
    pub discovery_show_up_rate: f64,
    pub follow_up_show_up_rate: f64,
    pub qa_show_up_rate: f64,
    pub mql_to_sql_rate: f64,
    pub sql_to_verbal_rate: f64,
    pub avg_days_discovery_to_follow_up: f64,
    pub avg_sales_cycle_days: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloserSummary {
    pub closer: String,
    pub discoveries_held: i64,
    pub follow_ups_held: i64,
    pub qas_held: i64,
    pub mqls: i64,
    pub sqls: i64,
    pub verbal_agreements: i64,
    pub no_shows_total: i64,
}

/// Closing outcomes attributed back to the prospecting origin that generated
/// the lead. Built from the origin-attributed sub-counts, not the totals.
#[derive(Debug, Clone, Serialize)]
pub struct OriginSummary {
    pub agent: String,
    pub channel: String,
    pub mqls: i64,
    pub sqls: i64,
    pub verbal_agreements: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosingFunnel {
    pub mqls: i64,
    pub sqls: i64,
    pub verbal_agreements: i64,
    pub mql_to_sql_rate: f64,
    pub sql_to_verbal_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RevenueKpis {
    pub projects: i64,
    pub revenue: f64,
    pub avg_deal_value: f64,
}

/// One row of any revenue group-by (closer, consultant, market, ...).
#[derive(Debug, Clone, Serialize)]
pub struct RevenueSlice {
    pub label: String,
    pub projects: i64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyTrend {
    pub year: i32,
    pub month: String,
    pub projects: i64,
    pub revenue: f64,
}

/// Weekly roll-up merging deduplicated prospecting and closing rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WeekRollup {
    pub week: String,
    pub bookings: i64,
    pub leads_booked: i64,
    pub leads_showed: i64,
    pub discoveries_held: i64,
    pub discovery_attended: i64,
    pub no_shows: i64,
    pub rescheduled: i64,
    pub follow_ups_held: i64,
    pub qas_held: i64,
    pub mqls: i64,
    pub sqls: i64,
    pub verbal_agreements: i64,
}

/// Dimension projections consumed by the distinct-value extractor.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProspectingDims {
    pub agent: String,
    pub channel: String,
    pub offer: Option<String>,
    pub year: i32,
    pub quarter: String,
    pub month: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClosingDims {
    pub closer: String,
    pub offer: Option<String>,
    pub origin_agent: Option<String>,
    pub origin_channel: Option<String>,
    pub year: i32,
    pub quarter: String,
    pub month: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RevenueDims {
    pub executive: String,
    pub offer: Option<String>,
    pub market: Option<String>,
    pub closer: Option<String>,
    pub consultant: Option<String>,
    pub channel: Option<String>,
    pub year: i32,
    pub quarter: String,
    pub month: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProspectingOptions {
    pub agents: Vec<String>,
    pub channels: Vec<String>,
    pub offers: Vec<String>,
    pub years: Vec<i32>,
    pub quarters: Vec<String>,
    pub months: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ClosingOptions {
    pub closers: Vec<String>,
    pub offers: Vec<String>,
    pub origin_agents: Vec<String>,
    pub origin_channels: Vec<String>,
    pub years: Vec<i32>,
    pub quarters: Vec<String>,
    pub months: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RevenueOptions {
    pub executives: Vec<String>,
    pub offers: Vec<String>,
    pub markets: Vec<String>,
    pub closers: Vec<String>,
    pub consultants: Vec<String>,
    pub channels: Vec<String>,
    pub years: Vec<i32>,
    pub quarters: Vec<String>,
    pub months: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_fields_are_derived_from_the_day() {
        let cal = Calendar::for_day(NaiveDate::from_ymd_opt(2025, 10, 6).unwrap());
        assert_eq!(cal.year, 2025);
        assert_eq!(cal.quarter, "Q4");
        assert_eq!(cal.month, "october");
        assert_eq!(cal.week, "2025-W41");
    }

    #[test]
    fn iso_week_label_uses_the_iso_year() {
        // 2024-12-30 falls in ISO week 1 of 2025.
        let cal = Calendar::for_day(NaiveDate::from_ymd_opt(2024, 12, 30).unwrap());
        assert_eq!(cal.week, "2025-W01");
        assert_eq!(cal.year, 2024);
    }

    #[test]
    fn unknown_kind_never_counts_as_project() {
        assert_eq!(RecordKind::from("project"), RecordKind::Project);
        assert_eq!(RecordKind::from("cost"), RecordKind::Cost);
        assert_eq!(RecordKind::from("anything-else"), RecordKind::Cost);
    }

    #[test]
    fn month_index_orders_the_calendar() {
        assert_eq!(month_index("january"), 0);
        assert_eq!(month_index("december"), 11);
        assert_eq!(month_index("not-a-month"), 12);
    }
}
