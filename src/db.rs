use std::collections::BTreeSet;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::filters::{ClosingFilters, ProspectingFilters, RevenueFilters};
use crate::models::{
    Calendar, ClosingDims, ClosingRecord, ProspectingDims, ProspectingRecord, RevenueDims,
    RevenueRecord,
};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Date filter tokens are opaque strings until this boundary; an unusable
/// token imposes no constraint.
fn parse_day(raw: Option<&str>, key: &str) -> Option<NaiveDate> {
    let raw = raw?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(day) => Some(day),
        Err(_) => {
            debug!(token = %raw, key, "dropping unparseable date filter");
            None
        }
    }
}

fn push_date_range(
    builder: &mut QueryBuilder<Postgres>,
    start: Option<&str>,
    end: Option<&str>,
) {
    if let Some(day) = parse_day(start, "start_date") {
        builder.push(" AND day >= ");
        builder.push_bind(day);
    }
    if let Some(day) = parse_day(end, "end_date") {
        builder.push(" AND day <= ");
        builder.push_bind(day);
    }
}

fn push_set(builder: &mut QueryBuilder<Postgres>, column: &str, values: &BTreeSet<String>) {
    if values.is_empty() {
        return;
    }
    builder.push(format!(" AND {column} = ANY("));
    builder.push_bind(values.iter().cloned().collect::<Vec<String>>());
    builder.push(")");
}

fn push_calendar(
    builder: &mut QueryBuilder<Postgres>,
    year: Option<i32>,
    quarter: Option<&str>,
    month: Option<&str>,
) {
    if let Some(year) = year {
        builder.push(" AND year = ");
        builder.push_bind(year);
    }
    if let Some(quarter) = quarter {
        builder.push(" AND quarter = ");
        builder.push_bind(quarter.to_string());
    }
    if let Some(month) = month {
        builder.push(" AND month = ");
        builder.push_bind(month.to_string());
    }
}

// Most recent first; within a day, most recently created first. The weekly
// de-duplication depends on this ordering.
const RECENCY_ORDER: &str = " ORDER BY day DESC, created_at DESC";

const PROSPECTING_COLUMNS: &str = "id, day, year, quarter, month, week, agent, channel, offer, \
     calls_made, calls_answered, decision_makers_reached, decision_makers_qualified, \
     outbound_messages, replies, qualified_replies, submissions, leads_responded, \
     avg_response_time, meetings_booked, leads_booked, leads_showed, days_to_discovery, \
     created_at";

const CLOSING_COLUMNS: &str = "id, day, year, quarter, month, week, closer, offer, \
     origin_agent, origin_channel, discoveries_held, discoveries_no_show, \
     discoveries_rescheduled, follow_ups_held, follow_ups_no_show, follow_ups_rescheduled, \
     qas_held, qas_no_show, qas_rescheduled, mqls, sqls, verbal_agreements, mqls_origin, \
     sqls_origin, verbal_agreements_origin, leads_contacted, calls_answered, messages_sent, \
     replies, cancellations, discovery_attended, leads_showed, days_discovery_to_follow_up, \
     sales_cycle_days, created_at";

const REVENUE_COLUMNS: &str = "id, day, year, quarter, month, week, executive, client, market, \
     offer, deal_value, payment_mode, project_start, project_duration_days, channel, \
     consultant, closer, kind, created_at";

/// Fetches prospecting rows matching every active predicate. A backend or
/// query error is logged and surfaced as an empty row set; callers treat
/// empty as "no data".
pub async fn fetch_prospecting(
    pool: &PgPool,
    filters: &ProspectingFilters,
) -> Vec<ProspectingRecord> {
    match try_fetch_prospecting(pool, filters).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "prospecting fetch failed, treating as no data");
            Vec::new()
        }
    }
}

async fn try_fetch_prospecting(
    pool: &PgPool,
    filters: &ProspectingFilters,
) -> anyhow::Result<Vec<ProspectingRecord>> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {PROSPECTING_COLUMNS} FROM commercial_analytics.prospecting_daily WHERE TRUE"
    ));
    push_date_range(
        &mut builder,
        filters.start_date.as_deref(),
        filters.end_date.as_deref(),
    );
    push_set(&mut builder, "agent", &filters.agents);
    push_set(&mut builder, "channel", &filters.channels);
    push_set(&mut builder, "offer", &filters.offers);
    push_calendar(
        &mut builder,
        filters.year,
        filters.quarter.as_deref(),
        filters.month.as_deref(),
    );
    builder.push(RECENCY_ORDER);
    let rows = builder
        .build_query_as::<ProspectingRecord>()
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn fetch_closing(pool: &PgPool, filters: &ClosingFilters) -> Vec<ClosingRecord> {
    match try_fetch_closing(pool, filters).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "closing fetch failed, treating as no data");
            Vec::new()
        }
    }
}

async fn try_fetch_closing(
    pool: &PgPool,
    filters: &ClosingFilters,
) -> anyhow::Result<Vec<ClosingRecord>> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {CLOSING_COLUMNS} FROM commercial_analytics.closing_daily WHERE TRUE"
    ));
    push_date_range(
        &mut builder,
        filters.start_date.as_deref(),
        filters.end_date.as_deref(),
    );
    push_set(&mut builder, "closer", &filters.closers);
    push_set(&mut builder, "offer", &filters.offers);
    push_set(&mut builder, "origin_agent", &filters.origin_agents);
    push_set(&mut builder, "origin_channel", &filters.origin_channels);
    push_calendar(
        &mut builder,
        filters.year,
        filters.quarter.as_deref(),
        filters.month.as_deref(),
    );
    builder.push(RECENCY_ORDER);
    let rows = builder
        .build_query_as::<ClosingRecord>()
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn fetch_revenue(pool: &PgPool, filters: &RevenueFilters) -> Vec<RevenueRecord> {
    match try_fetch_revenue(pool, filters).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "revenue fetch failed, treating as no data");
            Vec::new()
        }
    }
}

async fn try_fetch_revenue(
    pool: &PgPool,
    filters: &RevenueFilters,
) -> anyhow::Result<Vec<RevenueRecord>> {
    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
        "SELECT {REVENUE_COLUMNS} FROM commercial_analytics.revenue_entries WHERE TRUE"
    ));
    push_date_range(
        &mut builder,
        filters.start_date.as_deref(),
        filters.end_date.as_deref(),
    );
    push_set(&mut builder, "executive", &filters.executives);
    push_set(&mut builder, "offer", &filters.offers);
    push_set(&mut builder, "market", &filters.markets);
    push_set(&mut builder, "closer", &filters.closers);
    push_set(&mut builder, "consultant", &filters.consultants);
    push_set(&mut builder, "channel", &filters.channels);
    if let Some(kind) = filters.kind {
        builder.push(" AND kind = ");
        builder.push_bind(kind.as_str().to_string());
    }
    push_calendar(
        &mut builder,
        filters.year,
        filters.quarter.as_deref(),
        filters.month.as_deref(),
    );
    builder.push(RECENCY_ORDER);
    let rows = builder
        .build_query_as::<RevenueRecord>()
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Unfiltered dimension projections for the options extractor. Errors
/// degrade to empty, so the filter UI simply shows no options.
pub async fn fetch_prospecting_dims(pool: &PgPool) -> Vec<ProspectingDims> {
    let result = sqlx::query_as::<_, ProspectingDims>(
        "SELECT agent, channel, offer, year, quarter, month \
         FROM commercial_analytics.prospecting_daily",
    )
    .fetch_all(pool)
    .await;
    match result {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "prospecting dimension fetch failed");
            Vec::new()
        }
    }
}

pub async fn fetch_closing_dims(pool: &PgPool) -> Vec<ClosingDims> {
    let result = sqlx::query_as::<_, ClosingDims>(
        "SELECT closer, offer, origin_agent, origin_channel, year, quarter, month \
         FROM commercial_analytics.closing_daily",
    )
    .fetch_all(pool)
    .await;
    match result {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "closing dimension fetch failed");
            Vec::new()
        }
    }
}

pub async fn fetch_revenue_dims(pool: &PgPool) -> Vec<RevenueDims> {
    let result = sqlx::query_as::<_, RevenueDims>(
        "SELECT executive, offer, market, closer, consultant, channel, year, quarter, month \
         FROM commercial_analytics.revenue_entries",
    )
    .fetch_all(pool)
    .await;
    match result {
        Ok(rows) => rows,
        Err(err) => {
            warn!(error = %err, "revenue dimension fetch failed");
            Vec::new()
        }
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let prospecting = vec![
        // (source_key, day, agent, channel, offer, calls_made, calls_answered,
        //  submissions, meetings_booked, leads_booked, leads_showed, avg_response_time)
        (
            "seed-pros-001",
            NaiveDate::from_ymd_opt(2025, 10, 6).context("invalid date")?,
            "Ana Costa",
            "Cold Calling",
            Some("Consulting"),
            120,
            48,
            0,
            6,
            6,
            4,
            None,
        ),
        (
            "seed-pros-002",
            NaiveDate::from_ymd_opt(2025, 10, 6).context("invalid date")?,
            "Rui Mendes",
            "Ads",
            Some("Audit"),
            0,
            0,
            35,
            9,
            11,
            7,
            Some(22.5),
        ),
        (
            "seed-pros-003",
            NaiveDate::from_ymd_opt(2025, 10, 7).context("invalid date")?,
            "Ana Costa",
            "Email Marketing",
            None,
            0,
            0,
            4,
            3,
            3,
            2,
            Some(95.0),
        ),
    ];

    for (
        source_key,
        day,
        agent,
        channel,
        offer,
        calls_made,
        calls_answered,
        submissions,
        meetings_booked,
        leads_booked,
        leads_showed,
        avg_response_time,
    ) in prospecting
    {
        let cal = Calendar::for_day(day);
        sqlx::query(
            r#"
            INSERT INTO commercial_analytics.prospecting_daily
            (id, day, year, quarter, month, week, agent, channel, offer,
             calls_made, calls_answered, submissions, meetings_booked,
             leads_booked, leads_showed, avg_response_time, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(day)
        .bind(cal.year)
        .bind(&cal.quarter)
        .bind(&cal.month)
        .bind(&cal.week)
        .bind(agent)
        .bind(channel)
        .bind(offer)
        .bind(calls_made)
        .bind(calls_answered)
        .bind(submissions)
        .bind(meetings_booked)
        .bind(leads_booked)
        .bind(leads_showed)
        .bind(avg_response_time)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let closing = vec![
        // (source_key, day, closer, offer, origin_agent, origin_channel,
        //  discoveries_held, discoveries_no_show, mqls, sqls, verbal_agreements,
        //  mqls_origin, sqls_origin, verbal_agreements_origin)
        (
            "seed-close-001",
            NaiveDate::from_ymd_opt(2025, 10, 7).context("invalid date")?,
            "Marta Silva",
            Some("Consulting"),
            Some("Ana Costa"),
            Some("Cold Calling"),
            8,
            2,
            5,
            3,
            1,
            4,
            2,
            1,
        ),
        (
            "seed-close-002",
            NaiveDate::from_ymd_opt(2025, 10, 8).context("invalid date")?,
            "Nuno Reis",
            Some("Audit"),
            Some("Rui Mendes"),
            Some("Ads"),
            6,
            1,
            4,
            2,
            2,
            3,
            2,
            2,
        ),
        (
            "seed-close-003",
            NaiveDate::from_ymd_opt(2025, 10, 9).context("invalid date")?,
            "Marta Silva",
            None,
            None,
            None,
            3,
            0,
            2,
            1,
            0,
            0,
            0,
            0,
        ),
    ];

    for (
        source_key,
        day,
        closer,
        offer,
        origin_agent,
        origin_channel,
        discoveries_held,
        discoveries_no_show,
        mqls,
        sqls,
        verbal_agreements,
        mqls_origin,
        sqls_origin,
        verbal_agreements_origin,
    ) in closing
    {
        let cal = Calendar::for_day(day);
        sqlx::query(
            r#"
            INSERT INTO commercial_analytics.closing_daily
            (id, day, year, quarter, month, week, closer, offer, origin_agent,
             origin_channel, discoveries_held, discoveries_no_show, mqls, sqls,
             verbal_agreements, mqls_origin, sqls_origin, verbal_agreements_origin,
             source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(day)
        .bind(cal.year)
        .bind(&cal.quarter)
        .bind(&cal.month)
        .bind(&cal.week)
        .bind(closer)
        .bind(offer)
        .bind(origin_agent)
        .bind(origin_channel)
        .bind(discoveries_held)
        .bind(discoveries_no_show)
        .bind(mqls)
        .bind(sqls)
        .bind(verbal_agreements)
        .bind(mqls_origin)
        .bind(sqls_origin)
        .bind(verbal_agreements_origin)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    let revenue = vec![
        // (source_key, day, executive, market, offer, deal_value, payment_mode,
        //  channel, consultant, closer, kind)
        (
            "seed-rev-001",
            NaiveDate::from_ymd_opt(2025, 11, 3).context("invalid date")?,
            "Eva Duarte",
            Some("Iberia"),
            Some("Consulting"),
            Some(18_500.0),
            Some("Upfront"),
            Some("Cold Calling"),
            Some("Ana Costa"),
            Some("Marta Silva"),
            "project",
        ),
        (
            "seed-rev-002",
            NaiveDate::from_ymd_opt(2025, 11, 10).context("invalid date")?,
            "Eva Duarte",
            None,
            Some("Audit"),
            Some(7_200.0),
            None,
            Some("Ads"),
            Some("Rui Mendes"),
            Some("Nuno Reis"),
            "project",
        ),
        (
            "seed-rev-003",
            NaiveDate::from_ymd_opt(2025, 11, 12).context("invalid date")?,
            "Eva Duarte",
            None,
            None,
            Some(1_100.0),
            None,
            None,
            None,
            None,
            "cost",
        ),
    ];

    for (
        source_key,
        day,
        executive,
        market,
        offer,
        deal_value,
        payment_mode,
        channel,
        consultant,
        closer,
        kind,
    ) in revenue
    {
        let cal = Calendar::for_day(day);
        sqlx::query(
            r#"
            INSERT INTO commercial_analytics.revenue_entries
            (id, day, year, quarter, month, week, executive, market, offer,
             deal_value, payment_mode, channel, consultant, closer, kind, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(day)
        .bind(cal.year)
        .bind(&cal.quarter)
        .bind(&cal.month)
        .bind(&cal.week)
        .bind(executive)
        .bind(market)
        .bind(offer)
        .bind(deal_value)
        .bind(payment_mode)
        .bind(channel)
        .bind(consultant)
        .bind(closer)
        .bind(kind)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Imports end-of-day prospecting logs from a CSV file. Calendar dimensions
/// are computed here, at write time. Returns the number of newly inserted
/// rows; re-imports of the same source_key are no-ops.
pub async fn import_prospecting_csv(
    pool: &PgPool,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        day: NaiveDate,
        agent: String,
        channel: String,
        offer: Option<String>,
        calls_made: i32,
        calls_answered: i32,
        decision_makers_reached: i32,
        decision_makers_qualified: i32,
        outbound_messages: i32,
        replies: i32,
        qualified_replies: i32,
        submissions: i32,
        leads_responded: i32,
        avg_response_time: Option<f64>,
        meetings_booked: i32,
        leads_booked: i32,
        leads_showed: i32,
        days_to_discovery: Option<i32>,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let cal = Calendar::for_day(row.day);
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO commercial_analytics.prospecting_daily
            (id, day, year, quarter, month, week, agent, channel, offer,
             calls_made, calls_answered, decision_makers_reached,
             decision_makers_qualified, outbound_messages, replies,
             qualified_replies, submissions, leads_responded, avg_response_time,
             meetings_booked, leads_booked, leads_showed, days_to_discovery,
             source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20, $21, $22, $23, $24)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.day)
        .bind(cal.year)
        .bind(&cal.quarter)
        .bind(&cal.month)
        .bind(&cal.week)
        .bind(&row.agent)
        .bind(&row.channel)
        .bind(&row.offer)
        .bind(row.calls_made)
        .bind(row.calls_answered)
        .bind(row.decision_makers_reached)
        .bind(row.decision_makers_qualified)
        .bind(row.outbound_messages)
        .bind(row.replies)
        .bind(row.qualified_replies)
        .bind(row.submissions)
        .bind(row.leads_responded)
        .bind(row.avg_response_time)
        .bind(row.meetings_booked)
        .bind(row.leads_booked)
        .bind(row.leads_showed)
        .bind(row.days_to_discovery)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
