use std::fmt::Write;

use crate::aggregate::revenue::revenue_share;
use crate::models::WeekRollup;
use crate::view::{ClosingView, ProspectingView, RevenueView};

pub fn build_prospecting_report(scope: &str, view: &ProspectingView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Prospecting Report");
    let _ = writeln!(output, "Scope: {scope}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Global KPIs");
    let _ = writeln!(
        output,
        "- Calls: {} made, {} answered (answer rate {:.1}%)",
        view.kpis.totals.calls_made, view.kpis.totals.calls_answered, view.kpis.answer_rate
    );
    let _ = writeln!(
        output,
        "- Meetings: {} booked, {} showed up (show-up rate {:.1}%)",
        view.kpis.totals.meetings_booked, view.kpis.totals.leads_showed, view.kpis.show_up_rate
    );
    let _ = writeln!(
        output,
        "- Submissions: {} (conversion to booking {:.1}%)",
        view.kpis.totals.submissions, view.kpis.conversion_rate
    );
    let _ = writeln!(
        output,
        "- Avg response time {:.1} min, avg days to discovery {:.1}",
        view.kpis.avg_response_time, view.kpis.avg_days_to_discovery
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Agent");
    if view.by_agent.is_empty() {
        let _ = writeln!(output, "No activity recorded for this scope.");
    } else {
        for agent in &view.by_agent {
            let _ = writeln!(
                output,
                "- {}: {} bookings, {} showed up, {} calls (answer rate {:.1}%)",
                agent.agent,
                agent.meetings_booked,
                agent.leads_showed,
                agent.calls_made,
                agent.answer_rate
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Channel");
    if view.by_channel.is_empty() {
        let _ = writeln!(output, "No activity recorded for this scope.");
    } else {
        for channel in &view.by_channel {
            let _ = writeln!(
                output,
                "- {}: {} bookings, {} submissions, {} replies",
                channel.channel, channel.meetings_booked, channel.submissions, channel.replies
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Funnel");
    let funnel = &view.funnel;
    let _ = writeln!(output, "- Outreach: {}", funnel.outreach);
    let _ = writeln!(output, "- Responses: {}", funnel.responses);
    let _ = writeln!(output, "- Submissions: {}", funnel.submissions);
    let _ = writeln!(output, "- Bookings: {}", funnel.bookings);
    let _ = writeln!(output, "- Show-ups: {}", funnel.show_ups);

    output
}

pub fn build_closing_report(scope: &str, view: &ClosingView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Closing Pipeline Report");
    let _ = writeln!(output, "Scope: {scope}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Global KPIs");
    let _ = writeln!(
        output,
        "- Discoveries: {} held, show-up rate {:.1}%",
        view.kpis.totals.discoveries_held, view.kpis.discovery_show_up_rate
    );
    let _ = writeln!(
        output,
        "- Follow-ups: {} held, show-up rate {:.1}%",
        view.kpis.totals.follow_ups_held, view.kpis.follow_up_show_up_rate
    );
    let _ = writeln!(
        output,
        "- Q&As: {} held, show-up rate {:.1}%",
        view.kpis.totals.qas_held, view.kpis.qa_show_up_rate
    );
    let _ = writeln!(
        output,
        "- Qualification: {} MQLs -> {} SQLs ({:.1}%) -> {} verbal agreements ({:.1}%)",
        view.kpis.totals.mqls,
        view.kpis.totals.sqls,
        view.kpis.mql_to_sql_rate,
        view.kpis.totals.verbal_agreements,
        view.kpis.sql_to_verbal_rate
    );
    let _ = writeln!(
        output,
        "- Avg sales cycle {:.1} days",
        view.kpis.avg_sales_cycle_days
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Closer");
    if view.by_closer.is_empty() {
        let _ = writeln!(output, "No activity recorded for this scope.");
    } else {
        for closer in &view.by_closer {
            let _ = writeln!(
                output,
                "- {}: {} verbal agreements, {} SQLs, {} MQLs, {} no-shows",
                closer.closer, closer.verbal_agreements, closer.sqls, closer.mqls,
                closer.no_shows_total
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## By Origin");
    if view.by_origin.is_empty() {
        let _ = writeln!(output, "No attributed outcomes for this scope.");
    } else {
        for origin in &view.by_origin {
            let _ = writeln!(
                output,
                "- {} via {}: {} MQLs, {} SQLs, {} verbal agreements",
                origin.agent, origin.channel, origin.mqls, origin.sqls, origin.verbal_agreements
            );
        }
    }

    output
}

pub fn build_revenue_report(scope: &str, view: &RevenueView) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Revenue Report");
    let _ = writeln!(output, "Scope: {scope}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## Global KPIs");
    let _ = writeln!(
        output,
        "- {} projects, {:.2} revenue, {:.2} avg deal value",
        view.kpis.projects, view.kpis.revenue, view.kpis.avg_deal_value
    );

    let sections = [
        ("By Offer", &view.by_offer),
        ("By Payment Mode", &view.by_payment_mode),
        ("By Channel", &view.by_channel),
        ("By Closer", &view.by_closer),
        ("By Consultant", &view.by_consultant),
        ("By Market", &view.by_market),
    ];
    for (title, slices) in sections {
        let _ = writeln!(output);
        let _ = writeln!(output, "## {title}");
        if slices.is_empty() {
            let _ = writeln!(output, "No closed projects for this scope.");
        } else {
            for slice in slices.iter() {
                let _ = writeln!(
                    output,
                    "- {}: {} projects, {:.2} revenue ({:.1}% of total)",
                    slice.label,
                    slice.projects,
                    slice.revenue,
                    revenue_share(slice, &view.kpis)
                );
            }
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Trend");
    if view.monthly_trend.is_empty() {
        let _ = writeln!(output, "No closed projects for this scope.");
    } else {
        for month in &view.monthly_trend {
            let _ = writeln!(
                output,
                "- {} {}: {} projects, {:.2} revenue",
                month.month, month.year, month.projects, month.revenue
            );
        }
    }

    output
}

pub fn build_weekly_report(rollup: &[WeekRollup]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Weekly Growth Roll-up");
    let _ = writeln!(output);

    if rollup.is_empty() {
        let _ = writeln!(output, "No rows in this window.");
        return output;
    }

    for week in rollup {
        let _ = writeln!(output, "## {}", week.week);
        let _ = writeln!(
            output,
            "- Bookings: {} (of which {} showed up)",
            week.bookings, week.leads_showed
        );
        let _ = writeln!(
            output,
            "- Meetings: {} discoveries ({} attended), {} follow-ups, {} Q&As",
            week.discoveries_held, week.discovery_attended, week.follow_ups_held, week.qas_held
        );
        let _ = writeln!(
            output,
            "- Slippage: {} no-shows, {} rescheduled",
            week.no_shows, week.rescheduled
        );
        let _ = writeln!(
            output,
            "- Qualification: {} MQLs, {} SQLs, {} verbal agreements",
            week.mqls, week.sqls, week.verbal_agreements
        );
        let _ = writeln!(output);
    }

    output
}
