use std::collections::{BTreeMap, HashSet};

use crate::models::{ClosingRecord, ProspectingRecord, WeekRollup, UNSPECIFIED};

/// Keeps the most recently created row per (day, closer, offer). Relies on
/// the fetcher's ordering (day desc, created_at desc): the first row seen
/// for a key is the latest one, so first-wins is latest-wins. Re-submitted
/// corrections share the key and must not be double-counted.
pub fn dedup_latest_closing(rows: &[ClosingRecord]) -> Vec<&ClosingRecord> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|r| seen.insert((r.day, r.closer.as_str(), r.offer.as_deref())))
        .collect()
}

/// Same policy for prospecting rows; the key also carries the channel, since
/// one agent logs one row per channel per day.
pub fn dedup_latest_prospecting(rows: &[ProspectingRecord]) -> Vec<&ProspectingRecord> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter(|r| seen.insert((r.day, r.agent.as_str(), r.channel.as_str(), r.offer.as_deref())))
        .collect()
}

fn week_entry<'a>(weeks: &'a mut BTreeMap<String, WeekRollup>, week: &str) -> &'a mut WeekRollup {
    let label = if week.is_empty() { UNSPECIFIED } else { week };
    weeks.entry(label.to_string()).or_insert_with(|| WeekRollup {
        week: label.to_string(),
        ..WeekRollup::default()
    })
}

/// Merges both source domains into calendar-week buckets, de-duplicating
/// each domain independently before any summing. Sorted by week label
/// ascending.
pub fn weekly_rollup(
    prospecting: &[ProspectingRecord],
    closing: &[ClosingRecord],
) -> Vec<WeekRollup> {
    let mut weeks: BTreeMap<String, WeekRollup> = BTreeMap::new();

    for row in dedup_latest_closing(closing) {
        let entry = week_entry(&mut weeks, &row.week);
        entry.discoveries_held += row.discoveries_held as i64;
        entry.discovery_attended += row.discovery_attended as i64;
        entry.no_shows +=
            (row.discoveries_no_show + row.follow_ups_no_show + row.qas_no_show) as i64;
        entry.rescheduled += (row.discoveries_rescheduled
            + row.follow_ups_rescheduled
            + row.qas_rescheduled) as i64;
        entry.follow_ups_held += row.follow_ups_held as i64;
        entry.qas_held += row.qas_held as i64;
        entry.mqls += row.mqls as i64;
        entry.sqls += row.sqls as i64;
        entry.verbal_agreements += row.verbal_agreements as i64;
    }

    for row in dedup_latest_prospecting(prospecting) {
        let entry = week_entry(&mut weeks, &row.week);
        entry.bookings += row.meetings_booked as i64;
        entry.leads_booked += row.leads_booked as i64;
        entry.leads_showed += row.leads_showed as i64;
    }

    weeks.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use uuid::Uuid;

    fn closing_row(day: u32, closer: &str, offer: Option<&str>, hour: u32) -> ClosingRecord {
        ClosingRecord {
            id: Uuid::new_v4(),
            day: NaiveDate::from_ymd_opt(2025, 10, day).unwrap(),
            year: 2025,
            quarter: "Q4".to_string(),
            month: "october".to_string(),
            week: "2025-W41".to_string(),
            closer: closer.to_string(),
            offer: offer.map(str::to_string),
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
            created_at: Utc.with_ymd_and_hms(2025, 10, day, hour, 0, 0).unwrap(),
        }
    }

    fn prospecting_row(day: u32, agent: &str, channel: &str) -> ProspectingRecord {
        ProspectingRecord {
            id: Uuid::new_v4(),
            day: NaiveDate::from_ymd_opt(2025, 10, day).unwrap(),
            year: 2025,
            quarter: "Q4".to_string(),
            month: "october".to_string(),
            week: "2025-W41".to_string(),
            agent: agent.to_string(),
            channel: channel.to_string(),
            offer: None,
            calls_made: 0,
            calls_answered: 0,
            decision_makers_reached: 0,
            decision_makers_qualified: 0,
            outbound_messages: 0,
            replies: 0,
            qualified_replies: 0,
            submissions: 0,
            leads_responded: 0,
            avg_response_time: None,
            meetings_booked: 0,
            leads_booked: 0,
            leads_showed: 0,
            days_to_discovery: None,
            created_at: Utc.with_ymd_and_hms(2025, 10, day, 18, 0, 0).unwrap(),
        }
    }

    #[test]
    fn only_the_most_recent_row_per_key_contributes() {
        // Fetcher order: most recently created first.
        let mut corrected = closing_row(6, "Marta", Some("Consulting"), 20);
        corrected.mqls = 3;
        let mut original = closing_row(6, "Marta", Some("Consulting"), 9);
        original.mqls = 10;
        let rollup = weekly_rollup(&[], &[corrected, original]);
        assert_eq!(rollup.len(), 1);
        assert_eq!(rollup[0].mqls, 3);
    }

    #[test]
    fn different_offers_are_distinct_keys() {
        let mut a = closing_row(6, "Marta", Some("Consulting"), 20);
        a.mqls = 3;
        let mut b = closing_row(6, "Marta", None, 9);
        b.mqls = 10;
        let rollup = weekly_rollup(&[], &[a, b]);
        assert_eq!(rollup[0].mqls, 13);
    }

    #[test]
    fn domains_are_deduplicated_independently_then_merged() {
        let mut meeting = closing_row(6, "Marta", None, 20);
        meeting.discoveries_held = 4;
        let mut booking_latest = prospecting_row(7, "Ana", "Ads");
        booking_latest.meetings_booked = 2;
        let mut booking_stale = prospecting_row(7, "Ana", "Ads");
        booking_stale.meetings_booked = 9;
        let rollup = weekly_rollup(&[booking_latest, booking_stale], &[meeting]);
        assert_eq!(rollup.len(), 1);
        assert_eq!(rollup[0].discoveries_held, 4);
        assert_eq!(rollup[0].bookings, 2);
    }

    #[test]
    fn no_shows_and_reschedules_span_all_stages() {
        let mut row = closing_row(6, "Marta", None, 20);
        row.discoveries_no_show = 1;
        row.follow_ups_no_show = 2;
        row.qas_no_show = 3;
        row.discoveries_rescheduled = 1;
        row.qas_rescheduled = 1;
        let rollup = weekly_rollup(&[], &[row]);
        assert_eq!(rollup[0].no_shows, 6);
        assert_eq!(rollup[0].rescheduled, 2);
    }

    #[test]
    fn blank_week_labels_are_bucketed_not_dropped() {
        let mut row = closing_row(6, "Marta", None, 20);
        row.week = String::new();
        row.mqls = 2;
        let rollup = weekly_rollup(&[], &[row]);
        assert_eq!(rollup[0].week, UNSPECIFIED);
        assert_eq!(rollup[0].mqls, 2);
    }

    #[test]
    fn weeks_sort_ascending_by_label() {
        let mut early = closing_row(6, "Marta", None, 20);
        early.week = "2025-W41".to_string();
        let mut late = closing_row(13, "Marta", None, 20);
        late.week = "2025-W42".to_string();
        let rollup = weekly_rollup(&[], &[late, early]);
        assert_eq!(rollup[0].week, "2025-W41");
        assert_eq!(rollup[1].week, "2025-W42");
    }
}
