//! Distinct-value extraction: turns a domain's dimension projection into the
//! sets of legal filter options.

use std::collections::BTreeSet;

use crate::models::{
    ClosingDims, ClosingOptions, ProspectingDims, ProspectingOptions, RevenueDims, RevenueOptions,
};

fn distinct_sorted<'a>(values: impl Iterator<Item = Option<&'a str>>) -> Vec<String> {
    values
        .flatten()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

/// Years sort numeric-descending so the most recent year lists first.
fn distinct_years(values: impl Iterator<Item = i32>) -> Vec<i32> {
    values
        .collect::<BTreeSet<i32>>()
        .into_iter()
        .rev()
        .collect()
}

pub fn prospecting_options(rows: &[ProspectingDims]) -> ProspectingOptions {
    ProspectingOptions {
        agents: distinct_sorted(rows.iter().map(|r| Some(r.agent.as_str()))),
        channels: distinct_sorted(rows.iter().map(|r| Some(r.channel.as_str()))),
        offers: distinct_sorted(rows.iter().map(|r| r.offer.as_deref())),
        years: distinct_years(rows.iter().map(|r| r.year)),
        quarters: distinct_sorted(rows.iter().map(|r| Some(r.quarter.as_str()))),
        months: distinct_sorted(rows.iter().map(|r| Some(r.month.as_str()))),
    }
}

pub fn closing_options(rows: &[ClosingDims]) -> ClosingOptions {
    ClosingOptions {
        closers: distinct_sorted(rows.iter().map(|r| Some(r.closer.as_str()))),
        offers: distinct_sorted(rows.iter().map(|r| r.offer.as_deref())),
        origin_agents: distinct_sorted(rows.iter().map(|r| r.origin_agent.as_deref())),
        origin_channels: distinct_sorted(rows.iter().map(|r| r.origin_channel.as_deref())),
        years: distinct_years(rows.iter().map(|r| r.year)),
        quarters: distinct_sorted(rows.iter().map(|r| Some(r.quarter.as_str()))),
        months: distinct_sorted(rows.iter().map(|r| Some(r.month.as_str()))),
    }
}

pub fn revenue_options(rows: &[RevenueDims]) -> RevenueOptions {
    RevenueOptions {
        executives: distinct_sorted(rows.iter().map(|r| Some(r.executive.as_str()))),
        offers: distinct_sorted(rows.iter().map(|r| r.offer.as_deref())),
        markets: distinct_sorted(rows.iter().map(|r| r.market.as_deref())),
        closers: distinct_sorted(rows.iter().map(|r| r.closer.as_deref())),
        consultants: distinct_sorted(rows.iter().map(|r| r.consultant.as_deref())),
        channels: distinct_sorted(rows.iter().map(|r| r.channel.as_deref())),
        years: distinct_years(rows.iter().map(|r| r.year)),
        quarters: distinct_sorted(rows.iter().map(|r| Some(r.quarter.as_str()))),
        months: distinct_sorted(rows.iter().map(|r| Some(r.month.as_str()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(agent: &str, channel: &str, offer: Option<&str>, year: i32) -> ProspectingDims {
        ProspectingDims {
            agent: agent.to_string(),
            channel: channel.to_string(),
            offer: offer.map(str::to_string),
            year,
            quarter: "Q4".to_string(),
            month: "october".to_string(),
        }
    }

    #[test]
    fn values_are_deduplicated_and_sorted() {
        let rows = vec![
            dims("Rui", "Ads", Some("Consulting"), 2025),
            dims("Ana", "Ads", None, 2024),
            dims("Rui", "Cold Calling", Some("Consulting"), 2025),
        ];
        let options = prospecting_options(&rows);
        assert_eq!(options.agents, vec!["Ana", "Rui"]);
        assert_eq!(options.channels, vec!["Ads", "Cold Calling"]);
        assert_eq!(options.offers, vec!["Consulting"]);
    }

    #[test]
    fn years_list_most_recent_first() {
        let rows = vec![
            dims("Ana", "Ads", None, 2023),
            dims("Ana", "Ads", None, 2025),
            dims("Ana", "Ads", None, 2024),
        ];
        assert_eq!(prospecting_options(&rows).years, vec![2025, 2024, 2023]);
    }

    #[test]
    fn blank_values_are_removed() {
        let rows = vec![dims("", "Ads", Some(""), 2025)];
        let options = prospecting_options(&rows);
        assert!(options.agents.is_empty());
        assert!(options.offers.is_empty());
    }

    #[test]
    fn empty_input_yields_empty_option_sets() {
        let options = prospecting_options(&[]);
        assert!(options.agents.is_empty());
        assert!(options.years.is_empty());
        assert!(options.months.is_empty());
    }
}
