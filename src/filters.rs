use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::models::RecordKind;

/// Canonical filter transport: a flat string-keyed map, as decoded from a URL
/// query string. Multi-valued keys hold comma-joined tokens; an absent key
/// means the dimension is unconstrained.
pub type QueryMap = BTreeMap<String, String>;

/// Splits a raw `k=v&k=v` query string into a QueryMap. Tokens without a `=`
/// and empty keys are skipped; later duplicates overwrite earlier ones.
pub fn parse_query_string(raw: &str) -> QueryMap {
    let mut map = QueryMap::new();
    for pair in raw.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => continue,
        };
        if key.is_empty() {
            continue;
        }
        map.insert(key.to_string(), value.to_string());
    }
    map
}

/// Add the value if absent, remove it if present.
pub fn toggle(set: &mut BTreeSet<String>, value: &str) {
    if !set.remove(value) {
        set.insert(value.to_string());
    }
}

fn split_multi(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_multi(query: &QueryMap, key: &str) -> BTreeSet<String> {
    query.get(key).map(|raw| split_multi(raw)).unwrap_or_default()
}

fn get_scalar(query: &QueryMap, key: &str) -> Option<String> {
    query.get(key).filter(|v| !v.is_empty()).cloned()
}

fn get_year(query: &QueryMap, key: &str) -> Option<i32> {
    let raw = get_scalar(query, key)?;
    match raw.parse::<i32>() {
        Ok(year) => Some(year),
        Err(_) => {
            debug!(token = %raw, "dropping non-numeric year filter token");
            None
        }
    }
}

fn put_multi(map: &mut QueryMap, key: &str, set: &BTreeSet<String>) {
    if !set.is_empty() {
        let joined = set.iter().cloned().collect::<Vec<_>>().join(",");
        map.insert(key.to_string(), joined);
    }
}

fn put_scalar(map: &mut QueryMap, key: &str, value: Option<&str>) {
    if let Some(value) = value {
        if !value.is_empty() {
            map.insert(key.to_string(), value.to_string());
        }
    }
}

/// Filters over the prospecting domain. Date bounds are carried as opaque
/// strings: the decoder never validates them, the fetcher parses and drops
/// unusable ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProspectingFilters {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub agents: BTreeSet<String>,
    pub channels: BTreeSet<String>,
    pub offers: BTreeSet<String>,
    pub year: Option<i32>,
    pub quarter: Option<String>,
    pub month: Option<String>,
}

impl ProspectingFilters {
    pub fn decode(query: &QueryMap) -> Self {
        ProspectingFilters {
            start_date: get_scalar(query, "start_date"),
            end_date: get_scalar(query, "end_date"),
            agents: get_multi(query, "agents"),
            channels: get_multi(query, "channels"),
            offers: get_multi(query, "offers"),
            year: get_year(query, "year"),
            quarter: get_scalar(query, "quarter"),
            month: get_scalar(query, "month"),
        }
    }

    pub fn encode(&self) -> QueryMap {
        let mut map = QueryMap::new();
        put_scalar(&mut map, "start_date", self.start_date.as_deref());
        put_scalar(&mut map, "end_date", self.end_date.as_deref());
        put_multi(&mut map, "agents", &self.agents);
        put_multi(&mut map, "channels", &self.channels);
        put_multi(&mut map, "offers", &self.offers);
        let year = self.year.map(|y| y.to_string());
        put_scalar(&mut map, "year", year.as_deref());
        put_scalar(&mut map, "quarter", self.quarter.as_deref());
        put_scalar(&mut map, "month", self.month.as_deref());
        map
    }

    pub fn clear(&mut self) {
        *self = ProspectingFilters::default();
    }
}

/// Filters over the closing pipeline. Origin dimensions select on the
/// prospecting agent/channel propagated at hand-off.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClosingFilters {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub closers: BTreeSet<String>,
    pub offers: BTreeSet<String>,
    pub origin_agents: BTreeSet<String>,
    pub origin_channels: BTreeSet<String>,
    pub year: Option<i32>,
    pub quarter: Option<String>,
    pub month: Option<String>,
}

impl ClosingFilters {
    pub fn decode(query: &QueryMap) -> Self {
        ClosingFilters {
            start_date: get_scalar(query, "start_date"),
            end_date: get_scalar(query, "end_date"),
            closers: get_multi(query, "closers"),
            offers: get_multi(query, "offers"),
            origin_agents: get_multi(query, "origin_agents"),
            origin_channels: get_multi(query, "origin_channels"),
            year: get_year(query, "year"),
            quarter: get_scalar(query, "quarter"),
            month: get_scalar(query, "month"),
        }
    }

    pub fn encode(&self) -> QueryMap {
        let mut map = QueryMap::new();
        put_scalar(&mut map, "start_date", self.start_date.as_deref());
        put_scalar(&mut map, "end_date", self.end_date.as_deref());
        put_multi(&mut map, "closers", &self.closers);
        put_multi(&mut map, "offers", &self.offers);
        put_multi(&mut map, "origin_agents", &self.origin_agents);
        put_multi(&mut map, "origin_channels", &self.origin_channels);
        let year = self.year.map(|y| y.to_string());
        put_scalar(&mut map, "year", year.as_deref());
        put_scalar(&mut map, "quarter", self.quarter.as_deref());
        put_scalar(&mut map, "month", self.month.as_deref());
        map
    }

    pub fn clear(&mut self) {
        *self = ClosingFilters::default();
    }
}

/// Filters over the revenue domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevenueFilters {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub executives: BTreeSet<String>,
    pub offers: BTreeSet<String>,
    pub markets: BTreeSet<String>,
    pub closers: BTreeSet<String>,
    pub consultants: BTreeSet<String>,
    pub channels: BTreeSet<String>,
    pub kind: Option<RecordKind>,
    pub year: Option<i32>,
    pub quarter: Option<String>,
    pub month: Option<String>,
}

impl RevenueFilters {
    pub fn decode(query: &QueryMap) -> Self {
        let kind = match get_scalar(query, "kind").as_deref() {
            Some("project") => Some(RecordKind::Project),
            Some("cost") => Some(RecordKind::Cost),
            Some(other) => {
                debug!(token = %other, "dropping unknown kind filter token");
                None
            }
            None => None,
        };
        RevenueFilters {
            start_date: get_scalar(query, "start_date"),
            end_date: get_scalar(query, "end_date"),
            executives: get_multi(query, "executives"),
            offers: get_multi(query, "offers"),
            markets: get_multi(query, "markets"),
            closers: get_multi(query, "closers"),
            consultants: get_multi(query, "consultants"),
            channels: get_multi(query, "channels"),
            kind,
            year: get_year(query, "year"),
            quarter: get_scalar(query, "quarter"),
            month: get_scalar(query, "month"),
        }
    }

    pub fn encode(&self) -> QueryMap {
        let mut map = QueryMap::new();
        put_scalar(&mut map, "start_date", self.start_date.as_deref());
        put_scalar(&mut map, "end_date", self.end_date.as_deref());
        put_multi(&mut map, "executives", &self.executives);
        put_multi(&mut map, "offers", &self.offers);
        put_multi(&mut map, "markets", &self.markets);
        put_multi(&mut map, "closers", &self.closers);
        put_multi(&mut map, "consultants", &self.consultants);
        put_multi(&mut map, "channels", &self.channels);
        put_scalar(&mut map, "kind", self.kind.map(|k| k.as_str()));
        let year = self.year.map(|y| y.to_string());
        put_scalar(&mut map, "year", year.as_deref());
        put_scalar(&mut map, "quarter", self.quarter.as_deref());
        put_scalar(&mut map, "month", self.month.as_deref());
        map
    }

    /// Clearing revenue filters keeps the date range and resets everything
    /// else; the other two domains reset fully. The asymmetry is deliberate.
    pub fn clear(&mut self) {
        let start_date = self.start_date.take();
        let end_date = self.end_date.take();
        *self = RevenueFilters {
            start_date,
            end_date,
            ..RevenueFilters::default()
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(pairs: &[(&str, &str)]) -> QueryMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn decode_encode_round_trips() {
        let raw = query(&[
            ("start_date", "2025-10-01"),
            ("end_date", "2025-12-31"),
            ("agents", "Ana,Rui"),
            ("channels", "Cold Calling"),
            ("year", "2025"),
            ("quarter", "Q4"),
        ]);
        let filters = ProspectingFilters::decode(&raw);
        assert_eq!(ProspectingFilters::decode(&filters.encode()), filters);
    }

    #[test]
    fn multi_select_order_is_not_significant() {
        let a = ProspectingFilters::decode(&query(&[("agents", "Rui,Ana")]));
        let b = ProspectingFilters::decode(&query(&[("agents", "Ana,Rui")]));
        assert_eq!(a, b);
        assert_eq!(a.encode(), b.encode());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let raw = query(&[("agents", "Ana"), ("utm_source", "newsletter")]);
        let filters = ProspectingFilters::decode(&raw);
        assert_eq!(filters.agents.len(), 1);
        assert!(!filters.encode().contains_key("utm_source"));
    }

    #[test]
    fn non_numeric_year_is_dropped() {
        let filters = ProspectingFilters::decode(&query(&[("year", "not-a-year")]));
        assert_eq!(filters.year, None);
    }

    #[test]
    fn malformed_dates_pass_through_as_opaque_strings() {
        let filters = ProspectingFilters::decode(&query(&[("start_date", "last tuesday")]));
        assert_eq!(filters.start_date.as_deref(), Some("last tuesday"));
    }

    #[test]
    fn empty_tokens_and_empty_values_are_treated_as_absent() {
        let filters = ProspectingFilters::decode(&query(&[("agents", ",,"), ("month", "")]));
        assert!(filters.agents.is_empty());
        assert_eq!(filters.month, None);
        assert!(filters.encode().is_empty());
    }

    #[test]
    fn toggle_adds_removes_and_drops_the_key() {
        let mut filters = ProspectingFilters::default();
        toggle(&mut filters.channels, "Ads");
        assert_eq!(filters.encode().get("channels").map(String::as_str), Some("Ads"));
        toggle(&mut filters.channels, "Cold Calling");
        assert_eq!(
            filters.encode().get("channels").map(String::as_str),
            Some("Ads,Cold Calling")
        );
        toggle(&mut filters.channels, "Ads");
        toggle(&mut filters.channels, "Cold Calling");
        assert!(!filters.encode().contains_key("channels"));
    }

    #[test]
    fn prospecting_clear_resets_everything() {
        let mut filters = ProspectingFilters::decode(&query(&[
            ("start_date", "2025-10-01"),
            ("agents", "Ana"),
        ]));
        filters.clear();
        assert_eq!(filters, ProspectingFilters::default());
    }

    #[test]
    fn revenue_clear_preserves_the_date_range() {
        let mut filters = RevenueFilters::decode(&query(&[
            ("start_date", "2025-10-01"),
            ("end_date", "2025-12-31"),
            ("markets", "DACH,Iberia"),
            ("kind", "project"),
            ("year", "2025"),
        ]));
        filters.clear();
        assert_eq!(filters.start_date.as_deref(), Some("2025-10-01"));
        assert_eq!(filters.end_date.as_deref(), Some("2025-12-31"));
        assert!(filters.markets.is_empty());
        assert_eq!(filters.kind, None);
        assert_eq!(filters.year, None);
    }

    #[test]
    fn revenue_kind_decodes_leniently() {
        let project = RevenueFilters::decode(&query(&[("kind", "project")]));
        assert_eq!(project.kind, Some(RecordKind::Project));
        let junk = RevenueFilters::decode(&query(&[("kind", "projeto")]));
        assert_eq!(junk.kind, None);
    }

    #[test]
    fn parse_query_string_splits_pairs() {
        let map = parse_query_string("agents=Ana,Rui&year=2025&stray&=empty");
        assert_eq!(map.get("agents").map(String::as_str), Some("Ana,Rui"));
        assert_eq!(map.get("year").map(String::as_str), Some("2025"));
        assert_eq!(map.len(), 2);
    }
}
