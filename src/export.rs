// Export query construction for `Map/GetDeviceListForDownload`.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;

/// Category of synchronized data requested in an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceType {
    Messages = 3,
    Tracks = 6,
    Navigation = 7,
}

impl ServiceType {
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Ordered list of ids without duplicates. A single id converts into a
/// one-element list, so every id parameter is encoded the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdList(Vec<i64>);

impl IdList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: i64) {
        if !self.0.contains(&id) {
            self.0.push(id);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }
}

impl From<i64> for IdList {
    fn from(id: i64) -> Self {
        IdList(vec![id])
    }
}

impl From<Vec<i64>> for IdList {
    fn from(ids: Vec<i64>) -> Self {
        ids.into_iter().collect()
    }
}

impl From<&[i64]> for IdList {
    fn from(ids: &[i64]) -> Self {
        ids.iter().copied().collect()
    }
}

impl FromIterator<i64> for IdList {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut list = IdList::new();
        for id in iter {
            list.push(id);
        }
        list
    }
}

impl fmt::Display for IdList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

/// Which tracks the service should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFilter {
    MostRecentTrack,
    SinceDate(DateTime<Utc>),
    BetweenDates(DateTime<Utc>, DateTime<Utc>),
}

impl ExportFilter {
    /// Pick the filter mode from an optional date range. A `to` date without
    /// a `from` date falls back to the most recent track.
    pub fn from_dates(from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        match (from, to) {
            (Some(from), Some(to)) => ExportFilter::BetweenDates(from, to),
            (Some(from), None) => ExportFilter::SinceDate(from),
            (None, _) => ExportFilter::MostRecentTrack,
        }
    }

    pub fn criteria_id(&self) -> u8 {
        match self {
            ExportFilter::MostRecentTrack => 10,
            ExportFilter::BetweenDates(..) => 11,
            ExportFilter::SinceDate(_) => 12,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ExportFilter::MostRecentTrack => json!({ "criteriaId": 10, "value": 1 }),
            ExportFilter::SinceDate(from) => json!({
                "criteriaId": 12,
                "values": [format_timestamp(from)],
            }),
            ExportFilter::BetweenDates(from, to) => json!({
                "criteriaId": 11,
                "values": [format_timestamp(from), format_timestamp(to)],
            }),
        }
    }
}

/// RFC 3339, UTC, second precision.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub device_id: i64,
    /// Empty means "the device's own user".
    pub user_ids: IdList,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub service_types: Vec<ServiceType>,
    pub file_type: String,
    pub ignore_route_ids: IdList,
    pub ignore_waypoint_ids: IdList,
}

impl ExportRequest {
    pub fn new(device_id: i64) -> Self {
        ExportRequest {
            device_id,
            user_ids: IdList::from(device_id),
            from_date: None,
            to_date: None,
            service_types: vec![ServiceType::Tracks],
            file_type: "GPX".to_string(),
            ignore_route_ids: IdList::new(),
            ignore_waypoint_ids: IdList::new(),
        }
    }

    pub fn with_user_ids(mut self, ids: impl Into<IdList>) -> Self {
        self.user_ids = ids.into();
        self
    }

    pub fn with_from_date(mut self, from: DateTime<Utc>) -> Self {
        self.from_date = Some(from);
        self
    }

    pub fn with_to_date(mut self, to: DateTime<Utc>) -> Self {
        self.to_date = Some(to);
        self
    }

    pub fn with_service_types(mut self, types: impl IntoIterator<Item = ServiceType>) -> Self {
        self.service_types.clear();
        for t in types {
            if !self.service_types.contains(&t) {
                self.service_types.push(t);
            }
        }
        self
    }

    pub fn with_file_type(mut self, file_type: &str) -> Self {
        self.file_type = file_type.to_string();
        self
    }

    pub fn with_ignored_routes(mut self, ids: impl Into<IdList>) -> Self {
        self.ignore_route_ids = ids.into();
        self
    }

    pub fn with_ignored_waypoints(mut self, ids: impl Into<IdList>) -> Self {
        self.ignore_waypoint_ids = ids.into();
        self
    }

    pub fn filter(&self) -> ExportFilter {
        ExportFilter::from_dates(self.from_date, self.to_date)
    }

    /// Query parameters for the download endpoint, in a stable order.
    pub fn query(&self) -> Vec<(String, String)> {
        let users = if self.user_ids.is_empty() {
            IdList::from(self.device_id)
        } else {
            self.user_ids.clone()
        };
        let service_types = self
            .service_types
            .iter()
            .map(|t| t.code().to_string())
            .collect::<Vec<_>>()
            .join(",");
        let date = |d: &Option<DateTime<Utc>>| d.as_ref().map(format_timestamp).unwrap_or_default();

        vec![
            ("deviceId".to_string(), self.device_id.to_string()),
            ("visibleUserIds".to_string(), users.to_string()),
            ("serviceTypes".to_string(), service_types),
            ("fileType".to_string(), self.file_type.clone()),
            ("filter".to_string(), self.filter().to_json().to_string()),
            ("fromDate".to_string(), date(&self.from_date)),
            ("toDate".to_string(), date(&self.to_date)),
            (
                "waypointsNotVisibleSyncIds".to_string(),
                self.ignore_waypoint_ids.to_string(),
            ),
            (
                "invisibleRoutesSyncIds".to_string(),
                self.ignore_route_ids.to_string(),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn t1() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 1, 15, 20, 40, 9).unwrap()
    }

    fn t2() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 2, 1, 0, 0, 0).unwrap()
    }

    fn param<'a>(query: &'a [(String, String)], name: &str) -> &'a str {
        query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .unwrap()
    }

    #[test]
    fn no_dates_is_most_recent_track() {
        let filter = ExportFilter::from_dates(None, None);
        assert_eq!(filter, ExportFilter::MostRecentTrack);
        assert_eq!(filter.to_json().to_string(), r#"{"criteriaId":10,"value":1}"#);
    }

    #[test]
    fn from_date_only_is_since_date() {
        let filter = ExportFilter::from_dates(Some(t1()), None);
        assert_eq!(filter.criteria_id(), 12);
        assert_eq!(
            filter.to_json().to_string(),
            r#"{"criteriaId":12,"values":["2014-01-15T20:40:09Z"]}"#
        );
    }

    #[test]
    fn both_dates_is_between_dates() {
        let filter = ExportFilter::from_dates(Some(t1()), Some(t2()));
        assert_eq!(
            filter.to_json().to_string(),
            r#"{"criteriaId":11,"values":["2014-01-15T20:40:09Z","2014-02-01T00:00:00Z"]}"#
        );
    }

    #[test]
    fn to_date_alone_falls_back_to_most_recent_track() {
        assert_eq!(
            ExportFilter::from_dates(None, Some(t2())),
            ExportFilter::MostRecentTrack
        );
    }

    #[test]
    fn single_and_multiple_ids_join_the_same_way() {
        assert_eq!(IdList::from(5_i64).to_string(), "5");
        assert_eq!(IdList::from(vec![5_i64, 9, 5, 2]).to_string(), "5,9,2");
        assert_eq!(IdList::from(&[1_i64, 2][..]).to_string(), "1,2");
        assert_eq!(IdList::new().to_string(), "");
    }

    #[test]
    fn defaults_fill_the_query() {
        let query = ExportRequest::new(77).query();
        assert_eq!(param(&query, "deviceId"), "77");
        assert_eq!(param(&query, "visibleUserIds"), "77");
        assert_eq!(param(&query, "serviceTypes"), "6");
        assert_eq!(param(&query, "fileType"), "GPX");
        assert_eq!(param(&query, "fromDate"), "");
        assert_eq!(param(&query, "toDate"), "");
        assert_eq!(param(&query, "waypointsNotVisibleSyncIds"), "");
        assert_eq!(param(&query, "invisibleRoutesSyncIds"), "");
        assert_eq!(param(&query, "filter"), r#"{"criteriaId":10,"value":1}"#);
    }

    #[test]
    fn customized_query() {
        let query = ExportRequest::new(77)
            .with_user_ids(vec![77_i64, 78])
            .with_from_date(t1())
            .with_service_types([ServiceType::Messages, ServiceType::Navigation])
            .with_file_type("KML")
            .with_ignored_routes(3_i64)
            .with_ignored_waypoints(vec![4_i64, 5])
            .query();

        assert_eq!(param(&query, "visibleUserIds"), "77,78");
        assert_eq!(param(&query, "serviceTypes"), "3,7");
        assert_eq!(param(&query, "fileType"), "KML");
        assert_eq!(param(&query, "fromDate"), "2014-01-15T20:40:09Z");
        assert_eq!(param(&query, "toDate"), "");
        assert_eq!(param(&query, "invisibleRoutesSyncIds"), "3");
        assert_eq!(param(&query, "waypointsNotVisibleSyncIds"), "4,5");
    }

    #[test]
    fn empty_user_ids_default_to_device() {
        let query = ExportRequest::new(12).with_user_ids(Vec::<i64>::new()).query();
        assert_eq!(param(&query, "visibleUserIds"), "12");
    }
}
