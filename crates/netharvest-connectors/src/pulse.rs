//! Pulse KPI adapter
//!
//! Talks to the Pulse JSON API: login for an access token, resolve the
//! running test ids for a (group, service-type) pair, then pull the KPI
//! table per test over the computed query window. Each service kind has
//! its own KPI set and row shape; the VoIP and O365 kinds additionally
//! support per-timestamp trend rows.
//!
//! Rows carry no header line; Pulse jobs supply one through `add_header`.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use serde_json::Value;

use netharvest_core::config::EngineConfig;
use netharvest_core::datasource::PulseConfig;
use netharvest_core::job::{PulseKind, PulseQuery};
use netharvest_core::tabular;

use crate::error::{ConnectorError, Result};
use crate::http::build_client;
use crate::window::Window;

/// Row limit passed to every table query.
const ROW_LIMIT: &str = "100";

/// Stamp layout of trend points in the API response.
const TREND_STAMP_LAYOUT: &str = "%Y-%b-%d_%H:%M";

/// Stamp layout trend rows are written with.
const TREND_ROW_LAYOUT: &str = "%Y-%m-%d %H:%M:%S";

/// Device types the infrastructure kind queries, in output order.
const DEVICE_TYPES: &[&str] = &[
    "server",
    "router",
    "accesspoint",
    "switch",
    "wirelesscontroller",
    "generic",
];

/// Per-kind API identifiers and KPI sets.
struct KindSpec {
    /// Service type name under `/ipm/v1/admin/testTypes`
    type_name: &'static str,
    /// Value fields read from each aggregate row
    metrics: &'static [&'static str],
    /// Trend series names, first one drives the timestamp join
    trend_kpis: &'static [&'static str],
}

fn kind_spec(kind: PulseKind) -> Option<KindSpec> {
    match kind {
        PulseKind::Infrastructure => None,
        PulseKind::Voip => Some(KindSpec {
            type_name: "VoipPulse",
            metrics: &["availPercent", "avgLqmosRx", "avgLqmosTx"],
            trend_kpis: &["availability", "avgLqmosRx", "avgLqmosTx"],
        }),
        PulseKind::Latency => Some(KindSpec {
            type_name: "latency",
            metrics: &["availPercent", "avgavg", "avgbest", "avgworst"],
            trend_kpis: &[],
        }),
        PulseKind::Ping => Some(KindSpec {
            type_name: "ping",
            metrics: &["availPercent", "avgping_results"],
            trend_kpis: &[],
        }),
        PulseKind::Web => Some(KindSpec {
            type_name: "Web",
            metrics: &["availPercent", "avgResponse"],
            trend_kpis: &[],
        }),
        PulseKind::O365Onedrive => Some(KindSpec {
            type_name: "o365AccountOneDrive",
            metrics: &["availPercent", "maxupload_time"],
            trend_kpis: &["availability", "maxupload_time"],
        }),
        PulseKind::O365Outlook => Some(KindSpec {
            type_name: "o365AccountOutlook",
            metrics: &["availPercent", "maxresp_time"],
            trend_kpis: &["availability", "maxresp_time"],
        }),
    }
}

/// Authenticated Pulse API client.
pub struct PulseClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl PulseClient {
    /// Log in and capture the access token.
    pub async fn login(config: &PulseConfig) -> Result<Self> {
        let client = build_client(config.verify_tls)?;
        let base_url = config.base_url();
        let response = client
            .post(format!("{}/ipm/auth/login", base_url))
            .form(&[
                ("emailOrUsername", config.username.as_str()),
                ("password", config.password.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ConnectorError::Auth {
                message: format!("login returned status {}", response.status().as_u16()),
            });
        }
        let body: Value = response.json().await?;
        let token = body
            .get("accessToken")
            .and_then(Value::as_str)
            .ok_or_else(|| ConnectorError::MissingField {
                field: "accessToken".to_string(),
            })?
            .to_string();
        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    async fn get_json(&self, path: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(params)
            .header("ngp-authorization", format!("Access {}", self.token))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ConnectorError::Status {
                status: response.status().as_u16(),
                url,
            });
        }
        Ok(response.json().await?)
    }

    /// Resolve the running tests of one (group, service-type) pair to
    /// (name, id) pairs in API order.
    pub async fn running_tests(
        &self,
        group: &str,
        type_name: &str,
    ) -> Result<Vec<(String, String)>> {
        let query = format!(r#"{{"status":"Running","group":"{}"}}"#, group);
        let types = self
            .get_json("/ipm/v1/admin/testTypes", &[("query", query)])
            .await?;
        let type_id = types
            .as_array()
            .into_iter()
            .flatten()
            .find(|item| item.get("name").and_then(Value::as_str) == Some(type_name))
            .and_then(|item| item.get("_id"))
            .map(render)
            .ok_or_else(|| ConnectorError::TestTypeNotFound {
                group: group.to_string(),
                type_name: type_name.to_string(),
            })?;

        let query = r#"{"status":"Running"}"#.to_string();
        let tests = self
            .get_json("/ipm/v1/admin/tests", &[("query", query)])
            .await?;
        Ok(tests
            .as_array()
            .into_iter()
            .flatten()
            .filter(|item| item.get("type").map(render).as_deref() == Some(type_id.as_str()))
            .filter_map(|item| {
                let name = item.get("name").and_then(Value::as_str)?;
                let id = item.get("_id").map(render)?;
                Some((name.to_string(), id))
            })
            .collect())
    }

    async fn query_table(&self, params: &[(&str, String)]) -> Result<Value> {
        self.get_json("/query/table", params).await
    }
}

/// Run a Pulse query and return separator-delimited lines, no header.
pub async fn fetch(
    pulse: &PulseConfig,
    query: &PulseQuery,
    config: &EngineConfig,
) -> Result<Vec<String>> {
    let window = Window::compute(&query.window, config)?;
    tracing::info!(
        start = %window.datestamp(),
        end = %window.end_datestamp(),
        kind = ?query.kind,
        "running Pulse query"
    );
    let client = PulseClient::login(pulse).await?;
    let separator = config.separator_char();

    let mut rows: Vec<Vec<String>> = Vec::new();
    match kind_spec(query.kind) {
        None => {
            for device_type in DEVICE_TYPES {
                let table = client
                    .query_table(&[
                        ("type", device_type.to_string()),
                        ("start", window.start_epoch().to_string()),
                        ("end", window.end_epoch().to_string()),
                        ("rowLimit", ROW_LIMIT.to_string()),
                    ])
                    .await?;
                rows.extend(flatten_infrastructure(
                    &table,
                    device_type,
                    &query.devices,
                    &window,
                    separator,
                ));
            }
        }
        Some(spec) => {
            let tests = client.running_tests(&query.group, spec.type_name).await?;
            for (test_name, test_id) in tests {
                // Empty list means every running test.
                if !query.tests.is_empty() && !query.tests.contains(&test_name) {
                    continue;
                }
                let mut params = vec![
                    ("test", test_id),
                    ("start", window.start_epoch().to_string()),
                    ("end", window.end_epoch().to_string()),
                    ("rowLimit", ROW_LIMIT.to_string()),
                ];
                if query.trends {
                    params.push(("trends", "true".to_string()));
                }
                let table = client.query_table(&params).await?;
                if query.trends {
                    rows.extend(flatten_trends(
                        &table,
                        &test_name,
                        spec.trend_kpis,
                        &window,
                        separator,
                    ));
                } else {
                    rows.extend(flatten_aggregate(
                        &table,
                        &test_name,
                        spec.metrics,
                        &window,
                        separator,
                    ));
                }
            }
        }
    }

    Ok(tabular::encode_rows(&rows, config.separator)?)
}

/// One aggregate row per reporting agent:
/// `[datestamp, test, agent, metrics.., count, start_ms, end_ms]`.
pub fn flatten_aggregate(
    table: &Value,
    test_name: &str,
    metrics: &[&str],
    window: &Window,
    separator: char,
) -> Vec<Vec<String>> {
    data_items(table)
        .map(|item| {
            let mut row = vec![
                window.datestamp(),
                clean(test_name, separator),
                clean(&render(&item["agent"]["name"]), separator),
            ];
            for metric in metrics {
                row.push(render(&item[*metric]));
            }
            row.push(render(&item["count"]));
            row.push(window.start_epoch().to_string());
            row.push(window.end_epoch().to_string());
            row
        })
        .collect()
}

/// One row per trend timestamp, KPI series joined on the timestamp. The
/// first KPI drives the join; timestamps a later series lacks render as
/// empty fields. Points without a `count` are placeholders and skipped.
pub fn flatten_trends(
    table: &Value,
    test_name: &str,
    kpis: &[&str],
    window: &Window,
    separator: char,
) -> Vec<Vec<String>> {
    let Some((first_kpi, other_kpis)) = kpis.split_first() else {
        return Vec::new();
    };
    let mut rows = Vec::new();
    for item in data_items(table) {
        let agent = clean(&render(&item["agent"]["name"]), separator);
        let driver = trend_series(item, first_kpi);
        let others: Vec<BTreeMap<NaiveDateTime, String>> = other_kpis
            .iter()
            .map(|kpi| trend_series(item, kpi))
            .collect();

        for (stamp, value) in &driver {
            let mut row = vec![
                stamp.format(TREND_ROW_LAYOUT).to_string(),
                clean(test_name, separator),
                agent.clone(),
                value.clone(),
            ];
            for series in &others {
                row.push(series.get(stamp).cloned().unwrap_or_default());
            }
            row.push("1".to_string());
            row.push(window.start_epoch().to_string());
            row.push(window.end_epoch().to_string());
            rows.push(row);
        }
    }
    rows
}

/// One row per infrastructure element of one device type:
/// `[datestamp, deviceType, site, name, green..gray, count, start_ms, end_ms]`.
///
/// `devices` scopes the output: the include list for an element's reported
/// device type must name the element, an absent or empty list admits every
/// device of that type.
pub fn flatten_infrastructure(
    table: &Value,
    device_type: &str,
    devices: &HashMap<String, Vec<String>>,
    window: &Window,
    separator: char,
) -> Vec<Vec<String>> {
    data_items(table)
        .filter_map(|item| {
            let element = &item[device_type];
            let kind = render(&element["deviceType"]);
            let name = render(&element["name"]);
            if let Some(list) = devices.get(&kind) {
                if !list.is_empty() && !list.contains(&name) {
                    return None;
                }
            }
            let site = element["sites"][0]["name"]
                .as_str()
                .unwrap_or("Unknown")
                .to_string();
            let status = &item["status"];
            Some(vec![
                window.datestamp(),
                clean(&kind, separator),
                clean(&site, separator),
                clean(&name, separator),
                render(&status["green"]),
                render(&status["yellow"]),
                render(&status["orange"]),
                render(&status["red"]),
                render(&status["gray"]),
                render(&status["count"]),
                window.start_epoch().to_string(),
                window.end_epoch().to_string(),
            ])
        })
        .collect()
}

fn data_items(table: &Value) -> impl Iterator<Item = &Value> {
    table
        .get("data")
        .and_then(Value::as_array)
        .map(|items| items.iter())
        .unwrap_or_default()
}

/// Extract one KPI's trend points keyed on the parsed timestamp.
fn trend_series(item: &Value, kpi: &str) -> BTreeMap<NaiveDateTime, String> {
    let mut series = BTreeMap::new();
    let points = item["trends"][kpi]["data"].as_array();
    for point in points.into_iter().flatten() {
        // Placeholder points carry no count.
        if point.get("count").is_none() {
            continue;
        }
        let Some(stamp) = point.get("str").and_then(Value::as_str) else {
            continue;
        };
        let Ok(parsed) = NaiveDateTime::parse_from_str(stamp, TREND_STAMP_LAYOUT) else {
            tracing::warn!(kpi, stamp, "unparseable trend stamp, dropping point");
            continue;
        };
        series.insert(parsed, render(&point["value"]));
    }
    series
}

/// Render a JSON scalar to a field: strings verbatim, numbers as written,
/// null empty.
fn render(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Names can carry the pipeline separator; replace it with a space before
/// row assembly.
fn clean(name: &str, separator: char) -> String {
    name.replace(separator, " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone as _;
    use chrono_tz::UTC;
    use netharvest_core::job::WindowSpec;
    use serde_json::json;

    fn window() -> Window {
        let now = UTC.with_ymd_and_hms(2024, 3, 10, 15, 0, 0).unwrap();
        Window::compute_at(now, &WindowSpec::default()).unwrap()
    }

    #[test]
    fn test_flatten_aggregate_voip() {
        let table = json!({
            "data": [
                {
                    "agent": {"name": "npoint-1"},
                    "availPercent": 99.5,
                    "avgLqmosRx": 4.1,
                    "avgLqmosTx": 4.0,
                    "count": 12
                }
            ]
        });
        let rows = flatten_aggregate(
            &table,
            "Branch VoIP",
            &["availPercent", "avgLqmosRx", "avgLqmosTx"],
            &window(),
            '\t',
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "10-03-2024 15:00:00");
        assert_eq!(rows[0][1], "Branch VoIP");
        assert_eq!(rows[0][2], "npoint-1");
        assert_eq!(rows[0][3], "99.5");
        assert_eq!(rows[0][6], "12");
    }

    #[test]
    fn test_aggregate_separator_in_names_replaced() {
        let table = json!({
            "data": [{"agent": {"name": "agent\twith\ttabs"}, "availPercent": 1, "count": 1}]
        });
        let rows = flatten_aggregate(&table, "test\tname", &["availPercent"], &window(), '\t');
        assert_eq!(rows[0][1], "test name");
        assert_eq!(rows[0][2], "agent with tabs");
    }

    #[test]
    fn test_flatten_trends_joins_on_stamp() {
        let table = json!({
            "data": [
                {
                    "agent": {"name": "npoint-1"},
                    "trends": {
                        "availability": {"data": [
                            {"str": "2018-Oct-30_11:09", "value": 100, "count": 3},
                            {"str": "2018-Oct-30_11:10", "value": 98, "count": 3}
                        ]},
                        "maxupload_time": {"data": [
                            {"str": "2018-Oct-30_11:09", "value": 1.25, "count": 3}
                        ]}
                    }
                }
            ]
        });
        let rows = flatten_trends(
            &table,
            "OneDrive EU",
            &["availability", "maxupload_time"],
            &window(),
            '\t',
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "2018-10-30 11:09:00");
        assert_eq!(rows[0][3], "100");
        assert_eq!(rows[0][4], "1.25");
        // Second stamp has no upload sample; the field stays empty.
        assert_eq!(rows[1][0], "2018-10-30 11:10:00");
        assert_eq!(rows[1][3], "98");
        assert_eq!(rows[1][4], "");
    }

    #[test]
    fn test_trend_points_without_count_skipped() {
        let table = json!({
            "data": [
                {
                    "agent": {"name": "npoint-1"},
                    "trends": {
                        "availability": {"data": [
                            {"str": "2018-Oct-30_11:09", "value": 100}
                        ]}
                    }
                }
            ]
        });
        let rows = flatten_trends(&table, "t", &["availability"], &window(), '\t');
        assert!(rows.is_empty());
    }

    #[test]
    fn test_flatten_infrastructure_site_fallback() {
        let table = json!({
            "data": [
                {
                    "server": {"deviceType": "server", "name": "esx-01", "sites": []},
                    "status": {"green": 4, "yellow": 0, "orange": 0, "red": 1, "gray": 0, "count": 5}
                },
                {
                    "server": {
                        "deviceType": "server",
                        "name": "esx-02",
                        "sites": [{"name": "Amsterdam"}]
                    },
                    "status": {"green": 5, "yellow": 0, "orange": 0, "red": 0, "gray": 0, "count": 5}
                }
            ]
        });
        let rows = flatten_infrastructure(&table, "server", &HashMap::new(), &window(), '\t');
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][2], "Unknown");
        assert_eq!(rows[0][3], "esx-01");
        assert_eq!(rows[0][7], "1");
        assert_eq!(rows[1][2], "Amsterdam");
    }

    fn server_pair() -> Value {
        json!({
            "data": [
                {
                    "server": {"deviceType": "server", "name": "esx-01", "sites": []},
                    "status": {"green": 4, "yellow": 0, "orange": 0, "red": 1, "gray": 0, "count": 5}
                },
                {
                    "server": {"deviceType": "server", "name": "esx-02", "sites": []},
                    "status": {"green": 5, "yellow": 0, "orange": 0, "red": 0, "gray": 0, "count": 5}
                }
            ]
        })
    }

    #[test]
    fn test_infrastructure_device_list_scopes_output() {
        let mut devices = HashMap::new();
        devices.insert("server".to_string(), vec!["esx-02".to_string()]);
        let rows = flatten_infrastructure(&server_pair(), "server", &devices, &window(), '\t');
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][3], "esx-02");
    }

    #[test]
    fn test_infrastructure_empty_device_list_admits_all() {
        let mut devices = HashMap::new();
        devices.insert("server".to_string(), Vec::new());
        let rows = flatten_infrastructure(&server_pair(), "server", &devices, &window(), '\t');
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_infrastructure_list_for_other_type_ignored() {
        let mut devices = HashMap::new();
        devices.insert("router".to_string(), vec!["edge-01".to_string()]);
        let rows = flatten_infrastructure(&server_pair(), "server", &devices, &window(), '\t');
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_missing_data_array_is_empty() {
        let table = json!({"error": "no results"});
        assert!(flatten_aggregate(&table, "t", &["availPercent"], &window(), '\t').is_empty());
        assert!(flatten_infrastructure(&table, "server", &HashMap::new(), &window(), '\t').is_empty());
    }
}
