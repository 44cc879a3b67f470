use super::{GatewayError, SalesDataGateway};
use crate::config::credentials::clean_token;
use crate::config::{ApiConfig, Secret};
use crate::workflows::sales::domain::{OrderDetails, OrderId, RawRecord};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, COOKIE, REFERER};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const JSON_ACCEPT: &str = "application/json";
const TIMESHEET_ACCEPT: &str = "application/json, text/javascript, */*; q=0.01";

/// Browser session values the timesheet endpoint authenticates with.
#[derive(Debug, Clone)]
struct SessionCredentials {
    sat_user_id: String,
    laravel_token: Secret,
    xsrf_token: Secret,
    sat_session: Secret,
}

impl SessionCredentials {
    fn cookie_header(&self) -> String {
        format!(
            "sat_user_id={}; laravel_token={}; XSRF-TOKEN={}; sat_session={}",
            self.sat_user_id,
            self.laravel_token.expose(),
            self.xsrf_token.expose(),
            self.sat_session.expose()
        )
    }
}

/// Blocking client for the Solutech sales platform.
pub struct SolutechClient {
    http: Client,
    host: String,
    base_url: String,
    access_token: Secret,
    session: SessionCredentials,
    country_id: u32,
    page_size: u32,
}

impl std::fmt::Debug for SolutechClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SolutechClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SolutechClient {
    pub fn new(config: &ApiConfig) -> Result<Self, GatewayError> {
        let access_token = config
            .access_token
            .as_ref()
            .map(Secret::expose)
            .unwrap_or_default();
        let access_token = clean_token(access_token).map_err(|source| GatewayError::Token {
            name: "ACCESS_TOKEN",
            source,
        })?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            host: config.host.clone(),
            base_url: config.base_url(),
            access_token: Secret::new(access_token),
            session: SessionCredentials {
                sat_user_id: config.sat_user_id.trim().to_string(),
                laravel_token: session_value(config.laravel_token.as_ref()),
                xsrf_token: session_value(config.xsrf_token.as_ref()),
                sat_session: session_value(config.sat_session.as_ref()),
            },
            country_id: config.country_id,
            page_size: config.page_size,
        })
    }

    fn bearer(&self, url: &str) -> RequestBuilder {
        self.http
            .get(url)
            .header(AUTHORIZATION, format!("Bearer {}", self.access_token.expose()))
            .header(ACCEPT, JSON_ACCEPT)
    }

    fn fetch_json(&self, request: RequestBuilder, url: &str) -> Result<Value, GatewayError> {
        let response = request.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.json::<Value>()?)
    }
}

impl SalesDataGateway for SolutechClient {
    fn fetch_orders(&self, order_date: &str) -> Result<Vec<RawRecord>, GatewayError> {
        let url = format!(
            "{}/api/v1/get-v2-orders{}",
            self.base_url,
            orders_query(order_date, self.country_id, self.page_size)
        );
        debug!(%url, "fetching orders");
        let body = self.fetch_json(self.bearer(&url), &url)?;
        records_from(body, "data")
    }

    fn fetch_visits(&self, date_range: &str) -> Result<Vec<RawRecord>, GatewayError> {
        let url = format!("{}/timesheet-list", self.base_url);
        debug!(%url, date_range, "fetching timesheet");
        let request = self
            .http
            .get(&url)
            .header("Host", self.host.as_str())
            .header(REFERER, format!("{}/timesheet", self.base_url))
            .header(ACCEPT, TIMESHEET_ACCEPT)
            .header("sat_user_id", self.session.sat_user_id.as_str())
            .header("laravel_token", self.session.laravel_token.expose())
            .header("XSRF-TOKEN", self.session.xsrf_token.expose())
            .header("sat_session", self.session.sat_session.expose())
            .header(COOKIE, self.session.cookie_header())
            .query(&timesheet_params(date_range, self.page_size));
        let body = self.fetch_json(request, &url)?;
        records_from(body, "data")
    }

    fn fetch_order_details(&self, order_id: &OrderId) -> Result<OrderDetails, GatewayError> {
        let url = format!("{}/api/v1/get-v2-order-details/{}", self.base_url, order_id);
        debug!(%order_id, "fetching order details");
        let body = self.fetch_json(self.bearer(&url), &url)?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Session cookies are copied out of a browser; clean them when they look like tokens and
/// otherwise pass them through trimmed.
fn session_value(value: Option<&Secret>) -> Secret {
    let raw = value.map(Secret::expose).unwrap_or_default();
    Secret::new(clean_token(raw).unwrap_or_else(|_| raw.trim().to_string()))
}

/// Query string for the orders listing. The date is already in the upstream
/// `Mon+Jan+05+2026` form and is sent as-is.
pub fn orders_query(order_date: &str, country_id: u32, page_size: u32) -> String {
    format!(
        "?start_date={order_date}&end_date={order_date}&country_id[]={country_id}\
         &stage=0&page=1&per_page={page_size}&orderWorkflowId=1"
    )
}

/// DataTables-style parameters the timesheet listing expects.
pub fn timesheet_params(date_range: &str, page_size: u32) -> Vec<(&'static str, String)> {
    let fixed: [(&'static str, &str); 29] = [
        ("group_by", ""),
        ("survey_id", ""),
        ("rep_id", ""),
        ("customer_id", ""),
        ("product_category", ""),
        ("product_name", ""),
        ("reportparameter", ""),
        ("distributorid", "0"),
        ("stageid", "1"),
        ("sales_rep_id", ""),
        ("inventorytype", "virtual"),
        ("mtd", "1"),
        ("daterange", date_range),
        ("groupdate", "all"),
        ("relationship", ""),
        ("status", ""),
        ("maincategoryselect", ""),
        ("timesheet_updated", "False"),
        ("search_timesheet", ""),
        ("draw", "1"),
        ("columns[0][data]", "timesheet_id"),
        ("columns[0][name]", "timesheet_id"),
        ("columns[0][searchable]", "True"),
        ("columns[0][orderable]", "True"),
        ("order[0][column]", "0"),
        ("order[0][dir]", "desc"),
        ("start", "0"),
        ("search[value]", ""),
        ("search[regex]", "False"),
    ];

    let mut params: Vec<(&'static str, String)> = fixed
        .into_iter()
        .map(|(key, value)| (key, value.to_string()))
        .collect();
    params.push(("length", page_size.to_string()));
    params
}

/// Pulls the record list out of a response envelope. A missing field is an empty listing;
/// entries that are not objects are skipped.
pub fn records_from(body: Value, field: &'static str) -> Result<Vec<RawRecord>, GatewayError> {
    let items = match body {
        Value::Object(mut envelope) => envelope.remove(field),
        _ => None,
    };

    let items = match items {
        None | Some(Value::Null) => {
            warn!(field, "response envelope has no records");
            return Ok(Vec::new());
        }
        Some(Value::Array(items)) => items,
        Some(_) => return Err(GatewayError::MissingData(field)),
    };

    let total = items.len();
    let records: Vec<RawRecord> = items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect();
    if records.len() < total {
        warn!(field, skipped = total - records.len(), "skipped non-object records");
    }
    Ok(records)
}
