use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Loosely typed record as delivered by the upstream API.
pub type RawRecord = Map<String, Value>;

/// Upstream order identifier. The API sends either a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub(crate) fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(raw) if !raw.trim().is_empty() => Some(Self(raw.trim().to_string())),
            Value::Number(number) => Some(Self(number.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OrderId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for OrderId {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

/// A rep's logged field visit at a customer location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisitRecord {
    pub sales_rep: String,
    pub customer_name: String,
    pub erp_code: String,
    pub time_spent: String,
}

/// An order and the value it generated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRecord {
    pub sales_rep: String,
    pub customer_name: String,
    pub customer_code: String,
    pub order_id: Option<OrderId>,
    pub order_value: f64,
}

/// Which lookup supplied the order columns of a reconciled row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    ErpCode,
    CustomerName,
    Unmatched,
}

/// One visit, augmented with the order it reconciled against (if any).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledRecord {
    pub visit: VisitRecord,
    pub order_value: Option<f64>,
    pub customer_code: Option<String>,
    pub order_sales_rep: Option<String>,
    pub order_customer_name: Option<String>,
    pub order_id: Option<OrderId>,
    pub final_customer_name: String,
    pub final_sales_rep: Option<String>,
    pub matched_by: MatchSource,
}

impl ReconciledRecord {
    pub fn value(&self) -> f64 {
        self.order_value.unwrap_or(0.0)
    }
}

/// An order whose customer has no visit record; counted as a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalledRecord {
    pub order: OrderRecord,
    pub customer_called: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalespersonSummary {
    pub rep: String,
    pub customers_visited: usize,
    pub order_value_from_visits: f64,
    pub customers_called: usize,
    pub order_value_from_calls: f64,
}

/// How a rep interacted with a customer. Forms a small join-semilattice:
/// `NoVisit` is the bottom, `VisitedAndCalled` the top, `Visited` and `Called` are incomparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    NoVisit,
    Called,
    Visited,
    VisitedAndCalled,
}

impl Classification {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NoVisit => "No Visit",
            Self::Called => "Called",
            Self::Visited => "Visited",
            Self::VisitedAndCalled => "Visited & Called",
        }
    }

    const fn visited(self) -> bool {
        matches!(self, Self::Visited | Self::VisitedAndCalled)
    }

    const fn called(self) -> bool {
        matches!(self, Self::Called | Self::VisitedAndCalled)
    }

    const fn from_flags(visited: bool, called: bool) -> Self {
        match (visited, called) {
            (true, true) => Self::VisitedAndCalled,
            (true, false) => Self::Visited,
            (false, true) => Self::Called,
            (false, false) => Self::NoVisit,
        }
    }

    /// Least upper bound of the two classifications. Never weaker than either input.
    pub const fn merge(self, other: Self) -> Self {
        Self::from_flags(
            self.visited() || other.visited(),
            self.called() || other.called(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerActivity {
    pub classification: Classification,
    pub time_spent: String,
    pub order_ids: Vec<OrderId>,
}

impl CustomerActivity {
    pub(crate) fn new(classification: Classification) -> Self {
        Self {
            classification,
            time_spent: String::new(),
            order_ids: Vec::new(),
        }
    }
}

/// One product line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_id: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub product_desc: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub sold_qty: f64,
    #[serde(default, deserialize_with = "lenient_number")]
    pub unit_cost: f64,
}

impl OrderLine {
    pub fn line_value(&self) -> f64 {
        self.sold_qty * self.unit_cost
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    #[serde(default)]
    pub entries: Vec<OrderLine>,
}

fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    })
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(numeric_value).unwrap_or(0.0))
}

/// Reads a JSON number or a comma-formatted numeric string; anything else is zero.
pub(crate) fn numeric_value(value: &Value) -> f64 {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.replace(',', "").trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|number| number.is_finite()).unwrap_or(0.0)
}
