use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::schema::Field;

pub type Timestamp = DateTime<Utc>;

/// RFC 3339 with exactly three fractional digits, e.g. `2024-03-01T10:20:30.000Z`
pub fn format_timestamp(timestamp: &Timestamp) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &Timestamp,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(timestamp))
}

/// One row: field name to arbitrary JSON value, keys kept in insertion order.
pub type Record = Map<String, Value>;

/// The complete persisted form of a table: schema, metadata and rows.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableDocument {
    pub name: String,
    pub fields: Vec<Field>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: Timestamp,
    pub records: Vec<Record>,
}

impl TableDocument {
    pub fn new(name: &str, fields: Vec<Field>) -> Self {
        Self {
            name: name.to_string(),
            fields,
            created_at: Utc::now().trunc_subsecs(3),
            records: vec![],
        }
    }

    pub fn structure(&self) -> TableStructure {
        TableStructure {
            fields: self.fields.clone(),
            created_at: self.created_at,
        }
    }

    pub fn into_record_list(self) -> RecordList {
        RecordList {
            count: self.records.len(),
            fields: self.fields,
            records: self.records,
        }
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TableStructure {
    pub fields: Vec<Field>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub created_at: Timestamp,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecordList {
    pub fields: Vec<Field>,
    pub records: Vec<Record>,
    pub count: usize,
}
