//! DNS records

use serde::Deserialize;
use serde_json::{Value, json};

/// A DNS record as stored on a domain.
#[derive(Debug, Clone, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub data: String,
    #[serde(default)]
    pub ttl: Option<u32>,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub updated: Option<String>,
}

/// A record to be created. Type, name and data are required; the priority
/// only applies to MX and SRV records.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub record_type: String,
    pub name: String,
    pub data: String,
    pub ttl: Option<u32>,
    pub priority: Option<u32>,
    pub comment: Option<String>,
}

impl NewRecord {
    pub fn new(
        record_type: impl Into<String>,
        name: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            name: name.into(),
            data: data.into(),
            ttl: None,
            priority: None,
            comment: None,
        }
    }

    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

fn takes_priority(record_type: &str) -> bool {
    record_type == "MX" || record_type == "SRV"
}

// The API rejects TTLs below 300; clamp instead of failing the whole batch.
fn clamp_ttl(ttl: u32) -> u32 {
    ttl.max(300)
}

pub(crate) fn new_record_body(record: &NewRecord) -> Value {
    let mut body = json!({
        "type": record.record_type,
        "name": record.name,
        "data": record.data,
    });
    if takes_priority(&record.record_type) {
        if let Some(priority) = record.priority {
            body["priority"] = json!(priority);
        }
    }
    if let Some(ttl) = record.ttl {
        body["ttl"] = json!(clamp_ttl(ttl));
    }
    if let Some(comment) = &record.comment {
        body["comment"] = json!(comment);
    }
    body
}

pub(crate) fn update_record_body(record: &Record) -> Value {
    let mut body = json!({
        "id": record.id,
        "type": record.record_type,
        "name": record.name,
        "data": record.data,
    });
    if takes_priority(&record.record_type) {
        if let Some(priority) = record.priority {
            body["priority"] = json!(priority);
        }
    }
    if let Some(ttl) = record.ttl {
        body["ttl"] = json!(clamp_ttl(ttl));
    }
    if let Some(comment) = &record.comment {
        body["comment"] = json!(comment);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_body_clamps_low_ttl() {
        let record = NewRecord::new("A", "www.example.com", "203.0.113.7").ttl(60);
        let body = new_record_body(&record);
        assert_eq!(body["ttl"], 300);
        assert!(body.get("priority").is_none());
    }

    #[test]
    fn test_priority_only_for_mx_and_srv() {
        let mx = NewRecord::new("MX", "example.com", "mail.example.com").priority(10);
        assert_eq!(new_record_body(&mx)["priority"], 10);

        let a = NewRecord::new("A", "www.example.com", "203.0.113.7").priority(10);
        assert!(new_record_body(&a).get("priority").is_none());
    }

    #[test]
    fn test_update_record_body_carries_id() {
        let record: Record = serde_json::from_str(
            r#"{
                "id": "A-1234",
                "name": "www.example.com",
                "type": "A",
                "data": "203.0.113.7",
                "ttl": 3600
            }"#,
        )
        .unwrap();
        let body = update_record_body(&record);
        assert_eq!(body["id"], "A-1234");
        assert_eq!(body["ttl"], 3600);
    }
}
