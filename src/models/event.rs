//! Delivery-ready events

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::check::{Any, CheckResponse, CheckResult, HttpResponse, Target, Timestamp};

/// Check id carried by synthetic test events
pub const TEST_CHECK_ID: &str = "00002";

/// Artifacts returned by the enrichment service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    #[serde(default)]
    pub image_urls: HashMap<String, String>,
    #[serde(default)]
    pub json_url: String,
}

impl Enrichment {
    pub fn default_image(&self) -> Option<&str> {
        self.image_urls.get("default").map(String::as_str)
    }

    pub fn json_url(&self) -> Option<&str> {
        Some(self.json_url.as_str()).filter(|url| !url.is_empty())
    }
}

/// A check result ready for a sender, built fresh for each message
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub result: CheckResult,
    pub enrichment: Option<Enrichment>,
    /// Synthetic event sent from "send test notification"
    pub test: bool,
}

impl Event {
    pub fn new(result: CheckResult) -> Self {
        Self {
            result,
            enrichment: None,
            test: false,
        }
    }

    pub fn with_enrichment(mut self, enrichment: Enrichment) -> Self {
        self.enrichment = Some(enrichment);
        self
    }

    pub fn json_url(&self) -> Option<&str> {
        self.enrichment.as_ref().and_then(Enrichment::json_url)
    }

    pub fn image_url(&self) -> Option<&str> {
        self.enrichment.as_ref().and_then(Enrichment::default_image)
    }

    /// A failing result with one failing HTTP response, used to verify a destination
    pub fn test_event() -> Self {
        let now = jiff::Timestamp::now();
        let instance = Target {
            name: "test-instance".to_string(),
            r#type: "instance".to_string(),
            id: "i-00000000".to_string(),
            address: "192.0.2.10".to_string(),
        };

        let response = CheckResponse {
            target: Some(instance),
            response: Some(Any::pack_http(&HttpResponse {
                code: 500,
                body: "Internal Server Error".to_string(),
                host: "192.0.2.10".to_string(),
                ..HttpResponse::default()
            })),
            error: String::new(),
            passing: false,
        };

        let result = CheckResult {
            check_id: TEST_CHECK_ID.to_string(),
            customer_id: String::new(),
            timestamp: Some(Timestamp {
                seconds: now.as_second(),
                nanos: now.subsec_nanosecond(),
            }),
            passing: false,
            responses: vec![response],
            target: Some(Target {
                name: "Test Group".to_string(),
                r#type: "sg".to_string(),
                id: "sg-00000000".to_string(),
                address: String::new(),
            }),
            check_name: "Test Check".to_string(),
            version: 1,
        };

        Self {
            result,
            enrichment: None,
            test: true,
        }
    }
}
