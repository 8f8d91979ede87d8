//! JSON rendering of check results
//!
//! `FullCheckResult` is the backend-agnostic body sent to webhooks, attached
//! to PagerDuty incidents and posted to the enrichment service. Response
//! payloads are unwrapped from their `Any` envelopes into typed JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::check::{
    CheckResponse, CheckResult, CloudWatchResponse, DecodeError, HttpResponse, Metric,
    ResponsePayload, Target,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetView {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
}

impl From<&Target> for TargetView {
    fn from(target: &Target) -> Self {
        Self {
            id: target.id.clone(),
            name: target.name.clone(),
            kind: target.r#type.clone(),
            address: target.address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricView {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<jiff::Timestamp>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub unit: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub statistic: String,
}

impl From<&Metric> for MetricView {
    fn from(metric: &Metric) -> Self {
        Self {
            name: metric.name.clone(),
            value: metric.value,
            tags: metric
                .tags
                .iter()
                .map(|t| (t.name.clone(), t.value.clone()))
                .collect(),
            timestamp: metric
                .timestamp
                .as_ref()
                .and_then(|ts| jiff::Timestamp::new(ts.seconds, ts.nanos).ok()),
            unit: metric.unit.clone(),
            statistic: metric.statistic.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseView {
    Http {
        code: i32,
        body: String,
        headers: BTreeMap<String, Vec<String>>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        metrics: Vec<MetricView>,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        host: String,
    },
    Cloudwatch {
        namespace: String,
        metrics: Vec<MetricView>,
    },
}

impl From<&HttpResponse> for ResponseView {
    fn from(response: &HttpResponse) -> Self {
        ResponseView::Http {
            code: response.code,
            body: response.body.clone(),
            headers: response
                .headers
                .iter()
                .map(|h| (h.name.clone(), h.values.clone()))
                .collect(),
            metrics: response.metrics.iter().map(MetricView::from).collect(),
            host: response.host.clone(),
        }
    }
}

impl From<&CloudWatchResponse> for ResponseView {
    fn from(response: &CloudWatchResponse) -> Self {
        ResponseView::Cloudwatch {
            namespace: response.namespace.clone(),
            metrics: response.metrics.iter().map(MetricView::from).collect(),
        }
    }
}

impl From<&ResponsePayload> for ResponseView {
    fn from(payload: &ResponsePayload) -> Self {
        match payload {
            ResponsePayload::Http(http) => http.into(),
            ResponsePayload::CloudWatch(cw) => cw.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResponseView {
    pub target: Option<TargetView>,
    pub response: Option<ResponseView>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    pub passing: bool,
}

impl TryFrom<&CheckResponse> for CheckResponseView {
    type Error = DecodeError;

    fn try_from(response: &CheckResponse) -> Result<Self, Self::Error> {
        let payload = response.response.as_ref().map(|any| any.unpack()).transpose()?;

        Ok(Self {
            target: response.target.as_ref().map(TargetView::from),
            response: payload.as_ref().map(ResponseView::from),
            error: response.error.clone(),
            passing: response.passing,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullCheckResult {
    pub check_id: String,
    pub customer_id: String,
    pub check_name: String,
    pub timestamp: Option<jiff::Timestamp>,
    pub passing: bool,
    pub version: i32,
    pub target: Option<TargetView>,
    pub responses: Vec<CheckResponseView>,
}

impl TryFrom<&CheckResult> for FullCheckResult {
    type Error = DecodeError;

    fn try_from(result: &CheckResult) -> Result<Self, Self::Error> {
        Ok(Self {
            check_id: result.check_id.clone(),
            customer_id: result.customer_id.clone(),
            check_name: result.check_name.clone(),
            timestamp: result.observed_at(),
            passing: result.passing,
            version: result.version,
            target: result.target.as_ref().map(TargetView::from),
            responses: result
                .responses
                .iter()
                .map(CheckResponseView::try_from)
                .collect::<Result<_, _>>()?,
        })
    }
}
