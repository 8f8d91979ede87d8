//! Check result records as they travel on the queue
//!
//! Messages carry a base64 encoded protobuf `CheckResult`. Per-target
//! responses wrap their typed payload in an `Any`, resolved by the last
//! segment of its type URL.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use prost::Message;
use thiserror::Error;

pub const HTTP_RESPONSE_TYPE: &str = "HttpResponse";
pub const CLOUDWATCH_RESPONSE_TYPE: &str = "CloudWatchResponse";
const TYPE_URL_PREFIX: &str = "type.googleapis.com/checkrelay.";

/// Target type of database instances; selects the RDS email templates
pub const TARGET_DB_INSTANCE: &str = "dbinstance";
/// Target type of externally monitored URLs
pub const TARGET_EXTERNAL_HOST: &str = "external_host";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message has no body")]
    MissingBody,

    #[error("invalid base64 body: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid check result record: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("unknown response payload type '{0}'")]
    UnknownPayload(String),
}

#[derive(Clone, PartialEq, Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct Target {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub r#type: String,
    #[prost(string, tag = "3")]
    pub id: String,
    #[prost(string, tag = "4")]
    pub address: String,
}

impl Target {
    /// Display name, falling back to the id for unnamed targets
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.id } else { &self.name }
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct Any {
    #[prost(string, tag = "1")]
    pub type_url: String,
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Header {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, repeated, tag = "2")]
    pub values: Vec<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Tag {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Metric {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(double, tag = "2")]
    pub value: f64,
    #[prost(message, repeated, tag = "3")]
    pub tags: Vec<Tag>,
    #[prost(message, optional, tag = "4")]
    pub timestamp: Option<Timestamp>,
    #[prost(string, tag = "5")]
    pub unit: String,
    #[prost(string, tag = "6")]
    pub statistic: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct HttpResponse {
    #[prost(int32, tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub body: String,
    #[prost(message, repeated, tag = "3")]
    pub headers: Vec<Header>,
    #[prost(message, repeated, tag = "4")]
    pub metrics: Vec<Metric>,
    #[prost(string, tag = "5")]
    pub host: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct CloudWatchResponse {
    #[prost(string, tag = "1")]
    pub namespace: String,
    #[prost(message, repeated, tag = "2")]
    pub metrics: Vec<Metric>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CheckResponse {
    #[prost(message, optional, tag = "1")]
    pub target: Option<Target>,
    #[prost(message, optional, tag = "2")]
    pub response: Option<Any>,
    #[prost(string, tag = "3")]
    pub error: String,
    #[prost(bool, tag = "4")]
    pub passing: bool,
}

#[derive(Clone, PartialEq, Message)]
pub struct CheckResult {
    #[prost(string, tag = "1")]
    pub check_id: String,
    #[prost(string, tag = "2")]
    pub customer_id: String,
    #[prost(message, optional, tag = "3")]
    pub timestamp: Option<Timestamp>,
    #[prost(bool, tag = "4")]
    pub passing: bool,
    #[prost(message, repeated, tag = "5")]
    pub responses: Vec<CheckResponse>,
    #[prost(message, optional, tag = "6")]
    pub target: Option<Target>,
    #[prost(string, tag = "7")]
    pub check_name: String,
    #[prost(int32, tag = "8")]
    pub version: i32,
}

/// A response payload unwrapped from its `Any` envelope
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    Http(HttpResponse),
    CloudWatch(CloudWatchResponse),
}

impl Any {
    pub fn pack_http(response: &HttpResponse) -> Self {
        Self {
            type_url: format!("{TYPE_URL_PREFIX}{HTTP_RESPONSE_TYPE}"),
            value: response.encode_to_vec(),
        }
    }

    pub fn pack_cloudwatch(response: &CloudWatchResponse) -> Self {
        Self {
            type_url: format!("{TYPE_URL_PREFIX}{CLOUDWATCH_RESPONSE_TYPE}"),
            value: response.encode_to_vec(),
        }
    }

    /// Short type name: `type.googleapis.com/pkg.HttpResponse` -> `HttpResponse`
    pub fn type_name(&self) -> &str {
        let last = self.type_url.rsplit('/').next().unwrap_or_default();
        last.rsplit('.').next().unwrap_or(last)
    }

    pub fn unpack(&self) -> Result<ResponsePayload, DecodeError> {
        match self.type_name() {
            HTTP_RESPONSE_TYPE => Ok(ResponsePayload::Http(HttpResponse::decode(
                self.value.as_slice(),
            )?)),
            CLOUDWATCH_RESPONSE_TYPE => Ok(ResponsePayload::CloudWatch(
                CloudWatchResponse::decode(self.value.as_slice())?,
            )),
            _ => Err(DecodeError::UnknownPayload(self.type_url.clone())),
        }
    }
}

impl CheckResult {
    /// Decodes a queue message body: base64 text wrapping a protobuf record.
    ///
    /// Every response payload must unpack too, so a record no sender could
    /// render is rejected here rather than at delivery time.
    pub fn from_message_body(body: &str) -> Result<Self, DecodeError> {
        let bytes = BASE64.decode(body.trim())?;
        let result = Self::decode(bytes.as_slice())?;
        for any in result.responses.iter().filter_map(|r| r.response.as_ref()) {
            any.unpack()?;
        }
        Ok(result)
    }

    pub fn to_message_body(&self) -> String {
        BASE64.encode(self.encode_to_vec())
    }

    pub fn failing_responses(&self) -> impl Iterator<Item = &CheckResponse> {
        self.responses.iter().filter(|r| !r.passing)
    }

    pub fn passing_responses(&self) -> impl Iterator<Item = &CheckResponse> {
        self.responses.iter().filter(|r| r.passing)
    }

    pub fn failing_count(&self) -> usize {
        self.failing_responses().count()
    }

    /// The response shown first in a notification: the first failing one for
    /// a failing result, the first passing one otherwise
    pub fn representative_response(&self) -> Option<&CheckResponse> {
        if self.passing {
            self.passing_responses().next()
        } else {
            self.failing_responses().next()
        }
    }

    pub fn target_type(&self) -> &str {
        self.target.as_ref().map(|t| t.r#type.as_str()).unwrap_or_default()
    }

    pub fn group_id(&self) -> &str {
        self.target.as_ref().map(|t| t.id.as_str()).unwrap_or_default()
    }

    pub fn group_name(&self) -> &str {
        self.target.as_ref().map(Target::display_name).unwrap_or_default()
    }

    pub fn instance_ids(&self) -> Vec<&str> {
        self.responses
            .iter()
            .filter_map(|r| r.target.as_ref())
            .map(|t| t.id.as_str())
            .collect()
    }

    /// Wall-clock time of the check, when the record carries one
    pub fn observed_at(&self) -> Option<jiff::Timestamp> {
        let ts = self.timestamp.as_ref()?;
        jiff::Timestamp::new(ts.seconds, ts.nanos).ok()
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_message_body_round_trip() {
        let result = failing_result("check-1");
        let decoded = CheckResult::from_message_body(&result.to_message_body()).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn test_invalid_base64_is_rejected() {
        let err = CheckResult::from_message_body("@@not base64@@").unwrap_err();
        assert!(matches!(err, DecodeError::Base64(_)));
    }

    #[test]
    fn test_invalid_protobuf_is_rejected() {
        // Valid base64, but a truncated length-delimited field
        let body = BASE64.encode([0x0a, 0x10, 0x61]);
        let err = CheckResult::from_message_body(&body).unwrap_err();
        assert!(matches!(err, DecodeError::Protobuf(_)));
    }

    #[test]
    fn test_unknown_response_payload_rejects_body() {
        let mut result = failing_result("check-1");
        result.responses[1].response = Some(Any {
            type_url: "type.googleapis.com/checkrelay.PingResponse".to_string(),
            value: Vec::new(),
        });

        let err = CheckResult::from_message_body(&result.to_message_body()).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownPayload(_)));
    }

    #[test]
    fn test_corrupt_response_payload_rejects_body() {
        let mut result = failing_result("check-1");
        if let Some(any) = result.responses[0].response.as_mut() {
            any.value = vec![0x0a, 0x10, 0x61];
        }

        let err = CheckResult::from_message_body(&result.to_message_body()).unwrap_err();
        assert!(matches!(err, DecodeError::Protobuf(_)));
    }

    #[test]
    fn test_any_unpacks_by_type_name() {
        let http = HttpResponse {
            code: 503,
            ..HttpResponse::default()
        };
        let payload = Any::pack_http(&http).unpack().unwrap();
        assert_eq!(payload, ResponsePayload::Http(http));

        let foreign = Any {
            type_url: "type.googleapis.com/other.HttpResponse".to_string(),
            value: Vec::new(),
        };
        assert_eq!(foreign.type_name(), "HttpResponse");
        assert!(foreign.unpack().is_ok());
    }

    #[test]
    fn test_unknown_payload_type() {
        let any = Any {
            type_url: "type.googleapis.com/checkrelay.PingResponse".to_string(),
            value: Vec::new(),
        };
        assert!(matches!(any.unpack(), Err(DecodeError::UnknownPayload(url)) if url.ends_with("PingResponse")));
    }

    #[test]
    fn test_response_selection() {
        let result = failing_result("check-1");
        assert_eq!(result.failing_count(), 1);
        assert_eq!(
            result.representative_response().and_then(|r| r.target.as_ref()).map(|t| t.id.as_str()),
            Some("i-1")
        );
        assert_eq!(result.instance_ids(), vec!["i-1", "i-2"]);
        assert_eq!(result.group_name(), "web");
    }

    #[test]
    fn test_group_name_falls_back_to_id() {
        let mut result = failing_result("check-1");
        if let Some(target) = result.target.as_mut() {
            target.name.clear();
        }
        assert_eq!(result.group_name(), "sg-123");
    }

    #[test]
    fn test_observed_at() {
        let result = failing_result("check-1");
        assert_eq!(
            result.observed_at().map(|t| t.as_second()),
            Some(1_700_000_000)
        );
    }
}
