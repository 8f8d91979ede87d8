//! Domain records: queue payloads, destinations, credentials and events

pub mod check;
pub mod credentials;
pub mod event;
pub mod notification;
pub mod view;

pub use check::{
    Any, CheckResponse, CheckResult, CloudWatchResponse, DecodeError, HttpResponse,
    ResponsePayload, Target,
};
pub use credentials::{PagerDutyIntegration, SlackBotCredentials, SlackOAuthResponse};
pub use event::{Enrichment, Event, TEST_CHECK_ID};
pub use notification::{Notification, kinds};
pub use view::FullCheckResult;
