//! Message content shared by the email, Slack and PagerDuty senders

use crate::models::check::{CheckResponse, ResponsePayload, TARGET_DB_INSTANCE, TARGET_EXTERNAL_HOST};
use crate::models::{CheckResult, Event, Notification};
use crate::services::notifications::NotifyError;

/// Refuses failing results that carry no failing response; a notification
/// built from one would have nothing to show.
pub fn ensure_consistent(result: &CheckResult) -> Result<(), NotifyError> {
    if !result.passing && result.failing_count() == 0 {
        return Err(NotifyError::InconsistentData {
            check_id: result.check_id.clone(),
        });
    }
    Ok(())
}

pub fn state_label(result: &CheckResult) -> &'static str {
    if result.passing { "passing" } else { "failing" }
}

/// Email template for an event.
///
/// `check-pass` / `check-fail`, specialised by target type (`-rds`, `-url`);
/// other targets use the `-json` variant when enrichment produced a JSON link.
pub fn template_name(event: &Event) -> String {
    let base = if event.result.passing {
        "check-pass"
    } else {
        "check-fail"
    };

    match event.result.target_type() {
        TARGET_DB_INSTANCE => format!("{base}-rds"),
        TARGET_EXTERNAL_HOST => format!("{base}-url"),
        _ if event.json_url().is_some() => format!("{base}-json"),
        _ => base.to_string(),
    }
}

/// One-line headline, e.g. `homepage is failing (1 of 2 responses failing)`
pub fn headline(event: &Event) -> String {
    let result = &event.result;
    let prefix = if event.test { "[TEST] " } else { "" };
    let name = if result.check_name.is_empty() {
        result.check_id.as_str()
    } else {
        result.check_name.as_str()
    };

    if result.passing {
        format!("{prefix}{name} is passing")
    } else {
        format!(
            "{prefix}{name} is failing ({} of {} responses failing)",
            result.failing_count(),
            result.responses.len()
        )
    }
}

/// Short human-readable description of one response
pub fn describe_response(response: &CheckResponse) -> String {
    let target = response
        .target
        .as_ref()
        .map(|t| t.display_name().to_string())
        .unwrap_or_else(|| "unknown target".to_string());

    if !response.error.is_empty() {
        return format!("{target}: {}", response.error);
    }

    match response.response.as_ref().map(|any| any.unpack()) {
        Some(Ok(ResponsePayload::Http(http))) => format!("{target}: HTTP {}", http.code),
        Some(Ok(ResponsePayload::CloudWatch(cw))) => {
            format!("{target}: {} ({} metrics)", cw.namespace, cw.metrics.len())
        }
        _ => target,
    }
}

/// Customer owning the destination; the result's customer when the
/// notification row has none
pub fn customer_id<'a>(notification: &'a Notification, event: &'a Event) -> &'a str {
    if notification.customer_id.is_empty() {
        &event.result.customer_id
    } else {
        &notification.customer_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::check::fixtures::*;
    use crate::models::{Enrichment, kinds};

    #[test]
    fn test_failing_result_without_failing_responses_is_inconsistent() {
        let result = check_result("check-1", false, vec![http_response("i-1", 200, true)]);
        let err = ensure_consistent(&result).unwrap_err();
        assert!(err.is_inconsistent_data());

        let empty = check_result("check-2", false, Vec::new());
        assert!(ensure_consistent(&empty).is_err());
    }

    #[test]
    fn test_consistent_results_pass() {
        assert!(ensure_consistent(&failing_result("check-1")).is_ok());
        assert!(ensure_consistent(&check_result("check-2", true, Vec::new())).is_ok());
    }

    #[test]
    fn test_template_selection() {
        let mut event = Event::new(failing_result("check-1"));
        assert_eq!(template_name(&event), "check-fail");

        event.result.passing = true;
        assert_eq!(template_name(&event), "check-pass");

        let enriched = event.clone().with_enrichment(Enrichment {
            json_url: "https://shots.example.com/a.json".to_string(),
            ..Enrichment::default()
        });
        assert_eq!(template_name(&enriched), "check-pass-json");

        if let Some(target) = event.result.target.as_mut() {
            target.r#type = TARGET_DB_INSTANCE.to_string();
        }
        assert_eq!(template_name(&event), "check-pass-rds");

        if let Some(target) = event.result.target.as_mut() {
            target.r#type = TARGET_EXTERNAL_HOST.to_string();
        }
        event.result.passing = false;
        assert_eq!(template_name(&event), "check-fail-url");
    }

    #[test]
    fn test_headline() {
        let event = Event::new(failing_result("check-1"));
        assert_eq!(headline(&event), "homepage is failing (1 of 2 responses failing)");

        let test = Event::test_event();
        assert!(headline(&test).starts_with("[TEST] Test Check is failing"));
    }

    #[test]
    fn test_describe_response() {
        assert_eq!(describe_response(&http_response("i-1", 500, false)), "i-1-name: HTTP 500");

        let mut errored = http_response("i-2", 0, false);
        errored.error = "connection refused".to_string();
        assert_eq!(describe_response(&errored), "i-2-name: connection refused");
    }

    #[test]
    fn test_customer_falls_back_to_result() {
        let event = Event::new(failing_result("check-1"));
        let bare = Notification::new("check-1", kinds::SLACK_BOT, "C1");
        assert_eq!(customer_id(&bare, &event), "customer-1");

        let owned = bare.with_customer("customer-9");
        assert_eq!(customer_id(&owned, &event), "customer-9");
    }
}
