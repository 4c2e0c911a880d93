//! Resend wire format

use mailgate_core::Email;
use serde::{Deserialize, Serialize};

/// One email in the shape Resend's batch endpoint accepts.
#[derive(Debug, Serialize)]
pub struct ResendEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<ResendTag>>,
}

/// Resend tags are name/value pairs; gateway tags map to `name = "tag"`.
#[derive(Debug, Serialize)]
pub struct ResendTag {
    pub name: String,
    pub value: String,
}

/// Successful batch response body.
#[derive(Debug, Deserialize)]
pub struct BatchResponse {
    pub data: Vec<CreatedMessage>,
}

/// One accepted message inside a batch response.
#[derive(Debug, Deserialize)]
pub struct CreatedMessage {
    pub id: String,
}

/// Error response body.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// Translate one internal email into Resend's shape.
pub fn to_resend_email(email: &Email) -> ResendEmail {
    ResendEmail {
        from: email.from.clone(),
        to: email.to.clone(),
        subject: email.subject.clone(),
        html: email.html.clone(),
        text: email.text.clone(),
        tags: email.tags.as_ref().map(|tags| {
            tags.iter()
                .map(|tag| ResendTag {
                    name: "tag".to_owned(),
                    value: tag.clone(),
                })
                .collect()
        }),
    }
}

/// Translate a chunk of internal emails into a batch request body.
pub fn to_resend_batch(emails: &[Email]) -> Vec<ResendEmail> {
    emails.iter().map(to_resend_email).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email {
            from: "Sender <sender@example.com>".into(),
            to: vec!["a@example.com".into(), "b@example.com".into()],
            subject: "hello".into(),
            html: Some("<p>hi</p>".into()),
            text: None,
            tags: Some(vec!["welcome".into(), "onboarding".into()]),
            substitutions: None,
        }
    }

    #[test]
    fn maps_tags_to_name_value_pairs() {
        let wire = to_resend_email(&email());
        let tags = wire.tags.expect("tags present");
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "tag");
        assert_eq!(tags[0].value, "welcome");
    }

    #[test]
    fn omits_absent_fields_from_json() {
        let mut email = email();
        email.html = None;
        email.tags = None;
        let json = serde_json::to_value(to_resend_email(&email)).unwrap();
        assert!(json.get("html").is_none());
        assert!(json.get("tags").is_none());
        assert_eq!(json["from"], "Sender <sender@example.com>");
    }
}
