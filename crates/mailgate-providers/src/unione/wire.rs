//! UniOne wire format

use std::collections::HashMap;

use mailgate_core::{Email, email::parse_address};
use serde::{Deserialize, Serialize};

/// Request envelope: UniOne wraps everything in a `message` object.
#[derive(Debug, Serialize)]
pub struct UniOneRequest {
    pub message: UniOneMessage,
}

#[derive(Debug, Serialize)]
pub struct UniOneMessage {
    pub recipients: Vec<UniOneRecipient>,
    pub body: UniOneBody,
    pub subject: String,
    pub from_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct UniOneRecipient {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substitutions: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Default, Serialize)]
pub struct UniOneBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plaintext: Option<String>,
}

/// Response body for both success and error cases.
#[derive(Debug, Deserialize)]
pub struct UniOneResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub emails: Option<Vec<String>>,
    #[serde(default)]
    pub failed_emails: Option<HashMap<String, String>>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}

/// Translate one internal email into UniOne's request shape.
pub fn to_unione_request(email: &Email) -> UniOneRequest {
    let parsed = parse_address(&email.from);

    let recipients = email
        .to
        .iter()
        .map(|recipient| UniOneRecipient {
            email: recipient.clone(),
            substitutions: email
                .substitutions
                .as_ref()
                .and_then(|subs| subs.get(recipient))
                .cloned(),
        })
        .collect();

    UniOneRequest {
        message: UniOneMessage {
            recipients,
            body: UniOneBody {
                html: email.html.clone(),
                plaintext: email.text.clone(),
            },
            subject: email.subject.clone(),
            from_email: parsed.email,
            from_name: parsed.name,
            tags: email
                .tags
                .as_ref()
                .filter(|tags| !tags.is_empty())
                .cloned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_display_name_from_sender() {
        let email = Email {
            from: "Support <support@example.com>".into(),
            to: vec!["user@example.com".into()],
            subject: "hi".into(),
            html: None,
            text: Some("plain".into()),
            tags: None,
            substitutions: None,
        };

        let request = to_unione_request(&email);
        assert_eq!(request.message.from_email, "support@example.com");
        assert_eq!(request.message.from_name.as_deref(), Some("Support"));
        assert_eq!(request.message.body.plaintext.as_deref(), Some("plain"));
        assert!(request.message.body.html.is_none());
    }

    #[test]
    fn attaches_per_recipient_substitutions() {
        let mut vars = serde_json::Map::new();
        vars.insert("name".into(), serde_json::json!("Ada"));
        let mut subs = HashMap::new();
        subs.insert("ada@example.com".to_owned(), vars);

        let email = Email {
            from: "noreply@example.com".into(),
            to: vec!["ada@example.com".into(), "bob@example.com".into()],
            subject: "hi".into(),
            html: Some("<p>Hi %recipient.name%</p>".into()),
            text: None,
            tags: None,
            substitutions: Some(subs),
        };

        let request = to_unione_request(&email);
        assert!(request.message.recipients[0].substitutions.is_some());
        assert!(request.message.recipients[1].substitutions.is_none());
    }
}
