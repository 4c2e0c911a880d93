//! Mailgun-compatible form surface (`/v3`)
//!
//! Accepts `multipart/form-data` or `application/x-www-form-urlencoded`
//! bodies with Mailgun's field names (`from`, `to`, `subject`, `html`,
//! `text`, `o:tag`, `recipient-variables`) and answers with Mailgun's
//! response envelope so existing clients keep working unchanged.

use std::collections::HashMap;

use axum::Json;
use axum::extract::{Form, FromRequest, Multipart, Path, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use mailgate_core::{Email, Substitutions};
use serde_json::json;
use uuid::Uuid;

use super::auth::BasicApiKey;
use crate::state::AppState;

/// `POST /v3/{domain}/messages`
pub async fn send_message(
    State(state): State<AppState>,
    Path(domain): Path<String>,
    auth: BasicApiKey,
    request: Request,
) -> Response {
    tracing::info!(%domain, "received message request");

    let pairs = match read_form_pairs(request).await {
        Ok(pairs) => pairs,
        Err(response) => return response,
    };

    let form = MailgunForm::from_pairs(pairs);

    if form.from.is_empty() || form.to.is_empty() || form.subject.is_empty() {
        tracing::warn!(
            has_from = !form.from.is_empty(),
            has_to = !form.to.is_empty(),
            has_subject = !form.subject.is_empty(),
            "missing required fields"
        );
        return message_error(
            StatusCode::BAD_REQUEST,
            "Missing required fields: from, to, subject",
        );
    }

    tracing::info!(
        from = %form.from,
        to_count = form.to.len(),
        subject = %form.subject,
        "parsed mailgun request"
    );

    let provider_name = &state.config.default_provider;
    let provider = match state.registry.get(provider_name) {
        Ok(provider) => provider,
        Err(_) => {
            tracing::error!(provider = %provider_name, "provider not configured");
            return message_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Provider \"{provider_name}\" not configured"),
            );
        }
    };

    let emails = form.into_emails();
    let results = match provider.send_batch(&emails, &auth.0).await {
        Ok(results) => results,
        Err(e) => {
            tracing::error!(error = %e, "error handling message");
            return message_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error");
        }
    };

    let failed = results.iter().filter(|r| r.is_failed()).count();
    if failed == results.len() {
        tracing::error!(errors = ?results.iter().filter_map(|r| r.error.as_deref()).collect::<Vec<_>>(), "all emails failed to send");
        return message_error(StatusCode::INTERNAL_SERVER_ERROR, "Failed to send emails");
    }
    if failed > 0 {
        tracing::warn!(failed, total = results.len(), "some emails failed");
    }

    let message_id = results
        .first()
        .map(|r| r.id.clone())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let response = json!({
        "id": format!("<{message_id}@{domain}>"),
        "message": "Queued. Thank you.",
    });
    tracing::info!(id = %response["id"], email_count = results.len(), "message queued");

    Json(response).into_response()
}

/// Flatten either supported body encoding into name/value pairs, keeping
/// repeated fields.
async fn read_form_pairs(request: Request) -> Result<Vec<(String, String)>, Response> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_owned();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|_| message_error(StatusCode::BAD_REQUEST, "Invalid form data"))?;

        let mut pairs = Vec::new();
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().unwrap_or_default().to_owned();
            if let Ok(value) = field.text().await {
                pairs.push((name, value));
            }
        }
        Ok(pairs)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let Form(pairs) = Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(|_| message_error(StatusCode::BAD_REQUEST, "Invalid form data"))?;
        Ok(pairs)
    } else {
        tracing::warn!(%content_type, "unsupported content type");
        Err(message_error(
            StatusCode::BAD_REQUEST,
            "Unsupported Content-Type",
        ))
    }
}

fn message_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "message": message.into() }))).into_response()
}

/// Parsed Mailgun form fields.
#[derive(Debug, Default)]
struct MailgunForm {
    from: String,
    to: Vec<String>,
    subject: String,
    html: Option<String>,
    text: Option<String>,
    tags: Vec<String>,
    recipient_variables: Option<Substitutions>,
}

impl MailgunForm {
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut form = Self::default();

        for (name, value) in pairs {
            match name.as_str() {
                "from" if form.from.is_empty() => form.from = value,
                "to" => form
                    .to
                    .extend(value.split(',').map(str::trim).filter(|v| !v.is_empty()).map(String::from)),
                "subject" if form.subject.is_empty() => form.subject = value,
                "html" if form.html.is_none() => form.html = Some(value),
                "text" if form.text.is_none() => form.text = Some(value),
                "o:tag" => form.tags.push(value),
                "recipient-variables" => {
                    // Invalid JSON is ignored, matching Mailgun's tolerance.
                    form.recipient_variables = serde_json::from_str(&value).ok();
                }
                _ => {}
            }
        }

        form
    }

    /// With recipient variables, fan out one personalized email per
    /// recipient; otherwise one email addressed to all recipients.
    fn into_emails(self) -> Vec<Email> {
        let tags = (!self.tags.is_empty()).then_some(self.tags);

        if let Some(variables) = self
            .recipient_variables
            .as_ref()
            .filter(|vars| !vars.is_empty())
        {
            return self
                .to
                .iter()
                .map(|recipient| {
                    let vars = variables.get(recipient);
                    Email {
                        from: self.from.clone(),
                        to: vec![recipient.clone()],
                        subject: self.subject.clone(),
                        html: self
                            .html
                            .as_deref()
                            .map(|html| substitute_variables(html, vars)),
                        text: self
                            .text
                            .as_deref()
                            .map(|text| substitute_variables(text, vars)),
                        tags: tags.clone(),
                        substitutions: vars.map(|vars| {
                            let mut subs: Substitutions = HashMap::new();
                            subs.insert(recipient.clone(), vars.clone());
                            subs
                        }),
                    }
                })
                .collect();
        }

        vec![Email {
            from: self.from,
            to: self.to,
            subject: self.subject,
            html: self.html,
            text: self.text,
            tags,
            substitutions: None,
        }]
    }
}

/// Replace Mailgun's `%recipient.key%` placeholders.
fn substitute_variables(
    content: &str,
    vars: Option<&serde_json::Map<String, serde_json::Value>>,
) -> String {
    let Some(vars) = vars else {
        return content.to_owned();
    };

    let mut output = content.to_owned();
    for (key, value) in vars {
        let placeholder = format!("%recipient.{key}%");
        let replacement = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        output = output.replace(&placeholder, &replacement);
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn splits_comma_separated_recipients() {
        let form = MailgunForm::from_pairs(pairs(&[
            ("from", "s@example.com"),
            ("to", "a@example.com, b@example.com"),
            ("to", "c@example.com"),
            ("subject", "hi"),
            ("text", "body"),
        ]));

        assert_eq!(form.to, vec!["a@example.com", "b@example.com", "c@example.com"]);
        assert_eq!(form.from, "s@example.com");
    }

    #[test]
    fn collects_repeated_tags() {
        let form = MailgunForm::from_pairs(pairs(&[
            ("from", "s@example.com"),
            ("to", "a@example.com"),
            ("subject", "hi"),
            ("text", "body"),
            ("o:tag", "welcome"),
            ("o:tag", "weekly"),
        ]));

        assert_eq!(form.tags, vec!["welcome", "weekly"]);
        let emails = form.into_emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(
            emails[0].tags.as_deref(),
            Some(["welcome".to_string(), "weekly".to_string()].as_slice())
        );
    }

    #[test]
    fn invalid_recipient_variables_are_ignored() {
        let form = MailgunForm::from_pairs(pairs(&[
            ("from", "s@example.com"),
            ("to", "a@example.com"),
            ("subject", "hi"),
            ("text", "body"),
            ("recipient-variables", "{not json"),
        ]));
        assert!(form.recipient_variables.is_none());
    }

    #[test]
    fn recipient_variables_fan_out_personalized_emails() {
        let variables = json!({
            "a@example.com": {"name": "Ada", "code": 7},
            "b@example.com": {"name": "Bob"}
        })
        .to_string();

        let form = MailgunForm::from_pairs(pairs(&[
            ("from", "s@example.com"),
            ("to", "a@example.com,b@example.com"),
            ("subject", "hi"),
            ("html", "<p>Hello %recipient.name%, code %recipient.code%</p>"),
            ("recipient-variables", &variables),
        ]));

        let emails = form.into_emails();
        assert_eq!(emails.len(), 2);
        assert_eq!(emails[0].to, vec!["a@example.com"]);
        assert_eq!(
            emails[0].html.as_deref(),
            Some("<p>Hello Ada, code 7</p>")
        );
        // Bob has no "code" variable; the placeholder stays.
        assert_eq!(
            emails[1].html.as_deref(),
            Some("<p>Hello Bob, code %recipient.code%</p>")
        );
    }

    #[test]
    fn without_variables_one_email_addresses_everyone() {
        let form = MailgunForm::from_pairs(pairs(&[
            ("from", "s@example.com"),
            ("to", "a@example.com,b@example.com"),
            ("subject", "hi"),
            ("text", "body"),
        ]));

        let emails = form.into_emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to.len(), 2);
        assert!(emails[0].substitutions.is_none());
    }
}
