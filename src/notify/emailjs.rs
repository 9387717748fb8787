/// EmailJS alert client
///
/// Posts a templated-email request to the EmailJS REST API (or any endpoint
/// speaking the same JSON body). Any 2xx response counts as delivered.
///
/// API Documentation: https://www.emailjs.com/docs/rest-api/send/

use serde::Serialize;
use std::time::Duration;

use crate::config::{NotifyConfig, ENV_RECIPIENT, ENV_SERVICE_ID, ENV_TEMPLATE_ID, ENV_USER_ID};
use crate::model::{LabeledReading, NotifyError};
use crate::notify::Notifier;

// ============================================================================
// Request Body
// ============================================================================

#[derive(Debug, Serialize)]
pub struct EmailRequest<'a> {
    pub service_id: &'a str,
    pub template_id: &'a str,
    pub user_id: &'a str,
    pub template_params: TemplateParams<'a>,
}

/// Variables substituted into the email template.
#[derive(Debug, Serialize)]
pub struct TemplateParams<'a> {
    pub disaster_type: &'a str,
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub severity: &'static str,
    pub score: f64,
    pub to_email: &'a str,
}

/// Builds the request body for an alert.
///
/// Fails with `MissingConfig` naming the first required variable that is
/// not set.
pub fn build_request<'a>(
    config: &'a NotifyConfig,
    alert: &'a LabeledReading,
) -> Result<EmailRequest<'a>, NotifyError> {
    let require = |value: &'a Option<String>, var: &str| {
        value
            .as_deref()
            .ok_or_else(|| NotifyError::MissingConfig(var.to_string()))
    };

    Ok(EmailRequest {
        service_id: require(&config.service_id, ENV_SERVICE_ID)?,
        template_id: require(&config.template_id, ENV_TEMPLATE_ID)?,
        user_id: require(&config.user_id, ENV_USER_ID)?,
        template_params: TemplateParams {
            disaster_type: alert.reading.disaster_label(),
            temperature: alert.reading.temperature,
            humidity: alert.reading.humidity,
            pressure: alert.reading.pressure,
            severity: alert.label.as_str(),
            score: alert.score,
            to_email: require(&config.recipient, ENV_RECIPIENT)?,
        },
    })
}

// ============================================================================
// Client
// ============================================================================

pub struct EmailJsNotifier {
    client: reqwest::blocking::Client,
    config: NotifyConfig,
}

impl EmailJsNotifier {
    pub fn new(config: NotifyConfig) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        Ok(Self { client, config })
    }
}

impl Notifier for EmailJsNotifier {
    fn notify(&self, alert: &LabeledReading) -> Result<(), NotifyError> {
        let body = build_request(&self.config, alert)?;

        let response = self
            .client
            .post(&self.config.endpoint)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_builder() {
                    NotifyError::Serialize(e.to_string())
                } else {
                    NotifyError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(NotifyError::HttpError(response.status().as_u16()));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
