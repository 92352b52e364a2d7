use super::pipeline::RawResponse;
use super::{
    AZURE_ASYNC_OPERATION_HEADER, LOCATION_HEADER, OPERATION_LOCATION_HEADER,
    REQUEST_CHARGE_HEADER,
};
use crate::common::{ClientError, ClientResult};
use crate::model::{ErrorDetail, OperationStatus, Page, PageMetadata, StatusEnvelope};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::marker::PhantomData;

/// Turns one listing response into a [`Page`].
pub trait PageParser<T>: Send + Sync {
    fn parse_page(&self, response: &RawResponse) -> ClientResult<Page<T>>;
}

/// Turns one status response into a [`StatusEnvelope`].
pub trait StatusParser: Send + Sync {
    fn parse_status(&self, response: &RawResponse) -> ClientResult<StatusEnvelope>;
}

/// Parses the common `{"value": [...], "nextLink": "..."}` listing shape.
///
/// Field names are configurable; dotted names (`data.items`) walk nested
/// objects. A bare JSON array body is read as a single final page.
pub struct JsonPageParser<T> {
    item_field: String,
    link_field: String,
    token_header: Option<String>,
    count_fields: Vec<String>,
    _items: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for JsonPageParser<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonPageParser")
            .field("item_field", &self.item_field)
            .field("link_field", &self.link_field)
            .field("token_header", &self.token_header)
            .finish()
    }
}

impl<T> Default for JsonPageParser<T> {
    fn default() -> Self {
        Self {
            item_field: "value".to_string(),
            link_field: "nextLink".to_string(),
            token_header: None,
            count_fields: vec!["count".to_string(), "@odata.count".to_string()],
            _items: PhantomData,
        }
    }
}

impl<T> JsonPageParser<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item_field(mut self, field: impl Into<String>) -> Self {
        self.item_field = field.into();
        self
    }

    pub fn with_link_field(mut self, field: impl Into<String>) -> Self {
        self.link_field = field.into();
        self
    }

    /// Read the continuation token from a response header (e.g. `x-ms-continuation`)
    /// instead of the body.
    pub fn with_token_header(mut self, header: impl Into<String>) -> Self {
        self.token_header = Some(header.into());
        self
    }

    pub fn with_count_field(mut self, field: impl Into<String>) -> Self {
        self.count_fields.insert(0, field.into());
        self
    }
}

fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    // literal keys win so "@odata.count" is not split
    if let Some(value) = body.get(path) {
        return Some(value);
    }
    path.split('.')
        .try_fold(body, |current, segment| current.get(segment))
}

impl<T> PageParser<T> for JsonPageParser<T>
where
    T: DeserializeOwned,
{
    fn parse_page(&self, response: &RawResponse) -> ClientResult<Page<T>> {
        let body = response.json()?;

        let metadata = PageMetadata {
            status_code: response.status,
            request_id: response.request_id(),
            request_charge: response
                .header(REQUEST_CHARGE_HEADER)
                .and_then(|charge| charge.parse::<f64>().ok()),
        };

        let (raw_items, body_token, total_count) = match &body {
            Value::Array(_) => (body.clone(), None, None),
            Value::Null => (Value::Array(Vec::new()), None, None),
            _ => {
                let raw_items = lookup(&body, &self.item_field)
                    .cloned()
                    .unwrap_or_else(|| Value::Array(Vec::new()));
                let token = lookup(&body, &self.link_field)
                    .and_then(Value::as_str)
                    .map(str::to_string);
                let count = self
                    .count_fields
                    .iter()
                    .find_map(|field| lookup(&body, field).and_then(Value::as_u64));
                (raw_items, token, count)
            }
        };

        if !raw_items.is_array() {
            return Err(ClientError::Deserialization(format!(
                "Expected '{}' to be an array in page from {}",
                self.item_field, response.url
            )));
        }
        let items: Vec<T> = serde_json::from_value(raw_items)?;

        let token = match &self.token_header {
            Some(header) => response.header(header).map(str::to_string),
            None => body_token,
        };

        Ok(Page::new(items, token)
            .with_total_count(total_count)
            .with_metadata(metadata))
    }
}

/// Reads Azure status monitors and resource responses.
///
/// Status comes from `status` or `properties.provisioningState`. Without
/// either, a 202 is in progress, as is a 201 that names a status monitor;
/// any other success is a finished operation carrying the body.
#[derive(Debug, Clone, Default)]
pub struct AzureStatusParser;

impl AzureStatusParser {
    pub fn new() -> Self {
        Self
    }
}

impl StatusParser for AzureStatusParser {
    fn parse_status(&self, response: &RawResponse) -> ClientResult<StatusEnvelope> {
        // status monitors occasionally answer with text/plain; treat as no body
        let body = response.json().unwrap_or(Value::Null);

        let monitor = response
            .header(OPERATION_LOCATION_HEADER)
            .or_else(|| response.header(AZURE_ASYNC_OPERATION_HEADER));
        let location = response.header(LOCATION_HEADER);

        let monitor_status = body.get("status").and_then(Value::as_str);
        let reported = monitor_status.or_else(|| {
            body.pointer("/properties/provisioningState")
                .and_then(Value::as_str)
        });

        let status = match reported {
            Some(raw) => OperationStatus::parse(raw),
            None if response.status == 202 => OperationStatus::InProgress,
            None if response.status == 201 && monitor.is_some() => OperationStatus::InProgress,
            None => OperationStatus::Succeeded,
        };

        let mut envelope = StatusEnvelope::new(status);

        // a resource body carries its own id, not the operation's
        if monitor_status.is_some() {
            if let Some(id) = body.get("id").and_then(Value::as_str) {
                envelope = envelope.with_operation_id(id);
            }
        }

        if body.get("error").is_some() {
            if let Some(error) = ErrorDetail::from_json(&body) {
                envelope = envelope.with_error(error);
            }
        }

        match (monitor, location) {
            (Some(monitor), location) => {
                envelope = envelope.with_poll_url(monitor);
                if let Some(location) = location {
                    envelope = envelope.with_resource_location(location);
                }
            }
            (None, Some(location)) => envelope = envelope.with_poll_url(location),
            (None, None) => {}
        }

        if let Some(resource) = body.get("resourceLocation").and_then(Value::as_str) {
            envelope = envelope.with_resource_location(resource);
        }

        let payload = match body.get("result") {
            Some(result) => result.clone(),
            None => body,
        };
        if !payload.is_null() {
            envelope = envelope.with_result(payload);
        }

        if let Some(retry_after) = response.retry_after() {
            envelope = envelope.with_retry_after(retry_after);
        }

        Ok(envelope)
    }
}
