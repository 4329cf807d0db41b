use crate::domain::{IngestError, IngestResult, ObjectLocator};
use serde::Deserialize;

/// One entry of a storage notification: what happened and to which object
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event_type: String,
    pub locator: ObjectLocator,
}

/// Payload of one delivered queue message
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotificationEnvelope {
    pub records: Vec<EventRecord>,
}

impl NotificationEnvelope {
    /// Parse the standard storage event-notification JSON shape:
    /// `{"Records":[{"eventName":..,"s3":{"bucket":{"name":..},"object":{"key":..}}}]}`
    ///
    /// Object keys arrive form-url encoded and are decoded here. Messages
    /// without a `Records` array (e.g. test events) yield an empty envelope.
    pub fn from_json(payload: &[u8]) -> IngestResult<Self> {
        let wire: WireEnvelope = serde_json::from_slice(payload)
            .map_err(|e| IngestError::MalformedEnvelope(e.to_string()))?;

        let records = wire
            .records
            .into_iter()
            .map(|record| {
                Ok(EventRecord {
                    event_type: record.event_name,
                    locator: ObjectLocator {
                        container_name: record.s3.bucket.name,
                        object_key: decode_object_key(&record.s3.object.key)?,
                    },
                })
            })
            .collect::<IngestResult<Vec<_>>>()?;

        Ok(Self { records })
    }
}

#[derive(Deserialize)]
struct WireEnvelope {
    #[serde(rename = "Records", default)]
    records: Vec<WireRecord>,
}

#[derive(Deserialize)]
struct WireRecord {
    #[serde(rename = "eventName")]
    event_name: String,
    s3: WireEntity,
}

#[derive(Deserialize)]
struct WireEntity {
    bucket: WireBucket,
    object: WireObject,
}

#[derive(Deserialize)]
struct WireBucket {
    name: String,
}

#[derive(Deserialize)]
struct WireObject {
    key: String,
}

/// Decode a form-url encoded object key (`+` is a space, `%XX` a byte)
fn decode_object_key(raw: &str) -> IngestResult<String> {
    // urlencoding passes broken escapes through untouched
    let escapes_valid = raw.split('%').skip(1).all(|chunk| {
        chunk.len() >= 2 && chunk.as_bytes()[..2].iter().all(u8::is_ascii_hexdigit)
    });
    if !escapes_valid {
        return Err(IngestError::MalformedEnvelope(format!(
            "invalid percent escape in object key: {}",
            raw
        )));
    }

    urlencoding::decode(&raw.replace('+', " "))
        .map(|key| key.into_owned())
        .map_err(|_| {
            IngestError::MalformedEnvelope(format!("object key is not valid UTF-8: {}", raw))
        })
}
