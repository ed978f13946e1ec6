// Event shapes accepted at the ingress boundary (spec.md §6): an S3 event
// envelope, or a direct-invocation payload with the same identifiers
// spelled out explicitly. Grounded on the teacher's `HttpRequestEvent`
// (`otlp2parquet-lambda/src/response.rs`): an untagged enum so
// `serde_json` picks the matching shape without a discriminator field.

use aws_lambda_events::s3::S3Event;
use serde::Deserialize;

use crate::error::IngressError;

#[derive(Debug, Clone, Deserialize)]
pub struct DirectInvocation {
    pub iep_id: String,
    pub user_id: String,
    pub child_id: String,
    pub s3_bucket: String,
    pub s3_key: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IngressEvent {
    S3(Box<S3Event>),
    Direct(Box<DirectInvocation>),
}

/// One upload reference pulled out of whichever event shape arrived: a
/// bucket/key pair, plus the identifiers when the event already carried
/// them (direct invocation skips key-path derivation entirely).
pub struct RawUpload {
    pub bucket: String,
    pub key: String,
    pub identifiers: Option<(String, String, String)>,
}

pub fn parse_ingress_event(raw: &serde_json::Value) -> Result<Vec<RawUpload>, IngressError> {
    let event: IngressEvent =
        serde_json::from_value(raw.clone()).map_err(IngressError::UnrecognizedEvent)?;

    let uploads = match event {
        IngressEvent::S3(s3_event) => s3_event
            .records
            .into_iter()
            .filter_map(|record| {
                let bucket = record.s3.bucket.name?;
                let key = record.s3.object.key?;
                Some(RawUpload { bucket, key, identifiers: None })
            })
            .collect(),
        IngressEvent::Direct(direct) => vec![RawUpload {
            bucket: direct.s3_bucket,
            key: direct.s3_key,
            identifiers: Some((direct.user_id, direct.child_id, direct.iep_id)),
        }],
    };

    Ok(uploads)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_direct_invocation_shape() {
        let raw = serde_json::json!({
            "iep_id": "iep-1",
            "user_id": "user-1",
            "child_id": "child-1",
            "s3_bucket": "uploads",
            "s3_key": "user-1/child-1/iep-1/scan.pdf",
        });
        let uploads = parse_ingress_event(&raw).unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].bucket, "uploads");
        assert_eq!(
            uploads[0].identifiers,
            Some(("user-1".to_string(), "child-1".to_string(), "iep-1".to_string()))
        );
    }

    #[test]
    fn parses_s3_event_shape() {
        let raw = serde_json::json!({
            "Records": [{
                "eventVersion": "2.1",
                "eventSource": "aws:s3",
                "awsRegion": "us-east-1",
                "eventTime": "2024-01-01T00:00:00.000Z",
                "eventName": "ObjectCreated:Put",
                "userIdentity": { "principalId": "AWS:EXAMPLE" },
                "requestParameters": { "sourceIPAddress": "127.0.0.1" },
                "responseElements": {
                    "x-amz-request-id": "EXAMPLE123",
                    "x-amz-id-2": "EXAMPLE456"
                },
                "s3": {
                    "s3SchemaVersion": "1.0",
                    "configurationId": "testConfigRule",
                    "bucket": { "name": "uploads", "ownerIdentity": { "principalId": "EXAMPLE" }, "arn": "arn:aws:s3:::uploads" },
                    "object": { "key": "user-1/child-1/iep-1/scan.pdf", "size": 1024, "sequencer": "0A1B2C3D4E5F6G7H8I" }
                }
            }]
        });
        let uploads = parse_ingress_event(&raw).unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].bucket, "uploads");
        assert_eq!(uploads[0].key, "user-1/child-1/iep-1/scan.pdf");
        assert!(uploads[0].identifiers.is_none());
    }

    #[test]
    fn rejects_unrecognized_shape() {
        let raw = serde_json::json!({ "nonsense": true });
        assert!(parse_ingress_event(&raw).is_err());
    }
}
