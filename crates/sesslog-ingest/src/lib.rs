// AWS Lambda runtime adapter for session-event ingestion
//
// Receives one logon/logoff event per invocation (API Gateway proxy or
// direct invoke), validates it, and stores it as one JSON object in S3.
// Bucket and key prefix come from SSM Parameter Store, fetched once at
// cold start.

use aws_config::BehaviorVersion;
use aws_lambda_events::apigw::ApiGatewayProxyResponse;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info};

pub mod event;
mod response;

const DEFAULT_BUCKET_PARAM: &str = "/sesslog/s3-bucket";
const DEFAULT_PREFIX_PARAM: &str = "/sesslog/s3-prefix";

struct IngestState {
    s3: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

/// Lambda runtime entry point
pub async fn run() -> Result<(), Error> {
    init_tracing();

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let ssm = aws_sdk_ssm::Client::new(&config);

    let bucket_param = std::env::var("SESSLOG_BUCKET_PARAM")
        .unwrap_or_else(|_| DEFAULT_BUCKET_PARAM.to_string());
    let prefix_param = std::env::var("SESSLOG_PREFIX_PARAM")
        .unwrap_or_else(|_| DEFAULT_PREFIX_PARAM.to_string());

    let bucket = get_parameter(&ssm, &bucket_param).await?;
    let prefix = get_parameter(&ssm, &prefix_param).await?;
    info!(bucket = %bucket, prefix = %prefix, "ingest configuration loaded");

    let state = Arc::new(IngestState {
        s3: aws_sdk_s3::Client::new(&config),
        bucket,
        prefix,
    });

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let state = state.clone();
        async move { handle_event(event, state).await }
    }))
    .await
}

async fn handle_event(
    lambda_event: LambdaEvent<Value>,
    state: Arc<IngestState>,
) -> Result<ApiGatewayProxyResponse, Error> {
    let (payload, _context) = lambda_event.into_parts();

    let session_event = match event::validate(event::extract_payload(&payload)) {
        Ok(session_event) => session_event,
        Err(err) => {
            info!(error = %err, "rejected event");
            return Ok(response::json(400, err.to_body()));
        }
    };

    let key = event::object_key(&state.prefix, &session_event);
    let record = json!({
        "userid": session_event.userid,
        "type": session_event.kind.as_str(),
        "timestamp": session_event.raw_timestamp,
    });

    let body = serde_json::to_vec(&record)?;
    match state
        .s3
        .put_object()
        .bucket(&state.bucket)
        .key(&key)
        .body(ByteStream::from(body))
        .content_type("application/json")
        .send()
        .await
    {
        Ok(_) => {
            info!(key = %key, "stored session event");
            Ok(response::json(
                200,
                json!({
                    "bucket": state.bucket,
                    "key": key,
                    "date": session_event.base_date_str(),
                }),
            ))
        }
        Err(err) => {
            error!(error = %DisplayErrorContext(&err), key = %key, "failed to store session event");
            Ok(response::json(
                500,
                json!({
                    "message": "failed to put object to S3",
                }),
            ))
        }
    }
}

async fn get_parameter(ssm: &aws_sdk_ssm::Client, name: &str) -> Result<String, Error> {
    let response = ssm
        .get_parameter()
        .name(name)
        .send()
        .await
        .map_err(|err| Error::from(format!("failed to read SSM parameter {}: {}", name, err)))?;

    response
        .parameter()
        .and_then(|parameter| parameter.value())
        .map(str::to_string)
        .ok_or_else(|| Error::from(format!("SSM parameter {} has no value", name)))
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    // Idempotent across warm invocations
    let _ = tracing::subscriber::set_global_default(registry.with(fmt::layer()));
}
