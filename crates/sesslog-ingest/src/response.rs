// API Gateway proxy response builder

use aws_lambda_events::apigw::ApiGatewayProxyResponse;
use aws_lambda_events::encodings::Body;
use aws_lambda_events::http::{header::CONTENT_TYPE, HeaderValue};
use serde_json::Value;

pub(crate) fn json(status_code: i64, body: Value) -> ApiGatewayProxyResponse {
    let mut response = ApiGatewayProxyResponse {
        status_code,
        headers: Default::default(),
        multi_value_headers: Default::default(),
        body: Some(Body::Text(body.to_string())),
        is_base64_encoded: false,
    };
    response
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_a_json_response() {
        let response = json(400, json!({"message": "invalid type"}));
        assert_eq!(response.status_code, 400);
        match response.body {
            Some(Body::Text(text)) => assert!(text.contains("invalid type")),
            other => panic!("unexpected body: {:?}", other),
        }
    }
}
