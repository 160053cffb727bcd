// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    bad_request = { ErrorCode::BadRequest, 400, "BAD_REQUEST" },
    upstream = { ErrorCode::UpstreamError, 502, "UPSTREAM_ERROR" },
    internal = { ErrorCode::Internal, 500, "INTERNAL" },
)]
fn status_and_code(code: ErrorCode, status: u16, name: &str) {
    assert_eq!(code.http_status(), status);
    assert_eq!(code.as_str(), name);
    assert_eq!(code.to_string(), name);
}

#[test]
fn http_response_carries_envelope() -> anyhow::Result<()> {
    let resp = ErrorCode::UpstreamError.to_http_response("sts down");
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let json = serde_json::to_value(ErrorCode::UpstreamError.to_error_body("sts down"))?;
    assert_eq!(json, serde_json::json!({ "code": "UPSTREAM_ERROR", "message": "sts down" }));
    Ok(())
}
