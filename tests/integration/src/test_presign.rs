//! Presigned URL scenarios against the mock dispatcher.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use chrono::{TimeZone, Utc};
    use http::{Method, Request, Response, StatusCode};
    use sigmock_auth::presigned::REQUIRED_PARAMS;
    use sigmock_auth::{RequestDescriptor, StaticCredentialProvider};
    use sigmock_http::{
        HttpTransport, PresignedUrlValidator, ResponderError, string_responder, string_response,
    };

    use crate::{
        OBJECT_PATTERN, OBJECT_URL, active_dispatcher, query_pairs, request, strip_query_param,
        test_credential, test_signer,
    };

    /// Checks the six presign parameters are present and non-empty.
    fn require_presign_params(req: &Request<Bytes>) -> Result<Response<Bytes>, ResponderError> {
        let pairs = query_pairs(&req.uri().to_string());
        for name in REQUIRED_PARAMS {
            if !pairs.iter().any(|(k, v)| k == name && !v.is_empty()) {
                return Ok(string_response(
                    StatusCode::BAD_REQUEST,
                    format!("Missing required parameter: {name}"),
                ));
            }
        }
        Ok(string_response(StatusCode::OK, "mock object content"))
    }

    fn object_descriptor() -> RequestDescriptor {
        RequestDescriptor::new(Method::GET, OBJECT_URL).unwrap()
    }

    #[tokio::test]
    async fn test_should_serve_presigned_get_through_mock() {
        let mock = active_dispatcher();
        mock.register_responder(Method::GET, OBJECT_PATTERN, require_presign_params)
            .unwrap();

        let url = test_signer()
            .presign(&object_descriptor(), Utc::now(), Duration::from_secs(900))
            .unwrap()
            .url;
        assert!(url.contains("X-Amz-Algorithm=AWS4-HMAC-SHA256"));
        assert!(url.contains("X-Amz-Credential="));
        assert!(url.contains("X-Amz-Date="));
        assert!(url.contains("X-Amz-Expires=900"));
        assert!(url.contains("X-Amz-SignedHeaders="));
        assert!(url.contains("X-Amz-Signature="));

        let transport: Arc<dyn HttpTransport> = mock.clone();
        let resp = transport.send(request(Method::GET, &url)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body().as_ref(), b"mock object content");
        assert_eq!(mock.total_call_count(), 1);
        assert_eq!(mock.call_count(&Method::GET, OBJECT_PATTERN), 1);

        mock.deactivate_and_reset();
    }

    #[tokio::test]
    async fn test_should_reject_presigned_url_after_it_expires() {
        let mock = active_dispatcher();
        let provider = Arc::new(StaticCredentialProvider::from(&test_credential()));
        mock.register_responder(
            Method::GET,
            OBJECT_PATTERN,
            PresignedUrlValidator::new(string_responder(StatusCode::OK, "mock object content"))
                .with_credentials(provider),
        )
        .unwrap();

        let url = test_signer()
            .presign(&object_descriptor(), Utc::now(), Duration::from_secs(1))
            .unwrap()
            .url;
        assert!(url.contains("X-Amz-Expires=1&"));

        tokio::time::sleep(Duration::from_secs(2)).await;

        let resp = mock.send(request(Method::GET, &url)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.body().as_ref(), b"Request has expired");
        assert_eq!(mock.total_call_count(), 1);

        mock.deactivate_and_reset();
    }

    #[test]
    fn test_should_report_missing_signature_parameter() {
        let mock = active_dispatcher();
        mock.register_responder(
            Method::GET,
            OBJECT_PATTERN,
            PresignedUrlValidator::new(string_responder(StatusCode::OK, "mock object content")),
        )
        .unwrap();

        let url = test_signer()
            .presign(&object_descriptor(), Utc::now(), Duration::from_secs(900))
            .unwrap()
            .url;
        let unsigned = strip_query_param(&url, "X-Amz-Signature");
        assert!(!unsigned.contains("X-Amz-Signature"));

        let resp = mock.dispatch(&request(Method::GET, &unsigned)).unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            resp.body().as_ref(),
            b"Missing required parameter: X-Amz-Signature"
        );

        let resp = mock
            .dispatch(&request(
                Method::GET,
                &strip_query_param(&url, "X-Amz-Credential"),
            ))
            .unwrap();
        assert_eq!(
            resp.body().as_ref(),
            b"Missing required parameter: X-Amz-Credential"
        );
    }

    #[test]
    fn test_should_keep_response_content_disposition_in_presigned_url() {
        let mock = active_dispatcher();
        mock.register_responder(
            Method::GET,
            OBJECT_PATTERN,
            |req: &Request<Bytes>| -> Result<Response<Bytes>, ResponderError> {
                let pairs = query_pairs(&req.uri().to_string());
                let has_disposition = pairs
                    .iter()
                    .any(|(k, v)| k == "response-content-disposition" && !v.is_empty());
                if has_disposition {
                    Ok(string_response(StatusCode::OK, "mock object content"))
                } else {
                    Ok(string_response(
                        StatusCode::BAD_REQUEST,
                        "Missing content disposition",
                    ))
                }
            },
        )
        .unwrap();

        let descriptor = object_descriptor()
            .with_query_param("response-content-disposition", "attachment; filename=test.txt");
        let url = test_signer()
            .presign(&descriptor, Utc::now(), Duration::from_secs(900))
            .unwrap()
            .url;
        assert!(url.contains("response-content-disposition=attachment%3B%20filename%3Dtest.txt"));

        let resp = mock.dispatch(&request(Method::GET, &url)).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[test]
    fn test_should_presign_byte_identical_urls_for_identical_inputs() {
        let signer = test_signer();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let first = signer
            .presign(&object_descriptor(), now, Duration::from_secs(900))
            .unwrap();
        for _ in 0..10 {
            let again = signer
                .presign(&object_descriptor(), now, Duration::from_secs(900))
                .unwrap();
            assert_eq!(again.url, first.url);
        }
    }

    #[test]
    fn test_should_emit_every_parameter_non_empty() {
        let url = test_signer()
            .presign(&object_descriptor(), Utc::now(), Duration::from_secs(900))
            .unwrap()
            .url;
        let pairs = query_pairs(&url);
        for name in REQUIRED_PARAMS {
            let value = pairs
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str())
                .unwrap_or_else(|| panic!("{name} missing from {url}"));
            assert!(!value.is_empty(), "{name} is empty");
        }

        let signature = &pairs.last().unwrap().1;
        assert_eq!(pairs.last().unwrap().0, "X-Amz-Signature");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_should_change_only_expires_and_signature_with_expiry() {
        let signer = test_signer();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let short = query_pairs(
            &signer
                .presign(&object_descriptor(), now, Duration::from_secs(900))
                .unwrap()
                .url,
        );
        let long = query_pairs(
            &signer
                .presign(&object_descriptor(), now, Duration::from_secs(3600))
                .unwrap()
                .url,
        );

        assert_eq!(short.len(), long.len());
        for ((sk, sv), (lk, lv)) in short.iter().zip(&long) {
            assert_eq!(sk, lk);
            match sk.as_str() {
                "X-Amz-Expires" | "X-Amz-Signature" => assert_ne!(sv, lv, "{sk} should differ"),
                _ => assert_eq!(sv, lv, "{sk} should not differ"),
            }
        }
    }

    #[test]
    fn test_should_change_signature_when_query_is_tampered() {
        let signer = test_signer();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let base = signer
            .presign(&object_descriptor(), now, Duration::from_secs(900))
            .unwrap();
        let extra = signer
            .presign(
                &object_descriptor().with_query_param("versionId", "1"),
                now,
                Duration::from_secs(900),
            )
            .unwrap();
        assert_ne!(base.signature, extra.signature);

        let mock = active_dispatcher();
        let provider = Arc::new(StaticCredentialProvider::from(&test_credential()));
        let clock = Arc::new(sigmock_core::ManualClock::new(now));
        mock.register_responder(
            Method::GET,
            OBJECT_PATTERN,
            PresignedUrlValidator::new(string_responder(StatusCode::OK, "mock object content"))
                .with_clock(clock)
                .with_credentials(provider),
        )
        .unwrap();

        let resp = mock.dispatch(&request(Method::GET, &base.url)).unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let appended = base.url.replacen('?', "?versionId=1&", 1);
        let resp = mock.dispatch(&request(Method::GET, &appended)).unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(resp.body().as_ref(), b"SignatureDoesNotMatch");
    }
}
