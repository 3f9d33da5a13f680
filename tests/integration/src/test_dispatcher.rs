//! Mock dispatcher lifecycle, precedence, and concurrency.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use http::{Method, Request, Response, StatusCode};
    use regex::Regex;
    use sigmock_http::{
        DispatchError, HttpTransport, MockDispatcher, ResponderError, TransportError,
        error_responder, string_responder, string_response,
    };

    use crate::{OBJECT_URL, active_dispatcher, request};

    const FILE_URL: &str = "https://s3.amazonaws.com/my-bucket/my-file.txt";

    #[tokio::test]
    async fn test_should_serve_simple_get_from_mock() {
        let mock = active_dispatcher();
        mock.register_responder(
            Method::GET,
            FILE_URL,
            string_responder(StatusCode::OK, "This is the content of my-file.txt"),
        )
        .unwrap();

        let resp = mock.send(request(Method::GET, FILE_URL)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body().as_ref(), b"This is the content of my-file.txt");
        assert_eq!(mock.total_call_count(), 1);

        mock.deactivate_and_reset();
        assert_eq!(mock.total_call_count(), 0);
        let result = mock.send(request(Method::GET, FILE_URL)).await;
        assert!(matches!(
            result,
            Err(TransportError::Dispatch(DispatchError::Inactive))
        ));
    }

    #[test]
    fn test_should_invoke_exactly_one_handler_for_duplicate_registrations() {
        let mock = active_dispatcher();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        for hits in [Arc::clone(&first), Arc::clone(&second)] {
            mock.register_responder(
                Method::GET,
                FILE_URL,
                move |_: &Request<Bytes>| -> Result<Response<Bytes>, ResponderError> {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(string_response(StatusCode::OK, ""))
                },
            )
            .unwrap();
        }

        mock.dispatch(&request(Method::GET, FILE_URL)).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(mock.total_call_count(), 1);
    }

    #[test]
    fn test_should_leave_counters_unchanged_on_miss() {
        let mock = active_dispatcher();
        mock.register_responder(Method::GET, FILE_URL, string_responder(StatusCode::OK, ""))
            .unwrap();
        mock.dispatch(&request(Method::GET, FILE_URL)).unwrap();

        let before = mock.call_count_info();
        let result = mock.dispatch(&request(Method::GET, OBJECT_URL));
        assert!(
            matches!(&result, Err(DispatchError::NoResponder { method, url }) if *method == Method::GET && url == OBJECT_URL)
        );
        assert_eq!(
            result.unwrap_err().to_string(),
            format!("no responder found for GET {OBJECT_URL}")
        );
        assert_eq!(mock.total_call_count(), 1);
        assert_eq!(mock.call_count_info(), before);
    }

    #[test]
    fn test_should_prefer_most_recent_of_overlapping_patterns() {
        let mock = active_dispatcher();
        mock.register_responder(Method::GET, FILE_URL, string_responder(StatusCode::OK, "exact"))
            .unwrap();
        mock.register_regex_responder(
            Method::GET,
            Regex::new(r"^https://s3\.amazonaws\.com/my-bucket/").unwrap(),
            string_responder(StatusCode::OK, "bucket"),
        );

        let resp = mock.dispatch(&request(Method::GET, FILE_URL)).unwrap();
        assert_eq!(resp.body().as_ref(), b"bucket");
    }

    #[test]
    fn test_should_propagate_responder_error_verbatim() {
        let mock = active_dispatcher();
        mock.register_responder(Method::GET, FILE_URL, error_responder("simulated outage"))
            .unwrap();

        let err = mock.dispatch(&request(Method::GET, FILE_URL)).unwrap_err();
        assert_eq!(err.to_string(), "simulated outage");
    }

    #[test]
    fn test_should_count_every_call_from_many_threads() {
        let mock = active_dispatcher();
        mock.register_responder(Method::GET, FILE_URL, string_responder(StatusCode::OK, ""))
            .unwrap();

        std::thread::scope(|scope| {
            for i in 0..8 {
                let mock = Arc::clone(&mock);
                scope.spawn(move || {
                    for j in 0..50 {
                        if (i + j) % 10 == 0 {
                            mock.register_responder(
                                Method::PUT,
                                &format!("https://s3.amazonaws.com/my-bucket/{i}-{j}"),
                                string_responder(StatusCode::OK, ""),
                            )
                            .unwrap();
                        }
                        mock.dispatch(&request(Method::GET, FILE_URL)).unwrap();
                    }
                });
            }
        });

        assert_eq!(mock.total_call_count(), 400);
        assert_eq!(mock.call_count(&Method::GET, FILE_URL), 400);
    }

    #[tokio::test]
    async fn test_should_count_concurrent_async_sends() {
        let mock = active_dispatcher();
        mock.register_responder(Method::GET, FILE_URL, string_responder(StatusCode::OK, ""))
            .unwrap();
        let transport: Arc<dyn HttpTransport> = mock.clone();

        let sends = (0..32).map(|_| transport.send(request(Method::GET, FILE_URL)));
        let results = futures::future::join_all(sends).await;
        assert!(results.iter().all(Result::is_ok));
        assert_eq!(mock.total_call_count(), 32);
    }

    #[test]
    fn test_should_keep_independent_instances_isolated() {
        let a = active_dispatcher();
        let b = MockDispatcher::new();
        b.activate();
        a.register_responder(Method::GET, FILE_URL, string_responder(StatusCode::OK, ""))
            .unwrap();

        assert!(a.dispatch(&request(Method::GET, FILE_URL)).is_ok());
        assert!(matches!(
            b.dispatch(&request(Method::GET, FILE_URL)),
            Err(DispatchError::NoResponder { .. })
        ));
        assert_eq!(b.total_call_count(), 0);
    }
}
