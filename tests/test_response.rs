use std::thread;

use hellobench::http::response::{Response, ResponseBuilder, ResponseProvider, StatusCode};

const HELLO: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 13\r\n\r\nHello, World!";

#[test]
fn test_status_code_ok() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
}

#[test]
fn test_response_builder_basic() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body("Hello, World!")
        .build();

    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(&response.body[..], b"Hello, World!");
}

#[test]
fn test_response_builder_auto_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .body("This is the body")
        .build();

    assert_eq!(response.header("Content-Length"), Some("16"));
}

#[test]
fn test_response_builder_preserves_custom_content_length() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("content-length", "999")
        .body("test")
        .build();

    // Should keep the custom value and not add a second one
    assert_eq!(response.header("Content-Length"), Some("999"));
    assert_eq!(response.headers.len(), 1);
}

#[test]
fn test_response_builder_header_replaces_case_insensitively() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("X-Mode", "a")
        .header("x-mode", "b")
        .build();

    assert_eq!(response.header("X-MODE"), Some("b"));
    assert_eq!(response.headers.len(), 2); // X-Mode + Content-Length
}

#[test]
fn test_response_encode_keeps_header_order() {
    let response = ResponseBuilder::new(StatusCode::Ok)
        .header("Content-Type", "text/plain")
        .body("ok")
        .build();

    assert_eq!(
        &response.encode()[..],
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nok"
    );
}

#[test]
fn test_response_ok_empty_body() {
    let response = Response::ok("");

    assert_eq!(response.header("Content-Length"), Some("0"));
    assert_eq!(&response.encode()[..], b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");
}

#[test]
fn test_provider_serves_canned_hello() {
    let provider = ResponseProvider::new();

    assert_eq!(&provider.get()[..], HELLO);
    assert_eq!(provider.len(), HELLO.len());
    assert!(!provider.is_empty());
}

#[test]
fn test_provider_is_idempotent() {
    let provider = ResponseProvider::default();
    let first = provider.get();

    for _ in 0..1000 {
        assert_eq!(provider.get(), first);
    }
}

#[test]
fn test_provider_is_identical_across_threads() {
    let provider = ResponseProvider::new();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let provider = provider.clone();
            thread::spawn(move || provider.get())
        })
        .collect();

    for handle in handles {
        assert_eq!(&handle.join().unwrap()[..], HELLO);
    }
}

#[test]
fn test_provider_from_custom_response() {
    let provider = ResponseProvider::from_response(&Response::ok("bye"));

    assert_eq!(
        &provider.get()[..],
        b"HTTP/1.1 200 OK\r\nContent-Length: 3\r\n\r\nbye"
    );
}
