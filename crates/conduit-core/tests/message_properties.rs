use bytes::Bytes;
use conduit_core::{Body, BodyInput, Changes, Context, Encoding, Headers, Message, Request};
use futures_util::StreamExt;
use proptest::prelude::*;

#[test]
fn test_header_set_in_one_case_is_found_in_another() {
    let req = Request::builder("GET", "http://localhost/")
        .header("Content-Type", "text/plain")
        .build()
        .unwrap();
    assert_eq!(req.headers().get("content-type"), Some("text/plain"));
    assert_eq!(req.headers().get("CONTENT-TYPE"), Some("text/plain"));
}

#[test]
fn test_multi_valued_header_projects_to_comma_joined() {
    let headers = Headers::from_pairs([("Accept", vec!["a", "b"])]);
    assert_eq!(headers.single_values().get("accept"), Some("a,b"));
    assert_eq!(
        headers.get_all("accept"),
        Some(&["a".to_string(), "b".to_string()][..])
    );
}

#[tokio::test]
async fn test_body_read_twice_fails_on_second_call() {
    let body = Body::new("hello", None).unwrap();
    let mut stream = body.read().unwrap();
    assert_eq!(stream.next().await.unwrap().unwrap(), Bytes::from("hello"));
    assert!(matches!(body.read(), Err(e) if e.is_invalid_state()));
    assert!(body.is_consumed());
}

#[tokio::test]
async fn test_read_as_string_twice_fails_on_second_call() {
    let req = Request::builder("POST", "http://localhost/")
        .body("hello")
        .build()
        .unwrap();
    assert_eq!(req.read_as_string(None).await.unwrap(), "hello");
    assert!(req.read_as_string(None).await.unwrap_err().is_invalid_state());
}

#[test]
fn test_plain_text_body_gets_length_and_no_type() {
    let msg = Message::new("hello", None, Headers::empty(), Context::new()).unwrap();
    assert_eq!(msg.headers().get("content-length"), Some("5"));
    assert!(!msg.headers().contains("content-type"));
}

#[test]
fn test_charset_is_rewritten_to_match_explicit_encoding() {
    let headers = Headers::from_pairs([("content-type", "text/plain; charset=us-ascii")]);
    let msg = Message::new("hello", Some(Encoding::Latin1), headers, Context::new()).unwrap();
    assert_eq!(
        msg.headers().get("content-type"),
        Some("text/plain; charset=iso-8859-1")
    );
    assert_eq!(msg.encoding().unwrap(), Some(Encoding::Latin1));
}

#[test]
fn test_removing_a_header_leaves_original_untouched() {
    let req = Request::builder("GET", "http://localhost/")
        .header("X", "1")
        .build()
        .unwrap();
    let copy = req.change(Changes::new().remove_header("X")).unwrap();
    assert!(!copy.headers().contains("x"));
    assert_eq!(req.headers().get("x"), Some("1"));
}

#[test]
fn test_change_path_moves_segment_into_handler_path() {
    let req = Request::builder("GET", "http://localhost/static/dir/file.html")
        .handler_path("/static/")
        .url("dir/file.html")
        .build()
        .unwrap();
    let copy = req.change(Changes::new().path("dir")).unwrap();
    assert_eq!(copy.handler_path(), "/static/dir/");
    assert_eq!(copy.url().path(), "file.html");
}

#[tokio::test]
async fn test_streamed_body_is_passed_through_lazily() {
    let chunks = futures_util::stream::iter(vec![
        Ok::<_, std::io::Error>(Bytes::from("hel")),
        Ok(Bytes::from("lo")),
    ]);
    let req = Request::builder("POST", "http://localhost/")
        .body(BodyInput::stream(chunks))
        .build()
        .unwrap();
    assert_eq!(req.content_length().unwrap(), None);
    assert_eq!(req.read_as_string(None).await.unwrap(), "hello");
}

fn segment() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,5}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Valid decompositions construct and recombine to the requested path
    #[test]
    fn prop_decomposition_recombines(
        segs in prop::collection::vec(segment(), 1..5),
        split in 0usize..5,
    ) {
        let split = split.min(segs.len() - 1);
        let path = format!("/{}", segs.join("/"));
        let handler_path = if split == 0 {
            "/".to_string()
        } else {
            format!("/{}/", segs[..split].join("/"))
        };
        let url = segs[split..].join("/");

        let req = Request::builder("GET", format!("http://localhost{path}?q=1"))
            .handler_path(handler_path.clone())
            .url(format!("{url}?q=1"))
            .build()
            .unwrap();
        prop_assert_eq!(format!("{}{}", req.handler_path(), req.url().path()), path);
        prop_assert_eq!(req.url().query(), Some("q=1"));
    }

    /// A url that skips a segment never constructs
    #[test]
    fn prop_gap_between_handler_path_and_url_is_rejected(
        segs in prop::collection::vec(segment(), 3..6),
    ) {
        let path = format!("/{}", segs.join("/"));
        let handler_path = format!("/{}/", segs[0]);
        let url = segs[2..].join("/");
        let result = Request::builder("GET", format!("http://localhost{path}"))
            .handler_path(handler_path)
            .url(url)
            .build();
        prop_assert!(result.is_err());
    }

    /// Header lookup ignores ASCII case
    #[test]
    fn prop_header_lookup_ignores_case(name in "[A-Za-z][A-Za-z-]{0,10}", value in "[ -~]{0,20}") {
        let headers = Headers::from_pairs([(name.clone(), value.clone())]);
        prop_assert_eq!(headers.get(&name.to_ascii_uppercase()), Some(value.as_str()));
        prop_assert_eq!(headers.get(&name.to_ascii_lowercase()), Some(value.as_str()));
    }
}
