use super::*;
use crate::catalog::{fingerprint, CatalogIndex, RawDescriptor};
use crate::error::IndexError;

fn sample_index() -> CatalogIndex {
    let mut index = CatalogIndex::default();
    for (name, icon) in [("Line", "line.png"), ("Rectangle", "rect.png"), ("Circle", "circle.png")] {
        index
            .register(
                RawDescriptor::new(name)
                    .icon(icon)
                    .action(|| -> anyhow::Result<bool> { Ok(true) }),
            )
            .unwrap();
    }
    index
}

// ============================================
// PARSING
// ============================================

#[test]
fn test_parse_look_up() {
    let request = parse_request(r#"{"type":"lookUp","text":"line","maxResults":5}"#).unwrap();
    assert_eq!(request, Request::look_up("line", Some(5)));

    let request = parse_request(r#"{"type":"lookUp","text":"line"}"#).unwrap();
    assert_eq!(request, Request::look_up("line", None));
}

#[test]
fn test_parse_rejects_non_string_text() {
    let err = parse_request(r#"{"type":"lookUp","text":42}"#).unwrap_err();
    assert!(matches!(err, IndexError::InvalidArgument { ref argument, .. } if argument == "lookUp"));
}

#[test]
fn test_parse_rejects_bad_max_results() {
    for bad in ["-1", "2.5", "\"ten\""] {
        let line = format!(r#"{{"type":"lookUp","text":"x","maxResults":{}}}"#, bad);
        assert!(
            matches!(parse_request(&line), Err(IndexError::InvalidArgument { .. })),
            "maxResults {} should be rejected",
            bad
        );
    }
}

#[test]
fn test_parse_rejects_bad_id() {
    let err = parse_request(r#"{"type":"execute","id":"not-a-fingerprint"}"#).unwrap_err();
    assert!(matches!(err, IndexError::InvalidArgument { .. }));
}

#[test]
fn test_graceful_classification() {
    assert!(matches!(
        parse_request_graceful(r#"{"text":"x"}"#),
        ParseResult::MissingType { .. }
    ));
    assert!(matches!(
        parse_request_graceful(r#"{"type":"selfDestruct"}"#),
        ParseResult::UnknownType { ref message_type, .. } if message_type == "selfDestruct"
    ));
    assert!(matches!(
        parse_request_graceful("{not json"),
        ParseResult::ParseError(_)
    ));
    assert!(matches!(
        parse_request_graceful(r#"{"type":"getAll"}"#),
        ParseResult::Ok(Request::GetAll)
    ));
}

#[test]
fn test_log_preview_truncates_on_char_boundary() {
    let long = "é".repeat(300);
    let (preview, len) = log_preview(&long);
    assert_eq!(len, 600);
    assert!(preview.len() <= 200);
    assert!(long.starts_with(preview));
}

// ============================================
// DISPATCH
// ============================================

#[test]
fn test_look_up_and_execute_roundtrip() {
    let mut index = sample_index();

    let response = handle_line(&mut index, r#"{"type":"lookUp","text":"rect","maxResults":3}"#);
    let results = match response {
        Response::Results { results } => results,
        other => panic!("unexpected response: {:?}", other),
    };
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].name, "Rectangle");

    let line = format!(r#"{{"type":"execute","id":"{}"}}"#, results[0].id);
    assert_eq!(
        handle_line(&mut index, &line),
        Response::Executed {
            id: results[0].id,
            success: true
        }
    );

    match handle_line(&mut index, r#"{"type":"recent"}"#) {
        Response::Recent { ids } => assert_eq!(ids, vec![results[0].id]),
        other => panic!("unexpected response: {:?}", other),
    }
}

#[test]
fn test_error_response_for_bad_request() {
    let mut index = sample_index();
    let response = handle_line(&mut index, r#"{"type":"lookUp","text":["a"]}"#);
    assert!(response.is_error());
    match response {
        Response::Error {
            argument, severity, ..
        } => {
            assert_eq!(argument.as_deref(), Some("lookUp"));
            assert_eq!(severity, "error");
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[test]
fn test_get_entries_reports_unknown_ids() {
    let mut index = sample_index();
    let line_id = fingerprint("Line", None, Some("line.png"));
    let ghost = fingerprint("Ghost", None, None);

    match dispatch(
        &mut index,
        Request::GetEntries {
            ids: vec![line_id, ghost],
        },
    ) {
        Response::Entries { entries, not_found } => {
            assert_eq!(entries.len(), 1);
            assert_eq!(entries[0].name, "Line");
            assert_eq!(not_found, vec![ghost]);
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[test]
fn test_tracking_requests() {
    let mut index = sample_index();
    let circle = fingerprint("Circle", None, Some("circle.png"));
    let line = format!(r#"{{"type":"loadTracking","counts":{{"{}":4}}}}"#, circle);

    assert_eq!(
        handle_line(&mut index, &line),
        Response::TrackingLoaded { count: 1 }
    );
    match handle_line(&mut index, r#"{"type":"tracking"}"#) {
        Response::Tracking { counts } => assert_eq!(counts.get(&circle), Some(&4)),
        other => panic!("unexpected response: {:?}", other),
    }
}

#[test]
fn test_response_wire_format() {
    let json = serialize_response(&Response::TrackingLoaded { count: 2 }).unwrap();
    assert_eq!(json, r#"{"type":"trackingLoaded","count":2}"#);
}

#[test]
fn test_serve_answers_each_line() {
    let mut index = sample_index();
    let input = "{\"type\":\"getAll\"}\n\n{\"type\":\"bogus\"}\n";
    let mut output = Vec::new();
    let mut seen = 0;

    serve(&mut index, input.as_bytes(), &mut output, |_, _| seen += 1).unwrap();

    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with(r#"{"type":"entries""#));
    assert!(lines[1].starts_with(r#"{"type":"error""#));
    assert_eq!(seen, 2);
}
