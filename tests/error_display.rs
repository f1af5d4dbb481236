use ogshot_lib::OgError;

#[test]
fn config_error_display_includes_message() {
    let err = OgError::Config("missing server command".to_string());

    assert_eq!(format!("{}", err), "Configuration error: missing server command");
}

#[test]
fn io_error_display_wraps_source() {
    let io_err = std::io::Error::other("disk full");
    let err: OgError = io_err.into();
    let rendered = format!("{}", err);

    assert!(rendered.starts_with("IO error: "));
    assert!(rendered.contains("disk full"));
}

#[test]
fn directive_helper_names_route() {
    let err = OgError::directive("/blog/post", "expected value at line 1 column 14");

    assert_eq!(
        format!("{}", err),
        "Malformed og-image directive on /blog/post: expected value at line 1 column 14"
    );
}

#[test]
fn route_pattern_helper_includes_pattern_and_reason() {
    let err = OgError::route_pattern("/**/x", "'**' is only allowed as the last segment");

    assert_eq!(
        format!("{}", err),
        "Invalid route pattern '/**/x': '**' is only allowed as the last segment"
    );
}

#[test]
fn capture_helper_uses_message() {
    let err = OgError::capture("navigation timeout");

    assert_eq!(format!("{}", err), "Capture failed: navigation timeout");
}
