use serde_json::Value;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn write(dir: &Path, relative: &str, body: &str) {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).expect("create dirs");
    std::fs::write(path, body).expect("write file");
}

fn directive(json: &str) -> String {
    format!(
        r#"<html><head><script id="og-image-options" type="application/json">{json}</script></head><body></body></html>"#
    )
}

/// A small site: a static home page, a non-static post, a suppressed admin
/// page and a plain page.
fn site() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    let out = dir.path().join("dist");
    write(&out, "index.html", &directive(r#"{"static":true,"component":"Home"}"#));
    write(&out, "blog/post/index.html", &directive(r#"{"title":"Hello"}"#));
    write(&out, "admin/index.html", &directive(r#"{"static":true}"#));
    write(&out, "about/index.html", "<html>about</html>");
    std::fs::write(
        dir.path().join("ogshot.toml"),
        r#"
[route_rules]
"/admin/**" = false
"/blog/**" = { component = "BlogPost" }
"#,
    )
    .expect("write config");
    dir
}

fn inspect(dir: &Path, extra: &[&str]) -> (Option<i32>, Value) {
    let output = Command::new(env!("CARGO_BIN_EXE_ogshot"))
        .current_dir(dir)
        .arg("inspect")
        .arg("dist")
        .args(extra)
        .output()
        .expect("run ogshot");
    let json = serde_json::from_slice(&output.stdout).expect("stdout is a JSON document");
    (output.status.code(), json)
}

fn status_of<'a>(json: &'a Value, route: &str) -> &'a Value {
    json["pages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["route"] == route)
        .map(|p| &p["outcome"]["status"])
        .unwrap()
}

#[test]
fn inspect_reports_statuses_and_plan() {
    let dir = site();
    let (code, json) = inspect(dir.path(), &[]);

    assert_eq!(code, Some(0));
    assert_eq!(json["mode"], "inspect");
    assert_eq!(json["prerenderAll"], false);
    assert_eq!(json["summary"]["pages"], 4);
    assert_eq!(json["summary"]["queued"], 1);

    assert_eq!(status_of(&json, "/"), "queued");
    assert_eq!(status_of(&json, "/blog/post"), "not-static");
    assert_eq!(status_of(&json, "/admin"), "suppressed");
    assert_eq!(status_of(&json, "/about"), "no-image");

    let planned = json["planned"].as_array().unwrap();
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0]["route"], "/");
    assert_eq!(planned[0]["outputPath"], "__og_image__/og.png");
    assert_eq!(planned[0]["options"]["component"], "Home");
    assert_eq!(planned[0]["options"]["width"], 1200);
}

#[test]
fn inspect_all_plans_every_eligible_page_with_rule_overrides() {
    let dir = site();
    let (code, json) = inspect(dir.path(), &["--all"]);

    assert_eq!(code, Some(0));
    assert_eq!(json["prerenderAll"], true);
    let planned = json["planned"].as_array().unwrap();
    let routes: Vec<&str> = planned.iter().map(|p| p["route"].as_str().unwrap()).collect();
    // Pages are visited in path order: about, admin, blog/post, index.
    assert_eq!(routes, vec!["/blog/post", "/"]);
    assert_eq!(planned[0]["options"]["component"], "BlogPost");
    assert_eq!(planned[0]["options"]["params"]["title"], "Hello");
    assert_eq!(planned[0]["outputPath"], "blog/post/__og_image__/og.png");
}

#[test]
fn inspect_leaves_pages_untouched() {
    let dir = site();
    let before = std::fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
    inspect(dir.path(), &["--all"]);
    let after = std::fs::read_to_string(dir.path().join("dist/index.html")).unwrap();
    assert_eq!(before, after);
    assert!(!dir.path().join("dist/__og_image__").exists());
}

#[test]
fn malformed_directive_fails_only_that_page() {
    let dir = site();
    write(
        &dir.path().join("dist"),
        "broken/index.html",
        r#"<script id="og-image-options">{"static":</script>"#,
    );
    let (code, json) = inspect(dir.path(), &[]);

    assert_eq!(code, Some(1));
    assert_eq!(json["summary"]["pageErrors"], 1);
    assert_eq!(json["summary"]["queued"], 1);
    let broken = json["pages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["route"] == "/broken")
        .unwrap();
    assert!(broken["error"]
        .as_str()
        .unwrap()
        .contains("Malformed og-image directive on /broken"));
}
