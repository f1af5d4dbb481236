use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const STATIC_DIRECTIVE: &str = r#"<html><head><script id="og-image-options" type="application/json">{"static":true}</script></head><body>post</body></html>"#;

fn write(dir: &Path, relative: &str, body: &str) {
    let path = dir.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).expect("create dirs");
    std::fs::write(path, body).expect("write file");
}

fn ogshot(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ogshot"))
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("run ogshot")
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout is a JSON document")
}

#[test]
fn generate_with_nothing_queued_exits_cleanly_without_a_server() {
    let dir = TempDir::new().expect("tempdir");
    let site = dir.path().join("dist");
    write(&site, "index.html", "<html>home</html>");
    write(&site, "about/index.html", "<html>about</html>");
    std::fs::write(
        dir.path().join("ogshot.toml"),
        "[server]\ncommand = \"definitely-not-a-real-server\"\n",
    )
    .expect("write config");

    let output = ogshot(dir.path(), &["generate", "dist"]);
    assert_eq!(output.status.code(), Some(0));

    let json = stdout_json(&output);
    assert_eq!(json["mode"], "generate");
    assert_eq!(json["summary"]["pages"], 2);
    assert_eq!(json["summary"]["queued"], 0);
    assert!(json["report"]["setupError"].is_null());
}

#[test]
fn invalid_config_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "dist/index.html", "<html></html>");
    let cfg = dir.path().join("broken.toml");
    std::fs::write(&cfg, "[defaults]\nwidth = 0\n").expect("write config");

    let output = ogshot(
        dir.path(),
        &["generate", "dist", "--config", cfg.to_str().unwrap()],
    );
    assert_eq!(output.status.code(), Some(2));

    let json = stdout_json(&output);
    assert_eq!(json["mode"], "error");
    assert_eq!(json["error"]["category"], "config");
    assert!(json["message"].as_str().unwrap().contains("broken.toml"));
}

#[test]
fn unknown_config_keys_are_fatal() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "dist/index.html", "<html></html>");
    std::fs::write(dir.path().join("ogshot.toml"), "threshold = 0.9\n").expect("write config");

    let output = ogshot(dir.path(), &["inspect", "dist"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn missing_output_dir_is_fatal() {
    let dir = TempDir::new().expect("tempdir");

    let output = ogshot(dir.path(), &["generate", "does-not-exist"]);
    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout_json(&output)["mode"], "error");
}

#[cfg(unix)]
#[test]
fn server_setup_failure_exits_with_failure_and_still_strips_pages() {
    let dir = TempDir::new().expect("tempdir");
    let site = dir.path().join("dist");
    write(&site, "blog/post/index.html", STATIC_DIRECTIVE);
    std::fs::write(
        dir.path().join("ogshot.toml"),
        "[server]\ncommand = \"sh\"\nargs = [\"-c\", \"exit 3\"]\n",
    )
    .expect("write config");

    let output = ogshot(dir.path(), &["generate", "dist", "--no-color"]);
    assert_eq!(output.status.code(), Some(1));

    let json = stdout_json(&output);
    assert_eq!(json["summary"]["queued"], 1);
    assert_eq!(json["report"]["notAttempted"], 1);
    assert!(json["report"]["setupError"]
        .as_str()
        .unwrap()
        .contains("Preview server error"));

    let markup = std::fs::read_to_string(site.join("blog/post/index.html")).expect("read page");
    assert!(!markup.contains("og-image-options"));
    assert!(!site.join("blog/post/__og_image__").exists());
}

#[test]
fn output_flag_writes_document_to_file() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "dist/index.html", "<html></html>");

    let output = ogshot(dir.path(), &["inspect", "dist", "-o", "plan.json"]);
    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());

    let written = std::fs::read_to_string(dir.path().join("plan.json")).expect("read plan");
    let json: Value = serde_json::from_str(&written).expect("plan is JSON");
    assert_eq!(json["mode"], "inspect");
}
