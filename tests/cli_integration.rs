//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end. Every command runs in a
//! scratch directory so no local config or `.env` leaks in.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the binary to test, running inside `dir`.
fn proposal_agent(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("proposal-agent").unwrap();
    cmd.current_dir(dir.path()).env_remove("RUST_LOG");
    cmd
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    let dir = TempDir::new().unwrap();
    proposal_agent(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("proposal writer"))
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("render"));
}

#[test]
fn test_version_flag() {
    let dir = TempDir::new().unwrap();
    proposal_agent(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

// ============================================================================
// Extract Command Tests
// ============================================================================

#[test]
fn test_extract_prints_json() {
    let dir = TempDir::new().unwrap();
    let output = proposal_agent(&dir)
        .args(["extract", "Project name: Acme\nBudget: $5,000\nSpecific requirements: SEO, Blog"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["title"], "Acme");
    assert_eq!(json["budget"], "$5,000");
    assert_eq!(json["timeline"], "");
    assert_eq!(json["requirements"], serde_json::json!(["SEO", "Blog"]));
}

#[test]
fn test_extract_reads_stdin() {
    let dir = TempDir::new().unwrap();
    proposal_agent(&dir)
        .arg("extract")
        .write_stdin("Timeline: 3 months")
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""timeline": "3 months""#));
}

// ============================================================================
// Render Command Tests
// ============================================================================

#[test]
fn test_render_pdf() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("draft.md"), "**Project Overview**\n\nA new site.\n\n- Item")
        .unwrap();

    proposal_agent(&dir)
        .args(["render", "draft.md", "--format", "pdf", "--title", "Acme Portal"])
        .assert()
        .success()
        .stdout(predicate::str::contains("acme-portal.pdf"));

    let bytes = std::fs::read(dir.path().join("acme-portal.pdf")).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
}

#[test]
fn test_render_docx_to_output_path() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("draft.md"), "**Next Steps**\n- Sign").unwrap();

    proposal_agent(&dir)
        .args(["render", "draft.md", "-f", "word", "-o", "proposal.docx"])
        .assert()
        .success();

    let bytes = std::fs::read(dir.path().join("proposal.docx")).unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[test]
fn test_render_default_format_from_config() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("draft.md"), "Body").unwrap();
    std::fs::write(
        dir.path().join("proposal-agent.toml"),
        "[documents]\ndefault_format = \"pdf\"\n",
    )
    .unwrap();

    proposal_agent(&dir)
        .args(["render", "draft.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("web-development-proposal.pdf"));
}

#[test]
fn test_render_rejects_unknown_format() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("draft.md"), "Body").unwrap();

    proposal_agent(&dir).args(["render", "draft.md", "--format", "rtf"]).assert().failure();
}

#[test]
fn test_render_missing_input() {
    let dir = TempDir::new().unwrap();
    proposal_agent(&dir)
        .args(["render", "missing.md"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.md"));
}

// ============================================================================
// Config Command Tests
// ============================================================================

#[test]
fn test_config_shows_toml() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("custom.toml"), "[server]\nport = 9000\n").unwrap();

    proposal_agent(&dir)
        .args(["--config", "custom.toml", "config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("port = 9000"))
        .stdout(predicate::str::contains("llama3-8b-8192"));
}

#[test]
fn test_serve_requires_api_key() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("proposal-agent.toml"),
        "[llm]\napi_key_env = \"PROPOSAL_AGENT_CLI_TEST_KEY\"\n",
    )
    .unwrap();

    proposal_agent(&dir)
        .env_remove("PROPOSAL_AGENT_CLI_TEST_KEY")
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PROPOSAL_AGENT_CLI_TEST_KEY"));
}

// ============================================================================
// Chat Command Tests
// ============================================================================

/// Start a chat-completions stub that always answers with a short draft.
fn spawn_model_stub(rt: &tokio::runtime::Runtime) -> String {
    use axum::routing::post;
    use axum::{Json, Router};

    rt.block_on(async {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                Json(serde_json::json!({
                    "choices": [{ "message": { "content": "**Project Overview**\nA bakery site." } }]
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    })
}

#[test]
fn test_chat_saves_document_into_output_dir() {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let base_url = spawn_model_stub(&rt);

    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("proposal-agent.toml"),
        format!(
            "[llm]\nbase_url = \"{base_url}\"\napi_key_env = \"PROPOSAL_AGENT_CHAT_TEST_KEY\"\n\
             max_retries = 0\n\n[documents]\noutput_dir = \"docs\"\n"
        ),
    )
    .unwrap();

    let output = proposal_agent(&dir)
        .env("PROPOSAL_AGENT_CHAT_TEST_KEY", "test-key")
        .arg("chat")
        .write_stdin("Project name: Acme\nmake pdf\nexit\n")
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("A bakery site."));
    assert_eq!(stdout.matches("Saved ").count(), 1);
    assert!(stdout.contains("acme-development-proposal.pdf"));

    let saved: Vec<_> = std::fs::read_dir(dir.path().join("docs")).unwrap().collect();
    assert_eq!(saved.len(), 1);
    let bytes = std::fs::read(dir.path().join("docs/acme-development-proposal.pdf")).unwrap();
    assert!(bytes.starts_with(b"%PDF-1.4"));
}

#[test]
fn test_completions() {
    let dir = TempDir::new().unwrap();
    proposal_agent(&dir)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("proposal-agent"));
}
