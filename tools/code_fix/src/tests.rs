use super::*;
use httpmock::Mock;
use httpmock::prelude::*;
use mend_core::test_util::{tempdir, unreachable_url};
use serde_json::json;
use std::fs;
use std::io::Cursor;

const BUGGY: &str = "def mean(xs):\n    return sum(xs) / len(xs) + 1\n";
const FIXED: &str = "def mean(xs):\n    return sum(xs) / len(xs)\n";

/// Wraps `content` in a chat completion envelope.
fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop",
        }],
    })
    .to_string()
}

fn fix_content(language: &str, fixed_code: &str) -> String {
    json!({
        "original_code": "the model's paraphrase",
        "fixed_code": fixed_code,
        "explanation": "The mean was off by one.",
        "language": language,
        "error_type": "logic",
    })
    .to_string()
}

/// Answers the reachability check with `status`.
fn models(server: &MockServer, status: u16) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(GET).path("/v1/models");
        then.status(status).body(r#"{"object":"list","data":[]}"#);
    })
}

/// Answers chat completions with `status` and `body`.
fn chat<'a>(server: &'a MockServer, status: u16, body: &str) -> Mock<'a> {
    server.mock(|when, then| {
        when.method(POST).path("/v1/chat/completions");
        then.status(status).body(body);
    })
}

fn config(address: String) -> FixConfig {
    FixConfig {
        llm: LLMConfig {
            address,
            ..LLMConfig::default()
        },
        validation: ValidationConfig::default(),
    }
}

fn answering(input: &str) -> PromptConfirm<Cursor<String>, Vec<u8>> {
    PromptConfirm::new(Cursor::new(input.to_string()), Vec::new())
}

/// Names of the files in `dir` ending in `.bak`.
fn backups(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| p.extension().is_some_and(|e| e == "bak"))
        .collect()
}

#[test]
fn confirmed_fix_is_applied_with_backup() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stats.py");
    fs::write(&path, BUGGY).unwrap();
    let server = MockServer::start();
    let listing = models(&server, 200);
    let completions = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/chat/completions")
            .body_contains("def mean(xs):")
            .body_contains("return sum(xs) / len(xs) + 1");
        then.status(200)
            .body(completion(&fix_content("python", FIXED)));
    });

    let applied = run_fix(&path, &config(server.url("/v1")), &mut answering("y\n")).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), FIXED);
    assert_eq!(backups(dir.path()), [applied.backup.clone()]);
    assert_eq!(fs::read_to_string(&applied.backup).unwrap(), BUGGY);
    assert!(applied.validation.is_none());
    listing.assert();
    completions.assert();
}

#[test]
fn declined_fix_changes_nothing() {
    for answer in ["n\n", "\n", "", "yes\n"] {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.py");
        fs::write(&path, BUGGY).unwrap();
        let server = MockServer::start();
        models(&server, 200);
        chat(&server, 200, &completion(&fix_content("python", FIXED)));

        let result = run_fix(&path, &config(server.url("/v1")), &mut answering(answer));

        match result {
            Err(e @ FixError::UserCancelled(_)) => assert_eq!(e.exit_code(), 0),
            other => panic!("answer {answer:?} gave {other:?}"),
        }
        assert_eq!(fs::read(&path).unwrap(), BUGGY.as_bytes());
        assert!(backups(dir.path()).is_empty());
    }
}

#[test]
fn unreachable_server_sends_no_request() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stats.py");
    fs::write(&path, BUGGY).unwrap();

    let down = MockServer::start();
    let listing = models(&down, 503);
    let completions = chat(&down, 200, &completion(&fix_content("python", FIXED)));
    let err = run_fix(&path, &config(down.url("/v1")), &mut AssumeYes).unwrap_err();
    assert!(matches!(err, FixError::ServerUnreachable(_)));
    assert_eq!(err.exit_code(), 1);
    listing.assert();
    completions.assert_hits(0);

    let err = run_fix(&path, &config(unreachable_url()), &mut AssumeYes).unwrap_err();
    assert!(matches!(err, FixError::ServerUnreachable(_)));
    assert_eq!(fs::read_to_string(&path).unwrap(), BUGGY);
}

#[test]
fn malformed_replies_leave_file_untouched() {
    let replies = [
        (200, completion("Sure! Here is the fixed code: ...")),
        (200, completion(r#"{"fixed_code": "x"}"#)),
        (200, json!({"choices": []}).to_string()),
        (
            200,
            json!({"choices": [{"message": {
                "content": null,
                "tool_calls": [{"id": "c1", "type": "function",
                    "function": {"name": "analyze_code", "arguments": "{}"}}],
            }}]})
            .to_string(),
        ),
        (200, "<html>proxy error</html>".to_string()),
    ];
    for (status, body) in replies {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stats.py");
        fs::write(&path, BUGGY).unwrap();
        let server = MockServer::start();
        models(&server, 200);
        chat(&server, status, &body);

        let result = run_fix(&path, &config(server.url("/v1")), &mut AssumeYes);

        assert!(
            matches!(result, Err(FixError::ResponseParse(_))),
            "{body} gave {result:?}"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), BUGGY);
        assert!(backups(dir.path()).is_empty());
    }
}

#[test]
fn http_error_is_reported_verbatim() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stats.py");
    fs::write(&path, BUGGY).unwrap();
    let server = MockServer::start();
    models(&server, 200);
    chat(&server, 400, r#"{"error":"context length exceeded"}"#);

    let err = run_fix(&path, &config(server.url("/v1")), &mut AssumeYes).unwrap_err();
    assert!(matches!(
        err,
        FixError::Request(LLMError::Status { status: 400, .. })
    ));
    assert!(err.to_string().contains("context length exceeded"));
    assert_eq!(fs::read_to_string(&path).unwrap(), BUGGY);
}

#[test]
fn unreadable_input() {
    let dir = tempdir().unwrap();
    let config = config(unreachable_url());

    let missing = dir.path().join("missing.py");
    let err = run_fix(&missing, &config, &mut AssumeYes).unwrap_err();
    assert!(matches!(err, FixError::FileRead { .. }));
    assert_eq!(err.exit_code(), 1);

    let empty = dir.path().join("empty.py");
    fs::write(&empty, "\n").unwrap();
    let err = run_fix(&empty, &config, &mut AssumeYes).unwrap_err();
    assert!(matches!(err, FixError::EmptyFile(_)));
}

#[test]
fn validated_fix() {
    let good = "pub fn first(v: &[i32]) -> Option<i32> {\n    v.first().copied()\n}\n";
    let dir = tempdir().unwrap();
    let path = dir.path().join("first.rs");
    fs::write(&path, "pub fn first(v: &[i32]) -> i32 {\n    v[1]\n}\n").unwrap();
    let server = MockServer::start();
    models(&server, 200);
    chat(&server, 200, &completion(&fix_content("Rust", good)));

    let applied = run_fix(&path, &config(server.url("/v1")), &mut AssumeYes).unwrap();
    let validation = applied.validation.unwrap();
    assert!(validation.success, "{}", validation.combined_output);
    assert_eq!(fs::read_to_string(&path).unwrap(), good);
}

#[test]
fn failed_validation_keeps_fix_and_backup() {
    let broken = "pub fn first(v: &[i32]) -> i32 {\n    v.first()\n}\n";
    let dir = tempdir().unwrap();
    let path = dir.path().join("first.rs");
    let original = "pub fn first(v: &[i32]) -> i32 {\n    v[1]\n}\n";
    fs::write(&path, original).unwrap();
    let server = MockServer::start();
    models(&server, 200);
    chat(&server, 200, &completion(&fix_content("rust", broken)));

    let err = run_fix(&path, &config(server.url("/v1")), &mut AssumeYes).unwrap_err();
    let FixError::BuildValidation { backup, output } = &err else {
        panic!("expected a build failure, got {err:?}");
    };
    assert!(output.contains("error"));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), broken);
    assert_eq!(fs::read_to_string(backup).unwrap(), original);
    assert_eq!(backups(dir.path()).len(), 1);
}
