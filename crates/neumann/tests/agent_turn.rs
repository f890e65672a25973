use std::fs;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use neumann::SessionBuilder;
use neumann::core::tool::{Approval, ApprovalHandler, ApprovalResult};
use neumann_model::Message;
use neumann_test_model::{PresetEvent, PresetResponse, TestModelProvider};

struct FixedApprover {
    result: ApprovalResult,
    seen: Arc<Mutex<Vec<Approval>>>,
}

#[async_trait]
impl ApprovalHandler for FixedApprover {
    async fn request(&self, approval: &Approval) -> ApprovalResult {
        self.seen.lock().unwrap().push(approval.clone());
        self.result.clone()
    }
}

fn tool_results(messages: &[Message]) -> Vec<&str> {
    messages
        .iter()
        .filter_map(|message| match message {
            Message::Tool { content, .. } => Some(content.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_tagged_read_round() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.txt");
    fs::write(&path, "hello\nworld\n").unwrap();

    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([
        PresetEvent::TextDelta("Let me look.\n".to_owned()),
        PresetEvent::TextDelta(format!(
            "<function=read>\n<parameter=path>{}</parameter>\n\
             <parameter=limit>1</parameter>\n</function>",
            path.display()
        )),
    ]));
    provider.add_response(PresetResponse::with_text("It says hello."));

    let mut session = SessionBuilder::with_model_provider(provider.clone()).build();
    session.send_message("What is in todo.txt?").await.unwrap();

    let messages = session.agent().conversation().messages();
    assert_eq!(messages.len(), 4);
    assert_eq!(tool_results(messages), ["   1| hello\n"]);
    assert_eq!(
        messages[3],
        Message::Assistant {
            content: Some("It says hello.".to_owned()),
            tool_calls: vec![],
        }
    );
    assert_eq!(provider.remaining(), 0);

    // Every request starts with the generated prompt.
    let requests = provider.requests();
    let Message::System { content } = &requests[1].messages[0] else {
        panic!("expected the system prompt first");
    };
    assert!(content.starts_with("Concise coding assistant. cwd: "));
    assert!(content.contains(
        "- read(path: string, offset: number?, limit: number?): \
         Read file with line numbers (file path, not directory)\n"
    ));
    assert!(content.contains("- bash(cmd: string): Run shell command\n"));
}

#[tokio::test]
async fn test_shell_needs_approval() {
    let mut provider = TestModelProvider::default();
    for _ in 0..2 {
        provider.add_response(PresetResponse::with_events([
            PresetEvent::tool_call_delta(
                0,
                Some("call_sh"),
                Some("bash"),
                Some(r#"{"cmd":"echo hi"}"#),
            ),
        ]));
        provider.add_response(PresetResponse::with_text("Ok."));
    }

    let seen = Arc::new(Mutex::new(vec![]));
    let approver = FixedApprover {
        result: ApprovalResult::reject(Some("unsafe".to_owned())),
        seen: seen.clone(),
    };
    let mut session = SessionBuilder::with_model_provider(provider.clone())
        .with_approval_handler(approver)
        .build();
    session.send_message("Say hi").await.unwrap();
    assert_eq!(
        tool_results(session.agent().conversation().messages()),
        ["error: User denied execution permission. Reason: unsafe"]
    );
    assert_eq!(seen.lock().unwrap()[0].tool(), "bash");

    let output = Arc::new(Mutex::new(vec![]));
    let sink = output.clone();
    let approver = FixedApprover {
        result: ApprovalResult::approve(),
        seen,
    };
    let mut session = SessionBuilder::with_model_provider(provider)
        .with_approval_handler(approver)
        .on_shell_output(move |line| sink.lock().unwrap().push(line.to_owned()))
        .build();
    session.send_message("Say hi").await.unwrap();
    assert_eq!(
        tool_results(session.agent().conversation().messages()),
        ["hi"]
    );
    assert_eq!(*output.lock().unwrap(), ["hi"]);
}

#[tokio::test]
async fn test_external_tools() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("tools.toml"),
        r#"
[shout]
name = "shout"
description = "Uppercase text"
parameters = { text = "string" }
run = "printf '%s' \"$NEU_ARG_TEXT\" | tr a-z A-Z"
"#,
    )
    .unwrap();

    let mut provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events([
        PresetEvent::TextDelta(
            "<function=shout><parameter=text>hey</parameter></function>"
                .to_owned(),
        ),
    ]));
    provider.add_response(PresetResponse::with_text("Done."));

    let mut session = SessionBuilder::with_model_provider(provider)
        .with_tool_dir(dir.path())
        .build();
    let discovery = session.discovery().unwrap();
    assert_eq!(discovery.tools().len(), 1);
    assert!(discovery.problems().is_empty());
    assert_eq!(session.agent().registry().len(), 7);
    assert!(
        session
            .agent()
            .system_prompt()
            .contains("- shout(text: string): Uppercase text\n")
    );

    session.send_message("Shout hey").await.unwrap();
    assert_eq!(
        tool_results(session.agent().conversation().messages()),
        ["HEY"]
    );

    session.reset();
    assert!(session.agent().conversation().is_empty());
}
