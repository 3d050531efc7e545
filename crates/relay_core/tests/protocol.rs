use pretty_assertions::assert_eq;
use relay_core::{FillPrompt, Msg, PanelRequest, ProtocolError, TabMessage, TabReport};

#[test]
fn panel_messages_use_wire_names() {
    let request = PanelRequest::from_json(
        r#"{"type":"OPEN_AI_PROVIDERS","urls":["https://claude.ai/"],"prompt":"hi","autoSend":false}"#,
    )
    .unwrap();
    assert_eq!(
        request,
        PanelRequest::OpenProviders {
            urls: vec!["https://claude.ai/".to_string()],
            prompt: "hi".to_string(),
            auto_send: Some(false),
        }
    );

    let stored = PanelRequest::from_json(r#"{"type":"STORE_PROMPT","prompt":"keep"}"#).unwrap();
    assert_eq!(
        Msg::from(stored),
        Msg::StorePrompt {
            prompt: "keep".to_string(),
            auto_send: None,
        }
    );
}

#[test]
fn fill_prompt_serializes_camel_case() {
    let message = TabMessage::FillPrompt(FillPrompt {
        prompt: "explain recursion".to_string(),
        auto_send: true,
        follow_up: false,
    });
    let json = message.to_json().unwrap();
    assert_eq!(
        json,
        r#"{"type":"FILL_PROMPT","prompt":"explain recursion","autoSend":true,"followUp":false}"#
    );
    assert_eq!(TabMessage::from_json(&json).unwrap(), message);
}

#[test]
fn prompt_sent_report_is_tagged() {
    let json = serde_json::to_string(&TabReport::PromptSent).unwrap();
    assert_eq!(json, r#"{"type":"PROMPT_SENT"}"#);
}

#[test]
fn empty_prompt_is_rejected_at_the_panel_boundary() {
    let request = PanelRequest::OpenProviders {
        urls: vec!["https://claude.ai/".to_string()],
        prompt: "   ".to_string(),
        auto_send: None,
    };
    assert_eq!(request.validate(), Err(ProtocolError::EmptyPrompt));

    let request = PanelRequest::OpenProviders {
        urls: Vec::new(),
        prompt: "hi".to_string(),
        auto_send: None,
    };
    assert_eq!(request.validate(), Err(ProtocolError::NoUrls));

    let follow_up = PanelRequest::SendFollowUp {
        prompt: String::new(),
        auto_send: None,
    };
    assert_eq!(follow_up.validate(), Err(ProtocolError::EmptyPrompt));
}

#[test]
fn unknown_message_type_is_malformed() {
    let err = PanelRequest::from_json(r#"{"type":"testTheme"}"#).unwrap_err();
    assert!(matches!(err, ProtocolError::Malformed(_)));
}
