use relay_core::{AdapterRegistry, DomEvent, EditingModel, InputTarget, SiteAdapter};

#[test]
fn builtin_table_resolves_each_supported_site() {
    let registry = AdapterRegistry::builtin();
    let cases = [
        ("chatgpt.com", "chatgpt"),
        ("grok.com", "grok"),
        ("chat.deepseek.com", "deepseek"),
        ("claude.ai", "claude"),
        ("gemini.google.com", "gemini"),
    ];
    for (host, id) in cases {
        assert_eq!(registry.resolve(host).map(|a| a.id.as_str()), Some(id), "{host}");
    }
}

#[test]
fn unsupported_site_is_none() {
    let registry = AdapterRegistry::builtin();
    assert!(registry.resolve("example.com").is_none());
    assert!(registry.resolve_url("not a url").is_none());
    assert!(registry.resolve_url("file:///tmp/index.html").is_none());
}

#[test]
fn resolve_url_uses_host_only() {
    let registry = AdapterRegistry::builtin();
    let adapter = registry.resolve_url("https://claude.ai/chat/123?x=chatgpt.com").unwrap();
    assert_eq!(adapter.id, "claude");
    assert!(registry
        .resolve_url("https://example.com/?next=claude.ai")
        .is_none());
}

#[test]
fn first_match_wins_and_extensions_come_after_builtins() {
    let mut registry = AdapterRegistry::builtin();
    registry.extend([
        SiteAdapter {
            id: "claude-mirror".into(),
            domain: "claude.ai".into(),
            inputs: vec![InputTarget::new("textarea", EditingModel::ValueAssignment)],
            submit: "button".into(),
            notify: vec![DomEvent::Input],
        },
        SiteAdapter {
            id: "mistral".into(),
            domain: "chat.mistral.ai".into(),
            inputs: vec![InputTarget::new("textarea", EditingModel::ValueAssignment)],
            submit: "button[type='submit']".into(),
            notify: vec![DomEvent::Input],
        },
    ]);

    assert_eq!(registry.resolve("claude.ai").unwrap().id, "claude");
    assert_eq!(registry.resolve("chat.mistral.ai").unwrap().id, "mistral");
}

#[test]
fn chatgpt_has_rich_text_primary_and_textarea_fallback() {
    let registry = AdapterRegistry::builtin();
    let chatgpt = registry.resolve("chatgpt.com").unwrap();
    let models: Vec<_> = chatgpt.inputs.iter().map(|t| t.model).collect();
    assert_eq!(
        models,
        vec![EditingModel::RichText, EditingModel::ValueAssignment]
    );
    let grok = registry.resolve("grok.com").unwrap();
    assert_eq!(grok.notify, vec![DomEvent::Input, DomEvent::Change]);
}

#[test]
fn editing_models_accept_matching_controls() {
    assert!(EditingModel::ValueAssignment.accepts("TEXTAREA", false));
    assert!(EditingModel::ValueAssignment.accepts("input", false));
    assert!(!EditingModel::ValueAssignment.accepts("div", true));
    assert!(EditingModel::RichText.accepts("div", true));
    assert!(!EditingModel::RichText.accepts("div", false));
}
