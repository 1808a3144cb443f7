//! Session flow tests: interpreter, template resolution and the question form.

mod common;

use std::collections::BTreeMap;

use tokio_test::{assert_pending, assert_ready, task};

use common::*;
use draftchat::session::{NoticeLevel, Role, DRAFT_USAGE, NO_ACTIVE_DRAFT, REMEDIATION_HINTS};
use draftchat::{EngineErrorKind, Phase, SessionError};

#[tokio::test]
async fn test_query_proposes_template_without_opening_form() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));

    let phase = session.send("rental agreement for Mumbai").await.unwrap();

    assert_eq!(phase, Phase::TemplateProposed);
    let draft = session.draft().unwrap();
    assert_eq!(draft.template_id, "rental_agreement");
    assert!(draft.draft_markdown.is_none());
    assert_eq!(draft.confidence, Some(0.82));
    assert!(!session.show_questions());
    assert_eq!(engine.args(Call::CreateDraft), vec!["rental agreement for Mumbai"]);
    assert_eq!(session.last_query().as_deref(), Some("rental agreement for Mumbai"));

    let transcript = session.transcript();
    let messages = transcript.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert!(messages[1].content.starts_with("Great! I found a matching template."));
}

#[tokio::test]
async fn test_greeting_opens_transcript() {
    let engine = ScriptedEngine::new();
    let config = draftchat::core::SessionConfig { greeting: true, ..test_config() };
    let session = draftchat::DraftSession::new(engine, config);

    assert_eq!(session.transcript_len(), 1);
    assert_eq!(session.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_vars_without_draft_is_fixed_and_offline() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);

    for _ in 0..2 {
        session.send("/vars").await.unwrap();
        let last = session.transcript().last().cloned().unwrap();
        assert_eq!(last.content, NO_ACTIVE_DRAFT);
    }
    assert_eq!(engine.count(Call::CreateDraft), 0);
    assert_eq!(session.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_vars_reports_filled_and_missing() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));
    session.send("rental agreement").await.unwrap();

    let phase = session.send("/VARS").await.unwrap();

    assert_eq!(phase, Phase::TemplateProposed);
    let reply = session.transcript().last().cloned().unwrap().content;
    assert!(reply.contains("**Filled (1):**\n- city: Mumbai"));
    assert!(reply.contains("**Missing (1):**\n- landlord_name"));
    assert_eq!(engine.count(Call::CreateDraft), 1);
}

#[tokio::test]
async fn test_empty_draft_command_shows_usage() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);

    let result = session.send("/draft   ").await;

    assert!(matches!(result, Err(SessionError::EmptyDraftCommand)));
    assert_eq!(session.transcript().last().unwrap().content, DRAFT_USAGE);
    assert_eq!(session.transcript_len(), 2);
    assert_eq!(engine.count(Call::CreateDraft), 0);
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_explicit_draft_command_strips_prefix() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));

    session.send("/draft notice to insurer for motor accident").await.unwrap();

    assert_eq!(engine.args(Call::CreateDraft), vec!["notice to insurer for motor accident"]);
}

#[tokio::test]
async fn test_blank_input_is_not_recorded() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);

    assert!(matches!(session.send("   ").await, Err(SessionError::EmptyInput)));
    assert_eq!(session.transcript_len(), 0);
}

#[tokio::test]
async fn test_confirm_opens_question_form() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));
    session.send("rental agreement").await.unwrap();

    assert_eq!(session.confirm_template().unwrap(), Phase::AnsweringQuestions);
    assert!(session.show_questions());
    assert!(matches!(session.confirm_template(), Err(SessionError::NothingToConfirm)));
    // Confirmation needs nothing from the engine
    assert_eq!(engine.count(Call::CreateWithTemplate), 0);
}

#[tokio::test]
async fn test_confirm_without_match_is_rejected() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);

    assert!(matches!(session.confirm_template(), Err(SessionError::NothingToConfirm)));
}

#[tokio::test]
async fn test_selecting_alternative_replaces_draft() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));
    session.send("rental agreement").await.unwrap();
    session.confirm_template().unwrap();

    let mut switched = template_match("inst-2", "leave_license", "Leave and License Agreement");
    switched.alternatives = vec![draftchat::engine::Alternative {
        template_id: "commercial_lease".to_string(),
        title: "Commercial Lease".to_string(),
        doc_type: None,
    }];
    engine.push_template(Ok(switched));

    let phase = session.select_alternative("leave_license").await.unwrap();

    assert_eq!(phase, Phase::TemplateProposed);
    assert!(!session.show_questions());
    let draft = session.draft().unwrap();
    assert_eq!(draft.template_id, "leave_license");
    assert_eq!(draft.instance_id, "inst-2");
    assert_eq!(draft.alternatives.len(), 1);
    assert_eq!(draft.alternatives[0].template_id, "commercial_lease");

    let titles: Vec<String> = session.drain_notices().into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["Switching template", "Template switched"]);
}

#[tokio::test]
async fn test_failed_alternative_keeps_current_draft() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));
    session.send("rental agreement").await.unwrap();
    engine.push_template(Err(server_error("Template not found")));

    let result = session.select_alternative("leave_license").await;

    assert!(matches!(result, Err(SessionError::Engine(_))));
    assert_eq!(session.draft().unwrap().template_id, "rental_agreement");
    assert_eq!(session.phase(), Phase::TemplateProposed);
    let notices = session.drain_notices();
    assert_eq!(notices.last().unwrap().level, NoticeLevel::Error);
    assert_eq!(notices.last().unwrap().title, "Failed to switch template");
}

#[tokio::test]
async fn test_terminal_error_keeps_prior_draft() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));
    session.send("rental agreement").await.unwrap();
    engine.push_draft(Err(server_error("Database connection lost")));

    let result = session.send("employment contract").await;

    match result {
        Err(SessionError::Engine(err)) => assert_eq!(err.kind(), EngineErrorKind::Other),
        other => panic!("expected engine error, got {other:?}"),
    }
    let reply = session.transcript().last().cloned().unwrap().content;
    assert!(reply.contains("Database connection lost"));
    assert!(reply.contains(REMEDIATION_HINTS));
    assert_eq!(session.draft().unwrap().template_id, "rental_agreement");
    assert_eq!(engine.count(Call::Search), 0);
    assert!(!session.is_loading());
    assert_eq!(session.drain_notices().len(), 1);
}

#[tokio::test]
async fn test_deep_link_opens_question_form() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_template(Ok(rental_match()));

    let phase = session.open_template("rental_agreement").await.unwrap();

    assert_eq!(phase, Phase::AnsweringQuestions);
    assert!(session.show_questions());
    assert_eq!(engine.args(Call::CreateWithTemplate), vec!["rental_agreement"]);
    assert!(session
        .transcript()
        .last()
        .unwrap()
        .content
        .starts_with("Perfect! I've loaded the Rental Agreement template."));
}

#[tokio::test]
async fn test_deep_link_failure_is_reported() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_template(Err(draftchat::EngineError::api(404, None, "Template not found")));

    let result = session.open_template("missing").await;

    assert!(matches!(result, Err(SessionError::Engine(_))));
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.drain_notices()[0].title, "Failed to load template");
}

#[tokio::test]
async fn test_blank_answer_blocks_submission() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));
    session.send("rental agreement").await.unwrap();
    session.confirm_template().unwrap();

    let answers = BTreeMap::from([
        ("landlord_name".to_string(), String::new()),
        ("city".to_string(), "Mumbai".to_string()),
    ]);
    let result = session.submit(answers, true).await;

    match result {
        Err(SessionError::MissingAnswers(keys)) => assert_eq!(keys, vec!["landlord_name"]),
        other => panic!("expected missing answers, got {other:?}"),
    }
    assert_eq!(engine.count(Call::Finalize), 0);
    assert!(session.show_questions());
}

#[tokio::test]
async fn test_submit_before_confirm_is_rejected() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));
    session.send("rental agreement").await.unwrap();

    let result = session.submit(rental_answers(), true).await;

    assert!(matches!(result, Err(SessionError::NotAnswering)));
    assert_eq!(engine.count(Call::Finalize), 0);
}

#[tokio::test]
async fn test_submit_generates_draft() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));
    engine.push_final(Ok(final_draft("# Rental Agreement", 1)));
    session.send("rental agreement").await.unwrap();
    session.confirm_template().unwrap();

    let number = session.submit(rental_answers(), false).await.unwrap();

    assert_eq!(number, 1);
    assert_eq!(session.phase(), Phase::DraftReady);
    assert!(!session.show_questions());
    let draft = session.draft().unwrap();
    assert_eq!(draft.draft_markdown.as_deref(), Some("# Rental Agreement"));
    assert_eq!(draft.value_of("landlord_name").as_deref(), Some("R. Sharma"));

    let (sent, strict) = engine.finalized().pop().unwrap();
    assert_eq!(sent, rental_answers());
    assert!(!strict);
    assert_eq!(engine.args(Call::Finalize), vec!["inst-1"]);
    assert_eq!(session.drain_notices()[0].title, "Draft generated");
}

#[tokio::test]
async fn test_seeded_form_submits_prefilled_values() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));
    engine.push_final(Ok(final_draft("# Rental Agreement", 1)));
    session.send("rental agreement").await.unwrap();

    assert!(session.answer_form().is_none());
    session.confirm_template().unwrap();

    let mut form = session.answer_form().unwrap();
    assert_eq!(form.value("city"), Some("Mumbai"));
    assert_eq!(form.missing(), vec!["landlord_name"]);
    form.set("landlord_name", "R. Sharma");
    session.submit_form(form).await.unwrap();

    let (sent, strict) = engine.finalized().pop().unwrap();
    assert_eq!(sent["city"], "Mumbai");
    assert!(strict);
    assert!(session.transcript().last().unwrap().content.contains("strict replacement mode"));
}

#[tokio::test]
async fn test_failed_submit_keeps_form_open() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));
    engine.push_final(Err(server_error("Rendering failed")));
    engine.push_final(Ok(final_draft("# Rental Agreement", 1)));
    session.send("rental agreement").await.unwrap();
    session.confirm_template().unwrap();

    assert!(session.submit(rental_answers(), true).await.is_err());
    assert!(session.show_questions());
    assert!(session.draft().unwrap().draft_markdown.is_none());
    assert_eq!(session.drain_notices()[0].title, "Generation failed");
    assert!(!session.is_generating());

    // The same form can be sent again
    assert_eq!(session.submit(rental_answers(), true).await.unwrap(), 1);
}

#[tokio::test]
async fn test_new_request_discards_finished_draft() {
    let engine = ScriptedEngine::new();
    let session = drafted_session(&engine).await;
    engine.push_draft(Ok(template_match("inst-9", "nda", "Non-Disclosure Agreement")));

    let phase = session.send("an NDA").await.unwrap();

    assert_eq!(phase, Phase::TemplateProposed);
    let draft = session.draft().unwrap();
    assert_eq!(draft.instance_id, "inst-9");
    assert!(draft.draft_markdown.is_none());
}

#[tokio::test]
async fn test_input_ignored_while_request_in_flight() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    let release = engine.hold(Call::CreateDraft);
    engine.push_draft(Ok(rental_match()));

    let mut first = task::spawn(session.send("rental agreement"));
    assert_pending!(first.poll());
    assert!(session.is_loading());
    let len = session.transcript_len();

    assert!(matches!(session.send("employment contract").await, Err(SessionError::Busy)));
    assert!(matches!(session.send("/vars").await, Err(SessionError::Busy)));
    assert_eq!(session.transcript_len(), len);

    release.notify_one();
    assert!(first.is_woken());
    let phase = assert_ready!(first.poll()).unwrap();
    assert_eq!(phase, Phase::TemplateProposed);
    assert!(!session.is_loading());
    assert_eq!(engine.count(Call::CreateDraft), 1);
}

#[tokio::test]
async fn test_template_switches_wait_for_query_resolution() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    let release = engine.hold(Call::CreateDraft);
    engine.push_draft(Ok(rental_match()));

    let mut first = task::spawn(session.send("rental agreement"));
    assert_pending!(first.poll());

    assert!(matches!(session.select_alternative("leave_license").await, Err(SessionError::Busy)));
    assert!(matches!(session.open_template("leave_license").await, Err(SessionError::Busy)));
    assert_eq!(engine.count(Call::CreateWithTemplate), 0);

    release.notify_one();
    assert_eq!(assert_ready!(first.poll()).unwrap(), Phase::TemplateProposed);
    assert_eq!(session.draft().unwrap().template_id, "rental_agreement");
}

#[tokio::test]
async fn test_template_switches_wait_for_web_search() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    let release = engine.hold(Call::Search);
    engine.push_draft(Err(low_confidence()));
    engine.push_search(Ok(vec![web_result("r1", "Partnership Deed Format")]));

    let mut first = task::spawn(session.send("partnership deed"));
    assert_pending!(first.poll());
    assert!(session.is_loading());

    assert!(matches!(session.select_alternative("leave_license").await, Err(SessionError::Busy)));
    assert!(matches!(session.open_template("leave_license").await, Err(SessionError::Busy)));
    assert_eq!(engine.count(Call::CreateWithTemplate), 0);

    release.notify_one();
    assert_eq!(assert_ready!(first.poll()).unwrap(), Phase::WebSearching);
    assert!(!session.is_loading());
    assert_eq!(session.web_results().len(), 1);
}

#[tokio::test]
async fn test_double_submit_is_rejected() {
    let engine = ScriptedEngine::new();
    let session = session(&engine);
    engine.push_draft(Ok(rental_match()));
    engine.push_final(Ok(final_draft("# Rental Agreement", 1)));
    session.send("rental agreement").await.unwrap();
    session.confirm_template().unwrap();
    let release = engine.hold(Call::Finalize);

    let mut first = task::spawn(session.submit(rental_answers(), true));
    assert_pending!(first.poll());
    assert!(session.is_generating());

    assert!(matches!(
        session.submit(rental_answers(), true).await,
        Err(SessionError::Generating)
    ));
    // Drafting commands are a separate gate
    assert!(session.send("/vars").await.is_ok());

    release.notify_one();
    assert_eq!(assert_ready!(first.poll()).unwrap(), 1);
    assert_eq!(engine.count(Call::Finalize), 1);
}
