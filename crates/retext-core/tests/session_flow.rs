//! Edit session flows against a scripted decoder and a recording mutator
//!
//! Run with: cargo test -p retext-core --test session_flow

mod common;

use common::{item, Call, FailAt, FakeDecoder, FakePage, RecordingMutator, SAVED_MARKER};
use pretty_assertions::assert_eq;
use retext_core::backend::{RectSpec, TextSpec};
use retext_core::color::Rgb;
use retext_core::config::EditorConfig;
use retext_core::coords::PageBox;
use retext_core::error::EditorError;
use retext_core::fonts::StandardFont;
use retext_core::fragment::FragmentId;
use retext_core::loader::decode_document;
use retext_core::overlay::EditKey;
use retext_core::session::{EditSession, LoadOutcome, SessionState};

const BYTES: &[u8] = b"%PDF-1.7 scripted";

fn session() -> EditSession {
    EditSession::new(EditorConfig::default()).unwrap()
}

fn hello_decoder() -> FakeDecoder {
    FakeDecoder::single(vec![item("Hello", 12.0, 100.0, 700.0)])
}

async fn loaded(decoder: &FakeDecoder) -> EditSession {
    let mut session = session();
    session.upload(decoder, BYTES).await.unwrap();
    session
}

fn ids(session: &EditSession) -> Vec<FragmentId> {
    session.registry().unwrap().iter().map(|f| f.id()).collect()
}

fn texts(session: &EditSession) -> Vec<String> {
    session
        .registry()
        .unwrap()
        .iter()
        .map(|f| f.current_text().to_string())
        .collect()
}

fn cover(x: f64, y: f64, width: f64, height: f64) -> Call {
    Call::Rect {
        page: 1,
        rect: RectSpec {
            x,
            y,
            width,
            height,
            color: Rgb::WHITE,
        },
    }
}

fn text(text: &str, x: f64, y: f64, size: f64) -> Call {
    Call::Text {
        page: 1,
        text: text.to_string(),
        spec: TextSpec {
            x,
            y,
            size,
            font: StandardFont::Helvetica,
            color: Rgb::BLACK,
        },
    }
}

// ============ Scenarios ============

#[tokio::test]
async fn test_hello_scenario() {
    let mut session = loaded(&hello_decoder()).await;
    assert_eq!(session.state(), SessionState::Ready);

    let layout = &session.page_layouts()[0];
    assert_eq!((layout.viewport_width, layout.viewport_height), (1500.0, 2100.0));

    let overlay = session.overlay_elements();
    assert_eq!(overlay.len(), 1);
    assert_eq!(overlay[0].text, "Hello");
    assert_eq!((overlay[0].left, overlay[0].top), (150.0, 1032.0));
    assert_eq!(overlay[0].font_size, 18.0);
    assert_eq!(overlay[0].scale_x, 1.0);
    assert_eq!(overlay[0].font_family, "g_d0_f1");

    let id = ids(&session)[0];
    assert!(session.commit_edit(id, "Hi"));
    assert_eq!(session.overlay_elements()[0].text, "Hi");

    let mutator = RecordingMutator::new();
    let artifact = session.export(&mutator).await.unwrap();

    assert_eq!(artifact.file_name, "edited-document.pdf");
    assert_eq!(artifact.content_type(), "application/pdf");
    assert_eq!(artifact.bytes, SAVED_MARKER.to_vec());
    assert_eq!(
        mutator.draws(),
        vec![cover(98.0, 698.0, 34.0, 16.0), text("Hi", 100.0, 700.0, 12.0)]
    );
    assert_eq!(session.state(), SessionState::Ready);
}

#[tokio::test]
async fn test_only_the_edited_fragment_is_exported() {
    let decoder = FakeDecoder::single(vec![
        item("Hello", 12.0, 100.0, 700.0),
        item("World", 12.0, 100.0, 600.0),
    ]);
    let mut session = loaded(&decoder).await;
    let second = ids(&session)[1];

    session.commit_edit(second, "Earth");
    let mutator = RecordingMutator::new();
    session.export(&mutator).await.unwrap();

    assert_eq!(
        mutator.draws(),
        vec![cover(98.0, 598.0, 34.0, 16.0), text("Earth", 100.0, 600.0, 12.0)]
    );
    assert_eq!(texts(&session), vec!["Hello", "Earth"]);
}

#[tokio::test]
async fn test_offset_media_box_exports_at_original_position() {
    let media_box = PageBox::new(100.0, 200.0, 712.0, 992.0);
    let decoder = FakeDecoder::with_pages(vec![FakePage {
        media_box,
        items: vec![item("Hello", 12.0, 300.0, 500.0)],
    }]);
    let mut session = loaded(&decoder).await;
    assert_eq!(
        (session.overlay_elements()[0].left, session.overlay_elements()[0].top),
        (300.0, 720.0)
    );

    let id = ids(&session)[0];
    session.commit_edit(id, "Hi");
    let mut mutator = RecordingMutator::new();
    mutator.page_boxes = vec![media_box];
    session.export(&mutator).await.unwrap();

    assert_eq!(
        mutator.draws(),
        vec![cover(298.0, 498.0, 34.0, 16.0), text("Hi", 300.0, 500.0, 12.0)]
    );
}

#[tokio::test]
async fn test_superseded_upload_is_discarded() {
    let decoder_a = FakeDecoder::single(vec![item("from A", 12.0, 10.0, 10.0)]);
    let decoder_b = FakeDecoder::single(vec![item("from B", 12.0, 10.0, 10.0)]);
    let mut session = session();

    let ticket_a = session.begin_upload(b"A".to_vec());
    let ticket_b = session.begin_upload(b"B".to_vec());
    let scale = session.render_scale();
    let result_a = decode_document(&decoder_a, &ticket_a, scale).await;
    let result_b = decode_document(&decoder_b, &ticket_b, scale).await;

    // B resolves first, then the stale A result arrives
    assert_eq!(session.complete_load(ticket_b, result_b).unwrap(), LoadOutcome::Applied);
    assert_eq!(session.complete_load(ticket_a, result_a).unwrap(), LoadOutcome::Superseded);

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.generation(), 2);
    assert_eq!(texts(&session), vec!["from B"]);
    assert_eq!(session.document_bytes(), Some(&b"B"[..]));
}

#[tokio::test]
async fn test_stale_result_arriving_first_keeps_loading() {
    let decoder_a = FakeDecoder::single(vec![item("from A", 12.0, 10.0, 10.0)]);
    let decoder_b = FakeDecoder::single(vec![item("from B", 12.0, 10.0, 10.0)]);
    let mut session = session();

    let ticket_a = session.begin_upload(b"A".to_vec());
    let ticket_b = session.begin_upload(b"B".to_vec());
    let scale = session.render_scale();

    let result_a = decode_document(&decoder_a, &ticket_a, scale).await;
    assert_eq!(session.complete_load(ticket_a, result_a).unwrap(), LoadOutcome::Superseded);
    assert_eq!(session.state(), SessionState::Loading);
    assert!(session.registry().is_none());

    let result_b = decode_document(&decoder_b, &ticket_b, scale).await;
    session.complete_load(ticket_b, result_b).unwrap();
    assert_eq!(texts(&session), vec!["from B"]);
}

// ============ Failures ============

#[tokio::test]
async fn test_decode_failure_leaves_no_document() {
    let mut session = session();
    let err = session.upload(&FakeDecoder::corrupt(), BYTES).await.unwrap_err();

    assert!(matches!(err, EditorError::DecodeFailure(_)));
    assert_eq!(err.user_message(), "Failed to load PDF. Please try another file.");
    assert_eq!(session.state(), SessionState::Error);
    assert!(session.registry().is_none());
    assert!(session.page_layouts().is_empty());
    assert!(session.overlay_elements().is_empty());
    assert!(session.last_error().is_some());
}

#[tokio::test]
async fn test_failure_on_later_page_discards_earlier_pages() {
    let mut decoder = FakeDecoder::with_pages(vec![
        FakePage::new(vec![item("page one", 12.0, 10.0, 10.0)]),
        FakePage::new(vec![item("page two", 12.0, 10.0, 10.0)]),
    ]);
    decoder.fail_on_page = Some(2);

    let mut session = session();
    let err = session.upload(&decoder, BYTES).await.unwrap_err();

    assert!(err.to_string().contains("page 2"));
    assert_eq!(session.state(), SessionState::Error);
    assert!(session.registry().is_none());
}

#[tokio::test]
async fn test_new_upload_recovers_from_error() {
    let mut session = session();
    let _ = session.upload(&FakeDecoder::corrupt(), BYTES).await;
    session.upload(&hello_decoder(), BYTES).await.unwrap();

    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.last_error().is_none());
    assert_eq!(texts(&session), vec!["Hello"]);
}

#[tokio::test]
async fn test_export_requires_ready() {
    let mutator = RecordingMutator::new();
    let mut session = session();

    let err = session.export(&mutator).await.unwrap_err();
    assert!(matches!(err, EditorError::NotReady(SessionState::Empty)));

    session.begin_upload(BYTES);
    let err = session.export(&mutator).await.unwrap_err();
    assert!(matches!(err, EditorError::NotReady(SessionState::Loading)));
    assert_eq!(err.user_message(), "The document is still loading.");

    let _ = session.upload(&FakeDecoder::corrupt(), BYTES).await;
    let err = session.export(&mutator).await.unwrap_err();
    assert!(matches!(err, EditorError::NotReady(SessionState::Error)));

    assert!(mutator.calls().is_empty());
}

#[tokio::test]
async fn test_export_failure_keeps_edits() {
    let mut session = loaded(&hello_decoder()).await;
    let id = ids(&session)[0];
    session.commit_edit(id, "Hi");

    for at in [FailAt::Load, FailAt::Draw, FailAt::Save] {
        let err = session.export(&RecordingMutator::failing(at)).await.unwrap_err();
        assert!(matches!(err, EditorError::ExportFailure(_)), "{:?}", at);
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.dirty_count(), 1);
        assert_eq!(texts(&session), vec!["Hi"]);
    }

    // Retry succeeds with the same edits
    let mutator = RecordingMutator::new();
    session.export(&mutator).await.unwrap();
    assert_eq!(mutator.draws().len(), 2);
    assert!(session.last_error().is_none());
}

// ============ Export properties ============

#[tokio::test]
async fn test_export_without_edits_returns_original_bytes() {
    let mut session = loaded(&hello_decoder()).await;
    let mutator = RecordingMutator::new();

    let artifact = session.export(&mutator).await.unwrap();
    assert_eq!(artifact.bytes, BYTES.to_vec());
    assert!(mutator.calls().is_empty());

    // Editing back to the original text is not an edit
    let id = ids(&session)[0];
    session.commit_edit(id, "Changed");
    session.commit_edit(id, "Hello");
    let artifact = session.export(&mutator).await.unwrap();
    assert_eq!(artifact.bytes, BYTES.to_vec());
    assert!(mutator.calls().is_empty());
}

#[tokio::test]
async fn test_blank_edit_erases_the_run() {
    let mut session = loaded(&hello_decoder()).await;
    let id = ids(&session)[0];
    session.commit_edit(id, "   ");

    let mutator = RecordingMutator::new();
    session.export(&mutator).await.unwrap();

    assert_eq!(mutator.draws(), vec![cover(98.0, 698.0, 34.0, 16.0)]);
    assert!(!mutator.calls().iter().any(|c| matches!(c, Call::Embed(_))));
}

#[tokio::test]
async fn test_font_is_embedded_once() {
    let decoder = FakeDecoder::single(vec![
        item("Hello", 12.0, 100.0, 700.0),
        item("World", 12.0, 100.0, 600.0),
    ]);
    let mut session = loaded(&decoder).await;
    for id in ids(&session) {
        session.commit_edit(id, "x");
    }

    let mutator = RecordingMutator::new();
    session.export(&mutator).await.unwrap();
    let embeds = mutator
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::Embed(_)))
        .count();
    assert_eq!(embeds, 1);
}

#[tokio::test]
async fn test_stale_id_is_ignored() {
    let mut session = loaded(&hello_decoder()).await;
    let stale = ids(&session)[0];

    session.upload(&hello_decoder(), BYTES).await.unwrap();
    assert!(!session.commit_edit(stale, "Hi"));
    assert!(!session.activate(stale));
    assert_eq!(session.dirty_count(), 0);
    assert_ne!(ids(&session)[0], stale);
}

// ============ Inline editing ============

#[tokio::test]
async fn test_inline_edit_commit_cancel_blur() {
    let mut session = loaded(&hello_decoder()).await;
    let id = ids(&session)[0];

    assert!(session.activate(id));
    assert_eq!(session.editing().map(|e| e.draft.as_str()), Some("Hello"));
    assert!(session.overlay_elements()[0].editing);

    session.update_draft("Howdy");
    session.handle_key(EditKey::Cancel);
    assert!(session.editing().is_none());
    assert_eq!(texts(&session), vec!["Hello"]);
    assert_eq!(session.dirty_count(), 0);

    session.activate(id);
    session.update_draft("Hey");
    session.handle_key(EditKey::Commit);
    assert_eq!(texts(&session), vec!["Hey"]);
    assert!(!session.overlay_elements()[0].editing);

    session.activate(id);
    session.update_draft("Yo");
    session.blur();
    assert_eq!(texts(&session), vec!["Yo"]);
}

#[tokio::test]
async fn test_activating_another_element_commits_the_open_edit() {
    let decoder = FakeDecoder::single(vec![
        item("Hello", 12.0, 100.0, 700.0),
        item("World", 12.0, 100.0, 600.0),
    ]);
    let mut session = loaded(&decoder).await;
    let ids = ids(&session);
    let (first, second) = (ids[0], ids[1]);

    session.activate(first);
    session.update_draft("Goodbye");
    session.activate(second);

    assert_eq!(session.editing().map(|e| e.id), Some(second));
    assert_eq!(texts(&session), vec!["Goodbye", "World"]);
}

#[tokio::test]
async fn test_export_commits_the_open_editor() {
    let mut session = loaded(&hello_decoder()).await;
    let id = ids(&session)[0];

    session.activate(id);
    session.update_draft("Hi");
    let mutator = RecordingMutator::new();
    session.export(&mutator).await.unwrap();

    assert!(session.editing().is_none());
    assert_eq!(
        mutator.draws(),
        vec![cover(98.0, 698.0, 34.0, 16.0), text("Hi", 100.0, 700.0, 12.0)]
    );
}

#[tokio::test]
async fn test_reupload_drops_open_editor() {
    let mut session = loaded(&hello_decoder()).await;
    let id = ids(&session)[0];
    session.activate(id);
    session.update_draft("unsaved");

    session.upload(&hello_decoder(), BYTES).await.unwrap();
    assert!(session.editing().is_none());
    assert_eq!(texts(&session), vec!["Hello"]);
}
