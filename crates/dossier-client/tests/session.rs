//! Session behaviour against an in-memory backend.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use dossier_client::{BackendError, FlushOutcome, Notice, Session, SessionError};
use dossier_doc::{BlockField, Document};
use dossier_types::{BlockKind, ExternalItemId, ImageData, LocalImage, StorageKey};

use common::{FakeBackend, anonymous, backends, config, jpeg, settle_tasks};

fn item() -> ExternalItemId {
    ExternalItemId::new("item-1")
}

/// A document whose first section has one image already uploaded as `key`.
fn doc_with_image(key: &str) -> (Document, dossier_types::BlockId) {
    let mut doc = Document::new(item());
    let section = doc.sections()[0].id();
    let block = doc.add_block(section, BlockKind::Image).unwrap();
    doc.with_image_mut(block, |img| {
        img.storage_key = Some(StorageKey::new(key));
        img.display_url = Some(format!("data:image/jpeg;base64,{key}"));
    })
    .unwrap();
    (doc, block)
}

fn image(session: &Session, block: dossier_types::BlockId) -> ImageData {
    session.document().block(block).unwrap().as_image().unwrap().clone()
}

#[tokio::test(start_paused = true)]
async fn test_removing_section_deletes_each_image_even_when_deletes_fail() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());

    let section = session.add_section();
    let a = session.add_block(section, BlockKind::Image).unwrap();
    let b = session.add_block(section, BlockKind::Image).unwrap();
    assert!(session.select_image(a, jpeg("a.jpg")).unwrap());
    assert!(session.select_image(b, jpeg("b.jpg")).unwrap());
    session.settle().await;

    fake.fail_deletes.store(true, Ordering::SeqCst);
    session.remove_section(section).unwrap();
    settle_tasks().await;

    let mut deleted = fake.deletes();
    deleted.sort();
    assert_eq!(deleted, vec![StorageKey::new("key-1"), StorageKey::new("key-2")]);
    assert_eq!(session.document().sections().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_upload_success_sets_key_and_drops_local_file() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());
    let section = session.document().sections()[0].id();
    let block = session.add_block(section, BlockKind::Image).unwrap();

    assert!(session.select_image(block, jpeg("photo.jpg")).unwrap());
    let preview = image(&session, block);
    assert!(preview.display_url.as_deref().unwrap().starts_with("data:image/jpeg;base64,"));
    assert!(preview.local_file.is_some());
    assert_eq!(session.pending_uploads(), 1);

    session.settle().await;
    let done = image(&session, block);
    assert_eq!(done.storage_key, Some(StorageKey::new("key-1")));
    assert!(done.local_file.is_none());
    assert!(done.display_url.is_some());
    assert_eq!(session.pending_uploads(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_upload_failure_restores_prior_image() {
    let fake = FakeBackend::new();
    fake.fail_uploads.store(true, Ordering::SeqCst);
    let (doc, block) = doc_with_image("old");
    let mut session = Session::with_document(doc, backends(&fake), &config());
    let mut notices = session.subscribe("image.");
    let before = image(&session, block);

    assert!(session.select_image(block, jpeg("new.jpg")).unwrap());
    session.settle().await;

    assert_eq!(image(&session, block), before);
    let got = notices.drain();
    assert_eq!(got.len(), 1);
    assert!(matches!(got[0], Notice::UploadFailed { block: b, .. } if b == block));
    settle_tasks().await;
    assert!(fake.deletes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_replacing_image_deletes_old_key() {
    let fake = FakeBackend::new();
    let (doc, block) = doc_with_image("old");
    let mut session = Session::with_document(doc, backends(&fake), &config());

    assert!(session.select_image(block, jpeg("new.jpg")).unwrap());
    session.settle().await;
    settle_tasks().await;

    assert_eq!(image(&session, block).storage_key, Some(StorageKey::new("key-1")));
    assert_eq!(fake.deletes(), vec![StorageKey::new("old")]);
}

#[tokio::test(start_paused = true)]
async fn test_block_removed_mid_upload_deletes_orphan() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());
    let section = session.document().sections()[0].id();
    let block = session.add_block(section, BlockKind::Image).unwrap();

    assert!(session.select_image(block, jpeg("late.jpg")).unwrap());
    session.remove_block(section, block).unwrap();
    session.settle().await;
    settle_tasks().await;

    assert_eq!(fake.deletes(), vec![StorageKey::new("key-1")]);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_mime_leaves_block_untouched() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());
    let mut notices = session.subscribe("");
    let section = session.document().sections()[0].id();
    let block = session.add_block(section, BlockKind::Image).unwrap();
    let before = image(&session, block);

    let png = LocalImage::new("shot.png", "image/png", vec![0x89, 0x50]);
    assert!(!session.select_image(block, png).unwrap());

    assert_eq!(image(&session, block), before);
    assert_eq!(session.pending_uploads(), 0);
    assert!(matches!(
        notices.drain().as_slice(),
        [Notice::ImageRejected { mime, .. }] if mime == "image/png"
    ));
    assert!(fake.uploads.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_select_image_on_text_block_is_error() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());
    let text = session.document().sections()[0].blocks()[0].id();
    assert!(matches!(
        session.select_image(text, jpeg("x.jpg")),
        Err(SessionError::Doc(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_long_signer_name_warns_once() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());
    let mut notices = session.subscribe("field.");
    let signature = session.document().sections()[0].blocks()[1].id();

    let update = session
        .update_block_field(signature, BlockField::SignerName, &"x".repeat(50))
        .unwrap();
    assert!(update.truncated.is_some());

    let got = notices.drain();
    assert_eq!(
        got,
        vec![Notice::FieldTruncated {
            block: signature,
            field: BlockField::SignerName,
            max: 42
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_explicit_save_requires_text_content() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());
    let mut notices = session.subscribe("save.");

    assert!(matches!(session.save().await, Err(SessionError::TextContentRequired)));
    assert_eq!(notices.drain(), vec![Notice::TextContentRequired]);
    assert!(fake.saves().is_empty());

    let text = session.document().sections()[0].blocks()[0].id();
    let _ = session.update_block_field(text, BlockField::Body, "Findings").unwrap();
    assert_eq!(session.save().await.unwrap(), FlushOutcome::Saved);
    assert_eq!(fake.saves().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_edits_debounce_into_one_flush() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());

    session.set_title("one");
    tokio::time::sleep(Duration::from_millis(300)).await;
    session.set_title("two");
    tokio::time::sleep(Duration::from_millis(300)).await;
    session.set_title("three");
    tokio::time::sleep(Duration::from_millis(2100)).await;

    let saves = fake.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].title, "three");
    drop(session);
}

#[tokio::test(start_paused = true)]
async fn test_exit_flush_delivered_after_session_dropped() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());
    session.set_title("Final");

    session.exit();
    settle_tasks().await;
    tokio::time::sleep(Duration::from_secs(10)).await;

    let saves = fake.saves();
    assert_eq!(saves.len(), 1, "exactly the exit flush; the debounced one died with the session");
    assert_eq!(saves[0].title, "Final");
}

#[tokio::test(start_paused = true)]
async fn test_open_without_credential_fails() {
    let fake = FakeBackend::new();
    let err = Session::open(item(), anonymous(&fake), &config()).await.unwrap_err();
    assert!(matches!(err, SessionError::Backend(BackendError::Unauthenticated)));
}

#[tokio::test(start_paused = true)]
async fn test_open_missing_report_starts_fresh() {
    let fake = FakeBackend::new();
    let session = Session::open(item(), backends(&fake), &config()).await.unwrap();
    assert_eq!(session.document().sections().len(), 1);
    assert_eq!(session.document().external_item_id(), &item());
}

#[tokio::test(start_paused = true)]
async fn test_open_round_trips_saved_report() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());
    session.set_code("PL-1");
    let section = session.document().sections()[0].id();
    let block = session.add_block(section, BlockKind::Image).unwrap();
    session.select_image(block, jpeg("p.jpg")).unwrap();
    session.settle().await;
    assert_eq!(session.flush_now().await, FlushOutcome::Saved);
    let saved = session.document().without_display();
    session.exit();
    settle_tasks().await;

    let reopened = Session::open(item(), backends(&fake), &config()).await.unwrap();
    assert_eq!(reopened.document().without_display(), saved);
    let img = reopened.document().block(block).unwrap().as_image().unwrap();
    assert_eq!(img.display_url.as_deref(), Some("data:image/jpeg;base64,key-1"));
}

#[tokio::test(start_paused = true)]
async fn test_failed_upload_keeps_resize_made_meanwhile() {
    let fake = FakeBackend::new();
    fake.fail_uploads.store(true, Ordering::SeqCst);
    let (doc, block) = doc_with_image("old");
    let mut session = Session::with_document(doc, backends(&fake), &config());
    let before = image(&session, block);

    assert!(session.select_image(block, jpeg("new.jpg")).unwrap());
    session.set_image_size(block, 300, 200).unwrap();
    session.settle().await;

    let after = image(&session, block);
    assert_eq!((after.width, after.height), (300, 200));
    assert_eq!(after.storage_key, before.storage_key);
    assert_eq!(after.display_url, before.display_url);
    assert!(after.local_file.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_page_hidden_flushes_and_editing_continues() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());

    session.set_title("draft");
    session.page_hidden();
    settle_tasks().await;
    let saves = fake.saves();
    assert_eq!(saves.len(), 1);
    assert_eq!(saves[0].title, "draft");

    session.set_title("revised");
    tokio::time::sleep(Duration::from_millis(2100)).await;
    let saves = fake.saves();
    assert_eq!(saves.len(), 2, "debounce still runs after a hide");
    assert_eq!(saves[1].title, "revised");

    session.set_title("after");
    assert_eq!(session.flush_now().await, FlushOutcome::Saved);
    assert_eq!(fake.stored().unwrap().title, "after");
}

#[tokio::test(start_paused = true)]
async fn test_exit_flush_races_debounced_flush_in_flight() {
    let fake = FakeBackend::new();
    *fake.save_latency.lock() = Some(Duration::from_millis(500));
    let mut session = Session::create(item(), backends(&fake), &config());

    session.set_title("stale");
    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(fake.saves().is_empty(), "debounced flush still on the wire");

    session.set_title("final");
    session.exit();
    tokio::time::sleep(Duration::from_secs(5)).await;

    let saves = fake.saves();
    assert!((1..=2).contains(&saves.len()));
    assert_eq!(saves.last().unwrap().title, "final");
    assert_eq!(fake.stored().unwrap().title, "final");
}

#[tokio::test(start_paused = true)]
async fn test_mime_check_ignores_case_and_whitespace() {
    let fake = FakeBackend::new();
    let mut session = Session::create(item(), backends(&fake), &config());
    let section = session.document().sections()[0].id();
    let block = session.add_block(section, BlockKind::Image).unwrap();

    let shouty = LocalImage::new("scan.JPG", " IMAGE/JPG ", vec![0xff, 0xd8]);
    assert!(session.select_image(block, shouty).unwrap());
    session.settle().await;
    assert_eq!(image(&session, block).storage_key, Some(StorageKey::new("key-1")));
}
