//! Clip orchestration against in-memory collaborators.

mod common;

use std::time::Duration;

use common::{words, Harness, RecordingPublisher};
use subgen_models::{Clip, ClipStatus, SUBTITLE_GENERATOR_MESSAGE_TYPE};
use subgen_storage::{audio_key, subtitle_key};
use subgen_worker::{ClipOutcome, WorkerError};

fn clip(chunks: &[&str]) -> Clip {
    Clip::new("42", "7", chunks.iter().map(|c| c.to_string()).collect())
}

#[tokio::test]
async fn test_all_chunks_succeed_in_chunk_order() {
    let harness = Harness::new();
    let mut clip = clip(&["ep_3.mp3", "ep_1.mp3", "ep_2.mp3"]);
    harness.seed_audio(&clip);

    // Completion order: 2, 3, 1
    harness.transcriber.delay("ep_1.mp3", Duration::from_millis(120));
    harness.transcriber.delay("ep_3.mp3", Duration::from_millis(60));
    harness.transcriber.words("ep_2.mp3", words(7));

    let outcome = harness.orchestrator(5).process(&mut clip).await.unwrap();

    assert_eq!(outcome, ClipOutcome::Completed { subtitles: 3 });
    assert_eq!(clip.status, ClipStatus::SubtitleGeneratorComplete);
    assert_eq!(clip.subtitles(), ["ep_1.srt", "ep_2.srt", "ep_3.srt"]);

    let published = harness.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].1, SUBTITLE_GENERATOR_MESSAGE_TYPE);
    assert_eq!(published[0].0, clip);

    let srt = harness
        .store
        .get(&subtitle_key("7", "42", "ep_2.srt"))
        .expect("subtitle uploaded");
    let srt = String::from_utf8(srt).unwrap();
    assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:00,600\nw1 w2 w3\nw4 w5 w6\n\n"));
    assert!(srt.ends_with("2\n00:00:00,600 --> 00:00:00,700\n\nw7\n\n"));
}

#[tokio::test]
async fn test_existing_subtitles_are_kept() {
    let harness = Harness::new();
    let mut clip = clip(&["ep_1.mp3"]);
    clip.original_video.subtitles.push("manual.srt".to_string());
    harness.seed_audio(&clip);

    harness.orchestrator(5).process(&mut clip).await.unwrap();

    assert_eq!(clip.subtitles(), ["manual.srt", "ep_1.srt"]);
}

#[tokio::test]
async fn test_one_download_failure_fails_the_clip() {
    let harness = Harness::new();
    let mut clip = clip(&["ep_1.mp3", "ep_2.mp3", "ep_3.mp3"]);
    harness.seed_audio(&clip);
    harness.store.fail_download(&audio_key("7", "42", "ep_2.mp3"));

    let outcome = harness.orchestrator(5).process(&mut clip).await.unwrap();

    assert_eq!(
        outcome,
        ClipOutcome::Failed {
            failed_chunks: 1,
            total_chunks: 3
        }
    );
    assert_eq!(clip.status, ClipStatus::SubtitleGeneratorError);
    assert!(clip.subtitles().is_empty());

    // The other chunks still ran to completion
    assert_eq!(harness.transcriber.calls(), 2);

    let published = harness.publisher.published();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].0.status, ClipStatus::SubtitleGeneratorError);
    assert!(published[0].0.subtitles().is_empty());
}

#[tokio::test]
async fn test_transcription_and_upload_failures_fail_the_clip() {
    let harness = Harness::new();
    let mut clip = clip(&["ep_1.mp3", "ep_2.mp3", "ep_3.mp3"]);
    harness.seed_audio(&clip);
    harness.transcriber.fail("ep_1.mp3", "audio too short");
    harness.store.fail_upload(&subtitle_key("7", "42", "ep_3.srt"));

    let outcome = harness.orchestrator(5).process(&mut clip).await.unwrap();

    assert_eq!(
        outcome,
        ClipOutcome::Failed {
            failed_chunks: 2,
            total_chunks: 3
        }
    );
    assert_eq!(harness.publisher.published().len(), 1);
}

#[tokio::test]
async fn test_empty_transcript_fails_the_clip() {
    let harness = Harness::new();
    let mut clip = clip(&["ep_1.mp3", "ep_2.mp3"]);
    harness.seed_audio(&clip);
    harness.transcriber.words("ep_2.mp3", vec![]);

    let outcome = harness.orchestrator(5).process(&mut clip).await.unwrap();

    assert_eq!(outcome.status(), ClipStatus::SubtitleGeneratorError);
    assert!(harness.store.get(&subtitle_key("7", "42", "ep_2.srt")).is_none());
}

#[tokio::test]
async fn test_panicking_chunk_fails_the_clip() {
    let harness = Harness::new();
    let mut clip = clip(&["ep_1.mp3", "ep_2.mp3"]);
    harness.seed_audio(&clip);
    harness.transcriber.panic_on("ep_1.mp3");

    let outcome = harness.orchestrator(5).process(&mut clip).await.unwrap();

    assert_eq!(
        outcome,
        ClipOutcome::Failed {
            failed_chunks: 1,
            total_chunks: 2
        }
    );
    assert_eq!(harness.publisher.published().len(), 1);
}

#[tokio::test]
async fn test_publish_failure_on_error_path_is_returned() {
    let harness = Harness::with_publisher(RecordingPublisher::failing());
    let mut clip = clip(&["ep_1.mp3", "ep_2.mp3"]);
    harness.seed_audio(&clip);
    harness.store.fail_download(&audio_key("7", "42", "ep_2.mp3"));

    let result = harness.orchestrator(5).process(&mut clip).await;

    assert!(matches!(result, Err(WorkerError::Publish(_))));
    assert_eq!(clip.status, ClipStatus::SubtitleGeneratorError);
}

#[tokio::test]
async fn test_publish_failure_on_success_path_is_returned() {
    let harness = Harness::with_publisher(RecordingPublisher::failing());
    let mut clip = clip(&["ep_1.mp3"]);
    harness.seed_audio(&clip);

    let result = harness.orchestrator(5).process(&mut clip).await;

    assert!(matches!(result, Err(WorkerError::Publish(_))));
}

#[tokio::test]
async fn test_zero_chunks_complete_with_no_subtitles() {
    let harness = Harness::new();
    let mut clip = clip(&[]);

    let outcome = harness.orchestrator(5).process(&mut clip).await.unwrap();

    assert_eq!(outcome, ClipOutcome::Completed { subtitles: 0 });
    assert_eq!(clip.status, ClipStatus::SubtitleGeneratorComplete);
    assert_eq!(harness.publisher.published().len(), 1);
    assert_eq!(harness.transcriber.calls(), 0);
}

#[tokio::test]
async fn test_concurrency_never_exceeds_bound() {
    let harness = Harness::new();
    let chunks: Vec<String> = (1..=12).map(|i| format!("ep_{}.mp3", i)).collect();
    let mut clip = Clip::new("42", "7", chunks);
    harness.seed_audio(&clip);
    harness.transcriber.default_delay(Duration::from_millis(30));

    let outcome = harness.orchestrator(3).process(&mut clip).await.unwrap();

    assert_eq!(outcome, ClipOutcome::Completed { subtitles: 12 });
    assert!(harness.transcriber.peak_concurrency() <= 3);
    assert!(harness.transcriber.peak_concurrency() >= 2);
    assert_eq!(clip.subtitles()[0], "ep_1.srt");
    assert_eq!(clip.subtitles()[11], "ep_12.srt");
}

#[tokio::test]
async fn test_staging_files_removed_after_success_and_failure() {
    let harness = Harness::new();
    let mut ok_clip = clip(&["ep_1.mp3", "ep_2.mp3"]);
    harness.seed_audio(&ok_clip);
    harness.orchestrator(5).process(&mut ok_clip).await.unwrap();
    assert!(harness.staged_files().is_empty());

    let mut failing = Clip::new("43", "7", vec!["ep_1.mp3".into(), "ep_2.mp3".into()]);
    harness.seed_audio(&failing);
    harness.transcriber.fail("ep_2.mp3", "boom");
    harness.orchestrator(5).process(&mut failing).await.unwrap();
    assert!(harness.staged_files().is_empty());
    assert!(!harness.work_dir.path().join("7").join("43").exists());
}

#[tokio::test]
async fn test_unusable_chunk_reference_fails_before_download() {
    let harness = Harness::new();
    let mut clip = clip(&["ep_1.mp3", "audios/"]);
    harness.seed_audio(&clip);

    let outcome = harness.orchestrator(5).process(&mut clip).await.unwrap();

    assert_eq!(outcome.status(), ClipStatus::SubtitleGeneratorError);
    assert_eq!(harness.transcriber.calls(), 1);
}

#[tokio::test]
async fn test_chunks_sharing_a_base_name_do_not_clobber_each_other() {
    let harness = Harness::new();
    let mut clip = clip(&["ep_1.mp3", "ep_1.wav"]);
    harness.seed_audio(&clip);
    harness.transcriber.words("ep_1.mp3", words(1));
    harness.transcriber.words("ep_1.wav", words(2));
    harness.transcriber.delay("ep_1.wav", Duration::from_millis(30));

    // The first upload is still pending when the second chunk finishes
    harness.store.delay_next_upload(Duration::from_millis(150));

    let outcome = harness.orchestrator(5).process(&mut clip).await.unwrap();

    assert_eq!(outcome, ClipOutcome::Completed { subtitles: 2 });
    assert_eq!(clip.subtitles(), ["ep_1.srt", "ep_1.srt"]);
    assert_eq!(harness.publisher.published().len(), 1);
    assert!(harness
        .store
        .get(&subtitle_key("7", "42", "ep_1.srt"))
        .is_some());
    assert!(harness.staged_files().is_empty());
}

#[tokio::test]
async fn test_duplicate_chunk_reference_is_staged_twice() {
    let harness = Harness::new();
    let mut clip = clip(&["ep_1.mp3", "ep_1.mp3"]);
    harness.seed_audio(&clip);
    harness.store.delay_next_upload(Duration::from_millis(100));

    let outcome = harness.orchestrator(5).process(&mut clip).await.unwrap();

    assert_eq!(outcome, ClipOutcome::Completed { subtitles: 2 });
    assert_eq!(harness.transcriber.calls(), 2);
    assert!(harness.staged_files().is_empty());
}
