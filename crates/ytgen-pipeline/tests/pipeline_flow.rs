//! End-to-end pipeline tests over mocked external services.
//!
//! Exercises the full ingestion-to-generation flow: register asset,
//! transcribe by tier, generate drafts with peer context, refine through
//! chat, and invalidate on transcript change.

use std::sync::Arc;

use ytgen_ai::{MockImageEditor, MockTextGenerator, MockTranscriber};
use ytgen_media::PlannerConfig;
use ytgen_models::{Agent, AgentStatus, AgentType, AssetId, TranscriptionStatus, VideoAsset};
use ytgen_pipeline::{
    AudioArtifact, GenerationOrchestrator, MockAudioExtractor, RefinementEngine,
    TranscriptionScheduler,
};
use ytgen_storage::MockBlobStore;
use ytgen_store::{AgentRepository, AssetRepository, ProfileRepository};

const MB: u64 = 1024 * 1024;

struct Harness {
    assets: AssetRepository,
    agents: AgentRepository,
    scheduler: TranscriptionScheduler,
    orchestrator: GenerationOrchestrator,
    refiner: RefinementEngine,
}

fn write_temp_video() -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("ytgen-e2e-{}.mp4", uuid::Uuid::new_v4()));
    std::fs::write(&path, b"video bytes").unwrap();
    path
}

fn harness(
    transcriber: MockTranscriber,
    extractor: MockAudioExtractor,
    textgen: MockTextGenerator,
    blob: MockBlobStore,
) -> Harness {
    let assets = AssetRepository::new();
    let agents = AgentRepository::new();
    let profiles = ProfileRepository::new();
    let blob: Arc<dyn ytgen_storage::BlobStore> = Arc::new(blob);

    let scheduler = TranscriptionScheduler::new(
        assets.clone(),
        agents.clone(),
        Arc::clone(&blob),
        Arc::new(transcriber),
        Arc::new(extractor),
        PlannerConfig::default(),
    );
    let orchestrator = GenerationOrchestrator::new(
        assets.clone(),
        agents.clone(),
        profiles,
        Arc::new(textgen),
        Arc::new(MockImageEditor::new()),
        blob,
    );
    let refiner = RefinementEngine::new(orchestrator.clone());

    Harness {
        assets,
        agents,
        scheduler,
        orchestrator,
        refiner,
    }
}

async fn seed_asset(h: &Harness, size_bytes: u64) -> (AssetId, Vec<Agent>) {
    let asset = VideoAsset::new("alice", "videos/e2e.mp4", "e2e.mp4", size_bytes);
    let asset_id = asset.id.clone();
    h.assets.create(asset).await.unwrap();

    let mut agents = Vec::new();
    for agent_type in AgentType::all() {
        let agent = Agent::new("alice", asset_id.clone(), agent_type);
        h.agents.create(agent.clone()).await.unwrap();
        agents.push(agent);
    }
    (asset_id, agents)
}

#[tokio::test]
async fn test_mid_size_video_transcribes_through_audio_extraction() {
    let mut blob = MockBlobStore::new();
    blob.expect_download_to_temp()
        .returning(|_| Ok(write_temp_video()));

    let mut extractor = MockAudioExtractor::new();
    extractor.expect_extract().returning(|_| {
        Ok(AudioArtifact {
            bytes: b"aac audio".to_vec(),
            file_name: "audio.m4a".to_string(),
            mime_type: "audio/mp4".to_string(),
        })
    });

    let mut transcriber = MockTranscriber::new();
    transcriber
        .expect_transcribe()
        .withf(|_, name, mime| name == "audio.m4a" && mime == "audio/mp4")
        .returning(|_, _, _| Ok("today we cover the borrow checker".to_string()));

    let h = harness(transcriber, extractor, MockTextGenerator::new(), blob);
    let (asset_id, _) = seed_asset(&h, 40 * MB).await;

    let handle = h.scheduler.submit("alice", &asset_id).await.unwrap();
    handle.await.unwrap();

    let asset = h.assets.get("alice", &asset_id).await.unwrap();
    assert_eq!(asset.transcription_status, TranscriptionStatus::Completed);
    assert_eq!(
        asset.transcript.as_deref(),
        Some("today we cover the borrow checker")
    );
    assert!(asset.transcription_error.is_none());
}

#[tokio::test]
async fn test_transcribe_then_generate_with_peer_context() {
    let mut blob = MockBlobStore::new();
    blob.expect_download_to_temp()
        .returning(|_| Ok(write_temp_video()));

    let mut transcriber = MockTranscriber::new();
    transcriber
        .expect_transcribe()
        .returning(|_, _, _| Ok("lifetimes are scopes, not magic".to_string()));

    let mut textgen = MockTextGenerator::new();
    textgen
        .expect_generate()
        .withf(|req| req.user_prompt.contains("lifetimes are scopes"))
        .returning(|req| {
            if req.system_prompt.contains("title") {
                Ok("Lifetimes Without Tears".to_string())
            } else {
                // The description prompt must carry the title peer
                assert!(req.user_prompt.contains("TITLE: Lifetimes Without Tears"));
                Ok("A calm walk through lifetimes.".to_string())
            }
        });

    let h = harness(transcriber, MockAudioExtractor::new(), textgen, blob);
    let (asset_id, agents) = seed_asset(&h, 5 * MB).await;
    let title_id = agents[0].id.clone();
    let description_id = agents[1].id.clone();

    h.scheduler
        .submit("alice", &asset_id)
        .await
        .unwrap()
        .await
        .unwrap();

    let title = h.orchestrator.generate("alice", &title_id).await.unwrap();
    assert_eq!(title.status, AgentStatus::Ready);

    h.agents
        .connect_peers("alice", &description_id, vec![title_id])
        .await
        .unwrap();
    let description = h
        .orchestrator
        .generate("alice", &description_id)
        .await
        .unwrap();
    assert_eq!(description.draft, "A calm walk through lifetimes.");
}

#[tokio::test]
async fn test_manual_transcript_invalidates_all_drafts() {
    let mut textgen = MockTextGenerator::new();
    textgen
        .expect_generate()
        .returning(|_| Ok("Draft before the transcript changed".to_string()));

    let h = harness(
        MockTranscriber::new(),
        MockAudioExtractor::new(),
        textgen,
        MockBlobStore::new(),
    );
    let (asset_id, agents) = seed_asset(&h, 5 * MB).await;

    // Give the video a transcript and a generated draft
    h.assets
        .complete_transcription("alice", &asset_id, "original transcript".into())
        .await
        .unwrap();
    h.orchestrator
        .generate("alice", &agents[0].id)
        .await
        .unwrap();

    let reset = h
        .scheduler
        .set_manual_transcript("alice", &asset_id, "corrected transcript".into())
        .await
        .unwrap();
    assert_eq!(reset, 4);

    for agent in &agents {
        let stored = h.agents.get("alice", &agent.id).await.unwrap();
        assert_eq!(stored.draft, "");
        assert_eq!(stored.status, AgentStatus::Idle);
    }

    let asset = h.assets.get("alice", &asset_id).await.unwrap();
    assert!(asset.transcript_manual);
    assert_eq!(asset.transcript.as_deref(), Some("corrected transcript"));
}

#[tokio::test]
async fn test_refinement_marker_updates_and_fallback_preserves() {
    let mut textgen = MockTextGenerator::new();
    let mut call = 0;
    textgen.expect_generate().returning_st(move |req| {
        call += 1;
        match call {
            1 => Ok("First Draft Title".to_string()),
            2 => Ok("Tightened.\n\nUPDATED TITLE: Better Title".to_string()),
            _ => {
                // Refinement prompts carry the conversation so far
                assert!(req.user_prompt.contains("User: shorter"));
                Ok("It already reads well, I would not change it.".to_string())
            }
        }
    });

    let h = harness(
        MockTranscriber::new(),
        MockAudioExtractor::new(),
        textgen,
        MockBlobStore::new(),
    );
    let (asset_id, agents) = seed_asset(&h, 5 * MB).await;
    h.assets
        .complete_transcription("alice", &asset_id, "a transcript".into())
        .await
        .unwrap();
    let title_id = agents[0].id.clone();

    h.orchestrator.generate("alice", &title_id).await.unwrap();

    let first = h.refiner.refine("alice", &title_id, "shorter").await.unwrap();
    assert!(first.draft_updated);
    assert_eq!(first.draft, "Better Title");

    let second = h
        .refiner
        .refine("alice", &title_id, "any other ideas?")
        .await
        .unwrap();
    assert!(!second.draft_updated);
    assert_eq!(second.draft, "Better Title");

    let stored = h.agents.get("alice", &title_id).await.unwrap();
    assert_eq!(stored.draft, "Better Title");
    assert_eq!(stored.chat_history.len(), 4);
}

#[tokio::test]
async fn test_failed_transcription_is_terminal_and_resubmittable() {
    let mut blob = MockBlobStore::new();
    blob.expect_download_to_temp()
        .returning(|_| Ok(write_temp_video()));

    let mut transcriber = MockTranscriber::new();
    let mut attempt = 0;
    transcriber.expect_transcribe().returning_st(move |_, _, _| {
        attempt += 1;
        if attempt == 1 {
            Err(ytgen_ai::AiError::transcription_failed("service unavailable"))
        } else {
            Ok("second attempt worked".to_string())
        }
    });

    let h = harness(transcriber, MockAudioExtractor::new(), MockTextGenerator::new(), blob);
    let (asset_id, _) = seed_asset(&h, 5 * MB).await;

    // First attempt fails terminally
    let handle = h.scheduler.submit("alice", &asset_id).await.unwrap();
    handle.await.unwrap();

    let asset = h.assets.get("alice", &asset_id).await.unwrap();
    assert_eq!(asset.transcription_status, TranscriptionStatus::Failed);

    // A failed asset may be resubmitted, and the retry succeeds
    let handle = h.scheduler.submit("alice", &asset_id).await.unwrap();
    handle.await.unwrap();

    let asset = h.assets.get("alice", &asset_id).await.unwrap();
    assert_eq!(asset.transcription_status, TranscriptionStatus::Completed);
    assert_eq!(asset.transcript.as_deref(), Some("second attempt worked"));
}

#[tokio::test]
async fn test_other_users_cannot_touch_assets() {
    let h = harness(
        MockTranscriber::new(),
        MockAudioExtractor::new(),
        MockTextGenerator::new(),
        MockBlobStore::new(),
    );
    let (asset_id, agents) = seed_asset(&h, 5 * MB).await;

    let submit = h.scheduler.submit("mallory", &asset_id).await;
    assert!(matches!(submit, Err(ref e) if e.is_access_denied()));

    let generate = h.orchestrator.generate("mallory", &agents[0].id).await;
    assert!(matches!(generate, Err(ref e) if e.is_access_denied()));
}
