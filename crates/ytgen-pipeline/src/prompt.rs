//! Prompt assembly for generation and refinement.
//!
//! Prompts are built from context blocks in a fixed order: video title,
//! transcript excerpt, connected peer outputs, then channel profile. A
//! missing block is omitted entirely rather than rendered as a
//! placeholder.

use ytgen_models::{Agent, AgentType, ChannelProfile, ChatRole, ConnectedOutput, VideoAsset};

/// Characters of transcript included in a prompt.
pub const TRANSCRIPT_EXCERPT_CHARS: usize = 1000;

/// Manually pasted transcripts were curated by the user, so a larger
/// excerpt is justified.
pub const MANUAL_TRANSCRIPT_EXCERPT_CHARS: usize = 2000;

/// Sampling temperature for all content generation.
pub const GENERATION_TEMPERATURE: f64 = 0.7;

/// Everything a generation prompt can draw on.
pub struct GenerationContext<'a> {
    pub asset: &'a VideoAsset,
    pub peers: &'a [ConnectedOutput],
    pub profile: Option<&'a ChannelProfile>,
}

/// Task framing for one agent type.
pub fn build_system_prompt(agent_type: AgentType) -> String {
    let task = match agent_type {
        AgentType::Title => {
            "write one compelling YouTube video title. Keep it under 70 characters, \
             make it specific and curiosity-driven, and avoid clickbait that the \
             video cannot deliver on."
        }
        AgentType::Description => {
            "write a YouTube video description. Open with a strong two-sentence hook, \
             summarize what the viewer will learn, and close with a call to action. \
             Do not invent links or timestamps."
        }
        AgentType::Thumbnail => {
            "write a concise visual concept for a YouTube thumbnail. Describe the \
             main subject, composition, and any short overlay text (three words or \
             fewer). The concept must be achievable by editing a frame from the video."
        }
        AgentType::Tweets => {
            "write a single tweet promoting the video. Stay under 280 characters, \
             lead with the most interesting idea, and do not use hashtag spam."
        }
    };
    format!(
        "You are a content strategist for a YouTube creator. Your task: {task} \
         Respond with the content only, no preamble or commentary."
    )
}

/// Assemble the user prompt for a fresh generation.
pub fn build_user_prompt(context: &GenerationContext<'_>) -> String {
    let mut blocks = Vec::new();

    if let Some(title) = context.asset.title.as_deref().filter(|t| !t.is_empty()) {
        blocks.push(format!("Video title: {title}"));
    }

    if let Some(transcript) = context.asset.transcript.as_deref() {
        let cap = if context.asset.transcript_manual {
            MANUAL_TRANSCRIPT_EXCERPT_CHARS
        } else {
            TRANSCRIPT_EXCERPT_CHARS
        };
        blocks.push(format!(
            "Transcript excerpt:\n{}",
            excerpt(transcript, cap)
        ));
    }

    if !context.peers.is_empty() {
        let mut section = String::from("Already generated for this video:");
        for peer in context.peers {
            section.push_str(&format!(
                "\n{}: {}",
                peer.agent_type.label(),
                peer.content
            ));
        }
        blocks.push(section);
    }

    if let Some(profile) = context.profile {
        blocks.push(render_profile(profile));
    }

    blocks.join("\n\n")
}

/// Assemble the user prompt for a refinement turn.
///
/// Carries the current draft, the full chat history, and the new
/// instruction. The model is told to restate the draft under an
/// `UPDATED <TYPE>:` marker only when it actually changes it, which is
/// what [`parse_draft_update`] keys on.
pub fn build_refinement_prompt(
    agent: &Agent,
    context: &GenerationContext<'_>,
    instruction: &str,
) -> String {
    let label = agent.agent_type.label();
    let mut prompt = build_user_prompt(context);

    if !agent.draft.is_empty() {
        prompt.push_str(&format!("\n\nCurrent {label}:\n{}", agent.draft));
    }

    if !agent.chat_history.is_empty() {
        prompt.push_str("\n\nConversation so far:");
        for message in &agent.chat_history {
            let speaker = match message.role {
                ChatRole::User => "User",
                ChatRole::Ai => "Assistant",
            };
            prompt.push_str(&format!("\n{speaker}: {}", message.message));
        }
    }

    prompt.push_str(&format!(
        "\n\nUser request: {instruction}\n\n\
         If you change the {label}, include the full new version on its own \
         lines prefixed with \"UPDATED {label}:\". If the request does not \
         call for a change, answer conversationally and do not repeat the \
         {label} verbatim."
    ));
    prompt
}

/// Extract a replacement draft from a refinement response.
///
/// Returns `Some(new_draft)` when the response carries an
/// `UPDATED <TYPE>:` marker with non-empty content after it, `None`
/// otherwise. A `None` means the existing draft stands unchanged.
pub fn parse_draft_update(response: &str, agent_type: AgentType) -> Option<String> {
    let marker = format!("UPDATED {}:", agent_type.label());
    let start = response.find(&marker)?;
    let updated = response[start + marker.len()..].trim();
    if updated.is_empty() {
        None
    } else {
        Some(updated.to_string())
    }
}

fn render_profile(profile: &ChannelProfile) -> String {
    let mut lines = vec![format!("Channel: {}", profile.channel_name)];
    lines.push(format!("Niche: {}", profile.niche));
    lines.push(format!("Content type: {}", profile.content_type));
    if let Some(tone) = profile.tone.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("Tone: {tone}"));
    }
    if let Some(audience) = profile.target_audience.as_deref().filter(|a| !a.is_empty()) {
        lines.push(format!("Target audience: {audience}"));
    }
    lines.join("\n")
}

/// Truncate at a char boundary at or below `max_chars`.
fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ytgen_models::ChatMessage;

    fn asset_with_transcript(transcript: &str, manual: bool) -> VideoAsset {
        let mut asset = VideoAsset::new("alice", "videos/a.mp4", "a.mp4", 1024);
        asset.title = Some("How Rust Ownership Works".to_string());
        asset.complete_transcription(transcript);
        asset.transcript_manual = manual;
        asset
    }

    #[test]
    fn test_block_order_is_fixed() {
        let asset = asset_with_transcript("ownership means every value has one owner", false);
        let peers = vec![ConnectedOutput {
            agent_type: AgentType::Title,
            content: "Rust Ownership, Finally Explained".to_string(),
        }];
        let profile = ChannelProfile::new("alice", "RustBytes", "education", "systems programming");

        let prompt = build_user_prompt(&GenerationContext {
            asset: &asset,
            peers: &peers,
            profile: Some(&profile),
        });

        let title_at = prompt.find("Video title:").unwrap();
        let transcript_at = prompt.find("Transcript excerpt:").unwrap();
        let peers_at = prompt.find("Already generated").unwrap();
        let profile_at = prompt.find("Channel:").unwrap();
        assert!(title_at < transcript_at);
        assert!(transcript_at < peers_at);
        assert!(peers_at < profile_at);
    }

    #[test]
    fn test_profile_field_order_is_fixed() {
        let mut profile =
            ChannelProfile::new("alice", "RustBytes", "education", "systems programming");
        profile.tone = Some("casual".to_string());
        profile.target_audience = Some("intermediate devs".to_string());

        let asset = VideoAsset::new("alice", "videos/a.mp4", "a.mp4", 1024);
        let prompt = build_user_prompt(&GenerationContext {
            asset: &asset,
            peers: &[],
            profile: Some(&profile),
        });

        let name_at = prompt.find("Channel: RustBytes").unwrap();
        let niche_at = prompt.find("Niche: systems programming").unwrap();
        let content_type_at = prompt.find("Content type: education").unwrap();
        let tone_at = prompt.find("Tone: casual").unwrap();
        let audience_at = prompt.find("Target audience: intermediate devs").unwrap();
        assert!(name_at < niche_at);
        assert!(niche_at < content_type_at);
        assert!(content_type_at < tone_at);
        assert!(tone_at < audience_at);
    }

    #[test]
    fn test_missing_blocks_are_omitted() {
        let asset = VideoAsset::new("alice", "videos/a.mp4", "a.mp4", 1024);
        let prompt = build_user_prompt(&GenerationContext {
            asset: &asset,
            peers: &[],
            profile: None,
        });
        assert!(!prompt.contains("Video title:"));
        assert!(!prompt.contains("Transcript excerpt:"));
        assert!(!prompt.contains("Already generated"));
        assert!(!prompt.contains("Channel:"));
    }

    #[test]
    fn test_transcript_cap_depends_on_manual_flag() {
        let long = "x".repeat(3000);

        let auto = asset_with_transcript(&long, false);
        let prompt = build_user_prompt(&GenerationContext {
            asset: &auto,
            peers: &[],
            profile: None,
        });
        let excerpt_len = prompt.matches('x').count();
        assert_eq!(excerpt_len, TRANSCRIPT_EXCERPT_CHARS);

        let manual = asset_with_transcript(&long, true);
        let prompt = build_user_prompt(&GenerationContext {
            asset: &manual,
            peers: &[],
            profile: None,
        });
        let excerpt_len = prompt.matches('x').count();
        assert_eq!(excerpt_len, MANUAL_TRANSCRIPT_EXCERPT_CHARS);
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        let text = "héllo wörld".repeat(200);
        let cut = excerpt(&text, 1000);
        assert_eq!(cut.chars().count(), 1000);
        // Slicing on a non-boundary would have panicked above
        assert!(text.starts_with(cut));
    }

    #[test]
    fn test_peers_are_labelled_by_type() {
        let asset = asset_with_transcript("t", false);
        let peers = vec![
            ConnectedOutput {
                agent_type: AgentType::Description,
                content: "a description".to_string(),
            },
            ConnectedOutput {
                agent_type: AgentType::Tweets,
                content: "a tweet".to_string(),
            },
        ];
        let prompt = build_user_prompt(&GenerationContext {
            asset: &asset,
            peers: &peers,
            profile: None,
        });
        assert!(prompt.contains("DESCRIPTION: a description"));
        assert!(prompt.contains("TWEETS: a tweet"));
    }

    #[test]
    fn test_parse_draft_update_with_marker() {
        let response = "Sure, tightened it up.\n\nUPDATED TITLE: Rust Ownership in 10 Minutes";
        assert_eq!(
            parse_draft_update(response, AgentType::Title),
            Some("Rust Ownership in 10 Minutes".to_string())
        );
    }

    #[test]
    fn test_parse_draft_update_without_marker() {
        let response = "The current title already does that well, I'd keep it.";
        assert_eq!(parse_draft_update(response, AgentType::Title), None);
    }

    #[test]
    fn test_parse_draft_update_wrong_label() {
        let response = "UPDATED TWEET: something";
        assert_eq!(parse_draft_update(response, AgentType::Title), None);
    }

    #[test]
    fn test_parse_draft_update_empty_payload() {
        assert_eq!(parse_draft_update("UPDATED TITLE:   ", AgentType::Title), None);
    }

    #[test]
    fn test_refinement_prompt_carries_history_and_marker_instruction() {
        let asset = asset_with_transcript("t", false);
        let mut agent = Agent::new("alice", asset.id.clone(), AgentType::Title);
        agent.draft = "Old Title".to_string();
        agent.chat_history.push(ChatMessage::user("make it shorter"));
        agent.chat_history.push(ChatMessage::ai("UPDATED TITLE: Old Title"));

        let prompt = build_refinement_prompt(
            &agent,
            &GenerationContext {
                asset: &asset,
                peers: &[],
                profile: None,
            },
            "add a number",
        );
        assert!(prompt.contains("Current TITLE:\nOld Title"));
        assert!(prompt.contains("User: make it shorter"));
        assert!(prompt.contains("Assistant: UPDATED TITLE: Old Title"));
        assert!(prompt.contains("User request: add a number"));
        assert!(prompt.contains("\"UPDATED TITLE:\""));
    }

    #[test]
    fn test_system_prompts_differ_by_type() {
        let prompts: Vec<String> = AgentType::all().iter().map(|t| build_system_prompt(*t)).collect();
        for (i, a) in prompts.iter().enumerate() {
            for b in &prompts[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
