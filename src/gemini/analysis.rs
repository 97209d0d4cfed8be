//! Video analysis via Gemini structured output

use super::messages::{
    Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part, Tool,
};
use super::GeminiClient;
use crate::analysis::{declares_sources, parse_payload, AnalysisResult, Source};
use crate::error::GatewayError;
use crate::gateway::AnalysisGateway;
use crate::video::EncodedVideo;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

/// Instructions sent alongside every video.
const ANALYSIS_PROMPT: &str = r#"You are a viral short-form video strategist. Analyze the attached video and return a single JSON object.

1. transcription: Transcribe every spoken word, starting from the very first second of the video. Do not skip the opening, do not summarize, and do not add timestamps.
2. trendingKeywords: Identify the keywords and hashtags related to this content that are currently trending, most relevant first.
3. sources: If you relied on web sources for trends, list them with title and uri. Otherwise return an empty list.
4. titles: Write exactly 5 title options. Rank them from 1 (most likely to go viral) to 5, and explain the reasoning for each ranking.
5. descriptions: Write a search-optimized YouTube description and an engaging Instagram caption with relevant hashtags.
6. thumbnailConcept: Propose one thumbnail concept. "idea" describes it for a human; "prompt" is a detailed image-generation prompt describing the subject, composition and mood.

Respond with JSON only."#;

/// Response schema mirroring `AnalysisResult`
fn analysis_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "transcription": { "type": "STRING" },
            "trendingKeywords": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            },
            "sources": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "uri": { "type": "STRING" }
                    },
                    "required": ["title", "uri"]
                }
            },
            "titles": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "text": { "type": "STRING" },
                        "rank": { "type": "INTEGER" },
                        "reasoning": { "type": "STRING" }
                    },
                    "required": ["text", "rank", "reasoning"]
                }
            },
            "descriptions": {
                "type": "OBJECT",
                "properties": {
                    "youtube": { "type": "STRING" },
                    "instagram": { "type": "STRING" }
                },
                "required": ["youtube", "instagram"]
            },
            "thumbnailConcept": {
                "type": "OBJECT",
                "properties": {
                    "idea": { "type": "STRING" },
                    "prompt": { "type": "STRING" }
                },
                "required": ["idea", "prompt"]
            }
        },
        "required": crate::analysis::REQUIRED_FIELDS
    })
}

/// Build the analysis request.
///
/// With search grounding the model gets the Google Search tool, and the
/// schema travels in the prompt because Gemini rejects tools combined with a
/// response schema. The payload is validated on receipt either way.
fn build_analysis_request(video: &EncodedVideo, search_grounding: bool) -> GenerateContentRequest {
    let (prompt, generation_config, tools) = if search_grounding {
        let prompt = format!(
            "{}\n\nThe JSON object must match this schema:\n{}",
            ANALYSIS_PROMPT,
            analysis_schema()
        );
        (prompt, None, Some(vec![Tool::google_search()]))
    } else {
        let config = GenerationConfig {
            response_mime_type: Some("application/json".to_string()),
            response_schema: Some(analysis_schema()),
            ..Default::default()
        };
        (ANALYSIS_PROMPT.to_string(), Some(config), None)
    };

    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![
                Part::inline(video.mime_type.clone(), video.data.clone()),
                Part::text(prompt),
            ],
        }],
        generation_config,
        tools,
    }
}

/// Strip a surrounding Markdown code fence, if the model added one
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn parse_analysis_response(
    response: &GenerateContentResponse,
) -> Result<AnalysisResult, GatewayError> {
    if let Some(reason) = response.block_reason() {
        return Err(GatewayError::Blocked(reason.to_string()));
    }

    let text = response.text().ok_or_else(|| {
        let reason = response.finish_reason().unwrap_or("no candidates");
        GatewayError::InvalidResponse(format!(
            "No text content in analysis response (finish reason: {})",
            reason
        ))
    })?;

    let payload = parse_payload(strip_code_fence(&text))?;
    let sources_declared = declares_sources(&payload);
    let mut analysis = AnalysisResult::from_value(payload)?;

    // An explicit list, even an empty one, is the model's answer
    if !sources_declared {
        analysis.sources = response
            .grounding_links()
            .into_iter()
            .map(|(title, uri)| Source { title, uri })
            .collect();
    }

    Ok(analysis)
}

#[async_trait]
impl AnalysisGateway for GeminiClient {
    #[instrument(skip(self, video), fields(mime_type = %video.mime_type, encoded_len = video.data.len()))]
    async fn analyze(&self, video: &EncodedVideo) -> Result<AnalysisResult, GatewayError> {
        let request = build_analysis_request(video, self.search_grounding);
        let response = self
            .generate_content(&self.analysis_model, &request)
            .await?;

        match parse_analysis_response(&response) {
            Ok(analysis) => {
                info!(
                    titles = analysis.titles.len(),
                    keywords = analysis.trending_keywords.len(),
                    sources = analysis.sources.len(),
                    "Video analysis received"
                );
                Ok(analysis)
            }
            Err(e) => {
                warn!(error = %e, "Analysis response rejected");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::fixtures::{sample_json_without, SAMPLE_JSON};

    fn response_with_text(text: &str) -> GenerateContentResponse {
        let body = json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        });
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_request_carries_video_prompt_and_schema() {
        let video = EncodedVideo::encode(b"frames", "video/webm");
        let json = serde_json::to_value(build_analysis_request(&video, false)).unwrap();

        let parts = &json["contents"][0]["parts"];
        assert_eq!(parts[0]["inlineData"]["mimeType"], "video/webm");
        assert_eq!(parts[0]["inlineData"]["data"], video.data.as_str());
        assert!(parts[1]["text"].as_str().unwrap().contains("exactly 5 title options"));

        let config = &json["generationConfig"];
        assert_eq!(config["responseMimeType"], "application/json");
        assert_eq!(
            config["responseSchema"]["required"],
            json!(["transcription", "trendingKeywords", "titles", "descriptions", "thumbnailConcept"])
        );
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_grounded_request_uses_search_tool_and_inline_schema() {
        let video = EncodedVideo::encode(b"frames", "video/mp4");
        let json = serde_json::to_value(build_analysis_request(&video, true)).unwrap();

        assert_eq!(json["tools"], json!([{ "googleSearch": {} }]));
        assert!(json.get("generationConfig").is_none());

        let prompt = json["contents"][0]["parts"][1]["text"].as_str().unwrap();
        assert!(prompt.starts_with(ANALYSIS_PROMPT));
        assert!(prompt.contains("\"thumbnailConcept\""));
        assert!(prompt.contains("\"trendingKeywords\""));
    }

    #[test]
    fn test_prompt_asks_for_full_transcript_from_start() {
        assert!(ANALYSIS_PROMPT.contains("very first second"));
        assert!(ANALYSIS_PROMPT.contains("Instagram caption"));
    }

    #[test]
    fn test_parse_valid_response() {
        let analysis = parse_analysis_response(&response_with_text(SAMPLE_JSON)).unwrap();
        assert_eq!(analysis.titles.len(), 5);
        assert_eq!(analysis.sources[0].uri, "https://example.com/trends");
    }

    #[test]
    fn test_missing_titles_is_rejected() {
        let response = response_with_text(&sample_json_without("titles"));
        assert!(matches!(
            parse_analysis_response(&response),
            Err(GatewayError::MissingField("titles"))
        ));
    }

    #[test]
    fn test_fenced_json_is_accepted() {
        let fenced = format!("```json\n{}\n```", SAMPLE_JSON);
        assert!(parse_analysis_response(&response_with_text(&fenced)).is_ok());
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json {\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
    }

    #[test]
    fn test_grounding_fills_missing_sources() {
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": sample_json_without("sources") }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://news.example/trend", "title": "Trend report" } }
                ]}
            }]
        });
        let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
        let analysis = parse_analysis_response(&response).unwrap();
        assert_eq!(
            analysis.sources,
            vec![Source {
                title: "Trend report".into(),
                uri: "https://news.example/trend".into()
            }]
        );
    }

    #[test]
    fn test_single_line_fence_is_accepted() {
        let fenced = format!("```json {}```", SAMPLE_JSON.replace('\n', " "));
        let analysis = parse_analysis_response(&response_with_text(&fenced)).unwrap();
        assert_eq!(analysis.titles.len(), 5);
    }

    #[test]
    fn test_explicit_empty_sources_are_kept() {
        let mut payload: Value = serde_json::from_str(SAMPLE_JSON).unwrap();
        payload["sources"] = json!([]);
        let body = json!({
            "candidates": [{
                "content": { "parts": [{ "text": payload.to_string() }] },
                "groundingMetadata": { "groundingChunks": [
                    { "web": { "uri": "https://news.example/trend", "title": "Trend report" } }
                ]}
            }]
        });
        let response: GenerateContentResponse = serde_json::from_value(body).unwrap();
        assert!(parse_analysis_response(&response).unwrap().sources.is_empty());
    }

    #[test]
    fn test_blocked_and_empty_responses() {
        let blocked: GenerateContentResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } })).unwrap();
        assert!(matches!(
            parse_analysis_response(&blocked),
            Err(GatewayError::Blocked(reason)) if reason == "SAFETY"
        ));

        let empty: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "MAX_TOKENS" }]
        }))
        .unwrap();
        match parse_analysis_response(&empty) {
            Err(GatewayError::InvalidResponse(message)) => assert!(message.contains("MAX_TOKENS")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
