use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use super::fallback::placeholder_avatar;
use super::models::{ContentProvider, ProviderError};
use crate::models::User;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const MODEL_TEXT: &str = "gemini-2.5-flash";
const MODEL_IMAGE: &str = "gemini-2.5-flash-image";

pub struct GeminiProvider {
    api_key: String,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct GeneratedProfile {
    name: String,
    level: i64,
    location: Option<String>,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::new(),
        }
    }

    async fn generate_content(&self, model: &str, body: Value) -> Result<Value, ProviderError> {
        let response = self.client
            .post(format!("{}/{}:generateContent", API_BASE, model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|e| format!("Failed to get error text: {}", e));
            error!("Gemini API error: {}", error_text);
            return Err(ProviderError::APIError(error_text));
        }

        response.json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ContentProvider for GeminiProvider {
    async fn generate_users(&self, count: usize) -> Result<Vec<User>, ProviderError> {
        debug!("Requesting {} generated users", count);
        let body = json!({
            "contents": [{
                "parts": [{
                    "text": format!(
                        "Generate {} realistic Chinese social media user profiles. \
                         Includes nickname (creative, some with emojis), level (1-50), and location (major Chinese cities).",
                        count
                    )
                }]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": {
                    "type": "ARRAY",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "name": { "type": "STRING" },
                            "level": { "type": "INTEGER" },
                            "location": { "type": "STRING" }
                        },
                        "required": ["name", "level", "location"]
                    }
                }
            }
        });

        let response = self.generate_content(MODEL_TEXT, body).await?;
        let text = response_text(&response)
            .ok_or_else(|| ProviderError::InvalidResponse("No text in response".to_string()))?;
        parse_profiles(&text, Utc::now().timestamp_millis())
    }

    async fn generate_avatar_image(&self, prompt: &str) -> Result<Option<String>, ProviderError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });
        let response = self.generate_content(MODEL_IMAGE, body).await?;
        Ok(inline_image(&response))
    }
}

fn candidate_parts(response: &Value) -> impl Iterator<Item = &Value> {
    response["candidates"][0]["content"]["parts"]
        .as_array()
        .into_iter()
        .flatten()
}

fn response_text(response: &Value) -> Option<String> {
    let text: String = candidate_parts(response)
        .filter_map(|part| part["text"].as_str())
        .collect();
    (!text.is_empty()).then_some(text)
}

fn inline_image(response: &Value) -> Option<String> {
    candidate_parts(response).find_map(|part| {
        let inline = part.get("inlineData")?;
        let data = inline["data"].as_str()?;
        let mime = inline["mimeType"].as_str().unwrap_or("image/png");
        Some(format!("data:{};base64,{}", mime, data))
    })
}

/// Turns the model's JSON array into users. Levels are clamped to at least 1.
fn parse_profiles(text: &str, stamp: i64) -> Result<Vec<User>, ProviderError> {
    let profiles: Vec<GeneratedProfile> = serde_json::from_str(text)
        .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

    Ok(profiles
        .into_iter()
        .enumerate()
        .filter(|(_, p)| !p.name.trim().is_empty())
        .map(|(index, p)| User {
            id: format!("gen_{}_{}", stamp, index),
            avatar: placeholder_avatar(&p.name),
            level: p.level.clamp(1, u32::MAX as i64) as u32,
            location: p.location.filter(|l| !l.is_empty()),
            name: p.name,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generated_profiles() {
        let text = r#"[
            {"name": "星河漫步🌙", "level": 23, "location": "上海"},
            {"name": "阿木", "level": 0, "location": ""},
            {"name": "  ", "level": 5, "location": "北京"}
        ]"#;
        let users = parse_profiles(text, 1700).unwrap();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].id, "gen_1700_0");
        assert_eq!(users[0].level, 23);
        assert_eq!(users[0].location.as_deref(), Some("上海"));
        assert!(users[0].avatar.starts_with("https://picsum.photos/seed/"));
        assert_eq!(users[1].level, 1);
        assert_eq!(users[1].location, None);
    }

    #[test]
    fn malformed_json_is_an_invalid_response() {
        assert!(matches!(parse_profiles("not json", 0), Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn extracts_text_and_inline_image() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "[{\"name\":" },
                        { "text": "\"a\",\"level\":2}]" },
                        { "inlineData": { "mimeType": "image/jpeg", "data": "QUJD" } }
                    ]
                }
            }]
        });
        assert_eq!(response_text(&response).unwrap(), "[{\"name\":\"a\",\"level\":2}]");
        assert_eq!(inline_image(&response).unwrap(), "data:image/jpeg;base64,QUJD");
    }

    #[test]
    fn missing_candidates_yield_nothing() {
        let response = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(response_text(&response).is_none());
        assert!(inline_image(&response).is_none());
    }
}
