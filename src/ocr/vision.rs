//! Cloud Vision backend.
//!
//! Sends one `images:annotate` request per image asking for text and label
//! detection, then maps the response onto [`OcrResult`]. Requires an API key.
//!
//! Each feature section in the response is optional. A missing section is
//! an empty feature, not a failure; only transport errors, non-200 statuses,
//! unparseable bodies and API error objects fail the image.

use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::backend::{ensure_image_exists, OcrEngine, OcrError};
use super::result::{Annotations, EngineKind, Label, OcrResult};

/// Default annotate endpoint.
pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

/// Settings for [`VisionEngine`].
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Upper bound on a single request, connect through body.
    pub timeout: Duration,
    /// `maxResults` for label detection.
    pub max_labels: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_labels: 5,
        }
    }
}

/// Cloud Vision engine over HTTP.
pub struct VisionEngine {
    config: VisionConfig,
    client: Client,
}

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: RequestImage,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct RequestImage {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(rename = "maxResults", skip_serializing_if = "Option::is_none")]
    max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<ImageResponse>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    text_annotations: Vec<EntityAnnotation>,
    full_text_annotation: Option<FullTextAnnotation>,
    #[serde(default)]
    label_annotations: Vec<EntityAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct EntityAnnotation {
    #[serde(default)]
    description: String,
    score: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct FullTextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl From<ApiStatus> for OcrError {
    fn from(status: ApiStatus) -> Self {
        let message = if status.message.is_empty() {
            "Unknown error".to_string()
        } else {
            status.message
        };
        OcrError::Api {
            code: status.code,
            message,
        }
    }
}

impl VisionEngine {
    /// Create a new engine. Fails only if the HTTP client cannot be built.
    pub fn new(config: VisionConfig) -> Result<Self, OcrError> {
        let client = Client::builder()
            .user_agent(concat!("vis-cli/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| OcrError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    fn api_key(&self) -> Result<&str, OcrError> {
        self.config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| OcrError::BackendNotAvailable("API_KEY is not set".to_string()))
    }

    fn build_request(&self, image: &[u8]) -> AnnotateRequest {
        AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: RequestImage {
                    content: base64::engine::general_purpose::STANDARD.encode(image),
                },
                features: vec![
                    Feature {
                        kind: "LABEL_DETECTION",
                        max_results: Some(self.config.max_labels),
                    },
                    Feature {
                        kind: "TEXT_DETECTION",
                        max_results: None,
                    },
                ],
            }],
        }
    }

    async fn send(&self, image_path: &Path) -> Result<String, OcrError> {
        let api_key = self.api_key()?;
        ensure_image_exists(image_path)?;

        let image = tokio::fs::read(image_path).await?;
        let request = self.build_request(&image);

        let response = self
            .client
            .post(&self.config.endpoint)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if status != StatusCode::OK {
            return Err(OcrError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    /// The request URL carries the API key, so it is stripped from the message.
    fn transport_error(&self, e: reqwest::Error) -> OcrError {
        let e = e.without_url();
        if e.is_timeout() {
            OcrError::Transport(format!(
                "request timed out after {}s",
                self.config.timeout.as_secs_f32()
            ))
        } else {
            OcrError::Transport(e.to_string())
        }
    }
}

/// Map a raw annotate response body onto a result for `image_path`.
pub fn map_vision_response(image_path: &str, body: &str) -> Result<OcrResult, OcrError> {
    let response: AnnotateResponse = serde_json::from_str(body)
        .map_err(|e| OcrError::MalformedResponse(format!("Failed to parse response: {}", e)))?;

    if let Some(error) = response.error {
        return Err(error.into());
    }

    let data = response
        .responses
        .into_iter()
        .next()
        .ok_or_else(|| OcrError::MalformedResponse("No response from Vision API".to_string()))?;

    let text = data
        .full_text_annotation
        .map(|a| a.text)
        .or_else(|| data.text_annotations.into_iter().next().map(|a| a.description))
        .unwrap_or_default();

    let labels: Vec<Label> = data
        .label_annotations
        .into_iter()
        .map(|l| Label::new(l.description, l.score.unwrap_or(0.0)))
        .collect();

    let annotations = Annotations::default().with_text(text).with_labels(labels);

    // A per-image error alongside data is a partial result; alone it fails the image.
    if let Some(error) = data.error {
        if annotations.text.is_none() && annotations.labels.is_none() {
            return Err(error.into());
        }
        tracing::warn!(
            "Partial result for {}: {} (code: {})",
            image_path,
            error.message,
            error.code
        );
    }

    Ok(OcrResult::from_annotations(
        image_path,
        EngineKind::CloudVision,
        annotations,
    ))
}

#[async_trait::async_trait]
impl OcrEngine for VisionEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::CloudVision
    }

    fn is_available(&self) -> bool {
        self.api_key().is_ok()
    }

    fn availability_hint(&self) -> String {
        if self.api_key().is_err() {
            "API_KEY not set. Provide a Cloud Vision API key via API_KEY or .env".to_string()
        } else {
            format!("Cloud Vision is available (endpoint: {})", self.config.endpoint)
        }
    }

    async fn extract(&self, image_path: &Path) -> Result<OcrResult, OcrError> {
        let body = self.send(image_path).await?;
        let result = map_vision_response(&image_path.display().to_string(), &body)?;

        tracing::debug!(
            "Processed {} with Cloud Vision: {} chars, {} labels, confidence: {:.2}",
            image_path.display(),
            result.full_text.len(),
            result.labels.len(),
            result.confidence
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_labels() {
        let body = r#"{
            "responses": [{
                "textAnnotations": [{"description": "Hello"}, {"description": "Hello"}],
                "labelAnnotations": [
                    {"description": "Car", "score": 0.9},
                    {"description": "Wheel", "score": 0.7},
                    {"description": "Road", "score": 0.6}
                ]
            }]
        }"#;
        let result = map_vision_response("car.jpg", body).unwrap();

        assert!(result.success);
        assert_eq!(result.full_text, "Hello");
        assert_eq!(result.labels.len(), 3);
        assert_eq!(result.labels[0].name, "Car");
        assert!((result.confidence - 0.733_333).abs() < 1e-4);
    }

    #[test]
    fn test_labels_without_text() {
        let body = r#"{"responses": [{"labelAnnotations": [{"description": "Sky", "score": 0.5}]}]}"#;
        let result = map_vision_response("sky.jpg", body).unwrap();

        assert!(result.success);
        assert_eq!(result.full_text, "");
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_full_text_annotation_preferred() {
        let body = r#"{
            "responses": [{
                "fullTextAnnotation": {"text": "Line one\nLine two\n"},
                "textAnnotations": [{"description": "other"}]
            }]
        }"#;
        let result = map_vision_response("doc.png", body).unwrap();
        assert_eq!(result.full_text, "Line one\nLine two\n");
        assert!(result.labels.is_empty());
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_empty_annotations_succeed() {
        let result = map_vision_response("blank.png", r#"{"responses": [{}]}"#).unwrap();
        assert!(result.success);
        assert_eq!(result.confidence, 0.0);
        assert!(result.labels.is_empty());
    }

    #[test]
    fn test_per_image_error_without_data_fails() {
        let body = r#"{"responses": [{"error": {"code": 3, "message": "Bad image data."}}]}"#;
        let err = map_vision_response("bad.png", body).unwrap_err();
        assert!(err.to_string().contains("Bad image data."));
    }

    #[test]
    fn test_per_image_error_with_data_is_partial() {
        let body = r#"{
            "responses": [{
                "fullTextAnnotation": {"text": "STOP"},
                "error": {"code": 8, "message": "Label quota exceeded"}
            }]
        }"#;
        let result = map_vision_response("sign.png", body).unwrap();
        assert!(result.success);
        assert!(result.error.is_none());
        assert_eq!(result.full_text, "STOP");
    }

    #[test]
    fn test_top_level_error_fails() {
        let body = r#"{"error": {"code": 403, "message": "Invalid API key"}}"#;
        let err = map_vision_response("a.png", body).unwrap_err();
        assert_eq!(err.to_string(), "Invalid API key (code: 403)");
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            map_vision_response("a.png", "<html>oops</html>"),
            Err(OcrError::MalformedResponse(_))
        ));
        assert!(matches!(
            map_vision_response("a.png", r#"{"responses": []}"#),
            Err(OcrError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_request_shape() {
        let engine = VisionEngine::new(VisionConfig {
            max_labels: 3,
            ..VisionConfig::default()
        })
        .unwrap();
        let request = serde_json::to_value(engine.build_request(b"abc")).unwrap();

        assert_eq!(request["requests"][0]["image"]["content"], "YWJj");
        let features = &request["requests"][0]["features"];
        assert_eq!(features[0]["type"], "LABEL_DETECTION");
        assert_eq!(features[0]["maxResults"], 3);
        assert_eq!(features[1]["type"], "TEXT_DETECTION");
        assert!(features[1].get("maxResults").is_none());
    }

    #[test]
    fn test_availability_requires_key() {
        let engine = VisionEngine::new(VisionConfig::default()).unwrap();
        assert!(!engine.is_available());

        let engine = VisionEngine::new(VisionConfig {
            api_key: Some("k".to_string()),
            ..VisionConfig::default()
        })
        .unwrap();
        assert!(engine.is_available());
    }
}
