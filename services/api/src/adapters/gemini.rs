//! services/api/src/adapters/gemini.rs
//!
//! This module contains the adapter for the answer gateway. It implements
//! the `AnswerGateway` port from the `core` crate against the Gemini
//! `generateContent` REST endpoint.

const SYSTEM_INSTRUCTION: &str = r#"
أنت "المحاسب الذكي"، مساعد أكاديمي متخصص لطلاب المحاسبة.
مهمتك الأساسية هي الإجابة على أسئلة الطلاب بناءً على ملف المادة المرفق.

قواعد العمل الصارمة:
1. التركيز الموضوعي: إذا حدد الطالب "فصلاً" معيناً، ابحث أولاً في ذلك الفصل داخل الملف المرفق لتقديم الإجابة الأكثر دقة وسرعة.
2. المصدر الوحيد: اعتمد كلياً على النصوص الموجودة في الملف المرفق.
3. هيكلية الإجابة: يجب أن ينقسم ردك دائماً إلى قسمين:
   - [نص المنهج]: اقتبس هنا النص كما ورد في الكتاب حرفياً (يفضل الجزء المتعلق بالفصل المحدد).
   - [شرح المحاسب الذكي]: قدم شرحاً مبسطاً بأسلوبك، مع أمثلة عملية وجداول محاسبية (مدين/دائن).
4. الحقوق: تذكر دائماً أن هذا التطبيق هو مبادرة من "سياف الحاتمي مندوب الدفعة التاسعة محاسبة".
5. تنبيه الحجم: إذا كان الملف كبيراً جداً، حاول استخلاص المعلومات الأساسية بذكاء.
"#;

/// Returned when the provider responds with no usable text.
const EMPTY_REPLY_FALLBACK: &str = "حدث خطأ في استرداد الإجابة.";

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use curriculum_chat_core::domain::{CurriculumDocument, MessageRole};
use curriculum_chat_core::ports::{AnswerGateway, GatewayError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AnswerGateway` using the Gemini REST API.
#[derive(Clone)]
pub struct GeminiQaAdapter {
    client: Client,
    api_key: String,
    url: String,
    timeout: Duration,
}

impl GeminiQaAdapter {
    /// Creates a new `GeminiQaAdapter`. `base_url` overrides the public
    /// endpoint, which lets tests point the adapter at a local stub.
    pub fn new(
        api_key: String,
        model: &str,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let base = base_url.unwrap_or(DEFAULT_BASE_URL).trim_end_matches('/');
        let url = format!("{}/models/{}:generateContent", base, model);
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            url,
            timeout,
        })
    }

    /// Translates one exchange into the wire request: the prior transcript
    /// as role-tagged turns, then the current question (prefixed with the
    /// chapter-focus hint when one is set) with the document inlined.
    fn build_request(
        question: &str,
        document: &CurriculumDocument,
        history: &[(MessageRole, String)],
        chapter_focus: &str,
    ) -> GeminiRequest {
        let mut contents: Vec<GeminiContent> = history
            .iter()
            .map(|(role, content)| GeminiContent {
                role: Some(
                    match role {
                        MessageRole::User => "user",
                        MessageRole::Assistant => "model",
                    }
                    .to_string(),
                ),
                parts: vec![GeminiPart::Text {
                    text: content.clone(),
                }],
            })
            .collect();

        let full_question = if chapter_focus.is_empty() {
            question.to_string()
        } else {
            format!("(يرجى التركيز على: {}) {}", chapter_focus, question)
        };

        contents.push(GeminiContent {
            role: Some("user".to_string()),
            parts: vec![
                GeminiPart::Text {
                    text: full_question,
                },
                GeminiPart::InlineData {
                    inline_data: GeminiInlineData {
                        mime_type: document.media_type.clone(),
                        data: STANDARD.encode(&document.bytes),
                    },
                },
            ],
        });

        GeminiRequest {
            contents,
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart::Text {
                    text: SYSTEM_INSTRUCTION.to_string(),
                }],
            },
            generation_config: GeminiGenerationConfig { temperature: 0.1 },
        }
    }
}

/// Maps a provider failure onto the gateway taxonomy. The oversize signal
/// arrives either as HTTP 413 or as a recognizable message substring.
fn map_provider_error(status: u16, message: &str) -> GatewayError {
    if status == 413 || message.contains("exceeds supported limit") {
        GatewayError::PayloadTooLarge
    } else {
        GatewayError::Other(message.to_string())
    }
}

/// Joins the first candidate's text parts, falling back when the provider
/// returns no usable text.
fn extract_text(response: GeminiResponse) -> String {
    let text = response
        .candidates
        .into_iter()
        .next()
        .map(|candidate| {
            candidate
                .content
                .parts
                .into_iter()
                .filter_map(|part| match part {
                    GeminiPart::Text { text } => Some(text),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        EMPTY_REPLY_FALLBACK.to_string()
    } else {
        text
    }
}

//=========================================================================================
// `AnswerGateway` Trait Implementation
//=========================================================================================

#[async_trait]
impl AnswerGateway for GeminiQaAdapter {
    async fn ask(
        &self,
        question: &str,
        document: &CurriculumDocument,
        history: &[(MessageRole, String)],
        chapter_focus: &str,
    ) -> Result<String, GatewayError> {
        let request = Self::build_request(question, document, history, chapter_focus);
        debug!(
            turns = request.contents.len(),
            document_bytes = document.bytes.len(),
            "sending generateContent request"
        );

        let url = format!("{}?key={}", self.url, self.api_key);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(self.timeout)
                } else {
                    GatewayError::Other(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout(self.timeout)
            } else {
                GatewayError::Other(format!("Failed to read response: {}", e))
            }
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map(|resp| resp.error.message)
                .unwrap_or(body);
            return Err(map_provider_error(status.as_u16(), &message));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::Other(format!("Failed to parse response: {}", e)))?;
        Ok(extract_text(parsed))
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use uuid::Uuid;

    use super::*;

    fn document(bytes: &'static [u8]) -> CurriculumDocument {
        CurriculumDocument {
            id: Uuid::new_v4(),
            course_id: "mkt".to_string(),
            filename: "marketing.pdf".to_string(),
            bytes: Bytes::from_static(bytes),
            media_type: "application/pdf".to_string(),
        }
    }

    fn text_of(part: &GeminiPart) -> &str {
        match part {
            GeminiPart::Text { text } => text,
            _ => panic!("expected a text part"),
        }
    }

    #[test]
    fn chapter_focus_prefixes_the_question() {
        let request = GeminiQaAdapter::build_request(
            "ما هو قيد الإهلاك؟",
            &document(b"%PDF"),
            &[],
            "الفصل الخامس",
        );

        let current = request.contents.last().unwrap();
        assert_eq!(current.role.as_deref(), Some("user"));
        assert_eq!(
            text_of(&current.parts[0]),
            "(يرجى التركيز على: الفصل الخامس) ما هو قيد الإهلاك؟"
        );
    }

    #[test]
    fn empty_focus_leaves_the_question_untouched() {
        let request =
            GeminiQaAdapter::build_request("ما هو المزيج التسويقي؟", &document(b"%PDF"), &[], "");

        let current = request.contents.last().unwrap();
        assert_eq!(text_of(&current.parts[0]), "ما هو المزيج التسويقي؟");
    }

    #[test]
    fn history_becomes_role_tagged_turns() {
        let history = vec![
            (MessageRole::User, "سؤال".to_string()),
            (MessageRole::Assistant, "جواب".to_string()),
        ];
        let request =
            GeminiQaAdapter::build_request("تابع", &document(b"%PDF"), &history, "");

        assert_eq!(request.contents.len(), 3);
        assert_eq!(request.contents[0].role.as_deref(), Some("user"));
        assert_eq!(text_of(&request.contents[0].parts[0]), "سؤال");
        assert_eq!(request.contents[1].role.as_deref(), Some("model"));
        assert_eq!(text_of(&request.contents[1].parts[0]), "جواب");
    }

    #[test]
    fn document_is_inlined_as_base64() {
        let request = GeminiQaAdapter::build_request("سؤال", &document(b"%PDF-1.7"), &[], "");

        let current = request.contents.last().unwrap();
        match &current.parts[1] {
            GeminiPart::InlineData { inline_data } => {
                assert_eq!(inline_data.mime_type, "application/pdf");
                assert_eq!(inline_data.data, STANDARD.encode(b"%PDF-1.7"));
            }
            _ => panic!("expected an inline data part"),
        }
    }

    #[test]
    fn wire_shape_uses_camel_case_keys() {
        let request = GeminiQaAdapter::build_request("سؤال", &document(b"%PDF"), &[], "");
        let value = serde_json::to_value(&request).unwrap();

        assert!(value.get("systemInstruction").is_some());
        assert_eq!(value["generationConfig"]["temperature"], 0.1);
        let parts = &value["contents"][0]["parts"];
        assert!(parts[1].get("inlineData").is_some());
        assert!(parts[1]["inlineData"].get("mimeType").is_some());
    }

    #[test]
    fn oversize_signals_map_to_payload_too_large() {
        assert!(matches!(
            map_provider_error(413, "Request Entity Too Large"),
            GatewayError::PayloadTooLarge
        ));
        assert!(matches!(
            map_provider_error(400, "The file size exceeds supported limit."),
            GatewayError::PayloadTooLarge
        ));
    }

    #[test]
    fn other_provider_failures_pass_the_message_through() {
        let err = map_provider_error(500, "Internal error encountered.");
        match err {
            GatewayError::Other(message) => assert_eq!(message, "Internal error encountered."),
            _ => panic!("expected a generic failure"),
        }
    }

    #[test]
    fn first_candidate_text_parts_are_joined() {
        let response = GeminiResponse {
            candidates: vec![GeminiCandidate {
                content: GeminiContent {
                    role: Some("model".to_string()),
                    parts: vec![
                        GeminiPart::Text {
                            text: "[نص المنهج] ...".to_string(),
                        },
                        GeminiPart::Text {
                            text: "\n[شرح المحاسب الذكي] ...".to_string(),
                        },
                    ],
                },
            }],
        };

        assert_eq!(extract_text(response), "[نص المنهج] ...\n[شرح المحاسب الذكي] ...");
    }

    #[test]
    fn empty_reply_yields_the_fallback_text() {
        let response = GeminiResponse { candidates: vec![] };
        assert_eq!(extract_text(response), EMPTY_REPLY_FALLBACK);
    }
}
