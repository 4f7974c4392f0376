//! Tipos de dados para o endpoint de chat completions da Z.ai.
//!
//! O formato segue o contrato compatível com OpenAI: a requisição leva o
//! modelo, as mensagens e os parâmetros de amostragem; a resposta traz as
//! `choices` e as estatísticas de uso de tokens.

use serde::{Deserialize, Serialize};

use crate::stats::TokenUsage;

/// Corpo da requisição para `/chat/completions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub response_format: ResponseFormat,
    pub thinking: Thinking,
}

impl ChatRequest {
    /// Requisição com prompt de sistema e conteúdo do usuário, pedindo saída em JSON.
    pub fn json_review(
        model: &str,
        system_prompt: &str,
        user_content: String,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: user_content,
                },
            ],
            max_tokens,
            temperature,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object".into(),
            },
            thinking: Thinking {
                thinking_type: "enabled".into(),
            },
        }
    }
}

/// Uma mensagem da conversa ("system", "user" ou "assistant").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thinking {
    #[serde(rename = "type")]
    pub thinking_type: String,
}

/// Resposta do endpoint. Campos ausentes viram valores vazios para que a
/// validação aconteça no fluxo de revisão, não na desserialização.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Usage,
}

impl ChatResponse {
    /// Conteúdo textual da primeira escolha, se houver.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.as_ref())
            .and_then(|m| m.content.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Estatísticas de consumo de tokens de uma chamada.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default)]
    pub prompt_tokens_details: Option<PromptTokensDetails>,
    #[serde(default)]
    pub completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptTokensDetails {
    #[serde(default)]
    pub cached_tokens: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionTokensDetails {
    #[serde(default)]
    pub reasoning_tokens: u64,
}

impl Usage {
    /// Converte para os contadores agregados da execução.
    pub fn figures(&self) -> TokenUsage {
        TokenUsage {
            prompt: self.prompt_tokens,
            completion: self.completion_tokens,
            total: self.total_tokens,
            reasoning: self
                .completion_tokens_details
                .as_ref()
                .map_or(0, |d| d.reasoning_tokens),
            cached: self
                .prompt_tokens_details
                .as_ref()
                .map_or(0, |d| d.cached_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_request_wire_format() {
        let req = ChatRequest::json_review("glm-4.6", "be strict", "{}".into(), 4096, 0.1);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "glm-4.6");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "be strict");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["response_format"]["type"], "json_object");
        assert_eq!(json["thinking"]["type"], "enabled");
        assert_eq!(json["max_tokens"], 4096);
    }

    #[test]
    fn response_deserialize_from_api_format() {
        let api_json = r#"{
            "id": "chat-1",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "{\"summary\":{}}"}
            }],
            "usage": {
                "prompt_tokens": 120,
                "completion_tokens": 30,
                "total_tokens": 150,
                "prompt_tokens_details": {"cached_tokens": 20},
                "completion_tokens_details": {"reasoning_tokens": 12}
            }
        }"#;
        let resp: ChatResponse = serde_json::from_str(api_json).unwrap();
        assert_eq!(resp.first_content(), Some("{\"summary\":{}}"));

        let figures = resp.usage.figures();
        assert_eq!(figures.prompt, 120);
        assert_eq!(figures.total, 150);
        assert_eq!(figures.cached, 20);
        assert_eq!(figures.reasoning, 12);
    }

    #[test]
    fn response_without_choices_or_usage() {
        let resp: ChatResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.choices.is_empty());
        assert_eq!(resp.first_content(), None);
        assert_eq!(resp.usage.figures(), TokenUsage::default());
    }

    #[test]
    fn choice_with_null_content() {
        let resp: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(resp.choices.len(), 1);
        assert_eq!(resp.first_content(), None);
    }
}
