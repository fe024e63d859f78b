use crate::domain::chat::ChatMessage;
use crate::domain::contract::LlmUserQueryEnvelope;
use crate::domain::query::{InfoType, ParsedUserQuery};
use crate::error::{ChatError, ClassificationError};
use crate::llm::json;
use crate::llm::LlmClient;

pub fn classification_prompt(utterance: &str) -> String {
    let info_types = InfoType::CANONICAL_ORDER
        .iter()
        .map(|t| format!("'{}'", t.keyword()))
        .collect::<Vec<_>>()
        .join(", ");

    let schema = [
        "{",
        "  \"data\": {",
        "    \"intent\": \"\",",
        "    \"ticker\": \"\",",
        "    \"company_name\": \"\",",
        "    \"amount\": \"\",",
        "    \"sector\": \"\",",
        "    \"horizon\": \"\",",
        "    \"info_type\": \"\",",
        "    \"news\": \"\"",
        "  },",
        "  \"error\": null",
        "}",
    ]
    .join("\n");

    format!(
        "Given the user query, extract the following information:\n\
- intent (BUY, SELL, RESEARCH, OTHER); OTHER if unrelated to the stock market, finance, investment, stock market knowledge or wealth\n\
- ticker (Nasdaq stock ticker, if present)\n\
- company_name (the name of the company associated with the ticker, if present)\n\
- amount (any mentioned amount)\n\
- sector (any sector information, if present)\n\
- horizon (time frame, if mentioned)\n\
- news (if any news is referenced)\n\
- info_type (only if intent is RESEARCH; the data types needed, any of: {info_types})\n\
Respond with JSON only, in the following format. Set \"error\" to a short message only if the query cannot be interpreted at all.\n\
{schema}\n\n\
User query: \"{utterance}\""
    )
}

/// Decodes a raw classifier reply. Markdown fences around the JSON are tolerated.
pub fn parse_classification(raw: &str) -> Result<ParsedUserQuery, ClassificationError> {
    let malformed = |detail: String| ClassificationError::MalformedResponse {
        detail,
        raw_output: raw.to_string(),
    };

    let envelope: LlmUserQueryEnvelope =
        json::decode_reply(raw).map_err(|e| malformed(format!("not valid JSON: {e}")))?;

    if let Some(message) = envelope.reported_error() {
        return Err(ClassificationError::ModelReportedError(message.to_string()));
    }

    let data = envelope
        .data
        .ok_or_else(|| malformed("missing data object".to_string()))?;
    data.validate_and_into_query()
        .map_err(|e| malformed(format!("{e:#}")))
}

/// One completion request, no history, no retry.
pub async fn classify(llm: &dyn LlmClient, utterance: &str) -> Result<ParsedUserQuery, ChatError> {
    let prompt = classification_prompt(utterance);
    let reply = llm
        .complete(&[ChatMessage::user(prompt)])
        .await?
        .into_top_message(llm.provider_name())?;

    parse_classification(&reply.content).map_err(|err| {
        tracing::error!(operation = "classify", error = %err, "user query classification failed");
        ChatError::Classification(err)
    })
}
