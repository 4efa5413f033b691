//! Self-claim extraction from a response.

use kindred_types::llm::{GenerationParams, ModelError};

use crate::llm::BoxModelClient;

pub fn claims_prompt(response: &str) -> String {
    format!("List factual assertions the assistant made about itself: {response}")
}

/// One claim per non-blank line, list markers stripped.
pub fn parse_claims(output: &str) -> Vec<String> {
    output
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', ' ']).trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub async fn extract_claims(
    client: &BoxModelClient,
    response: &str,
) -> Result<Vec<String>, ModelError> {
    let params = GenerationParams {
        max_tokens: 256,
        temperature: Some(0.0),
        top_p: None,
    };
    let output = client.call(&claims_prompt(response), &params).await?;
    Ok(parse_claims(&output.text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedModel;

    #[test]
    fn parse_strips_markers_and_blanks() {
        let claims = parse_claims("- I like tea\n\n  * I live in Oslo  \nI am patient\n-\n");
        assert_eq!(claims, vec!["I like tea", "I live in Oslo", "I am patient"]);
    }

    #[tokio::test]
    async fn extract_uses_the_claims_prompt() {
        let model = ScriptedModel::new("m").reply("- I enjoy chess");
        let client = BoxModelClient::new(model.clone());
        let claims = extract_claims(&client, "I enjoy chess a lot").await.unwrap();
        assert_eq!(claims, vec!["I enjoy chess"]);
        let calls = model.calls();
        assert_eq!(
            calls[0].0,
            "List factual assertions the assistant made about itself: I enjoy chess a lot"
        );
    }
}
