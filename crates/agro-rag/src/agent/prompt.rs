//! Prompt templates for the agent

use crate::providers::vector_store::VectorSearchResult;

/// Rules appended to every system instruction
const RESPONSE_RULES: &str = "IMPORTANT: Always keep your responses concise, strictly between 2 to 4 lines. \
If you use the 'generate_report' tool, you MUST show the download link exactly as returned by the tool.";

/// Prompt builder for agent turns
pub struct PromptBuilder;

impl PromptBuilder {
    /// Base instruction followed by the fixed response rules
    pub fn system_instruction(base: &str) -> String {
        let base = base.trim_end();
        if base.is_empty() {
            RESPONSE_RULES.to_string()
        } else {
            format!("{}\n\n{}", base, RESPONSE_RULES)
        }
    }

    /// Render search hits for the model, one block per hit
    pub fn build_context(results: &[VectorSearchResult]) -> String {
        results
            .iter()
            .map(|result| {
                format!(
                    "Source: {}\nContent: {}",
                    result.chunk.metadata.to_json_string(),
                    result.chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chunk, DocumentMetadata};

    #[test]
    fn test_system_instruction_appends_rules() {
        let instruction = PromptBuilder::system_instruction("You are a helpful assistant");
        assert!(instruction.starts_with("You are a helpful assistant\n\n"));
        assert!(instruction.contains("strictly between 2 to 4 lines"));
        assert!(instruction.contains("download link exactly as returned by the tool"));
    }

    #[test]
    fn test_build_context() {
        let hit = |text: &str, page| VectorSearchResult {
            chunk: Chunk::new(text.to_string(), DocumentMetadata::pdf_page("documents/rice.pdf", page)),
            similarity: 0.9,
        };
        let context = PromptBuilder::build_context(&[hit("Blast", 0), hit("Brown spot", 3)]);
        assert_eq!(
            context,
            "Source: {\"source\":\"documents/rice.pdf\",\"page\":0,\"file_type\":\"pdf\"}\nContent: Blast\n\n\
             Source: {\"source\":\"documents/rice.pdf\",\"page\":3,\"file_type\":\"pdf\"}\nContent: Brown spot"
        );
        assert_eq!(PromptBuilder::build_context(&[]), "");
    }
}
