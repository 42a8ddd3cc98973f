//! Prompt templates for each study mode.

use super::models::PromptMode;

const QUIZ_TEMPLATE: &str = "You are a study coach. Based on the following notes/topic, generate a quiz with exactly 5 multiple-choice questions. Each question should have 4 options (A-D) with one correct answer. Format your response as JSON only, no markdown, no backticks: {\"questions\":[{\"q\":\"question text\",\"options\":[\"A) ...\",\"B) ...\",\"C) ...\",\"D) ...\"],\"correct\":0,\"explanation\":\"brief explanation\"}]}. Notes/Topic: ";

const FLASHCARDS_TEMPLATE: &str = "You are a study coach. Based on the following notes/topic, generate exactly 8 flashcards that cover the key concepts. Format your response as JSON only, no markdown, no backticks: {\"cards\":[{\"front\":\"term or question\",\"back\":\"definition or answer\"}]}. Notes/Topic: ";

const SUMMARY_TEMPLATE: &str = "You are a study coach. Based on the following notes/topic, create a concise study summary with key takeaways. Format your response as JSON only, no markdown, no backticks: {\"title\":\"topic title\",\"sections\":[{\"heading\":\"section heading\",\"points\":[\"key point 1\",\"key point 2\"]}],\"keyTerms\":[{\"term\":\"term\",\"definition\":\"definition\"}]}. Notes/Topic: ";

const EXPLAIN_TEMPLATE: &str = "You are a study coach. The student is confused about the following topic. Explain it simply using an analogy, then give a concrete example. Format your response as JSON only, no markdown, no backticks: {\"topic\":\"topic name\",\"simpleExplanation\":\"explanation in simple terms\",\"analogy\":\"real-world analogy\",\"example\":\"concrete example\",\"commonMistakes\":[\"mistake 1\",\"mistake 2\"]}. Notes/Topic: ";

fn template(mode: PromptMode) -> &'static str {
    match mode {
        PromptMode::Quiz => QUIZ_TEMPLATE,
        PromptMode::Flashcards => FLASHCARDS_TEMPLATE,
        PromptMode::Summary => SUMMARY_TEMPLATE,
        PromptMode::Explain => EXPLAIN_TEMPLATE,
    }
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Build the full instruction sent to the model
pub fn render(mode: PromptMode, notes: &str) -> String {
    let template = template(mode);
    let mut prompt = String::with_capacity(template.len() + notes.len());
    prompt.push_str(template);
    prompt.push_str(notes);
    prompt
}

/// Remove Markdown code-fence markers the model sometimes adds anyway
pub fn strip_code_fences(text: &str) -> String {
    text.replace("```json", "").replace("```", "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_prompt_untouched() {
        assert_eq!(truncate_chars("photosynthesis", 2000), "photosynthesis");
        assert_eq!(truncate_chars("", 10), "");
    }

    #[test]
    fn test_truncate_long_prompt() {
        let long = "a".repeat(2500);
        assert_eq!(truncate_chars(&long, 2000).len(), 2000);
    }

    #[test]
    fn test_truncate_counts_characters_not_bytes() {
        assert_eq!(truncate_chars("éééé", 2), "éé");
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
    }

    #[test]
    fn test_render_appends_notes() {
        let prompt = render(PromptMode::Flashcards, "The French Revolution");
        assert!(prompt.starts_with("You are a study coach."));
        assert!(prompt.contains("exactly 8 flashcards"));
        assert!(prompt.ends_with("Notes/Topic: The French Revolution"));
    }

    #[test]
    fn test_each_mode_has_its_schema() {
        assert!(render(PromptMode::Quiz, "x").contains("\"questions\""));
        assert!(render(PromptMode::Flashcards, "x").contains("\"cards\""));
        assert!(render(PromptMode::Summary, "x").contains("\"keyTerms\""));
        assert!(render(PromptMode::Explain, "x").contains("\"commonMistakes\""));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n[1,2]\n```"), "[1,2]");
    }
}
