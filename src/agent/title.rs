//! Thread titles generated from the first exchange.

use tracing::{debug, warn};

use crate::providers::{ChatOptions, LLMProvider};
use crate::session::Message;
use crate::utils::string::prefix_chars;

use super::context::title_request;

/// Characters of question and answer shown to the title model.
const TITLE_INPUT_CHARS: usize = 100;
/// Characters of the question used when no title could be generated.
const FALLBACK_TITLE_CHARS: usize = 15;

/// Title used when the model call fails or returns nothing usable.
pub fn fallback_title(question: &str) -> String {
    let question = question.trim();
    if question.is_empty() {
        "New conversation".to_string()
    } else {
        prefix_chars(question, FALLBACK_TITLE_CHARS)
    }
}

/// Strip whitespace and the quote marks models like to wrap titles in.
pub fn clean_title(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”' | '《' | '》'))
        .trim()
        .to_string()
}

/// Generate a title for a new thread. Never fails.
pub async fn generate_title(
    provider: &dyn LLMProvider,
    model: &str,
    question: &str,
    answer: &str,
) -> String {
    let question_in = match prefix_chars(question, TITLE_INPUT_CHARS) {
        q if q.trim().is_empty() => "(empty question)".to_string(),
        q => q,
    };
    let answer_in = match prefix_chars(answer, TITLE_INPUT_CHARS) {
        a if a.trim().is_empty() => "(empty answer)".to_string(),
        a => a,
    };

    let prompt = vec![Message::user(&title_request(&question_in, &answer_in))];
    let options = ChatOptions::new().with_max_tokens(64).with_temperature(0.3);

    match provider.chat(prompt, vec![], Some(model), options).await {
        Ok(response) => {
            let title = clean_title(&response.content);
            if title.is_empty() {
                fallback_title(question)
            } else {
                debug!(title = %title, "Generated thread title");
                title
            }
        }
        Err(e) => {
            warn!(error = %e, "Title generation failed");
            fallback_title(question)
        }
    }
}
