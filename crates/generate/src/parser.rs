use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use tracing::debug;

use crate::GenerationError;
use crate::schema::{Question, QuestionType};

/// Widest bracketed span: first `[` through last `]`.
static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("array pattern is valid"));

/// Locate the JSON-array-shaped part of free-form model output.
///
/// Brackets inside surrounding prose widen the span, in which case the
/// subsequent parse fails.
pub fn extract_json_array(text: &str) -> Option<&str> {
    JSON_ARRAY.find(text).map(|m| m.as_str())
}

/// Parse model output into questions.
///
/// Only the array itself has to be well formed. Elements that are not
/// objects or lack question text are skipped. A missing or unrecognised
/// `type` falls back to multiple choice when options are given and to
/// short answer otherwise.
pub fn parse_questions(response_text: &str) -> Result<Vec<Question>, GenerationError> {
    let array = extract_json_array(response_text).ok_or(GenerationError::NoJsonArray)?;
    let items: Vec<Value> = serde_json::from_str(array)?;

    let total = items.len();
    let questions: Vec<Question> = items.iter().filter_map(question_from_value).collect();

    if questions.len() < total {
        debug!(
            parsed = questions.len(),
            skipped = total - questions.len(),
            "Skipped malformed question entries"
        );
    }

    Ok(questions)
}

fn question_from_value(value: &Value) -> Option<Question> {
    let obj = value.as_object()?;

    let question = obj.get("question").map(value_to_text)?;
    if question.trim().is_empty() {
        return None;
    }

    let options: Vec<String> = match obj.get("options") {
        Some(Value::Array(items)) => items.iter().map(value_to_text).collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(label, text)| format!("{}) {}", label, value_to_text(text)))
            .collect(),
        _ => Vec::new(),
    };

    let declared = obj.get("type").and_then(Value::as_str);
    let question_type = match declared.map(str::parse::<QuestionType>) {
        Some(Ok(question_type)) => question_type,
        _ => {
            let fallback = if options.is_empty() {
                QuestionType::ShortAnswer
            } else {
                QuestionType::MultipleChoice
            };
            debug!(declared = ?declared, fallback = %fallback, "Unrecognised question type");
            fallback
        }
    };

    let correct_answer = obj.get("correct_answer").map(value_to_text).unwrap_or_default();
    let explanation = obj.get("explanation").map(value_to_text).unwrap_or_default();

    Some(Question::new(
        question_type,
        question,
        options,
        correct_answer,
        explanation,
    ))
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_array_surrounded_by_prose() {
        let text = r#"Sure! Here are your questions:
[{"type": "essay", "question": "Explain osmosis.", "options": [], "correct_answer": "...", "explanation": "..."}]
Let me know if you need more."#;

        let questions = parse_questions(text).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question_type, QuestionType::Essay);
        assert_eq!(questions[0].question, "Explain osmosis.");
    }

    #[test]
    fn test_widest_span_is_selected() {
        let text = "[1] first [2] second";
        assert_eq!(extract_json_array(text), Some("[1] first [2]"));
    }

    #[test]
    fn test_no_array_is_reported() {
        let err = parse_questions("I could not come up with anything.").unwrap_err();
        assert!(matches!(err, GenerationError::NoJsonArray));
    }

    #[test]
    fn test_broken_array_is_reported() {
        let err = parse_questions(r#"[{"type": "essay", "question": }]"#).unwrap_err();
        assert!(matches!(err, GenerationError::InvalidJson(_)));
    }

    #[test]
    fn test_bracketed_prose_breaks_the_parse() {
        let text = r#"See [note] below. [{"type": "essay", "question": "Why?"}]"#;
        assert!(matches!(
            parse_questions(text),
            Err(GenerationError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_multiple_choice_options_and_answers() {
        let text = r#"[
            {"type": "Multiple Choice", "question": "Powerhouse of the cell?",
             "options": ["A) Nucleus", "B) Mitochondria", "C) Ribosome", "D) Golgi"],
             "correct_answer": "B", "explanation": "Produces ATP."},
            {"type": "true_false", "question": "DNA is single stranded.",
             "options": ["True", "False"], "correct_answer": false, "explanation": null}
        ]"#;

        let questions = parse_questions(text).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].options.len(), 4);
        assert_eq!(questions[0].correct_answer, "B");
        assert!(questions[1].options.is_empty());
        assert_eq!(questions[1].correct_answer, "false");
        assert_eq!(questions[1].explanation, "");
    }

    #[test]
    fn test_options_given_as_object() {
        let text = r#"[{"type": "multiple_choice", "question": "Q?",
            "options": {"A": "one", "B": "two"}, "correct_answer": ["A", "B"]}]"#;

        let questions = parse_questions(text).unwrap();
        assert_eq!(questions[0].options, vec!["A) one", "B) two"]);
        assert_eq!(questions[0].correct_answer, "A, B");
    }

    #[test]
    fn test_unusable_entries_are_skipped() {
        let text = r#"[
            "just a string",
            42,
            {"type": "essay"},
            {"type": "short_answer", "question": "  "},
            {"type": "short_answer", "question": "Name a noble gas."}
        ]"#;

        let questions = parse_questions(text).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "Name a noble gas.");
    }

    #[test]
    fn test_loosely_typed_questions_are_kept() {
        let text = r#"[
            {"type": "Multiple-Choice Question", "question": "Largest planet?",
             "options": ["A) Mars", "B) Jupiter"], "correct_answer": "B", "explanation": "By mass."},
            {"type": "Short Answer Question", "question": "Define inertia.",
             "options": [], "correct_answer": "Resistance to change in motion", "explanation": ""},
            {"question": "Which gas do plants absorb?",
             "options": ["A) O2", "B) CO2"], "correct_answer": "B", "explanation": ""},
            {"type": "fill_in_the_blank", "question": "Water boils at ___ C at sea level.",
             "options": [], "correct_answer": "100", "explanation": ""}
        ]"#;

        let questions = parse_questions(text).unwrap();
        let types: Vec<QuestionType> = questions.iter().map(|q| q.question_type).collect();
        assert_eq!(
            types,
            vec![
                QuestionType::MultipleChoice,
                QuestionType::ShortAnswer,
                QuestionType::MultipleChoice,
                QuestionType::ShortAnswer,
            ]
        );
        assert_eq!(questions[2].options, vec!["A) O2", "B) CO2"]);
        assert_eq!(questions[3].correct_answer, "100");
    }

    #[test]
    fn test_non_string_type_uses_fallback() {
        let questions = parse_questions(r#"[{"type": 3, "question": "Explain drift."}]"#).unwrap();
        assert_eq!(questions[0].question_type, QuestionType::ShortAnswer);
    }

    #[test]
    fn test_empty_array_is_success_with_no_questions() {
        assert!(parse_questions("[]").unwrap().is_empty());
    }
}
