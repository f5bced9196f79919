use crate::schema::QuestionType;

pub fn build_question_prompt(
    chunk_text: &str,
    question_types: &[QuestionType],
    question_count: usize,
) -> String {
    let types = if question_types.is_empty() {
        QuestionType::ALL.to_vec()
    } else {
        question_types.to_vec()
    };
    let type_list = types
        .iter()
        .map(QuestionType::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Write {count} study questions that help a student learn and review the material below.

MATERIAL:
{text}

INSTRUCTIONS:
1. Use a mix of these question types: {types}
2. Test understanding of key concepts, relationships and practical applications, not just recall
3. For multiple_choice questions give exactly 4 options labelled A, B, C and D
4. Give the correct answer and a short explanation of why it is correct
5. Output ONLY a JSON array, nothing else

SCHEMA:
[
  {{"type": "multiple_choice|short_answer|true_false|essay", "question": "question text", "options": ["A) ...", "B) ...", "C) ...", "D) ..."], "correct_answer": "the correct answer", "explanation": "why it is correct"}}
]

RULES:
- "type" must be one of: {types}
- "options" is an empty array for every type except multiple_choice
- No markdown, no code blocks, no text before or after the array

JSON OUTPUT:"#,
        count = question_count,
        text = chunk_text,
        types = type_list,
    )
}
