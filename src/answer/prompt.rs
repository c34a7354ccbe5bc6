//! Grounding prompt template and fixed answer sentences

use crate::index::ScoredChunk;

/// Sentence used when the context does not contain the answer
pub const NOT_FOUND_SENTENCE: &str =
    "This information could not be found in the provided material.";

/// Disclaimer that ends every answer
pub const DISCLAIMER: &str = "⚠️ This information is for reference only; actual diagnosis and prescription must be made by a licensed veterinarian.";

/// Recommendation added to answers for emergency-relevant questions
pub const URGENT_CARE_SENTENCE: &str =
    "🚨 This may be an emergency: take the animal to an emergency veterinary hospital immediately.";

/// Lowercase fragments that mark a question as emergency-relevant
const EMERGENCY_TERMS: &[&str] = &[
    "seizure",
    "convuls",
    "fitting",
    "not breathing",
    "can't breathe",
    "cannot breathe",
    "difficulty breathing",
    "trouble breathing",
    "labored breathing",
    "laboured breathing",
    "gasping",
    "choking",
    "shock",
    "collapse",
    "unconscious",
    "unresponsive",
    "heavy bleeding",
    "bleeding heavily",
    "heatstroke",
    "heat stroke",
    "bloat",
    "poisoning",
    "poisoned",
    "발작",
    "경련",
    "호흡곤란",
    "쇼크",
    "의식",
    "중독",
];

/// Lowercase forms of the not-found sentence, including translations a
/// model may produce when answering in another language
const NOT_FOUND_FORMS: &[&str] = &[
    "could not be found in the provided material",
    "제공된 자료에서 확인할 수 없습니다",
    "제공된 자료에서 찾을 수 없습니다",
];

/// Whether a model reply says the context does not hold the answer
pub fn is_not_found_reply(reply: &str) -> bool {
    let lower = reply.to_lowercase();
    NOT_FOUND_FORMS.iter().any(|form| lower.contains(form))
}

/// Whether a question describes an emergency situation
pub fn is_emergency(question: &str) -> bool {
    let lower = question.to_lowercase();
    EMERGENCY_TERMS.iter().any(|term| lower.contains(term))
}

/// Fixed grounding-and-safety template
#[derive(Debug, Clone)]
pub struct GroundingPrompt {
    language: String,
}

impl GroundingPrompt {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    /// Number each passage and tag it with its citation
    pub fn format_context(passages: &[&ScoredChunk]) -> String {
        passages
            .iter()
            .enumerate()
            .map(|(i, p)| format!("[{}] {}\n{}", i + 1, p.chunk.citation(), p.chunk.text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn render(&self, question: &str, passages: &[&ScoredChunk], emergency: bool) -> String {
        let context = Self::format_context(passages);
        let emergency_note = if emergency {
            format!(
                "\nNOTE: This question describes a possible emergency. Rule 5 applies: include \"{}\" in your answer.\n",
                URGENT_CARE_SENTENCE
            )
        } else {
            String::new()
        };

        format!(
            r#"You are a veterinary medicine assistant.

The "Context" below was retrieved from trusted veterinary material (PDFs, guidelines, textbooks, papers).

Your rules:

1) Answer using only information found in the Context.
2) Never guess or invent anything the Context does not confirm.
3) If the Context does not contain the answer, reply with exactly: "{not_found}"
   Keep that sentence in English, word for word, even when answering in {language}.
4) State drug doses, dosing intervals and contraindications only when the Context supports them.
5) For emergencies (seizures, breathing difficulty, shock and similar), recommend an immediate visit to an emergency animal hospital.
6) Always end with this exact sentence:
   "{disclaimer}"
{emergency_note}
[Context]
{context}

[Question]
{question}

Following the rules above, answer clearly and in a structured way, in {language}:

- Summary answer
- Medical explanation (based on the Context)
- Cautions or contraindications
- Sources (which document/page each point comes from)
"#,
            not_found = NOT_FOUND_SENTENCE,
            disclaimer = DISCLAIMER,
            emergency_note = emergency_note,
            context = context,
            question = question.trim(),
            language = self.language,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::Chunk;
    use crate::loader::DocumentFormat;

    fn passage(text: &str, page: usize) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                text: text.to_string(),
                source: "documents/guide.pdf".to_string(),
                format: DocumentFormat::Pdf,
                page,
                sequence: 0,
                hash: String::new(),
            },
            score: 0.9,
        }
    }

    #[test]
    fn test_emergency_detection() {
        assert!(is_emergency("My dog is having a SEIZURE right now"));
        assert!(is_emergency("cat has difficulty breathing"));
        assert!(is_emergency("강아지가 발작을 해요"));
        assert!(!is_emergency("Can dogs eat carrots?"));
    }

    #[test]
    fn test_render_contains_rules_context_and_question() {
        let a = passage("Chocolate contains theobromine.", 0);
        let b = passage("Grapes cause kidney failure.", 3);
        let prompt = GroundingPrompt::new("English").render(
            "My dog ate chocolate?",
            &[&a, &b],
            false,
        );

        assert!(prompt.contains("[1] guide.pdf (page 1)\nChocolate contains theobromine."));
        assert!(prompt.contains("[2] guide.pdf (page 4)\nGrapes cause kidney failure."));
        assert!(prompt.contains("[Question]\nMy dog ate chocolate?"));
        assert!(prompt.contains(NOT_FOUND_SENTENCE));
        assert!(prompt.contains(DISCLAIMER));
        assert!(prompt.contains("in English"));
        assert!(!prompt.contains("NOTE: This question describes a possible emergency"));
    }

    #[test]
    fn test_render_emergency_note_and_language() {
        let a = passage("Seizures lasting over 5 minutes are an emergency.", 0);
        let prompt = GroundingPrompt::new("Korean").render("seizure", &[&a], true);

        assert!(prompt.contains(URGENT_CARE_SENTENCE));
        assert!(prompt.contains("in Korean"));
    }

    #[test]
    fn test_not_found_sentence_stays_english_for_other_languages() {
        let a = passage("Grapes cause kidney failure.", 0);
        let prompt = GroundingPrompt::new("Korean").render("raisins?", &[&a], false);

        assert!(prompt.contains(&format!("reply with exactly: \"{}\"", NOT_FOUND_SENTENCE)));
        assert!(prompt.contains("Keep that sentence in English, word for word, even when answering in Korean."));
    }

    #[test]
    fn test_not_found_reply_detection() {
        assert!(is_not_found_reply(NOT_FOUND_SENTENCE));
        assert!(is_not_found_reply(
            "This information could not be found in the provided material"
        ));
        assert!(is_not_found_reply(
            "해당 정보는 제공된 자료에서 확인할 수 없습니다.\n\n⚠️ 참고용입니다."
        ));
        assert!(!is_not_found_reply(
            "Grapes can cause acute kidney injury in dogs [1]."
        ));
        assert!(!is_not_found_reply("포도는 개에게 급성 신부전을 일으킬 수 있습니다."));
    }
}
