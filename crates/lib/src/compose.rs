//! Reply composition: answer, then resources (specific topics only), then the disclaimer.

use crate::channels::MAX_TEXT_CHARS;
use crate::intent::Topic;
use crate::language::Language;

const DISCLAIMER_EN: &str = "⚠️ This information is for educational purposes only. Always consult healthcare professionals for medical advice.";
const DISCLAIMER_TH: &str = "⚠️ ข้อมูลนี้เพื่อการศึกษาเท่านั้น กรุณาปรึกษาแพทย์เสมอสำหรับคำแนะนำทางการแพทย์";

const RESOURCES_EN: &str = "🏥 Additional Resources:\n• Department of Disease Control, Thailand\n• ACCESS Foundation\n• Local healthcare providers";
const RESOURCES_TH: &str = "🏥 ทรัพยากรเพิ่มเติม:\n• กรมควบคุมโรค กระทรวงสาธารณสุข\n• มูลนิธิ ACCESS\n• โรงพยาบาลใกล้บ้าน";

const FALLBACK_EN: &str = "I apologize, our system is currently experiencing issues. Please try again or contact our support team.\n\n⚠️ For medical emergencies, please contact healthcare providers immediately.";
const FALLBACK_TH: &str = "เสียใจด้วย ขณะนี้ระบบมีปัญหา กรุณาลองใหม่อีกครั้งหรือติดต่อเจ้าหน้าที่ของเรา\n\n⚠️ สำหรับปัญหาเร่งด่วนทางการแพทย์ กรุณาติดต่อแพทย์หรือโรงพยาบาลทันที";

const BLOCK_SEPARATOR: &str = "\n\n";

pub fn disclaimer(language: Language) -> &'static str {
    match language {
        Language::Thai => DISCLAIMER_TH,
        Language::English => DISCLAIMER_EN,
    }
}

pub fn resources(language: Language) -> &'static str {
    match language {
        Language::Thai => RESOURCES_TH,
        Language::English => RESOURCES_EN,
    }
}

/// Apology substituted for the answer when any step of resolution fails.
pub fn fallback_reply(language: Language) -> &'static str {
    match language {
        Language::Thai => FALLBACK_TH,
        Language::English => FALLBACK_EN,
    }
}

/// Build the outbound text for `raw_answer`.
///
/// The result never exceeds `MAX_TEXT_CHARS`: only the raw answer is clipped, so the
/// resources block and the disclaimer always survive. Not idempotent: calling it on its
/// own output appends a second disclaimer, so callers compose each answer exactly once.
pub fn compose(raw_answer: &str, topic: Topic, language: Language) -> String {
    let mut tail = String::new();
    if topic.is_specific() {
        tail.push_str(BLOCK_SEPARATOR);
        tail.push_str(resources(language));
    }
    tail.push_str(BLOCK_SEPARATOR);
    tail.push_str(disclaimer(language));

    let budget = MAX_TEXT_CHARS.saturating_sub(tail.chars().count());
    let answer = clip_chars(raw_answer, budget);
    let mut out = String::with_capacity(answer.len() + tail.len());
    out.push_str(answer);
    out.push_str(&tail);
    out
}

/// Longest prefix of `text` with at most `max` chars.
fn clip_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
