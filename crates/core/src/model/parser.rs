use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::entities::{AltTextRecord, Bildtyp, Konfidenz};

const META_PHRASES: &[&str] = &[
    "should be",
    "would be",
    "the user",
    "according to",
    "the rules say",
];

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<think>.*?</think>").unwrap());

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{[^{}]*"alt_text"[^{}]*\}"#).unwrap());

static SALVAGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r#""alt_text"\s*:\s*"([^"]+)""#).unwrap(),
        Regex::new(r#"(?i)alt[_-]?text\s*:\s*"([^"]+)""#).unwrap(),
        Regex::new(r#"(?i)alt[_-]?text\s+(?:should|would|could|is|shall)\s+be\s*"([^"]+)""#)
            .unwrap(),
        Regex::new(r#"(?i)alt[_-]?text\s+(?:waere|wäre|ist|lautet|sollte sein)\s*"([^"]+)""#)
            .unwrap(),
        Regex::new(r#"(?is)alt_text.*?"([^"]{15,})""#).unwrap(),
        Regex::new(r#"(?i)alt[_-]?text:\s*(.+?)(?:\n|$)"#).unwrap(),
    ]
});

/// Last qualifying quoted string (15+ chars) anywhere after the `alt_text`
/// token, not only when it's anchored to the end of the input.
static LAST_QUOTED_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]{15,})""#).unwrap());

static ALT_TEXT_TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)alt_text").unwrap());

static BILDTYP_KEYWORDS: &[(&str, Bildtyp)] = &[
    ("logo", Bildtyp::Logo),
    ("foto", Bildtyp::Foto),
    ("diagramm", Bildtyp::Diagramm),
    ("chart", Bildtyp::Diagramm),
    ("tabelle", Bildtyp::Tabelle),
    ("screenshot", Bildtyp::Screenshot),
    ("icon", Bildtyp::Icon),
    ("dekorativ", Bildtyp::Dekorativ),
    ("karte", Bildtyp::Karte),
];

/// Parse a raw model reply into the canonical alt-text record.
///
/// `response` and `thinking` mirror the two string fields the model
/// endpoint returns; either may be empty. Never fails — worst case returns
/// a `Bildtyp::Unbekannt`/sentinel record so the pipeline always has
/// something to persist for the image.
pub fn parse_model_reply(response: &str, thinking: &str, max_alt_text_len: usize) -> AltTextRecord {
    let clean = strip_think_blocks(response);
    let clean = if clean.trim().is_empty() { response } else { &clean };

    if let Some(record) = fenced_json_scan(clean) {
        return finalize(record, response, max_alt_text_len);
    }
    if let Some(record) = outer_brace_scan(clean) {
        return finalize(record, response, max_alt_text_len);
    }
    if response.trim().is_empty() && !thinking.trim().is_empty() {
        if let Some(record) = thinking_salvage(thinking) {
            return finalize(record, thinking, max_alt_text_len);
        }
    }
    fallback(clean, response, max_alt_text_len)
}

fn strip_think_blocks(s: &str) -> String {
    THINK_BLOCK.replace_all(s, "").trim().to_string()
}

/// Strategy 2: scan for fenced `{...}` substrings containing `"alt_text"`,
/// last match wins.
fn fenced_json_scan(clean: &str) -> Option<AltTextRecord> {
    let mut last = None;
    for m in FENCED_JSON.find_iter(clean) {
        if let Ok(v) = serde_json::from_str::<Value>(m.as_str()) {
            if v.get("alt_text").is_some() {
                last = Some(v);
            }
        }
    }
    last.map(record_from_json)
}

/// Strategy 3: take everything between the first `{` and the last `}`.
fn outer_brace_scan(clean: &str) -> Option<AltTextRecord> {
    let start = clean.find('{')?;
    let end = clean.rfind('}')?;
    if end <= start {
        return None;
    }
    let candidate = &clean[start..=end];
    let v: Value = serde_json::from_str(candidate).ok()?;
    if v.get("alt_text").is_some_and(|t| !t.is_null()) {
        Some(record_from_json(v))
    } else {
        None
    }
}

/// Strategy 4: salvage an alt-text out of the model's chain-of-thought when
/// it never produced a final `response`.
fn thinking_salvage(thinking: &str) -> Option<AltTextRecord> {
    for (idx, re) in SALVAGE_PATTERNS.iter().enumerate() {
        let text = if idx == 4 {
            // Take the last qualifying quoted string after "alt_text", not
            // just the first one `.*?` happens to stop at.
            let start = ALT_TEXT_TOKEN.find(thinking)?.start();
            LAST_QUOTED_CANDIDATE
                .find_iter(&thinking[start..])
                .last()
                .map(|m| m.as_str().trim_matches('"').trim().to_string())
        } else {
            re.captures(thinking)
                .and_then(|caps| caps.get(caps.len() - 1))
                .map(|m| m.as_str().trim().to_string())
        };

        let Some(text) = text else { continue };
        if text.len() <= 10 {
            continue;
        }
        let lower = text.to_lowercase();
        if META_PHRASES.iter().any(|p| lower.contains(p)) {
            continue;
        }
        let bildtyp = infer_bildtyp(thinking);
        return Some(AltTextRecord {
            bildtyp,
            alt_text: text,
            ist_dekorativ: bildtyp == Bildtyp::Dekorativ,
            konfidenz: Konfidenz::Mittel,
            raw_response: thinking.to_string(),
        });
    }
    None
}

/// Strategy 5: strip obvious JSON/code-fence noise and use whatever text
/// remains, or emit the unparsable-reply sentinel.
fn fallback(clean: &str, raw: &str, max_alt_text_len: usize) -> AltTextRecord {
    let stripped = clean
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();

    let text = if stripped.len() < 5 { clean.trim().to_string() } else { stripped };

    let alt_text = if text.is_empty() {
        let preview: String = raw.chars().take(200).collect();
        format!("[Modell-Antwort konnte nicht verarbeitet werden: {preview}]")
    } else {
        truncate_alt_text(&text, max_alt_text_len)
    };

    AltTextRecord {
        bildtyp: Bildtyp::Unbekannt,
        alt_text,
        ist_dekorativ: false,
        konfidenz: Konfidenz::Mittel,
        raw_response: raw.to_string(),
    }
}

fn infer_bildtyp(text: &str) -> Bildtyp {
    let lower = text.to_lowercase();
    for (kw, ty) in BILDTYP_KEYWORDS {
        if lower.contains(kw) {
            return *ty;
        }
    }
    Bildtyp::Unbekannt
}

fn record_from_json(v: Value) -> AltTextRecord {
    let alt_text = v
        .get("alt_text")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let langbeschreibung = v.get("langbeschreibung").and_then(Value::as_str);
    let alt_text = compose_long_form(&alt_text, langbeschreibung);

    let bildtyp = v
        .get("bildtyp")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Bildtyp>().ok())
        .unwrap_or(Bildtyp::Unbekannt);

    let konfidenz = v
        .get("konfidenz")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Konfidenz>().ok())
        .unwrap_or_default();

    let ist_dekorativ = v
        .get("ist_dekorativ")
        .and_then(Value::as_bool)
        .unwrap_or(false)
        || alt_text.to_lowercase().contains("dekorativ")
        || bildtyp == Bildtyp::Dekorativ;

    AltTextRecord {
        bildtyp,
        alt_text,
        ist_dekorativ,
        konfidenz,
        raw_response: String::new(),
    }
}

fn compose_long_form(short: &str, long: Option<&str>) -> String {
    match long {
        Some(long) if !long.trim().is_empty() => {
            let prefix_len = short.len().min(30);
            if long.starts_with(&short[..prefix_len]) {
                long.to_string()
            } else {
                format!("{short}. {long}")
            }
        }
        _ => short.to_string(),
    }
}

fn finalize(mut record: AltTextRecord, raw: &str, max_alt_text_len: usize) -> AltTextRecord {
    record.raw_response = raw.to_string();
    record.alt_text = truncate_alt_text(&record.alt_text, max_alt_text_len);
    record
}

/// Truncate to `max_len` characters at the last sentence terminator past
/// character 80, otherwise hard-cut at `max_len`.
pub fn truncate_alt_text(text: &str, max_len: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_len {
        return text.to_string();
    }

    let window: Vec<char> = chars[..max_len].to_vec();
    let window_str: String = window.iter().collect();

    // A sentence terminator is the two-char sequence punctuation + space, not
    // a bare '.'/'!'/'?' — otherwise "ca. 2 Meter" would cut mid-sentence.
    // The trailing space is kept in the returned slice.
    let mut best_cut: Option<usize> = None; // char index, inclusive of the terminator + space
    for term in [". ", "! ", "? "] {
        if let Some(byte_pos) = window_str.rfind(term) {
            let char_idx = window_str[..byte_pos + term.len()].chars().count() - 1;
            if char_idx > 80 {
                best_cut = Some(best_cut.map_or(char_idx, |b| b.max(char_idx)));
            }
        }
    }

    match best_cut {
        Some(idx) => window[..=idx].iter().collect(),
        None => window_str,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_json() {
        let r = parse_model_reply(
            r#"{"bildtyp":"diagramm","alt_text":"Balkendiagramm mit steigendem Umsatz.","ist_dekorativ":false,"konfidenz":"hoch"}"#,
            "",
            400,
        );
        assert_eq!(r.bildtyp, Bildtyp::Diagramm);
        assert_eq!(r.konfidenz, Konfidenz::Hoch);
        assert!(r.alt_text.contains("Umsatz"));
    }

    #[test]
    fn fenced_json_last_match_wins() {
        let reply = r#"Hier ist ein Entwurf: {"alt_text":"entwurf"} Nach Überlegung: {"bildtyp":"foto","alt_text":"Endgültiges Foto einer Landschaft."}"#;
        let r = parse_model_reply(reply, "", 400);
        assert_eq!(r.bildtyp, Bildtyp::Foto);
        assert!(r.alt_text.contains("Endgültiges"));
    }

    #[test]
    fn strips_think_blocks_before_scanning() {
        let reply = r#"<think>internal reasoning {"alt_text":"wrong"}</think>{"bildtyp":"icon","alt_text":"Symbol eines Druckers."}"#;
        let r = parse_model_reply(reply, "", 400);
        assert_eq!(r.bildtyp, Bildtyp::Icon);
        assert!(r.alt_text.contains("Druckers"));
    }

    #[test]
    fn salvages_from_thinking_when_response_empty() {
        let thinking = r#"Das Bild zeigt einen Balkenchart. Ich denke der alt_text sollte sein "Balkendiagramm – Umsatz von 2020 bis 2024 gestiegen von 1 auf 3 Millionen Euro.""#;
        let r = parse_model_reply("", thinking, 400);
        assert!(r.alt_text.contains("Umsatz"));
        assert_eq!(r.bildtyp, Bildtyp::Diagramm);
    }

    #[test]
    fn rejects_meta_phrase_candidates() {
        let thinking = r#"alt_text: the user should be shown a description here"#;
        let r = parse_model_reply("", thinking, 400);
        // meta-phrase candidate rejected -> falls through to fallback sentinel
        assert_eq!(r.bildtyp, Bildtyp::Unbekannt);
    }

    #[test]
    fn decorative_alt_text_flagged() {
        let r = parse_model_reply(
            r#"{"bildtyp":"dekorativ","alt_text":"","ist_dekorativ":true,"konfidenz":"hoch"}"#,
            "",
            400,
        );
        assert!(r.ist_dekorativ);
        assert_eq!(r.alt_text, "");
    }

    #[test]
    fn truncates_long_alt_text_at_sentence_terminator() {
        let sentence = "Ein Diagramm zeigt mehrere Werte. ".repeat(20);
        let truncated = truncate_alt_text(&sentence, 400);
        assert!(truncated.chars().count() <= 400);
        assert!(truncated.ends_with(". "));
    }

    #[test]
    fn completely_unparsable_reply_gets_sentinel() {
        let r = parse_model_reply("�����", "", 400);
        assert!(r.alt_text.contains("konnte nicht verarbeitet werden") || !r.alt_text.is_empty());
    }
}
