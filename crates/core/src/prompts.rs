/// The single normative prompt sent to the vision model for every image.
///
/// `{context}` is replaced with the first 500 characters of the page's
/// extracted text (or a placeholder when the page has no text).
const ALT_TEXT_PROMPT_TEMPLATE: &str = r#"Du bist ein Experte für barrierefreie Dokumente. Analysiere das folgende Bild aus einem PDF-Dokument und erstelle einen Alternativtext für blinde und sehbehinderte Nutzer.

Kontext aus dem umgebenden Text:
{context}

Antworte AUSSCHLIESSLICH mit einem JSON-Objekt in folgendem Format, ohne weitere Erklärungen davor oder danach:
{{"bildtyp": "foto|diagramm|tabelle|screenshot|icon|logo|karte|dekorativ", "alt_text": "<Alternativtext>", "ist_dekorativ": true|false, "konfidenz": "hoch|mittel|niedrig"}}

Regeln:
- Beginne den Alternativtext mit dem Bildtyp, z. B. "Foto von ..." oder "Diagramm: ...".
- Bei Diagrammen und Charts: Nenne den Trend und die auffälligsten Extremwerte, keine reine Achsenbeschreibung.
- Bei Screenshots: Lies den sichtbar dargestellten Text vor, soweit erkennbar.
- Bei rein dekorativen Bildern (Trennlinien, Hintergrundmuster, Rahmen): setze "alt_text" auf einen leeren String und "ist_dekorativ" auf true.
- Erfinde niemals Inhalte, die im Bild nicht zu erkennen sind.
- Markiere teilweise unleserliche Bereiche ausdrücklich als "teilweise nicht lesbar".
- Der Alternativtext soll aus 2 bis 4 Sätzen bestehen (etwa 150 bis 350 Zeichen).
"#;

/// Render the alt-text prompt for one image, substituting the page context.
pub fn alt_text_prompt(context_text: &str) -> String {
    let context = if context_text.trim().is_empty() {
        "(kein Text auf dieser Seite gefunden)"
    } else {
        context_text
    };
    ALT_TEXT_PROMPT_TEMPLATE.replace("{context}", context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_context() {
        let p = alt_text_prompt("Umsatzentwicklung 2020-2024");
        assert!(p.contains("Umsatzentwicklung 2020-2024"));
        assert!(p.contains("bildtyp"));
    }

    #[test]
    fn empty_context_gets_placeholder() {
        let p = alt_text_prompt("   ");
        assert!(p.contains("kein Text auf dieser Seite"));
    }
}
