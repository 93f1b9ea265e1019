//! Money and number normalization for Brazilian listing sites.
//!
//! Every function here is total: unparsable input yields `0` or `None`.

/// Annual property-tax amounts are reported by some sites; anything above this is
/// treated as a yearly figure.
pub const ANNUAL_TAX_THRESHOLD: f64 = 500.0;

// ── Money ─────────────────────────────────────────────────────────────────────

/// Parse a BRL amount: strip everything except digits, comma, dot, minus.
/// "R$ 1.234,56" → 1234.56 | "2.500" → 2500.0 | "1250.5" → 1250.5 | "" → 0.0
///
/// With a comma present the last comma is the decimal mark and dots are thousands.
/// Without one, a dot is a thousands separator when it repeats or is followed by
/// exactly three digits.
pub fn parse_brl(s: &str) -> f64 {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let normalized = if let Some(pos) = cleaned.rfind(',') {
        let (int_part, frac_part) = cleaned.split_at(pos);
        let int_part: String = int_part.chars().filter(|c| *c != '.' && *c != ',').collect();
        format!("{}.{}", int_part, &frac_part[1..])
    } else if cleaned.matches('.').count() > 1 {
        cleaned.replace('.', "")
    } else if let Some(pos) = cleaned.rfind('.') {
        let frac = &cleaned[pos + 1..];
        if frac.len() == 3 {
            cleaned.replace('.', "")
        } else {
            cleaned
        }
    } else {
        cleaned
    };

    non_negative(normalized.parse().unwrap_or(0.0))
}

/// Parse a number that uses comma as decimal mark and never groups thousands.
/// "75,5 m²" → 75.5 | "3" → 3.0
pub fn parse_decimal_comma(s: &str) -> f64 {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.'))
        .collect();
    non_negative(cleaned.replace(',', ".").parse().unwrap_or(0.0))
}

/// Keep only the ASCII digits. "R$ 2.350" → 2350.0
pub fn parse_digits(s: &str) -> f64 {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0.0)
}

/// Count of rooms, bathrooms or spots; `None` when the text carries no digit.
pub fn parse_count(s: &str) -> Option<u32> {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// First run of digits in the text. "2 quartos (1 suíte)" → Some(2)
pub fn parse_leading_int(s: &str) -> Option<u32> {
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Monthly share of a property tax that may be quoted per year.
pub fn monthly_tax(amount: f64) -> f64 {
    if amount > ANNUAL_TAX_THRESHOLD {
        amount / 12.0
    } else {
        amount
    }
}

/// Positive areas only; zero means "not reported".
pub fn positive(x: f64) -> Option<f64> {
    (x > 0.0).then_some(x)
}

fn non_negative(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 { x } else { 0.0 }
}

// ── Text ──────────────────────────────────────────────────────────────────────

/// Collapse runs of whitespace (including non-breaking spaces) and trim.
pub fn clean_text(s: &str) -> String {
    s.split(|c: char| c.is_whitespace() || c == '\u{a0}')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn non_empty(s: &str) -> Option<String> {
    let s = clean_text(s);
    (!s.is_empty()).then_some(s)
}

/// Replace Portuguese accented letters by their ASCII base.
pub fn fold_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

/// Key for an amenity label: "Área Privat." → "area_privat"
pub fn amenity_key(label: &str) -> String {
    clean_text(&fold_accents(label))
        .replace(' ', "_")
        .replacen('.', "", 1)
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::fmt_brl;

    #[test]
    fn test_parse_brl() {
        assert_eq!(parse_brl("R$ 1.234,56"), 1234.56);
        assert_eq!(parse_brl("R$ 2.500"), 2500.0);
        assert_eq!(parse_brl("R$\u{a0}980,00"), 980.0);
        assert_eq!(parse_brl("1.250.000"), 1_250_000.0);
        assert_eq!(parse_brl("1250.5"), 1250.5);
        assert_eq!(parse_brl("Consulte"), 0.0);
        assert_eq!(parse_brl(""), 0.0);
        assert_eq!(parse_brl("-150,00"), 0.0);
    }

    #[test]
    fn formatted_amounts_survive_a_round_trip() {
        for x in [0.5, 12.0, 980.0, 1234.56, 2500.0, 18_999.99, 1_250_000.0] {
            let back = parse_brl(&fmt_brl(x));
            assert!((back - x).abs() < 1e-9, "{} -> {} -> {}", x, fmt_brl(x), back);
        }
    }

    #[test]
    fn test_parse_decimal_comma_and_counts() {
        assert_eq!(parse_decimal_comma("75,5 m²"), 75.5);
        assert_eq!(parse_decimal_comma("n/d"), 0.0);
        assert_eq!(parse_digits("R$ 2.350"), 2350.0);
        assert_eq!(parse_count("2 quartos"), Some(2));
        assert_eq!(parse_count("—"), None);
        assert_eq!(parse_leading_int("2 quartos (1 suíte)"), Some(2));
    }

    #[test]
    fn annual_tax_is_prorated_only_above_threshold() {
        assert_eq!(monthly_tax(1200.0), 100.0);
        assert_eq!(monthly_tax(500.0), 500.0);
        assert_eq!(monthly_tax(85.0), 85.0);
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(clean_text("  Trindade \n\t Florianópolis "), "Trindade Florianópolis");
        assert_eq!(non_empty("   "), None);
        assert_eq!(fold_accents("Córrego São João"), "Corrego Sao Joao");
        assert_eq!(amenity_key("Área Privat."), "area_privat");
        assert_eq!(amenity_key("Quartos"), "quartos");
    }
}
