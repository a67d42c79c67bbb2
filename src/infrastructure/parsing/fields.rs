//! Field normalization for scraped text
//!
//! Pure helpers shared by the listing and detail parsers. None of them fail:
//! unrecognized input yields `None`, an empty string or the default gender.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::Gender;

static PRICE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+),-").expect("price pattern compiles"));

static COLOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Farge:\s*(?:\d+-)?([a-zæøå]+)").expect("color pattern compiles")
});

static GENDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)-(herre|dame|barn|junior|alle|unisex)").expect("gender pattern compiles")
});

/// Parse a localized price such as `"1 299,-"` into whole kroner.
///
/// All whitespace (including non-breaking spaces used as thousands
/// separators) is removed before matching `<digits>,-`. Returns `None` when
/// the pattern is absent or the number does not fit.
pub fn parse_price(text: &str) -> Option<i64> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    PRICE_PATTERN
        .captures(&compact)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}

/// Extract the color word from a `Farge: [code-]<word>` label, title-cased.
pub fn parse_color(label: &str) -> String {
    COLOR_PATTERN
        .captures(label)
        .and_then(|caps| caps.get(1))
        .map(|word| title_case(word.as_str()))
        .unwrap_or_default()
}

/// Infer the target group from a product href, defaulting to unisex.
pub fn infer_gender(href: &str) -> Gender {
    GENDER_PATTERN
        .captures(href)
        .and_then(|caps| caps.get(1))
        .and_then(|slug| slug.as_str().parse().ok())
        .unwrap_or_default()
}

/// First letter uppercase, the rest lowercase
pub fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1 299,-", Some(1299))]
    #[case("1\u{a0}299,-", Some(1299))]
    #[case(" 899,- ", Some(899))]
    #[case("12 499,-", Some(12499))]
    #[case("1299", None)]
    #[case("kr 1299", None)]
    #[case("", None)]
    #[case("99999999999999999999999,-", None)]
    fn parses_localized_prices(#[case] text: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_price(text), expected);
    }

    #[rstest]
    #[case("Farge: 123-rød", "Rød")]
    #[case("Farge: blå", "Blå")]
    #[case("Farge: 0010-SVART", "Svart")]
    #[case("farge:hvit", "Hvit")]
    #[case("Størrelse: 42", "")]
    #[case("", "")]
    fn normalizes_color_labels(#[case] label: &str, #[case] expected: &str) {
        assert_eq!(parse_color(label), expected);
    }

    #[rstest]
    #[case("/sko/nike-pegasus-41-herre", Gender::Herre)]
    #[case("/sko/asics-gel-kayano-DAME-123", Gender::Dame)]
    #[case("/sko/hoka-clifton-junior", Gender::Junior)]
    #[case("/sko/adidas-samba-barn", Gender::Barn)]
    #[case("/sko/on-cloud-alle", Gender::Alle)]
    #[case("/sko/vans-old-skool-unisex", Gender::Unisex)]
    #[case("/sko/salomon-xt-6", Gender::Unisex)]
    #[case("", Gender::Unisex)]
    fn infers_gender_from_href(#[case] href: &str, #[case] expected: Gender) {
        assert_eq!(infer_gender(href), expected);
    }

    #[test]
    fn title_case_handles_non_ascii() {
        assert_eq!(title_case("ØRKEN"), "Ørken");
        assert_eq!(title_case("æ"), "Æ");
        assert_eq!(title_case(""), "");
    }
}
