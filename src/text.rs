//! Text validation and clean-up helpers

use regex::Regex;
use std::sync::OnceLock;

static MAIL_REGEX: OnceLock<Regex> = OnceLock::new();
static MOBILE_NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RUN_REGEX: OnceLock<Regex> = OnceLock::new();
static PUNCTUATION_RUN_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_mail_regex() -> &'static Regex {
    MAIL_REGEX.get_or_init(|| {
        Regex::new(
            r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z\-0-9]+\.)+[a-zA-Z]{2,}))$"#,
        )
        .expect("Failed to compile mail regex")
    })
}

fn get_mobile_number_regex() -> &'static Regex {
    MOBILE_NUMBER_REGEX
        .get_or_init(|| Regex::new(r"^1[0-9]{10}$").expect("Failed to compile mobile number regex"))
}

/// Everything outside ASCII letters, digits, common CJK ideographs, `-_#` and space
fn get_name_regex() -> &'static Regex {
    NAME_REGEX.get_or_init(|| {
        Regex::new(r"[^a-zA-Z0-9\x{4E00}-\x{9FA5}\-_# ]").expect("Failed to compile name regex")
    })
}

fn get_whitespace_run_regex() -> &'static Regex {
    WHITESPACE_RUN_REGEX
        .get_or_init(|| Regex::new(r"\s+").expect("Failed to compile whitespace regex"))
}

fn get_punctuation_run_regex() -> &'static Regex {
    PUNCTUATION_RUN_REGEX.get_or_init(|| {
        Regex::new(r"_{2,}|-{2,}|#{2,}").expect("Failed to compile punctuation regex")
    })
}

pub fn is_mail_address(mail_address: &str) -> bool {
    get_mail_regex().is_match(mail_address)
}

/// Mainland China mobile number: 11 digits starting with 1
pub fn is_mobile_number(mobile: &str) -> bool {
    get_mobile_number_regex().is_match(mobile)
}

/// Fold full-width forms (U+FF01..U+FF5E) and the ideographic space to ASCII.
pub fn to_half_width(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Keep only letters, digits, CJK ideographs, `-_#` and space.
pub fn name_clean_up(name: &str) -> String {
    get_name_regex()
        .replace_all(&to_half_width(name), "")
        .trim()
        .to_string()
}

/// Like [`name_clean_up`], then collapse runs of whitespace, `_`, `-` and `#`.
pub fn address_clean_up(address: &str) -> String {
    let folded = to_half_width(address);
    let kept = get_name_regex().replace_all(&folded, "");
    let spaced = get_whitespace_run_regex().replace_all(&kept, " ");
    let collapsed = get_punctuation_run_regex().replace_all(&spaced, |caps: &regex::Captures| {
        caps[0][..1].to_string()
    });
    collapsed.trim().to_string()
}
