use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // "弹幕说" plus the two mishearings recognizers commonly produce.
    static ref COMMENT_SAYS: Regex = Regex::new(r"(?:弹幕|大幕|字幕)\s*说(.*)").unwrap();
    static ref LEADING_PUNCTUATION: Regex = Regex::new(r"^[，,。.!！?？:：\s]+").unwrap();
}

/// Pulls the comment text out of a transcript like "弹幕说 今天天气真好".
pub fn extract_command(transcript: &str) -> Option<String> {
    let captures = COMMENT_SAYS.captures(transcript)?;
    let trailing = captures.get(1)?.as_str().trim();
    let content = LEADING_PUNCTUATION.replace(trailing, "");
    if content.is_empty() {
        None
    } else {
        Some(content.into_owned())
    }
}
