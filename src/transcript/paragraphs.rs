//! Paragraph assembly over the current segment contents.
//!
//! A pure, restartable transform: segment blocks are trimmed and joined with
//! single spaces into an accumulator, and a paragraph closes whenever the
//! accumulated text ends with a sentence-terminating period. Closed
//! paragraphs are lower-cased and then capitalized on the first character.
//! An empty accumulator never produces a paragraph.

/// Assemble paragraphs from segment contents, in order.
pub fn assemble_paragraphs(blocks: &[&str]) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();

    for block in blocks {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(block);

        if current.ends_with('.') {
            paragraphs.push(capitalize(&current.to_lowercase()));
            current.clear();
        }
    }

    if !current.is_empty() {
        paragraphs.push(capitalize(&current.to_lowercase()));
    }

    paragraphs
}

/// Upper-case the first character, leave the rest untouched.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
