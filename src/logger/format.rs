//! Log formatting and output with ANSI colors and text wrapping
//!
//! Handles:
//! - Colorized console output with tag and level columns
//! - Text wrapping at word boundaries
//! - Dual output (console + file)
//! - Broken pipe handling for piped commands

use super::file::write_to_file;
use super::tags::LogTag;
use chrono::Local;
use colored::*;
use std::io::{stdout, ErrorKind, Write};

/// Display configuration
const LOG_SHOW_DATE: bool = false;
const LOG_SHOW_TIME: bool = true;

/// Log format widths for alignment
const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 8;
const BRACKET_SPACE_WIDTH: usize = 3;
const TOTAL_PREFIX_WIDTH: usize = TAG_WIDTH + LEVEL_WIDTH + BRACKET_SPACE_WIDTH * 2;

/// Maximum line length before wrapping
const MAX_LINE_LENGTH: usize = 145;

/// Format and output a log message to console and file
pub fn format_and_log(tag: LogTag, level: &str, message: &str) {
    let now = Local::now();

    let mut prefix = String::new();
    if LOG_SHOW_DATE {
        prefix.push_str(&now.format("%Y-%m-%d ").to_string());
    }
    if LOG_SHOW_TIME {
        prefix.push_str(&now.format("%H:%M:%S ").to_string());
    }
    let prefix = if prefix.is_empty() {
        String::new()
    } else {
        prefix.dimmed().to_string()
    };

    let tag_str = format_tag(&tag);
    let level_str = format_level(level);
    let base_line = format!("{}[{}] [{}] ", prefix, tag_str, level_str);

    let base_length = strip_ansi_codes(&base_line).len().max(TOTAL_PREFIX_WIDTH);
    let available_space = if MAX_LINE_LENGTH > base_length {
        MAX_LINE_LENGTH - base_length
    } else {
        50
    };

    let chunks = wrap_text(message, available_space);

    print_stdout_safe(&format!("{}{}", base_line, chunks[0]));

    let timestamp = now.format("%Y-%m-%d %H:%M:%S").to_string();
    let tag_plain = tag.to_plain_string();
    write_to_file(&format!("{} [{}] [{}] {}", timestamp, tag_plain, level, chunks[0]));

    if chunks.len() > 1 {
        let continuation_prefix = " ".repeat(strip_ansi_codes(&base_line).len());
        for chunk in &chunks[1..] {
            print_stdout_safe(&format!("{}{}", continuation_prefix, chunk));
            write_to_file(&format!("{} [{}] [{}] {}", timestamp, tag_plain, level, chunk));
        }
    }
}

/// Format a tag with its subsystem color, padded to the tag column width
fn format_tag(tag: &LogTag) -> ColoredString {
    let padded = format!("{:<width$}", tag.to_plain_string(), width = TAG_WIDTH);
    match tag {
        LogTag::System => padded.bright_yellow().bold(),
        LogTag::Config => padded.bright_white().bold(),
        LogTag::Webserver => padded.bright_green().bold(),
        LogTag::Ws => padded.bright_cyan().bold(),
        LogTag::Auth => padded.bright_magenta().bold(),
        LogTag::Registry => padded.bright_blue().bold(),
        LogTag::Fanout => padded.bright_green().bold(),
        LogTag::Rooms => padded.bright_cyan().bold(),
        LogTag::Queue => padded.bright_yellow().bold(),
        LogTag::Sweeper => padded.bright_white().bold(),
        LogTag::Store => padded.bright_blue().bold(),
        LogTag::Test => padded.bright_blue().bold(),
        LogTag::Other(_) => padded.white().bold(),
    }
}

/// Format the level column, errors in red
fn format_level(level: &str) -> ColoredString {
    let padded = format!("{:<width$}", level, width = LEVEL_WIDTH);
    match level {
        "ERROR" => padded.bright_red().bold(),
        "WARNING" => padded.bright_yellow().bold(),
        _ => padded.white().bold(),
    }
}

/// Print to stdout but ignore broken pipe errors
fn print_stdout_safe(message: &str) {
    if let Err(e) = writeln!(stdout(), "{}", message) {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        let _ = writeln!(std::io::stderr(), "Logger stdout error: {}", e);
    }
    if let Err(e) = stdout().flush() {
        if e.kind() == ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
    }
}

/// Remove ANSI color codes from text
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::new();
    let mut in_escape = false;

    for ch in text.chars() {
        if ch == '\x1b' {
            in_escape = true;
        } else if in_escape && ch == 'm' {
            in_escape = false;
        } else if !in_escape {
            result.push(ch);
        }
    }
    result
}

/// Wrap text at word boundaries, respecting existing newlines
fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    let mut result = Vec::new();

    for line in text.split('\n') {
        if line.chars().count() <= max_width {
            result.push(line.to_string());
            continue;
        }

        let mut current = String::new();
        for word in line.split_whitespace() {
            let word_len = word.chars().count();

            if word_len > max_width {
                if !current.is_empty() {
                    result.push(std::mem::take(&mut current));
                }
                for chunk in break_long_word(word, max_width) {
                    result.push(chunk);
                }
            } else if current.is_empty() {
                current = word.to_string();
            } else if current.chars().count() + 1 + word_len <= max_width {
                current.push(' ');
                current.push_str(word);
            } else {
                result.push(std::mem::take(&mut current));
                current = word.to_string();
            }
        }
        if !current.is_empty() {
            result.push(current);
        }
    }

    if result.is_empty() {
        result.push(String::new());
    }
    result
}

/// Break a word longer than the line width into fixed-size chunks
fn break_long_word(word: &str, max_width: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for ch in word.chars() {
        current.push(ch);
        if current.chars().count() >= max_width.max(1) {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_keeps_short_lines() {
        let chunks = wrap_text("short message", 40);
        assert_eq!(chunks, vec!["short message".to_string()]);
    }

    #[test]
    fn test_wrap_text_splits_at_word_boundaries() {
        let chunks = wrap_text("one two three four", 9);
        assert_eq!(chunks, vec!["one two", "three", "four"]);
    }

    #[test]
    fn test_wrap_text_breaks_oversized_words() {
        let chunks = wrap_text("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_strip_ansi_codes() {
        let colored_text = "\x1b[31mred\x1b[0m plain";
        assert_eq!(strip_ansi_codes(colored_text), "red plain");
    }
}
