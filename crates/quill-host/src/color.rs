// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `&`-prefixed formatting codes
//!
//! Scripts write colored text as `&aGreen &lbold&r plain`. `0`-`9` and
//! `a`-`f` pick one of sixteen colors (and reset formatting), `l` `m` `n`
//! `o` `k` add bold, strikethrough, underline, italic and blink, and `r`
//! resets. Anything else after `&` is kept literally.

use owo_colors::{AnsiColors, OwoColorize, Style};

/// The style code `code` selects, applied on top of `current`. `None`
/// means plain text.
fn apply(current: Option<Style>, code: char) -> Option<Option<Style>> {
    let base = current.unwrap_or_else(Style::new);
    let color = match code.to_ascii_lowercase() {
        '0' => AnsiColors::Black,
        '1' => AnsiColors::Blue,
        '2' => AnsiColors::Green,
        '3' => AnsiColors::Cyan,
        '4' => AnsiColors::Red,
        '5' => AnsiColors::Magenta,
        '6' => AnsiColors::Yellow,
        '7' => AnsiColors::White,
        '8' => AnsiColors::BrightBlack,
        '9' => AnsiColors::BrightBlue,
        'a' => AnsiColors::BrightGreen,
        'b' => AnsiColors::BrightCyan,
        'c' => AnsiColors::BrightRed,
        'd' => AnsiColors::BrightMagenta,
        'e' => AnsiColors::BrightYellow,
        'f' => AnsiColors::BrightWhite,
        'k' => return Some(Some(base.blink())),
        'l' => return Some(Some(base.bold())),
        'm' => return Some(Some(base.strikethrough())),
        'n' => return Some(Some(base.underline())),
        'o' => return Some(Some(base.italic())),
        'r' => return Some(None),
        _ => return None,
    };
    Some(Some(Style::new().color(color)))
}

/// Splits `text` into runs sharing one style
fn spans(text: &str) -> Vec<(Option<Style>, String)> {
    let mut spans = Vec::new();
    let mut style = None;
    let mut run = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        let next = match (c, chars.peek()) {
            ('&', Some(&code)) => apply(style, code),
            _ => None,
        };
        match next {
            Some(next) => {
                chars.next();
                if !run.is_empty() {
                    spans.push((style, std::mem::take(&mut run)));
                }
                style = next;
            }
            None => run.push(c),
        }
    }
    if !run.is_empty() {
        spans.push((style, run));
    }
    spans
}

/// Replace formatting codes with ANSI escape sequences
pub fn colorize(text: &str) -> String {
    spans(text)
        .into_iter()
        .map(|(style, run)| match style {
            Some(style) => run.style(style).to_string(),
            None => run,
        })
        .collect()
}

/// Remove formatting codes, for logs and plain terminals
pub fn strip(text: &str) -> String {
    spans(text).into_iter().map(|(_, run)| run).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip() {
        assert_eq!(strip("&aHello &lworld&r!"), "Hello world!");
        assert_eq!(strip("50&% off & more&"), "50&% off & more&");
        assert_eq!(strip("&&a"), "&");
    }

    #[test]
    fn test_colorize_plain_text_unchanged() {
        assert_eq!(colorize("no codes here"), "no codes here");
        assert_eq!(colorize("&rreset only"), "reset only");
    }

    #[test]
    fn test_colorize_emits_escapes() {
        let out = colorize("&cred&r plain");
        assert!(out.starts_with("\u{1b}["));
        assert!(out.contains("red"));
        assert!(out.ends_with(" plain"));
        assert_eq!(out, format!("{} plain", "red".style(Style::new().color(AnsiColors::BrightRed))));
    }
}
