//! LaTeX markup decoding and encoding for BibTeX field values.

use unicode_normalization::UnicodeNormalization;

/// Combining mark for a LaTeX accent command character.
fn accent_mark(command: char) -> Option<char> {
    match command {
        '"' => Some('\u{0308}'),
        '\'' => Some('\u{0301}'),
        '`' => Some('\u{0300}'),
        '^' => Some('\u{0302}'),
        '~' => Some('\u{0303}'),
        '=' => Some('\u{0304}'),
        '.' => Some('\u{0307}'),
        'c' => Some('\u{0327}'),
        'v' => Some('\u{030C}'),
        'u' => Some('\u{0306}'),
        'H' => Some('\u{030B}'),
        _ => None,
    }
}

/// Character produced by a text-mode symbol command such as `\textbackslash`.
fn text_symbol(command: &str) -> Option<char> {
    match command {
        "textbackslash" => Some('\\'),
        "textasciitilde" => Some('~'),
        "textasciicircum" => Some('^'),
        _ => None,
    }
}

/// Decode a BibTeX value into plain text.
///
/// Handles accent commands (`\"o`, `\'{e}`, `\c{c}`), escaped specials
/// (`\&`, `\%`, `\$`, `\#`, `\_`, `\{`, `\}`), symbol commands
/// (`\textbackslash{}`, `\textasciitilde{}`), `~` as a space, protective
/// braces, and whitespace runs. Unknown commands keep their argument text.
pub(crate) fn decode_latex(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    let mut out = String::with_capacity(value.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\\' => {
                let Some(&next) = chars.get(i + 1) else {
                    i += 1;
                    continue;
                };
                if "&%$#_{}".contains(next) {
                    out.push(next);
                    i += 2;
                } else if let Some(mark) = accent_mark(next).filter(|_| {
                    !(next.is_ascii_alphabetic()
                        && chars.get(i + 2).is_some_and(|c| c.is_ascii_alphabetic()))
                }) {
                    // Letter commands (\c, \v, \u, \H) need a braced or spaced argument.
                    let mut j = i + 2;
                    if next.is_ascii_alphabetic() {
                        while chars.get(j) == Some(&' ') {
                            j += 1;
                        }
                    }
                    let braced = chars.get(j) == Some(&'{');
                    if braced {
                        j += 1;
                    }
                    // \i is a dotless i; treat it as plain i.
                    if chars.get(j) == Some(&'\\') && chars.get(j + 1) == Some(&'i') {
                        j += 1;
                    }
                    match chars.get(j) {
                        Some(&base) if base.is_alphabetic() => {
                            out.push(base);
                            out.push(mark);
                            j += 1;
                            if braced && chars.get(j) == Some(&'}') {
                                j += 1;
                            }
                            i = j;
                        }
                        _ => {
                            out.push(next);
                            i += 2;
                        }
                    }
                } else if next.is_ascii_alphabetic() {
                    let mut j = i + 1;
                    while chars.get(j).is_some_and(|c| c.is_ascii_alphabetic()) {
                        j += 1;
                    }
                    let name: String = chars[i + 1..j].iter().collect();
                    match text_symbol(&name) {
                        Some(symbol) => {
                            out.push(symbol);
                            if chars.get(j) == Some(&'{') && chars.get(j + 1) == Some(&'}') {
                                j += 2;
                            }
                        }
                        // Drop the command name and keep whatever follows it.
                        None => {
                            while chars.get(j) == Some(&' ') {
                                j += 1;
                            }
                        }
                    }
                    i = j;
                } else {
                    out.push(next);
                    i += 2;
                }
            }
            '{' | '}' => i += 1,
            '~' => {
                out.push(' ');
                i += 1;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }

    collapse_whitespace(&out.nfc().collect::<String>())
}

/// Collapse whitespace runs (including newlines) into single spaces and trim.
pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Escape characters that BibTeX would otherwise interpret.
pub(crate) fn escape_latex(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '&' | '%' | '$' | '#' | '_' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("A {Great} Paper", "A Great Paper")]
    #[case("Smith \\& Sons", "Smith & Sons")]
    #[case("50\\% off", "50% off")]
    #[case("M\\\"uller", "Müller")]
    #[case("M{\\\"u}ller", "Müller")]
    #[case("Jos\\'{e}", "José")]
    #[case("Fran\\c{c}ois", "François")]
    #[case("Fran\\c cois", "François")]
    #[case("\\v{S}koda", "Škoda")]
    #[case("Mart\\'{\\i}nez", "Martínez")]
    #[case("\\emph{Very} important", "Very important")]
    #[case("see \\url{x.org}", "see x.org")]
    #[case("Donald~E. Knuth", "Donald E. Knuth")]
    #[case("  spread\n   over\tlines ", "spread over lines")]
    #[case("trailing\\", "trailing")]
    #[case("C:\\textbackslash{}Temp", "C:\\Temp")]
    #[case("\\textasciitilde{}/bin", "~/bin")]
    #[case("x\\textasciicircum{}2", "x^2")]
    fn test_decode_latex(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(decode_latex(input), expected);
    }

    #[test]
    fn test_escape_latex() {
        assert_eq!(escape_latex("R&D 100% $5 #1 a_b"), "R\\&D 100\\% \\$5 \\#1 a\\_b");
        assert_eq!(escape_latex("plain"), "plain");
        assert_eq!(
            escape_latex("~/a\\b x^2"),
            "\\textasciitilde{}/a\\textbackslash{}b x\\textasciicircum{}2"
        );
    }
}
