//! XSD regular expression support.
//!
//! XSD patterns are implicitly anchored, treat `^` and `$` as ordinary
//! characters and know the `\i`/`\c` name-character escapes. They are
//! rewritten here into the dialect of the `regex` crate.

use regex::Regex;

const NAME_START: &str = "[_:A-Za-z\\u{C0}-\\u{D6}\\u{D8}-\\u{F6}\\u{F8}-\\u{2FF}\\u{370}-\\u{37D}\\u{37F}-\\u{1FFF}]";
const NAME_CHAR: &str = "[-._:A-Za-z0-9\\u{B7}\\u{C0}-\\u{D6}\\u{D8}-\\u{F6}\\u{F8}-\\u{37D}\\u{37F}-\\u{1FFF}]";

/// Rewrites an XSD pattern into an anchored `regex` crate expression.
#[must_use]
pub fn translate_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push_str("^(?:");

    let mut in_class = false;
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('i') if !in_class => out.push_str(NAME_START),
                Some('I') if !in_class => out.push_str(&negate(NAME_START)),
                Some('c') if !in_class => out.push_str(NAME_CHAR),
                Some('C') if !in_class => out.push_str(&negate(NAME_CHAR)),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push_str("\\\\"),
            },
            '[' if !in_class => {
                in_class = true;
                out.push(c);
            }
            ']' if in_class => {
                in_class = false;
                out.push(c);
            }
            '^' | '$' if !in_class => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }

    out.push_str(")$");
    out
}

/// Compiles an XSD pattern facet.
///
/// # Errors
/// Returns the regex error if the translated pattern does not compile.
pub fn compile_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&translate_pattern(pattern))
}

fn negate(class: &str) -> String {
    format!("[^{}", &class[1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_are_anchored() {
        let re = compile_pattern("[A-Z]{3,3}").unwrap();
        assert!(re.is_match("USD"));
        assert!(!re.is_match("USDX"));
        assert!(!re.is_match("xUSD"));
    }

    #[test]
    fn test_caret_and_dollar_are_literals() {
        let re = compile_pattern("a$b").unwrap();
        assert!(re.is_match("a$b"));
        let re = compile_pattern("[^0-9]+").unwrap();
        assert!(re.is_match("abc"));
        assert!(!re.is_match("a1"));
    }

    #[test]
    fn test_iso_bic_pattern() {
        let re = compile_pattern("[A-Z0-9]{4,4}[A-Z]{2,2}[A-Z0-9]{2,2}([A-Z0-9]{3,3}){0,1}")
            .unwrap();
        assert!(re.is_match("DEUTDEFF"));
        assert!(re.is_match("DEUTDEFF500"));
        assert!(!re.is_match("DEUTDEFF5"));
    }

    #[test]
    fn test_name_char_escapes() {
        let re = compile_pattern("\\i\\c*").unwrap();
        assert!(re.is_match("_a-1.b"));
        assert!(!re.is_match("1abc"));
    }
}
