//! Shell-style word splitting for REPL input.
//!
//! Whitespace separates words. Single quotes keep everything literal,
//! double quotes allow `\"` and `\\` escapes, and a backslash outside quotes
//! escapes the next character.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum WordsError {
    #[error("no closing quotation")]
    UnterminatedQuote,

    #[error("no escaped character")]
    DanglingEscape,
}

pub fn split(line: &str) -> Result<Vec<String>, WordsError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut word));
                    in_word = false;
                }
            }
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => word.push(c),
                        None => return Err(WordsError::UnterminatedQuote),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\')) => word.push(c),
                            Some(c) => {
                                word.push('\\');
                                word.push(c);
                            }
                            None => return Err(WordsError::UnterminatedQuote),
                        },
                        Some(c) => word.push(c),
                        None => return Err(WordsError::UnterminatedQuote),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => word.push(c),
                    None => return Err(WordsError::DanglingEscape),
                }
            }
            c => {
                in_word = true;
                word.push(c);
            }
        }
    }

    if in_word {
        words.push(word);
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(split("  search   chess ").unwrap(), vec!["search", "chess"]);
        assert!(split("   ").unwrap().is_empty());
    }

    #[test]
    fn quotes_group_words() {
        assert_eq!(
            split(r#"simulate "what if it rains" 2"#).unwrap(),
            vec!["simulate", "what if it rains", "2"]
        );
        assert_eq!(split("tree 'a b'c").unwrap(), vec!["tree", "a bc"]);
        assert_eq!(split(r#"x """#).unwrap(), vec!["x", ""]);
    }

    #[test]
    fn escapes() {
        assert_eq!(split(r"a\ b").unwrap(), vec!["a b"]);
        assert_eq!(split(r#""say \"hi\"""#).unwrap(), vec![r#"say "hi""#]);
        assert_eq!(split(r"'keep \n'").unwrap(), vec![r"keep \n"]);
    }

    #[test]
    fn unterminated_input_is_an_error() {
        assert_eq!(split("say 'hi"), Err(WordsError::UnterminatedQuote));
        assert_eq!(split("say \"hi"), Err(WordsError::UnterminatedQuote));
        assert_eq!(split("trailing\\"), Err(WordsError::DanglingEscape));
    }
}
