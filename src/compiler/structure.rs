//! Bracket balance check run ahead of any toolchain

#[derive(Clone, Copy, PartialEq)]
enum Lexical {
    Code,
    LineComment,
    BlockComment,
    StringLit,
    CharLit,
}

/// Whether `{}`, `()` and `[]` are balanced in `source`.
///
/// Brackets inside comments and string or character literals are ignored.
/// A closer seen before its opener makes the source unbalanced.
pub fn is_balanced(source: &str) -> bool {
    let mut braces = 0i64;
    let mut parens = 0i64;
    let mut brackets = 0i64;
    let mut state = Lexical::Code;

    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        match state {
            Lexical::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = Lexical::LineComment;
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = Lexical::BlockComment;
                }
                '"' => state = Lexical::StringLit,
                '\'' => state = Lexical::CharLit,
                '{' => braces += 1,
                '}' => braces -= 1,
                '(' => parens += 1,
                ')' => parens -= 1,
                '[' => brackets += 1,
                ']' => brackets -= 1,
                _ => {}
            },
            Lexical::LineComment => {
                if c == '\n' {
                    state = Lexical::Code;
                }
            }
            Lexical::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = Lexical::Code;
                }
            }
            Lexical::StringLit | Lexical::CharLit => {
                let quote = if state == Lexical::StringLit { '"' } else { '\'' };
                if c == '\\' {
                    chars.next();
                } else if c == quote || c == '\n' {
                    state = Lexical::Code;
                }
            }
        }

        if braces < 0 || parens < 0 || brackets < 0 {
            return false;
        }
    }

    braces == 0 && parens == 0 && brackets == 0
}
