use super::Operator;
use crate::error::EvalError;
use log::debug;

/// Lexical tokens of an infix formula.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Json(String),
    Regex(String),
    Identifier(String),
    /// `name(` with nothing in between; function call or implicit product.
    Call(String),
    Operator(Operator),
    LeftParen,
    RightParen,
    Comma,
    /// Raw contents of `[...]` written right after an operand.
    Index(String),
}

impl Token {
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            Token::Number(_)
                | Token::Str(_)
                | Token::Json(_)
                | Token::Regex(_)
                | Token::Identifier(_)
                | Token::RightParen
                | Token::Index(_)
        )
    }
}

const RESERVED: [&str; 3] = ["null", "true", "false"];

/// Splits a formula into [`Token`]s.
///
/// `/`, `[` and `{` are ambiguous on their own: where an operand is expected
/// they open a regex or JSON literal, after an operand they are division and
/// array access.
pub struct Tokenizer {
    chars: Vec<char>,
    position: usize,
    expecting_operand: bool,
}

impl Tokenizer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            expecting_operand: true,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, EvalError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            self.expecting_operand = !token.ends_operand();
            tokens.push(token);
        }
        debug!("Tokens: {:?}", tokens);
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, EvalError> {
        while self.peek(0).is_some_and(char::is_whitespace) {
            self.position += 1;
        }

        let Some(c) = self.peek(0) else {
            return Ok(None);
        };

        let token = match c {
            '[' if !self.expecting_operand => {
                let end = self.balanced_end()?;
                let inner: String = self.chars[self.position + 1..end].iter().collect();
                self.position = end + 1;
                Token::Index(inner)
            }
            '[' | '{' => {
                let end = self.balanced_end()?;
                let text: String = self.chars[self.position..=end].iter().collect();
                self.position = end + 1;
                Token::Json(text)
            }
            '/' if self.expecting_operand => Token::Regex(self.read_regex()?),
            '"' | '\'' => Token::Str(self.read_string(c)?),
            '(' => {
                self.position += 1;
                Token::LeftParen
            }
            ')' => {
                self.position += 1;
                Token::RightParen
            }
            ',' => {
                self.position += 1;
                Token::Comma
            }
            '0'..='9' | '.' => Token::Number(self.read_number()?),
            'a'..='z' => self.read_word(),
            '$' => {
                let start = self.position;
                self.position += 1;
                let name_len = self.word_len();
                if name_len == 0 {
                    return Err(EvalError::syntax("illegal character '$'"));
                }
                self.position += name_len;
                Token::Identifier(self.chars[start..self.position].iter().collect())
            }
            _ => Token::Operator(self.read_operator(c)?),
        };

        Ok(Some(token))
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.position + offset).copied()
    }

    fn word_len(&self) -> usize {
        self.chars[self.position..]
            .iter()
            .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
            .count()
    }

    fn skip_digits(&mut self) {
        while self.peek(0).is_some_and(|c| c.is_ascii_digit()) {
            self.position += 1;
        }
    }

    fn read_word(&mut self) -> Token {
        let start = self.position;
        self.position += self.word_len();
        let word: String = self.chars[start..self.position].iter().collect();

        if RESERVED.contains(&word.as_str()) {
            Token::Json(word)
        } else if self.peek(0) == Some('(') {
            self.position += 1;
            Token::Call(word)
        } else {
            Token::Identifier(word)
        }
    }

    fn read_number(&mut self) -> Result<f64, EvalError> {
        let start = self.position;
        self.skip_digits();
        if self.peek(0) == Some('.') {
            if self.position == start && !self.peek(1).is_some_and(|c| c.is_ascii_digit()) {
                return Err(EvalError::syntax("illegal character '.'"));
            }
            self.position += 1;
            self.skip_digits();
        }

        // an `e` only belongs to the number when digits follow it
        if matches!(self.peek(0), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek(1), Some('+' | '-')));
            if self.peek(1 + sign).is_some_and(|c| c.is_ascii_digit()) {
                self.position += 1 + sign;
                self.skip_digits();
            }
        }

        let text: String = self.chars[start..self.position].iter().collect();
        text.parse::<f64>()
            .map_err(|_| EvalError::syntax(format!("invalid number '{}'", text)))
    }

    fn read_string(&mut self, quote: char) -> Result<String, EvalError> {
        let start = self.position + 1;
        let mut end = start;
        loop {
            match self.chars.get(end) {
                None => return Err(EvalError::syntax("unterminated string literal")),
                Some('\\') => end += 2,
                Some(c) if *c == quote => break,
                Some(_) => end += 1,
            }
        }
        let raw: String = self.chars[start..end].iter().collect();
        self.position = end + 1;
        decode_string(&raw)
    }

    fn read_regex(&mut self) -> Result<String, EvalError> {
        let start = self.position;
        let mut end = start + 1;
        loop {
            match self.chars.get(end) {
                None => return Err(EvalError::syntax("unterminated regex literal")),
                Some('\\') => end += 2,
                Some('/') => break,
                Some(_) => end += 1,
            }
        }
        if end == start + 1 {
            return Err(EvalError::syntax("empty regex literal"));
        }
        end += 1;
        while self.chars.get(end).is_some_and(|c| c.is_ascii_alphabetic()) {
            end += 1;
        }
        self.position = end;
        Ok(self.chars[start..end].iter().collect())
    }

    /// Index of the bracket closing the one at the current position.
    /// Quoted text is skipped.
    fn balanced_end(&self) -> Result<usize, EvalError> {
        let open = self.chars[self.position];
        let mut depth = 0usize;
        let mut i = self.position;
        while let Some(&c) = self.chars.get(i) {
            match c {
                '[' | '{' => depth += 1,
                ']' | '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                '"' | '\'' => {
                    i += 1;
                    while let Some(&inner) = self.chars.get(i) {
                        if inner == '\\' {
                            i += 1;
                        } else if inner == c {
                            break;
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Err(EvalError::syntax(format!("unterminated '{}'", open)))
    }

    fn read_operator(&mut self, c: char) -> Result<Operator, EvalError> {
        if let Some(next) = self.peek(1) {
            let pair: String = [c, next].iter().collect();
            if matches!(pair.as_str(), ">=" | "<=" | "==" | "!=" | "=~" | "&&" | "||") {
                self.position += 2;
                return Operator::try_from(pair.as_str()).map_err(EvalError::Syntax);
            }
        }

        let single = c.to_string();
        if matches!(c, '+' | '-' | '*' | '/' | '^' | '%' | '>' | '<' | '!') {
            self.position += 1;
            return Operator::try_from(single.as_str()).map_err(EvalError::Syntax);
        }
        Err(EvalError::syntax(format!("illegal character '{}'", c)))
    }
}

/// Unescapes the body of a quoted literal using JSON string rules, plus `\'`.
fn decode_string(raw: &str) -> Result<String, EvalError> {
    let mut json = String::with_capacity(raw.len() + 2);
    json.push('"');
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => json.push('\''),
                Some(escaped) => {
                    json.push('\\');
                    json.push(escaped);
                }
                None => json.push_str("\\\\"),
            },
            '"' => json.push_str("\\\""),
            c if (c as u32) < 0x20 => json.push_str(&format!("\\u{:04x}", c as u32)),
            c => json.push(c),
        }
    }
    json.push('"');

    serde_json::from_str::<String>(&json)
        .map_err(|e| EvalError::syntax(format!("invalid string literal '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<Token> {
        Tokenizer::new(source).tokenize().expect("tokenize failed")
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokenize("12 3.5 .25 1e3 2.5e-1"),
            vec![
                Token::Number(12.0),
                Token::Number(3.5),
                Token::Number(0.25),
                Token::Number(1000.0),
                Token::Number(0.25),
            ]
        );
    }

    #[test]
    fn test_e_without_digits_is_identifier() {
        assert_eq!(
            tokenize("2e"),
            vec![Token::Number(2.0), Token::Identifier("e".to_string())]
        );
    }

    #[test]
    fn test_minus_is_always_an_operator_token() {
        assert_eq!(
            tokenize("-4-2"),
            vec![
                Token::Operator(Operator::Subtract),
                Token::Number(4.0),
                Token::Operator(Operator::Subtract),
                Token::Number(2.0),
            ]
        );
    }

    #[test]
    fn test_two_character_operators() {
        assert_eq!(
            tokenize("a>=b!=c=~d&&e||f<=g==h"),
            vec![
                Token::Identifier("a".to_string()),
                Token::Operator(Operator::GreaterThanOrEqual),
                Token::Identifier("b".to_string()),
                Token::Operator(Operator::NotEqual),
                Token::Identifier("c".to_string()),
                Token::Operator(Operator::Match),
                Token::Identifier("d".to_string()),
                Token::Operator(Operator::And),
                Token::Identifier("e".to_string()),
                Token::Operator(Operator::Or),
                Token::Identifier("f".to_string()),
                Token::Operator(Operator::LessThanOrEqual),
                Token::Identifier("g".to_string()),
                Token::Operator(Operator::Equal),
                Token::Identifier("h".to_string()),
            ]
        );
    }

    #[test]
    fn test_strings_are_unescaped() {
        assert_eq!(
            tokenize(r#""a\"b" 'it\'s' "tab\tnew\nline" "é""#),
            vec![
                Token::Str("a\"b".to_string()),
                Token::Str("it's".to_string()),
                Token::Str("tab\tnew\nline".to_string()),
                Token::Str("é".to_string()),
            ]
        );
        assert_eq!(tokenize(r#"'say "hi"'"#), vec![Token::Str("say \"hi\"".to_string())]);
    }

    #[test]
    fn test_invalid_strings() {
        assert!(Tokenizer::new(r#""open"#).tokenize().is_err());
        assert!(Tokenizer::new(r#""bad \q escape""#).tokenize().is_err());
    }

    #[test]
    fn test_slash_depends_on_position() {
        assert_eq!(
            tokenize(r#""Foo" =~ /^([fo]+),(bar)$/i"#),
            vec![
                Token::Str("Foo".to_string()),
                Token::Operator(Operator::Match),
                Token::Regex("/^([fo]+),(bar)$/i".to_string()),
            ]
        );
        assert_eq!(
            tokenize("6/2"),
            vec![
                Token::Number(6.0),
                Token::Operator(Operator::Divide),
                Token::Number(2.0),
            ]
        );
        assert_eq!(tokenize(r"/a\/b/"), vec![Token::Regex(r"/a\/b/".to_string())]);
    }

    #[test]
    fn test_brackets_depend_on_position() {
        assert_eq!(
            tokenize(r#"[1, "]", {"a": [2]}][0]"#),
            vec![
                Token::Json(r#"[1, "]", {"a": [2]}]"#.to_string()),
                Token::Index("0".to_string()),
            ]
        );
        assert_eq!(
            tokenize("a[i + 1]"),
            vec![
                Token::Identifier("a".to_string()),
                Token::Index("i + 1".to_string()),
            ]
        );
        assert!(Tokenizer::new("[1, 2").tokenize().is_err());
    }

    #[test]
    fn test_words() {
        assert_eq!(
            tokenize("sqrt(x) f (y) true $1 null"),
            vec![
                Token::Call("sqrt".to_string()),
                Token::Identifier("x".to_string()),
                Token::RightParen,
                Token::Identifier("f".to_string()),
                Token::LeftParen,
                Token::Identifier("y".to_string()),
                Token::RightParen,
                Token::Json("true".to_string()),
                Token::Identifier("$1".to_string()),
                Token::Json("null".to_string()),
            ]
        );
    }

    #[test]
    fn test_illegal_characters() {
        for source in ["A + 1", "_x", "a = 1", "1 & 2", "x @ y", "$", "1 ]", "."] {
            assert!(
                matches!(Tokenizer::new(source).tokenize(), Err(EvalError::Syntax(_))),
                "{} should not tokenize",
                source
            );
        }
    }
}
