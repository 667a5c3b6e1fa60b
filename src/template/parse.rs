//! Lexing and parsing of template source into a node tree.

use super::funcs;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// `.`
    Dot,
    /// `.a.b`, relative to dot.
    Field(Vec<String>),
    /// `$` or `$.a.b`, relative to the root value.
    Root(Vec<String>),
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Nil,
    Func(String),
    /// `(pipeline).a.b`
    Sub(Box<Pipeline>, Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Command {
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Pipeline {
    pub cmds: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Action(Pipeline),
    If {
        cond: Pipeline,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Range {
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
    With {
        pipe: Pipeline,
        body: Vec<Node>,
        otherwise: Vec<Node>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    If,
    Range,
    With,
}

#[derive(Debug)]
enum Item {
    Text(String),
    Action(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Dot,
    Field(Vec<String>),
    /// Field chain directly following a closing parenthesis.
    Chain(Vec<String>),
    Root(Vec<String>),
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    Pipe,
}

enum Terminator {
    Eof,
    End,
    Else,
    ElseIf(Pipeline),
}

pub(crate) fn parse(source: &str) -> Result<Vec<Node>, String> {
    let items = split(source)?;
    let mut parser = Parser { items, pos: 0 };
    let (nodes, terminator) = parser.parse_list()?;
    match terminator {
        Terminator::Eof => Ok(nodes),
        Terminator::End => Err("unexpected {{end}}".to_string()),
        Terminator::Else | Terminator::ElseIf(_) => Err("unexpected {{else}}".to_string()),
    }
}

fn is_trim_marker(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('-') && chars.next().is_some_and(|c| c.is_ascii_whitespace())
}

/// Splits source into literal text and the raw contents of `{{ }}` actions,
/// applying `{{-` and `-}}` whitespace trimming.
fn split(source: &str) -> Result<Vec<Item>, String> {
    let mut items = Vec::new();
    let mut rest = source;
    let mut trim_next = false;

    while let Some(start) = rest.find("{{") {
        let mut text = &rest[..start];
        let mut inner = &rest[start + 2..];
        if trim_next {
            text = text.trim_start();
        }
        if is_trim_marker(inner) {
            text = text.trim_end();
            inner = &inner[1..];
        }
        if !text.is_empty() {
            items.push(Item::Text(text.to_string()));
        }

        let end = find_close(inner)?;
        let mut body = inner[..end].trim_start();
        trim_next = false;
        if let Some(stripped) = body.strip_suffix('-') {
            if stripped.ends_with(|c: char| c.is_ascii_whitespace()) {
                body = stripped;
                trim_next = true;
            }
        }
        let body = body.trim();
        let is_comment = body.starts_with("/*") && body.ends_with("*/");
        if !is_comment {
            items.push(Item::Action(body.to_string()));
        }
        rest = &inner[end + 2..];
    }

    let text = if trim_next { rest.trim_start() } else { rest };
    if !text.is_empty() {
        items.push(Item::Text(text.to_string()));
    }
    Ok(items)
}

/// Byte offset of the `}}` closing an action, skipping over quoted strings.
fn find_close(inner: &str) -> Result<usize, String> {
    let bytes = inner.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(b'"') if b == b'\\' => i += 1,
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if b == b'"' || b == b'`' => quote = Some(b),
            None if b == b'}' && bytes.get(i + 1) == Some(&b'}') => return Ok(i),
            None => {}
        }
        i += 1;
    }
    Err("unclosed action".to_string())
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn lex(action: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = action.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
                if starts_field(&chars, i) {
                    let (fields, next) = lex_fields(&chars, i)?;
                    tokens.push(Token::Chain(fields));
                    i = next;
                }
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '.' if starts_field(&chars, i) => {
                let (fields, next) = lex_fields(&chars, i)?;
                tokens.push(Token::Field(fields));
                i = next;
            }
            '.' => {
                tokens.push(Token::Dot);
                i += 1;
            }
            '$' => {
                i += 1;
                if starts_field(&chars, i) {
                    let (fields, next) = lex_fields(&chars, i)?;
                    tokens.push(Token::Root(fields));
                    i = next;
                } else {
                    tokens.push(Token::Root(Vec::new()));
                }
            }
            '"' => {
                let (text, next) = lex_quoted(&chars, i)?;
                tokens.push(Token::Str(text));
                i = next;
            }
            '`' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&c| c == '`')
                    .ok_or("unterminated raw string")?;
                tokens.push(Token::Str(chars[i + 1..i + 1 + end].iter().collect()));
                i += end + 2;
            }
            c if c.is_ascii_digit()
                || ((c == '-' || c == '+')
                    && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) =>
            {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                if chars.get(i).is_some_and(|&c| is_ident_char(c)) {
                    while i < chars.len() && is_ident_char(chars[i]) {
                        i += 1;
                    }
                    let word: String = chars[start..i].iter().collect();
                    return Err(format!("bad number syntax: {}", word));
                }
                let number: String = chars[start..i].iter().collect();
                if number.contains('.') {
                    let value = number
                        .parse::<f64>()
                        .map_err(|_| format!("bad number syntax: {}", number))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value = number
                        .parse::<i64>()
                        .map_err(|_| format!("bad number syntax: {}", number))?;
                    tokens.push(Token::Int(value));
                }
            }
            c if is_ident_char(c) => {
                let start = i;
                while i < chars.len() && is_ident_char(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected {:?} in action", other)),
        }
    }

    Ok(tokens)
}

fn starts_field(chars: &[char], i: usize) -> bool {
    chars.get(i) == Some(&'.') && chars.get(i + 1).is_some_and(|&c| is_ident_char(c))
}

fn lex_fields(chars: &[char], mut i: usize) -> Result<(Vec<String>, usize), String> {
    let mut fields = Vec::new();
    while starts_field(chars, i) {
        i += 1;
        let start = i;
        while i < chars.len() && is_ident_char(chars[i]) {
            i += 1;
        }
        fields.push(chars[start..i].iter().collect());
    }
    if chars.get(i) == Some(&'.') {
        return Err("unexpected . after field name".to_string());
    }
    Ok((fields, i))
}

fn lex_quoted(chars: &[char], start: usize) -> Result<(String, usize), String> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '"' => return Ok((text, i + 1)),
            '\\' => {
                i += 1;
                match chars.get(i) {
                    Some('n') => text.push('\n'),
                    Some('t') => text.push('\t'),
                    Some('r') => text.push('\r'),
                    Some('\\') => text.push('\\'),
                    Some('"') => text.push('"'),
                    Some(other) => return Err(format!("unknown escape sequence: \\{}", other)),
                    None => break,
                }
            }
            c => text.push(c),
        }
        i += 1;
    }
    Err("unterminated quoted string".to_string())
}

struct Parser {
    items: Vec<Item>,
    pos: usize,
}

impl Parser {
    fn parse_list(&mut self) -> Result<(Vec<Node>, Terminator), String> {
        let mut nodes = Vec::new();

        while self.pos < self.items.len() {
            let item = &self.items[self.pos];
            self.pos += 1;

            let action = match item {
                Item::Text(text) => {
                    nodes.push(Node::Text(text.clone()));
                    continue;
                }
                Item::Action(action) => action.clone(),
            };

            let tokens = lex(&action)?;
            match tokens.first() {
                Some(Token::Ident(word)) if word == "end" => {
                    if tokens.len() > 1 {
                        return Err("unexpected tokens after {{end}}".to_string());
                    }
                    return Ok((nodes, Terminator::End));
                }
                Some(Token::Ident(word)) if word == "else" => {
                    return match tokens.get(1) {
                        None => Ok((nodes, Terminator::Else)),
                        Some(Token::Ident(next)) if next == "if" => {
                            let cond = parse_pipeline_tokens(tokens[2..].to_vec())?;
                            Ok((nodes, Terminator::ElseIf(cond)))
                        }
                        Some(_) => Err("unexpected tokens after {{else}}".to_string()),
                    };
                }
                Some(Token::Ident(word)) if word == "if" || word == "range" || word == "with" => {
                    let control = match word.as_str() {
                        "if" => Control::If,
                        "range" => Control::Range,
                        _ => Control::With,
                    };
                    let pipe = parse_pipeline_tokens(tokens[1..].to_vec())?;
                    nodes.push(self.parse_control(control, pipe)?);
                }
                _ => nodes.push(Node::Action(parse_pipeline_tokens(tokens)?)),
            }
        }

        Ok((nodes, Terminator::Eof))
    }

    fn parse_control(&mut self, control: Control, pipe: Pipeline) -> Result<Node, String> {
        let (body, terminator) = self.parse_list()?;
        let otherwise = match terminator {
            Terminator::End => Vec::new(),
            Terminator::Else => match self.parse_list()? {
                (otherwise, Terminator::End) => otherwise,
                (_, Terminator::Eof) => return Err("unexpected EOF, missing {{end}}".to_string()),
                _ => return Err("unexpected {{else}} after {{else}}".to_string()),
            },
            Terminator::ElseIf(cond) if control == Control::If => {
                vec![self.parse_control(Control::If, cond)?]
            }
            Terminator::ElseIf(_) => return Err("{{else if}} outside {{if}}".to_string()),
            Terminator::Eof => return Err("unexpected EOF, missing {{end}}".to_string()),
        };

        Ok(match control {
            Control::If => Node::If {
                cond: pipe,
                then: body,
                otherwise,
            },
            Control::Range => Node::Range {
                pipe,
                body,
                otherwise,
            },
            Control::With => Node::With {
                pipe,
                body,
                otherwise,
            },
        })
    }
}

fn parse_pipeline_tokens(tokens: Vec<Token>) -> Result<Pipeline, String> {
    if tokens.is_empty() {
        return Err("missing value for command".to_string());
    }
    let mut stream = TokenStream { tokens, pos: 0 };
    let pipeline = stream.parse_pipeline(false)?;
    if stream.pos < stream.tokens.len() {
        return Err("unexpected ) in action".to_string());
    }
    Ok(pipeline)
}

struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn parse_pipeline(&mut self, nested: bool) -> Result<Pipeline, String> {
        let mut cmds = Vec::new();
        loop {
            cmds.push(self.parse_command()?);
            match self.peek() {
                Some(Token::Pipe) => {
                    self.pos += 1;
                }
                Some(Token::RParen) if nested => break,
                None if !nested => break,
                None => return Err("unclosed left paren".to_string()),
                Some(_) => return Err("unexpected ) in action".to_string()),
            }
        }
        Ok(Pipeline { cmds })
    }

    fn parse_command(&mut self) -> Result<Command, String> {
        let mut args = Vec::new();
        while let Some(token) = self.peek() {
            if matches!(token, Token::Pipe | Token::RParen) {
                break;
            }
            args.push(self.parse_operand()?);
        }
        if args.is_empty() {
            return Err("missing value for command".to_string());
        }
        Ok(Command { args })
    }

    fn parse_operand(&mut self) -> Result<Operand, String> {
        match self.advance() {
            Some(Token::Dot) => Ok(Operand::Dot),
            Some(Token::Field(fields)) => Ok(Operand::Field(fields)),
            Some(Token::Root(fields)) => Ok(Operand::Root(fields)),
            Some(Token::Str(text)) => Ok(Operand::Str(text)),
            Some(Token::Int(value)) => Ok(Operand::Int(value)),
            Some(Token::Float(value)) => Ok(Operand::Float(value)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(Operand::Bool(true)),
                "false" => Ok(Operand::Bool(false)),
                "nil" => Ok(Operand::Nil),
                _ if funcs::lookup(&name).is_some() => Ok(Operand::Func(name)),
                _ => Err(format!("function {:?} not defined", name)),
            },
            Some(Token::LParen) => {
                let inner = self.parse_pipeline(true)?;
                match self.advance() {
                    Some(Token::RParen) => {}
                    _ => return Err("unclosed left paren".to_string()),
                }
                let fields = match self.peek() {
                    Some(Token::Chain(fields)) => {
                        let fields = fields.clone();
                        self.pos += 1;
                        fields
                    }
                    _ => Vec::new(),
                };
                Ok(Operand::Sub(Box::new(inner), fields))
            }
            Some(Token::Chain(_)) => Err("unexpected field chain".to_string()),
            Some(token) => Err(format!("unexpected {:?} in operand", token)),
            None => Err("missing value for command".to_string()),
        }
    }
}
