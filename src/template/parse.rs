//! Template parsing: text is split into literal runs and `{{...}}` tags, and
//! `{{#each key}}...{{/each}}` pairs are folded into loop nodes.
//!
//! A tag is `{{`, one or more characters other than `}`, then `}}`. Anything
//! that does not match that shape stays literal text.

use super::helpers::Helper;

/// A parsed `{{...}}` directive. `raw` keeps the exact source text so an
/// unresolved tag can be written back verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub raw: String,
    pub expr: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `{{a.b.c}}`
    Path(String),
    /// `{{helper arg1 arg2}}`
    Helper { helper: Helper, args: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Tag(Tag),
    /// Loop bodies hold only `Text` and `Tag` nodes; loops do not nest.
    Each { key: String, body: Vec<Node> },
}

enum Token<'a> {
    Text(&'a str),
    Tag { raw: &'a str, content: &'a str },
}

pub fn parse(source: &str) -> Vec<Node> {
    let tokens = tokenize(source);
    let mut nodes = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            Token::Text(text) => push_text(&mut nodes, text),
            Token::Tag { raw, content } => {
                if let Some(key) = each_key(content) {
                    if let Some(close) = find_close(&tokens, i + 1) {
                        let mut body = Vec::new();
                        for token in &tokens[i + 1..close] {
                            match token {
                                Token::Text(text) => push_text(&mut body, text),
                                Token::Tag { raw, content } => body.push(Node::Tag(tag(raw, content))),
                            }
                        }
                        nodes.push(Node::Each {
                            key: key.to_string(),
                            body,
                        });
                        i = close + 1;
                        continue;
                    }
                }
                nodes.push(Node::Tag(tag(raw, content)));
            }
        }
        i += 1;
    }

    nodes
}

fn tokenize(source: &str) -> Vec<Token<'_>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            let content_start = i + 2;
            let close = source[content_start..].find('}').map(|off| content_start + off);
            if let Some(close) = close {
                let well_formed = close > content_start
                    && bytes.get(close + 1) == Some(&b'}');
                if well_formed {
                    if text_start < i {
                        tokens.push(Token::Text(&source[text_start..i]));
                    }
                    tokens.push(Token::Tag {
                        raw: &source[i..close + 2],
                        content: &source[content_start..close],
                    });
                    i = close + 2;
                    text_start = i;
                    continue;
                }
            }
        }
        i += 1;
    }

    if text_start < source.len() {
        tokens.push(Token::Text(&source[text_start..]));
    }
    tokens
}

/// `#each` must directly follow the braces and be separated from its key by
/// whitespace.
fn each_key(content: &str) -> Option<&str> {
    let rest = content.strip_prefix("#each")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let key = rest.trim();
    (!key.is_empty()).then_some(key)
}

fn find_close(tokens: &[Token<'_>], from: usize) -> Option<usize> {
    tokens[from..]
        .iter()
        .position(|t| matches!(t, Token::Tag { content, .. } if *content == "/each"))
        .map(|pos| from + pos)
}

fn tag(raw: &str, content: &str) -> Tag {
    let content = content.trim();
    let mut words = content.split_whitespace();
    let expr = match words.next().and_then(Helper::from_name) {
        Some(helper) => Expr::Helper {
            helper,
            args: words.map(str::to_string).collect(),
        },
        None => Expr::Path(content.to_string()),
    };
    Tag {
        raw: raw.to_string(),
        expr,
    }
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text(prev)) = nodes.last_mut() {
        prev.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}
