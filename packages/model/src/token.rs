//! # Token Stream
//!
//! Flat serialization of a tree: an open tag per node, raw content chars
//! for leaf text, and a close sentinel per node. `to_token_stream` and
//! `from_token_stream` round-trip a tree exactly.

use crate::component::ComponentRegistry;
use crate::error::{ModelResult, SerializationError};
use crate::node::{Attributes, Node};
use crate::tree::{NodeKey, Tree};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenTag {
    pub component: String,
    #[serde(default)]
    pub part: String,
    pub id: String,
    #[serde(default)]
    pub attributes: Attributes,
}

impl OpenTag {
    /// `component` or `component.part`
    pub fn name(&self) -> String {
        if self.part.is_empty() {
            self.component.clone()
        } else {
            format!("{}.{}", self.component, self.part)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Token {
    Open(OpenTag),
    Close,
    Char { value: char },
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Open(tag) => format!("<{}>", tag.name()),
            Token::Close => "close tag".to_string(),
            Token::Char { value } => format!("{:?}", value),
        }
    }
}

impl Tree {
    pub fn to_token_stream(&self) -> Vec<Token> {
        let mut tokens = Vec::with_capacity(self.size() * 2);
        self.push_tokens(self.root(), &mut tokens);
        tokens
    }

    fn push_tokens(&self, key: NodeKey, tokens: &mut Vec<Token>) {
        let identity = self.identity(key);
        tokens.push(Token::Open(OpenTag {
            component: identity.component.clone(),
            part: identity.part.clone(),
            id: identity.id.clone(),
            attributes: identity.attributes.clone(),
        }));
        if self.is_leaf(key) {
            tokens.extend(self.text_of(key).chars().map(|value| Token::Char { value }));
        } else {
            for child in self.children(key) {
                self.push_tokens(*child, tokens);
            }
        }
        tokens.push(Token::Close);
    }

    /// Build a tree from tokens, constructing nodes through the registry
    pub fn from_token_stream(tokens: &[Token], registry: &ComponentRegistry) -> ModelResult<Tree> {
        let root = parse_tokens(tokens, registry)?;
        debug!(nodes = root.count(), "[Model] Parsed token stream");
        Tree::new(root)
    }
}

struct Frame {
    tag: OpenTag,
    index: usize,
    text: String,
    children: Vec<Node>,
}

fn parse_tokens(tokens: &[Token], registry: &ComponentRegistry) -> ModelResult<Node> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut root = None;

    for (index, token) in tokens.iter().enumerate() {
        if stack.is_empty() && matches!(token, Token::Char { value } if value.is_whitespace()) {
            continue;
        }
        if root.is_some() {
            return Err(SerializationError::unexpected_token(
                index,
                "end of input",
                token.describe(),
                None,
            )
            .into());
        }

        match token {
            Token::Open(tag) => {
                if tag.component.is_empty() {
                    return Err(SerializationError::EmptyTagName { index, span: 0..0 }.into());
                }
                if tag.id.is_empty() {
                    return Err(SerializationError::MissingId {
                        index,
                        tag: tag.name(),
                        span: 0..0,
                    }
                    .into());
                }
                let component = registry.lookup(&tag.component)?;
                if let Some(parent) = stack.last() {
                    if registry
                        .get(&parent.tag.component)
                        .map(|c| c.kind().is_leaf())
                        .unwrap_or(false)
                    {
                        return Err(SerializationError::unexpected_token(
                            index,
                            "text or close tag",
                            token.describe(),
                            None,
                        )
                        .into());
                    }
                } else if component.kind() != crate::NodeKind::Root {
                    return Err(SerializationError::unexpected_token(
                        index,
                        "root component",
                        token.describe(),
                        None,
                    )
                    .into());
                }
                stack.push(Frame {
                    tag: tag.clone(),
                    index,
                    text: String::new(),
                    children: Vec::new(),
                });
            }
            Token::Char { value } => {
                let Some(frame) = stack.last_mut() else {
                    return Err(SerializationError::unexpected_token(
                        index,
                        "open tag",
                        token.describe(),
                        None,
                    )
                    .into());
                };
                let is_leaf = registry.lookup(&frame.tag.component)?.kind().is_leaf();
                if is_leaf {
                    frame.text.push(*value);
                } else if !value.is_whitespace() {
                    return Err(SerializationError::unexpected_token(
                        index,
                        "open or close tag",
                        token.describe(),
                        None,
                    )
                    .into());
                }
            }
            Token::Close => {
                let Some(frame) = stack.pop() else {
                    return Err(SerializationError::unexpected_token(
                        index,
                        "open tag",
                        token.describe(),
                        None,
                    )
                    .into());
                };
                let component = registry.lookup(&frame.tag.component)?;
                if !component.kind().is_leaf() && frame.children.is_empty() {
                    return Err(SerializationError::unexpected_token(
                        index,
                        "child node",
                        token.describe(),
                        None,
                    )
                    .into());
                }
                let node = component.build(
                    &frame.tag.part,
                    &frame.tag.id,
                    frame.text,
                    frame.tag.attributes,
                    frame.children,
                )?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
        }
    }

    match (root, stack.last()) {
        (Some(root), _) => Ok(root),
        (None, Some(frame)) => Err(SerializationError::unexpected_end(
            tokens.len(),
            format!("close tag for <{}> opened at token {}", frame.tag.name(), frame.index),
        )
        .into()),
        (None, None) => Err(SerializationError::unexpected_end(0, "root open tag").into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    fn open(component: &str, id: &str) -> Token {
        Token::Open(OpenTag {
            component: component.to_string(),
            part: String::new(),
            id: id.to_string(),
            attributes: Attributes::new(),
        })
    }

    fn chars(text: &str) -> Vec<Token> {
        text.chars().map(|value| Token::Char { value }).collect()
    }

    fn sample_tokens() -> Vec<Token> {
        let mut tokens = vec![open("doc", "d"), open("paragraph", "p")];
        tokens.push(Token::Open(OpenTag {
            component: "text".to_string(),
            part: "run".to_string(),
            id: "t".to_string(),
            attributes: [("bold".to_string(), "true".to_string())].into_iter().collect(),
        }));
        tokens.extend(chars("Hi"));
        tokens.extend([Token::Close, Token::Close, Token::Close]);
        tokens
    }

    #[test]
    fn test_round_trip() {
        let registry = ComponentRegistry::with_defaults();
        let tokens = sample_tokens();

        let tree = Tree::from_token_stream(&tokens, &registry).unwrap();
        assert_eq!(tree.to_token_stream(), tokens);

        let t = tree.key_of("t").unwrap();
        assert_eq!(tree.identity(t).part, "run");
        assert_eq!(tree.text_of(t), "Hi");
    }

    #[test]
    fn test_whitespace_between_blocks_is_skipped() {
        let registry = ComponentRegistry::with_defaults();
        let mut tokens = vec![open("doc", "d")];
        tokens.extend(chars("\n  "));
        tokens.extend(sample_tokens()[1..].iter().cloned());

        let tree = Tree::from_token_stream(&tokens, &registry).unwrap();
        assert_eq!(tree.text(), "Hi");
    }

    #[test]
    fn test_text_in_branch_is_rejected() {
        let registry = ComponentRegistry::with_defaults();
        let mut tokens = vec![open("doc", "d"), open("paragraph", "p")];
        tokens.extend(chars("x"));

        let err = Tree::from_token_stream(&tokens, &registry).unwrap_err();
        match err {
            ModelError::Serialization(e) => assert_eq!(e.index(), Some(2)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_stream() {
        let registry = ComponentRegistry::with_defaults();
        let tokens = sample_tokens();

        let err = Tree::from_token_stream(&tokens[..tokens.len() - 1], &registry).unwrap_err();
        assert!(matches!(
            err,
            ModelError::Serialization(SerializationError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn test_empty_branch_is_rejected() {
        let registry = ComponentRegistry::with_defaults();
        let tokens = vec![open("doc", "d"), open("paragraph", "p"), Token::Close, Token::Close];

        assert!(Tree::from_token_stream(&tokens, &registry).is_err());
    }

    #[test]
    fn test_unknown_component() {
        let registry = ComponentRegistry::with_defaults();
        let tokens = vec![open("doc", "d"), open("table", "x"), Token::Close, Token::Close];

        assert_eq!(
            Tree::from_token_stream(&tokens, &registry).unwrap_err(),
            ModelError::UnknownComponent("table".to_string())
        );
    }
}
