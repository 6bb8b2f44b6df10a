//! # Markup
//!
//! Tokenizer from the markup string form into a [`Token`] stream, and the
//! serializer back to markup.
//!
//! ```text
//! <doc id="d"><paragraph id="p"><text id="t" bold="true">Hi &amp; bye</text></paragraph></doc>
//! ```
//!
//! Tag names are `component` or `component.part`. Every tag carries an `id`
//! attribute; when one is missing the tokenizer either generates it or, in
//! strict mode, fails. `</>` closes whatever tag is open.
//!
//! ## Design
//!
//! Two logos lexers share the source: a content lexer for text and
//! entities, and a tag lexer for everything between `<` and `>`. The
//! tokenizer morphs between them at tag boundaries.

use crate::component::ComponentRegistry;
use crate::error::{ModelResult, SerializationError};
use crate::id_generator::IdGenerator;
use crate::node::Attributes;
use crate::token::{OpenTag, Token};
use crate::tree::{NodeKey, Tree};
use logos::{Lexer, Logos};
use std::ops::Range;
use tracing::{debug, instrument};

#[derive(Logos, Debug, Clone, PartialEq)]
enum ContentLexeme<'src> {
    #[token("</")]
    CloseStart,

    #[token("<")]
    OpenStart,

    #[regex(r"&[a-zA-Z]+;", |lex| lex.slice())]
    Entity(&'src str),

    #[regex(r"[^<&]+", |lex| lex.slice())]
    Text(&'src str),
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum TagLexeme<'src> {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice())]
    Ident(&'src str),

    #[token(".")]
    Dot,

    #[token("=")]
    Equals,

    #[token(">")]
    End,

    #[regex(r#""[^"]*""#, |lex| lex.slice())]
    Str(&'src str),

    #[regex(r#""[^"]*"#, |lex| lex.slice())]
    Unterminated(&'src str),
}

/// One-shot markup tokenizer
pub struct MarkupTokenizer<'src> {
    source: &'src str,
    strict_ids: bool,
    ids: IdGenerator,
    consumed: bool,
    tokens: Vec<Token>,
    open: Vec<(String, usize)>,
}

impl<'src> MarkupTokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            strict_ids: false,
            ids: IdGenerator::default(),
            consumed: false,
            tokens: Vec::new(),
            open: Vec::new(),
        }
    }

    /// Fail on tags without an id instead of generating one
    pub fn strict_ids(mut self, strict: bool) -> Self {
        self.strict_ids = strict;
        self
    }

    pub fn with_id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = ids;
        self
    }

    /// Hand back the generator so later ids continue the sequence
    pub fn into_id_generator(self) -> IdGenerator {
        self.ids
    }

    #[instrument(skip(self), fields(bytes = self.source.len()))]
    pub fn tokenize(&mut self) -> Result<Vec<Token>, SerializationError> {
        if self.consumed {
            return Err(SerializationError::AlreadyTokenized);
        }
        self.consumed = true;

        let mut content = ContentLexeme::lexer(self.source);
        while let Some(result) = content.next() {
            let span = content.span();
            match result {
                Ok(ContentLexeme::Text(text)) => {
                    self.tokens
                        .extend(text.chars().map(|value| Token::Char { value }));
                }
                Ok(ContentLexeme::Entity(entity)) => {
                    let value = decode_entity(entity).ok_or_else(|| {
                        SerializationError::unexpected_token(
                            self.tokens.len(),
                            "known entity",
                            entity,
                            Some(span.clone()),
                        )
                    })?;
                    self.tokens.push(Token::Char { value });
                }
                Ok(ContentLexeme::OpenStart) => {
                    let mut tag = content.morph::<TagLexeme>();
                    let result = self.open_tag(&mut tag, span.start);
                    content = tag.morph();
                    result?;
                }
                Ok(ContentLexeme::CloseStart) => {
                    let mut tag = content.morph::<TagLexeme>();
                    let result = self.close_tag(&mut tag, span.start);
                    content = tag.morph();
                    result?;
                }
                Err(()) => {
                    return Err(SerializationError::unexpected_token(
                        self.tokens.len(),
                        "text or tag",
                        &self.source[span.clone()],
                        Some(span),
                    ));
                }
            }
        }

        if let Some((name, index)) = self.open.last() {
            return Err(SerializationError::unexpected_end(
                self.tokens.len(),
                format!("</{}> for the tag opened at token {}", name, index),
            ));
        }

        debug!(tokens = self.tokens.len(), "[Markup] Tokenized");
        Ok(std::mem::take(&mut self.tokens))
    }

    fn open_tag(
        &mut self,
        lex: &mut Lexer<'src, TagLexeme<'src>>,
        start: usize,
    ) -> Result<(), SerializationError> {
        let index = self.tokens.len();
        let component = match lex.next() {
            Some(Ok(TagLexeme::Ident(name))) => name,
            Some(_) => {
                return Err(SerializationError::EmptyTagName {
                    index,
                    span: start..lex.span().end,
                })
            }
            None => return Err(SerializationError::unexpected_end(index, "tag name")),
        };

        let mut part = "";
        let mut id = None;
        let mut attributes = Attributes::new();
        let mut first = true;

        loop {
            let next = lex.next();
            let span = lex.span();
            match next {
                Some(Ok(TagLexeme::Dot)) if first => match lex.next() {
                    Some(Ok(TagLexeme::Ident(name))) => part = name,
                    Some(_) => {
                        return Err(SerializationError::unexpected_token(
                            index,
                            "part name",
                            lex.slice(),
                            Some(lex.span()),
                        ))
                    }
                    None => return Err(SerializationError::unexpected_end(index, "part name")),
                },
                Some(Ok(TagLexeme::Ident(name))) => {
                    let value = self.attribute_value(lex, index)?;
                    if name == "id" {
                        id = Some(value);
                    } else {
                        attributes.insert(name.to_string(), value);
                    }
                }
                Some(Ok(TagLexeme::End)) => break,
                Some(Ok(TagLexeme::Unterminated(_))) => {
                    return Err(SerializationError::UnterminatedString { index, span })
                }
                Some(_) => {
                    return Err(SerializationError::unexpected_token(
                        index,
                        "attribute or >",
                        lex.slice(),
                        Some(span),
                    ))
                }
                None => return Err(SerializationError::unexpected_end(index, ">")),
            }
            first = false;
        }

        let name = if part.is_empty() {
            component.to_string()
        } else {
            format!("{}.{}", component, part)
        };
        let id = match id {
            Some(id) if !id.is_empty() => id,
            _ if self.strict_ids => {
                return Err(SerializationError::MissingId {
                    index,
                    tag: name,
                    span: start..lex.span().end,
                })
            }
            _ => self.ids.new_id(),
        };

        self.open.push((name, index));
        self.tokens.push(Token::Open(OpenTag {
            component: component.to_string(),
            part: part.to_string(),
            id,
            attributes,
        }));
        Ok(())
    }

    fn attribute_value(
        &self,
        lex: &mut Lexer<'src, TagLexeme<'src>>,
        index: usize,
    ) -> Result<String, SerializationError> {
        match lex.next() {
            Some(Ok(TagLexeme::Equals)) => {}
            Some(_) => {
                return Err(SerializationError::unexpected_token(
                    index,
                    "=",
                    lex.slice(),
                    Some(lex.span()),
                ))
            }
            None => return Err(SerializationError::unexpected_end(index, "=")),
        }
        match lex.next() {
            Some(Ok(TagLexeme::Str(quoted))) => {
                let raw = &quoted[1..quoted.len() - 1];
                decode_entities(raw).ok_or_else(|| {
                    SerializationError::unexpected_token(
                        index,
                        "known entity",
                        raw,
                        Some(lex.span()),
                    )
                })
            }
            Some(Ok(TagLexeme::Unterminated(_))) => Err(SerializationError::UnterminatedString {
                index,
                span: lex.span(),
            }),
            Some(_) => Err(SerializationError::unexpected_token(
                index,
                "quoted string",
                lex.slice(),
                Some(lex.span()),
            )),
            None => Err(SerializationError::unexpected_end(index, "quoted string")),
        }
    }

    fn close_tag(
        &mut self,
        lex: &mut Lexer<'src, TagLexeme<'src>>,
        start: usize,
    ) -> Result<(), SerializationError> {
        let index = self.tokens.len();
        let mut name = String::new();

        loop {
            match lex.next() {
                Some(Ok(TagLexeme::Ident(ident))) if name.is_empty() || name.ends_with('.') => {
                    name.push_str(ident)
                }
                Some(Ok(TagLexeme::Dot)) if !name.is_empty() && !name.ends_with('.') => {
                    name.push('.')
                }
                Some(Ok(TagLexeme::End)) => break,
                Some(_) => {
                    return Err(SerializationError::unexpected_token(
                        index,
                        ">",
                        lex.slice(),
                        Some(lex.span()),
                    ))
                }
                None => return Err(SerializationError::unexpected_end(index, ">")),
            }
        }
        let span = start..lex.span().end;

        let Some((expected, _)) = self.open.pop() else {
            return Err(SerializationError::unexpected_token(
                index,
                "open tag",
                format!("</{}>", name),
                Some(span),
            ));
        };
        if !name.is_empty() && name != expected {
            return Err(SerializationError::TagMismatch {
                index,
                expected,
                found: name,
                span,
            });
        }

        self.tokens.push(Token::Close);
        Ok(())
    }
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "&amp;" => Some('&'),
        "&lt;" => Some('<'),
        "&gt;" => Some('>'),
        "&quot;" => Some('"'),
        "&apos;" => Some('\''),
        _ => None,
    }
}

fn decode_entities(raw: &str) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let end = rest[amp..].find(';')? + amp;
        out.push(decode_entity(&rest[amp..=end])?);
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    Some(out)
}

fn escape(text: &str, out: &mut String, quote: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if quote => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Tokenize and parse markup into a tree
pub fn parse_markup(source: &str, registry: &ComponentRegistry) -> ModelResult<Tree> {
    let tokens = MarkupTokenizer::new(source).tokenize()?;
    Tree::from_token_stream(&tokens, registry)
}

/// Serialize a tree to compact markup
pub fn to_markup(tree: &Tree) -> String {
    let mut out = String::new();
    write_node(tree, tree.root(), &mut out, None);
    out
}

/// Serialize a tree with one branch per line, indented by depth
pub fn to_markup_pretty(tree: &Tree) -> String {
    let mut out = String::new();
    write_node(tree, tree.root(), &mut out, Some(0));
    out
}

fn write_node(tree: &Tree, key: NodeKey, out: &mut String, indent: Option<usize>) {
    let identity = tree.identity(key);
    let mut name = identity.component.clone();
    if !identity.part.is_empty() {
        name.push('.');
        name.push_str(&identity.part);
    }

    if let Some(depth) = indent {
        out.push_str(&"  ".repeat(depth));
    }
    out.push('<');
    out.push_str(&name);
    out.push_str(" id=\"");
    escape(&identity.id, out, true);
    out.push('"');
    for (attr, value) in &identity.attributes {
        out.push(' ');
        out.push_str(attr);
        out.push_str("=\"");
        escape(value, out, true);
        out.push('"');
    }
    out.push('>');

    if tree.is_leaf(key) {
        escape(tree.text_of(key), out, false);
    } else {
        if indent.is_some() {
            out.push('\n');
        }
        for child in tree.children(key) {
            write_node(tree, *child, out, indent.map(|depth| depth + 1));
        }
        if let Some(depth) = indent {
            out.push_str(&"  ".repeat(depth));
        }
    }

    out.push_str("</");
    out.push_str(&name);
    out.push('>');
    if indent.is_some() {
        out.push('\n');
    }
}

/// Byte range of the markup covered by a token index, for error reporting
pub fn token_span(source: &str, index: usize) -> Option<Range<usize>> {
    let mut content = ContentLexeme::lexer(source);
    let mut count = 0;
    while let Some(result) = content.next() {
        let span = content.span();
        match result {
            Ok(ContentLexeme::Text(text)) => {
                let chars = text.chars().count();
                if index < count + chars {
                    return Some(span);
                }
                count += chars;
            }
            Ok(ContentLexeme::Entity(_)) => {
                if index == count {
                    return Some(span);
                }
                count += 1;
            }
            Ok(_) => {
                let mut tag = content.morph::<TagLexeme>();
                for lexeme in tag.by_ref() {
                    if lexeme == Ok(TagLexeme::End) || lexeme.is_err() {
                        break;
                    }
                }
                let end = tag.span().end.max(span.end);
                if index == count {
                    return Some(span.start..end);
                }
                count += 1;
                content = tag.morph();
            }
            Err(()) => return Some(span),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    const HELLO: &str =
        r#"<doc id="d"><paragraph id="p"><text id="t">Hello world</text></paragraph></doc>"#;

    #[test]
    fn test_tokenize_simple() {
        let tokens = MarkupTokenizer::new(HELLO).tokenize().unwrap();

        // 3 opens + 11 chars + 3 closes
        assert_eq!(tokens.len(), 17);
        match &tokens[2] {
            Token::Open(tag) => {
                assert_eq!(tag.component, "text");
                assert_eq!(tag.id, "t");
            }
            other => panic!("expected open tag, got {other:?}"),
        }
        assert_eq!(tokens[3], Token::Char { value: 'H' });
        assert_eq!(tokens[16], Token::Close);
    }

    #[test]
    fn test_refuses_to_run_twice() {
        let mut tokenizer = MarkupTokenizer::new(HELLO);
        tokenizer.tokenize().unwrap();
        assert_eq!(tokenizer.tokenize(), Err(SerializationError::AlreadyTokenized));
    }

    #[test]
    fn test_part_and_attributes() {
        let source = r#"<doc id="d"><heading.title id="h" level="2"><text id="t" bold="true">A</text></heading.title></doc>"#;
        let tokens = MarkupTokenizer::new(source).tokenize().unwrap();

        match &tokens[1] {
            Token::Open(tag) => {
                assert_eq!(tag.component, "heading");
                assert_eq!(tag.part, "title");
                assert_eq!(tag.attributes.get("level").map(String::as_str), Some("2"));
            }
            other => panic!("expected open tag, got {other:?}"),
        }
    }

    #[test]
    fn test_entities() {
        let source = r#"<doc id="d"><paragraph id="p"><text id="t" title="a &quot;b&quot;">&lt;x&gt; &amp; y</text></paragraph></doc>"#;
        let registry = ComponentRegistry::with_defaults();
        let tree = parse_markup(source, &registry).unwrap();

        assert_eq!(tree.text(), "<x> & y");
        let t = tree.key_of("t").unwrap();
        assert_eq!(
            tree.identity(t).attributes.get("title").map(String::as_str),
            Some("a \"b\"")
        );
        assert_eq!(to_markup(&tree), source);
    }

    #[test]
    fn test_missing_id_strict() {
        let source = r#"<doc id="d"><paragraph><text id="t">x</text></paragraph></doc>"#;
        let err = MarkupTokenizer::new(source)
            .strict_ids(true)
            .tokenize()
            .unwrap_err();

        assert!(matches!(err, SerializationError::MissingId { index: 1, .. }));
    }

    #[test]
    fn test_missing_id_generated() {
        let source = r#"<doc id="d"><paragraph><text>x</text></paragraph></doc>"#;
        let mut tokenizer = MarkupTokenizer::new(source);
        let tokens = tokenizer.tokenize().unwrap();

        let ids: Vec<&str> = tokens
            .iter()
            .filter_map(|token| match token {
                Token::Open(tag) => Some(tag.id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(ids[0], "d");
        assert!(ids[1].ends_with("-1"));
        assert!(ids[2].ends_with("-2"));
    }

    #[test]
    fn test_empty_tag_name() {
        let err = MarkupTokenizer::new(r#"<doc id="d"><></doc>"#)
            .tokenize()
            .unwrap_err();
        assert!(matches!(err, SerializationError::EmptyTagName { index: 1, .. }));
    }

    #[test]
    fn test_unterminated_string() {
        let err = MarkupTokenizer::new(r#"<doc id="d"><paragraph id="p>"#)
            .tokenize()
            .unwrap_err();
        assert!(matches!(err, SerializationError::UnterminatedString { index: 1, .. }));
    }

    #[test]
    fn test_tag_mismatch() {
        let source = r#"<doc id="d"><paragraph id="p"><text id="t">x</paragraph></doc>"#;
        let err = MarkupTokenizer::new(source).tokenize().unwrap_err();

        match err {
            SerializationError::TagMismatch {
                index,
                expected,
                found,
                ..
            } => {
                assert_eq!(index, 4);
                assert_eq!(expected, "text");
                assert_eq!(found, "paragraph");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_sentinel_close() {
        let source = r#"<doc id="d"><paragraph id="p"><text id="t">x</></></>"#;
        let registry = ComponentRegistry::with_defaults();
        let tree = parse_markup(source, &registry).unwrap();
        assert_eq!(tree.text(), "x");
    }

    #[test]
    fn test_unclosed_markup() {
        let err = MarkupTokenizer::new(r#"<doc id="d"><paragraph id="p">"#)
            .tokenize()
            .unwrap_err();
        assert!(matches!(err, SerializationError::UnexpectedEnd { index: 2, .. }));
    }

    #[test]
    fn test_parse_error_leaves_no_tree() {
        let registry = ComponentRegistry::with_defaults();
        let result = parse_markup(r#"<doc id="d"><paragraph id="p"></paragraph></doc>"#, &registry);
        assert!(matches!(result, Err(ModelError::Serialization(_))));
    }

    #[test]
    fn test_pretty_markup_parses_back() {
        let registry = ComponentRegistry::with_defaults();
        let tree = parse_markup(HELLO, &registry).unwrap();

        let pretty = to_markup_pretty(&tree);
        assert!(pretty.contains("\n  <paragraph"));

        let reparsed = parse_markup(&pretty, &registry).unwrap();
        assert_eq!(reparsed, tree);
    }

    #[test]
    fn test_token_span() {
        assert_eq!(token_span(HELLO, 0), Some(0..12));
        assert_eq!(token_span(HELLO, 3), Some(43..54));
    }
}
