//! # Component Registry
//!
//! The model never hard-codes node kinds beyond the root/branch/leaf shape.
//! Everything else (which components exist, which attributes they accept,
//! how they present) is looked up here by component id.

use crate::error::{ModelError, ModelResult};
use crate::node::{Attributes, Identity, Node, NodeKind};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Resolved presentation attributes
pub type Style = BTreeMap<String, String>;

/// How a node participates in layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutRole {
    Root,
    Block,
    Inline,
}

/// What the render tree needs to know about a model node
#[derive(Debug, Clone, PartialEq)]
pub struct RenderHints {
    pub style: Style,
    pub role: LayoutRole,
    /// Append a synthetic line-break marker after the node's content
    pub line_break: bool,
}

/// A node kind, keyed by component id
pub trait Component: fmt::Debug + Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> NodeKind;

    fn validate(&self, _attributes: &Attributes) -> ModelResult<()> {
        Ok(())
    }

    /// Construct a model node of this kind
    fn build(
        &self,
        part: &str,
        id: &str,
        text: String,
        attributes: Attributes,
        children: Vec<Node>,
    ) -> ModelResult<Node> {
        self.validate(&attributes)?;
        Ok(Node {
            identity: Identity {
                kind: self.kind(),
                component: self.id().to_string(),
                part: part.to_string(),
                id: id.to_string(),
                attributes,
            },
            text,
            children,
        })
    }

    fn render(&self, identity: &Identity) -> RenderHints;
}

#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: HashMap<String, Arc<dyn Component>>,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `doc`, `paragraph`, `heading` and `text`
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DocComponent));
        registry.register(Arc::new(BlockComponent::paragraph()));
        registry.register(Arc::new(BlockComponent::heading()));
        registry.register(Arc::new(TextComponent));
        registry
    }

    pub fn register(&mut self, component: Arc<dyn Component>) {
        self.components.insert(component.id().to_string(), component);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Component>> {
        self.components.get(id)
    }

    pub fn lookup(&self, id: &str) -> ModelResult<&Arc<dyn Component>> {
        self.get(id)
            .ok_or_else(|| ModelError::UnknownComponent(id.to_string()))
    }

    /// Render hints for an identity, falling back to a plain inline when the
    /// component is unknown
    pub fn render_hints(&self, identity: &Identity) -> RenderHints {
        match self.get(&identity.component) {
            Some(component) => component.render(identity),
            None => RenderHints {
                style: identity.attributes.clone(),
                role: match identity.kind {
                    NodeKind::Root => LayoutRole::Root,
                    NodeKind::Branch => LayoutRole::Block,
                    NodeKind::Leaf => LayoutRole::Inline,
                },
                line_break: false,
            },
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[derive(Debug)]
pub struct DocComponent;

impl Component for DocComponent {
    fn id(&self) -> &str {
        "doc"
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Root
    }

    fn render(&self, identity: &Identity) -> RenderHints {
        RenderHints {
            style: identity.attributes.clone(),
            role: LayoutRole::Root,
            line_break: false,
        }
    }
}

/// Paragraph-like blocks that end with a line break
#[derive(Debug)]
pub struct BlockComponent {
    id: &'static str,
    leveled: bool,
}

impl BlockComponent {
    pub fn paragraph() -> Self {
        Self {
            id: "paragraph",
            leveled: false,
        }
    }

    pub fn heading() -> Self {
        Self {
            id: "heading",
            leveled: true,
        }
    }

    fn level(attributes: &Attributes) -> u8 {
        attributes
            .get("level")
            .and_then(|level| level.parse().ok())
            .unwrap_or(1)
    }
}

impl Component for BlockComponent {
    fn id(&self) -> &str {
        self.id
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Branch
    }

    fn validate(&self, attributes: &Attributes) -> ModelResult<()> {
        if let Some(level) = attributes.get("level") {
            if !self.leveled {
                return Err(ModelError::invalid_attribute(self.id, "level", "not supported"));
            }
            match level.parse::<u8>() {
                Ok(1..=6) => {}
                _ => {
                    return Err(ModelError::invalid_attribute(
                        self.id,
                        "level",
                        format!("expected 1-6, got {:?}", level),
                    ))
                }
            }
        }
        Ok(())
    }

    fn render(&self, identity: &Identity) -> RenderHints {
        let mut style = identity.attributes.clone();
        if self.leveled {
            let scale = match Self::level(&identity.attributes) {
                1 => "2",
                2 => "1.5",
                _ => "1.25",
            };
            style.insert("scale".to_string(), scale.to_string());
        }
        RenderHints {
            style,
            role: LayoutRole::Block,
            line_break: true,
        }
    }
}

/// Text runs
#[derive(Debug)]
pub struct TextComponent;

impl Component for TextComponent {
    fn id(&self) -> &str {
        "text"
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Leaf
    }

    fn validate(&self, attributes: &Attributes) -> ModelResult<()> {
        for (name, value) in attributes {
            match name.as_str() {
                "bold" | "italic" | "underline" => {
                    if value != "true" && value != "false" {
                        return Err(ModelError::invalid_attribute(
                            "text",
                            name,
                            format!("expected true or false, got {:?}", value),
                        ));
                    }
                }
                "scale" => match value.parse::<f32>() {
                    Ok(scale) if scale > 0.0 => {}
                    _ => {
                        return Err(ModelError::invalid_attribute(
                            "text",
                            name,
                            format!("expected a positive number, got {:?}", value),
                        ))
                    }
                },
                _ => {}
            }
        }
        Ok(())
    }

    fn render(&self, identity: &Identity) -> RenderHints {
        RenderHints {
            style: identity.attributes.clone(),
            role: LayoutRole::Inline,
            line_break: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_components() {
        let registry = ComponentRegistry::with_defaults();

        assert_eq!(registry.len(), 4);
        assert_eq!(registry.lookup("doc").unwrap().kind(), NodeKind::Root);
        assert_eq!(registry.lookup("paragraph").unwrap().kind(), NodeKind::Branch);
        assert_eq!(registry.lookup("text").unwrap().kind(), NodeKind::Leaf);
        assert_eq!(
            registry.lookup("table").unwrap_err(),
            ModelError::UnknownComponent("table".to_string())
        );
    }

    #[test]
    fn test_build_validates_attributes() {
        let registry = ComponentRegistry::with_defaults();
        let text = registry.lookup("text").unwrap();

        let mut attributes = Attributes::new();
        attributes.insert("bold".to_string(), "yes".to_string());
        let err = text
            .build("", "t1", "hi".to_string(), attributes, vec![])
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidAttribute { .. }));

        let node = text
            .build("", "t1", "hi".to_string(), Attributes::new(), vec![])
            .unwrap();
        assert_eq!(node.size(), 2);
    }

    #[test]
    fn test_heading_render_hints() {
        let registry = ComponentRegistry::with_defaults();
        let heading = Node::branch("heading", "h", vec![]).with_attribute("level", "2");

        let hints = registry.render_hints(&heading.identity);
        assert_eq!(hints.role, LayoutRole::Block);
        assert!(hints.line_break);
        assert_eq!(hints.style.get("scale").map(String::as_str), Some("1.5"));
    }

    #[test]
    fn test_paragraph_rejects_level() {
        let registry = ComponentRegistry::with_defaults();
        let mut attributes = Attributes::new();
        attributes.insert("level".to_string(), "1".to_string());

        assert!(registry.lookup("paragraph").unwrap().validate(&attributes).is_err());
        assert!(registry.lookup("heading").unwrap().validate(&attributes).is_ok());
    }
}
