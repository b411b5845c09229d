//! A headless display surface.
//!
//! Nodes live in an arena and are never freed, so removed nodes stay inspectable (and detached) the way removed DOM nodes do.

use crate::{
	event::{Event, Handler},
	surface::Surface,
	Error,
};
use core::cell::RefCell;
use hashbrown::HashMap;
use std::{collections::BTreeMap, rc::Rc};
use tracing::{trace, trace_span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An in-memory [`Surface`]. Clones share the same arena.
#[derive(Clone, Default)]
pub struct MemorySurface(Rc<RefCell<Arena>>);

#[derive(Default)]
struct Arena {
	nodes: Vec<MemoryNode>,
}

struct MemoryNode {
	content: Content,
	parent: Option<NodeId>,
	children: Vec<NodeId>,
}

enum Content {
	Element {
		tag: String,
		attributes: BTreeMap<String, String>,
		handlers: HashMap<String, Handler>,
	},
	Text(String),
}

impl Arena {
	fn get(&self, id: NodeId) -> Result<&MemoryNode, Error> {
		self.nodes.get(id.0).ok_or_else(|| Error::Surface(format!("Unknown node {:?}", id)))
	}

	fn get_mut(&mut self, id: NodeId) -> Result<&mut MemoryNode, Error> {
		self.nodes.get_mut(id.0).ok_or_else(|| Error::Surface(format!("Unknown node {:?}", id)))
	}

	fn push(&mut self, content: Content) -> NodeId {
		self.nodes.push(MemoryNode {
			content,
			parent: None,
			children: Vec::new(),
		});
		NodeId(self.nodes.len() - 1)
	}

	fn element_mut(&mut self, id: NodeId) -> Result<(&mut BTreeMap<String, String>, &mut HashMap<String, Handler>), Error> {
		match &mut self.get_mut(id)?.content {
			Content::Element { attributes, handlers, .. } => Ok((attributes, handlers)),
			Content::Text(_) => Err(Error::Surface(format!("{:?} is a text node, not an element", id))),
		}
	}

	fn write_text_content(&self, id: NodeId, text: &mut String) {
		if let Some(node) = self.nodes.get(id.0) {
			match &node.content {
				Content::Text(data) => text.push_str(data),
				Content::Element { .. } => {
					for &child in &node.children {
						self.write_text_content(child, text)
					}
				}
			}
		}
	}

	fn write_html(&self, id: NodeId, html: &mut String) {
		let node = match self.nodes.get(id.0) {
			Some(node) => node,
			None => return,
		};
		match &node.content {
			Content::Text(data) => html.push_str(data),
			Content::Element { tag, attributes, .. } => {
				html.push('<');
				html.push_str(tag);
				for (name, value) in attributes {
					html.push(' ');
					html.push_str(name);
					if !value.is_empty() {
						html.push_str(&format!("={:?}", value));
					}
				}
				html.push('>');
				for &child in &node.children {
					self.write_html(child, html)
				}
				html.push_str("</");
				html.push_str(tag);
				html.push('>');
			}
		}
	}
}

impl MemorySurface {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates a detached element to mount into, like a container that is already part of the page.
	#[must_use]
	pub fn create_container(&self, tag: &str) -> NodeId {
		self.0.borrow_mut().push(Content::Element {
			tag: tag.to_owned(),
			attributes: BTreeMap::new(),
			handlers: HashMap::new(),
		})
	}

	/// Total number of nodes ever created, including the containers.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.0.borrow().nodes.len()
	}

	#[must_use]
	pub fn children(&self, id: NodeId) -> Vec<NodeId> {
		self.0.borrow().nodes.get(id.0).map(|node| node.children.clone()).unwrap_or_default()
	}

	#[must_use]
	pub fn parent(&self, id: NodeId) -> Option<NodeId> {
		self.0.borrow().nodes.get(id.0).and_then(|node| node.parent)
	}

	/// The tag name of an element, or [`None`] for text and unknown nodes.
	#[must_use]
	pub fn tag(&self, id: NodeId) -> Option<String> {
		match self.0.borrow().nodes.get(id.0).map(|node| &node.content) {
			Some(Content::Element { tag, .. }) => Some(tag.clone()),
			_ => None,
		}
	}

	#[must_use]
	pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
		match self.0.borrow().nodes.get(id.0).map(|node| &node.content) {
			Some(Content::Element { attributes, .. }) => attributes.get(name).cloned(),
			_ => None,
		}
	}

	#[must_use]
	pub fn attribute_names(&self, id: NodeId) -> Vec<String> {
		match self.0.borrow().nodes.get(id.0).map(|node| &node.content) {
			Some(Content::Element { attributes, .. }) => attributes.keys().cloned().collect(),
			_ => Vec::new(),
		}
	}

	/// The concatenated text of `id` and all its descendants.
	#[must_use]
	pub fn text_content(&self, id: NodeId) -> String {
		let mut text = String::new();
		self.0.borrow().write_text_content(id, &mut text);
		text
	}

	#[must_use]
	pub fn has_handler(&self, id: NodeId, event: &str) -> bool {
		match self.0.borrow().nodes.get(id.0).map(|node| &node.content) {
			Some(Content::Element { handlers, .. }) => handlers.contains_key(event),
			_ => false,
		}
	}

	#[must_use]
	pub fn handler_count(&self) -> usize {
		self.0
			.borrow()
			.nodes
			.iter()
			.map(|node| match &node.content {
				Content::Element { handlers, .. } => handlers.len(),
				Content::Text(_) => 0,
			})
			.sum()
	}

	/// Serializes `id` and its descendants. Attributes are sorted by name.
	#[must_use]
	pub fn to_html(&self, id: NodeId) -> String {
		let mut html = String::new();
		self.0.borrow().write_html(id, &mut html);
		html
	}

	/// Runs the handler bound for `event.name()` on `id`, if there is one. Returns whether a handler ran.
	///
	/// Events don't bubble.
	pub fn dispatch(&self, id: NodeId, event: &Event) -> bool {
		let span = trace_span!("Dispatching event", ?id, event = event.name());
		let _enter = span.enter();

		let handler = match self.0.borrow().nodes.get(id.0).map(|node| &node.content) {
			Some(Content::Element { handlers, .. }) => handlers.get(event.name()).cloned(),
			_ => None,
		};
		match handler {
			Some(handler) => {
				handler(event);
				true
			}
			None => {
				trace!("No handler bound.");
				false
			}
		}
	}
}

impl Surface for MemorySurface {
	type Node = NodeId;

	fn create_element(&self, tag: &str) -> Result<NodeId, Error> {
		if tag.is_empty() || tag.contains(|c: char| c.is_whitespace() || c == '<' || c == '>') {
			return Err(Error::Surface(format!("Invalid tag name {:?}", tag)));
		}
		Ok(self.create_container(tag))
	}

	fn create_text(&self, text: &str) -> Result<NodeId, Error> {
		Ok(self.0.borrow_mut().push(Content::Text(text.to_owned())))
	}

	fn set_text(&self, node: &NodeId, text: &str) -> Result<(), Error> {
		let mut arena = self.0.borrow_mut();
		let children = core::mem::take(&mut arena.get_mut(*node)?.children);
		for child in children {
			arena.get_mut(child)?.parent = None;
		}
		if let Content::Text(data) = &mut arena.get_mut(*node)?.content {
			*data = text.to_owned();
			return Ok(());
		}

		// Elements get their children replaced by a single text node, like `textContent`.
		drop(arena);
		let text = self.create_text(text)?;
		self.insert_before(node, &text, None)
	}

	fn set_attribute(&self, element: &NodeId, name: &str, value: &str) -> Result<(), Error> {
		let mut arena = self.0.borrow_mut();
		let (attributes, _) = arena.element_mut(*element)?;
		attributes.insert(name.to_owned(), value.to_owned());
		Ok(())
	}

	fn remove_attribute(&self, element: &NodeId, name: &str) -> Result<(), Error> {
		let mut arena = self.0.borrow_mut();
		let (attributes, _) = arena.element_mut(*element)?;
		attributes.remove(name);
		Ok(())
	}

	fn insert_before(&self, parent: &NodeId, child: &NodeId, reference: Option<&NodeId>) -> Result<(), Error> {
		let mut arena = self.0.borrow_mut();
		if let Content::Text(_) = arena.get(*parent)?.content {
			return Err(Error::Surface(format!("Can't insert into text node {:?}", parent)));
		}
		if let Some(previous_parent) = arena.get(*child)?.parent {
			arena.get_mut(previous_parent)?.children.retain(|c| c != child);
		}

		let siblings = &mut arena.get_mut(*parent)?.children;
		let index = match reference {
			Some(reference) => siblings
				.iter()
				.position(|c| c == reference)
				.ok_or_else(|| Error::Surface(format!("{:?} is not a child of {:?}", reference, parent)))?,
			None => siblings.len(),
		};
		siblings.insert(index, *child);
		arena.get_mut(*child)?.parent = Some(*parent);
		Ok(())
	}

	fn remove_child(&self, parent: &NodeId, child: &NodeId) -> Result<(), Error> {
		let mut arena = self.0.borrow_mut();
		let siblings = &mut arena.get_mut(*parent)?.children;
		let index = siblings
			.iter()
			.position(|c| c == child)
			.ok_or_else(|| Error::Surface(format!("{:?} is not a child of {:?}", child, parent)))?;
		siblings.remove(index);
		arena.get_mut(*child)?.parent = None;
		Ok(())
	}

	fn bind_event(&self, element: &NodeId, event: &str, handler: Handler) -> Result<(), Error> {
		let mut arena = self.0.borrow_mut();
		let (_, handlers) = arena.element_mut(*element)?;
		handlers.insert(event.to_owned(), handler);
		Ok(())
	}

	fn unbind_event(&self, element: &NodeId, event: &str) -> Result<(), Error> {
		let mut arena = self.0.borrow_mut();
		let (_, handlers) = arena.element_mut(*element)?;
		handlers.remove(event);
		Ok(())
	}
}
