//! A [`RenderTarget`] that only builds markup, used to coerce rendered content to strings.
//!
//! Nothing is ever matched or reused: every `open` appends a fresh element.

use crate::target::{NodeData, NodeId, PatchConfig, PatchMode, Property, RenderTarget};
use core::fmt::Write as _;
use tracing::{trace, warn};

const VOID_ELEMENTS: &[&str] = &["area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track", "wbr"];

#[derive(Debug)]
enum Content {
	Element {
		name: String,
		attributes: Vec<(String, String)>,
		children: Vec<usize>,
		/// Set by `set_inner_html`, replacing `children` when serializing.
		raw_html: Option<String>,
		data: NodeData,
	},
	Text(String),
	Comment(String),
}

#[derive(Debug)]
struct Entry {
	parent: Option<usize>,
	content: Content,
}

#[derive(Debug)]
pub struct HtmlSerializer {
	entries: Vec<Entry>,
	open: Vec<usize>,
}

impl Default for HtmlSerializer {
	fn default() -> Self {
		Self::new()
	}
}

impl HtmlSerializer {
	#[must_use]
	pub fn new() -> Self {
		Self {
			entries: vec![Entry {
				parent: None,
				content: Content::Element {
					name: "div".to_owned(),
					attributes: Vec::new(),
					children: Vec::new(),
					raw_html: None,
					data: NodeData::new(),
				},
			}],
			open: vec![0],
		}
	}

	/// The detached container everything is rendered into.
	#[must_use]
	pub fn root(&self) -> NodeId {
		NodeId::new(0)
	}

	fn index(node: NodeId) -> usize {
		node.get() as usize
	}

	fn children(&self, node: NodeId) -> &[usize] {
		match self.entries.get(Self::index(node)).map(|entry| &entry.content) {
			Some(Content::Element { children, .. }) => children,
			_ => &[],
		}
	}

	#[must_use]
	pub fn first_child(&self, node: NodeId) -> Option<NodeId> {
		self.children(node).first().map(|&i| NodeId::new(i as u64))
	}

	/// An element's attributes in the order they were first set.
	#[must_use]
	pub fn attributes(&self, node: NodeId) -> &[(String, String)] {
		match self.entries.get(Self::index(node)).map(|entry| &entry.content) {
			Some(Content::Element { attributes, .. }) => attributes,
			_ => &[],
		}
	}

	/// Serialized children of `node`.
	#[must_use]
	pub fn inner_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		self.write_inner(&mut html, Self::index(node));
		html
	}

	/// Serialized `node` including itself.
	#[must_use]
	pub fn outer_html(&self, node: NodeId) -> String {
		let mut html = String::new();
		self.write_outer(&mut html, Self::index(node));
		html
	}

	fn write_inner(&self, html: &mut String, index: usize) {
		match self.entries.get(index).map(|entry| &entry.content) {
			Some(Content::Element { raw_html: Some(raw_html), .. }) => html.push_str(raw_html),
			Some(Content::Element { children, .. }) => {
				for &child in children {
					self.write_outer(html, child);
				}
			}
			Some(Content::Text(_) | Content::Comment(_)) | None => (),
		}
	}

	fn write_outer(&self, html: &mut String, index: usize) {
		match self.entries.get(index).map(|entry| &entry.content) {
			Some(Content::Element { name, attributes, .. }) => {
				html.push('<');
				html.push_str(name);
				for (attribute, value) in attributes {
					// Writing into a `String` can't fail.
					let _ = write!(html, " {}=\"{}\"", attribute, escape(value, true));
				}
				html.push('>');
				if !VOID_ELEMENTS.contains(&name.as_str()) {
					self.write_inner(html, index);
					let _ = write!(html, "</{}>", name);
				}
			}
			Some(Content::Text(text)) => html.push_str(&escape(text, false)),
			Some(Content::Comment(text)) => {
				let _ = write!(html, "<!--{}-->", text);
			}
			None => (),
		}
	}

	fn append(&mut self, content: Content) -> usize {
		self.append_to(self.open.last().copied(), content)
	}

	fn append_to(&mut self, parent: Option<usize>, content: Content) -> usize {
		let index = self.entries.len();
		self.entries.push(Entry { parent, content });
		if let Some(Entry {
			content: Content::Element { children, .. },
			..
		}) = parent.and_then(|parent| self.entries.get_mut(parent))
		{
			children.push(index);
		}
		index
	}

	fn current_attributes(&mut self) -> Option<&mut Vec<(String, String)>> {
		let current = *self.open.last()?;
		match &mut self.entries.get_mut(current)?.content {
			Content::Element { attributes, .. } => Some(attributes),
			Content::Text(_) | Content::Comment(_) => None,
		}
	}
}

fn escape(text: &str, attribute: bool) -> String {
	let mut escaped = String::with_capacity(text.len());
	for c in text.chars() {
		match c {
			'&' => escaped.push_str("&amp;"),
			'"' if attribute => escaped.push_str("&quot;"),
			'<' if !attribute => escaped.push_str("&lt;"),
			'>' if !attribute => escaped.push_str("&gt;"),
			'\u{a0}' => escaped.push_str("&nbsp;"),
			c => escaped.push(c),
		}
	}
	escaped
}

impl RenderTarget for HtmlSerializer {
	fn begin_patch(&mut self, root: NodeId, mode: PatchMode, _config: PatchConfig) {
		trace!(?root, ?mode, "Serializing.");
		self.open.truncate(1);
	}

	fn end_patch(&mut self) {
		if self.open.len() != 1 {
			warn!("{} element(s) were left open.", self.open.len() - 1);
			self.open.truncate(1);
		}
	}

	fn open(&mut self, name: &str, _key: &str) -> Option<NodeId> {
		let index = self.append(Content::Element {
			name: name.to_owned(),
			attributes: Vec::new(),
			children: Vec::new(),
			raw_html: None,
			data: NodeData::new(),
		});
		self.open.push(index);
		Some(NodeId::new(index as u64))
	}

	fn close(&mut self) -> Option<NodeId> {
		if self.open.len() <= 1 {
			warn!("Unbalanced close.");
			return None;
		}
		self.open.pop().map(|index| NodeId::new(index as u64))
	}

	fn text(&mut self, value: &str) -> Option<NodeId> {
		Some(NodeId::new(self.append(Content::Text(value.to_owned())) as u64))
	}

	fn attr(&mut self, name: &str, value: &str) {
		if let Some(attributes) = self.current_attributes() {
			match attributes.iter_mut().find(|(existing, _)| existing == name) {
				Some((_, existing)) => value.clone_into(existing),
				None => attributes.push((name.to_owned(), value.to_owned())),
			}
		}
	}

	fn set_property(&mut self, _name: &str, _value: Property<'_>) {}

	fn skip(&mut self) {}

	fn skip_node(&mut self) {}

	fn apply_attrs(&mut self) {}

	fn apply_statics(&mut self, statics: &[(&str, &str)]) {
		for &(name, value) in statics {
			self.attr(name, value);
		}
	}

	fn current_pointer(&self) -> Option<NodeId> {
		None
	}

	fn current_element(&self) -> Option<NodeId> {
		self.open.last().map(|&index| NodeId::new(index as u64))
	}

	fn has_child_nodes(&self, node: NodeId) -> bool {
		!self.children(node).is_empty()
	}

	fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
		let index = Self::index(node);
		let parent = self.entries.get(index)?.parent?;
		let siblings = self.children(NodeId::new(parent as u64));
		let position = siblings.iter().position(|&sibling| sibling == index)?;
		siblings.get(position + 1).map(|&i| NodeId::new(i as u64))
	}

	fn set_inner_html(&mut self, node: NodeId, html: &str) {
		if let Some(Entry {
			content: Content::Element { raw_html, .. },
			..
		}) = self.entries.get_mut(Self::index(node))
		{
			*raw_html = Some(html.to_owned());
		}
	}

	fn is_comment(&self, node: NodeId) -> bool {
		matches!(self.entries.get(Self::index(node)).map(|entry| &entry.content), Some(Content::Comment(_)))
	}

	fn set_comment(&mut self, node: NodeId, text: &str) {
		if let Some(Entry {
			content: Content::Comment(comment),
			..
		}) = self.entries.get_mut(Self::index(node))
		{
			text.clone_into(comment);
		}
	}

	fn append_comment(&mut self, parent: NodeId, text: &str) -> Option<NodeId> {
		let parent = Self::index(parent);
		match self.entries.get(parent)?.content {
			Content::Element { .. } => Some(NodeId::new(self.append_to(Some(parent), Content::Comment(text.to_owned())) as u64)),
			Content::Text(_) | Content::Comment(_) => None,
		}
	}

	fn node_data(&self, node: NodeId) -> Option<&NodeData> {
		match &self.entries.get(Self::index(node))?.content {
			Content::Element { data, .. } => Some(data),
			Content::Text(_) | Content::Comment(_) => None,
		}
	}

	fn node_data_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
		match &mut self.entries.get_mut(Self::index(node))?.content {
			Content::Element { data, .. } => Some(data),
			Content::Text(_) | Content::Comment(_) => None,
		}
	}

	fn describe(&self, node: NodeId) -> String {
		self.outer_html(node)
	}
}

