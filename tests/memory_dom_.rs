#![allow(dead_code)]

use soy_idom::{
	key::KeyFragment,
	target::{NodeData, NodeId, PatchConfig, PatchMode, Property, RenderTarget},
};
use std::{collections::BTreeMap, sync::Once};

static LOG_INIT: Once = Once::new();

pub fn init_logging() {
	LOG_INIT.call_once(|| {
		let _ = tracing_subscriber::fmt()
			.with_max_level(tracing::Level::TRACE)
			.with_test_writer()
			.try_init();
	});
}

#[derive(Debug)]
enum Kind {
	Element {
		name: String,
		key: String,
		attributes: BTreeMap<String, String>,
		properties: BTreeMap<String, String>,
		children: Vec<usize>,
		raw_html: Option<String>,
	},
	Text(String),
	Comment(String),
}

#[derive(Debug)]
struct Node {
	parent: Option<usize>,
	kind: Kind,
	data: NodeData,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
	parent: usize,
	index: usize,
}

/// A keyed in-memory tree that reconciles like incremental DOM:
/// `open` looks for a matching element among the remaining siblings, moves it into place or creates a new one,
/// and `close` removes whatever children weren't visited.
#[derive(Debug)]
pub struct MemoryDom {
	nodes: Vec<Option<Node>>,
	frames: Vec<Frame>,
	mode: PatchMode,
	config: PatchConfig,
	pub created: usize,
	pub inner_html_writes: usize,
	pub comment_writes: usize,
}

impl Default for MemoryDom {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryDom {
	pub fn new() -> Self {
		Self {
			nodes: vec![Some(Node {
				parent: None,
				kind: Kind::Element {
					name: "body".to_owned(),
					key: String::new(),
					attributes: BTreeMap::new(),
					properties: BTreeMap::new(),
					children: Vec::new(),
					raw_html: None,
				},
				data: NodeData::new(),
			})],
			frames: Vec::new(),
			mode: PatchMode::Inner,
			config: PatchConfig::default(),
			created: 0,
			inner_html_writes: 0,
			comment_writes: 0,
		}
	}

	pub fn root(&self) -> NodeId {
		NodeId::new(0)
	}

	fn node(&self, index: usize) -> &Node {
		self.nodes[index].as_ref().expect("live node")
	}

	fn node_mut(&mut self, index: usize) -> &mut Node {
		self.nodes[index].as_mut().expect("live node")
	}

	fn children_of(&self, index: usize) -> &[usize] {
		match self.nodes.get(index).and_then(Option::as_ref).map(|node| &node.kind) {
			Some(Kind::Element { children, .. }) => children,
			_ => &[],
		}
	}

	fn children_mut(&mut self, index: usize) -> &mut Vec<usize> {
		match &mut self.node_mut(index).kind {
			Kind::Element { children, .. } => children,
			Kind::Text(_) | Kind::Comment(_) => panic!("only elements have children"),
		}
	}

	fn insert(&mut self, parent: usize, position: usize, kind: Kind) -> usize {
		let index = self.nodes.len();
		self.nodes.push(Some(Node {
			parent: Some(parent),
			kind,
			data: NodeData::new(),
		}));
		self.children_mut(parent).insert(position, index);
		index
	}

	fn new_element(name: &str, key: &str) -> Kind {
		Kind::Element {
			name: name.to_owned(),
			key: key.to_owned(),
			attributes: BTreeMap::new(),
			properties: BTreeMap::new(),
			children: Vec::new(),
			raw_html: None,
		}
	}

	/// Builds content as a server would have rendered it.
	pub fn append_element(&mut self, parent: NodeId, name: &str, key: &str) -> NodeId {
		let parent = parent.get() as usize;
		let position = self.children_of(parent).len();
		NodeId::new(self.insert(parent, position, Self::new_element(name, key)) as u64)
	}

	pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
		let parent = parent.get() as usize;
		let position = self.children_of(parent).len();
		NodeId::new(self.insert(parent, position, Kind::Text(text.to_owned())) as u64)
	}

	fn drop_subtree(&mut self, index: usize) {
		if let Some(node) = self.nodes.get_mut(index).and_then(Option::take) {
			if let Kind::Element { children, .. } = node.kind {
				for child in children {
					self.drop_subtree(child);
				}
			}
		}
	}

	/// Removes a node and everything below it, dropping their data.
	pub fn remove(&mut self, node: NodeId) {
		let index = node.get() as usize;
		if let Some(parent) = self.nodes.get(index).and_then(Option::as_ref).and_then(|node| node.parent) {
			self.children_mut(parent).retain(|&child| child != index);
		}
		self.drop_subtree(index);
	}

	fn remove_unvisited(&mut self, frame: Frame) {
		let rest = self.children_mut(frame.parent).split_off(frame.index);
		for child in rest {
			self.drop_subtree(child);
		}
	}

	pub fn is_alive(&self, node: NodeId) -> bool {
		matches!(self.nodes.get(node.get() as usize), Some(Some(_)))
	}

	pub fn children(&self, node: NodeId) -> Vec<NodeId> {
		self.children_of(node.get() as usize).iter().map(|&i| NodeId::new(i as u64)).collect()
	}

	pub fn name(&self, node: NodeId) -> Option<&str> {
		match &self.node(node.get() as usize).kind {
			Kind::Element { name, .. } => Some(name),
			Kind::Text(_) | Kind::Comment(_) => None,
		}
	}

	pub fn key(&self, node: NodeId) -> Option<&str> {
		match &self.node(node.get() as usize).kind {
			Kind::Element { key, .. } => Some(key),
			Kind::Text(_) | Kind::Comment(_) => None,
		}
	}

	pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
		match &self.node(node.get() as usize).kind {
			Kind::Element { attributes, .. } => attributes.get(name).map(String::as_str),
			Kind::Text(_) | Kind::Comment(_) => None,
		}
	}

	pub fn property(&self, node: NodeId, name: &str) -> Option<&str> {
		match &self.node(node.get() as usize).kind {
			Kind::Element { properties, .. } => properties.get(name).map(String::as_str),
			Kind::Text(_) | Kind::Comment(_) => None,
		}
	}

	pub fn raw_html(&self, node: NodeId) -> Option<&str> {
		match &self.node(node.get() as usize).kind {
			Kind::Element { raw_html, .. } => raw_html.as_deref(),
			Kind::Text(_) | Kind::Comment(_) => None,
		}
	}

	pub fn comment(&self, node: NodeId) -> Option<&str> {
		match &self.node(node.get() as usize).kind {
			Kind::Comment(text) => Some(text),
			_ => None,
		}
	}

	/// Concatenated text below `node`, leaving out comments like the DOM does.
	pub fn text_content(&self, node: NodeId) -> String {
		match &self.node(node.get() as usize).kind {
			Kind::Text(text) => text.clone(),
			Kind::Comment(_) => String::new(),
			Kind::Element { raw_html: Some(raw_html), .. } => raw_html.clone(),
			Kind::Element { children, .. } => children.iter().map(|&child| self.text_content(NodeId::new(child as u64))).collect(),
		}
	}

	fn element_mut(&mut self) -> Option<&mut Kind> {
		let parent = self.frames.last()?.parent;
		Some(&mut self.node_mut(parent).kind)
	}
}

impl RenderTarget for MemoryDom {
	fn begin_patch(&mut self, root: NodeId, mode: PatchMode, config: PatchConfig) {
		self.mode = mode;
		self.config = config;
		self.frames.clear();
		let root = root.get() as usize;
		match mode {
			PatchMode::Inner => self.frames.push(Frame { parent: root, index: 0 }),
			PatchMode::Outer => {
				let parent = self.node(root).parent.expect("outer patches need a parented root");
				let index = self.children_of(parent).iter().position(|&child| child == root).expect("child of its parent");
				self.frames.push(Frame { parent, index });
			}
		}
	}

	fn end_patch(&mut self) {
		if let Some(&frame) = self.frames.first() {
			if self.frames.len() == 1 && self.mode == PatchMode::Inner {
				self.remove_unvisited(frame);
			}
		}
		self.frames.clear();
	}

	fn open(&mut self, name: &str, key: &str) -> Option<NodeId> {
		let frame = *self.frames.last()?;
		let matches = self.config.matches;
		let remaining = self.children_of(frame.parent).get(frame.index..).unwrap_or(&[]);
		let found = remaining.iter().position(|&child| match &self.node(child).kind {
			Kind::Element { name: existing, key: existing_key, .. } => matches(name, existing.as_str(), &KeyFragment::Str(key), &KeyFragment::Str(existing_key.as_str())),
			Kind::Text(_) | Kind::Comment(_) => false,
		});

		let index = match found {
			Some(offset) => {
				let children = self.children_mut(frame.parent);
				let index = children.remove(frame.index + offset);
				children.insert(frame.index, index);
				index
			}
			None => {
				self.created += 1;
				self.insert(frame.parent, frame.index, Self::new_element(name, key))
			}
		};

		if let Some(top) = self.frames.last_mut() {
			top.index += 1;
		}
		self.frames.push(Frame { parent: index, index: 0 });
		Some(NodeId::new(index as u64))
	}

	fn close(&mut self) -> Option<NodeId> {
		if self.frames.len() <= 1 {
			return None;
		}
		let frame = self.frames.pop()?;
		self.remove_unvisited(frame);
		Some(NodeId::new(frame.parent as u64))
	}

	fn text(&mut self, value: &str) -> Option<NodeId> {
		let frame = *self.frames.last()?;
		let existing = self.children_of(frame.parent).get(frame.index).copied();
		let index = match existing {
			Some(index) if matches!(self.node(index).kind, Kind::Text(_)) => {
				self.node_mut(index).kind = Kind::Text(value.to_owned());
				index
			}
			_ => self.insert(frame.parent, frame.index, Kind::Text(value.to_owned())),
		};
		if let Some(top) = self.frames.last_mut() {
			top.index += 1;
		}
		Some(NodeId::new(index as u64))
	}

	fn attr(&mut self, name: &str, value: &str) {
		if let Some(Kind::Element { attributes, .. }) = self.element_mut() {
			attributes.insert(name.to_owned(), value.to_owned());
		}
	}

	fn set_property(&mut self, name: &str, value: Property<'_>) {
		let value = match value {
			Property::Bool(b) => b.to_string(),
			Property::Text(text) => text.to_owned(),
		};
		if let Some(Kind::Element { properties, .. }) = self.element_mut() {
			properties.insert(name.to_owned(), value);
		}
	}

	fn skip(&mut self) {
		if let Some(&Frame { parent, .. }) = self.frames.last() {
			let len = self.children_of(parent).len();
			if let Some(top) = self.frames.last_mut() {
				top.index = len;
			}
		}
	}

	fn skip_node(&mut self) {
		if let Some(&Frame { parent, .. }) = self.frames.last() {
			let len = self.children_of(parent).len();
			if let Some(top) = self.frames.last_mut() {
				top.index = (top.index + 1).min(len);
			}
		}
	}

	fn apply_attrs(&mut self) {}

	fn apply_statics(&mut self, statics: &[(&str, &str)]) {
		for &(name, value) in statics {
			self.attr(name, value);
		}
	}

	fn current_pointer(&self) -> Option<NodeId> {
		let frame = self.frames.last()?;
		self.children_of(frame.parent).get(frame.index).map(|&i| NodeId::new(i as u64))
	}

	fn current_element(&self) -> Option<NodeId> {
		self.frames.last().map(|frame| NodeId::new(frame.parent as u64))
	}

	fn has_child_nodes(&self, node: NodeId) -> bool {
		!self.children_of(node.get() as usize).is_empty() || self.raw_html(node).is_some()
	}

	fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
		let index = node.get() as usize;
		let parent = self.nodes.get(index)?.as_ref()?.parent?;
		let siblings = self.children_of(parent);
		let position = siblings.iter().position(|&sibling| sibling == index)?;
		siblings.get(position + 1).map(|&i| NodeId::new(i as u64))
	}

	fn set_inner_html(&mut self, node: NodeId, html: &str) {
		self.inner_html_writes += 1;
		let index = node.get() as usize;
		let children = std::mem::take(self.children_mut(index));
		for child in children {
			self.drop_subtree(child);
		}
		if let Kind::Element { raw_html, .. } = &mut self.node_mut(index).kind {
			*raw_html = Some(html.to_owned());
		}
	}

	fn is_comment(&self, node: NodeId) -> bool {
		matches!(self.nodes.get(node.get() as usize), Some(Some(Node { kind: Kind::Comment(_), .. })))
	}

	fn set_comment(&mut self, node: NodeId, text: &str) {
		if let Some(Some(Node { kind: Kind::Comment(comment), .. })) = self.nodes.get_mut(node.get() as usize) {
			text.clone_into(comment);
			self.comment_writes += 1;
		}
	}

	fn append_comment(&mut self, parent: NodeId, text: &str) -> Option<NodeId> {
		let parent = parent.get() as usize;
		if !matches!(self.nodes.get(parent), Some(Some(Node { kind: Kind::Element { .. }, .. }))) {
			return None;
		}
		self.created += 1;
		let position = self.children_of(parent).len();
		Some(NodeId::new(self.insert(parent, position, Kind::Comment(text.to_owned())) as u64))
	}

	fn node_data(&self, node: NodeId) -> Option<&NodeData> {
		let node = self.nodes.get(node.get() as usize)?.as_ref()?;
		match node.kind {
			Kind::Element { .. } => Some(&node.data),
			Kind::Text(_) | Kind::Comment(_) => None,
		}
	}

	fn node_data_mut(&mut self, node: NodeId) -> Option<&mut NodeData> {
		let node = self.nodes.get_mut(node.get() as usize)?.as_mut()?;
		match node.kind {
			Kind::Element { .. } => Some(&mut node.data),
			Kind::Text(_) | Kind::Comment(_) => None,
		}
	}

	fn describe(&self, node: NodeId) -> String {
		match (self.name(node), self.comment(node)) {
			(Some(name), _) => format!("<{} key={:?}>{}</{}>", name, self.key(node).unwrap_or_default(), self.text_content(node), name),
			(None, Some(comment)) => format!("<!--{}-->", comment),
			(None, None) => self.text_content(node),
		}
	}
}
