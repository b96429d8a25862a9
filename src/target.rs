//! The protocol consumed from the underlying keyed-diff primitive.
//!
//! A [`RenderTarget`] owns the actual tree and performs all creation, movement and removal of nodes.
//! This crate only drives it through the open/attr/text/close protocol and reads back a little sibling structure.

use crate::{element::ElementSlot, key::KeyFragment};
use core::fmt;

/// Opaque handle to a node owned by a [`RenderTarget`].
///
/// Handles are only meaningful to the target that issued them and may be reused after the node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
	#[must_use]
	pub const fn new(raw: u64) -> Self {
		Self(raw)
	}

	#[must_use]
	pub const fn get(self) -> u64 {
		self.0
	}
}

/// Runtime state this crate attaches to an element.
///
/// Targets must keep one of these per element and drop it together with the element, which is what releases any attached component.
#[derive(Default)]
pub struct NodeData {
	/// Serialized parameters the subtree was first skipped with.
	pub(crate) last_params: Option<String>,
	pub(crate) element: Option<ElementSlot>,
	/// Markup last written into an `html-blob` element.
	pub(crate) inner_html: Option<String>,
}

impl NodeData {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Whether a stateful element is attached here.
	#[must_use]
	pub fn has_element(&self) -> bool {
		self.element.is_some()
	}

	/// The recorded skip parameters, if this subtree was skipped with parameters before.
	#[must_use]
	pub fn last_params(&self) -> Option<&str> {
		self.last_params.as_deref()
	}
}

impl fmt::Debug for NodeData {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NodeData")
			.field("last_params", &self.last_params.as_ref().map(String::len))
			.field("element", &self.element)
			.field("inner_html", &self.inner_html.as_ref().map(String::len))
			.finish()
	}
}

/// A DOM property that isn't reflected by its attribute alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Property<'a> {
	Bool(bool),
	Text(&'a str),
}

/// How the root handed to [`RenderTarget::begin_patch`] is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchMode {
	/// The pass renders the root's children.
	Inner,
	/// The pass renders the root itself.
	Outer,
}

/// Node-matching predicate used while reconciling: `(name, expected name, proposed key, current key)`.
pub type MatchFn = fn(&str, &str, &KeyFragment<'_>, &KeyFragment<'_>) -> bool;

/// Configuration handed to the target at the start of each pass.
#[derive(Clone, Copy)]
pub struct PatchConfig {
	pub matches: MatchFn,
}

impl Default for PatchConfig {
	fn default() -> Self {
		Self { matches: crate::key::matches }
	}
}

impl fmt::Debug for PatchConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PatchConfig").finish_non_exhaustive()
	}
}

/// Capability interface of the keyed-diff primitive.
///
/// Calls arrive in document order: `open`, any number of `attr`, `apply_attrs`, children, `close`.
/// `skip` marks the remaining children of the current element as visited, `skip_node` does the same for the single node at the pointer.
pub trait RenderTarget {
	fn begin_patch(&mut self, root: NodeId, mode: PatchMode, config: PatchConfig);
	fn end_patch(&mut self);

	/// Opens (finds, moves or creates) an element with the given tag name and key.
	fn open(&mut self, name: &str, key: &str) -> Option<NodeId>;
	fn close(&mut self) -> Option<NodeId>;
	fn text(&mut self, value: &str) -> Option<NodeId>;
	fn attr(&mut self, name: &str, value: &str);
	fn set_property(&mut self, name: &str, value: Property<'_>);
	fn skip(&mut self);
	fn skip_node(&mut self);
	fn apply_attrs(&mut self);
	fn apply_statics(&mut self, statics: &[(&str, &str)]);

	/// The node that will be matched against by the next open call.
	fn current_pointer(&self) -> Option<NodeId>;
	/// The element currently open.
	fn current_element(&self) -> Option<NodeId>;

	fn has_child_nodes(&self, node: NodeId) -> bool;
	fn next_sibling(&self, node: NodeId) -> Option<NodeId>;

	/// Replaces an element's children with parsed markup.
	fn set_inner_html(&mut self, node: NodeId, html: &str);

	fn is_comment(&self, node: NodeId) -> bool;
	/// Rewrites the text of an existing comment node.
	fn set_comment(&mut self, node: NodeId, text: &str);
	/// Appends a new comment node as the last child of `parent`.
	fn append_comment(&mut self, parent: NodeId, text: &str) -> Option<NodeId>;

	/// `None` for nodes that can't carry data (text nodes, stale handles).
	fn node_data(&self, node: NodeId) -> Option<&NodeData>;
	fn node_data_mut(&mut self, node: NodeId) -> Option<&mut NodeData>;

	/// A human-readable rendition of the node for diagnostics, like its outer markup.
	fn describe(&self, node: NodeId) -> String;
}
