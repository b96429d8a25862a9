//! Stateful elements (`{element}` templates) and how they are found again on later passes.
//!
//! An element instance is identified by the composite key that was current when it was first materialized.
//! On each pass, the siblings starting at the current pointer are scanned for an attached instance of the same [`ComponentKind`]
//! whose key [matches](`crate::key::is_matching_key_str`). Descendants are never searched.

use crate::{
	key::{is_matching_key_str, serialize_key, KeyFragment},
	renderer::{Renderer, RendererKind},
	target::{NodeId, RenderTarget},
	Error, IjData,
};
use core::{
	any::Any,
	cell::{Cell, Ref, RefCell, RefMut},
	fmt,
};
use std::rc::Rc;
use tracing::{trace, trace_span, warn};

/// Registry tag of a stateful element type.
///
/// Two element types must never share a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentKind(&'static str);

impl ComponentKind {
	#[must_use]
	pub const fn new(name: &'static str) -> Self {
		Self(name)
	}

	#[must_use]
	pub const fn name(self) -> &'static str {
		self.0
	}
}

/// A compiled `{element}` template together with its state.
pub trait SoyElement: 'static {
	type Data: ?Sized;

	const KIND: ComponentKind;

	fn create(data: &Self::Data, ij_data: &IjData) -> Self
	where
		Self: Sized;

	/// Renders the element's root through `renderer`, returning the root node if the renderer produced one.
	fn render(&mut self, renderer: &mut dyn Renderer, data: &Self::Data, ij_data: &IjData) -> Result<Option<NodeId>, Error>;

	/// Called once after each pass that rendered this instance.
	fn sync_state(&mut self) {}
}

/// An element instance as stored on the tree.
pub struct Materialized<E> {
	key: String,
	node: Cell<Option<NodeId>>,
	state: RefCell<E>,
}

impl<E> Materialized<E> {
	fn new(key: String, state: E) -> Self {
		Self {
			key,
			node: Cell::new(None),
			state: RefCell::new(state),
		}
	}

	/// The composite key this instance was created with.
	#[must_use]
	pub fn key(&self) -> &str {
		&self.key
	}

	/// The node this instance is attached to, if any.
	#[must_use]
	pub fn node(&self) -> Option<NodeId> {
		self.node.get()
	}

	/// # Panics
	///
	/// Iff the state is currently borrowed mutably, e.g. while the element renders.
	#[must_use]
	pub fn state(&self) -> Ref<'_, E> {
		self.state.borrow()
	}

	/// # Panics
	///
	/// Iff the state is currently borrowed, e.g. while the element renders.
	#[must_use]
	pub fn state_mut(&self) -> RefMut<'_, E> {
		self.state.borrow_mut()
	}
}

impl<E: fmt::Debug> fmt::Debug for Materialized<E> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Materialized")
			.field("key", &self.key)
			.field("node", &self.node.get())
			.field("state", &self.state)
			.finish()
	}
}

/// Lifecycle hook of an element queued during a pass.
pub trait QueuedElement {
	fn sync_state(&self);
}

impl<E: SoyElement> QueuedElement for Materialized<E> {
	fn sync_state(&self) {
		self.state.borrow_mut().sync_state();
	}
}

/// What is stored on a node with an element attached: the `(kind, key) -> instance` record.
pub(crate) struct ElementSlot {
	kind: ComponentKind,
	key: String,
	instance: Rc<dyn Any>,
}

impl ElementSlot {
	fn holds(&self, instance: *const ()) -> bool {
		Rc::as_ptr(&self.instance).cast::<()>() == instance
	}
}

impl fmt::Debug for ElementSlot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ElementSlot").field("kind", &self.kind).field("key", &self.key).finish_non_exhaustive()
	}
}

/// Tries to find an existing instance of `E`, creating one otherwise, then queues and renders it.
///
/// In a [`FalsinessRenderer`](`crate::renderer::FalsinessRenderer`) this only records that something rendered and returns `Ok(None)`.
pub fn handle_soy_element<E: SoyElement>(renderer: &mut dyn Renderer, first_element_key: KeyFragment<'_>, data: &E::Data, ij_data: &IjData) -> Result<Option<Rc<Materialized<E>>>, Error> {
	// Testing truthiness only: record an element but don't do anything.
	if renderer.kind() == RendererKind::Falsiness {
		renderer.open("div", "");
		renderer.close();
		return Ok(None);
	}

	let soy_element_key = serialize_key(first_element_key) + renderer.current_key_stack();
	let span = trace_span!("handle_soy_element", kind = E::KIND.name(), key = soy_element_key.as_str());
	let _enter = span.enter();

	let pointer = renderer.current_pointer();
	let found = match renderer.target() {
		Some(target) => find_element::<E>(&*target, pointer, &soy_element_key),
		None => None,
	};
	let element = match found {
		Some(element) => {
			trace!("Reusing element.");
			element
		}
		None => {
			trace!("Creating element.");
			Rc::new(Materialized::new(soy_element_key, E::create(data, ij_data)))
		}
	};

	renderer.queue_element(Rc::clone(&element) as Rc<dyn QueuedElement>);
	let root = element.state.borrow_mut().render(renderer, data, ij_data)?;
	if let (Some(root), Some(target)) = (root, renderer.target()) {
		attach(target, &element, root);
	}
	Ok(Some(element))
}

/// Scans `pointer` and its following siblings.
///
/// The key current at the call site can't be compared directly since any number of template calls may have happened in between,
/// so the instance's creation key is matched by prefix instead.
fn find_element<E: SoyElement>(target: &dyn RenderTarget, mut pointer: Option<NodeId>, soy_element_key: &str) -> Option<Rc<Materialized<E>>> {
	while let Some(node) = pointer {
		if let Some(slot) = target.node_data(node).and_then(|node_data| node_data.element.as_ref()) {
			if slot.kind != E::KIND {
				trace!(?node, kind = slot.kind.name(), "Sibling holds an element of another kind.");
			} else if is_matching_key_str(soy_element_key, &slot.key) {
				match Rc::clone(&slot.instance).downcast::<Materialized<E>>() {
					Ok(element) => return Some(element),
					Err(_) => warn!("Element kind {:?} is registered by more than one type. Ignoring the attached instance.", E::KIND.name()),
				}
			}
		}
		pointer = target.next_sibling(node);
	}
	None
}

fn attach<E: SoyElement>(target: &mut dyn RenderTarget, element: &Rc<Materialized<E>>, root: NodeId) {
	let instance = Rc::as_ptr(element).cast::<()>();

	if let Some(previous) = element.node.get().filter(|&previous| previous != root) {
		if let Some(node_data) = target.node_data_mut(previous) {
			if node_data.element.as_ref().map_or(false, |slot| slot.holds(instance)) {
				node_data.element = None;
			}
		}
	}

	match target.node_data_mut(root) {
		Some(node_data) => {
			if !node_data.element.as_ref().map_or(false, |slot| slot.holds(instance)) {
				trace!(?root, "Attaching element.");
				node_data.element = Some(ElementSlot {
					kind: E::KIND,
					key: element.key.clone(),
					instance: Rc::clone(element) as Rc<dyn Any>,
				});
			}
			element.node.set(Some(root));
		}
		None => warn!(?root, "Can't attach element; the target keeps no data for its root."),
	}
}
