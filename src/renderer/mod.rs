//! Interchangeable rendering strategies driven by compiled templates.
//!
//! - [`IncrementalDomRenderer`] delegates to a [`RenderTarget`](`crate::target::RenderTarget`) and keys every element.
//! - [`NullRenderer`] mutes all tree operations but keeps logging, for `logonly` spans.
//! - [`FalsinessRenderer`] only records whether anything would have rendered, for truthiness checks.

use crate::{
	element::QueuedElement,
	key::KeyFragment,
	target::{NodeId, RenderTarget},
	velog::{SharedLogger, VisualElementData},
	Error,
};
use serde_json::Value;
use std::rc::Rc;

mod default;
mod falsiness;
mod null;

pub use default::{patch, patch_inner, patch_outer, IncrementalDomRenderer, SERVER_KEY_ATTRIBUTE};
pub use falsiness::FalsinessRenderer;
pub use null::NullRenderer;

/// Which strategy a [`Renderer`] implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererKind {
	Default,
	Null,
	Falsiness,
}

/// Returned by element templates that decided their content doesn't need to be rendered again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipToken {
	Skip,
	Proceed,
}

/// The calls compiled templates make.
///
/// Templates receive `&mut dyn Renderer` so that strategies can be swapped mid-walk.
pub trait Renderer {
	fn kind(&self) -> RendererKind;

	/// Opens an element keyed with `key` prepended to the current key stack.
	fn open(&mut self, name: &str, key: &str) -> Option<NodeId>;

	/// Opens an element with a key serialized during server-side rendering and decides whether its children must be rendered.
	///
	/// Returns `Ok(false)` if the subtree was skipped and closed already.
	fn open_ssr(&mut self, name: &str, key: &str, data: Option<&Value>) -> Result<bool, Error>;

	/// Performs the skip if `token` is [`SkipToken::Skip`]. Returns whether the caller must not render the element's content.
	fn maybe_skip(&mut self, token: SkipToken) -> bool;

	fn push_manual_key(&mut self, key: KeyFragment<'_>);
	fn pop_manual_key(&mut self);
	#[must_use = "the previous key must be restored with `pop_key`"]
	fn push_key(&mut self, key: KeyFragment<'_>) -> String;
	fn get_new_key(&self, key: KeyFragment<'_>) -> String;
	fn pop_key(&mut self, old_key: String);
	fn current_key_stack(&self) -> &str;

	fn close(&mut self) -> Option<NodeId>;
	fn text(&mut self, value: &str) -> Option<NodeId>;
	fn attr(&mut self, name: &str, value: &str);
	fn current_pointer(&self) -> Option<NodeId>;
	fn skip(&mut self);
	fn current_element(&self) -> Option<NodeId>;
	fn skip_node(&mut self);
	fn apply_attrs(&mut self);
	fn apply_statics(&mut self, statics: &[(&str, &str)]);

	fn enter(&mut self, ve_data: &VisualElementData, log_only: bool);
	fn exit(&mut self);

	/// Switches to a strategy that doesn't touch the render target. Call [`to_default_renderer`](`Renderer::to_default_renderer`) on the result when done.
	fn to_null_renderer(&mut self) -> Result<Box<dyn Renderer + '_>, Error>;
	/// Hands state back to the renderer this one was derived from.
	fn to_default_renderer(&mut self) -> Result<(), Error>;

	fn set_logger(&mut self, logger: Option<SharedLogger>);
	fn logger(&self) -> Option<SharedLogger>;
	fn verify_log_only(&self, log_only: bool) -> Result<bool, Error>;
	fn eval_logging_function(&mut self, name: &str, args: &[Value], placeholder: &str) -> String;

	/// Direct access to the render target, if this strategy has one.
	fn target(&mut self) -> Option<&mut dyn RenderTarget>;

	/// Queues a stateful element so that its lifecycle hook runs once after the current pass.
	fn queue_element(&mut self, element: Rc<dyn QueuedElement>);
}

/// Attributes that must also be applied as DOM properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AttributeHandler {
	Checked,
	Value,
}

impl AttributeHandler {
	pub(crate) fn for_name(name: &str) -> Option<Self> {
		match name {
			"checked" => Some(Self::Checked),
			"value" => Some(Self::Value),
			_ => None,
		}
	}
}
