use super::{Renderer, RendererKind, SkipToken};
use crate::{
	element::QueuedElement,
	key::KeyFragment,
	target::{NodeId, RenderTarget},
	velog::{SharedLogger, VisualElementData},
	Error,
};
use serde_json::Value;
use std::{cell::Cell, rc::Rc};

/// A renderer that keeps track of whether it was ever called to render anything, but never actually does anything.
///
/// This is used to check whether an HTML value is empty, for example when it's used in an `{if}` or the conditional operator.
/// Any tree operation counts, regardless of content: `text("")` renders.
///
/// Clones (including the result of [`Renderer::to_null_renderer`]) share the flag.
#[derive(Debug, Clone, Default)]
pub struct FalsinessRenderer {
	rendered: Rc<Cell<bool>>,
}

impl FalsinessRenderer {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Checks whether any tree operation was requested.
	#[must_use]
	pub fn did_render(&self) -> bool {
		self.rendered.get()
	}

	/// Runs `render` against a fresh probe and reports whether it would have rendered anything.
	pub fn probe(render: impl FnOnce(&mut dyn Renderer) -> Result<(), Error>) -> Result<bool, Error> {
		let mut probe = Self::new();
		render(&mut probe)?;
		Ok(probe.did_render())
	}

	fn record(&self) {
		self.rendered.set(true);
	}
}

impl Renderer for FalsinessRenderer {
	fn kind(&self) -> RendererKind {
		RendererKind::Falsiness
	}

	fn open(&mut self, _name: &str, _key: &str) -> Option<NodeId> {
		self.record();
		None
	}

	fn open_ssr(&mut self, _name: &str, _key: &str, _data: Option<&Value>) -> Result<bool, Error> {
		self.record();
		// Always skip, since it's known already that something rendered.
		Ok(false)
	}

	fn maybe_skip(&mut self, _token: SkipToken) -> bool {
		self.record();
		true
	}

	fn push_manual_key(&mut self, _key: KeyFragment<'_>) {}

	fn pop_manual_key(&mut self) {}

	fn push_key(&mut self, _key: KeyFragment<'_>) -> String {
		String::new()
	}

	fn get_new_key(&self, _key: KeyFragment<'_>) -> String {
		String::new()
	}

	fn pop_key(&mut self, _old_key: String) {}

	fn current_key_stack(&self) -> &str {
		""
	}

	fn close(&mut self) -> Option<NodeId> {
		self.record();
		None
	}

	fn text(&mut self, _value: &str) -> Option<NodeId> {
		self.record();
		None
	}

	fn attr(&mut self, _name: &str, _value: &str) {
		self.record();
	}

	fn current_pointer(&self) -> Option<NodeId> {
		None
	}

	fn skip(&mut self) {
		self.record();
	}

	fn current_element(&self) -> Option<NodeId> {
		None
	}

	fn skip_node(&mut self) {
		self.record();
	}

	fn apply_attrs(&mut self) {
		self.record();
	}

	fn apply_statics(&mut self, _statics: &[(&str, &str)]) {
		self.record();
	}

	fn enter(&mut self, _ve_data: &VisualElementData, _log_only: bool) {}

	fn exit(&mut self) {}

	fn to_null_renderer(&mut self) -> Result<Box<dyn Renderer + '_>, Error> {
		Ok(Box::new(self.clone()))
	}

	fn to_default_renderer(&mut self) -> Result<(), Error> {
		Ok(())
	}

	fn set_logger(&mut self, _logger: Option<SharedLogger>) {}

	fn logger(&self) -> Option<SharedLogger> {
		None
	}

	fn verify_log_only(&self, _log_only: bool) -> Result<bool, Error> {
		Err(Error::LoggingInCondition)
	}

	fn eval_logging_function(&mut self, _name: &str, _args: &[Value], placeholder: &str) -> String {
		placeholder.to_owned()
	}

	fn target(&mut self) -> Option<&mut dyn RenderTarget> {
		None
	}

	fn queue_element(&mut self, _element: Rc<dyn QueuedElement>) {}
}
