use super::{Renderer, RendererKind, SkipToken};
use crate::{
	element::QueuedElement,
	key::KeyFragment,
	key_stack::KeyStack,
	target::{NodeId, RenderTarget},
	velog::{LoggingHooks, SharedLogger, VisualElementData},
	Error,
};
use serde_json::Value;
use std::rc::Rc;
use tracing::trace;

/// Renderer that mutes all tree operations, for `{velog logonly="true"}` spans.
///
/// Logging still happens. The logger is taken over from the wrapped renderer and handed back by [`Renderer::to_default_renderer`].
pub struct NullRenderer<'a> {
	renderer: &'a mut (dyn Renderer + 'a),
	key_stack: KeyStack,
	hooks: LoggingHooks,
}

impl<'a> NullRenderer<'a> {
	pub fn new(renderer: &'a mut (dyn Renderer + 'a)) -> Self {
		let hooks = LoggingHooks::new(renderer.logger());
		Self {
			renderer,
			key_stack: KeyStack::new(),
			hooks,
		}
	}
}

impl Renderer for NullRenderer<'_> {
	fn kind(&self) -> RendererKind {
		RendererKind::Null
	}

	fn open(&mut self, _name: &str, _key: &str) -> Option<NodeId> {
		None
	}

	fn open_ssr(&mut self, _name: &str, _key: &str, _data: Option<&Value>) -> Result<bool, Error> {
		Ok(true)
	}

	fn maybe_skip(&mut self, token: SkipToken) -> bool {
		token == SkipToken::Skip
	}

	fn push_manual_key(&mut self, key: KeyFragment<'_>) {
		self.key_stack.push_manual_scope(key);
	}

	fn pop_manual_key(&mut self) {
		self.key_stack.pop_manual_scope();
	}

	fn push_key(&mut self, key: KeyFragment<'_>) -> String {
		self.key_stack.push_call_scope(key)
	}

	fn get_new_key(&self, key: KeyFragment<'_>) -> String {
		self.key_stack.new_key(key)
	}

	fn pop_key(&mut self, old_key: String) {
		self.key_stack.pop_call_scope(old_key);
	}

	fn current_key_stack(&self) -> &str {
		self.key_stack.current_key()
	}

	fn close(&mut self) -> Option<NodeId> {
		None
	}

	fn text(&mut self, _value: &str) -> Option<NodeId> {
		None
	}

	fn attr(&mut self, _name: &str, _value: &str) {}

	fn current_pointer(&self) -> Option<NodeId> {
		None
	}

	fn skip(&mut self) {}

	fn current_element(&self) -> Option<NodeId> {
		None
	}

	fn skip_node(&mut self) {}

	fn apply_attrs(&mut self) {}

	fn apply_statics(&mut self, _statics: &[(&str, &str)]) {}

	fn enter(&mut self, ve_data: &VisualElementData, log_only: bool) {
		self.hooks.enter(ve_data, log_only);
	}

	fn exit(&mut self) {
		self.hooks.exit();
	}

	fn to_null_renderer(&mut self) -> Result<Box<dyn Renderer + '_>, Error> {
		Err(Error::MutedToMuted)
	}

	/// Returns to the wrapped renderer, which will traverse the tree again.
	fn to_default_renderer(&mut self) -> Result<(), Error> {
		trace!("Unmuting renderer.");
		self.renderer.set_logger(self.hooks.logger());
		Ok(())
	}

	fn set_logger(&mut self, logger: Option<SharedLogger>) {
		self.hooks.set_logger(logger);
	}

	fn logger(&self) -> Option<SharedLogger> {
		self.hooks.logger()
	}

	fn verify_log_only(&self, log_only: bool) -> Result<bool, Error> {
		self.hooks.verify_log_only(log_only)
	}

	fn eval_logging_function(&mut self, name: &str, args: &[Value], placeholder: &str) -> String {
		self.hooks.eval_logging_function(name, args, placeholder)
	}

	fn target(&mut self) -> Option<&mut dyn RenderTarget> {
		None
	}

	fn queue_element(&mut self, element: Rc<dyn QueuedElement>) {
		self.renderer.queue_element(element);
	}
}
