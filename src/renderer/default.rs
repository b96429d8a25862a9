use super::{AttributeHandler, NullRenderer, Renderer, RendererKind, SkipToken};
use crate::{
	element::QueuedElement,
	key::KeyFragment,
	key_stack::KeyStack,
	target::{NodeId, PatchConfig, PatchMode, Property, RenderTarget},
	velog::{LoggingHooks, SharedLogger, VisualElementData},
	Error,
};
use hashbrown::HashSet;
use serde_json::Value;
use std::rc::Rc;
use tracing::{error, instrument, trace, trace_span, warn};

/// Attribute that carries the server key of `{skip}` roots in debug builds.
pub const SERVER_KEY_ATTRIBUTE: &str = "soy-server-key";

/// Renderer that delegates to a [`RenderTarget`], keying every element with the current key stack.
///
/// One instance drives exactly one pass. Use [`patch_inner`] or [`patch_outer`] unless the target's patch lifecycle is managed elsewhere.
pub struct IncrementalDomRenderer<'t> {
	target: &'t mut dyn RenderTarget,
	key_stack: KeyStack,
	hooks: LoggingHooks,
	queue: ElementQueue,
}

impl<'t> IncrementalDomRenderer<'t> {
	#[must_use]
	pub fn new(target: &'t mut dyn RenderTarget) -> Self {
		Self {
			target,
			key_stack: KeyStack::new(),
			hooks: LoggingHooks::default(),
			queue: ElementQueue::default(),
		}
	}

	/// Runs the lifecycle hook of every element queued so far, once each.
	pub fn flush_queue(&mut self) {
		self.queue.flush();
	}

	/// Number of distinct elements queued during this pass.
	#[must_use]
	pub fn queued_len(&self) -> usize {
		self.queue.elements.len()
	}

	fn verify_skip_parameters(&mut self, node: NodeId, data: &Value) -> Result<(), Error> {
		let stringified = serde_json::to_string_pretty(data)?;
		let old = match self.target.node_data_mut(node) {
			None => {
				warn!("Can't record skip parameters on {:?}; the target keeps no data for it.", node);
				return Ok(());
			}
			Some(node_data) => match &node_data.last_params {
				None => {
					trace!(len = stringified.len(), "Recording skip parameters.");
					node_data.last_params = Some(stringified);
					return Ok(());
				}
				Some(last_params) if *last_params == stringified => return Ok(()),
				Some(last_params) => last_params.clone(),
			},
		};

		if cfg!(feature = "dangerous-logging") {
			error!("Skip parameters changed from {} to {}", old, stringified);
		} else {
			error!("Skip parameters changed on {:?}.", node);
		}
		Err(Error::SkipParametersChanged {
			old,
			new: stringified,
			element: self.target.describe(node),
		})
	}
}

impl Renderer for IncrementalDomRenderer<'_> {
	fn kind(&self) -> RendererKind {
		RendererKind::Default
	}

	fn open(&mut self, name: &str, key: &str) -> Option<NodeId> {
		let key = self.key_stack.new_key(key.into());
		trace!(name, key = key.as_str(), "open");
		self.target.open(name, &key)
	}

	fn open_ssr(&mut self, name: &str, key: &str, data: Option<&Value>) -> Result<bool, Error> {
		let span = trace_span!("open_ssr", name, key);
		let _enter = span.enter();

		let node = self.target.open(name, key);
		if cfg!(any(debug_assertions, feature = "debug-server-keys")) {
			self.attr(SERVER_KEY_ATTRIBUTE, key);
		}

		// Keep going since either elements are being created or continuing will be a no-op.
		let node = match node {
			Some(node) if self.target.has_child_nodes(node) => node,
			_ => {
				trace!("Nothing to skip past.");
				return Ok(true);
			}
		};

		// Only `{skip}` elements that are template roots pass data.
		if let Some(data) = data.filter(|data| is_supplied(data)) {
			self.verify_skip_parameters(node, data)?;
		}

		// Caveat: An element with only attributes is skipped regardless.
		trace!("Skipping server-rendered subtree.");
		self.skip();
		self.close();
		Ok(false)
	}

	fn maybe_skip(&mut self, token: SkipToken) -> bool {
		match token {
			SkipToken::Skip => {
				self.skip();
				self.close();
				true
			}
			SkipToken::Proceed => false,
		}
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
		trace!("close");
		self.target.close()
	}

	fn text(&mut self, value: &str) -> Option<NodeId> {
		if cfg!(feature = "dangerous-logging") {
			trace!(value, "text");
		} else {
			trace!(len = value.len(), "text");
		}
		self.target.text(value)
	}

	fn attr(&mut self, name: &str, value: &str) {
		self.target.attr(name, value);
		match AttributeHandler::for_name(name) {
			// `checked=""` is checked, `checked="false"` isn't.
			Some(AttributeHandler::Checked) => self.target.set_property(name, Property::Bool(value != "false")),
			Some(AttributeHandler::Value) => self.target.set_property(name, Property::Text(value)),
			None => (),
		}
	}

	fn current_pointer(&self) -> Option<NodeId> {
		self.target.current_pointer()
	}

	fn skip(&mut self) {
		self.target.skip();
	}

	fn current_element(&self) -> Option<NodeId> {
		self.target.current_element()
	}

	fn skip_node(&mut self) {
		self.target.skip_node();
	}

	fn apply_attrs(&mut self) {
		self.target.apply_attrs();
	}

	fn apply_statics(&mut self, statics: &[(&str, &str)]) {
		self.target.apply_statics(statics);
	}

	fn enter(&mut self, ve_data: &VisualElementData, log_only: bool) {
		self.hooks.enter(ve_data, log_only);
	}

	fn exit(&mut self) {
		self.hooks.exit();
	}

	fn to_null_renderer(&mut self) -> Result<Box<dyn Renderer + '_>, Error> {
		trace!("Muting renderer.");
		Ok(Box::new(NullRenderer::new(self)))
	}

	fn to_default_renderer(&mut self) -> Result<(), Error> {
		Err(Error::DefaultToDefault)
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
		let target: &mut dyn RenderTarget = &mut *self.target;
		Some(target)
	}

	fn queue_element(&mut self, element: Rc<dyn QueuedElement>) {
		self.queue.push(element);
	}
}

/// Elements rendered during the current pass, each at most once.
#[derive(Default)]
struct ElementQueue {
	seen: HashSet<*const ()>,
	elements: Vec<Rc<dyn QueuedElement>>,
}

impl ElementQueue {
	fn push(&mut self, element: Rc<dyn QueuedElement>) {
		if self.seen.insert(Rc::as_ptr(&element).cast::<()>()) {
			self.elements.push(element);
		} else {
			trace!("Element already queued for this pass.");
		}
	}

	fn flush(&mut self) {
		let span = trace_span!("Flushing element queue", len = self.elements.len());
		let _enter = span.enter();
		self.seen.clear();
		for element in self.elements.drain(..) {
			element.sync_state();
		}
	}
}

/// Falsy payloads (`null`, `false`, zero, `NaN` and `""`) count as not supplied.
fn is_supplied(data: &Value) -> bool {
	match data {
		Value::Null | Value::Bool(false) => false,
		Value::Number(number) => number.as_f64().map_or(true, |number| number != 0.0 && !number.is_nan()),
		Value::String(string) => !string.is_empty(),
		Value::Bool(true) | Value::Array(_) | Value::Object(_) => true,
	}
}

/// Runs one render pass against `root`.
///
/// The target is told about the pass before `render` runs and after it returns, even if it fails.
/// Queued elements are only synchronized after a successful pass.
#[instrument(skip(target, config, logger, render))]
pub fn patch(
	target: &mut dyn RenderTarget,
	root: NodeId,
	mode: PatchMode,
	config: PatchConfig,
	logger: Option<SharedLogger>,
	render: impl FnOnce(&mut dyn Renderer) -> Result<(), Error>,
) -> Result<(), Error> {
	target.begin_patch(root, mode, config);
	let (result, mut queue) = {
		let mut renderer = IncrementalDomRenderer::new(&mut *target);
		renderer.set_logger(logger);
		let result = render(&mut renderer);
		(result, renderer.queue)
	};
	target.end_patch();

	match result {
		Ok(()) => {
			queue.flush();
			Ok(())
		}
		Err(error) => {
			warn!("Render pass aborted: {}", error);
			Err(error)
		}
	}
}

/// Renders the children of `root`.
pub fn patch_inner(
	target: &mut dyn RenderTarget,
	root: NodeId,
	logger: Option<SharedLogger>,
	render: impl FnOnce(&mut dyn Renderer) -> Result<(), Error>,
) -> Result<(), Error> {
	patch(target, root, PatchMode::Inner, PatchConfig::default(), logger, render)
}

/// Renders `root` itself.
pub fn patch_outer(
	target: &mut dyn RenderTarget,
	root: NodeId,
	logger: Option<SharedLogger>,
	render: impl FnOnce(&mut dyn Renderer) -> Result<(), Error>,
) -> Result<(), Error> {
	patch(target, root, PatchMode::Outer, PatchConfig::default(), logger, render)
}
