//! Visual element logging, as used by `{velog}` statements.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{cell::RefCell, rc::Rc};

/// A logger shared between a renderer and any muted renderer derived from it.
pub type SharedLogger = Rc<RefCell<dyn Logger>>;

/// Receives visual element spans during rendering.
pub trait Logger {
	fn enter(&mut self, metadata: ElementMetadata);
	fn exit(&mut self);
	fn eval_logging_function(&mut self, name: &str, args: &[Value]) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualElement {
	id: i64,
	name: String,
}

impl VisualElement {
	#[must_use]
	pub fn new(id: i64, name: impl Into<String>) -> Self {
		Self { id, name: name.into() }
	}

	#[must_use]
	pub fn id(&self) -> i64 {
		self.id
	}

	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}
}

/// A visual element together with its optional payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualElementData {
	ve: VisualElement,
	data: Option<Value>,
}

impl VisualElementData {
	#[must_use]
	pub fn new(ve: VisualElement, data: Option<Value>) -> Self {
		Self { ve, data }
	}

	#[must_use]
	pub fn ve(&self) -> &VisualElement {
		&self.ve
	}

	#[must_use]
	pub fn data(&self) -> Option<&Value> {
		self.data.as_ref()
	}
}

/// What a [`Logger`] is told when a span is entered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementMetadata {
	pub id: i64,
	pub data: Option<Value>,
	pub log_only: bool,
}

impl ElementMetadata {
	#[must_use]
	pub fn new(ve_data: &VisualElementData, log_only: bool) -> Self {
		Self {
			id: ve_data.ve().id(),
			data: ve_data.data().cloned(),
			log_only,
		}
	}
}

/// Logging hooks shared by the default and null renderers.
///
/// The null renderer keeps logging while its tree operations are muted, so both embed one of these.
#[derive(Clone, Default)]
pub(crate) struct LoggingHooks {
	logger: Option<SharedLogger>,
}

impl LoggingHooks {
	pub(crate) fn new(logger: Option<SharedLogger>) -> Self {
		Self { logger }
	}

	pub(crate) fn logger(&self) -> Option<SharedLogger> {
		self.logger.clone()
	}

	pub(crate) fn set_logger(&mut self, logger: Option<SharedLogger>) {
		self.logger = logger;
	}

	pub(crate) fn enter(&self, ve_data: &VisualElementData, log_only: bool) {
		if let Some(logger) = &self.logger {
			tracing::trace!(ve = ve_data.ve().id(), log_only, "Entering visual element.");
			logger.borrow_mut().enter(ElementMetadata::new(ve_data, log_only));
		}
	}

	pub(crate) fn exit(&self) {
		if let Some(logger) = &self.logger {
			tracing::trace!("Exiting visual element.");
			logger.borrow_mut().exit();
		}
	}

	/// `logonly` can only be requested when a logger is configured. Otherwise this is a passthrough.
	pub(crate) fn verify_log_only(&self, log_only: bool) -> Result<bool, crate::Error> {
		if log_only && self.logger.is_none() {
			return Err(crate::Error::LogOnlyWithoutLogger);
		}
		Ok(log_only)
	}

	pub(crate) fn eval_logging_function(&self, name: &str, args: &[Value], placeholder: &str) -> String {
		match &self.logger {
			Some(logger) => logger.borrow_mut().eval_logging_function(name, args),
			None => placeholder.to_owned(),
		}
	}
}
