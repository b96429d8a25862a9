use crate::key::KeyDecodeError;
use thiserror::Error;

/// Failures that abort the current render pass.
///
/// Apart from [`Error::Serialize`] and [`Error::KeyDecode`], every variant is a contract violation by the calling template code.
/// None of them are retried and the render target is not rolled back.
#[derive(Debug, Error)]
pub enum Error {
	#[error("Cannot transition a default renderer to a default renderer")]
	DefaultToDefault,

	#[error("Cannot transition a muted renderer to a muted renderer")]
	MutedToMuted,

	#[error("Cannot set logonly=\"true\" unless there is a logger configured")]
	LogOnlyWithoutLogger,

	#[error("Cannot evaluate VE functions in conditions.")]
	LoggingInCondition,

	#[error(
		"\nTried to rerender a {{skip}} template with different parameters!\n\
		Make sure that you never pass a parameter that can change to a template that has\n\
		{{skip}}, since changes to that parameter won't affect the skipped content.\n\n\
		Old parameters: {old}\n\
		New parameters: {new}\n\n\
		Element:\n{element}"
	)]
	SkipParametersChanged { old: String, new: String, element: String },

	#[error("Failed to serialize template parameters: {0}")]
	Serialize(#[from] serde_json::Error),

	/// Not raised by the renderers themselves.
	/// Lets template code propagate [`decode_key`](crate::key::decode_key) results with `?`.
	#[error(transparent)]
	KeyDecode(#[from] KeyDecodeError),
}
