use crate::key::{serialize_key, KeyFragment};

/// Stack (holder) of key stacks for the template currently being rendered.
///
/// - A new key is prepended to the topmost key stack before a template call and the previous value is restored after it.
/// - A new stack is pushed before a manually keyed element is opened and popped before that element is closed,
///   since manual keys reset the key context.
///
/// Each key stack is a single string of [serialized](`serialize_key`) fragments, innermost first.
/// There is always an implicit root scope below any manual scopes, so template calls outside of manually keyed elements still accumulate.
#[derive(Debug, Clone, Default)]
pub struct KeyStack {
	root: String,
	manual_scopes: Vec<String>,
}

impl KeyStack {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	fn top_mut(&mut self) -> &mut String {
		self.manual_scopes.last_mut().unwrap_or(&mut self.root)
	}

	/// Called before opening a manually keyed element.
	pub fn push_manual_scope(&mut self, fragment: KeyFragment<'_>) {
		self.manual_scopes.push(serialize_key(fragment));
	}

	/// Called before closing a manually keyed element.
	///
	/// Popping without a matching push leaves the root scope untouched.
	pub fn pop_manual_scope(&mut self) {
		self.manual_scopes.pop();
	}

	/// Called before a template call. Returns the previous value of the top scope, which must be handed to [`pop_call_scope`](`KeyStack::pop_call_scope`) afterwards.
	#[must_use = "the previous key must be restored with `pop_call_scope`"]
	pub fn push_call_scope(&mut self, fragment: KeyFragment<'_>) -> String {
		let new_key = self.new_key(fragment);
		std::mem::replace(self.top_mut(), new_key)
	}

	/// Called after a template call.
	pub fn pop_call_scope(&mut self, previous: String) {
		*self.top_mut() = previous;
	}

	/// The composite key an element opened with `fragment` would get, without modifying the stack.
	#[must_use]
	pub fn new_key(&self, fragment: KeyFragment<'_>) -> String {
		serialize_key(fragment) + self.current_key()
	}

	/// The current chain of keys, or an empty string if nothing was pushed.
	#[must_use]
	pub fn current_key(&self) -> &str {
		self.manual_scopes.last().unwrap_or(&self.root)
	}

	/// Number of manual scopes above the root.
	#[must_use]
	pub fn depth(&self) -> usize {
		self.manual_scopes.len()
	}
}
