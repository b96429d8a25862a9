//! Printing and calling values whose content kind is only known at runtime.
//!
//! Instead of probing callables for metadata, a template reference carries its [`ContentKind`] as the variant of a [`TemplateRef`].
//! Helpers that need to coerce markup to a string take the calling renderer explicitly and render into a fresh [`HtmlSerializer`].

use crate::{
	html::HtmlSerializer,
	key::format_number,
	renderer::{patch_inner, FalsinessRenderer, Renderer},
	Error, IjData,
};
use regex::Regex;
use std::{borrow::Cow, sync::OnceLock};
use tracing::trace;

/// A compiled incremental DOM template.
pub type IdomTemplate<P> = dyn Fn(&mut dyn Renderer, &P, &IjData) -> Result<(), Error>;
/// A compiled template that produces a string, like a `kind="text"` template.
pub type TextTemplate<P> = dyn Fn(&P, &IjData) -> String;
/// A parameterless render callback, like a `{let}` block or an HTML-typed parameter.
pub type Callback<'a> = &'a dyn Fn(&mut dyn Renderer) -> Result<(), Error>;
/// An external escaping or filtering directive.
pub type Filter<'a> = &'a dyn Fn(&str) -> String;

/// Placeholder attribute name filters substitute for rejected names.
pub const FILTERED_ATTRIBUTE_NAME: &str = "zSoyz";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
	Html,
	Attributes,
	Text,
}

/// A template reference together with its content kind.
pub enum TemplateRef<'a, P> {
	Html(&'a IdomTemplate<P>),
	Attributes(&'a IdomTemplate<P>),
	Text(&'a TextTemplate<P>),
}

impl<P> Clone for TemplateRef<'_, P> {
	fn clone(&self) -> Self {
		*self
	}
}
impl<P> Copy for TemplateRef<'_, P> {}

impl<P> TemplateRef<'_, P> {
	#[must_use]
	pub fn kind(&self) -> ContentKind {
		match self {
			TemplateRef::Html(_) => ContentKind::Html,
			TemplateRef::Attributes(_) => ContentKind::Attributes,
			TemplateRef::Text(_) => ContentKind::Text,
		}
	}
}

/// A render callback stamped with the kind of content it produces.
#[derive(Clone, Copy)]
pub struct IdomFunction<'a> {
	kind: ContentKind,
	render: Callback<'a>,
}

impl<'a> IdomFunction<'a> {
	#[must_use]
	pub fn make_html(render: Callback<'a>) -> Self {
		Self { kind: ContentKind::Html, render }
	}

	#[must_use]
	pub fn make_attributes(render: Callback<'a>) -> Self {
		Self { kind: ContentKind::Attributes, render }
	}

	#[must_use]
	pub fn kind(&self) -> ContentKind {
		self.kind
	}

	pub fn call(&self, renderer: &mut dyn Renderer) -> Result<(), Error> {
		(self.render)(renderer)
	}

	/// Markup for HTML, sorted `name=value` pairs for attributes.
	pub fn render_to_string(&self, context: &dyn Renderer) -> Result<String, Error> {
		match self.kind {
			ContentKind::Attributes => attributes_to_string(context, self.render),
			ContentKind::Html | ContentKind::Text => html_to_string(context, self.render),
		}
	}

	/// Whether calling this would render anything.
	pub fn to_boolean(&self) -> Result<bool, Error> {
		FalsinessRenderer::probe(self.render)
	}
}

/// A value printed by a `{print}` command or tested by a condition.
#[derive(Clone, Copy)]
pub enum Printable<'a> {
	Null,
	Bool(bool),
	Number(f64),
	Str(&'a str),
	SanitizedHtml(&'a str),
	Html(Callback<'a>),
}

/// Attributes printed where the kind isn't statically known to be "attributes".
#[derive(Clone, Copy)]
pub enum DynamicAttributes<'a> {
	Callback(IdomFunction<'a>),
	/// Attribute markup that was sanitized already.
	Sanitized(&'a str),
	/// Attribute markup whose names still have to pass the name filter.
	Unsanitized(&'a str),
}

/// Renders `render` into a detached container and returns the resulting markup.
///
/// The context renderer's logger is inherited.
pub fn html_to_string(context: &dyn Renderer, render: impl FnOnce(&mut dyn Renderer) -> Result<(), Error>) -> Result<String, Error> {
	trace!("Coercing markup to a string.");
	let mut serializer = HtmlSerializer::new();
	let root = serializer.root();
	patch_inner(&mut serializer, root, context.logger(), render)?;
	Ok(serializer.inner_html(root))
}

/// Renders `render` onto a scratch element and returns its attributes as `name=value` pairs, sorted and separated by spaces.
pub fn attributes_to_string(context: &dyn Renderer, render: impl FnOnce(&mut dyn Renderer) -> Result<(), Error>) -> Result<String, Error> {
	trace!("Coercing attributes to a string.");
	let mut serializer = HtmlSerializer::new();
	let root = serializer.root();
	patch_inner(&mut serializer, root, context.logger(), |renderer| {
		renderer.open("div", "");
		render(renderer)?;
		renderer.apply_attrs();
		renderer.close();
		Ok(())
	})?;

	let mut pairs: Vec<String> = match serializer.first_child(root) {
		Some(div) => serializer.attributes(div).iter().map(|(name, value)| format!("{}={}", name, value)).collect(),
		None => Vec::new(),
	};
	// Attribute order must not depend on the target.
	pairs.sort();
	Ok(pairs.join(" "))
}

/// Calls an expression in case of a function or outputs it as text content.
pub fn render_dynamic_content(renderer: &mut dyn Renderer, expr: Printable<'_>) -> Result<(), Error> {
	match expr {
		Printable::Html(render) => render(renderer),
		Printable::SanitizedHtml(content) | Printable::Str(content) => {
			renderer.text(content);
			Ok(())
		}
		Printable::Null => {
			renderer.text("null");
			Ok(())
		}
		Printable::Bool(b) => {
			renderer.text(if b { "true" } else { "false" });
			Ok(())
		}
		Printable::Number(n) => {
			renderer.text(&format_number(n));
			Ok(())
		}
	}
}

/// Prints an expression depending on its type.
///
/// Sanitized HTML that contains markup is placed into an `html-blob` element that is skipped by reconciliation.
/// Its content is only rewritten when it changed.
pub fn print(renderer: &mut dyn Renderer, expr: Printable<'_>) -> Result<(), Error> {
	let content = match expr {
		Printable::SanitizedHtml(content) => content,
		expr => return render_dynamic_content(renderer, expr),
	};

	// Without `<` or `&`, it's definitely not HTML.
	if !content.contains('<') && !content.contains('&') {
		renderer.text(content);
		return Ok(());
	}

	let blob = renderer.open("html-blob", "");
	if let (Some(blob), Some(target)) = (blob, renderer.target()) {
		let unchanged = target.node_data(blob).map_or(false, |node_data| node_data.inner_html.as_deref() == Some(content));
		if !unchanged {
			trace!(?blob, len = content.len(), "Writing HTML blob.");
			target.set_inner_html(blob, content);
			if let Some(node_data) = target.node_data_mut(blob) {
				node_data.inner_html = Some(content.to_owned());
			}
		}
	}
	renderer.skip();
	renderer.close();
	Ok(())
}

/// Writes an HTML comment so that it survives reconciliation.
///
/// A comment right after the current element is rewritten in place, otherwise a new one is appended to the current element.
/// The node at the pointer is then skipped. Does nothing while no element is open.
pub fn visit_html_comment_node(renderer: &mut dyn Renderer, value: &str) {
	let Some(current) = renderer.current_element() else {
		return;
	};

	if let Some(target) = renderer.target() {
		match target.next_sibling(current).filter(|&sibling| target.is_comment(sibling)) {
			Some(comment) => {
				trace!(?comment, "Rewriting comment.");
				target.set_comment(comment, value);
			}
			None => {
				trace!(parent = ?current, "Appending comment.");
				target.append_comment(current, value);
			}
		}
	}
	renderer.skip_node();
}

/// Calls a template in an HTML context, coercing attributes and text as needed.
pub fn call_dynamic_html<P>(renderer: &mut dyn Renderer, expr: TemplateRef<'_, P>, data: &P, ij_data: &IjData) -> Result<(), Error> {
	match expr {
		TemplateRef::Html(template) => template(renderer, data, ij_data),
		TemplateRef::Attributes(template) => {
			let value = attributes_to_string(renderer, |renderer| template(renderer, data, ij_data))?;
			renderer.text(&value);
			Ok(())
		}
		TemplateRef::Text(template) => {
			renderer.text(&template(data, ij_data));
			Ok(())
		}
	}
}

/// Calls a template in an attribute context.
///
/// HTML output is coerced to a string, passed through `filter` and then split into attributes.
pub fn call_dynamic_attributes<P>(renderer: &mut dyn Renderer, expr: TemplateRef<'_, P>, data: &P, ij_data: &IjData, filter: Filter<'_>) -> Result<(), Error> {
	match expr {
		TemplateRef::Attributes(template) => template(renderer, data, ij_data),
		TemplateRef::Html(template) => {
			// This effectively negates the value of splitting a string,
			// but attribute printing and attribute names are treated alike for now.
			let value = filter(&html_to_string(renderer, |renderer| template(renderer, data, ij_data))?);
			print_dynamic_attr(renderer, DynamicAttributes::Unsanitized(&value), filter)
		}
		TemplateRef::Text(template) => {
			let value = template(data, ij_data);
			print_dynamic_attr(renderer, DynamicAttributes::Sanitized(&value), filter)
		}
	}
}

/// Calls a template and coerces its output to a string, for concatenation.
///
/// `escaper` applies to coerced markup only, since text templates escape their own output.
pub fn call_dynamic_text<P>(context: &dyn Renderer, expr: TemplateRef<'_, P>, data: &P, ij_data: &IjData, escaper: Option<Filter<'_>>) -> Result<String, Error> {
	let transform = |value: String| match escaper {
		Some(escaper) => escaper(&value),
		None => value,
	};
	Ok(match expr {
		TemplateRef::Html(template) => transform(html_to_string(context, |renderer| template(renderer, data, ij_data))?),
		TemplateRef::Attributes(template) => transform(attributes_to_string(context, |renderer| template(renderer, data, ij_data))?),
		TemplateRef::Text(template) => template(data, ij_data),
	})
}

/// Calls a template in a CSS or JS context and prints the escaped result as text.
pub fn call_dynamic_escaped<P>(renderer: &mut dyn Renderer, expr: TemplateRef<'_, P>, data: &P, ij_data: &IjData, escaper: Filter<'_>) -> Result<(), Error> {
	let value = call_dynamic_text(renderer, expr, data, ij_data, Some(escaper))?;
	renderer.text(&value);
	Ok(())
}

/// Prints an expression whose type is not statically known to be of kind "attributes".
///
/// Attribute callbacks are called directly, strings are parsed into name-value pairs.
/// Names of unsanitized markup pass `filter_name`. A name filtered to [`FILTERED_ATTRIBUTE_NAME`] is printed without its value.
pub fn print_dynamic_attr(renderer: &mut dyn Renderer, expr: DynamicAttributes<'_>, filter_name: Filter<'_>) -> Result<(), Error> {
	let (markup, sanitized) = match expr {
		DynamicAttributes::Callback(callback) if callback.kind() == ContentKind::Attributes => return callback.call(renderer),
		DynamicAttributes::Callback(callback) => {
			let markup = callback.render_to_string(renderer)?;
			return print_dynamic_attr(renderer, DynamicAttributes::Unsanitized(&markup), filter_name);
		}
		DynamicAttributes::Sanitized(markup) => (markup, true),
		DynamicAttributes::Unsanitized(markup) => (markup, false),
	};

	for (name, value) in split_attributes(markup) {
		let name = if sanitized { name } else { filter_name(&name) };
		if name == FILTERED_ATTRIBUTE_NAME {
			renderer.attr(&name, "");
		} else {
			renderer.attr(&name, &value);
		}
	}
	Ok(())
}

/// Matches an HTML attribute name-value pair, following the attribute states of the HTML parsing algorithm.
///
/// The name is in group 1. The value, if present, is in one of groups 2 to 4 depending on how it's quoted.
fn html_attribute_regex() -> &'static Regex {
	static REGEX: OnceLock<Regex> = OnceLock::new();
	REGEX.get_or_init(|| {
		Regex::new(r#"([^\t\n\f\r />=]+)[\t\n\f\r ]*(?:=[\t\n\f\r ]*(?:"([^"]*)"?|'([^']*)'?|([^\t\n\f\r >]*)))?"#).expect("valid attribute pattern")
	})
}

/// Splits attribute markup like `a="1" b c='2'` into unescaped name-value pairs.
#[must_use]
pub fn split_attributes(attributes: &str) -> Vec<(String, String)> {
	html_attribute_regex()
		.captures_iter(attributes)
		.map(|captures| {
			let value = captures.get(2).or_else(|| captures.get(3)).or_else(|| captures.get(4)).map_or("", |m| m.as_str());
			(captures[1].to_owned(), unescape_entities(value).into_owned())
		})
		.collect()
}

/// Decodes character references commonly produced by attribute escaping.
#[must_use]
pub fn unescape_entities(text: &str) -> Cow<'_, str> {
	if !text.contains('&') {
		return Cow::Borrowed(text);
	}

	let mut unescaped = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(start) = rest.find('&') {
		unescaped.push_str(&rest[..start]);
		rest = &rest[start..];
		let decoded = rest.find(';').and_then(|end| decode_entity(&rest[1..end]).map(|c| (c, end)));
		match decoded {
			Some((c, end)) => {
				unescaped.push(c);
				rest = &rest[end + 1..];
			}
			None => {
				unescaped.push('&');
				rest = &rest[1..];
			}
		}
	}
	unescaped.push_str(rest);
	Cow::Owned(unescaped)
}

fn decode_entity(entity: &str) -> Option<char> {
	match entity {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some('\u{a0}'),
		_ => {
			let number = entity.strip_prefix('#')?;
			let code = match number.strip_prefix('x').or_else(|| number.strip_prefix('X')) {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => number.parse().ok()?,
			};
			char::from_u32(code)
		}
	}
}

/// Truthiness of a printable value. Callbacks are truthy iff they would render anything.
pub fn is_truthy(expr: Printable<'_>) -> Result<bool, Error> {
	Ok(match expr {
		Printable::Null => false,
		Printable::Bool(b) => b,
		Printable::Number(n) => n != 0.0 && !n.is_nan(),
		Printable::Str(s) | Printable::SanitizedHtml(s) => !s.is_empty(),
		Printable::Html(render) => FalsinessRenderer::probe(render)?,
	})
}
