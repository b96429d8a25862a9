use serde_json::{json, Value};
use soy_idom::{
	patch_inner,
	renderer::{FalsinessRenderer, Renderer, RendererKind, SkipToken},
	velog::{ElementMetadata, Logger, SharedLogger, VisualElement, VisualElementData},
	Error,
};
use std::{cell::RefCell, rc::Rc};

mod memory_dom_;
use memory_dom_::{init_logging, MemoryDom};

#[derive(Debug, Default)]
struct RecordingLogger {
	entered: Vec<ElementMetadata>,
	exits: usize,
}

impl Logger for RecordingLogger {
	fn enter(&mut self, metadata: ElementMetadata) {
		self.entered.push(metadata);
	}

	fn exit(&mut self) {
		self.exits += 1;
	}

	fn eval_logging_function(&mut self, name: &str, args: &[Value]) -> String {
		format!("{}({})", name, args.len())
	}
}

fn ve_data() -> VisualElementData {
	VisualElementData::new(VisualElement::new(7, "Button"), Some(json!({"id": 1})))
}

#[test]
fn null_round_trip_keeps_logger_identity() {
	init_logging();
	let mut dom = MemoryDom::new();
	let root = dom.root();
	let recording = Rc::new(RefCell::new(RecordingLogger::default()));
	let logger: SharedLogger = recording.clone();

	patch_inner(&mut dom, root, Some(Rc::clone(&logger)), |renderer| {
		assert_eq!(renderer.kind(), RendererKind::Default);
		{
			let mut muted = renderer.to_null_renderer()?;
			assert_eq!(muted.kind(), RendererKind::Null);
			assert!(Rc::ptr_eq(&muted.logger().unwrap(), &logger));
			muted.to_default_renderer()?;
		}
		assert!(Rc::ptr_eq(&renderer.logger().unwrap(), &logger));
		Ok(())
	})
	.unwrap();
}

#[test]
fn muted_spans_log_but_render_nothing() {
	init_logging();
	let mut dom = MemoryDom::new();
	let root = dom.root();
	let recording = Rc::new(RefCell::new(RecordingLogger::default()));
	let logger: SharedLogger = recording.clone();

	patch_inner(&mut dom, root, Some(logger), |renderer| {
		renderer.open("div", "visible");
		renderer.close();

		let log_only = renderer.verify_log_only(true)?;
		renderer.enter(&ve_data(), log_only);
		{
			let mut muted = renderer.to_null_renderer()?;
			assert_eq!(muted.open("div", "hidden"), None);
			assert_eq!(muted.text("hidden"), None);
			muted.attr("class", "hidden");
			assert_eq!(muted.close(), None);
			assert_eq!(muted.current_pointer(), None);
			assert!(muted.open_ssr("div", "ssr", None)?);
			muted.to_default_renderer()?;
		}
		renderer.exit();
		Ok(())
	})
	.unwrap();

	assert_eq!(dom.children(root).len(), 1);
	let recording = recording.borrow();
	assert_eq!(recording.entered.len(), 1);
	assert_eq!(recording.entered[0].id, 7);
	assert!(recording.entered[0].log_only);
	assert_eq!(recording.entered[0].data, Some(json!({"id": 1})));
	assert_eq!(recording.exits, 1);
}

#[test]
fn muted_renderer_keeps_its_own_keys() {
	init_logging();
	let mut dom = MemoryDom::new();
	let root = dom.root();

	patch_inner(&mut dom, root, None, |renderer| {
		let outer = renderer.push_key("outer".into());
		{
			let mut muted = renderer.to_null_renderer()?;
			assert_eq!(muted.current_key_stack(), "");
			let old = muted.push_key("inner".into());
			assert_eq!(muted.current_key_stack(), "5:inner");
			assert_eq!(muted.get_new_key("a".into()), "1:a5:inner");
			muted.pop_key(old);
			muted.to_default_renderer()?;
		}
		assert_eq!(renderer.current_key_stack(), "5:outer");
		renderer.pop_key(outer);
		Ok(())
	})
	.unwrap();
}

#[test]
fn invalid_transitions() {
	init_logging();
	let mut dom = MemoryDom::new();
	let root = dom.root();

	patch_inner(&mut dom, root, None, |renderer| {
		assert!(matches!(renderer.to_default_renderer(), Err(Error::DefaultToDefault)));
		let mut muted = renderer.to_null_renderer()?;
		assert!(matches!(muted.to_null_renderer(), Err(Error::MutedToMuted)));
		muted.to_default_renderer()
	})
	.unwrap();
}

#[test]
fn log_only_requires_a_logger() {
	init_logging();
	let mut dom = MemoryDom::new();
	let root = dom.root();

	let result = patch_inner(&mut dom, root, None, |renderer| {
		assert!(!renderer.verify_log_only(false)?);
		renderer.verify_log_only(true)?;
		Ok(())
	});
	let error = result.unwrap_err();
	assert!(matches!(error, Error::LogOnlyWithoutLogger));
	assert_eq!(error.to_string(), "Cannot set logonly=\"true\" unless there is a logger configured");
}

#[test]
fn logging_functions() {
	init_logging();
	let mut dom = MemoryDom::new();
	let root = dom.root();
	let logger: SharedLogger = Rc::new(RefCell::new(RecordingLogger::default()));

	patch_inner(&mut dom, root, None, |renderer| {
		assert_eq!(renderer.eval_logging_function("f", &[json!(1)], "placeholder"), "placeholder");
		renderer.set_logger(Some(Rc::clone(&logger)));
		assert_eq!(renderer.eval_logging_function("f", &[json!(1), json!(2)], "placeholder"), "f(2)");
		Ok(())
	})
	.unwrap();

	let mut probe = FalsinessRenderer::new();
	probe.set_logger(Some(logger));
	assert_eq!(probe.eval_logging_function("f", &[], "placeholder"), "placeholder");
	assert!(matches!(probe.verify_log_only(false), Err(Error::LoggingInCondition)));
	assert!(!probe.did_render());
}

#[test]
fn falsiness_probe() {
	assert!(FalsinessRenderer::probe(|renderer| {
		renderer.open("div", "");
		renderer.close();
		Ok(())
	})
	.unwrap());

	assert!(!FalsinessRenderer::probe(|_| Ok(())).unwrap());

	// Any tree operation counts, regardless of content.
	assert!(FalsinessRenderer::probe(|renderer| {
		renderer.text("");
		Ok(())
	})
	.unwrap());

	assert!(!FalsinessRenderer::probe(|renderer| {
		let old = renderer.push_key("k".into());
		renderer.pop_key(old);
		renderer.enter(&ve_data(), false);
		renderer.exit();
		Ok(())
	})
	.unwrap());
}

#[test]
fn falsiness_probe_shares_its_flag() {
	let probe = FalsinessRenderer::new();
	let mut renderer = probe.clone();
	{
		let mut muted = renderer.to_null_renderer().unwrap();
		assert_eq!(muted.kind(), RendererKind::Falsiness);
		muted.attr("hidden", "");
		muted.to_default_renderer().unwrap();
	}
	assert!(probe.did_render());
}

#[test]
fn falsiness_probe_always_skips() {
	let mut probe = FalsinessRenderer::new();
	assert!(!probe.open_ssr("div", "k", None).unwrap());
	assert!(probe.did_render());
	assert!(probe.maybe_skip(SkipToken::Proceed));
}

#[test]
fn maybe_skip() {
	init_logging();
	let mut dom = MemoryDom::new();
	let root = dom.root();

	patch_inner(&mut dom, root, None, |renderer| {
		renderer.open("div", "a");
		renderer.text("kept");
		renderer.close();
		Ok(())
	})
	.unwrap();

	patch_inner(&mut dom, root, None, |renderer| {
		renderer.open("div", "a");
		assert!(renderer.maybe_skip(SkipToken::Skip));

		renderer.open("div", "b");
		assert!(!renderer.maybe_skip(SkipToken::Proceed));
		renderer.close();

		let mut muted = renderer.to_null_renderer()?;
		assert!(muted.maybe_skip(SkipToken::Skip));
		assert!(!muted.maybe_skip(SkipToken::Proceed));
		muted.to_default_renderer()
	})
	.unwrap();

	let children = dom.children(root);
	assert_eq!(children.len(), 2);
	assert_eq!(dom.text_content(children[0]), "kept");
}

#[test]
fn attributes_with_properties() {
	init_logging();
	let mut dom = MemoryDom::new();
	let root = dom.root();

	patch_inner(&mut dom, root, None, |renderer| {
		renderer.open("input", "unchecked");
		renderer.attr("checked", "false");
		renderer.apply_attrs();
		renderer.close();

		renderer.open("input", "checked");
		renderer.attr("checked", "");
		renderer.attr("value", "v");
		renderer.apply_attrs();
		renderer.close();

		renderer.open("div", "statics");
		renderer.apply_statics(&[("class", "static")]);
		renderer.close();
		Ok(())
	})
	.unwrap();

	let children = dom.children(root);
	assert_eq!(dom.attribute(children[0], "checked"), Some("false"));
	assert_eq!(dom.property(children[0], "checked"), Some("false"));
	assert_eq!(dom.property(children[1], "checked"), Some("true"));
	assert_eq!(dom.property(children[1], "value"), Some("v"));
	assert_eq!(dom.attribute(children[1], "value"), Some("v"));
	assert_eq!(dom.property(children[2], "class"), None);
	assert_eq!(dom.attribute(children[2], "class"), Some("static"));
}
