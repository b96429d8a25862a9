#![doc(html_root_url = "https://docs.rs/soy-idom/0.0.3")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod dynamic;
pub mod element;
mod error;
pub mod html;
pub mod key;
pub mod key_stack;
pub mod renderer;
pub mod target;
pub mod velog;

pub use error::Error;
pub use key::{serialize_key, KeyFragment};
pub use renderer::{patch_inner, patch_outer, Renderer};

/// Injected data, available to every template of a render pass.
pub type IjData = serde_json::Value;
