//! The browser DOM as display surface.

use crate::{closure_map::ClosureMap, event::Handler, node::Node, runtime::Runtime, surface::Surface, Error};
use core::{cell::RefCell, fmt};
use std::rc::Rc;
use tracing::{error, instrument, trace};
use wasm_bindgen::{JsCast, JsValue};

fn js_error(context: &str, error: &JsValue) -> Error {
	Error::Surface(format!("{}: {:?}", context, error))
}

/// A [`Surface`] backed by [***Document***](https://developer.mozilla.org/en-US/docs/Web/API/Document) nodes.
///
/// Each bound (element, event) pair gets one persistent event listener; rebinding swaps the Rust handler behind it.
/// Listener closures are released when their handler is unbound, which the renderer does for every node it discards.
#[derive(Clone)]
pub struct WebSurface {
	document: web_sys::Document,
	closures: Rc<ClosureMap>,
}

impl WebSurface {
	#[must_use]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			closures: Rc::new(ClosureMap::default()),
		}
	}

	/// Uses the document of the current window, if there is one.
	#[must_use]
	pub fn for_window() -> Option<Self> {
		web_sys::window().and_then(|window| window.document()).map(Self::new)
	}

	/// Number of live event listeners created by this surface.
	#[must_use]
	pub fn listener_count(&self) -> usize {
		self.closures.len()
	}

	fn element<'a>(node: &'a web_sys::Node, operation: &str) -> Result<&'a web_sys::Element, Error> {
		node.dyn_ref::<web_sys::Element>().ok_or_else(|| Error::Surface(format!("Can't {} on non-element node {:?}", operation, node)))
	}
}

impl fmt::Debug for WebSurface {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WebSurface").field("listeners", &self.closures.len()).finish_non_exhaustive()
	}
}

impl Surface for WebSurface {
	type Node = web_sys::Node;

	fn create_element(&self, tag: &str) -> Result<web_sys::Node, Error> {
		self.document.create_element(tag).map(Into::into).map_err(|error| js_error("Failed to create element", &error))
	}

	fn create_text(&self, text: &str) -> Result<web_sys::Node, Error> {
		Ok(self.document.create_text_node(text).into())
	}

	fn set_text(&self, node: &web_sys::Node, text: &str) -> Result<(), Error> {
		node.set_text_content(Some(text));
		Ok(())
	}

	fn set_attribute(&self, element: &web_sys::Node, name: &str, value: &str) -> Result<(), Error> {
		let element = Self::element(element, "set attribute")?;
		element.set_attribute(name, value).map_err(|error| js_error("Failed to set attribute", &error))?;

		// The attribute only sets the default of these once the user has interacted with the input.
		if let Some(input) = element.dyn_ref::<web_sys::HtmlInputElement>() {
			match name {
				"value" => input.set_value(value),
				"checked" => input.set_checked(true),
				_ => (),
			}
		}
		Ok(())
	}

	fn remove_attribute(&self, element: &web_sys::Node, name: &str) -> Result<(), Error> {
		let element = Self::element(element, "remove attribute")?;
		element.remove_attribute(name).map_err(|error| js_error("Failed to remove attribute", &error))?;
		if let Some(input) = element.dyn_ref::<web_sys::HtmlInputElement>() {
			match name {
				"value" => input.set_value(""),
				"checked" => input.set_checked(false),
				_ => (),
			}
		}
		Ok(())
	}

	fn insert_before(&self, parent: &web_sys::Node, child: &web_sys::Node, reference: Option<&web_sys::Node>) -> Result<(), Error> {
		parent.insert_before(child, reference).map(drop).map_err(|error| js_error("Failed to insert node", &error))
	}

	fn remove_child(&self, parent: &web_sys::Node, child: &web_sys::Node) -> Result<(), Error> {
		parent.remove_child(child).map(drop).map_err(|error| js_error("Failed to remove node", &error))
	}

	fn bind_event(&self, element: &web_sys::Node, event: &str, handler: Handler) -> Result<(), Error> {
		let element = Self::element(element, "bind event")?;
		self.closures.publish(element, event, handler).map_err(|error| js_error("Failed to add event listener", &error))
	}

	fn unbind_event(&self, element: &web_sys::Node, event: &str) -> Result<(), Error> {
		let element = Self::element(element, "unbind event")?;
		self.closures.unpublish(element, event).map_err(|error| js_error("Failed to remove event listener", &error))
	}
}

thread_local! {
	static RUNTIME: RefCell<Option<Rc<Runtime<WebSurface>>>> = RefCell::new(None);
}

/// Renders `description` into `mount_point` using one runtime per thread for the current window's document.
///
/// Calling this again with the same mount point updates the tree mounted there.
///
/// # Errors
///
/// See [`Runtime::render`]. Also fails if there is no window document.
#[instrument(skip(description))]
pub fn render(description: Node, mount_point: &web_sys::Element) -> Result<(), Error> {
	let runtime = RUNTIME.with(|runtime| -> Result<_, Error> {
		let mut runtime = runtime.borrow_mut();
		if runtime.is_none() {
			trace!("Creating thread-local runtime.");
			let surface = WebSurface::for_window().ok_or_else(|| Error::Surface("No window document found.".to_owned()))?;
			*runtime = Some(Rc::new(Runtime::new(surface)));
		}
		runtime.clone().ok_or_else(|| Error::Surface("Runtime unavailable.".to_owned()))
	})?;

	// The borrow above is released, so components may call `render` themselves.
	runtime.render(description, mount_point.as_ref()).map(drop).map_err(|error| {
		error!("Render failed: {}", error);
		error
	})
}
