use core::{cell::Cell, fmt};
use std::rc::Rc;

/// A surface-neutral event, as handed to bound handlers.
///
/// Surfaces fill in what they know: [`WebSurface`](`crate::web::WebSurface`) copies the input value of the event target
/// and the client coordinates of mouse events, and forwards [`Event::prevent_default`] to the browser event afterwards.
#[derive(Debug, Clone)]
pub struct Event {
	name: String,
	value: Option<String>,
	client_x: f64,
	client_y: f64,
	default_prevented: Cell<bool>,
}

impl Event {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: None,
			client_x: 0.,
			client_y: 0.,
			default_prevented: Cell::new(false),
		}
	}

	#[must_use]
	pub fn with_value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());
		self
	}

	#[must_use]
	pub fn with_client_position(mut self, x: f64, y: f64) -> Self {
		self.client_x = x;
		self.client_y = y;
		self
	}

	/// The lowercase event type, e.g. `"mousemove"`.
	#[must_use]
	pub fn name(&self) -> &str {
		&self.name
	}

	/// The current value of the event target, if it is an input.
	#[must_use]
	pub fn value(&self) -> Option<&str> {
		self.value.as_deref()
	}

	#[must_use]
	pub fn client_x(&self) -> f64 {
		self.client_x
	}

	#[must_use]
	pub fn client_y(&self) -> f64 {
		self.client_y
	}

	pub fn prevent_default(&self) {
		self.default_prevented.set(true)
	}

	#[must_use]
	pub fn default_prevented(&self) -> bool {
		self.default_prevented.get()
	}
}

/// A bound event handler as the display surface sees it.
pub type Handler = Rc<dyn Fn(&Event)>;

/// An event handler prop value.
///
/// Handlers aren't compared between passes. The renderer rebinds all of them on every pass.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event)>);

impl Callback {
	pub fn new(f: impl Fn(&Event) + 'static) -> Self {
		Self(Rc::new(f))
	}

	pub fn call(&self, event: &Event) {
		(self.0)(event)
	}
}

impl fmt::Debug for Callback {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Callback").field(&Rc::as_ptr(&self.0).cast::<()>()).finish()
	}
}
