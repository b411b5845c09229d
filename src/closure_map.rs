use crate::event::{Event, Handler};
use core::cell::{Cell, RefCell};
use hashbrown::{hash_map::Entry, HashMap};
use js_sys::Reflect;
use std::rc::Rc;
use tracing::{error, trace, trace_span};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

/// The property under which [`ClosureMap`] stores its element ids on DOM elements.
const ID_PROPERTY: &str = "__saplingDomListenerId";

/// One persistent JS listener. Rebinding only swaps the Rust handler in `slot`.
struct Listener {
	slot: Rc<RefCell<Handler>>,
	closure: Closure<dyn Fn(web_sys::Event)>,
}

/// Keeps the JS closures of bound event handlers alive, keyed by (element id, event name).
#[derive(Default)]
pub(crate) struct ClosureMap {
	listeners: RefCell<HashMap<(u32, String), Listener>>,
	next_id: Cell<u32>,
}

impl ClosureMap {
	#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
	fn element_id(&self, element: &web_sys::Element, assign: bool) -> Result<Option<u32>, JsValue> {
		let key = JsValue::from_str(ID_PROPERTY);
		let existing = Reflect::get(element, &key)?;
		if let Some(id) = existing.as_f64() {
			return Ok(Some(id as u32));
		}
		if !assign {
			return Ok(None);
		}
		let id = self.next_id.get();
		self.next_id.set(id.wrapping_add(1));
		Reflect::set(element, &key, &JsValue::from(id))?;
		Ok(Some(id))
	}

	pub(crate) fn publish(&self, element: &web_sys::Element, event: &str, handler: Handler) -> Result<(), JsValue> {
		let id = self.element_id(element, true)?.ok_or_else(|| JsValue::from_str("No listener id assigned."))?;
		let mut listeners = self.listeners.borrow_mut();
		match listeners.entry((id, event.to_owned())) {
			Entry::Occupied(occupied) => {
				trace!("Swapped handler of existing listener.");
				*occupied.get().slot.borrow_mut() = handler;
			}
			Entry::Vacant(vacant) => {
				let slot = Rc::new(RefCell::new(handler));
				let closure = {
					let slot = Rc::clone(&slot);
					Closure::wrap(Box::new(move |web_event: web_sys::Event| {
						let span = trace_span!("Listener", event = %web_event.type_());
						let _enter = span.enter();

						let event = convert_event(&web_event);
						// Cloned so that the pass after the handler can rebind this slot.
						let handler = Rc::clone(&*slot.borrow());
						handler(&event);
						if event.default_prevented() {
							web_event.prevent_default()
						}
					}) as Box<dyn Fn(web_sys::Event)>)
				};
				element.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
				trace!("Created listener closure.");
				vacant.insert(Listener { slot, closure });
			}
		}
		Ok(())
	}

	pub(crate) fn unpublish(&self, element: &web_sys::Element, event: &str) -> Result<(), JsValue> {
		let id = match self.element_id(element, false)? {
			Some(id) => id,
			None => return Ok(()),
		};
		let removed = self.listeners.borrow_mut().remove(&(id, event.to_owned()));
		match removed {
			Some(Listener { closure, .. }) => {
				element.remove_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
				trace!("Destroyed listener closure.");
			}
			None => error!("Tried to unbind {:?} handler that isn't bound.", event),
		}
		Ok(())
	}

	pub(crate) fn len(&self) -> usize {
		self.listeners.borrow().len()
	}
}

fn convert_event(web_event: &web_sys::Event) -> Event {
	let mut event = Event::new(web_event.type_());
	if let Some(input) = web_event.target().and_then(|target| target.dyn_into::<web_sys::HtmlInputElement>().ok()) {
		event = event.with_value(input.value());
	}
	if let Some(mouse_event) = web_event.dyn_ref::<web_sys::MouseEvent>() {
		event = event.with_client_position(f64::from(mouse_event.client_x()), f64::from(mouse_event.client_y()));
	}
	event
}
