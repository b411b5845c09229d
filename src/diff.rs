use crate::{
	config::Config,
	event::{Callback, Event, Handler},
	hooks::{HookSlots, Schedule, Scope},
	node::{Child, Component, Kind, Node, PropValue},
	surface::Surface,
	Error,
};
use core::{any::TypeId, mem};
use hashbrown::{HashMap, HashSet};
use std::{
	borrow::Cow,
	rc::{Rc, Weak},
};
use tracing::{error, info, instrument, trace, trace_span, warn};

/// Structural position: child indices from the root. A component's content is at its own path + `[0]`.
type Path = Vec<usize>;

macro_rules! path_span {
	($name:literal, $path:expr $(, $($fields:tt)*)?) => {{
		let span = trace_span!($name, path = tracing::field::Empty $(, $($fields)*)?);
		if cfg!(feature = "log-paths") {
			span.record("path", &tracing::field::debug(&$path));
		}
		span
	}};
}

/// Page content is only logged with the `dangerous-logging` feature.
fn content(value: &str) -> &str {
	if cfg!(feature = "dangerous-logging") {
		value
	} else {
		"[redacted]"
	}
}

/// What the previous pass materialized at one path.
enum Record<N> {
	Element {
		tag: Cow<'static, str>,
		node: N,
		attributes: HashMap<String, String>,
		events: HashSet<String>,
		child_count: usize,
	},
	Text {
		node: N,
		text: Rc<str>,
	},
	Component {
		id: TypeId,
		name: &'static str,
		hooks: Rc<HookSlots>,
	},
}

/// Reconciles descriptions against what the previous pass left on one mount point.
///
/// Children are matched strictly by index. Reordering unkeyed children updates each position in place instead of moving nodes.
pub(crate) struct Differ<S: Surface> {
	surface: S,
	records: HashMap<Path, Record<S::Node>>,
	schedule: Weak<dyn Schedule>,
	depth_limit: usize,
}

impl<S: Surface> Differ<S> {
	pub(crate) fn new(surface: S, schedule: Weak<dyn Schedule>, config: &Config) -> Self {
		Self {
			surface,
			records: HashMap::new(),
			schedule,
			depth_limit: config.depth_limit,
		}
	}

	pub(crate) fn instance_count(&self) -> usize {
		self.records.values().filter(|record| matches!(record, Record::Component { .. })).count()
	}

	/// Runs one pass: reconciles `description` as the only managed child of `mount_point`.
	#[instrument(skip(self, description))]
	pub(crate) fn update(&mut self, mount_point: &S::Node, description: &Node) -> Result<(), Error> {
		let mut path = Path::new();
		let result = self.reconcile(mount_point, &mut path, &Child::Node(description.clone()), self.depth_limit);
		info!("Mounted record count/component instances: {}/{}", self.records.len(), self.instance_count());
		result
	}

	fn reconcile(&mut self, parent: &S::Node, path: &mut Path, child: &Child, depth: usize) -> Result<(), Error> {
		if depth == 0 {
			error!("Depth limit reached");
			return Err(Error::DepthLimit(self.depth_limit));
		}

		let matching = self.records.get(path.as_slice()).map(|record| match (record, child) {
			(Record::Text { .. }, Child::Text(_)) => true,
			(Record::Element { tag, .. }, Child::Node(node)) => matches!(node.kind(), Kind::Tag(t) if t == tag),
			(Record::Component { id, .. }, Child::Node(node)) => matches!(node.kind(), Kind::Component(c) if c.id() == *id),
			_ => false,
		});

		match matching {
			None => {
				let span = path_span!("Inserting new", path);
				let _enter = span.enter();
				let reference = self.following_node(path);
				let node = self.create(path, child, depth)?;
				self.surface.insert_before(parent, &node, reference.as_ref())
			}
			Some(false) => self.replace(parent, path, child, depth),
			Some(true) => match child {
				Child::Text(text) => self.update_text(path, text),
				Child::Node(node) => match node.kind() {
					Kind::Tag(_) => self.update_element(path, node, depth),
					Kind::Component(component) => {
						let hooks = match self.records.get(path.as_slice()) {
							Some(Record::Component { hooks, .. }) => Rc::clone(hooks),
							_ => return Err(Error::MissingRecord(path.clone())),
						};
						let content = self.invoke(component, &hooks, node)?;
						path.push(0);
						let result = self.reconcile(parent, path, &Child::Node(content), depth - 1);
						path.pop();
						result
					}
				},
			},
		}
	}

	/// Tears down whatever is at `path` and puts a fresh materialization of `child` in its place.
	fn replace(&mut self, parent: &S::Node, path: &mut Path, child: &Child, depth: usize) -> Result<(), Error> {
		let span = path_span!("Replacing mismatching", path);
		let _enter = span.enter();

		if let (Some(Record::Element { tag: previous, .. }), Child::Node(node)) = (self.records.get(path.as_slice()), child) {
			if let Kind::Tag(tag) = node.kind() {
				if previous.eq_ignore_ascii_case(tag) {
					warn!("Recreating element due to different tag name casing: {:?} -> {:?}", previous, tag)
				}
			}
		}

		let previous = self.display_node(path)?;
		self.discard(path);
		let node = match self.create(path, child, depth) {
			Ok(node) => node,
			Err(error) => {
				// Nothing is recorded for `previous` anymore, so it must not stay on the surface.
				warn!("Removing the previous node without replacement.");
				if let Err(remove_error) = self.surface.remove_child(parent, &previous) {
					error!("Failed to remove the previous node: {}", remove_error)
				}
				return Err(error);
			}
		};
		self.surface.insert_before(parent, &node, Some(&previous))?;
		self.surface.remove_child(parent, &previous)
	}

	/// The display node of the first recorded sibling after `path`, looking out of components.
	///
	/// A pass that failed partway can leave gaps among the recorded children. New nodes are inserted before this node
	/// so that they still land at their own index.
	fn following_node(&self, path: &[usize]) -> Option<S::Node> {
		let (&index, parent) = path.split_last()?;
		match self.records.get(parent)? {
			Record::Component { .. } => self.following_node(parent),
			Record::Element { child_count, .. } => (index + 1..*child_count).find_map(|i| {
				let mut sibling = parent.to_vec();
				sibling.push(i);
				if self.records.contains_key(sibling.as_slice()) {
					self.display_node(&sibling).ok()
				} else {
					None
				}
			}),
			Record::Text { .. } => None,
		}
	}

	/// Tears down the materialization at `path` and removes its display node from `parent`.
	fn remove(&mut self, parent: &S::Node, path: &mut Path) -> Result<(), Error> {
		let span = path_span!("Removing", path);
		let _enter = span.enter();
		let node = self.display_node(path)?;
		self.discard(path);
		self.surface.remove_child(parent, &node)
	}

	/// The display node at `path`, looking through components.
	fn display_node(&self, path: &[usize]) -> Result<S::Node, Error> {
		let mut path = path.to_vec();
		loop {
			match self.records.get(path.as_slice()) {
				Some(Record::Element { node, .. } | Record::Text { node, .. }) => return Ok(node.clone()),
				Some(Record::Component { .. }) => path.push(0),
				None => {
					error!("Expected a mounted record but found none. An earlier pass may have been aborted.");
					return Err(Error::MissingRecord(path));
				}
			}
		}
	}

	/// Drops the records at and below `path`, unbinds their handlers and discards their hook slots,
	/// without removing anything from the display surface.
	fn discard(&mut self, path: &mut Path) {
		match self.records.remove(path.as_slice()) {
			None => warn!("Nothing to discard at {:?}.", path),
			Some(Record::Text { .. }) => (),
			Some(Record::Element { tag, node, events, child_count, .. }) => {
				let span = trace_span!("Discarding element", %tag, events = events.len());
				let _enter = span.enter();
				for event in &events {
					if let Err(error) = self.surface.unbind_event(&node, event) {
						error!("Failed to unbind {:?} handler: {}", event, error)
					}
				}
				for i in 0..child_count {
					path.push(i);
					self.discard(path);
					path.pop();
				}
			}
			Some(Record::Component { name, hooks, .. }) => {
				trace!(component = name, slots = hooks.len(), "Discarding component instance.");
				path.push(0);
				self.discard(path);
				path.pop();
			}
		}
	}

	/// Creates a detached materialization of `child`. On error, nothing is left recorded at or below `path`.
	fn create(&mut self, path: &mut Path, child: &Child, depth: usize) -> Result<S::Node, Error> {
		let result = self.create_unchecked(path, child, depth);
		if result.is_err() {
			self.purge(path);
		}
		result
	}

	fn create_unchecked(&mut self, path: &mut Path, child: &Child, depth: usize) -> Result<S::Node, Error> {
		if depth == 0 {
			error!("Depth limit reached");
			return Err(Error::DepthLimit(self.depth_limit));
		}

		match child {
			Child::Text(text) => {
				let span = trace_span!("Creating text node", text = content(text));
				let _enter = span.enter();
				let node = self.surface.create_text(text)?;
				self.records.insert(
					path.clone(),
					Record::Text {
						node: node.clone(),
						text: Rc::clone(text),
					},
				);
				Ok(node)
			}

			Child::Node(description) => match description.kind() {
				Kind::Tag(tag) => {
					let span = trace_span!("Creating element", %tag);
					let _enter = span.enter();
					let node = self.surface.create_element(tag)?;
					self.records.insert(
						path.clone(),
						Record::Element {
							tag: tag.clone(),
							node: node.clone(),
							attributes: HashMap::new(),
							events: HashSet::new(),
							child_count: 0,
						},
					);
					// Diffing against the empty record creates all props and children.
					self.update_element(path, description, depth)?;
					Ok(node)
				}

				Kind::Component(component) => {
					let span = trace_span!("Creating component instance", component = component.name());
					let _enter = span.enter();
					let hooks = Rc::new(HookSlots::default());
					self.records.insert(
						path.clone(),
						Record::Component {
							id: component.id(),
							name: component.name(),
							hooks: Rc::clone(&hooks),
						},
					);
					let content = self.invoke(component, &hooks, description)?;
					path.push(0);
					let result = self.create(path, &Child::Node(content), depth - 1);
					path.pop();
					result
				}
			},
		}
	}

	/// Drops all records at or below `prefix`, whether reachable or not.
	fn purge(&mut self, prefix: &[usize]) {
		let surface = &self.surface;
		let mut purged = 0_usize;
		self.records.retain(|path, record| {
			if !path.starts_with(prefix) {
				return true;
			}
			if let Record::Element { node, events, .. } = record {
				for event in events.iter() {
					if let Err(error) = surface.unbind_event(node, event) {
						error!("Failed to unbind {:?} handler: {}", event, error)
					}
				}
			}
			purged += 1;
			false
		});
		trace!("Purged {} record(s) after a failed creation.", purged);
	}

	fn update_text(&mut self, path: &[usize], text: &Rc<str>) -> Result<(), Error> {
		match self.records.get_mut(path) {
			Some(Record::Text { node, text: previous }) => {
				if *previous != *text {
					let span = trace_span!("Updating text node", previous = content(previous), text = content(text));
					let _enter = span.enter();
					self.surface.set_text(node, text)?;
					*previous = Rc::clone(text);
				}
				Ok(())
			}
			_ => Err(Error::MissingRecord(path.to_vec())),
		}
	}

	/// Diffs attributes and handlers of the element recorded at `path` against `description`, then its children.
	fn update_element(&mut self, path: &mut Path, description: &Node, depth: usize) -> Result<(), Error> {
		let span = path_span!("Diffing element", path, children = description.children().len());
		let _enter = span.enter();

		let (attributes, handlers) = split_props(description)?;
		let events: HashSet<String> = handlers.iter().map(|(event, _)| event.clone()).collect();

		let (element, previous_attributes, previous_events, previous_count) = match self.records.get_mut(path.as_slice()) {
			Some(Record::Element {
				node,
				attributes: recorded_attributes,
				events: recorded_events,
				child_count,
				..
			}) => (
				node.clone(),
				mem::replace(recorded_attributes, attributes.clone()),
				mem::replace(recorded_events, events.clone()),
				// Until the extras are removed, the record must still cover them.
				{
					let count = *child_count;
					mem::replace(child_count, count.max(description.children().len()))
				},
			),
			_ => return Err(Error::MissingRecord(path.clone())),
		};

		for name in previous_attributes.keys() {
			if !attributes.contains_key(name) {
				trace!("Removing attribute {:?}.", name);
				self.surface.remove_attribute(&element, name)?;
			}
		}
		for (name, value) in &attributes {
			if previous_attributes.get(name) != Some(value) {
				trace!("Setting attribute {:?} to {:?}.", name, content(value));
				self.surface.set_attribute(&element, name, value)?;
			}
		}

		for event in &previous_events {
			if !events.contains(event) {
				trace!("Unbinding {:?} handler.", event);
				self.surface.unbind_event(&element, event)?;
			}
		}
		// Callbacks are new closures on every pass, so all of them are rebound.
		for (event, callback) in handlers {
			trace!("Binding {:?} handler.", event);
			let handler = self.batched(callback);
			self.surface.bind_event(&element, &event, handler)?;
		}

		let children = description.children();
		for (i, child) in children.iter().enumerate() {
			path.push(i);
			let result = self.reconcile(&element, path, child, depth - 1);
			path.pop();
			result?;
		}
		for i in (children.len()..previous_count).rev() {
			path.push(i);
			let result = if self.records.contains_key(path.as_slice()) {
				self.remove(&element, path)
			} else {
				trace!("Nothing left to remove at index {}.", i);
				Ok(())
			};
			path.pop();
			result?;
		}

		match self.records.get_mut(path.as_slice()) {
			Some(Record::Element { child_count, .. }) => *child_count = children.len(),
			_ => return Err(Error::MissingRecord(path.clone())),
		}
		Ok(())
	}

	/// Wraps `callback` so that all state updates it makes are coalesced into one pass.
	fn batched(&self, callback: Callback) -> Handler {
		let schedule = self.schedule.clone();
		Rc::new(move |event: &Event| match schedule.upgrade() {
			Some(schedule) => schedule.batch(&mut || callback.call(event)),
			None => callback.call(event),
		})
	}

	fn invoke(&self, component: &Component, hooks: &HookSlots, description: &Node) -> Result<Node, Error> {
		let span = trace_span!("Invoking component", component = component.name(), slots = hooks.len());
		let _enter = span.enter();

		let mut scope = Scope::new(component.name(), description.props(), description.children(), hooks, &self.schedule);
		let content = component.call(&mut scope);
		scope.finish()?;
		Ok(content)
	}
}

type Attributes = HashMap<String, String>;
type Handlers = Vec<(String, Callback)>;

/// Sorts props into attributes (by attribute name) and handlers (by event name).
fn split_props(description: &Node) -> Result<(Attributes, Handlers), Error> {
	let tag = match description.kind() {
		Kind::Tag(tag) => &**tag,
		Kind::Component(component) => component.name(),
	};
	let malformed = |name: &str, reason: &'static str| Error::MalformedProp {
		tag: tag.to_string(),
		name: name.to_owned(),
		reason,
	};

	let mut attributes = HashMap::new();
	let mut handlers: Handlers = Vec::new();
	for (name, value) in description.props().iter() {
		match (event_name(name), value) {
			(Some(event), PropValue::Handler(callback)) => {
				if handlers.iter().any(|(existing, _)| *existing == event) {
					return Err(malformed(name, "Duplicate event handler."));
				}
				handlers.push((event, callback.clone()))
			}
			(Some(_), _) => return Err(malformed(name, "Props named `on` + capitalized event must be event handlers.")),
			(None, PropValue::Handler(_)) => return Err(malformed(name, "Event handler props must be named `on` + capitalized event, e.g. `onClick`.")),
			(None, value) => {
				if let Some(value) = value.to_attribute() {
					attributes.insert(attribute_name(name).to_owned(), value);
				}
			}
		}
	}
	Ok((attributes, handlers))
}

/// `onMouseMove` → `mousemove`, `onDoubleClick` → `dblclick`. Other names aren't handler props.
fn event_name(prop: &str) -> Option<String> {
	let event = prop.strip_prefix("on")?;
	if !event.chars().next()?.is_ascii_uppercase() {
		return None;
	}
	let event = event.to_ascii_lowercase();
	if event == "doubleclick" {
		return Some("dblclick".to_owned());
	}
	Some(event)
}

fn attribute_name(prop: &str) -> &str {
	match prop {
		"className" => "class",
		"htmlFor" => "for",
		other => other,
	}
}
