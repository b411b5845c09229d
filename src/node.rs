//! Immutable node descriptions and the [`build`] function that creates them.
//!
//! [`build`] is the only seam between markup-like syntax and the runtime.
//! Whatever transliterates declarative markup should emit calls to it (see also [`children!`](`crate::children!`)).

use crate::{
	event::{Callback, Event},
	hooks::Scope,
};
use core::{
	any::{type_name, TypeId},
	fmt,
};
use hashbrown::HashMap;
use std::{borrow::Cow, rc::Rc};

/// Describes one point of a UI tree.
///
/// Cheap to clone. There are no mutators: a new render pass produces new descriptions.
#[derive(Clone)]
pub struct Node(Rc<NodeData>);

struct NodeData {
	kind: Kind,
	props: Props,
	children: Vec<Child>,
}

impl Node {
	#[must_use]
	pub fn kind(&self) -> &Kind {
		&self.0.kind
	}

	#[must_use]
	pub fn props(&self) -> &Props {
		&self.0.props
	}

	#[must_use]
	pub fn children(&self) -> &[Child] {
		&self.0.children
	}
}

impl fmt::Debug for Node {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Node")
			.field("kind", &self.0.kind)
			.field("props", &self.0.props)
			.field("children", &self.0.children)
			.finish()
	}
}

/// Creates a [`Node`] description.
///
/// Each item of `children` is one argument as written in markup. Arguments that are sequences expand in place,
/// so `[a, vec![b, c], d]` describes the four children `a b c d`.
///
/// Nothing is validated here. Malformed props are reported by the renderer.
#[must_use]
pub fn build(kind: impl Into<Kind>, props: Props, children: impl IntoIterator<Item = Children>) -> Node {
	Node(Rc::new(NodeData {
		kind: kind.into(),
		props,
		children: children.into_iter().flat_map(|children| children.0).collect(),
	}))
}

/// Either a primitive display element tag or a component.
#[derive(Debug, Clone)]
pub enum Kind {
	Tag(Cow<'static, str>),
	Component(Component),
}

impl From<&'static str> for Kind {
	fn from(tag: &'static str) -> Self {
		Self::Tag(Cow::Borrowed(tag))
	}
}

impl From<String> for Kind {
	fn from(tag: String) -> Self {
		Self::Tag(Cow::Owned(tag))
	}
}

impl From<Component> for Kind {
	fn from(component: Component) -> Self {
		Self::Component(component)
	}
}

/// A component function: called with a [`Scope`] for each render of each of its instances.
///
/// Two [`Component`]s are the same kind exactly if they wrap the same function or closure *type*,
/// so closures from the same definition site match across passes even if they capture different values.
/// Coercing different functions to one `fn` pointer type before wrapping them would make them indistinguishable.
#[derive(Clone)]
pub struct Component {
	id: TypeId,
	name: &'static str,
	render: Rc<dyn Fn(&mut Scope<'_>) -> Node>,
}

impl Component {
	pub fn new<F>(render: F) -> Self
	where
		F: Fn(&mut Scope<'_>) -> Node + 'static,
	{
		Self {
			id: TypeId::of::<F>(),
			name: type_name::<F>(),
			render: Rc::new(render),
		}
	}

	#[must_use]
	pub fn id(&self) -> TypeId {
		self.id
	}

	#[must_use]
	pub fn name(&self) -> &'static str {
		self.name
	}

	pub(crate) fn call(&self, scope: &mut Scope<'_>) -> Node {
		(self.render)(scope)
	}
}

impl fmt::Debug for Component {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Component").field("name", &self.name).finish_non_exhaustive()
	}
}

/// Shorthand for [`Component::new`].
pub fn component<F>(render: F) -> Component
where
	F: Fn(&mut Scope<'_>) -> Node + 'static,
{
	Component::new(render)
}

/// One prop value.
#[derive(Debug, Clone)]
pub enum PropValue {
	Str(Rc<str>),
	Num(f64),
	Bool(bool),
	Handler(Callback),
}

impl PropValue {
	/// The attribute value this prop sets, or [`None`] if the attribute should be absent.
	///
	/// Handlers have no attribute representation.
	#[must_use]
	pub fn to_attribute(&self) -> Option<String> {
		match self {
			PropValue::Str(value) => Some(value.to_string()),
			PropValue::Num(value) => Some(value.to_string()),
			PropValue::Bool(true) => Some(String::new()),
			PropValue::Bool(false) | PropValue::Handler(_) => None,
		}
	}
}

impl From<&str> for PropValue {
	fn from(value: &str) -> Self {
		Self::Str(value.into())
	}
}

impl From<String> for PropValue {
	fn from(value: String) -> Self {
		Self::Str(value.into())
	}
}

impl From<bool> for PropValue {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<Callback> for PropValue {
	fn from(callback: Callback) -> Self {
		Self::Handler(callback)
	}
}

macro_rules! num_prop_value {
	($($ty:ty),*) => {$(
		impl From<$ty> for PropValue {
			#[allow(clippy::cast_precision_loss, clippy::cast_lossless)]
			fn from(value: $ty) -> Self {
				Self::Num(value as f64)
			}
		}
	)*};
}
num_prop_value!(i32, i64, u32, u64, usize, f32, f64);

/// An unordered bag of attribute and handler props.
#[derive(Debug, Clone, Default)]
pub struct Props(HashMap<Cow<'static, str>, PropValue>);

impl Props {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<PropValue>) -> Self {
		self.0.insert(name.into(), value.into());
		self
	}

	/// Adds a handler for the event `event` (case-insensitive), stored as the prop `on` + `Event`.
	///
	/// The renderer binds it to the lowercased event name, except that `doubleClick` binds `dblclick`.
	/// Other DOM events whose names aren't the concatenated words have to be given verbatim, e.g. `on("dblclick", ..)`.
	#[must_use]
	pub fn on(self, event: &str, handler: impl Fn(&Event) + 'static) -> Self {
		let mut chars = event.chars();
		let name = match chars.next() {
			Some(first) => format!("on{}{}", first.to_ascii_uppercase(), chars.as_str()),
			None => "on".to_owned(),
		};
		self.with(name, Callback::new(handler))
	}

	#[must_use]
	pub fn get(&self, name: &str) -> Option<&PropValue> {
		self.0.get(name)
	}

	#[must_use]
	pub fn get_str(&self, name: &str) -> Option<&str> {
		match self.get(name) {
			Some(PropValue::Str(value)) => Some(&**value),
			_ => None,
		}
	}

	#[must_use]
	pub fn get_f64(&self, name: &str) -> Option<f64> {
		match self.get(name) {
			Some(&PropValue::Num(value)) => Some(value),
			_ => None,
		}
	}

	#[must_use]
	pub fn get_bool(&self, name: &str) -> Option<bool> {
		match self.get(name) {
			Some(&PropValue::Bool(value)) => Some(value),
			_ => None,
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &PropValue)> {
		self.0.iter().map(|(name, value)| (name.as_ref(), value))
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.0.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

/// One child of a [`Node`]: a nested description or text.
#[derive(Debug, Clone)]
pub enum Child {
	Node(Node),
	Text(Rc<str>),
}

impl From<Node> for Child {
	fn from(node: Node) -> Self {
		Self::Node(node)
	}
}

impl From<&str> for Child {
	fn from(text: &str) -> Self {
		Self::Text(text.into())
	}
}

impl From<String> for Child {
	fn from(text: String) -> Self {
		Self::Text(text.into())
	}
}

/// One child argument of [`build`], flattened into zero or more [`Child`]ren.
#[derive(Debug, Clone, Default)]
pub struct Children(Vec<Child>);

impl From<Child> for Children {
	fn from(child: Child) -> Self {
		Self(vec![child])
	}
}

impl From<Node> for Children {
	fn from(node: Node) -> Self {
		Self(vec![Child::Node(node)])
	}
}

impl From<&str> for Children {
	fn from(text: &str) -> Self {
		Self(vec![text.into()])
	}
}

impl From<String> for Children {
	fn from(text: String) -> Self {
		Self(vec![text.into()])
	}
}

impl<T: Into<Child>> From<Vec<T>> for Children {
	fn from(children: Vec<T>) -> Self {
		Self(children.into_iter().map(Into::into).collect())
	}
}

impl<T: Into<Child>> From<Option<T>> for Children {
	fn from(child: Option<T>) -> Self {
		Self(child.into_iter().map(Into::into).collect())
	}
}

macro_rules! num_children {
	($($ty:ty),*) => {$(
		impl From<$ty> for Child {
			fn from(value: $ty) -> Self {
				Self::Text(value.to_string().into())
			}
		}

		impl From<$ty> for Children {
			fn from(value: $ty) -> Self {
				Self(vec![value.into()])
			}
		}
	)*};
}
num_children!(i32, i64, u32, u64, usize, f32, f64);

/// Converts each argument into [`Children`], for use as the last argument of [`build`].
///
/// ```
/// use sapling_dom::{build, children, Props};
///
/// let items = vec![build("li", Props::new(), children!["a"]), build("li", Props::new(), children!["b"])];
/// let list = build("ul", Props::new(), children![items, "tail", 3]);
/// assert_eq!(list.children().len(), 4);
/// ```
#[macro_export]
macro_rules! children {
	($($child:expr),* $(,)?) => {
		[$($crate::Children::from($child)),*]
	};
}
