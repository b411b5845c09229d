use crate::{event::Handler, Error};
use core::fmt::Debug;

/// A real display surface the renderer can materialize descriptions into.
///
/// All methods take `&self`: surfaces like the DOM are shared handles, and bound handlers may call back into the renderer
/// (and from there into the surface) while an event is being dispatched.
/// Implementations should hold no internal borrow while running a handler.
pub trait Surface {
	/// A handle to one live display node. Equality must be identity.
	type Node: Clone + PartialEq + Debug;

	fn create_element(&self, tag: &str) -> Result<Self::Node, Error>;

	fn create_text(&self, text: &str) -> Result<Self::Node, Error>;

	/// Replaces the text content of `node`.
	fn set_text(&self, node: &Self::Node, text: &str) -> Result<(), Error>;

	fn set_attribute(&self, element: &Self::Node, name: &str, value: &str) -> Result<(), Error>;

	fn remove_attribute(&self, element: &Self::Node, name: &str) -> Result<(), Error>;

	/// Inserts `child` into `parent` before `reference`, or as last child if `reference` is [`None`].
	fn insert_before(&self, parent: &Self::Node, child: &Self::Node, reference: Option<&Self::Node>) -> Result<(), Error>;

	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<(), Error>;

	/// Binds `handler` to `event` on `element`, replacing any handler previously bound for that event there.
	fn bind_event(&self, element: &Self::Node, event: &str, handler: Handler) -> Result<(), Error>;

	/// Unbinds the handler for `event` on `element`, if any.
	fn unbind_event(&self, element: &Self::Node, event: &str) -> Result<(), Error>;
}
