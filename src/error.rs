use thiserror::Error;

/// Everything that can abort a render pass.
///
/// None of these are retried. Hook and prop errors are caller bugs; surface errors are forwarded from the host.
#[derive(Debug, Error)]
pub enum Error {
	/// A component called [`Scope::use_state`](`crate::Scope::use_state`) a different number of times than during its first render.
	#[error("`{component}` used {found} state hook(s), but {expected} on its first render. Hook calls must happen in the same order on every render.")]
	HookCount { component: &'static str, expected: usize, found: usize },

	/// A hook slot was read back as a different type than it was created with, which means the call order changed.
	#[error("State hook #{index} of `{component}` does not hold a `{requested}`. Hook calls must happen in the same order on every render.")]
	HookType { component: &'static str, index: usize, requested: &'static str },

	#[error("Malformed prop {name:?} on <{tag}>: {reason}")]
	MalformedProp { tag: String, name: String, reason: &'static str },

	#[error("Depth limit ({0}) reached while rendering")]
	DepthLimit(usize),

	/// State kept changing during rendering, so follow-up passes never settled.
	#[error("Pass limit ({0}) reached: state was set during each of that many consecutive render passes")]
	PassLimit(usize),

	#[error("Display surface error: {0}")]
	Surface(String),

	/// The arena has no record where the previous pass left one. This points to an earlier aborted pass.
	#[error("No mounted record at {0:?}")]
	MissingRecord(Vec<usize>),
}
