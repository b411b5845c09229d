/// Limits of a [`Runtime`](`crate::Runtime`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
	/// Maximum nesting of elements and components in one pass.
	pub depth_limit: usize,
	/// Maximum number of passes in a row, if state keeps being set while rendering.
	pub pass_limit: usize,
}

impl Default for Config {
	fn default() -> Self {
		Self { depth_limit: 256, pass_limit: 64 }
	}
}

impl Config {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with_depth_limit(self, depth_limit: usize) -> Self {
		Self { depth_limit, ..self }
	}

	#[must_use]
	pub fn with_pass_limit(self, pass_limit: usize) -> Self {
		Self { pass_limit, ..self }
	}
}
