//! Render roots and pass scheduling.
//!
//! Each mount point gets one root. A root re-reconciles its stored description whenever it is invalidated:
//!
//! - outside of handlers, each state update runs one pass right away,
//! - inside a bound handler, all updates are coalesced into one pass after the handler returns,
//! - updates made while a pass is running queue exactly one follow-up pass, which runs once the current pass completes.
//!
//! There is no partial re-render. Every pass walks the whole tree from the root description.

use crate::{config::Config, diff::Differ, hooks::Schedule, node::Node, surface::Surface, Error};
use core::{
	cell::{Cell, RefCell},
	fmt,
};
use std::rc::{Rc, Weak};
use tracing::{error, info, instrument, trace, trace_span, warn};

pub(crate) struct Root<S: Surface> {
	mount_point: S::Node,
	description: RefCell<Option<Node>>,
	differ: RefCell<Differ<S>>,
	pass_limit: usize,
	dirty: Cell<bool>,
	rendering: Cell<bool>,
	batch_depth: Cell<usize>,
	passes: Cell<u64>,
	last_error: RefCell<Option<Error>>,
}

impl<S: Surface + 'static> Root<S> {
	fn new(surface: S, mount_point: S::Node, config: &Config) -> Rc<Self> {
		Rc::new_cyclic(|this: &Weak<Self>| {
			let schedule: Weak<dyn Schedule> = this.clone();
			Self {
				mount_point,
				description: RefCell::new(None),
				differ: RefCell::new(Differ::new(surface, schedule, config)),
				pass_limit: config.pass_limit,
				dirty: Cell::new(false),
				rendering: Cell::new(false),
				batch_depth: Cell::new(0),
				passes: Cell::new(0),
				last_error: RefCell::new(None),
			}
		})
	}

	fn set_description(&self, description: Node) -> Result<(), Error> {
		*self.description.borrow_mut() = Some(description);
		self.dirty.set(true);
		if self.rendering.get() {
			trace!("A pass is running. The new description is picked up by the follow-up pass.");
			return Ok(());
		}
		self.run()
	}

	/// Runs passes until the root is clean.
	fn run(&self) -> Result<(), Error> {
		let _rendering = RenderingGuard::enter(&self.rendering);

		let mut consecutive = 0;
		while self.dirty.replace(false) {
			consecutive += 1;
			if consecutive > self.pass_limit {
				error!("Pass limit reached. State is being set during every render.");
				return Err(Error::PassLimit(self.pass_limit));
			}
			if consecutive > 1 {
				trace!("Running follow-up pass #{}.", consecutive - 1);
			}

			let description = match self.description.borrow().clone() {
				Some(description) => description,
				None => return Ok(()),
			};

			let span = trace_span!("Render pass", pass = self.passes.get() + 1);
			let _enter = span.enter();
			self.differ.borrow_mut().update(&self.mount_point, &description)?;
			self.passes.set(self.passes.get() + 1);
		}
		Ok(())
	}

	/// Runs pending passes for an invalidation that didn't come from [`Runtime::render`], so nobody can receive the error.
	fn run_detached(&self) {
		if let Err(error) = self.run() {
			error!("Render pass failed: {}", error);
			if let Some(previous) = self.last_error.replace(Some(error)) {
				warn!("Dropping earlier unobserved render error: {}", previous)
			}
		}
	}
}

impl<S: Surface + 'static> Schedule for Root<S> {
	fn invalidate(&self) {
		self.dirty.set(true);
		if self.rendering.get() {
			trace!("Queued follow-up pass.");
		} else if self.batch_depth.get() > 0 {
			trace!("Deferred pass until the end of the batch.");
		} else {
			self.run_detached()
		}
	}

	fn batch(&self, f: &mut dyn FnMut()) {
		{
			let _batch = BatchGuard::enter(&self.batch_depth);
			f();
		}
		if self.batch_depth.get() == 0 && self.dirty.get() && !self.rendering.get() {
			self.run_detached()
		}
	}
}

/// Resets the flag even if a component panics, so later events still render.
struct RenderingGuard<'a>(&'a Cell<bool>);
impl<'a> RenderingGuard<'a> {
	fn enter(rendering: &'a Cell<bool>) -> Self {
		rendering.set(true);
		Self(rendering)
	}
}
impl Drop for RenderingGuard<'_> {
	fn drop(&mut self) {
		self.0.set(false)
	}
}

struct BatchGuard<'a>(&'a Cell<usize>);
impl<'a> BatchGuard<'a> {
	fn enter(depth: &'a Cell<usize>) -> Self {
		depth.set(depth.get() + 1);
		Self(depth)
	}
}
impl Drop for BatchGuard<'_> {
	fn drop(&mut self) {
		self.0.set(self.0.get() - 1)
	}
}

/// Owns the render roots of one display surface.
///
/// Each distinct mount point is an independent root: trees mounted into disjoint regions don't re-render each other.
pub struct Runtime<S: Surface> {
	surface: S,
	config: Config,
	roots: RefCell<Vec<Rc<Root<S>>>>,
}

impl<S: Surface + Clone + 'static> Runtime<S> {
	#[must_use]
	pub fn new(surface: S) -> Self {
		Self::with_config(surface, Config::default())
	}

	#[must_use]
	pub fn with_config(surface: S, config: Config) -> Self {
		Self {
			surface,
			config,
			roots: RefCell::new(Vec::new()),
		}
	}

	#[must_use]
	pub fn surface(&self) -> &S {
		&self.surface
	}

	#[must_use]
	pub fn config(&self) -> &Config {
		&self.config
	}

	/// Renders `description` into `mount_point`.
	///
	/// The first call for a mount point appends the materialization to it. Later calls for the same mount point update
	/// the existing materialization in place, and state setters re-render the most recent description.
	///
	/// # Errors
	///
	/// Fails if a component misuses hooks, if a prop is malformed, if a limit of the [`Config`] is exceeded or if the surface reports an error.
	/// Changes made before the failure are not rolled back.
	#[instrument(skip(self, description))]
	pub fn render(&self, description: Node, mount_point: &S::Node) -> Result<Mount<S>, Error> {
		let existing = self.roots.borrow().iter().find(|root| root.mount_point == *mount_point).cloned();
		let root = match existing {
			Some(root) => {
				trace!("Updating existing root.");
				root
			}
			None => {
				info!("Mounting new root.");
				let root = Root::new(self.surface.clone(), mount_point.clone(), &self.config);
				self.roots.borrow_mut().push(Rc::clone(&root));
				root
			}
		};

		root.set_description(description)?;
		Ok(Mount(root))
	}

	/// The roots mounted so far.
	#[must_use]
	pub fn mounts(&self) -> Vec<Mount<S>> {
		self.roots.borrow().iter().cloned().map(Mount).collect()
	}
}

impl<S: Surface> fmt::Debug for Runtime<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Runtime")
			.field("config", &self.config)
			.field("roots", &self.roots.borrow().len())
			.finish_non_exhaustive()
	}
}

/// A handle to the root of one mount point.
pub struct Mount<S: Surface>(Rc<Root<S>>);

impl<S: Surface> Clone for Mount<S> {
	fn clone(&self) -> Self {
		Self(Rc::clone(&self.0))
	}
}

impl<S: Surface> Mount<S> {
	#[must_use]
	pub fn mount_point(&self) -> &S::Node {
		&self.0.mount_point
	}

	/// Number of completed render passes of this root.
	#[must_use]
	pub fn pass_count(&self) -> u64 {
		self.0.passes.get()
	}

	/// The component instances currently mounted.
	#[must_use]
	pub fn instance_count(&self) -> usize {
		self.0.differ.borrow().instance_count()
	}

	/// Takes the error of the last failed pass that was triggered by a state update rather than by [`Runtime::render`].
	#[must_use]
	pub fn take_error(&self) -> Option<Error> {
		self.0.last_error.borrow_mut().take()
	}
}

impl<S: Surface> fmt::Debug for Mount<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Mount")
			.field("mount_point", &self.0.mount_point)
			.field("passes", &self.0.passes.get())
			.finish_non_exhaustive()
	}
}
