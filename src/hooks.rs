//! Per-instance hook state.
//!
//! A component instance owns an ordered list of slots. The *n*th [`Scope::use_state`] call of each render reads the *n*th slot,
//! so a component must call its hooks in the same order on every render.
//! The renderer detects a changed hook count or a slot read back as a different type and fails the pass.

use crate::{
	node::{Child, Props},
	Error,
};
use core::{
	any::{type_name, Any},
	cell::{Cell, RefCell},
	fmt,
};
use std::rc::{Rc, Weak};
use tracing::{trace, warn};

/// Implemented by render roots. Setters and bound handlers only ever see this.
pub(crate) trait Schedule {
	/// Marks the root dirty and runs a pass unless one is already running or a batch is open.
	fn invalidate(&self);

	/// Runs `f` with passes deferred until it returns, then runs at most one pass.
	fn batch(&self, f: &mut dyn FnMut());
}

/// The hook slots of one component instance.
#[derive(Default)]
pub(crate) struct HookSlots {
	cells: RefCell<Vec<Rc<dyn Any>>>,
	/// Hook count of the first complete render.
	sealed: Cell<Option<usize>>,
}

impl HookSlots {
	pub(crate) fn len(&self) -> usize {
		self.cells.borrow().len()
	}
}

impl fmt::Debug for HookSlots {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("HookSlots").field("len", &self.len()).field("sealed", &self.sealed.get()).finish()
	}
}

/// The explicit context of one component invocation.
///
/// Only exists while the renderer runs the component, so hooks can't be used anywhere else.
pub struct Scope<'a> {
	component: &'static str,
	props: &'a Props,
	children: &'a [Child],
	slots: &'a HookSlots,
	schedule: &'a Weak<dyn Schedule>,
	cursor: usize,
	violation: Option<Error>,
}

impl<'a> Scope<'a> {
	pub(crate) fn new(component: &'static str, props: &'a Props, children: &'a [Child], slots: &'a HookSlots, schedule: &'a Weak<dyn Schedule>) -> Self {
		Self {
			component,
			props,
			children,
			slots,
			schedule,
			cursor: 0,
			violation: None,
		}
	}

	#[must_use]
	pub fn props(&self) -> &'a Props {
		self.props
	}

	#[must_use]
	pub fn children(&self) -> &'a [Child] {
		self.children
	}

	/// Returns the current value of the next state slot and its setter.
	///
	/// `initial` is only used the first time this instance renders.
	pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, SetState<T>) {
		self.use_state_with(move || initial)
	}

	/// Like [`Scope::use_state`], but only computes the initial value if the slot is new.
	pub fn use_state_with<T: Clone + 'static>(&mut self, initial: impl FnOnce() -> T) -> (T, SetState<T>) {
		let index = self.cursor;
		self.cursor += 1;

		let existing = self.slots.cells.borrow().get(index).cloned();
		let cell = match existing {
			Some(existing) => match existing.downcast::<RefCell<T>>() {
				Ok(cell) => cell,
				Err(_) => {
					warn!(component = self.component, index, "State hook slot type changed. Reinitializing it.");
					self.violate(Error::HookType {
						component: self.component,
						index,
						requested: type_name::<T>(),
					});
					let cell = Rc::new(RefCell::new(initial()));
					self.slots.cells.borrow_mut()[index] = cell.clone() as Rc<dyn Any>;
					cell
				}
			},
			None => {
				if let Some(expected) = self.slots.sealed.get() {
					self.violate(Error::HookCount {
						component: self.component,
						expected,
						found: index + 1,
					});
				}
				trace!(component = self.component, index, "Allocating state hook slot.");
				let cell = Rc::new(RefCell::new(initial()));
				self.slots.cells.borrow_mut().push(cell.clone());
				cell
			}
		};

		let value = cell.borrow().clone();
		(
			value,
			SetState {
				cell: Rc::downgrade(&cell),
				schedule: self.schedule.clone(),
			},
		)
	}

	fn violate(&mut self, error: Error) {
		if self.violation.is_none() {
			self.violation = Some(error)
		}
	}

	/// Checks the hook count against the first render, or records it if this was the first render.
	pub(crate) fn finish(self) -> Result<(), Error> {
		if let Some(violation) = self.violation {
			return Err(violation);
		}
		match self.slots.sealed.get() {
			None => {
				self.slots.sealed.set(Some(self.cursor));
				Ok(())
			}
			Some(expected) if expected == self.cursor => Ok(()),
			Some(expected) => Err(Error::HookCount {
				component: self.component,
				expected,
				found: self.cursor,
			}),
		}
	}
}

impl fmt::Debug for Scope<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Scope")
			.field("component", &self.component)
			.field("props", self.props)
			.field("cursor", &self.cursor)
			.finish_non_exhaustive()
	}
}

/// Replaces the value of one state slot and schedules a render pass of the whole tree it belongs to.
///
/// There's no bail-out for unchanged values. Inside event handlers, all calls are coalesced into one pass.
/// Setters of torn-down component instances do nothing.
pub struct SetState<T> {
	cell: Weak<RefCell<T>>,
	schedule: Weak<dyn Schedule>,
}

impl<T> Clone for SetState<T> {
	fn clone(&self) -> Self {
		Self {
			cell: self.cell.clone(),
			schedule: self.schedule.clone(),
		}
	}
}

impl<T> fmt::Debug for SetState<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SetState")
			.field("type", &type_name::<T>())
			.field("live", &(self.cell.strong_count() > 0))
			.finish()
	}
}

impl<T: 'static> SetState<T> {
	pub fn set(&self, value: T) {
		self.update(move |_| value)
	}

	/// Computes the new value from the one currently stored, which may already include earlier updates from the same handler.
	pub fn update(&self, f: impl FnOnce(&T) -> T) {
		let cell = match self.cell.upgrade() {
			Some(cell) => cell,
			None => return trace!("Ignoring state update of a discarded component instance."),
		};

		let next = f(&*cell.borrow());
		*cell.borrow_mut() = next;

		match self.schedule.upgrade() {
			Some(schedule) => schedule.invalidate(),
			None => trace!("Render root is gone. Not scheduling a pass."),
		}
	}
}
