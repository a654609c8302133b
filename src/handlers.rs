//! Per-element event handler storage behind a single stable trampoline.
//!
//! The host only ever sees one listener per `(element, event)` pair: the
//! trampoline. It forwards to whatever handler is currently stored here, so
//! swapping a handler on re-render is a plain table write and never touches
//! host listener registration.

use crate::host::{Event, EventHandler};
use core::cell::RefCell;
use core::fmt::Debug;
use core::hash::Hash;
use hashbrown::HashMap;
use std::rc::Rc;
use tracing::warn;

pub struct HandlerTable<R>(Rc<RefCell<HashMap<R, HashMap<String, EventHandler<R>>>>>);

impl<R> Clone for HandlerTable<R> {
	fn clone(&self) -> Self {
		HandlerTable(Rc::clone(&self.0))
	}
}

impl<R> Default for HandlerTable<R> {
	fn default() -> Self {
		HandlerTable(Rc::new(RefCell::new(HashMap::new())))
	}
}

impl<R> HandlerTable<R>
where
	R: Clone + Eq + Hash + Debug + 'static,
{
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// The single stable listener to register with the host. Dispatches to
	/// the handler stored for the firing `(target, event)` pair at call
	/// time, not at registration time.
	#[must_use]
	pub fn trampoline(&self) -> EventHandler<R> {
		let table = self.clone();
		Rc::new(move |event: &Event<R>| table.dispatch(event))
	}

	pub fn install(&self, node: &R, event: &str, handler: EventHandler<R>) {
		self.0.borrow_mut().entry(node.clone()).or_default().insert(event.to_owned(), handler);
	}

	pub fn remove(&self, node: &R, event: &str) {
		let mut table = self.0.borrow_mut();
		let now_empty = match table.get_mut(node) {
			Some(events) => {
				events.remove(event);
				events.is_empty()
			}
			None => false,
		};
		if now_empty {
			table.remove(node);
		}
	}

	/// Drops every handler stored for a host node that is leaving the tree.
	pub fn release_node(&self, node: &R) {
		self.0.borrow_mut().remove(node);
	}

	pub fn dispatch(&self, event: &Event<R>) {
		// Clone the handler out first: it may re-render and re-enter the table.
		let handler = {
			let table = self.0.borrow();
			table.get(&event.target).and_then(|events| events.get(&event.name)).cloned()
		};
		match handler {
			Some(handler) => handler(event),
			None => warn!("Event {:?} fired on {:?} with no handler in the table.", event.name, event.target),
		}
	}

	#[must_use]
	pub fn active_count(&self) -> usize {
		self.0.borrow().values().map(HashMap::len).sum()
	}
}
