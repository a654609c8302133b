//! The reconciliation engine: node-level diffing, attribute patching and
//! keyed child-list reconciliation.
//!
//! A pass is a plain recursive tree walk. It either completes or degrades
//! locally: recoverable faults are reported through `tracing` and the
//! affected subtree is left as it was, never torn down. The next pass starts
//! fresh from whatever state the host tree is in.

use crate::handlers::HandlerTable;
use crate::host::{EventHandler, HostTree, HostTreeReader};
use crate::load;
use crate::vdom::{ElementNode, Key, VNode, Value};
use core::fmt;
use hashbrown::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;
use tracing::{error, trace, trace_span, warn};

/// Stateful properties whose live host value can drift from the recorded
/// attribute between passes (user input), so change detection must read the
/// host, not the old virtual tree.
const CONTROLLED_PROPERTIES: [&str; 3] = ["value", "checked", "selected"];

/// Returned by [`TreeDiffer::render`] when the pass could not start.
///
/// Everything that can go wrong *during* a pass degrades to a reported
/// no-op for the affected subtree instead of surfacing here.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
	/// The anchor node has no parent in the host tree. Nothing was mutated.
	#[error("render anchor is not attached to a parent in the host tree")]
	DetachedAnchor,
}

/// Reconciles virtual trees against the host tree it owns.
///
/// One differ owns one host adapter, the per-element handler table and the
/// single trampoline listener shared by every event binding it registers.
pub struct TreeDiffer<H: HostTree> {
	host: H,
	handlers: HandlerTable<H::NodeRef>,
	trampoline: EventHandler<H::NodeRef>,
}

impl<H: HostTree> fmt::Debug for TreeDiffer<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TreeDiffer").field("active_handlers", &self.handlers.active_count()).finish_non_exhaustive()
	}
}

impl<H: HostTree> TreeDiffer<H> {
	#[must_use]
	pub fn new(host: H) -> Self {
		let handlers = HandlerTable::new();
		let trampoline = handlers.trampoline();
		Self { host, handlers, trampoline }
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.host
	}

	pub fn host_mut(&mut self) -> &mut H {
		&mut self.host
	}

	#[must_use]
	pub fn into_host(self) -> H {
		self.host
	}

	/// Runs one reconciliation pass against `anchor`.
	///
	/// The first render materializes `tree` immediately before the anchor;
	/// later renders retrieve the previously stashed tree from the anchor
	/// and patch the live tree in place. To take over content that was not
	/// rendered by this differ, see [`TreeDiffer::adopt`].
	///
	/// # Errors
	///
	/// [`RenderError::DetachedAnchor`] if `anchor` has no parent; the host
	/// is untouched in that case.
	pub fn render(&mut self, anchor: &H::NodeRef, tree: Rc<VNode<H::NodeRef>>) -> Result<(), RenderError> {
		let span = trace_span!("render", anchor = ?anchor);
		let _enter = span.enter();

		let parent = self.host.parent(anchor).ok_or(RenderError::DetachedAnchor)?;
		let previous = self.host.previous_tree(anchor);
		let current = match &previous {
			// A missing host ref here is the mid-patch invariant breach;
			// reconcile reports it and skips the node's patch step.
			Some(previous_tree) => previous_tree.host(),
			None => Some(anchor.clone()),
		};

		self.reconcile(&parent, current, previous.as_ref(), &tree);
		self.host.set_previous_tree(anchor, tree);

		trace!(active_handlers = self.handlers.active_count(), "Reconciliation pass complete.");
		Ok(())
	}

	/// Stores a virtual tree loaded from the live host subtree at `node` as
	/// its previous tree, so the next [`render`](TreeDiffer::render) patches
	/// the existing content instead of rebuilding it.
	pub fn adopt(&mut self, node: &H::NodeRef)
	where
		H: HostTreeReader,
	{
		let loaded = load::load_node(&self.host, node);
		self.host.set_previous_tree(node, loaded);
	}

	/// Node-level state machine. Exactly one branch executes per call; the
	/// returned handle is the host node now realizing `new`, or `None` when
	/// the step had to be skipped.
	fn reconcile(
		&mut self,
		parent: &H::NodeRef,
		current: Option<H::NodeRef>,
		old: Option<&Rc<VNode<H::NodeRef>>>,
		new: &Rc<VNode<H::NodeRef>>,
	) -> Option<H::NodeRef> {
		if let Some(old_node) = old {
			if Rc::ptr_eq(old_node, new) {
				trace!("Identical virtual nodes, nothing to do.");
				return current;
			}
		}

		let produced = match (old.map(Rc::as_ref), new.as_ref()) {
			(Some(VNode::Text(prior)), VNode::Text(next)) => match current {
				Some(node) => {
					if prior.text != next.text {
						self.host.set_text(&node, &next.text);
					}
					Some(node)
				}
				None => {
					error!("Text node {:?} has no live host reference; leaving it untouched.", prior.text);
					None
				}
			},

			(Some(VNode::Element(prior)), VNode::Element(next)) if prior.tag == next.tag => match current {
				Some(node) => {
					self.update_attributes(&node, prior, next);
					self.reconcile_children(&node, &prior.children, &next.children);
					Some(node)
				}
				None => {
					error!("Element <{}> has no live host reference; skipping its patch.", next.tag);
					None
				}
			},

			// No old counterpart, a text/element transition or an element
			// tag change: build fresh, insert in position, then drop the
			// old subtree.
			_ => {
				let built = self.materialize(new);
				self.host.insert_before(parent, &built, current.as_ref());
				if let Some(old_node) = old {
					self.release_handlers(old_node);
					match old_node.host() {
						Some(prior_host) => self.host.remove_child(parent, &prior_host),
						None => warn!("Replaced node has no live host reference; nothing to remove."),
					}
				}
				Some(built)
			}
		};

		if let Some(node) = &produced {
			new.set_host(node.clone());
			self.host.set_previous_tree(node, Rc::clone(new));
		}
		produced
	}

	/// Builds a host subtree for a virtual tree that has no old counterpart,
	/// stamping host references and back-references as nodes are created.
	fn materialize(&mut self, vnode: &Rc<VNode<H::NodeRef>>) -> H::NodeRef {
		let node = match vnode.as_ref() {
			VNode::Text(text) => self.host.create_text(&text.text),
			VNode::Element(element) => {
				let node = self.host.create_element(&element.tag);
				for (name, value) in &element.attributes {
					self.patch_attribute(&node, name, None, Some(value));
				}
				node
			}
		};

		vnode.set_host(node.clone());
		self.host.set_previous_tree(&node, Rc::clone(vnode));

		if let VNode::Element(element) = vnode.as_ref() {
			for child in &element.children {
				let built = self.materialize(child);
				self.host.append_child(&node, &built);
			}
		}
		node
	}

	/// Visits the union of old and new attribute names, so names removed in
	/// the new tree are seen with an absent new value.
	fn update_attributes(&mut self, node: &H::NodeRef, prior: &ElementNode<H::NodeRef>, next: &ElementNode<H::NodeRef>) {
		let mut names: Vec<&str> = prior.attributes.keys().map(String::as_str).collect();
		for name in next.attributes.keys() {
			if !prior.attributes.contains_key(name) {
				names.push(name);
			}
		}

		for name in names {
			let recorded = prior.attributes.get(name);
			let requested = next.attributes.get(name);

			if CONTROLLED_PROPERTIES.contains(&name) {
				let live = self.host.property(node, name);
				if live != requested.and_then(Value::as_attribute_text) {
					self.patch_attribute(node, name, recorded, requested);
				}
				continue;
			}

			if recorded != requested {
				self.patch_attribute(node, name, recorded, requested);
			}
		}
	}

	/// Applies one attribute difference to the host: structural metadata is
	/// inert, event bindings go through the handler table, everything else
	/// is a plain attribute write or removal.
	fn patch_attribute(&mut self, node: &H::NodeRef, name: &str, old: Option<&Value<H::NodeRef>>, new: Option<&Value<H::NodeRef>>) {
		if name == "key" {
			return;
		}
		if let Some(event) = event_name(name) {
			return self.patch_event_binding(node, &event, old, new);
		}
		match new {
			None | Some(Value::Null) => self.host.remove_attribute(node, name),
			Some(value) => match value.as_attribute_text() {
				Some(text) => self.host.set_attribute(node, name, &text),
				None => {
					warn!("Attribute {:?} holds a handler but is not an event binding; removing it from the host.", name);
					self.host.remove_attribute(node, name);
				}
			},
		}
	}

	fn patch_event_binding(&mut self, node: &H::NodeRef, event: &str, old: Option<&Value<H::NodeRef>>, new: Option<&Value<H::NodeRef>>) {
		match new {
			Some(Value::Handler(handler)) => {
				self.handlers.install(node, event, Rc::clone(handler));
				// A swap only updates the table; the trampoline keeps
				// dispatching to whatever is stored there.
				if !matches!(old, Some(Value::Handler(_))) {
					self.host.add_event_listener(node, event, Rc::clone(&self.trampoline));
				}
			}
			_ => {
				if let Some(value) = new {
					if !value.is_falsy() {
						warn!("Event binding {:?} expects a handler, found {:?}; unbinding instead.", event, value);
					}
				}
				self.handlers.remove(node, event);
				if matches!(old, Some(Value::Handler(_))) {
					self.host.remove_event_listener(node, event, &self.trampoline);
				}
			}
		}
	}

	/// Ordered child-list diffing with optional per-item stable keys.
	///
	/// Unkeyed children pair strictly by position; keys take precedence over
	/// position as soon as either side has one. Matched keyed children are
	/// patched through their existing host node and moved in front of the
	/// next unconsumed old sibling when they aren't already there.
	fn reconcile_children(&mut self, parent: &H::NodeRef, old_children: &[Rc<VNode<H::NodeRef>>], new_children: &[Rc<VNode<H::NodeRef>>]) {
		let span = trace_span!("reconcile_children", old = old_children.len(), new = new_children.len());
		let _enter = span.enter();

		let mut keyed_old: HashMap<Key, Rc<VNode<H::NodeRef>>> = HashMap::new();
		for child in old_children {
			if let Some(key) = child.key() {
				if keyed_old.insert(key.clone(), Rc::clone(child)).is_some() {
					warn!("Duplicate key {:?} among old siblings; keeping the last occurrence.", key);
				}
			}
		}

		let mut rendered: HashSet<Key> = HashSet::new();
		let mut oi = 0;
		let mut ni = 0;

		while ni < new_children.len() {
			let old_child = old_children.get(oi);

			// Old children consumed out of order by an earlier keyed match.
			if let Some(key) = old_child.and_then(|child| child.key()) {
				if rendered.contains(key) {
					oi += 1;
					continue;
				}
			}

			let new_child = &new_children[ni];
			match new_child.key().cloned() {
				None => match old_child {
					Some(prior) if prior.key().is_none() => {
						self.reconcile(parent, prior.host(), Some(prior), new_child);
						oi += 1;
						ni += 1;
					}
					// The keyed old child at this position belongs
					// elsewhere; look for a later positional candidate.
					Some(_) => oi += 1,
					None => {
						self.reconcile(parent, None, None, new_child);
						ni += 1;
					}
				},
				Some(key) => {
					let anchor = next_unconsumed_host(old_children, oi, &rendered);
					match keyed_old.get(&key).cloned() {
						Some(matched) => {
							let placed = self.reconcile(parent, matched.host(), Some(&matched), new_child);
							if let Some(node) = placed {
								// Implicit move: reuse the host node, but
								// put it where the cursor is.
								if anchor.as_ref() != Some(&node) {
									self.host.insert_before(parent, &node, anchor.as_ref());
								}
							}
						}
						None => {
							// Pure insertion at the cursor position.
							self.reconcile(parent, anchor, None, new_child);
						}
					}
					rendered.insert(key);
					ni += 1;
				}
			}
		}

		// Unkeyed leftovers go by trailing position.
		while oi < old_children.len() {
			let leftover = &old_children[oi];
			oi += 1;
			if leftover.key().is_some() {
				continue;
			}
			self.release_handlers(leftover);
			match leftover.host() {
				Some(node) => self.host.remove_child(parent, &node),
				None => warn!("Unkeyed leftover child has no live host reference; nothing to remove."),
			}
		}

		// Keyed leftovers are removed through their own host references.
		for (key, leftover) in keyed_old {
			if rendered.contains(&key) {
				continue;
			}
			trace!("Removing keyed leftover {:?}.", key);
			self.release_handlers(&leftover);
			match leftover.host() {
				Some(node) => self.host.remove_child(parent, &node),
				None => warn!("Keyed leftover {:?} has no live host reference; nothing to remove.", key),
			}
		}
	}

	/// Drops handler-table entries for a whole subtree that is leaving the
	/// host tree. The host-side listeners leave with their nodes; only the
	/// table must not keep dispatch targets alive.
	fn release_handlers(&mut self, vnode: &VNode<H::NodeRef>) {
		if let VNode::Element(element) = vnode {
			if let Some(node) = vnode.host() {
				self.handlers.release_node(&node);
			}
			for child in &element.children {
				self.release_handlers(child);
			}
		}
	}
}

/// The event name bound by an attribute, if the attribute is an event
/// binding: an ASCII case-insensitive `on` prefix with a non-empty
/// remainder, which is lowercased.
fn event_name(attribute: &str) -> Option<String> {
	let rest = attribute.get(..2).filter(|prefix| prefix.eq_ignore_ascii_case("on")).and_then(|_| attribute.get(2..))?;
	if rest.is_empty() {
		return None;
	}
	Some(rest.to_ascii_lowercase())
}

/// Host node of the first old child at or after `from` that has not been
/// consumed by a keyed match: the node currently sitting where the cursor
/// points, used as the insertion/move reference.
fn next_unconsumed_host<R: Clone>(old_children: &[Rc<VNode<R>>], from: usize, rendered: &HashSet<Key>) -> Option<R> {
	old_children
		.iter()
		.skip(from)
		.find(|child| match child.key() {
			Some(key) => !rendered.contains(key),
			None => true,
		})
		.and_then(|child| child.host())
}
