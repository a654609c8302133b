//! The boundary between the differ and whatever actually stores the tree.
//!
//! The differ never touches a concrete node type. It speaks to the host
//! exclusively through [`HostTree`], and the host hands out opaque
//! [`HostTree::NodeRef`] handles in return. Handles are non-owning: cloning
//! or dropping one never affects the node it names.

use crate::vdom::VNode;
use core::fmt::Debug;
use core::hash::Hash;
use std::rc::Rc;

/// An event as delivered by the host to a registered listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event<R> {
	/// Lowercase event name, e.g. `"click"` or `"input"`.
	pub name: String,
	/// The host node the listener was registered on.
	pub target: R,
}

/// A shared event callback.
///
/// The same type serves both as the application-supplied handler stored in
/// attribute values and as the listener the differ registers with the host.
/// The differ only ever registers its single trampoline (see
/// [`crate::diff::TreeDiffer`]), so handler swaps never reach the host.
pub type EventHandler<R> = Rc<dyn Fn(&Event<R>)>;

/// Primitive tree operations the reconciler needs from a host environment.
///
/// Implementations are expected to be infallible for well-formed calls; the
/// differ guarantees it only names nodes it created or was handed.
///
/// `insert_before` must carry move semantics like the DOM's
/// ***insertBefore***: inserting a node that is already attached detaches it
/// from its old position first. The keyed child reconciler relies on this to
/// reorder host nodes in a single operation.
pub trait HostTree {
	/// Opaque, cheaply clonable node handle.
	type NodeRef: Clone + Eq + Hash + Debug + 'static;

	fn create_element(&mut self, tag: &str) -> Self::NodeRef;
	fn create_text(&mut self, text: &str) -> Self::NodeRef;

	fn set_attribute(&mut self, node: &Self::NodeRef, name: &str, value: &str);
	fn remove_attribute(&mut self, node: &Self::NodeRef, name: &str);

	fn add_event_listener(&mut self, node: &Self::NodeRef, event: &str, listener: EventHandler<Self::NodeRef>);
	fn remove_event_listener(&mut self, node: &Self::NodeRef, event: &str, listener: &EventHandler<Self::NodeRef>);

	/// `reference == None` appends at the end of `parent`'s child list.
	fn insert_before(&mut self, parent: &Self::NodeRef, node: &Self::NodeRef, reference: Option<&Self::NodeRef>);
	fn append_child(&mut self, parent: &Self::NodeRef, child: &Self::NodeRef);
	fn remove_child(&mut self, parent: &Self::NodeRef, child: &Self::NodeRef);

	fn set_text(&mut self, node: &Self::NodeRef, text: &str);

	/// The node's parent, or `None` for a detached node.
	fn parent(&self, node: &Self::NodeRef) -> Option<Self::NodeRef>;

	/// Live value of a stateful property (`value`, `checked`, `selected`).
	///
	/// User interaction can change these between passes without any render,
	/// so the property patcher compares against this instead of the old
	/// virtual tree's recorded attribute.
	fn property(&self, node: &Self::NodeRef, name: &str) -> Option<String>;

	/// The virtual tree most recently reconciled against this node.
	///
	/// This is a back-reference slot, not an ownership relationship:
	/// replacing it is a plain reassignment.
	fn previous_tree(&self, node: &Self::NodeRef) -> Option<Rc<VNode<Self::NodeRef>>>;
	fn set_previous_tree(&mut self, node: &Self::NodeRef, tree: Rc<VNode<Self::NodeRef>>);
}

/// Read-only introspection of an existing host tree.
///
/// Only needed by [`crate::load`]; hosts that never adopt pre-rendered
/// content don't have to implement it.
pub trait HostTreeReader: HostTree {
	/// The element tag, or `None` for a text node.
	fn node_tag(&self, node: &Self::NodeRef) -> Option<String>;
	/// The text payload, or `None` for an element node.
	fn node_text(&self, node: &Self::NodeRef) -> Option<String>;
	fn node_attributes(&self, node: &Self::NodeRef) -> Vec<(String, String)>;
	fn node_children(&self, node: &Self::NodeRef) -> Vec<Self::NodeRef>;
}
