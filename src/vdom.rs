//! The immutable description of a desired tree shape, and its builder.
//!
//! Virtual nodes are created fresh on every render, shared through [`Rc`]
//! and never mutated afterwards except for the host back-reference slot,
//! which only the reconciler writes.

use crate::host::{Event, EventHandler};
use core::cell::RefCell;
use core::fmt;
use hashbrown::HashMap;
use std::rc::Rc;

/// A stable per-sibling identifier used to match list items across passes
/// independent of position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
	Text(String),
	Int(i64),
}

impl From<&str> for Key {
	fn from(text: &str) -> Self {
		Key::Text(text.to_owned())
	}
}

impl From<i64> for Key {
	fn from(number: i64) -> Self {
		Key::Int(number)
	}
}

/// An attribute value.
///
/// Attributes carry structural metadata (`key`), event bindings
/// ([`Value::Handler`]) and plain host attributes in one map, so the value
/// type is a tagged union over everything the property patcher dispatches on.
pub enum Value<R> {
	Null,
	Bool(bool),
	Int(i64),
	Text(String),
	Handler(EventHandler<R>),
}

impl<R> Value<R> {
	/// Wraps a callback for use as an event-binding attribute.
	pub fn handler(callback: impl Fn(&Event<R>) + 'static) -> Self {
		Value::Handler(Rc::new(callback))
	}

	/// `true` for the values that unbind an event handler and that never
	/// attach one: absent attributes are treated the same by the callers.
	pub(crate) fn is_falsy(&self) -> bool {
		matches!(self, Value::Null | Value::Bool(false))
	}

	/// The textual form written through `set_attribute`, if this value has
	/// one. `Null` and `Handler` don't materialize as host attributes.
	pub(crate) fn as_attribute_text(&self) -> Option<String> {
		match self {
			Value::Null | Value::Handler(_) => None,
			Value::Bool(flag) => Some(flag.to_string()),
			Value::Int(number) => Some(number.to_string()),
			Value::Text(text) => Some(text.clone()),
		}
	}
}

impl<R> Clone for Value<R> {
	fn clone(&self) -> Self {
		match self {
			Value::Null => Value::Null,
			Value::Bool(flag) => Value::Bool(*flag),
			Value::Int(number) => Value::Int(*number),
			Value::Text(text) => Value::Text(text.clone()),
			Value::Handler(handler) => Value::Handler(Rc::clone(handler)),
		}
	}
}

/// Handlers compare by identity: a render that passes the same `Rc` again
/// is a no-op, a fresh closure is a swap.
impl<R> PartialEq for Value<R> {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Value::Null, Value::Null) => true,
			(Value::Bool(a), Value::Bool(b)) => a == b,
			(Value::Int(a), Value::Int(b)) => a == b,
			(Value::Text(a), Value::Text(b)) => a == b,
			(Value::Handler(a), Value::Handler(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl<R> fmt::Debug for Value<R> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => f.write_str("Null"),
			Value::Bool(flag) => write!(f, "Bool({:?})", flag),
			Value::Int(number) => write!(f, "Int({:?})", number),
			Value::Text(text) => write!(f, "Text({:?})", text),
			Value::Handler(_) => f.write_str("Handler(..)"),
		}
	}
}

impl<R> From<&str> for Value<R> {
	fn from(text: &str) -> Self {
		Value::Text(text.to_owned())
	}
}

impl<R> From<String> for Value<R> {
	fn from(text: String) -> Self {
		Value::Text(text)
	}
}

impl<R> From<i64> for Value<R> {
	fn from(number: i64) -> Self {
		Value::Int(number)
	}
}

impl<R> From<bool> for Value<R> {
	fn from(flag: bool) -> Self {
		Value::Bool(flag)
	}
}

/// Attribute name → value. Insertion order is irrelevant.
pub type AttributeMap<R> = HashMap<String, Value<R>>;

/// Collects `(name, value)` pairs into an [`AttributeMap`].
pub fn attrs<R, N, I>(entries: I) -> AttributeMap<R>
where
	N: Into<String>,
	I: IntoIterator<Item = (N, Value<R>)>,
{
	entries.into_iter().map(|(name, value)| (name.into(), value)).collect()
}

/// A desired tree-shape node.
///
/// The two kinds have disjoint valid field sets, so they are separate
/// variants rather than one record with optional fields. `R` is the host
/// adapter's node handle; a freshly built tree has every host slot empty.
#[derive(Debug, PartialEq)]
pub enum VNode<R> {
	Element(ElementNode<R>),
	Text(TextNode<R>),
}

#[derive(Debug, PartialEq)]
pub struct ElementNode<R> {
	pub tag: String,
	pub attributes: AttributeMap<R>,
	pub children: Vec<Rc<VNode<R>>>,
	pub key: Option<Key>,
	host: RefCell<Option<R>>,
}

#[derive(Debug, PartialEq)]
pub struct TextNode<R> {
	pub text: String,
	pub key: Option<Key>,
	host: RefCell<Option<R>>,
}

impl<R> VNode<R> {
	/// A text node carrying `text` literally.
	pub fn text(text: impl Into<String>) -> Rc<Self> {
		Rc::new(VNode::Text(TextNode {
			text: text.into(),
			key: None,
			host: RefCell::new(None),
		}))
	}

	#[must_use]
	pub fn key(&self) -> Option<&Key> {
		match self {
			VNode::Element(element) => element.key.as_ref(),
			VNode::Text(text) => text.key.as_ref(),
		}
	}

	/// The host node currently realizing this virtual node, if it has been
	/// materialized or matched during a reconciliation pass.
	#[must_use]
	pub fn host(&self) -> Option<R>
	where
		R: Clone,
	{
		match self {
			VNode::Element(element) => element.host.borrow().clone(),
			VNode::Text(text) => text.host.borrow().clone(),
		}
	}

	pub(crate) fn set_host(&self, node: R) {
		let slot = match self {
			VNode::Element(element) => &element.host,
			VNode::Text(text) => &text.host,
		};
		*slot.borrow_mut() = Some(node);
	}

	/// Whether `other` describes the same kind of node with the same tag.
	/// Text payloads are *not* compared; two text nodes always patch.
	#[must_use]
	pub fn same_shape(&self, other: &Self) -> bool {
		match (self, other) {
			(VNode::Element(a), VNode::Element(b)) => a.tag == b.tag,
			(VNode::Text(_), VNode::Text(_)) => true,
			_ => false,
		}
	}
}

/// One entry of a builder child list: either an already built node or bare
/// text that [`build`] normalizes into a text node.
pub enum Child<R> {
	Node(Rc<VNode<R>>),
	Text(String),
}

impl<R> Child<R> {
	pub fn node(node: Rc<VNode<R>>) -> Self {
		Child::Node(node)
	}

	pub fn text(text: impl Into<String>) -> Self {
		Child::Text(text.into())
	}
}

impl<R> From<Rc<VNode<R>>> for Child<R> {
	fn from(node: Rc<VNode<R>>) -> Self {
		Child::Node(node)
	}
}

impl<R> From<&str> for Child<R> {
	fn from(text: &str) -> Self {
		Child::Text(text.to_owned())
	}
}

impl<R> From<String> for Child<R> {
	fn from(text: String) -> Self {
		Child::Text(text)
	}
}

/// Assembles an element node from a tag/attributes/children triple.
///
/// Pure: no host access, always succeeds. The node's key is lifted from
/// `attributes["key"]` (text and integer values only) while the entry stays
/// in the map; the property patcher knows to never materialize it.
pub fn build<R>(tag: impl Into<String>, attributes: AttributeMap<R>, children: impl IntoIterator<Item = Child<R>>) -> Rc<VNode<R>> {
	let key = match attributes.get("key") {
		Some(Value::Text(text)) => Some(Key::Text(text.clone())),
		Some(Value::Int(number)) => Some(Key::Int(*number)),
		_ => None,
	};

	let children = children
		.into_iter()
		.map(|child| match child {
			Child::Node(node) => node,
			Child::Text(text) => VNode::text(text),
		})
		.collect();

	Rc::new(VNode::Element(ElementNode {
		tag: tag.into(),
		attributes,
		children,
		key,
		host: RefCell::new(None),
	}))
}
