//! Constructs virtual trees from existing host nodes.
//!
//! This is the reverse direction of [`crate::diff`]: instead of pushing a
//! description into the host, it reads a live subtree back out, so content
//! that was rendered elsewhere (server-side, a previous session, a template)
//! can be patched in place rather than thrown away and rebuilt.

use crate::host::HostTreeReader;
use crate::vdom::{attrs, build, Child, VNode, Value};
use std::rc::Rc;

/// Reads the host subtree rooted at `node` into a virtual tree.
///
/// Every virtual node is stamped with the host reference it was read from,
/// so the result is immediately usable as a previous tree (see
/// [`crate::diff::TreeDiffer::adopt`]). Attribute values come back as text;
/// event bindings cannot be recovered from a host tree and are absent.
pub fn load_node<H: HostTreeReader>(host: &H, node: &H::NodeRef) -> Rc<VNode<H::NodeRef>> {
	let loaded = match host.node_tag(node) {
		None => VNode::text(host.node_text(node).unwrap_or_default()),
		Some(tag) => {
			let attributes = attrs(
				host.node_attributes(node)
					.into_iter()
					.map(|(name, value)| (name, Value::Text(value))),
			);
			let children = host
				.node_children(node)
				.into_iter()
				.map(|child| Child::Node(load_node(host, &child)))
				.collect::<Vec<_>>();
			build(tag, attributes, children)
		}
	};
	loaded.set_host(node.clone());
	loaded
}
