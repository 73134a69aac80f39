use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use markup5ever_rcdom::{Handle, SerializableHandle};

/// 序列化节点本身（outer HTML）
pub fn serialize_node(node: &Handle) -> String {
    String::from_utf8_lossy(&serialize_with_scope(node, TraversalScope::IncludeNode)).into_owned()
}

/// 序列化节点的全部子节点（inner HTML）
pub fn serialize_children(node: &Handle) -> String {
    String::from_utf8_lossy(&serialize_with_scope(node, TraversalScope::ChildrenOnly(None)))
        .into_owned()
}

fn serialize_with_scope(node: &Handle, traversal_scope: TraversalScope) -> Vec<u8> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };

    // Writing into a Vec<u8> cannot fail
    if let Err(error) = serialize(&mut buf, &serializable, opts) {
        tracing::error!("DOM 序列化失败: {}", error);
    }

    buf
}
