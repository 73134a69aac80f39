use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// 按声明的字符集把 HTML 字节解码为字符串，未知字符集按 UTF-8 处理
pub fn decode_html(data: &[u8], document_encoding: &str) -> String {
    match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => {
            let (string, _, _) = encoding.decode(data);
            string.into_owned()
        }
        None => String::from_utf8_lossy(data).into_owned(),
    }
}

/// 将 HTML 字符串解析为 DOM
pub fn parse_html(markup: &str) -> RcDom {
    parse_document(RcDom::default(), Default::default()).one(markup)
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: Vec<&str>) -> Vec<Handle> {
    let mut found_nodes = Vec::new();
    let Some(&node_name) = node_names.first() else {
        return found_nodes;
    };

    if node_names.len() == 1 {
        if get_node_name(node) == Some(node_name) {
            found_nodes.push(node.clone());
        }

        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    } else if get_node_name(node) == Some(node_name) {
        let mut new_node_names = node_names;
        new_node_names.remove(0);
        found_nodes.append(&mut find_nodes(node, new_node_names));
    } else {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    }

    found_nodes
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 获取父节点
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    // Cell 只能 take，读完要放回去
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 设置节点属性
pub fn set_node_attr(node: &Handle, attr_name: &str, attr_value: Option<String>) {
    use html5ever::interface::{Attribute, QualName};
    use html5ever::tendril::format_tendril;
    use html5ever::{namespace_url, ns, LocalName};

    if let NodeData::Element { attrs, .. } = &node.data {
        let attrs_mut = &mut attrs.borrow_mut();
        let mut i = 0;
        let mut found_existing_attr: bool = false;

        while i < attrs_mut.len() {
            if &attrs_mut[i].name.local == attr_name {
                found_existing_attr = true;

                if let Some(attr_value) = attr_value.as_deref() {
                    attrs_mut[i].value.clear();
                    attrs_mut[i].value.push_slice(attr_value);
                } else {
                    // Remove attr completely if attr_value is not defined
                    attrs_mut.remove(i);
                    continue;
                }
            }

            i += 1;
        }

        if !found_existing_attr {
            // Add new attribute (since originally the target node didn't have it)
            if let Some(attr_value) = attr_value {
                let name = LocalName::from(attr_name);

                attrs_mut.push(Attribute {
                    name: QualName::new(None, ns!(), name),
                    value: format_tendril!("{}", attr_value),
                });
            }
        }
    };
}

/// 元素子节点（跳过文本与注释）
pub fn element_children(node: &Handle) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .filter(|child| matches!(child.data, NodeData::Element { .. }))
        .cloned()
        .collect()
}

/// 按文档顺序列出所有后代节点（不含自身）
pub fn descendants(node: &Handle) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut stack: Vec<Handle> = node.children.borrow().iter().rev().cloned().collect();

    while let Some(current) = stack.pop() {
        stack.extend(current.children.borrow().iter().rev().cloned());
        found.push(current);
    }

    found
}

/// 节点的纯文本内容
pub fn text_content(node: &Handle) -> String {
    let mut text = String::new();
    if let NodeData::Text { contents } = &node.data {
        text.push_str(&contents.borrow());
    }
    for descendant in descendants(node) {
        if let NodeData::Text { contents } = &descendant.data {
            text.push_str(&contents.borrow());
        }
    }
    text
}

/// 替换文本节点的内容
pub fn set_text(node: &Handle, value: &str) {
    if let NodeData::Text { contents } = &node.data {
        let mut content_ref = contents.borrow_mut();
        content_ref.clear();
        content_ref.push_slice(value);
    }
}

/// 把节点从父节点中摘除
pub fn remove_node(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// 用一段 HTML 替换节点的全部子节点
pub fn set_inner_html(node: &Handle, markup: &str) {
    let fragment = parse_html(&format!("<body>{}</body>", markup));

    for child in node.children.take() {
        child.parent.set(None);
    }

    // 先把子节点从临时文档中摘出，临时文档析构时不会再碰到它们
    if let Some(body) = find_nodes(&fragment.document, vec!["html", "body"]).first() {
        for child in body.children.take() {
            child.parent.set(Some(Rc::downgrade(node)));
            node.children.borrow_mut().push(child);
        }
    }
}
