//! ASCII rendering of the feature forest.

use std::collections::HashSet;

use crate::models::FeatureTreeNode;

const ENABLED: char = '●';
const DISABLED: char = '○';

/// Render a feature forest, marking each feature as effectively enabled or not.
///
/// Example output:
/// ```text
/// ● Billing (#1)
/// ├── ● Invoices (#2)
/// └── ○ Refunds (#3)
/// ○ Reporting (#4)
/// ```
pub fn render_tree(nodes: &[FeatureTreeNode], enabled: &HashSet<i64>) -> String {
    let mut output = String::new();
    for node in nodes {
        render_node(&mut output, node, enabled, "", None);
    }
    output
}

/// `is_last` is `None` for roots, which are drawn without branch characters.
fn render_node(
    output: &mut String,
    node: &FeatureTreeNode,
    enabled: &HashSet<i64>,
    prefix: &str,
    is_last: Option<bool>,
) {
    let symbol = if enabled.contains(&node.feature.id) {
        ENABLED
    } else {
        DISABLED
    };

    output.push_str(prefix);
    match is_last {
        Some(true) => output.push_str("└── "),
        Some(false) => output.push_str("├── "),
        None => {}
    }
    output.push_str(&format!("{} {} (#{})\n", symbol, node.feature.name, node.feature.id));

    let child_prefix = match is_last {
        None => String::new(),
        Some(true) => format!("{}    ", prefix),
        Some(false) => format!("{}│   ", prefix),
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, enabled, &child_prefix, Some(child_is_last));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Feature;
    use chrono::Utc;

    fn node(id: i64, name: &str, children: Vec<FeatureTreeNode>) -> FeatureTreeNode {
        FeatureTreeNode {
            feature: Feature {
                id,
                name: name.to_string(),
                parent_id: None,
                groups_where_enabled: Vec::new(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            children,
        }
    }

    #[test]
    fn renders_roots_without_branches() {
        let tree = vec![node(1, "Billing", vec![]), node(2, "Reporting", vec![])];
        let output = render_tree(&tree, &HashSet::from([1]));
        assert_eq!(output, "● Billing (#1)\n○ Reporting (#2)\n");
    }

    #[test]
    fn renders_nested_children_with_branches() {
        let tree = vec![node(
            1,
            "Billing",
            vec![
                node(2, "Invoices", vec![node(4, "Export", vec![])]),
                node(3, "Refunds", vec![]),
            ],
        )];

        let output = render_tree(&tree, &HashSet::from([1, 2]));

        assert_eq!(
            output,
            "● Billing (#1)\n\
             ├── ● Invoices (#2)\n\
             │   └── ○ Export (#4)\n\
             └── ○ Refunds (#3)\n"
        );
    }

    #[test]
    fn renders_empty_forest_as_empty_string() {
        assert_eq!(render_tree(&[], &HashSet::new()), "");
    }
}
