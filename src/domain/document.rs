//! Checkpoint document rendering.

use crate::domain::collection::TreeCollection;

pub const DOCUMENT_HEADER: &str = "#NEXUS";
pub const BEGIN_TREES: &str = "Begin trees;";
pub const END_TREES: &str = "end;";

/// Render every tree, in collection order, as a NEXUS trees block.
///
/// The output parses back with [`TreeReader`](crate::domain::TreeReader) into
/// the same names and leaf orders.
pub fn render_document(trees: &TreeCollection) -> String {
    let mut out = String::new();
    out.push_str(DOCUMENT_HEADER);
    out.push_str("\n\n\n");
    out.push_str(BEGIN_TREES);
    out.push('\n');
    for tree in trees.iter() {
        out.push_str(&tree.render_text());
        out.push_str("\n\n\n");
    }
    out.push_str(END_TREES);
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arena::Topology as T;
    use crate::domain::parser::TreeReader;
    use crate::domain::tree::Tree;

    fn collection() -> TreeCollection {
        let mut trees = TreeCollection::new();
        trees
            .insert(Tree::new(
                "left",
                &T::group([T::leaf("A"), T::group([T::leaf("B"), T::leaf("C")])]),
            ))
            .unwrap();
        trees
            .insert(Tree::new(
                "right",
                &T::group([T::group([T::leaf("C"), T::leaf("B")]), T::leaf("A")]),
            ))
            .unwrap();
        trees
    }

    #[test]
    fn test_render_document_layout() {
        let doc = render_document(&collection());
        assert_eq!(
            doc,
            "#NEXUS\n\n\nBegin trees;\n\
             tree left = [&U] (A,(B,C));\n\n\n\
             tree right = [&U] ((C,B),A);\n\n\n\
             end;\n"
        );
    }

    #[test]
    fn test_rendered_document_reparses_to_live_leaf_order() {
        let mut trees = collection();
        trees.get_mut("left").unwrap().apply_twists(&[1, 1]);
        let expected: Vec<Vec<String>> = trees
            .leaf_orders()
            .into_iter()
            .map(|o| o.into_iter().map(String::from).collect())
            .collect();

        let records = TreeReader::new()
            .parse_document(&render_document(&trees))
            .unwrap();

        let reparsed: Vec<Vec<String>> = records
            .iter()
            .map(|r| {
                Tree::new(r.name.clone(), &r.topology)
                    .leaves()
                    .into_iter()
                    .map(String::from)
                    .collect()
            })
            .collect();
        assert_eq!(reparsed, expected);
        assert_eq!(records[0].name, "left");
        assert_eq!(records[1].name, "right");
    }
}
