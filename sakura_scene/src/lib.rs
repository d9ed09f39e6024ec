pub mod class_db;
pub mod error;
pub mod node;
pub mod node_arena;
pub mod packed_scene;
pub mod signals;
pub mod tree;

pub use class_db::{ClassApi, ClassDB, ClassInfo};
pub use error::SceneError;
pub use node::SceneNode;
pub use node_arena::NodeArena;
pub use packed_scene::{PackedNodeEntry, PackedScene};
pub use signals::{EventCallback, RawCallback, SignalBus};
pub use tree::SceneTree;

#[cfg(test)]
mod tests {
    use super::*;
    use sakura_ids::NodeID;
    use sakura_variant::Variant;

    fn names(tree: &SceneTree, ids: &[NodeID]) -> Vec<String> {
        ids.iter()
            .map(|&id| tree.get(id).unwrap().name.to_string())
            .collect()
    }

    /// root
    ///   Main (Node2D, scene root)
    ///     A (Sprite2D)
    ///       A1 (Node)
    ///     B (Node)
    fn sample_tree() -> (SceneTree, NodeID) {
        let mut tree = SceneTree::new();
        let main = tree.create_node("Node2D", "Main");
        tree.add_child(tree.root(), main).unwrap();
        tree.get_mut(main).unwrap().scene_file_path = Some("res://main.scn".into());

        let a = tree.create_node("Sprite2D", "A");
        let a1 = tree.create_node("Node", "A1");
        let b = tree.create_node("Node", "B");
        tree.add_child(main, a).unwrap();
        tree.add_child(a, a1).unwrap();
        tree.add_child(main, b).unwrap();
        for id in [a, a1, b] {
            tree.get_mut(id).unwrap().owner = main;
        }
        tree.get_mut(a).unwrap().set("texture", "res://a.png");
        tree.get_mut(a).unwrap().add_to_group("enemies");
        (tree, main)
    }

    #[test]
    fn build_and_query_tree() {
        let (tree, main) = sample_tree();
        assert_eq!(names(&tree, tree.children(main)), ["A", "B"]);
        assert_eq!(tree.node_count(), 5);

        let a1 = tree.get_node("/root/Main/A/A1").unwrap();
        assert_eq!(tree.node_path(a1).as_deref(), Some("/root/Main/A/A1"));
        assert_eq!(tree.get_node("Main/A/A1"), Some(a1));
        assert_eq!(tree.get_node("Main/A/../B"), tree.find_node_by_name(main, "B"));
        assert_eq!(tree.get_node("/other/Main"), None);
        assert!(tree.is_inside_tree(a1));
    }

    #[test]
    fn add_child_rejects_cycles_and_double_parents() {
        let (mut tree, main) = sample_tree();
        let a = tree.get_node("Main/A").unwrap();
        assert!(matches!(
            tree.add_child(a, main),
            Err(SceneError::AlreadyParented(_))
        ));
        let outer = tree.create_node("Node", "Outer");
        let inner = tree.create_node("Node", "Inner");
        tree.add_child(outer, inner).unwrap();
        assert!(matches!(
            tree.add_child(inner, outer),
            Err(SceneError::CyclicParent { .. })
        ));
        assert!(!tree.is_inside_tree(outer));
    }

    #[test]
    fn replace_node_keeps_sibling_position() {
        let (mut tree, main) = sample_tree();
        let a = tree.get_node("Main/A").unwrap();
        let stand_in = tree.create_node("Node", "StandIn");

        tree.replace_node(a, stand_in, true).unwrap();
        assert_eq!(names(&tree, tree.children(main)), ["StandIn", "B"]);
        assert_eq!(tree.parent(stand_in), Some(main));
        assert_eq!(tree.get(stand_in).unwrap().owner, main);
        assert!(tree.get(stand_in).unwrap().is_in_group("enemies"));

        // The replaced node is detached but still owns its subtree.
        assert!(tree.is_live(a));
        assert!(!tree.is_inside_tree(a));
        assert_eq!(names(&tree, tree.children(a)), ["A1"]);
    }

    #[test]
    fn replace_node_can_swap_the_root() {
        let mut tree = SceneTree::new();
        let old_root = tree.root();
        let new_root = tree.create_node("Window", "root");
        tree.replace_node(old_root, new_root, false).unwrap();
        assert_eq!(tree.root(), new_root);
        assert!(tree.destroy(old_root).is_ok());
        assert!(matches!(tree.destroy(new_root), Err(SceneError::TreeRoot(_))));
    }

    #[test]
    fn destroy_frees_whole_subtree_and_ids_go_stale() {
        let (mut tree, main) = sample_tree();
        let a = tree.get_node("Main/A").unwrap();
        let a1 = tree.get_node("Main/A/A1").unwrap();
        assert_eq!(tree.destroy(a).unwrap(), 2);
        assert!(!tree.is_live(a));
        assert!(!tree.is_live(a1));
        assert_eq!(names(&tree, tree.children(main)), ["B"]);

        let reused = tree.create_node("Node", "Reused");
        assert_ne!(reused, a);
        assert!(tree.get(a).is_none());
    }

    #[test]
    fn duplicate_is_detached_deep_copy() {
        let (mut tree, main) = sample_tree();
        let a = tree.get_node("Main/A").unwrap();
        let copy = tree.duplicate(a).unwrap();

        assert_ne!(copy, a);
        assert_eq!(tree.parent(copy), None);
        assert_eq!(names(&tree, tree.children(copy)), ["A1"]);
        assert_eq!(
            tree.get(copy).unwrap().get("texture"),
            Some(&Variant::from("res://a.png"))
        );
        // Owner outside the copied subtree is kept as-is.
        assert_eq!(tree.get(copy).unwrap().owner, main);
        // Original is untouched.
        assert_eq!(names(&tree, tree.children(main)), ["A", "B"]);
    }

    #[test]
    fn is_class_follows_inheritance() {
        let (tree, main) = sample_tree();
        let classes = ClassDB::default();
        let a = tree.get_node("Main/A").unwrap();
        assert!(tree.is_class(a, "Sprite2D", &classes));
        assert!(tree.is_class(a, "Node2D", &classes));
        assert!(tree.is_class(a, "Node", &classes));
        assert!(!tree.is_class(main, "Sprite2D", &classes));
    }

    #[test]
    fn pack_and_instantiate_subtree() {
        let (mut tree, main) = sample_tree();
        let classes = ClassDB::default();

        let packed = PackedScene::pack(&tree, main).unwrap();
        assert_eq!(packed.nodes.len(), 4);
        assert_eq!(packed.root_name(), Some("Main"));
        assert_eq!(packed.classes(), ["Node2D", "Sprite2D", "Node"]);

        let bytes = packed.to_bytes().unwrap();
        let decoded = PackedScene::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, packed);

        let copy = decoded.instantiate(&mut tree, &classes).unwrap();
        assert_eq!(tree.parent(copy), None);
        assert_eq!(tree.dump(copy), tree.dump(main));
        assert_eq!(
            tree.get(copy).unwrap().scene_file_path.as_deref(),
            Some("res://main.scn")
        );
        let a_copy = tree.children(copy)[0];
        assert_eq!(tree.get(a_copy).unwrap().owner, copy);
        assert!(tree.get(a_copy).unwrap().is_in_group("enemies"));
    }

    #[test]
    fn instantiate_fails_cleanly_on_missing_class() {
        let mut tree = SceneTree::new();
        let mut classes = ClassDB::default();
        classes.register_extension("Player", "Node2D").unwrap();

        let player = tree.create_node("Player", "Hero");
        let packed = PackedScene::pack(&tree, player).unwrap();
        classes.unregister("Player").unwrap();

        let before = tree.node_count();
        assert!(matches!(
            packed.instantiate(&mut tree, &classes),
            Err(SceneError::UnknownClass(c)) if c == "Player"
        ));
        assert_eq!(tree.node_count(), before);
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        assert!(matches!(
            PackedScene::from_bytes(&[0xff, 0x01]),
            Err(SceneError::Decode(_))
        ));
        assert!(matches!(
            PackedScene::default().instantiate(&mut SceneTree::new(), &ClassDB::default()),
            Err(SceneError::EmptyPackedScene)
        ));
    }

    #[test]
    fn signals_are_dropped_with_their_node() {
        let (mut tree, _) = sample_tree();
        let b = tree.get_node("Main/B").unwrap();
        tree.connect_once(b, "tree_exited", EventCallback::new(|| {}))
            .unwrap();
        assert_eq!(tree.signals.connection_count(b, "tree_exited"), 1);
        tree.destroy(b).unwrap();
        assert_eq!(tree.signals.connection_count(b, "tree_exited"), 0);
        assert!(tree.connect_once(b, "x", EventCallback::new(|| {})).is_err());
    }
}
