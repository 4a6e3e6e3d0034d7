use super::*;
use crate::compile::lookup::TextureRef;
use crate::graph::model::NodeRole;
use crate::layer::document::DocumentNode;

fn leaf(id: u32, name: &str) -> DocumentNode {
    DocumentNode {
        id,
        name: name.into(),
        opacity: 1.0,
        visible: true,
        ..DocumentNode::default()
    }
}

fn tree() -> DocumentTree {
    let mut folder = leaf(3, "folder");
    folder.kind = Some("GROUP".into());
    folder.children = vec![leaf(4, "inside")];
    DocumentTree {
        canvas: Canvas {
            width: 64,
            height: 32,
        },
        layers: vec![leaf(1, "top"), leaf(2, "middle"), folder],
    }
}

/// In-memory source with a scripted revision and optional failure.
struct Scripted {
    tree: DocumentTree,
    revision: Option<u64>,
    fail: bool,
}

impl Scripted {
    fn new(tree: DocumentTree) -> Self {
        Self {
            tree,
            revision: None,
            fail: false,
        }
    }
}

impl DocumentSource for Scripted {
    fn read_document(&mut self, _path: &Path) -> anyhow::Result<DocumentSnapshot> {
        if self.fail {
            anyhow::bail!("document is locked");
        }
        Ok(self.tree.clone().into())
    }

    fn revision(&self, _path: &Path) -> Option<u64> {
        self.revision
    }
}

fn hit(_index: usize, r: &LayerRecord, mask: bool) -> Option<TextureRef> {
    Some(TextureRef::new(format!("{}{}", if mask { "m" } else { "c" }, r.id)))
}

fn miss(_index: usize, _r: &LayerRecord, _mask: bool) -> Option<TextureRef> {
    None
}

fn session() -> SyncSession {
    SyncSession::new("doc.json", SyncSessionOpts::default())
}

fn gate_of(session: &SyncSession, id: u32) -> Option<f32> {
    session
        .graph()?
        .nodes_for_layer(LayerId(id))
        .find(|(_, n)| n.role == NodeRole::OpacityGate)
        .and_then(|(_, n)| n.scalar_default(1))
}

#[test]
fn first_sync_rebuilds() {
    let mut s = session();
    let mut src = Scripted::new(tree());
    let outcome = s.sync(&mut src, &hit).unwrap();

    let nodes = s.graph().unwrap().len();
    assert_eq!(outcome, SyncOutcome::Rebuilt { nodes });
    assert_eq!(s.layers().len(), 4);
    assert_eq!(s.canvas().width, 64);
    assert_eq!(s.phase(), SyncPhase::Idle);
}

#[test]
fn unchanged_document_patches_nothing() {
    let mut s = session();
    let mut src = Scripted::new(tree());
    s.sync(&mut src, &hit).unwrap();
    let before = s.graph().cloned();

    let outcome = s.sync(&mut src, &hit).unwrap();
    assert_eq!(outcome, SyncOutcome::Patched(PatchReport::default()));
    assert_eq!(s.graph().cloned(), before);
}

#[test]
fn value_edit_is_patched_in_place() {
    let mut s = session();
    let mut src = Scripted::new(tree());
    s.sync(&mut src, &hit).unwrap();

    src.tree.layers[1].opacity = 0.25;
    let outcome = s.sync(&mut src, &hit).unwrap();
    assert_eq!(
        outcome,
        SyncOutcome::Patched(PatchReport {
            changed: 1,
            signature_mismatch: false
        })
    );
    assert_eq!(gate_of(&s, 2), Some(0.25));
}

#[test]
fn structural_edit_rebuilds() {
    let mut s = session();
    let mut src = Scripted::new(tree());
    s.sync(&mut src, &hit).unwrap();
    let before = s.graph().unwrap().len();

    src.tree.layers.push(leaf(5, "bottom"));
    let outcome = s.sync(&mut src, &hit).unwrap();
    let SyncOutcome::Rebuilt { nodes } = outcome else {
        panic!("expected a rebuild, got {outcome:?}");
    };
    assert!(nodes > before);
    assert_eq!(s.layers().len(), 5);
}

#[test]
fn placeholders_force_a_rebuild_unless_disabled() {
    let mut s = session();
    let mut src = Scripted::new(tree());
    s.sync(&mut src, &miss).unwrap();
    assert!(s.graph().unwrap().placeholder_count() > 0);

    let again = s.sync(&mut src, &hit).unwrap();
    assert!(matches!(again, SyncOutcome::Rebuilt { .. }));
    assert_eq!(s.graph().unwrap().placeholder_count(), 0);

    let mut lazy = SyncSession::new(
        "doc.json",
        SyncSessionOpts {
            rebuild_on_placeholders: false,
            ..SyncSessionOpts::default()
        },
    );
    lazy.sync(&mut src, &miss).unwrap();
    let outcome = lazy.sync(&mut src, &hit).unwrap();
    assert!(matches!(outcome, SyncOutcome::Patched(_)));
    assert!(lazy.graph().unwrap().placeholder_count() > 0);
}

#[test]
fn read_failure_keeps_previous_state() {
    let mut s = session();
    let mut src = Scripted::new(tree());
    s.sync(&mut src, &hit).unwrap();
    let graph = s.graph().cloned();
    let layers = s.layers().clone();

    src.fail = true;
    src.tree.layers.pop();
    let err = s.sync(&mut src, &hit).unwrap_err();
    assert!(matches!(err, PsdGraphError::Document(_)), "{err}");
    assert!(err.to_string().contains("document is locked"));
    assert_eq!(s.graph().cloned(), graph);
    assert_eq!(s.layers(), &layers);
    assert_eq!(s.phase(), SyncPhase::Idle);
}

#[test]
fn empty_document_is_an_error() {
    let mut s = session();
    let mut src = Scripted::new(DocumentTree::default());
    let err = s.sync(&mut src, &hit).unwrap_err();
    assert!(matches!(err, PsdGraphError::Document(_)));
    assert!(s.graph().is_none());
}

#[test]
fn invalid_records_are_rejected_without_swapping() {
    let mut s = session();
    let mut src = Scripted::new(tree());
    s.sync(&mut src, &hit).unwrap();

    src.tree.layers[0].opacity = 1.5;
    let err = s.sync(&mut src, &hit).unwrap_err();
    assert!(matches!(err, PsdGraphError::Validation(_)));
    assert_eq!(gate_of(&s, 1), Some(1.0));
}

#[test]
fn overrides_survive_a_sync() {
    let mut s = session();
    let mut src = Scripted::new(tree());
    s.sync(&mut src, &hit).unwrap();

    assert!(s.set_visibility_override(LayerId(2), VisibilityOverride::ForceHide));
    assert!(!s.set_visibility_override(LayerId(42), VisibilityOverride::ForceHide));

    let outcome = s.sync(&mut src, &hit).unwrap();
    assert!(matches!(outcome, SyncOutcome::Patched(r) if r.changed == 1));
    let pos = s.layers().position_of(LayerId(2)).unwrap();
    assert_eq!(
        s.layers().get(pos).unwrap().visibility_override,
        VisibilityOverride::ForceHide
    );
    assert_eq!(gate_of(&s, 2), Some(0.0));
}

#[test]
fn update_values_applies_overrides_without_reading() {
    let mut s = session();
    assert!(matches!(s.update_values(), Err(PsdGraphError::Sync(_))));

    let mut src = Scripted::new(tree());
    s.sync(&mut src, &hit).unwrap();
    s.set_visibility_override(LayerId(1), VisibilityOverride::ForceHide);
    let report = s.update_values().unwrap();
    assert_eq!(report.changed, 1);
    assert_eq!(gate_of(&s, 1), Some(0.0));
}

#[test]
fn selection_follows_ids() {
    let mut s = session();
    let mut src = Scripted::new(tree());
    s.sync(&mut src, &hit).unwrap();

    assert!(!s.select(LayerId(42)));
    assert!(s.select(LayerId(2)));
    assert_eq!(s.selected().map(|(i, r)| (i, r.name.as_str())), Some((1, "middle")));

    src.tree.layers.remove(0);
    s.sync(&mut src, &hit).unwrap();
    assert_eq!(s.selected().map(|(i, _)| i), Some(0));

    src.tree.layers.remove(0);
    s.sync(&mut src, &hit).unwrap();
    assert!(s.selected().is_none());
}

#[test]
fn sync_refuses_to_reenter() {
    let mut s = session();
    let mut src = Scripted::new(tree());
    s.phase = SyncPhase::FullRebuild;
    let err = s.sync(&mut src, &hit).unwrap_err();
    assert!(matches!(err, PsdGraphError::Sync(_)));
    assert!(s.graph().is_none());
}

#[test]
fn tick_runs_only_pending_syncs() {
    let mut s = session();
    let mut src = Scripted::new(tree());
    assert_eq!(s.tick(&mut src, &hit).unwrap(), None);

    src.revision = Some(7);
    assert!(s.poll(&src));
    assert!(matches!(
        s.tick(&mut src, &hit).unwrap(),
        Some(SyncOutcome::Rebuilt { .. })
    ));
    assert!(!s.poll(&src));
    assert_eq!(s.tick(&mut src, &hit).unwrap(), None);

    s.request_sync();
    assert!(matches!(
        s.tick(&mut src, &hit).unwrap(),
        Some(SyncOutcome::Patched(_))
    ));

    s.close();
    s.request_sync();
    src.revision = Some(8);
    assert!(!s.poll(&src));
    assert_eq!(s.tick(&mut src, &hit).unwrap(), None);
}

#[test]
fn json_source_reads_snapshots_from_disk() {
    let dir = std::env::temp_dir().join(format!("psdgraph-sync-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("doc.json");
    std::fs::write(&path, serde_json::to_string(&tree()).unwrap()).unwrap();

    let mut src = JsonDocumentSource;
    assert!(src.revision(&path).is_some());
    let snapshot = src.read_document(&path).unwrap();
    assert_eq!(snapshot.records.len(), 4);
    assert_eq!(snapshot.records[3].path_hint, "folder/inside");

    let missing = src.read_document(&dir.join("absent.json")).unwrap_err();
    assert!(format!("{missing:#}").contains("absent.json"));
    assert!(src.revision(&dir.join("absent.json")).is_none());

    std::fs::remove_dir_all(&dir).unwrap();
}
