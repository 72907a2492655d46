use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use super::{AnchorTable, AnchorTableStore};
use crate::error::{PlacementError, Result};
use crate::object::{Lifecycle, ModelCatalog, ObjectId, PlaceableObject, PlacedObject};
use crate::scene::{NodeId, SceneGraph};
use crate::tracking::{AnchorEvent, AnchorId, AnchorUpdate, TrackingSession, WorldAnchor};
use spatial_placement_geometry::Transform;

/// Owns every placed object and its binding to world anchors.
///
/// Objects move between three states: anchored, pending an anchor, and
/// moving. The drift sweep detaches anchored objects that were pushed away
/// from their anchor; the settle sweep re-anchors moving objects once they
/// stop. The anchored set is what [`save`](Self::save) writes to disk.
pub struct AnchorManager {
    session: Arc<dyn TrackingSession>,
    store: AnchorTableStore,
    drift_threshold: f32,
    objects: BTreeMap<ObjectId, PlacedObject>,
    /// Anchored and pending objects by anchor
    bindings: HashMap<AnchorId, ObjectId>,
    world_anchors: HashMap<AnchorId, WorldAnchor>,
    /// Loaded entries not yet resurfaced by the session
    persisted: AnchorTable,
    next_object_id: u64,
}

impl AnchorManager {
    pub fn new(
        session: Arc<dyn TrackingSession>,
        store: AnchorTableStore,
        drift_threshold: f32,
    ) -> Self {
        Self {
            session,
            store,
            drift_threshold,
            objects: BTreeMap::new(),
            bindings: HashMap::new(),
            world_anchors: HashMap::new(),
            persisted: AnchorTable::new(),
            next_object_id: 1,
        }
    }

    pub fn store(&self) -> &AnchorTableStore {
        &self.store
    }

    /// Reads the persisted table; failures leave it empty.
    pub fn load(&mut self) {
        self.persisted = self.store.load();
        info!(
            entries = self.persisted.len(),
            "Waiting for persisted anchors to resurface"
        );
    }

    /// Overwrites the durable table with the current anchored set.
    pub fn save(&self) {
        let table = self.anchor_table();
        match self.store.save(&table) {
            Ok(()) => info!(entries = table.len(), "Anchor table saved"),
            Err(err) => warn!(error = %err, "Failed to save anchor table"),
        }
    }

    /// Anchor to model file key for every anchored object
    pub fn anchor_table(&self) -> AnchorTable {
        self.objects
            .values()
            .filter_map(|object| match object.lifecycle() {
                Lifecycle::Anchored(anchor) => {
                    Some((anchor, object.descriptor().file_name.clone()))
                }
                _ => None,
            })
            .collect()
    }

    /// Loaded entries whose anchors have not been reported yet
    pub fn persisted_entries(&self) -> &AnchorTable {
        &self.persisted
    }

    pub fn world_anchor(&self, id: &AnchorId) -> Option<&WorldAnchor> {
        self.world_anchors.get(id)
    }

    fn allocate_id(&mut self) -> ObjectId {
        let id = ObjectId::new(self.next_object_id);
        self.next_object_id += 1;
        id
    }

    /// Materializes `placeable` at `pose` and requests an anchor for it.
    ///
    /// A rejected request discards the new object and yields `None`.
    pub async fn place_new_object(
        &mut self,
        placeable: &PlaceableObject,
        pose: Transform,
        scene: &mut dyn SceneGraph,
    ) -> Result<Option<AnchorId>> {
        let id = self.allocate_id();
        let object = placeable.materialize(id, pose, scene)?;
        self.objects.insert(id, object);

        match self.request_anchor(id).await {
            Ok(anchor) => Ok(Some(anchor)),
            Err(err) => {
                warn!(object = %id, error = %err, "Anchor request rejected, discarding object");
                if let Some(object) = self.objects.remove(&id) {
                    object.remove_from_scene(scene);
                }
                Ok(None)
            }
        }
    }

    /// Submits an anchor at the object's current pose and marks it pending.
    async fn request_anchor(&mut self, id: ObjectId) -> Result<AnchorId> {
        let transform = self
            .objects
            .get(&id)
            .map(PlacedObject::transform)
            .ok_or(PlacementError::UnknownObject(id))?;

        let anchor = self.session.request_anchor_add(transform).await?;
        if let Some(object) = self.objects.get_mut(&id) {
            object.lifecycle = Lifecycle::PendingAnchor(anchor);
            self.bindings.insert(anchor, id);
            debug!(object = %id, anchor = %anchor, "Anchor requested");
        }
        Ok(anchor)
    }

    /// Applies one world-anchor update. Orphan cleanup is spawned on the
    /// current Tokio runtime.
    pub fn process(
        &mut self,
        update: AnchorUpdate<WorldAnchor>,
        catalog: &ModelCatalog,
        scene: &mut dyn SceneGraph,
    ) -> Result<()> {
        let AnchorUpdate { anchor, event } = update;
        let id = anchor.id;

        if event == AnchorEvent::Removed {
            self.world_anchors.remove(&id);
            if let Some(object_id) = self.bindings.remove(&id) {
                if let Some(object) = self.objects.remove(&object_id) {
                    info!(object = %object_id, anchor = %id, "Anchor removed, dropping object");
                    object.remove_from_scene(scene);
                }
            }
            return Ok(());
        }

        self.world_anchors.insert(id, anchor.clone());

        if event == AnchorEvent::Added {
            match self.bindings.get(&id).copied() {
                Some(object_id) => {
                    if let Some(object) = self.objects.get_mut(&object_id) {
                        if object.lifecycle == Lifecycle::PendingAnchor(id) {
                            object.lifecycle = Lifecycle::Anchored(id);
                            info!(object = %object_id, anchor = %id, "Object anchored");
                        }
                    }
                }
                None => match self.persisted.remove(&id) {
                    Some(file_name) => self.restore(&anchor, file_name, catalog, scene)?,
                    None => {
                        spawn_anchor_removal(&self.session, id, "orphaned");
                        return Ok(());
                    }
                },
            }
        }

        if let Some(object) = self
            .bindings
            .get(&id)
            .and_then(|object_id| self.objects.get_mut(object_id))
        {
            if object.lifecycle == Lifecycle::Anchored(id) {
                object.set_pose(anchor.transform.position, anchor.transform.rotation, scene);
                object.set_visible(anchor.tracked, scene);
            }
        }
        Ok(())
    }

    fn restore(
        &mut self,
        anchor: &WorldAnchor,
        file_name: String,
        catalog: &ModelCatalog,
        scene: &mut dyn SceneGraph,
    ) -> Result<()> {
        let Some(placeable) = catalog.get(&file_name) else {
            warn!(anchor = %anchor.id, model = %file_name, "Persisted model is not in the catalog");
            self.persisted.insert(anchor.id, file_name);
            return Ok(());
        };

        let object_id = self.allocate_id();
        let mut object = placeable.materialize(object_id, anchor.transform, scene)?;
        object.lifecycle = Lifecycle::Anchored(anchor.id);
        self.objects.insert(object_id, object);
        self.bindings.insert(anchor.id, object_id);
        info!(object = %object_id, anchor = %anchor.id, model = %file_name, "Restored persisted object");
        Ok(())
    }

    /// Detaches anchored objects that drifted away from their anchor.
    /// Returns how many objects started moving. Anchor teardown is spawned on
    /// the current Tokio runtime.
    pub fn detach_drifted_objects(&mut self) -> usize {
        let mut detached = 0;
        for object in self.objects.values_mut() {
            let Lifecycle::Anchored(anchor_id) = object.lifecycle else {
                continue;
            };

            match self.world_anchors.get(&anchor_id) {
                None => {
                    debug!(object = %object.id(), anchor = %anchor_id, "Anchor no longer tracked");
                    object.mark_moving();
                    self.bindings.remove(&anchor_id);
                    detached += 1;
                }
                Some(anchor) => {
                    let drift = object.position().distance(&anchor.transform.position);
                    if drift >= self.drift_threshold {
                        debug!(object = %object.id(), anchor = %anchor_id, drift, "Object drifted, detaching");
                        object.mark_moving();
                        self.bindings.remove(&anchor_id);
                        self.world_anchors.remove(&anchor_id);
                        spawn_anchor_removal(&self.session, anchor_id, "drifted");
                        detached += 1;
                    }
                }
            }
        }
        detached
    }

    /// Requests anchors for moving objects that stopped since the last sweep.
    /// Returns how many requests were accepted.
    pub async fn reanchor_settled_objects(&mut self) -> usize {
        let candidates: Vec<ObjectId> = self
            .objects
            .values()
            .filter(|object| object.lifecycle == Lifecycle::Moving && !object.is_dragged())
            .map(PlacedObject::id)
            .collect();

        let mut requested = 0;
        for id in candidates {
            let Some(object) = self.objects.get_mut(&id) else {
                continue;
            };
            let current = object.position();
            let last = object.last_checked_position.unwrap_or(current);
            object.last_checked_position = Some(current);
            if current.distance(&last) >= self.drift_threshold {
                continue;
            }

            object.at_rest = true;
            match self.request_anchor(id).await {
                Ok(_) => requested += 1,
                Err(err) => {
                    warn!(object = %id, error = %err, "Re-anchoring failed, retrying on next sweep")
                }
            }
        }
        requested
    }

    /// Deletes one object and its anchor, whatever state it is in.
    pub async fn remove_object(&mut self, id: ObjectId, scene: &mut dyn SceneGraph) -> Result<()> {
        let object = self
            .objects
            .remove(&id)
            .ok_or(PlacementError::UnknownObject(id))?;

        if let Some(anchor) = object.lifecycle().anchor() {
            self.bindings.remove(&anchor);
            if let Err(err) = self.session.request_anchor_remove(anchor).await {
                warn!(anchor = %anchor, error = %err, "Failed to remove world anchor");
            }
        }
        object.remove_from_scene(scene);
        info!(object = %id, "Object removed");
        Ok(())
    }

    pub async fn remove_all_objects(&mut self, scene: &mut dyn SceneGraph) -> usize {
        let ids: Vec<ObjectId> = self.objects.keys().copied().collect();
        let mut removed = 0;
        for id in ids {
            if self.remove_object(id, scene).await.is_ok() {
                removed += 1;
            }
        }
        removed
    }

    pub fn object(&self, id: ObjectId) -> Option<&PlacedObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut PlacedObject> {
        self.objects.get_mut(&id)
    }

    /// Object owning `node`, either as its root or as its UI origin
    pub fn object_for_node(&self, node: NodeId) -> Option<ObjectId> {
        self.objects
            .values()
            .find(|object| object.node() == node || object.ui_origin() == node)
            .map(PlacedObject::id)
    }

    pub fn lifecycle(&self, id: ObjectId) -> Option<Lifecycle> {
        self.objects.get(&id).map(PlacedObject::lifecycle)
    }

    pub fn objects(&self) -> impl Iterator<Item = &PlacedObject> {
        self.objects.values()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Fire-and-forget anchor removal on the current Tokio runtime; a failure is
/// only logged. Outside a runtime the removal is skipped.
fn spawn_anchor_removal(session: &Arc<dyn TrackingSession>, id: AnchorId, reason: &'static str) {
    let Ok(runtime) = Handle::try_current() else {
        warn!(anchor = %id, reason, "No runtime to remove world anchor on, skipping");
        return;
    };
    debug!(anchor = %id, reason, "Removing world anchor");
    let session = Arc::clone(session);
    runtime.spawn(async move {
        if let Err(err) = session.request_anchor_remove(id).await {
            warn!(anchor = %id, reason, error = %err, "Failed to remove world anchor");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_catalog, FakeScene, FakeTrackingSession};
    use spatial_placement_geometry::{Point3D, Quaternion};
    use tempfile::{tempdir, TempDir};

    const THRESHOLD: f32 = 0.001;

    struct Fixture {
        _dir: TempDir,
        session: Arc<FakeTrackingSession>,
        scene: FakeScene,
        catalog: ModelCatalog,
        manager: AnchorManager,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let session = Arc::new(FakeTrackingSession::new());
        let mut scene = FakeScene::new();
        let catalog = sample_catalog(&mut scene, &["Pillow", "Stool"]);
        let store = AnchorTableStore::new(dir.path().join("anchors.json"));
        let manager = AnchorManager::new(session.clone(), store, THRESHOLD);
        Fixture {
            _dir: dir,
            session,
            scene,
            catalog,
            manager,
        }
    }

    fn world_anchor(id: AnchorId, position: Point3D, tracked: bool) -> WorldAnchor {
        WorldAnchor {
            id,
            transform: Transform::from_position(position),
            tracked,
        }
    }

    async fn run_spawned_tasks() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    /// Places a pillow at `position` and confirms its anchor.
    async fn anchored_pillow(f: &mut Fixture, position: Point3D) -> (ObjectId, AnchorId) {
        let placeable = f.catalog.get("Pillow").unwrap();
        let anchor = f
            .manager
            .place_new_object(placeable, Transform::from_position(position), &mut f.scene)
            .await
            .unwrap()
            .unwrap();
        f.manager
            .process(
                AnchorUpdate::added(world_anchor(anchor, position, true)),
                &f.catalog,
                &mut f.scene,
            )
            .unwrap();
        let object = f.manager.objects().next().map(PlacedObject::id).unwrap();
        (object, anchor)
    }

    #[tokio::test]
    async fn placement_waits_for_added_event() {
        let mut f = fixture();
        let placeable = f.catalog.get("Pillow").unwrap();
        let anchor = f
            .manager
            .place_new_object(placeable, Transform::IDENTITY, &mut f.scene)
            .await
            .unwrap()
            .unwrap();

        let object = f.manager.objects().next().unwrap();
        assert_eq!(object.lifecycle(), Lifecycle::PendingAnchor(anchor));
        assert!(!f.scene.is_enabled(object.node()));
        let id = object.id();

        f.manager
            .process(
                AnchorUpdate::added(world_anchor(anchor, Point3D::ORIGIN, true)),
                &f.catalog,
                &mut f.scene,
            )
            .unwrap();

        let object = f.manager.object(id).unwrap();
        assert_eq!(object.lifecycle(), Lifecycle::Anchored(anchor));
        assert!(f.scene.is_enabled(object.node()));
        assert_eq!(f.session.add_requests().len(), 1);
    }

    #[tokio::test]
    async fn rejected_placement_discards_object() {
        let mut f = fixture();
        f.session.set_reject_adds(true);
        let nodes_before = f.scene.node_count();
        let placeable = f.catalog.get("Pillow").unwrap();

        let anchor = f
            .manager
            .place_new_object(placeable, Transform::IDENTITY, &mut f.scene)
            .await
            .unwrap();

        assert!(anchor.is_none());
        assert!(f.manager.is_empty());
        assert_eq!(f.scene.node_count(), nodes_before);
    }

    #[tokio::test]
    async fn updates_mirror_pose_and_tracking() {
        let mut f = fixture();
        let (id, anchor) = anchored_pillow(&mut f, Point3D::new(1.0, 0.0, 1.0)).await;

        let moved = WorldAnchor {
            id: anchor,
            transform: Transform::from_position_rotation(
                Point3D::new(1.5, 0.2, 1.0),
                Quaternion::from_yaw(1.0),
            ),
            tracked: false,
        };
        f.manager
            .process(AnchorUpdate::updated(moved.clone()), &f.catalog, &mut f.scene)
            .unwrap();

        let object = f.manager.object(id).unwrap();
        assert_eq!(object.position(), moved.transform.position);
        assert_eq!(object.transform().rotation, moved.transform.rotation);
        assert!(!object.is_visible());
        assert!(!f.scene.is_enabled(object.node()));

        let retracked = WorldAnchor {
            tracked: true,
            ..moved
        };
        f.manager
            .process(AnchorUpdate::updated(retracked), &f.catalog, &mut f.scene)
            .unwrap();
        assert!(f.manager.object(id).unwrap().is_visible());
    }

    #[tokio::test]
    async fn removed_anchor_drops_object() {
        let mut f = fixture();
        let (id, anchor) = anchored_pillow(&mut f, Point3D::ORIGIN).await;
        let node = f.manager.object(id).unwrap().node();

        f.manager
            .process(
                AnchorUpdate::removed(world_anchor(anchor, Point3D::ORIGIN, false)),
                &f.catalog,
                &mut f.scene,
            )
            .unwrap();

        assert!(f.manager.object(id).is_none());
        assert!(!f.scene.contains(node));
        assert!(f.manager.world_anchor(&anchor).is_none());
    }

    #[tokio::test]
    async fn drift_below_threshold_keeps_anchor() {
        let mut f = fixture();
        let (id, anchor) = anchored_pillow(&mut f, Point3D::ORIGIN).await;

        let nudged = Transform::from_position(Point3D::new(0.0005, 0.0, 0.0));
        f.manager.object_mut(id).unwrap().set_transform(nudged, &mut f.scene);

        assert_eq!(f.manager.detach_drifted_objects(), 0);
        assert_eq!(f.manager.lifecycle(id), Some(Lifecycle::Anchored(anchor)));
    }

    #[tokio::test]
    async fn drift_past_threshold_detaches_and_removes_anchor() {
        let mut f = fixture();
        let (id, anchor) = anchored_pillow(&mut f, Point3D::ORIGIN).await;

        let pushed = Transform::from_position(Point3D::new(0.05, 0.0, 0.0));
        f.manager.object_mut(id).unwrap().set_transform(pushed, &mut f.scene);

        assert_eq!(f.manager.detach_drifted_objects(), 1);
        let object = f.manager.object(id).unwrap();
        assert_eq!(object.lifecycle(), Lifecycle::Moving);
        assert!(!object.is_at_rest());
        assert_eq!(object.last_checked_position(), Some(pushed.position));
        assert!(f.manager.anchor_table().is_empty());

        run_spawned_tasks().await;
        assert_eq!(f.session.remove_requests(), vec![anchor]);
    }

    #[tokio::test]
    async fn settled_object_requests_exactly_one_anchor() {
        let mut f = fixture();
        let (id, _) = anchored_pillow(&mut f, Point3D::ORIGIN).await;
        f.manager
            .object_mut(id)
            .unwrap()
            .set_transform(Transform::from_position(Point3D::new(0.1, 0.0, 0.0)), &mut f.scene);
        f.manager.detach_drifted_objects();

        // still falling between sweeps
        f.manager
            .object_mut(id)
            .unwrap()
            .set_transform(Transform::from_position(Point3D::new(0.1, -0.05, 0.0)), &mut f.scene);
        assert_eq!(f.manager.reanchor_settled_objects().await, 0);
        assert_eq!(f.manager.lifecycle(id), Some(Lifecycle::Moving));

        assert_eq!(f.manager.reanchor_settled_objects().await, 1);
        assert!(matches!(
            f.manager.lifecycle(id),
            Some(Lifecycle::PendingAnchor(_))
        ));
        assert!(f.manager.object(id).unwrap().is_at_rest());

        assert_eq!(f.manager.reanchor_settled_objects().await, 0);
        assert_eq!(f.session.add_requests().len(), 2);
    }

    #[tokio::test]
    async fn dragged_objects_are_not_reanchored() {
        let mut f = fixture();
        let (id, _) = anchored_pillow(&mut f, Point3D::ORIGIN).await;
        let object = f.manager.object_mut(id).unwrap();
        object.set_dragged(true, &mut f.scene);
        object.set_transform(Transform::from_position(Point3D::new(0.3, 0.0, 0.0)), &mut f.scene);
        f.manager.detach_drifted_objects();

        assert_eq!(f.manager.reanchor_settled_objects().await, 0);
        assert_eq!(f.manager.reanchor_settled_objects().await, 0);
        assert_eq!(f.manager.lifecycle(id), Some(Lifecycle::Moving));
    }

    #[tokio::test]
    async fn rejected_reanchor_stays_moving_for_retry() {
        let mut f = fixture();
        let (id, _) = anchored_pillow(&mut f, Point3D::ORIGIN).await;
        f.manager
            .object_mut(id)
            .unwrap()
            .set_transform(Transform::from_position(Point3D::new(0.2, 0.0, 0.0)), &mut f.scene);
        f.manager.detach_drifted_objects();

        f.session.set_reject_adds(true);
        assert_eq!(f.manager.reanchor_settled_objects().await, 0);
        assert_eq!(f.manager.lifecycle(id), Some(Lifecycle::Moving));

        f.session.set_reject_adds(false);
        assert_eq!(f.manager.reanchor_settled_objects().await, 1);
    }

    #[tokio::test]
    async fn persisted_entries_restore_on_added() {
        let mut f = fixture();
        let restored = AnchorId::random();
        let unknown_model = AnchorId::random();
        let mut table = AnchorTable::new();
        table.insert(restored, "Stool".into());
        table.insert(unknown_model, "Lamp".into());
        f.manager.store().save(&table).unwrap();
        f.manager.load();

        let pose = Point3D::new(2.0, 0.0, -1.0);
        f.manager
            .process(
                AnchorUpdate::added(world_anchor(restored, pose, true)),
                &f.catalog,
                &mut f.scene,
            )
            .unwrap();
        f.manager
            .process(
                AnchorUpdate::added(world_anchor(unknown_model, pose, true)),
                &f.catalog,
                &mut f.scene,
            )
            .unwrap();
        run_spawned_tasks().await;

        assert_eq!(f.manager.len(), 1);
        let object = f.manager.objects().next().unwrap();
        assert_eq!(object.descriptor().file_name, "Stool");
        assert_eq!(object.lifecycle(), Lifecycle::Anchored(restored));
        assert_eq!(object.position(), pose);
        assert!(object.is_visible());

        assert!(!f.manager.persisted_entries().contains_key(&restored));
        assert!(f.manager.persisted_entries().contains_key(&unknown_model));
        assert!(f.session.remove_requests().is_empty());

        // only the anchored set is written back
        f.manager.save();
        let saved = f.manager.store().try_load().unwrap();
        assert_eq!(saved.get(&restored).map(String::as_str), Some("Stool"));
        assert!(!saved.contains_key(&unknown_model));
    }

    #[tokio::test]
    async fn orphaned_anchor_is_removed() {
        let mut f = fixture();
        let orphan = AnchorId::random();

        f.manager
            .process(
                AnchorUpdate::added(world_anchor(orphan, Point3D::ORIGIN, true)),
                &f.catalog,
                &mut f.scene,
            )
            .unwrap();
        run_spawned_tasks().await;

        assert!(f.manager.is_empty());
        assert_eq!(f.session.remove_requests(), vec![orphan]);
    }

    #[tokio::test]
    async fn orphan_removal_failure_is_not_an_error() {
        let mut f = fixture();
        f.session.set_fail_removals(true);

        let result = f.manager.process(
            AnchorUpdate::added(world_anchor(AnchorId::random(), Point3D::ORIGIN, true)),
            &f.catalog,
            &mut f.scene,
        );
        run_spawned_tasks().await;

        assert!(result.is_ok());
        assert_eq!(f.session.remove_requests().len(), 1);
    }

    #[test]
    fn orphan_outside_a_runtime_is_left_alone() {
        let mut f = fixture();

        let result = f.manager.process(
            AnchorUpdate::added(world_anchor(AnchorId::random(), Point3D::ORIGIN, true)),
            &f.catalog,
            &mut f.scene,
        );

        assert!(result.is_ok());
        assert!(f.manager.is_empty());
        assert!(f.session.remove_requests().is_empty());
    }

    #[tokio::test]
    async fn save_then_reload_round_trips_anchored_set() {
        let mut f = fixture();
        let (_, first) = anchored_pillow(&mut f, Point3D::ORIGIN).await;
        let placeable = f.catalog.get("Stool").unwrap();
        let pending = f
            .manager
            .place_new_object(placeable, Transform::IDENTITY, &mut f.scene)
            .await
            .unwrap()
            .unwrap();

        f.manager.save();

        let session = Arc::new(FakeTrackingSession::new());
        let mut reloaded = AnchorManager::new(session, f.manager.store().clone(), THRESHOLD);
        reloaded.load();

        assert_eq!(reloaded.persisted_entries(), &f.manager.anchor_table());
        assert_eq!(
            reloaded.persisted_entries().get(&first).map(String::as_str),
            Some("Pillow")
        );
        assert!(!reloaded.persisted_entries().contains_key(&pending));
    }

    #[tokio::test]
    async fn remove_object_tears_down_anchor_and_nodes() {
        let mut f = fixture();
        let (id, anchor) = anchored_pillow(&mut f, Point3D::ORIGIN).await;
        let object = f.manager.object(id).unwrap();
        let (node, ui_origin) = (object.node(), object.ui_origin());

        f.manager.remove_object(id, &mut f.scene).await.unwrap();

        assert!(f.manager.is_empty());
        assert!(!f.scene.contains(node));
        assert!(!f.scene.contains(ui_origin));
        assert_eq!(f.session.remove_requests(), vec![anchor]);

        let missing = f.manager.remove_object(id, &mut f.scene).await;
        assert!(matches!(missing, Err(PlacementError::UnknownObject(_))));
    }

    #[tokio::test]
    async fn remove_all_objects_covers_every_state() {
        let mut f = fixture();
        let (moving, _) = anchored_pillow(&mut f, Point3D::ORIGIN).await;
        f.manager
            .object_mut(moving)
            .unwrap()
            .set_transform(Transform::from_position(Point3D::new(1.0, 0.0, 0.0)), &mut f.scene);
        f.manager.detach_drifted_objects();
        let placeable = f.catalog.get("Stool").unwrap();
        f.manager
            .place_new_object(placeable, Transform::IDENTITY, &mut f.scene)
            .await
            .unwrap();

        assert_eq!(f.manager.remove_all_objects(&mut f.scene).await, 2);
        assert!(f.manager.is_empty());
    }

    #[tokio::test]
    async fn object_lookup_by_node_includes_ui_origin() {
        let mut f = fixture();
        let (id, _) = anchored_pillow(&mut f, Point3D::ORIGIN).await;
        let object = f.manager.object(id).unwrap();

        assert_eq!(f.manager.object_for_node(object.node()), Some(id));
        assert_eq!(f.manager.object_for_node(object.ui_origin()), Some(id));
        assert_eq!(f.manager.object_for_node(NodeId(9_999)), None);
    }
}
