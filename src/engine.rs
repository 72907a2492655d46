//! The engine task: one owner for planes, anchors and placement state.
//!
//! All periodic sweeps, sensor streams and user commands are multiplexed in a
//! single `tokio::select!` loop, so no state is ever touched concurrently.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::error::{PlacementError, Result};
use crate::object::ModelCatalog;
use crate::persistence::{AnchorManager, AnchorTableStore};
use crate::placement::PlacementController;
use crate::plane::PlaneRegistry;
use crate::scene::{NodeId, SceneGraph};
use crate::tracking::{AnchorUpdate, PlaneAnchor, TrackingSession, WorldAnchor};
use spatial_placement_geometry::{Transform, Vector3D};

/// User and physics input delivered to the engine task.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// Select a model by file name; selecting the current model deselects it
    Select(Option<String>),
    PlaceSelected,
    /// Drag gesture on a node, with the total translation since it began
    UpdateDrag {
        target: NodeId,
        translation: Vector3D,
    },
    EndDrag,
    RemoveHighlighted,
    RemoveAll,
    CollisionBegan(NodeId, NodeId),
    CollisionEnded(NodeId, NodeId),
    /// Physics moved a placed object
    ObjectMoved {
        node: NodeId,
        transform: Transform,
    },
    RegisterUiControls {
        delete_button: NodeId,
        drag_tooltip: NodeId,
    },
}

/// Single owner of all placement state.
///
/// The engine can be run, stopped and run again; the persisted table is
/// loaded and the first model selected only on the first run.
pub struct PlacementEngine {
    config: EngineConfig,
    session: Arc<dyn TrackingSession>,
    scene: Box<dyn SceneGraph>,
    catalog: ModelCatalog,
    planes: PlaneRegistry,
    anchors: AnchorManager,
    placement: PlacementController,
    world_updates: BoxStream<'static, AnchorUpdate<WorldAnchor>>,
    plane_updates: BoxStream<'static, AnchorUpdate<PlaneAnchor>>,
    started: bool,
}

impl PlacementEngine {
    pub fn new(
        config: EngineConfig,
        session: Arc<dyn TrackingSession>,
        scene: Box<dyn SceneGraph>,
        catalog: ModelCatalog,
    ) -> Result<Self> {
        let store = config.persistence.store();
        Self::with_store(config, store, session, scene, catalog)
    }

    /// Like [`new`](Self::new) with an explicit anchor table store in place of
    /// the configured one.
    pub fn with_store(
        config: EngineConfig,
        store: AnchorTableStore,
        session: Arc<dyn TrackingSession>,
        mut scene: Box<dyn SceneGraph>,
        catalog: ModelCatalog,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|err| PlacementError::Invariant(format!("{err:#}")))?;
        let anchors = AnchorManager::new(
            Arc::clone(&session),
            store,
            config.anchoring.drift_threshold,
        );
        let placement = PlacementController::new(config.placement.clone(), scene.as_mut());
        let world_updates = session.world_anchor_updates();
        let plane_updates = session.plane_anchor_updates();

        Ok(Self {
            config,
            session,
            scene,
            catalog,
            planes: PlaneRegistry::new(),
            anchors,
            placement,
            world_updates,
            plane_updates,
            started: false,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn planes(&self) -> &PlaneRegistry {
        &self.planes
    }

    pub fn anchors(&self) -> &AnchorManager {
        &self.anchors
    }

    pub fn placement(&self) -> &PlacementController {
        &self.placement
    }

    pub fn scene(&self) -> &dyn SceneGraph {
        self.scene.as_ref()
    }

    /// Loads the persisted table and selects the first model.
    fn start(&mut self) {
        if std::mem::replace(&mut self.started, true) {
            return;
        }
        self.anchors.load();
        if let Some(first) = self.catalog.first().map(|d| d.file_name.clone()) {
            self.placement
                .select(Some(&first), &mut self.catalog, self.scene.as_mut());
        }
    }

    pub async fn handle_command(&mut self, command: EngineCommand) -> Result<()> {
        let scene = self.scene.as_mut();
        match command {
            EngineCommand::Select(file_name) => {
                self.placement
                    .select(file_name.as_deref(), &mut self.catalog, scene);
            }
            EngineCommand::PlaceSelected => {
                self.placement
                    .place_selected(&self.catalog, &mut self.anchors, scene)
                    .await?;
            }
            EngineCommand::UpdateDrag {
                target,
                translation,
            } => {
                self.placement
                    .update_drag(target, translation, &self.planes, &mut self.anchors, scene);
            }
            EngineCommand::EndDrag => self.placement.end_drag(&mut self.anchors, scene),
            EngineCommand::RemoveHighlighted => {
                self.placement
                    .remove_highlighted(&mut self.anchors, scene)
                    .await?;
            }
            EngineCommand::RemoveAll => {
                self.placement.end_drag(&mut self.anchors, scene);
                self.placement.set_highlighted(None, &self.anchors, scene);
                let removed = self.anchors.remove_all_objects(scene).await;
                info!(removed, "Removed all placed objects");
            }
            EngineCommand::CollisionBegan(a, b) => {
                self.placement.collision_began(a, b, &self.catalog)
            }
            EngineCommand::CollisionEnded(a, b) => {
                self.placement.collision_ended(a, b, &self.catalog)
            }
            EngineCommand::ObjectMoved { node, transform } => {
                let object = self
                    .anchors
                    .object_for_node(node)
                    .and_then(|id| self.anchors.object_mut(id));
                match object {
                    // the drag owns the pose while it lasts
                    Some(object) if object.is_dragged() => {}
                    Some(object) => object.set_transform(transform, scene),
                    None => debug!(node = %node, "Ignoring motion of an unknown node"),
                }
            }
            EngineCommand::RegisterUiControls {
                delete_button,
                drag_tooltip,
            } => self
                .placement
                .register_ui_controls(delete_button, drag_tooltip, scene),
        }
        Ok(())
    }

    fn on_device_tick(&mut self) {
        if !self.session.is_running() {
            return;
        }
        let pose = self.session.current_device_pose(std::time::Instant::now());
        self.placement.update(
            pose,
            &self.planes,
            &self.anchors,
            &mut self.catalog,
            self.scene.as_mut(),
        );
    }

    /// Runs until `shutdown` turns true, its sender is dropped, or every
    /// command sender is gone. Saves the anchor table on the way out.
    ///
    /// Recoverable errors are logged and the loop carries on; a fatal one
    /// ends the loop and is returned.
    pub async fn run(
        &mut self,
        mut commands: mpsc::UnboundedReceiver<EngineCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        self.start();

        let (mut world_open, mut planes_open) = (true, true);

        let loops = self.config.loops.clone();
        let mut device_ticks = ticker(loops.device_pose_period());
        let mut drift_ticks = ticker(loops.drift_check_period());
        let mut settle_ticks = ticker(loops.settle_check_period());

        info!(
            device_pose_hz = loops.device_pose_hz,
            drift_check_hz = loops.drift_check_hz,
            settle_check_hz = loops.settle_check_hz,
            "Placement engine running"
        );

        let outcome = loop {
            if *shutdown.borrow() {
                break Ok(());
            }

            let step = tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break Ok(());
                    }
                    continue;
                }
                update = self.world_updates.next(), if world_open => match update {
                    Some(update) => {
                        self.anchors.process(update, &self.catalog, self.scene.as_mut())
                    }
                    None => {
                        warn!("World anchor stream ended");
                        world_open = false;
                        Ok(())
                    }
                },
                update = self.plane_updates.next(), if planes_open => {
                    match update {
                        Some(update) => self.planes.process(update, self.scene.as_mut()),
                        None => {
                            warn!("Plane anchor stream ended");
                            planes_open = false;
                        }
                    }
                    Ok(())
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        debug!("Command channel closed");
                        break Ok(());
                    }
                },
                _ = device_ticks.tick() => {
                    self.on_device_tick();
                    Ok(())
                }
                _ = drift_ticks.tick() => {
                    let detached = self.anchors.detach_drifted_objects();
                    if detached > 0 {
                        debug!(detached, "Drift sweep detached objects");
                    }
                    Ok(())
                }
                _ = settle_ticks.tick() => {
                    let requested = self.anchors.reanchor_settled_objects().await;
                    if requested > 0 {
                        debug!(requested, "Settle sweep requested anchors");
                    }
                    Ok(())
                }
            };

            if let Err(err) = step {
                if err.is_fatal() {
                    error!(error = %err, "Placement engine stopping");
                    break Err(err);
                }
                warn!(error = %err, "Engine step failed");
            }
        };

        self.anchors.save();
        info!("Placement engine stopped");
        outcome
    }

    /// Moves the engine onto its own task.
    pub fn spawn(self) -> EngineHandle {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut engine = self;
            let outcome = engine.run(command_rx, shutdown_rx).await;
            (engine, outcome)
        });

        EngineHandle {
            commands,
            shutdown,
            task,
        }
    }
}

/// Interval whose first tick is one period away and which skips missed ticks
fn ticker(period: Duration) -> Interval {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Control side of a spawned [`PlacementEngine`].
pub struct EngineHandle {
    commands: mpsc::UnboundedSender<EngineCommand>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<(PlacementEngine, Result<()>)>,
}

impl EngineHandle {
    pub fn send(&self, command: EngineCommand) -> anyhow::Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("placement engine has stopped"))
    }

    /// Another sender for input sources living elsewhere
    pub fn commands(&self) -> mpsc::UnboundedSender<EngineCommand> {
        self.commands.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signals shutdown, waits for the final save, and hands the engine back.
    pub async fn shutdown(self) -> anyhow::Result<PlacementEngine> {
        let _ = self.shutdown.send(true);
        let (engine, outcome) = self
            .task
            .await
            .context("placement engine task failed")?;
        outcome.context("placement engine stopped on a fatal error")?;
        Ok(engine)
    }
}
