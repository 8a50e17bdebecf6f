use formats::{ModelData, ModelLoadError};
use gpu::{OrthographicCamera, RenderFrame, Renderer};
use runtime::{DisposeToken, FrameClock, FrameHandle, FrameLoop, LoopPhase};
use scene::World;
use scene::entity::NodeId;
use scene::prefabs::{LightingRig, spawn_ground_shadow, spawn_lighting_rig};

use crate::asset::{LoadState, install_model};
use crate::config::ViewerConfig;
use crate::device::DeviceProfile;
use crate::input::{DragState, InputController};
use crate::motion::{MotionBlender, OrbitState};
use crate::surface::{SurfaceManager, SurfaceSize};

/// GPU backend the session draws through. It may arrive late (device
/// creation is async) and is released on dispose.
pub trait DrawContext {
    /// Resize the backing buffers, in physical pixels.
    fn resize(&mut self, width: u32, height: u32);
    fn draw(&mut self, world: &World, frame: &RenderFrame);
    fn release(&mut self);
}

/// The element the viewer renders into, as seen by the page.
pub trait DisplaySurface {
    fn set_size(&mut self, size: SurfaceSize);
    /// Make the surface visible. Called at most once.
    fn reveal(&mut self);
}

/// Host completion callback. Invoked by the caller once no borrow of the
/// session is held.
pub type LoadCallback = Box<dyn FnOnce()>;

/// All per-viewer state: scene, camera, input, motion and the frame loop.
pub struct ViewerSession<C: DrawContext, S: DisplaySurface, H: FrameHandle> {
    config: ViewerConfig,
    device: DeviceProfile,
    world: World,
    lighting: LightingRig,
    ground: NodeId,
    surface: SurfaceManager,
    display: S,
    draw_context: Option<C>,
    input: InputController,
    motion: MotionBlender,
    frame_loop: FrameLoop<H>,
    disposed: DisposeToken,
    load: LoadState,
    on_load: Option<LoadCallback>,
    draw_count: u64,
}

impl<C: DrawContext, S: DisplaySurface, H: FrameHandle> ViewerSession<C, S, H> {
    /// Build the scene and start the frame loop. The host schedules the first
    /// frame.
    pub fn new(
        config: ViewerConfig,
        device: DeviceProfile,
        mut display: S,
        css_width: f64,
        css_height: f64,
    ) -> Self {
        let size = SurfaceSize::new(css_width, css_height, device.pixel_ratio(&config.device));
        display.set_size(size);
        let mut surface = SurfaceManager::new(size, config.projection.clone());

        let mut world = World::new();
        let lighting = spawn_lighting_rig(&mut world);
        let ground = spawn_ground_shadow(
            &mut world,
            config.asset.ground_radius,
            config.asset.ground_opacity,
        );

        let motion = MotionBlender::new(&config.orbit, &config.spin_in);
        surface.update_camera_position(motion.orbit.current_angle, motion.orbit.current_elevation);

        let mut frame_loop = FrameLoop::new(FrameClock::new(config.frame.max_frame_delta_s));
        frame_loop.start();

        log::debug!(
            "viewer session created: {}x{} css px at ratio {}",
            size.width,
            size.height,
            size.pixel_ratio
        );

        Self {
            input: InputController::new(&config.orbit),
            config,
            device,
            world,
            lighting,
            ground,
            surface,
            display,
            draw_context: None,
            motion,
            frame_loop,
            disposed: DisposeToken::new(),
            load: LoadState::Pending,
            on_load: None,
            draw_count: 0,
        }
    }

    pub fn set_on_load(&mut self, callback: LoadCallback) {
        if !self.disposed.is_disposed() {
            self.on_load = Some(callback);
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn lighting(&self) -> LightingRig {
        self.lighting
    }

    pub fn ground(&self) -> NodeId {
        self.ground
    }

    pub fn camera(&self) -> &OrthographicCamera {
        self.surface.camera()
    }

    pub fn surface(&self) -> &SurfaceManager {
        &self.surface
    }

    pub fn orbit(&self) -> OrbitState {
        self.motion.orbit
    }

    pub fn motion(&self) -> &MotionBlender {
        &self.motion
    }

    pub fn drag(&self) -> DragState {
        self.input.drag()
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn phase(&self) -> LoopPhase {
        self.frame_loop.phase()
    }

    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    pub fn has_draw_context(&self) -> bool {
        self.draw_context.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.is_disposed()
    }

    /// Shared flag async continuations check before touching the session.
    pub fn dispose_token(&self) -> DisposeToken {
        self.disposed.clone()
    }

    /// Install the GPU backend once it is ready. After dispose the context is
    /// released immediately instead.
    pub fn attach_draw_context(&mut self, mut context: C) -> bool {
        if self.disposed.is_disposed() {
            log::debug!("draw context arrived after dispose; releasing");
            context.release();
            return false;
        }
        let size = self.surface.size();
        context.resize(size.backing_width(), size.backing_height());
        if let Some(mut previous) = self.draw_context.replace(context) {
            previous.release();
        }
        true
    }

    pub fn resize(&mut self, css_width: f64, css_height: f64, device: DeviceProfile) {
        if self.disposed.is_disposed() {
            return;
        }
        self.device = device;
        let size = SurfaceSize::new(css_width, css_height, device.pixel_ratio(&self.config.device));
        self.surface.on_resize(size);
        self.display.set_size(size);
        if let Some(context) = self.draw_context.as_mut() {
            context.resize(size.backing_width(), size.backing_height());
        }
    }

    pub fn pointer_down(&mut self, x: f64, y: f64) {
        self.input.pointer_down(x, y);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.input.pointer_move(x, y, &mut self.motion.orbit)
    }

    pub fn pointer_up(&mut self) {
        self.input.pointer_up();
    }

    pub fn touch_start(&mut self, touches: &[(f64, f64)]) {
        self.input.touch_start(touches);
    }

    /// Returns `true` when the touch event's default scroll must be
    /// suppressed.
    pub fn touch_move(&mut self, touches: &[(f64, f64)]) -> bool {
        self.input.touch_move(touches, &mut self.motion.orbit)
    }

    pub fn touch_end(&mut self) {
        self.input.touch_end();
    }

    /// Finish the one-shot model load.
    ///
    /// Returns the host callback to invoke, or `None` after dispose or when
    /// the load already completed.
    pub fn complete_load(
        &mut self,
        result: Result<ModelData, ModelLoadError>,
        now_ms: f64,
    ) -> Option<LoadCallback> {
        if self.disposed.is_disposed() {
            log::debug!("model load resolved after dispose; ignoring");
            return None;
        }
        if !self.load.is_pending() {
            log::warn!("model load already completed; ignoring repeat");
            return None;
        }

        // A model without geometry has no center to normalize around.
        let result = result.and_then(|model| {
            if model.bounds().is_empty() {
                Err(ModelLoadError::NoDrawables)
            } else {
                Ok(model)
            }
        });
        match result {
            Ok(model) => {
                let device_factor = self.device.model_scale(&self.config.device);
                let asset = install_model(
                    &mut self.world,
                    &model,
                    self.ground,
                    &self.config.asset,
                    device_factor,
                );
                self.motion.spin_in.arm(now_ms);
                self.load = LoadState::Ready(asset);
            }
            Err(err) => {
                log::error!("failed to load model: {err}");
                self.load = LoadState::Failed;
            }
        }

        if self.surface.reveal() {
            self.display.reveal();
        }
        self.on_load.take()
    }

    /// Store the handle of the next scheduled frame. Returns `false` (and
    /// cancels the handle) once the loop has stopped.
    pub fn schedule(&mut self, handle: H) -> bool {
        self.frame_loop.set_pending(handle)
    }

    /// Run one frame. Returns `false` when the loop is no longer running and
    /// nothing more should be scheduled.
    pub fn tick(&mut self, timestamp_ms: f64) -> bool {
        let Some(frame) = self.frame_loop.begin_frame(timestamp_ms) else {
            return false;
        };

        self.motion
            .step(frame.timestamp_ms, frame.dt_s, self.input.is_dragging());
        let orbit = self.motion.orbit;
        self.surface
            .update_camera_position(orbit.current_angle, orbit.current_elevation);

        if let Some(context) = self.draw_context.as_mut() {
            let render_frame = Renderer::collect_3d(&self.world, self.surface.camera());
            context.draw(&self.world, &render_frame);
            self.draw_count += 1;
        }
        true
    }

    /// Stop the loop, release the GPU backend and detach the scene.
    /// Idempotent.
    pub fn dispose(&mut self) -> bool {
        if !self.disposed.dispose() {
            return false;
        }
        self.frame_loop.dispose();
        if let Some(mut context) = self.draw_context.take() {
            context.release();
        }
        self.world.clear();
        self.on_load = None;
        log::info!("model viewer disposed after {} draws", self.draw_count);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{DisplaySurface, DrawContext, ViewerSession};
    use crate::asset::LoadState;
    use crate::config::ViewerConfig;
    use crate::device::DeviceProfile;
    use crate::surface::SurfaceSize;
    use formats::{ModelData, ModelLoadError, ModelPart};
    use gpu::RenderFrame;
    use pretty_assertions::assert_eq;
    use runtime::{FrameHandle, LoopPhase, NOMINAL_FRAME_DT_S};
    use scene::World;
    use scene::components::{Material, Mesh};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Log {
        draws: Cell<u32>,
        commands: Cell<usize>,
        releases: Cell<u32>,
        drops: Cell<u32>,
        reveals: Cell<u32>,
        cancels: Cell<u32>,
        backing: RefCell<Vec<(u32, u32)>>,
        sizes: RefCell<Vec<SurfaceSize>>,
    }

    struct FakeContext(Rc<Log>);

    impl DrawContext for FakeContext {
        fn resize(&mut self, width: u32, height: u32) {
            self.0.backing.borrow_mut().push((width, height));
        }

        fn draw(&mut self, _world: &World, frame: &RenderFrame) {
            self.0.draws.set(self.0.draws.get() + 1);
            self.0.commands.set(frame.commands.len());
        }

        fn release(&mut self) {
            self.0.releases.set(self.0.releases.get() + 1);
        }
    }

    impl Drop for FakeContext {
        fn drop(&mut self) {
            self.0.drops.set(self.0.drops.get() + 1);
        }
    }

    struct FakeSurface(Rc<Log>);

    impl DisplaySurface for FakeSurface {
        fn set_size(&mut self, size: SurfaceSize) {
            self.0.sizes.borrow_mut().push(size);
        }

        fn reveal(&mut self) {
            self.0.reveals.set(self.0.reveals.get() + 1);
        }
    }

    struct FakeHandle(Rc<Log>);

    impl FrameHandle for FakeHandle {
        fn cancel(self) {
            self.0.cancels.set(self.0.cancels.get() + 1);
        }
    }

    type Session = ViewerSession<FakeContext, FakeSurface, FakeHandle>;

    fn session(log: &Rc<Log>) -> Session {
        ViewerSession::new(
            ViewerConfig::default(),
            DeviceProfile::desktop(1280.0, 800.0),
            FakeSurface(log.clone()),
            400.0,
            300.0,
        )
    }

    fn cube_model(center: [f32; 3], size: f32) -> ModelData {
        let h = size / 2.0;
        let [x, y, z] = center;
        let lo = [x - h, y - h, z - h];
        let hi = [x + h, y + h, z + h];
        let positions = vec![
            lo,
            [hi[0], lo[1], lo[2]],
            [hi[0], hi[1], lo[2]],
            hi,
            [lo[0], hi[1], hi[2]],
        ];
        ModelData {
            parts: vec![ModelPart {
                name: "cube".to_string(),
                mesh: Mesh::new(positions, Vec::new(), vec![0, 1, 2, 2, 3, 4]),
                material: Material::default(),
            }],
        }
    }

    fn counter() -> (Rc<Cell<u32>>, super::LoadCallback) {
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        (calls, Box::new(move || seen.set(seen.get() + 1)))
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn draws_once_context_is_attached() {
        let log = Rc::new(Log::default());
        let mut session = session(&log);
        assert_eq!(session.phase(), LoopPhase::Running);

        assert!(session.tick(0.0));
        assert_eq!(session.draw_count(), 0);

        assert!(session.attach_draw_context(FakeContext(log.clone())));
        assert_eq!(*log.backing.borrow(), vec![(400, 300)]);
        assert!(session.tick(16.0));
        assert!(session.tick(32.0));
        assert_eq!(session.draw_count(), 2);
        assert_eq!(log.draws.get(), 2);
        // Ground shadow plane only until the model arrives.
        assert_eq!(log.commands.get(), 1);
    }

    #[test]
    fn first_frame_uses_nominal_delta() {
        let log = Rc::new(Log::default());
        let mut session = session(&log);
        let start = session.orbit().target_angle;
        session.tick(123_456.0);
        let moved = session.orbit().target_angle - start;
        assert!(close(moved, 0.15 * NOMINAL_FRAME_DT_S));

        // A long gap (backgrounded tab) is clamped.
        session.tick(123_456.0 + 60_000.0);
        let moved = session.orbit().target_angle - start;
        assert!(close(moved, 0.15 * (NOMINAL_FRAME_DT_S + 0.1)));
    }

    #[test]
    fn dispose_twice_stops_drawing() {
        let log = Rc::new(Log::default());
        let mut session = session(&log);
        session.attach_draw_context(FakeContext(log.clone()));
        assert!(session.schedule(FakeHandle(log.clone())));
        session.tick(0.0);
        assert!(session.schedule(FakeHandle(log.clone())));

        assert!(session.dispose());
        assert!(!session.dispose());
        assert_eq!(session.phase(), LoopPhase::Disposed);
        assert_eq!(log.cancels.get(), 1);
        assert_eq!(log.releases.get(), 1);
        // The backend itself is dropped, not just emptied.
        assert_eq!(log.drops.get(), 1);
        assert!(!session.has_draw_context());
        assert_eq!(session.world().node_count(), 0);

        assert!(!session.tick(16.0));
        assert_eq!(log.draws.get(), 1);

        // A frame that raced with dispose cannot re-arm the chain.
        assert!(!session.schedule(FakeHandle(log.clone())));
        assert_eq!(log.cancels.get(), 2);
    }

    #[test]
    fn load_resolving_after_dispose_is_ignored() {
        let log = Rc::new(Log::default());
        let mut session = session(&log);
        let (calls, callback) = counter();
        session.set_on_load(callback);

        session.dispose();
        let nodes = session.world().node_count();
        let callback = session.complete_load(Ok(cube_model([5.0; 3], 2.0)), 10.0);

        assert!(callback.is_none());
        assert_eq!(calls.get(), 0);
        assert_eq!(session.world().node_count(), nodes);
        assert_eq!(log.reveals.get(), 0);
        assert_eq!(*session.load_state(), LoadState::Pending);
    }

    #[test]
    fn late_draw_context_is_released() {
        let log = Rc::new(Log::default());
        let mut session = session(&log);
        session.dispose();
        assert!(!session.attach_draw_context(FakeContext(log.clone())));
        assert_eq!(log.releases.get(), 1);
        assert_eq!(log.drops.get(), 1);
        assert!(!session.has_draw_context());
    }

    #[test]
    fn successful_load_normalizes_and_reveals() {
        let log = Rc::new(Log::default());
        let mut session = session(&log);
        let (calls, callback) = counter();
        session.set_on_load(callback);

        let callback = session
            .complete_load(Ok(cube_model([5.0; 3], 2.0)), 1000.0)
            .expect("callback on success");
        callback();
        assert_eq!(calls.get(), 1);
        assert_eq!(log.reveals.get(), 1);

        let asset = *session.load_state().asset().expect("model ready");
        let bounds = session.world().world_bounds(asset.root);
        let center = bounds.center();
        assert!(close(center.x, 0.0) && close(center.y, 0.0) && close(center.z, 0.0));
        assert!(close(bounds.max_dimension(), 4.0));
        assert!(session.motion().spin_in.is_active());

        let ground = session.world().world_transform(session.ground());
        assert!(close(ground.position.y, -2.0));

        // One-shot.
        assert!(session.complete_load(Ok(cube_model([0.0; 3], 1.0)), 2000.0).is_none());
        assert_eq!(log.reveals.get(), 1);
    }

    #[test]
    fn mobile_profile_shrinks_the_model() {
        let log = Rc::new(Log::default());
        let mut session: Session = ViewerSession::new(
            ViewerConfig::default(),
            DeviceProfile::desktop(390.0, 844.0),
            FakeSurface(log.clone()),
            400.0,
            300.0,
        );
        session.complete_load(Ok(cube_model([5.0; 3], 2.0)), 0.0);
        let asset = *session.load_state().asset().expect("model ready");
        let bounds = session.world().world_bounds(asset.root);
        assert!(close(bounds.max_dimension(), 3.2));
    }

    #[test]
    fn failed_load_still_reveals_and_calls_back() {
        let log = Rc::new(Log::default());
        let mut session = session(&log);
        let (calls, callback) = counter();
        session.set_on_load(callback);
        let nodes = session.world().node_count();

        let callback = session
            .complete_load(Err(ModelLoadError::NoDrawables), 0.0)
            .expect("callback on failure");
        callback();
        assert_eq!(calls.get(), 1);
        assert_eq!(log.reveals.get(), 1);
        assert_eq!(*session.load_state(), LoadState::Failed);
        assert_eq!(session.world().node_count(), nodes);
        assert!(!session.motion().spin_in.is_active());
    }

    #[test]
    fn empty_model_is_a_failed_load() {
        let log = Rc::new(Log::default());
        let mut session = session(&log);
        let (calls, callback) = counter();
        session.set_on_load(callback);
        let nodes = session.world().node_count();

        let callback = session
            .complete_load(Ok(ModelData::default()), 0.0)
            .expect("callback on empty model");
        callback();
        assert_eq!(calls.get(), 1);
        assert_eq!(log.reveals.get(), 1);
        assert_eq!(*session.load_state(), LoadState::Failed);
        assert_eq!(session.world().node_count(), nodes);
        assert!(!session.motion().spin_in.is_active());
    }

    #[test]
    fn callback_may_dispose_the_session() {
        let log = Rc::new(Log::default());
        let shared = Rc::new(RefCell::new(session(&log)));
        let weak = Rc::downgrade(&shared);
        shared.borrow_mut().set_on_load(Box::new(move || {
            if let Some(session) = weak.upgrade() {
                session.borrow_mut().dispose();
            }
        }));

        let callback = shared
            .borrow_mut()
            .complete_load(Err(ModelLoadError::NoDrawables), 0.0);
        if let Some(callback) = callback {
            callback();
        }
        assert!(shared.borrow().is_disposed());
    }

    #[test]
    fn resize_reprojects_and_resizes_backing() {
        let log = Rc::new(Log::default());
        let mut session = session(&log);
        session.attach_draw_context(FakeContext(log.clone()));

        let mut device = DeviceProfile::desktop(1280.0, 800.0);
        device.device_pixel_ratio = 3.0;
        session.resize(800.0, 200.0, device);

        let half = session.surface().half_extent();
        let camera = session.camera();
        assert!(close(camera.right - camera.left, 2.0 * half * 4.0));
        assert!(close(camera.top - camera.bottom, 2.0 * half));
        assert_eq!(log.backing.borrow().last(), Some(&(1600, 400)));
        assert_eq!(log.sizes.borrow().last().map(|s| s.pixel_ratio), Some(2.0));
    }

    #[test]
    fn drag_steers_the_orbit() {
        let log = Rc::new(Log::default());
        let mut session = session(&log);
        let before = session.orbit();

        session.pointer_down(100.0, 100.0);
        assert!(session.pointer_move(90.0, 115.0));
        let orbit = session.orbit();
        assert!(close(orbit.target_angle, before.target_angle + 0.08));
        assert!(close(orbit.target_elevation, before.target_elevation + 0.075));

        // While dragging, auto-rotation does not push the target.
        session.tick(0.0);
        assert!(close(session.orbit().target_angle, orbit.target_angle));
        assert!(session.orbit().current_angle > before.current_angle);

        session.pointer_up();
        assert!(!session.drag().is_dragging);
        assert!(!session.touch_move(&[(0.0, 0.0)]));
    }
}
