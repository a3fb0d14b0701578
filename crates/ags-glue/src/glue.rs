use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::audio::{AudioOutput, AudioSink};
use crate::config::GlueConfig;
use crate::device::{GraphicsBackend, SurfaceSize};
use crate::host::{self, HostMessages};
use crate::input::InputQueue;
use crate::render::{
    Engine, GlueCtx, RenderHandle, RenderThread, ScreenGeometry, ScreenState, SessionConfig,
};
use crate::surface::{Handshake, SurfaceLifecycleController};

/// One embedding session: everything the host thread holds on to.
///
/// The host forwards window lifecycle events to [`controller`](Self::controller),
/// input to [`input`](Self::input) and drains [`messages`](Self::messages);
/// [`spawn`](Self::spawn) starts the render thread.
pub struct Glue {
    config: GlueConfig,
    handshake: Arc<Handshake>,
    controller: SurfaceLifecycleController,
    messages: HostMessages,
    ctx: GlueCtx,
    spawned: bool,
}

impl Glue {
    pub fn new(config: GlueConfig) -> Self {
        let handshake = Arc::new(Handshake::new(config.wait_strategy, config.poll_interval));
        let (host, messages) = host::channel();

        let ctx = GlueCtx {
            input: Arc::new(InputQueue::new()),
            host,
            audio: AudioOutput::disabled(config.audio_sample_rate),
            screen: Arc::new(ScreenState::default()),
        };

        let mut controller = SurfaceLifecycleController::new(
            Arc::clone(&handshake),
            config.resize_timeout,
            config.destroy_timeout,
        );
        controller.add_geometry_listener(ScreenGeometry::new(
            Arc::clone(&ctx.screen),
            Arc::clone(&ctx.input),
        ));

        Self {
            config,
            handshake,
            controller,
            messages,
            ctx,
            spawned: false,
        }
    }

    pub fn with_audio_sink(mut self, sink: Box<dyn AudioSink>) -> Self {
        self.ctx.audio = AudioOutput::new(Some(sink), self.config.audio_sample_rate);
        self
    }

    /// Full display size, used to compute the screen offset of a smaller surface.
    pub fn with_display_size(self, size: SurfaceSize) -> Self {
        self.ctx.screen.set_display_size(Some(size));
        self
    }

    pub fn config(&self) -> &GlueConfig {
        &self.config
    }

    pub fn controller(&mut self) -> &mut SurfaceLifecycleController {
        &mut self.controller
    }

    pub fn messages(&self) -> &HostMessages {
        &self.messages
    }

    pub fn input(&self) -> &Arc<InputQueue> {
        &self.ctx.input
    }

    pub fn screen(&self) -> &Arc<ScreenState> {
        &self.ctx.screen
    }

    pub fn audio(&self) -> &AudioOutput {
        &self.ctx.audio
    }

    pub fn context(&self) -> &GlueCtx {
        &self.ctx
    }

    /// Starts the render thread for `session`. Allowed once per `Glue`.
    pub fn spawn<B, E>(
        &mut self,
        backend: B,
        engine: E,
        session: SessionConfig,
    ) -> Result<RenderHandle>
    where
        B: GraphicsBackend,
        E: Engine<B>,
    {
        if self.spawned {
            bail!("render thread already started for this session");
        }

        let thread = RenderThread::new(
            backend,
            engine,
            Arc::clone(&self.handshake),
            self.ctx.clone(),
            self.config.clone(),
        )
        .spawn(session)
        .context("failed to spawn render thread")?;

        self.spawned = true;
        Ok(RenderHandle::new(
            Arc::clone(&self.handshake),
            self.ctx.audio.clone(),
            thread,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{
        ConfigurationError, GraphicsError, HeadlessBackend, HeadlessContext, HeadlessProbe,
        HeadlessWindow,
    };
    use crate::host::HostMessage;
    use crate::render::{
        EngineControl, FrameCtx, RenderError, ScreenRequest, DEVICE_UNSUPPORTED_MESSAGE,
    };
    use crate::surface::{ResizeOutcome, SurfaceCallbacks};
    use std::sync::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};

    #[derive(Debug, Default)]
    struct EngineLog {
        started: u32,
        geometry: Vec<SurfaceSize>,
        ticks: u64,
        pauses: u32,
        resumes: u32,
        shutdowns: u32,
    }

    struct ScriptedEngine {
        log: Arc<Mutex<EngineLog>>,
        exit_after: Option<u64>,
        tick_delay: Duration,
    }

    impl Engine<HeadlessBackend> for ScriptedEngine {
        fn start(&mut self, _session: &SessionConfig, _glue: &GlueCtx) -> Result<ScreenRequest> {
            self.log.lock().unwrap().started += 1;
            Ok(ScreenRequest::default())
        }

        fn on_geometry_changed(
            &mut self,
            _context: &mut HeadlessContext,
            size: SurfaceSize,
        ) -> Result<()> {
            self.log.lock().unwrap().geometry.push(size);
            Ok(())
        }

        fn tick(&mut self, _ctx: &mut FrameCtx<'_, HeadlessBackend>) -> Result<EngineControl> {
            let ticks = {
                let mut log = self.log.lock().unwrap();
                log.ticks += 1;
                log.ticks
            };
            thread::sleep(self.tick_delay);

            match self.exit_after {
                Some(n) if ticks >= n => Ok(EngineControl::Exit),
                _ => Ok(EngineControl::Continue),
            }
        }

        fn on_pause(&mut self) {
            self.log.lock().unwrap().pauses += 1;
        }

        fn on_resume(&mut self) {
            self.log.lock().unwrap().resumes += 1;
        }

        fn shutdown(&mut self) {
            self.log.lock().unwrap().shutdowns += 1;
        }
    }

    struct Session {
        glue: Glue,
        window: HeadlessWindow,
        probe: HeadlessProbe,
        log: Arc<Mutex<EngineLog>>,
        /// `(size, surface current for the live window)` per listener call.
        geometry: Arc<Mutex<Vec<(SurfaceSize, bool)>>>,
        handle: RenderHandle,
        faults: Arc<crate::device::FaultPlan>,
    }

    fn config() -> GlueConfig {
        GlueConfig {
            poll_interval: Duration::from_millis(10),
            ..GlueConfig::default()
        }
    }

    fn start_session(
        backend: HeadlessBackend,
        window: HeadlessWindow,
        exit_after: Option<u64>,
    ) -> Session {
        start_paced_session(backend, window, exit_after, Duration::from_millis(1))
    }

    fn start_paced_session(
        backend: HeadlessBackend,
        window: HeadlessWindow,
        exit_after: Option<u64>,
        tick_delay: Duration,
    ) -> Session {
        let probe = backend.probe();
        let faults = backend.faults();
        let log = Arc::new(Mutex::new(EngineLog::default()));
        let geometry = Arc::new(Mutex::new(Vec::new()));

        let mut glue = Glue::new(config());
        {
            let geometry = Arc::clone(&geometry);
            let probe = probe.clone();
            glue.controller().add_geometry_listener(move |size: SurfaceSize| {
                geometry.lock().unwrap().push((size, probe.surface_is_current()));
            });
        }

        let engine = ScriptedEngine {
            log: Arc::clone(&log),
            exit_after,
            tick_delay,
        };
        let handle = glue
            .spawn(backend, engine, SessionConfig::default())
            .unwrap();

        Session {
            glue,
            window,
            probe,
            log,
            geometry,
            handle,
            faults,
        }
    }

    fn attached_session() -> Session {
        let window = HeadlessWindow::default();
        window.attach(SurfaceSize::new(480, 320));
        start_session(HeadlessBackend::new(window.clone()), window, None)
    }

    fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    impl Session {
        fn ticks(&self) -> u64 {
            self.log.lock().unwrap().ticks
        }

        fn wait_ticks(&self, more: u64) {
            let target = self.ticks() + more;
            assert!(wait_for(|| self.ticks() >= target), "render loop stalled");
        }

        fn resize(&mut self, width: u32, height: u32) -> ResizeOutcome {
            self.window.resize(SurfaceSize::new(width, height));
            self.glue
                .controller()
                .handle_surface_changed(SurfaceSize::new(width, height))
        }

        fn finish(self) -> (Result<(), RenderError>, Arc<Mutex<EngineLog>>, HeadlessProbe) {
            self.handle.shutdown();
            (self.handle.join(), self.log, self.probe)
        }
    }

    #[test]
    fn resize_is_a_rendezvous_with_the_render_thread() {
        let mut s = attached_session();
        s.glue.controller().on_surface_available();

        assert_eq!(s.resize(800, 480), ResizeOutcome::Ready);
        assert_eq!(
            *s.geometry.lock().unwrap(),
            vec![(SurfaceSize::new(800, 480), true)]
        );
        assert_eq!(s.glue.screen().physical_size(), SurfaceSize::new(800, 480));

        s.wait_ticks(3);
        assert!(s.probe.stats().max_live_surfaces <= 1);
        assert_eq!(s.glue.messages().try_next(), Some(HostMessage::SwitchToInGame));

        let (result, log, probe) = s.finish();
        result.unwrap();
        let log = log.lock().unwrap();
        assert_eq!((log.started, log.shutdowns), (1, 1));
        assert!(log.geometry.contains(&SurfaceSize::new(800, 480)));
        assert_eq!(probe.stats().live_surfaces, 0);
    }

    #[test]
    fn single_present_failure_costs_one_recreation() {
        let mut s = attached_session();
        s.glue.controller().on_surface_available();
        assert_eq!(s.resize(480, 320), ResizeOutcome::Ready);
        s.wait_ticks(3);

        let before = s.probe.stats();
        s.faults.fail_presents(1);

        assert!(wait_for(|| s.probe.stats().failed_presents > before.failed_presents));
        s.wait_ticks(5);

        let after = s.probe.stats();
        assert_eq!(after.failed_presents, before.failed_presents + 1);
        assert_eq!(after.surfaces_created, before.surfaces_created + 1);
        assert!(after.presents > before.presents);
        assert!(!s.handle.is_finished());

        s.finish().0.unwrap();
    }

    #[test]
    fn failed_recreation_after_failed_present_is_fatal() {
        let mut s = attached_session();
        s.glue.controller().on_surface_available();
        assert_eq!(s.resize(480, 320), ResizeOutcome::Ready);
        s.wait_ticks(3);

        s.faults.fail_surface_creations(1);
        s.faults.fail_presents(1);
        assert!(wait_for(|| s.handle.is_finished()));

        let (result, log, probe) = s.finish();
        assert!(matches!(
            result,
            Err(RenderError::Graphics(GraphicsError::SurfaceCreation(_)))
        ));
        assert_eq!(log.lock().unwrap().shutdowns, 1);
        assert_eq!(probe.stats().live_surfaces, 0);
    }

    #[test]
    fn failed_recreation_on_resize_is_retried() {
        let mut s = attached_session();
        s.glue.controller().on_surface_available();
        assert_eq!(s.resize(480, 320), ResizeOutcome::Ready);
        s.wait_ticks(3);

        let before = s.probe.stats();
        s.faults.fail_surface_creations(1);
        assert_eq!(s.resize(640, 360), ResizeOutcome::Ready);
        s.wait_ticks(2);

        assert_eq!(
            s.geometry.lock().unwrap().last(),
            Some(&(SurfaceSize::new(640, 360), true))
        );
        assert_eq!(s.probe.stats().surfaces_created, before.surfaces_created + 1);
        assert!(!s.handle.is_finished());

        s.finish().0.unwrap();
    }

    #[test]
    fn failed_first_surface_is_retried() {
        let window = HeadlessWindow::default();
        window.attach(SurfaceSize::new(480, 320));
        let backend = HeadlessBackend::new(window.clone());
        backend.faults().fail_surface_creations(1);
        let mut s = start_session(backend, window, None);

        s.glue.controller().on_surface_available();
        assert_eq!(s.resize(480, 320), ResizeOutcome::Ready);
        s.wait_ticks(2);

        assert!(s.probe.surface_is_current());
        assert!(!s.handle.is_finished());

        s.finish().0.unwrap();
    }

    #[test]
    fn destroy_during_a_frame_suppresses_its_swap() {
        let window = HeadlessWindow::default();
        window.attach(SurfaceSize::new(480, 320));
        let backend = HeadlessBackend::new(window.clone());
        let mut s = start_paced_session(backend, window, None, Duration::from_millis(150));

        s.glue.controller().on_surface_available();
        assert_eq!(s.resize(480, 320), ResizeOutcome::Ready);

        // Returns just after a tick started; its swap is ~150 ms away.
        s.wait_ticks(1);
        let before = s.probe.stats().presents;
        assert!(s.glue.controller().handle_surface_destroyed());

        let stats = s.probe.stats();
        assert_eq!(stats.presents, before);
        assert_eq!(stats.live_surfaces, 0);

        s.window.detach();
        s.finish().0.unwrap();
    }

    #[test]
    fn pause_stops_presenting_and_resume_keeps_the_surface() {
        let mut s = attached_session();
        s.glue.controller().on_surface_available();
        assert_eq!(s.resize(480, 320), ResizeOutcome::Ready);
        s.wait_ticks(3);

        s.handle.pause();
        let paused = s.probe.stats();
        assert!(wait_for(|| s.log.lock().unwrap().pauses == 1));
        thread::sleep(Duration::from_millis(50));
        assert_eq!(s.probe.stats().presents, paused.presents);

        s.handle.resume();
        assert!(wait_for(|| s.probe.stats().presents > paused.presents));

        let resumed = s.probe.stats();
        assert_eq!(resumed.surfaces_created, paused.surfaces_created);
        assert_eq!(s.log.lock().unwrap().resumes, 1);

        s.finish().0.unwrap();
    }

    #[test]
    fn window_can_come_and_go_while_paused() {
        let mut s = attached_session();
        s.glue.controller().on_surface_available();
        assert_eq!(s.resize(480, 320), ResizeOutcome::Ready);
        s.wait_ticks(2);

        s.handle.pause();
        assert!(s.glue.controller().handle_surface_destroyed());
        s.window.detach();
        assert_eq!(s.probe.stats().live_surfaces, 0);

        s.window.attach(SurfaceSize::new(320, 480));
        s.glue.controller().on_surface_available();
        assert_eq!(s.resize(320, 480), ResizeOutcome::Ready);
        assert!(s.probe.surface_is_current());

        s.handle.resume();
        s.wait_ticks(2);
        assert_eq!(s.probe.stats().presents_while_detached, 0);

        s.finish().0.unwrap();
    }

    #[test]
    fn rotation_scenario_keeps_surface_valid_at_each_callback() {
        let mut s = attached_session();
        s.glue.controller().on_surface_available();
        assert_eq!(s.resize(800, 480), ResizeOutcome::Ready);
        s.wait_ticks(2);

        assert!(s.glue.controller().handle_surface_destroyed());
        s.window.detach();
        thread::sleep(Duration::from_millis(30));

        s.window.attach(SurfaceSize::new(480, 800));
        s.glue.controller().on_surface_available();
        assert_eq!(s.resize(480, 800), ResizeOutcome::Ready);
        s.wait_ticks(2);

        assert_eq!(
            *s.geometry.lock().unwrap(),
            vec![
                (SurfaceSize::new(800, 480), true),
                (SurfaceSize::new(480, 800), true),
            ]
        );

        let stats = s.probe.stats();
        assert_eq!(stats.presents_while_detached, 0);
        assert!(stats.max_live_surfaces <= 1);

        s.finish().0.unwrap();
    }

    #[test]
    fn missing_display_reports_device_unsupported() {
        let window = HeadlessWindow::default();
        window.attach(SurfaceSize::new(480, 320));
        let backend = HeadlessBackend::new(window.clone()).without_display();
        let mut s = start_session(backend, window, None);

        s.glue.controller().on_surface_available();
        assert_eq!(s.resize(480, 320), ResizeOutcome::RenderThreadGone);
        assert!(s.geometry.lock().unwrap().is_empty());

        let messages: Vec<_> = s.glue.messages().drain().collect();
        assert_eq!(
            messages,
            vec![
                HostMessage::SwitchToInGame,
                HostMessage::ShowMessage(DEVICE_UNSUPPORTED_MESSAGE.to_string()),
            ]
        );

        let (result, log, _) = s.finish();
        assert!(matches!(
            result,
            Err(RenderError::Graphics(GraphicsError::Configuration(
                ConfigurationError::NoDisplay(_)
            )))
        ));
        assert_eq!(log.lock().unwrap().shutdowns, 1);
    }

    #[test]
    fn engine_exit_ends_the_thread() {
        let window = HeadlessWindow::default();
        window.attach(SurfaceSize::new(480, 320));
        let mut s = start_session(HeadlessBackend::new(window.clone()), window, Some(5));

        s.glue.controller().on_surface_available();
        assert!(wait_for(|| s.handle.is_finished()));

        let log = Arc::clone(&s.log);
        s.handle.join().unwrap();
        assert_eq!(log.lock().unwrap().ticks, 5);
        assert_eq!(s.probe.stats().live_surfaces, 0);
    }

    #[test]
    fn shutdown_before_any_window() {
        let s = attached_session();
        let (result, log, probe) = s.finish();

        result.unwrap();
        assert_eq!(probe.stats().contexts_created, 0);
        assert_eq!(log.lock().unwrap().shutdowns, 1);
    }

    #[test]
    fn spawning_twice_is_refused() {
        let mut s = attached_session();
        let window = HeadlessWindow::default();
        let second = s.glue.spawn(
            HeadlessBackend::new(window),
            ScriptedEngine {
                log: Arc::default(),
                exit_after: None,
                tick_delay: Duration::from_millis(1),
            },
            SessionConfig::default(),
        );
        assert!(second.is_err());

        s.finish().0.unwrap();
    }
}
