//! Fireworks entry point
//!
//! The browser build drives the show from `requestAnimationFrame` onto two
//! stacked canvases. The native build runs it headless for a number of
//! simulated seconds and reports what happened.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_app {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, PointerEvent};

    use fireworks::Settings;
    use fireworks::platform::{CanvasSurface, WebAudioSink};
    use fireworks::renderer::Layers;
    use fireworks::show::Show;

    /// Height of the tap targets along the top edge
    const BUTTON_SIZE: f32 = 50.0;
    /// Taps this close to the bottom edge adjust the speed
    const SPEED_BAR_HIT_PX: f32 = 44.0;

    struct App {
        show: Show,
        trails_canvas: HtmlCanvasElement,
        main_canvas: HtmlCanvasElement,
        trails: CanvasSurface,
        main: CanvasSurface,
        container: HtmlElement,
        last_time: f64,
        scrubbing: bool,
    }

    impl App {
        fn css_size(&self) -> Vec2 {
            Vec2::new(
                self.main_canvas.client_width() as f32,
                self.main_canvas.client_height() as f32,
            )
        }

        fn resize(&mut self) {
            let Some(window) = web_sys::window() else {
                return;
            };
            let dpr = window.device_pixel_ratio();
            let size = self.css_size();
            for canvas in [&self.trails_canvas, &self.main_canvas] {
                canvas.set_width((size.x as f64 * dpr) as u32);
                canvas.set_height((size.y as f64 * dpr) as u32);
            }
            self.show.set_pixel_ratio(dpr as f32);
            self.show.resize(size);
        }

        fn frame(&mut self, time: f64) {
            let frame_ms = if self.last_time > 0.0 {
                (time - self.last_time) as f32
            } else {
                fireworks::consts::FRAME_MS
            };
            self.last_time = time;

            let drew = self.show.tick(
                frame_ms,
                &mut Layers {
                    trails: &mut self.trails,
                    main: &mut self.main,
                },
            );
            if drew {
                let [r, g, b] = self.show.sky_color();
                self.container
                    .style()
                    .set_property("background-color", &format!("rgb({r}, {g}, {b})"))
                    .ok();
            }
        }

        fn pointer_down(&mut self, pos: Vec2) {
            let size = self.css_size();
            if pos.y < BUTTON_SIZE {
                if pos.x < BUTTON_SIZE {
                    self.show.toggle_pause();
                    return;
                }
                if (pos.x - size.x / 2.0).abs() < BUTTON_SIZE / 2.0 {
                    self.show.toggle_sound();
                    return;
                }
                if pos.x > size.x - BUTTON_SIZE {
                    self.show.toggle_menu();
                    return;
                }
            }

            if !self.show.is_running() {
                return;
            }

            if pos.y >= size.y - SPEED_BAR_HIT_PX {
                self.scrubbing = true;
                self.show.scrub_speed(pos.x, size.x);
            } else {
                self.show.launch_at_pointer(pos);
            }
        }

        fn pointer_move(&mut self, pos: Vec2) {
            if self.scrubbing && self.show.is_running() {
                let width = self.css_size().x;
                self.show.scrub_speed(pos.x, width);
            }
        }

        fn pointer_up(&mut self) {
            self.scrubbing = false;
            self.show.end_scrub();
        }
    }

    fn canvas(document: &web_sys::Document, id: &str) -> Option<(HtmlCanvasElement, CanvasRenderingContext2d)> {
        let canvas: HtmlCanvasElement = document.get_element_by_id(id)?.dyn_into().ok()?;
        let ctx: CanvasRenderingContext2d = canvas.get_context("2d").ok()??.dyn_into().ok()?;
        Some((canvas, ctx))
    }

    pub fn run() {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).ok();

        log::info!("Fireworks starting...");

        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        let (Some((trails_canvas, trails_ctx)), Some((main_canvas, main_ctx))) =
            (canvas(&document, "trails-canvas"), canvas(&document, "main-canvas"))
        else {
            log::error!("Missing #trails-canvas or #main-canvas");
            return;
        };
        let Some(container) = document
            .get_element_by_id("canvas-container")
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        else {
            log::error!("Missing #canvas-container");
            return;
        };

        let seed = js_sys::Date::now() as u64;
        let size = Vec2::new(
            main_canvas.client_width() as f32,
            main_canvas.client_height() as f32,
        );
        let mut show = Show::new(Settings::default(), size, seed);
        show.set_audio_sink(Box::new(WebAudioSink::new()));

        let app = Rc::new(RefCell::new(App {
            show,
            trails_canvas,
            main_canvas: main_canvas.clone(),
            trails: CanvasSurface::new(trails_ctx),
            main: CanvasSurface::new(main_ctx),
            container,
            last_time: 0.0,
            scrubbing: false,
        }));
        app.borrow_mut().resize();

        setup_input_handlers(&main_canvas, app.clone());
        setup_resize(app.clone());
        setup_auto_pause(app.clone());

        request_animation_frame(app);

        log::info!("Fireworks running with seed {seed}");
    }

    fn pointer_pos(event: &PointerEvent) -> Vec2 {
        Vec2::new(event.offset_x() as f32, event.offset_y() as f32)
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, app: Rc<RefCell<App>>) {
        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                app.borrow_mut().pointer_down(pointer_pos(&event));
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                app.borrow_mut().pointer_move(pointer_pos(&event));
            });
            let _ = canvas
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        {
            let app = app.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: PointerEvent| {
                app.borrow_mut().pointer_up();
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerup", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
            let mut app = app.borrow_mut();
            match event.key().as_str() {
                " " => app.show.toggle_pause(),
                "o" | "O" => app.show.toggle_menu(),
                "Escape" => app.show.set_menu_open(false),
                _ => {}
            }
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_resize(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            app.borrow_mut().resize();
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_auto_pause(app: Rc<RefCell<App>>) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let document_clone = document.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                app.borrow_mut().show.set_paused(true);
                log::info!("Auto-paused (tab hidden)");
            }
        });
        let _ = document
            .add_event_listener_with_callback("visibilitychange", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn request_animation_frame(app: Rc<RefCell<App>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            app.borrow_mut().frame(time);
            request_animation_frame(app);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_app::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::PathBuf;

    use glam::Vec2;

    use fireworks::audio::{RecordingAudio, SoundEffect};
    use fireworks::consts::FRAME_MS;
    use fireworks::renderer::{CommandRecorder, Layers};
    use fireworks::show::Show;
    use fireworks::{Settings, SettingsError};

    /// Command-line options for a headless run
    #[derive(Debug, Clone, PartialEq)]
    pub struct Args {
        pub config: Option<PathBuf>,
        pub seconds: f32,
        pub seed: u64,
        pub drones: bool,
        pub finale: bool,
    }

    impl Default for Args {
        fn default() -> Self {
            Self {
                config: None,
                seconds: 30.0,
                seed: 1,
                drones: false,
                finale: false,
            }
        }
    }

    fn invalid(name: &str, value: &str) -> SettingsError {
        SettingsError::InvalidArgument {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    pub fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args, SettingsError> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().ok_or_else(|| invalid("--config", ""))?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--seconds" => {
                    let value = args.next().unwrap_or_default();
                    parsed.seconds = value
                        .parse::<f32>()
                        .ok()
                        .filter(|s| s.is_finite() && *s >= 0.0)
                        .ok_or_else(|| invalid("--seconds", &value))?;
                }
                "--seed" => {
                    let value = args.next().unwrap_or_default();
                    parsed.seed = value.parse().map_err(|_| invalid("--seed", &value))?;
                }
                "--drones" => parsed.drones = true,
                "--finale" => parsed.finale = true,
                other => return Err(invalid("argument", other)),
            }
        }
        Ok(parsed)
    }

    /// Totals gathered over a run
    #[derive(Debug, Default)]
    struct Stats {
        frames: u64,
        peak_stars: usize,
        peak_sparks: usize,
        flashes: usize,
        segments: usize,
    }

    pub fn run(args: Args) -> Result<(), SettingsError> {
        let mut settings = match &args.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        settings.drone_show |= args.drones;
        settings.finale |= args.finale;

        let mut show = Show::new(settings, Vec2::new(1280.0, 720.0), args.seed);
        let audio = RecordingAudio::new();
        show.set_audio_sink(Box::new(audio.clone()));
        show.set_sound_enabled(true);

        let mut trails = CommandRecorder::new();
        let mut main = CommandRecorder::new();
        let mut stats = Stats::default();
        let total_frames = (args.seconds * 1000.0 / FRAME_MS).round() as u64;

        for frame in 0..total_frames {
            trails.clear();
            main.clear();
            show.tick(
                FRAME_MS,
                &mut Layers {
                    trails: &mut trails,
                    main: &mut main,
                },
            );

            let particles = &show.simulation().particles;
            stats.frames += 1;
            stats.peak_stars = stats.peak_stars.max(particles.stars.len());
            stats.peak_sparks = stats.peak_sparks.max(particles.sparks.len());
            stats.flashes += trails.gradient_count();
            stats.segments += trails.strokes().map(|(s, _)| s.len()).sum::<usize>();

            if frame % 60 == 0 {
                log::debug!(
                    "t={:.1}s stars={} sparks={} pending={}",
                    frame as f32 * FRAME_MS / 1000.0,
                    particles.stars.len(),
                    particles.sparks.len(),
                    show.sequencer().pending()
                );
            }
        }

        let particles = &show.simulation().particles;
        log::info!(
            "Ran {} frames ({:.1}s simulated)",
            stats.frames,
            show.simulation().ctx.sim_time / 1000.0
        );
        println!("frames:        {}", stats.frames);
        println!("peak stars:    {}", stats.peak_stars);
        println!("peak sparks:   {}", stats.peak_sparks);
        println!("burst flashes: {}", stats.flashes);
        println!("trail strokes: {}", stats.segments);
        println!("dropped:       {}", particles.dropped());
        println!("sky colour:    {:?}", show.sky_color());
        for effect in [
            SoundEffect::Lift,
            SoundEffect::Burst,
            SoundEffect::BurstSmall,
            SoundEffect::Crackle,
            SoundEffect::CrackleSmall,
        ] {
            println!("sound {:13} {}", effect.as_str(), audio.count(effect));
        }
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn args(list: &[&str]) -> Result<Args, SettingsError> {
            parse_args(list.iter().map(|s| s.to_string()))
        }

        #[test]
        fn test_parse_defaults() {
            assert_eq!(args(&[]).unwrap(), Args::default());
        }

        #[test]
        fn test_parse_flags() {
            let parsed = args(&["--seconds", "2.5", "--seed", "99", "--drones", "--finale"]).unwrap();
            assert_eq!(parsed.seconds, 2.5);
            assert_eq!(parsed.seed, 99);
            assert!(parsed.drones && parsed.finale);
        }

        #[test]
        fn test_parse_errors() {
            assert!(matches!(
                args(&["--seconds", "soon"]),
                Err(SettingsError::InvalidArgument { .. })
            ));
            assert!(args(&["--seed"]).is_err());
            assert!(args(&["--bogus"]).is_err());
        }

        #[test]
        fn test_short_run() {
            let parsed = args(&["--seconds", "1"]).unwrap();
            assert!(run(parsed).is_ok());
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Fireworks (native, headless) starting...");

    let result = headless::parse_args(std::env::args().skip(1)).and_then(headless::run);
    if let Err(e) = result {
        log::error!("{e}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
