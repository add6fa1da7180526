//! Scheduler playground: a grid of quads across two command-list groups, one
//! spinning overlay, F12 screenshots and a throttled frame hook.

use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use glam::{Vec2, Vec3};
use winit::keyboard::KeyCode as WinitKey;

use tiamat_engine::EngineConfig;
use tiamat_engine::capture::{FrameHook, ScreenshotFormat};
use tiamat_engine::core::{App, AppControl, FrameCtx, SetupCtx};
use tiamat_engine::device::GpuInit;
use tiamat_engine::draw::{CommandListGroup, CommandListGroups, Rotation};
use tiamat_engine::input::KeyCode;
use tiamat_engine::logging::{LoggingConfig, init_logging};
use tiamat_engine::paint::Color;
use tiamat_engine::render::{Quad, QuadOp};
use tiamat_engine::window::{Runtime, RuntimeConfig};

const GRID: usize = 8;
const CELL: f32 = 64.0;
const OVERLAY: CommandListGroup = CommandListGroup(1);

#[derive(Default)]
struct Studio {
    tiles: Vec<Arc<QuadOp>>,
    spinner: Option<Arc<QuadOp>>,
    hook: Option<FrameHook>,
    angle: f32,
    shots: u32,
}

impl App for Studio {
    fn setup(&mut self, ctx: &mut SetupCtx<'_>) -> Result<()> {
        for i in 0..GRID * GRID {
            let (x, y) = ((i % GRID) as f32, (i / GRID) as f32);
            let color = Color::from_srgb_u8(
                (40.0 + x * 25.0) as u8,
                (40.0 + y * 25.0) as u8,
                160,
                255,
            );
            let op = Arc::new(Quad::new(Vec2::splat(CELL - 4.0), color).into_op());
            op.set_translation(Vec3::new(16.0 + x * CELL, 16.0 + y * CELL, 0.0));
            ctx.add(op.clone()).context("tile registration failed")?;
            self.tiles.push(op);
        }

        let size = Vec2::splat(160.0);
        let spinner = Arc::new(
            Quad::new(size, Color::from_straight(1.0, 0.6, 0.1, 0.8)).into_op_in(OVERLAY),
        );
        spinner.set_translation(Vec3::new(200.0, 200.0, 0.0));
        ctx.add(spinner.clone()).context("spinner registration failed")?;
        self.spinner = Some(spinner);

        self.hook = Some(ctx.engine.capture.add_frame_hook(4, 59));
        log::info!("studio ready: {} tiles", self.tiles.len());
        Ok(())
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_>) -> AppControl {
        if ctx.input.key_pressed(KeyCode::from(WinitKey::Escape)) {
            return AppControl::Exit;
        }

        if let Some(spinner) = &self.spinner {
            self.angle += ctx.time.dt * std::f32::consts::FRAC_PI_2;
            spinner.set_rotation_z(Rotation::new(self.angle, Vec3::new(80.0, 80.0, 0.0)));
            if let Err(err) = ctx.draw(spinner.clone(), 0.0) {
                log::error!("spinner: {err}");
            }
        }

        for (i, tile) in self.tiles.iter().enumerate() {
            if let Err(err) = ctx.draw(tile.clone(), i as f32) {
                log::error!("tile {i}: {err}");
            }
        }

        if ctx.input.key_pressed(KeyCode::from(WinitKey::F12)) {
            self.screenshot(ctx);
        }

        if let Some(frame) = self.hook.as_ref().and_then(FrameHook::next_frame) {
            log::debug!(
                "frame hook: {}x{}, center {:?}",
                frame.width,
                frame.height,
                frame.pixel(frame.width / 2, frame.height / 2)
            );
        }

        AppControl::Continue
    }

    fn on_shutdown(&mut self) {
        if let Some(hook) = &self.hook {
            log::info!("frame hook dropped {} frame(s)", hook.dropped());
        }
    }
}

impl Studio {
    fn screenshot(&mut self, ctx: &FrameCtx<'_>) {
        self.shots += 1;
        let path = format!("tiamat-{:03}.png", self.shots);
        let file = match File::create(&path) {
            Ok(f) => f,
            Err(err) => {
                log::error!("{path}: {err}");
                return;
            }
        };

        let ticket = ctx
            .engine
            .capture
            .take_screenshot(file, ScreenshotFormat::Png, 90);
        ctx.engine.runtime.spawn(async move {
            match ticket.wait().await {
                Ok(()) => log::info!("saved {path}"),
                Err(err) => log::error!("{path}: {err}"),
            }
        });
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let engine = EngineConfig {
        groups: CommandListGroups::new(2, GRID * GRID),
        clear_color: Color::from_srgb_u8(18, 18, 24, 255),
        ..EngineConfig::default()
    };
    let config = RuntimeConfig {
        title: "tiamat studio".to_string(),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, GpuInit::default(), engine, Studio::default())
}
