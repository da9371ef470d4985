//! Headless host: wires the overlay pipeline to the demo world and runs a
//! fixed number of frames.

use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use overlay_geom::{Bounds, Coords, DimensionId, Point};
use overlay_regions::custom::{CustomRegions, WorldSpawnMarker};
use overlay_regions::remote::{
    PROTOCOL_VERSION, RemoteStructures, StructureInfo, StructureMessage, StructureRecord,
    StructureResolver,
};
use overlay_regions::shapes::{ShapeStyle, SharedHeight, default_capabilities};
use overlay_regions::{Geometry, NoticeLevel, Notices, SourceSet};
use overlay_runtime::{
    BuildContext, BuildScheduler, DrawSink, FrameDriver, SchedulerSettings, SystemClock,
    ViewTransform,
};
use overlay_spawn::{SpatialChunkCache, SpawnRule, SpawnableSource};

use crate::config::OverlayConfig;
use crate::demo_world::DemoWorld;

pub struct RunOptions {
    pub frames: u32,
    pub frame_ms: u64,
    pub seed: i32,
    pub force_sync: bool,
}

/// Counts what would have been sent to the GPU.
#[derive(Default)]
struct HeadlessSink {
    draws: u64,
    lines: u64,
    quads: u64,
}

impl DrawSink for HeadlessSink {
    fn draw(&mut self, view: &ViewTransform, geometry: Geometry<'_>) {
        self.draws += 1;
        self.lines += geometry.lines.len() as u64;
        self.quads += geometry.quads.len() as u64;
        log::trace!(
            "draw at {:?} (camera {:?}): {} lines, {} quads",
            geometry.origin,
            view.camera,
            geometry.lines.len(),
            geometry.quads.len()
        );
    }
}

struct DemoResolver;

impl StructureResolver for DemoResolver {
    fn resolve(&self, id: &str) -> Option<StructureInfo> {
        match id {
            "minecraft:village_plains" | "minecraft:pillager_outpost" => Some(StructureInfo {
                adapts_terrain: true,
            }),
            "minecraft:fortress" | "minecraft:monument" => Some(StructureInfo::default()),
            _ => None,
        }
    }
}

fn demo_structures(channel: &str) -> Vec<StructureMessage> {
    vec![
        StructureMessage::Metadata {
            version: PROTOCOL_VERSION,
            channel: channel.to_string(),
            timeout: 1200,
        },
        StructureMessage::StructureData(vec![
            StructureRecord {
                id: "minecraft:village_plains".into(),
                children: vec![vec![-40, 60, 10, -20, 72, 30], vec![-24, 62, 28, -10, 70, 44]],
            },
            StructureRecord {
                id: "minecraft:monument".into(),
                children: vec![vec![60, 39, -30, 117, 61, 27]],
            },
            StructureRecord {
                id: "example:unknown_ruin".into(),
                // malformed piece; kept as a zero box
                children: vec![vec![5, 5, 5], vec![90, 64, 90, 96, 70, 96]],
            },
        ]),
    ]
}

pub fn run(cfg: &OverlayConfig, opts: &RunOptions) -> Result<(), Box<dyn Error>> {
    let dimension = DimensionId::new("minecraft:overworld");
    let notices = Notices::new();

    let world = Arc::new(DemoWorld::new(opts.seed, 8));
    let rule = SpawnRule::new(world.clone(), cfg.spawnable.max_block_light);
    let cache = Arc::new(SpatialChunkCache::new(Arc::new(rule)));
    let spawnable = Arc::new(SpawnableSource::new(
        cache.clone(),
        cfg.spawnable.render_distance,
    ));
    spawnable.set_enabled(cfg.spawnable.enabled);

    let custom = Arc::new(CustomRegions::new());
    custom.add_box(&dimension, Coords::new(-4, 64, -4), Coords::new(4, 72, 4));
    custom.add_line(
        &dimension,
        Point::new(0.5, 64.0, 0.5),
        Point::new(0.5, 96.0, 0.5),
    );
    custom.add_sphere(&dimension, Point::new(24.5, 70.0, -8.5), 6.0);

    let spawn_marker = Arc::new(WorldSpawnMarker::new());
    spawn_marker.set(
        dimension.clone(),
        Bounds::new(Coords::new(-160, 0, -160), Coords::new(175, 0, 175)),
    );

    let remote = Arc::new(RemoteStructures::with_channel(
        &cfg.structures.channel,
        Arc::new(DemoResolver),
        notices.clone(),
    ));
    for message in demo_structures(&cfg.structures.channel) {
        match remote.handle(message, Some(&dimension)) {
            Ok(n) if n > 0 => log::info!("received {} structures", n),
            Ok(_) => {}
            Err(e) => log::warn!("structure message rejected: {}", e),
        }
    }

    let mut sources = SourceSet::new();
    sources.push(spawn_marker);
    sources.push(custom);
    sources.push(remote);
    sources.push(spawnable.clone());

    let caps = default_capabilities(
        ShapeStyle::default(),
        SharedHeight::new(cfg.world_spawn.max_y),
    );
    let scheduler = BuildScheduler::new(
        BuildContext::new(sources, caps),
        Arc::new(SystemClock::new()),
        SchedulerSettings {
            cooldown_ms: cfg.render.build_cooldown_ms,
        },
        notices.clone(),
    )?;
    let mut driver = FrameDriver::new(scheduler, cfg.render.async_building && !opts.force_sync);
    log::info!(
        target: "overlay",
        "running {} frames ({} building)",
        opts.frames,
        if driver.is_async() { "async" } else { "sync" }
    );

    let mut sink = HeadlessSink::default();
    for frame in 0..opts.frames {
        let camera = Point::new(f64::from(frame) * 0.5, 80.0, 8.5);
        spawnable.set_viewer(camera);
        driver.per_frame(&ViewTransform::new(camera), &dimension, &mut sink);
        spawnable.tick();

        if frame % 40 == 20 {
            let c = camera.floor();
            let lit = world.toggle_torch(c.x, c.z);
            cache.block_changed(c.x, c.z);
            log::debug!("torch at ({}, {}) lit={}", c.x, c.z, lit);
        }
        if frame % 30 == 0 {
            log::info!(
                target: "overlay",
                "frame {}: {} | pending recomputes {} | {} us",
                frame,
                driver.status_strings().join(" / "),
                cache.pending_recompute_count(),
                driver.last_build_duration_nanos() / 1_000
            );
        }
        for notice in notices.drain() {
            match notice.level {
                NoticeLevel::Error => log::error!("{}: {}", notice.title, notice.body),
                NoticeLevel::Warning => log::warn!("{}: {}", notice.title, notice.body),
                NoticeLevel::Info => log::info!("{}: {}", notice.title, notice.body),
            }
        }
        if opts.frame_ms > 0 {
            thread::sleep(Duration::from_millis(opts.frame_ms));
        }
    }

    let stats = cache.stats();
    // hide the overlay and let the pipeline release its buffers
    driver.set_active(false);
    for _ in 0..50 {
        driver.per_frame(&ViewTransform::default(), &dimension, &mut sink);
        if driver.scheduler().in_flight() == 0 {
            driver.per_frame(&ViewTransform::default(), &dimension, &mut sink);
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    log::info!(
        target: "overlay",
        "done: {} draws, {} lines, {} quads, {} builds launched; cache {} entries, {} recomputed",
        sink.draws,
        sink.lines,
        sink.quads,
        driver.scheduler().launches(),
        stats.entries,
        stats.recomputed
    );
    Ok(())
}
