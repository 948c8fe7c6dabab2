//! scanline-render: render the built-in demo scene to a PNG
//!
//! Usage:
//!   scanline-render --out frame.png --width 640 --height 480 --time 1.5
//!   scanline-render --threads 1 --config render.json
//!
//! The demo scene is a spinning textured cube on a checkered floor behind a
//! translucent pane, seen through a main viewport plus a fogged inset.

use anyhow::{bail, Context, Result};
use nalgebra::{UnitQuaternion, Vector3};
use scanline_rs::core::{Camera, Color};
use scanline_rs::logging::{init_logging, LoggingConfig};
use scanline_rs::render::{
    surface_to_image, FlatLighting, Lit, PostEffect, RenderConfig, Renderer, ScreenRect, SmoothLighting, SolidColor,
    Surface, Textured, Viewport,
};
use scanline_rs::scene::{
    Animation, Channel, ChannelTarget, DirectionalLight, Filter, Keyframe, Material, MeshData, Node, PointLight, Scene,
    Texture,
};
use std::path::PathBuf;

struct Args {
    out: PathBuf,
    width: u32,
    height: u32,
    time: f32,
    threads: Option<usize>,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = std::env::args().skip(1);
    let mut parsed = Args {
        out: PathBuf::from("render.png"),
        width: 640,
        height: 480,
        time: 0.0,
        threads: None,
        config: None,
    };

    while let Some(arg) = args.next() {
        let mut value = || args.next().with_context(|| format!("missing value for {arg}"));
        match arg.as_str() {
            "--out" => parsed.out = PathBuf::from(value()?),
            "--width" => parsed.width = value()?.parse().context("invalid --width")?,
            "--height" => parsed.height = value()?.parse().context("invalid --height")?,
            "--time" => parsed.time = value()?.parse().context("invalid --time")?,
            "--threads" => parsed.threads = Some(value()?.parse().context("invalid --threads")?),
            "--config" => parsed.config = Some(PathBuf::from(value()?)),
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => {
                print_help();
                bail!("unknown argument: {other}");
            }
        }
    }

    if parsed.width == 0 || parsed.height == 0 {
        bail!("image size must be non-zero, got {}x{}", parsed.width, parsed.height);
    }
    Ok(parsed)
}

fn print_help() {
    eprintln!(
        "scanline-render v{}\n\n\
         Options:\n  \
           --out <path>      output PNG (default render.png)\n  \
           --width <px>      image width (default 640)\n  \
           --height <px>     image height (default 480)\n  \
           --time <sec>      animation time (default 0)\n  \
           --threads <n>     worker threads (default: SCANLINE_THREADS or all cores)\n  \
           --config <path>   RenderConfig JSON",
        scanline_rs::VERSION
    );
}

fn load_config(args: &Args) -> Result<RenderConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => RenderConfig::from_env(),
    };
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    Ok(config)
}

fn demo_scene() -> Result<Scene> {
    let mut scene = Scene::new();
    scene.ambient = 0.15;
    scene.directional_light = DirectionalLight {
        direction: Vector3::new(-0.4, -1.0, -0.6),
        intensity: Vector3::new(0.9, 0.85, 0.8),
    };
    scene.point_lights.push(PointLight {
        position: Vector3::new(1.5, 1.0, 2.0),
        intensity: Vector3::new(2.0, 1.2, 0.6),
    });

    let checker = scene.add_texture(Texture::checkerboard(
        128,
        16,
        Color::rgb(230, 230, 230),
        Color::rgb(40, 90, 160),
    )?);
    let floor_tex = scene.add_texture(Texture::checkerboard(256, 32, Color::WHITE, Color::rgb(60, 60, 60))?);

    let mut crate_mat = Material::new("crate", Color::WHITE);
    crate_mat.texture = Some(checker);
    crate_mat.specular = 0.4;
    crate_mat.shininess = 32.0;
    let crate_mat = scene.add_material(crate_mat);

    let mut floor_mat = Material::new("floor", Color::rgb(200, 200, 200));
    floor_mat.texture = Some(floor_tex);
    floor_mat.double_sided = true;
    let floor_mat = scene.add_material(floor_mat);

    let mut glass = Material::new("glass", Color::rgba(120, 200, 255, 96));
    glass.double_sided = true;
    let glass = scene.add_material(glass);

    let root = scene.add_node(Node::new("root"), None);

    let cube = scene.add_node(Node::new("cube"), Some(root));
    scene.add_mesh(cube, crate_mat, &MeshData::cube(1.2));

    let mut floor = Node::new("floor");
    floor.translation = Vector3::new(0.0, -0.6, 0.0);
    floor.rotation = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -std::f32::consts::FRAC_PI_2);
    let floor = scene.add_node(floor, Some(root));
    scene.add_mesh(floor, floor_mat, &MeshData::quad(8.0, 8.0));

    let mut pane = Node::new("pane");
    pane.translation = Vector3::new(0.4, 0.1, 1.3);
    let pane = scene.add_node(pane, Some(root));
    scene.add_mesh(pane, glass, &MeshData::quad(1.4, 1.0));

    let spin = (0..=4)
        .map(|i| {
            let t = i as f32;
            Keyframe {
                time: t,
                value: UnitQuaternion::from_axis_angle(&Vector3::y_axis(), t * std::f32::consts::FRAC_PI_2),
            }
        })
        .collect();
    let bob = vec![
        Keyframe { time: 0.0, value: Vector3::new(0.0, 0.0, 0.0) },
        Keyframe { time: 2.0, value: Vector3::new(0.0, 0.3, 0.0) },
        Keyframe { time: 4.0, value: Vector3::new(0.0, 0.0, 0.0) },
    ];
    scene.animations.push(Animation {
        name: "spin".into(),
        channels: vec![
            Channel { node: cube, target: ChannelTarget::Rotation(spin) },
            Channel { node: cube, target: ChannelTarget::Translation(bob) },
        ],
        end_time: 4.0,
    });

    scene.validate().context("demo scene failed validation")?;
    Ok(scene)
}

fn demo_viewports(width: u32, height: u32) -> Vec<Viewport> {
    let fov = 55f32.to_radians();
    let main_camera = Camera::look_at(Vector3::new(2.2, 1.6, 3.6), Vector3::zeros(), Vector3::y(), fov);
    let main = Viewport::new(
        ScreenRect::new(0, 0, width, height),
        main_camera,
        2,
        Lit::new(SmoothLighting::new(), Textured::new(Filter::Bilinear)),
    )
    .with_background(Color::rgb(24, 26, 32));

    let (iw, ih) = (width / 3, height / 3);
    let mut viewports = vec![main];
    if iw > 0 && ih > 0 {
        let top_camera = Camera::look_at(Vector3::new(0.0, 5.0, 0.5), Vector3::zeros(), -Vector3::z(), fov);
        let inset = Viewport::new(
            ScreenRect::new(width - iw, 0, iw, ih),
            top_camera,
            1,
            Lit::new(FlatLighting::new(), SolidColor::new()),
        )
        .with_background(Color::BLACK)
        .with_post(PostEffect::DepthFog {
            color: Color::rgb(24, 26, 32),
            start: 3.0,
            end: 7.0,
        });
        viewports.push(inset);
    }
    viewports
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());
    let args = parse_args()?;
    let config = load_config(&args)?;
    log::info!("scanline-render v{} with {:?}", scanline_rs::VERSION, config);

    let mut scene = demo_scene()?;
    scene.animate(args.time);
    let mut viewports = demo_viewports(args.width, args.height);

    let mut pixels = vec![0u32; args.width as usize * args.height as usize];
    let mut surface = Surface::new(&mut pixels, args.width, args.height, args.width as usize)?;
    let renderer = Renderer::new(config);
    let stats = renderer.render(&mut scene, &mut viewports, &mut surface)?;

    surface_to_image(&surface)
        .save(&args.out)
        .with_context(|| format!("writing {}", args.out.display()))?;
    println!(
        "wrote {} ({}x{}, t={:.2}s): {} triangles visible, {} culled, {} clipped, {} pixels",
        args.out.display(),
        args.width,
        args.height,
        args.time,
        stats.visible + stats.synthesized,
        stats.culled,
        stats.clipped,
        stats.pixels_written
    );
    Ok(())
}
