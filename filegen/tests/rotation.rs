//! Rotation against the real filesystem.

#![cfg(unix)]

use std::fs;
use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::sync::Arc;

use filegen::{
    FileGen, FileGenArena, FileGenContext, FileGenFlags, GenerationType, MockLogger, MockProcess,
    Registry, RotationOutcome, SECS_PER_DAY,
};
use filegen_clock::MockClock;
use filegen_fs::RealFilesystem;
use tempfile::{tempdir, TempDir};

// 2024-01-01 00:00:00 UTC
const T0: u64 = 1704067200;

type Context = FileGenContext<RealFilesystem, Arc<MockClock>, Arc<MockClock>, MockProcess, MockLogger>;

fn setup() -> (TempDir, String, Arc<MockClock>, MockLogger, Context) {
    let dir = tempdir().expect("tempdir");
    let prefix = format!("{}/", dir.path().display());
    let clock = Arc::new(MockClock::new(T0));
    let logger = MockLogger::new();
    let ctx = FileGenContext::new(
        RealFilesystem,
        Arc::clone(&clock),
        Arc::new(MockClock::new(0)),
        MockProcess::new(555),
        logger.clone(),
    );
    (dir, prefix, clock, logger, ctx)
}

fn new_gen(prefix: &str) -> FileGen<fs::File> {
    FileGen::new(prefix, "peerstats")
}

fn configure(ctx: &mut Context, gen: &mut FileGen<fs::File>, prefix: &str, kind: GenerationType) {
    ctx.configure(
        gen,
        prefix,
        "peerstats",
        kind,
        FileGenFlags::ENABLED | FileGenFlags::LINK,
    )
    .expect("configure");
}

fn write(gen: &mut FileGen<fs::File>, line: &str) {
    gen.handle_mut()
        .expect("open")
        .write_all(line.as_bytes())
        .expect("write");
}

fn same_inode(a: &Path, b: &Path) -> bool {
    let (a, b) = (fs::metadata(a).expect("a"), fs::metadata(b).expect("b"));
    a.ino() == b.ino() && a.dev() == b.dev()
}

#[test]
fn test_day_boundary_relinks_stable_name() {
    let (dir, prefix, _clock, logger, mut ctx) = setup();
    let mut gen = new_gen(&prefix);
    configure(&mut ctx, &mut gen, &prefix, GenerationType::Day);

    ctx.setup(&mut gen, T0);
    write(&mut gen, "first\n");
    ctx.setup(&mut gen, T0 + SECS_PER_DAY);
    write(&mut gen, "second\n");

    let stable = dir.path().join("peerstats");
    let first = dir.path().join("peerstats.20240101");
    let second = dir.path().join("peerstats.20240102");
    assert_eq!(fs::read_to_string(&first).expect("first"), "first\n");
    assert_eq!(fs::read_to_string(&second).expect("second"), "second\n");
    assert!(same_inode(&stable, &second));
    assert_eq!(fs::metadata(&first).expect("first").nlink(), 1);
    assert!(logger.errors().is_empty(), "{:?}", logger.errors());
}

#[test]
fn test_lone_stable_file_is_archived_and_readable() {
    let (dir, prefix, _clock, _logger, mut ctx) = setup();
    let stable = dir.path().join("peerstats");
    fs::write(&stable, "left over\n").expect("seed");
    let mut gen = new_gen(&prefix);
    configure(&mut ctx, &mut gen, &prefix, GenerationType::Day);

    ctx.setup(&mut gen, T0);

    let archive = dir.path().join("peerstats.555C0");
    assert_eq!(fs::read_to_string(&archive).expect("archive"), "left over\n");
    assert!(same_inode(&stable, &dir.path().join("peerstats.20240101")));
}

#[test]
fn test_linked_stable_name_is_dropped_and_older_generation_kept() {
    let (dir, prefix, _clock, _logger, mut ctx) = setup();
    let older = dir.path().join("peerstats.20231231");
    let stable = dir.path().join("peerstats");
    fs::write(&older, "old\n").expect("seed");
    fs::hard_link(&older, &stable).expect("link");
    let mut gen = new_gen(&prefix);
    configure(&mut ctx, &mut gen, &prefix, GenerationType::Day);

    ctx.setup(&mut gen, T0);

    assert_eq!(fs::read_to_string(&older).expect("older"), "old\n");
    assert_eq!(fs::metadata(&older).expect("older").nlink(), 1);
    assert!(same_inode(&stable, &dir.path().join("peerstats.20240101")));
}

#[test]
fn test_failed_open_keeps_writing_to_previous_generation() {
    let (dir, prefix, _clock, logger, mut ctx) = setup();
    let mut gen = new_gen(&prefix);
    configure(&mut ctx, &mut gen, &prefix, GenerationType::Day);
    ctx.setup(&mut gen, T0);
    write(&mut gen, "before\n");

    // A directory squatting on the next generation name makes the open fail
    fs::create_dir(dir.path().join("peerstats.20240102")).expect("mkdir");

    let outcome = ctx.setup(&mut gen, T0 + SECS_PER_DAY);
    write(&mut gen, "after\n");

    assert_eq!(outcome, Some(RotationOutcome::Retained));
    assert_eq!(
        fs::read_to_string(dir.path().join("peerstats.20240101")).expect("read"),
        "before\nafter\n"
    );
    assert!(logger.contains("can't open"));
}

#[test]
fn test_missing_directory_defers_rotation() {
    let (dir, prefix, _clock, logger, mut ctx) = setup();
    let nested = format!("{}later/", prefix);
    let mut gen = new_gen(&nested);
    configure(&mut ctx, &mut gen, &nested, GenerationType::Day);

    assert_eq!(ctx.setup(&mut gen, T0), Some(RotationOutcome::Retained));
    assert!(logger.errors().is_empty());

    fs::create_dir(dir.path().join("later")).expect("mkdir");
    assert!(matches!(
        ctx.setup(&mut gen, T0),
        Some(RotationOutcome::Opened { .. })
    ));
}

#[test]
fn test_statsdir_change_moves_open_streams() {
    let (dir, prefix, clock, _logger, mut ctx) = setup();
    let moved = format!("{}moved/", prefix);
    fs::create_dir(dir.path().join("moved")).expect("mkdir");
    let mut arena = FileGenArena::new();
    let mut registry = Registry::new();
    let id = registry.create(&mut arena, &prefix, "peerstats");
    {
        let gen = arena.get_mut(id).expect("gen");
        configure(&mut ctx, gen, &prefix, GenerationType::Month);
        ctx.setup(gen, T0);
    }
    clock.set(T0 + 40 * SECS_PER_DAY);

    assert_eq!(registry.apply_directory_to_all(&mut ctx, &mut arena, &moved), 1);

    let gen = arena.get_mut(id).expect("gen");
    write(gen, "moved\n");
    assert_eq!(
        fs::read_to_string(dir.path().join("moved").join("peerstats.202402")).expect("read"),
        "moved\n"
    );
    assert!(dir.path().join("peerstats.202401").exists());
}
