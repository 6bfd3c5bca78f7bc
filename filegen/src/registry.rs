//! Name-keyed registry of file generations.
//!
//! Descriptors live in a [`FileGenArena`] owned by the host; the
//! [`Registry`] only maps names to arena ids so administrative commands can
//! find and reconfigure streams in bulk.

use std::collections::BTreeMap;

use filegen_clock::Clock;
use filegen_fs::Filesystem;
use slab::Slab;
use thiserror::Error;

use crate::config::ConfigOutcome;
use crate::context::{FileGenContext, ProcessInfo};
use crate::generation::FileGen;
use crate::logger::Logger;

/// Handle to a descriptor in a [`FileGenArena`].
///
/// Slots are reused after removal; the generation tag keeps an old id from
/// resolving to whatever was inserted in its place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileGenId {
    index: usize,
    generation: u64,
}

struct Slot<H> {
    generation: u64,
    gen: FileGen<H>,
}

/// Storage for file generation descriptors.
pub struct FileGenArena<H> {
    slots: Slab<Slot<H>>,
    next_generation: u64,
}

impl<H> Default for FileGenArena<H> {
    fn default() -> Self {
        Self {
            slots: Slab::new(),
            next_generation: 0,
        }
    }
}

impl<H> FileGenArena<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, gen: FileGen<H>) -> FileGenId {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let index = self.slots.insert(Slot { generation, gen });
        FileGenId { index, generation }
    }

    pub fn get(&self, id: FileGenId) -> Option<&FileGen<H>> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .map(|slot| &slot.gen)
    }

    pub fn get_mut(&mut self, id: FileGenId) -> Option<&mut FileGen<H>> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .map(|slot| &mut slot.gen)
    }

    /// Take a descriptor out of the arena. Dropping it closes its file.
    pub fn remove(&mut self, id: FileGenId) -> Option<FileGen<H>> {
        if !self.contains(id) {
            return None;
        }
        self.slots.try_remove(id.index).map(|slot| slot.gen)
    }

    pub fn contains(&self, id: FileGenId) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Errors from registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no file generation with id {0:?}")]
    UnknownId(FileGenId),
}

/// Maps stream names to descriptors.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, FileGenId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise the descriptor at `id` for `directory` + `name` and
    /// register it under `name`.
    ///
    /// Registering a name again points it at the new descriptor; whatever
    /// it pointed at before is left untouched.
    pub fn register<H>(
        &mut self,
        arena: &mut FileGenArena<H>,
        directory: &str,
        name: &str,
        id: FileGenId,
    ) -> Result<(), RegistryError> {
        let gen = arena.get_mut(id).ok_or(RegistryError::UnknownId(id))?;
        gen.reset(directory, name);
        self.entries.insert(name.to_string(), id);
        Ok(())
    }

    /// Insert a fresh descriptor into `arena` and register it.
    pub fn create<H>(&mut self, arena: &mut FileGenArena<H>, directory: &str, name: &str) -> FileGenId {
        let id = arena.insert(FileGen::new(directory, name));
        self.entries.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<FileGenId> {
        self.entries.get(name).copied()
    }

    /// Descriptor registered as `name`.
    pub fn get<'a, H>(&self, arena: &'a FileGenArena<H>, name: &str) -> Option<&'a FileGen<H>> {
        self.lookup(name).and_then(|id| arena.get(id))
    }

    pub fn get_mut<'a, H>(
        &self,
        arena: &'a mut FileGenArena<H>,
        name: &str,
    ) -> Option<&'a mut FileGen<H>> {
        self.lookup(name).and_then(move |id| arena.get_mut(id))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop the association for `name` and release its descriptor, unless
    /// another name still refers to it.
    pub fn unregister<H>(&mut self, arena: &mut FileGenArena<H>, name: &str) -> Option<FileGen<H>> {
        let id = self.entries.remove(name)?;
        if self.entries.values().any(|other| *other == id) {
            return None;
        }
        arena.remove(id)
    }

    /// Move every registered stream to `directory`, keeping its other
    /// settings. Each stream that had a file open is reopened in the new
    /// place. Returns how many streams took the new settings.
    pub fn apply_directory_to_all<F, C, U, P, L>(
        &self,
        ctx: &mut FileGenContext<F, C, U, P, L>,
        arena: &mut FileGenArena<F::File>,
        directory: &str,
    ) -> usize
    where
        F: Filesystem,
        C: Clock,
        U: Clock,
        P: ProcessInfo,
        L: Logger,
    {
        let mut applied = 0;
        for (name, id) in &self.entries {
            let Some(gen) = arena.get_mut(*id) else {
                ctx.logger()
                    .error(&format!("file generation {} has no descriptor", name));
                continue;
            };
            let settings = gen.settings().with_directory(directory);
            if let Ok(ConfigOutcome::Applied { .. }) = ctx.apply(gen, &settings) {
                applied += 1;
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileGenFlags;
    use crate::context::MockProcess;
    use crate::logger::MockLogger;
    use crate::policy::GenerationType;
    use filegen_clock::MockClock;
    use filegen_fs::{MockFile, MockFilesystem};
    use std::path::Path;

    const DIR: &str = "/var/log/ntpstats/";
    const NEW_DIR: &str = "/srv/ntpstats/";
    // 2024-01-01 12:00:00 UTC
    const NOON: u64 = 1704110400;

    fn context(fs: &MockFilesystem, logger: &MockLogger) -> FileGenContext<MockFilesystem, MockClock, MockClock, MockProcess, MockLogger> {
        fs.add_dir(DIR);
        fs.add_dir(NEW_DIR);
        FileGenContext::new(
            fs.clone(),
            MockClock::new(NOON),
            MockClock::new(0),
            MockProcess::new(1),
            logger.clone(),
        )
    }

    #[test]
    fn test_create_and_lookup() {
        let mut arena: FileGenArena<MockFile> = FileGenArena::new();
        let mut registry = Registry::new();

        let id = registry.create(&mut arena, DIR, "peerstats");

        assert_eq!(registry.lookup("peerstats"), Some(id));
        assert_eq!(registry.lookup("loopstats"), None);
        let gen = registry.get(&arena, "peerstats").expect("registered");
        assert_eq!(gen.base_name(), "peerstats");
        assert_eq!(gen.directory(), DIR);
    }

    #[test]
    fn test_register_initialises_descriptor() {
        let mut arena: FileGenArena<MockFile> = FileGenArena::new();
        let mut registry = Registry::new();
        let mut gen = FileGen::new("/old/", "old");
        gen.update("/old/", "old", GenerationType::Age, FileGenFlags::ENABLED);
        let id = arena.insert(gen);

        registry
            .register(&mut arena, DIR, "clockstats", id)
            .expect("register");

        let gen = arena.get(id).expect("slot");
        assert_eq!(gen.directory(), DIR);
        assert_eq!(gen.base_name(), "clockstats");
        assert_eq!(gen.kind(), GenerationType::Day);
        assert_eq!(gen.flags(), FileGenFlags::LINK);
    }

    #[test]
    fn test_register_unknown_id() {
        let mut arena: FileGenArena<MockFile> = FileGenArena::new();
        let mut registry = Registry::new();
        let id = arena.insert(FileGen::new(DIR, "x"));
        arena.remove(id);

        assert_eq!(
            registry.register(&mut arena, DIR, "x", id),
            Err(RegistryError::UnknownId(id))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reregister_replaces_association_only() {
        let mut arena: FileGenArena<MockFile> = FileGenArena::new();
        let mut registry = Registry::new();
        let first = registry.create(&mut arena, DIR, "rawstats");
        arena
            .get_mut(first)
            .expect("first")
            .update(DIR, "rawstats", GenerationType::Week, FileGenFlags::ENABLED);

        let second = arena.insert(FileGen::new(DIR, "rawstats"));
        registry
            .register(&mut arena, NEW_DIR, "rawstats", second)
            .expect("register");

        assert_eq!(registry.lookup("rawstats"), Some(second));
        assert_eq!(registry.len(), 1);
        let old = arena.get(first).expect("old descriptor kept");
        assert_eq!(old.kind(), GenerationType::Week);
        assert_eq!(arena.get(second).expect("new").directory(), NEW_DIR);
    }

    #[test]
    fn test_names_sorted() {
        let mut arena: FileGenArena<MockFile> = FileGenArena::new();
        let mut registry = Registry::new();
        for name in ["sysstats", "clockstats", "peerstats"] {
            registry.create(&mut arena, DIR, name);
        }

        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["clockstats", "peerstats", "sysstats"]);
    }

    #[test]
    fn test_unregister_releases_descriptor() {
        let mut arena: FileGenArena<MockFile> = FileGenArena::new();
        let mut registry = Registry::new();
        let id = registry.create(&mut arena, DIR, "protostats");

        let gen = registry.unregister(&mut arena, "protostats").expect("removed");

        assert_eq!(gen.base_name(), "protostats");
        assert!(!arena.contains(id));
        assert_eq!(registry.lookup("protostats"), None);
        assert!(registry.unregister(&mut arena, "protostats").is_none());
    }

    #[test]
    fn test_unregister_keeps_shared_descriptor() {
        let mut arena: FileGenArena<MockFile> = FileGenArena::new();
        let mut registry = Registry::new();
        let id = registry.create(&mut arena, DIR, "timingstats");
        registry
            .register(&mut arena, DIR, "timingstats-alias", id)
            .expect("alias");

        assert!(registry.unregister(&mut arena, "timingstats").is_none());
        assert!(arena.contains(id));
        assert_eq!(registry.lookup("timingstats-alias"), Some(id));
    }

    #[test]
    fn test_unregister_closes_open_file() {
        let fs = MockFilesystem::new();
        let logger = MockLogger::new();
        let mut ctx = context(&fs, &logger);
        let mut arena = FileGenArena::new();
        let mut registry = Registry::new();
        let id = registry.create(&mut arena, DIR, "cryptostats");
        let gen = arena.get_mut(id).expect("gen");
        ctx.configure(gen, DIR, "cryptostats", GenerationType::Day, FileGenFlags::ENABLED)
            .expect("configure");
        ctx.setup(gen, NOON);
        assert!(gen.is_open());

        let mut removed = registry.unregister(&mut arena, "cryptostats").expect("removed");
        assert!(removed.close());
        assert!(arena.is_empty());
    }

    #[test]
    fn test_apply_directory_to_all() {
        let fs = MockFilesystem::new();
        let logger = MockLogger::new();
        let mut ctx = context(&fs, &logger);
        let mut arena = FileGenArena::new();
        let mut registry = Registry::new();

        let open = registry.create(&mut arena, DIR, "peerstats");
        let closed = registry.create(&mut arena, DIR, "loopstats");
        {
            let gen = arena.get_mut(open).expect("open");
            ctx.configure(
                gen,
                DIR,
                "peerstats",
                GenerationType::Day,
                FileGenFlags::ENABLED | FileGenFlags::LINK,
            )
            .expect("configure");
            ctx.setup(gen, NOON);
        }

        let applied = registry.apply_directory_to_all(&mut ctx, &mut arena, NEW_DIR);

        assert_eq!(applied, 2);
        let gen = arena.get(open).expect("open");
        assert_eq!(gen.directory(), NEW_DIR);
        assert_eq!(
            gen.current_path(),
            Some(Path::new("/srv/ntpstats/peerstats.20240101"))
        );
        let gen = arena.get(closed).expect("closed");
        assert_eq!(gen.directory(), NEW_DIR);
        assert!(!gen.is_open());
        assert_eq!(gen.kind(), GenerationType::Day);
    }

    #[test]
    fn test_apply_same_directory_changes_nothing() {
        let fs = MockFilesystem::new();
        let logger = MockLogger::new();
        let mut ctx = context(&fs, &logger);
        let mut arena: FileGenArena<MockFile> = FileGenArena::new();
        let mut registry = Registry::new();
        registry.create(&mut arena, DIR, "peerstats");

        assert_eq!(registry.apply_directory_to_all(&mut ctx, &mut arena, DIR), 0);
        assert!(fs.journal().is_empty());
    }

    #[test]
    fn test_apply_reports_dangling_entries() {
        let fs = MockFilesystem::new();
        let logger = MockLogger::new();
        let mut ctx = context(&fs, &logger);
        let mut arena: FileGenArena<MockFile> = FileGenArena::new();
        let mut registry = Registry::new();
        let id = registry.create(&mut arena, DIR, "peerstats");
        arena.remove(id);

        assert_eq!(registry.apply_directory_to_all(&mut ctx, &mut arena, NEW_DIR), 0);
        assert!(logger.contains("peerstats has no descriptor"));
    }

    #[test]
    fn test_reused_slot_does_not_alias_stale_name() {
        let fs = MockFilesystem::new();
        let logger = MockLogger::new();
        let mut ctx = context(&fs, &logger);
        let mut arena: FileGenArena<MockFile> = FileGenArena::new();
        let mut registry = Registry::new();
        let peer = registry.create(&mut arena, DIR, "peerstats");
        arena.remove(peer);

        let loop_id = registry.create(&mut arena, DIR, "loopstats");

        assert_ne!(peer, loop_id);
        assert!(!arena.contains(peer));
        assert!(arena.remove(peer).is_none());
        assert!(registry.get(&arena, "peerstats").is_none());
        assert_eq!(
            registry.get(&arena, "loopstats").map(FileGen::base_name),
            Some("loopstats")
        );

        // The stale name is reported, the live stream is configured once
        assert_eq!(registry.apply_directory_to_all(&mut ctx, &mut arena, NEW_DIR), 1);
        assert!(logger.contains("peerstats has no descriptor"));
        assert_eq!(arena.get(loop_id).expect("loopstats").directory(), NEW_DIR);
    }
}
