// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::workspace::Workspace;
use gv_adapters::FakeGit;
use gv_core::{Config, HookBus, Receipt, DEFAULT_NOTES_REF};
use std::path::Path;
use tempfile::TempDir;

pub struct Repo {
    pub dir: TempDir,
    pub git: FakeGit,
}

impl Repo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let git = FakeGit::new(dir.path());
        git.commit("initial", &["README.md"]);
        Self { dir, git }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        self
    }

    pub fn workspace(&self) -> Workspace<FakeGit> {
        Workspace {
            config: Config::for_root(self.dir.path()),
            git: self.git.clone(),
            hooks: HookBus::new(),
        }
    }

    pub fn receipts(&self) -> Vec<Receipt> {
        self.git
            .notes(DEFAULT_NOTES_REF)
            .values()
            .flat_map(|body| Receipt::parse_note(body))
            .collect()
    }
}
