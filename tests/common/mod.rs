#![allow(dead_code)]

use dhcp_agent::ExecutorConfig;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Executor settings that run scripts with `/bin/sh` instead of PowerShell.
pub fn sh_config(max_concurrent: usize) -> ExecutorConfig {
    ExecutorConfig {
        interpreter: "/bin/sh".to_string(),
        file_flags: Vec::new(),
        command_flags: vec!["-c".to_string()],
        inline_output_suffix: String::new(),
        max_concurrent,
        ..ExecutorConfig::default()
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, body).unwrap();
    path
}

/// A module root laid out like the reservation module (`<root>/Public/<script>`).
pub struct ModuleFixture {
    pub root: TempDir,
}

impl ModuleFixture {
    pub fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
        }
    }

    pub fn script(&self, name: &str, body: &str) -> &Self {
        write_script(&self.root.path().join("Public"), name, body);
        self
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }
}
