//! Replay Script
//!
//! A shell script mirroring every identity created on OneFS, so the same
//! users and groups (with the same ids) can be created on Linux hosts.
//! The file is created with a fixed preamble on first use and opened in
//! append mode for every line.

use crate::error::Result;
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// First lines of every replay script
pub const PREAMBLE: &str = "#!/usr/bin/env sh\nset -o errexit\nset -o xtrace\n";

/// One line of the replay script
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptCommand {
    GroupAdd { gid: u32, name: String },
    UserAdd { uid: u32, gid: u32, name: String },
    UserMod { group: String, user: String },
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptCommand::GroupAdd { gid, name } => write!(f, "groupadd --gid {} {}", gid, name),
            ScriptCommand::UserAdd { uid, gid, name } => {
                write!(f, "useradd --uid {} --gid {} {}", uid, gid, name)
            }
            ScriptCommand::UserMod { group, user } => write!(f, "usermod -a -G {} {}", group, user),
        }
    }
}

/// An append-only replay script on the local file system
#[derive(Debug, Clone)]
pub struct ReplayScript {
    path: PathBuf,
}

impl ReplayScript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the preamble unless the file already exists
    pub async fn ensure_created(&self) -> Result<()> {
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await;
        match file {
            Ok(mut file) => {
                file.write_all(PREAMBLE.as_bytes()).await?;
                file.flush().await?;
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Append one command, creating the script first if needed
    pub async fn append(&self, command: &ScriptCommand) -> Result<String> {
        self.ensure_created().await?;
        let line = command.to_string();
        let mut file = OpenOptions::new().append(true).open(&self.path).await?;
        file.write_all(format!("{}\n", line).as_bytes()).await?;
        file.flush().await?;
        Ok(line)
    }
}
