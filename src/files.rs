// Copyright 2025 Fernando Borretti
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Access to the markdown files cards live in.

use std::future::Future;
use std::path::Path;
use std::path::PathBuf;

use walkdir::DirEntry;
use walkdir::WalkDir;

use crate::error::Fallible;

pub trait FileAccess {
    fn read_file(&self, path: &Path) -> impl Future<Output = Fallible<String>> + Send;

    fn write_file(&self, path: &Path, text: &str) -> impl Future<Output = Fallible<()>> + Send;

    /// Every file under `directory` with the given extension, sorted.
    fn list_files(
        &self,
        directory: &Path,
        extension: &str,
    ) -> impl Future<Output = Fallible<Vec<PathBuf>>> + Send;
}

/// The local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFiles;

impl FileAccess for LocalFiles {
    async fn read_file(&self, path: &Path) -> Fallible<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    async fn write_file(&self, path: &Path, text: &str) -> Fallible<()> {
        Ok(tokio::fs::write(path, text).await?)
    }

    async fn list_files(&self, directory: &Path, extension: &str) -> Fallible<Vec<PathBuf>> {
        let directory = directory.to_path_buf();
        let extension = extension.to_string();
        tokio::task::spawn_blocking(move || walk(&directory, &extension)).await?
    }
}

fn walk(directory: &Path, extension: &str) -> Fallible<Vec<PathBuf>> {
    let mut paths = Vec::new();
    let walker = WalkDir::new(directory)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == extension) {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Dotfiles and dot-directories (`.git`, `.obsidian`, ...) are skipped.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use std::fs::create_dir_all;
    use std::fs::write;

    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn test_read_write() -> Fallible<()> {
        let dir = tempdir()?;
        let path = dir.path().join("deck.md");
        let files = LocalFiles;
        files.write_file(&path, "Q::A\n").await?;
        assert_eq!(files.read_file(&path).await?, "Q::A\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_read_missing() -> Fallible<()> {
        let dir = tempdir()?;
        let result = LocalFiles.read_file(&dir.path().join("nope.md")).await;
        assert!(result.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_list_files() -> Fallible<()> {
        let dir = tempdir()?;
        let root = dir.path();
        create_dir_all(root.join("Spanish/Verbs"))?;
        create_dir_all(root.join(".obsidian"))?;
        write(root.join("b.md"), "")?;
        write(root.join("a.md"), "")?;
        write(root.join("notes.txt"), "")?;
        write(root.join("Spanish/Verbs/ser.md"), "")?;
        write(root.join(".obsidian/hidden.md"), "")?;
        write(root.join(".draft.md"), "")?;

        let paths = LocalFiles.list_files(root, "md").await?;
        let relative: Vec<PathBuf> = paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            relative,
            vec![
                PathBuf::from("Spanish/Verbs/ser.md"),
                PathBuf::from("a.md"),
                PathBuf::from("b.md"),
            ]
        );
        Ok(())
    }
}
