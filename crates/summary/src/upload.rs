use crate::render::{read_json_file, SummaryRenderer};
use crate::{MarkdownConfig, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const UPLOAD_COMMAND: &str = "upload";
pub const MAX_FILES_IN_TREE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResult {
    pub source_path: String,
    pub target_path: String,
    #[serde(default)]
    pub rt_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResults {
    #[serde(default)]
    pub results: Vec<UploadResult>,
}

/// Prefix tree of uploaded target paths, one root per repository.
#[derive(Debug, Default)]
pub struct FileTree {
    repos: BTreeMap<String, DirNode>,
    size: usize,
    exceeds_max: bool,
}

#[derive(Debug, Default)]
struct DirNode {
    dirs: BTreeMap<String, DirNode>,
    /// file name → optional link
    files: BTreeMap<String, Option<String>>,
}

impl FileTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn exceeds_max(&self) -> bool {
        self.exceeds_max
    }

    pub fn add_file(&mut self, path: &str, link: Option<String>) {
        if self.size >= MAX_FILES_IN_TREE {
            if !self.exceeds_max {
                log::info!("Upload summary exceeds {MAX_FILES_IN_TREE} files, omitting the tree");
            }
            self.exceeds_max = true;
            return;
        }
        let mut segments = path.trim_start_matches('/').split('/');
        let Some(repo) = segments.next().filter(|repo| !repo.is_empty()) else {
            return;
        };
        let rest: Vec<&str> = segments.filter(|s| !s.is_empty()).collect();
        if rest.is_empty() {
            return;
        }
        let repo = self.repos.entry(repo.to_string()).or_default();
        if repo.add(&rest, link) {
            self.size += 1;
        }
    }

    /// Empty when the file cap was exceeded.
    pub fn render(&self) -> String {
        if self.exceeds_max {
            return String::new();
        }
        let mut out = String::new();
        for (name, repo) in &self.repos {
            let mut lines = vec![format!("📦 {name}")];
            repo.render_children(&mut lines);
            out.push_str(&lines.join("\n"));
            out.push_str("\n\n");
        }
        out
    }
}

impl DirNode {
    fn add(&mut self, path: &[&str], link: Option<String>) -> bool {
        match path {
            [file] => {
                if self.files.contains_key(*file) {
                    return false;
                }
                self.files.insert(file.to_string(), link);
                true
            }
            [dir, rest @ ..] => self.dirs.entry(dir.to_string()).or_default().add(rest, link),
            [] => false,
        }
    }

    fn render_children(&self, lines: &mut Vec<String>) {
        let total = self.dirs.len() + self.files.len();
        let mut position = 0;

        for (name, dir) in &self.dirs {
            position += 1;
            let last = position == total;
            let (branch, indent) = if last {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            lines.push(format!("{branch}📁 {name}"));
            let mut nested = Vec::new();
            dir.render_children(&mut nested);
            lines.extend(nested.into_iter().map(|line| format!("{indent}{line}")));
        }

        for (name, link) in &self.files {
            position += 1;
            let branch = if position == total { "└── " } else { "├── " };
            match link {
                Some(url) => lines.push(format!(
                    "{branch}<a href='{url}' target=\"_blank\">{name}</a>"
                )),
                None => lines.push(format!("{branch}📄 {name}")),
            }
        }
    }
}

/// Renders merged upload results as a tree inside `<pre>`.
#[derive(Debug, Default, Clone, Copy)]
pub struct UploadSummaryRenderer;

impl UploadSummaryRenderer {
    pub fn build_tree(results: &UploadResults, config: &MarkdownConfig) -> FileTree {
        let mut tree = FileTree::new();
        for result in &results.results {
            let link = config
                .extended
                .then(|| config.artifact_link(result.target_path.trim_start_matches('/')));
            tree.add_file(&result.target_path, link);
        }
        tree
    }
}

impl SummaryRenderer for UploadSummaryRenderer {
    fn title(&self) -> String {
        "📁 Files uploaded".to_string()
    }

    fn render(&self, data_files: &[PathBuf], config: &MarkdownConfig) -> Result<String> {
        let mut merged = UploadResults::default();
        for path in data_files {
            let chunk: UploadResults = read_json_file(path)?;
            merged.results.extend(chunk.results);
        }
        let tree = Self::build_tree(&merged, config);
        if tree.exceeds_max() {
            return Ok(format!(
                "\n<p>{} files uploaded; the tree view shows at most {MAX_FILES_IN_TREE}.</p>\n",
                merged.results.len()
            ));
        }
        if tree.is_empty() {
            return Ok("\n<p>No files were uploaded.</p>\n".to_string());
        }
        Ok(format!("\n<pre>\n{}</pre>\n\n", tree.render()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn results(paths: &[&str]) -> UploadResults {
        UploadResults {
            results: paths
                .iter()
                .map(|p| UploadResult {
                    source_path: format!("./{p}"),
                    target_path: p.to_string(),
                    rt_url: String::new(),
                })
                .collect(),
        }
    }

    #[test]
    fn tree_layout() {
        let uploads = results(&[
            "generic-local/docs/readme.md",
            "generic-local/docs/api/index.html",
            "generic-local/app.zip",
            "generic-local/app.zip",
        ]);
        let tree = UploadSummaryRenderer::build_tree(&uploads, &MarkdownConfig::basic());
        assert_eq!(tree.len(), 3);
        assert_eq!(
            tree.render(),
            "📦 generic-local\n\
             ├── 📁 docs\n\
             │   ├── 📁 api\n\
             │   │   └── 📄 index.html\n\
             │   └── 📄 readme.md\n\
             └── 📄 app.zip\n\n"
        );
    }

    #[test]
    fn extended_mode_links_every_leaf() {
        let uploads = results(&["repo/a.txt", "repo/b.txt"]);
        let config = MarkdownConfig::new(true, "https://acme.example/", None);
        let rendered = UploadSummaryRenderer::build_tree(&uploads, &config).render();
        assert_eq!(
            rendered,
            "📦 repo\n\
             ├── <a href='https://acme.example/ui/repos/tree/General/repo/a.txt' target=\"_blank\">a.txt</a>\n\
             └── <a href='https://acme.example/ui/repos/tree/General/repo/b.txt' target=\"_blank\">b.txt</a>\n\n"
        );
    }

    #[test]
    fn extended_flag_does_not_change_entries() {
        let uploads = results(&["r/x/1", "r/x/2", "q/3"]);
        let plain = UploadSummaryRenderer::build_tree(&uploads, &MarkdownConfig::basic());
        let fancy = UploadSummaryRenderer::build_tree(
            &uploads,
            &MarkdownConfig::new(true, "https://h/", None),
        );
        assert_eq!(plain.len(), fancy.len());
        assert_eq!(plain.render().lines().count(), fancy.render().lines().count());
    }

    #[test]
    fn cap_blanks_the_tree() {
        let paths: Vec<String> = (0..=MAX_FILES_IN_TREE).map(|i| format!("r/f{i}")).collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let tree = UploadSummaryRenderer::build_tree(&results(&refs), &MarkdownConfig::basic());
        assert!(tree.exceeds_max());
        assert_eq!(tree.render(), "");
    }

    fn render_files(chunks: &[UploadResults]) -> String {
        let tmp = tempfile::TempDir::new().unwrap();
        let files: Vec<PathBuf> = chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let path = tmp.path().join(format!("{i}-data"));
                std::fs::write(&path, serde_json::to_vec(chunk).unwrap()).unwrap();
                path
            })
            .collect();
        UploadSummaryRenderer
            .render(&files, &MarkdownConfig::basic())
            .unwrap()
    }

    #[test]
    fn cap_message_only_when_the_tree_overflowed() {
        let paths: Vec<String> = (0..=MAX_FILES_IN_TREE).map(|i| format!("r/f{i}")).collect();
        let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        let overflowing = render_files(&[results(&refs)]);
        assert!(overflowing.contains("201 files uploaded; the tree view shows at most 200"));

        let nothing_valid = render_files(&[UploadResults::default(), results(&["no-slash"])]);
        assert_eq!(nothing_valid, "\n<p>No files were uploaded.</p>\n");
        assert!(!nothing_valid.contains("at most"));

        let small = render_files(&[results(&["r/a.txt"])]);
        assert_eq!(small, "\n<pre>\n📦 r\n└── 📄 a.txt\n\n</pre>\n\n");
    }
}
