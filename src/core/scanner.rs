use crate::core::filter::ExtensionSet;
use crate::error::{Error, Result};
use regex::Regex;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// 扫描得到的候选文件（扫描时的快照，之后不再修改）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileCandidate {
    /// 绝对路径
    pub source_path: PathBuf,
    /// 文件名（含扩展名）
    pub name: String,
    pub size_bytes: u64,
    /// 修改时间（Unix 时间戳，秒）
    pub modified_time: i64,
    /// 分类标签，例如 "pictures"
    pub category: Option<String>,
}

/// 文件扫描器配置
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// 仅包含的扩展名（空表示不限制）
    pub extensions: ExtensionSet,
    /// 按目录名排除的子树（大小写不敏感）
    pub exclude_subtrees: Vec<String>,
    /// 按绝对路径排除的子树（例如 U 盘自身的目录）
    pub exclude_paths: Vec<PathBuf>,
    /// 文件名排除规则（简单通配符）
    pub ignore_patterns: Vec<String>,
    /// 是否包含隐藏文件和目录
    pub include_hidden: bool,
    /// 最大文件大小（0 表示不限制）
    pub max_file_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: ExtensionSet::any(),
            exclude_subtrees: [
                ".Trash",
                "node_modules",
                ".git",
                "__pycache__",
                "venv",
                ".venv",
                "Library",
                "Applications",
                ".npm",
                ".cache",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            exclude_paths: vec![],
            ignore_patterns: vec![
                "Thumbs.db".to_string(),
                "*.tmp".to_string(),
                "*.temp".to_string(),
                "~*".to_string(),
            ],
            include_hidden: false,
            max_file_size: 0,
        }
    }
}

impl ScanConfig {
    pub fn with_extensions(mut self, extensions: ExtensionSet) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn exclude_subtree(mut self, name: impl Into<String>) -> Self {
        self.exclude_subtrees.push(name.into());
        self
    }

    pub fn exclude_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.exclude_paths.push(path.into());
        self
    }
}

/// 编译后的文件名规则
#[derive(Debug, Clone)]
struct IgnoreRule {
    exact: String,
    regex: Option<Regex>,
}

impl IgnoreRule {
    /// 将 `*` 通配符转换为正则，其余按字面匹配
    fn compile(pattern: &str) -> Self {
        let exact = pattern.to_lowercase();
        let regex = if exact.contains('*') {
            let escaped = regex::escape(&exact).replace("\\*", ".*");
            match Regex::new(&format!("^{}$", escaped)) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("无效的排除规则 '{}': {}", pattern, e);
                    None
                }
            }
        } else {
            None
        };
        Self { exact, regex }
    }

    fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        match &self.regex {
            Some(re) => re.is_match(&name),
            None => name == self.exact,
        }
    }
}

/// 文件扫描器
#[derive(Debug, Clone)]
pub struct FileScanner {
    config: ScanConfig,
    ignore_rules: Vec<IgnoreRule>,
    exclude_paths: Vec<PathBuf>,
}

impl FileScanner {
    pub fn new() -> Self {
        Self::with_config(ScanConfig::default())
    }

    pub fn with_config(config: ScanConfig) -> Self {
        let ignore_rules = config
            .ignore_patterns
            .iter()
            .map(|p| IgnoreRule::compile(p))
            .collect();
        // 规范化后再比较，避免相对路径和符号链接导致漏判
        let exclude_paths = config
            .exclude_paths
            .iter()
            .map(|p| std::fs::canonicalize(p).unwrap_or_else(|_| p.clone()))
            .collect();

        Self {
            config,
            ignore_rules,
            exclude_paths,
        }
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// 扫描目录，返回惰性的候选文件序列
    ///
    /// 每次调用都是一次全新的遍历。`root` 不是目录时返回 `SourceNotFound`，
    /// 由调用方决定中止还是跳过。
    pub fn scan(&self, root: &Path, category: Option<&str>) -> Result<ScanIter> {
        if !root.is_dir() {
            return Err(Error::SourceNotFound(root.to_path_buf()));
        }

        let root = std::fs::canonicalize(root)?;
        info!("开始扫描: {} (分类: {:?})", root.display(), category);

        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        Ok(ScanIter {
            walker,
            scanner: self.clone(),
            category: category.map(str::to_string),
            yielded: 0,
            excluded: 0,
        })
    }

    fn is_hidden(entry: &DirEntry) -> bool {
        entry
            .file_name()
            .to_str()
            .map(|s| s.starts_with('.'))
            .unwrap_or(false)
    }

    /// 目录是否需要在进入前剪枝
    fn should_prune(&self, entry: &DirEntry) -> bool {
        if !self.config.include_hidden && Self::is_hidden(entry) {
            return true;
        }

        let name = entry.file_name().to_string_lossy();
        if self
            .config
            .exclude_subtrees
            .iter()
            .any(|n| n.eq_ignore_ascii_case(&name))
        {
            return true;
        }

        self.exclude_paths.iter().any(|p| entry.path().starts_with(p))
    }

    /// 文件是否被排除（不含大小检查）
    fn should_exclude_file(&self, entry: &DirEntry) -> bool {
        if !self.config.include_hidden && Self::is_hidden(entry) {
            return true;
        }

        let name = entry.file_name().to_string_lossy();
        if self.ignore_rules.iter().any(|r| r.matches(&name)) {
            return true;
        }

        if self.exclude_paths.iter().any(|p| entry.path().starts_with(p)) {
            return true;
        }

        !self.config.extensions.matches(entry.path())
    }

    fn to_candidate(&self, entry: &DirEntry, category: Option<&str>) -> Option<FileCandidate> {
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!("读取元数据失败，跳过: {} - {}", entry.path().display(), e);
                return None;
            }
        };

        if self.config.max_file_size > 0 && metadata.len() > self.config.max_file_size {
            debug!("跳过大文件: {} ({})", entry.path().display(), metadata.len());
            return None;
        }

        let modified_time = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        Some(FileCandidate {
            source_path: entry.path().to_path_buf(),
            name: entry.file_name().to_string_lossy().into_owned(),
            size_bytes: metadata.len(),
            modified_time,
            category: category.map(str::to_string),
        })
    }
}

impl Default for FileScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// 惰性扫描迭代器（深度优先）
pub struct ScanIter {
    walker: walkdir::IntoIter,
    scanner: FileScanner,
    category: Option<String>,
    yielded: usize,
    excluded: usize,
}

impl Iterator for ScanIter {
    type Item = FileCandidate;

    fn next(&mut self) -> Option<FileCandidate> {
        loop {
            let entry = match self.walker.next() {
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    warn!("遍历出错，跳过: {}", e);
                    continue;
                }
                None => {
                    debug!(
                        "扫描结束: {} 个候选文件, {} 个被排除",
                        self.yielded, self.excluded
                    );
                    return None;
                }
            };

            // 跳过根目录本身
            if entry.depth() == 0 {
                continue;
            }

            let file_type = entry.file_type();
            if file_type.is_dir() {
                if self.scanner.should_prune(&entry) {
                    debug!("排除目录: {}", entry.path().display());
                    self.walker.skip_current_dir();
                }
                continue;
            }

            // 不跟随符号链接，也不处理设备文件等
            if !file_type.is_file() {
                continue;
            }

            if self.scanner.should_exclude_file(&entry) {
                self.excluded += 1;
                continue;
            }

            if let Some(candidate) = self
                .scanner
                .to_candidate(&entry, self.category.as_deref())
            {
                self.yielded += 1;
                return Some(candidate);
            }
        }
    }
}
