use std::path::{Path, PathBuf};

/// 文件名冲突解决器
///
/// 目标路径已存在时依次尝试 `{stem}_1{ext}`、`{stem}_2{ext}` ...，返回第一个未被占用的路径。
/// 检查与写入之间不是原子的，只在单线程顺序执行时成立。
#[derive(Debug, Clone, Copy, Default)]
pub struct CollisionResolver;

impl CollisionResolver {
    /// 按目标文件系统的当前状态解决冲突
    pub fn resolve(desired: &Path) -> PathBuf {
        Self::resolve_with(desired, |p| p.exists())
    }

    /// 按给定的占用判断解决冲突
    pub fn resolve_with<F>(desired: &Path, mut is_taken: F) -> PathBuf
    where
        F: FnMut(&Path) -> bool,
    {
        if !is_taken(desired) {
            return desired.to_path_buf();
        }

        let file_name = desired
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (stem, ext) = Self::split_name(&file_name);

        (1u64..)
            .map(|counter| desired.with_file_name(format!("{}_{}{}", stem, counter, ext)))
            .find(|candidate| !is_taken(candidate))
            .unwrap_or_else(|| desired.to_path_buf())
    }

    /// 拆分为主名和扩展名（扩展名含点）
    ///
    /// 以最后一个点为准；以点开头且没有其他点的文件名没有扩展名。
    pub fn split_name(name: &str) -> (&str, &str) {
        let leading_dots = name.len() - name.trim_start_matches('.').len();
        match name[leading_dots..].rfind('.') {
            Some(pos) => name.split_at(leading_dots + pos),
            None => (name, ""),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;

    #[test]
    fn test_free_path_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let desired = dir.path().join("photo.jpg");
        assert_eq!(CollisionResolver::resolve(&desired), desired);
    }

    #[test]
    fn test_counter_increases_in_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("photo.jpg"), "0").unwrap();
        fs::write(dir.path().join("photo_1.jpg"), "1").unwrap();
        fs::write(dir.path().join("photo_3.jpg"), "3").unwrap();

        let resolved = CollisionResolver::resolve(&dir.path().join("photo.jpg"));
        assert_eq!(resolved, dir.path().join("photo_2.jpg"));
    }

    #[test]
    fn test_resolve_with_reserved_set() {
        let taken: HashSet<PathBuf> = [PathBuf::from("/out/a.txt"), PathBuf::from("/out/a_1.txt")]
            .into_iter()
            .collect();
        let resolved =
            CollisionResolver::resolve_with(Path::new("/out/a.txt"), |p| taken.contains(p));
        assert_eq!(resolved, PathBuf::from("/out/a_2.txt"));
    }

    #[test]
    fn test_split_name() {
        assert_eq!(CollisionResolver::split_name("photo.jpg"), ("photo", ".jpg"));
        assert_eq!(CollisionResolver::split_name("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(CollisionResolver::split_name("README"), ("README", ""));
        assert_eq!(CollisionResolver::split_name(".bashrc"), (".bashrc", ""));
        assert_eq!(CollisionResolver::split_name(".config.json"), (".config", ".json"));
    }

    #[test]
    fn test_dotfile_collision() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".env"), "x").unwrap();
        let resolved = CollisionResolver::resolve(&dir.path().join(".env"));
        assert_eq!(resolved, dir.path().join(".env_1"));
    }
}
